use std::path::{Path, PathBuf};

/// Expand `~` and `$VAR` in a user supplied path.
///
/// Unknown variables leave the path untouched.
pub fn expand_path(path: &Path) -> PathBuf {
    let raw = path.to_string_lossy();
    match shellexpand::full(&raw) {
        Ok(expanded) => PathBuf::from(expanded.as_ref()),
        Err(_) => path.to_path_buf(),
    }
}
