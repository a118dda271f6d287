//! Leaf label decoding.
//!
//! Leaves are named `Genus_species_accession_location`. The last field is the
//! location code, the first two form the display name.

use std::fmt;

use tracing::instrument;

use crate::domain::error::{DomainError, DomainResult};

const FIELD_SEPARATOR: char = '_';
const MIN_FIELDS: usize = 3;

/// Opaque geographic region key, e.g. `AF` or `SEA`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct LocationCode(String);

impl LocationCode {
    pub fn new(code: impl Into<String>) -> Self {
        Self(code.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for LocationCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for LocationCode {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl From<&str> for LocationCode {
    fn from(code: &str) -> Self {
        Self(code.to_string())
    }
}

impl From<String> for LocationCode {
    fn from(code: String) -> Self {
        Self(code)
    }
}

/// Decoded leaf label.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LeafName {
    /// `Genus species`
    pub display_name: String,
    pub location: LocationCode,
}

/// Split a leaf label into its display name and location code.
///
/// # Errors
/// `DomainError::MalformedLabel` when the label has fewer than three
/// underscore-separated fields or the genus, species or location is empty.
#[instrument(level = "trace")]
pub fn extract(label: &str) -> DomainResult<LeafName> {
    let trimmed = label.trim();
    let fields: Vec<&str> = trimmed.split(FIELD_SEPARATOR).collect();
    if fields.len() < MIN_FIELDS {
        return Err(DomainError::malformed(
            label,
            format!(
                "expected Genus_species_accession_location, found {} field(s)",
                fields.len()
            ),
        ));
    }

    let genus = fields[0];
    let species = fields[1];
    let location = fields[fields.len() - 1];

    if genus.is_empty() || species.is_empty() {
        return Err(DomainError::malformed(label, "empty genus or species"));
    }
    if location.is_empty() {
        return Err(DomainError::malformed(label, "empty location code"));
    }

    Ok(LeafName {
        display_name: format!("{genus} {species}"),
        location: LocationCode::from(location),
    })
}
