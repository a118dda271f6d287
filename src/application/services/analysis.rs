//! Tree analysis service
//!
//! Loads a Newick file, optionally ladderizes it, and annotates the chosen
//! subtree with biogeography.

use std::path::Path;
use std::sync::Arc;

use tracing::{debug, info};

use crate::application::{ApplicationError, ApplicationResult, IoResultExt};
use crate::config::Settings;
use crate::domain::{
    extract, ladderize, parse_newick, Biogeography, Direction, DomainError, LeafName, NodeId,
    PhyloTree, Propagator, RoundingPolicy,
};
use crate::infrastructure::traits::FileSystem;

/// Knobs for one analysis run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnalysisOptions {
    pub precision: u32,
    pub rounding: RoundingPolicy,
    pub ladderize: Option<Direction>,
    /// Label of the subtree root to analyse; the tree root when None
    pub focus: Option<String>,
}

impl From<&Settings> for AnalysisOptions {
    fn from(settings: &Settings) -> Self {
        Self {
            precision: settings.precision,
            rounding: settings.rounding,
            ladderize: settings.ladderize.direction(),
            focus: None,
        }
    }
}

impl Default for AnalysisOptions {
    fn default() -> Self {
        Self::from(&Settings::default())
    }
}

/// Annotated tree plus the node the analysis started from.
#[derive(Debug, Clone)]
pub struct Analysis {
    pub tree: PhyloTree,
    pub focus: NodeId,
    pub biogeography: Biogeography,
}

/// Decoded leaf, in tree order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LeafRecord {
    pub label: String,
    pub leaf: LeafName,
}

pub struct AnalysisService {
    fs: Arc<dyn FileSystem>,
}

impl AnalysisService {
    pub fn new(fs: Arc<dyn FileSystem>) -> Self {
        Self { fs }
    }

    /// Read and parse a Newick file.
    pub fn load_tree(&self, path: &Path) -> ApplicationResult<PhyloTree> {
        debug!("load_tree: path={}", path.display());
        let text = self
            .fs
            .read_to_string(path)
            .with_path_context("read tree file", path)?;
        Ok(parse_newick(&text)?)
    }

    /// Load `path` and annotate it.
    pub fn analyze(&self, path: &Path, options: &AnalysisOptions) -> ApplicationResult<Analysis> {
        let tree = self.load_tree(path)?;
        self.analyze_tree(tree, options)
    }

    /// Annotate an already loaded tree.
    pub fn analyze_tree(&self, mut tree: PhyloTree, options: &AnalysisOptions) -> ApplicationResult<Analysis> {
        if let Some(direction) = options.ladderize {
            ladderize(&mut tree, direction);
        }

        let focus = match &options.focus {
            Some(label) => tree
                .find_by_label(label)
                .ok_or_else(|| ApplicationError::UnknownNode(label.clone()))?,
            None => tree.root().ok_or(DomainError::EmptyTree)?,
        };

        let biogeography = Propagator::new(options.precision, options.rounding).compute(&mut tree, focus)?;
        info!(nodes = tree.len(), result = %biogeography, "analysis complete");

        Ok(Analysis {
            tree,
            focus,
            biogeography,
        })
    }

    /// Decode every leaf label of the tree at `path`.
    pub fn leaves(&self, path: &Path) -> ApplicationResult<Vec<LeafRecord>> {
        let tree = self.load_tree(path)?;
        tree.leaves()
            .into_iter()
            .filter_map(|idx| tree.node(idx))
            .map(|node| -> ApplicationResult<LeafRecord> {
                Ok(LeafRecord {
                    label: node.label.clone(),
                    leaf: extract(&node.label)?,
                })
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;
    use std::io;
    use std::path::PathBuf;
    use std::sync::Mutex;

    use super::*;

    #[derive(Default)]
    struct MemoryFileSystem {
        files: Mutex<HashMap<PathBuf, String>>,
    }

    impl MemoryFileSystem {
        fn with_file(path: &str, content: &str) -> Self {
            let fs = Self::default();
            fs.files
                .lock()
                .unwrap()
                .insert(PathBuf::from(path), content.to_string());
            fs
        }
    }

    impl FileSystem for MemoryFileSystem {
        fn read_to_string(&self, path: &Path) -> io::Result<String> {
            self.files
                .lock()
                .unwrap()
                .get(path)
                .cloned()
                .ok_or_else(|| io::Error::new(io::ErrorKind::NotFound, "no such file"))
        }

        fn write(&self, path: &Path, content: &str) -> io::Result<()> {
            self.files
                .lock()
                .unwrap()
                .insert(path.to_path_buf(), content.to_string());
            Ok(())
        }

        fn exists(&self, path: &Path) -> bool {
            self.files.lock().unwrap().contains_key(path)
        }

        fn create_dir_all(&self, _path: &Path) -> io::Result<()> {
            Ok(())
        }
    }

    fn service(path: &str, content: &str) -> AnalysisService {
        AnalysisService::new(Arc::new(MemoryFileSystem::with_file(path, content)))
    }

    #[test]
    fn given_tree_file_when_analyzing_then_annotates_root() {
        let svc = service("t.nwk", "((a_b_1_AF,a_b_2_AF),a_b_3_NA);");
        let analysis = svc.analyze(Path::new("t.nwk"), &AnalysisOptions::default()).unwrap();

        assert_eq!(Some(analysis.focus), analysis.tree.root());
        assert_eq!(analysis.biogeography.get("AF"), Some(0.5));
        assert_eq!(analysis.biogeography.get("NA"), Some(0.5));
    }

    #[test]
    fn given_focus_label_when_analyzing_then_only_subtree_is_annotated() {
        let svc = service("t.nwk", "((a_b_1_AF,a_b_2_SA)clade,a_b_3_NA);");
        let options = AnalysisOptions {
            focus: Some("clade".to_string()),
            ..AnalysisOptions::default()
        };
        let analysis = svc.analyze(Path::new("t.nwk"), &options).unwrap();

        // default descending ladderize reverses the tied pair
        assert_eq!(analysis.biogeography.to_string(), "SA 0.50, AF 0.50");
        let root = analysis.tree.root().unwrap();
        assert!(analysis.tree.node(root).unwrap().biogeography.is_none());
    }

    #[test]
    fn given_unknown_focus_when_analyzing_then_fails() {
        let svc = service("t.nwk", "(a_b_1_AF,a_b_2_SA);");
        let options = AnalysisOptions {
            focus: Some("nope".to_string()),
            ..AnalysisOptions::default()
        };
        let err = svc.analyze(Path::new("t.nwk"), &options).unwrap_err();
        assert!(matches!(err, ApplicationError::UnknownNode(ref l) if l == "nope"));
    }

    #[test]
    fn given_missing_file_when_analyzing_then_reports_io_not_found() {
        let svc = service("t.nwk", "(a_b_1_AF,a_b_2_SA);");
        let err = svc.analyze(Path::new("other.nwk"), &AnalysisOptions::default()).unwrap_err();
        assert_eq!(err.io_source().map(|e| e.kind()), Some(io::ErrorKind::NotFound));
    }

    #[test]
    fn given_tree_file_when_listing_leaves_then_decodes_each_label() {
        let svc = service("t.nwk", "(Panthera_leo_AB1_AF,Puma_concolor_AB2_NA);");
        let leaves = svc.leaves(Path::new("t.nwk")).unwrap();
        let decoded: Vec<(&str, &str)> = leaves
            .iter()
            .map(|r| (r.leaf.display_name.as_str(), r.leaf.location.as_str()))
            .collect();
        assert_eq!(decoded, vec![("Panthera leo", "AF"), ("Puma concolor", "NA")]);
    }
}
