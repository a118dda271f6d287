//! Node colouring from location distributions.
//!
//! Two modes: `specific` colours a node by its most probable location,
//! `broad` sums probabilities per region group and colours by the winning
//! group. Colour tables are injected, never hard-coded here.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use itertools::Itertools;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::instrument;

use crate::config::Settings;
use crate::domain::{Biogeography, BiogeographyView, NodeId, PhyloTree};

/// Marker size for leaves.
pub const LEAF_SIZE: u32 = 15;
/// Marker size for internal nodes.
pub const INTERNAL_SIZE: u32 = 10;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ColorError {
    #[error("no colour configured for location '{0}'")]
    UnknownLocation(String),

    #[error("no region group contains any of: {0}")]
    NoRegion(String),

    #[error("node '{0}' has no biogeography")]
    NotAnnotated(String),

    #[error("distribution has no locations")]
    EmptyDistribution,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ColorMode {
    /// Colour of the most probable location
    Specific,
    /// Colour of the most probable region group
    #[default]
    Broad,
}

impl fmt::Display for ColorMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Specific => f.write_str("specific"),
            Self::Broad => f.write_str("broad"),
        }
    }
}

impl FromStr for ColorMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "specific" => Ok(Self::Specific),
            "broad" => Ok(Self::Broad),
            other => Err(format!("unknown colour mode '{other}' (expected specific or broad)")),
        }
    }
}

/// Named set of locations sharing one colour in broad mode.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegionGroup {
    pub name: String,
    pub color: String,
    pub members: Vec<String>,
}

impl RegionGroup {
    pub fn new(name: &str, color: &str, members: &[&str]) -> Self {
        Self {
            name: name.to_string(),
            color: color.to_string(),
            members: members.iter().map(|m| m.to_string()).collect(),
        }
    }
}

/// Marker colour and size for one node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NodeStyle {
    pub color: String,
    pub size: u32,
}

#[derive(Debug, Clone)]
pub struct NodeColorizer {
    mode: ColorMode,
    palette: BTreeMap<String, String>,
    regions: Vec<RegionGroup>,
}

impl NodeColorizer {
    pub fn new(mode: ColorMode, palette: BTreeMap<String, String>, regions: Vec<RegionGroup>) -> Self {
        Self {
            mode,
            palette,
            regions,
        }
    }

    pub fn from_settings(settings: &Settings) -> Self {
        Self::new(settings.mode, settings.palette.clone(), settings.regions.clone())
    }

    pub fn mode(&self) -> ColorMode {
        self.mode
    }

    pub fn with_mode(mut self, mode: ColorMode) -> Self {
        self.mode = mode;
        self
    }

    pub fn color(&self, biogeography: &Biogeography) -> Result<&str, ColorError> {
        match self.mode {
            ColorMode::Specific => self.specific_color(biogeography),
            ColorMode::Broad => self.broad_color(biogeography),
        }
    }

    /// Colour of the first (most probable) location.
    pub fn specific_color(&self, biogeography: &Biogeography) -> Result<&str, ColorError> {
        let (location, _) = biogeography.dominant().ok_or(ColorError::EmptyDistribution)?;
        self.palette
            .get(location.as_str())
            .map(String::as_str)
            .ok_or_else(|| ColorError::UnknownLocation(location.to_string()))
    }

    /// Colour of the region group with the highest summed probability.
    /// Groups tie in configuration order; groups with no member present
    /// never win.
    pub fn broad_color(&self, biogeography: &Biogeography) -> Result<&str, ColorError> {
        if biogeography.is_empty() {
            return Err(ColorError::EmptyDistribution);
        }
        let mut best: Option<(&RegionGroup, f64)> = None;
        for region in &self.regions {
            let present: Vec<f64> = region
                .members
                .iter()
                .filter_map(|m| biogeography.get(m))
                .collect();
            if present.is_empty() {
                continue;
            }
            let score: f64 = present.iter().sum();
            if best.map_or(true, |(_, top)| score > top) {
                best = Some((region, score));
            }
        }
        best.map(|(region, _)| region.color.as_str())
            .ok_or_else(|| ColorError::NoRegion(biogeography.locations().join(", ")))
    }

    /// Marker style of `node`, read through the view.
    #[instrument(level = "trace", skip(self, tree))]
    pub fn style(&self, tree: &PhyloTree, node: NodeId) -> Result<NodeStyle, ColorError> {
        let tree_node = tree
            .node(node)
            .ok_or_else(|| ColorError::NotAnnotated(String::from("<missing>")))?;
        let biogeography = tree
            .biogeography(node)
            .ok_or_else(|| ColorError::NotAnnotated(tree_node.name().to_string()))?;
        Ok(NodeStyle {
            color: self.color(biogeography)?.to_string(),
            size: if tree_node.is_leaf() { LEAF_SIZE } else { INTERNAL_SIZE },
        })
    }
}
