//! Location distributions and their rounding.

use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::domain::label::LocationCode;

/// Probability in `[0, 1]`.
pub type Probability = f64;

/// Default number of decimals kept in stored distributions.
pub const DEFAULT_PRECISION: u32 = 2;

/// Largest supported precision; beyond this the integer step arithmetic
/// stops being exact in `f64`.
pub const MAX_PRECISION: u32 = 9;

/// Which values an internal node aggregates from its children.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum RoundingPolicy {
    /// Exact child values feed the parent; rounding only affects what is stored.
    #[default]
    Presentation,
    /// Rounded child values feed the parent, so rounding error compounds with depth.
    PerNode,
}

impl fmt::Display for RoundingPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Presentation => f.write_str("presentation"),
            Self::PerNode => f.write_str("per-node"),
        }
    }
}

impl FromStr for RoundingPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "presentation" => Ok(Self::Presentation),
            "per-node" | "pernode" => Ok(Self::PerNode),
            other => Err(format!(
                "unknown rounding policy '{other}' (expected presentation or per-node)"
            )),
        }
    }
}

/// Unrounded distribution in first-encountered order.
///
/// Adding to an existing location sums into it; new locations are appended.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Distribution {
    entries: Vec<(LocationCode, Probability)>,
    positions: HashMap<LocationCode, usize>,
}

impl Distribution {
    /// `{location: 1.0}`
    pub fn certain(location: LocationCode) -> Self {
        let mut dist = Self::default();
        dist.add(location, 1.0);
        dist
    }

    pub fn add(&mut self, location: LocationCode, p: Probability) {
        match self.positions.get(&location) {
            Some(&pos) => self.entries[pos].1 += p,
            None => {
                self.positions.insert(location.clone(), self.entries.len());
                self.entries.push((location, p));
            }
        }
    }

    pub fn entries(&self) -> &[(LocationCode, Probability)] {
        &self.entries
    }

    pub fn into_entries(self) -> Vec<(LocationCode, Probability)> {
        self.entries
    }

    pub fn total(&self) -> Probability {
        self.entries.iter().map(|(_, p)| p).sum()
    }

    /// Round to `decimals` places with the largest-remainder method.
    ///
    /// Every value is floored to the step `10^-decimals`; the steps still
    /// missing to reach 1 go to the largest remainders, earlier entries first
    /// on ties. The result sums to exactly one in steps and no value moves
    /// by a full step. Entry order is preserved.
    pub fn rounded(&self, decimals: u32) -> Distribution {
        let scale = 10f64.powi(decimals.min(MAX_PRECISION) as i32);
        let target = scale as i64;

        let mut units: Vec<i64> = Vec::with_capacity(self.entries.len());
        let mut remainders: Vec<(usize, f64)> = Vec::with_capacity(self.entries.len());
        for (i, (_, p)) in self.entries.iter().enumerate() {
            let scaled = p * scale;
            let floor = scaled.floor();
            units.push(floor as i64);
            remainders.push((i, scaled - floor));
        }

        let assigned: i64 = units.iter().sum();
        let missing = (target - assigned).clamp(0, units.len() as i64) as usize;
        // stable: equal remainders keep first-encountered order
        remainders.sort_by(|a, b| b.1.total_cmp(&a.1));
        for &(i, _) in remainders.iter().take(missing) {
            units[i] += 1;
        }

        let mut rounded = Distribution::default();
        for ((location, _), unit) in self.entries.iter().zip(units) {
            rounded.add(location.clone(), unit as f64 / scale);
        }
        rounded
    }
}

/// Rounded location distribution of one node, ordered by descending
/// probability with ties in first-encountered order.
#[derive(Debug, Clone, PartialEq)]
pub struct Biogeography {
    entries: Vec<(LocationCode, Probability)>,
    precision: u32,
}

impl Biogeography {
    /// Order an already rounded distribution for storage.
    pub fn from_rounded(rounded: &Distribution, precision: u32) -> Self {
        let mut entries = rounded.entries().to_vec();
        // sort_by is stable
        entries.sort_by(|a, b| b.1.total_cmp(&a.1));
        Self { entries, precision }
    }

    pub fn iter(&self) -> impl Iterator<Item = (&LocationCode, Probability)> {
        self.entries.iter().map(|(location, p)| (location, *p))
    }

    pub fn get(&self, location: &str) -> Option<Probability> {
        self.entries
            .iter()
            .find(|(code, _)| code.as_str() == location)
            .map(|(_, p)| *p)
    }

    /// Most probable location; the first one on ties.
    pub fn dominant(&self) -> Option<(&LocationCode, Probability)> {
        self.entries.first().map(|(location, p)| (location, *p))
    }

    pub fn locations(&self) -> impl Iterator<Item = &LocationCode> {
        self.entries.iter().map(|(location, _)| location)
    }

    pub fn total(&self) -> Probability {
        self.entries.iter().map(|(_, p)| p).sum()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn precision(&self) -> u32 {
        self.precision
    }
}

impl fmt::Display for Biogeography {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let precision = self.precision as usize;
        for (i, (location, p)) in self.entries.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{location} {p:.precision$}")?;
        }
        Ok(())
    }
}
