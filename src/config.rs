//! Configuration management with layered loading
//!
//! Precedence (lowest to highest):
//! 1. Compiled defaults
//! 2. Global config: `$XDG_CONFIG_HOME/biogeo/biogeo.toml`
//! 3. Local config: `<dir>/.biogeo.toml` (usually the working directory)
//! 4. Environment variables: `BIOGEO_*` prefix

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use config::{Config, ConfigError, Environment};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::application::{ApplicationError, ColorMode, RegionGroup};
use crate::domain::biogeography::{DEFAULT_PRECISION, MAX_PRECISION};
use crate::domain::{Direction, RoundingPolicy};

const LOCAL_CONFIG_FILE: &str = ".biogeo.toml";

/// Unified configuration for biogeo.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct Settings {
    /// Decimals kept in stored distributions
    pub precision: u32,
    /// Whether rounded values feed parent nodes
    pub rounding: RoundingPolicy,
    /// Default colouring mode
    pub mode: ColorMode,
    /// Ladderize before analysis
    pub ladderize: Ladderize,
    /// Location code -> colour
    pub palette: BTreeMap<String, String>,
    /// Region groups for broad colouring, in tie-break order
    pub regions: Vec<RegionGroup>,
}

impl Default for Settings {
    fn default() -> Self {
        let palette = [
            ("SA", "green"),
            ("NA", "blue"),
            ("SEA", "red"),
            ("OC", "orange"),
            ("AF", "brown"),
            ("MAD", "chocolate"),
        ]
        .into_iter()
        .map(|(location, color)| (location.to_string(), color.to_string()))
        .collect();

        Self {
            precision: DEFAULT_PRECISION,
            rounding: RoundingPolicy::default(),
            mode: ColorMode::default(),
            ladderize: Ladderize::Descending,
            palette,
            regions: vec![
                RegionGroup::new("asian-pacific", "#D81B60", &["SEA", "OC"]),
                RegionGroup::new("americas", "#1E88E5", &["SA", "NA"]),
                RegionGroup::new("africa", "#FFC107", &["AF", "MAD"]),
            ],
        }
    }
}

/// Ladderize setting as written in config files and `BIOGEO_LADDERIZE`.
///
/// `none` is a value of its own so a later layer can switch off what an
/// earlier one turned on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Ladderize {
    /// Keep input order
    #[serde(alias = "off")]
    None,
    #[serde(alias = "asc")]
    Ascending,
    #[default]
    #[serde(alias = "desc")]
    Descending,
}

impl Ladderize {
    pub fn direction(self) -> Option<Direction> {
        match self {
            Self::None => None,
            Self::Ascending => Some(Direction::Ascending),
            Self::Descending => Some(Direction::Descending),
        }
    }
}

impl From<Option<Direction>> for Ladderize {
    fn from(direction: Option<Direction>) -> Self {
        match direction {
            None => Self::None,
            Some(Direction::Ascending) => Self::Ascending,
            Some(Direction::Descending) => Self::Descending,
        }
    }
}

impl FromStr for Ladderize {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "" | "none" | "off" => Ok(Self::None),
            other => other.parse::<Direction>().map(|d| Self::from(Some(d))),
        }
    }
}

/// Raw settings for intermediate parsing (`None` → not specified, inherit).
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct RawSettings {
    pub precision: Option<u32>,
    pub rounding: Option<RoundingPolicy>,
    pub mode: Option<ColorMode>,
    pub ladderize: Option<Ladderize>,
    pub palette: Option<BTreeMap<String, String>>,
    pub regions: Option<Vec<RegionGroup>>,
}

/// Get the XDG config directory for biogeo.
pub fn global_config_dir() -> Option<PathBuf> {
    ProjectDirs::from("", "", "biogeo").map(|dirs| dirs.config_dir().to_path_buf())
}

/// Get the path to the global config file.
pub fn global_config_path() -> Option<PathBuf> {
    global_config_dir().map(|dir| dir.join("biogeo.toml"))
}

/// Get the path to the local config file in `dir`.
pub fn local_config_path(dir: &Path) -> PathBuf {
    dir.join(LOCAL_CONFIG_FILE)
}

/// Load a TOML file into RawSettings for manual merging.
fn load_raw_settings(path: &Path) -> Result<RawSettings, ApplicationError> {
    let content = std::fs::read_to_string(path).map_err(|e| ApplicationError::Config {
        message: format!("read {}: {}", path.display(), e),
    })?;
    toml::from_str(&content).map_err(|e| ApplicationError::Config {
        message: format!("parse {}: {}", path.display(), e),
    })
}

impl Settings {
    /// Merge overlay config onto self (base).
    ///
    /// - Scalar options: overlay wins if Some, otherwise keep base
    /// - Palette: overlay entries are added or replace base entries
    /// - Regions: overlay replaces the whole list (order is the tie-break)
    pub fn merge_with(&self, overlay: &RawSettings) -> Self {
        let mut palette = self.palette.clone();
        if let Some(entries) = &overlay.palette {
            palette.extend(entries.iter().map(|(k, v)| (k.clone(), v.clone())));
        }
        Self {
            precision: overlay.precision.unwrap_or(self.precision),
            rounding: overlay.rounding.unwrap_or(self.rounding),
            mode: overlay.mode.unwrap_or(self.mode),
            ladderize: overlay.ladderize.unwrap_or(self.ladderize),
            palette,
            regions: overlay
                .regions
                .clone()
                .unwrap_or_else(|| self.regions.clone()),
        }
    }

    /// Load settings with layered precedence.
    ///
    /// # Arguments
    /// * `local_dir` - Optional directory searched for `.biogeo.toml`
    pub fn load(local_dir: Option<&Path>) -> Result<Self, ApplicationError> {
        Self::load_from(global_config_path().as_deref(), local_dir)
    }

    /// Like [`Settings::load`] with an explicit global config path.
    pub fn load_from(global: Option<&Path>, local_dir: Option<&Path>) -> Result<Self, ApplicationError> {
        // 1. Start with defaults
        let mut current = Self::default();

        // 2. Global config
        if let Some(global_path) = global {
            if global_path.exists() {
                debug!("loading global config: {}", global_path.display());
                current = current.merge_with(&load_raw_settings(global_path)?);
            }
        }

        // 3. Local config
        if let Some(dir) = local_dir {
            let local_path = local_config_path(dir);
            if local_path.exists() {
                debug!("loading local config: {}", local_path.display());
                current = current.merge_with(&load_raw_settings(&local_path)?);
            }
        }

        // 4. Environment variables (explicit override)
        current = Self::apply_env_overrides(current)?;

        current.validate()?;
        Ok(current)
    }

    /// Apply BIOGEO_* environment variables as explicit overrides.
    fn apply_env_overrides(mut settings: Self) -> Result<Self, ApplicationError> {
        let config = Config::builder()
            .add_source(Environment::with_prefix("BIOGEO").prefix_separator("_").separator("__"))
            .build()
            .map_err(config_err)?;

        if let Ok(val) = config.get_string("precision") {
            settings.precision = val.trim().parse().map_err(|_| ApplicationError::Config {
                message: format!("BIOGEO_PRECISION: not a number: {val}"),
            })?;
        }
        if let Ok(val) = config.get_string("rounding") {
            settings.rounding = val.parse().map_err(env_err("BIOGEO_ROUNDING"))?;
        }
        if let Ok(val) = config.get_string("mode") {
            settings.mode = val.parse().map_err(env_err("BIOGEO_MODE"))?;
        }
        if let Ok(val) = config.get_string("ladderize") {
            settings.ladderize = val.parse().map_err(env_err("BIOGEO_LADDERIZE"))?;
        }

        Ok(settings)
    }

    /// Reject settings the analysis cannot honour.
    pub fn validate(&self) -> Result<(), ApplicationError> {
        if self.precision > MAX_PRECISION {
            return Err(ApplicationError::Config {
                message: format!("precision {} exceeds maximum {}", self.precision, MAX_PRECISION),
            });
        }
        if let Some(region) = self.regions.iter().find(|r| r.members.is_empty()) {
            return Err(ApplicationError::Config {
                message: format!("region '{}' has no members", region.name),
            });
        }
        Ok(())
    }

    /// Show the effective configuration as TOML.
    pub fn to_toml(&self) -> Result<String, ApplicationError> {
        toml::to_string_pretty(self).map_err(|e| ApplicationError::Config {
            message: format!("serialize config: {e}"),
        })
    }

    /// Generate a template config file.
    pub fn template() -> String {
        r##"# biogeo configuration
#
# Locations (by precedence, lowest to highest):
#   Global: ~/.config/biogeo/biogeo.toml
#   Local:  ./.biogeo.toml
#   Env:    BIOGEO_PRECISION, BIOGEO_ROUNDING, BIOGEO_MODE, BIOGEO_LADDERIZE

# Decimals kept per node
# precision = 2

# "presentation": exact values feed parents, rounding only for display
# "per-node":     rounded values feed parents
# rounding = "presentation"

# "specific" (most probable location) or "broad" (most probable region)
# mode = "broad"

# Reorder children by clade size before analysis:
# "ascending", "descending" or "none" (keep input order)
# ladderize = "descending"

# Location colours, merged over the built-in table
[palette]
# SA = "green"
# NA = "blue"
# SEA = "red"
# OC = "orange"
# AF = "brown"
# MAD = "chocolate"

# Region groups for broad mode; replaces the built-in list, first group wins ties
# [[regions]]
# name = "americas"
# color = "#1E88E5"
# members = ["SA", "NA"]
"##
        .to_string()
    }
}

fn config_err(e: ConfigError) -> ApplicationError {
    ApplicationError::Config {
        message: e.to_string(),
    }
}

fn env_err(var: &'static str) -> impl Fn(String) -> ApplicationError {
    move |message| ApplicationError::Config {
        message: format!("{var}: {message}"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn given_defaults_when_created_then_matches_historic_palette() {
        let settings = Settings::default();
        assert_eq!(settings.precision, 2);
        assert_eq!(settings.palette.get("MAD").map(String::as_str), Some("chocolate"));
        assert_eq!(settings.regions.len(), 3);
        assert_eq!(settings.regions[0].name, "asian-pacific");
        assert_eq!(settings.mode, ColorMode::Broad);
    }

    #[test]
    fn given_overlay_when_merging_then_scalars_replace_and_palette_extends() {
        let overlay = RawSettings {
            precision: Some(3),
            palette: Some(BTreeMap::from([
                ("AF".to_string(), "#000000".to_string()),
                ("ATL".to_string(), "purple".to_string()),
            ])),
            ..RawSettings::default()
        };
        let merged = Settings::default().merge_with(&overlay);

        assert_eq!(merged.precision, 3);
        assert_eq!(merged.rounding, RoundingPolicy::Presentation);
        assert_eq!(merged.palette.get("AF").map(String::as_str), Some("#000000"));
        assert_eq!(merged.palette.get("ATL").map(String::as_str), Some("purple"));
        assert_eq!(merged.palette.get("SA").map(String::as_str), Some("green"));
        assert_eq!(merged.regions, Settings::default().regions);
    }

    #[test]
    fn given_overlay_regions_when_merging_then_replaces_list() {
        let overlay = RawSettings {
            regions: Some(vec![RegionGroup::new("old-world", "red", &["AF", "SEA"])]),
            ..RawSettings::default()
        };
        let merged = Settings::default().merge_with(&overlay);
        assert_eq!(merged.regions.len(), 1);
        assert_eq!(merged.regions[0].name, "old-world");
    }

    #[test]
    fn given_excessive_precision_when_validating_then_fails() {
        let settings = Settings {
            precision: MAX_PRECISION + 1,
            ..Settings::default()
        };
        assert!(matches!(settings.validate(), Err(ApplicationError::Config { .. })));
    }

    #[test]
    fn given_defaults_when_serializing_then_template_keys_round_trip() {
        let toml = Settings::default().to_toml().unwrap();
        let parsed: Settings = toml::from_str(&toml).unwrap();
        assert_eq!(parsed, Settings::default());

        let template: RawSettings = toml::from_str(&Settings::template()).unwrap();
        assert!(template.precision.is_none());
        assert_eq!(template.palette, Some(BTreeMap::new()));
    }

    #[test]
    fn given_env_overrides_when_loading_then_env_wins() {
        // the only test in this binary that touches BIOGEO_* variables
        std::env::set_var("BIOGEO_PRECISION", "3");
        std::env::set_var("BIOGEO_MODE", "specific");
        std::env::set_var("BIOGEO_LADDERIZE", "none");
        let loaded = Settings::load_from(None, None);
        std::env::remove_var("BIOGEO_PRECISION");
        std::env::remove_var("BIOGEO_MODE");
        std::env::remove_var("BIOGEO_LADDERIZE");

        let settings = loaded.unwrap();
        assert_eq!(settings.precision, 3);
        assert_eq!(settings.mode, ColorMode::Specific);
        assert_eq!(settings.ladderize, Ladderize::None);
    }

    #[test]
    fn given_ladderize_none_in_file_when_shown_then_reloads_as_none() {
        let raw: RawSettings = toml::from_str("ladderize = \"none\"\n").unwrap();
        assert_eq!(raw.ladderize, Some(Ladderize::None));

        let settings = Settings::default().merge_with(&raw);
        assert_eq!(settings.ladderize.direction(), None);

        let shown = settings.to_toml().unwrap();
        assert!(shown.contains("ladderize = \"none\""), "{shown}");
        let reloaded: Settings = toml::from_str(&shown).unwrap();
        assert_eq!(reloaded, settings);
    }

    #[test]
    fn given_ladderize_spellings_when_parsing_then_accepts_short_and_off() {
        assert_eq!("off".parse::<Ladderize>(), Ok(Ladderize::None));
        assert_eq!("".parse::<Ladderize>(), Ok(Ladderize::None));
        assert_eq!("Asc".parse::<Ladderize>(), Ok(Ladderize::Ascending));
        assert_eq!("descending".parse::<Ladderize>(), Ok(Ladderize::Descending));
        assert!("sideways".parse::<Ladderize>().is_err());

        let raw: RawSettings = toml::from_str("ladderize = \"off\"\n").unwrap();
        assert_eq!(raw.ladderize, Some(Ladderize::None));
    }
}
