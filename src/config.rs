//! Configuration management with layered loading
//!
//! Precedence (lowest to highest):
//! 1. Compiled defaults
//! 2. Global config: `$XDG_CONFIG_HOME/treesync/treesync.toml`
//! 3. Local config: `<document_dir>/.treesync.toml`
//! 4. Environment variables: `TREESYNC_*` prefix

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use config::{Config, ConfigError, Environment};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::application::ApplicationError;
use crate::domain::DEFAULT_MAX_SYNC_DEPTH;

/// Definition of one node kind.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct KindSettings {
    /// Traits shared by every node of the kind
    pub traits: Vec<String>,
    /// Kind this one extends (tag of the base kind)
    pub base: Option<String>,
}

/// Raw settings for intermediate parsing.
///
/// `None` means "not specified, inherit from the lower layer".
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct RawSettings {
    pub max_sync_depth: Option<usize>,
    pub default_kind: Option<String>,
    pub kinds: Option<BTreeMap<String, KindSettings>>,
}

/// Unified configuration for treesync.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct Settings {
    /// Depth at which a synchronization chain is reported as not settling
    pub max_sync_depth: usize,
    /// Tag given to records that declare none
    pub default_kind: Option<String>,
    /// Node kinds keyed by tag
    pub kinds: BTreeMap<String, KindSettings>,
}

impl Default for Settings {
    fn default() -> Self {
        let kind = |traits: &[&str], base: Option<&str>| KindSettings {
            traits: traits.iter().map(|t| t.to_string()).collect(),
            base: base.map(str::to_string),
        };
        let mut kinds = BTreeMap::new();
        kinds.insert("group".to_string(), kind(&["container"], None));
        kinds.insert("series".to_string(), kind(&["x", "y"], None));
        kinds.insert("axis".to_string(), kind(&["x"], None));

        Self {
            max_sync_depth: DEFAULT_MAX_SYNC_DEPTH,
            default_kind: None,
            kinds,
        }
    }
}

/// Get the XDG config directory for treesync.
pub fn global_config_dir() -> Option<PathBuf> {
    ProjectDirs::from("", "", "treesync").map(|dirs| dirs.config_dir().to_path_buf())
}

/// Get the path to the global config file.
pub fn global_config_path() -> Option<PathBuf> {
    global_config_dir().map(|dir| dir.join("treesync.toml"))
}

/// Get the path to the local config file in a document directory.
pub fn local_config_path(dir: &Path) -> PathBuf {
    dir.join(".treesync.toml")
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
    /// Merge kind maps with union semantics and negation support.
    ///
    /// - Kinds from overlay are added to (or replace same-tag entries in) base
    /// - A key prefixed with `!` removes the corresponding kind
    ///
    /// # Examples
    /// ```ignore
    /// merge_kinds({group, series}, {axis})     // → {axis, group, series}
    /// merge_kinds({group, series}, {"!group"}) // → {series}
    /// ```
    pub fn merge_kinds(
        base: &BTreeMap<String, KindSettings>,
        overlay: &BTreeMap<String, KindSettings>,
    ) -> BTreeMap<String, KindSettings> {
        let mut result = base.clone();
        for (tag, kind) in overlay {
            if let Some(negated) = tag.strip_prefix('!') {
                result.remove(negated);
            } else {
                result.insert(tag.clone(), kind.clone());
            }
        }
        result
    }

    /// Merge overlay config onto self (base) with union semantics for kinds.
    fn merge_with(&self, overlay: &RawSettings) -> Self {
        Self {
            max_sync_depth: overlay.max_sync_depth.unwrap_or(self.max_sync_depth),
            default_kind: overlay
                .default_kind
                .clone()
                .or_else(|| self.default_kind.clone()),
            kinds: overlay
                .kinds
                .as_ref()
                .map(|k| Self::merge_kinds(&self.kinds, k))
                .unwrap_or_else(|| self.kinds.clone()),
        }
    }

    /// Apply global config onto defaults with REPLACE semantics for kinds.
    ///
    /// Unlike `merge_with()` which uses union semantics, this method replaces
    /// the kind table entirely if the global config specifies one.
    fn apply_global(&self, global: &RawSettings) -> Self {
        Self {
            max_sync_depth: global.max_sync_depth.unwrap_or(self.max_sync_depth),
            default_kind: global
                .default_kind
                .clone()
                .or_else(|| self.default_kind.clone()),
            kinds: global.kinds.clone().unwrap_or_else(|| self.kinds.clone()),
        }
    }

    /// Load settings with layered precedence.
    ///
    /// # Arguments
    /// * `local_dir` - Optional directory holding a `.treesync.toml`
    ///
    /// # Kind Merge Semantics
    /// - Defaults → Global: REPLACE (global defines the real baseline)
    /// - Global → Local: UNION with `!tag` removal
    /// - Env vars override scalars only
    pub fn load(local_dir: Option<&Path>) -> Result<Self, ApplicationError> {
        let mut current = Self::default();

        if let Some(global_path) = global_config_path() {
            if global_path.exists() {
                debug!(path = %global_path.display(), "loading global config");
                let raw = load_raw_settings(&global_path)?;
                current = current.apply_global(&raw);
            }
        }

        if let Some(dir) = local_dir {
            let local_path = local_config_path(dir);
            if local_path.exists() {
                debug!(path = %local_path.display(), "loading local config");
                let raw = load_raw_settings(&local_path)?;
                current = current.merge_with(&raw);
            }
        }

        current = Self::apply_env_overrides(current)?;
        current.validate()?;
        Ok(current)
    }

    /// Apply TREESYNC_* environment variables as explicit overrides.
    fn apply_env_overrides(mut settings: Self) -> Result<Self, ApplicationError> {
        let config = Config::builder()
            .add_source(Environment::with_prefix("TREESYNC").separator("__"))
            .build()
            .map_err(config_err)?;

        if let Ok(val) = config.get_int("max_sync_depth") {
            settings.max_sync_depth = usize::try_from(val).map_err(|_| ApplicationError::Config {
                message: format!("max_sync_depth must be positive, got {}", val),
            })?;
        }
        if let Ok(val) = config.get_string("default_kind") {
            settings.default_kind = Some(val);
        }

        Ok(settings)
    }

    fn validate(&self) -> Result<(), ApplicationError> {
        if self.max_sync_depth == 0 {
            return Err(ApplicationError::Config {
                message: "max_sync_depth must be at least 1".to_string(),
            });
        }
        if let Some(kind) = &self.default_kind {
            if !self.kinds.contains_key(kind) {
                return Err(ApplicationError::Config {
                    message: format!("default_kind '{}' is not a configured kind", kind),
                });
            }
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
        r#"# treesync configuration
#
# Locations (by precedence, lowest to highest):
#   Global: ~/.config/treesync/treesync.toml  (defines your baseline)
#   Local:  <document_dir>/.treesync.toml     (document-specific additions)
#   Env:    TREESYNC_* environment variables  (explicit overrides)
#
# Kind Merge Semantics:
#   Global config REPLACES the compiled kind table.
#   Local config UNIONS with global (adds or redefines kinds).
#   Use a "!tag" key in local config to REMOVE an inherited kind:
#     [kinds."!axis"]

# Synchronization chains deeper than this are reported as not settling
# max_sync_depth = 256

# Tag for records that declare none
# default_kind = "group"

[kinds.group]
traits = ["container"]

[kinds.series]
traits = ["x", "y"]

# A kind may extend another and inherit its traits
# [kinds.area]
# base = "series"
# traits = ["filled"]
"#
        .to_string()
    }
}

fn config_err(e: ConfigError) -> ApplicationError {
    ApplicationError::Config {
        message: e.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(tags: &[&str]) -> BTreeMap<String, KindSettings> {
        tags.iter()
            .map(|t| (t.to_string(), KindSettings::default()))
            .collect()
    }

    #[test]
    fn given_default_settings_when_created_then_has_builtin_kinds() {
        let settings = Settings::default();
        assert_eq!(settings.max_sync_depth, DEFAULT_MAX_SYNC_DEPTH);
        assert!(settings.kinds.contains_key("group"));
        assert_eq!(settings.kinds["series"].traits, vec!["x", "y"]);
    }

    #[test]
    fn test_merge_kinds_union() {
        let merged = Settings::merge_kinds(&kinds(&["group", "series"]), &kinds(&["axis"]));
        assert_eq!(
            merged.keys().collect::<Vec<_>>(),
            vec!["axis", "group", "series"]
        );
    }

    #[test]
    fn test_merge_kinds_negation() {
        let merged = Settings::merge_kinds(&kinds(&["group", "series"]), &kinds(&["!group"]));
        assert_eq!(merged.keys().collect::<Vec<_>>(), vec!["series"]);
    }

    #[test]
    fn test_merge_kinds_negation_nonexistent() {
        let merged = Settings::merge_kinds(&kinds(&["group"]), &kinds(&["!axis"]));
        assert_eq!(merged.keys().collect::<Vec<_>>(), vec!["group"]);
    }

    #[test]
    fn test_apply_global_replaces_kinds() {
        let global = RawSettings {
            kinds: Some(kinds(&["panel"])),
            ..RawSettings::default()
        };

        let settings = Settings::default().apply_global(&global);

        assert_eq!(settings.kinds.keys().collect::<Vec<_>>(), vec!["panel"]);
    }

    #[test]
    fn test_merge_with_keeps_base_when_not_specified() {
        let settings = Settings::default().merge_with(&RawSettings::default());
        assert_eq!(settings, Settings::default());
    }

    #[test]
    fn given_unknown_default_kind_when_validating_then_config_error() {
        let settings = Settings {
            default_kind: Some("missing".to_string()),
            ..Settings::default()
        };
        assert!(matches!(
            settings.validate(),
            Err(ApplicationError::Config { .. })
        ));
    }

    #[test]
    fn given_settings_when_to_toml_then_round_trips_through_raw() {
        let toml = Settings::default().to_toml().unwrap();
        let raw: RawSettings = toml::from_str(&toml).unwrap();
        assert_eq!(raw.kinds.unwrap().len(), 3);
    }

    #[test]
    fn given_template_when_parsed_then_is_valid_toml() {
        let raw: RawSettings = toml::from_str(&Settings::template()).unwrap();
        assert!(raw.kinds.unwrap().contains_key("series"));
    }
}
