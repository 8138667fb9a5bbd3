use rust_decimal::Decimal;
use serde::Deserialize;
use std::{fs, path::Path};

use crate::models::NFE_NAMESPACE;

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    #[serde(default = "default_log_filter")]
    pub log_filter: String,
    #[serde(default)]
    pub engine: EngineSettings,
}

fn default_log_filter() -> String {
    "info".to_string()
}

/// Tunables for weight resolution and reconciliation.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct EngineSettings {
    /// Namespace tried first when the root declares no default namespace.
    #[serde(default = "default_namespace")]
    pub namespace: String,
    /// Declared vs. audited item weight difference tolerated before the
    /// audited value replaces the declared one.
    #[serde(default = "default_item_tolerance_kg")]
    pub item_tolerance_kg: Decimal,
    /// Maximum item/volume net weight difference, in percent of the item sum,
    /// for the volume sum to win.
    #[serde(default = "default_volume_tolerance_pct")]
    pub volume_tolerance_pct: Decimal,
    /// Gross = net * markup when volumes carry no gross weight.
    #[serde(default = "default_gross_markup")]
    pub gross_markup: Decimal,
}

fn default_namespace() -> String {
    NFE_NAMESPACE.to_string()
}

fn default_item_tolerance_kg() -> Decimal {
    Decimal::new(1, 2)
}

fn default_volume_tolerance_pct() -> Decimal {
    Decimal::from(5)
}

fn default_gross_markup() -> Decimal {
    Decimal::new(1035, 3)
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            namespace: default_namespace(),
            item_tolerance_kg: default_item_tolerance_kg(),
            volume_tolerance_pct: default_volume_tolerance_pct(),
            gross_markup: default_gross_markup(),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            log_filter: default_log_filter(),
            engine: EngineSettings::default(),
        }
    }
}

impl Config {
    pub fn load(path: impl AsRef<Path>) -> Result<Self, Box<dyn std::error::Error>> {
        let content = fs::read_to_string(path)?;
        Self::from_toml(&content)
    }

    pub fn from_toml(content: &str) -> Result<Self, Box<dyn std::error::Error>> {
        Ok(toml::from_str(content)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_file_matches_default() {
        let cfg = Config::from_toml("").unwrap();
        assert_eq!(cfg.log_filter, "info");
        assert_eq!(cfg.engine, EngineSettings::default());
    }

    #[test]
    fn test_engine_overrides() {
        let cfg = Config::from_toml(
            r#"
log_filter = "debug"

[engine]
namespace = "urn:example"
volume_tolerance_pct = 10
gross_markup = "1.05"
"#,
        )
        .unwrap();
        assert_eq!(cfg.log_filter, "debug");
        assert_eq!(cfg.engine.namespace, "urn:example");
        assert_eq!(cfg.engine.volume_tolerance_pct, Decimal::from(10));
        assert_eq!(cfg.engine.gross_markup, Decimal::new(105, 2));
        assert_eq!(cfg.engine.item_tolerance_kg, Decimal::new(1, 2));
    }

    #[test]
    fn test_missing_file() {
        assert!(Config::load("does/not/exist.toml").is_err());
    }
}
