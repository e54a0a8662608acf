//! Configuration file handling.
//!
//! This module handles loading, validating and merging configuration from
//! `.fittally.toml` files.

use crate::analysis::{ColorAssigner, ColorFamily, Palette, ShadeRange, Thresholds};
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::Path;
use thiserror::Error;

/// Default config file name, looked up in the current directory.
pub const CONFIG_FILE_NAME: &str = ".fittally.toml";

/// Root configuration structure.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// General settings.
    #[serde(default)]
    pub general: GeneralConfig,

    /// Band thresholds.
    #[serde(default)]
    pub thresholds: Thresholds,

    /// Shade range for same-variant series.
    #[serde(default)]
    pub shading: ShadeRange,

    /// Variant colour registry.
    #[serde(default)]
    pub palette: PaletteConfig,
}

/// General application settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeneralConfig {
    /// Directory containing the trial files.
    #[serde(default = "default_data_dir")]
    pub data_dir: String,

    /// Default output file path.
    #[serde(default = "default_output")]
    pub output: String,

    /// Enable verbose logging by default.
    #[serde(default)]
    pub verbose: bool,

    /// Number of files loaded concurrently.
    #[serde(default = "default_concurrency")]
    pub concurrency: usize,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
            output: default_output(),
            verbose: false,
            concurrency: default_concurrency(),
        }
    }
}

fn default_data_dir() -> String {
    "Data".to_string()
}

fn default_output() -> String {
    "fittally_report.md".to_string()
}

fn default_concurrency() -> usize {
    4
}

/// One variant → colour family mapping.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VariantColor {
    pub name: String,
    pub family: ColorFamily,
}

/// Variant colour registry, in canonical column order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaletteConfig {
    #[serde(default = "default_variants")]
    pub variants: Vec<VariantColor>,
}

impl Default for PaletteConfig {
    fn default() -> Self {
        Self {
            variants: default_variants(),
        }
    }
}

fn default_variants() -> Vec<VariantColor> {
    Palette::default()
        .entries()
        .iter()
        .map(|(name, family)| VariantColor {
            name: name.clone(),
            family: *family,
        })
        .collect()
}

impl From<&PaletteConfig> for Palette {
    fn from(config: &PaletteConfig) -> Self {
        Palette::new(
            config
                .variants
                .iter()
                .map(|v| (v.name.clone(), v.family))
                .collect(),
        )
    }
}

/// Invalid configuration values.
#[derive(Debug, Error, PartialEq)]
pub enum ConfigError {
    #[error("thresholds.low ({low}) must be below thresholds.high ({high})")]
    ThresholdOrder { low: f64, high: f64 },

    #[error("shading values must satisfy 0 <= low <= mid <= high <= 1 and low < high")]
    ShadeRange,

    #[error("palette lists variant '{0}' more than once")]
    DuplicateVariant(String),

    #[error("general.concurrency must be at least 1")]
    Concurrency,
}

impl Config {
    /// Load configuration from a file path.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config: Config = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        Ok(config)
    }

    /// Try to load configuration from the default location.
    ///
    /// Returns `Ok(None)` if the file doesn't exist, `Err` if it exists but can't be parsed.
    pub fn load_default() -> Result<Option<Self>> {
        let default_path = Path::new(CONFIG_FILE_NAME);

        if default_path.exists() {
            Ok(Some(Self::load(default_path)?))
        } else {
            Ok(None)
        }
    }

    /// Check value ranges and palette uniqueness.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let t = &self.thresholds;
        let ordered = t.low < t.high;
        if !ordered {
            return Err(ConfigError::ThresholdOrder {
                low: t.low,
                high: t.high,
            });
        }

        let s = &self.shading;
        let in_unit = |v: f64| (0.0..=1.0).contains(&v);
        let ordered = s.low <= s.mid && s.mid <= s.high && s.low < s.high;
        if !(in_unit(s.low) && in_unit(s.mid) && in_unit(s.high) && ordered) {
            return Err(ConfigError::ShadeRange);
        }

        let mut seen = HashSet::new();
        for variant in &self.palette.variants {
            if !seen.insert(variant.name.as_str()) {
                return Err(ConfigError::DuplicateVariant(variant.name.clone()));
            }
        }

        if self.general.concurrency == 0 {
            return Err(ConfigError::Concurrency);
        }

        Ok(())
    }

    /// Merge this configuration with CLI arguments.
    ///
    /// CLI arguments take precedence over config file settings.
    /// This method only overrides config when CLI provides explicit values.
    pub fn merge_with_args(&mut self, args: &crate::cli::Args) {
        if let Some(ref dir) = args.data_dir {
            self.general.data_dir = dir.display().to_string();
        }
        if let Some(ref output) = args.output {
            self.general.output = output.display().to_string();
        }
        if let Some(concurrency) = args.concurrency {
            self.general.concurrency = concurrency;
        }

        // Flags always override
        if args.verbose {
            self.general.verbose = true;
        }
    }

    /// Log level after merging: `quiet` wins, then `general.verbose`.
    pub fn log_level(&self, quiet: bool) -> tracing::Level {
        if quiet {
            tracing::Level::ERROR
        } else if self.general.verbose {
            tracing::Level::DEBUG
        } else {
            tracing::Level::INFO
        }
    }

    /// Build the colour assigner handed to the aggregation engine.
    pub fn color_assigner(&self) -> ColorAssigner {
        ColorAssigner::new(
            Palette::from(&self.palette),
            self.shading,
            self.thresholds,
        )
    }

    /// Generate a default configuration file content.
    pub fn default_toml() -> String {
        let config = Config::default();
        toml::to_string_pretty(&config).unwrap_or_else(|_| String::new())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::{Args, OutputFormat, ViewMode};
    use clap::Parser;
    use std::path::PathBuf;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.general.data_dir, "Data");
        assert_eq!(config.thresholds.low, 100.0);
        assert_eq!(config.thresholds.high, 1000.0);
        assert_eq!(config.shading.mid, 0.6);
        assert_eq!(config.palette.variants.len(), 6);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_default_palette_matches_builtin() {
        let from_config = Palette::from(&PaletteConfig::default());
        assert_eq!(from_config, Palette::default());
    }

    #[test]
    fn test_parse_config() {
        let toml_content = r#"
[general]
data_dir = "trials"
verbose = true

[thresholds]
low = 50.0
high = 500.0

[[palette.variants]]
name = "Custom"
family = "greens"

[[palette.variants]]
name = "FFP2"
family = "ylorbr"
"#;

        let config: Config = toml::from_str(toml_content).unwrap();
        assert_eq!(config.general.data_dir, "trials");
        assert!(config.general.verbose);
        assert_eq!(config.general.concurrency, 4);
        assert_eq!(config.thresholds.high, 500.0);
        assert_eq!(config.shading, ShadeRange::default());

        let palette = Palette::from(&config.palette);
        assert_eq!(palette.family_for("Custom"), ColorFamily::Greens);
        assert_eq!(palette.family_for("FFP2"), ColorFamily::YlOrBr);
        assert_eq!(palette.family_for("FFP3"), ColorFamily::Greys);
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        let mut config = Config::default();
        config.thresholds = Thresholds {
            low: 1000.0,
            high: 100.0,
        };
        assert!(matches!(
            config.validate(),
            Err(ConfigError::ThresholdOrder { .. })
        ));

        let mut config = Config::default();
        config.shading.high = 1.5;
        assert_eq!(config.validate(), Err(ConfigError::ShadeRange));

        let mut config = Config::default();
        config.palette.variants.push(VariantColor {
            name: "FFP3".to_string(),
            family: ColorFamily::Blues,
        });
        assert_eq!(
            config.validate(),
            Err(ConfigError::DuplicateVariant("FFP3".to_string()))
        );
    }

    #[test]
    fn test_merge_with_args() {
        let args = Args {
            data_dir: Some(PathBuf::from("elsewhere")),
            subjects: vec!["all".to_string()],
            variants: vec!["all".to_string()],
            exercises: vec!["all".to_string()],
            output: None,
            format: OutputFormat::Json,
            view: ViewMode::Tables,
            config: None,
            verbose: true,
            quiet: false,
            concurrency: Some(8),
            dry_run: false,
            init_config: false,
        };

        let mut config = Config::default();
        config.merge_with_args(&args);
        assert_eq!(config.general.data_dir, "elsewhere");
        assert_eq!(config.general.output, "fittally_report.md");
        assert_eq!(config.general.concurrency, 8);
        assert!(config.general.verbose);
    }

    #[test]
    fn test_log_level_follows_config_verbose() {
        let mut config = Config::default();
        assert_eq!(config.log_level(false), tracing::Level::INFO);

        let from_file: Config = toml::from_str("[general]\nverbose = true\n").unwrap();
        assert_eq!(from_file.log_level(false), tracing::Level::DEBUG);
        assert_eq!(from_file.log_level(true), tracing::Level::ERROR);

        let args = Args::try_parse_from(["fittally", "--verbose"]).unwrap();
        config.merge_with_args(&args);
        assert_eq!(config.log_level(args.quiet), tracing::Level::DEBUG);
    }

    #[test]
    fn test_default_toml_generation() {
        let toml_str = Config::default_toml();
        assert!(toml_str.contains("[general]"));
        assert!(toml_str.contains("[thresholds]"));
        assert!(toml_str.contains("[shading]"));
        assert!(toml_str.contains("[[palette.variants]]"));

        let round: Config = toml::from_str(&toml_str).unwrap();
        assert_eq!(round.palette.variants, PaletteConfig::default().variants);
    }
}
