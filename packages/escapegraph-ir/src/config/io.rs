//! Configuration I/O (YAML loading and export)
//!
//! Schema v1:
//!
//! ```yaml
//! version: 1
//! preset: balanced
//! overrides:
//!   diagnostic_level: 1
//!   max_walk_rounds: 50000
//! ```

use super::error::{ConfigError, ConfigResult};
use super::escape_config::{EscapeConfig, EscapeConfigPatch};
use super::preset::Preset;
use serde::{Deserialize, Serialize};
use std::path::Path;

const SUPPORTED_VERSIONS: &[u32] = &[1];

/// YAML Schema v1
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ConfigExportV1 {
    /// Schema version (always 1 for v1)
    pub version: Option<u32>,

    /// Base preset
    pub preset: String,

    /// Fine-grained overrides
    #[serde(skip_serializing_if = "Option::is_none")]
    pub overrides: Option<EscapeConfigPatch>,
}

impl EscapeConfig {
    /// Parse a v1 YAML document, apply overrides over the preset, validate.
    pub fn from_yaml_str(yaml: &str) -> ConfigResult<Self> {
        let doc: ConfigExportV1 = serde_yaml::from_str(yaml)?;

        let version = doc.version.ok_or(ConfigError::MissingVersion)?;
        if !SUPPORTED_VERSIONS.contains(&version) {
            return Err(ConfigError::UnsupportedVersion {
                found: version,
                supported: SUPPORTED_VERSIONS.to_vec(),
            });
        }

        let preset: Preset = doc.preset.parse()?;
        let base = EscapeConfig::from_preset(preset);
        let config = match doc.overrides {
            Some(patch) => patch.apply(base),
            None => base,
        };

        config.validate()?;
        Ok(config)
    }

    /// Load a v1 YAML file
    pub fn from_yaml_file(path: impl AsRef<Path>) -> ConfigResult<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_yaml_str(&content)
    }

    /// Export as a self-contained v1 document (custom preset, all fields)
    pub fn to_yaml(&self) -> ConfigResult<String> {
        let doc = ConfigExportV1 {
            version: Some(1),
            preset: Preset::Custom.as_str().to_string(),
            overrides: Some(EscapeConfigPatch {
                diagnostic_level: Some(self.diagnostic_level),
                precise_recursive_calls: Some(self.precise_recursive_calls),
                enable_parallel: Some(self.enable_parallel),
                num_threads: Some(self.num_threads),
                parallel_threshold: Some(self.parallel_threshold),
                max_walk_rounds: Some(self.max_walk_rounds),
            }),
        };
        Ok(serde_yaml::to_string(&doc)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_yaml_loading() {
        let yaml = r#"
version: 1
preset: fast
overrides:
  diagnostic_level: 1
  precise_recursive_calls: true
"#;
        let config = EscapeConfig::from_yaml_str(yaml).unwrap();
        assert_eq!(config.diagnostic_level, 1);
        assert!(config.precise_recursive_calls);
        assert_eq!(config.max_walk_rounds, 1_000_000);
    }

    #[test]
    fn test_yaml_missing_version() {
        let result = EscapeConfig::from_yaml_str("preset: fast\n");
        assert!(matches!(result, Err(ConfigError::MissingVersion)));
    }

    #[test]
    fn test_yaml_unsupported_version() {
        let result = EscapeConfig::from_yaml_str("version: 7\npreset: fast\n");
        assert!(matches!(
            result,
            Err(ConfigError::UnsupportedVersion { found: 7, .. })
        ));
    }

    #[test]
    fn test_yaml_unknown_override_rejected() {
        let yaml = "version: 1\npreset: fast\noverrides:\n  max_depth: 3\n";
        assert!(matches!(
            EscapeConfig::from_yaml_str(yaml),
            Err(ConfigError::Yaml(_))
        ));
    }

    #[test]
    fn test_yaml_invalid_override_fails_validation() {
        let yaml = "version: 1\npreset: balanced\noverrides:\n  diagnostic_level: 9\n";
        assert!(matches!(
            EscapeConfig::from_yaml_str(yaml),
            Err(ConfigError::Range { .. })
        ));
    }

    #[test]
    fn test_yaml_roundtrip() {
        let config = EscapeConfig::from_preset(Preset::Thorough).max_walk_rounds(42);
        let yaml = config.to_yaml().unwrap();
        assert!(yaml.contains("version: 1"));
        assert!(yaml.contains("preset: custom"));

        let recovered = EscapeConfig::from_yaml_str(&yaml).unwrap();
        assert_eq!(recovered, config);
    }
}
