//! Compiler policy configuration.
//!
//! Two behaviors of the compiler are policy rather than structure and can be
//! set from a YAML file:
//!
//! ```yaml
//! top_level_options: always        # or: suppress_when_required
//! inherited_conflicts: override    # or: reject
//! ```

use std::io::{BufReader, BufWriter};
use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// What happens to top-level options when the subcommand tree is required.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum TopLevelOptions {
    /// Top-level options, groups and mutex groups are always applied and may
    /// precede the subcommand token.
    #[default]
    Always,
    /// Legacy flat behavior: drop them (with a warning) when a subcommand is
    /// required.
    SuppressWhenRequired,
}

/// What happens when an option collides with one inherited from a parent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ConflictPolicy {
    /// The last-applied declaration replaces the inherited one.
    #[default]
    Override,
    /// Any collision with an inherited flag is a schema error.
    Reject,
}

/// Compiler policy settings.
///
/// # Examples
///
/// ```
/// use command_spec_compiler::{CompilerConfig, ConflictPolicy, TopLevelOptions};
///
/// let config: CompilerConfig = serde_yaml::from_str("inherited_conflicts: reject").unwrap();
/// assert_eq!(config.inherited_conflicts, ConflictPolicy::Reject);
/// assert_eq!(config.top_level_options, TopLevelOptions::Always);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(default, deny_unknown_fields)]
pub struct CompilerConfig {
    /// Top-level option policy.
    pub top_level_options: TopLevelOptions,
    /// Inherited flag collision policy.
    pub inherited_conflicts: ConflictPolicy,
}

/// Failure to load or save a [`CompilerConfig`].
#[derive(Debug, Error)]
pub enum ConfigError {
    /// File I/O failure.
    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),

    /// YAML parsing or serialization failure.
    #[error("YAML error: {0}")]
    YamlError(#[from] serde_yaml::Error),
}

impl CompilerConfig {
    /// Loads configuration from a YAML file.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::IoError`] if the file cannot be read, or
    /// [`ConfigError::YamlError`] if parsing fails.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let file = std::fs::File::open(path)?;
        let reader = BufReader::new(file);
        let config = serde_yaml::from_reader(reader)?;
        Ok(config)
    }

    /// Saves the configuration as YAML.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::IoError`] if the file cannot be written, or
    /// [`ConfigError::YamlError`] if serialization fails.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), ConfigError> {
        let file = std::fs::File::create(path)?;
        let writer = BufWriter::new(file);
        serde_yaml::to_writer(writer, self)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_deserialize_complete() {
        let yaml = "top_level_options: suppress_when_required\ninherited_conflicts: reject\n";
        let config: CompilerConfig = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(config.top_level_options, TopLevelOptions::SuppressWhenRequired);
        assert_eq!(config.inherited_conflicts, ConflictPolicy::Reject);
    }

    #[test]
    fn test_empty_mapping_is_default() {
        let config: CompilerConfig = serde_yaml::from_str("{}").unwrap();
        assert_eq!(config, CompilerConfig::default());
    }

    #[test]
    fn test_rejects_unknown_keys() {
        assert!(serde_yaml::from_str::<CompilerConfig>("strict: true").is_err());
    }

    #[test]
    fn test_load_save_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("compiler.yml");

        let original = CompilerConfig {
            top_level_options: TopLevelOptions::SuppressWhenRequired,
            inherited_conflicts: ConflictPolicy::Override,
        };
        original.save(&path).unwrap();

        assert_eq!(CompilerConfig::load(&path).unwrap(), original);
    }
}
