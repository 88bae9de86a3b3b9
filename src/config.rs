//! Engine configuration, persisted as TOML.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Result type for configuration operations.
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

fn default_max_iterations() -> u64 {
    100
}
fn default_max_angles_per_iteration() -> usize {
    2_000
}
fn default_branch_base() -> usize {
    10
}
fn default_branch_scale() -> f64 {
    10.0
}

/// Configuration for the discovery engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Safety ceiling on loop iterations (default: 100).
    #[serde(default = "default_max_iterations")]
    pub max_iterations: u64,
    /// When set, angles at this depth or deeper do not branch further.
    /// Unset by default, so every signal branches.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_branch_depth: Option<u32>,
    /// Upper bound on the worklist of a single iteration (default: 2000).
    /// This is what keeps a persistently signalling executor from growing an
    /// iteration forever.
    #[serde(default = "default_max_angles_per_iteration")]
    pub max_angles_per_iteration: usize,
    /// Branch fan-out is `branch_base + round(branch_scale * strength)`.
    #[serde(default = "default_branch_base")]
    pub branch_base: usize,
    #[serde(default = "default_branch_scale")]
    pub branch_scale: f64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            max_iterations: default_max_iterations(),
            max_branch_depth: None,
            max_angles_per_iteration: default_max_angles_per_iteration(),
            branch_base: default_branch_base(),
            branch_scale: default_branch_scale(),
        }
    }
}

impl EngineConfig {
    /// Number of branch angles to request for a signal of `strength`.
    pub fn branch_count(&self, strength: f64) -> usize {
        let scaled = (self.branch_scale * strength.clamp(0.0, 1.0)).round();
        self.branch_base + scaled.max(0.0) as usize
    }

    /// Reject values the engine cannot run with.
    pub fn validate(&self) -> ConfigResult<()> {
        if self.max_iterations == 0 {
            return Err(ConfigError::Invalid {
                message: "max_iterations must be at least 1".into(),
            });
        }
        if !self.branch_scale.is_finite() {
            return Err(ConfigError::Invalid {
                message: format!("branch_scale must be finite, got {}", self.branch_scale),
            });
        }
        Ok(())
    }

    /// Load from a TOML file. Missing fields take their defaults.
    pub fn load(path: &Path) -> ConfigResult<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::Read {
            path: path.display().to_string(),
            source: e,
        })?;
        let config: Self = toml::from_str(&content).map_err(|e| ConfigError::Parse {
            path: path.display().to_string(),
            message: e.to_string(),
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Save to a TOML file, creating parent directories.
    pub fn save(&self, path: &Path) -> ConfigResult<()> {
        let content = toml::to_string_pretty(self).map_err(|e| ConfigError::Parse {
            path: path.display().to_string(),
            message: e.to_string(),
        })?;
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| ConfigError::Write {
                path: parent.display().to_string(),
                source: e,
            })?;
        }
        std::fs::write(path, content).map_err(|e| ConfigError::Write {
            path: path.display().to_string(),
            source: e,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let config = EngineConfig::default();
        assert_eq!(config.max_iterations, 100);
        assert_eq!(config.branch_base, 10);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn branch_count_scales_with_strength() {
        let config = EngineConfig::default();
        assert_eq!(config.branch_count(0.0), 10);
        assert_eq!(config.branch_count(0.8), 18);
        assert_eq!(config.branch_count(0.25), 13);
        assert_eq!(config.branch_count(1.0), 20);
    }

    #[test]
    fn partial_toml_fills_defaults() {
        let config: EngineConfig = toml::from_str("max_iterations = 7").unwrap();
        assert_eq!(config.max_iterations, 7);
        assert_eq!(config.max_branch_depth, None);
        assert_eq!(config.max_angles_per_iteration, 2_000);
    }

    #[test]
    fn save_and_load_round_trip() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("nested").join("engine.toml");
        let config = EngineConfig {
            max_iterations: 12,
            max_branch_depth: Some(3),
            branch_scale: 4.0,
            ..Default::default()
        };
        config.save(&path).unwrap();
        assert_eq!(EngineConfig::load(&path).unwrap(), config);
    }

    #[test]
    fn unset_branch_depth_round_trips() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("engine.toml");
        EngineConfig::default().save(&path).unwrap();
        assert_eq!(EngineConfig::load(&path).unwrap().max_branch_depth, None);
    }

    #[test]
    fn zero_iterations_rejected() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("engine.toml");
        std::fs::write(&path, "max_iterations = 0").unwrap();
        assert!(matches!(
            EngineConfig::load(&path),
            Err(ConfigError::Invalid { .. })
        ));
    }

    #[test]
    fn missing_file_is_read_error() {
        let err = EngineConfig::load(Path::new("/nonexistent/engine.toml")).unwrap_err();
        assert!(matches!(err, ConfigError::Read { .. }));
    }
}
