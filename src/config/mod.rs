//! Run configuration read from an optional TOML file.
//!
//! ```toml
//! [gate_clone]
//! cap_factor = 1.4
//! clone_largest_only = false
//! max_passes = 1
//! ```

use std::fs;
use std::path::Path;

use anyhow::{bail, Context};
use serde::{Deserialize, Serialize};

use crate::transform::gate_clone::DEFAULT_CAP_FACTOR;
use crate::Result;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RunConfig {
    #[serde(default)]
    pub gate_clone: GateCloneConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GateCloneConfig {
    pub cap_factor: f64,
    pub clone_largest_only: bool,
    /// Upper bound on the number of cloning passes.
    pub max_passes: usize,
}

impl Default for GateCloneConfig {
    fn default() -> Self {
        Self {
            cap_factor: DEFAULT_CAP_FACTOR,
            clone_largest_only: false,
            max_passes: 1,
        }
    }
}

impl GateCloneConfig {
    /// Transform arguments for this configuration, with `overrides` replacing
    /// them position by position.
    pub fn args(&self, overrides: &[String]) -> Vec<String> {
        let mut args = vec![
            self.cap_factor.to_string(),
            self.clone_largest_only.to_string(),
        ];
        for (i, arg) in overrides.iter().enumerate() {
            match args.get_mut(i) {
                Some(slot) => *slot = arg.clone(),
                None => args.push(arg.clone()),
            }
        }
        args
    }
}

pub fn parse_config(path: impl AsRef<Path>) -> Result<RunConfig> {
    let path = path.as_ref();
    let contents =
        fs::read_to_string(path).with_context(|| format!("failed to read {path:?}"))?;
    let data: RunConfig = toml::from_str(&contents)?;
    if data.gate_clone.max_passes == 0 {
        bail!("gate_clone.max_passes must be at least 1");
    }
    Ok(data)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_config() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("gateclone.toml");
        fs::write(&path, "[gate_clone]\ncap_factor = 2.0\nmax_passes = 3\n").unwrap();
        let config = parse_config(&path).unwrap();
        assert_eq!(config.gate_clone.cap_factor, 2.0);
        assert!(!config.gate_clone.clone_largest_only);
        assert_eq!(config.gate_clone.max_passes, 3);
    }

    #[test]
    fn test_empty_config_uses_defaults() {
        let config: RunConfig = toml::from_str("").unwrap();
        assert_eq!(config, RunConfig::default());
        assert_eq!(config.gate_clone.args(&[]), vec!["1.4", "false"]);
    }

    #[test]
    fn test_zero_passes_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("gateclone.toml");
        fs::write(&path, "[gate_clone]\nmax_passes = 0\n").unwrap();
        assert!(parse_config(&path).is_err());
    }

    #[test]
    fn test_positional_args_override() {
        let config = GateCloneConfig {
            cap_factor: 3.0,
            clone_largest_only: true,
            max_passes: 1,
        };
        assert_eq!(config.args(&[]), vec!["3", "true"]);
        assert_eq!(config.args(&["1.5".to_string()]), vec!["1.5", "true"]);
        assert_eq!(
            config.args(&["1.5".to_string(), "0".to_string(), "x".to_string()]),
            vec!["1.5", "0", "x"]
        );
    }
}
