//! Run configuration
//!
//! Precedence, lowest first: built-in defaults, YAML file, `RANKFLOW_*`
//! environment variables, explicit overrides (CLI flags).
//!
//! ```yaml
//! damping_factor: 0.85
//! max_iterations: 50
//! tolerance: 1.0e-6   # `~` runs every iteration
//! distance: l1        # or l2
//! shards: 4
//! ```

use crate::error::{RankflowError, RankflowResult};
use rankflow_algorithms::{DistanceMetric, PageRankConfig};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::str::FromStr;

pub const ENV_DAMPING: &str = "RANKFLOW_DAMPING";
pub const ENV_MAX_ITERATIONS: &str = "RANKFLOW_MAX_ITERATIONS";
pub const ENV_TOLERANCE: &str = "RANKFLOW_TOLERANCE";
pub const ENV_SHARDS: &str = "RANKFLOW_SHARDS";
pub const ENV_DISTANCE: &str = "RANKFLOW_DISTANCE";

/// File-facing configuration. Missing keys take the defaults of `PageRankConfig`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RankflowConfig {
    pub damping_factor: f64,
    pub max_iterations: usize,
    pub tolerance: Option<f64>,
    pub distance: DistanceMetric,
    pub shards: usize,
}

/// Explicit per-run overrides, applied last. `None` keeps the current value.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ConfigOverrides {
    pub damping_factor: Option<f64>,
    pub max_iterations: Option<usize>,
    pub tolerance: Option<f64>,
    /// Clear the tolerance so every iteration runs; wins over `tolerance`
    pub fixed: bool,
    pub distance: Option<DistanceMetric>,
    pub shards: Option<usize>,
}

impl Default for RankflowConfig {
    fn default() -> Self {
        PageRankConfig::default().into()
    }
}

impl From<PageRankConfig> for RankflowConfig {
    fn from(config: PageRankConfig) -> Self {
        Self {
            damping_factor: config.damping_factor,
            max_iterations: config.max_iterations,
            tolerance: config.tolerance,
            distance: config.distance,
            shards: config.shards,
        }
    }
}

impl RankflowConfig {
    pub fn from_yaml_str(yaml: &str) -> RankflowResult<Self> {
        Ok(serde_yaml::from_str(yaml)?)
    }

    pub fn from_yaml_file(path: impl AsRef<Path>) -> RankflowResult<Self> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path)?;
        let config = Self::from_yaml_str(&contents)?;
        tracing::debug!(path = %path.display(), "loaded configuration");
        Ok(config)
    }

    /// Apply `RANKFLOW_*` overrides from the process environment
    pub fn apply_env(&mut self) -> RankflowResult<()> {
        self.apply_env_from(|key| std::env::var(key).ok())
    }

    /// Apply overrides from an arbitrary key lookup
    pub fn apply_env_from<F>(&mut self, lookup: F) -> RankflowResult<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(value) = lookup(ENV_DAMPING) {
            self.damping_factor = parse_value(ENV_DAMPING, &value)?;
        }
        if let Some(value) = lookup(ENV_MAX_ITERATIONS) {
            self.max_iterations = parse_value(ENV_MAX_ITERATIONS, &value)?;
        }
        if let Some(value) = lookup(ENV_TOLERANCE) {
            self.tolerance = match value.trim().to_ascii_lowercase().as_str() {
                "" | "none" | "off" => None,
                _ => Some(parse_value(ENV_TOLERANCE, &value)?),
            };
        }
        if let Some(value) = lookup(ENV_DISTANCE) {
            self.distance = parse_value(ENV_DISTANCE, &value)?;
        }
        if let Some(value) = lookup(ENV_SHARDS) {
            self.shards = parse_value(ENV_SHARDS, &value)?;
        }
        Ok(())
    }

    pub fn apply_overrides(&mut self, overrides: &ConfigOverrides) {
        if let Some(damping) = overrides.damping_factor {
            self.damping_factor = damping;
        }
        if let Some(max_iterations) = overrides.max_iterations {
            self.max_iterations = max_iterations;
        }
        if overrides.fixed {
            self.tolerance = None;
        } else if let Some(tolerance) = overrides.tolerance {
            self.tolerance = Some(tolerance);
        }
        if let Some(distance) = overrides.distance {
            self.distance = distance;
        }
        if let Some(shards) = overrides.shards {
            self.shards = shards;
        }
    }

    /// Layer defaults, the optional YAML file, the process environment and
    /// `overrides`, lowest first
    pub fn resolve(path: Option<&Path>, overrides: &ConfigOverrides) -> RankflowResult<Self> {
        Self::resolve_with(path, |key| std::env::var(key).ok(), overrides)
    }

    /// `resolve` with an arbitrary environment lookup
    pub fn resolve_with<F>(
        path: Option<&Path>,
        lookup: F,
        overrides: &ConfigOverrides,
    ) -> RankflowResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = match path {
            Some(path) => Self::from_yaml_file(path)?,
            None => Self::default(),
        };
        config.apply_env_from(lookup)?;
        config.apply_overrides(overrides);
        Ok(config)
    }

    /// Convert to the engine configuration, rejecting out-of-range values
    pub fn to_page_rank_config(&self) -> RankflowResult<PageRankConfig> {
        let config = PageRankConfig {
            damping_factor: self.damping_factor,
            max_iterations: self.max_iterations,
            tolerance: self.tolerance,
            distance: self.distance,
            shards: self.shards,
        };
        config.validate()?;
        Ok(config)
    }
}

fn parse_value<T>(key: &str, value: &str) -> RankflowResult<T>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    value
        .trim()
        .parse()
        .map_err(|e| RankflowError::Config(format!("{}={:?}: {}", key, value, e)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::io::Write;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key: &str| map.get(key).cloned()
    }

    #[test]
    fn test_defaults_match_engine() {
        let config = RankflowConfig::default().to_page_rank_config().unwrap();
        assert_eq!(config, PageRankConfig::default());
    }

    #[test]
    fn test_partial_yaml_keeps_defaults() {
        let config = RankflowConfig::from_yaml_str("damping_factor: 0.9\ndistance: l2\n").unwrap();

        assert_eq!(config.damping_factor, 0.9);
        assert_eq!(config.distance, DistanceMetric::L2);
        assert_eq!(config.max_iterations, 50);
        assert_eq!(config.tolerance, Some(1e-6));
    }

    #[test]
    fn test_null_tolerance_disables_convergence_check() {
        let config = RankflowConfig::from_yaml_str("tolerance: ~\nmax_iterations: 10\n").unwrap();
        assert_eq!(config.tolerance, None);
        assert_eq!(config.max_iterations, 10);
    }

    #[test]
    fn test_unknown_key_is_rejected() {
        let result = RankflowConfig::from_yaml_str("dampng_factor: 0.9\n");
        assert!(matches!(result, Err(RankflowError::Yaml(_))));
    }

    #[test]
    fn test_env_overrides() {
        let mut config = RankflowConfig::default();
        config
            .apply_env_from(lookup(&[
                (ENV_DAMPING, "0.5"),
                (ENV_MAX_ITERATIONS, " 12 "),
                (ENV_TOLERANCE, "none"),
                (ENV_SHARDS, "8"),
            ]))
            .unwrap();

        assert_eq!(config.damping_factor, 0.5);
        assert_eq!(config.max_iterations, 12);
        assert_eq!(config.tolerance, None);
        assert_eq!(config.shards, 8);
    }

    #[test]
    fn test_env_parse_error() {
        let mut config = RankflowConfig::default();
        let result = config.apply_env_from(lookup(&[(ENV_SHARDS, "many")]));

        match result {
            Err(RankflowError::Config(msg)) => assert!(msg.contains(ENV_SHARDS)),
            other => panic!("expected Config error, got {:?}", other),
        }
    }

    #[test]
    fn test_invalid_values_fail_conversion() {
        let config = RankflowConfig {
            damping_factor: 1.2,
            ..RankflowConfig::default()
        };
        assert!(matches!(
            config.to_page_rank_config(),
            Err(RankflowError::Rank(_))
        ));
    }

    #[test]
    fn test_layer_precedence() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "damping_factor: 0.6\nmax_iterations: 20\nshards: 2\ndistance: l2").unwrap();

        let env = lookup(&[(ENV_DAMPING, "0.7"), (ENV_MAX_ITERATIONS, "30")]);
        let overrides = ConfigOverrides {
            damping_factor: Some(0.8),
            ..ConfigOverrides::default()
        };
        let config = RankflowConfig::resolve_with(Some(file.path()), env, &overrides).unwrap();

        // flag > env > file > default
        assert_eq!(config.damping_factor, 0.8);
        assert_eq!(config.max_iterations, 30);
        assert_eq!(config.shards, 2);
        assert_eq!(config.distance, DistanceMetric::L2);
        assert_eq!(config.tolerance, Some(1e-6));
    }

    #[test]
    fn test_fixed_clears_tolerance_from_every_layer() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "tolerance: 1.0e-3").unwrap();

        let overrides = ConfigOverrides {
            tolerance: Some(1e-9),
            fixed: true,
            ..ConfigOverrides::default()
        };
        let config = RankflowConfig::resolve_with(
            Some(file.path()),
            lookup(&[(ENV_TOLERANCE, "1e-4")]),
            &overrides,
        )
        .unwrap();
        assert_eq!(config.tolerance, None);

        let overrides = ConfigOverrides {
            tolerance: Some(1e-9),
            ..ConfigOverrides::default()
        };
        let config = RankflowConfig::resolve_with(
            Some(file.path()),
            lookup(&[(ENV_TOLERANCE, "1e-4")]),
            &overrides,
        )
        .unwrap();
        assert_eq!(config.tolerance, Some(1e-9));
    }

    #[test]
    fn test_env_distance_and_missing_file() {
        let config = RankflowConfig::resolve_with(
            None,
            lookup(&[(ENV_DISTANCE, "L2")]),
            &ConfigOverrides::default(),
        )
        .unwrap();
        assert_eq!(config.distance, DistanceMetric::L2);

        let result = RankflowConfig::resolve_with(
            Some(Path::new("/nonexistent/rankflow.yaml")),
            lookup(&[]),
            &ConfigOverrides::default(),
        );
        assert!(matches!(result, Err(RankflowError::Io(_))));
    }
}
