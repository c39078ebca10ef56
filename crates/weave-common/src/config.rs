//! Configuration options (§6): the enumerated option table, no free-form
//! fields. `Config` is `serde`-(de)serializable and loadable from TOML, the
//! same pairing a package-manifest loader uses for its own manifests, so an
//! external driver can hand this library a config file without the library
//! parsing argv itself (the CLI driver is out of core scope per §1).

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::error::FailureKind;

/// Which exploration strategy to run (§6 `strategy`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StrategyKind {
    Random,
    Pct,
    Dfs,
    Dpor,
    Fair,
    Replay,
}

impl StrategyKind {
    pub fn name(self) -> &'static str {
        match self {
            StrategyKind::Random => "random",
            StrategyKind::Pct => "pct",
            StrategyKind::Dfs => "dfs",
            StrategyKind::Dpor => "dpor",
            StrategyKind::Fair => "fair",
            StrategyKind::Replay => "replay",
        }
    }
}

impl std::fmt::Display for StrategyKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// The full set of configuration options from §6, no free-form knobs.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Run up to this many iterations.
    pub iterations: u32,
    /// Strategy RNG seed.
    pub seed: u64,
    /// Exploration strategy to use.
    pub strategy: StrategyKind,
    /// Abort an iteration after this many schedule points (liveness cap).
    pub max_steps_per_iter: u32,
    /// Degrade to random fuzzing instead of reporting
    /// `UncontrolledConcurrency` when uncontrolled concurrency is detected.
    pub fuzzing_fallback: bool,
    /// Hot-state patience, in consecutive schedule points, before a
    /// liveness bug is flagged even mid-iteration.
    pub liveness_temperature: u32,
    /// Emit the tagged verbose log (§6 "Log format").
    pub verbose: bool,
    /// Where to write a failing iteration's reproduction trace, if any.
    pub trace_path: Option<PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            iterations: 100,
            seed: 0,
            strategy: StrategyKind::Random,
            max_steps_per_iter: 10_000,
            fuzzing_fallback: false,
            liveness_temperature: 10_000,
            verbose: false,
            trace_path: None,
        }
    }
}

impl Config {
    /// Reject configurations that cannot possibly run (§7
    /// `ConfigurationError`). Called once, before the first iteration.
    pub fn validate(&self) -> Result<(), FailureKind> {
        if self.iterations == 0 {
            return Err(FailureKind::ConfigurationError {
                detail: "iterations must be at least 1".into(),
            });
        }
        if self.max_steps_per_iter == 0 {
            return Err(FailureKind::ConfigurationError {
                detail: "max_steps_per_iter must be at least 1".into(),
            });
        }
        if self.strategy == StrategyKind::Replay && self.trace_path.is_none() {
            return Err(FailureKind::ConfigurationError {
                detail: "strategy=replay requires trace_path to be set".into(),
            });
        }
        Ok(())
    }

    /// Load a config from a TOML file, applying `Config::default()` for any
    /// field the file omits.
    pub fn from_toml_str(text: &str) -> Result<Self, FailureKind> {
        #[derive(Deserialize, Default)]
        struct Partial {
            iterations: Option<u32>,
            seed: Option<u64>,
            strategy: Option<StrategyKind>,
            max_steps_per_iter: Option<u32>,
            fuzzing_fallback: Option<bool>,
            liveness_temperature: Option<u32>,
            verbose: Option<bool>,
            trace_path: Option<PathBuf>,
        }

        let partial: Partial = toml::from_str(text).map_err(|e| FailureKind::ConfigurationError {
            detail: format!("invalid config TOML: {e}"),
        })?;
        let defaults = Config::default();
        let config = Config {
            iterations: partial.iterations.unwrap_or(defaults.iterations),
            seed: partial.seed.unwrap_or(defaults.seed),
            strategy: partial.strategy.unwrap_or(defaults.strategy),
            max_steps_per_iter: partial
                .max_steps_per_iter
                .unwrap_or(defaults.max_steps_per_iter),
            fuzzing_fallback: partial.fuzzing_fallback.unwrap_or(defaults.fuzzing_fallback),
            liveness_temperature: partial
                .liveness_temperature
                .unwrap_or(defaults.liveness_temperature),
            verbose: partial.verbose.unwrap_or(defaults.verbose),
            trace_path: partial.trace_path.or(defaults.trace_path),
        };
        config.validate()?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_validate_cleanly() {
        assert!(Config::default().validate().is_ok());
    }

    #[test]
    fn zero_iterations_is_a_configuration_error() {
        let mut c = Config::default();
        c.iterations = 0;
        assert!(matches!(
            c.validate(),
            Err(FailureKind::ConfigurationError { .. })
        ));
    }

    #[test]
    fn replay_without_trace_path_is_rejected() {
        let mut c = Config::default();
        c.strategy = StrategyKind::Replay;
        assert!(c.validate().is_err());
    }

    #[test]
    fn partial_toml_fills_in_defaults() {
        let cfg = Config::from_toml_str("seed = 42\nstrategy = \"pct\"\n").unwrap();
        assert_eq!(cfg.seed, 42);
        assert_eq!(cfg.strategy, StrategyKind::Pct);
        assert_eq!(cfg.iterations, Config::default().iterations);
    }

    #[test]
    fn malformed_toml_is_a_configuration_error() {
        let err = Config::from_toml_str("not valid = [").unwrap_err();
        assert!(matches!(err, FailureKind::ConfigurationError { .. }));
    }
}
