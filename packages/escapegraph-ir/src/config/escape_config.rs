//! Escape analysis configuration
//!
//! Controls the precision knobs of the location-graph builder, the solver
//! round limit, diagnostics, and how batches are scheduled.

use super::error::{ConfigError, ConfigResult};
use super::preset::Preset;
use super::validation::Validatable;
use serde::{Deserialize, Serialize};

/// Escape Analysis Configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EscapeConfig {
    /// Diagnostic verbosity (0..=2)
    ///
    /// - 0: none
    /// - 1: one message per decision and per leaking parameter
    /// - 2: level 1 plus the flow path that forced each escape
    pub diagnostic_level: u8,

    /// Wire arguments of calls inside the same batch straight into the
    /// callee's parameter locations instead of the heap sink
    pub precise_recursive_calls: bool,

    /// Analyze independent batches of a wave on the rayon pool
    pub enable_parallel: bool,

    /// Worker threads for parallel waves (0 = 75% of cores, max 1024)
    pub num_threads: usize,

    /// Minimum batches in a wave before the pool is used
    pub parallel_threshold: usize,

    /// Upper bound on solver root walks per batch (0 = unlimited)
    ///
    /// When exceeded every location of the batch is treated as escaping.
    pub max_walk_rounds: usize,
}

impl EscapeConfig {
    /// Validate configuration
    pub fn validate(&self) -> ConfigResult<()> {
        if self.diagnostic_level > 2 {
            return Err(ConfigError::range_with_hint(
                "diagnostic_level",
                self.diagnostic_level,
                0,
                2,
                "Diagnostic level is 0 (off), 1 (decisions) or 2 (flow paths)",
            ));
        }

        if self.num_threads > 1024 {
            return Err(ConfigError::range_with_hint(
                "num_threads",
                self.num_threads,
                0,
                1024,
                "Use 0 to size the pool from the number of cores",
            ));
        }

        if self.parallel_threshold == 0 {
            return Err(ConfigError::range_with_hint(
                "parallel_threshold",
                self.parallel_threshold,
                1,
                usize::MAX,
                "A wave needs at least one batch",
            ));
        }

        Ok(())
    }

    /// Builder: Set diagnostic_level
    pub fn diagnostic_level(mut self, v: u8) -> Self {
        self.diagnostic_level = v;
        self
    }

    /// Builder: Set precise_recursive_calls
    pub fn precise_recursive_calls(mut self, v: bool) -> Self {
        self.precise_recursive_calls = v;
        self
    }

    /// Builder: Set enable_parallel
    pub fn enable_parallel(mut self, v: bool) -> Self {
        self.enable_parallel = v;
        self
    }

    /// Builder: Set num_threads
    pub fn num_threads(mut self, v: usize) -> Self {
        self.num_threads = v;
        self
    }

    /// Builder: Set parallel_threshold
    pub fn parallel_threshold(mut self, v: usize) -> Self {
        self.parallel_threshold = v;
        self
    }

    /// Builder: Set max_walk_rounds
    pub fn max_walk_rounds(mut self, v: usize) -> Self {
        self.max_walk_rounds = v;
        self
    }

    /// Thread count actually used for the pool
    pub fn effective_threads(&self) -> usize {
        if self.num_threads > 0 {
            self.num_threads
        } else {
            (num_cpus::get() * 3 / 4).max(1)
        }
    }

    /// Create from preset
    pub fn from_preset(preset: Preset) -> Self {
        match preset {
            Preset::Fast => Self {
                diagnostic_level: 0,
                precise_recursive_calls: false,
                enable_parallel: true,
                num_threads: 0,
                parallel_threshold: 4,
                max_walk_rounds: 1_000_000,
            },
            Preset::Balanced => Self {
                diagnostic_level: 0,
                precise_recursive_calls: false,
                enable_parallel: true,
                num_threads: 0,
                parallel_threshold: 8,
                max_walk_rounds: 0,
            },
            Preset::Thorough => Self {
                diagnostic_level: 2,
                precise_recursive_calls: true,
                enable_parallel: false,
                num_threads: 0,
                parallel_threshold: 8,
                max_walk_rounds: 0,
            },
            Preset::Custom => Self {
                diagnostic_level: 0,
                precise_recursive_calls: false,
                enable_parallel: false,
                num_threads: 0,
                parallel_threshold: 1,
                max_walk_rounds: 0,
            },
        }
    }
}

impl Default for EscapeConfig {
    fn default() -> Self {
        Self::from_preset(Preset::Balanced)
    }
}

impl Validatable for EscapeConfig {
    fn validate(&self) -> ConfigResult<()> {
        EscapeConfig::validate(self)
    }

    fn config_name(&self) -> &'static str {
        "EscapeConfig"
    }
}

/// Patch type for EscapeConfig
///
/// All fields are optional - only specified fields will be applied on top
/// of the preset.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct EscapeConfigPatch {
    pub diagnostic_level: Option<u8>,
    pub precise_recursive_calls: Option<bool>,
    pub enable_parallel: Option<bool>,
    pub num_threads: Option<usize>,
    pub parallel_threshold: Option<usize>,
    pub max_walk_rounds: Option<usize>,
}

impl EscapeConfigPatch {
    /// Apply the patch over `base`
    pub fn apply(&self, mut base: EscapeConfig) -> EscapeConfig {
        if let Some(v) = self.diagnostic_level {
            base.diagnostic_level = v;
        }
        if let Some(v) = self.precise_recursive_calls {
            base.precise_recursive_calls = v;
        }
        if let Some(v) = self.enable_parallel {
            base.enable_parallel = v;
        }
        if let Some(v) = self.num_threads {
            base.num_threads = v;
        }
        if let Some(v) = self.parallel_threshold {
            base.parallel_threshold = v;
        }
        if let Some(v) = self.max_walk_rounds {
            base.max_walk_rounds = v;
        }
        base
    }
}
