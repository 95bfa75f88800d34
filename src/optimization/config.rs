use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Scales of the schedule used when a staged run is configured without one.
pub const DEFAULT_STAGE_SCALES: [f64; 4] = [1.0, 1e-1, 1e-2, 1e-3];

const DEFAULT_STEP_DECADES: f64 = 12.0;

/// Errors that can occur when validating a minimizer config.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("loop_count must be positive")]
    ZeroLoopCount,

    #[error("scale must be finite and positive, got {0}")]
    Scale(f64),

    #[error("stage {index}: scale must be finite and positive, got {scale}")]
    StageScale { index: usize, scale: f64 },

    #[error("stage {index}: loop_count must be positive")]
    StageLoopCount { index: usize },

    #[error("stage {index}: dimension {dimension} is out of range for {len} parameters")]
    StageDimension {
        index: usize,
        dimension: usize,
        len: usize,
    },

    #[error("batch_size must be positive")]
    ZeroBatchSize,

    #[error("step_decades must be finite and non-negative, got {0}")]
    StepDecades(f64),

    #[error("failed to parse config: {0}")]
    Json(#[from] serde_json::Error),
}

/// One phase of a staged run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StageSpec {
    /// Multiplier applied to every dimension's range when sizing steps.
    pub scale: f64,
    /// Dimensions allowed to move in this stage; `None` moves all free ones.
    #[serde(default)]
    pub dimensions: Option<Vec<usize>>,
    /// Overrides the config-wide `loop_count` for this stage.
    #[serde(default)]
    pub loop_count: Option<u64>,
}

impl StageSpec {
    pub fn new(scale: f64) -> Self {
        Self {
            scale,
            dimensions: None,
            loop_count: None,
        }
    }

    pub fn with_dimensions(mut self, dimensions: Vec<usize>) -> Self {
        self.dimensions = Some(dimensions);
        self
    }

    pub fn with_loop_count(mut self, loop_count: u64) -> Self {
        self.loop_count = Some(loop_count);
        self
    }

    fn validate(&self, index: usize, dimension: Option<usize>) -> Result<(), ConfigError> {
        if !self.scale.is_finite() || self.scale <= 0.0 {
            return Err(ConfigError::StageScale {
                index,
                scale: self.scale,
            });
        }
        if self.loop_count == Some(0) {
            return Err(ConfigError::StageLoopCount { index });
        }
        if let (Some(dims), Some(len)) = (&self.dimensions, dimension) {
            if let Some(&bad) = dims.iter().find(|&&d| d >= len) {
                return Err(ConfigError::StageDimension {
                    index,
                    dimension: bad,
                    len,
                });
            }
        }
        Ok(())
    }
}

/// Search configuration shared by every minimizer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MinimizerConfig {
    /// Candidate evaluations of a plain run, or per stage of a staged run.
    pub loop_count: u64,
    /// Score candidates in parallel rounds instead of one at a time.
    #[serde(default)]
    pub parallel_reads: bool,
    /// Candidates per parallel round, defaults to the number of CPUs.
    #[serde(default)]
    pub batch_size: Option<usize>,
    /// Coarse-to-fine stage schedule.
    #[serde(default)]
    pub stages: Vec<StageSpec>,
    /// Stage run after the schedule.
    #[serde(default)]
    pub terminal_stage: Option<StageSpec>,
    /// Decades below the stage scale reached by the smallest steps.
    #[serde(default = "default_step_decades")]
    pub step_decades: f64,
    /// Seed of the perturbation rng; entropy when unset.
    #[serde(default)]
    pub seed: Option<u64>,
}

fn default_step_decades() -> f64 {
    DEFAULT_STEP_DECADES
}

impl Default for MinimizerConfig {
    fn default() -> Self {
        Self::new(1_000_000)
    }
}

impl MinimizerConfig {
    /// Sequential, single-phase config with the given budget.
    pub fn new(loop_count: u64) -> Self {
        Self {
            loop_count,
            parallel_reads: false,
            batch_size: None,
            stages: Vec::new(),
            terminal_stage: None,
            step_decades: DEFAULT_STEP_DECADES,
            seed: None,
        }
    }

    pub fn with_parallel_reads(mut self, parallel_reads: bool) -> Self {
        self.parallel_reads = parallel_reads;
        self
    }

    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = Some(batch_size);
        self
    }

    pub fn with_stages(mut self, stages: Vec<StageSpec>) -> Self {
        self.stages = stages;
        self
    }

    pub fn with_terminal_stage(mut self, stage: StageSpec) -> Self {
        self.terminal_stage = Some(stage);
        self
    }

    pub fn with_step_decades(mut self, step_decades: f64) -> Self {
        self.step_decades = step_decades;
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    /// Parse and validate a JSON config.
    ///
    /// Stage dimension indices are checked later, once the problem size is known.
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(json)?;
        config.validate(None)?;
        Ok(config)
    }

    /// Whether a staged schedule was configured.
    pub fn is_staged(&self) -> bool {
        !self.stages.is_empty() || self.terminal_stage.is_some()
    }

    /// Number of candidates per round.
    pub fn effective_batch_size(&self) -> usize {
        if self.parallel_reads {
            self.batch_size.unwrap_or_else(num_cpus::get).max(1)
        } else {
            1
        }
    }

    /// Stages in run order: the schedule followed by the terminal stage.
    ///
    /// Falls back to [`DEFAULT_STAGE_SCALES`] when neither is configured.
    pub fn stage_schedule(&self) -> Vec<StageSpec> {
        if !self.is_staged() {
            return DEFAULT_STAGE_SCALES
                .iter()
                .map(|&scale| StageSpec::new(scale))
                .collect();
        }
        self.stages
            .iter()
            .chain(self.terminal_stage.as_ref())
            .cloned()
            .collect()
    }

    /// Check the config; `dimension` enables stage index checks.
    pub fn validate(&self, dimension: Option<usize>) -> Result<(), ConfigError> {
        if self.loop_count == 0 {
            return Err(ConfigError::ZeroLoopCount);
        }
        if self.batch_size == Some(0) {
            return Err(ConfigError::ZeroBatchSize);
        }
        if !self.step_decades.is_finite() || self.step_decades < 0.0 {
            return Err(ConfigError::StepDecades(self.step_decades));
        }
        for (index, stage) in self
            .stages
            .iter()
            .chain(self.terminal_stage.as_ref())
            .enumerate()
        {
            stage.validate(index, dimension)?;
        }
        Ok(())
    }
}
