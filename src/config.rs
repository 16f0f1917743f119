// External imports
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

// Internal imports
use crate::constants;
use crate::error::{ForecastError, Result};
use crate::solar::step_3_rnn_model_arch::{CellKind, SequenceReduction};

/// How the value column should be read
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ReadingKind {
    /// Running total that resets every day (e.g. inverter DAILY_YIELD)
    #[default]
    Cumulative,
    /// Energy produced during each interval
    Interval,
}

/// Data loading, day grouping and sample building settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DataConfig {
    pub time_column: Option<String>,
    pub value_column: Option<String>,
    pub source_column: Option<String>,
    pub reading_kind: ReadingKind,
    pub min_readings_per_day: usize,
    pub train_ratio: f64,
    pub val_ratio: f64,
    /// Shortest prefix fed to the model during training
    pub min_prefix_len: usize,
    pub prefix_stride: usize,
    /// Longest prefix as a fraction of the day's readings
    pub max_prefix_fraction: f64,
}

impl Default for DataConfig {
    fn default() -> Self {
        Self {
            time_column: None,
            value_column: None,
            source_column: None,
            reading_kind: ReadingKind::Cumulative,
            min_readings_per_day: constants::MIN_READINGS_PER_DAY,
            train_ratio: constants::TRAIN_SPLIT_RATIO,
            val_ratio: constants::VALIDATION_SPLIT_RATIO,
            min_prefix_len: 4,
            prefix_stride: 2,
            max_prefix_fraction: 0.9,
        }
    }
}

/// Configuration for training the model
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrainingConfig {
    pub learning_rate: f64,
    pub batch_size: usize,
    pub epochs: usize,
    pub patience: usize,
    pub min_delta: f64,
    pub hidden_size: usize,
    pub dropout: f64,
    pub cell: CellKind,
    pub reduction: SequenceReduction,
    pub seed: u64,
    pub grad_clip_norm: Option<f32>,
    pub lr_decay: bool,
    /// Save a checkpoint every n epochs (0 disables)
    pub checkpoint_every: usize,
}

impl Default for TrainingConfig {
    fn default() -> Self {
        Self {
            learning_rate: 0.005,
            batch_size: 32,
            epochs: 40,
            patience: 6,        // Early stopping patience
            min_delta: 1e-5,    // Minimum improvement threshold
            hidden_size: constants::DEFAULT_HIDDEN_SIZE,
            dropout: 0.2,
            cell: CellKind::Lstm,
            reduction: SequenceReduction::LastValid,
            seed: 42,
            grad_clip_norm: Some(1.0),
            lr_decay: false,
            checkpoint_every: 0,
        }
    }
}

/// Everything needed to reproduce a training run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct PipelineConfig {
    pub data: DataConfig,
    pub training: TrainingConfig,
}

impl PipelineConfig {
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let json = fs::read_to_string(path)?;
        let config: PipelineConfig = serde_json::from_str(&json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(path, serde_json::to_string_pretty(self)?)?;
        Ok(())
    }

    pub fn validate(&self) -> Result<()> {
        let data = &self.data;
        let train = &self.training;
        if !(data.train_ratio > 0.0 && data.val_ratio > 0.0)
            || data.train_ratio + data.val_ratio >= 1.0
        {
            return Err(ForecastError::InvalidConfig(format!(
                "split ratios must be positive and leave room for a test set (train={}, val={})",
                data.train_ratio, data.val_ratio
            )));
        }
        if data.min_prefix_len == 0 || data.prefix_stride == 0 {
            return Err(ForecastError::InvalidConfig(
                "min_prefix_len and prefix_stride must be at least 1".into(),
            ));
        }
        if !(0.0..=1.0).contains(&data.max_prefix_fraction) {
            return Err(ForecastError::InvalidConfig(format!(
                "max_prefix_fraction must be within [0, 1], got {}",
                data.max_prefix_fraction
            )));
        }
        if train.batch_size == 0 || train.epochs == 0 || train.hidden_size == 0 {
            return Err(ForecastError::InvalidConfig(
                "batch_size, epochs and hidden_size must be at least 1".into(),
            ));
        }
        if !(0.0..1.0).contains(&train.dropout) {
            return Err(ForecastError::InvalidConfig(format!(
                "dropout must be within [0, 1), got {}",
                train.dropout
            )));
        }
        Ok(())
    }
}
