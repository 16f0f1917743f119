// External imports
use burn::module::Module;
use burn::nn::{Dropout, DropoutConfig, Linear, LinearConfig};
use burn::tensor::{backend::Backend, Tensor};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

// Internal imports
use super::step_1_tensor_preparation::reduction_weights;
use super::step_2_recurrent_layer::RecurrentLayer;
use crate::constants::{DEFAULT_HIDDEN_SIZE, INPUT_FEATURES};

/// Recurrence cell used by the model
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum CellKind {
    #[default]
    Lstm,
    Gru,
}

impl fmt::Display for CellKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CellKind::Lstm => write!(f, "lstm"),
            CellKind::Gru => write!(f, "gru"),
        }
    }
}

impl FromStr for CellKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "lstm" => Ok(CellKind::Lstm),
            "gru" => Ok(CellKind::Gru),
            other => Err(format!("unknown cell kind '{}', expected lstm or gru", other)),
        }
    }
}

/// How the per-step recurrent outputs collapse into one vector
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum SequenceReduction {
    /// Hidden state at the last non-padded step
    #[default]
    LastValid,
    /// Mean of hidden states over the non-padded steps
    MaskedMean,
}

/// Recurrent model predicting a day's final output from a partial day
#[derive(Module, Debug)]
pub struct SolarRnnModel<B: Backend> {
    // Model hyperparameters
    input_size: usize,
    hidden_size: usize,
    output_size: usize,
    mean_pooling: bool,

    // Model layers
    recurrent: RecurrentLayer<B>,
    dropout: Dropout,
    output_layer: Linear<B>,
}

impl<B: Backend> SolarRnnModel<B> {
    /// Create a new model
    ///
    /// # Arguments
    ///
    /// * `config` - Architecture description
    /// * `device` - Device to place tensors on
    pub fn new(config: &SolarRnnConfig, device: &B::Device) -> Self {
        let recurrent =
            RecurrentLayer::new(config.cell, config.input_size, config.hidden_size, device);
        let dropout = DropoutConfig::new(config.dropout_rate).init();
        let output_layer = LinearConfig::new(config.hidden_size, config.output_size).init(device);

        Self {
            input_size: config.input_size,
            hidden_size: config.hidden_size,
            output_size: config.output_size,
            mean_pooling: config.reduction == SequenceReduction::MaskedMean,
            recurrent,
            dropout,
            output_layer,
        }
    }

    /// Forward pass through the model
    ///
    /// # Arguments
    ///
    /// * `x` - Zero-padded inputs of shape [batch_size, max_len, input_size]
    /// * `lengths` - Valid steps per sequence
    /// * `is_training` - Whether dropout is applied
    ///
    /// # Returns
    ///
    /// Returns the output tensor of shape [batch_size, output_size]
    pub fn forward(&self, x: Tensor<B, 3>, lengths: &[usize], is_training: bool) -> Tensor<B, 2> {
        let [batch_size, max_len, _] = x.dims();
        let device = x.device();

        let sequence_out = self.recurrent.forward(x);

        // Collapse time: [b, s, h] * [b, s, 1] summed over s
        let weights = reduction_weights::<B>(lengths, max_len, self.reduction(), &device);
        let reduced = (sequence_out * weights)
            .sum_dim(1)
            .reshape([batch_size, self.hidden_size]);

        let dropped = if is_training {
            self.dropout.forward(reduced)
        } else {
            reduced
        };

        self.output_layer.forward(dropped)
    }

    /// Predict using the model (convenience wrapper around forward)
    pub fn predict(&self, x: Tensor<B, 3>, lengths: &[usize]) -> Tensor<B, 2> {
        self.forward(x, lengths, false)
    }

    pub fn reduction(&self) -> SequenceReduction {
        if self.mean_pooling {
            SequenceReduction::MaskedMean
        } else {
            SequenceReduction::LastValid
        }
    }

    pub fn input_size(&self) -> usize {
        self.input_size
    }

    pub fn output_size(&self) -> usize {
        self.output_size
    }

    pub fn cell(&self) -> CellKind {
        self.recurrent.cell()
    }
}

/// Configuration for the SolarRnnModel
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SolarRnnConfig {
    pub input_size: usize,
    pub hidden_size: usize,
    pub output_size: usize,
    pub dropout_rate: f64,
    pub cell: CellKind,
    pub reduction: SequenceReduction,
}

impl Default for SolarRnnConfig {
    fn default() -> Self {
        Self {
            input_size: INPUT_FEATURES,
            hidden_size: DEFAULT_HIDDEN_SIZE,
            output_size: 1,
            dropout_rate: 0.2,
            cell: CellKind::Lstm,
            reduction: SequenceReduction::LastValid,
        }
    }
}

impl SolarRnnConfig {
    pub fn new(hidden_size: usize, dropout_rate: f64, cell: CellKind, reduction: SequenceReduction) -> Self {
        Self {
            hidden_size,
            dropout_rate,
            cell,
            reduction,
            ..Self::default()
        }
    }

    /// Initialize a model from this configuration
    pub fn init<B: Backend>(&self, device: &B::Device) -> SolarRnnModel<B> {
        SolarRnnModel::new(self, device)
    }
}
