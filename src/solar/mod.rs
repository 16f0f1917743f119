/// # Daily Solar Output Forecasting
///
/// Predicts the final cumulative output of a day from the readings seen so far.
///
/// ## Module Structure:
///
/// 1. **step_1_tensor_preparation**: Prefix samples, padding, batching and reduction masks
/// 2. **step_2_recurrent_layer**: Stock LSTM / GRU layer behind one forward signature
/// 3. **step_3_rnn_model_arch**: Recurrence, sequence reduction, dropout and dense output
/// 4. **step_4_train_model**: Training loop with early stopping and checkpoints
/// 5. **step_5_prediction**: Per-day forecasts and error metrics
/// 6. **step_6_model_serialization**: Model saving and loading with metadata
pub mod step_1_tensor_preparation;
pub mod step_2_recurrent_layer;
pub mod step_3_rnn_model_arch;
pub mod step_4_train_model;
pub mod step_5_prediction;
pub mod step_6_model_serialization;

use burn_autodiff::Autodiff;
use burn_ndarray::NdArray;

/// Backend used for inference and evaluation
pub type InferenceBackend = NdArray<f32>;
/// Backend used for training
pub type TrainingBackend = Autodiff<InferenceBackend>;
