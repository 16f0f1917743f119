// External crates
use burn::data::dataloader::batcher::Batcher;
use burn::data::dataset::Dataset;
use burn::tensor::{backend::Backend, Tensor, TensorData};
use chrono::NaiveDate;
use log::debug;

// Internal modules
use crate::config::DataConfig;
use crate::constants::{INPUT_FEATURES, SECONDS_PER_DAY};
use crate::solar::step_3_rnn_model_arch::SequenceReduction;
use crate::util::pre_processor::{DayReading, DaySeries, TargetScaler};

/// One variable-length input sequence and its target
#[derive(Debug, Clone, PartialEq)]
pub struct SequenceSample {
    pub date: NaiveDate,
    /// Per-step features: [fraction of the day elapsed, cumulative / max_output]
    pub steps: Vec<[f32; INPUT_FEATURES]>,
    /// Final daily output / max_output
    pub target: f32,
}

impl SequenceSample {
    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }
}

/// Builds a sample from the readings seen so far on `date`
pub fn sample_from_prefix(
    date: NaiveDate,
    prefix: &[DayReading],
    final_output: f64,
    scaler: &TargetScaler,
) -> SequenceSample {
    let steps = prefix
        .iter()
        .map(|r| {
            [
                r.second_of_day as f32 / SECONDS_PER_DAY,
                scaler.normalize(r.cumulative) as f32,
            ]
        })
        .collect();

    SequenceSample {
        date,
        steps,
        target: scaler.normalize(final_output) as f32,
    }
}

/// Expands each day into several prefixes of increasing length
///
/// # Arguments
///
/// * `days` - Days to sample from
/// * `scaler` - Scaler fitted on the training days
/// * `config` - Prefix length, stride and upper bound
///
/// # Returns
///
/// Returns samples ordered by day, then by prefix length. The full day is never used as input.
pub fn build_prefix_samples(
    days: &[DaySeries],
    scaler: &TargetScaler,
    config: &DataConfig,
) -> Vec<SequenceSample> {
    let stride = config.prefix_stride.max(1);
    let min_len = config.min_prefix_len.max(1);
    let mut samples = Vec::new();

    for day in days {
        let n = day.len();
        let upper = ((n as f64 * config.max_prefix_fraction).floor() as usize)
            .max(min_len)
            .min(n.saturating_sub(1));
        let final_output = day.final_output();

        let mut len = min_len;
        while len <= upper {
            samples.push(sample_from_prefix(
                day.date,
                &day.readings[..len],
                final_output,
                scaler,
            ));
            len += stride;
        }
    }

    debug!("Built {} prefix samples from {} days", samples.len(), days.len());
    samples
}

/// Padded batch of sequences
#[derive(Debug, Clone)]
pub struct SequenceBatch<B: Backend> {
    /// Inputs of shape [batch_size, max_len, INPUT_FEATURES], zero-padded after each sequence
    pub inputs: Tensor<B, 3>,
    /// Targets of shape [batch_size, 1]
    pub targets: Tensor<B, 2>,
    /// Number of valid steps per sequence
    pub lengths: Vec<usize>,
}

/// Pads samples to the longest one and stacks them into tensors
pub fn samples_to_batch<B: Backend>(
    samples: &[SequenceSample],
    device: &B::Device,
) -> SequenceBatch<B> {
    let batch_size = samples.len();
    let max_len = samples.iter().map(SequenceSample::len).max().unwrap_or(0).max(1);

    let mut inputs = vec![0.0f32; batch_size * max_len * INPUT_FEATURES];
    for (i, sample) in samples.iter().enumerate() {
        for (t, step) in sample.steps.iter().enumerate() {
            let offset = (i * max_len + t) * INPUT_FEATURES;
            inputs[offset..offset + INPUT_FEATURES].copy_from_slice(step);
        }
    }
    let targets: Vec<f32> = samples.iter().map(|s| s.target).collect();
    let lengths = samples.iter().map(|s| s.len().max(1)).collect();

    SequenceBatch {
        inputs: Tensor::from_data(
            TensorData::new(inputs, [batch_size, max_len, INPUT_FEATURES]),
            device,
        ),
        targets: Tensor::from_data(TensorData::new(targets, [batch_size, 1]), device),
        lengths,
    }
}

/// Weights that collapse the time axis of a recurrent output
///
/// Shape is [batch_size, max_len, 1]. `LastValid` puts a one at each
/// sequence's last real step; `MaskedMean` spreads `1 / len` over the real steps.
/// Padded steps always get zero.
pub fn reduction_weights<B: Backend>(
    lengths: &[usize],
    max_len: usize,
    reduction: SequenceReduction,
    device: &B::Device,
) -> Tensor<B, 3> {
    let mut weights = vec![0.0f32; lengths.len() * max_len];
    for (i, &len) in lengths.iter().enumerate() {
        let len = len.clamp(1, max_len.max(1));
        let row = &mut weights[i * max_len..(i + 1) * max_len];
        match reduction {
            SequenceReduction::LastValid => row[len - 1] = 1.0,
            SequenceReduction::MaskedMean => {
                row[..len].iter_mut().for_each(|w| *w = 1.0 / len as f32)
            }
        }
    }
    Tensor::from_data(TensorData::new(weights, [lengths.len(), max_len, 1]), device)
}

/// Batcher implementation for prefix samples
#[derive(Clone, Debug)]
pub struct SequenceBatcher<B: Backend> {
    _phantom: std::marker::PhantomData<B>,
}

impl<B: Backend> SequenceBatcher<B> {
    pub fn new() -> Self {
        Self {
            _phantom: std::marker::PhantomData,
        }
    }
}

impl<B: Backend> Default for SequenceBatcher<B> {
    fn default() -> Self {
        Self::new()
    }
}

impl<B: Backend> Batcher<B, SequenceSample, SequenceBatch<B>> for SequenceBatcher<B> {
    fn batch(&self, items: Vec<SequenceSample>, device: &B::Device) -> SequenceBatch<B> {
        samples_to_batch(&items, device)
    }
}

/// In-memory dataset of prefix samples
#[derive(Debug, Clone)]
pub struct SequenceDataset {
    samples: Vec<SequenceSample>,
}

impl SequenceDataset {
    pub fn new(samples: Vec<SequenceSample>) -> Self {
        Self { samples }
    }
}

impl Dataset<SequenceSample> for SequenceDataset {
    fn get(&self, index: usize) -> Option<SequenceSample> {
        self.samples.get(index).cloned()
    }

    fn len(&self) -> usize {
        self.samples.len()
    }
}
