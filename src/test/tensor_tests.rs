// External imports
use burn::data::dataloader::batcher::Batcher;
use burn::data::dataset::Dataset;
use burn::tensor::Tensor;
use burn_ndarray::{NdArray, NdArrayDevice};

// Internal imports
use crate::config::DataConfig;
use crate::solar::step_1_tensor_preparation::{
    build_prefix_samples, reduction_weights, sample_from_prefix, samples_to_batch,
    SequenceBatcher, SequenceDataset,
};
use crate::solar::step_3_rnn_model_arch::SequenceReduction;
use crate::util::pre_processor::TargetScaler;
use crate::util::test_utils::{linear_days, ramp_sample};

type TestBackend = NdArray<f32>;

fn values<const D: usize>(tensor: Tensor<TestBackend, D>) -> Vec<f32> {
    tensor.into_data().to_vec::<f32>().unwrap()
}

#[test]
fn test_sample_features_are_scaled() {
    let days = linear_days(1, 10);
    let day = &days[0];
    let scaler = TargetScaler { max_output: 18.0 };

    let sample = sample_from_prefix(day.date, &day.readings[..3], day.final_output(), &scaler);

    assert_eq!(sample.len(), 3);
    // First reading at 06:00 with nothing produced yet
    assert_eq!(sample.steps[0], [0.25, 0.0]);
    assert!((sample.steps[2][0] - 480.0 / 1440.0).abs() < 1e-6);
    assert!((sample.steps[2][1] - 2.0 / 18.0).abs() < 1e-6);
    assert!((sample.target - 0.5).abs() < 1e-6);
}

#[test]
fn test_prefix_samples_stay_within_bounds() {
    let days = linear_days(2, 10);
    let scaler = TargetScaler::fit(&days);
    let config = DataConfig {
        min_prefix_len: 4,
        prefix_stride: 2,
        max_prefix_fraction: 0.9,
        ..DataConfig::default()
    };

    let samples = build_prefix_samples(&days, &scaler, &config);

    let lengths: Vec<usize> = samples.iter().map(|s| s.len()).collect();
    assert_eq!(lengths, vec![4, 6, 8, 4, 6, 8]);
    assert!(samples.iter().all(|s| s.len() < 10));
    assert_eq!(samples[0].date, days[0].date);
    assert_eq!(samples[3].date, days[1].date);
    // Every prefix of a day shares that day's target
    assert!(samples[..3].iter().all(|s| s.target == samples[0].target));
}

#[test]
fn test_prefix_samples_never_use_whole_day() {
    let days = linear_days(1, 4);
    let scaler = TargetScaler::fit(&days);
    let config = DataConfig {
        min_prefix_len: 4,
        max_prefix_fraction: 1.0,
        ..DataConfig::default()
    };

    assert!(build_prefix_samples(&days, &scaler, &config).is_empty());

    let config = DataConfig {
        min_prefix_len: 1,
        prefix_stride: 1,
        max_prefix_fraction: 1.0,
        ..DataConfig::default()
    };
    let lengths: Vec<usize> = build_prefix_samples(&days, &scaler, &config)
        .iter()
        .map(|s| s.len())
        .collect();
    assert_eq!(lengths, vec![1, 2, 3]);
}

#[test]
fn test_batch_is_zero_padded() {
    let device = NdArrayDevice::Cpu;
    let short = ramp_sample(3);
    let long = ramp_sample(5);

    let batch = samples_to_batch::<TestBackend>(&[short.clone(), long.clone()], &device);

    assert_eq!(batch.inputs.dims(), [2, 5, 2]);
    assert_eq!(batch.targets.dims(), [2, 1]);
    assert_eq!(batch.lengths, vec![3, 5]);

    let inputs = values(batch.inputs);
    let first_row = &inputs[..10];
    assert_eq!(&first_row[..6], &short.steps.concat()[..]);
    assert!(first_row[6..].iter().all(|v| *v == 0.0));
    assert_eq!(&inputs[10..], &long.steps.concat()[..]);
}

#[test]
fn test_last_valid_weights_pick_final_step() {
    let device = NdArrayDevice::Cpu;

    let weights = reduction_weights::<TestBackend>(&[2, 3, 1], 3, SequenceReduction::LastValid, &device);

    assert_eq!(weights.dims(), [3, 3, 1]);
    assert_eq!(
        values(weights),
        vec![0.0, 1.0, 0.0, 0.0, 0.0, 1.0, 1.0, 0.0, 0.0]
    );
}

#[test]
fn test_masked_mean_weights_ignore_padding() {
    let device = NdArrayDevice::Cpu;

    let weights = values(reduction_weights::<TestBackend>(
        &[2, 4],
        4,
        SequenceReduction::MaskedMean,
        &device,
    ));

    assert_eq!(&weights[..4], &[0.5, 0.5, 0.0, 0.0]);
    assert!(weights[4..].iter().all(|w| (*w - 0.25).abs() < 1e-7));
    for row in weights.chunks(4) {
        assert!((row.iter().sum::<f32>() - 1.0).abs() < 1e-6);
    }
}

#[test]
fn test_dataset_and_batcher() {
    let device = NdArrayDevice::Cpu;
    let samples = vec![ramp_sample(4), ramp_sample(7), ramp_sample(2)];
    let dataset = SequenceDataset::new(samples.clone());

    assert_eq!(dataset.len(), 3);
    assert_eq!(dataset.get(1), Some(samples[1].clone()));
    assert_eq!(dataset.get(3), None);

    let batcher = SequenceBatcher::<TestBackend>::new();
    let batch = batcher.batch(samples, &device);
    assert_eq!(batch.inputs.dims(), [3, 7, 2]);
    assert_eq!(batch.lengths, vec![4, 7, 2]);
}
