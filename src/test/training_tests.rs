// External imports
use burn::module::AutodiffModule;
use burn_autodiff::Autodiff;
use burn_ndarray::{NdArray, NdArrayDevice};
use tempfile::tempdir;

// Internal imports
use crate::config::{DataConfig, TrainingConfig};
use crate::solar::step_1_tensor_preparation::{build_prefix_samples, SequenceSample};
use crate::solar::step_3_rnn_model_arch::{CellKind, SequenceReduction, SolarRnnConfig};
use crate::solar::step_4_train_model::{
    evaluate_loss, learning_rate_for_epoch, train_model, CheckpointTarget,
};
use crate::solar::step_6_model_serialization::{verify_model, ModelMetadata};
use crate::util::pre_processor::{split_days, TargetScaler};
use crate::util::test_utils::synthetic_days;

type TrainBackend = Autodiff<NdArray<f32>>;

struct Prepared {
    train: Vec<SequenceSample>,
    validation: Vec<SequenceSample>,
    scaler: TargetScaler,
}

fn prepare(days: usize) -> Prepared {
    let days = synthetic_days(days, 3);
    let split = split_days(&days, 0.7, 0.15).unwrap();
    let scaler = TargetScaler::fit(&split.train);
    let data = DataConfig {
        min_prefix_len: 6,
        prefix_stride: 3,
        ..DataConfig::default()
    };
    Prepared {
        train: build_prefix_samples(&split.train, &scaler, &data),
        validation: build_prefix_samples(&split.validation, &scaler, &data),
        scaler,
    }
}

fn quick_config(cell: CellKind) -> TrainingConfig {
    TrainingConfig {
        epochs: 3,
        batch_size: 16,
        hidden_size: 8,
        cell,
        learning_rate: 0.01,
        ..TrainingConfig::default()
    }
}

fn model_config(config: &TrainingConfig) -> SolarRnnConfig {
    SolarRnnConfig::new(config.hidden_size, config.dropout, config.cell, config.reduction)
}

#[test]
fn test_short_training_run() {
    let device = NdArrayDevice::Cpu;
    let data = prepare(20);
    assert!(!data.train.is_empty() && !data.validation.is_empty());

    for cell in [CellKind::Lstm, CellKind::Gru] {
        let config = quick_config(cell);
        let outcome = train_model::<TrainBackend>(
            data.train.clone(),
            &data.validation,
            model_config(&config),
            &config,
            &device,
            None,
        )
        .unwrap();

        assert!(outcome.epochs_run >= 1 && outcome.epochs_run <= config.epochs);
        assert_eq!(outcome.history.len(), outcome.epochs_run);
        assert!(outcome
            .history
            .iter()
            .all(|s| s.train_loss.is_finite() && s.val_loss.is_finite()));
        assert!(outcome.best_val_loss.is_finite());
        assert!(outcome.best_epoch >= 1);
        assert_eq!(outcome.model.cell(), cell);

        // The returned model is the best one seen on validation data
        let reloaded_loss = evaluate_loss(
            &outcome.model.valid(),
            &data.validation,
            config.batch_size,
            &device,
        )
        .unwrap();
        assert!((reloaded_loss - outcome.best_val_loss).abs() < 1e-4);
    }
}

#[test]
fn test_early_stopping_restores_first_epoch() {
    let device = NdArrayDevice::Cpu;
    let data = prepare(20);
    let config = TrainingConfig {
        epochs: 10,
        patience: 1,
        // Nothing after the first epoch counts as an improvement
        min_delta: 1e9,
        ..quick_config(CellKind::Gru)
    };

    let outcome = train_model::<TrainBackend>(
        data.train,
        &data.validation,
        model_config(&config),
        &config,
        &device,
        None,
    )
    .unwrap();

    assert_eq!(outcome.epochs_run, 2);
    assert_eq!(outcome.best_epoch, 1);
    assert_eq!(outcome.best_val_loss, outcome.history[0].val_loss);
}

#[test]
fn test_checkpoints_are_written() {
    let device = NdArrayDevice::Cpu;
    let dir = tempdir().unwrap();
    let data = prepare(20);
    let config = TrainingConfig {
        epochs: 2,
        patience: 5,
        checkpoint_every: 1,
        ..quick_config(CellKind::Lstm)
    };
    let model_config = model_config(&config);
    let metadata = ModelMetadata::new(model_config.clone(), data.scaler, DataConfig::default());

    train_model::<TrainBackend>(
        data.train,
        &data.validation,
        model_config,
        &config,
        &device,
        Some(CheckpointTarget {
            model_dir: dir.path(),
            model_name: "plant",
            metadata,
        }),
    )
    .unwrap();

    assert!(verify_model(dir.path().join("plant_epoch_1")).unwrap());
    assert!(verify_model(dir.path().join("plant_epoch_2")).unwrap());
}

#[test]
fn test_checkpoint_written_for_early_stopped_epoch() {
    let device = NdArrayDevice::Cpu;
    let dir = tempdir().unwrap();
    let data = prepare(20);
    // No epoch after the first can beat the best loss by this margin
    let config = TrainingConfig {
        epochs: 5,
        patience: 1,
        min_delta: 1e9,
        checkpoint_every: 1,
        ..quick_config(CellKind::Gru)
    };
    let model_config = model_config(&config);
    let metadata = ModelMetadata::new(model_config.clone(), data.scaler, DataConfig::default());

    let outcome = train_model::<TrainBackend>(
        data.train,
        &data.validation,
        model_config,
        &config,
        &device,
        Some(CheckpointTarget {
            model_dir: dir.path(),
            model_name: "plant",
            metadata,
        }),
    )
    .unwrap();

    assert_eq!(outcome.epochs_run, 2);
    assert_eq!(outcome.best_epoch, 1);
    assert!(verify_model(dir.path().join("plant_epoch_1")).unwrap());
    assert!(verify_model(dir.path().join("plant_epoch_2")).unwrap());
    assert!(!verify_model(dir.path().join("plant_epoch_3")).unwrap());
}

#[test]
fn test_training_requires_samples() {
    let device = NdArrayDevice::Cpu;
    let data = prepare(20);
    let config = quick_config(CellKind::Lstm);

    let no_train = train_model::<TrainBackend>(
        Vec::new(),
        &data.validation,
        model_config(&config),
        &config,
        &device,
        None,
    );
    assert!(no_train.is_err());

    let no_validation = train_model::<TrainBackend>(
        data.train,
        &[],
        model_config(&config),
        &config,
        &device,
        None,
    );
    assert!(no_validation.is_err());
}

#[test]
fn test_evaluate_loss_ignores_batch_size() {
    let device = NdArrayDevice::Cpu;
    let data = prepare(20);
    let model = SolarRnnConfig::new(8, 0.0, CellKind::Lstm, SequenceReduction::MaskedMean)
        .init::<NdArray<f32>>(&device);

    let one_by_one = evaluate_loss(&model, &data.validation, 1, &device).unwrap();
    let all_at_once = evaluate_loss(&model, &data.validation, 1024, &device).unwrap();

    assert!((one_by_one - all_at_once).abs() < 1e-5);
    assert_eq!(evaluate_loss(&model, &[], 8, &device).unwrap(), 0.0);
}

#[test]
fn test_learning_rate_schedule() {
    let constant = TrainingConfig {
        learning_rate: 0.01,
        epochs: 10,
        ..TrainingConfig::default()
    };
    assert_eq!(learning_rate_for_epoch(&constant, 1), 0.01);
    assert_eq!(learning_rate_for_epoch(&constant, 10), 0.01);

    let decaying = TrainingConfig {
        lr_decay: true,
        ..constant.clone()
    };
    assert_eq!(learning_rate_for_epoch(&decaying, 1), 0.01);
    assert_eq!(learning_rate_for_epoch(&decaying, 0), 0.01);
    assert!((learning_rate_for_epoch(&decaying, 6) - 0.005).abs() < 1e-12);
    assert!(learning_rate_for_epoch(&decaying, 10) < learning_rate_for_epoch(&decaying, 9));

    let tiny = TrainingConfig {
        learning_rate: 1e-8,
        ..decaying
    };
    assert_eq!(learning_rate_for_epoch(&tiny, 5), 1e-6);
}
