// External imports
use anyhow::{anyhow, Result};
use burn::data::dataloader::DataLoaderBuilder;
use burn::grad_clipping::GradientClippingConfig;
use burn::module::{AutodiffModule, Module};
use burn::nn::loss::{MseLoss, Reduction};
use burn::optim::{AdamConfig, GradientsParams, Optimizer};
use burn::tensor::backend::{AutodiffBackend, Backend};
use burn::tensor::ElementConversion;
use log::{debug, info, warn};
use serde::{Deserialize, Serialize};
use std::path::Path;

// Internal imports
use super::step_1_tensor_preparation::{
    samples_to_batch, SequenceBatcher, SequenceDataset, SequenceSample,
};
use super::step_3_rnn_model_arch::{SolarRnnConfig, SolarRnnModel};
use super::step_6_model_serialization::ModelMetadata;
use crate::config::TrainingConfig;
use crate::util::model_utils;

const MIN_LEARNING_RATE: f64 = 1e-6;

/// Loss values recorded after one epoch
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EpochStats {
    pub epoch: usize,
    pub train_loss: f64,
    pub val_loss: f64,
    pub learning_rate: f64,
}

/// Result of a training run
#[derive(Debug, Clone)]
pub struct TrainingOutcome<B: Backend> {
    /// Model with the lowest validation loss
    pub model: SolarRnnModel<B>,
    pub model_config: SolarRnnConfig,
    pub history: Vec<EpochStats>,
    pub best_val_loss: f64,
    pub best_epoch: usize,
    pub epochs_run: usize,
}

/// Where and how to write checkpoints while training
pub struct CheckpointTarget<'a> {
    pub model_dir: &'a Path,
    pub model_name: &'a str,
    /// Metadata stored next to each checkpoint
    pub metadata: ModelMetadata,
}

/// Learning rate for `epoch` (1-based, 0 is treated as 1), decaying linearly when enabled
pub fn learning_rate_for_epoch(config: &TrainingConfig, epoch: usize) -> f64 {
    if !config.lr_decay {
        return config.learning_rate;
    }
    let progress = epoch.saturating_sub(1) as f64 / config.epochs.max(1) as f64;
    (config.learning_rate * (1.0 - progress)).max(MIN_LEARNING_RATE)
}

/// Train the recurrent model on prefix samples
///
/// # Arguments
///
/// * `train_samples` - Samples built from training days
/// * `val_samples` - Samples built from validation days
/// * `model_config` - Architecture to train
/// * `config` - Optimisation settings
/// * `device` - Device to place tensors on
/// * `checkpoints` - Optional periodic checkpoint destination
///
/// # Returns
///
/// Returns the best model seen on the validation set together with the loss history
pub fn train_model<B: AutodiffBackend>(
    train_samples: Vec<SequenceSample>,
    val_samples: &[SequenceSample],
    model_config: SolarRnnConfig,
    config: &TrainingConfig,
    device: &B::Device,
    checkpoints: Option<CheckpointTarget<'_>>,
) -> Result<TrainingOutcome<B>> {
    if train_samples.is_empty() {
        return Err(anyhow!("No training samples; check prefix settings and day lengths"));
    }
    if val_samples.is_empty() {
        return Err(anyhow!("No validation samples; check prefix settings and day lengths"));
    }

    B::seed(config.seed);
    let mut model: SolarRnnModel<B> = model_config.init(device);
    info!(
        "Training {} model ({} parameters) on {} samples, validating on {}",
        model_config.cell,
        model.num_params(),
        train_samples.len(),
        val_samples.len()
    );

    let mut optim_config = AdamConfig::new();
    if let Some(norm) = config.grad_clip_norm {
        optim_config = optim_config.with_grad_clipping(Some(GradientClippingConfig::Norm(norm)));
    }
    let mut optimizer = optim_config.init();

    let train_loader = DataLoaderBuilder::new(SequenceBatcher::<B>::new())
        .batch_size(config.batch_size)
        .shuffle(config.seed)
        .build(SequenceDataset::new(train_samples));

    let loss_fn = MseLoss::new();
    let mut history = Vec::with_capacity(config.epochs);
    let mut best_model = model.clone();
    let mut best_val_loss = f64::INFINITY;
    let mut best_epoch = 0;
    let mut epochs_no_improve = 0;
    let mut epochs_run = 0;

    for epoch in 1..=config.epochs {
        epochs_run = epoch;
        let learning_rate = learning_rate_for_epoch(config, epoch);

        let mut loss_sum = 0.0f64;
        let mut seen = 0usize;
        for batch in train_loader.iter() {
            let batch_len = batch.lengths.len();
            let predictions = model.forward(batch.inputs, &batch.lengths, true);
            let loss = loss_fn.forward(predictions, batch.targets, Reduction::Mean);

            loss_sum += loss.clone().into_scalar().elem::<f64>() * batch_len as f64;
            seen += batch_len;

            // Backward pass and optimizer step
            let grads = loss.backward();
            let grads = GradientsParams::from_grads(grads, &model);
            model = optimizer.step(learning_rate, model, grads);
        }
        let train_loss = loss_sum / seen.max(1) as f64;

        // Validation runs on the inner backend without autodiff tracking
        let val_loss = evaluate_loss(&model.valid(), val_samples, config.batch_size, device)?;

        debug!(
            "Epoch {}/{}: train loss = {:.6}, validation loss = {:.6}, lr = {:.2e}",
            epoch, config.epochs, train_loss, val_loss, learning_rate
        );
        history.push(EpochStats {
            epoch,
            train_loss,
            val_loss,
            learning_rate,
        });

        // Checkpoint before any stopping decision so the final epoch is kept too
        if let Some(target) = &checkpoints {
            if config.checkpoint_every > 0 && epoch % config.checkpoint_every == 0 {
                let mut metadata = target.metadata.clone();
                metadata.best_val_loss =
                    Some(best_val_loss.min(val_loss)).filter(|v| v.is_finite());
                metadata.epochs_trained = epoch;
                if let Err(e) = model_utils::save_model_checkpoint(
                    &model,
                    &metadata,
                    target.model_dir,
                    target.model_name,
                    epoch,
                ) {
                    warn!("Failed to save checkpoint for epoch {}: {:#}", epoch, e);
                }
            }
        }

        if !val_loss.is_finite() {
            warn!("Validation loss diverged at epoch {}; stopping", epoch);
            break;
        }

        // Early stopping logic
        if best_val_loss - val_loss > config.min_delta {
            best_val_loss = val_loss;
            best_model = model.clone();
            best_epoch = epoch;
            epochs_no_improve = 0;
        } else {
            epochs_no_improve += 1;
            if epochs_no_improve >= config.patience {
                info!(
                    "Early stopping at epoch {} (best validation loss {:.6} at epoch {})",
                    epoch, best_val_loss, best_epoch
                );
                break;
            }
        }
    }

    info!(
        "Training finished after {} epoch(s); best validation loss {:.6}",
        epochs_run, best_val_loss
    );

    Ok(TrainingOutcome {
        model: best_model,
        model_config,
        history,
        best_val_loss,
        best_epoch,
        epochs_run,
    })
}

/// Mean squared error over `samples`, in normalized units
///
/// Batches are weighted by their size so the result does not depend on `batch_size`.
pub fn evaluate_loss<B: Backend>(
    model: &SolarRnnModel<B>,
    samples: &[SequenceSample],
    batch_size: usize,
    device: &B::Device,
) -> Result<f64> {
    if samples.is_empty() {
        return Ok(0.0);
    }

    let loss_fn = MseLoss::new();
    let mut loss_sum = 0.0f64;
    for chunk in samples.chunks(batch_size.max(1)) {
        let batch = samples_to_batch::<B>(chunk, device);
        let predictions = model.forward(batch.inputs, &batch.lengths, false);
        let loss = loss_fn.forward(predictions, batch.targets, Reduction::Mean);
        loss_sum += loss.into_scalar().elem::<f64>() * chunk.len() as f64;
    }
    Ok(loss_sum / samples.len() as f64)
}
