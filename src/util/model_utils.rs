use anyhow::{Context, Result};
use burn::prelude::Backend;
use log::info;
use std::path::{Path, PathBuf};

use crate::solar::step_3_rnn_model_arch::SolarRnnModel;
use crate::solar::step_6_model_serialization::{
    load_metadata, load_model_with_metadata, save_model_with_metadata, ModelMetadata,
};

/// Base path (without extension) of a named model inside `model_dir`
pub fn model_base_path(model_dir: &Path, model_name: &str) -> PathBuf {
    model_dir.join(model_name)
}

/// Save a trained model with its metadata into `model_dir`
pub fn save_trained_model<B: Backend>(
    model: &SolarRnnModel<B>,
    metadata: &ModelMetadata,
    model_dir: &Path,
    model_name: &str,
) -> Result<PathBuf> {
    std::fs::create_dir_all(model_dir).context("Failed to create models directory")?;

    let model_path = model_base_path(model_dir, model_name);
    save_model_with_metadata(model, metadata, &model_path).context("Failed to save model")?;

    info!("Model saved to {}", model_path.display());
    Ok(model_path)
}

/// Load a trained model with its metadata from `model_dir`
pub fn load_trained_model<B: Backend>(
    model_dir: &Path,
    model_name: &str,
    device: &B::Device,
) -> Result<(SolarRnnModel<B>, ModelMetadata)> {
    let model_path = model_base_path(model_dir, model_name);
    info!("Loading model from {}", model_path.display());
    load_model_with_metadata(&model_path, device)
        .with_context(|| format!("Failed to load model {}", model_path.display()))
}

/// Save a model checkpoint during training as `<model_name>_epoch_<epoch>`
pub fn save_model_checkpoint<B: Backend>(
    model: &SolarRnnModel<B>,
    metadata: &ModelMetadata,
    model_dir: &Path,
    model_name: &str,
    epoch: usize,
) -> Result<PathBuf> {
    let checkpoint_name = format!("{}_epoch_{}", model_name, epoch);
    save_trained_model(model, metadata, model_dir, &checkpoint_name)
}

/// Check if the saved model was written by this version of the crate
pub fn is_model_version_current(model_base_path: &Path, current_version: &str) -> bool {
    load_metadata(model_base_path)
        .map(|metadata| metadata.version == current_version)
        .unwrap_or(false)
}
