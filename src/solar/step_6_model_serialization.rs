use anyhow::{Context, Result};
use burn::module::Module;
use burn::record::{BinFileRecorder, FullPrecisionSettings};
use burn::tensor::backend::Backend;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use super::step_3_rnn_model_arch::{SolarRnnConfig, SolarRnnModel};
use crate::built_info;
use crate::config::DataConfig;
use crate::util::pre_processor::TargetScaler;

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct ModelMetadata {
    pub version: String,
    pub rustc_version: String,
    pub timestamp: u64,
    pub model: SolarRnnConfig,
    pub scaler: TargetScaler,
    /// Settings needed to rebuild days and samples exactly as in training
    pub data: DataConfig,
    pub best_val_loss: Option<f64>,
    pub epochs_trained: usize,
}

impl ModelMetadata {
    pub fn new(model: SolarRnnConfig, scaler: TargetScaler, data: DataConfig) -> Self {
        Self {
            version: built_info::PKG_VERSION.to_string(),
            rustc_version: built_info::RUSTC_VERSION.to_string(),
            timestamp: SystemTime::now()
                .duration_since(SystemTime::UNIX_EPOCH)
                .unwrap_or_default()
                .as_secs(),
            model,
            scaler,
            data,
            best_val_loss: None,
            epochs_trained: 0,
        }
    }
}

/// Append `suffix` to the file name, keeping any dots already in it
fn with_suffix(base: &Path, suffix: &str) -> PathBuf {
    let mut name = base.as_os_str().to_owned();
    name.push(suffix);
    PathBuf::from(name)
}

fn weights_path(base: &Path) -> PathBuf {
    with_suffix(base, ".bin")
}

fn metadata_path(base: &Path) -> PathBuf {
    with_suffix(base, ".meta.json")
}

/// Save the model weights and metadata next to each other
///
/// Writes `<base>.bin` and `<base>.meta.json`.
pub fn save_model_with_metadata<B: Backend>(
    model: &SolarRnnModel<B>,
    metadata: &ModelMetadata,
    path: impl AsRef<Path>,
) -> Result<()> {
    let base = path.as_ref();
    if let Some(parent) = base.parent() {
        std::fs::create_dir_all(parent).context("Failed to create model parent directory")?;
    }

    model
        .clone()
        .save_file::<BinFileRecorder<FullPrecisionSettings>, _>(
            weights_path(base),
            &Default::default(),
        )
        .context("Failed to save model")?;

    let metadata_json =
        serde_json::to_string_pretty(metadata).context("Failed to serialize metadata")?;
    std::fs::write(metadata_path(base), metadata_json).context("Failed to write metadata file")?;
    Ok(())
}

/// Read only the metadata of a saved model
pub fn load_metadata(path: impl AsRef<Path>) -> Result<ModelMetadata> {
    let metadata_json = std::fs::read_to_string(metadata_path(path.as_ref()))
        .context("Failed to read metadata file")?;
    serde_json::from_str(&metadata_json).context("Failed to parse metadata")
}

/// Load the model and its metadata
///
/// The architecture is rebuilt from the stored configuration before the
/// weights are loaded into it.
pub fn load_model_with_metadata<B: Backend>(
    path: impl AsRef<Path>,
    device: &B::Device,
) -> Result<(SolarRnnModel<B>, ModelMetadata)> {
    let base = path.as_ref();
    let metadata = load_metadata(base)?;
    let model = metadata
        .model
        .init::<B>(device)
        .load_file::<BinFileRecorder<FullPrecisionSettings>, _>(
            weights_path(base),
            &Default::default(),
            device,
        )
        .context("Failed to load model")?;
    Ok((model, metadata))
}

/// Check if a model file exists and is valid
pub fn verify_model(path: impl AsRef<Path>) -> Result<bool> {
    let base = path.as_ref();
    if !weights_path(base).exists() || !metadata_path(base).exists() {
        return Ok(false);
    }
    load_metadata(base)?;
    Ok(true)
}
