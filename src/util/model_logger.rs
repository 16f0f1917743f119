use anyhow::Result;
use chrono::Local;
use serde::{Deserialize, Serialize};
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use crate::solar::step_3_rnn_model_arch::{CellKind, SequenceReduction};
use crate::solar::step_5_prediction::ForecastMetrics;

#[derive(Debug, Serialize, Deserialize)]
pub struct ModelExperiment {
    pub timestamp: String,
    pub dataset: String,
    pub cell: CellKind,
    pub reduction: SequenceReduction,
    pub hidden_size: usize,
    pub dropout: f64,
    pub batch_size: usize,
    pub learning_rate: f64,
    pub train_days: usize,
    pub validation_days: usize,
    pub test_days: usize,
    pub epochs_run: Option<usize>,
    pub best_val_loss: Option<f64>,
    pub cutoff: Option<String>,
    pub test_mae: Option<f64>,
    pub test_rmse: Option<f64>,
    pub training_time_seconds: Option<f64>,
    pub notes: String,
}

impl ModelExperiment {
    pub fn new(
        dataset: &str,
        cell: CellKind,
        reduction: SequenceReduction,
        hidden_size: usize,
        dropout: f64,
        batch_size: usize,
        learning_rate: f64,
    ) -> Self {
        Self {
            timestamp: Local::now().format("%Y-%m-%d %H:%M:%S").to_string(),
            dataset: dataset.to_string(),
            cell,
            reduction,
            hidden_size,
            dropout,
            batch_size,
            learning_rate,
            train_days: 0,
            validation_days: 0,
            test_days: 0,
            epochs_run: None,
            best_val_loss: None,
            cutoff: None,
            test_mae: None,
            test_rmse: None,
            training_time_seconds: None,
            notes: String::new(),
        }
    }

    pub fn set_split_sizes(&mut self, train: usize, validation: usize, test: usize) {
        self.train_days = train;
        self.validation_days = validation;
        self.test_days = test;
    }

    pub fn set_training_result(&mut self, epochs_run: usize, best_val_loss: f64, seconds: f64) {
        self.epochs_run = Some(epochs_run);
        self.best_val_loss = Some(best_val_loss).filter(|v| v.is_finite());
        self.training_time_seconds = Some(seconds);
    }

    pub fn set_test_metrics(&mut self, cutoff: &str, metrics: &ForecastMetrics) {
        self.cutoff = Some(cutoff.to_string());
        self.test_mae = Some(metrics.mae);
        self.test_rmse = Some(metrics.rmse);
    }

    pub fn add_note(&mut self, note: &str) {
        if !self.notes.is_empty() {
            self.notes.push('\n');
        }
        self.notes.push_str(note);
    }

    pub fn save(&self, experiment_dir: &Path) -> Result<PathBuf> {
        fs::create_dir_all(experiment_dir)?;

        let filename = format!(
            "{}_{}_h{}_d{}_experiment.json",
            self.dataset,
            self.cell,
            self.hidden_size,
            (self.dropout * 100.0).round() as i32,
        );
        let file_path = experiment_dir.join(filename);

        let json = serde_json::to_string_pretty(&self)?;
        let mut file = fs::File::create(&file_path)?;
        file.write_all(json.as_bytes())?;

        Ok(file_path)
    }
}

/// Creates a timestamped run directory under `root`
pub fn create_experiment_dir(root: &Path) -> Result<PathBuf> {
    let dir = root.join(Local::now().format("%Y%m%d_%H%M%S").to_string());
    fs::create_dir_all(&dir)?;
    Ok(dir)
}
