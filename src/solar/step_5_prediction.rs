// External imports
use anyhow::{anyhow, Result};
use burn::tensor::backend::Backend;
use chrono::{NaiveDate, NaiveTime};
use log::{info, warn};
use serde::{Deserialize, Serialize};

// Internal imports
use super::step_1_tensor_preparation::{sample_from_prefix, samples_to_batch, SequenceSample};
use super::step_3_rnn_model_arch::SolarRnnModel;
use crate::error::ForecastError;
use crate::util::pre_processor::{DaySeries, TargetScaler};

/// Forecast of one day's final output made at `cutoff`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DayForecast {
    pub date: NaiveDate,
    pub cutoff: NaiveTime,
    pub readings_used: usize,
    /// Cumulative output at the cutoff
    pub observed_so_far: f64,
    pub predicted: f64,
    /// Final output of the day, when known
    pub actual: f64,
}

impl DayForecast {
    pub fn error(&self) -> f64 {
        self.predicted - self.actual
    }
}

/// Make predictions for a set of samples
///
/// # Arguments
///
/// * `model` - Trained model
/// * `samples` - Samples to predict, any lengths
/// * `batch_size` - Samples per forward pass
/// * `device` - Device to place tensors on
///
/// # Returns
///
/// Returns one normalized prediction per sample, in input order
pub fn predict_samples<B: Backend>(
    model: &SolarRnnModel<B>,
    samples: &[SequenceSample],
    batch_size: usize,
    device: &B::Device,
) -> Result<Vec<f32>> {
    let mut predictions = Vec::with_capacity(samples.len());
    for chunk in samples.chunks(batch_size.max(1)) {
        let batch = samples_to_batch::<B>(chunk, device);
        let output = model.predict(batch.inputs, &batch.lengths);
        let values = output
            .into_data()
            .convert::<f32>()
            .to_vec::<f32>()
            .map_err(|e| anyhow!("Failed to read predictions: {:?}", e))?;
        predictions.extend(values);
    }
    Ok(predictions)
}

/// Predict the final output of `day` from the readings up to `cutoff`
pub fn forecast_day<B: Backend>(
    model: &SolarRnnModel<B>,
    day: &DaySeries,
    cutoff: NaiveTime,
    scaler: &TargetScaler,
    device: &B::Device,
) -> Result<DayForecast> {
    let prefix = day.prefix_until(cutoff);
    if prefix.is_empty() {
        return Err(ForecastError::EmptyPrefix {
            date: day.date,
            cutoff,
        }
        .into());
    }

    let sample = sample_from_prefix(day.date, prefix, day.final_output(), scaler);
    let predicted = predict_samples(model, std::slice::from_ref(&sample), 1, device)?;
    let predicted = predicted
        .first()
        .copied()
        .ok_or_else(|| anyhow!("Model returned no prediction for {}", day.date))?;

    Ok(DayForecast {
        date: day.date,
        cutoff,
        readings_used: prefix.len(),
        observed_so_far: prefix.last().map(|r| r.cumulative).unwrap_or(0.0),
        predicted: scaler.denormalize(predicted as f64),
        actual: day.final_output(),
    })
}

/// Forecast every day that has readings before `cutoff`
///
/// Days without any reading at or before the cutoff are skipped.
pub fn evaluate_days<B: Backend>(
    model: &SolarRnnModel<B>,
    days: &[DaySeries],
    cutoff: NaiveTime,
    scaler: &TargetScaler,
    device: &B::Device,
) -> Result<(Vec<DayForecast>, ForecastMetrics)> {
    let mut usable = Vec::with_capacity(days.len());
    let mut samples = Vec::with_capacity(days.len());
    for day in days {
        let prefix = day.prefix_until(cutoff);
        if prefix.is_empty() {
            warn!("Skipping {}: no readings at or before {}", day.date, cutoff);
            continue;
        }
        samples.push(sample_from_prefix(day.date, prefix, day.final_output(), scaler));
        usable.push((day, prefix.len(), prefix.last().map(|r| r.cumulative).unwrap_or(0.0)));
    }

    let predictions = predict_samples(model, &samples, 64, device)?;
    let forecasts: Vec<DayForecast> = usable
        .into_iter()
        .zip(predictions)
        .map(|((day, readings_used, observed_so_far), predicted)| DayForecast {
            date: day.date,
            cutoff,
            readings_used,
            observed_so_far,
            predicted: scaler.denormalize(predicted as f64),
            actual: day.final_output(),
        })
        .collect();

    let metrics = ForecastMetrics::from_forecasts(&forecasts);
    info!(
        "Cutoff {}: {} day(s), MAE = {:.4}, RMSE = {:.4}",
        cutoff, metrics.count, metrics.mae, metrics.rmse
    );
    Ok((forecasts, metrics))
}

/// Metrics for each cutoff, earliest first
pub fn evaluate_cutoffs<B: Backend>(
    model: &SolarRnnModel<B>,
    days: &[DaySeries],
    cutoffs: &[NaiveTime],
    scaler: &TargetScaler,
    device: &B::Device,
) -> Result<Vec<(NaiveTime, ForecastMetrics)>> {
    let mut sorted = cutoffs.to_vec();
    sorted.sort();
    sorted.dedup();

    sorted
        .into_iter()
        .map(|cutoff| {
            let (_, metrics) = evaluate_days(model, days, cutoff, scaler, device)?;
            Ok((cutoff, metrics))
        })
        .collect()
}

/// Error summary in physical units
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, Default)]
pub struct ForecastMetrics {
    pub count: usize,
    pub mae: f64,
    pub rmse: f64,
    /// Mean absolute percentage error over days with a non-zero actual
    pub mape: Option<f64>,
}

impl ForecastMetrics {
    pub fn from_forecasts(forecasts: &[DayForecast]) -> Self {
        if forecasts.is_empty() {
            return Self::default();
        }

        let n = forecasts.len() as f64;
        let mae = forecasts.iter().map(|f| f.error().abs()).sum::<f64>() / n;
        let mse = forecasts.iter().map(|f| f.error().powi(2)).sum::<f64>() / n;

        let percentage_errors: Vec<f64> = forecasts
            .iter()
            .filter(|f| f.actual.abs() > f64::EPSILON)
            .map(|f| (f.error() / f.actual).abs() * 100.0)
            .collect();
        let mape = if percentage_errors.is_empty() {
            None
        } else {
            Some(percentage_errors.iter().sum::<f64>() / percentage_errors.len() as f64)
        };

        Self {
            count: forecasts.len(),
            mae,
            rmse: mse.sqrt(),
            mape,
        }
    }
}
