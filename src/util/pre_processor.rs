// External crates
use chrono::{NaiveDate, NaiveDateTime, NaiveTime, Timelike};
use log::{debug, info};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

// Local modules
use crate::config::{DataConfig, ReadingKind};
use crate::error::{ForecastError, Result};

/// A single timestamped reading as loaded from disk
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Reading {
    pub timestamp: NaiveDateTime,
    pub value: f64,
}

/// A reading within a day, already accumulated
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DayReading {
    /// Seconds since midnight, kept at full precision for cutoff comparisons
    pub second_of_day: u32,
    pub cumulative: f64,
}

impl DayReading {
    pub fn time(&self) -> NaiveTime {
        NaiveTime::from_num_seconds_from_midnight_opt(self.second_of_day, 0)
            .unwrap_or(NaiveTime::MIN)
    }
}

/// All readings of one calendar day, ordered by time
#[derive(Debug, Clone, PartialEq)]
pub struct DaySeries {
    pub date: NaiveDate,
    pub readings: Vec<DayReading>,
}

impl DaySeries {
    /// Cumulative output at the end of the day
    pub fn final_output(&self) -> f64 {
        self.readings.last().map(|r| r.cumulative).unwrap_or(0.0)
    }

    /// Readings taken at or before `cutoff`
    pub fn prefix_until(&self, cutoff: NaiveTime) -> &[DayReading] {
        let cutoff_second = cutoff.num_seconds_from_midnight();
        let end = self
            .readings
            .partition_point(|r| r.second_of_day <= cutoff_second);
        &self.readings[..end]
    }

    pub fn len(&self) -> usize {
        self.readings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.readings.is_empty()
    }
}

/// Groups readings by calendar date into cumulative daily sequences
///
/// # Arguments
///
/// * `readings` - Loaded readings, in any order
/// * `config` - Supplies the reading kind and the minimum readings per day
///
/// # Returns
///
/// Returns the usable days ordered by date
pub fn group_by_day(readings: &[Reading], config: &DataConfig) -> Vec<DaySeries> {
    let mut by_date: BTreeMap<NaiveDate, Vec<(u32, f64)>> = BTreeMap::new();
    for reading in readings {
        by_date
            .entry(reading.timestamp.date())
            .or_default()
            .push((reading.timestamp.time().num_seconds_from_midnight(), reading.value));
    }

    let mut days = Vec::with_capacity(by_date.len());
    let mut dropped = 0usize;

    for (date, mut raw) in by_date {
        if raw.len() < config.min_readings_per_day {
            dropped += 1;
            continue;
        }
        raw.sort_by_key(|(second, _)| *second);

        let mut running = 0.0f64;
        let readings = raw
            .into_iter()
            .map(|(second_of_day, value)| {
                let value = if value.is_finite() { value } else { 0.0 };
                running = match config.reading_kind {
                    // Cumulative totals never go down within a day
                    ReadingKind::Cumulative => running.max(value),
                    ReadingKind::Interval => running + value.max(0.0),
                };
                DayReading {
                    second_of_day,
                    cumulative: running,
                }
            })
            .collect();

        days.push(DaySeries { date, readings });
    }

    if dropped > 0 {
        debug!(
            "Dropped {} day(s) with fewer than {} readings",
            dropped, config.min_readings_per_day
        );
    }
    info!("Grouped readings into {} day(s)", days.len());
    days
}

/// Days split in temporal order
#[derive(Debug, Clone)]
pub struct DaySplit {
    pub train: Vec<DaySeries>,
    pub validation: Vec<DaySeries>,
    pub test: Vec<DaySeries>,
}

/// Splits days into training, validation and test sets without shuffling
///
/// # Arguments
///
/// * `days` - Days ordered by date
/// * `train_ratio` - Share of days used for training
/// * `val_ratio` - Share of days used for validation; the rest is the test set
///
/// # Returns
///
/// Returns the three sets, each holding at least one day
pub fn split_days(days: &[DaySeries], train_ratio: f64, val_ratio: f64) -> Result<DaySplit> {
    if !(train_ratio > 0.0 && val_ratio > 0.0) || train_ratio + val_ratio >= 1.0 {
        return Err(ForecastError::InvalidConfig(format!(
            "split ratios must be positive and sum below 1 (train={}, val={})",
            train_ratio, val_ratio
        )));
    }

    let n = days.len();
    let n_train = (n as f64 * train_ratio).floor() as usize;
    let n_val = (n as f64 * val_ratio).floor() as usize;
    if n_train == 0 || n_val == 0 || n_train + n_val >= n {
        return Err(ForecastError::NotEnoughDays {
            required: minimum_days(train_ratio, val_ratio),
            found: n,
        });
    }

    let split = DaySplit {
        train: days[..n_train].to_vec(),
        validation: days[n_train..n_train + n_val].to_vec(),
        test: days[n_train + n_val..].to_vec(),
    };
    info!(
        "Split {} days: {} train, {} validation, {} test",
        n,
        split.train.len(),
        split.validation.len(),
        split.test.len()
    );
    Ok(split)
}

// Smallest day count for which every split gets at least one day
fn minimum_days(train_ratio: f64, val_ratio: f64) -> usize {
    (3..10_000)
        .find(|&n| {
            let n_train = (n as f64 * train_ratio).floor() as usize;
            let n_val = (n as f64 * val_ratio).floor() as usize;
            n_train > 0 && n_val > 0 && n_train + n_val < n
        })
        .unwrap_or(3)
}

/// Scales outputs into [0, 1] using the largest training-day total
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TargetScaler {
    pub max_output: f64,
}

impl TargetScaler {
    /// Fits the scaler on training days only
    pub fn fit(train_days: &[DaySeries]) -> Self {
        let max_output = train_days
            .iter()
            .map(DaySeries::final_output)
            .fold(0.0f64, f64::max);
        let max_output = if max_output > 0.0 { max_output } else { 1.0 };
        Self { max_output }
    }

    pub fn normalize(&self, value: f64) -> f64 {
        value / self.max_output
    }

    pub fn denormalize(&self, value: f64) -> f64 {
        value * self.max_output
    }
}
