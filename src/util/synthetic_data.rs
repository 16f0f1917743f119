//! Seeded synthetic solar readings.
//!
//! Each day follows a bell-shaped production curve between sunrise and
//! sunset. Day length follows the season and a per-day cloud factor scales
//! the peak, so final daily totals vary the way real installations do.

// External imports
use chrono::{Datelike, Duration, NaiveDate, NaiveTime};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use std::f64::consts::PI;

// Internal imports
use crate::util::pre_processor::Reading;

/// Configuration for generating synthetic readings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyntheticConfig {
    pub start_date: NaiveDate,
    pub days: usize,
    pub interval_minutes: u32,
    /// Clear-sky peak power in kW
    pub peak_kw: f64,
    pub seed: u64,
}

impl Default for SyntheticConfig {
    fn default() -> Self {
        Self {
            start_date: NaiveDate::from_ymd_opt(2020, 5, 15).unwrap_or(NaiveDate::MIN),
            days: 60,
            interval_minutes: 15,
            peak_kw: 5.0,
            seed: 7,
        }
    }
}

/// Generates cumulative daily-yield readings (kWh) for every interval of every day
pub fn generate_synthetic_readings(config: &SyntheticConfig) -> Vec<Reading> {
    let mut rng = StdRng::seed_from_u64(config.seed);
    let interval = config.interval_minutes.max(1);
    let steps_per_day = 24 * 60 / interval;
    let mut readings = Vec::with_capacity(config.days * steps_per_day as usize);

    for day_index in 0..config.days {
        let date = config.start_date + Duration::days(day_index as i64);

        // Longer days around the June solstice
        let season = (2.0 * PI * (date.ordinal() as f64 - 172.0) / 365.0).cos();
        let half_day_hours = 6.0 + 2.0 * season;
        let sunrise = 12.0 - half_day_hours;
        let sunset = 12.0 + half_day_hours;

        let cloud_factor: f64 = rng.random_range(0.35..1.0);
        let mut cumulative = 0.0f64;

        for step in 0..steps_per_day {
            let minute = step * interval;
            let hour = minute as f64 / 60.0;
            let power = if hour > sunrise && hour < sunset {
                let phase = (hour - sunrise) / (sunset - sunrise);
                let noise: f64 = rng.random_range(0.9..1.1);
                config.peak_kw * cloud_factor * (PI * phase).sin().powi(2) * noise
            } else {
                0.0
            };
            cumulative += power * interval as f64 / 60.0;

            let time = NaiveTime::from_num_seconds_from_midnight_opt(minute * 60, 0)
                .unwrap_or(NaiveTime::MIN);
            readings.push(Reading {
                timestamp: date.and_time(time),
                value: cumulative,
            });
        }
    }

    readings
}
