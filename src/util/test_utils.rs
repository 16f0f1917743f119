// External imports
use chrono::{NaiveDate, NaiveDateTime, NaiveTime};

// Internal imports
use crate::config::DataConfig;
use crate::solar::step_1_tensor_preparation::SequenceSample;
use crate::util::pre_processor::{group_by_day, DaySeries, Reading};
use crate::util::synthetic_data::{generate_synthetic_readings, SyntheticConfig};

pub fn date(year: i32, month: u32, day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(year, month, day).unwrap()
}

pub fn at(date: NaiveDate, hour: u32, minute: u32) -> NaiveDateTime {
    date.and_time(NaiveTime::from_hms_opt(hour, minute, 0).unwrap())
}

pub fn hm(hour: u32, minute: u32) -> NaiveTime {
    NaiveTime::from_hms_opt(hour, minute, 0).unwrap()
}

/// Hourly cumulative readings from 06:00 growing by `step` each hour
pub fn linear_day_readings(day: NaiveDate, hours: u32, step: f64) -> Vec<Reading> {
    (0..hours)
        .map(|i| Reading {
            timestamp: at(day, 6 + i, 0),
            value: step * i as f64,
        })
        .collect()
}

/// `n_days` consecutive days of linear readings with increasing slopes
pub fn linear_days(n_days: usize, hours: u32) -> Vec<DaySeries> {
    let start = date(2020, 5, 15);
    let readings: Vec<Reading> = (0..n_days)
        .flat_map(|d| {
            linear_day_readings(start + chrono::Duration::days(d as i64), hours, 1.0 + d as f64)
        })
        .collect();
    let config = DataConfig {
        min_readings_per_day: 1,
        ..DataConfig::default()
    };
    group_by_day(&readings, &config)
}

/// Days generated by the synthetic solar profile
pub fn synthetic_days(days: usize, seed: u64) -> Vec<DaySeries> {
    let readings = generate_synthetic_readings(&SyntheticConfig {
        days,
        interval_minutes: 60,
        seed,
        ..SyntheticConfig::default()
    });
    group_by_day(&readings, &DataConfig::default())
}

/// A simple increasing sequence of `len` steps
pub fn ramp_sample(len: usize) -> SequenceSample {
    SequenceSample {
        date: date(2020, 6, 1),
        steps: (0..len)
            .map(|i| [0.25 + i as f32 / 48.0, i as f32 / len as f32])
            .collect(),
        target: 0.8,
    }
}
