// External crates
use chrono::{DateTime, NaiveDateTime};
use log::{debug, info, warn};
use polars::prelude::*;
use std::fs::{self, File};
use std::path::Path;

// Local modules
use crate::config::DataConfig;
use crate::constants::{
    SOURCE_ALIASES, TIMESTAMP_FORMATS, TIME_ALIASES, TIME_COLUMN, VALUE_ALIASES, VALUE_COLUMN,
};
use crate::error::{ForecastError, Result};
use crate::util::pre_processor::Reading;

// Milliseconds since the epoch of a parsed timestamp, used only while aggregating
const INSTANT_COLUMN: &str = "instant_ms";

/// Picks the column to use, preferring an explicit name over the alias list
///
/// Matching is case-insensitive; the returned name is the one stored in the file.
pub fn resolve_column(
    column_names: &[String],
    explicit: Option<&str>,
    aliases: &[&str],
) -> Option<String> {
    if let Some(wanted) = explicit {
        return column_names
            .iter()
            .find(|name| name.eq_ignore_ascii_case(wanted))
            .cloned();
    }
    aliases.iter().find_map(|alias| {
        column_names
            .iter()
            .find(|name| name.trim().eq_ignore_ascii_case(alias))
            .cloned()
    })
}

/// Parses a timestamp using the first matching known layout
pub fn parse_timestamp(raw: &str) -> Result<NaiveDateTime> {
    let trimmed = raw.trim();
    TIMESTAMP_FORMATS
        .iter()
        .find_map(|format| NaiveDateTime::parse_from_str(trimmed, format).ok())
        .or_else(|| {
            DateTime::parse_from_rfc3339(trimmed)
                .ok()
                .map(|dt| dt.naive_local())
        })
        .ok_or_else(|| ForecastError::InvalidTimestamp(raw.to_string()))
}

/// Reads a CSV of power readings and aggregates them per timestamp
///
/// The time and value columns are located through `config` overrides or the
/// alias lists in `constants`. When a source column (one row per inverter) is
/// present, readings sharing a timestamp are summed; otherwise duplicates
/// collapse to their maximum.
///
/// # Arguments
///
/// * `path` - Path to the CSV file
/// * `config` - Column overrides
///
/// # Returns
///
/// Returns the readings sorted by timestamp
pub fn load_readings_csv<P: AsRef<Path>>(path: P, config: &DataConfig) -> Result<Vec<Reading>> {
    let path = path.as_ref();
    info!("Loading readings from {}", path.display());

    // Integer-looking meters may switch to decimals late in the file
    let df = CsvReadOptions::default()
        .with_has_header(true)
        .with_infer_schema_length(None)
        .try_into_reader_with_file_path(Some(path.to_path_buf()))?
        .finish()?;

    let column_names: Vec<String> = df
        .get_column_names()
        .iter()
        .map(|name| name.to_string())
        .collect();
    debug!("Columns in file: {:?}", column_names);

    let time_col = resolve_column(&column_names, config.time_column.as_deref(), &TIME_ALIASES)
        .ok_or_else(|| ForecastError::MissingColumn(describe(&config.time_column, "time")))?;
    let value_col = resolve_column(&column_names, config.value_column.as_deref(), &VALUE_ALIASES)
        .ok_or_else(|| ForecastError::MissingColumn(describe(&config.value_column, "value")))?;
    let source_col = resolve_column(
        &column_names,
        config.source_column.as_deref(),
        &SOURCE_ALIASES,
    );

    let raw = df
        .lazy()
        .select([
            col(time_col.as_str())
                .cast(DataType::String)
                .alias(TIME_COLUMN),
            col(value_col.as_str())
                .cast(DataType::Float64)
                .alias(VALUE_COLUMN),
        ])
        .drop_nulls(None)
        .collect()?;

    let times = raw.column(TIME_COLUMN)?.str()?;
    let values = raw.column(VALUE_COLUMN)?.f64()?;
    let mut instants = Vec::with_capacity(raw.height());
    let mut raw_values = Vec::with_capacity(raw.height());
    for (time, value) in times.into_iter().zip(values.into_iter()) {
        if let (Some(time), Some(value)) = (time, value) {
            instants.push(parse_timestamp(time)?.and_utc().timestamp_millis());
            raw_values.push(value);
        }
    }

    let aggregate = match &source_col {
        Some(source) => {
            info!("Summing readings across sources in column '{}'", source);
            col(VALUE_COLUMN).sum()
        }
        None => col(VALUE_COLUMN).max(),
    };

    // Grouping on the parsed instant merges differently written duplicates
    let aggregated = DataFrame::new(vec![
        Series::new(INSTANT_COLUMN.into(), instants).into_column(),
        Series::new(VALUE_COLUMN.into(), raw_values).into_column(),
    ])?
    .lazy()
    .group_by([col(INSTANT_COLUMN)])
    .agg([aggregate.alias(VALUE_COLUMN)])
    .collect()?;

    let instants = aggregated.column(INSTANT_COLUMN)?.i64()?;
    let values = aggregated.column(VALUE_COLUMN)?.f64()?;
    let mut readings: Vec<Reading> = instants
        .into_iter()
        .zip(values.into_iter())
        .filter_map(|(instant, value)| {
            let timestamp = DateTime::from_timestamp_millis(instant?)?.naive_utc();
            Some(Reading {
                timestamp,
                value: value?,
            })
        })
        .collect();
    readings.sort_by_key(|r| r.timestamp);

    if readings.is_empty() {
        warn!("No usable readings found in {}", path.display());
    } else {
        info!("Loaded {} timestamped readings", readings.len());
    }
    Ok(readings)
}

fn describe(explicit: &Option<String>, role: &str) -> String {
    match explicit {
        Some(name) => name.clone(),
        None => format!("<any {} column>", role),
    }
}

/// Writes readings as a `date_time,daily_yield` CSV
pub fn write_readings_csv<P: AsRef<Path>>(path: P, readings: &[Reading]) -> Result<()> {
    let path = path.as_ref();
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }

    let times: Vec<String> = readings
        .iter()
        .map(|r| r.timestamp.format("%Y-%m-%d %H:%M:%S").to_string())
        .collect();
    let values: Vec<f64> = readings.iter().map(|r| r.value).collect();

    let mut df = DataFrame::new(vec![
        Series::new(TIME_COLUMN.into(), times).into_column(),
        Series::new(VALUE_COLUMN.into(), values).into_column(),
    ])?;

    let mut file = File::create(path)?;
    CsvWriter::new(&mut file).include_header(true).finish(&mut df)?;
    info!("Wrote {} readings to {}", readings.len(), path.display());
    Ok(())
}
