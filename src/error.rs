use chrono::{NaiveDate, NaiveTime};
use polars::error::PolarsError;
use thiserror::Error;

/// Errors raised while turning raw readings into model-ready sequences
#[derive(Debug, Error)]
pub enum ForecastError {
    #[error("column not found: {0}")]
    MissingColumn(String),

    #[error("could not parse timestamp '{0}'")]
    InvalidTimestamp(String),

    #[error("need at least {required} usable days, found {found}")]
    NotEnoughDays { required: usize, found: usize },

    #[error("no readings at or before {cutoff} on {date}")]
    EmptyPrefix { date: NaiveDate, cutoff: NaiveTime },

    #[error("day {0} not found in data")]
    UnknownDay(NaiveDate),

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error(transparent)]
    Polars(#[from] PolarsError),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, ForecastError>;
