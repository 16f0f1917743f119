// Canonical column names after loading
pub const TIME_COLUMN: &str = "date_time";
pub const VALUE_COLUMN: &str = "daily_yield";

// Accepted aliases, matched case-insensitively
pub const TIME_ALIASES: [&str; 6] = ["date_time", "datetime", "timestamp", "time", "date", "dt"];
pub const VALUE_ALIASES: [&str; 7] = [
    "daily_yield",
    "cum_power",
    "cumulative_power",
    "yield",
    "energy",
    "power",
    "ac_power",
];
pub const SOURCE_ALIASES: [&str; 4] = ["source_key", "source", "inverter", "inverter_id"];

// Timestamp layouts tried in order
pub const TIMESTAMP_FORMATS: [&str; 7] = [
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%d %H:%M",
    "%Y-%m-%dT%H:%M:%S",
    "%d-%m-%Y %H:%M",
    "%d-%m-%Y %H:%M:%S",
    "%d/%m/%Y %H:%M",
    "%m/%d/%Y %H:%M",
];

// Model parameters
pub const INPUT_FEATURES: usize = 2; // time-of-day fraction, scaled cumulative output
pub const SECONDS_PER_DAY: f32 = 86_400.0;
pub const DEFAULT_HIDDEN_SIZE: usize = 32;
pub const DEFAULT_CUTOFF: &str = "12:00";

// Data preprocessing
pub const TRAIN_SPLIT_RATIO: f64 = 0.7;
pub const VALIDATION_SPLIT_RATIO: f64 = 0.15;
pub const MIN_READINGS_PER_DAY: usize = 8;

// Model paths
pub const MODEL_PATH: &str = "models";
pub const MODEL_FILE_NAME: &str = "solar_rnn_model";
pub const EXPERIMENTS_PATH: &str = "experiments";
