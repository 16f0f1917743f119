// External crates
use anyhow::{Context, Result};
use burn::module::AutodiffModule;
use burn_ndarray::NdArrayDevice;
use chrono::{NaiveDate, NaiveTime};
use clap::Parser;
use log::{info, warn};
use std::path::{Path, PathBuf};
use std::time::Instant;

// Local modules
use solar_daily_forecast::config::{DataConfig, PipelineConfig};
use solar_daily_forecast::constants::{
    DEFAULT_CUTOFF, EXPERIMENTS_PATH, MODEL_FILE_NAME, MODEL_PATH,
};
use solar_daily_forecast::error::ForecastError;
use solar_daily_forecast::solar::step_1_tensor_preparation::build_prefix_samples;
use solar_daily_forecast::solar::step_3_rnn_model_arch::{CellKind, SolarRnnConfig, SolarRnnModel};
use solar_daily_forecast::solar::step_4_train_model::{train_model, CheckpointTarget};
use solar_daily_forecast::solar::step_5_prediction::{
    evaluate_cutoffs, evaluate_days, forecast_day, DayForecast, ForecastMetrics,
};
use solar_daily_forecast::solar::step_6_model_serialization::ModelMetadata;
use solar_daily_forecast::solar::{InferenceBackend, TrainingBackend};
use solar_daily_forecast::util::pre_processor::{group_by_day, split_days, DaySeries, TargetScaler};
use solar_daily_forecast::util::synthetic_data::{generate_synthetic_readings, SyntheticConfig};
use solar_daily_forecast::util::{file_utils, model_logger, model_utils, plotting};

#[derive(clap::Parser, Debug)]
enum Args {
    /// Loads a readings CSV, trains a model on the earliest days and reports
    /// its error on the most recent ones.
    // cargo run -- train --csv data/plant_1.csv --cell gru --cutoff 11:00
    Train {
        /// CSV with a timestamp column and a cumulative (or interval) output column
        #[clap(long)]
        csv: PathBuf,

        /// Optional JSON pipeline configuration
        #[clap(long)]
        config: Option<PathBuf>,

        #[clap(long, default_value = MODEL_PATH)]
        model_dir: PathBuf,

        /// Base file name of the saved model
        #[clap(long, default_value = MODEL_FILE_NAME)]
        name: String,

        /// Recurrence cell, lstm or gru
        #[clap(long)]
        cell: Option<CellKind>,

        #[clap(long)]
        epochs: Option<usize>,

        /// Time of day (HH:MM) the test forecasts are made at
        #[clap(long, default_value = DEFAULT_CUTOFF, value_parser = parse_cutoff)]
        cutoff: NaiveTime,

        /// Directory for the forecast and loss charts
        #[clap(long)]
        plot_dir: Option<PathBuf>,

        #[clap(long, default_value = EXPERIMENTS_PATH)]
        experiments_dir: PathBuf,
    },

    /// Reloads a saved model and reports test-day error at one or more cutoffs.
    // cargo run -- evaluate --csv data/plant_1.csv --model-dir models --cutoffs 09:00,12:00,15:00
    Evaluate {
        #[clap(long)]
        csv: PathBuf,

        #[clap(long, default_value = MODEL_PATH)]
        model_dir: PathBuf,

        #[clap(long, default_value = MODEL_FILE_NAME)]
        name: String,

        /// Comma separated HH:MM cutoffs
        #[clap(long, value_delimiter = ',', value_parser = parse_cutoff)]
        cutoffs: Vec<NaiveTime>,

        /// PNG of actual vs predicted totals at the earliest cutoff
        #[clap(long)]
        plot: Option<PathBuf>,
    },

    /// Forecasts the final output of a single day from its readings up to the cutoff.
    // cargo run -- forecast --csv data/plant_1.csv --date 2020-06-10 --cutoff 10:30
    Forecast {
        #[clap(long)]
        csv: PathBuf,

        #[clap(long, default_value = MODEL_PATH)]
        model_dir: PathBuf,

        #[clap(long, default_value = MODEL_FILE_NAME)]
        name: String,

        /// Day to forecast, YYYY-MM-DD
        #[clap(long)]
        date: NaiveDate,

        #[clap(long, default_value = DEFAULT_CUTOFF, value_parser = parse_cutoff)]
        cutoff: NaiveTime,

        /// PNG of the day's cumulative curve with the forecast
        #[clap(long)]
        plot: Option<PathBuf>,
    },

    /// Writes seeded synthetic readings to a CSV.
    // cargo run -- synthesize --output data/synthetic.csv --days 90
    Synthesize {
        #[clap(long)]
        output: PathBuf,

        #[clap(long, default_value_t = 60)]
        days: usize,

        #[clap(long, default_value_t = 15)]
        interval_minutes: u32,

        #[clap(long, default_value_t = 7)]
        seed: u64,
    },
}

fn parse_cutoff(raw: &str) -> std::result::Result<NaiveTime, String> {
    NaiveTime::parse_from_str(raw.trim(), "%H:%M")
        .map_err(|e| format!("expected HH:MM, got '{}': {}", raw, e))
}

fn main() -> Result<()> {
    // Library logging goes through `log`; the subscriber picks it up
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    match Args::parse() {
        Args::Train {
            csv,
            config,
            model_dir,
            name,
            cell,
            epochs,
            cutoff,
            plot_dir,
            experiments_dir,
        } => {
            let mut pipeline = match config {
                Some(path) => PipelineConfig::load(&path)
                    .with_context(|| format!("Failed to load config {}", path.display()))?,
                None => PipelineConfig::default(),
            };
            if let Some(cell) = cell {
                pipeline.training.cell = cell;
            }
            if let Some(epochs) = epochs {
                pipeline.training.epochs = epochs;
            }
            pipeline.validate()?;

            train_and_evaluate(
                &csv,
                &pipeline,
                &model_dir,
                &name,
                cutoff,
                plot_dir.as_deref(),
                &experiments_dir,
            )?;
        }
        Args::Evaluate {
            csv,
            model_dir,
            name,
            cutoffs,
            plot,
        } => {
            let cutoffs = if cutoffs.is_empty() {
                vec![parse_cutoff(DEFAULT_CUTOFF).map_err(anyhow::Error::msg)?]
            } else {
                cutoffs
            };
            let results = evaluate_saved_model(&csv, &model_dir, &name, &cutoffs, plot.as_deref())?;
            println!("{:>6}  {:>5}  {:>10}  {:>10}  {:>8}", "cutoff", "days", "MAE", "RMSE", "MAPE");
            for (cutoff, metrics) in &results {
                println!(
                    "{:>6}  {:>5}  {:>10.4}  {:>10.4}  {:>8}",
                    cutoff.format("%H:%M").to_string(),
                    metrics.count,
                    metrics.mae,
                    metrics.rmse,
                    metrics
                        .mape
                        .map(|m| format!("{:.2}%", m))
                        .unwrap_or_else(|| "n/a".to_string())
                );
            }
        }
        Args::Forecast {
            csv,
            model_dir,
            name,
            date,
            cutoff,
            plot,
        } => {
            let forecast =
                forecast_single_day(&csv, &model_dir, &name, date, cutoff, plot.as_deref())?;
            println!(
                "{} at {}: observed {:.2} from {} readings, predicted final {:.2}, actual final {:.2}",
                forecast.date,
                forecast.cutoff.format("%H:%M"),
                forecast.observed_so_far,
                forecast.readings_used,
                forecast.predicted,
                forecast.actual
            );
        }
        Args::Synthesize {
            output,
            days,
            interval_minutes,
            seed,
        } => {
            let written = synthesize_readings(&output, days, interval_minutes, seed)?;
            println!("Wrote {} readings to {}", written, output.display());
        }
    }

    Ok(())
}

fn load_days(csv: &Path, data: &DataConfig) -> Result<Vec<DaySeries>> {
    let readings = file_utils::load_readings_csv(csv, data)
        .with_context(|| format!("Failed to load readings from {}", csv.display()))?;
    Ok(group_by_day(&readings, data))
}

fn dataset_name(csv: &Path) -> String {
    csv.file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("dataset")
        .to_string()
}

fn train_and_evaluate(
    csv: &Path,
    pipeline: &PipelineConfig,
    model_dir: &Path,
    model_name: &str,
    cutoff: NaiveTime,
    plot_dir: Option<&Path>,
    experiments_dir: &Path,
) -> Result<PathBuf> {
    let data = &pipeline.data;
    let training = &pipeline.training;
    let device = NdArrayDevice::default();

    let days = load_days(csv, data)?;
    let split = split_days(&days, data.train_ratio, data.val_ratio)?;

    // Scaler sees training days only
    let scaler = TargetScaler::fit(&split.train);
    info!("Largest training-day output: {:.3}", scaler.max_output);

    let train_samples = build_prefix_samples(&split.train, &scaler, data);
    let val_samples = build_prefix_samples(&split.validation, &scaler, data);

    let model_config = SolarRnnConfig::new(
        training.hidden_size,
        training.dropout,
        training.cell,
        training.reduction,
    );
    let mut metadata = ModelMetadata::new(model_config.clone(), scaler, data.clone());

    let mut experiment = model_logger::ModelExperiment::new(
        &dataset_name(csv),
        training.cell,
        training.reduction,
        training.hidden_size,
        training.dropout,
        training.batch_size,
        training.learning_rate,
    );
    experiment.set_split_sizes(split.train.len(), split.validation.len(), split.test.len());

    println!("Starting model training...");
    let started = Instant::now();
    let outcome = train_model::<TrainingBackend>(
        train_samples,
        &val_samples,
        model_config,
        training,
        &device,
        Some(CheckpointTarget {
            model_dir,
            model_name,
            metadata: metadata.clone(),
        }),
    )?;
    let elapsed = started.elapsed().as_secs_f64();
    experiment.set_training_result(outcome.epochs_run, outcome.best_val_loss, elapsed);

    metadata.best_val_loss = Some(outcome.best_val_loss).filter(|v| v.is_finite());
    metadata.epochs_trained = outcome.epochs_run;
    let model: SolarRnnModel<InferenceBackend> = outcome.model.valid();
    let model_path = model_utils::save_trained_model(&model, &metadata, model_dir, model_name)?;
    println!("Trained and saved model to {}", model_path.display());

    // Evaluate model
    println!("Evaluating model on {} test day(s)...", split.test.len());
    let (forecasts, metrics) = evaluate_days(&model, &split.test, cutoff, &scaler, &device)?;
    println!(
        "Test at {}: MAE = {:.4}, RMSE = {:.4}, MAPE = {}",
        cutoff.format("%H:%M"),
        metrics.mae,
        metrics.rmse,
        metrics
            .mape
            .map(|m| format!("{:.2}%", m))
            .unwrap_or_else(|| "n/a".to_string())
    );
    experiment.set_test_metrics(&cutoff.format("%H:%M").to_string(), &metrics);

    if let Some(dir) = plot_dir {
        std::fs::create_dir_all(dir).context("Failed to create plot directory")?;
        let title = format!("Final daily output, forecast at {}", cutoff.format("%H:%M"));
        if let Err(e) = plotting::plot_forecasts(&dir.join("test_forecasts.png"), &forecasts, &title) {
            warn!("Could not plot forecasts: {:#}", e);
        }
        if let Err(e) = plotting::plot_loss_history(&dir.join("loss_history.png"), &outcome.history) {
            warn!("Could not plot loss history: {:#}", e);
        }
    }

    let run_dir = model_logger::create_experiment_dir(experiments_dir)?;
    pipeline.save(run_dir.join("pipeline_config.json"))?;
    let experiment_path = experiment.save(&run_dir)?;
    info!("Experiment logged to {}", experiment_path.display());

    Ok(model_path)
}

fn evaluate_saved_model(
    csv: &Path,
    model_dir: &Path,
    model_name: &str,
    cutoffs: &[NaiveTime],
    plot: Option<&Path>,
) -> Result<Vec<(NaiveTime, ForecastMetrics)>> {
    let device = NdArrayDevice::default();
    let model_path = model_utils::model_base_path(model_dir, model_name);
    if !model_utils::is_model_version_current(&model_path, env!("CARGO_PKG_VERSION")) {
        warn!(
            "Model {} was saved by a different version of this crate",
            model_path.display()
        );
    }
    let (model, metadata) =
        model_utils::load_trained_model::<InferenceBackend>(model_dir, model_name, &device)?;

    // Same split as training, rebuilt from the stored data settings
    let days = load_days(csv, &metadata.data)?;
    let split = split_days(&days, metadata.data.train_ratio, metadata.data.val_ratio)?;

    let results = evaluate_cutoffs(&model, &split.test, cutoffs, &metadata.scaler, &device)?;

    if let (Some(path), Some((cutoff, _))) = (plot, results.first()) {
        let (forecasts, _) = evaluate_days(&model, &split.test, *cutoff, &metadata.scaler, &device)?;
        let title = format!("Final daily output, forecast at {}", cutoff.format("%H:%M"));
        plotting::plot_forecasts(path, &forecasts, &title)?;
        info!("Forecast chart written to {}", path.display());
    }
    Ok(results)
}

fn forecast_single_day(
    csv: &Path,
    model_dir: &Path,
    model_name: &str,
    date: NaiveDate,
    cutoff: NaiveTime,
    plot: Option<&Path>,
) -> Result<DayForecast> {
    let device = NdArrayDevice::default();
    let (model, metadata) =
        model_utils::load_trained_model::<InferenceBackend>(model_dir, model_name, &device)?;
    let days = load_days(csv, &metadata.data)?;
    let day = days
        .iter()
        .find(|d| d.date == date)
        .ok_or(ForecastError::UnknownDay(date))?;

    let forecast = forecast_day(&model, day, cutoff, &metadata.scaler, &device)?;
    if let Some(path) = plot {
        plotting::plot_day_profile(path, day, &forecast)?;
        info!("Day profile written to {}", path.display());
    }
    Ok(forecast)
}

fn synthesize_readings(output: &Path, days: usize, interval_minutes: u32, seed: u64) -> Result<usize> {
    let readings = generate_synthetic_readings(&SyntheticConfig {
        days,
        interval_minutes,
        seed,
        ..SyntheticConfig::default()
    });
    file_utils::write_readings_csv(output, &readings)?;
    Ok(readings.len())
}
