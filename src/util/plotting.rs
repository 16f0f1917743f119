//! ### Plotting
//! Renders forecasts and training curves as PNG charts.

use anyhow::anyhow;
use chrono::Timelike;
use plotters::prelude::*;
use plotters::style::full_palette::{BLUE_600, GREY_500, ORANGE_600};
use std::path::Path;

use crate::solar::step_4_train_model::EpochStats;
use crate::solar::step_5_prediction::DayForecast;
use crate::util::pre_processor::DaySeries;

const CHART_SIZE: (u32, u32) = (1080, 720);

/// Padded (min, max) of `values`, never an empty range
pub fn value_range(values: &[f64], pad_fraction: f64) -> (f64, f64) {
    let finite = values.iter().copied().filter(|v| v.is_finite());
    let (min, max) = finite.fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), v| {
        (lo.min(v), hi.max(v))
    });
    if !min.is_finite() || !max.is_finite() {
        return (0.0, 1.0);
    }
    let span = (max - min).abs();
    let pad = if span > f64::EPSILON {
        span * pad_fraction
    } else {
        max.abs().max(1.0) * 0.1
    };
    (min - pad, max + pad)
}

/// Actual vs predicted final output for each forecast day
pub fn plot_forecasts(path: &Path, forecasts: &[DayForecast], title: &str) -> anyhow::Result<()> {
    if forecasts.is_empty() {
        return Err(anyhow!("No forecasts to plot"));
    }

    let root = BitMapBackend::new(path, CHART_SIZE).into_drawing_area();
    root.fill(&WHITE)?;

    let values: Vec<f64> = forecasts
        .iter()
        .flat_map(|f| [f.actual, f.predicted])
        .collect();
    let (y_min, y_max) = value_range(&values, 0.1);
    let labels: Vec<String> = forecasts
        .iter()
        .map(|f| f.date.format("%m-%d").to_string())
        .collect();

    let mut chart = ChartBuilder::on(&root)
        .x_label_area_size(60)
        .y_label_area_size(72)
        .margin(20)
        .caption(title, ("sans-serif", 32.))
        .build_cartesian_2d(0..forecasts.len().max(2) - 1, y_min..y_max)?;

    chart
        .configure_mesh()
        .disable_x_mesh()
        .y_desc("Final daily output")
        .x_desc("Day")
        .axis_desc_style(("sans-serif", 24))
        .x_label_formatter(&|idx| labels.get(*idx).cloned().unwrap_or_default())
        .x_labels(forecasts.len().min(20))
        .y_label_formatter(&|v| format!("{:.1}", v))
        .draw()?;

    let actual: Vec<(usize, f64)> = forecasts.iter().enumerate().map(|(i, f)| (i, f.actual)).collect();
    let predicted: Vec<(usize, f64)> = forecasts
        .iter()
        .enumerate()
        .map(|(i, f)| (i, f.predicted))
        .collect();

    chart
        .draw_series(LineSeries::new(actual.clone(), BLUE_600.stroke_width(2)))?
        .label("actual")
        .legend(|(x, y)| Rectangle::new([(x, y - 5), (x + 10, y + 5)], BLUE_600.filled()));
    chart.draw_series(actual.iter().map(|&p| Circle::new(p, 4, BLUE_600.filled())))?;

    chart
        .draw_series(LineSeries::new(predicted.clone(), ORANGE_600.stroke_width(2)))?
        .label("predicted")
        .legend(|(x, y)| Rectangle::new([(x, y - 5), (x + 10, y + 5)], ORANGE_600.filled()));
    chart.draw_series(predicted.iter().map(|&p| Circle::new(p, 4, ORANGE_600.filled())))?;

    chart
        .configure_series_labels()
        .border_style(BLACK)
        .background_style(WHITE.mix(0.8))
        .position(SeriesLabelPosition::UpperRight)
        .draw()?;

    root.present()?;
    Ok(())
}

/// Training and validation loss per epoch
pub fn plot_loss_history(path: &Path, history: &[EpochStats]) -> anyhow::Result<()> {
    if history.is_empty() {
        return Err(anyhow!("No training history to plot"));
    }

    let root = BitMapBackend::new(path, CHART_SIZE).into_drawing_area();
    root.fill(&WHITE)?;

    let values: Vec<f64> = history
        .iter()
        .flat_map(|s| [s.train_loss, s.val_loss])
        .collect();
    let (_, y_max) = value_range(&values, 0.1);
    let last_epoch = history.last().map(|s| s.epoch).unwrap_or(1).max(2);

    let mut chart = ChartBuilder::on(&root)
        .x_label_area_size(60)
        .y_label_area_size(84)
        .margin(20)
        .caption("Training loss", ("sans-serif", 32.))
        .build_cartesian_2d(1..last_epoch, 0f64..y_max.max(f64::EPSILON))?;

    chart
        .configure_mesh()
        .y_desc("MSE (normalized)")
        .x_desc("Epoch")
        .axis_desc_style(("sans-serif", 24))
        .y_label_formatter(&|v| format!("{:.4}", v))
        .draw()?;

    chart
        .draw_series(LineSeries::new(
            history.iter().map(|s| (s.epoch, s.train_loss)),
            BLUE_600.stroke_width(2),
        ))?
        .label("train")
        .legend(|(x, y)| Rectangle::new([(x, y - 5), (x + 10, y + 5)], BLUE_600.filled()));

    chart
        .draw_series(LineSeries::new(
            history
                .iter()
                .filter(|s| s.val_loss.is_finite())
                .map(|s| (s.epoch, s.val_loss)),
            RED.stroke_width(2),
        ))?
        .label("validation")
        .legend(|(x, y)| Rectangle::new([(x, y - 5), (x + 10, y + 5)], RED.filled()));

    chart
        .configure_series_labels()
        .border_style(BLACK)
        .position(SeriesLabelPosition::UpperRight)
        .draw()?;

    root.present()?;
    Ok(())
}

/// Cumulative curve of one day with the cutoff and both final values marked
pub fn plot_day_profile(path: &Path, day: &DaySeries, forecast: &DayForecast) -> anyhow::Result<()> {
    if day.is_empty() {
        return Err(anyhow!("Day {} has no readings", day.date));
    }

    let root = BitMapBackend::new(path, CHART_SIZE).into_drawing_area();
    root.fill(&WHITE)?;

    let mut values: Vec<f64> = day.readings.iter().map(|r| r.cumulative).collect();
    values.push(forecast.predicted);
    values.push(0.0);
    let (y_min, y_max) = value_range(&values, 0.05);

    let to_hours = |second: u32| second as f64 / 3600.0;
    let cutoff_hours = to_hours(forecast.cutoff.num_seconds_from_midnight());

    let mut chart = ChartBuilder::on(&root)
        .x_label_area_size(60)
        .y_label_area_size(72)
        .margin(20)
        .caption(
            format!("{} forecast at {}", day.date, forecast.cutoff.format("%H:%M")),
            ("sans-serif", 32.),
        )
        .build_cartesian_2d(0f64..24f64, y_min..y_max)?;

    chart
        .configure_mesh()
        .disable_x_mesh()
        .x_desc("Hour of day")
        .y_desc("Cumulative output")
        .axis_desc_style(("sans-serif", 24))
        .x_labels(24)
        .x_label_formatter(&|h| format!("{:02.0}:00", h))
        .draw()?;

    let (seen, rest): (Vec<_>, Vec<_>) = day
        .readings
        .iter()
        .map(|r| (to_hours(r.second_of_day), r.cumulative))
        .partition(|(h, _)| *h <= cutoff_hours);

    chart
        .draw_series(LineSeries::new(seen.clone(), BLUE_600.stroke_width(3)))?
        .label("observed")
        .legend(|(x, y)| Rectangle::new([(x, y - 5), (x + 10, y + 5)], BLUE_600.filled()));
    let mut remainder = seen.last().copied().into_iter().collect::<Vec<_>>();
    remainder.extend(rest);
    chart
        .draw_series(LineSeries::new(remainder, GREY_500.stroke_width(2)))?
        .label("rest of day")
        .legend(|(x, y)| Rectangle::new([(x, y - 5), (x + 10, y + 5)], GREY_500.filled()));

    chart
        .draw_series(LineSeries::new(
            vec![(0.0, forecast.actual), (24.0, forecast.actual)],
            BLACK.stroke_width(1),
        ))?
        .label("actual final")
        .legend(|(x, y)| PathElement::new(vec![(x, y), (x + 10, y)], BLACK));
    chart
        .draw_series(LineSeries::new(
            vec![(0.0, forecast.predicted), (24.0, forecast.predicted)],
            ORANGE_600.stroke_width(2),
        ))?
        .label("predicted final")
        .legend(|(x, y)| PathElement::new(vec![(x, y), (x + 10, y)], ORANGE_600));
    chart.draw_series(LineSeries::new(
        vec![(cutoff_hours, y_min), (cutoff_hours, y_max)],
        RED.mix(0.6).stroke_width(1),
    ))?;

    chart
        .configure_series_labels()
        .border_style(BLACK)
        .position(SeriesLabelPosition::UpperLeft)
        .draw()?;

    root.present()?;
    Ok(())
}
