// src/plot.rs
// Static charts of a sampled trajectory, rendered with plotters into an RGB buffer and encoded as a PNG data URL.

use crate::error::{Result, SimulationError};
use crate::trajectory::Trajectory;
use base64::{engine::general_purpose, Engine as _}; // Base64 encoder for embedding image data
use image::ImageFormat;
use plotters::prelude::*;
use plotters::style::Palette99; // Distinct colours for many lanes
use std::io::Cursor;

/// Chart width in pixels.
pub const WIDTH: u32 = 640;
/// Chart height in pixels.
pub const HEIGHT: u32 = 400;

/// One named curve over time.
pub struct Series<'a> {
    pub label: String,
    pub values: &'a [f64],
}

/// Axis range covering every finite value, padded so flat curves still get a visible band.
fn value_range<'a>(series: impl IntoIterator<Item = &'a [f64]>) -> (f64, f64) {
    let (lo, hi) = series
        .into_iter()
        .flat_map(|s| s.iter().copied())
        .filter(|v| v.is_finite())
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), v| (lo.min(v), hi.max(v)));
    if lo > hi {
        return (-1.0, 1.0); // Nothing finite to show.
    }
    let pad = ((hi - lo) * 0.05).max(1e-3);
    (lo - pad, hi + pad)
}

/// Draws `series` against `times` and returns the PNG as a `data:` URL.
pub fn line_chart(title: &str, y_label: &str, times: &[f64], series: &[Series<'_>]) -> Result<String> {
    let mut pixel_buffer = vec![0u8; (WIDTH * HEIGHT * 3) as usize];

    {
        let root = BitMapBackend::with_buffer(&mut pixel_buffer, (WIDTH, HEIGHT)).into_drawing_area();
        root.fill(&WHITE).map_err(SimulationError::plot)?;

        let t_max = times.last().copied().unwrap_or(1.0).max(1e-9);
        let (y_min, y_max) = value_range(series.iter().map(|s| s.values));

        let mut chart = ChartBuilder::on(&root)
            .caption(title, ("sans-serif", 20).into_font())
            .margin(10)
            .x_label_area_size(35)
            .y_label_area_size(50)
            .build_cartesian_2d(0.0..t_max, y_min..y_max)
            .map_err(SimulationError::plot)?;

        chart
            .configure_mesh()
            .x_desc("t (s)")
            .y_desc(y_label)
            .draw()
            .map_err(SimulationError::plot)?;

        for (i, s) in series.iter().enumerate() {
            let color = Palette99::pick(i).stroke_width(1);
            // Non-finite samples are skipped; plotters cannot place them.
            let points = times
                .iter()
                .zip(s.values.iter())
                .filter(|(_, v)| v.is_finite())
                .map(|(&t, &v)| (t, v));
            chart
                .draw_series(LineSeries::new(points, color))
                .map_err(SimulationError::plot)?
                .label(s.label.clone())
                .legend(move |(x, y)| PathElement::new(vec![(x, y), (x + 15, y)], color));
        }

        if series.len() > 1 && series.len() <= 12 {
            chart
                .configure_series_labels()
                .background_style(WHITE.mix(0.8))
                .border_style(BLACK)
                .draw()
                .map_err(SimulationError::plot)?;
        }

        root.present().map_err(SimulationError::plot)?;
    }

    encode_png(pixel_buffer)
}

/// Wraps a raw RGB buffer into a base64 PNG data URL.
fn encode_png(pixel_buffer: Vec<u8>) -> Result<String> {
    let img_buffer = image::ImageBuffer::from_raw(WIDTH, HEIGHT, pixel_buffer)
        .ok_or_else(|| SimulationError::plot("failed to create image buffer"))?;
    let dynamic_image = image::DynamicImage::ImageRgb8(img_buffer);

    let mut png_buffer = Cursor::new(Vec::new());
    dynamic_image
        .write_to(&mut png_buffer, ImageFormat::Png)
        .map_err(SimulationError::plot)?;

    Ok(format!(
        "data:image/png;base64,{}",
        general_purpose::STANDARD.encode(png_buffer.into_inner())
    ))
}

fn per_lane(all: &[Vec<f64>]) -> Vec<Series<'_>> {
    all.iter()
        .enumerate()
        .map(|(i, v)| Series {
            label: format!("case {i}"),
            values: v,
        })
        .collect()
}

/// Every lane's `theta1` and `theta2` over time, one chart each.
pub fn angle_charts(traj: &Trajectory) -> Result<(String, String)> {
    let theta1: Vec<Vec<f64>> = (0..traj.lanes()).map(|i| traj.theta1_series(i)).collect();
    let theta2: Vec<Vec<f64>> = (0..traj.lanes()).map(|i| traj.theta2_series(i)).collect();
    Ok((
        line_chart("All θ1 vs. t", "θ1 (rad)", &traj.times, &per_lane(&theta1))?,
        line_chart("All θ2 vs. t", "θ2 (rad)", &traj.times, &per_lane(&theta2))?,
    ))
}

/// Every lane's joint coordinates over time, one chart per coordinate.
#[derive(Debug, Clone, Default)]
pub struct PositionCharts {
    pub x1: String,
    pub y1: String,
    pub x2: String,
    pub y2: String,
}

/// Charts of the Cartesian series: first joint and tip, pivot at the origin.
pub fn position_charts(traj: &Trajectory) -> Result<PositionCharts> {
    let cart = traj.cartesian();
    Ok(PositionCharts {
        x1: line_chart("All x1 vs. t", "x1 (m)", &traj.times, &per_lane(&cart.x1))?,
        y1: line_chart("All y1 vs. t", "y1 (m)", &traj.times, &per_lane(&cart.y1))?,
        x2: line_chart("All x2 vs. t", "x2 (m)", &traj.times, &per_lane(&cart.x2))?,
        y2: line_chart("All y2 vs. t", "y2 (m)", &traj.times, &per_lane(&cart.y2))?,
    })
}

/// Ensemble spread of angles and joint radii over time.
pub fn spread_chart(traj: &Trajectory) -> Result<String> {
    let stats = traj.ensemble_stats();
    let series = [
        Series { label: "σ(θ1) [rad]".into(), values: &stats.sigma_theta1 },
        Series { label: "σ(θ2) [rad]".into(), values: &stats.sigma_theta2 },
        Series { label: "σ(r1) [m]".into(), values: &stats.sigma_r1 },
        Series { label: "σ(r2) [m]".into(), values: &stats.sigma_r2 },
    ];
    line_chart("Ensemble spread vs. t", "σ", &traj.times, &series)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_value_range_pads_flat_series() {
        let flat = [2.0, 2.0, 2.0];
        let (lo, hi) = value_range([&flat[..]]);
        assert!(lo < 2.0 && hi > 2.0);
    }

    #[test]
    fn test_value_range_ignores_non_finite() {
        let data = [1.0, f64::NAN, 3.0, f64::INFINITY];
        let (lo, hi) = value_range([&data[..]]);
        assert!(lo < 1.0 && lo > 0.8);
        assert!(hi > 3.0 && hi < 3.2);
        let empty: [f64; 0] = [];
        assert_eq!(value_range([&empty[..]]), (-1.0, 1.0));
    }

    #[test]
    fn test_encode_png_data_url() {
        let url = encode_png(vec![255u8; (WIDTH * HEIGHT * 3) as usize]).unwrap();
        assert!(url.starts_with("data:image/png;base64,"));
        assert!(encode_png(vec![0u8; 3]).is_err());
    }
}
