//! Health curve rendering.
//!
//! Every render builds its own drawing backend, so back-to-back renders in a
//! batch never share chart state. Labels are drawn with a font bundled into
//! the crate, so bitmap output does not depend on fonts installed on the host.
use std::ops::Range;
use std::path::Path;
use std::sync::OnceLock;

use plotters::coord::Shift;
use plotters::prelude::*;
use plotters::style::{FontStyle, register_font};
use serde::{Deserialize, Serialize};

use crate::error::LogError;
use crate::health::{HealthPoint, INITIAL_HEALTH};

pub const X_AXIS_LABEL: &str = "Time";
pub const Y_AXIS_LABEL: &str = "Agent Health";

/// Family the chart mesh asks for when it draws labels.
const LABEL_FONT_FAMILY: &str = "sans-serif";
const LABEL_FONT: &[u8] = include_bytes!("../assets/DejaVuSans.ttf");

const CHART_MARGIN: u32 = 16;
const X_LABEL_AREA: u32 = 40;
const Y_LABEL_AREA: u32 = 48;

/// Output dimensions for rendered plots.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlotStyle {
    #[serde(default = "PlotStyle::default_width")]
    pub width: u32,
    #[serde(default = "PlotStyle::default_height")]
    pub height: u32,
}

impl PlotStyle {
    const fn default_width() -> u32 {
        640
    }

    const fn default_height() -> u32 {
        480
    }
}

impl Default for PlotStyle {
    fn default() -> Self {
        Self {
            width: Self::default_width(),
            height: Self::default_height(),
        }
    }
}

/// Image encodings chosen from the output file extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageFormat {
    Bitmap,
    Svg,
}

impl ImageFormat {
    #[must_use]
    pub fn from_path(path: &Path) -> Option<Self> {
        let extension = path.extension()?.to_str()?.to_ascii_lowercase();
        match extension.as_str() {
            "png" | "jpg" | "jpeg" | "bmp" => Some(Self::Bitmap),
            "svg" => Some(Self::Svg),
            _ => None,
        }
    }
}

/// Render a health curve as a line plot, replacing any image at `path`.
///
/// # Errors
///
/// Returns [`LogError::UnsupportedImageFormat`] for unknown extensions and
/// [`LogError::Plot`] if drawing or encoding the image fails.
pub fn render_health_plot(
    points: &[HealthPoint],
    path: &Path,
    style: PlotStyle,
) -> Result<(), LogError> {
    let size = (style.width, style.height);
    let plot_error = |message: String| LogError::Plot {
        path: path.to_path_buf(),
        message,
    };
    let Some(format) = ImageFormat::from_path(path) else {
        return Err(LogError::UnsupportedImageFormat {
            path: path.to_path_buf(),
        });
    };
    register_label_font().map_err(plot_error)?;
    match format {
        ImageFormat::Bitmap => {
            let root = BitMapBackend::new(path, size).into_drawing_area();
            draw_health_chart(&root, points, X_AXIS_LABEL, Y_AXIS_LABEL)
                .map_err(|err| plot_error(err.to_string()))
        }
        ImageFormat::Svg => {
            let root = SVGBackend::new(path, size).into_drawing_area();
            draw_health_chart(&root, points, X_AXIS_LABEL, Y_AXIS_LABEL)
                .map_err(|err| plot_error(err.to_string()))
        }
    }
}

/// Make the bundled font available to every backend. Only the first call
/// touches the process-wide font table.
fn register_label_font() -> Result<(), String> {
    static REGISTERED: OnceLock<bool> = OnceLock::new();
    let registered = *REGISTERED
        .get_or_init(|| register_font(LABEL_FONT_FAMILY, FontStyle::Normal, LABEL_FONT).is_ok());
    if registered {
        Ok(())
    } else {
        Err("bundled label font could not be parsed".to_string())
    }
}

fn draw_health_chart<DB: DrawingBackend>(
    root: &DrawingArea<DB, Shift>,
    points: &[HealthPoint],
    x_desc: &str,
    y_desc: &str,
) -> Result<(), DrawingAreaErrorKind<DB::ErrorType>> {
    root.fill(&WHITE)?;
    let (x_range, y_range) = axis_ranges(points);
    let mut chart = ChartBuilder::on(root)
        .margin(CHART_MARGIN)
        .x_label_area_size(X_LABEL_AREA)
        .y_label_area_size(Y_LABEL_AREA)
        .build_cartesian_2d(x_range, y_range)?;
    chart
        .configure_mesh()
        .x_desc(x_desc)
        .y_desc(y_desc)
        .draw()?;
    chart.draw_series(LineSeries::new(
        points.iter().map(|point| (point.time, point.health)),
        &BLUE,
    ))?;
    root.present()?;
    Ok(())
}

/// Axis spans covering every point, anchored at time zero and full health.
fn axis_ranges(points: &[HealthPoint]) -> (Range<f64>, Range<f64>) {
    let finite = points
        .iter()
        .filter(|point| point.time.is_finite() && point.health.is_finite());
    let (max_time, min_health, max_health) = finite.fold(
        (0.0_f64, 0.0_f64, INITIAL_HEALTH),
        |(max_time, min_health, max_health), point| {
            (
                max_time.max(point.time),
                min_health.min(point.health),
                max_health.max(point.health),
            )
        },
    );
    let max_time = if max_time > 0.0 { max_time } else { 1.0 };
    (0.0..max_time, min_health..max_health)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_curve() -> Vec<HealthPoint> {
        vec![
            HealthPoint::new(0.0, 100.0),
            HealthPoint::new(4.0, 75.0),
            HealthPoint::new(9.5, 30.0),
        ]
    }

    #[test]
    fn picks_format_from_extension() {
        assert_eq!(
            ImageFormat::from_path(Path::new("a/agent-0.png")),
            Some(ImageFormat::Bitmap)
        );
        assert_eq!(
            ImageFormat::from_path(Path::new("a/run1agent-0.JPG")),
            Some(ImageFormat::Bitmap)
        );
        assert_eq!(
            ImageFormat::from_path(Path::new("plot.svg")),
            Some(ImageFormat::Svg)
        );
        assert_eq!(ImageFormat::from_path(Path::new("plot.tiff")), None);
        assert_eq!(ImageFormat::from_path(Path::new("plot")), None);
    }

    #[test]
    fn axis_ranges_cover_points() {
        let (x, y) = axis_ranges(&[
            HealthPoint::new(0.0, 100.0),
            HealthPoint::new(12.0, -5.0),
            HealthPoint::new(3.0, 120.0),
        ]);
        assert_eq!(x, 0.0..12.0);
        assert_eq!(y, -5.0..120.0);
    }

    #[test]
    fn axis_ranges_never_collapse() {
        let (x, y) = axis_ranges(&[HealthPoint::new(0.0, 100.0)]);
        assert_eq!(x, 0.0..1.0);
        assert_eq!(y, 0.0..100.0);
    }

    #[test]
    fn renders_png_and_jpg() {
        let dir = tempfile::tempdir().unwrap();
        for name in ["agent-0.png", "run1agent-0.jpg"] {
            let path = dir.path().join(name);
            render_health_plot(&sample_curve(), &path, PlotStyle::default()).unwrap();
            assert!(std::fs::metadata(&path).unwrap().len() > 0);
        }
    }

    const BUFFER_SIZE: (u32, u32) = (320, 240);

    fn bitmap_pixels(x_desc: &str, y_desc: &str) -> Vec<u8> {
        register_label_font().unwrap();
        let (width, height) = BUFFER_SIZE;
        let mut buffer = vec![0_u8; (width * height * 3) as usize];
        {
            let root = BitMapBackend::with_buffer(&mut buffer, BUFFER_SIZE).into_drawing_area();
            draw_health_chart(&root, &sample_curve(), x_desc, y_desc).unwrap();
        }
        buffer
    }

    /// Pixels that differ between two RGB buffers inside the given region.
    fn changed_pixels(a: &[u8], b: &[u8], inside: impl Fn(u32, u32) -> bool) -> usize {
        let width = BUFFER_SIZE.0;
        a.chunks_exact(3)
            .zip(b.chunks_exact(3))
            .enumerate()
            .filter(|(index, (left, right))| {
                let index = u32::try_from(*index).unwrap();
                inside(index % width, index / width) && left != right
            })
            .count()
    }

    #[test]
    fn bitmap_axis_labels_are_rasterized() {
        let labelled = bitmap_pixels(X_AXIS_LABEL, Y_AXIS_LABEL);
        let bare = bitmap_pixels("", "");
        let (_, height) = BUFFER_SIZE;
        // Left of the plot area only the y label area differs; below it only the x one.
        let y_label = changed_pixels(&labelled, &bare, |x, _| x < CHART_MARGIN + Y_LABEL_AREA);
        let x_label = changed_pixels(&labelled, &bare, |_, y| {
            y >= height - CHART_MARGIN - X_LABEL_AREA
        });
        assert!(y_label > 0, "y axis label left no pixels");
        assert!(x_label > 0, "x axis label left no pixels");
    }

    #[test]
    fn svg_carries_axis_labels() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("agent-0.svg");
        render_health_plot(&sample_curve(), &path, PlotStyle::default()).unwrap();
        let svg = std::fs::read_to_string(&path).unwrap();
        assert!(svg.contains(X_AXIS_LABEL));
        assert!(svg.contains(Y_AXIS_LABEL));
    }

    #[test]
    fn successive_renders_do_not_share_curves() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("agent.svg");
        render_health_plot(&sample_curve(), &path, PlotStyle::default()).unwrap();
        let first = std::fs::read_to_string(&path).unwrap();
        render_health_plot(&sample_curve(), &path, PlotStyle::default()).unwrap();
        let second = std::fs::read_to_string(&path).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn rejects_unknown_extension() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("agent.gifv");
        let err = render_health_plot(&sample_curve(), &path, PlotStyle::default()).unwrap_err();
        assert!(matches!(err, LogError::UnsupportedImageFormat { .. }));
        assert!(!path.exists());
    }
}
