//! Static Chart Renderer
//! Draws figures onto a caller-supplied plotters canvas, or renders them to
//! PNG / SVG files, SVG strings and in-memory images.

use crate::charts::palette::PaletteError;
use crate::config::{validate_size, ConfigError};
use crate::data::{LoaderError, ProcessorError};
use crate::stats::StatsError;
use image::RgbImage;
use plotters::coord::Shift;
use plotters::drawing::DrawingAreaErrorKind;
use plotters::prelude::*;
use std::path::Path;
use thiserror::Error;
use tracing::info;

#[derive(Error, Debug)]
pub enum PlotError {
    #[error(transparent)]
    Loader(#[from] LoaderError),
    #[error(transparent)]
    Processor(#[from] ProcessorError),
    #[error(transparent)]
    Stats(#[from] StatsError),
    #[error(transparent)]
    Palette(#[from] PaletteError),
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),
    #[error("Nothing to plot: {0}")]
    EmptyInput(String),
    #[error("Invalid p-value {0}: must be > 0 to take -log10")]
    InvalidPValue(f64),
    #[error("Every individual must have {expected} ancestry components, found {found}")]
    InconsistentK { expected: usize, found: usize },
    #[error("Group '{0}' is not in the data")]
    MissingGroup(String),
    #[error("Drawing error: {0}")]
    Drawing(String),
    #[error("Unsupported output format for '{0}' (expected .png or .svg)")]
    UnsupportedFormat(String),
}

impl<E: std::error::Error + Send + Sync> From<DrawingAreaErrorKind<E>> for PlotError {
    fn from(err: DrawingAreaErrorKind<E>) -> Self {
        PlotError::Drawing(err.to_string())
    }
}

/// Anything that can draw itself onto a plotters drawing area.
pub trait Figure {
    fn draw<DB: DrawingBackend>(&self, area: &DrawingArea<DB, Shift>) -> Result<(), PlotError>;
}

/// Output image format, chosen from the file extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    Png,
    Svg,
}

impl OutputFormat {
    pub fn from_path(path: &Path) -> Result<Self, PlotError> {
        match path
            .extension()
            .and_then(|e| e.to_str())
            .map(str::to_lowercase)
            .as_deref()
        {
            Some("png") => Ok(OutputFormat::Png),
            Some("svg") => Ok(OutputFormat::Svg),
            _ => Err(PlotError::UnsupportedFormat(path.display().to_string())),
        }
    }
}

pub struct StaticChartRenderer;

impl StaticChartRenderer {
    fn paint<DB: DrawingBackend, F: Figure>(
        figure: &F,
        root: DrawingArea<DB, Shift>,
    ) -> Result<(), PlotError> {
        root.fill(&WHITE)?;
        figure.draw(&root)?;
        root.present()?;
        Ok(())
    }

    /// Render to a `.png` or `.svg` file.
    pub fn render_to_file<F: Figure>(
        figure: &F,
        path: impl AsRef<Path>,
        size: (u32, u32),
    ) -> Result<(), PlotError> {
        let path = path.as_ref();
        validate_size(size)?;
        match OutputFormat::from_path(path)? {
            OutputFormat::Png => {
                Self::paint(figure, BitMapBackend::new(path, size).into_drawing_area())?
            }
            OutputFormat::Svg => {
                Self::paint(figure, SVGBackend::new(path, size).into_drawing_area())?
            }
        }
        info!(path = %path.display(), width = size.0, height = size.1, "figure written");
        Ok(())
    }

    /// Render to an SVG document held in memory.
    pub fn render_to_svg_string<F: Figure>(figure: &F, size: (u32, u32)) -> Result<String, PlotError> {
        validate_size(size)?;
        let mut svg = String::new();
        Self::paint(figure, SVGBackend::with_string(&mut svg, size).into_drawing_area())?;
        Ok(svg)
    }

    /// Render to an RGB image buffer.
    pub fn render_to_image<F: Figure>(figure: &F, size: (u32, u32)) -> Result<RgbImage, PlotError> {
        validate_size(size)?;
        let (width, height) = size;
        let mut buffer = vec![0u8; width as usize * height as usize * 3];
        Self::paint(
            figure,
            BitMapBackend::with_buffer(&mut buffer, size).into_drawing_area(),
        )?;
        RgbImage::from_raw(width, height, buffer)
            .ok_or_else(|| PlotError::Drawing("image buffer size mismatch".to_string()))
    }
}

/// Text style used by all charts.
pub(crate) fn text_style(size: f64) -> TextStyle<'static> {
    TextStyle::from(("sans-serif", size).into_font()).color(&BLACK)
}
