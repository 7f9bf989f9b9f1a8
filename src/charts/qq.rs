//! Q-Q Plot Module
//! Observed vs. expected quantiles, either against the uniform
//! distribution (p-values, optionally `-log10` scaled), a second sample, or
//! the standard normal distribution.

use crate::charts::palette::parse_color;
use crate::charts::renderer::{text_style, Figure, PlotError};
use crate::stats::{StatsCalculator, StatsError, DEFAULT_PPOINTS_OFFSET};
use plotters::coord::Shift;
use plotters::prelude::*;
use plotters::style::text_anchor::{HPos, Pos, VPos};
use serde::{Deserialize, Serialize};
use tracing::debug;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct QqOptions {
    pub logp: bool,
    pub color: String,
    /// `None` hides the y = x reference line.
    pub abline_color: Option<String>,
    pub alpha: f64,
    pub point_size: u32,
    pub xlabel: Option<String>,
    pub ylabel: Option<String>,
    pub title: Option<String>,
    /// Print the genomic inflation factor in the upper left corner.
    pub show_lambda: bool,
}

impl Default for QqOptions {
    fn default() -> Self {
        Self {
            logp: true,
            color: "#3B5488".to_string(),
            abline_color: Some("r".to_string()),
            alpha: 0.8,
            point_size: 3,
            xlabel: None,
            ylabel: None,
            title: None,
            show_lambda: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct QqLayout {
    /// (expected, observed) pairs
    pub points: Vec<(f64, f64)>,
    pub abline: Option<((f64, f64), (f64, f64), RGBColor)>,
    pub color: RGBColor,
    pub lambda: Option<f64>,
    pub x_range: (f64, f64),
    pub y_range: (f64, f64),
    pub xlabel: String,
    pub ylabel: String,
}

fn check_finite(values: &[f64], name: &str) -> Result<(), PlotError> {
    if values.is_empty() {
        return Err(PlotError::EmptyInput(format!("`{name}` has no values")));
    }
    if values.iter().any(|v| !v.is_finite()) {
        return Err(PlotError::InvalidArgument(format!(
            "Input must all be finite numbers in `{name}`"
        )));
    }
    Ok(())
}

fn check_positive(values: &[f64]) -> Result<(), PlotError> {
    match values.iter().find(|&&v| v <= 0.0) {
        Some(&bad) => Err(PlotError::InvalidPValue(bad)),
        None => Ok(()),
    }
}

impl QqLayout {
    /// Q-Q plot of `data` against uniform plotting positions, or against
    /// `other` when given.
    pub fn qqplot(data: &[f64], other: Option<&[f64]>, options: &QqOptions) -> Result<Self, PlotError> {
        check_finite(data, "data")?;
        if let Some(other) = other {
            check_finite(other, "other")?;
            if other.len() != data.len() {
                return Err(PlotError::InvalidArgument(format!(
                    "Input `data` ({}) and `other` ({}) must all be the same size",
                    data.len(),
                    other.len()
                )));
            }
        }
        if options.logp {
            check_positive(data)?;
            if let Some(other) = other {
                check_positive(other)?;
            }
        }

        let observed = StatsCalculator::sorted(data);
        let expected = match other {
            Some(other) => StatsCalculator::sorted(other),
            None => StatsCalculator::ppoints(data.len(), DEFAULT_PPOINTS_OFFSET)?,
        };
        let (expected, observed) = if options.logp {
            (
                StatsCalculator::neg_log10(&expected),
                StatsCalculator::neg_log10(&observed),
            )
        } else {
            (expected, observed)
        };

        let is_pvalues = other.is_none() && data.iter().all(|&p| p > 0.0 && p <= 1.0);
        let lambda = if is_pvalues {
            Some(StatsCalculator::genomic_inflation(data)?)
        } else {
            None
        };

        let (xlabel, ylabel) = match (options.logp, other.is_some()) {
            (false, _) => ("Expected", "Observed"),
            (true, false) => ("Expected(-log10)", "Observed(-log10)"),
            (true, true) => ("-Log10(value) of 2nd Sample", "-Log10(value) of 1st Sample"),
        };

        Self::build(expected, observed, lambda, xlabel, ylabel, options)
    }

    /// Q-Q plot of standardized `data` against standard normal quantiles.
    pub fn qqnorm(data: &[f64], options: &QqOptions) -> Result<Self, PlotError> {
        check_finite(data, "data")?;

        let (mean, std) = StatsCalculator::mean_std(data)?;
        if std == 0.0 {
            return Err(StatsError::ZeroVariance.into());
        }
        let standardized: Vec<f64> = data.iter().map(|v| (v - mean) / std).collect();
        let observed = StatsCalculator::sorted(&standardized);

        let probabilities = StatsCalculator::ppoints(data.len(), DEFAULT_PPOINTS_OFFSET)?;
        let expected = StatsCalculator::normal_quantiles(&probabilities)?;

        Self::build(expected, observed, None, "Expected", "Observed", options)
    }

    fn build(
        expected: Vec<f64>,
        observed: Vec<f64>,
        lambda: Option<f64>,
        xlabel: &str,
        ylabel: &str,
        options: &QqOptions,
    ) -> Result<Self, PlotError> {
        let color = parse_color(&options.color)?;
        let abline_color = options
            .abline_color
            .as_deref()
            .map(parse_color)
            .transpose()?;

        let (e_min, e_max) = min_max(&expected);
        let (o_min, o_max) = min_max(&observed);

        let x_top = if 1.05 * e_max > e_min { 1.05 * e_max } else { e_min + 1.0 };
        let y_top = if o_max > o_min {
            o_max + 0.05 * (o_max - o_min)
        } else {
            o_min + 1.0
        };

        let abline = abline_color.map(|c| ((e_min, e_min), (e_max, e_max), c));
        let points: Vec<(f64, f64)> = expected.into_iter().zip(observed).collect();

        debug!(points = points.len(), ?lambda, "computed Q-Q layout");

        Ok(Self {
            points,
            abline,
            color,
            lambda,
            x_range: (e_min, x_top),
            y_range: (o_min, y_top),
            xlabel: options.xlabel.clone().unwrap_or_else(|| xlabel.to_string()),
            ylabel: options.ylabel.clone().unwrap_or_else(|| ylabel.to_string()),
        })
    }
}

fn min_max(values: &[f64]) -> (f64, f64) {
    values
        .iter()
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), &v| (lo.min(v), hi.max(v)))
}

pub struct QqPlot {
    layout: QqLayout,
    options: QqOptions,
}

impl QqPlot {
    pub fn qqplot(data: &[f64], other: Option<&[f64]>, options: QqOptions) -> Result<Self, PlotError> {
        let layout = QqLayout::qqplot(data, other, &options)?;
        Ok(Self { layout, options })
    }

    pub fn qqnorm(data: &[f64], options: QqOptions) -> Result<Self, PlotError> {
        let layout = QqLayout::qqnorm(data, &options)?;
        Ok(Self { layout, options })
    }

    pub fn layout(&self) -> &QqLayout {
        &self.layout
    }
}

impl Figure for QqPlot {
    fn draw<DB: DrawingBackend>(&self, area: &DrawingArea<DB, Shift>) -> Result<(), PlotError> {
        let layout = &self.layout;
        let options = &self.options;
        let (x0, x1) = layout.x_range;
        let (y0, y1) = layout.y_range;

        let mut builder = ChartBuilder::on(area);
        builder
            .margin(15)
            .x_label_area_size(45)
            .y_label_area_size(55);
        if let Some(title) = &options.title {
            builder.caption(title, ("sans-serif", 22.0));
        }
        let mut chart = builder.build_cartesian_2d(x0..x1, y0..y1)?;

        chart
            .configure_mesh()
            .disable_x_mesh()
            .disable_y_mesh()
            .x_desc(layout.xlabel.as_str())
            .y_desc(layout.ylabel.as_str())
            .label_style(("sans-serif", 14.0))
            .draw()?;

        let style = layout.color.mix(options.alpha).filled();
        chart.draw_series(
            layout
                .points
                .iter()
                .map(|&(e, o)| Circle::new((e, o), options.point_size, style)),
        )?;

        if let Some((from, to, color)) = layout.abline {
            chart.draw_series(std::iter::once(PathElement::new(
                vec![from, to],
                color.stroke_width(1),
            )))?;
        }

        if let (true, Some(lambda)) = (options.show_lambda, layout.lambda) {
            let corner = (x0 + 0.03 * (x1 - x0), y1 - 0.03 * (y1 - y0));
            chart.draw_series(std::iter::once(Text::new(
                format!("λ = {lambda:.3}"),
                corner,
                text_style(14.0).pos(Pos::new(HPos::Left, VPos::Top)),
            )))?;
        }

        Ok(())
    }
}
