//! Admixture Plot Module
//! Stacked bars of ancestry proportions, one bar per individual, grouped by
//! population. Individuals inside a group are ordered by hierarchical
//! clustering so that similar ancestry profiles sit next to each other.

use crate::charts::palette::{ColorCycle, TAB10};
use crate::charts::renderer::{text_style, Figure, PlotError};
use crate::data::{AdmixtureData, DataLoader};
use crate::stats::{hierarchical_order, Linkage, Metric};
use plotters::coord::Shift;
use plotters::prelude::*;
use plotters::style::text_anchor::{HPos, Pos, VPos};
use rand::rngs::StdRng;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::{debug, warn};

/// Random subsampling applied to every group before plotting.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SampleSpec {
    /// Individuals kept per group, capped at the group size.
    pub n: Option<usize>,
    /// Fraction of each group kept, rounded.
    pub frac: Option<f64>,
    pub seed: Option<u64>,
}

impl SampleSpec {
    fn validate(&self) -> Result<(), PlotError> {
        match (self.n, self.frac) {
            (Some(_), Some(_)) => Err(PlotError::InvalidArgument(
                "please enter a value for `frac` OR `n`, not both".to_string(),
            )),
            (_, Some(frac)) if !(0.0..=1.0).contains(&frac) => Err(PlotError::InvalidArgument(
                format!("sample fraction must be within [0, 1], got {frac}"),
            )),
            _ => Ok(()),
        }
    }

    fn count(&self, size: usize) -> usize {
        match (self.n, self.frac) {
            (Some(n), _) => n.min(size),
            (None, Some(frac)) => (frac * size as f64).round() as usize,
            (None, None) => size,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AdmixtureOptions {
    pub group_order: Option<Vec<String>>,
    /// Labels drawn instead of the group names, one per group.
    pub xticklabels: Option<Vec<String>>,
    pub palette: Vec<String>,
    pub linewidth: u32,
    /// Defaults to `K=<k>`.
    pub ylabel: Option<String>,
    pub linkage: Linkage,
    pub metric: Metric,
    pub sample: Option<SampleSpec>,
}

impl Default for AdmixtureOptions {
    fn default() -> Self {
        Self {
            group_order: None,
            xticklabels: None,
            palette: Vec::new(),
            linewidth: 1,
            ylabel: None,
            linkage: Linkage::default(),
            metric: Metric::default(),
            sample: None,
        }
    }
}

/// One stacked segment: individual `x` spans `[x, x + 1]`.
#[derive(Debug, Clone, PartialEq)]
pub struct AdmixtureBar {
    pub x: f64,
    pub bottom: f64,
    pub top: f64,
    pub color: RGBColor,
}

#[derive(Debug, Clone, PartialEq)]
pub struct GroupTick {
    pub label: String,
    pub x: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct AdmixtureLayout {
    pub bars: Vec<AdmixtureBar>,
    /// x of the vertical line closing each group
    pub boundaries: Vec<f64>,
    pub ticks: Vec<GroupTick>,
    pub n_individuals: usize,
    pub k: usize,
    pub ylabel: String,
}

impl AdmixtureLayout {
    pub fn compute(data: &AdmixtureData, options: &AdmixtureOptions) -> Result<Self, PlotError> {
        let k = data
            .iter()
            .flat_map(|(_, rows)| rows.first())
            .map(Vec::len)
            .next()
            .ok_or_else(|| PlotError::EmptyInput("no admixture rows".to_string()))?;
        if k == 0 {
            return Err(PlotError::EmptyInput("no ancestry components".to_string()));
        }
        if let Some(found) = data
            .iter()
            .flat_map(|(_, rows)| rows.iter())
            .map(Vec::len)
            .find(|&len| len != k)
        {
            return Err(PlotError::InconsistentK { expected: k, found });
        }

        let order: Vec<&str> = match &options.group_order {
            Some(order) => order.iter().map(String::as_str).collect(),
            None => data.iter().map(|(g, _)| g.as_str()).collect(),
        };
        let labels: Vec<String> = match &options.xticklabels {
            Some(labels) if labels.len() != order.len() => {
                return Err(PlotError::InvalidArgument(format!(
                    "got {} xticklabels for {} groups",
                    labels.len(),
                    order.len()
                )));
            }
            Some(labels) => labels.clone(),
            None => order.iter().map(|g| g.to_string()).collect(),
        };

        if let Some(sample) = &options.sample {
            sample.validate()?;
        }
        let mut rng = match options.sample.as_ref().and_then(|s| s.seed) {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };

        let palette = ColorCycle::from_specs(&options.palette, &TAB10)?;
        if palette.len() < k {
            warn!(
                colors = palette.len(),
                k, "fewer colors than ancestry components, colors will repeat"
            );
        }

        let mut bars = Vec::new();
        let mut boundaries = Vec::with_capacity(order.len());
        let mut ticks = Vec::with_capacity(order.len());
        let mut start = 0usize;

        for (group, label) in order.iter().zip(labels) {
            let rows = data
                .iter()
                .find(|(g, _)| g.as_str() == *group)
                .map(|(_, rows)| rows)
                .ok_or_else(|| PlotError::MissingGroup(group.to_string()))?;

            let rows: Vec<Vec<f64>> = match &options.sample {
                Some(sample) => {
                    let amount = sample.count(rows.len());
                    rand::seq::index::sample(&mut rng, rows.len(), amount)
                        .into_iter()
                        .map(|i| rows[i].clone())
                        .collect()
                }
                None => rows.clone(),
            };

            let ordered = hierarchical_order(&rows, options.linkage, options.metric);
            for (offset, &i) in ordered.iter().enumerate() {
                let x = (start + offset) as f64;
                let mut bottom = 0.0;
                for (component, &value) in rows[i].iter().enumerate() {
                    bars.push(AdmixtureBar {
                        x,
                        bottom,
                        top: bottom + value,
                        color: palette.color(component),
                    });
                    bottom += value;
                }
            }

            let size = rows.len();
            ticks.push(GroupTick {
                label,
                x: start as f64 + size as f64 / 2.0,
            });
            start += size;
            boundaries.push(start as f64);
        }

        if start == 0 {
            return Err(PlotError::EmptyInput("no individuals left to plot".to_string()));
        }

        debug!(individuals = start, groups = ticks.len(), k, "computed admixture layout");

        Ok(Self {
            bars,
            boundaries,
            ticks,
            n_individuals: start,
            k,
            ylabel: options.ylabel.clone().unwrap_or_else(|| format!("K={k}")),
        })
    }
}

pub struct AdmixturePlot {
    layout: AdmixtureLayout,
    options: AdmixtureOptions,
}

impl AdmixturePlot {
    pub fn new(data: &AdmixtureData, options: AdmixtureOptions) -> Result<Self, PlotError> {
        let layout = AdmixtureLayout::compute(data, &options)?;
        Ok(Self { layout, options })
    }

    /// Build from an ADMIXTURE `.Q` file and its population label file.
    pub fn from_files(
        q_file: impl AsRef<Path>,
        population_info: impl AsRef<Path>,
        options: AdmixtureOptions,
    ) -> Result<Self, PlotError> {
        let data = DataLoader::load_admixture(q_file, population_info)?;
        Self::new(&data, options)
    }

    pub fn layout(&self) -> &AdmixtureLayout {
        &self.layout
    }
}

impl Figure for AdmixturePlot {
    fn draw<DB: DrawingBackend>(&self, area: &DrawingArea<DB, Shift>) -> Result<(), PlotError> {
        let layout = &self.layout;
        let width = layout.n_individuals as f64;
        let line = BLACK.stroke_width(self.options.linewidth);

        let mut chart = ChartBuilder::on(area)
            .margin(15)
            .x_label_area_size(40)
            .y_label_area_size(50)
            .build_cartesian_2d(0.0..width, 0.0..1.0)?;

        chart
            .configure_mesh()
            .disable_mesh()
            .x_labels(0)
            .y_labels(0)
            .y_desc(layout.ylabel.as_str())
            .axis_style(line)
            .draw()?;

        chart.draw_series(layout.bars.iter().map(|b| {
            Rectangle::new([(b.x, b.bottom), (b.x + 1.0, b.top)], b.color.filled())
        }))?;

        chart.draw_series(
            layout
                .boundaries
                .iter()
                .map(|&x| PathElement::new(vec![(x, 0.0), (x, 1.0)], line)),
        )?;
        chart.draw_series(std::iter::once(Rectangle::new(
            [(0.0, 0.0), (width, 1.0)],
            line,
        )))?;

        let (base_x, base_y) = area.get_base_pixel();
        let style = text_style(14.0).pos(Pos::new(HPos::Center, VPos::Top));
        for tick in &layout.ticks {
            let (px, py) = chart.backend_coord(&(tick.x, 0.0));
            area.draw(&Text::new(
                tick.label.clone(),
                (px - base_x, py - base_y + 6),
                style.clone(),
            ))?;
        }

        Ok(())
    }
}
