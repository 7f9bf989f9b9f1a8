//! Manhattan Plot Module
//! Genomic position vs. significance, one color per chromosome.
//!
//! Layout:
//! 1. Chromosomes are laid end to end; each point sits at the running
//!    offset of the previous chromosomes plus its own position.
//! 2. Chromosome labels are centered under their span.
//! 3. Horizontal lines mark the suggestive and genome-wide thresholds.

use crate::charts::palette::{parse_color, ColorCycle, MANHATTAN_COLORS};
use crate::charts::renderer::{text_style, Figure, PlotError};
use crate::data::{ColumnSpec, DataLoader, GwasProcessor, GwasRecord};
use crate::genome::normalize_chrom;
use plotters::coord::Shift;
use plotters::prelude::*;
use plotters::style::text_anchor::{HPos, Pos, VPos};
use polars::prelude::DataFrame;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::path::Path;
use tracing::debug;

const SIGN_LINE_COLORS: [RGBColor; 2] = [
    RGBColor(0xD6, 0x27, 0x28), // Suggestive
    RGBColor(0x2C, 0xA0, 0x2C), // Genome-wide
];

/// Kind of plot to draw.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PlotKind {
    #[default]
    Scatter,
    /// Vertical lines from the x axis up to each value
    Line,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ManhattanOptions {
    pub columns: ColumnSpec,
    /// Plot `-log10(p)` instead of the raw value.
    pub logp: bool,
    pub kind: PlotKind,
    /// Colors cycled across chromosomes; empty means the default pair.
    pub colors: Vec<String>,
    pub alpha: f64,
    pub point_size: u32,
    pub title: Option<String>,
    pub xlabel: String,
    pub ylabel: String,
    /// Only these chromosome labels are drawn on the x axis.
    pub xtick_label_set: Option<BTreeSet<String>>,
    /// Plot a single chromosome against its raw positions.
    pub chr: Option<String>,
    pub suggestive_line: Option<f64>,
    pub genomewide_line: Option<f64>,
    pub sign_line_colors: Vec<String>,
    pub sign_marker_p: Option<f64>,
    pub sign_marker_color: String,
    pub annotate_top_snp: bool,
    pub ld_block_size: u64,
    pub ymax: Option<f64>,
}

impl Default for ManhattanOptions {
    fn default() -> Self {
        Self {
            columns: ColumnSpec::default(),
            logp: true,
            kind: PlotKind::Scatter,
            colors: Vec::new(),
            alpha: 0.8,
            point_size: 3,
            title: None,
            xlabel: "Chromosome".to_string(),
            ylabel: "-log10(P)".to_string(),
            xtick_label_set: None,
            chr: None,
            suggestive_line: Some(1e-5),
            genomewide_line: Some(5e-8),
            sign_line_colors: Vec::new(),
            sign_marker_p: None,
            sign_marker_color: "#FF0000".to_string(),
            annotate_top_snp: false,
            ld_block_size: 50_000,
            ymax: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ManhattanPoint {
    pub x: f64,
    pub y: f64,
    pub color: RGBColor,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ChromosomeTick {
    pub label: String,
    pub x: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ThresholdLine {
    pub y: f64,
    pub color: RGBColor,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Annotation {
    pub x: f64,
    pub y: f64,
    pub label: String,
}

/// Fully computed Manhattan plot geometry.
#[derive(Debug, Clone, PartialEq)]
pub struct ManhattanLayout {
    pub points: Vec<ManhattanPoint>,
    pub ticks: Vec<ChromosomeTick>,
    pub thresholds: Vec<ThresholdLine>,
    pub annotations: Vec<Annotation>,
    pub x_range: (f64, f64),
    pub y_range: (f64, f64),
    pub single_chromosome: bool,
}

impl ManhattanLayout {
    pub fn compute(
        mut records: Vec<GwasRecord>,
        options: &ManhattanOptions,
    ) -> Result<Self, PlotError> {
        if options.chr.is_some() && options.xtick_label_set.is_some() {
            return Err(PlotError::InvalidArgument(
                "`chr` and `xtick_label_set` can't be set simultaneously".to_string(),
            ));
        }

        let colors = ColorCycle::from_specs(&options.colors, &MANHATTAN_COLORS)?;
        let line_colors = ColorCycle::from_specs(&options.sign_line_colors, &SIGN_LINE_COLORS)?;
        let marker_color = parse_color(&options.sign_marker_color)?;

        if let Some(chr) = &options.chr {
            let target = normalize_chrom(chr);
            records.retain(|r| normalize_chrom(&r.chrom) == target);
        }
        if records.is_empty() {
            let what = match &options.chr {
                Some(chr) => format!("no records on chromosome '{chr}'"),
                None => "no records".to_string(),
            };
            return Err(PlotError::EmptyInput(what));
        }
        if options.logp {
            if let Some(bad) = records.iter().find(|r| r.pvalue <= 0.0) {
                return Err(PlotError::InvalidPValue(bad.pvalue));
            }
        }

        GwasProcessor::sort_records(&mut records);
        let transform = |p: f64| if options.logp { -p.log10() } else { p };

        // Running offset so that chromosomes don't overlap.
        let mut last_x = 0.0;
        let mut points = Vec::with_capacity(records.len());
        let mut ticks = Vec::new();
        let mut start = 0;
        let mut chrom_index = 0;

        // `chr1` and `1` name the same chromosome and sort together.
        let keys: Vec<String> = records.iter().map(|r| normalize_chrom(&r.chrom)).collect();

        while start < records.len() {
            let chrom = &records[start].chrom;
            let end = start + keys[start..].iter().take_while(|k| **k == keys[start]).count();
            let color = colors.color(chrom_index);

            for record in &records[start..end] {
                let marked = options
                    .sign_marker_p
                    .is_some_and(|threshold| record.pvalue <= threshold);
                points.push(ManhattanPoint {
                    x: last_x + record.pos as f64,
                    y: transform(record.pvalue),
                    color: if marked { marker_color } else { color },
                });
            }

            let first_x = points[start].x;
            let region_end = points[end - 1].x;
            ticks.push(ChromosomeTick {
                label: chrom.clone(),
                x: (first_x + region_end) / 2.0,
            });

            last_x = region_end;
            chrom_index += 1;
            start = end;
        }

        let single_chromosome = options.chr.is_some();
        if single_chromosome {
            ticks.clear();
        } else if let Some(keep) = &options.xtick_label_set {
            ticks.retain(|t| keep.contains(&t.label));
        }

        let thresholds: Vec<ThresholdLine> = [options.suggestive_line, options.genomewide_line]
            .iter()
            .enumerate()
            .filter_map(|(i, t)| {
                t.map(|t| ThresholdLine {
                    y: transform(t),
                    color: line_colors.color(i),
                })
            })
            .collect();

        let annotations = if options.annotate_top_snp {
            Self::top_snps(&records, &points, options)
        } else {
            Vec::new()
        };

        let x_max = if last_x > 0.0 { last_x } else { 1.0 };
        let y_low = points.iter().map(|p| p.y).fold(0.0_f64, f64::min);
        let y_high = points
            .iter()
            .map(|p| p.y)
            .chain(thresholds.iter().map(|t| t.y))
            .fold(f64::NEG_INFINITY, f64::max);
        let mut y_top = options.ymax.unwrap_or(y_high * 1.05);
        if !(y_top > y_low) {
            y_top = y_low + 1.0;
        }

        debug!(
            points = points.len(),
            chromosomes = chrom_index,
            ticks = ticks.len(),
            "computed manhattan layout"
        );

        Ok(Self {
            points,
            ticks,
            thresholds,
            annotations,
            x_range: (0.0, x_max),
            y_range: (y_low, y_top),
            single_chromosome,
        })
    }

    /// Lead SNP of every significant block. Consecutive significant
    /// positions on one chromosome within `ld_block_size` share a block.
    fn top_snps(
        records: &[GwasRecord],
        points: &[ManhattanPoint],
        options: &ManhattanOptions,
    ) -> Vec<Annotation> {
        let Some(threshold) = options.sign_marker_p.or(options.genomewide_line) else {
            return Vec::new();
        };

        let mut annotations = Vec::new();
        let mut block: Option<(usize, usize)> = None; // (lead index, last index)

        let flush = |lead: usize, annotations: &mut Vec<Annotation>| {
            annotations.push(Annotation {
                x: points[lead].x,
                y: points[lead].y,
                label: records[lead].label(),
            });
        };

        for (i, record) in records.iter().enumerate() {
            if record.pvalue > threshold {
                continue;
            }
            block = match block {
                Some((lead, last))
                    if normalize_chrom(&records[last].chrom) == normalize_chrom(&record.chrom)
                        && record.pos - records[last].pos <= options.ld_block_size =>
                {
                    let lead = if record.pvalue < records[lead].pvalue { i } else { lead };
                    Some((lead, i))
                }
                Some((lead, _)) => {
                    flush(lead, &mut annotations);
                    Some((i, i))
                }
                None => Some((i, i)),
            };
        }
        if let Some((lead, _)) = block {
            flush(lead, &mut annotations);
        }
        annotations
    }
}

/// A Manhattan plot ready to be drawn.
pub struct ManhattanPlot {
    layout: ManhattanLayout,
    options: ManhattanOptions,
}

impl ManhattanPlot {
    pub fn new(records: Vec<GwasRecord>, options: ManhattanOptions) -> Result<Self, PlotError> {
        let layout = ManhattanLayout::compute(records, &options)?;
        Ok(Self { layout, options })
    }

    /// Build from a table, reading the columns named in `options.columns`.
    pub fn from_dataframe(df: &DataFrame, options: ManhattanOptions) -> Result<Self, PlotError> {
        let records = GwasProcessor::extract(df, &options.columns)?;
        Self::new(records, options)
    }

    /// Load and stack GWAS tables, then build from the stacked table.
    pub fn from_files<P: AsRef<Path>>(
        paths: &[P],
        separator: Option<u8>,
        options: ManhattanOptions,
    ) -> Result<Self, PlotError> {
        let mut loader = DataLoader::new().with_columns(&options.columns);
        let df = loader.load_tables(paths, separator)?;
        debug!(files = paths.len(), rows = df.height(), "loaded GWAS results");
        Self::from_dataframe(df, options)
    }

    pub fn layout(&self) -> &ManhattanLayout {
        &self.layout
    }
}

impl Figure for ManhattanPlot {
    fn draw<DB: DrawingBackend>(&self, area: &DrawingArea<DB, Shift>) -> Result<(), PlotError> {
        let layout = &self.layout;
        let options = &self.options;
        let (x0, x1) = layout.x_range;
        let (y0, y1) = layout.y_range;

        let mut builder = ChartBuilder::on(area);
        builder
            .margin(15)
            .x_label_area_size(50)
            .y_label_area_size(60);
        if let Some(title) = &options.title {
            builder.caption(title, ("sans-serif", 22.0));
        }
        let mut chart = builder.build_cartesian_2d(x0..x1, y0..y1)?;

        // Show whole positions without scientific notation.
        let position_fmt = |x: &f64| format!("{:.0}", x);
        {
            let mut mesh = chart.configure_mesh();
            mesh.disable_x_mesh()
                .disable_y_mesh()
                .x_desc(options.xlabel.as_str())
                .y_desc(options.ylabel.as_str())
                .label_style(("sans-serif", 14.0));
            if layout.single_chromosome {
                mesh.x_label_formatter(&position_fmt);
            } else {
                mesh.x_labels(0);
            }
            mesh.draw()?;
        }

        match options.kind {
            PlotKind::Scatter => {
                chart.draw_series(layout.points.iter().map(|p| {
                    Circle::new(
                        (p.x, p.y),
                        options.point_size,
                        p.color.mix(options.alpha).filled(),
                    )
                }))?;
            }
            PlotKind::Line => {
                let base = y0.max(0.0);
                chart.draw_series(layout.points.iter().map(|p| {
                    PathElement::new(
                        vec![(p.x, base), (p.x, p.y)],
                        p.color.mix(options.alpha).stroke_width(1),
                    )
                }))?;
            }
        }

        chart.draw_series(layout.thresholds.iter().map(|t| {
            PathElement::new(vec![(x0, t.y), (x1, t.y)], t.color.stroke_width(1))
        }))?;

        let annotation_style = text_style(11.0).pos(Pos::new(HPos::Left, VPos::Bottom));
        chart.draw_series(layout.annotations.iter().map(|a| {
            Text::new(a.label.clone(), (a.x, a.y), annotation_style.clone())
        }))?;

        // Chromosome labels centered under each span, in the label area.
        let (base_x, base_y) = area.get_base_pixel();
        let tick_style = text_style(14.0).pos(Pos::new(HPos::Center, VPos::Top));
        for tick in &layout.ticks {
            let (px, py) = chart.backend_coord(&(tick.x, y0));
            let (px, py) = (px - base_x, py - base_y);
            area.draw(&PathElement::new(vec![(px, py), (px, py + 5)], BLACK.stroke_width(1)))?;
            area.draw(&Text::new(tick.label.clone(), (px, py + 8), tick_style.clone()))?;
        }

        Ok(())
    }
}
