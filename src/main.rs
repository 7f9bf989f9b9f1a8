//! geneview - Genomics plots from the command line
//!
//! Reads GWAS tables, ADMIXTURE results or gene sets and writes a PNG or SVG
//! figure.

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use geneview::charts::palette::{COLORFUL, GRAYSCALE};
use geneview::charts::{AdmixturePlot, Figure, ManhattanPlot, PlotKind, QqPlot, SampleSpec, VennDiagram};
use geneview::data::{DataLoader, GwasProcessor};
use geneview::{GeneviewConfig, StaticChartRenderer};
use plotters::style::RGBColor;
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// JSON file with figure size and plot options; flags override it
    #[arg(short, long, global = true, env = "GENEVIEW_CONFIG")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Args, Debug)]
struct OutputArgs {
    /// Output figure (.png or .svg)
    #[arg(short, long)]
    output: PathBuf,

    /// Figure width in pixels
    #[arg(long)]
    width: Option<u32>,

    /// Figure height in pixels
    #[arg(long)]
    height: Option<u32>,

    /// Open the figure with the system viewer once written
    #[arg(long)]
    open: bool,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Manhattan plot of one or more GWAS result tables
    Manhattan {
        /// Input tables (CSV or tab separated plink2 output)
        #[arg(required = true)]
        inputs: Vec<PathBuf>,

        /// Chromosome column
        #[arg(long)]
        chrom: Option<String>,

        /// Position column
        #[arg(long)]
        pos: Option<String>,

        /// P-value column
        #[arg(long)]
        pv: Option<String>,

        /// Field separator; defaults from the file extension
        #[arg(long)]
        sep: Option<char>,

        /// Plot raw values instead of -log10(P)
        #[arg(long)]
        no_log: bool,

        /// Comma separated chromosome colors, e.g. "#000000,#969696"
        #[arg(long, conflicts_with_all = ["colorful", "grayscale"])]
        colors: Option<String>,

        /// Use the four color palette
        #[arg(long, conflicts_with = "grayscale")]
        colorful: bool,

        /// Use shades of gray
        #[arg(long)]
        grayscale: bool,

        #[arg(long)]
        title: Option<String>,

        /// Upper limit of the y axis
        #[arg(long)]
        ymax: Option<f64>,

        /// Draw vertical lines instead of points
        #[arg(long)]
        lines: bool,

        /// Only plot this chromosome
        #[arg(long)]
        chr: Option<String>,

        /// Comma separated chromosome labels to show on the x axis
        #[arg(long)]
        xtick_labels: Option<String>,

        /// Label the lead SNP of every significant block
        #[arg(long)]
        annotate_top_snp: bool,

        /// Highlight points at or below this p-value
        #[arg(long)]
        sign_marker_p: Option<f64>,

        #[command(flatten)]
        output: OutputArgs,
    },

    /// Q-Q plot of p-values against the uniform distribution or a second sample
    Qq {
        input: PathBuf,

        /// Column holding the values
        #[arg(long, default_value = "P")]
        column: String,

        /// Second sample to compare against
        #[arg(long)]
        other: Option<PathBuf>,

        /// Column of the second sample; defaults to --column
        #[arg(long)]
        other_column: Option<String>,

        #[arg(long)]
        sep: Option<char>,

        /// Field separator of the second sample; defaults from its file extension
        #[arg(long)]
        other_sep: Option<char>,

        #[arg(long)]
        no_log: bool,

        /// Print the genomic inflation factor on the plot
        #[arg(long)]
        show_lambda: bool,

        #[arg(long)]
        title: Option<String>,

        #[command(flatten)]
        output: OutputArgs,
    },

    /// Q-Q plot against the standard normal distribution
    Qqnorm {
        input: PathBuf,

        #[arg(long, default_value = "P")]
        column: String,

        #[arg(long)]
        sep: Option<char>,

        #[arg(long)]
        title: Option<String>,

        #[command(flatten)]
        output: OutputArgs,
    },

    /// Stacked ancestry bars from an ADMIXTURE .Q file
    Admixture {
        /// ADMIXTURE .Q matrix
        q_file: PathBuf,

        /// Population label of every row, one per line
        population_info: PathBuf,

        /// Comma separated group order
        #[arg(long)]
        group_order: Option<String>,

        /// Comma separated group labels, in group order
        #[arg(long)]
        xticklabels: Option<String>,

        /// Comma separated component colors
        #[arg(long)]
        palette: Option<String>,

        /// Individuals sampled per group
        #[arg(long, conflicts_with = "sample_frac")]
        sample_n: Option<usize>,

        /// Fraction of every group sampled
        #[arg(long)]
        sample_frac: Option<f64>,

        /// Seed for sampling
        #[arg(long)]
        seed: Option<u64>,

        #[command(flatten)]
        output: OutputArgs,
    },

    /// Venn diagram of 2 to 6 sets, one element per line in each file
    Venn {
        #[arg(required = true, num_args = 2..=6)]
        sets: Vec<PathBuf>,

        /// Comma separated set names; defaults to the file names
        #[arg(long)]
        labels: Option<String>,

        /// Petal text, e.g. "{size} ({percentage:.1f}%)"
        #[arg(long)]
        petal_format: Option<String>,

        #[command(flatten)]
        output: OutputArgs,
    },
}

fn split_list(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

fn hex_colors(palette: &[RGBColor]) -> Vec<String> {
    palette
        .iter()
        .map(|c| format!("#{:02X}{:02X}{:02X}", c.0, c.1, c.2))
        .collect()
}

fn separator(sep: Option<char>) -> Result<Option<u8>> {
    sep.map(|c| u8::try_from(c).with_context(|| format!("separator '{c}' is not a single byte")))
        .transpose()
}

fn load_column(path: &Path, column: &str, sep: Option<u8>) -> Result<Vec<f64>> {
    let mut loader = DataLoader::new();
    let df = loader
        .load_table(path, sep)
        .with_context(|| format!("failed to load {}", path.display()))?;
    GwasProcessor::pvalues(df, column).with_context(|| format!("in {}", path.display()))
}

fn write_figure<F: Figure>(figure: &F, output: &OutputArgs, config: &GeneviewConfig) -> Result<()> {
    let size = (
        output.width.unwrap_or(config.width),
        output.height.unwrap_or(config.height),
    );
    StaticChartRenderer::render_to_file(figure, &output.output, size)
        .with_context(|| format!("failed to write {}", output.output.display()))?;

    if output.open {
        open::that(&output.output)
            .with_context(|| format!("failed to open {}", output.output.display()))?;
    }
    Ok(())
}

fn run(cli: Cli) -> Result<()> {
    let config = match &cli.config {
        Some(path) => GeneviewConfig::from_file(path)
            .with_context(|| format!("failed to load config {}", path.display()))?,
        None => GeneviewConfig::default(),
    };

    match cli.command {
        Command::Manhattan {
            inputs,
            chrom,
            pos,
            pv,
            sep,
            no_log,
            colors,
            colorful,
            grayscale,
            title,
            ymax,
            lines,
            chr,
            xtick_labels,
            annotate_top_snp,
            sign_marker_p,
            output,
        } => {
            let mut options = config.manhattan.clone();
            if let Some(chrom) = chrom {
                options.columns.chrom = chrom;
            }
            if let Some(pos) = pos {
                options.columns.pos = pos;
            }
            if let Some(pv) = pv {
                options.columns.pv = pv;
            }
            if no_log {
                options.logp = false;
                options.ylabel = options.columns.pv.clone();
            }
            if let Some(colors) = colors {
                options.colors = split_list(&colors);
            } else if colorful {
                options.colors = hex_colors(&COLORFUL);
            } else if grayscale {
                options.colors = hex_colors(&GRAYSCALE);
            }
            if lines {
                options.kind = PlotKind::Line;
            }
            if let Some(labels) = xtick_labels {
                options.xtick_label_set = Some(split_list(&labels).into_iter().collect::<BTreeSet<_>>());
            }
            options.title = title.or(options.title);
            options.ymax = ymax.or(options.ymax);
            options.chr = chr.or(options.chr);
            options.sign_marker_p = sign_marker_p.or(options.sign_marker_p);
            options.annotate_top_snp |= annotate_top_snp;

            let plot = ManhattanPlot::from_files(inputs.as_slice(), separator(sep)?, options)
                .context("failed to plot GWAS tables")?;
            info!(files = inputs.len(), points = plot.layout().points.len(), "loaded GWAS results");
            write_figure(&plot, &output, &config)
        }

        Command::Qq {
            input,
            column,
            other,
            other_column,
            sep,
            other_sep,
            no_log,
            show_lambda,
            title,
            output,
        } => {
            let mut options = config.qq.clone();
            options.logp &= !no_log;
            options.show_lambda |= show_lambda;
            options.title = title.or(options.title);

            let data = load_column(&input, &column, separator(sep)?)?;
            let other = match &other {
                Some(path) => Some(load_column(
                    path,
                    other_column.as_deref().unwrap_or(&column),
                    separator(other_sep)?,
                )?),
                None => None,
            };

            let plot = QqPlot::qqplot(&data, other.as_deref(), options)?;
            if let Some(lambda) = plot.layout().lambda {
                info!("genomic inflation factor: {lambda:.4}");
            }
            write_figure(&plot, &output, &config)
        }

        Command::Qqnorm {
            input,
            column,
            sep,
            title,
            output,
        } => {
            let mut options = config.qq.clone();
            options.title = title.or(options.title);

            let data = load_column(&input, &column, separator(sep)?)?;
            let plot = QqPlot::qqnorm(&data, options)?;
            write_figure(&plot, &output, &config)
        }

        Command::Admixture {
            q_file,
            population_info,
            group_order,
            xticklabels,
            palette,
            sample_n,
            sample_frac,
            seed,
            output,
        } => {
            let mut options = config.admixture.clone();
            if let Some(order) = group_order {
                options.group_order = Some(split_list(&order));
            }
            if let Some(labels) = xticklabels {
                options.xticklabels = Some(split_list(&labels));
            }
            if let Some(palette) = palette {
                options.palette = split_list(&palette);
            }
            if sample_n.is_some() || sample_frac.is_some() {
                options.sample = Some(SampleSpec {
                    n: sample_n,
                    frac: sample_frac,
                    seed,
                });
            }

            let plot = AdmixturePlot::from_files(&q_file, &population_info, options)
                .with_context(|| format!("failed to plot {}", q_file.display()))?;
            write_figure(&plot, &output, &config)
        }

        Command::Venn {
            sets,
            labels,
            petal_format,
            output,
        } => {
            let mut options = config.venn.clone();
            if let Some(format) = petal_format {
                options.petal_format = format;
            }

            let names: Vec<String> = match labels {
                Some(labels) => split_list(&labels),
                None => sets
                    .iter()
                    .map(|p| {
                        p.file_stem()
                            .map(|s| s.to_string_lossy().into_owned())
                            .unwrap_or_else(|| p.display().to_string())
                    })
                    .collect(),
            };
            if names.len() != sets.len() {
                anyhow::bail!("got {} labels for {} sets", names.len(), sets.len());
            }

            let mut named = Vec::with_capacity(sets.len());
            for (name, path) in names.into_iter().zip(&sets) {
                let elements: BTreeSet<String> = DataLoader::load_set_file(path)
                    .with_context(|| format!("failed to load {}", path.display()))?
                    .into_iter()
                    .collect();
                named.push((name, elements));
            }

            let diagram = VennDiagram::from_sets(&named, &options)?;
            write_figure(&diagram, &output, &config)
        }
    }
}

fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "geneview=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    run(Cli::parse())
}
