//! geneview - Genomics plotting
//!
//! Manhattan, Q-Q, admixture and Venn plots drawn with plotters from
//! GWAS tables, ADMIXTURE results and gene sets.

pub mod charts;
pub mod config;
pub mod data;
pub mod genome;
pub mod stats;

pub use charts::{Figure, PlotError, StaticChartRenderer};
pub use config::{ConfigError, GeneviewConfig};
