//! Stats module - quantiles, inflation and clustering

mod calculator;
pub mod cluster;

pub use calculator::{StatsCalculator, StatsError, CHI2_1DF_MEDIAN, DEFAULT_PPOINTS_OFFSET};
pub use cluster::{hierarchical_order, Linkage, Metric};
