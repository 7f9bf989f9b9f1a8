//! Genome module - chromosome identifiers

mod chrom;

pub use chrom::{chrom_cmp, normalize_chrom};
