//! GWAS Processor Module
//! Turns a loaded table into association records, defaulting column names
//! to the plink2 layout.

use crate::genome::chrom_cmp;
use polars::prelude::*;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::warn;

#[derive(Error, Debug)]
pub enum ProcessorError {
    #[error("Polars error: {0}")]
    PolarsError(#[from] PolarsError),
    #[error("Missing required column '{0}'")]
    MissingColumn(String),
    #[error("Negative position {pos} on row {row}")]
    InvalidPosition { row: usize, pos: i64 },
}

/// Names of the columns holding chromosome, position, p-value and SNP id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ColumnSpec {
    pub chrom: String,
    pub pos: String,
    pub pv: String,
    /// Optional; used for top SNP annotation when present.
    pub snp: String,
}

impl Default for ColumnSpec {
    fn default() -> Self {
        Self {
            chrom: "#CHROM".to_string(),
            pos: "POS".to_string(),
            pv: "P".to_string(),
            snp: "ID".to_string(),
        }
    }
}

/// One association test result.
#[derive(Debug, Clone, PartialEq)]
pub struct GwasRecord {
    pub chrom: String,
    pub pos: u64,
    pub pvalue: f64,
    pub id: Option<String>,
}

impl GwasRecord {
    pub fn new(chrom: impl Into<String>, pos: u64, pvalue: f64) -> Self {
        Self {
            chrom: chrom.into(),
            pos,
            pvalue,
            id: None,
        }
    }

    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    /// SNP id, or `chrom:pos` when the table had none.
    pub fn label(&self) -> String {
        self.id
            .clone()
            .unwrap_or_else(|| format!("{}:{}", self.chrom, self.pos))
    }
}

/// Handles extraction and ordering of association records.
pub struct GwasProcessor;

impl GwasProcessor {
    fn column<'a>(df: &'a DataFrame, name: &str) -> Result<&'a Column, ProcessorError> {
        df.column(name)
            .map_err(|_| ProcessorError::MissingColumn(name.to_string()))
    }

    /// Extract records from `df`.
    ///
    /// Rows with a missing chromosome, position or p-value (or a NaN
    /// p-value) are skipped.
    pub fn extract(df: &DataFrame, columns: &ColumnSpec) -> Result<Vec<GwasRecord>, ProcessorError> {
        let chrom_col = Self::column(df, &columns.chrom)?.cast(&DataType::String)?;
        let pos_col = Self::column(df, &columns.pos)?.cast(&DataType::Int64)?;
        let pv_col = Self::column(df, &columns.pv)?.cast(&DataType::Float64)?;
        let snp_col = match df.column(&columns.snp) {
            Ok(col) => Some(col.cast(&DataType::String)?),
            Err(_) => None,
        };

        let chroms = chrom_col.as_materialized_series().str()?;
        let positions = pos_col.i64()?;
        let pvalues = pv_col.f64()?;
        let snps = match &snp_col {
            Some(col) => Some(col.as_materialized_series().str()?),
            None => None,
        };

        let mut records = Vec::with_capacity(df.height());
        let mut skipped = 0usize;
        for i in 0..df.height() {
            let (Some(chrom), Some(pos), Some(pv)) = (chroms.get(i), positions.get(i), pvalues.get(i))
            else {
                skipped += 1;
                continue;
            };
            if pv.is_nan() {
                skipped += 1;
                continue;
            }
            if pos < 0 {
                return Err(ProcessorError::InvalidPosition { row: i, pos });
            }

            let id = snps
                .and_then(|s| s.get(i))
                .filter(|s| !s.is_empty() && *s != ".")
                .map(str::to_string);

            records.push(GwasRecord {
                chrom: chrom.to_string(),
                pos: pos as u64,
                pvalue: pv,
                id,
            });
        }

        if skipped > 0 {
            warn!(skipped, kept = records.len(), "skipped rows with a missing chromosome, position or p-value");
        }
        Ok(records)
    }

    /// Extract one numeric column, dropping nulls and NaN.
    pub fn pvalues(df: &DataFrame, column: &str) -> Result<Vec<f64>, ProcessorError> {
        let values = Self::column(df, column)?.cast(&DataType::Float64)?;
        let values = values.f64()?;
        Ok(values
            .into_iter()
            .flatten()
            .filter(|v| !v.is_nan())
            .collect())
    }

    /// Stable sort by chromosome order then position.
    pub fn sort_records(records: &mut [GwasRecord]) {
        records.sort_by(|a, b| chrom_cmp(&a.chrom, &b.chrom).then(a.pos.cmp(&b.pos)));
    }
}
