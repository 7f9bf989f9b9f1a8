//! Table Loader Module
//! Handles CSV / plink2 table loading with Polars, plus the line-oriented
//! inputs of admixture and Venn plots.

use crate::data::processor::ColumnSpec;
use polars::prelude::*;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use thiserror::Error;
use tracing::debug;

#[derive(Error, Debug)]
pub enum LoaderError {
    #[error("Failed to load table: {0}")]
    CsvError(#[from] PolarsError),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("No data loaded")]
    NoData,
    #[error("The size of sample info ({info}) and admixture result ({rows}) must be the same")]
    SizeMismatch { info: usize, rows: usize },
    #[error("{path}: {message}")]
    Parse { path: String, message: String },
}

/// Admixture proportions grouped by population, in first-appearance order.
pub type AdmixtureData = Vec<(String, Vec<Vec<f64>>)>;

/// Field separator implied by a file name: `.csv` is comma separated,
/// everything else (plink2 `.glm.*`, `.tsv`, `.txt`) is tab separated.
pub fn separator_for(path: &Path) -> u8 {
    match path.extension().and_then(|e| e.to_str()) {
        Some(ext) if ext.eq_ignore_ascii_case("csv") => b',',
        _ => b'\t',
    }
}

/// Handles table loading with Polars for high performance.
pub struct DataLoader {
    df: Option<DataFrame>,
    file_path: Option<PathBuf>,
    /// Columns always read as text, whatever the first rows look like.
    text_columns: Vec<String>,
}

impl Default for DataLoader {
    fn default() -> Self {
        Self::new()
    }
}

impl DataLoader {
    pub fn new() -> Self {
        let columns = ColumnSpec::default();
        Self {
            df: None,
            file_path: None,
            text_columns: vec![columns.chrom, columns.snp],
        }
    }

    /// Read the chromosome and SNP id columns of `columns` as text.
    ///
    /// Chromosome columns often start with thousands of numeric rows before
    /// `X`, `Y` or `MT`, which schema inference would otherwise turn into
    /// nulls.
    pub fn with_columns(mut self, columns: &ColumnSpec) -> Self {
        self.text_columns = vec![columns.chrom.clone(), columns.snp.clone()];
        self
    }

    fn csv_reader(path: &Path, separator: u8) -> LazyCsvReader {
        LazyCsvReader::new(path)
            .with_separator(separator)
            .with_has_header(true)
            .with_infer_schema_length(Some(10000))
            .with_ignore_errors(true)
    }

    fn read_table(&self, path: &Path, separator: u8) -> Result<DataFrame, LoaderError> {
        let header = Self::csv_reader(path, separator).finish()?.collect_schema()?;
        let overwrite: Schema = self
            .text_columns
            .iter()
            .filter(|name| header.contains(name.as_str()))
            .map(|name| Field::new(name.as_str().into(), DataType::String))
            .collect();

        // Use lazy evaluation for memory efficiency, then collect
        let mut reader = Self::csv_reader(path, separator);
        if !overwrite.is_empty() {
            reader = reader.with_dtype_overwrite(Some(Arc::new(overwrite)));
        }
        Ok(reader.finish()?.collect()?)
    }

    /// Load a delimited table. `separator` defaults from the file extension.
    pub fn load_table(
        &mut self,
        path: impl AsRef<Path>,
        separator: Option<u8>,
    ) -> Result<&DataFrame, LoaderError> {
        let path = path.as_ref();
        let separator = separator.unwrap_or_else(|| separator_for(path));
        self.file_path = Some(path.to_path_buf());

        let df = self.read_table(path, separator)?;
        debug!(path = %path.display(), rows = df.height(), "loaded table");

        self.df = Some(df);
        self.df.as_ref().ok_or(LoaderError::NoData)
    }

    /// Load several tables sharing one schema and stack them vertically.
    pub fn load_tables<P: AsRef<Path>>(
        &mut self,
        paths: &[P],
        separator: Option<u8>,
    ) -> Result<&DataFrame, LoaderError> {
        let mut stacked: Option<DataFrame> = None;
        for path in paths {
            let path = path.as_ref();
            let sep = separator.unwrap_or_else(|| separator_for(path));
            let df = self.read_table(path, sep)?;
            match stacked.as_mut() {
                Some(acc) => {
                    acc.vstack_mut(&df)?;
                }
                None => stacked = Some(df),
            }
            self.file_path = Some(path.to_path_buf());
        }

        self.df = stacked;
        self.df.as_ref().ok_or(LoaderError::NoData)
    }

    /// Get list of column names from loaded DataFrame.
    pub fn get_columns(&self) -> Vec<String> {
        self.df
            .as_ref()
            .map(|df| {
                df.get_column_names()
                    .iter()
                    .map(|s| s.to_string())
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Get the number of rows in the DataFrame.
    pub fn get_row_count(&self) -> usize {
        self.df.as_ref().map(|df| df.height()).unwrap_or(0)
    }

    /// Get a reference to the loaded DataFrame.
    pub fn get_dataframe(&self) -> Option<&DataFrame> {
        self.df.as_ref()
    }

    /// Get file path.
    pub fn get_file_path(&self) -> Option<&PathBuf> {
        self.file_path.as_ref()
    }

    /// Load an ADMIXTURE `.Q` matrix and the matching population labels.
    ///
    /// The `.Q` file is space separated without header, one individual per
    /// row. The population file holds one group label per line, in the same
    /// order as the matrix rows.
    pub fn load_admixture(
        q_path: impl AsRef<Path>,
        population_info: impl AsRef<Path>,
    ) -> Result<AdmixtureData, LoaderError> {
        let q_path = q_path.as_ref();
        let df = LazyCsvReader::new(q_path)
            .with_separator(b' ')
            .with_has_header(false)
            .with_infer_schema_length(Some(10000))
            .finish()?
            .collect()?;

        let mut columns: Vec<Vec<f64>> = Vec::new();
        for col in df.get_columns() {
            // A trailing separator yields an all-null column.
            if col.null_count() == col.len() {
                continue;
            }
            let values = col.cast(&DataType::Float64)?;
            let values = values.f64()?;
            let mut parsed = Vec::with_capacity(values.len());
            for (i, v) in values.into_iter().enumerate() {
                let v = v.ok_or_else(|| LoaderError::Parse {
                    path: q_path.display().to_string(),
                    message: format!("missing or non-numeric value on line {}", i + 1),
                })?;
                parsed.push(v);
            }
            columns.push(parsed);
        }

        let n_rows = df.height();
        let rows: Vec<Vec<f64>> = (0..n_rows)
            .map(|i| columns.iter().map(|c| c[i]).collect())
            .collect();

        let groups = Self::load_lines(population_info)?;
        if groups.len() != rows.len() {
            return Err(LoaderError::SizeMismatch {
                info: groups.len(),
                rows: rows.len(),
            });
        }

        let mut data: AdmixtureData = Vec::new();
        for (group, row) in groups.into_iter().zip(rows) {
            match data.iter_mut().find(|(g, _)| *g == group) {
                Some((_, members)) => members.push(row),
                None => data.push((group, vec![row])),
            }
        }

        debug!(
            path = %q_path.display(),
            individuals = n_rows,
            groups = data.len(),
            "loaded admixture result"
        );
        Ok(data)
    }

    /// Load a set file: one element per non-empty line.
    pub fn load_set_file(path: impl AsRef<Path>) -> Result<Vec<String>, LoaderError> {
        Self::load_lines(path)
    }

    fn load_lines(path: impl AsRef<Path>) -> Result<Vec<String>, LoaderError> {
        let content = fs::read_to_string(path)?;
        Ok(content
            .lines()
            .map(str::trim)
            .filter(|l| !l.is_empty())
            .map(str::to_string)
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::processor::GwasProcessor;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn create_test_file(suffix: &str, contents: &str) -> NamedTempFile {
        let mut file = tempfile::Builder::new().suffix(suffix).tempfile().unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        file.flush().unwrap();
        file
    }

    #[test]
    fn test_separator_for() {
        assert_eq!(separator_for(Path::new("gwas.csv")), b',');
        assert_eq!(separator_for(Path::new("gwas.CSV")), b',');
        assert_eq!(separator_for(Path::new("out.PHENO1.glm.logistic")), b'\t');
        assert_eq!(separator_for(Path::new("gwas")), b'\t');
    }

    #[test]
    fn test_load_plink2_table() {
        let file = create_test_file(
            ".glm.linear",
            "#CHROM\tPOS\tID\tP\n1\t100\trs1\t0.5\n1\t200\trs2\t1e-9\n2\t50\trs3\t0.01\n",
        );
        let mut loader = DataLoader::new();
        let df = loader.load_table(file.path(), None).unwrap();
        assert_eq!(df.height(), 3);
        assert_eq!(loader.get_columns(), vec!["#CHROM", "POS", "ID", "P"]);
        assert_eq!(loader.get_row_count(), 3);
        assert_eq!(loader.get_file_path().unwrap(), &file.path().to_path_buf());
    }

    fn late_sex_chromosome_table() -> NamedTempFile {
        let mut text = String::from("#CHROM\tPOS\tID\tP\n");
        for i in 0..12_000 {
            text.push_str(&format!("1\t{}\trs{i}\t0.5\n", i + 1));
        }
        for i in 0..50 {
            text.push_str(&format!("X\t{}\t.\t1e-12\n", i + 1));
        }
        create_test_file(".glm.linear", &text)
    }

    #[test]
    fn test_chromosome_column_read_as_text() {
        let file = late_sex_chromosome_table();
        let mut loader = DataLoader::new();
        let df = loader.load_table(file.path(), None).unwrap();
        assert_eq!(df.height(), 12_050);

        let chrom = df.column("#CHROM").unwrap();
        assert_eq!(chrom.dtype(), &DataType::String);
        assert_eq!(chrom.null_count(), 0);

        let records = GwasProcessor::extract(df, &ColumnSpec::default()).unwrap();
        assert_eq!(records.len(), 12_050);
        assert_eq!(records.iter().filter(|r| r.chrom == "X").count(), 50);
    }

    #[test]
    fn test_custom_chromosome_column_read_as_text() {
        let mut text = String::from("CHR,BP,PVAL\n");
        for i in 0..10_500 {
            text.push_str(&format!("2,{},0.1\n", i + 1));
        }
        text.push_str("MT,5,0.2\n");
        let file = create_test_file(".csv", &text);

        let columns = ColumnSpec {
            chrom: "CHR".into(),
            pos: "BP".into(),
            pv: "PVAL".into(),
            ..Default::default()
        };
        let mut loader = DataLoader::new().with_columns(&columns);
        let df = loader.load_table(file.path(), None).unwrap();
        let records = GwasProcessor::extract(df, &columns).unwrap();
        assert_eq!(records.len(), 10_501);
        assert_eq!(records.last().unwrap().chrom, "MT");
    }

    #[test]
    fn test_load_tables_stacks_rows() {
        let a = create_test_file(".csv", "#CHROM,POS,P\n1,10,0.1\n");
        let b = create_test_file(".csv", "#CHROM,POS,P\n2,20,0.2\n3,30,0.3\n");
        let mut loader = DataLoader::new();
        let df = loader.load_tables(&[a.path(), b.path()], None).unwrap();
        assert_eq!(df.height(), 3);
    }

    #[test]
    fn test_load_tables_empty_list() {
        let mut loader = DataLoader::new();
        let paths: [&Path; 0] = [];
        assert!(matches!(
            loader.load_tables(&paths, None),
            Err(LoaderError::NoData)
        ));
    }

    #[test]
    fn test_load_admixture() {
        let q = create_test_file(".Q", "0.9 0.1\n0.2 0.8\n0.85 0.15\n");
        let info = create_test_file(".info", "CEU\nYRI\nCEU\n");
        let data = DataLoader::load_admixture(q.path(), info.path()).unwrap();

        assert_eq!(data.len(), 2);
        assert_eq!(data[0].0, "CEU");
        assert_eq!(data[0].1, vec![vec![0.9, 0.1], vec![0.85, 0.15]]);
        assert_eq!(data[1].0, "YRI");
        assert_eq!(data[1].1, vec![vec![0.2, 0.8]]);
    }

    #[test]
    fn test_load_admixture_size_mismatch() {
        let q = create_test_file(".Q", "0.9 0.1\n0.2 0.8\n");
        let info = create_test_file(".info", "CEU\n");
        let err = DataLoader::load_admixture(q.path(), info.path()).unwrap_err();
        assert!(matches!(err, LoaderError::SizeMismatch { info: 1, rows: 2 }));
    }

    #[test]
    fn test_load_set_file_skips_blank_lines() {
        let file = create_test_file(".txt", "BRCA1\n\n TP53 \nEGFR\n");
        let set = DataLoader::load_set_file(file.path()).unwrap();
        assert_eq!(set, vec!["BRCA1", "TP53", "EGFR"]);
    }
}
