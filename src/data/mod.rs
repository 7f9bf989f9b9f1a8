//! Data module - table loading and GWAS record extraction

mod loader;
mod processor;

pub use loader::{separator_for, AdmixtureData, DataLoader, LoaderError};
pub use processor::{ColumnSpec, GwasProcessor, GwasRecord, ProcessorError};
