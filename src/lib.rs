//! Tabular ETL for the media dashboard: fetch sheet ranges, normalize pt-BR
//! rows into typed records, filter, aggregate and derive campaign metrics.

pub mod adserver;
pub mod aggregate;
pub mod config;
pub mod creatives;
pub mod datasets;
pub mod derived;
pub mod error;
pub mod filter;
pub mod normalize;
pub mod output;
pub mod reports;
pub mod source;
pub mod table;
pub mod types;
pub mod util;

pub use config::AppConfig;
pub use error::{PainelError, PainelResult, SourceError};
pub use filter::{DateRange, Filters};
pub use source::{CsvDirSource, MemorySource, SharedDataset, SheetClient, TableSource};
pub use table::RawTable;
pub use types::{Dimension, Metric, MetricRecord, Metrics};
