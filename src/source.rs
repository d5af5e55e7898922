//! Where tables come from: the sheets HTTP service, a directory of CSV
//! exports, or an in-memory map. Nothing here retries; a failed fetch is
//! final for that load.

use crate::config::SheetServiceConfig;
use crate::error::SourceError;
use crate::table::{RawTable, SheetResponse};
use futures::future::join_all;
use reqwest::Client;
use std::collections::HashMap;
use std::future::Future;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;
use tracing::{info, warn};

/// Anything that can hand back a header-row table for a range name.
pub trait TableSource: Send + Sync {
    fn fetch(&self, range: &str) -> impl Future<Output = Result<RawTable, SourceError>> + Send;
}

/// Client for `<base>/google/sheets/<id>/data?range=<range>`.
#[derive(Debug, Clone)]
pub struct SheetClient {
    http: Client,
    base_url: String,
    spreadsheet_id: String,
}

impl SheetClient {
    pub fn spreadsheet(cfg: &SheetServiceConfig) -> Result<Self, SourceError> {
        let http = Client::builder()
            .timeout(Duration::from_secs(cfg.timeout_secs))
            .build()
            .map_err(|source| SourceError::Http {
                url: cfg.base_url.clone(),
                source,
            })?;
        Ok(Self {
            http,
            base_url: cfg.base_url.trim_end_matches('/').to_string(),
            spreadsheet_id: cfg.spreadsheet_id.clone(),
        })
    }

    fn url(&self) -> String {
        format!("{}/google/sheets/{}/data", self.base_url, self.spreadsheet_id)
    }
}

/// Unwraps a decoded service body into a table for `range`.
fn table_from_body(range: &str, body: SheetResponse) -> Result<RawTable, SourceError> {
    if !body.success {
        warn!(range, "sheet service reported failure");
        return Err(SourceError::Unsuccessful {
            range: range.to_string(),
        });
    }
    Ok(RawTable::from_response(body))
}

impl TableSource for SheetClient {
    async fn fetch(&self, range: &str) -> Result<RawTable, SourceError> {
        let url = self.url();
        info!(%url, range, "fetching sheet");
        let http_err = |source| SourceError::Http {
            url: url.clone(),
            source,
        };
        let resp = self
            .http
            .get(&url)
            .query(&[("range", range)])
            .send()
            .await
            .map_err(http_err)?;
        let status = resp.status();
        if !status.is_success() {
            warn!(%url, status = status.as_u16(), "sheet request failed");
            return Err(SourceError::Status {
                status: status.as_u16(),
                url,
            });
        }
        let body: SheetResponse = resp.json().await.map_err(http_err)?;
        let table = table_from_body(range, body)?;
        info!(range, rows = table.len(), "sheet loaded");
        Ok(table)
    }
}

/// Reads `<dir>/<range>.csv`; the first record is the header row.
#[derive(Debug, Clone)]
pub struct CsvDirSource {
    dir: PathBuf,
}

impl CsvDirSource {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    fn read(&self, range: &str) -> Result<RawTable, SourceError> {
        let path = self.dir.join(format!("{range}.csv"));
        if !path.exists() {
            return Err(SourceError::NotFound {
                range: range.to_string(),
            });
        }
        let csv_err = |source| SourceError::Csv {
            range: range.to_string(),
            source,
        };
        let mut rdr = csv::ReaderBuilder::new()
            .has_headers(false)
            .flexible(true)
            .from_path(&path)
            .map_err(csv_err)?;
        let mut grid = Vec::new();
        for record in rdr.records() {
            let record = record.map_err(csv_err)?;
            grid.push(record.iter().map(str::to_string).collect());
        }
        Ok(RawTable::from_grid(grid))
    }
}

impl TableSource for CsvDirSource {
    async fn fetch(&self, range: &str) -> Result<RawTable, SourceError> {
        let table = self.read(range)?;
        info!(range, rows = table.len(), dir = %self.dir.display(), "csv loaded");
        Ok(table)
    }
}

/// Fixed tables keyed by range name.
#[derive(Debug, Clone, Default)]
pub struct MemorySource {
    tables: HashMap<String, RawTable>,
}

impl MemorySource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_table(mut self, range: &str, table: RawTable) -> Self {
        self.tables.insert(range.to_string(), table);
        self
    }
}

impl TableSource for MemorySource {
    async fn fetch(&self, range: &str) -> Result<RawTable, SourceError> {
        self.tables
            .get(range)
            .cloned()
            .ok_or_else(|| SourceError::NotFound {
                range: range.to_string(),
            })
    }
}

/// Fetch several ranges concurrently. Either every table comes back, in
/// request order, or the first error in request order does.
pub async fn fetch_all<S: TableSource>(
    source: &S,
    ranges: &[&str],
) -> Result<Vec<RawTable>, SourceError> {
    let results = join_all(ranges.iter().map(|r| source.fetch(r))).await;
    let mut tables = Vec::with_capacity(results.len());
    for (range, result) in ranges.iter().zip(results) {
        match result {
            Ok(t) => tables.push(t),
            Err(e) => {
                warn!(range, error = %e, "fetch failed");
                return Err(e);
            }
        }
    }
    Ok(tables)
}

/// One table shared read-only by every view that needs it. Fetched on first
/// use and only fetched again through [`SharedDataset::refresh`].
pub struct SharedDataset<S> {
    source: Arc<S>,
    range: String,
    cached: RwLock<Option<Arc<RawTable>>>,
}

impl<S: TableSource> SharedDataset<S> {
    pub fn new(source: Arc<S>, range: impl Into<String>) -> Self {
        Self {
            source,
            range: range.into(),
            cached: RwLock::new(None),
        }
    }

    pub async fn get(&self) -> Result<Arc<RawTable>, SourceError> {
        if let Some(t) = self.cached.read().await.as_ref() {
            return Ok(Arc::clone(t));
        }
        let mut slot = self.cached.write().await;
        // another caller may have filled it while we waited
        if let Some(t) = slot.as_ref() {
            return Ok(Arc::clone(t));
        }
        let table = Arc::new(self.source.fetch(&self.range).await?);
        *slot = Some(Arc::clone(&table));
        Ok(table)
    }

    /// Refetch and replace the snapshot. On failure the previous snapshot
    /// is kept.
    pub async fn refresh(&self) -> Result<Arc<RawTable>, SourceError> {
        let table = Arc::new(self.source.fetch(&self.range).await?);
        *self.cached.write().await = Some(Arc::clone(&table));
        Ok(table)
    }
}
