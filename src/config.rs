use crate::aggregate::CampaignCorrection;
use crate::datasets;
use crate::error::{PainelError, PainelResult};
use crate::normalize::DatasetSchema;
use serde::Deserialize;
use std::collections::HashMap;
use std::path::Path;

/// Upper bound for any day window, about ten years.
pub const MAX_WINDOW_DAYS: i64 = 3660;

/// Application configuration. Loaded from an optional TOML file and from
/// environment variables with the prefix `PAINEL__`.
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub sheets: SheetServiceConfig,
    #[serde(default = "default_activity_window_days")]
    pub activity_window_days: i64,
    /// Manual campaign adjustments applied after aggregation.
    #[serde(default)]
    pub corrections: Vec<CampaignCorrection>,
    /// Per-dataset overrides of the built-in schemas, keyed by dataset name.
    #[serde(default)]
    pub datasets: HashMap<String, DatasetSchema>,
}

/// Spreadsheet-backed service: `<base_url>/google/sheets/<id>/data?range=`.
#[derive(Debug, Clone, Deserialize)]
pub struct SheetServiceConfig {
    #[serde(default = "default_sheets_base_url")]
    pub base_url: String,
    #[serde(default = "default_spreadsheet_id")]
    pub spreadsheet_id: String,
    #[serde(default = "default_sheets_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_sheets_base_url() -> String {
    "https://nmbcoamazonia-api.vercel.app".to_string()
}
fn default_spreadsheet_id() -> String {
    "1R1ehp35FAxdP1vhI1rT-mIYw3h9fuatHMiS__5V6Yok".to_string()
}
fn default_sheets_timeout_secs() -> u64 {
    30
}
fn default_activity_window_days() -> i64 {
    7
}

impl Default for SheetServiceConfig {
    fn default() -> Self {
        Self {
            base_url: default_sheets_base_url(),
            spreadsheet_id: default_spreadsheet_id(),
            timeout_secs: default_sheets_timeout_secs(),
        }
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            sheets: SheetServiceConfig::default(),
            activity_window_days: default_activity_window_days(),
            corrections: Vec::new(),
            datasets: HashMap::new(),
        }
    }
}

impl AppConfig {
    pub fn load(file: Option<&Path>) -> PainelResult<Self> {
        let mut builder = config::Config::builder();
        if let Some(path) = file {
            builder = builder.add_source(config::File::from(path).required(true));
        } else {
            builder = builder.add_source(config::File::with_name("painel").required(false));
        }
        builder = builder.add_source(
            config::Environment::with_prefix("PAINEL")
                .separator("__")
                .try_parsing(true),
        );
        let cfg: Self = builder.build()?.try_deserialize()?;
        if !(0..=MAX_WINDOW_DAYS).contains(&cfg.activity_window_days) {
            return Err(PainelError::Config(format!(
                "activity_window_days must be between 0 and {MAX_WINDOW_DAYS}, got {}",
                cfg.activity_window_days
            )));
        }
        Ok(cfg)
    }

    /// Configured override for `name`, else the built-in schema.
    pub fn schema(&self, name: &str) -> Option<DatasetSchema> {
        self.datasets
            .get(name)
            .cloned()
            .or_else(|| datasets::builtin(name))
    }
}
