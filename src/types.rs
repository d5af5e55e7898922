use crate::util::{format_brl, format_int, format_percent};
use chrono::NaiveDate;
use serde::ser::SerializeMap;
use serde::{Deserialize, Serialize, Serializer};
use std::ops::{AddAssign, Index, IndexMut};
use tabled::Tabled;

/// Dimensions a record can be filtered and grouped by.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Dimension {
    Date,
    Campaign,
    Agency,
    Vehicle,
    Medium,
    PurchaseType,
    Creative,
    Market,
    /// Ad group or ad set, for platform creative exports.
    AdGroup,
}

/// Additive metrics. Every one of them is safe to sum across rows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Metric {
    Impressions,
    Clicks,
    Spend,
    Reach,
    VideoViews,
    VideoViews25,
    VideoViews50,
    VideoViews75,
    VideoCompletions,
    Engagements,
    /// Contracted or planned volume: impressions, clicks or insertions.
    Contracted,
    ContractedCpm,
    ImpressionsCpm,
    ValidCpm,
    ClicksCpm,
    ViewabilityCpm,
    ContractedCpv,
    ViewsCpv,
    ValidCpv,
    CompletionsCpv,
    ClicksCpv,
    ViewabilityCpv,
}

impl Metric {
    pub const COUNT: usize = 22;

    pub const ALL: [Metric; Metric::COUNT] = [
        Metric::Impressions,
        Metric::Clicks,
        Metric::Spend,
        Metric::Reach,
        Metric::VideoViews,
        Metric::VideoViews25,
        Metric::VideoViews50,
        Metric::VideoViews75,
        Metric::VideoCompletions,
        Metric::Engagements,
        Metric::Contracted,
        Metric::ContractedCpm,
        Metric::ImpressionsCpm,
        Metric::ValidCpm,
        Metric::ClicksCpm,
        Metric::ViewabilityCpm,
        Metric::ContractedCpv,
        Metric::ViewsCpv,
        Metric::ValidCpv,
        Metric::CompletionsCpv,
        Metric::ClicksCpv,
        Metric::ViewabilityCpv,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Metric::Impressions => "impressions",
            Metric::Clicks => "clicks",
            Metric::Spend => "spend",
            Metric::Reach => "reach",
            Metric::VideoViews => "video_views",
            Metric::VideoViews25 => "video_views_25",
            Metric::VideoViews50 => "video_views_50",
            Metric::VideoViews75 => "video_views_75",
            Metric::VideoCompletions => "video_completions",
            Metric::Engagements => "engagements",
            Metric::Contracted => "contracted",
            Metric::ContractedCpm => "contracted_cpm",
            Metric::ImpressionsCpm => "impressions_cpm",
            Metric::ValidCpm => "valid_cpm",
            Metric::ClicksCpm => "clicks_cpm",
            Metric::ViewabilityCpm => "viewability_cpm",
            Metric::ContractedCpv => "contracted_cpv",
            Metric::ViewsCpv => "views_cpv",
            Metric::ValidCpv => "valid_cpv",
            Metric::CompletionsCpv => "completions_cpv",
            Metric::ClicksCpv => "clicks_cpv",
            Metric::ViewabilityCpv => "viewability_cpv",
        }
    }
}

/// Fixed-size bag of metric values indexed by [`Metric`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Metrics([f64; Metric::COUNT]);

impl Default for Metrics {
    fn default() -> Self {
        Metrics([0.0; Metric::COUNT])
    }
}

impl Metrics {
    pub fn get(&self, metric: Metric) -> f64 {
        self[metric]
    }

    pub fn add(&mut self, metric: Metric, value: f64) {
        self[metric] += value;
    }
}

impl Index<Metric> for Metrics {
    type Output = f64;

    fn index(&self, metric: Metric) -> &f64 {
        &self.0[metric as usize]
    }
}

impl IndexMut<Metric> for Metrics {
    fn index_mut(&mut self, metric: Metric) -> &mut f64 {
        &mut self.0[metric as usize]
    }
}

impl AddAssign<&Metrics> for Metrics {
    fn add_assign(&mut self, other: &Metrics) {
        for (a, b) in self.0.iter_mut().zip(other.0.iter()) {
            *a += *b;
        }
    }
}

// Serialized as a `{ "impressions": 1.0, ... }` map.
impl Serialize for Metrics {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(Metric::COUNT))?;
        for metric in Metric::ALL {
            map.serialize_entry(metric.name(), &self[metric])?;
        }
        map.end()
    }
}

/// One normalized sheet row.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct MetricRecord {
    pub date: Option<NaiveDate>,
    pub campaign: String,
    pub agency: String,
    pub vehicle: String,
    pub medium: String,
    pub purchase_type: String,
    pub creative: String,
    pub market: String,
    pub ad_group: String,
    pub metrics: Metrics,
}

impl MetricRecord {
    /// Text value of a dimension. `None` for [`Dimension::Date`], which is
    /// typed; see [`MetricRecord::key_part`].
    pub fn label(&self, dimension: Dimension) -> Option<&str> {
        let value = match dimension {
            Dimension::Date => return None,
            Dimension::Campaign => &self.campaign,
            Dimension::Agency => &self.agency,
            Dimension::Vehicle => &self.vehicle,
            Dimension::Medium => &self.medium,
            Dimension::PurchaseType => &self.purchase_type,
            Dimension::Creative => &self.creative,
            Dimension::Market => &self.market,
            Dimension::AdGroup => &self.ad_group,
        };
        Some(value.as_str())
    }

    pub fn set_label(&mut self, dimension: Dimension, value: String) {
        match dimension {
            Dimension::Date => {}
            Dimension::Campaign => self.campaign = value,
            Dimension::Agency => self.agency = value,
            Dimension::Vehicle => self.vehicle = value,
            Dimension::Medium => self.medium = value,
            Dimension::PurchaseType => self.purchase_type = value,
            Dimension::Creative => self.creative = value,
            Dimension::Market => self.market = value,
            Dimension::AdGroup => self.ad_group = value,
        }
    }

    /// Dimension value as a grouping key component. Dates render as ISO
    /// `YYYY-MM-DD` so keys sort chronologically; a missing date is `""`.
    pub fn key_part(&self, dimension: Dimension) -> String {
        match dimension {
            Dimension::Date => self
                .date
                .map(|d| d.format("%Y-%m-%d").to_string())
                .unwrap_or_default(),
            other => self.label(other).unwrap_or_default().to_string(),
        }
    }

    pub fn metric(&self, metric: Metric) -> f64 {
        self.metrics[metric]
    }
}

// ─── Report rows ────────────────────────────────────────────────────────────

fn show_brl(v: &f64) -> String {
    format_brl(*v)
}

fn show_int(v: &f64) -> String {
    format_int(*v)
}

fn show_pct(v: &f64) -> String {
    format_percent(*v)
}

fn show_date(d: &Option<NaiveDate>) -> String {
    d.map(|d| d.format("%d/%m/%Y").to_string())
        .unwrap_or_else(|| "-".to_string())
}

fn show_day(d: &NaiveDate) -> String {
    d.format("%d/%m/%Y").to_string()
}

fn show_active(active: &bool) -> String {
    if *active { "Ativa" } else { "Inativa" }.to_string()
}

#[derive(Debug, Clone, Serialize, Tabled)]
pub struct CampaignActivityRow {
    #[serde(rename = "Campanha")]
    #[tabled(rename = "Campanha")]
    pub campaign: String,
    #[serde(rename = "Ativa")]
    #[tabled(rename = "Status", display_with = "show_active")]
    pub is_active: bool,
    #[serde(rename = "UltimaAtividade")]
    #[tabled(rename = "UltimaAtividade", display_with = "show_date")]
    pub last_activity: Option<NaiveDate>,
    #[serde(rename = "Investimento")]
    #[tabled(rename = "Investimento", display_with = "show_brl")]
    pub spend: f64,
    #[serde(rename = "Impressoes")]
    #[tabled(rename = "Impressoes", display_with = "show_int")]
    pub impressions: f64,
    #[serde(rename = "Cliques")]
    #[tabled(rename = "Cliques", display_with = "show_int")]
    pub clicks: f64,
    #[serde(rename = "Visualizacoes")]
    #[tabled(rename = "Visualizacoes", display_with = "show_int")]
    pub video_views: f64,
    #[serde(rename = "Engajamentos")]
    #[tabled(rename = "Engajamentos", display_with = "show_int")]
    pub engagements: f64,
    #[serde(rename = "Alcance")]
    #[tabled(rename = "Alcance", display_with = "show_int")]
    pub reach: f64,
    #[serde(rename = "CTR")]
    #[tabled(rename = "CTR", display_with = "show_pct")]
    pub ctr: f64,
    #[serde(rename = "CPM")]
    #[tabled(rename = "CPM", display_with = "show_brl")]
    pub cpm: f64,
}

#[derive(Debug, Clone, Serialize, Tabled)]
pub struct DailyMetricsRow {
    #[serde(rename = "Data")]
    #[tabled(rename = "Data", display_with = "show_day")]
    pub date: NaiveDate,
    #[serde(rename = "Impressoes")]
    #[tabled(rename = "Impressoes", display_with = "show_int")]
    pub impressions: f64,
    #[serde(rename = "Cliques")]
    #[tabled(rename = "Cliques", display_with = "show_int")]
    pub clicks: f64,
    #[serde(rename = "Visualizacoes")]
    #[tabled(rename = "Visualizacoes", display_with = "show_int")]
    pub video_views: f64,
    #[serde(rename = "Investimento")]
    #[tabled(rename = "Investimento", display_with = "show_brl")]
    pub spend: f64,
}

/// One agency, campaign or medium line of the media-plan overview. Counts
/// that do not apply to the grouping stay at zero.
#[derive(Debug, Clone, Serialize, Tabled)]
pub struct PlanLineRow {
    #[serde(rename = "Nome")]
    #[tabled(rename = "Nome")]
    pub name: String,
    #[serde(rename = "Investimento")]
    #[tabled(rename = "Investimento", display_with = "show_brl")]
    pub investment: f64,
    #[serde(rename = "Entrega")]
    #[tabled(rename = "Entrega", display_with = "show_int")]
    pub delivery: f64,
    #[serde(rename = "Participacao")]
    #[tabled(rename = "Participacao", display_with = "show_pct")]
    pub share: f64,
    #[serde(rename = "Campanhas")]
    #[tabled(rename = "Campanhas")]
    pub campaigns: usize,
    #[serde(rename = "Meios")]
    #[tabled(rename = "Meios")]
    pub media: usize,
    #[serde(rename = "Veiculos")]
    #[tabled(rename = "Veiculos")]
    pub vehicles: usize,
}

#[derive(Debug, Clone, Serialize, Tabled)]
pub struct VehicleLineRow {
    #[serde(rename = "Meio")]
    #[tabled(rename = "Meio")]
    pub medium: String,
    #[serde(rename = "Veiculo")]
    #[tabled(rename = "Veiculo")]
    pub vehicle: String,
    #[serde(rename = "Investimento")]
    #[tabled(rename = "Investimento", display_with = "show_brl")]
    pub investment: f64,
    #[serde(rename = "Entrega")]
    #[tabled(rename = "Entrega", display_with = "show_int")]
    pub delivery: f64,
}

#[derive(Debug, Clone, Serialize, Tabled)]
pub struct OfflineLineRow {
    #[serde(rename = "Meio")]
    #[tabled(rename = "Meio")]
    pub medium: String,
    #[serde(rename = "Praca")]
    #[tabled(rename = "Praca")]
    pub market: String,
    #[serde(rename = "Veiculo")]
    #[tabled(rename = "Veiculo")]
    pub vehicle: String,
    #[serde(rename = "Campanha")]
    #[tabled(rename = "Campanha")]
    pub campaign: String,
    #[serde(rename = "TipoCompra")]
    #[tabled(rename = "TipoCompra")]
    pub purchase_type: String,
    #[serde(rename = "Insercoes")]
    #[tabled(rename = "Insercoes", display_with = "show_int")]
    pub insertions: f64,
    #[serde(rename = "Investimento")]
    #[tabled(rename = "Investimento", display_with = "show_brl")]
    pub investment: f64,
}

#[derive(Debug, Clone, Serialize, Tabled)]
pub struct VehicleRateRow {
    #[serde(rename = "Veiculo")]
    #[tabled(rename = "Veiculo")]
    pub vehicle: String,
    #[serde(rename = "Valor")]
    #[tabled(rename = "Valor", display_with = "show_pct")]
    pub value: f64,
}

#[derive(Debug, Clone, Serialize, Tabled)]
pub struct VehicleVolumeRow {
    #[serde(rename = "Veiculo")]
    #[tabled(rename = "Veiculo")]
    pub vehicle: String,
    #[serde(rename = "Impressoes")]
    #[tabled(rename = "Impressoes", display_with = "show_int")]
    pub impressions: f64,
}

/// One creative within its campaign and ad group, ratios recomputed from sums.
#[derive(Debug, Clone, Serialize, Tabled)]
pub struct CreativeRow {
    #[serde(rename = "Criativo")]
    #[tabled(rename = "Criativo")]
    pub creative: String,
    #[serde(rename = "Campanha")]
    #[tabled(rename = "Campanha")]
    pub campaign: String,
    #[serde(rename = "GrupoAnuncios")]
    #[tabled(rename = "GrupoAnuncios")]
    pub ad_group: String,
    #[serde(rename = "TipoCompra")]
    #[tabled(rename = "TipoCompra")]
    pub purchase_type: String,
    #[serde(rename = "Investimento")]
    #[tabled(rename = "Investimento", display_with = "show_brl")]
    pub spend: f64,
    #[serde(rename = "Impressoes")]
    #[tabled(rename = "Impressoes", display_with = "show_int")]
    pub impressions: f64,
    #[serde(rename = "Cliques")]
    #[tabled(rename = "Cliques", display_with = "show_int")]
    pub clicks: f64,
    #[serde(rename = "Visualizacoes")]
    #[tabled(rename = "Visualizacoes", display_with = "show_int")]
    pub video_views: f64,
    #[serde(rename = "Conclusoes")]
    #[tabled(rename = "Conclusoes", display_with = "show_int")]
    pub completions: f64,
    #[serde(rename = "Engajamentos")]
    #[tabled(rename = "Engajamentos", display_with = "show_int")]
    pub engagements: f64,
    #[serde(rename = "CTR")]
    #[tabled(rename = "CTR", display_with = "show_pct")]
    pub ctr: f64,
    #[serde(rename = "CPC")]
    #[tabled(rename = "CPC", display_with = "show_brl")]
    pub cpc: f64,
    #[serde(rename = "CPM")]
    #[tabled(rename = "CPM", display_with = "show_brl")]
    pub cpm: f64,
    #[serde(rename = "VTR")]
    #[tabled(rename = "VTR", display_with = "show_pct")]
    pub vtr: f64,
}

#[derive(Debug, Clone, Serialize, Tabled)]
pub struct WeeklyVehicleRow {
    #[serde(rename = "Semana")]
    #[tabled(rename = "Semana", display_with = "show_day")]
    pub week_start: NaiveDate,
    #[serde(rename = "Veiculo")]
    #[tabled(rename = "Veiculo")]
    pub vehicle: String,
    #[serde(rename = "Investimento")]
    #[tabled(rename = "Investimento", display_with = "show_brl")]
    pub spend: f64,
    #[serde(rename = "Impressoes")]
    #[tabled(rename = "Impressoes", display_with = "show_int")]
    pub impressions: f64,
    #[serde(rename = "Cliques")]
    #[tabled(rename = "Cliques", display_with = "show_int")]
    pub clicks: f64,
    #[serde(rename = "Visualizacoes")]
    #[tabled(rename = "Visualizacoes", display_with = "show_int")]
    pub video_views: f64,
    #[serde(rename = "CTR")]
    #[tabled(rename = "CTR", display_with = "show_pct")]
    pub ctr: f64,
    #[serde(rename = "CPM")]
    #[tabled(rename = "CPM", display_with = "show_brl")]
    pub cpm: f64,
}
