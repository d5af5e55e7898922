//! Built-in schemas for the sheets the dashboard reads.

use crate::error::SourceError;
use crate::normalize::{
    normalize_table, DatasetSchema, DimensionColumn, Exclusion, LoadReport, MetricColumn,
    NumberFormat, VehicleAliases,
};
use crate::source::TableSource;
use crate::types::{Dimension, Metric, MetricRecord};

fn dim(dimension: Dimension, headers: &[&str]) -> DimensionColumn {
    DimensionColumn {
        dimension,
        headers: headers.iter().map(|h| h.to_string()).collect(),
    }
}

fn metric(metric: Metric, headers: &[&str], format: NumberFormat) -> MetricColumn {
    MetricColumn {
        metric,
        headers: headers.iter().map(|h| h.to_string()).collect(),
        format,
    }
}

pub const CONSOLIDATED: &str = "consolidated";
pub const MEDIA_PLAN: &str = "media_plan";
pub const OFFLINE: &str = "offline";
pub const AD_SERVER: &str = "ad_server";
pub const GOOGLE_ADS_CREATIVES: &str = "google_ads_creatives";
pub const KWAI_CREATIVES: &str = "kwai_creatives";

/// Daily platform export: one row per date, campaign, vehicle and creative.
pub fn consolidated() -> DatasetSchema {
    use NumberFormat::{Currency, Integer};
    DatasetSchema {
        name: CONSOLIDATED.into(),
        range: "Consolidado".into(),
        dimensions: vec![
            dim(Dimension::Date, &["Date"]),
            dim(Dimension::Campaign, &["Campanha"]),
            dim(Dimension::Vehicle, &["Veículo"]),
            dim(Dimension::Creative, &["Creative title"]),
            dim(Dimension::PurchaseType, &["Tipo de Compra"]),
        ],
        metrics: vec![
            metric(Metric::Spend, &["Total spent"], Currency),
            metric(Metric::Impressions, &["Impressions"], Integer),
            metric(Metric::Clicks, &["Clicks"], Integer),
            metric(Metric::Reach, &["Reach"], Integer),
            metric(Metric::VideoViews, &["Video Views", "Video views"], Integer),
            metric(Metric::VideoViews25, &["Video views at 25%"], Integer),
            metric(Metric::VideoViews50, &["Video views at 50%"], Integer),
            metric(Metric::VideoViews75, &["Video views at 75%"], Integer),
            metric(Metric::VideoCompletions, &["Video completions"], Integer),
            metric(
                Metric::Engagements,
                &["Engagements", "Total engagements"],
                Integer,
            ),
        ],
        required: vec![Dimension::Date],
        primary_metrics: vec![Metric::Impressions, Metric::Spend],
        excluded: vec![],
        normalize_vehicles: true,
    }
}

/// Media plan ("Plano"): contracted volume and disbursement per line item.
pub fn media_plan() -> DatasetSchema {
    DatasetSchema {
        name: MEDIA_PLAN.into(),
        range: "Plano".into(),
        dimensions: vec![
            dim(Dimension::Agency, &["AGÊNCIA"]),
            dim(Dimension::Campaign, &["CAMPANHA"]),
            dim(Dimension::Medium, &["MEIO"]),
            dim(Dimension::Vehicle, &["VEÍCULO"]),
            dim(Dimension::Market, &["PRAÇA"]),
            dim(Dimension::PurchaseType, &["TIPO DE COMPRA"]),
        ],
        metrics: vec![
            metric(
                Metric::Contracted,
                &["IMPRESSÕES / CLIQUES / DIÁRIAS"],
                NumberFormat::Number,
            ),
            metric(
                Metric::Spend,
                &["VALORDESEMBOLSO95%(banco)"],
                NumberFormat::Currency,
            ),
        ],
        required: vec![],
        primary_metrics: vec![],
        excluded: vec![],
        normalize_vehicles: false,
    }
}

/// The media plan restricted to offline media: rows need both a medium and
/// a vehicle, and internet lines are left out.
pub fn offline() -> DatasetSchema {
    DatasetSchema {
        name: OFFLINE.into(),
        required: vec![Dimension::Medium, Dimension::Vehicle],
        excluded: vec![Exclusion {
            dimension: Dimension::Medium,
            value: "internet".into(),
        }],
        ..media_plan()
    }
}

/// Ad-server delivery on publisher portals, split into CPM and CPV buys.
pub fn ad_server() -> DatasetSchema {
    use NumberFormat::Number;
    DatasetSchema {
        name: AD_SERVER.into(),
        range: "AdServer".into(),
        dimensions: vec![
            dim(Dimension::Campaign, &["Campanha"]),
            dim(Dimension::Agency, &["Agência"]),
            dim(Dimension::Vehicle, &["Veículo"]),
            dim(Dimension::Date, &["Data"]),
            dim(Dimension::Market, &["Praça"]),
            dim(Dimension::Creative, &["ID Criativo"]),
        ],
        metrics: vec![
            metric(Metric::ContractedCpm, &["Contratado CPM"], Number),
            metric(Metric::ImpressionsCpm, &["Impressões CPM"], Number),
            metric(Metric::ValidCpm, &["Válidas CPM"], Number),
            metric(Metric::ClicksCpm, &["Cliques CPM"], Number),
            metric(Metric::ViewabilityCpm, &["VA IAB CPM"], Number),
            metric(Metric::ContractedCpv, &["Contratado CPV"], Number),
            metric(Metric::ViewsCpv, &["Views"], Number),
            metric(Metric::ValidCpv, &["Válidas CPV"], Number),
            metric(Metric::CompletionsCpv, &["Progress 100%", "100%"], Number),
            metric(Metric::ClicksCpv, &["Cliques CPV"], Number),
            metric(Metric::ViewabilityCpv, &["VA IAB CPV"], Number),
        ],
        required: vec![],
        primary_metrics: vec![],
        excluded: vec![],
        normalize_vehicles: false,
    }
}

/// Google Ads export, one row per day and ad.
pub fn google_ads_creatives() -> DatasetSchema {
    use NumberFormat::{Currency, Integer};
    DatasetSchema {
        name: GOOGLE_ADS_CREATIVES.into(),
        range: "Google ads".into(),
        dimensions: vec![
            dim(Dimension::Date, &["Day"]),
            dim(Dimension::Campaign, &["Campaign Name"]),
            dim(Dimension::AdGroup, &["Ad Group Name"]),
            dim(Dimension::Creative, &["Ad Name"]),
            dim(Dimension::PurchaseType, &["Tipo de Compra"]),
        ],
        metrics: vec![
            metric(Metric::Impressions, &["Impressions"], Integer),
            metric(Metric::Clicks, &["Clicks"], Integer),
            metric(Metric::Spend, &["Cost (Spend)"], Currency),
            metric(Metric::VideoViews, &["Video Views"], Integer),
            metric(Metric::VideoViews25, &["Video played to 25%"], Integer),
            metric(Metric::VideoViews50, &["Video played to 50%"], Integer),
            metric(Metric::VideoViews75, &["Video played to 75%"], Integer),
            metric(Metric::VideoCompletions, &["Video played to 100%"], Integer),
            metric(Metric::Engagements, &["Engagements"], Integer),
        ],
        required: vec![Dimension::Date],
        primary_metrics: vec![Metric::Impressions],
        excluded: vec![],
        normalize_vehicles: false,
    }
}

/// Kwai export, one row per day and creative.
pub fn kwai_creatives() -> DatasetSchema {
    use NumberFormat::{Currency, Integer};
    DatasetSchema {
        name: KWAI_CREATIVES.into(),
        range: "Kwai".into(),
        dimensions: vec![
            dim(Dimension::Date, &["Time"]),
            dim(Dimension::Campaign, &["Campaign name"]),
            dim(Dimension::AdGroup, &["Ad Set Name"]),
            dim(Dimension::Creative, &["Creative name"]),
        ],
        metrics: vec![
            metric(Metric::Spend, &["Cost(BRL)"], Currency),
            metric(Metric::Impressions, &["Impression"], Integer),
            metric(Metric::Clicks, &["Click"], Integer),
            metric(Metric::VideoViews, &["3s Video Plays"], Integer),
            metric(
                Metric::VideoCompletions,
                &["Counts of video played to its completion"],
                Integer,
            ),
            metric(Metric::Engagements, &["Total Engagement"], Integer),
        ],
        required: vec![Dimension::Date],
        primary_metrics: vec![Metric::Impressions],
        excluded: vec![],
        normalize_vehicles: false,
    }
}

pub fn builtin(name: &str) -> Option<DatasetSchema> {
    match name {
        CONSOLIDATED => Some(consolidated()),
        MEDIA_PLAN => Some(media_plan()),
        OFFLINE => Some(offline()),
        AD_SERVER => Some(ad_server()),
        GOOGLE_ADS_CREATIVES => Some(google_ads_creatives()),
        KWAI_CREATIVES => Some(kwai_creatives()),
        _ => None,
    }
}

/// Fetch the schema's range from `source` and normalize it.
pub async fn load<S: TableSource>(
    source: &S,
    schema: &DatasetSchema,
    aliases: &VehicleAliases,
) -> Result<(Vec<MetricRecord>, LoadReport), SourceError> {
    let table = source.fetch(&schema.range).await?;
    Ok(normalize_table(&table, schema, aliases))
}
