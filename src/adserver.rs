//! Ad-server ("Portais") delivery: contracted against delivered inventory
//! per purchase type, with per-vehicle rankings.

use crate::aggregate::{aggregate, totals, GroupKey};
use crate::derived::{average_positive, ctr, pacing, vtr, PacingMode};
use crate::filter::Filters;
use crate::types::{Metric, MetricRecord, Metrics, VehicleRateRow, VehicleVolumeRow};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

const TOP: usize = 10;
const NO_VEHICLE: &str = "Sem veículo";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PurchaseMode {
    #[default]
    All,
    Cpm,
    Cpv,
}

impl PurchaseMode {
    pub fn includes(self, r: &MetricRecord) -> bool {
        let cpm = r.metric(Metric::ContractedCpm) > 0.0 || r.metric(Metric::ImpressionsCpm) > 0.0;
        let cpv = r.metric(Metric::ContractedCpv) > 0.0 || r.metric(Metric::ViewsCpv) > 0.0;
        match self {
            PurchaseMode::All => true,
            PurchaseMode::Cpm => cpm,
            PurchaseMode::Cpv => cpv,
        }
    }

    fn cpm(self) -> bool {
        matches!(self, PurchaseMode::All | PurchaseMode::Cpm)
    }

    fn cpv(self) -> bool {
        matches!(self, PurchaseMode::All | PurchaseMode::Cpv)
    }

    /// Sum of `metric` when `on`, zero otherwise.
    fn gated(on: bool, m: &Metrics, metric: Metric) -> f64 {
        if on {
            m[metric]
        } else {
            0.0
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct AdServerSummary {
    pub contracted: f64,
    pub delivered: f64,
    /// Delivered over contracted, capped at 100%.
    pub pacing: f64,
    pub clicks: f64,
    pub ctr: f64,
    pub views: f64,
    pub completions: f64,
    /// Completions over views.
    pub vtr: f64,
    /// Mean of the positive CPM and CPV viewability readings.
    pub viewability: f64,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct AdServerView {
    pub mode: PurchaseMode,
    pub summary: AdServerSummary,
    pub pacing_by_vehicle: Vec<VehicleRateRow>,
    pub impressions_by_vehicle: Vec<VehicleVolumeRow>,
    pub ctr_by_vehicle: Vec<VehicleRateRow>,
}

fn vehicle_key(r: &MetricRecord) -> Option<GroupKey> {
    let v = r.vehicle.trim();
    Some(vec![if v.is_empty() { NO_VEHICLE } else { v }.to_string()])
}

fn top<T>(mut rows: Vec<T>, value: impl Fn(&T) -> f64) -> Vec<T> {
    rows.sort_by(|a, b| value(b).partial_cmp(&value(a)).unwrap_or(Ordering::Equal));
    rows.truncate(TOP);
    rows
}

pub fn ad_server_view(records: &[MetricRecord], filters: &Filters, mode: PurchaseMode) -> AdServerView {
    let kept: Vec<&MetricRecord> = filters
        .apply(records)
        .into_iter()
        .filter(|r| mode.includes(r))
        .collect();
    let sums = totals(kept.iter().copied());

    // a mixed row only feeds the summary through its selected purchase type
    let (cpm_on, cpv_on) = (mode.cpm(), mode.cpv());
    let contracted = PurchaseMode::gated(cpm_on, &sums, Metric::ContractedCpm);
    let delivered = PurchaseMode::gated(cpm_on, &sums, Metric::ValidCpm);
    let clicks = PurchaseMode::gated(cpm_on, &sums, Metric::ClicksCpm)
        + PurchaseMode::gated(cpv_on, &sums, Metric::ClicksCpv);
    let views = PurchaseMode::gated(cpv_on, &sums, Metric::ViewsCpv);
    let completions = PurchaseMode::gated(cpv_on, &sums, Metric::CompletionsCpv);
    let viewability = average_positive(kept.iter().flat_map(|r| {
        [
            if cpm_on { r.metric(Metric::ViewabilityCpm) } else { 0.0 },
            if cpv_on { r.metric(Metric::ViewabilityCpv) } else { 0.0 },
        ]
    }));
    let summary = AdServerSummary {
        contracted,
        delivered,
        pacing: pacing(delivered, contracted, PacingMode::Capped),
        clicks,
        ctr: ctr(clicks, delivered),
        views,
        completions,
        vtr: vtr(completions, views),
        viewability,
    };

    // names sorted first so equal values rank deterministically
    let mut buckets: Vec<_> = aggregate(kept.iter().copied(), vehicle_key, &[])
        .into_values()
        .collect();
    buckets.sort_by(|a, b| a.key.cmp(&b.key));

    let pacing_by_vehicle = top(
        buckets
            .iter()
            .map(|b| VehicleRateRow {
                vehicle: b.name().to_string(),
                value: pacing(b.get(Metric::ValidCpm), b.get(Metric::ContractedCpm), PacingMode::Capped),
            })
            .collect(),
        |r: &VehicleRateRow| r.value,
    );
    let impressions_by_vehicle = top(
        buckets
            .iter()
            .map(|b| VehicleVolumeRow {
                vehicle: b.name().to_string(),
                impressions: b.get(Metric::ValidCpm) + b.get(Metric::ValidCpv),
            })
            .collect(),
        |r: &VehicleVolumeRow| r.impressions,
    );
    let ctr_by_vehicle = top(
        buckets
            .iter()
            .map(|b| VehicleRateRow {
                vehicle: b.name().to_string(),
                value: ctr(
                    b.get(Metric::ClicksCpm) + b.get(Metric::ClicksCpv),
                    b.get(Metric::ValidCpm) + b.get(Metric::ValidCpv),
                ),
            })
            .filter(|r| r.value > 0.0)
            .collect(),
        |r: &VehicleRateRow| r.value,
    );

    AdServerView {
        mode,
        summary,
        pacing_by_vehicle,
        impressions_by_vehicle,
        ctr_by_vehicle,
    }
}
