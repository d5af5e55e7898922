//! Creative performance for the platform exports (Google Ads, Kwai).
//!
//! Rows without delivery are dropped, the rest are summed per creative key
//! and every ratio is recomputed from the sums.

use crate::aggregate::{aggregate, by, totals, AggregateBucket};
use crate::derived::{cpc, cpm, ctr, vtr};
use crate::filter::{distinct_values, Filters};
use crate::types::{CreativeRow, Dimension, Metric, MetricRecord};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

/// Google Ads creatives are keyed by ad, campaign and ad group.
pub const GOOGLE_ADS_KEY: [Dimension; 3] = [Dimension::Creative, Dimension::Campaign, Dimension::AdGroup];
/// Kwai creatives are keyed by creative and ad set only.
pub const KWAI_KEY: [Dimension; 2] = [Dimension::Creative, Dimension::AdGroup];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortOrder {
    #[default]
    Desc,
    Asc,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct CreativeTotals {
    pub spend: f64,
    pub impressions: f64,
    pub clicks: f64,
    pub video_views: f64,
    pub completions: f64,
    pub engagements: f64,
    pub cpm: f64,
    pub cpc: f64,
    pub ctr: f64,
    pub vtr: f64,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct CreativeReport {
    pub rows: Vec<CreativeRow>,
    pub totals: CreativeTotals,
    /// Campaign options from every delivering row, before filters.
    pub campaigns: Vec<String>,
}

fn delivered(r: &MetricRecord) -> bool {
    r.metric(Metric::Impressions) > 0.0
}

/// Value of `d` for a bucket: its key component when `d` is part of the
/// key, else the distinct values seen joined with `", "`.
fn label(b: &AggregateBucket, key: &[Dimension], d: Dimension) -> String {
    match key.iter().position(|k| *k == d) {
        Some(i) => b.key.get(i).cloned().unwrap_or_default(),
        None => b
            .distinct
            .get(&d)
            .map(|s| s.iter().cloned().collect::<Vec<_>>().join(", "))
            .unwrap_or_default(),
    }
}

/// Creative ranking by spend. `key` picks the grouping dimensions, e.g.
/// [`GOOGLE_ADS_KEY`] or [`KWAI_KEY`].
pub fn creative_performance(
    records: &[MetricRecord],
    filters: &Filters,
    key: &[Dimension],
    order: SortOrder,
) -> CreativeReport {
    let campaigns = distinct_values(records.iter().filter(|r| delivered(r)), Dimension::Campaign);
    let kept: Vec<&MetricRecord> = filters
        .apply(records)
        .into_iter()
        .filter(|r| delivered(r))
        .collect();

    let tracked = [
        Dimension::Creative,
        Dimension::Campaign,
        Dimension::AdGroup,
        Dimension::PurchaseType,
    ];
    let mut buckets: Vec<AggregateBucket> = aggregate(kept.iter().copied(), by(key), &tracked)
        .into_values()
        .collect();
    buckets.sort_by(|a, b| {
        let (x, y) = (a.get(Metric::Spend), b.get(Metric::Spend));
        let by_spend = match order {
            SortOrder::Desc => y.partial_cmp(&x),
            SortOrder::Asc => x.partial_cmp(&y),
        };
        by_spend.unwrap_or(Ordering::Equal).then_with(|| a.key.cmp(&b.key))
    });

    let rows = buckets
        .iter()
        .map(|b| {
            let impressions = b.get(Metric::Impressions);
            let clicks = b.get(Metric::Clicks);
            let spend = b.get(Metric::Spend);
            let completions = b.get(Metric::VideoCompletions);
            CreativeRow {
                creative: label(b, key, Dimension::Creative),
                campaign: label(b, key, Dimension::Campaign),
                ad_group: label(b, key, Dimension::AdGroup),
                purchase_type: label(b, key, Dimension::PurchaseType),
                spend,
                impressions,
                clicks,
                video_views: b.get(Metric::VideoViews),
                completions,
                engagements: b.get(Metric::Engagements),
                ctr: ctr(clicks, impressions),
                cpc: cpc(spend, clicks),
                cpm: cpm(spend, impressions),
                vtr: vtr(completions, impressions),
            }
        })
        .collect();

    let sums = totals(kept.iter().copied());
    let totals = CreativeTotals {
        spend: sums[Metric::Spend],
        impressions: sums[Metric::Impressions],
        clicks: sums[Metric::Clicks],
        video_views: sums[Metric::VideoViews],
        completions: sums[Metric::VideoCompletions],
        engagements: sums[Metric::Engagements],
        cpm: cpm(sums[Metric::Spend], sums[Metric::Impressions]),
        cpc: cpc(sums[Metric::Spend], sums[Metric::Clicks]),
        ctr: ctr(sums[Metric::Clicks], sums[Metric::Impressions]),
        vtr: vtr(sums[Metric::VideoCompletions], sums[Metric::Impressions]),
    };

    CreativeReport {
        rows,
        totals,
        campaigns,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::filter::DateRange;
    use crate::types::Metrics;
    use chrono::NaiveDate;

    fn ad(day: u32, creative: &str, campaign: &str, group: &str, values: &[(Metric, f64)]) -> MetricRecord {
        let mut metrics = Metrics::default();
        for (m, v) in values {
            metrics.add(*m, *v);
        }
        MetricRecord {
            date: NaiveDate::from_ymd_opt(2025, 3, day),
            creative: creative.into(),
            campaign: campaign.into(),
            ad_group: group.into(),
            metrics,
            ..Default::default()
        }
    }

    fn sample() -> Vec<MetricRecord> {
        use Metric::*;
        vec![
            ad(1, "Banner A", "Verão", "G1", &[(Impressions, 1000.0), (Clicks, 10.0), (Spend, 50.0), (VideoCompletions, 100.0)]),
            ad(2, "Banner A", "Verão", "G1", &[(Impressions, 1000.0), (Clicks, 30.0), (Spend, 30.0), (VideoCompletions, 300.0)]),
            ad(2, "Banner A", "Verão", "G2", &[(Impressions, 500.0), (Clicks, 5.0), (Spend, 100.0)]),
            ad(3, "Vídeo B", "Inverno", "G1", &[(Impressions, 200.0), (Clicks, 2.0), (Spend, 20.0)]),
            ad(3, "Vídeo C", "Outono", "G1", &[(Impressions, 0.0), (Spend, 999.0)]),
        ]
    }

    #[test]
    fn groups_by_creative_campaign_and_ad_group() {
        let r = creative_performance(&sample(), &Filters::new(), &GOOGLE_ADS_KEY, SortOrder::Desc);
        assert_eq!(r.rows.len(), 3);
        assert_eq!(r.rows[0].ad_group, "G2");
        assert_eq!(r.rows[0].spend, 100.0);

        let a = &r.rows[1];
        assert_eq!((a.creative.as_str(), a.ad_group.as_str()), ("Banner A", "G1"));
        assert_eq!(a.impressions, 2000.0);
        assert!((a.ctr - 2.0).abs() < 1e-9);
        assert!((a.cpc - 2.0).abs() < 1e-9);
        assert!((a.cpm - 40.0).abs() < 1e-9);
        assert!((a.vtr - 20.0).abs() < 1e-9);
    }

    #[test]
    fn undelivered_rows_are_left_out() {
        let r = creative_performance(&sample(), &Filters::new(), &GOOGLE_ADS_KEY, SortOrder::Desc);
        assert!(r.rows.iter().all(|row| row.creative != "Vídeo C"));
        assert_eq!(r.totals.spend, 200.0);
        assert_eq!(r.totals.impressions, 2700.0);
        assert!((r.totals.ctr - 47.0 / 2700.0 * 100.0).abs() < 1e-9);
        assert_eq!(r.campaigns, vec!["Inverno", "Verão"]);
    }

    #[test]
    fn ascending_order_and_filters() {
        let r = creative_performance(&sample(), &Filters::new(), &GOOGLE_ADS_KEY, SortOrder::Asc);
        assert_eq!(r.rows[0].creative, "Vídeo B");

        let filters = Filters::new()
            .with(Dimension::Campaign, "Verão")
            .with_date_range(DateRange::new(
                NaiveDate::from_ymd_opt(2025, 3, 2).unwrap(),
                NaiveDate::from_ymd_opt(2025, 3, 2).unwrap(),
            ));
        let r = creative_performance(&sample(), &filters, &GOOGLE_ADS_KEY, SortOrder::Desc);
        assert_eq!(r.rows.len(), 2);
        assert_eq!(r.totals.spend, 130.0);
        assert_eq!(r.campaigns.len(), 2);
    }

    #[test]
    fn kwai_key_joins_campaigns() {
        let mut records = sample();
        records[1].campaign = "Primavera".into();
        let r = creative_performance(&records, &Filters::new(), &KWAI_KEY, SortOrder::Desc);
        let a = r
            .rows
            .iter()
            .find(|row| row.creative == "Banner A" && row.ad_group == "G1")
            .unwrap();
        assert_eq!(a.campaign, "Primavera, Verão");
        assert_eq!(a.spend, 80.0);
    }
}
