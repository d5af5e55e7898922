//! Group-and-sum over normalized records.
//!
//! Buckets only ever hold sums; ratios are recomputed from those sums by
//! [`crate::derived`] and never averaged across rows.

use crate::types::{Dimension, Metric, MetricRecord, Metrics};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::{BTreeSet, HashMap};
use tracing::{debug, warn};

pub type GroupKey = Vec<String>;

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct AggregateBucket {
    pub key: GroupKey,
    pub metrics: Metrics,
    pub rows: usize,
    /// Distinct non-empty values seen per tracked child dimension.
    pub distinct: HashMap<Dimension, BTreeSet<String>>,
}

impl AggregateBucket {
    pub fn get(&self, metric: Metric) -> f64 {
        self.metrics[metric]
    }

    pub fn distinct_count(&self, dimension: Dimension) -> usize {
        self.distinct.get(&dimension).map_or(0, BTreeSet::len)
    }

    /// First component of the key; the whole key for single-dimension groups.
    pub fn name(&self) -> &str {
        self.key.first().map(String::as_str).unwrap_or("")
    }
}

/// Key function over the given dimensions, in order. Every record gets a key,
/// even when some components are empty.
pub fn by(dimensions: &[Dimension]) -> impl Fn(&MetricRecord) -> Option<GroupKey> + '_ {
    move |r| Some(dimensions.iter().map(|d| r.key_part(*d)).collect())
}

/// Like [`by`], but records with any empty component are left out.
pub fn by_non_empty(dimensions: &[Dimension]) -> impl Fn(&MetricRecord) -> Option<GroupKey> + '_ {
    move |r| {
        let key: GroupKey = dimensions.iter().map(|d| r.key_part(*d)).collect();
        if key.iter().any(|k| k.trim().is_empty()) {
            None
        } else {
            Some(key)
        }
    }
}

/// Sum every metric per key. Records for which `key_fn` returns `None` are
/// skipped. `distinct` lists the child dimensions whose distinct values
/// should be collected per bucket.
pub fn aggregate<'a, I, F>(
    records: I,
    key_fn: F,
    distinct: &[Dimension],
) -> HashMap<GroupKey, AggregateBucket>
where
    I: IntoIterator<Item = &'a MetricRecord>,
    F: Fn(&MetricRecord) -> Option<GroupKey>,
{
    let mut map: HashMap<GroupKey, AggregateBucket> = HashMap::new();
    for r in records {
        let Some(key) = key_fn(r) else { continue };
        let bucket = map.entry(key.clone()).or_insert_with(|| AggregateBucket {
            key,
            ..Default::default()
        });
        bucket.metrics += &r.metrics;
        bucket.rows += 1;
        for &d in distinct {
            let value = r.key_part(d);
            if !value.trim().is_empty() {
                bucket.distinct.entry(d).or_default().insert(value);
            }
        }
    }
    debug!(buckets = map.len(), "aggregated records");
    map
}

/// Buckets ordered by `metric` descending; ties fall back to key order so
/// the output is deterministic.
pub fn sort_buckets(map: HashMap<GroupKey, AggregateBucket>, metric: Metric) -> Vec<AggregateBucket> {
    let mut v: Vec<AggregateBucket> = map.into_values().collect();
    v.sort_by(|a, b| {
        b.get(metric)
            .partial_cmp(&a.get(metric))
            .unwrap_or(Ordering::Equal)
            .then_with(|| a.key.cmp(&b.key))
    });
    v
}

pub fn totals<'a, I>(records: I) -> Metrics
where
    I: IntoIterator<Item = &'a MetricRecord>,
{
    let mut m = Metrics::default();
    for r in records {
        m += &r.metrics;
    }
    m
}

fn default_metric() -> Metric {
    Metric::Spend
}

/// A signed manual adjustment for a named campaign, applied after
/// aggregation to offset a known upstream data-entry error.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CampaignCorrection {
    /// Exact campaign name.
    pub campaign: String,
    #[serde(default = "default_metric")]
    pub metric: Metric,
    pub delta: f64,
    /// Owning agency. When absent, the single agency seen under the
    /// campaign is used.
    #[serde(default)]
    pub agency: Option<String>,
    #[serde(default)]
    pub note: String,
}

/// Apply `corrections` to buckets keyed by campaign and, through the owning
/// agency, to buckets keyed by agency. `campaigns` must have been built with
/// [`Dimension::Agency`] in its distinct list for the agency to be inferred.
/// Returns the net delta applied per metric.
pub fn apply_corrections(
    campaigns: &mut HashMap<GroupKey, AggregateBucket>,
    mut agencies: Option<&mut HashMap<GroupKey, AggregateBucket>>,
    corrections: &[CampaignCorrection],
) -> Metrics {
    let mut applied = Metrics::default();
    for c in corrections {
        let key = vec![c.campaign.clone()];
        let Some(bucket) = campaigns.get_mut(&key) else {
            debug!(campaign = %c.campaign, "correction target not in view, skipped");
            continue;
        };
        bucket.metrics.add(c.metric, c.delta);
        applied.add(c.metric, c.delta);

        let owner = c.agency.clone().or_else(|| {
            let seen = bucket.distinct.get(&Dimension::Agency)?;
            if seen.len() == 1 {
                seen.iter().next().cloned()
            } else {
                None
            }
        });
        if let Some(agencies) = agencies.as_deref_mut() {
            let target = match owner {
                Some(a) => agencies.get_mut(&vec![a]),
                None => None,
            };
            match target {
                Some(agency) => agency.metrics.add(c.metric, c.delta),
                None => warn!(
                    campaign = %c.campaign,
                    "no owning agency bucket for correction"
                ),
            }
        }
    }
    applied
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Metric::{Clicks, Impressions, Spend};
    use chrono::NaiveDate;

    fn rec(campaign: &str, agency: &str, vehicle: &str, impressions: f64, spend: f64) -> MetricRecord {
        let mut metrics = Metrics::default();
        metrics.add(Impressions, impressions);
        metrics.add(Spend, spend);
        MetricRecord {
            date: NaiveDate::from_ymd_opt(2025, 3, 1),
            campaign: campaign.into(),
            agency: agency.into(),
            vehicle: vehicle.into(),
            metrics,
            ..Default::default()
        }
    }

    fn sample() -> Vec<MetricRecord> {
        vec![
            rec("A", "Ag1", "Meta", 100.0, 10.0),
            rec("A", "Ag1", "Google", 50.0, 5.0),
            rec("B", "Ag2", "Meta", 300.0, 1.0),
            rec("", "Ag2", "Meta", 7.0, 0.5),
        ]
    }

    #[test]
    fn sums_and_distinct_counts() {
        let records = sample();
        let map = aggregate(&records, by(&[Dimension::Campaign]), &[Dimension::Vehicle]);
        let a = &map[&vec!["A".to_string()]];
        assert_eq!(a.get(Impressions), 150.0);
        assert_eq!(a.rows, 2);
        assert_eq!(a.distinct_count(Dimension::Vehicle), 2);
        assert!(map.contains_key(&vec![String::new()]));
    }

    #[test]
    fn non_empty_keys_skip_blank_dimensions() {
        let records = sample();
        let map = aggregate(&records, by_non_empty(&[Dimension::Campaign]), &[]);
        assert_eq!(map.len(), 2);
    }

    #[test]
    fn composite_keys() {
        let records = sample();
        let map = aggregate(
            &records,
            by(&[Dimension::Campaign, Dimension::Vehicle]),
            &[],
        );
        assert_eq!(map.len(), 4);
        assert_eq!(map[&vec!["A".to_string(), "Google".to_string()]].get(Spend), 5.0);
    }

    #[test]
    fn additive_over_partitions() {
        let records = sample();
        let (left, right) = records.split_at(2);
        let whole = aggregate(&records, by(&[Dimension::Agency]), &[]);
        let a = aggregate(left, by(&[Dimension::Agency]), &[]);
        let b = aggregate(right, by(&[Dimension::Agency]), &[]);
        for (key, bucket) in &whole {
            for metric in [Impressions, Spend, Clicks] {
                let parts = a.get(key).map_or(0.0, |x| x.get(metric))
                    + b.get(key).map_or(0.0, |x| x.get(metric));
                assert!((bucket.get(metric) - parts).abs() < 1e-9);
            }
        }
        assert_eq!(totals(&records)[Impressions], 457.0);
    }

    #[test]
    fn idempotent() {
        let records = sample();
        let first = aggregate(&records, by(&[Dimension::Campaign]), &[Dimension::Vehicle]);
        let second = aggregate(&records, by(&[Dimension::Campaign]), &[Dimension::Vehicle]);
        assert_eq!(first, second);
    }

    #[test]
    fn sorted_by_metric_descending() {
        let records = sample();
        let sorted = sort_buckets(
            aggregate(&records, by_non_empty(&[Dimension::Campaign]), &[]),
            Spend,
        );
        let names: Vec<&str> = sorted.iter().map(|b| b.name()).collect();
        assert_eq!(names, vec!["A", "B"]);
    }

    #[test]
    fn corrections_reach_owning_agency() {
        let records = sample();
        let mut campaigns = aggregate(&records, by_non_empty(&[Dimension::Campaign]), &[Dimension::Agency]);
        let mut agencies = aggregate(&records, by_non_empty(&[Dimension::Agency]), &[]);
        let corrections = vec![
            CampaignCorrection {
                campaign: "A".into(),
                metric: Spend,
                delta: -3.0,
                agency: None,
                note: String::new(),
            },
            CampaignCorrection {
                campaign: "Missing".into(),
                metric: Spend,
                delta: 99.0,
                agency: None,
                note: String::new(),
            },
        ];
        let applied = apply_corrections(&mut campaigns, Some(&mut agencies), &corrections);
        assert_eq!(applied[Spend], -3.0);
        assert_eq!(campaigns[&vec!["A".to_string()]].get(Spend), 12.0);
        assert_eq!(agencies[&vec!["Ag1".to_string()]].get(Spend), 12.0);
        assert_eq!(agencies[&vec!["Ag2".to_string()]].get(Spend), 1.5);
    }

    #[test]
    fn correction_metric_defaults_to_spend() {
        let c: CampaignCorrection =
            serde_json::from_str(r#"{"campaign": "A", "delta": 10.5}"#).unwrap();
        assert_eq!(c.metric, Spend);
        assert_eq!(c.agency, None);
    }
}
