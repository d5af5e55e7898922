//! Ratios computed from already-summed bases. Every function returns `0`
//! instead of NaN or infinity when its denominator is zero.

use crate::types::{Metric, Metrics};
use serde::Serialize;

fn ratio(numerator: f64, denominator: f64) -> f64 {
    if denominator == 0.0 {
        return 0.0;
    }
    let v = numerator / denominator;
    if v.is_finite() {
        v
    } else {
        0.0
    }
}

/// Click-through rate, in percent.
pub fn ctr(clicks: f64, impressions: f64) -> f64 {
    ratio(clicks, impressions) * 100.0
}

/// Cost per thousand impressions.
pub fn cpm(spend: f64, impressions: f64) -> f64 {
    ratio(spend, impressions / 1000.0)
}

pub fn cpc(spend: f64, clicks: f64) -> f64 {
    ratio(spend, clicks)
}

/// View-through rate, in percent. The base is impressions on social
/// platforms and video views on the ad server.
pub fn vtr(completions: f64, base: f64) -> f64 {
    ratio(completions, base) * 100.0
}

pub fn cost_per_view(spend: f64, views: f64) -> f64 {
    ratio(spend, views)
}

/// Percentage of `total` represented by `part`.
pub fn share(part: f64, total: f64) -> f64 {
    ratio(part, total) * 100.0
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub enum PacingMode {
    /// Media-plan delivery can run over 100%.
    #[default]
    Uncapped,
    /// Ad-server delivery against contracted inventory is clamped to 0..=100.
    Capped,
}

/// Delivered over contracted volume, in percent.
pub fn pacing(delivered: f64, contracted: f64, mode: PacingMode) -> f64 {
    let p = ratio(delivered, contracted) * 100.0;
    match mode {
        PacingMode::Uncapped => p,
        PacingMode::Capped => p.clamp(0.0, 100.0),
    }
}

/// Mean over the strictly positive values only; `0` when there are none.
pub fn average_positive<I: IntoIterator<Item = f64>>(values: I) -> f64 {
    let (sum, n) = values
        .into_iter()
        .filter(|v| *v > 0.0)
        .fold((0.0, 0usize), |(s, n), v| (s + v, n + 1));
    ratio(sum, n as f64)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub enum VtrBase {
    #[default]
    Impressions,
    VideoViews,
}

/// The usual ratio set for one bucket of summed metrics.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
pub struct DerivedMetrics {
    pub ctr: f64,
    pub cpm: f64,
    pub cpc: f64,
    pub vtr: f64,
    pub cost_per_view: f64,
    pub pacing: f64,
}

impl DerivedMetrics {
    pub fn from_metrics(m: &Metrics, base: VtrBase, mode: PacingMode) -> Self {
        let spend = m[Metric::Spend];
        let impressions = m[Metric::Impressions];
        let clicks = m[Metric::Clicks];
        let views = m[Metric::VideoViews];
        let vtr_base = match base {
            VtrBase::Impressions => impressions,
            VtrBase::VideoViews => views,
        };
        Self {
            ctr: ctr(clicks, impressions),
            cpm: cpm(spend, impressions),
            cpc: cpc(spend, clicks),
            vtr: vtr(m[Metric::VideoCompletions], vtr_base),
            cost_per_view: cost_per_view(spend, views),
            pacing: pacing(impressions, m[Metric::Contracted], mode),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_denominators_are_zero() {
        assert_eq!(ctr(5.0, 0.0), 0.0);
        assert_eq!(cpm(100.0, 0.0), 0.0);
        assert_eq!(cpc(100.0, 0.0), 0.0);
        assert_eq!(vtr(3.0, 0.0), 0.0);
        assert_eq!(pacing(10.0, 0.0, PacingMode::Capped), 0.0);
        assert_eq!(share(1.0, 0.0), 0.0);
        assert_eq!(average_positive(vec![0.0, -1.0]), 0.0);
    }

    #[test]
    fn basic_ratios() {
        assert!((ctr(15.0, 1500.0) - 1.0).abs() < 1e-9);
        assert!((cpm(50.0, 10_000.0) - 5.0).abs() < 1e-9);
        assert!((cpc(10.0, 4.0) - 2.5).abs() < 1e-9);
        assert!((vtr(250.0, 1000.0) - 25.0).abs() < 1e-9);
        assert!((share(25.0, 200.0) - 12.5).abs() < 1e-9);
    }

    #[test]
    fn pacing_cap_only_when_asked() {
        assert!((pacing(150.0, 100.0, PacingMode::Uncapped) - 150.0).abs() < 1e-9);
        assert!((pacing(150.0, 100.0, PacingMode::Capped) - 100.0).abs() < 1e-9);
        assert!((pacing(50.0, 100.0, PacingMode::Capped) - 50.0).abs() < 1e-9);
    }

    #[test]
    fn average_ignores_non_positive() {
        assert!((average_positive(vec![70.0, 0.0, 80.0]) - 75.0).abs() < 1e-9);
    }

    #[test]
    fn bundle_uses_chosen_vtr_base() {
        let mut m = Metrics::default();
        m.add(Metric::Impressions, 1000.0);
        m.add(Metric::VideoViews, 200.0);
        m.add(Metric::VideoCompletions, 50.0);
        m.add(Metric::Spend, 20.0);
        let by_impr = DerivedMetrics::from_metrics(&m, VtrBase::Impressions, PacingMode::Uncapped);
        let by_views = DerivedMetrics::from_metrics(&m, VtrBase::VideoViews, PacingMode::Uncapped);
        assert!((by_impr.vtr - 5.0).abs() < 1e-9);
        assert!((by_views.vtr - 25.0).abs() < 1e-9);
        assert!((by_impr.cpm - 20.0).abs() < 1e-9);
        assert!((by_impr.cost_per_view - 0.1).abs() < 1e-9);
        assert_eq!(by_impr.cpc, 0.0);
        assert_eq!(by_impr.pacing, 0.0);
    }
}
