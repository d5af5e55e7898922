use crate::aggregate::{
    aggregate, apply_corrections, by_non_empty, sort_buckets, totals, AggregateBucket,
    CampaignCorrection,
};
use crate::derived::{cpm, ctr, pacing, share, vtr, PacingMode};
use crate::filter::{distinct_values, DateRange, Filters};
use crate::types::{
    CampaignActivityRow, DailyMetricsRow, Dimension, Metric, MetricRecord, OfflineLineRow,
    PlanLineRow, VehicleLineRow, WeeklyVehicleRow,
};
use chrono::{Datelike, Days, NaiveDate};
use serde::Serialize;
use std::cmp::Ordering;
use std::collections::{BTreeMap, HashMap};

/// `days` days before `reference`, saturating at the earliest representable date.
fn days_before(reference: NaiveDate, days: u64) -> NaiveDate {
    reference
        .checked_sub_days(Days::new(days))
        .unwrap_or(NaiveDate::MIN)
}

/// Per-campaign totals with an activity flag.
///
/// A campaign is active when some row dated inside the window
/// `[reference - window_days, reference]` has both spend and impressions.
/// `last_activity` is the latest row date inside that window. Campaigns
/// come back most recently active first; those with no activity in the
/// window go last, by spend. A negative window marks nothing active.
pub fn campaign_activity(
    records: &[MetricRecord],
    reference: NaiveDate,
    window_days: i64,
) -> Vec<CampaignActivityRow> {
    let window = u64::try_from(window_days)
        .ok()
        .map(|n| DateRange::new(days_before(reference, n), reference));
    let buckets = aggregate(records, by_non_empty(&[Dimension::Campaign]), &[]);

    let mut activity: HashMap<&str, (bool, Option<NaiveDate>)> = HashMap::new();
    for r in records {
        let Some(date) = r.date.filter(|d| window.is_some_and(|w| w.contains(*d))) else {
            continue;
        };
        let e = activity.entry(r.campaign.as_str()).or_insert((false, None));
        if r.metric(Metric::Spend) > 0.0 && r.metric(Metric::Impressions) > 0.0 {
            e.0 = true;
        }
        if e.1.map_or(true, |last| date > last) {
            e.1 = Some(date);
        }
    }

    let mut rows: Vec<CampaignActivityRow> = sort_buckets(buckets, Metric::Spend)
        .into_iter()
        .map(|b| {
            let (is_active, last_activity) =
                activity.get(b.name()).copied().unwrap_or((false, None));
            let impressions = b.get(Metric::Impressions);
            CampaignActivityRow {
                campaign: b.name().to_string(),
                is_active,
                last_activity,
                spend: b.get(Metric::Spend),
                impressions,
                clicks: b.get(Metric::Clicks),
                video_views: b.get(Metric::VideoViews),
                engagements: b.get(Metric::Engagements),
                reach: b.get(Metric::Reach),
                ctr: ctr(b.get(Metric::Clicks), impressions),
                cpm: cpm(b.get(Metric::Spend), impressions),
            }
        })
        .collect();

    // stable sort keeps the spend order among equal dates
    rows.sort_by(|a, b| match (a.last_activity, b.last_activity) {
        (Some(x), Some(y)) => y.cmp(&x),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    });
    rows
}

/// Daily sums for the `days` days ending the day before `reference`
/// (today's partial data is left out), oldest first. `filters` narrows the
/// series, e.g. to one selected campaign; any date range in it is replaced.
/// A non-positive `days` gives an empty series.
pub fn last_days(
    records: &[MetricRecord],
    filters: &Filters,
    reference: NaiveDate,
    days: i64,
) -> Vec<DailyMetricsRow> {
    let Some(span) = days.checked_sub(1).and_then(|n| u64::try_from(n).ok()) else {
        return Vec::new();
    };
    let end = days_before(reference, 1);
    let start = days_before(end, span);
    let filters = filters
        .clone()
        .with_date_range(DateRange::new(start, end));
    let kept = filters.apply(records);

    let mut rows: Vec<DailyMetricsRow> = aggregate(kept, by_non_empty(&[Dimension::Date]), &[])
        .into_values()
        .filter_map(|b| {
            let date = NaiveDate::parse_from_str(b.name(), "%Y-%m-%d").ok()?;
            Some(DailyMetricsRow {
                date,
                impressions: b.get(Metric::Impressions),
                clicks: b.get(Metric::Clicks),
                video_views: b.get(Metric::VideoViews),
                spend: b.get(Metric::Spend),
            })
        })
        .collect();
    rows.sort_by_key(|r| r.date);
    rows
}

/// Monday of the week containing `date`.
pub fn week_start(date: NaiveDate) -> NaiveDate {
    let offset = u64::from(date.weekday().num_days_from_monday());
    date.checked_sub_days(Days::new(offset)).unwrap_or(date)
}

/// Weekly sums per vehicle, oldest week first and by spend within a week.
/// Undated rows and rows without a vehicle are left out.
pub fn weekly_by_vehicle(records: &[MetricRecord], filters: &Filters) -> Vec<WeeklyVehicleRow> {
    let key = |r: &MetricRecord| {
        let week = week_start(r.date?);
        let vehicle = r.vehicle.trim();
        (!vehicle.is_empty()).then(|| vec![week.format("%Y-%m-%d").to_string(), vehicle.to_string()])
    };
    let mut rows: Vec<WeeklyVehicleRow> = sort_buckets(aggregate(filters.apply(records), key, &[]), Metric::Spend)
        .into_iter()
        .filter_map(|b| {
            let week_start = NaiveDate::parse_from_str(b.name(), "%Y-%m-%d").ok()?;
            let impressions = b.get(Metric::Impressions);
            Some(WeeklyVehicleRow {
                week_start,
                vehicle: b.key.get(1).cloned().unwrap_or_default(),
                spend: b.get(Metric::Spend),
                impressions,
                clicks: b.get(Metric::Clicks),
                video_views: b.get(Metric::VideoViews),
                ctr: ctr(b.get(Metric::Clicks), impressions),
                cpm: cpm(b.get(Metric::Spend), impressions),
            })
        })
        .collect();
    // stable: spend order survives within a week
    rows.sort_by_key(|r| r.week_start);
    rows
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct SeriesSummary {
    pub spend: f64,
    pub impressions: f64,
    pub clicks: f64,
    pub video_views: f64,
    pub cpm: f64,
    pub ctr: f64,
    pub vtr: f64,
}

/// Totals over a daily series with ratios recomputed from the sums.
pub fn summarize_series(rows: &[DailyMetricsRow]) -> SeriesSummary {
    let mut s = SeriesSummary::default();
    for r in rows {
        s.spend += r.spend;
        s.impressions += r.impressions;
        s.clicks += r.clicks;
        s.video_views += r.video_views;
    }
    s.cpm = cpm(s.spend, s.impressions);
    s.ctr = ctr(s.clicks, s.impressions);
    s.vtr = vtr(s.video_views, s.impressions);
    s
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct PlanOverview {
    pub total_investment: f64,
    pub planned_delivery: f64,
    pub total_vehicles: usize,
    pub agencies: Vec<PlanLineRow>,
    pub campaigns: Vec<PlanLineRow>,
    pub media: Vec<PlanLineRow>,
}

impl PlanOverview {
    /// Actual delivery against the plan. Not capped: a plan can over-deliver.
    pub fn pacing(&self, delivered: f64) -> f64 {
        pacing(delivered, self.planned_delivery, PacingMode::Uncapped)
    }
}

/// Media-plan summary by agency, campaign and medium, each sorted by
/// investment. Corrections are applied to the campaign lines, their owning
/// agency lines and the total.
pub fn plan_overview(
    records: &[MetricRecord],
    filters: &Filters,
    corrections: &[CampaignCorrection],
) -> PlanOverview {
    let kept = filters.apply(records);
    let sums = totals(kept.iter().copied());

    let mut agencies = aggregate(
        kept.iter().copied(),
        by_non_empty(&[Dimension::Agency]),
        &[Dimension::Campaign],
    );
    let mut campaigns = aggregate(
        kept.iter().copied(),
        by_non_empty(&[Dimension::Campaign]),
        &[Dimension::Medium, Dimension::Vehicle, Dimension::Agency],
    );
    let media = aggregate(
        kept.iter().copied(),
        by_non_empty(&[Dimension::Medium]),
        &[Dimension::Vehicle],
    );
    let applied = apply_corrections(&mut campaigns, Some(&mut agencies), corrections);

    let total_investment = sums[Metric::Spend] + applied[Metric::Spend];
    let line = |b: &AggregateBucket| PlanLineRow {
        name: b.name().to_string(),
        investment: b.get(Metric::Spend),
        delivery: b.get(Metric::Contracted),
        share: share(b.get(Metric::Spend), total_investment),
        campaigns: b.distinct_count(Dimension::Campaign),
        media: b.distinct_count(Dimension::Medium),
        vehicles: b.distinct_count(Dimension::Vehicle),
    };

    let total_vehicles = distinct_values(
        kept.iter()
            .copied()
            .filter(|r| !r.medium.trim().is_empty()),
        Dimension::Vehicle,
    )
    .len();

    PlanOverview {
        total_investment,
        planned_delivery: sums[Metric::Contracted],
        total_vehicles,
        agencies: sort_buckets(agencies, Metric::Spend).iter().map(&line).collect(),
        campaigns: sort_buckets(campaigns, Metric::Spend).iter().map(&line).collect(),
        media: sort_buckets(media, Metric::Spend).iter().map(&line).collect(),
    }
}

/// Every vehicle under each medium, media in name order and vehicles by
/// investment. Unfiltered, so the full list stays available for drill-down.
pub fn vehicles_by_medium(records: &[MetricRecord]) -> Vec<VehicleLineRow> {
    let mut rows: Vec<VehicleLineRow> = sort_buckets(
        aggregate(
            records,
            by_non_empty(&[Dimension::Medium, Dimension::Vehicle]),
            &[],
        ),
        Metric::Spend,
    )
    .into_iter()
    .map(|b| VehicleLineRow {
        medium: b.key[0].clone(),
        vehicle: b.key[1].clone(),
        investment: b.get(Metric::Spend),
        delivery: b.get(Metric::Contracted),
    })
    .collect();
    // stable: keeps the investment order inside each medium
    rows.sort_by(|a, b| a.medium.cmp(&b.medium));
    rows
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub enum MarketCategory {
    /// Nationwide, international, local or regional reach.
    Coverage,
    /// Several states or cities in one market.
    Regions,
    States,
    Cities,
}

const COVERAGE: [&str; 5] = ["NACIONAL", "INTERNACIONAL", "LOCAL", "REGIONAL", "REGIÃO NORTE"];

const STATES: [&str; 27] = [
    "AC", "AL", "AM", "AP", "BA", "CE", "DF", "ES", "GO", "MA", "MG", "MS", "MT", "PA", "PB", "PE",
    "PI", "PR", "RJ", "RN", "RO", "RR", "RS", "SC", "SE", "SP", "TO",
];

pub fn categorize_market(market: &str) -> MarketCategory {
    let upper = market.trim().to_uppercase();
    if COVERAGE.contains(&upper.as_str()) {
        MarketCategory::Coverage
    } else if STATES.contains(&upper.as_str()) {
        MarketCategory::States
    } else if upper.contains(',') || upper.contains(" E ") {
        MarketCategory::Regions
    } else {
        MarketCategory::Cities
    }
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct OfflineMarket {
    pub name: String,
    pub category: Option<MarketCategory>,
    pub insertions: f64,
    pub investment: f64,
    pub vehicles: Vec<OfflineLineRow>,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct OfflineMedium {
    pub name: String,
    pub insertions: f64,
    pub investment: f64,
    pub markets: Vec<OfflineMarket>,
}

/// Filter choices, taken from all rows before any filter is applied.
#[derive(Debug, Clone, Default, Serialize)]
pub struct OfflineOptions {
    pub campaigns: Vec<String>,
    pub agencies: Vec<String>,
    pub markets: Vec<String>,
    pub markets_by_category: BTreeMap<MarketCategory, Vec<String>>,
    pub vehicles: Vec<String>,
    pub purchase_types: Vec<String>,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct OfflineBreakdown {
    pub media: Vec<OfflineMedium>,
    pub campaigns: usize,
    pub vehicles: usize,
    pub insertions: f64,
    pub investment: f64,
    pub options: OfflineOptions,
}

impl OfflineBreakdown {
    pub fn lines(&self) -> Vec<OfflineLineRow> {
        self.media
            .iter()
            .flat_map(|m| m.markets.iter())
            .flat_map(|p| p.vehicles.iter().cloned())
            .collect()
    }
}

/// Offline media as a medium -> market -> vehicle tree of insertions and
/// investment. Expects records normalized with the offline schema.
pub fn offline_breakdown(records: &[MetricRecord], filters: &Filters) -> OfflineBreakdown {
    let markets = distinct_values(records, Dimension::Market);
    let mut markets_by_category: BTreeMap<MarketCategory, Vec<String>> = BTreeMap::new();
    for m in &markets {
        markets_by_category
            .entry(categorize_market(m))
            .or_default()
            .push(m.clone());
    }
    let options = OfflineOptions {
        campaigns: distinct_values(records, Dimension::Campaign),
        agencies: distinct_values(records, Dimension::Agency),
        markets,
        markets_by_category,
        vehicles: distinct_values(records, Dimension::Vehicle),
        purchase_types: distinct_values(records, Dimension::PurchaseType),
    };

    let kept = filters.apply(records);
    let sums = totals(kept.iter().copied());
    let leaves = sort_buckets(
        aggregate(
            kept.iter().copied(),
            by_non_empty(&[Dimension::Medium, Dimension::Market, Dimension::Vehicle]),
            &[Dimension::Campaign, Dimension::PurchaseType],
        ),
        Metric::Spend,
    );
    // market may be blank on a plan line; keep those under an empty name
    let unplaced = sort_buckets(
        aggregate(
            kept.iter().copied().filter(|r| r.market.trim().is_empty()),
            by_non_empty(&[Dimension::Medium, Dimension::Vehicle]),
            &[Dimension::Campaign, Dimension::PurchaseType],
        ),
        Metric::Spend,
    );

    let mut tree: BTreeMap<String, BTreeMap<String, Vec<OfflineLineRow>>> = BTreeMap::new();
    let joined = |b: &AggregateBucket, d: Dimension| {
        b.distinct
            .get(&d)
            .map(|s| s.iter().cloned().collect::<Vec<_>>().join(", "))
            .unwrap_or_default()
    };
    for b in &leaves {
        let (medium, market, vehicle) = (&b.key[0], &b.key[1], &b.key[2]);
        tree.entry(medium.clone()).or_default().entry(market.clone()).or_default().push(
            OfflineLineRow {
                medium: medium.clone(),
                market: market.clone(),
                vehicle: vehicle.clone(),
                campaign: joined(b, Dimension::Campaign),
                purchase_type: joined(b, Dimension::PurchaseType),
                insertions: b.get(Metric::Contracted),
                investment: b.get(Metric::Spend),
            },
        );
    }
    for b in &unplaced {
        let (medium, vehicle) = (&b.key[0], &b.key[1]);
        tree.entry(medium.clone()).or_default().entry(String::new()).or_default().push(
            OfflineLineRow {
                medium: medium.clone(),
                market: String::new(),
                vehicle: vehicle.clone(),
                campaign: joined(b, Dimension::Campaign),
                purchase_type: joined(b, Dimension::PurchaseType),
                insertions: b.get(Metric::Contracted),
                investment: b.get(Metric::Spend),
            },
        );
    }

    let by_investment = |a: f64, b: f64| b.partial_cmp(&a).unwrap_or(Ordering::Equal);
    let mut media: Vec<OfflineMedium> = tree
        .into_iter()
        .map(|(name, markets)| {
            let mut markets: Vec<OfflineMarket> = markets
                .into_iter()
                .map(|(market, vehicles)| OfflineMarket {
                    category: (!market.is_empty()).then(|| categorize_market(&market)),
                    insertions: vehicles.iter().map(|v| v.insertions).sum(),
                    investment: vehicles.iter().map(|v| v.investment).sum(),
                    name: market,
                    vehicles,
                })
                .collect();
            markets.sort_by(|a, b| by_investment(a.investment, b.investment));
            OfflineMedium {
                insertions: markets.iter().map(|m| m.insertions).sum(),
                investment: markets.iter().map(|m| m.investment).sum(),
                name,
                markets,
            }
        })
        .collect();
    media.sort_by(|a, b| by_investment(a.investment, b.investment));

    OfflineBreakdown {
        media,
        campaigns: distinct_values(kept.iter().copied(), Dimension::Campaign).len(),
        vehicles: distinct_values(kept.iter().copied(), Dimension::Vehicle).len(),
        insertions: sums[Metric::Contracted],
        investment: sums[Metric::Spend],
        options,
    }
}
