use chrono::NaiveDate;
use painel_midia::aggregate::{aggregate, by_non_empty, sort_buckets};
use painel_midia::datasets;
use painel_midia::derived::ctr;
use painel_midia::normalize::VehicleAliases;
use painel_midia::reports;
use painel_midia::source::fetch_all;
use painel_midia::{
    CsvDirSource, DateRange, Dimension, Filters, MemorySource, Metric, MetricRecord, RawTable,
    SharedDataset, SourceError,
};
use std::sync::Arc;

fn grid(rows: &[&[&str]]) -> RawTable {
    RawTable::from_grid(
        rows.iter()
            .map(|r| r.iter().map(|c| c.to_string()).collect())
            .collect(),
    )
}

fn scenario() -> RawTable {
    grid(&[
        &["Date", "Campanha", "Impressions", "Clicks"],
        &["01/03/2025", "A", "1000", "10"],
        &["01/03/2025", "B", "2000", "0"],
        &["02/03/2025", "A", "500", "5"],
    ])
}

fn assert_scenario_totals(records: &[MetricRecord]) {
    assert_eq!(records.len(), 3);
    let buckets = sort_buckets(
        aggregate(records, by_non_empty(&[Dimension::Campaign]), &[]),
        Metric::Impressions,
    );
    assert_eq!(buckets.len(), 2);

    let b = &buckets[0];
    assert_eq!(b.name(), "B");
    assert_eq!(b.get(Metric::Impressions), 2000.0);
    assert_eq!(b.get(Metric::Clicks), 0.0);
    assert_eq!(ctr(b.get(Metric::Clicks), b.get(Metric::Impressions)), 0.0);

    let a = &buckets[1];
    assert_eq!(a.name(), "A");
    assert_eq!(a.get(Metric::Impressions), 1500.0);
    assert_eq!(a.get(Metric::Clicks), 15.0);
    assert!((ctr(a.get(Metric::Clicks), a.get(Metric::Impressions)) - 1.0).abs() < 1e-9);
}

#[tokio::test]
async fn campaign_totals_from_memory_source() {
    let src = MemorySource::new().with_table("Consolidado", scenario());
    let (records, report) =
        datasets::load(&src, &datasets::consolidated(), &VehicleAliases::standard())
            .await
            .unwrap();
    assert_eq!(report.emitted, 3);
    assert!(report.missing_columns.contains(&"Total spent".to_string()));
    assert_scenario_totals(&records);
}

#[tokio::test]
async fn campaign_totals_from_csv_export() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(
        dir.path().join("Consolidado.csv"),
        "Date,Campanha,Impressions,Clicks\n\
         01/03/2025,A,1000,10\n\
         01/03/2025,B,2000,0\n\
         02/03/2025,A,500,5\n\
         ,,,\n",
    )
    .unwrap();
    let src = CsvDirSource::new(dir.path());
    let (records, report) =
        datasets::load(&src, &datasets::consolidated(), &VehicleAliases::standard())
            .await
            .unwrap();
    assert_eq!(report.total_rows, 4);
    assert_eq!(report.dropped_missing_key, 1);
    assert_scenario_totals(&records);
}

#[tokio::test]
async fn failed_range_fails_the_whole_view() {
    let src = MemorySource::new().with_table("Consolidado", scenario());
    let err = fetch_all(&src, &["Consolidado", "Plano", "AdServer"])
        .await
        .unwrap_err();
    assert!(matches!(err, SourceError::NotFound { ref range } if range == "Plano"));
}

fn social() -> RawTable {
    grid(&[
        &["Date", "Campanha", "Veículo", "Impressions", "Total spent"],
        &["01/03/2025", "X", "Audience Network", "100", "R$ 10,00"],
        &["01/03/2025", "X", "Google", "200", "R$ 20,00"],
        &["02/03/2025", "Z", "messenger", "300", "R$ 30,00"],
        &["03/03/2025", "X", "Threads", "400", "R$ 40,00"],
        &["04/03/2025", "Z", "Google", "", ""],
    ])
}

async fn social_records() -> Vec<MetricRecord> {
    let src = MemorySource::new().with_table("Consolidado", social());
    let (records, report) =
        datasets::load(&src, &datasets::consolidated(), &VehicleAliases::standard())
            .await
            .unwrap();
    assert_eq!(report.dropped_empty_metrics, 1);
    records
}

#[tokio::test]
async fn vehicles_fold_into_meta() {
    let records = social_records().await;
    let vehicles: Vec<&str> = records.iter().map(|r| r.vehicle.as_str()).collect();
    assert_eq!(vehicles, vec!["Meta", "Google", "Meta", "Meta"]);
}

#[tokio::test]
async fn filters_combine_with_and() {
    let records = social_records().await;
    let mut filters = Filters::new()
        .with(Dimension::Campaign, "X")
        .with(Dimension::Vehicle, "Meta");
    assert_eq!(filters.apply(&records).len(), 2);

    filters.set(Dimension::Campaign, "");
    assert_eq!(filters.apply(&records).len(), 3);

    filters.toggle(Dimension::Vehicle, "Meta");
    assert_eq!(filters.apply(&records).len(), 4);
}

#[tokio::test]
async fn date_range_bounds_are_inclusive() {
    let records = social_records().await;
    let range = DateRange::parse("01/03/2025", "02/03/2025").unwrap();
    let kept = Filters::new().with_date_range(range).apply(&records);
    assert_eq!(kept.len(), 3);

    let range = DateRange::parse("2025-03-02", "2025-03-02").unwrap();
    let kept = Filters::new().with_date_range(range).apply(&records);
    assert_eq!(kept.len(), 1);
    assert_eq!(kept[0].campaign, "Z");
}

#[tokio::test]
async fn shared_dataset_feeds_several_views() {
    let src = Arc::new(MemorySource::new().with_table("Consolidado", social()));
    let shared = SharedDataset::new(src, "Consolidado");
    let schema = datasets::consolidated();
    let aliases = VehicleAliases::standard();

    let table = shared.get().await.unwrap();
    let (records, _) = painel_midia::normalize::normalize_table(&table, &schema, &aliases);
    let today = NaiveDate::from_ymd_opt(2025, 3, 4).unwrap();

    let activity = reports::campaign_activity(&records, today, 7);
    assert_eq!(activity[0].campaign, "X");
    assert!(activity[0].is_active);
    assert_eq!(activity[0].spend, 70.0);

    let series = reports::last_days(&records, &Filters::new(), today, 7);
    assert_eq!(series.len(), 3);
    assert_eq!(series[0].impressions, 300.0);

    let again = shared.get().await.unwrap();
    assert!(Arc::ptr_eq(&table, &again));
}

#[tokio::test]
async fn kwai_creatives_from_csv_export() {
    use painel_midia::creatives::{creative_performance, SortOrder, KWAI_KEY};

    let dir = tempfile::tempdir().unwrap();
    std::fs::write(
        dir.path().join("Kwai.csv"),
        "Time,Campaign name,Ad Set Name,Creative name,Cost(BRL),Impression,Click\n\
         2025-03-01,C1,Set A,Clip 1,\"10,50\",1000,10\n\
         2025-03-02,C2,Set A,Clip 1,\"5,00\",500,5\n\
         2025-03-02,C1,Set B,Clip 2,\"1,00\",0,0\n",
    )
    .unwrap();
    let src = CsvDirSource::new(dir.path());
    let (records, report) =
        datasets::load(&src, &datasets::kwai_creatives(), &VehicleAliases::standard())
            .await
            .unwrap();
    assert_eq!(report.emitted, 3);
    assert_eq!(records[0].date, NaiveDate::from_ymd_opt(2025, 3, 1));

    let r = creative_performance(&records, &Filters::new(), &KWAI_KEY, SortOrder::Desc);
    assert_eq!(r.rows.len(), 1);
    assert_eq!(r.rows[0].creative, "Clip 1");
    assert_eq!(r.rows[0].campaign, "C1, C2");
    assert!((r.rows[0].spend - 15.5).abs() < 1e-9);
    assert!((r.rows[0].ctr - 1.0).abs() < 1e-9);
}
