// Command-line front-end.
//
// Each subcommand loads one sheet through the configured source (HTTP or a
// directory of CSV exports), normalizes it and prints one dashboard view as
// markdown tables. `--export <dir>` also writes the view to CSV/JSON files.
use anyhow::{anyhow, Context};
use chrono::{Local, NaiveDate};
use clap::{Args, Parser, Subcommand, ValueEnum};
use painel_midia::adserver::{ad_server_view, PurchaseMode};
use painel_midia::config::MAX_WINDOW_DAYS;
use painel_midia::creatives::{self, SortOrder};
use painel_midia::datasets;
use painel_midia::normalize::{LoadReport, VehicleAliases};
use painel_midia::output;
use painel_midia::reports;
use painel_midia::util::{format_brl, format_int, format_percent};
use painel_midia::{
    AppConfig, CsvDirSource, DateRange, Dimension, Filters, MetricRecord, SheetClient,
    SourceError, TableSource,
};
use serde::Serialize;
use std::path::{Path, PathBuf};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "painel-midia", version, about = "Campaign media dashboard reports")]
struct Cli {
    /// TOML configuration file (default: ./painel.toml when present)
    #[arg(long, env = "PAINEL_CONFIG")]
    config: Option<PathBuf>,

    /// Base URL of the sheets service
    #[arg(long, env = "PAINEL__SHEETS__BASE_URL")]
    base_url: Option<String>,

    /// Read `<range>.csv` exports from this directory instead of HTTP
    #[arg(long)]
    data_dir: Option<PathBuf>,

    /// Log as JSON lines
    #[arg(long)]
    json: bool,

    /// Write the view to CSV/JSON files in this directory
    #[arg(long)]
    export: Option<PathBuf>,

    /// Rows shown per table
    #[arg(long, default_value_t = 15)]
    rows: usize,

    #[command(subcommand)]
    command: Command,
}

#[derive(Args, Debug, Clone, Default)]
struct FilterArgs {
    #[arg(long)]
    campaign: Option<String>,
    #[arg(long)]
    agency: Option<String>,
    #[arg(long)]
    vehicle: Option<String>,
    #[arg(long)]
    medium: Option<String>,
    #[arg(long)]
    market: Option<String>,
    #[arg(long)]
    creative: Option<String>,
    #[arg(long)]
    purchase_type: Option<String>,
    #[arg(long)]
    ad_group: Option<String>,
    /// Range start, DD/MM/YYYY or YYYY-MM-DD
    #[arg(long, requires = "to")]
    from: Option<String>,
    /// Range end (inclusive)
    #[arg(long, requires = "from")]
    to: Option<String>,
}

impl FilterArgs {
    fn to_filters(&self) -> anyhow::Result<Filters> {
        let mut f = Filters::new();
        let pairs = [
            (Dimension::Campaign, &self.campaign),
            (Dimension::Agency, &self.agency),
            (Dimension::Vehicle, &self.vehicle),
            (Dimension::Medium, &self.medium),
            (Dimension::Market, &self.market),
            (Dimension::Creative, &self.creative),
            (Dimension::PurchaseType, &self.purchase_type),
            (Dimension::AdGroup, &self.ad_group),
        ];
        for (dimension, value) in pairs {
            if let Some(v) = value {
                f.set(dimension, v.as_str());
            }
        }
        if let (Some(from), Some(to)) = (&self.from, &self.to) {
            let range = DateRange::parse(from, to)
                .ok_or_else(|| anyhow!("invalid date range {from} .. {to}"))?;
            f = f.with_date_range(range);
        }
        Ok(f)
    }
}

#[derive(ValueEnum, Debug, Clone, Copy)]
enum ModeArg {
    All,
    Cpm,
    Cpv,
}

impl From<ModeArg> for PurchaseMode {
    fn from(m: ModeArg) -> Self {
        match m {
            ModeArg::All => PurchaseMode::All,
            ModeArg::Cpm => PurchaseMode::Cpm,
            ModeArg::Cpv => PurchaseMode::Cpv,
        }
    }
}

#[derive(ValueEnum, Debug, Clone, Copy)]
enum PlatformArg {
    GoogleAds,
    Kwai,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Campaign totals with active/inactive status
    Campaigns {
        /// Reference day (default: today)
        #[arg(long)]
        date: Option<String>,
        #[command(flatten)]
        filters: FilterArgs,
    },
    /// Daily series for the days before the reference day
    Daily {
        #[arg(long)]
        date: Option<String>,
        #[arg(long, default_value_t = 7, value_parser = clap::value_parser!(i64).range(1..=MAX_WINDOW_DAYS))]
        days: i64,
        #[command(flatten)]
        filters: FilterArgs,
    },
    /// Media-plan overview by agency, campaign and medium
    Plan {
        #[command(flatten)]
        filters: FilterArgs,
    },
    /// Offline media by medium, market and vehicle
    Offline {
        #[command(flatten)]
        filters: FilterArgs,
    },
    /// Ad-server delivery on publisher portals
    Adserver {
        #[arg(long, value_enum, default_value_t = ModeArg::All)]
        mode: ModeArg,
        #[command(flatten)]
        filters: FilterArgs,
    },
    /// Creative ranking from a platform export
    Creatives {
        #[arg(long, value_enum, default_value_t = PlatformArg::GoogleAds)]
        platform: PlatformArg,
        /// Lowest spend first
        #[arg(long)]
        asc: bool,
        #[command(flatten)]
        filters: FilterArgs,
    },
    /// Weekly totals per vehicle
    Weekly {
        #[command(flatten)]
        filters: FilterArgs,
    },
}

fn init_tracing(json: bool) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("painel_midia=info"));
    let builder = tracing_subscriber::fmt().with_env_filter(filter).with_target(false);
    if json {
        builder.json().init();
    } else {
        builder.init();
    }
}

fn reference_day(arg: &Option<String>) -> anyhow::Result<NaiveDate> {
    match arg {
        Some(s) => painel_midia::util::parse_any_date(s)
            .ok_or_else(|| anyhow!("invalid reference date {s}")),
        None => Ok(Local::now().date_naive()),
    }
}

/// Fetch and normalize one configured dataset.
async fn load<S: TableSource>(
    source: &S,
    cfg: &AppConfig,
    name: &str,
) -> anyhow::Result<Vec<MetricRecord>> {
    let schema = cfg
        .schema(name)
        .ok_or_else(|| anyhow!("unknown dataset {name}"))?;
    let (records, report) = datasets::load(source, &schema, &VehicleAliases::standard()).await?;
    print_load_report(&schema.range, &report);
    Ok(records)
}

fn print_load_report(range: &str, report: &LoadReport) {
    info!(
        range,
        total = report.total_rows,
        emitted = report.emitted,
        "dataset normalized"
    );
    let dropped = report.dropped_missing_key + report.dropped_empty_metrics + report.excluded;
    if dropped > 0 {
        println!(
            "Note: {} of {} rows from {} left out ({} without key, {} without metrics, {} excluded).",
            format_int(dropped as f64),
            format_int(report.total_rows as f64),
            range,
            report.dropped_missing_key,
            report.dropped_empty_metrics,
            report.excluded
        );
    }
}

fn export_rows<T: Serialize>(dir: Option<&Path>, stem: &str, rows: &[T]) -> anyhow::Result<()> {
    let Some(dir) = dir else { return Ok(()) };
    let path = dir.join(format!("{stem}.csv"));
    output::write_csv(&path, rows).with_context(|| format!("writing {}", path.display()))?;
    println!("(Full table exported to {})", path.display());
    Ok(())
}

fn export_json<T: Serialize>(dir: Option<&Path>, stem: &str, value: &T) -> anyhow::Result<()> {
    let Some(dir) = dir else { return Ok(()) };
    let path = dir.join(format!("{stem}.json"));
    output::write_json(&path, value).with_context(|| format!("writing {}", path.display()))?;
    println!("(Summary exported to {})", path.display());
    Ok(())
}

fn filter_note(filters: &Filters) -> Option<String> {
    (!filters.is_empty()).then(|| format!("{} filtro(s) ativo(s)", filters.active_count()))
}

async fn handle_campaigns<S: TableSource>(
    source: &S,
    cli: &Cli,
    cfg: &AppConfig,
    date: &Option<String>,
    filters: &FilterArgs,
) -> anyhow::Result<()> {
    let reference = reference_day(date)?;
    let filters = filters.to_filters()?;
    let records = load(source, cfg, datasets::CONSOLIDATED).await?;
    let kept: Vec<MetricRecord> = filters.apply(&records).into_iter().cloned().collect();

    let rows = reports::campaign_activity(&kept, reference, cfg.activity_window_days);
    let active = rows.iter().filter(|r| r.is_active).count();
    let note = format!(
        "{} ativas de {}, janela de {} dias até {}",
        active,
        rows.len(),
        cfg.activity_window_days,
        reference.format("%d/%m/%Y")
    );
    output::preview_table("Campanhas", Some(&note), &rows, cli.rows);
    export_rows(cli.export.as_deref(), "campanhas", &rows)
}

async fn handle_daily<S: TableSource>(
    source: &S,
    cli: &Cli,
    cfg: &AppConfig,
    date: &Option<String>,
    days: i64,
    filters: &FilterArgs,
) -> anyhow::Result<()> {
    let reference = reference_day(date)?;
    let filters = filters.to_filters()?;
    if filters.date_range.is_some() {
        warn!("date range ignored; the series window comes from --date and --days");
    }
    let records = load(source, cfg, datasets::CONSOLIDATED).await?;

    let rows = reports::last_days(&records, &filters, reference, days);
    let s = reports::summarize_series(&rows);
    output::preview_table(
        &format!("Últimos {days} dias"),
        filter_note(&filters).as_deref(),
        &rows,
        cli.rows,
    );
    println!(
        "Investimento {} | Impressões {} | Cliques {} | Views {} | CPM {} | CTR {} | VTR {}\n",
        format_brl(s.spend),
        format_int(s.impressions),
        format_int(s.clicks),
        format_int(s.video_views),
        format_brl(s.cpm),
        format_percent(s.ctr),
        format_percent(s.vtr)
    );
    export_rows(cli.export.as_deref(), "ultimos_dias", &rows)
}

async fn handle_plan<S: TableSource>(
    source: &S,
    cli: &Cli,
    cfg: &AppConfig,
    filters: &FilterArgs,
) -> anyhow::Result<()> {
    let filters = filters.to_filters()?;
    let records = load(source, cfg, datasets::MEDIA_PLAN).await?;

    let overview = reports::plan_overview(&records, &filters, &cfg.corrections);
    println!(
        "Investimento total {} | Entrega prevista {} | Veículos {}",
        format_brl(overview.total_investment),
        format_int(overview.planned_delivery),
        overview.total_vehicles
    );
    let note = filter_note(&filters);
    output::preview_table("Agências", note.as_deref(), &overview.agencies, cli.rows);
    output::preview_table("Campanhas", note.as_deref(), &overview.campaigns, cli.rows);
    output::preview_table("Meios", note.as_deref(), &overview.media, cli.rows);

    let vehicles = reports::vehicles_by_medium(&records);
    output::preview_table("Veículos por meio", None, &vehicles, cli.rows);

    export_json(cli.export.as_deref(), "plano", &overview)?;
    export_rows(cli.export.as_deref(), "veiculos_por_meio", &vehicles)
}

async fn handle_offline<S: TableSource>(
    source: &S,
    cli: &Cli,
    cfg: &AppConfig,
    filters: &FilterArgs,
) -> anyhow::Result<()> {
    let filters = filters.to_filters()?;
    let records = load(source, cfg, datasets::OFFLINE).await?;

    let breakdown = reports::offline_breakdown(&records, &filters);
    println!(
        "Investimento {} | Inserções {} | Campanhas {} | Veículos {}",
        format_brl(breakdown.investment),
        format_int(breakdown.insertions),
        breakdown.campaigns,
        breakdown.vehicles
    );
    let lines = breakdown.lines();
    output::preview_table(
        "Veiculação offline",
        filter_note(&filters).as_deref(),
        &lines,
        cli.rows,
    );
    for (category, markets) in &breakdown.options.markets_by_category {
        println!("{:?}: {}", category, markets.join(", "));
    }
    println!("Veículos: {}", breakdown.options.vehicles.join(", "));
    println!("Tipos de compra: {}", breakdown.options.purchase_types.join(", "));

    export_json(cli.export.as_deref(), "offline", &breakdown)?;
    export_rows(cli.export.as_deref(), "offline_linhas", &lines)
}

async fn handle_adserver<S: TableSource>(
    source: &S,
    cli: &Cli,
    cfg: &AppConfig,
    mode: ModeArg,
    filters: &FilterArgs,
) -> anyhow::Result<()> {
    let filters = filters.to_filters()?;
    let records = load(source, cfg, datasets::AD_SERVER).await?;

    let view = ad_server_view(&records, &filters, mode.into());
    let s = &view.summary;
    println!(
        "Contratado {} | Entregue {} | Pacing {} | Cliques {} | CTR {} | Views {} | VTR {} | Viewability {}",
        format_int(s.contracted),
        format_int(s.delivered),
        format_percent(s.pacing),
        format_int(s.clicks),
        format_percent(s.ctr),
        format_int(s.views),
        format_percent(s.vtr),
        format_percent(s.viewability)
    );
    let note = filter_note(&filters);
    output::preview_table("Pacing por veículo", note.as_deref(), &view.pacing_by_vehicle, cli.rows);
    output::preview_table("Impressões por veículo", note.as_deref(), &view.impressions_by_vehicle, cli.rows);
    output::preview_table("CTR por veículo", note.as_deref(), &view.ctr_by_vehicle, cli.rows);

    export_json(cli.export.as_deref(), "portais", &view)
}

async fn handle_creatives<S: TableSource>(
    source: &S,
    cli: &Cli,
    cfg: &AppConfig,
    platform: PlatformArg,
    asc: bool,
    filters: &FilterArgs,
) -> anyhow::Result<()> {
    let filters = filters.to_filters()?;
    let (dataset, key, title): (&str, &[Dimension], &str) = match platform {
        PlatformArg::GoogleAds => (datasets::GOOGLE_ADS_CREATIVES, &creatives::GOOGLE_ADS_KEY[..], "Criativos Google Ads"),
        PlatformArg::Kwai => (datasets::KWAI_CREATIVES, &creatives::KWAI_KEY[..], "Criativos Kwai"),
    };
    let records = load(source, cfg, dataset).await?;
    let order = if asc { SortOrder::Asc } else { SortOrder::Desc };

    let report = creatives::creative_performance(&records, &filters, key, order);
    let t = &report.totals;
    println!(
        "Investimento {} | Impressões {} | Cliques {} | Views {} | CPM {} | CPC {} | CTR {} | VTR {}",
        format_brl(t.spend),
        format_int(t.impressions),
        format_int(t.clicks),
        format_int(t.video_views),
        format_brl(t.cpm),
        format_brl(t.cpc),
        format_percent(t.ctr),
        format_percent(t.vtr)
    );
    output::preview_table(title, filter_note(&filters).as_deref(), &report.rows, cli.rows);
    export_json(cli.export.as_deref(), dataset, &report)?;
    export_rows(cli.export.as_deref(), dataset, &report.rows)
}

async fn handle_weekly<S: TableSource>(
    source: &S,
    cli: &Cli,
    cfg: &AppConfig,
    filters: &FilterArgs,
) -> anyhow::Result<()> {
    let filters = filters.to_filters()?;
    let records = load(source, cfg, datasets::CONSOLIDATED).await?;

    let rows = reports::weekly_by_vehicle(&records, &filters);
    output::preview_table("Análise semanal", filter_note(&filters).as_deref(), &rows, cli.rows);
    export_rows(cli.export.as_deref(), "semanal", &rows)
}

async fn run<S: TableSource>(source: &S, cli: &Cli, cfg: &AppConfig) -> anyhow::Result<()> {
    match &cli.command {
        Command::Campaigns { date, filters } => handle_campaigns(source, cli, cfg, date, filters).await,
        Command::Daily {
            date,
            days,
            filters,
        } => handle_daily(source, cli, cfg, date, *days, filters).await,
        Command::Plan { filters } => handle_plan(source, cli, cfg, filters).await,
        Command::Offline { filters } => handle_offline(source, cli, cfg, filters).await,
        Command::Adserver { mode, filters } => handle_adserver(source, cli, cfg, *mode, filters).await,
        Command::Creatives {
            platform,
            asc,
            filters,
        } => handle_creatives(source, cli, cfg, *platform, *asc, filters).await,
        Command::Weekly { filters } => handle_weekly(source, cli, cfg, filters).await,
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.json);

    let mut cfg = AppConfig::load(cli.config.as_deref()).context("loading configuration")?;
    if let Some(url) = &cli.base_url {
        cfg.sheets.base_url = url.clone();
    }
    if let Some(dir) = &cli.export {
        std::fs::create_dir_all(dir).with_context(|| format!("creating {}", dir.display()))?;
    }

    let result = match &cli.data_dir {
        Some(dir) => run(&CsvDirSource::new(dir), &cli, &cfg).await,
        None => run(&SheetClient::spreadsheet(&cfg.sheets)?, &cli, &cfg).await,
    };
    if let Err(e) = &result {
        if e.downcast_ref::<SourceError>().is_some() {
            eprintln!("Não foi possível carregar os dados. Tente novamente mais tarde.");
        }
    }
    result
}
