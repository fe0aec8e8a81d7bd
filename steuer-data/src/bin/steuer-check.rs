use std::fs::File;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use rust_decimal::Decimal;
use steuer_core::calculations::{
    AssessmentCalculator, AssessmentInput, DepreciationCalculator, EuerStatement,
    TaxReserveCalculator, TradeTaxCalculator, VatConverter,
};
use steuer_core::clock::{Clock, FixedClock, SystemClock};
use steuer_core::db::{LedgerRegistry, MemoryLedgerFactory};
use steuer_core::events::IncomeEventBus;
use steuer_core::monitor::{AlertCollector, AlertDispatcher, RevenueAggregator, ThresholdMonitor};
use steuer_core::reports::EuerReporter;
use steuer_core::service::LedgerService;
use steuer_core::{LedgerRepository, TaxYearTable};
use steuer_data::{EngineConfig, LedgerImporter, init_logging};
use steuer_db_sqlite::SqliteLedgerFactory;
use tracing::info;

/// Checks a freelancer's ledger against German tax thresholds.
#[derive(Parser, Debug)]
#[command(name = "steuer-check")]
#[command(version, about, long_about = None)]
struct Args {
    /// Engine configuration; defaults apply when the file does not exist
    #[arg(short, long, global = true, default_value = "steuer.toml")]
    config: PathBuf,

    /// Ledger backend, overrides `[database] backend` (memory, sqlite)
    #[arg(long, global = true)]
    backend: Option<String>,

    /// Connection string, overrides `[database] connection_string`
    #[arg(long, global = true)]
    db: Option<String>,

    /// Evaluate as if today were this date (YYYY-MM-DD)
    #[arg(long, global = true)]
    today: Option<NaiveDate>,

    /// Log filter, e.g. `debug` or `steuer_core=trace`; defaults to RUST_LOG
    #[arg(long, global = true)]
    log_level: Option<String>,

    /// Also append log output to this file
    #[arg(long, global = true)]
    log_file: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Import income and expense entries from CSV and report threshold alerts
    Import {
        /// CSV with columns user_id, stream, amount, entry_date, source, description
        #[arg(long)]
        income: PathBuf,

        /// CSV with columns user_id, amount, category, entry_date, freiberuf_pct,
        /// gewerbe_pct, personal_pct, description, useful_life_months
        #[arg(long)]
        expenses: Option<PathBuf>,
    },

    /// Print the EÜR per stream and compute income tax and trade tax from it
    Assess {
        #[arg(long)]
        user: i64,

        #[arg(long)]
        year: i32,
    },

    /// Suggest the monthly amount to set aside for taxes on self-employed profit
    Reserve {
        #[arg(long)]
        user: i64,

        #[arg(long)]
        year: i32,

        /// Amount already set aside this year, in EUR
        #[arg(long, default_value = "0")]
        reserved: Decimal,
    },

    /// List capitalized assets with their depreciation for a year
    Assets {
        #[arg(long)]
        user: i64,

        #[arg(long)]
        year: i32,
    },

    /// Record the disposal of a capitalized asset
    Dispose {
        #[arg(long)]
        user: i64,

        #[arg(long)]
        asset: i64,

        /// Disposal date (YYYY-MM-DD)
        #[arg(long)]
        date: NaiveDate,
    },

    /// Convert between net and gross amounts
    Vat {
        #[arg(long)]
        amount: Decimal,

        /// Rate in percent, e.g. 19 or 7
        #[arg(long, default_value = "19")]
        rate: Decimal,

        /// Treat `amount` as net instead of gross
        #[arg(long, default_value_t = false)]
        from_net: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    init_logging(args.log_level.as_deref(), args.log_file.as_deref())?;

    let mut config = EngineConfig::load(&args.config)
        .with_context(|| format!("Failed to load config: {}", args.config.display()))?;
    if let Some(backend) = &args.backend {
        config.database.backend = backend.clone();
    }
    if let Some(db) = &args.db {
        config.database.connection_string = db.clone();
    }

    let clock: Arc<dyn Clock> = match args.today {
        Some(today) => Arc::new(FixedClock::on(today)),
        None => Arc::new(SystemClock),
    };

    match args.command {
        Command::Import { income, expenses } => {
            let ledger = open_ledger(&config).await?;
            import(ledger, clock, &config, income, expenses).await
        }
        Command::Assess { user, year } => {
            let ledger = open_ledger(&config).await?;
            assess(ledger, &config, user, year).await
        }
        Command::Reserve {
            user,
            year,
            reserved,
        } => {
            let ledger = open_ledger(&config).await?;
            reserve(ledger, clock, &config, user, year, reserved).await
        }
        Command::Assets { user, year } => {
            let ledger = open_ledger(&config).await?;
            assets(ledger, user, year).await
        }
        Command::Dispose { user, asset, date } => {
            let ledger = open_ledger(&config).await?;
            dispose(ledger, &config, user, asset, date).await
        }
        Command::Vat {
            amount,
            rate,
            from_net,
        } => vat(amount, rate, from_net),
    }
}

async fn open_ledger(config: &EngineConfig) -> Result<Arc<dyn LedgerRepository>> {
    let mut registry = LedgerRegistry::new();
    registry.register(Box::new(MemoryLedgerFactory));
    registry.register(Box::new(SqliteLedgerFactory));

    let ledger = registry.create(&config.database).await.with_context(|| {
        format!(
            "Failed to open {} ledger: {}",
            config.database.backend, config.database.connection_string
        )
    })?;
    info!(backend = %config.database.backend, "ledger opened");
    Ok(Arc::from(ledger))
}

async fn import(
    ledger: Arc<dyn LedgerRepository>,
    clock: Arc<dyn Clock>,
    config: &EngineConfig,
    income_path: PathBuf,
    expenses_path: Option<PathBuf>,
) -> Result<()> {
    let collector = Arc::new(AlertCollector::new());
    let mut dispatcher = AlertDispatcher::new();
    dispatcher.subscribe(collector.clone());

    let monitor = ThresholdMonitor::new(ledger.clone(), clock, config.monitor.clone(), dispatcher);
    let mut bus = IncomeEventBus::new();
    bus.subscribe(Arc::new(monitor));
    let service = LedgerService::new(ledger, bus, config.depreciation.clone());

    let expenses = match &expenses_path {
        Some(path) => {
            let file =
                File::open(path).with_context(|| format!("Failed to open: {}", path.display()))?;
            LedgerImporter::parse_expenses(file)
                .with_context(|| format!("Failed to parse CSV: {}", path.display()))?
        }
        None => Vec::new(),
    };

    let file = File::open(&income_path)
        .with_context(|| format!("Failed to open: {}", income_path.display()))?;
    let income = LedgerImporter::parse_income(file)
        .with_context(|| format!("Failed to parse CSV: {}", income_path.display()))?;

    println!("Parsed {} income and {} expense records", income.len(), expenses.len());

    let summary = LedgerImporter::import(&service, &income, &expenses)
        .await
        .context("Failed to import ledger entries")?;

    println!(
        "Imported {} income entries and {} expense entries.",
        summary.income_entries, summary.expense_entries
    );
    for record in &summary.capitalized {
        let asset = &record.asset;
        println!(
            "  capitalized: #{} {} ({} EUR over {} months, {} EUR per full year)",
            record.id,
            asset.name(),
            asset.net_cost(),
            asset.useful_life_months(),
            DepreciationCalculator::new(asset).annual_rate()
        );
    }

    let alerts = collector.drain();
    if alerts.is_empty() {
        println!("No thresholds reached.");
    }
    for alert in alerts {
        println!(
            "ALERT {:<30} user {} year {}: ratio {} (reference {} EUR)",
            alert.kind, alert.user_id, alert.year, alert.ratio, alert.reference_amount
        );
    }

    Ok(())
}

async fn assess(
    ledger: Arc<dyn LedgerRepository>,
    config: &EngineConfig,
    user: i64,
    year: i32,
) -> Result<()> {
    let snapshot = RevenueAggregator::new(ledger.clone())
        .snapshot(user, year)
        .await
        .with_context(|| format!("Failed to aggregate ledger for user {user}, {year}"))?;
    let employment_income = snapshot.employment().context("Employment income unavailable")?;
    let euer = EuerReporter::new(ledger)
        .generate_dual(user, year)
        .await
        .with_context(|| format!("Failed to build EÜR for user {user}, {year}"))?;

    println!("EÜR {year} for user {user}");
    print_euer(&euer.freiberuf);
    print_euer(&euer.gewerbe);
    println!("  combined profit        {:>12}", euer.combined_profit());

    let input = AssessmentInput {
        employment_income,
        freiberuf_income: euer.freiberuf.income,
        gewerbe_income: euer.gewerbe.income,
        freiberuf_expenses: euer.freiberuf.total_expenses,
        gewerbe_expenses: euer.gewerbe.total_expenses,
    };

    let table = TaxYearTable::statutory();
    let params = table.resolve(year)?;
    let assessment = AssessmentCalculator::new(params)
        .calculate(&input)
        .context("Failed to compute income tax")?;
    let trade_tax = TradeTaxCalculator::new(config.trade_tax.clone())
        .calculate(input.gewerbe_income, input.gewerbe_expenses, assessment.income_tax)
        .context("Failed to compute trade tax")?;

    println!("Assessment {year} for user {user} (parameters {})", assessment.tax_year);
    println!("  gross income           {:>12}", assessment.gross_income);
    println!("  deductions             {:>12}", assessment.deductions.total);
    println!("  taxable income (zvE)   {:>12}", assessment.taxable_income);
    println!("  income tax             {:>12}", assessment.income_tax);
    println!("  solidarity surcharge   {:>12}", assessment.solidarity_surcharge);
    println!("  total                  {:>12}", assessment.total_tax);
    println!("  marginal rate          {:>11}%", assessment.marginal_rate);
    println!("  effective rate         {:>11}%", assessment.effective_rate);
    println!("Gewerbesteuer (Hebesatz {})", trade_tax.hebesatz);
    println!("  profit                 {:>12}", trade_tax.profit);
    println!("  Messbetrag             {:>12}", trade_tax.messbetrag);
    println!("  trade tax              {:>12}", trade_tax.trade_tax);
    println!("  §35 credit             {:>12}", trade_tax.credit);
    println!("  net burden             {:>12}", trade_tax.net_burden);

    Ok(())
}

fn print_euer(statement: &EuerStatement) {
    println!("  {}", statement.stream);
    println!("    income               {:>12}", statement.income);
    println!("    operating expenses   {:>12}", statement.operating_expenses);
    println!("    depreciation (AfA)   {:>12}", statement.depreciation);
    println!("    profit               {:>12}", statement.profit);
}

async fn reserve(
    ledger: Arc<dyn LedgerRepository>,
    clock: Arc<dyn Clock>,
    config: &EngineConfig,
    user: i64,
    year: i32,
    reserved: Decimal,
) -> Result<()> {
    let euer = EuerReporter::new(ledger)
        .generate_dual(user, year)
        .await
        .with_context(|| format!("Failed to build EÜR for user {user}, {year}"))?;
    let reserve = TaxReserveCalculator::new(clock, config.tax_reserve.clone())
        .calculate(euer.net_profit(), year, reserved)
        .context("Failed to compute tax reserve")?;

    println!("Tax reserve {year} for user {user} ({}%)", reserve.rate_percent);
    println!("  profit to date         {:>12}", reserve.net_profit);
    println!("  projected profit       {:>12}", reserve.projected_profit);
    println!("  annual reserve         {:>12}", reserve.annual_reserve);
    println!("  already reserved       {:>12}", reserve.already_reserved);
    println!("  remaining              {:>12}", reserve.remaining);
    println!("  months remaining       {:>12}", reserve.months_remaining);
    println!("  monthly reserve        {:>12}", reserve.monthly_reserve);
    Ok(())
}

async fn assets(
    ledger: Arc<dyn LedgerRepository>,
    user: i64,
    year: i32,
) -> Result<()> {
    let records = ledger
        .list_assets(user)
        .await
        .with_context(|| format!("Failed to list assets for user {user}"))?;
    if records.is_empty() {
        println!("No capitalized assets.");
    }
    for record in &records {
        let asset = &record.asset;
        let calculator = DepreciationCalculator::new(asset);
        println!(
            "#{:<4} {:<24} acquired {} cost {:>10}  AfA {year} {:>10}{}",
            record.id,
            asset.name(),
            asset.acquisition_date(),
            asset.net_cost(),
            calculator.for_year(year),
            asset
                .disposal_date()
                .map(|d| format!("  disposed {d}"))
                .unwrap_or_default()
        );
    }
    Ok(())
}

async fn dispose(
    ledger: Arc<dyn LedgerRepository>,
    config: &EngineConfig,
    user: i64,
    asset_id: i64,
    date: NaiveDate,
) -> Result<()> {
    let service = LedgerService::new(ledger, IncomeEventBus::new(), config.depreciation.clone());
    let record = service
        .dispose_asset(asset_id, user, date)
        .await
        .with_context(|| format!("Failed to dispose asset {asset_id} of user {user}"))?;

    println!("Disposed #{} {} on {date}", record.id, record.asset.name());
    Ok(())
}

fn vat(
    amount: Decimal,
    rate: Decimal,
    from_net: bool,
) -> Result<()> {
    let converter = VatConverter::new(rate)?;

    let (net, gross) = if from_net {
        (amount, converter.gross_from_net(amount)?)
    } else {
        (converter.net_from_gross(amount)?, amount)
    };
    let vat = if from_net {
        gross - net
    } else {
        converter.extract_vat(gross)?
    };

    println!("net   {net:>12}");
    println!("VAT   {vat:>12}  ({rate}%)");
    println!("gross {gross:>12}");
    Ok(())
}
