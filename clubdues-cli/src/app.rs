use std::fs;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use chrono::NaiveDate;
use clap::{Args, Parser, Subcommand};
use rust_decimal::Decimal;

use clubdues_core::{PaymentDraft, RawPayment, Semester, Year};
use clubdues_ledger::{
    PaymentService, SqliteCounterStore, SqlitePaymentRepository,
};

#[derive(Parser)]
#[command(name = "clubdues", version, about = "Membership dues ledger for the IT club")]
pub struct Cli {
    /// Configuration file (optional).
    #[arg(long, global = true, default_value = "clubdues.toml")]
    config: PathBuf,
    /// Database path; overrides the configured one.
    #[arg(long, global = true)]
    db: Option<PathBuf>,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Repair historical records that lack a well-formed receipt number.
    Backfill,
    /// Print dashboard totals.
    Summary,
    /// List all payments, newest first.
    List,
    /// Import a JSON array of legacy payment documents.
    Import { file: PathBuf },
    /// Record a new payment.
    Add(AddArgs),
}

#[derive(Args)]
struct AddArgs {
    #[arg(long)]
    first_name: String,
    #[arg(long)]
    last_name: String,
    #[arg(long)]
    reg_no: String,
    #[arg(long)]
    course: String,
    #[arg(long, default_value = "1", value_parser = parse_year)]
    year: Year,
    #[arg(long, default_value = "First", value_parser = parse_semester)]
    semester: Semester,
    /// Amount paid, in UGX.
    #[arg(long)]
    amount: Decimal,
    /// Payment date, YYYY-MM-DD.
    #[arg(long)]
    date: NaiveDate,
}

fn parse_year(raw: &str) -> Result<Year, String> {
    raw.parse()
}

fn parse_semester(raw: &str) -> Result<Semester, String> {
    raw.parse()
}

pub fn run() -> Result<()> {
    Cli::parse().execute()
}

impl Cli {
    fn execute(self) -> Result<()> {
        let settings = crate::settings::load(&self.config)?;
        let db = self.db.unwrap_or(settings.database);
        let payments = Arc::new(
            SqlitePaymentRepository::new(&db)
                .with_context(|| format!("opening payment store at {}", db.display()))?,
        );
        let counters = Arc::new(
            SqliteCounterStore::new(&db)
                .with_context(|| format!("opening counter store at {}", db.display()))?,
        );
        let service = PaymentService::new(payments, counters);

        match self.command {
            Command::Backfill => backfill(&service),
            Command::Summary => summary(&service),
            Command::List => list(&service),
            Command::Import { file } => import(&service, &file),
            Command::Add(args) => add(&service, args),
        }
    }
}

fn backfill(service: &PaymentService) -> Result<()> {
    let report = service.repair()?;
    println!(
        "backfill complete: {} scanned, {} updated, {} failed",
        report.scanned,
        report.updated,
        report.failed()
    );
    for failure in &report.failures {
        println!("  failed {}: {}", failure.payment_id, failure.error);
    }
    Ok(())
}

fn summary(service: &PaymentService) -> Result<()> {
    let summary = service.summary()?;
    println!("payments: {}", summary.total_payments);
    println!("total:    {} UGX", summary.total_amount);
    Ok(())
}

fn list(service: &PaymentService) -> Result<()> {
    for record in service.list()? {
        println!(
            "{:<10} {:>10} UGX  {} {} ({}, year {}, {} semester)  paid {}",
            record.receipt.as_text().unwrap_or_else(|| "-".into()),
            record.amount,
            record.first_name,
            record.last_name,
            record.reg_no,
            record.year,
            record.semester,
            record.paid_on.format("%Y-%m-%d"),
        );
    }
    Ok(())
}

fn import(service: &PaymentService, file: &std::path::Path) -> Result<()> {
    let text = fs::read_to_string(file)
        .with_context(|| format!("reading {}", file.display()))?;
    let raws: Vec<RawPayment> =
        serde_json::from_str(&text).context("parsing legacy payment documents")?;
    let total = raws.len();
    let stored = service.import(raws)?;
    println!("imported {stored} of {total} documents");
    Ok(())
}

fn add(service: &PaymentService, args: AddArgs) -> Result<()> {
    let paid_on = args
        .date
        .and_hms_opt(0, 0, 0)
        .context("invalid payment date")?
        .and_utc();
    let record = service.create(PaymentDraft {
        first_name: args.first_name,
        last_name: args.last_name,
        reg_no: args.reg_no,
        course: args.course,
        year: args.year,
        semester: args.semester,
        amount: args.amount,
        paid_on,
    })?;
    println!(
        "recorded payment {} under receipt {}",
        record.id,
        record.receipt.as_text().unwrap_or_default()
    );
    Ok(())
}
