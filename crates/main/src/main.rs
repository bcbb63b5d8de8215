use std::error::Error;
use std::path::PathBuf;
use std::time::Duration;

use chrono::NaiveDate;
use clap::{Args, Parser, Subcommand};
use log::info;
use rust_decimal::Decimal;

use payslip::assets::{BrandingAssets, LocationAssetSource};
use payslip::batch::{BatchDriver, BatchReport};
use payslip::builder::DocumentBuilder;
use payslip::config::Settings;
use payslip::currency::format_with_symbol;
use payslip::mail::{MailTemplate, Mailer, SmtpMailer};
use payslip::model::{PayslipRecord, PeriodFields};
use payslip::roster::RosterReader;

/// Exit status when a batch finished but some rows failed.
const EXIT_ROW_FAILURES: i32 = 2;

/// Generates PDF payslips for one employee or a whole roster.
///
/// Settings not given on the command line are read from `PAYSLIP_*` environment variables,
/// optionally through a `.env` file.
#[derive(Parser)]
#[command(author, version, about = "Generate, export and email PDF payslips")]
struct Cli {
    #[command(flatten)]
    branding: BrandingArgs,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Args)]
struct BrandingArgs {
    /// Logo URL or path; repeat to add fallbacks tried in order.
    #[arg(long = "logo", global = true)]
    logos: Vec<String>,

    /// Letterhead URL or path, drawn behind the whole page.
    #[arg(long, global = true)]
    letterhead: Option<String>,

    /// Seconds to wait for a remote image.
    #[arg(long, global = true)]
    asset_timeout: Option<u64>,

    /// Footer disclaimer printed at the bottom of the page.
    #[arg(long, global = true, conflicts_with = "no_footer")]
    footer: Option<String>,

    /// Leave the footer out.
    #[arg(long, global = true)]
    no_footer: bool,

    /// Print "Logo unavailable" when the logo cannot be loaded.
    #[arg(long, global = true)]
    mark_unavailable: bool,

    /// Currency symbol used in summaries and emails.
    #[arg(long, global = true)]
    currency: Option<String>,
}

#[derive(Args)]
struct PeriodArgs {
    #[arg(long, default_value = "Salmnine Investment Ltd")]
    company: String,

    #[arg(long, default_value = "FF Millennium Towers, Ligali Ayorinde, VI, Lagos")]
    address: String,

    /// Pay date as YYYY-MM-DD; defaults to today.
    #[arg(long)]
    pay_date: Option<NaiveDate>,

    #[arg(long, default_value_t = 30)]
    working_days: u32,
}

impl PeriodArgs {
    fn into_period(self) -> PeriodFields {
        let pay_date = self
            .pay_date
            .unwrap_or_else(|| chrono::Local::now().date_naive());
        PeriodFields::new(pay_date, self.working_days, self.company, self.address)
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Render one payslip from command-line values.
    Single(SingleArgs),

    /// Render a payslip for every row of a .csv or .tsv roster.
    Batch(BatchArgs),
}

#[derive(Args)]
struct SingleArgs {
    #[command(flatten)]
    period: PeriodArgs,

    #[arg(long, default_value = "James Arthur")]
    employee_name: String,

    #[arg(long, default_value = "0077")]
    employee_id: String,

    #[arg(long, default_value = "400000")]
    basic_pay: Decimal,

    #[arg(long, default_value = "200000")]
    housing: Decimal,

    #[arg(long, default_value = "150000")]
    transport: Decimal,

    #[arg(long, default_value = "25000")]
    other_allowances: Decimal,

    #[arg(long, default_value = "100000")]
    tax: Decimal,

    #[arg(long, default_value = "57000")]
    employee_pension: Decimal,

    #[arg(long, default_value = "0")]
    other_deductions: Decimal,

    /// Directory the PDF is written to.
    #[arg(long, default_value = ".")]
    output_dir: PathBuf,

    /// Also print the PDF as a data: URI.
    #[arg(long)]
    data_uri: bool,

    /// Email the payslip to this address instead of only writing it.
    #[arg(long)]
    email: Option<String>,
}

#[derive(Args)]
struct BatchArgs {
    /// Roster file (.csv or .tsv).
    roster: PathBuf,

    #[command(flatten)]
    period: PeriodArgs,

    /// Directory the PDFs are written to.
    #[arg(long, default_value = "payslips")]
    export_dir: PathBuf,

    /// Email each payslip to the row's `email` column instead of writing files.
    #[arg(long, conflicts_with = "export_dir")]
    email: bool,
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let cli = Cli::parse();

    match run(cli) {
        Ok(code) => std::process::exit(code),
        Err(err) => {
            eprintln!("Error: {}", err);
            print_error_sources(err.as_ref());
            std::process::exit(1);
        }
    }
}

fn run(cli: Cli) -> Result<i32, Box<dyn Error>> {
    let settings = apply_branding(Settings::from_env()?, cli.branding);
    let builder = DocumentBuilder::new()
        .with_footer(settings.footer.clone())
        .with_unavailable_marker(settings.mark_unavailable);
    let assets = settings.resolve_assets(&LocationAssetSource::new(settings.asset_timeout));
    log_assets(&assets);

    match cli.command {
        Commands::Single(args) => run_single(args, &settings, &builder, &assets),
        Commands::Batch(args) => run_batch(args, &settings, builder, assets),
    }
}

fn apply_branding(mut settings: Settings, args: BrandingArgs) -> Settings {
    if !args.logos.is_empty() {
        settings.logo_locations = args.logos;
    }
    if let Some(letterhead) = args.letterhead {
        settings.letterhead = Some(letterhead);
    }
    if let Some(secs) = args.asset_timeout {
        settings.asset_timeout = Duration::from_secs(secs);
    }
    if args.no_footer {
        settings.footer = None;
    } else if let Some(footer) = args.footer {
        settings.footer = Some(footer);
    }
    if args.mark_unavailable {
        settings.mark_unavailable = true;
    }
    if let Some(currency) = args.currency {
        settings.currency_symbol = currency;
    }
    settings
}

fn log_assets(assets: &BrandingAssets) {
    for (name, asset) in [("logo", &assets.logo), ("letterhead", &assets.letterhead)] {
        if asset.is_available() {
            info!("{} loaded", name);
        }
    }
}

fn run_single(
    args: SingleArgs,
    settings: &Settings,
    builder: &DocumentBuilder,
    assets: &BrandingAssets,
) -> Result<i32, Box<dyn Error>> {
    let record = PayslipRecord::builder(args.period.into_period())
        .employee_name(args.employee_name)
        .employee_id(args.employee_id)
        .basic_pay(args.basic_pay)
        .housing(args.housing)
        .transport(args.transport)
        .other_allowances(args.other_allowances)
        .tax(args.tax)
        .employee_pension(args.employee_pension)
        .other_deductions(args.other_deductions)
        .build()?;

    let symbol = settings.currency_symbol.as_str();
    println!("Total earnings: {}", format_with_symbol(symbol, record.total_earnings()));
    println!("Total deductions: {}", format_with_symbol(symbol, record.total_deductions()));
    println!("Net pay: {}", format_with_symbol(symbol, record.net_pay()));

    let rendered = builder.render(&record, assets)?;
    std::fs::create_dir_all(&args.output_dir)?;
    let path = rendered.write_to_dir(&args.output_dir)?;
    println!("Wrote {}", path.display());

    if args.data_uri {
        println!("{}", rendered.data_uri());
    }

    if let Some(to) = args.email {
        let mailer = SmtpMailer::new(settings.smtp()?)?;
        mailer.send(&MailTemplate::new(symbol).compose(&to, &record, &rendered))?;
        println!("Sent {} to {}", rendered.filename, to);
    }

    Ok(0)
}

fn run_batch(
    args: BatchArgs,
    settings: &Settings,
    builder: DocumentBuilder,
    assets: BrandingAssets,
) -> Result<i32, Box<dyn Error>> {
    let rows = RosterReader::open(&args.roster)?.rows()?;
    let driver = BatchDriver::new(args.period.into_period(), builder, assets);

    if args.email {
        // Fail before rendering anything when delivery is not configured.
        let mailer = SmtpMailer::new(settings.smtp()?)?;
        let template = MailTemplate::new(settings.currency_symbol.as_str());
        let report = driver.deliver(rows, &mailer, &template);
        println!(
            "Sent {} of {} payslips ({} failed, {} skipped)",
            report.succeeded(),
            report.outcomes.len(),
            report.failed(),
            report.skipped()
        );
        Ok(finish(&report))
    } else {
        let report = driver.export(rows, &args.export_dir)?;
        println!(
            "Exported {} of {} payslips to {}",
            report.succeeded(),
            report.outcomes.len(),
            args.export_dir.display()
        );
        Ok(finish(&report))
    }
}

fn finish<T>(report: &BatchReport<T>) -> i32 {
    for (outcome, err) in report.failures() {
        eprintln!("  {}: {}", outcome.label(), err);
    }
    if report.has_failures() {
        EXIT_ROW_FAILURES
    } else {
        0
    }
}

fn print_error_sources(mut error: &(dyn Error + 'static)) {
    while let Some(source) = error.source() {
        eprintln!("  caused by: {}", source);
        error = source;
    }
}
