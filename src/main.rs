use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};
use garden_tools::config::SyncConfig;
use garden_tools::io::airtable::AirtableClient;
use garden_tools::sync::{self, RunOptions, SyncSummary};
use garden_tools::tag::DecodePolicy;
use garden_tools::{Result, logging};
use tracing::{error, info};

fn main() {
    let cli = Cli::parse();

    // Until logging is set up, stderr is the only place an error can go, so
    // --syncerr does not apply.
    let config = match setup(&cli) {
        Ok(config) => config,
        Err(error) => {
            eprintln!("error: {error}");
            std::process::exit(1);
        }
    };

    let report_errors = !cli.syncerr;
    if let Err(error) = run(&cli, &config) {
        error!(%error, "update failed, exiting");
        if report_errors {
            eprintln!("error: {error}");
        }
        std::process::exit(1);
    }
}

/// Loads the configuration and installs the log subscriber.
fn setup(cli: &Cli) -> Result<SyncConfig> {
    let config = SyncConfig::load(&cli.config)?;
    let level = cli.log_level.as_deref().unwrap_or(&config.sync.log_level);
    logging::init(level, config.sync.log_file.as_deref())?;
    Ok(config)
}

fn run(cli: &Cli, config: &SyncConfig) -> Result<()> {
    info!(command = cli.command.name(), "script started");
    if cli.syncerr {
        info!("error reporting disabled by --syncerr");
    }

    let client = AirtableClient::new(
        &config.airtable.api_url,
        &config.airtable.base_id,
        &config.airtable.api_key,
    )?;

    let result = match &cli.command {
        Command::Plants(args) => sync::sync_garden_plants(config, &args.options(), &client),
        Command::Names(args) => sync::sync_catalogue(config, &args.options(), &client),
    };
    if let Ok(summary) = &result {
        log_summary(summary);
    }
    info!("script finished");
    result.map(|_| ())
}

fn log_summary(summary: &SyncSummary) {
    info!(
        state = %summary.state,
        plan = %summary.plan,
        created = summary.applied.created,
        updated = summary.applied.updated,
        deleted = summary.applied.deleted,
        read_only = summary.read_only,
        "sync complete"
    );
}

#[derive(Parser)]
#[command(
    author,
    version,
    about = "Keep the garden tables in step with the local gardening diary."
)]
struct Cli {
    /// Configuration file with credentials and table names.
    #[arg(long, global = true, default_value = "data/config.json")]
    config: PathBuf,

    /// Do not report sync errors on stderr; failures are still logged.
    /// Configuration and logging setup errors are always reported.
    #[arg(long, global = true)]
    syncerr: bool,

    /// Log level or filter directive, overriding the configured level.
    #[arg(long, global = true)]
    log_level: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Reconcile the garden plants table with the diary.
    Plants(PlantsArgs),
    /// Add missing plant names to the plant catalogue table.
    Names(NamesArgs),
}

impl Command {
    fn name(&self) -> &'static str {
        match self {
            Command::Plants(_) => "plants",
            Command::Names(_) => "names",
        }
    }
}

#[derive(clap::Args)]
struct PlantsArgs {
    /// Compute and log the plan without writing.
    #[arg(long)]
    dry_run: bool,

    /// Read the remote table from a cache file instead of downloading it.
    /// Implies --dry-run.
    #[arg(long, conflicts_with = "write_cache")]
    from_cache: Option<PathBuf>,

    /// Save the downloaded remote table to this file.
    #[arg(long)]
    write_cache: Option<PathBuf>,

    /// Diary snapshot, overriding the configured path.
    #[arg(long)]
    diary: Option<PathBuf>,

    /// How to treat malformed name or location tags.
    #[arg(long, value_enum)]
    decode_policy: Option<PolicyArg>,
}

impl PlantsArgs {
    fn options(&self) -> RunOptions {
        RunOptions {
            dry_run: self.dry_run,
            from_cache: self.from_cache.clone(),
            write_cache: self.write_cache.clone(),
            diary_path: self.diary.clone(),
            decode_policy: self.decode_policy.map(DecodePolicy::from),
        }
    }
}

#[derive(clap::Args)]
struct NamesArgs {
    /// Compute and log the missing names without writing.
    #[arg(long)]
    dry_run: bool,

    /// Diary snapshot, overriding the configured path.
    #[arg(long)]
    diary: Option<PathBuf>,

    /// How to treat malformed name tags.
    #[arg(long, value_enum)]
    decode_policy: Option<PolicyArg>,
}

impl NamesArgs {
    fn options(&self) -> RunOptions {
        RunOptions {
            dry_run: self.dry_run,
            diary_path: self.diary.clone(),
            decode_policy: self.decode_policy.map(DecodePolicy::from),
            ..RunOptions::default()
        }
    }
}

#[derive(Copy, Clone, Debug, ValueEnum)]
enum PolicyArg {
    Skip,
    Abort,
}

impl From<PolicyArg> for DecodePolicy {
    fn from(arg: PolicyArg) -> Self {
        match arg {
            PolicyArg::Skip => DecodePolicy::Skip,
            PolicyArg::Abort => DecodePolicy::Abort,
        }
    }
}
