//! CLI entry point for `mailflow`.

use std::io::Write as _;
use std::path::PathBuf;

use chrono::NaiveDate;
use clap::{CommandFactory, Parser, Subcommand, ValueEnum};
use indicatif::{ProgressBar, ProgressStyle};

use mailflow::config::{self, Config};
use mailflow::db::source::{SqliteSource, TimeRange};
use mailflow::db::{purge, totals};
use mailflow::export::{run_export, ExportOptions};
use mailflow::model::message::Direction;

#[derive(Parser)]
#[command(name = "mailflow", version, about = "Ticketing-system EML export and purge utility")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Ticketing database file
    #[arg(long, global = true, value_name = "FILE", env = "MAILFLOW_DB")]
    db: Option<PathBuf>,

    /// Verbose logging (-v info, -vv debug, -vvv trace)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,
}

#[derive(Subcommand)]
enum Commands {
    /// Export messages in a date range as .eml files
    Export {
        /// Which message tables to export
        #[arg(short, long, value_enum, default_value_t = DirectionArg::Both)]
        direction: DirectionArg,
        /// Start date (YYYY-MM-DD, inclusive)
        #[arg(long)]
        start: NaiveDate,
        /// End date (YYYY-MM-DD, inclusive)
        #[arg(long)]
        end: NaiveDate,
        /// Output base directory
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Mark tickets for purge (soft delete)
    MarkPurge {
        /// Start date (YYYY-MM-DD, inclusive)
        #[arg(long)]
        start: NaiveDate,
        /// End date (YYYY-MM-DD, inclusive)
        #[arg(long)]
        end: NaiveDate,
        /// TicketStateID to mark (1=Closed, 2=Open, 3=On-Hold)
        #[arg(long, default_value_t = 1)]
        state: i64,
        /// AgentID recorded in DeletedBy
        #[arg(long, default_value_t = 1)]
        deleted_by: i64,
        /// Skip the confirmation prompt
        #[arg(short = 'y', long)]
        yes: bool,
    },
    /// Permanently delete marked tickets and all child rows
    Purge {
        /// Start date (YYYY-MM-DD, inclusive)
        #[arg(long)]
        start: NaiveDate,
        /// End date (YYYY-MM-DD, inclusive)
        #[arg(long)]
        end: NaiveDate,
        /// Skip the confirmation prompt
        #[arg(short = 'y', long)]
        yes: bool,
    },
    /// Show agent and ticket totals
    Totals {
        #[arg(long)]
        json: bool,
    },
    /// Generate shell completions
    Completions {
        #[arg(value_enum)]
        shell: clap_complete::Shell,
    },
    /// Generate a man page
    Manpage,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum DirectionArg {
    Inbound,
    Outbound,
    Both,
}

impl DirectionArg {
    fn directions(self) -> Vec<Direction> {
        match self {
            DirectionArg::Inbound => vec![Direction::Inbound],
            DirectionArg::Outbound => vec![Direction::Outbound],
            DirectionArg::Both => vec![Direction::Inbound, Direction::Outbound],
        }
    }
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let config = config::load_config();

    let log_level = match cli.verbose {
        0 => config.general.log_level.as_str(),
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    setup_logging(log_level, &config);

    match cli.command {
        Commands::Export {
            direction,
            start,
            end,
            output,
        } => cmd_export(&cli.db, &config, direction, start, end, output),
        Commands::MarkPurge {
            start,
            end,
            state,
            deleted_by,
            yes,
        } => cmd_mark_purge(&cli.db, &config, start, end, state, deleted_by, yes),
        Commands::Purge { start, end, yes } => cmd_purge(&cli.db, &config, start, end, yes),
        Commands::Totals { json } => cmd_totals(&cli.db, &config, json),
        Commands::Completions { shell } => cmd_completions(shell),
        Commands::Manpage => cmd_manpage(),
    }
}

/// Set up tracing with stderr output and an append-only log file.
fn setup_logging(level: &str, config: &Config) {
    use tracing_subscriber::layer::SubscriberExt;
    use tracing_subscriber::util::SubscriberInitExt;

    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(level));

    let stderr_layer = tracing_subscriber::fmt::layer().with_writer(std::io::stderr);

    let log_dir = config::cache_dir(config);
    if std::fs::create_dir_all(&log_dir).is_ok() {
        let file_appender = tracing_appender::rolling::never(&log_dir, "mailflow.log");
        let file_layer = tracing_subscriber::fmt::layer()
            .with_ansi(false)
            .with_writer(file_appender);

        tracing_subscriber::registry()
            .with(env_filter)
            .with(stderr_layer)
            .with(file_layer)
            .init();
    } else {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(stderr_layer)
            .init();
    }
}

/// Resolve the database path from the CLI flag or the config file.
fn resolve_db(cli_db: &Option<PathBuf>, config: &Config) -> anyhow::Result<PathBuf> {
    let path = cli_db
        .clone()
        .or_else(|| config.export.database.clone())
        .ok_or_else(|| anyhow::anyhow!("No database given (use --db or set export.database)"))?;
    if !path.exists() {
        anyhow::bail!("Database file not found: {}", path.display());
    }
    Ok(path)
}

/// Ask for confirmation on stdin unless `--yes` was passed.
fn confirm(prompt: &str, yes: bool) -> anyhow::Result<bool> {
    if yes {
        return Ok(true);
    }
    print!("{prompt} (y/n): ");
    std::io::stdout().flush()?;
    let mut answer = String::new();
    std::io::stdin().read_line(&mut answer)?;
    Ok(answer.trim().eq_ignore_ascii_case("y"))
}

/// Export messages in a date range as .eml files.
fn cmd_export(
    cli_db: &Option<PathBuf>,
    config: &Config,
    direction: DirectionArg,
    start: NaiveDate,
    end: NaiveDate,
    output: Option<PathBuf>,
) -> anyhow::Result<()> {
    let db_path = resolve_db(cli_db, config)?;
    let source = SqliteSource::open(&db_path)?;

    let opts = ExportOptions {
        directions: direction.directions(),
        range: TimeRange::from_dates(start, end)?,
        output_base: output.unwrap_or_else(|| config.export.output_dir.clone()),
    };

    println!(
        "  Exporting {} messages from {} to {} into {}",
        opts.directions
            .iter()
            .map(|d| d.as_str())
            .collect::<Vec<_>>()
            .join("+"),
        start,
        end,
        opts.output_base.display()
    );

    let pb = ProgressBar::new(0);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} Exporting {msg} [{bar:40.cyan/blue}] {pos}/{len}")
            .expect("valid template")
            .progress_chars("#>-"),
    );

    let summary = run_export(
        &source,
        &opts,
        Some(&|direction, current, total| {
            pb.set_message(direction.as_str());
            pb.set_length(total as u64);
            pb.set_position(current as u64);
        }),
    )?;
    pb.finish_and_clear();

    use humansize::{format_size, BINARY};
    println!();
    println!("  Export complete:");
    println!("  {:<20} {}", "Exported", summary.exported);
    if summary.failed > 0 {
        println!("  {:<20} {}", "Failed", summary.failed);
    }
    println!(
        "  {:<20} {}",
        "Bytes written",
        format_size(summary.bytes_written, BINARY)
    );
    println!();

    if summary.failed > 0 {
        anyhow::bail!("{} message(s) failed to export (see log)", summary.failed);
    }
    Ok(())
}

/// Mark tickets for purge after showing a preview.
fn cmd_mark_purge(
    cli_db: &Option<PathBuf>,
    config: &Config,
    start: NaiveDate,
    end: NaiveDate,
    state: i64,
    deleted_by: i64,
    yes: bool,
) -> anyhow::Result<()> {
    if !totals::is_reported_state(state) {
        anyhow::bail!(
            "Unknown ticket state {state} (known: 1=Closed, 2=Open, 3=On-Hold, 6=Marked for Deletion)"
        );
    }

    let db_path = resolve_db(cli_db, config)?;
    let conn = rusqlite::Connection::open(&db_path)?;
    let range = TimeRange::from_dates(start, end)?;

    let summary = purge::state_summary(&conn, &range)?;
    println!();
    println!("  Ticket states in the selected date range (not deleted):");
    if summary.is_empty() {
        println!("  (No tickets found in this date range.)");
    }
    for entry in &summary {
        println!(
            "  {:>3} = {:<20} : {:>6}",
            entry.state_id, entry.label, entry.count
        );
    }
    println!();

    let preview = purge::count_candidates(&conn, &range, state)?;
    let prompt = format!(
        "This will mark {} ticket(s) in state {} ({}) as deleted. Proceed?",
        preview,
        state,
        purge::state_label(state)
    );
    if !confirm(&prompt, yes)? {
        println!("  Cancelled.");
        return Ok(());
    }

    let marked = purge::mark_for_purge(&conn, &range, state, deleted_by)?;
    println!("  Total tickets marked for purge: {marked}");
    Ok(())
}

/// Hard-purge marked tickets in a date range.
fn cmd_purge(
    cli_db: &Option<PathBuf>,
    config: &Config,
    start: NaiveDate,
    end: NaiveDate,
    yes: bool,
) -> anyhow::Result<()> {
    let db_path = resolve_db(cli_db, config)?;
    let mut conn = rusqlite::Connection::open(&db_path)?;
    let range = TimeRange::from_dates(start, end)?;

    let prompt =
        "Permanently delete marked tickets in this range? This cannot be undone. Proceed?";
    if !confirm(prompt, yes)? {
        println!("  Cancelled.");
        return Ok(());
    }

    let stats = purge::hard_purge(&mut conn, &range)?;
    println!();
    println!("  Hard purge complete:");
    println!("  {:<28} {}", "Tickets in scope", stats.tickets_in_scope);
    for (table, rows) in &stats.deleted {
        println!("  {table:<28} {rows} row(s) deleted");
    }
    println!();
    Ok(())
}

/// Show agent and ticket totals.
fn cmd_totals(cli_db: &Option<PathBuf>, config: &Config, json: bool) -> anyhow::Result<()> {
    let db_path = resolve_db(cli_db, config)?;
    let conn = rusqlite::Connection::open(&db_path)?;
    let report = totals::totals(&conn)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(());
    }

    println!();
    println!("  {:<28} {}", "Enabled agents", report.enabled_agents);
    for entry in &report.tickets_by_state {
        println!(
            "  {:<28} {}",
            format!("Tickets ({})", entry.label),
            entry.count
        );
    }
    println!();
    Ok(())
}

/// Generate shell completions and print to stdout.
fn cmd_completions(shell: clap_complete::Shell) -> anyhow::Result<()> {
    let mut cmd = Cli::command();
    clap_complete::generate(shell, &mut cmd, "mailflow", &mut std::io::stdout());
    Ok(())
}

/// Generate a man page and print to stdout.
fn cmd_manpage() -> anyhow::Result<()> {
    let cmd = Cli::command();
    let man = clap_mangen::Man::new(cmd);
    let mut buf = Vec::new();
    man.render(&mut buf)?;
    std::io::Write::write_all(&mut std::io::stdout(), &buf)?;
    Ok(())
}
