mod input;
mod inventories;
mod ui;

use std::io;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::{Arc, Mutex};

use anyhow::{Context, Result};
use chrono::Local;
use clap::{Parser, Subcommand};
use crossterm::{
    event::{Event, EventStream},
    execute,
    terminal::{EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode},
};
use futures_util::StreamExt;
use ratatui::{Terminal, backend::CrosstermBackend};
use tokio::sync::mpsc;
use tracing_subscriber::EnvFilter;

use ecsdash_core::config::DashConfig;
use ecsdash_core::dashboard::Dashboard;
use ecsdash_core::error::ConfigError;
use ecsdash_core::inventory::{Inventory, TimeoutInventory};
use ecsdash_core::jobs::{JobOutcome, JobRunner};
use ecsdash_core::projection::{self, TABLE_HEADERS, ViewOptions};
use ecsdash_core::scheduler::RefreshScheduler;
use ecsdash_core::snapshot::SnapshotBuilder;

use inventories::{DemoInventory, FixtureInventory};

#[derive(Parser)]
#[command(name = "ecsdash")]
#[command(about = "Terminal dashboard for container clusters and their services", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Config file; discovered from the current directory when omitted
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[arg(long, global = true)]
    region: Option<String>,

    #[arg(long, global = true)]
    account: Option<String>,

    /// Serve the inventory from a YAML fixture
    #[arg(long, global = true, conflicts_with = "demo")]
    fixture: Option<PathBuf>,

    /// Use the simulated fleet even if a fixture is configured
    #[arg(long, global = true)]
    demo: bool,

    /// Seconds between tree rebuilds
    #[arg(long, global = true)]
    refresh_secs: Option<u64>,

    /// Write diagnostics here; discarded otherwise
    #[arg(long, global = true)]
    log_file: Option<PathBuf>,

    #[arg(long, global = true, default_value = "info")]
    log_filter: String,
}

#[derive(Subcommand)]
enum Commands {
    /// Interactive dashboard (default)
    Tui,
    /// Build the services table once and print it
    Dump,
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    let cli = Cli::parse();
    init_tracing(&cli.log_filter, cli.log_file.as_deref())?;

    let config = load_config(&cli)?;
    let inventory = build_inventory(&config, cli.demo)?;
    let runner = JobRunner::new(inventory, config.arn_prefix(), config.describe_batch_size);

    match cli.command {
        Some(Commands::Dump) => run_dump(&config, &runner).await,
        Some(Commands::Tui) | None => {
            run_tui(&config, runner).await?;
            Ok(ExitCode::SUCCESS)
        }
    }
}

fn init_tracing(level_filter: &str, log_file: Option<&std::path::Path>) -> Result<()> {
    let filter = EnvFilter::try_new(level_filter)
        .or_else(|_| EnvFilter::try_new("info"))
        .context("failed to initialize tracing filter")?;

    // the terminal belongs to the TUI, so diagnostics never go to stdout
    match log_file {
        Some(path) => {
            let file = std::fs::OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .with_context(|| format!("failed to open log file {}", path.display()))?;
            let _ = tracing_subscriber::fmt()
                .with_env_filter(filter)
                .with_ansi(false)
                .with_writer(Mutex::new(file))
                .try_init();
        }
        None => {
            let _ = tracing_subscriber::fmt()
                .with_env_filter(filter)
                .with_target(false)
                .compact()
                .with_writer(io::sink)
                .try_init();
        }
    }
    Ok(())
}

fn load_config(cli: &Cli) -> Result<DashConfig> {
    let mut config = match &cli.config {
        Some(path) => DashConfig::load(path)
            .with_context(|| format!("failed to load config {}", path.display()))?,
        None => {
            let cwd = std::env::current_dir().context("failed to read current directory")?;
            match DashConfig::discover(&cwd) {
                Ok((path, config)) => {
                    tracing::info!(path = %path.display(), "loaded config");
                    config
                }
                Err(ConfigError::NotFound { .. }) => DashConfig::default(),
                Err(e) => return Err(e).context("failed to load config"),
            }
        }
    };

    if let Some(region) = &cli.region {
        config.region = region.clone();
    }
    if let Some(account) = &cli.account {
        config.account_id = Some(account.clone());
    }
    if let Some(fixture) = &cli.fixture {
        config.fixture = Some(fixture.clone());
    }
    if let Some(secs) = cli.refresh_secs {
        config.tree_refresh_secs = secs;
    }
    config.validate().context("invalid configuration")?;
    Ok(config)
}

fn build_inventory(config: &DashConfig, demo: bool) -> Result<Arc<dyn Inventory>> {
    let timeout = config.request_timeout();
    match (&config.fixture, demo) {
        (Some(path), false) => {
            let fixture =
                FixtureInventory::load(path, &config.region, config.account_id.as_deref())
                    .with_context(|| format!("failed to load fixture {}", path.display()))?;
            Ok(Arc::new(TimeoutInventory::new(fixture, timeout)))
        }
        _ => Ok(Arc::new(TimeoutInventory::new(
            DemoInventory::new(&config.region),
            timeout,
        ))),
    }
}

async fn run_dump(config: &DashConfig, runner: &JobRunner) -> Result<ExitCode> {
    let prefix = config.arn_prefix();
    let builder = SnapshotBuilder::new(runner.inventory(), &prefix)
        .with_batch_limit(config.describe_batch_size);
    let table = match builder.build_table().await {
        Ok(table) => table,
        Err(e) => {
            eprintln!("Error: {e}");
            return Ok(ExitCode::FAILURE);
        }
    };

    let rows = projection::table_rows(&table);
    let mut widths = TABLE_HEADERS.map(str::len);
    for row in &rows {
        for (w, cell) in widths.iter_mut().zip(row) {
            *w = (*w).max(cell.chars().count());
        }
    }
    let print_row = |cells: [&str; 5]| {
        let line: Vec<String> = cells
            .iter()
            .zip(widths)
            .map(|(cell, w)| format!("{cell:<w$}"))
            .collect();
        println!("{}", line.join("  ").trim_end());
    };
    print_row(TABLE_HEADERS);
    for row in &rows {
        print_row(row.each_ref().map(String::as_str));
    }
    Ok(ExitCode::SUCCESS)
}

// --- Terminal setup/teardown ---
fn setup_terminal() -> io::Result<Terminal<CrosstermBackend<io::Stdout>>> {
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    Terminal::new(backend)
}

fn restore_terminal(mut terminal: Terminal<CrosstermBackend<io::Stdout>>) -> io::Result<()> {
    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;
    Ok(())
}

async fn run_tui(config: &DashConfig, runner: JobRunner) -> Result<()> {
    let mut terminal = setup_terminal().context("failed to set up terminal")?;
    let result = event_loop(&mut terminal, config, runner).await;
    restore_terminal(terminal).context("failed to restore terminal")?;
    result
}

async fn event_loop(
    terminal: &mut Terminal<CrosstermBackend<io::Stdout>>,
    config: &DashConfig,
    runner: JobRunner,
) -> Result<()> {
    let opts = ViewOptions {
        offset: *Local::now().offset(),
        event_limit: config.event_limit,
    };
    let mut dash = Dashboard::new(opts, config.debug_log_capacity);
    let mut scheduler = RefreshScheduler::new(config.tree_refresh(), config.repaint());
    let (outcome_tx, mut outcome_rx) = mpsc::unbounded_channel::<JobOutcome>();
    let mut reader = EventStream::new();
    let banner = ui::Banner {
        inventory: runner.inventory().name(),
        region: &config.region,
    };

    loop {
        terminal
            .draw(|frame| ui::render(frame, &dash, &banner))
            .context("failed to render terminal frame")?;

        if dash.should_quit() {
            break;
        }

        tokio::select! {
            tick = scheduler.tick() => {
                let jobs = dash.on_tick(tick);
                runner.spawn_all(jobs, &outcome_tx);
            }
            Some(outcome) = outcome_rx.recv() => dash.apply(outcome),
            maybe_event = reader.next() => match maybe_event {
                Some(Ok(Event::Key(key))) => {
                    if let Some(action) = input::map_key(key) {
                        tracing::debug!(?action, "key");
                        let jobs = dash.handle(action);
                        runner.spawn_all(jobs, &outcome_tx);
                    }
                }
                Some(Ok(_)) => {}
                Some(Err(e)) => return Err(e).context("terminal event stream failed"),
                None => break,
            },
        }
    }
    Ok(())
}
