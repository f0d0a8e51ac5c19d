//! RecordBoard - terminal dashboard for a records backend
//!
//! Fetches records from the backend, charts them by sector and region,
//! and renders a table whose rows expand to show every field.
//!
//! Exit codes:
//!   0 - Success
//!   1 - Runtime error (config, client setup, writing output)
//!   2 - The dashboard ended on a failure message, or the ping failed

mod analysis;
mod backend;
mod cli;
mod config;
mod dashboard;
mod interactive;
mod models;
mod report;

use anyhow::{Context, Result};
use backend::{ClientConfig, RecordClient};
use cli::Args;
use config::{Config, CONFIG_FILE_NAME};
use dashboard::Dashboard;
use report::{RenderOptions, ViewTarget};
use tracing::{debug, error, info};
use tracing_subscriber::FmtSubscriber;

#[tokio::main]
async fn main() -> Result<()> {
    // Parse command-line arguments
    let args = Args::parse_args();

    if let Err(e) = args.validate() {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }

    // Handle --init-config early (no logging needed)
    if args.init_config {
        return handle_init_config();
    }

    let mut config = match load_config(&args) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Error: {:#}", e);
            std::process::exit(1);
        }
    };
    config.merge_with_args(&args);

    init_logging(&args, &config);

    info!("RecordBoard v{}", env!("CARGO_PKG_VERSION"));
    debug!("Arguments: {:?}", args);
    debug!("Configuration: {:?}", config);

    match run(args, config).await {
        Ok(exit_code) => {
            std::process::exit(exit_code);
        }
        Err(e) => {
            error!("Dashboard failed: {}", e);
            eprintln!("\n❌ Error: {:#}", e);
            std::process::exit(1);
        }
    }
}

/// Handle --init-config: generate a default .recordboard.toml.
fn handle_init_config() -> Result<()> {
    let path = std::path::Path::new(CONFIG_FILE_NAME);

    if path.exists() {
        eprintln!(
            "⚠️  {} already exists. Remove it first or edit it manually.",
            CONFIG_FILE_NAME
        );
        std::process::exit(1);
    }

    let content = Config::default_toml();
    std::fs::write(path, &content)
        .with_context(|| format!("Failed to write {}", CONFIG_FILE_NAME))?;

    println!("✅ Created {} with default settings.", CONFIG_FILE_NAME);
    println!("   Edit it to point at another backend or change the display.");
    Ok(())
}

/// Initialize logging based on verbosity settings.
fn init_logging(args: &Args, config: &Config) {
    let level = if config.general.verbose && !args.quiet {
        tracing::Level::DEBUG
    } else {
        args.log_level()
    };

    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .compact()
        .finish();

    if let Err(e) = tracing::subscriber::set_global_default(subscriber) {
        eprintln!("Failed to set tracing subscriber: {}", e);
    }
}

/// Load, render, and optionally hand over to the interactive session.
async fn run(args: Args, config: Config) -> Result<i32> {
    let client = RecordClient::new(&ClientConfig::from(&config.backend))
        .context("Failed to create backend client")?;
    info!("Backend: {}", client.base_url());

    if args.ping_only {
        let alive = dashboard::ping(&client).await;
        return Ok(if alive { 0 } else { 2 });
    }

    let view = ViewTarget {
        format: config.display.format,
        options: RenderOptions {
            chart_width: config.display.chart_width,
            show_charts: config.display.show_charts,
        },
        output: args.output.clone(),
    };

    let mut board = Dashboard::new(client.clone(), !args.quiet);

    // Initial load, with the ping running alongside when requested
    let ping_ok = if args.ping {
        let ((), alive) = tokio::join!(board.mount(), dashboard::ping(&client));
        alive
    } else {
        board.mount().await;
        true
    };

    if let Some(query) = args.requested_search() {
        board.state_mut().set_field(query.field);
        board.state_mut().set_term(query.term);
        board.submit_search().await;
    }

    info!("Showing {} records", board.state().records().len());

    for input in &args.expand {
        let key = board.state().resolve_row_key(input);
        board.state_mut().toggle_expand(key);
    }

    view.emit(board.state())?;

    if let Some(ref path) = view.output {
        if !args.quiet {
            println!("✅ Dashboard saved to: {}", path.display());
        }
    }

    if args.interactive {
        interactive::run(&mut board, &view).await?;
    }

    let failed = board
        .state()
        .message()
        .map(|m| m.is_error())
        .unwrap_or(false);

    if failed || !ping_ok {
        return Ok(2);
    }

    Ok(0)
}

/// Load configuration from file or use defaults.
fn load_config(args: &Args) -> Result<Config> {
    // Try explicit config path
    if let Some(ref config_path) = args.config {
        return Config::load(config_path);
    }

    // Try default location
    Ok(Config::load_default()?.unwrap_or_default())
}
