//! `searchlog`: debounced search-event logging service.

mod config;
mod runtime;

use clap::{Parser, Subcommand};
use config::SearchlogConfig;
use runtime::{require_shared_storage, Engine};
use searchlog_debounce::FlushScheduler;
use searchlog_gateway::GatewayServer;
use std::path::PathBuf;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "searchlog", about = "Searchlog: debounced search-event logging")]
struct Cli {
    /// Path to config file
    #[arg(short, long, default_value = "searchlog.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the HTTP ingest server and the flush scheduler
    Serve {
        /// Host to bind to (overrides config)
        #[arg(long)]
        host: Option<String>,
        /// Port to listen on (overrides config)
        #[arg(short, long)]
        port: Option<u16>,
    },
    /// Run only the flush scheduler against shared SQLite storage
    Flush {
        /// Run a single cycle, print its report, and exit
        #[arg(long)]
        once: bool,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .json()
        .init();

    let cli = Cli::parse();
    let config = SearchlogConfig::load(&cli.config).await?;

    match cli.command {
        Commands::Serve { host, port } => {
            let host = host.unwrap_or(config.server.host.clone());
            let port = port.unwrap_or(config.server.port);

            let engine = Engine::build(&config).await?;
            let scheduler =
                FlushScheduler::from_config(engine.flusher.clone(), &config.debounce).start();

            let app = GatewayServer::build(engine.logger.clone());
            let addr = format!("{host}:{port}");
            let listener = tokio::net::TcpListener::bind(&addr).await?;

            info!(
                window_secs = config.debounce.window_secs,
                flush_interval_ms = config.debounce.flush_interval_ms,
                "Searchlog listening on {addr}"
            );
            axum::serve(listener, app)
                .with_graceful_shutdown(shutdown_signal())
                .await?;

            scheduler.abort();
            info!("Searchlog stopped");
        }
        Commands::Flush { once } => {
            require_shared_storage(&config.storage)?;
            let engine = Engine::build(&config).await?;

            if once {
                let report = engine.flusher.flush_once().await?;
                let summary = serde_json::json!({
                    "scanned": report.scanned,
                    "flushed": report.flushed.len(),
                    "missing": report.missing,
                    "corrupt": report.corrupt,
                    "superseded": report.superseded,
                    "failed": report.failed,
                });
                println!("{}", serde_json::to_string_pretty(&summary)?);
                return Ok(());
            }

            let scheduler =
                FlushScheduler::from_config(engine.flusher.clone(), &config.debounce).start();
            info!("Flush worker running, press Ctrl-C to stop");
            shutdown_signal().await;
            scheduler.abort();
            info!("Flush worker stopped");
        }
    }

    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for Ctrl-C");
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}
