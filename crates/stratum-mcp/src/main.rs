//! Stratum MCP Server — hierarchical memory store exposed over the Model
//! Context Protocol.
//!
//! Four tiers (session, project, global, temporal) behind a single Router,
//! plus relationship detection, decay prediction, and cross-tier search.

mod protocol;
mod server;
mod tools;

use std::io;
use std::path::PathBuf;
use std::sync::Arc;

use stratum_core::config::StratumConfig;
use stratum_core::router::Router;
use tracing::{error, info, Level};
use tracing_subscriber::EnvFilter;

use crate::protocol::stdio::StdioTransport;
use crate::server::McpServer;

/// Parses `--data-dir`/`--help`/`--version`, exiting the process for the
/// latter two. Returns the optional data directory override.
fn parse_args() -> Option<PathBuf> {
    let args: Vec<String> = std::env::args().collect();
    let mut data_dir: Option<PathBuf> = None;
    let mut i = 1;

    while i < args.len() {
        match args[i].as_str() {
            "--help" | "-h" => {
                println!("Stratum MCP Server v{}", env!("CARGO_PKG_VERSION"));
                println!();
                println!("Hierarchical memory store (session/project/global/temporal) exposed");
                println!("over the Model Context Protocol.");
                println!();
                println!("USAGE:");
                println!("    stratum-mcp [OPTIONS]");
                println!();
                println!("OPTIONS:");
                println!("    -h, --help              Print help information");
                println!("    -V, --version           Print version information");
                println!("    --data-dir <PATH>       Custom data directory");
                println!();
                println!("ENVIRONMENT:");
                println!("    RUST_LOG                Log level filter (e.g., debug, info, warn, error)");
                std::process::exit(0);
            }
            "--version" | "-V" => {
                println!("stratum-mcp {}", env!("CARGO_PKG_VERSION"));
                std::process::exit(0);
            }
            "--data-dir" => {
                i += 1;
                if i >= args.len() {
                    eprintln!("error: --data-dir requires a path argument");
                    std::process::exit(1);
                }
                data_dir = Some(PathBuf::from(&args[i]));
            }
            arg if arg.starts_with("--data-dir=") => {
                let path = arg.strip_prefix("--data-dir=").unwrap_or("");
                if path.is_empty() {
                    eprintln!("error: --data-dir requires a path argument");
                    std::process::exit(1);
                }
                data_dir = Some(PathBuf::from(path));
            }
            arg => {
                eprintln!("error: unknown argument '{arg}'");
                eprintln!("Try 'stratum-mcp --help' for more information.");
                std::process::exit(1);
            }
        }
        i += 1;
    }

    data_dir
}

#[tokio::main]
async fn main() {
    let data_dir = parse_args();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive(Level::INFO.into()))
        .with_writer(io::stderr)
        .with_target(false)
        .with_ansi(false)
        .init();

    info!("Stratum MCP Server v{} starting...", env!("CARGO_PKG_VERSION"));

    let mut config = StratumConfig::default();
    if let Some(dir) = data_dir {
        config.data_dir = dir;
    }

    let router = Arc::new(Router::new(config));
    if let Err(e) = router.load_from_disk() {
        error!("failed to load persisted state: {}", e);
        std::process::exit(1);
    }
    info!("Router initialized");

    let flush_minutes: u64 = std::env::var("STRATUM_FLUSH_INTERVAL_MINUTES")
        .ok()
        .and_then(|s| s.parse().ok())
        .unwrap_or(10);
    let _persistence_tasks = router.spawn_persistence_tasks(std::time::Duration::from_secs(flush_minutes * 60));

    {
        let router = Arc::clone(&router);
        tokio::spawn(async move {
            let interval_hours: u64 = std::env::var("STRATUM_OPTIMIZE_INTERVAL_HOURS")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(6);
            tokio::time::sleep(std::time::Duration::from_secs(2)).await;
            loop {
                match router.run_scheduled_optimization() {
                    Ok(()) => info!("scheduled optimization complete"),
                    Err(e) => tracing::warn!("scheduled optimization failed: {}", e),
                }
                tokio::time::sleep(std::time::Duration::from_secs(interval_hours * 3600)).await;
            }
        });
    }

    let server = McpServer::new(router);
    let transport = StdioTransport::new();

    info!("starting MCP server on stdio...");
    let run_result = transport.run(server).await;

    if let Err(e) = router.close() {
        error!("failed to flush state during shutdown: {}", e);
    }

    if let Err(e) = run_result {
        error!("server error: {}", e);
        std::process::exit(1);
    }

    info!("Stratum MCP Server shutting down");
}
