//! naivesocks - SOCKS5 tunnel
//!
//! This is the main entry point for both relay roles.

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use naivesocks::config::{load_config, Config, Overrides};
use naivesocks::tunnel::{LocalRelay, ServerRelay};
use naivesocks::NaiveSocksError;
use std::path::{Path, PathBuf};
use tokio::sync::broadcast;
use tracing::{info, warn, Level};
use tracing_subscriber::FmtSubscriber;

/// Config file read from the working directory when `-c` is not given
const DEFAULT_CONFIG_FILE: &str = "config.json";

/// naivesocks - SOCKS5 tunnel with a key-exchange handshake
#[derive(Parser, Debug)]
#[command(name = "naivesocks")]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    role: Role,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, global = true, default_value = "info")]
    log_level: String,

    /// Enable JSON logging format
    #[arg(long, global = true)]
    json_log: bool,
}

#[derive(Subcommand, Debug)]
enum Role {
    /// Accept SOCKS5 clients and tunnel them to the server relay
    Local(LocalArgs),
    /// Accept tunnels from local relays and dial their destinations
    Server(ServerArgs),
}

#[derive(Args, Debug)]
struct LocalArgs {
    /// Path to configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Server relay host
    #[arg(short = 's', long)]
    server: Option<String>,

    /// Server relay port
    #[arg(short = 'p', long)]
    server_port: Option<u16>,

    /// Shared password
    #[arg(short = 'k', long)]
    password: Option<String>,

    /// Port to accept SOCKS5 clients on
    #[arg(short = 'l', long)]
    local_port: Option<u16>,

    /// Dial the server relay over IPv6
    #[arg(short = '6', long)]
    ipv6: bool,
}

#[derive(Args, Debug)]
struct ServerArgs {
    /// Path to configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Port to accept tunnels on
    #[arg(short = 'p', long)]
    server_port: Option<u16>,

    /// Shared password
    #[arg(short = 'k', long)]
    password: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Setup logging
    setup_logging(&cli.log_level, cli.json_log)?;

    info!("naivesocks v{}", naivesocks::VERSION);

    // Setup shutdown signal
    let (shutdown_tx, shutdown_rx) = broadcast::channel(1);
    spawn_signal_handler(shutdown_tx);

    match cli.role {
        Role::Local(args) => {
            let overrides = Overrides {
                server: args.server,
                server_port: args.server_port,
                local_port: args.local_port,
                password: args.password,
                ipv6: args.ipv6,
            };
            let config = resolve_config(args.config.as_deref(), overrides)?;

            LocalRelay::bind(&config).await?.run(shutdown_rx).await
        }
        Role::Server(args) => {
            let overrides = Overrides {
                server_port: args.server_port,
                password: args.password,
                ..Default::default()
            };
            let config = resolve_config(args.config.as_deref(), overrides)?;

            ServerRelay::bind(&config).await?.run(shutdown_rx).await
        }
    }
}

/// Load the config file, then apply command line overrides
fn resolve_config(path: Option<&Path>, overrides: Overrides) -> Result<Config> {
    let mut config = match path {
        Some(path) => {
            let config = load_config(path)?;
            info!("Configuration loaded from: {:?}", path);
            config
        }
        None if Path::new(DEFAULT_CONFIG_FILE).exists() => {
            let config = load_config(DEFAULT_CONFIG_FILE)?;
            info!("Configuration loaded from: {}", DEFAULT_CONFIG_FILE);
            config
        }
        None => Config::default(),
    };

    config.apply_overrides(overrides);
    config
        .validate()
        .map_err(NaiveSocksError::Config)
        .context("Invalid configuration")?;

    Ok(config)
}

/// Send on `shutdown_tx` at Ctrl+C or SIGTERM
fn spawn_signal_handler(shutdown_tx: broadcast::Sender<bool>) {
    tokio::spawn(async move {
        #[cfg(unix)]
        {
            use tokio::signal::unix::{signal, SignalKind};
            match signal(SignalKind::terminate()) {
                Ok(mut sigterm) => {
                    tokio::select! {
                        _ = tokio::signal::ctrl_c() => {
                            info!("Received Ctrl+C, shutting down...");
                        }
                        _ = sigterm.recv() => {
                            info!("Received SIGTERM, shutting down...");
                        }
                    }
                }
                Err(e) => {
                    warn!("Failed to setup SIGTERM handler: {}", e);
                    let _ = tokio::signal::ctrl_c().await;
                    info!("Received Ctrl+C, shutting down...");
                }
            }
        }

        #[cfg(not(unix))]
        {
            // On Windows, only handle Ctrl+C
            let _ = tokio::signal::ctrl_c().await;
            info!("Received Ctrl+C, shutting down...");
        }

        let _ = shutdown_tx.send(true);
    });
}

/// Setup logging based on configuration
fn setup_logging(level: &str, json: bool) -> Result<()> {
    let level = match level.to_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" | "warning" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    };

    if json {
        let subscriber = FmtSubscriber::builder()
            .with_max_level(level)
            .json()
            .finish();
        tracing::subscriber::set_global_default(subscriber)?;
    } else {
        let subscriber = FmtSubscriber::builder()
            .with_max_level(level)
            .with_target(true)
            .with_thread_ids(false)
            .with_thread_names(false)
            .finish();
        tracing::subscriber::set_global_default(subscriber)?;
    }

    Ok(())
}
