//! Podkast CLI entry point.

use anyhow::Result;
use clap::{Parser, Subcommand};
use podkast::api;
use podkast::config::Settings;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Podkast - Document-to-Podcast Generation
///
/// Turns uploaded documents into a two-host audio podcast and answers
/// listener questions asked mid-playback from the same source material.
#[derive(Parser, Debug)]
#[command(name = "podkast")]
#[command(version, about, long_about = None)]
struct Cli {
    /// Increase verbosity (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Path to configuration file
    #[arg(short, long, global = true)]
    config: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Write a default configuration file
    Init,

    /// Start the HTTP API server
    Serve {
        /// Address to bind to
        #[arg(long)]
        host: Option<String>,

        /// Port to listen on
        #[arg(short, long)]
        port: Option<u16>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let log_level = match cli.verbose {
        0 => "info",
        1 => "debug",
        _ => "trace",
    };

    tracing_subscriber::registry()
        .with(EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| format!("podkast={}", log_level)),
        ))
        .with(tracing_subscriber::fmt::layer().with_target(false))
        .init();

    // Load configuration
    let settings = match &cli.config {
        Some(path) => Settings::load_from(Some(&std::path::PathBuf::from(path)))?,
        None => Settings::load()?,
    };

    // Ensure data directories exist
    std::fs::create_dir_all(settings.data_dir())?;
    std::fs::create_dir_all(settings.upload_dir())?;
    std::fs::create_dir_all(settings.podcast_dir())?;
    std::fs::create_dir_all(settings.answer_dir())?;

    match &cli.command {
        Commands::Init => {
            let path = Settings::default_config_path();
            settings.save()?;
            println!("Wrote configuration to {}", path.display());
        }

        Commands::Serve { host, port } => {
            let host = host.clone().unwrap_or_else(|| settings.server.host.clone());
            let port = port.unwrap_or(settings.server.port);
            api::run_serve(&host, port, settings).await?;
        }
    }

    Ok(())
}
