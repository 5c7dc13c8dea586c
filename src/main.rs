use std::path::PathBuf;

use anyhow::Context;
use clap::{Parser, Subcommand};
use sha2::{Digest, Sha256};

use gitslice_landing::server::{LandingServer, ServerConfig};
use gitslice_landing::{check, page, BrowserConfig, Engine};

#[derive(Parser)]
#[command(name = "gitslice-landing")]
#[command(about = "Render, serve and check the Git Slice landing page")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Write the rendered page to stdout or a file
    Render {
        /// Output file (stdout when omitted)
        #[arg(short, long)]
        out: Option<PathBuf>,

        /// Print the SHA-256 digest of the page instead of the markup
        #[arg(long)]
        digest: bool,
    },
    /// Serve the page over HTTP
    Serve {
        /// Address to bind
        #[arg(short, long, default_value = "127.0.0.1:5173")]
        addr: String,
    },
    /// Run the visibility/navigation check
    Check {
        /// Base URL of a running site (an in-process server is used when omitted)
        #[arg(short, long)]
        url: Option<String>,

        /// Emit the report as JSON
        #[arg(long)]
        json: bool,

        /// Page load timeout in milliseconds
        #[arg(long, default_value_t = 30000)]
        timeout_ms: u64,
    },
}

/// Initialize logging on stderr so rendered markup and reports keep stdout
fn init_tracing() {
    let filter = tracing_subscriber::EnvFilter::new(
        std::env::var("RUST_LOG").unwrap_or_else(|_| "gitslice_landing=info".into()),
    );
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn main() -> anyhow::Result<()> {
    init_tracing();
    let cli = Cli::parse();

    match cli.command {
        Commands::Render { out, digest } => {
            let html = page::render_page()?;
            let output = if digest {
                format!("{}\n", hex::encode(Sha256::digest(html.as_bytes())))
            } else {
                html
            };
            match out {
                Some(path) => std::fs::write(&path, output)
                    .with_context(|| format!("failed to write {}", path.display()))?,
                None => print!("{}", output),
            }
        }
        Commands::Serve { addr } => {
            let server = LandingServer::bind(ServerConfig { addr })?;
            log::info!("serving Git Slice landing page at {}", server.base_url());
            server.serve()?;
        }
        Commands::Check {
            url,
            json,
            timeout_ms,
        } => {
            // Keep the in-process server alive for the duration of the run
            let (base_url, _server) = match url {
                Some(url) => (url, None),
                None => {
                    let handle = LandingServer::bind(ServerConfig::ephemeral())?.spawn();
                    (handle.base_url(), Some(handle))
                }
            };

            let mut engine = gitslice_landing::new_engine(BrowserConfig {
                timeout_ms,
                ..Default::default()
            })?;
            engine.on_load(|snap| log::info!("loaded {} ({:?})", snap.url, snap.title));
            let report = check::run_script(&mut engine, &base_url, &check::landing_script())?;
            engine.close()?;

            if json {
                println!("{}", serde_json::to_string_pretty(&report)?);
            } else {
                println!("{}", report);
            }
            if !report.passed {
                std::process::exit(1);
            }
        }
    }
    Ok(())
}
