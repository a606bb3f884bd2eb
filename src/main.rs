use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use soundboy::model::{SoundMetadata, SoundQuery};
use soundboy::protocol::{transport, IpcClient, Responder, Response};
use soundboy::{AnalyzerConfig, SoundClient};
use std::path::PathBuf;
use std::sync::Arc;

#[derive(Parser, Debug)]
#[command(name = "soundboy")]
#[command(about = "Analyze sound libraries with a concurrent worker pool", long_about = None)]
struct Cli {
    /// Verbose logging
    #[arg(short = 'v', long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Analyze every sound file under a folder
    Analyze {
        /// Root folder to scan
        folder: PathBuf,

        #[command(flatten)]
        service: ServiceArgs,

        /// Skip tempo and key detection
        #[arg(long)]
        no_tempo: bool,

        /// Record file-level data only (no decoding)
        #[arg(long)]
        quick: bool,

        /// Minimum BPM for detection range (default: 70)
        #[arg(long, default_value = "70")]
        min_bpm: f32,

        /// Maximum BPM for detection range (default: 170)
        #[arg(long, default_value = "170")]
        max_bpm: f32,
    },

    /// Print stored sounds as JSON
    Sounds {
        /// JSON object every returned record must match, e.g. '{"format":"wav"}'
        #[arg(long)]
        filter: Option<String>,

        #[command(flatten)]
        service: ServiceArgs,
    },

    /// Remove every stored sound
    Clear {
        #[command(flatten)]
        service: ServiceArgs,
    },

    /// Serve the sound channels over stdin/stdout
    Serve {
        #[command(flatten)]
        service: ServiceArgs,
    },
}

#[derive(Args, Debug)]
struct ServiceArgs {
    /// Number of analysis workers
    #[arg(short = 'w', long, env = "SOUNDBOY_WORKERS", default_value = "8")]
    workers: usize,

    /// JSON-lines file for analyzed sounds (default: in-memory)
    #[arg(short = 's', long, env = "SOUNDBOY_STORE")]
    store: Option<String>,
}

impl ServiceArgs {
    fn config(&self) -> AnalyzerConfig {
        let config = AnalyzerConfig::new().with_pool_size(self.workers);
        match &self.store {
            Some(store) => config.with_store_path(store),
            None => config,
        }
    }
}

/// Start a responder and connect a client to it through an in-memory pipe
fn connect_in_process(config: &AnalyzerConfig) -> Result<IpcClient> {
    let pool = config.build_pool().context("Failed to start worker pool")?;
    let responder = Arc::new(Responder::new(Arc::new(pool)));

    let (client_io, server_io) = tokio::io::duplex(64 * 1024);
    let (server_read, server_write) = tokio::io::split(server_io);
    tokio::spawn(async move {
        if let Err(e) = responder.serve(server_read, server_write).await {
            log::error!("Responder stopped: {}", e);
        }
    });

    let (client_read, client_write) = tokio::io::split(client_io);
    Ok(IpcClient::connect(client_read, client_write))
}

fn print_outcome(response: &Response) {
    match (&response.error, &response.result) {
        (Some(error), _) => println!(
            "FAIL {} ({})",
            response.filename().unwrap_or("<unknown>"),
            error.message
        ),
        (None, Some(result)) => match serde_json::from_value::<SoundMetadata>(result.clone()) {
            Ok(record) => {
                let bpm = record
                    .bpm
                    .map(|b| format!("{:.1} BPM", b))
                    .unwrap_or_else(|| "-".to_string());
                let key = record.key.as_deref().unwrap_or("-");
                println!("OK   {} [{} | {}]", record.filename, bpm, key);
            }
            Err(_) => println!("OK   {}", result),
        },
        (None, None) => {}
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Logs go to stderr so `serve` can own stdout
    let log_level = if cli.verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(log_level)).init();

    match cli.command {
        Command::Analyze {
            folder,
            service,
            no_tempo,
            quick,
            min_bpm,
            max_bpm,
        } => {
            let config = service
                .config()
                .with_tempo(!no_tempo)
                .with_quick(quick)
                .with_bpm_range(min_bpm, max_bpm);

            log::info!("Soundboy - analyzing {:?}", folder);
            log::info!("===========================================");

            transport::init(connect_in_process(&config)?)?;
            let client = SoundClient::from_transport()?;

            let result = client.analyze_with(&folder, print_outcome).await;
            transport::teardown();
            let report = result.with_context(|| format!("Analysis of {:?} failed", folder))?;

            log::info!(
                "Analyzed {} files: {} ok, {} failed",
                report.total(),
                report.analyzed,
                report.failed.len()
            );
            if let Some(path) = &config.store_path {
                log::info!("Records saved to {:?}", path);
            }
        }

        Command::Sounds { filter, service } => {
            let query: SoundQuery = match filter {
                Some(json) => serde_json::from_str(&json).context("--filter must be a JSON object")?,
                None => SoundQuery::all(),
            };

            let client = SoundClient::new(connect_in_process(&service.config())?);
            let records = client.fetch_sounds(&query).await?;
            println!("{}", serde_json::to_string_pretty(&records)?);
            log::info!("{} records", records.len());
        }

        Command::Clear { service } => {
            let client = SoundClient::new(connect_in_process(&service.config())?);
            let removed = client.clear_sounds().await?;
            log::info!("Removed {} records", removed);
        }

        Command::Serve { service } => {
            let pool = service
                .config()
                .build_pool()
                .context("Failed to start worker pool")?;
            let responder = Arc::new(Responder::new(Arc::new(pool)));
            responder
                .serve(tokio::io::stdin(), tokio::io::stdout())
                .await
                .context("Responder failed")?;
        }
    }

    Ok(())
}
