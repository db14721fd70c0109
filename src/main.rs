//! `triage-engine` binary: starts the rooms, doctors and sweepers, then serves
//! arrivals over TCP until terminated.

use std::path::PathBuf;

use anyhow::Context;
use clap::Parser;
use tracing::info;

use triage_engine::builders::start_engine;
use triage_engine::config::EngineConfig;
use triage_engine::core::AppResult;
use triage_engine::runtime::AdmissionServer;
use triage_engine::util::telemetry::init_tracing;

#[derive(Parser)]
#[command(name = "triage-engine")]
#[command(about = "Emergency-room triage engine with multiple rooms and doctors per room")]
#[command(version)]
struct Cli {
    /// JSON configuration file
    #[arg(short, long, env = "TRIAGE_CONFIG")]
    config: Option<PathBuf>,

    /// Listen host
    #[arg(long)]
    host: Option<String>,

    /// Listen port
    #[arg(long)]
    port: Option<u16>,

    /// Number of independent rooms
    #[arg(long, visible_alias = "salas")]
    rooms: Option<usize>,

    /// Doctors per room
    #[arg(long, visible_alias = "medicos")]
    doctors: Option<usize>,

    /// Event Log snapshot file
    #[arg(long)]
    log_file: Option<PathBuf>,

    /// Occupancy snapshot file
    #[arg(long)]
    status_file: Option<PathBuf>,

    /// Keep the Event Log and Occupancy Registry in memory only
    #[arg(long, conflicts_with_all = ["log_file", "status_file"])]
    in_memory: bool,
}

impl Cli {
    fn resolve_config(&self) -> AppResult<EngineConfig> {
        let mut cfg = match &self.config {
            Some(path) => {
                let text = std::fs::read_to_string(path)
                    .with_context(|| format!("reading config {}", path.display()))?;
                EngineConfig::from_json_str(&text)
                    .map_err(anyhow::Error::msg)
                    .with_context(|| format!("loading config {}", path.display()))?
            }
            None => EngineConfig::default(),
        };
        cfg.apply_env().map_err(anyhow::Error::msg)?;

        if let Some(host) = &self.host {
            cfg.host.clone_from(host);
        }
        if let Some(port) = self.port {
            cfg.port = port;
        }
        if let Some(rooms) = self.rooms {
            cfg.rooms = rooms;
        }
        if let Some(doctors) = self.doctors {
            cfg.doctors_per_room = doctors;
        }
        if let Some(path) = &self.log_file {
            cfg.log_path = Some(path.clone());
        }
        if let Some(path) = &self.status_file {
            cfg.occupancy_path = Some(path.clone());
        }
        if self.in_memory {
            cfg.log_path = None;
            cfg.occupancy_path = None;
        }

        cfg.validate()
            .map_err(anyhow::Error::msg)
            .context("invalid configuration")?;
        Ok(cfg)
    }
}

#[tokio::main]
async fn main() {
    if let Err(e) = run().await {
        eprintln!("triage-engine: {e:#}");
        std::process::exit(1);
    }
}

async fn run() -> AppResult<()> {
    let _ = dotenvy::dotenv();
    init_tracing();

    let cli = Cli::parse();
    let cfg = cli.resolve_config()?;

    let engine = start_engine(&cfg).context("starting engine")?;
    let addr = cfg.listen_addr();
    let server = AdmissionServer::bind(&addr, engine.scheduler().clone(), cfg.read_timeout()).await?;

    info!(
        addr = %addr,
        rooms = cfg.rooms,
        doctors_per_room = cfg.doctors_per_room,
        "triage engine ready"
    );

    server
        .serve_until(async {
            let _ = tokio::signal::ctrl_c().await;
        })
        .await;

    info!(summary = ?engine.scheduler().log().summary(), "interrupted");
    Ok(())
}
