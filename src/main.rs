mod cli;

use std::path::PathBuf;

use actix_web::{App, HttpServer, middleware, web};
use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use facematch::{FaceDB, config, server};
use log::info;

#[derive(Parser)]
#[command(name = "facematch")]
#[command(version, about = "In-memory face identity matching service")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the HTTP API
    Serve {
        /// Path to a TOML config file
        #[arg(short, long)]
        config: Option<PathBuf>,
        /// Override the bind host
        #[arg(long)]
        host: Option<String>,
        /// Override the bind port
        #[arg(short, long)]
        port: Option<u16>,
    },
    /// Interactive session over raw embeddings
    Repl {
        /// Fix the embedding dimension up front
        #[arg(short, long)]
        dimension: Option<usize>,
    },
}

#[actix_web::main]
async fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .format_target(false)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Serve { config, host, port } => serve(config, host, port).await,
        Commands::Repl { dimension } => {
            let db = match dimension {
                Some(d) => FaceDB::with_dimension(d),
                None => FaceDB::new(),
            };
            cli::run_repl(&db).context("REPL I/O failed")
        }
    }
}

async fn serve(path: Option<PathBuf>, host: Option<String>, port: Option<u16>) -> Result<()> {
    let mut cfg = config::load_config(path.as_deref())?;
    if let Some(host) = host {
        cfg.host = host;
    }
    if let Some(port) = port {
        cfg.port = port;
    }
    cfg.validate()?;

    let state = web::Data::new(server::AppState::from_config(&cfg));
    server::log_startup(&cfg, &state);

    HttpServer::new(move || {
        App::new()
            .wrap(middleware::Logger::default())
            .app_data(state.clone())
            .configure(server::config)
    })
    .bind(cfg.bind_addr())
    .with_context(|| format!("binding {}", cfg.bind_addr()))?
    .run()
    .await?;

    info!("server stopped");
    Ok(())
}
