use std::{path::PathBuf, sync::Arc};

use anyhow::{Context, Result};
use clap::Parser;
use client_core::{
    load_settings, HttpRoutingBackend, MapSessionController, SceneSurface, SharedSurface,
};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio_stream::{wrappers::LinesStream, StreamExt};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

mod commands;
mod render;

use commands::Command;

#[derive(Parser, Debug)]
#[command(name = "map-client", about = "Block and unblock roads against a routing backend")]
struct Args {
    /// Overrides `backend_url` from the settings file and environment.
    #[arg(long)]
    backend_url: Option<String>,
    /// Settings file; defaults to `map_client.toml` when present.
    #[arg(long)]
    settings: Option<PathBuf>,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();
    let args = Args::parse();

    let mut settings = load_settings(args.settings.as_deref())?;
    if let Some(url) = args.backend_url {
        settings.backend_url = url;
    }
    let backend = Arc::new(HttpRoutingBackend::new(&settings)?);
    info!(backend = %backend.base_url(), "map-client starting");

    let scene = SceneSurface::shared();
    let surface: SharedSurface = scene.clone();
    let session = Arc::new(MapSessionController::init(&settings, backend, surface));
    println!(
        "view centred on {}, {} at zoom {}",
        settings.view_center.lat, settings.view_center.lon, settings.view_zoom
    );

    if let Err(err) = session.initial_load().await {
        warn!(error = %err, "initial load failed, use 'reload' to retry");
    }
    print!("{}", render::describe_scene(&*scene.lock().await));
    println!("{}", commands::HELP);

    let mut lines = LinesStream::new(BufReader::new(tokio::io::stdin()).lines());
    while let Some(line) = lines.next().await {
        let line = line.context("failed to read stdin")?;
        let command = match commands::parse(&line) {
            Ok(Some(command)) => command,
            Ok(None) => continue,
            Err(err) => {
                eprintln!("{err:#}");
                continue;
            }
        };

        match command {
            Command::Event(event) => {
                // Events run concurrently; the session serializes what must be ordered.
                let session = Arc::clone(&session);
                tokio::spawn(async move {
                    let outcome = session.handle(event).await;
                    println!("{}", render::describe_outcome(&outcome));
                });
            }
            Command::Show => print!("{}", render::describe_scene(&*scene.lock().await)),
            Command::Export(path) => {
                let doc = render::scene_geojson(&*scene.lock().await);
                match std::fs::write(&path, serde_json::to_string_pretty(&doc)?) {
                    Ok(()) => println!("scene written to {}", path.display()),
                    Err(err) => eprintln!("failed to write '{}': {err}", path.display()),
                }
            }
            Command::Help => println!("{}", commands::HELP),
            Command::Quit => break,
        }
    }

    session.teardown().await;
    info!("map-client stopped");
    Ok(())
}
