mod account;
mod app;
mod data;
mod extension;
mod history;
mod login;
mod profile;
mod results;
mod scan;
mod scanner;

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use capture::{Camera, RxingDecoder, Scanner, StillImageCamera, UnavailableCamera};
use clap::Parser;
use cli_log::*;
use client::client::Client;
use client::config::{Settings, StorageBackend};
use client::session::Session;
use log::info;

use crate::app::App;
use crate::data::Context;

/// Scan hair products and check them against your hair profile.
#[derive(Parser, Debug)]
#[command(version, about)]
struct Args {
    /// Configuration file (defaults to ./hairscan.toml when present)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Base URL of the scanner API
    #[arg(long)]
    api_url: Option<String>,

    /// Image file to read camera frames from
    #[arg(long)]
    camera: Option<PathBuf>,

    /// Keep the session in memory only
    #[arg(long)]
    ephemeral: bool,
}

#[tokio::main]
async fn main() -> color_eyre::Result<()> {
    init_cli_log!("hairscan");
    color_eyre::install()?;
    let args = Args::parse();

    let mut settings = Settings::new(args.config.as_deref())?;
    if let Some(api_url) = args.api_url {
        settings.api_url = api_url;
    }
    if let Some(camera) = args.camera {
        settings.scanner.camera_path = Some(camera);
    }
    if args.ephemeral {
        settings.storage.backend = StorageBackend::Memory;
    }
    info!("Using API at {}", settings.api_url);

    let session = Session::restore(settings.open_storage()?).into_shared();
    let client = Client::new(&settings.api_url, session);
    client.rehydrate().await;

    let camera: Arc<dyn Camera> = match &settings.scanner.camera_path {
        Some(path) => Arc::new(StillImageCamera::new(path)),
        None => Arc::new(UnavailableCamera),
    };
    let scanner = Scanner::new(camera, Arc::new(RxingDecoder))
        .with_interval(Duration::from_millis(settings.scanner.interval_ms));

    let terminal = ratatui::init();
    let result = App::new(Context { client, scanner }).await.run(terminal).await;
    ratatui::restore();
    result
}
