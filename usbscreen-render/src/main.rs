//! usbscreen render daemon: entry point.
//!
//! ```text
//! usbscreen-render                        Serve the display from the config file
//! usbscreen-render --serial usbmodem      Override the serial port substring
//! usbscreen-render --listen 0.0.0.0:9123  Override the listen address
//! usbscreen-render --config <path>        Load a custom config TOML
//! usbscreen-render --gen-config           Write default config to stdout
//! ```

use std::path::PathBuf;

use clap::Parser;
use tracing::info;
use tracing_subscriber::EnvFilter;

use usbscreen_render::config::RenderConfig;
use usbscreen_render::service::RenderService;

// ── CLI ──────────────────────────────────────────────────────────

#[derive(Parser, Debug)]
#[command(name = "usbscreen-render", about = "Serve a USB display over TCP")]
struct Cli {
    /// Path to configuration TOML file.
    #[arg(short, long, default_value = "usbscreen-render.toml")]
    config: PathBuf,

    /// Serial port name substring (or "mock").
    #[arg(short, long)]
    serial: Option<String>,

    /// Listen address, host:port.
    #[arg(short, long)]
    listen: Option<String>,

    /// Print the default configuration to stdout and exit.
    #[arg(long)]
    gen_config: bool,
}

// ── Main ─────────────────────────────────────────────────────────

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    if cli.gen_config {
        let text = toml::to_string_pretty(&RenderConfig::default())?;
        println!("{text}");
        return Ok(());
    }

    let mut config = RenderConfig::load(&cli.config);
    if let Some(serial) = cli.serial {
        config.device.target = serial;
    }
    if let Some(listen) = cli.listen {
        config.network.listen = listen;
    }

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.logging.level));
    let subscriber = tracing_subscriber::fmt().with_env_filter(filter);
    if config.logging.file.is_empty() {
        subscriber.init();
    } else {
        let file = std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&config.logging.file)?;
        subscriber
            .with_ansi(false)
            .with_writer(std::sync::Mutex::new(file))
            .init();
    }

    info!("usbscreen-render v{}", env!("CARGO_PKG_VERSION"));
    info!("display: {}", config.device.target);
    info!("listen: {}", config.network.listen);

    let service = RenderService::start(config).await?;
    service
        .serve_until(async {
            tokio::signal::ctrl_c().await.ok();
            info!("Ctrl-C received, shutting down");
        })
        .await?;

    Ok(())
}
