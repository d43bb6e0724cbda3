//! usbscreen draw client: entry point.
//!
//! ```text
//! usbscreen-draw <image>                   Draw on the configured display
//! usbscreen-draw <image> --target mock     Draw on the mock display
//! usbscreen-draw <image> --target h:9123   Draw through a render daemon
//! usbscreen-draw --list-ports              List serial ports and exit
//! usbscreen-draw --gen-config              Dump default config and exit
//! ```

use std::path::PathBuf;

use clap::Parser;
use tracing::info;
use tracing_subscriber::EnvFilter;

use usbscreen_core::transport::list_ports;
use usbscreen_draw::config::DrawConfig;
use usbscreen_draw::present::{fill, present};

// ── CLI ──────────────────────────────────────────────────────────

#[derive(Parser, Debug)]
#[command(name = "usbscreen-draw", about = "Draw an image on a USB display")]
struct Cli {
    /// Image file to draw.
    image: Option<PathBuf>,

    /// Path to configuration TOML file.
    #[arg(short, long, default_value = "usbscreen-draw.toml")]
    config: PathBuf,

    /// Display target (overrides config): serial substring, host:port, or "mock".
    #[arg(short, long)]
    target: Option<String>,

    /// Draw the image as is instead of filling the display.
    #[arg(long)]
    no_fill: bool,

    /// List serial ports and exit.
    #[arg(long)]
    list_ports: bool,

    /// Print the default configuration to stdout and exit.
    #[arg(long)]
    gen_config: bool,
}

// ── Main ─────────────────────────────────────────────────────────

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    if cli.gen_config {
        let text = toml::to_string_pretty(&DrawConfig::default())?;
        println!("{text}");
        return Ok(());
    }

    if cli.list_ports {
        for name in list_ports()? {
            println!("{name}");
        }
        return Ok(());
    }

    let mut config = DrawConfig::load(&cli.config);
    if let Some(target) = cli.target {
        config.device.target = target;
    }

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.logging.level));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let Some(path) = cli.image else {
        return Err("no image given (see --help)".into());
    };

    let source = image::open(&path)?;
    let canvas = if cli.no_fill {
        source.to_rgba8()
    } else {
        let (w, h) = config.canvas_size();
        fill(&source, w, h)
    };
    info!(
        "{}: {}x{} on {}",
        path.display(),
        canvas.width(),
        canvas.height(),
        config.device.target
    );

    let device = usbscreen_core::connect(&config.device).await?;
    present(device, &config, &canvas).await?;

    Ok(())
}
