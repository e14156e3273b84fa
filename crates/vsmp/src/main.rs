// Application binary: anyhow for error reporting, println for user output.
#![allow(missing_docs)]
#![allow(clippy::print_stdout)]

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use eink_dither::DitherKind;
use tracing_subscriber::EnvFilter;
use vsmp::{Config, DryRunDisplay, FrameDisplay, FrameSource, ImageFrameSource};

#[derive(Parser)]
#[command(name = "vsmp")]
#[command(about = "Very slow movie player for IT8951 e-paper panels", long_about = None)]
#[command(version)]
struct Cli {
    /// JSON configuration file
    #[arg(long, global = true)]
    config: Option<PathBuf>,
    /// Write frames as PGM files into this directory instead of driving a panel
    #[arg(long, global = true)]
    dry_run: Option<PathBuf>,
    /// Dither strategy, overrides the configuration file
    #[arg(long, global = true)]
    dither: Option<DitherKind>,
    /// Panel VCOM in millivolts (as printed on the flex cable, without sign)
    #[arg(long, global = true)]
    vcom: Option<u16>,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Initialise the controller and print its device information
    Info,
    /// Flash the panel to white
    Clear,
    /// Show each image once, in order
    Show {
        /// Image files (PNG or PNM)
        #[arg(required = true)]
        images: Vec<PathBuf>,
    },
}

fn load_config(cli: &Cli) -> Result<Config> {
    let mut config = match &cli.config {
        Some(path) => Config::load(path)?,
        None => Config::default(),
    };
    if let Some(kind) = cli.dither {
        config.dither = kind;
    }
    if let Some(mv) = cli.vcom {
        config.session.vcom_mv = mv;
    }
    config.validate()?;
    Ok(config)
}

fn run<D>(display: &mut D, command: Commands, config: &Config) -> Result<()>
where
    D: FrameDisplay,
    D::Error: std::error::Error + Send + Sync + 'static,
{
    match command {
        Commands::Info => {
            let (w, h) = display.panel_size();
            println!("panel: {w}x{h}");
        }
        Commands::Clear => display.clear().context("clearing panel")?,
        Commands::Show { images } => {
            let (w, h) = display.panel_size();
            let mut source = ImageFrameSource::new(images)
                .with_stride_alignment(config.stride_alignment)
                .fit_within(u32::from(w), u32::from(h));
            while let Some(mut frame) = source.next_frame()? {
                display.present(&mut frame).context("presenting frame")?;
            }
        }
    }
    display.shutdown().context("shutting down display")?;
    Ok(())
}

#[cfg(feature = "hardware")]
fn run_hardware(command: Commands, config: &Config) -> Result<()> {
    use vsmp::display::it8951::VcomCalibration;
    use vsmp::FrameRefresher;

    let mut session = vsmp::hardware::open_session(config)?;
    match session.initialize().context("initialising IT8951")? {
        VcomCalibration::Unchanged => {}
        VcomCalibration::Corrected { previous, target } => {
            println!("VCOM corrected: -{previous} mV -> -{target} mV");
        }
    }
    if let Some(info) = session.device_info() {
        println!(
            "IT8951 {}x{} buffer 0x{:08X} firmware {} LUT {}",
            info.panel_width,
            info.panel_height,
            info.image_buffer_address,
            info.firmware_version,
            info.lut_version
        );
    }
    let mut refresher = FrameRefresher::new(session, config.pipeline()?, config.refresh)?;
    run(&mut refresher, command, config)
}

#[cfg(not(feature = "hardware"))]
fn run_hardware(_command: Commands, _config: &Config) -> Result<()> {
    anyhow::bail!("built without the `hardware` feature; use --dry-run <dir>")
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    let config = load_config(&cli)?;

    match cli.dry_run {
        Some(dir) => {
            let (w, h) = config.dry_run_panel;
            let mut display = DryRunDisplay::new(dir, w, h, config.pipeline()?)?;
            run(&mut display, cli.command, &config)
        }
        None => run_hardware(cli.command, &config),
    }
}
