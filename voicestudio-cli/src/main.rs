use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use voicestudio_appcore::StudioService;
use voicestudio_audio::{CpalCapture, RodioOutput};
use voicestudio_core::config::StudioConfig;
use voicestudio_engine::model::ModelManager;
use voicestudio_runtime::config_store::ConfigStore;
use voicestudio_runtime::defaults::ensure_layout;
use voicestudio_runtime::passthrough::PassthroughBackend;

mod shell;

/// Record your voice and hear it as someone else.
#[derive(Debug, Parser)]
#[command(name = "voicestudio", version)]
struct Args {
    /// JSON config file. Missing file means defaults rooted next to it.
    #[arg(long, value_name = "PATH")]
    config: Option<PathBuf>,

    /// Print the available input devices and exit.
    #[arg(long)]
    list_devices: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let args = Args::parse();

    if args.list_devices {
        for name in CpalCapture::list_input_device_names()? {
            println!("{name}");
        }
        return Ok(());
    }

    let config = match &args.config {
        Some(path) => {
            log::info!("using config {}", path.display());
            ConfigStore::at_path(path).load_or_default()?
        }
        None => StudioConfig::default(),
    };
    ensure_layout(&config)?;

    // Without an output device there is nothing useful to do.
    let output = RodioOutput::open_default().context("initialize audio output")?;
    let capture = Arc::new(CpalCapture::new(config.input_device.clone()));
    let model = ModelManager::new(Arc::new(PassthroughBackend::new()));

    let svc = StudioService::spawn(config, capture, Box::new(output), model);
    svc.start_model_load();

    print_banner(&svc).await?;
    shell::run(&svc).await?;

    log::info!("shutting down");
    svc.shutdown().await;
    Ok(())
}

async fn print_banner(svc: &StudioService) -> anyhow::Result<()> {
    let cfg = svc.config();
    let summary = svc.gallery_summary().await?;

    println!("Voice Studio is ready.");
    println!("  recordings: {}", cfg.recordings_dir.display());
    println!("  converted:  {}", cfg.converted_dir.display());
    println!(
        "  capture:    {} Hz, {} channel(s)",
        cfg.capture.sample_rate_hz, cfg.capture.channels
    );

    if summary.total == 0 {
        println!("\nNo targets found in {}.", cfg.images_dir.display());
        println!("   Add image files to get started!");
    } else {
        println!("\nDetected {} target(s) in gallery", summary.total);
        println!("   {} have matching voice files", summary.with_voice);
        if summary.missing_voice() > 0 {
            println!(
                "   {} need voice files in {}",
                summary.missing_voice(),
                cfg.voices_dir.display()
            );
        }
    }
    println!("\nThe model is loading in the background. Type `help` for commands.");
    Ok(())
}
