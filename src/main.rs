use anyhow::Result;
use clap::{Parser, ValueEnum};
use mimic::{
    HookInjector, HookSource, Recorder, RecorderConfig, RecorderMode, RunStatus,
};
use std::sync::Arc;
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

#[derive(Debug, Clone, Copy, ValueEnum)]
enum Mode {
    /// Record click timing and generate synthetic clicks
    Clicks,
    /// Record the mouse stream and replay it verbatim
    Mouse,
}

impl From<Mode> for RecorderMode {
    fn from(mode: Mode) -> Self {
        match mode {
            Mode::Clicks => RecorderMode::Clicks,
            Mode::Mouse => RecorderMode::Mouse,
        }
    }
}

/// Record mouse clicks and generate synthetic clicks
#[derive(Debug, Parser)]
#[command(name = "mimic")]
struct Args {
    /// Number of synthetic clicks to generate (ignored in mouse mode)
    #[arg(short = 'n', long, default_value_t = 10)]
    number_of_clicks: usize,

    /// Key to press to stop recording or click generation
    #[arg(short = 's', long, default_value_t = 's')]
    stop_key: char,

    /// What to record and replay
    #[arg(short = 'm', long, value_enum, default_value_t = Mode::Clicks)]
    mode: Mode,
}

#[tokio::main]
async fn main() -> Result<()> {
    let subscriber = FmtSubscriber::builder()
        .with_max_level(Level::INFO)
        .with_target(false)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    let args = Args::parse();
    let config = RecorderConfig {
        mode: args.mode.into(),
        stop_key: args.stop_key,
        target_clicks: args.number_of_clicks,
        ..RecorderConfig::default()
    };

    let recorder = Recorder::new(
        Arc::new(HookSource::new()),
        Arc::new(HookInjector::new()),
        config,
    );

    match recorder.run().await? {
        RunStatus::Completed { injected } => {
            info!("Done: {injected} synthetic actions executed.")
        }
        RunStatus::Cancelled { injected } => {
            info!("Stopped early after {injected} actions.")
        }
        RunStatus::InsufficientData => info!("Nothing to generate."),
    }

    Ok(())
}
