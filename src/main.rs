use std::path::PathBuf;

use chrono::Local;
use color_eyre::eyre::eyre;
use color_eyre::Result;
use rppal::gpio::Gpio;
use tokio::sync::mpsc;
use tracing::{info, warn, Level};
use tracing_subscriber::FmtSubscriber;

use snespad::config::PadConfig;
use snespad::controller::{ButtonMap, EventTranslator, PadEvent, PadHandle, PadProtocol};
use snespad::gpio::RppalLine;
use snespad::sink::ChannelSink;

#[tokio::main]
async fn main() -> Result<()> {
    setup()?;

    let config = load_config()?;
    info!(
        "initializing {} on pins clock={} latch={} data={}",
        config.device_name, config.pins.clock, config.pins.latch, config.pins.data
    );

    let gpio = Gpio::new().map_err(|e| eyre!("GPIO controller unavailable: {}", e))?;
    let clock = RppalLine::acquire(&gpio, config.pins.clock)?;
    let latch = RppalLine::acquire(&gpio, config.pins.latch)?;
    let data = RppalLine::acquire(&gpio, config.pins.data)?;
    let protocol = PadProtocol::initialize(clock, latch, data)?;

    let (event_tx, event_rx) = mpsc::channel(1000);
    let consumer = tokio::spawn(consume_events(event_rx));

    let translator = EventTranslator::new(ButtonMap::snes());
    let mut pad = PadHandle::spawn(
        protocol,
        translator,
        ChannelSink::new(event_tx),
        config.poll.clone(),
    )?;
    info!(
        "{} polling every {}ms (bounds [{}, {}]ms)",
        config.device_name,
        pad.interval_ms(),
        pad.min_interval_ms(),
        pad.max_interval_ms()
    );

    tokio::signal::ctrl_c().await?;
    info!("shutdown requested, draining in-flight cycle");
    pad.stop().await;

    // The poll callback owned the sink; with the worker gone the channel
    // closes and the consumer drains out on its own.
    let _ = consumer.await;
    info!("pad stopped");
    Ok(())
}

fn setup() -> Result<()> {
    if std::env::var("RUST_LIB_BACKTRACE").is_err() {
        std::env::set_var("RUST_LIB_BACKTRACE", "0")
    }
    color_eyre::install()?;
    if std::env::var("RUST_LOG").is_err() {
        std::env::set_var("RUST_LOG", "info")
    }
    setup_logging_env();
    Ok(())
}

fn setup_logging_env() {
    FmtSubscriber::builder()
        .with_max_level(Level::INFO)
        .with_target(false)
        .with_thread_ids(true)
        .with_file(true)
        .with_line_number(true)
        .pretty()
        .init();
}

fn load_config() -> Result<PadConfig> {
    let path = match std::env::args().nth(1) {
        Some(arg) => PathBuf::from(arg),
        None => PadConfig::default_path()
            .ok_or_else(|| eyre!("no user config directory, pass a config path instead"))?,
    };
    Ok(PadConfig::ensure(&path)?)
}

/// Demo consumer: logs each complete snapshot that has anything pressed,
/// plus periodic throughput stats.
async fn consume_events(mut rx: mpsc::Receiver<PadEvent>) {
    let mut batch: Vec<PadEvent> = Vec::new();
    let mut snapshots: u64 = 0;
    let mut last_stats = Local::now();
    let stats_interval = chrono::Duration::seconds(10);

    while let Some(event) = rx.recv().await {
        match event {
            PadEvent::Sync => {
                snapshots += 1;

                let active: Vec<&PadEvent> = batch
                    .iter()
                    .filter(|event| match event {
                        PadEvent::Key { value, .. } | PadEvent::Axis { value, .. } => *value != 0,
                        PadEvent::Sync => false,
                    })
                    .collect();
                if !active.is_empty() {
                    info!(
                        "snapshot at {}: {:?}",
                        Local::now().format("%H:%M:%S%.3f"),
                        active
                    );
                }
                batch.clear();

                let now = Local::now();
                if now - last_stats > stats_interval {
                    info!(
                        "pad stats: {} snapshots in the last {} seconds",
                        snapshots,
                        stats_interval.num_seconds()
                    );
                    snapshots = 0;
                    last_stats = now;
                }
            }
            other => batch.push(other),
        }
    }
    warn!("event channel closed, consumer exiting");
}
