//! XTouch Banks
//!
//! Bank-switching fader memory for the Behringer X-Touch.

use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, trace, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use xtouch_banks::config::AppConfig;
use xtouch_banks::osc::OscMirror;
use xtouch_banks::paths;
use xtouch_banks::router::{Heartbeat, MirrorCommand, Outbound, Router};
use xtouch_banks::state::{BankRegistry, PersistenceActor, PersistenceActorHandle};
use xtouch_banks::xtouch::{discovery, XTouchDriver};

/// XTouch Banks - six banks of motorized fader memory for the X-Touch
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to configuration file
    #[arg(short, long, default_value = "config.yaml")]
    config: String,

    /// Log level (error, warn, info, debug, trace)
    #[arg(short, long, env = "LOG_LEVEL", default_value = "info")]
    log_level: String,

    /// List available MIDI ports
    #[arg(long)]
    list_ports: bool,

    /// Path of the bank snapshot (overrides the config file)
    #[arg(long, env = "XTOUCH_BANKS_STATE")]
    state: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    let args = Args::parse();

    init_logging(&args.log_level)?;

    info!("Starting XTouch Banks...");
    info!("Configuration file: {}", args.config);

    let config = AppConfig::load_or_default(&args.config).await?;

    if args.list_ports {
        discovery::print_ports(&config.midi);
        return Ok(());
    }

    let state_path =
        paths::resolve_state_path(args.state.as_deref(), config.persistence.path.as_deref());
    info!("Bank snapshot: {}", state_path.display());

    let persistence = PersistenceActor::spawn(state_path);
    let registry = match persistence.load_snapshot().await {
        Ok(Some(snapshot)) => {
            info!("Restored {} banks from snapshot", snapshot.banks.len());
            BankRegistry::from_snapshot(config.layout.clone(), &snapshot)
        }
        Ok(None) => {
            info!("No snapshot yet, starting with all faders at zero");
            BankRegistry::new(config.layout.clone())
        }
        Err(e) => {
            warn!("Failed to load snapshot, starting fresh: {:#}", e);
            BankRegistry::new(config.layout.clone())
        }
    };

    let router = Router::new(registry);
    info!("Router initialized");

    run_app(router, config, persistence).await?;

    info!("XTouch Banks shutdown complete");
    Ok(())
}

async fn run_app(
    mut router: Router,
    config: AppConfig,
    persistence: PersistenceActorHandle,
) -> Result<()> {
    let mut xtouch = XTouchDriver::new(&config.midi);
    xtouch.connect().await.context("Failed to connect to X-Touch")?;

    let mut xtouch_rx = xtouch
        .take_event_receiver()
        .ok_or_else(|| anyhow::anyhow!("Failed to get X-Touch event receiver"))?;

    let mirror = if config.osc.enabled {
        Some(OscMirror::bind(&config.osc.listen, &config.osc.target).await?)
    } else {
        info!("OSC mirror disabled");
        None
    };
    let mut mirror_rx = mirror.as_ref().map(OscMirror::spawn_listener);

    deliver(router.startup_sync(), &xtouch, mirror.as_ref()).await;
    info!("Surface synchronized with bank {}", router.registry().active() + 1);

    let mut save_tick = tokio::time::interval(Duration::from_millis(
        config.persistence.save_interval_ms.max(1),
    ));
    save_tick.set_missed_tick_behavior(MissedTickBehavior::Delay);

    let mut heartbeat = Heartbeat::new(router.registry().layout());
    let mut heartbeat_tick =
        tokio::time::interval(Duration::from_millis(config.heartbeat.interval_ms.max(1)));
    heartbeat_tick.set_missed_tick_behavior(MissedTickBehavior::Delay);

    info!("Ready to process MIDI events!");

    let shutdown = shutdown_signal();
    tokio::pin!(shutdown);

    loop {
        tokio::select! {
            Some(event) = xtouch_rx.recv() => {
                trace!("Received X-Touch event: t={}us raw={:02X?}", event.timestamp, event.raw_data);
                let out = router.on_midi_from_xtouch(&event.raw_data);
                deliver(out, &xtouch, mirror.as_ref()).await;
            }

            Some(command) = next_mirror_command(&mut mirror_rx) => {
                debug!("Remote command: {:?}", command);
                let out = router.on_mirror_command(command);
                deliver(out, &xtouch, mirror.as_ref()).await;
            }

            _ = save_tick.tick() => {
                if let Err(e) = persistence.save_snapshot(router.snapshot()).await {
                    warn!("Failed to queue snapshot: {}", e);
                }
            }

            _ = heartbeat_tick.tick(), if config.heartbeat.enabled => {
                let message = heartbeat.tick();
                if let Err(e) = xtouch.send(&message).await {
                    debug!("Heartbeat send failed: {}", e);
                }
            }

            _ = &mut shutdown => {
                info!("Shutdown signal received, stopping event loop");
                break;
            }
        }
    }

    info!("Shutting down...");
    if let Err(e) = persistence.save_snapshot(router.snapshot()).await {
        warn!("Failed to queue final snapshot: {}", e);
    }
    match persistence.flush().await {
        Ok(()) => info!("Bank snapshot saved"),
        Err(e) => warn!("Failed to save bank snapshot: {:#}", e),
    }
    persistence.shutdown();
    xtouch.disconnect();

    Ok(())
}

/// Send router output in order; a failed send never stops the loop
async fn deliver(out: Vec<Outbound>, xtouch: &XTouchDriver, mirror: Option<&OscMirror>) {
    for message in out {
        match message {
            Outbound::Surface(message) => {
                if let Err(e) = xtouch.send(&message).await {
                    warn!("Failed to send to X-Touch: {}", e);
                }
            }
            Outbound::Mirror(message) => {
                let Some(mirror) = mirror else {
                    continue;
                };
                if let Err(e) = mirror.send(&message).await {
                    warn!("Failed to send to OSC mirror: {}", e);
                }
            }
        }
    }
}

/// Next remote command, or never when the mirror is disabled
async fn next_mirror_command(
    rx: &mut Option<mpsc::Receiver<MirrorCommand>>,
) -> Option<MirrorCommand> {
    match rx {
        Some(rx) => rx.recv().await,
        None => std::future::pending().await,
    }
}

fn init_logging(level: &str) -> Result<()> {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(level));

    tracing_subscriber::registry()
        .with(filter)
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(false)
                .with_thread_ids(false)
                .with_thread_names(false),
        )
        .init();

    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!("Failed to install CTRL+C handler: {}", e);
        std::future::pending::<()>().await;
    }
}
