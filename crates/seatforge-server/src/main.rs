//! `seatforge-server`: runs a Seatforge server on a named registration pipe.
//!
//! ```text
//! seatforge-server <register_pipe> [delay_us] [--workers N] [--queue-capacity N] [--dump-format text|json]
//! ```
//!
//! SIGINT or SIGTERM stops the server. SIGUSR1 writes every event to
//! standard output.

use std::path::PathBuf;
use std::time::Duration;

use clap::Parser;
use seatforge::prelude::*;
use tokio::signal::unix::{SignalKind, signal};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser, Debug)]
#[command(name = "seatforge-server")]
#[command(version, about, long_about = None)]
struct Args {
    /// Path of the registration pipe to create and listen on.
    register_pipe: PathBuf,

    /// Artificial delay, in microseconds, added to every event lookup.
    #[arg(default_value_t = 0)]
    delay_us: u64,

    /// Number of sessions served at once.
    #[arg(long, default_value_t = ServerConfig::default().workers)]
    workers: usize,

    /// Registered clients that may wait for a worker.
    #[arg(long, default_value_t = ServerConfig::default().queue_capacity)]
    queue_capacity: usize,

    /// How SIGUSR1 dumps are rendered: `text` or `json`.
    #[arg(long, default_value = "text")]
    dump_format: DumpFormat,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let args = Args::parse();

    let transport = FifoTransport::bind(&args.register_pipe).await?;
    let server = SeatforgeServerBuilder::new()
        .workers(args.workers)
        .queue_capacity(args.queue_capacity)
        .access_delay(Duration::from_micros(args.delay_us))
        .dump_format(args.dump_format)
        .build(transport)?;

    let mut dump_requests = signal(SignalKind::user_defined1())?;
    let trigger = server.dump_trigger();
    tokio::spawn(async move {
        while dump_requests.recv().await.is_some() {
            trigger.request();
        }
    });

    let mut sigterm = signal(SignalKind::terminate())?;
    let mut sigint = signal(SignalKind::interrupt())?;
    let shutdown = async move {
        tokio::select! {
            _ = sigint.recv() => tracing::info!("received SIGINT, shutting down"),
            _ = sigterm.recv() => tracing::info!("received SIGTERM, shutting down"),
        }
    };

    let store = server.store();
    server.run_until(shutdown).await?;
    tracing::info!(events = store.len().await, "server stopped");
    Ok(())
}
