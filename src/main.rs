use anyhow::{Context, Result};
use dotenv::dotenv;
use tokio::io::{AsyncBufReadExt, BufReader, Lines, Stdin};
use tokio::time::Duration;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use std::sync::Arc;

use tick_fanout::config::{Config, Endpoints};
use tick_fanout::feed::WsFeed;
use tick_fanout::report;
use tick_fanout::signals::ShutdownSignals;
use tick_fanout::snapshot::{JsonChartRenderer, SnapshotWriter};
use tick_fanout::state::{PriceHistory, ShutdownCoordinator};
use tick_fanout::subscription::parse_specs;
use tick_fanout::{Observer, PriceObserver, Subject};

#[tokio::main]
async fn main() -> Result<()> {
    // Basic logging: set RUST_LOG=info (or debug) to see output.
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    // Before anything else, so a signal at the prompt still drains.
    let mut signals = ShutdownSignals::install()?;

    dotenv().ok();

    // Everything fatal happens before the feeds are opened.
    let cfg = Config::from_env()?;
    let endpoints = Endpoints::load(&cfg.endpoints_file)?;

    let shutdown = Arc::new(ShutdownCoordinator::new());
    let history = Arc::new(PriceHistory::new());

    let mut stdin = BufReader::new(tokio::io::stdin()).lines();
    let raw_spec = match cfg.subscribers.clone() {
        Some(s) => s,
        None => {
            println!("Please specify the observers and their preferences in the format as done in this example:");
            println!("observer1,BTC,ETH,ADA; observer2,BTC,ETH; observer3,ETH,ADA;");
            tokio::select! {
                line = stdin.next_line() => line
                    .context("reading subscriber spec from stdin")?
                    .unwrap_or_default(),
                _ = signals.recv() => {
                    info!("stopped before any feed was opened");
                    drain(&shutdown).await;
                    info!("clean shutdown complete");
                    return Ok(());
                }
            }
        }
    };
    let specs = parse_specs(&raw_spec).context("parsing subscriber spec")?;
    if specs.is_empty() {
        warn!("no subscribers configured; prices are cached but nothing is persisted");
    }

    let writer = SnapshotWriter::new(
        history.clone(),
        shutdown.clone(),
        Arc::new(JsonChartRenderer),
        cfg.results_dir.clone(),
        cfg.write_workers,
    );

    let subject = Arc::new(
        Subject::new(endpoints)
            .with_reconnect_backoff(Duration::from_millis(cfg.reconnect_backoff_ms)),
    );
    for spec in specs {
        let observer = PriceObserver::from_spec(spec, writer.clone());
        info!(
            observer = %observer.id(),
            assets = ?observer.subscriptions(),
            "subscriber configured"
        );
        subject.attach(Arc::new(observer)).await;
    }

    // Ingestion task
    let ingest = {
        let subject = subject.clone();
        tokio::spawn(async move {
            subject.start_listening(Arc::new(WsFeed)).await;
        })
    };

    println!("Press Enter to exit...");
    tokio::select! {
        _ = signals.recv() => {}
        _ = wait_for_enter(&mut stdin) => {}
    }

    drain(&shutdown).await;

    ingest.abort();
    report::log_summary(&subject, &history, shutdown.snapshot()).await;
    info!("clean shutdown complete");
    Ok(())
}

async fn drain(shutdown: &ShutdownCoordinator) {
    shutdown.request_shutdown();
    info!(active_ops = shutdown.active_ops(), "waiting for snapshot writes to complete");
    shutdown.wait_for_drain().await;
}

// Without an interactive stdin (EOF right away) only signals end the run.
async fn wait_for_enter(stdin: &mut Lines<BufReader<Stdin>>) {
    match stdin.next_line().await {
        Ok(Some(_)) => info!("exit requested from stdin"),
        _ => std::future::pending::<()>().await,
    }
}
