//! Transcode worker binary.

use std::sync::Arc;

use tokio::sync::watch;
use tracing::{error, info, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use transcode_media::FfmpegRunner;
use transcode_queue::SqsQueueClient;
use transcode_storage::S3Store;
use transcode_worker::metrics::init_metrics;
use transcode_worker::{load_presets, IntervalTrigger, TranscodeHandler, Worker, WorkerConfig};

#[tokio::main]
async fn main() {
    // Load environment variables
    dotenvy::dotenv().ok();

    // Initialize tracing with colored output for dev, JSON for production
    let use_json = std::env::var("LOG_FORMAT")
        .map(|v| v.to_lowercase() == "json")
        .unwrap_or(false);

    let env_filter = EnvFilter::from_default_env()
        .add_directive("transcode=info".parse().expect("valid directive"))
        .add_directive("aws_smithy_runtime=warn".parse().expect("valid directive"))
        .add_directive("aws_config=warn".parse().expect("valid directive"));

    if use_json {
        tracing_subscriber::registry()
            .with(fmt::layer().json())
            .with(env_filter)
            .init();
    } else {
        tracing_subscriber::registry()
            .with(fmt::layer().with_ansi(true).with_target(true))
            .with(env_filter)
            .init();
    }

    info!("Starting transcode-worker");

    let config = match WorkerConfig::from_env() {
        Ok(c) => c,
        Err(e) => {
            error!("Invalid configuration: {}", e);
            std::process::exit(1);
        }
    };
    info!("Worker config: {:?}", config);

    if let Some(addr) = config.metrics_addr {
        if let Err(e) = init_metrics(addr) {
            error!("Failed to start metrics exporter: {}", e);
            std::process::exit(1);
        }
        info!(%addr, "Metrics exporter listening");
    }

    let presets = match load_presets(config.presets_file.as_deref()) {
        Ok(p) => p,
        Err(e) => {
            error!("Failed to load presets: {}", e);
            std::process::exit(1);
        }
    };

    let binding = match config.binding() {
        Ok(b) => b,
        Err(e) => {
            error!("Invalid queue binding: {}", e);
            std::process::exit(1);
        }
    };

    let queue = match SqsQueueClient::connect(&binding, config.credentials.clone()).await {
        Ok(q) => q,
        Err(e) => {
            error!("Failed to create queue client: {}", e);
            std::process::exit(1);
        }
    };

    let store = match S3Store::new(config.s3_config()).await {
        Ok(s) => s,
        Err(e) => {
            error!("Failed to create S3 client: {}", e);
            std::process::exit(1);
        }
    };

    let handler = TranscodeHandler::new(
        Arc::new(store),
        presets,
        FfmpegRunner::new().with_timeout(config.ffmpeg_timeout),
        &config.work_dir,
    );

    info!(
        presets = ?handler.presets().names().collect::<Vec<_>>(),
        work_dir = %config.work_dir,
        "Transcode handler ready"
    );

    let worker = Worker::new(binding, queue, handler, config.worker_settings());

    // Setup signal handler
    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    tokio::spawn(async move {
        tokio::signal::ctrl_c().await.ok();
        info!("Received shutdown signal");
        shutdown_tx.send(true).ok();
    });

    IntervalTrigger::new(config.poll_interval)
        .run(&worker, shutdown_rx)
        .await;

    info!(
        in_flight = worker.in_flight(),
        timeout = ?config.shutdown_timeout,
        "Waiting for in-flight messages"
    );
    if !worker.wait_idle(config.shutdown_timeout).await {
        warn!(
            in_flight = worker.in_flight(),
            "Shutdown timeout reached; unfinished messages will be redelivered"
        );
    }

    info!("Worker shutdown complete");
}
