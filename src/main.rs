// src/main.rs - Device entry point: config, logging, then the event loop
use clap::Parser;

use pipeline_shared::config::{self, ConfigError};
use serial_pipeline::device::{self, Device};

#[derive(Parser, Debug)]
#[command(name = "pipeline-device", version, about = "Relays a serial port to its paired agent")]
struct Args {
    /// Configuration file
    #[arg(default_value = "pipeline.toml")]
    config: String,

    /// Serial port, overriding `uart.port`
    #[arg(long)]
    port: Option<String>,

    /// Agent address, overriding `agent.address`
    #[arg(long)]
    agent: Option<String>,

    /// Echo outbound bytes back instead of connecting to the agent
    #[arg(long)]
    loopback: bool,

    #[arg(long, default_value = "info")]
    log_level: tracing::Level,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync + 'static>> {
    let args = Args::parse();

    tracing_subscriber::fmt()
        .with_max_level(args.log_level)
        .init();

    tracing::info!("Loading configuration from: {}", args.config);
    let mut config = config::load_config(&args.config).map_err(|e| {
        tracing::error!("Failed to load config from '{}': {}", args.config, e);
        Box::new(e) as Box<dyn std::error::Error + Send + Sync + 'static>
    })?;
    if let Some(port) = args.port {
        config.uart.port = port;
    }
    if let Some(agent) = args.agent {
        config.agent.address = agent;
    }
    config.validate().map_err(|e: ConfigError| {
        tracing::error!("Invalid command line override: {}", e);
        Box::new(e) as Box<dyn std::error::Error + Send + Sync + 'static>
    })?;

    let device = Device::start(&config, args.loopback).await.map_err(|e| {
        tracing::error!("Failed to start device: {}", e);
        Box::new(e) as Box<dyn std::error::Error + Send + Sync + 'static>
    })?;
    device::shutdown_on_ctrl_c(device.shutdown_handle());

    let bridge = device.run().await;
    let (_uart, peer, stats) = bridge.into_parts();
    tracing::info!(
        forwarded = stats.bytes_forwarded,
        written = stats.bytes_written,
        ignored = stats.ignored_messages,
        malformed = stats.malformed_payloads,
        send_failures = stats.send_failures,
        write_failures = stats.write_failures,
        "Serial pipeline closed"
    );
    peer.close().await;

    Ok(())
}
