//! buzzd - Buzzer Daemon
//!
//! Serves the social-feed kernel over WebSocket.

use anyhow::Context;
use buzzd::config::{Config, LogFormat, validation};
use buzzd::kernel::Kernel;
use buzzd::network::Gateway;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load configuration
    let config_path = std::env::args().nth(1);
    let config = match &config_path {
        Some(path) => Config::load(path),
        None => Config::load_or_default("config.toml"),
    }
    .with_context(|| {
        format!(
            "failed to load config from {}",
            config_path.as_deref().unwrap_or("config.toml")
        )
    })?;

    // Initialize tracing
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    match config.log.format {
        LogFormat::Pretty => tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(true)
            .init(),
        LogFormat::Json => tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter)
            .with_target(true)
            .init(),
    }

    if let Err(errors) = validation::validate(&config) {
        for e in &errors {
            error!(error = %e, "Invalid configuration");
        }
        anyhow::bail!("{} configuration error(s)", errors.len());
    }

    info!(
        server = %config.server.name,
        listen = %config.listen.address,
        actors = config.server.actors,
        "Starting buzzd"
    );

    let shutdown = CancellationToken::new();

    // Metrics
    buzzd::metrics::init();
    if config.server.metrics_port != 0 {
        tokio::spawn(buzzd::http::run_http_server(
            config.server.metrics_port,
            shutdown.clone(),
        ));
    }

    let (kernel, kernel_task) = Kernel::spawn(&config.kernel);

    if config.server.actors > 0 {
        buzzd::simulate::spawn_actors(kernel.clone(), config.server.actors);
        info!(count = config.server.actors, "Simulated actors started");
    }

    let gateway = Gateway::bind(config.listen.clone(), kernel.clone()).await?;
    let gateway_task = tokio::spawn(gateway.run(shutdown.clone()));

    tokio::signal::ctrl_c().await?;
    info!("Shutdown requested");

    shutdown.cancel();
    kernel.shutdown();
    if let Err(e) = kernel_task.await {
        error!(error = %e, "Kernel task failed");
    }
    match gateway_task.await {
        Ok(Err(e)) => error!(error = %e, "Gateway failed"),
        Err(e) => error!(error = %e, "Gateway task failed"),
        Ok(Ok(())) => {}
    }

    info!("buzzd stopped");
    Ok(())
}
