use crate::app::Cli;
use crate::config::{load_service_config, ConfigError, ServiceConfig};
use crate::discovery::{Broadcaster, MdnsBroadcaster, NoopBroadcaster};
use crate::engine::InvocationEngine;
use crate::server::{self, AppState};
use anyhow::Context;
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::{info, warn};

pub fn prepare_config(cli: &Cli) -> Result<ServiceConfig, ConfigError> {
    let mut config = load_service_config(&cli.config)?;
    if let Some(port) = cli.port {
        config.service.port = port;
    }
    if config.uses_placeholder_api_key() {
        warn!("using the placeholder api key; change `service.api_key` in the config file");
    }
    Ok(config)
}

pub async fn run(cli: Cli) -> anyhow::Result<()> {
    let config = prepare_config(&cli)
        .with_context(|| format!("failed to load config from {}", cli.config.display()))?;
    let ServiceConfig { service, functions } = config;
    let port = service.port;

    let listener = TcpListener::bind(("0.0.0.0", port))
        .await
        .with_context(|| format!("failed to bind port {port}"))?;
    info!(
        service = %service.name,
        port,
        functions = functions.len(),
        "starting server"
    );

    let mut broadcaster: Box<dyn Broadcaster> = if cli.no_discovery {
        Box::new(NoopBroadcaster)
    } else {
        Box::new(MdnsBroadcaster::new())
    };
    if let Err(err) = broadcaster.advertise(&service.name, port) {
        warn!(error = %err, "failed to register mdns service");
    }

    let state = Arc::new(AppState::new(service, InvocationEngine::new(functions)));
    let served = server::serve(listener, state, shutdown_signal()).await;

    if let Err(err) = broadcaster.withdraw() {
        warn!(error = %err, "failed to unregister mdns service");
    }
    info!("server stopped");
    served.context("http server failed")
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(err) = tokio::signal::ctrl_c().await {
            warn!(error = %err, "failed to listen for ctrl-c");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(err) => {
                warn!(error = %err, "failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };
    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
    info!("shutdown requested");
}
