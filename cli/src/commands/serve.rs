// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! `testgen serve`: run the HTTP API with graceful shutdown

use anyhow::{Context, Result};
use metrics_exporter_prometheus::PrometheusBuilder;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::signal;
use tracing::{info, warn};

use testgen_core::application::modules::build_registry;
use testgen_core::domain::service_config::ServiceConfigManifest;
use testgen_core::infrastructure::build_services;
use testgen_core::presentation::api::{app, AppState};

use super::Overrides;

pub async fn run(overrides: Overrides) -> Result<()> {
    let config = overrides.load_config()?;
    info!(
        name = %config.metadata.name,
        host = %config.spec.server.host,
        port = config.spec.server.port,
        "Starting test case generation service"
    );

    install_metrics_exporter(&config)?;

    let built = build_services(&config).context("Failed to initialize service adapters")?;
    let modules = build_registry(&built.registry).context("Failed to register business modules")?;
    info!(modules = modules.len(), "Module registry ready");

    let state = Arc::new(AppState::new(built.registry, modules));
    let router = app(state);

    let addr = format!("{}:{}", config.spec.server.host, config.spec.server.port);
    let listener = TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind to {}", addr))?;

    info!("HTTP API listening on {}", addr);

    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("HTTP server failed")?;

    info!("Service shut down");
    Ok(())
}

fn install_metrics_exporter(config: &ServiceConfigManifest) -> Result<()> {
    let Some(metrics) = config
        .spec
        .observability
        .as_ref()
        .and_then(|o| o.metrics.as_ref())
        .filter(|m| m.enabled)
    else {
        return Ok(());
    };

    let addr: SocketAddr = format!("{}:{}", config.spec.server.host, metrics.port)
        .parse()
        .with_context(|| format!("Invalid metrics listen address on port {}", metrics.port))?;
    PrometheusBuilder::new()
        .with_http_listener(addr)
        .install()
        .context("Failed to install Prometheus exporter")?;

    info!("Prometheus metrics exposed on {}", addr);
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            warn!("Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                warn!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C signal");
        },
        _ = terminate => {
            info!("Received SIGTERM signal");
        },
    }
}
