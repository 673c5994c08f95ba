// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

use anyhow::Result;
use axum::http::StatusCode;
use axum::routing::get;
use axum::Router;
use clap::Parser;
use futures::StreamExt;
use k8s_openapi::api::apps::v1::{Deployment, StatefulSet};
use kube::{
    runtime::{controller::Action, watcher::Config, Controller},
    Api, Client, ResourceExt,
};
use oidc_gate::{
    config::{Args, OperatorConfig},
    constants::{
        ERROR_REQUEUE_DURATION_SECS, HEALTH_SERVER_PATH, METRICS_SERVER_PATH,
        RESYNC_REQUEUE_DURATION_SECS, TOKIO_WORKER_THREADS,
    },
    labels::ANNOTATION_HOST,
    metrics::{gather_metrics, record_reconciliation_error, record_reconciliation_success},
    reconcilers::{reconcile_deployment_dependencies, reconcile_statefulset_dependencies},
};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, error, info};

#[derive(Debug, thiserror::Error)]
#[error(transparent)]
struct ReconcileError(#[from] anyhow::Error);

/// Shared context handed to every reconcile wrapper.
struct Ctx {
    client: Client,
    config: OperatorConfig,
}

fn main() -> Result<()> {
    // Build Tokio runtime with custom thread names
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .worker_threads(TOKIO_WORKER_THREADS)
        .thread_name("oidc-gate-controller")
        .enable_all()
        .build()?;

    runtime.block_on(async_main())
}

async fn async_main() -> Result<()> {
    // Initialize logging with custom format
    // Format: timestamp file:line LEVEL message
    //
    // Respects RUST_LOG environment variable if set, otherwise defaults to INFO level
    // Example: RUST_LOG=debug cargo run
    //
    // Respects RUST_LOG_FORMAT environment variable for output format
    // Example: RUST_LOG_FORMAT=json cargo run
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));

    let log_format = std::env::var("RUST_LOG_FORMAT").unwrap_or_else(|_| "text".to_string());

    match log_format.to_lowercase().as_str() {
        "json" => {
            tracing_subscriber::fmt()
                .with_env_filter(env_filter)
                .with_file(true)
                .with_line_number(true)
                .with_thread_names(true)
                .with_target(false)
                .json()
                .init();
        }
        _ => {
            tracing_subscriber::fmt()
                .with_env_filter(env_filter)
                .with_file(true)
                .with_line_number(true)
                .with_thread_names(true)
                .with_target(false)
                .with_ansi(true)
                .compact()
                .init();
        }
    }

    let args = Args::parse();
    let config = args.to_operator_config();

    info!("Starting OIDC Gate controller");
    if config.is_multi_tenant() {
        info!("Running in multi-tenant topology");
    }

    debug!("Initializing Kubernetes client");
    let client = Client::try_default().await?;
    debug!("Kubernetes client initialized successfully");

    let metrics_addr: SocketAddr = args.metrics_addr.parse()?;

    info!("Starting all controllers");

    // Controllers should never exit - if one does, we log it and exit the main process
    tokio::select! {
        result = run_deployment_controller(client.clone(), config.clone()) => {
            error!("CRITICAL: Deployment controller exited unexpectedly: {:?}", result);
            result?;
            anyhow::bail!("Deployment controller exited unexpectedly without error")
        }
        result = run_statefulset_controller(client.clone(), config.clone()) => {
            error!("CRITICAL: StatefulSet controller exited unexpectedly: {:?}", result);
            result?;
            anyhow::bail!("StatefulSet controller exited unexpectedly without error")
        }
        result = serve_observability(metrics_addr) => {
            error!("CRITICAL: metrics server exited unexpectedly: {:?}", result);
            result?;
            anyhow::bail!("metrics server exited unexpectedly without error")
        }
    }
}

/// Serve the `/metrics` and `/healthz` endpoints.
async fn serve_observability(addr: SocketAddr) -> Result<()> {
    info!("Serving metrics on {addr}{METRICS_SERVER_PATH}");

    let app = Router::new()
        .route(METRICS_SERVER_PATH, get(metrics_handler))
        .route(HEALTH_SERVER_PATH, get(|| async { "ok" }));

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

async fn metrics_handler() -> (StatusCode, String) {
    match gather_metrics() {
        Ok(body) => (StatusCode::OK, body),
        Err(e) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            format!("failed to encode metrics: {e}"),
        ),
    }
}

/// Run the `Deployment` controller
async fn run_deployment_controller(client: Client, config: OperatorConfig) -> Result<()> {
    info!("Starting Deployment controller");

    let api = Api::<Deployment>::all(client.clone());

    Controller::new(api, Config::default())
        .run(
            reconcile_deployment_wrapper,
            error_policy,
            Arc::new(Ctx { client, config }),
        )
        .for_each(|_| futures::future::ready(()))
        .await;

    Ok(())
}

/// Run the `StatefulSet` controller
async fn run_statefulset_controller(client: Client, config: OperatorConfig) -> Result<()> {
    info!("Starting StatefulSet controller");

    let api = Api::<StatefulSet>::all(client.clone());

    Controller::new(api, Config::default())
        .run(
            reconcile_statefulset_wrapper,
            error_policy,
            Arc::new(Ctx { client, config }),
        )
        .for_each(|_| futures::future::ready(()))
        .await;

    Ok(())
}

/// Whether the workload was marked for sidecar injection by the admission
/// webhook. Workloads without the host annotation are ignored.
fn is_eligible(annotations: Option<&std::collections::BTreeMap<String, String>>) -> bool {
    annotations.is_some_and(|a| a.contains_key(ANNOTATION_HOST))
}

/// Reconcile wrapper for `Deployment`
async fn reconcile_deployment_wrapper(
    deployment: Arc<Deployment>,
    ctx: Arc<Ctx>,
) -> Result<Action, ReconcileError> {
    if !is_eligible(deployment.metadata.annotations.as_ref()) {
        debug!(
            deployment = %deployment.name_any(),
            namespace = ?deployment.namespace(),
            "Deployment not marked for sidecar injection, ignoring"
        );
        return Ok(Action::await_change());
    }

    let start = Instant::now();
    match reconcile_deployment_dependencies(&ctx.client, &ctx.config, &deployment).await {
        Ok(()) => {
            record_reconciliation_success("Deployment", start.elapsed());
            info!(
                "Successfully reconciled Deployment dependencies: {}",
                deployment.name_any()
            );
            Ok(Action::requeue(Duration::from_secs(
                RESYNC_REQUEUE_DURATION_SECS,
            )))
        }
        Err(e) => {
            record_reconciliation_error("Deployment", start.elapsed());
            error!("Failed to reconcile Deployment dependencies: {}", e);
            Err(e.into())
        }
    }
}

/// Reconcile wrapper for `StatefulSet`
async fn reconcile_statefulset_wrapper(
    statefulset: Arc<StatefulSet>,
    ctx: Arc<Ctx>,
) -> Result<Action, ReconcileError> {
    if !is_eligible(statefulset.metadata.annotations.as_ref()) {
        debug!(
            statefulset = %statefulset.name_any(),
            namespace = ?statefulset.namespace(),
            "StatefulSet not marked for sidecar injection, ignoring"
        );
        return Ok(Action::await_change());
    }

    let start = Instant::now();
    match reconcile_statefulset_dependencies(&ctx.client, &ctx.config, &statefulset).await {
        Ok(()) => {
            record_reconciliation_success("StatefulSet", start.elapsed());
            info!(
                "Successfully reconciled StatefulSet dependencies: {}",
                statefulset.name_any()
            );
            Ok(Action::requeue(Duration::from_secs(
                RESYNC_REQUEUE_DURATION_SECS,
            )))
        }
        Err(e) => {
            record_reconciliation_error("StatefulSet", start.elapsed());
            error!("Failed to reconcile StatefulSet dependencies: {}", e);
            Err(e.into())
        }
    }
}

/// Error policy for controllers
fn error_policy(
    _resource: Arc<impl std::fmt::Debug>,
    _err: &ReconcileError,
    _ctx: Arc<Ctx>,
) -> Action {
    Action::requeue(Duration::from_secs(ERROR_REQUEUE_DURATION_SECS))
}
