//! HTTP API
//!
//! - `POST /couchdb?name=<cluster>` creates a cluster and wires its mesh
//! - `DELETE /couchdb/:cluster_id` tears a cluster down
//! - `GET /health` liveness

use super::tracing_middleware::request_tracing_middleware;
use crate::cluster::{ClusterDescriptor, LifecycleController};
use crate::common::{ClusterDefaults, Error, Result};
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    middleware,
    response::{IntoResponse, Response},
    routing::{delete, get, post},
    Json, Router,
};
use serde::Deserialize;
use serde_json::json;
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::trace::TraceLayer;

pub const MISSING_NAME_ERROR: &str = "Cluster name must be passed via query params";

#[derive(Clone)]
pub struct ApiState {
    pub controller: Arc<LifecycleController>,
    pub defaults: Arc<ClusterDefaults>,
}

#[derive(Debug, Deserialize)]
struct CreateParams {
    name: Option<String>,
}

fn error_response(err: &Error) -> Response {
    (
        err.to_http_status(),
        Json(json!({ "error": err.to_string() })),
    )
        .into_response()
}

async fn create_cluster(
    State(state): State<ApiState>,
    Query(params): Query<CreateParams>,
) -> Response {
    let Some(name) = params.name.filter(|n| !n.trim().is_empty()) else {
        return (
            StatusCode::BAD_REQUEST,
            Json(json!({ "error": MISSING_NAME_ERROR })),
        )
            .into_response();
    };

    let descriptor = match ClusterDescriptor::for_create(&name, &state.defaults) {
        Ok(descriptor) => descriptor,
        Err(e) => return error_response(&e),
    };

    match state.controller.create(&descriptor).await {
        Ok(_) => Json(json!({ "status": "Creating" })).into_response(),
        Err(e) => error_response(&e),
    }
}

async fn delete_cluster(
    State(state): State<ApiState>,
    Path(cluster_id): Path<String>,
) -> Response {
    let descriptor = match ClusterDescriptor::for_teardown(&cluster_id) {
        Ok(descriptor) => descriptor,
        Err(e) => return error_response(&e),
    };

    match state.controller.delete(descriptor.namespace()).await {
        Ok(()) => Json(json!({ "status": "Deleting" })).into_response(),
        Err(e) => error_response(&e),
    }
}

async fn health() -> impl IntoResponse {
    Json(json!({ "status": "ok", "version": crate::VERSION }))
}

pub fn create_router(state: ApiState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/couchdb", post(create_cluster))
        .route("/couchdb/:cluster_id", delete(delete_cluster))
        .layer(middleware::from_fn(request_tracing_middleware))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Serve the API until Ctrl-C
pub async fn serve(bind_addr: SocketAddr, state: ApiState) -> Result<()> {
    let listener = tokio::net::TcpListener::bind(bind_addr).await?;
    tracing::info!("API listening on {}", bind_addr);

    axum::serve(listener, create_router(state))
        .with_graceful_shutdown(async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                tracing::error!("Failed to listen for shutdown signal: {}", e);
            }
            tracing::info!("Shutting down");
        })
        .await?;

    Ok(())
}
