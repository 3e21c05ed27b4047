//! # HTTP Serving
//!
//! Read-only lookup API over [`Orders`]:
//!
//! - `GET /orders/{id}`: the order as JSON, `404` when unknown.
//! - `GET /health`: `{"status":"ok"}`.
//!
//! Each request runs under its own deadline. The server stops accepting
//! connections once the shutdown token fires and lets in-flight requests
//! finish.

use crate::context::RequestContext;
use crate::error::OrderError;
use crate::model::{Order, OrderUid};
use crate::service::Orders;
use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use serde::Serialize;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, instrument};

/// Default per-request deadline.
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(60);

/// Fatal failures of the serving task.
#[derive(Debug, Error)]
pub enum HttpError {
    #[error("Failed to bind {addr}: {source}")]
    Bind {
        addr: String,
        #[source]
        source: std::io::Error,
    },

    #[error("HTTP server error: {0}")]
    Serve(#[from] std::io::Error),
}

/// State shared by every handler.
#[derive(Clone)]
pub struct HttpState {
    pub orders: Arc<dyn Orders>,
    pub request_timeout: Duration,
}

impl HttpState {
    pub fn new(orders: Arc<dyn Orders>, request_timeout: Duration) -> Self {
        Self {
            orders,
            request_timeout,
        }
    }
}

pub fn router(state: HttpState) -> Router {
    Router::new()
        .route("/orders/{id}", get(get_order))
        .route("/health", get(health))
        .with_state(state)
}

/// Binds the listening socket. Failure here is fatal for the serving task.
pub async fn bind(addr: &str) -> Result<TcpListener, HttpError> {
    TcpListener::bind(addr).await.map_err(|source| HttpError::Bind {
        addr: addr.to_string(),
        source,
    })
}

/// Where the serving task listens: an address it binds itself, or a socket
/// bound beforehand.
#[derive(Debug)]
pub enum HttpBinding {
    Addr(String),
    Listener(TcpListener),
}

impl HttpBinding {
    pub async fn into_listener(self) -> Result<TcpListener, HttpError> {
        match self {
            HttpBinding::Addr(addr) => bind(&addr).await,
            HttpBinding::Listener(listener) => Ok(listener),
        }
    }
}

/// Serves until `token` is cancelled, then drains in-flight requests.
pub async fn serve(listener: TcpListener, state: HttpState, token: CancellationToken) -> Result<(), HttpError> {
    let local: Option<SocketAddr> = listener.local_addr().ok();
    info!(addr = ?local, "HTTP server listening");

    axum::serve(listener, router(state))
        .with_graceful_shutdown(token.cancelled_owned())
        .await?;

    info!("HTTP server stopped");
    Ok(())
}

#[instrument(skip(state))]
async fn get_order(State(state): State<HttpState>, Path(id): Path<String>) -> Result<Json<Arc<Order>>, ApiError> {
    let ctx = RequestContext::background().with_timeout(state.request_timeout);
    let uid = OrderUid::from(id);

    let lookup = state.orders.get_order_by_id(&ctx, &uid);
    let order = match tokio::time::timeout(state.request_timeout, lookup).await {
        Ok(result) => result?,
        Err(_) => return Err(OrderError::DeadlineExceeded.into()),
    };
    Ok(Json(order))
}

async fn health() -> Json<serde_json::Value> {
    Json(serde_json::json!({ "status": "ok" }))
}

/// Maps core errors onto status codes.
#[derive(Debug)]
pub struct ApiError(OrderError);

impl From<OrderError> for ApiError {
    fn from(e: OrderError) -> Self {
        Self(e)
    }
}

#[derive(Serialize)]
struct ErrorBody {
    code: u16,
    message: String,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self.0 {
            OrderError::NotFound(_) => StatusCode::NOT_FOUND,
            OrderError::DeadlineExceeded => StatusCode::GATEWAY_TIMEOUT,
            OrderError::Canceled => StatusCode::SERVICE_UNAVAILABLE,
            OrderError::Storage(_) | OrderError::Cache(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };

        if status == StatusCode::NOT_FOUND {
            debug!(error = %self.0, "Lookup miss");
        } else {
            error!(error = %self.0, status = status.as_u16(), "Lookup failed");
        }

        let message = match &self.0 {
            OrderError::Storage(_) | OrderError::Cache(_) => "Internal error".to_string(),
            other => other.to_string(),
        };
        let body = serde_json::json!({
            "error": ErrorBody {
                code: status.as_u16(),
                message,
            }
        });
        (status, Json(body)).into_response()
    }
}
