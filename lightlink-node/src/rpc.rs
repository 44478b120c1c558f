// src/rpc.rs

//! HTTP call bridge using Axum.
//!
//! Resolved calls answer `200` with `[bool]`; rejected calls answer an
//! error status with `{ "code", "message" }`. `GET /events` streams
//! `NewHead` events as server-sent events.

use crate::bridge::{Bridge, BridgeStatus};
use crate::errors::BridgeError;
use axum::{
    body::Bytes,
    extract::State,
    http::StatusCode,
    response::{
        sse::{Event, KeepAlive, Sse},
        IntoResponse, Response,
    },
    routing::{get, post},
    Json, Router,
};
use futures_util::Stream;
use serde::Serialize;
use std::convert::Infallible;
use std::net::SocketAddr;
use std::sync::Arc;
use tracing::warn;

/// RPC server state
#[derive(Clone)]
pub struct RpcState {
    /// Bridge the calls are made against
    pub bridge: Arc<Bridge>,
}

/// RPC server
pub struct RpcServer {
    /// Listen address
    listen_addr: SocketAddr,

    /// Server state
    state: RpcState,
}

impl RpcServer {
    /// Creates a new RPC server
    pub fn new(listen_addr: SocketAddr, bridge: Arc<Bridge>) -> Self {
        Self {
            listen_addr,
            state: RpcState { bridge },
        }
    }

    /// Starts the RPC server
    pub async fn start(self) -> std::io::Result<()> {
        let app = router(self.state.bridge);
        let listener = tokio::net::TcpListener::bind(self.listen_addr).await?;

        tracing::info!("RPC server listening on {}", self.listen_addr);

        axum::serve(listener, app).await
    }
}

/// Routes of the call bridge
pub fn router(bridge: Arc<Bridge>) -> Router {
    Router::new()
        .route("/", get(root))
        .route("/status", get(get_status))
        .route("/configure", post(configure))
        .route("/start", post(start))
        .route("/stop", post(stop))
        .route("/subscribe", post(subscribe))
        .route("/events", get(events))
        .with_state(RpcState { bridge })
}

/// Outcome of a call
type CallResult = Result<Json<[bool; 1]>, Rejection>;

/// Rejected call
#[derive(Debug)]
pub struct Rejection {
    status: StatusCode,
    body: RejectionBody,
}

#[derive(Debug, Serialize)]
struct RejectionBody {
    code: &'static str,
    message: String,
}

impl From<BridgeError> for Rejection {
    fn from(err: BridgeError) -> Self {
        let status = match &err {
            BridgeError::Configuration(_) => StatusCode::BAD_REQUEST,
            BridgeError::NodeCreation(_) => StatusCode::UNPROCESSABLE_ENTITY,
            BridgeError::Start(_) | BridgeError::Stop(_) | BridgeError::Subscription(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        };

        Self {
            status,
            body: RejectionBody {
                code: err.code(),
                message: err.to_string(),
            },
        }
    }
}

impl IntoResponse for Rejection {
    fn into_response(self) -> Response {
        (self.status, Json(self.body)).into_response()
    }
}

fn resolve(result: crate::Result<bool>) -> CallResult {
    Ok(Json([result?]))
}

// RPC handlers

async fn root() -> &'static str {
    "Lightlink Node Bridge"
}

async fn get_status(State(state): State<RpcState>) -> Json<BridgeStatus> {
    Json(state.bridge.status().await)
}

async fn configure(State(state): State<RpcState>, body: Bytes) -> CallResult {
    resolve(state.bridge.configure_raw(&body).await)
}

async fn start(State(state): State<RpcState>) -> CallResult {
    resolve(state.bridge.start().await)
}

async fn stop(State(state): State<RpcState>) -> CallResult {
    resolve(state.bridge.stop().await)
}

async fn subscribe(State(state): State<RpcState>) -> CallResult {
    resolve(state.bridge.subscribe().await)
}

async fn events(
    State(state): State<RpcState>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let receiver = state.bridge.events();

    let stream = futures_util::stream::unfold(receiver, |mut receiver| async move {
        while let Some(event) = receiver.recv().await {
            match Event::default().event(event.name).json_data(&event.payload) {
                Ok(sse) => return Some((Ok(sse), receiver)),
                Err(e) => warn!("Skipping unserializable event: {}", e),
            }
        }
        None
    });

    Sse::new(stream).keep_alive(KeepAlive::default())
}
