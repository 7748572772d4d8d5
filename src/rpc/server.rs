// Copyright (c) 2024 IOTA Stiftung
// SPDX-License-Identifier: Apache-2.0

use std::net::{IpAddr, Ipv4Addr, SocketAddr, TcpListener};
use std::sync::Arc;
use std::time::Instant;

use anyhow::Context;
use axum::body::Bytes;
use axum::http::StatusCode;
use axum::routing::get;
use axum::{Extension, Json, Router};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, trace};

use crate::logging::PositionLogMessage;
use crate::metrics::RpcMetrics;
use crate::rpc::client::PositionRpcClient;
use crate::rpc::rpc_types::{ErrorResponse, PositionRequest, PositionResponse};
use crate::tracker::{Stat, Trackers};
use crate::{POSITIONS_LOGGING_TARGET_NAME, VERSION};

pub struct PositionServer {
    pub handle: JoinHandle<()>,
    pub rpc_port: u16,
}

impl PositionServer {
    /// Binds `host_ip:rpc_port` and starts serving. Port 0 picks a free port, reported in
    /// `rpc_port`.
    pub async fn new(
        trackers: Trackers,
        host_ip: Ipv4Addr,
        rpc_port: u16,
        metrics: Arc<RpcMetrics>,
    ) -> anyhow::Result<Self> {
        let state = ServerState { trackers, metrics };
        let app = Router::new()
            .route("/", get(health).post(position))
            .route("/version", get(version))
            .route("/stats", get(stats))
            .layer(Extension(state));

        let listener = TcpListener::bind(SocketAddr::new(IpAddr::V4(host_ip), rpc_port))
            .with_context(|| format!("unable to bind {}:{}", host_ip, rpc_port))?;
        listener.set_nonblocking(true)?;
        let address = listener.local_addr()?;
        let server = axum::Server::from_tcp(listener)?;

        let handle = tokio::spawn(async move {
            info!("listening on {}", address);
            if let Err(err) = server.serve(app.into_make_service()).await {
                error!("Server stopped: {:?}", err);
            }
        });
        Ok(Self {
            handle,
            rpc_port: address.port(),
        })
    }

    pub fn get_local_client(&self) -> PositionRpcClient {
        PositionRpcClient::new(format!("http://localhost:{}", self.rpc_port))
    }
}

#[derive(Clone)]
struct ServerState {
    trackers: Trackers,
    metrics: Arc<RpcMetrics>,
}

async fn health() -> &'static str {
    info!("Received health request");
    "OK"
}

async fn version() -> &'static str {
    info!("Received version request");
    VERSION
}

async fn position(
    Extension(server): Extension<ServerState>,
    body: Bytes,
) -> (StatusCode, Json<PositionResponse>) {
    server.metrics.num_position_requests.inc();
    let request = match PositionRequest::from_body(&body)
        .and_then(|request| request.check_validity().map(|_| request))
    {
        Ok(request) => request,
        Err(err) => {
            debug!("Invalid position request: {:?}", err);
            server.metrics.num_invalid_position_requests.inc();
            return (
                StatusCode::BAD_REQUEST,
                Json(PositionResponse::new_err(anyhow::anyhow!(
                    "Bad request: {}",
                    err
                ))),
            );
        }
    };
    debug!("Received position request: {:?}", request);

    // Spawn a task so the store updates finish even when the client drops the connection.
    tokio::task::spawn(position_impl(
        server.trackers.clone(),
        server.metrics.clone(),
        request,
    ))
    .await
    .unwrap_or_else(|err| {
        error!("Failed to spawn position task: {:?}", err);
        (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(PositionResponse::new_err(anyhow::anyhow!(
                "Failed to spawn position task"
            ))),
        )
    })
}

async fn position_impl(
    trackers: Trackers,
    metrics: Arc<RpcMetrics>,
    request: PositionRequest,
) -> (StatusCode, Json<PositionResponse>) {
    let started = Instant::now();
    let PositionRequest { app, device } = request;

    let pos = match trackers.positions.position(&device.ifa).await {
        Ok(pos) => pos,
        Err(err) => {
            error!("Failed to get position for {}: {:?}", device.ifa, err);
            metrics.num_failed_position_requests.inc();
            return (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(PositionResponse::new_err(anyhow::anyhow!(
                    "Error on get pos: {}",
                    err
                ))),
            );
        }
    };

    if let Err(err) = trackers
        .stats
        .record(&app.bundle, &device.os, &device.geo.country)
        .await
    {
        error!("Failed to record stats: {:?}", err);
        metrics.num_failed_position_requests.inc();
        return (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(PositionResponse::new_err(anyhow::anyhow!(
                "Error on add stats: {}",
                err
            ))),
        );
    }

    trace!(target: POSITIONS_LOGGING_TARGET_NAME, "{}", PositionLogMessage::new(&device.ifa, pos));
    metrics
        .position_latency_ms
        .observe(started.elapsed().as_secs_f64() * 1000.0);
    metrics.num_successful_position_requests.inc();
    (StatusCode::OK, Json(PositionResponse::new_ok(pos)))
}

async fn stats(
    Extension(server): Extension<ServerState>,
) -> Result<Json<Vec<Stat>>, (StatusCode, Json<ErrorResponse>)> {
    info!("Received stats request");
    server.metrics.num_stats_requests.inc();
    match server.trackers.stats.all_stats().await {
        Ok(stats) => Ok(Json(stats)),
        Err(err) => {
            error!("Failed to get stats: {:?}", err);
            server.metrics.num_failed_stats_requests.inc();
            Err((
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ErrorResponse::new(anyhow::anyhow!(
                    "Error on get stats: {}",
                    err
                ))),
            ))
        }
    }
}
