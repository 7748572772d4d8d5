// Copyright (c) 2024 IOTA Stiftung
// SPDX-License-Identifier: Apache-2.0

use std::net::SocketAddr;
use std::sync::Arc;

use axum::http::StatusCode;
use axum::routing::get;
use axum::{Extension, Router};
use prometheus::{
    register_histogram_with_registry, register_int_counter_with_registry, Encoder, Histogram,
    IntCounter, Registry, TextEncoder,
};
use tokio::task::JoinHandle;
use tracing::{error, info};

const LATENCY_MS_BUCKETS: &[f64] = &[
    0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0, 25.0, 50.0, 100.0, 250.0, 500.0, 1000.0,
];

pub struct RpcMetrics {
    pub num_position_requests: IntCounter,
    pub num_invalid_position_requests: IntCounter,
    pub num_successful_position_requests: IntCounter,
    pub num_failed_position_requests: IntCounter,
    pub position_latency_ms: Histogram,

    pub num_stats_requests: IntCounter,
    pub num_failed_stats_requests: IntCounter,
}

impl RpcMetrics {
    pub fn new(registry: &Registry) -> Arc<Self> {
        Arc::new(Self {
            num_position_requests: register_int_counter_with_registry!(
                "num_position_requests",
                "Total number of position requests received",
                registry
            )
            .unwrap(),
            num_invalid_position_requests: register_int_counter_with_registry!(
                "num_invalid_position_requests",
                "Total number of position requests rejected as malformed",
                registry
            )
            .unwrap(),
            num_successful_position_requests: register_int_counter_with_registry!(
                "num_successful_position_requests",
                "Total number of position requests that returned a position",
                registry
            )
            .unwrap(),
            num_failed_position_requests: register_int_counter_with_registry!(
                "num_failed_position_requests",
                "Total number of position requests that failed in the trackers",
                registry
            )
            .unwrap(),
            position_latency_ms: register_histogram_with_registry!(
                "position_latency_ms",
                "Time spent assigning a position and recording stats, in milliseconds",
                LATENCY_MS_BUCKETS.to_vec(),
                registry
            )
            .unwrap(),
            num_stats_requests: register_int_counter_with_registry!(
                "num_stats_requests",
                "Total number of stats requests received",
                registry
            )
            .unwrap(),
            num_failed_stats_requests: register_int_counter_with_registry!(
                "num_failed_stats_requests",
                "Total number of stats requests that failed",
                registry
            )
            .unwrap(),
        })
    }

    pub fn new_for_testing() -> Arc<Self> {
        Self::new(&Registry::new())
    }
}

/// Serves the registry in the prometheus text format on `GET /metrics`.
pub fn start_prometheus_server(address: SocketAddr, registry: Registry) -> JoinHandle<()> {
    let app = Router::new()
        .route("/metrics", get(metrics))
        .layer(Extension(registry));

    tokio::spawn(async move {
        info!("Metrics server listening on {}", address);
        if let Err(err) = axum::Server::bind(&address)
            .serve(app.into_make_service())
            .await
        {
            error!("Metrics server stopped: {:?}", err);
        }
    })
}

async fn metrics(Extension(registry): Extension<Registry>) -> (StatusCode, String) {
    encode_metrics(&registry)
}

fn encode_metrics(registry: &Registry) -> (StatusCode, String) {
    let mut buffer = Vec::new();
    if let Err(err) = TextEncoder::new().encode(&registry.gather(), &mut buffer) {
        return (
            StatusCode::INTERNAL_SERVER_ERROR,
            format!("unable to encode metrics: {}", err),
        );
    }
    match String::from_utf8(buffer) {
        Ok(body) => (StatusCode::OK, body),
        Err(err) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            format!("metrics are not valid utf-8: {}", err),
        ),
    }
}
