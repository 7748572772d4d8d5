// Copyright (c) 2024 IOTA Stiftung
// SPDX-License-Identifier: Apache-2.0

use std::net::Ipv4Addr;
use std::time::Duration;

use tracing::debug;

use crate::metrics::RpcMetrics;
use crate::rpc::PositionServer;
use crate::series::Timeouts;
use crate::tracker::Trackers;

pub fn test_timeouts() -> Timeouts {
    Timeouts::new(Duration::from_millis(300), Duration::from_secs(5)).unwrap()
}

/// Starts an RPC server over in-memory trackers on a free local port.
pub async fn start_rpc_server_for_testing(timeouts: Timeouts) -> PositionServer {
    let server = PositionServer::new(
        Trackers::in_memory(timeouts),
        Ipv4Addr::LOCALHOST,
        0,
        RpcMetrics::new_for_testing(),
    )
    .await
    .unwrap();
    debug!("Started test RPC server on port {}", server.rpc_port);
    server
}
