// Copyright (c) 2024 IOTA Stiftung
// SPDX-License-Identifier: Apache-2.0

use std::net::{IpAddr, SocketAddr};
use std::path::PathBuf;

use clap::*;
use prometheus::Registry;
use tracing::info;

use crate::config::PositionServiceConfig;
use crate::logging::init_logging;
use crate::metrics::{start_prometheus_server, RpcMetrics};
use crate::rpc::PositionServer;
use crate::tracker::Trackers;
use crate::VERSION;

#[derive(Parser)]
#[command(
    name = "position-tracker",
    about = "Device position and request stats service",
    version = VERSION,
    rename_all = "kebab-case"
)]
pub struct Command {
    #[arg(env, long, help = "Path to config file")]
    config_path: PathBuf,
}

impl Command {
    pub async fn execute(self) -> anyhow::Result<()> {
        let config = PositionServiceConfig::load(&self.config_path)?;
        init_logging();
        info!("Loaded config from {:?}", self.config_path);

        let metric_address = SocketAddr::new(IpAddr::V4(config.rpc_host_ip), config.metrics_port);
        let prometheus_registry = Registry::new();
        let _metrics_handle = start_prometheus_server(metric_address, prometheus_registry.clone());

        let trackers = Trackers::connect(&config).await?;
        info!(
            "Series timeout {:?}, reset timeout {:?}",
            config.series_timeout, config.reset_timeout
        );

        let rpc_metrics = RpcMetrics::new(&prometheus_registry);
        let server = PositionServer::new(
            trackers,
            config.rpc_host_ip,
            config.rpc_port,
            rpc_metrics,
        )
        .await?;
        server.handle.await?;
        Ok(())
    }
}
