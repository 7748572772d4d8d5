// Copyright (c) 2024 IOTA Stiftung
// SPDX-License-Identifier: Apache-2.0

use std::fmt::{self, Display, Formatter};

use serde::Serialize;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

use crate::{POSITIONS_LOGGING_ENV_NAME, POSITIONS_LOGGING_TARGET_NAME};

pub const DEFAULT_LOG_FILTER: &str = "off,position_tracker=debug";

/// Installs the global subscriber. `RUST_LOG` overrides the default filter, and
/// `POSITIONS_LOGGING=true` enables the per-request `positions` target.
pub fn init_logging() {
    let mut filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER));
    if positions_logging_enabled() {
        if let Ok(directive) = format!("{}=trace", POSITIONS_LOGGING_TARGET_NAME).parse() {
            filter = filter.add_directive(directive);
        }
    }
    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer())
        .init();
}

pub fn positions_logging_enabled() -> bool {
    std::env::var(POSITIONS_LOGGING_ENV_NAME).is_ok_and(|value| value == "true")
}

/// One assigned position, written as a JSON line on the `positions` target.
#[derive(Debug, Serialize, Clone)]
#[serde(rename_all = "camelCase")]
pub struct PositionLogMessage {
    pub timestamp: i64,
    pub level: String,
    pub host: String,
    pub message: String,
    pub device_id: String,
    pub position: u64,
}

impl PositionLogMessage {
    pub fn new(device_id: &str, position: u64) -> Self {
        let host = hostname::get()
            .map(|name| name.to_string_lossy().to_string())
            .unwrap_or_default();
        Self {
            timestamp: chrono::Utc::now().timestamp(),
            level: "trace".to_string(),
            host,
            message: "position assigned".to_string(),
            device_id: device_id.to_string(),
            position,
        }
    }
}

impl Display for PositionLogMessage {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        let serialized = serde_json::to_string(&self).map_err(|_| fmt::Error)?;
        write!(f, "{}", serialized)
    }
}
