// Copyright (c) 2024 IOTA Stiftung
// SPDX-License-Identifier: Apache-2.0

use std::sync::Arc;

use anyhow::Result;
use tracing::info;

use crate::config::{PositionServiceConfig, StorageConfig};
use crate::series::Timeouts;
use crate::storage::redis::RedisCounterStorage;
use crate::storage::CounterStorage;

pub mod position;
pub mod stats;

pub use position::PositionTracker;
pub use stats::{Stat, StatsCollector};

#[derive(Clone)]
pub struct Trackers {
    pub positions: Arc<dyn PositionTracker>,
    pub stats: Arc<dyn StatsCollector>,
}

impl Trackers {
    pub fn new(positions: Arc<dyn PositionTracker>, stats: Arc<dyn StatsCollector>) -> Self {
        Self { positions, stats }
    }

    pub fn in_memory(timeouts: Timeouts) -> Self {
        Self::new(
            Arc::new(position::MemoryPositionTracker::new(timeouts)),
            Arc::new(stats::MemoryStatsCollector::new()),
        )
    }

    /// Builds the trackers described by `config`. The timeouts are validated before any
    /// connection to the store is attempted.
    pub async fn connect(config: &PositionServiceConfig) -> Result<Self> {
        let timeouts = config.timeouts()?;
        let trackers = match &config.storage_config {
            StorageConfig::Memory => {
                info!("Using in-memory trackers");
                Self::in_memory(timeouts)
            }
            StorageConfig::Redis { redis_url } => {
                let storage = Arc::new(RedisCounterStorage::new(redis_url).await?);
                info!("Connected to redis at {}", redis_url);
                let positions: Arc<dyn PositionTracker> = if config.atomic_position {
                    Arc::new(position::ScriptedPositionTracker::new(
                        storage.clone(),
                        timeouts,
                    ))
                } else {
                    Arc::new(position::StoragePositionTracker::new(
                        storage.clone(),
                        timeouts,
                    ))
                };
                let storage: Arc<dyn CounterStorage> = storage;
                Self::new(
                    positions,
                    Arc::new(stats::StorageStatsCollector::new(storage)),
                )
            }
        };
        Ok(trackers)
    }
}
