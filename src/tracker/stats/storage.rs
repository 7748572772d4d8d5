// Copyright (c) 2024 IOTA Stiftung
// SPDX-License-Identifier: Apache-2.0

use std::sync::Arc;

use anyhow::{Context, Result};
use async_trait::async_trait;
use tracing::warn;

use super::{parse_stat_key, stat_key, Stat, StatsCollector, STAT_KEY_DELIMITER, STAT_KEY_PREFIX};
use crate::storage::CounterStorage;

/// Counters kept in a shared store under `s:<app>:<platform>:<country>`, without expiry.
pub struct StorageStatsCollector {
    storage: Arc<dyn CounterStorage>,
}

impl StorageStatsCollector {
    pub fn new(storage: Arc<dyn CounterStorage>) -> Self {
        Self { storage }
    }
}

#[async_trait]
impl StatsCollector for StorageStatsCollector {
    async fn record(&self, app: &str, platform: &str, country: &str) -> Result<()> {
        self.storage
            .increment(&stat_key(app, platform, country))
            .await
            .context("error on increment stat")?;
        Ok(())
    }

    async fn all_stats(&self) -> Result<Vec<Stat>> {
        let prefix = format!("{}{}", STAT_KEY_PREFIX, STAT_KEY_DELIMITER);
        let entries = self
            .storage
            .scan_prefix(&prefix)
            .await
            .context("error on iter stats")?;
        let stats = entries
            .into_iter()
            .filter_map(|(key, count)| {
                let Ok(count) = u64::try_from(count) else {
                    warn!("Skipping stat {} with negative count {}", key, count);
                    return None;
                };
                let stat = parse_stat_key(&key, count);
                if stat.is_none() {
                    warn!("Skipping malformed stat key {}", key);
                }
                stat
            })
            .collect();
        Ok(stats)
    }
}
