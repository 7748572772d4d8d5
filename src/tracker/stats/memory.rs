// Copyright (c) 2024 IOTA Stiftung
// SPDX-License-Identifier: Apache-2.0

use std::collections::HashMap;

use anyhow::Result;
use async_trait::async_trait;
use parking_lot::Mutex;

use super::{Stat, StatsCollector};

/// Counters in process memory, listed in the order their triple was first seen.
#[derive(Default)]
pub struct MemoryStatsCollector {
    inner: Mutex<Counters>,
}

#[derive(Default)]
struct Counters {
    index: HashMap<(String, String, String), usize>,
    stats: Vec<Stat>,
}

impl MemoryStatsCollector {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl StatsCollector for MemoryStatsCollector {
    async fn record(&self, app: &str, platform: &str, country: &str) -> Result<()> {
        let mut counters = self.inner.lock();
        let Counters { index, stats } = &mut *counters;
        let dimensions = (app.to_string(), platform.to_string(), country.to_string());
        if let Some(&i) = index.get(&dimensions) {
            stats[i].count += 1;
            return Ok(());
        }
        index.insert(dimensions, stats.len());
        stats.push(Stat {
            app: app.to_string(),
            platform: platform.to_string(),
            country: country.to_string(),
            count: 1,
        });
        Ok(())
    }

    async fn all_stats(&self) -> Result<Vec<Stat>> {
        Ok(self.inner.lock().stats.clone())
    }
}
