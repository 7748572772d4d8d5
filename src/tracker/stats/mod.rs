// Copyright (c) 2024 IOTA Stiftung
// SPDX-License-Identifier: Apache-2.0

use anyhow::Result;
use async_trait::async_trait;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

mod memory;
mod storage;

pub use memory::MemoryStatsCollector;
pub use storage::StorageStatsCollector;

pub const STAT_KEY_PREFIX: &str = "s";
pub const STAT_KEY_DELIMITER: char = ':';

/// Number of requests observed for one (app, platform, country) triple.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct Stat {
    pub app: String,
    pub platform: String,
    pub country: String,
    pub count: u64,
}

#[async_trait]
pub trait StatsCollector: Sync + Send {
    async fn record(&self, app: &str, platform: &str, country: &str) -> Result<()>;

    /// Returns every counter. The order is stable for an unchanged store but otherwise
    /// unspecified.
    async fn all_stats(&self) -> Result<Vec<Stat>>;
}

/// Builds `s:<app>:<platform>:<country>`. Dimension values are not escaped, so a value
/// containing the delimiter produces a key that [`parse_stat_key`] will skip.
pub fn stat_key(app: &str, platform: &str, country: &str) -> String {
    let d = STAT_KEY_DELIMITER;
    format!("{STAT_KEY_PREFIX}{d}{app}{d}{platform}{d}{country}")
}

pub fn parse_stat_key(key: &str, count: u64) -> Option<Stat> {
    let parts = key.split(STAT_KEY_DELIMITER).collect::<Vec<_>>();
    match parts.as_slice() {
        [STAT_KEY_PREFIX, app, platform, country] => Some(Stat {
            app: app.to_string(),
            platform: platform.to_string(),
            country: country.to_string(),
            count,
        }),
        _ => None,
    }
}
