// Copyright (c) 2024 IOTA Stiftung
// SPDX-License-Identifier: Apache-2.0

use std::time::Duration;

use anyhow::Result;
use async_trait::async_trait;

pub mod memory;
pub mod redis;

/// Counter primitives with per-key expiry, shared by the position and stats trackers.
#[async_trait]
pub trait CounterStorage: Sync + Send {
    /// Resets the expiry of `key` to `ttl`. Returns false if the key does not exist.
    async fn refresh_expiry(&self, key: &str, ttl: Duration) -> Result<bool>;

    async fn set_with_expiry(&self, key: &str, value: i64, ttl: Duration) -> Result<()>;

    /// Atomically increments `key`, creating it at 1 when absent.
    async fn increment(&self, key: &str) -> Result<i64>;

    async fn get(&self, key: &str) -> Result<Option<i64>>;

    /// Returns every live key starting with `prefix` together with its value.
    async fn scan_prefix(&self, prefix: &str) -> Result<Vec<(String, i64)>>;

    async fn check_health(&self) -> Result<()>;
}
