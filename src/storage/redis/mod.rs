// Copyright (c) 2024 IOTA Stiftung
// SPDX-License-Identifier: Apache-2.0

use std::collections::HashSet;
use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use redis::aio::ConnectionManager;
use tracing::{debug, warn};

use super::CounterStorage;
use script_manager::ScriptManager;

mod script_manager;

/// Number of keys requested per SCAN round trip.
const SCAN_BATCH_SIZE: usize = 20;

#[derive(Clone)]
pub struct RedisCounterStorage {
    conn_manager: ConnectionManager,
}

impl RedisCounterStorage {
    pub async fn new(redis_url: impl AsRef<str>) -> Result<Self> {
        let client = redis::Client::open(redis_url.as_ref())
            .with_context(|| format!("invalid redis url {}", redis_url.as_ref()))?;
        let conn_manager = ConnectionManager::new(client)
            .await
            .context("unable to connect to redis")?;
        let storage = Self { conn_manager };
        storage.check_health().await?;
        Ok(storage)
    }

    #[cfg(test)]
    pub async fn new_localhost() -> Self {
        Self::new("redis://127.0.0.1:6379").await.unwrap()
    }

    /// Runs the whole series update for one device as a single script, so concurrent
    /// requests for the same device can not both observe an expired marker.
    pub async fn advance_position(
        &self,
        marker_key: &str,
        value_key: &str,
        series_ttl: Duration,
        reset_ttl: Duration,
    ) -> Result<Option<i64>> {
        let mut conn = self.conn_manager.clone();
        let position: Option<i64> = ScriptManager::advance_position_script()
            .key(marker_key)
            .key(value_key)
            .arg(ttl_millis(series_ttl))
            .arg(ttl_millis(reset_ttl))
            .invoke_async(&mut conn)
            .await
            .context("error on running position script")?;
        Ok(position)
    }

    #[cfg(test)]
    pub async fn set_text(&self, key: &str, value: &str) -> Result<()> {
        let mut conn = self.conn_manager.clone();
        redis::cmd("SET")
            .arg(key)
            .arg(value)
            .query_async::<_, ()>(&mut conn)
            .await?;
        Ok(())
    }

    #[cfg(test)]
    pub async fn delete(&self, keys: &[String]) -> Result<()> {
        let mut conn = self.conn_manager.clone();
        redis::cmd("DEL")
            .arg(keys.to_vec())
            .query_async::<_, ()>(&mut conn)
            .await?;
        Ok(())
    }
}

#[async_trait]
impl CounterStorage for RedisCounterStorage {
    async fn refresh_expiry(&self, key: &str, ttl: Duration) -> Result<bool> {
        let mut conn = self.conn_manager.clone();
        let refreshed: bool = redis::cmd("PEXPIRE")
            .arg(key)
            .arg(ttl_millis(ttl))
            .query_async(&mut conn)
            .await?;
        Ok(refreshed)
    }

    async fn set_with_expiry(&self, key: &str, value: i64, ttl: Duration) -> Result<()> {
        let mut conn = self.conn_manager.clone();
        redis::cmd("SET")
            .arg(key)
            .arg(value)
            .arg("PX")
            .arg(ttl_millis(ttl))
            .query_async::<_, ()>(&mut conn)
            .await?;
        Ok(())
    }

    async fn increment(&self, key: &str) -> Result<i64> {
        let mut conn = self.conn_manager.clone();
        let value: i64 = redis::cmd("INCR").arg(key).query_async(&mut conn).await?;
        Ok(value)
    }

    async fn get(&self, key: &str) -> Result<Option<i64>> {
        let mut conn = self.conn_manager.clone();
        let value: Option<i64> = redis::cmd("GET").arg(key).query_async(&mut conn).await?;
        Ok(value)
    }

    async fn scan_prefix(&self, prefix: &str) -> Result<Vec<(String, i64)>> {
        let mut conn = self.conn_manager.clone();
        let pattern = format!("{}*", prefix);
        let mut result = Vec::new();
        // SCAN may return the same key in more than one batch.
        let mut seen = HashSet::new();
        let mut cursor: u64 = 0;
        loop {
            let (next_cursor, keys): (u64, Vec<String>) = redis::cmd("SCAN")
                .arg(cursor)
                .arg("MATCH")
                .arg(&pattern)
                .arg("COUNT")
                .arg(SCAN_BATCH_SIZE)
                .query_async(&mut conn)
                .await
                .context("error on scan keys")?;
            let keys = keys
                .into_iter()
                .filter(|key| seen.insert(key.clone()))
                .collect::<Vec<_>>();
            if !keys.is_empty() {
                // Decoded as strings so one non-numeric value does not fail the batch.
                let values: Vec<Option<String>> = redis::cmd("MGET")
                    .arg(&keys)
                    .query_async(&mut conn)
                    .await
                    .context("error on read scanned keys")?;
                for (key, value) in keys.into_iter().zip(values) {
                    let Some(value) = value else {
                        debug!("Key {} disappeared during scan", key);
                        continue;
                    };
                    match value.parse::<i64>() {
                        Ok(value) => result.push((key, value)),
                        Err(_) => warn!("Skipping key {} with non-integer value {:?}", key, value),
                    }
                }
            }
            if next_cursor == 0 {
                break;
            }
            cursor = next_cursor;
        }
        Ok(result)
    }

    async fn check_health(&self) -> Result<()> {
        let mut conn = self.conn_manager.clone();
        redis::cmd("PING")
            .query_async::<_, String>(&mut conn)
            .await
            .context("redis did not answer PING")?;
        Ok(())
    }
}

// Redis rejects a zero expiry, so anything shorter than a millisecond is rounded up.
fn ttl_millis(ttl: Duration) -> u64 {
    u64::try_from(ttl.as_millis()).unwrap_or(u64::MAX).max(1)
}

#[cfg(test)]
mod test {
    use rand::Rng;

    use super::*;

    fn random_prefix() -> String {
        format!("test:{}:", rand::thread_rng().gen::<u64>())
    }

    #[test]
    fn ttl_millis_saturates() {
        assert_eq!(ttl_millis(Duration::ZERO), 1);
        assert_eq!(ttl_millis(Duration::from_micros(300)), 1);
        assert_eq!(ttl_millis(Duration::from_secs(5)), 5000);
        assert_eq!(ttl_millis(Duration::MAX), u64::MAX);
    }

    #[tokio::test]
    #[ignore = "requires a redis server on 127.0.0.1:6379"]
    async fn expiry_primitives() {
        let storage = RedisCounterStorage::new_localhost().await;
        let key = format!("{}marker", random_prefix());

        assert!(!storage
            .refresh_expiry(&key, Duration::from_millis(200))
            .await
            .unwrap());
        storage
            .set_with_expiry(&key, 1, Duration::from_millis(200))
            .await
            .unwrap();
        assert!(storage
            .refresh_expiry(&key, Duration::from_millis(200))
            .await
            .unwrap());
        assert_eq!(storage.get(&key).await.unwrap(), Some(1));

        tokio::time::sleep(Duration::from_millis(300)).await;
        assert_eq!(storage.get(&key).await.unwrap(), None);
    }

    #[tokio::test]
    #[ignore = "requires a redis server on 127.0.0.1:6379"]
    async fn scan_prefix_drains_every_batch() {
        let storage = RedisCounterStorage::new_localhost().await;
        let prefix = random_prefix();
        let keys = (0..(SCAN_BATCH_SIZE * 3 + 7))
            .map(|i| format!("{}{}", prefix, i))
            .collect::<Vec<_>>();
        for key in &keys {
            storage.increment(key).await.unwrap();
        }

        let scanned = storage.scan_prefix(&prefix).await.unwrap();
        assert_eq!(scanned.len(), keys.len());
        assert!(scanned.iter().all(|(_, value)| *value == 1));

        storage.delete(&keys).await.unwrap();
    }

    #[tokio::test]
    #[ignore = "requires a redis server on 127.0.0.1:6379"]
    async fn scan_prefix_skips_non_integer_values() {
        let storage = RedisCounterStorage::new_localhost().await;
        let prefix = random_prefix();
        let counter = format!("{}counter", prefix);
        let text = format!("{}text", prefix);
        storage.increment(&counter).await.unwrap();
        storage.set_text(&text, "abc").await.unwrap();

        assert_eq!(
            storage.scan_prefix(&prefix).await.unwrap(),
            vec![(counter.clone(), 1)]
        );

        storage.delete(&[counter, text]).await.unwrap();
    }
}
