// Copyright (c) 2024 IOTA Stiftung
// SPDX-License-Identifier: Apache-2.0

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::Result;
use async_trait::async_trait;
use parking_lot::Mutex;

use super::CounterStorage;
use crate::clock::{Clock, SystemClock};

/// In-process stand-in for the shared store, with the same per-key expiry semantics.
/// A key is live up to and including the instant it expires. A ttl too large to
/// represent as an instant means the key never expires.
pub struct MemoryCounterStorage {
    clock: Arc<dyn Clock>,
    entries: Mutex<BTreeMap<String, Entry>>,
}

#[derive(Debug, Clone, Copy)]
struct Entry {
    value: i64,
    expires_at: Option<Instant>,
}

impl Entry {
    fn is_live(&self, now: Instant) -> bool {
        self.expires_at.map_or(true, |at| now <= at)
    }
}

impl MemoryCounterStorage {
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self {
            clock,
            entries: Mutex::new(BTreeMap::new()),
        }
    }

    fn live_entry<'a>(
        entries: &'a mut BTreeMap<String, Entry>,
        key: &str,
        now: Instant,
    ) -> Option<&'a mut Entry> {
        if entries.get(key).is_some_and(|entry| !entry.is_live(now)) {
            entries.remove(key);
        }
        entries.get_mut(key)
    }
}

impl Default for MemoryCounterStorage {
    fn default() -> Self {
        Self::new(Arc::new(SystemClock))
    }
}

#[async_trait]
impl CounterStorage for MemoryCounterStorage {
    async fn refresh_expiry(&self, key: &str, ttl: Duration) -> Result<bool> {
        let now = self.clock.now();
        let mut entries = self.entries.lock();
        match Self::live_entry(&mut entries, key, now) {
            Some(entry) => {
                entry.expires_at = now.checked_add(ttl);
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn set_with_expiry(&self, key: &str, value: i64, ttl: Duration) -> Result<()> {
        let now = self.clock.now();
        self.entries.lock().insert(
            key.to_string(),
            Entry {
                value,
                expires_at: now.checked_add(ttl),
            },
        );
        Ok(())
    }

    async fn increment(&self, key: &str) -> Result<i64> {
        let now = self.clock.now();
        let mut entries = self.entries.lock();
        if let Some(entry) = Self::live_entry(&mut entries, key, now) {
            entry.value += 1;
            return Ok(entry.value);
        }
        entries.insert(
            key.to_string(),
            Entry {
                value: 1,
                expires_at: None,
            },
        );
        Ok(1)
    }

    async fn get(&self, key: &str) -> Result<Option<i64>> {
        let now = self.clock.now();
        let mut entries = self.entries.lock();
        Ok(Self::live_entry(&mut entries, key, now).map(|entry| entry.value))
    }

    async fn scan_prefix(&self, prefix: &str) -> Result<Vec<(String, i64)>> {
        let now = self.clock.now();
        let entries = self.entries.lock();
        Ok(entries
            .range(prefix.to_string()..)
            .take_while(|(key, _)| key.starts_with(prefix))
            .filter(|(_, entry)| entry.is_live(now))
            .map(|(key, entry)| (key.clone(), entry.value))
            .collect())
    }

    async fn check_health(&self) -> Result<()> {
        Ok(())
    }
}
