// Copyright (c) 2024 IOTA Stiftung
// SPDX-License-Identifier: Apache-2.0

use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;

use super::{checked_position, position_key, series_marker_key, PositionTracker};
use crate::errors::TrackerError;
use crate::series::Timeouts;
use crate::storage::redis::RedisCounterStorage;

/// Same keys and expiries as [`super::StoragePositionTracker`], but the whole update runs
/// inside redis as one script.
pub struct ScriptedPositionTracker {
    storage: Arc<RedisCounterStorage>,
    timeouts: Timeouts,
}

impl ScriptedPositionTracker {
    pub fn new(storage: Arc<RedisCounterStorage>, timeouts: Timeouts) -> Self {
        Self { storage, timeouts }
    }
}

#[async_trait]
impl PositionTracker for ScriptedPositionTracker {
    async fn position(&self, device_id: &str) -> Result<u64> {
        let position = self
            .storage
            .advance_position(
                &series_marker_key(device_id),
                &position_key(device_id),
                self.timeouts.series(),
                self.timeouts.reset(),
            )
            .await?
            .ok_or_else(|| TrackerError::MissingPosition {
                device_id: device_id.to_string(),
            })?;
        Ok(checked_position(device_id, position)?)
    }
}
