// Copyright (c) 2024 IOTA Stiftung
// SPDX-License-Identifier: Apache-2.0

use anyhow::Result;
use async_trait::async_trait;

use crate::errors::TrackerError;

mod memory;
mod scripted;
mod storage;

pub use memory::MemoryPositionTracker;
pub use scripted::ScriptedPositionTracker;
pub use storage::StoragePositionTracker;

pub const SERIES_MARKER_KEY_PREFIX: &str = "pos:s:";
pub const POSITION_KEY_PREFIX: &str = "pos:r:";

/// Assigns the next position of a device. `device_id` is never empty.
#[async_trait]
pub trait PositionTracker: Sync + Send {
    async fn position(&self, device_id: &str) -> Result<u64>;
}

pub fn series_marker_key(device_id: &str) -> String {
    format!("{}{}", SERIES_MARKER_KEY_PREFIX, device_id)
}

pub fn position_key(device_id: &str) -> String {
    format!("{}{}", POSITION_KEY_PREFIX, device_id)
}

/// Converts the counter read from the store into a position, rejecting anything below 1.
pub fn checked_position(device_id: &str, value: i64) -> Result<u64, TrackerError> {
    u64::try_from(value)
        .ok()
        .filter(|position| *position >= 1)
        .ok_or_else(|| TrackerError::InvalidPosition {
            device_id: device_id.to_string(),
            value,
        })
}
