// Copyright (c) 2024 IOTA Stiftung
// SPDX-License-Identifier: Apache-2.0

use std::time::Duration;

use thiserror::Error;

/// Domain failures of the trackers. Store round-trip failures are not listed here:
/// they surface as the underlying `redis::RedisError` wrapped with context.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum TrackerError {
    #[error("'series-timeout' ({series:?}) must be less than 'reset-timeout' ({reset:?})")]
    InvalidTimeouts { series: Duration, reset: Duration },

    #[error("position key is missing while the series marker for '{device_id}' exists")]
    MissingPosition { device_id: String },

    #[error("position key for '{device_id}' holds {value}, positions start at 1")]
    InvalidPosition { device_id: String, value: i64 },
}
