// Copyright (c) 2024 IOTA Stiftung
// SPDX-License-Identifier: Apache-2.0

//! The series state machine shared by every position backend.
//!
//! A device's position stays the same while its requests arrive at most `series`
//! apart, grows by one when a gap is longer than `series` but not longer than `reset`,
//! and starts again at 1 once a gap exceeds `reset`.

use std::time::Duration;

use crate::errors::TrackerError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Timeouts {
    series: Duration,
    reset: Duration,
}

impl Timeouts {
    pub fn new(series: Duration, reset: Duration) -> Result<Self, TrackerError> {
        if series >= reset {
            return Err(TrackerError::InvalidTimeouts { series, reset });
        }
        Ok(Self { series, reset })
    }

    pub fn series(&self) -> Duration {
        self.series
    }

    pub fn reset(&self) -> Duration {
        self.reset
    }

    /// Picks the transition for a request that arrives `elapsed` after the previous one,
    /// or `None` when the device has never been seen.
    pub fn classify(&self, elapsed: Option<Duration>) -> SeriesTransition {
        match elapsed {
            None => SeriesTransition::New,
            Some(dt) if dt > self.reset => SeriesTransition::Reset,
            Some(dt) if dt > self.series => SeriesTransition::NewSeries,
            Some(_) => SeriesTransition::SameSeries,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SeriesTransition {
    New,
    SameSeries,
    NewSeries,
    Reset,
}

impl SeriesTransition {
    pub fn apply(self, previous: u64) -> u64 {
        match self {
            SeriesTransition::New | SeriesTransition::Reset => 1,
            SeriesTransition::SameSeries => previous,
            SeriesTransition::NewSeries => previous + 1,
        }
    }
}
