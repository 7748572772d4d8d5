// Copyright (c) 2024 IOTA Stiftung
// SPDX-License-Identifier: Apache-2.0

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;

use anyhow::Result;
use async_trait::async_trait;
use parking_lot::Mutex;

use super::PositionTracker;
use crate::clock::{Clock, SystemClock};
use crate::series::Timeouts;

/// Positions kept in private process memory. Entries live for the lifetime of the process.
pub struct MemoryPositionTracker {
    timeouts: Timeouts,
    clock: Arc<dyn Clock>,
    devices: Mutex<HashMap<String, DeviceSeries>>,
}

#[derive(Debug, Clone, Copy)]
struct DeviceSeries {
    last_seen: Instant,
    position: u64,
}

impl MemoryPositionTracker {
    pub fn new(timeouts: Timeouts) -> Self {
        Self::with_clock(timeouts, Arc::new(SystemClock))
    }

    pub fn with_clock(timeouts: Timeouts, clock: Arc<dyn Clock>) -> Self {
        Self {
            timeouts,
            clock,
            devices: Mutex::new(HashMap::new()),
        }
    }

    fn next_position(&self, device_id: &str) -> u64 {
        let mut devices = self.devices.lock();
        // Read the clock under the lock so updates for one device never go back in time.
        let now = self.clock.now();
        let previous = devices.get(device_id).copied();
        let transition = self
            .timeouts
            .classify(previous.map(|series| now.saturating_duration_since(series.last_seen)));
        let position = transition.apply(previous.map_or(0, |series| series.position));
        devices.insert(
            device_id.to_string(),
            DeviceSeries {
                last_seen: now,
                position,
            },
        );
        position
    }
}

#[async_trait]
impl PositionTracker for MemoryPositionTracker {
    async fn position(&self, device_id: &str) -> Result<u64> {
        Ok(self.next_position(device_id))
    }
}

#[cfg(test)]
mod test {
    use std::time::Duration;

    use futures_util::future::join_all;

    use super::*;
    use crate::clock::ManualClock;
    use crate::tracker::position::test_helpers::{run_scenario, SERIES_SCENARIO};

    fn tracker_with_clock() -> (MemoryPositionTracker, Arc<ManualClock>) {
        let clock = Arc::new(ManualClock::new());
        let timeouts = Timeouts::new(Duration::from_millis(20), Duration::from_millis(100)).unwrap();
        (
            MemoryPositionTracker::with_clock(timeouts, clock.clone()),
            clock,
        )
    }

    #[tokio::test]
    async fn follows_series_scenario() {
        let (tracker, clock) = tracker_with_clock();
        run_scenario(&tracker, &clock, "test_ifa", &SERIES_SCENARIO).await;
    }

    #[tokio::test]
    async fn devices_do_not_interfere() {
        let (tracker, clock) = tracker_with_clock();

        assert_eq!(tracker.position("a").await.unwrap(), 1);
        clock.advance(Duration::from_millis(30));
        assert_eq!(tracker.position("b").await.unwrap(), 1);
        assert_eq!(tracker.position("a").await.unwrap(), 2);
        clock.advance(Duration::from_millis(10));
        assert_eq!(tracker.position("b").await.unwrap(), 1);
        assert_eq!(tracker.position("a").await.unwrap(), 2);
        clock.advance(Duration::from_millis(25));
        assert_eq!(tracker.position("b").await.unwrap(), 2);
        assert_eq!(tracker.position("a").await.unwrap(), 3);
    }

    #[tokio::test]
    async fn device_ids_are_case_sensitive() {
        let (tracker, clock) = tracker_with_clock();

        assert_eq!(tracker.position("Device").await.unwrap(), 1);
        clock.advance(Duration::from_millis(30));
        assert_eq!(tracker.position("Device").await.unwrap(), 2);
        assert_eq!(tracker.position("device").await.unwrap(), 1);
    }

    #[tokio::test]
    async fn concurrent_calls_in_one_series_agree() {
        let (tracker, clock) = tracker_with_clock();
        let tracker = Arc::new(tracker);
        tracker.position("shared").await.unwrap();
        clock.advance(Duration::from_millis(50));

        let handles = (0..32).map(|_| {
            let tracker = tracker.clone();
            tokio::spawn(async move { tracker.position("shared").await.unwrap() })
        });
        let positions = join_all(handles)
            .await
            .into_iter()
            .map(|result| result.unwrap())
            .collect::<Vec<_>>();

        // The first call after the gap opens a new series; all others land inside it.
        assert!(positions.iter().all(|position| *position == 2));
    }
}
