// Copyright (c) 2024 IOTA Stiftung
// SPDX-License-Identifier: Apache-2.0

use std::sync::Arc;

use anyhow::{Context, Result};
use async_trait::async_trait;
use tracing::trace;

use super::{checked_position, position_key, series_marker_key, PositionTracker};
use crate::errors::TrackerError;
use crate::series::Timeouts;
use crate::storage::CounterStorage;

/// Positions kept in a store shared between instances, without any explicit timestamp.
///
/// Each device owns two keys. The series marker expires after the series timeout, so its
/// presence means the previous request was recent enough to stay in the same series. The
/// position key expires after the reset timeout, so once it is gone the next increment
/// starts over at 1.
///
/// The steps are separate round trips. Two requests for the same device that both find
/// the marker expired will both increment the position; [`super::ScriptedPositionTracker`]
/// closes that window on redis.
pub struct StoragePositionTracker {
    storage: Arc<dyn CounterStorage>,
    timeouts: Timeouts,
}

impl StoragePositionTracker {
    pub fn new(storage: Arc<dyn CounterStorage>, timeouts: Timeouts) -> Self {
        Self { storage, timeouts }
    }
}

#[async_trait]
impl PositionTracker for StoragePositionTracker {
    async fn position(&self, device_id: &str) -> Result<u64> {
        let marker_key = series_marker_key(device_id);
        let value_key = position_key(device_id);

        let in_series = self
            .storage
            .refresh_expiry(&marker_key, self.timeouts.series())
            .await
            .context("error on update series marker expiry")?;
        if in_series {
            self.storage
                .refresh_expiry(&value_key, self.timeouts.reset())
                .await
                .context("error on update position expiry")?;
            let position = self
                .storage
                .get(&value_key)
                .await
                .context("error on get position")?
                .ok_or_else(|| TrackerError::MissingPosition {
                    device_id: device_id.to_string(),
                })?;
            trace!(device_id, position, "Same series");
            return Ok(checked_position(device_id, position)?);
        }

        self.storage
            .set_with_expiry(&marker_key, 1, self.timeouts.series())
            .await
            .context("error on set series marker")?;
        let position = self
            .storage
            .increment(&value_key)
            .await
            .context("error on increment position")?;
        self.storage
            .refresh_expiry(&value_key, self.timeouts.reset())
            .await
            .context("error on set position expiry")?;
        trace!(device_id, position, "New series");
        Ok(checked_position(device_id, position)?)
    }
}

#[cfg(test)]
mod test {
    use std::time::Duration;

    use futures_util::future::join_all;
    use rand::Rng;

    use super::*;
    use crate::clock::ManualClock;
    use crate::storage::memory::MemoryCounterStorage;
    use crate::storage::redis::RedisCounterStorage;
    use crate::tracker::position::test_helpers::{run_scenario, SERIES_SCENARIO};
    use crate::tracker::position::MemoryPositionTracker;

    fn timeouts() -> Timeouts {
        Timeouts::new(Duration::from_millis(20), Duration::from_millis(100)).unwrap()
    }

    fn tracker_with_clock() -> (StoragePositionTracker, Arc<MemoryCounterStorage>, Arc<ManualClock>) {
        let clock = Arc::new(ManualClock::new());
        let storage = Arc::new(MemoryCounterStorage::new(clock.clone()));
        (
            StoragePositionTracker::new(storage.clone(), timeouts()),
            storage,
            clock,
        )
    }

    #[tokio::test]
    async fn follows_series_scenario() {
        let (tracker, _storage, clock) = tracker_with_clock();
        run_scenario(&tracker, &clock, "test_ifa", &SERIES_SCENARIO).await;
    }

    #[tokio::test]
    async fn matches_memory_tracker() {
        let (tracker, _storage, clock) = tracker_with_clock();
        let memory = MemoryPositionTracker::with_clock(timeouts(), clock.clone());
        let gaps = [0, 5, 20, 21, 100, 3, 101, 19, 40, 60, 99, 150, 1];

        for gap in gaps {
            clock.advance(Duration::from_millis(gap));
            for device in ["a", "b"] {
                assert_eq!(
                    tracker.position(device).await.unwrap(),
                    memory.position(device).await.unwrap(),
                    "device {} diverged after a {}ms gap",
                    device,
                    gap
                );
            }
        }
    }

    #[tokio::test]
    async fn writes_both_keys() {
        let (tracker, storage, _clock) = tracker_with_clock();
        tracker.position("ifa").await.unwrap();

        assert_eq!(storage.get("pos:s:ifa").await.unwrap(), Some(1));
        assert_eq!(storage.get("pos:r:ifa").await.unwrap(), Some(1));
    }

    #[tokio::test]
    async fn marker_without_position_is_an_error() {
        let (tracker, storage, _clock) = tracker_with_clock();
        storage
            .set_with_expiry("pos:s:orphan", 1, Duration::from_millis(20))
            .await
            .unwrap();

        let err = tracker.position("orphan").await.unwrap_err();
        assert_eq!(
            err.downcast_ref::<TrackerError>(),
            Some(&TrackerError::MissingPosition {
                device_id: "orphan".to_string()
            })
        );
    }

    #[tokio::test]
    async fn non_positive_position_is_an_error() {
        let (tracker, storage, _clock) = tracker_with_clock();
        for (device, value) in [("zero", 0), ("negative", -1)] {
            storage
                .set_with_expiry(&series_marker_key(device), 1, Duration::from_millis(20))
                .await
                .unwrap();
            storage
                .set_with_expiry(&position_key(device), value, Duration::from_millis(100))
                .await
                .unwrap();

            let err = tracker.position(device).await.unwrap_err();
            assert_eq!(
                err.downcast_ref::<TrackerError>(),
                Some(&TrackerError::InvalidPosition {
                    device_id: device.to_string(),
                    value
                })
            );
        }
    }

    #[tokio::test]
    async fn negative_counter_is_an_error_on_new_series() {
        let (tracker, storage, _clock) = tracker_with_clock();
        storage
            .set_with_expiry("pos:r:dev", -5, Duration::from_millis(100))
            .await
            .unwrap();

        let err = tracker.position("dev").await.unwrap_err();
        assert_eq!(
            err.downcast_ref::<TrackerError>(),
            Some(&TrackerError::InvalidPosition {
                device_id: "dev".to_string(),
                value: -4
            })
        );
    }

    fn random_device() -> String {
        format!("test_ifa_{}", rand::thread_rng().gen::<u64>())
    }

    #[tokio::test]
    #[ignore = "requires a redis server on 127.0.0.1:6379"]
    async fn redis_follows_series_scenario() {
        let storage = Arc::new(RedisCounterStorage::new_localhost().await);
        let series_ms = 1000;
        let reset_ms = 2000;
        let timeouts =
            Timeouts::new(Duration::from_millis(series_ms), Duration::from_millis(reset_ms))
                .unwrap();
        let tracker = StoragePositionTracker::new(storage, timeouts);
        let device = random_device();

        for (i, (gap_ms, expected)) in [
            (0, 1),
            (series_ms / 2, 1),
            (series_ms - 100, 1),
            (series_ms + 100, 2),
            (reset_ms - 100, 3),
            (reset_ms + 100, 1),
        ]
        .into_iter()
        .enumerate()
        {
            tokio::time::sleep(Duration::from_millis(gap_ms)).await;
            let position = tracker.position(&device).await.unwrap();
            assert_eq!(position, expected, "[{}] wrong position", i);
        }
    }

    #[tokio::test]
    #[ignore = "requires a redis server on 127.0.0.1:6379"]
    async fn redis_devices_do_not_interfere() {
        let storage = Arc::new(RedisCounterStorage::new_localhost().await);
        let tracker = Arc::new(StoragePositionTracker::new(
            storage,
            Timeouts::new(Duration::from_secs(5), Duration::from_secs(60)).unwrap(),
        ));
        let devices = (0..16).map(|_| random_device()).collect::<Vec<_>>();

        let positions = join_all(devices.iter().map(|device| tracker.position(device))).await;
        assert!(positions.into_iter().all(|position| position.unwrap() == 1));
    }
}
