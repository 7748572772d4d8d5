// Copyright (c) 2024 IOTA Stiftung
// SPDX-License-Identifier: Apache-2.0

use std::net::Ipv4Addr;
use std::path::Path;
use std::time::Duration;

use anyhow::Context;
use serde::{Deserialize, Serialize};

use crate::errors::TrackerError;
use crate::series::Timeouts;

pub const DEFAULT_RPC_PORT: u16 = 8080;
pub const DEFAULT_METRICS_PORT: u16 = 9184;
pub const DEFAULT_SERIES_TIMEOUT: Duration = Duration::from_secs(5);
pub const DEFAULT_RESET_TIMEOUT: Duration = Duration::from_secs(600);

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct PositionServiceConfig {
    #[serde(with = "serde_yaml::with::singleton_map")]
    pub storage_config: StorageConfig,
    #[serde(with = "serde_duration")]
    pub series_timeout: Duration,
    #[serde(with = "serde_duration")]
    pub reset_timeout: Duration,
    /// Run the Redis position update as a single server-side script.
    #[serde(default)]
    pub atomic_position: bool,
    pub rpc_host_ip: Ipv4Addr,
    pub rpc_port: u16,
    pub metrics_port: u16,
}

impl Default for PositionServiceConfig {
    fn default() -> Self {
        Self {
            storage_config: StorageConfig::default(),
            series_timeout: DEFAULT_SERIES_TIMEOUT,
            reset_timeout: DEFAULT_RESET_TIMEOUT,
            atomic_position: false,
            rpc_host_ip: Ipv4Addr::UNSPECIFIED,
            rpc_port: DEFAULT_RPC_PORT,
            metrics_port: DEFAULT_METRICS_PORT,
        }
    }
}

impl PositionServiceConfig {
    pub fn load(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let file = std::fs::File::open(path)
            .with_context(|| format!("unable to open config file {}", path.display()))?;
        serde_yaml::from_reader(file)
            .with_context(|| format!("unable to parse config file {}", path.display()))
    }

    pub fn save(&self, path: impl AsRef<Path>) -> anyhow::Result<()> {
        let path = path.as_ref();
        let file = std::fs::File::create(path)
            .with_context(|| format!("unable to create config file {}", path.display()))?;
        serde_yaml::to_writer(file, self)?;
        Ok(())
    }

    pub fn timeouts(&self) -> Result<Timeouts, TrackerError> {
        Timeouts::new(self.series_timeout, self.reset_timeout)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum StorageConfig {
    /// Private process memory. Positions are not shared between instances.
    Memory,
    #[serde(rename_all = "kebab-case")]
    Redis { redis_url: String },
}

impl Default for StorageConfig {
    fn default() -> Self {
        StorageConfig::Redis {
            redis_url: "redis://127.0.0.1".to_string(),
        }
    }
}

mod serde_duration {
    use std::time::Duration;

    use serde::Deserialize;

    pub fn serialize<S>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        let s = humantime::format_duration(*value).to_string();
        serializer.serialize_str(&s)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        humantime::parse_duration(&s).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn deserialize_config() {
        let yaml = r#"
storage-config:
  redis:
    redis-url: "redis://redis:6379"
series-timeout: 20ms
reset-timeout: 1m 40s
rpc-host-ip: 127.0.0.1
rpc-port: 9527
metrics-port: 9184
"#;
        let config: PositionServiceConfig = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(
            config.storage_config,
            StorageConfig::Redis {
                redis_url: "redis://redis:6379".to_string()
            }
        );
        assert_eq!(config.series_timeout, Duration::from_millis(20));
        assert_eq!(config.reset_timeout, Duration::from_secs(100));
        assert!(!config.atomic_position);
        assert_eq!(config.rpc_host_ip, Ipv4Addr::LOCALHOST);
        assert_eq!(config.rpc_port, 9527);
    }

    #[test]
    fn deserialize_memory_storage() {
        let yaml = r#"
storage-config: memory
series-timeout: 5s
reset-timeout: 10m
atomic-position: true
rpc-host-ip: 0.0.0.0
rpc-port: 8080
metrics-port: 9184
"#;
        let config: PositionServiceConfig = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(config.storage_config, StorageConfig::Memory);
        assert!(config.atomic_position);
        assert!(config.timeouts().is_ok());
    }

    #[test]
    fn invalid_duration_is_rejected() {
        let yaml = r#"
storage-config: memory
series-timeout: soon
reset-timeout: 10m
rpc-host-ip: 0.0.0.0
rpc-port: 8080
metrics-port: 9184
"#;
        assert!(serde_yaml::from_str::<PositionServiceConfig>(yaml).is_err());
    }

    #[test]
    fn save_and_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.yaml");
        let config = PositionServiceConfig {
            storage_config: StorageConfig::Memory,
            series_timeout: Duration::from_millis(250),
            ..Default::default()
        };
        config.save(&path).unwrap();

        let loaded = PositionServiceConfig::load(&path).unwrap();
        assert_eq!(loaded, config);

        let config = PositionServiceConfig {
            atomic_position: true,
            ..Default::default()
        };
        config.save(&path).unwrap();
        assert_eq!(PositionServiceConfig::load(&path).unwrap(), config);
    }

    #[test]
    fn inverted_timeouts_are_a_config_error() {
        let config = PositionServiceConfig {
            series_timeout: Duration::from_millis(200),
            reset_timeout: Duration::from_millis(100),
            ..Default::default()
        };
        assert!(matches!(
            config.timeouts(),
            Err(TrackerError::InvalidTimeouts { .. })
        ));
    }
}
