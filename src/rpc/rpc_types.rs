// Copyright (c) 2024 IOTA Stiftung
// SPDX-License-Identifier: Apache-2.0

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// The subset of an ad request the service reads. Missing fields decode as empty strings.
#[derive(Clone, Debug, Default, JsonSchema, Serialize, Deserialize)]
pub struct PositionRequest {
    #[serde(default)]
    pub app: AppInfo,
    #[serde(default)]
    pub device: DeviceInfo,
}

#[derive(Clone, Debug, Default, JsonSchema, Serialize, Deserialize)]
pub struct AppInfo {
    #[serde(default)]
    pub bundle: String,
}

#[derive(Clone, Debug, Default, JsonSchema, Serialize, Deserialize)]
pub struct DeviceInfo {
    #[serde(default)]
    pub geo: GeoInfo,
    #[serde(default)]
    pub os: String,
    #[serde(default)]
    pub ifa: String,
}

#[derive(Clone, Debug, Default, JsonSchema, Serialize, Deserialize)]
pub struct GeoInfo {
    #[serde(default)]
    pub country: String,
}

impl PositionRequest {
    pub fn new(ifa: &str, bundle: &str, os: &str, country: &str) -> Self {
        Self {
            app: AppInfo {
                bundle: bundle.to_string(),
            },
            device: DeviceInfo {
                geo: GeoInfo {
                    country: country.to_string(),
                },
                os: os.to_string(),
                ifa: ifa.to_string(),
            },
        }
    }

    pub fn from_body(body: &[u8]) -> anyhow::Result<Self> {
        if body.is_empty() {
            anyhow::bail!("'body' is empty");
        }
        Ok(serde_json::from_slice(body)?)
    }

    pub fn check_validity(&self) -> anyhow::Result<()> {
        if self.device.ifa.is_empty() {
            anyhow::bail!("'ifa' is empty");
        }
        Ok(())
    }
}

#[derive(Debug, JsonSchema, Serialize, Deserialize)]
pub struct PositionResponse {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pos: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl PositionResponse {
    pub fn new_ok(pos: u64) -> Self {
        Self {
            pos: Some(pos),
            error: None,
        }
    }

    pub fn new_err(error: anyhow::Error) -> Self {
        Self {
            pos: None,
            error: Some(error.to_string()),
        }
    }
}

#[derive(Debug, JsonSchema, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
}

impl ErrorResponse {
    pub fn new(error: anyhow::Error) -> Self {
        Self {
            error: error.to_string(),
        }
    }
}
