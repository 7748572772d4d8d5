// Copyright (c) 2024 IOTA Stiftung
// SPDX-License-Identifier: Apache-2.0

use reqwest::Client;

use crate::rpc::rpc_types::{ErrorResponse, PositionRequest, PositionResponse};
use crate::tracker::Stat;

pub struct PositionRpcClient {
    client: Client,
    server_address: String,
}

impl PositionRpcClient {
    pub fn new(server_address: String) -> Self {
        let client = Client::new();
        Self {
            client,
            server_address,
        }
    }

    pub async fn health(&self) -> anyhow::Result<()> {
        let url = format!("{}/", self.server_address);
        let response = self.client.get(&url).send().await?;
        if !response.status().is_success() {
            anyhow::bail!("Health check failed with status {}", response.status());
        }
        Ok(())
    }

    pub async fn version(&self) -> anyhow::Result<String> {
        let url = format!("{}/version", self.server_address);
        let response = self.client.get(&url).send().await?.error_for_status()?;
        Ok(response.text().await?)
    }

    pub async fn position(&self, request: &PositionRequest) -> anyhow::Result<u64> {
        let url = format!("{}/", self.server_address);
        let response = self.client.post(&url).json(request).send().await?;
        let status = response.status();
        let response = response.json::<PositionResponse>().await?;
        match response {
            PositionResponse { pos: Some(pos), .. } if status.is_success() => Ok(pos),
            PositionResponse { error, .. } => Err(anyhow::anyhow!(
                "Position request failed with status {}: {}",
                status,
                error.unwrap_or_default()
            )),
        }
    }

    pub async fn stats(&self) -> anyhow::Result<Vec<Stat>> {
        let url = format!("{}/stats", self.server_address);
        let response = self.client.get(&url).send().await?;
        let status = response.status();
        if !status.is_success() {
            let error = response.json::<ErrorResponse>().await?;
            anyhow::bail!("Stats request failed with status {}: {}", status, error.error);
        }
        Ok(response.json::<Vec<Stat>>().await?)
    }
}
