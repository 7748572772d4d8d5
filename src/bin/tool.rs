// Copyright (c) 2024 IOTA Stiftung
// SPDX-License-Identifier: Apache-2.0

use std::path::PathBuf;

use clap::*;
use position_tracker::config::{PositionServiceConfig, StorageConfig};
use position_tracker::rpc::client::PositionRpcClient;
use position_tracker::rpc::rpc_types::PositionRequest;

#[derive(Parser)]
#[command(
    name = "position-tracker-tool",
    about = "Position Tracker Command Line Tools",
    rename_all = "kebab-case"
)]
pub enum ToolCommand {
    /// Generate a sample config file and put it in the specified path.
    #[clap(name = "generate-sample-config")]
    GenerateSampleConfig {
        #[arg(long, help = "Path to config file")]
        config_path: PathBuf,
        #[arg(long, help = "Keep positions in process memory instead of redis")]
        in_memory: bool,
        #[arg(long, help = "Configuration for docker compose")]
        docker_compose: bool,
        #[arg(long, short, help = "Overwrite the existing config file")]
        force: bool,
    },
    #[clap(name = "cli")]
    CLI {
        #[clap(subcommand)]
        cli_command: CliCommand,
    },
}

#[derive(Subcommand)]
pub enum CliCommand {
    /// A simple health check to see if the server is up and running.
    CheckHealth {
        #[clap(long, help = "Full URL of the RPC server")]
        rpc_url: String,
    },
    GetVersion {
        #[clap(long, help = "Full URL of the RPC server")]
        rpc_url: String,
    },
    /// Send one position request, as a device would.
    GetPosition {
        #[clap(long, help = "Full URL of the RPC server")]
        rpc_url: String,
        #[clap(long, help = "Device identifier")]
        ifa: String,
        #[clap(long, default_value = "")]
        bundle: String,
        #[clap(long, default_value = "")]
        os: String,
        #[clap(long, default_value = "")]
        country: String,
    },
    /// Print the request counters collected so far.
    GetStats {
        #[clap(long, help = "Full URL of the RPC server")]
        rpc_url: String,
    },
}

impl ToolCommand {
    pub async fn execute(self) -> anyhow::Result<()> {
        match self {
            ToolCommand::GenerateSampleConfig {
                config_path,
                in_memory,
                docker_compose,
                force,
            } => {
                let storage_config = if in_memory {
                    StorageConfig::Memory
                } else if docker_compose {
                    StorageConfig::Redis {
                        redis_url: "redis://redis:6379".to_string(),
                    }
                } else {
                    StorageConfig::Redis {
                        redis_url: "redis://127.0.0.1".to_string(),
                    }
                };
                let config = PositionServiceConfig {
                    storage_config,
                    ..Default::default()
                };
                if config_path.exists() && !force {
                    anyhow::bail!("Config file already exists. Use --force (-f) to overwrite.");
                }
                config.save(&config_path)?;
                println!("Sample config written to {}", config_path.display());
            }
            ToolCommand::CLI { cli_command } => match cli_command {
                CliCommand::CheckHealth { rpc_url } => {
                    let client = PositionRpcClient::new(rpc_url);
                    client.health().await?;
                    println!("Server is healthy");
                }
                CliCommand::GetVersion { rpc_url } => {
                    let client = PositionRpcClient::new(rpc_url);
                    let version = client.version().await?;
                    println!("Server version: {}", version);
                }
                CliCommand::GetPosition {
                    rpc_url,
                    ifa,
                    bundle,
                    os,
                    country,
                } => {
                    let client = PositionRpcClient::new(rpc_url);
                    let request = PositionRequest::new(&ifa, &bundle, &os, &country);
                    let position = client.position(&request).await?;
                    println!("Position of {}: {}", ifa, position);
                }
                CliCommand::GetStats { rpc_url } => {
                    let client = PositionRpcClient::new(rpc_url);
                    for stat in client.stats().await? {
                        println!(
                            "{}\t{}\t{}\t{}",
                            stat.app, stat.platform, stat.country, stat.count
                        );
                    }
                }
            },
        }
        Ok(())
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let command = ToolCommand::parse();
    command.execute().await
}
