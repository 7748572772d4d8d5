// Copyright (c) 2024 IOTA Stiftung
// SPDX-License-Identifier: Apache-2.0

use clap::Parser;
use position_tracker::command::Command;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let command = Command::parse();
    command.execute().await
}
