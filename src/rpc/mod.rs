// Copyright (c) 2024 IOTA Stiftung
// SPDX-License-Identifier: Apache-2.0

pub mod client;
pub mod rpc_types;
mod server;

pub use server::PositionServer;
