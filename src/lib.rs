// Copyright (c) 2024 IOTA Stiftung
// SPDX-License-Identifier: Apache-2.0

pub mod clock;
pub mod command;
pub mod config;
pub mod errors;
pub mod logging;
pub mod metrics;
pub mod rpc;
pub mod series;
pub mod storage;
pub mod tracker;

#[cfg(test)]
pub mod test_env;

pub const POSITIONS_LOGGING_ENV_NAME: &str = "POSITIONS_LOGGING";
pub const POSITIONS_LOGGING_TARGET_NAME: &str = "positions";
pub const GIT_REVISION: &str = {
    if let Some(revision) = option_env!("GIT_REVISION") {
        revision
    } else {
        git_version::git_version!(
            args = ["--always", "--abbrev=12", "--dirty", "--exclude", "*"],
            fallback = "unknown"
        )
    }
};
pub const VERSION: &str = const_str::concat!(env!("CARGO_PKG_VERSION"), "-", GIT_REVISION);
