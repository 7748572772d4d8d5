// Copyright (c) 2024 IOTA Stiftung
// SPDX-License-Identifier: Apache-2.0

use once_cell::sync::Lazy;
use redis::Script;

const ADVANCE_POSITION_SCRIPT: &str = include_str!("lua_scripts/advance_position.lua");

pub struct ScriptManager;

impl ScriptManager {
    pub fn advance_position_script() -> &'static Script {
        static SCRIPT: Lazy<Script> = Lazy::new(|| Script::new(ADVANCE_POSITION_SCRIPT));
        Lazy::force(&SCRIPT)
    }
}
