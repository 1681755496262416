// Copyright (c) 2022 Huawei Technologies Co.,Ltd. All rights reserved.
//
// sysMaster is licensed under Mulan PSL v2.
// You can use this software according to the terms and conditions of the Mulan
// PSL v2.
// You may obtain a copy of Mulan PSL v2 at:
//         http://license.coscl.org.cn/MulanPSL2
// THIS SOFTWARE IS PROVIDED ON AN "AS IS" BASIS, WITHOUT WARRANTIES OF ANY
// KIND, EITHER EXPRESS OR IMPLIED, INCLUDING BUT NOT LIMITED TO
// NON-INFRINGEMENT, MERCHANTABILITY OR FIT FOR A PARTICULAR PURPOSE.
// See the Mulan PSL v2 for more details.

//! Logging for sysprep.
//!
//! A thin layer over the `log` facade: the facade macros are re-exported as
//! they are, while the records are routed to a combined set of targets
//! (`console`, `file`) that can be replaced or reopened at runtime.
pub mod inner;
pub mod logger;

/// reexport the facade
pub use log::{debug, error, info, log, trace, warn};
pub use log::{max_level, set_max_level};
pub use log::{Level, LevelFilter, Log, Metadata, Record};

pub use logger::{init_log, parse_level, ReInit};

/// Reinit the logger based on the previous configuration
pub fn reinit() {
    inner::reinit();
}

/// Initialize console logger.
pub fn init_log_to_console(name: &str, level: Level) {
    init_log(name, level, &["console"], "");
}

/// Initialize file logger.
pub fn init_log_to_file(name: &str, level: Level, file_path: &str) {
    init_log(name, level, &["file"], file_path);
}

/// Initialize console and file logger.
pub fn init_log_to_console_file(name: &str, level: Level, file_path: &str) {
    init_log(name, level, &["console", "file"], file_path);
}
