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

//! Resolution configuration.
//! Values are layered: environment first, then the configuration file, then
//! the defaults below.
#![allow(non_snake_case)]

use crate::error::*;
use confique::{Config, FileFormat, Partial};
use std::str::FromStr;

/// default configuration file
pub const SYSPREP_CONFIG: &str = "/etc/sysprep/sysprep.conf";

const WANTS_FAILURE_DEFAULT: &str = "fatal";
const LOG_FILE_DEFAULT: &str = "/var/log/sysprep/sysprep.log";

/// What a failing `Wants` dependency does to the parent's resolution.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum WantsPolicy {
    /// same treatment as `Requires`: the whole pass fails
    #[default]
    Fatal,
    /// log the failure and continue without the unit
    Ignore,
}

impl FromStr for WantsPolicy {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "fatal" => Ok(WantsPolicy::Fatal),
            "ignore" => Ok(WantsPolicy::Ignore),
            other => Err(Error::InvalidConfig {
                msg: format!("WantsFailure = {}", other),
            }),
        }
    }
}

/// configuration of the resolution core
#[derive(Config, Clone, Debug)]
pub struct ResolveConfig {
    #[config(env = "SYSPREP_WANTS_FAILURE", default = "fatal")]
    pub WantsFailure: String,
    /// skip dependencies already registered in the engine
    #[config(env = "SYSPREP_SKIP_REGISTERED", default = false)]
    pub SkipRegistered: bool,
    /// capacity of the handoff channels between pipeline stages
    #[config(env = "SYSPREP_CHANNEL_CAPACITY", default = 1)]
    pub ChannelCapacity: usize,

    #[config(env = "SYSPREP_LOG_LEVEL", default = "info")]
    pub LogLevel: String,
    #[config(env = "SYSPREP_LOG_TARGET", default = "console")]
    pub LogTarget: String,
    #[config(env = "SYSPREP_LOG_FILE", default = "/var/log/sysprep/sysprep.log")]
    pub LogFile: String,
}

impl ResolveConfig {
    /// Load the configuration, falling back to the defaults on any error.
    pub fn new(file: Option<&str>) -> ResolveConfig {
        match Self::load(file.unwrap_or(SYSPREP_CONFIG)) {
            Ok(v) => v,
            Err(e) => {
                log::warn!("Failed to load configuration, using defaults: {}", e);
                ResolveConfig::default()
            }
        }
    }

    /// Load the configuration, reporting errors.
    pub fn load(file: &str) -> Result<ResolveConfig> {
        type ConfigPartial = <ResolveConfig as Config>::Partial;
        let mut partial: ConfigPartial = Partial::from_env()?;
        partial =
            partial.with_fallback(confique::File::with_format(file, FileFormat::Toml).load()?);
        partial = partial.with_fallback(ConfigPartial::default_values());
        let config = ResolveConfig::from_partial(partial)?;
        config.wants_policy()?;
        Ok(config)
    }

    /// parsed `WantsFailure`
    pub fn wants_policy(&self) -> Result<WantsPolicy> {
        self.WantsFailure.parse()
    }

    /// channel capacity, never below one
    pub fn channel_capacity(&self) -> usize {
        self.ChannelCapacity.max(1)
    }

    /// Initialize the global logger from `LogLevel`, `LogTarget` and `LogFile`.
    pub fn init_log(&self, name: &str) {
        let targets: Vec<&str> = self.LogTarget.split(',').map(|t| t.trim()).collect();
        log::init_log(name, log::parse_level(&self.LogLevel), &targets, &self.LogFile);
    }
}

impl Default for ResolveConfig {
    fn default() -> Self {
        Self {
            WantsFailure: WANTS_FAILURE_DEFAULT.to_string(),
            SkipRegistered: false,
            ChannelCapacity: 1,
            LogLevel: "info".to_string(),
            LogTarget: "console".to_string(),
            LogFile: LOG_FILE_DEFAULT.to_string(),
        }
    }
}

#[cfg(test)]
mod test {
    use std::io::Write;
    use std::path::PathBuf;

    use super::*;

    #[test]
    fn load() {
        let mut file = PathBuf::from(env!("CARGO_MANIFEST_DIR"));
        file.push("config/sysprep.conf");
        let config = ResolveConfig::new(file.to_str());
        assert_eq!(config.wants_policy().unwrap(), WantsPolicy::Fatal);
        assert!(!config.SkipRegistered);
        assert_eq!(config.LogTarget, "console");
    }

    #[test]
    fn load_file_overrides_defaults() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "WantsFailure = \"ignore\"").unwrap();
        writeln!(file, "SkipRegistered = true").unwrap();
        writeln!(file, "LogLevel = \"debug\"").unwrap();

        let config = ResolveConfig::load(file.path().to_str().unwrap()).unwrap();
        assert_eq!(config.wants_policy().unwrap(), WantsPolicy::Ignore);
        assert!(config.SkipRegistered);
        assert_eq!(config.LogLevel, "debug");
        assert_eq!(config.LogFile, LOG_FILE_DEFAULT);
    }

    #[test]
    fn load_rejects_bad_policy() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "WantsFailure = \"sometimes\"").unwrap();

        assert!(ResolveConfig::load(file.path().to_str().unwrap()).is_err());
        let config = ResolveConfig::new(file.path().to_str());
        assert_eq!(config.wants_policy().unwrap(), WantsPolicy::Fatal);
    }

    #[test]
    fn load_from_env() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "ChannelCapacity = 2").unwrap();

        std::env::set_var("SYSPREP_CHANNEL_CAPACITY", "4");
        let config = ResolveConfig::load(file.path().to_str().unwrap());
        std::env::remove_var("SYSPREP_CHANNEL_CAPACITY");
        assert_eq!(config.unwrap().channel_capacity(), 4);
    }

    #[test]
    fn load_missing_file() {
        let config = ResolveConfig::load("/nonexistent/sysprep.conf").unwrap();
        assert_eq!(config.WantsFailure, WANTS_FAILURE_DEFAULT);
    }

    #[test]
    fn channel_capacity_floor() {
        let config = ResolveConfig {
            ChannelCapacity: 0,
            ..Default::default()
        };
        assert_eq!(config.channel_capacity(), 1);
    }
}
