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

//! The global dispatcher.
//!
//! The `log` facade only accepts one logger for the whole process, so a static
//! dispatcher is registered once and forwards every record to the current
//! combined logger, which may be swapped by a later `init_log`.
use std::{
    io::{Error, ErrorKind},
    sync::RwLock,
};

use log::{Log, Metadata, Record};
use once_cell::sync::Lazy;

use crate::logger::ReInit;

static CURRENT: Lazy<RwLock<Option<Box<dyn ReInit>>>> = Lazy::new(|| RwLock::new(None));

/* Whether the dispatcher won the registration with the facade. */
static INSTALLED: Lazy<bool> = Lazy::new(|| log::set_logger(&DISPATCHER).is_ok());

struct Dispatcher;

static DISPATCHER: Dispatcher = Dispatcher;

impl Log for Dispatcher {
    fn enabled(&self, metadata: &Metadata) -> bool {
        match CURRENT.read() {
            Ok(current) => current.as_ref().map_or(false, |l| l.enabled(metadata)),
            Err(_) => false,
        }
    }

    fn log(&self, record: &Record) {
        if let Ok(current) = CURRENT.read() {
            if let Some(logger) = current.as_ref() {
                logger.log(record);
            }
        }
    }

    fn flush(&self) {
        if let Ok(current) = CURRENT.read() {
            if let Some(logger) = current.as_ref() {
                logger.flush();
            }
        }
    }
}

/// Set the global logger, replacing the previous one.
pub fn set_boxed_logger(logger: Box<dyn ReInit>) -> Result<(), Error> {
    if !*INSTALLED {
        return Err(Error::new(
            ErrorKind::AlreadyExists,
            "another logger is installed",
        ));
    }

    let mut current = CURRENT
        .write()
        .map_err(|_| Error::new(ErrorKind::Other, "logger lock poisoned"))?;
    if let Some(old) = current.as_ref() {
        old.flush();
    }
    *current = Some(logger);
    Ok(())
}

/// Reopen the targets of the global logger.
pub(crate) fn reinit() {
    if let Ok(current) = CURRENT.read() {
        if let Some(logger) = current.as_ref() {
            logger.reinit();
        }
    }
}
