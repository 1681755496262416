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

//! Log targets.
use log::{Level, Log, Metadata, Record};
use std::{
    fs::{self, File, OpenOptions},
    io::{Error, Write},
    os::unix::prelude::{OpenOptionsExt, PermissionsExt},
    path::{Path, PathBuf},
    sync::Mutex,
};

/// Logger instance should implement `ReInit` too.
pub trait ReInit: Log {
    /// Define how logger instance reinitializes.
    fn reinit(&self) {}
}

fn now_str() -> String {
    let time: libc::time_t = unsafe { libc::time(std::ptr::null_mut()) };
    let mut tm: libc::tm = unsafe { std::mem::zeroed() };
    if unsafe { libc::localtime_r(&time, &mut tm) }.is_null() {
        return String::from("0000-00-00 00:00:00");
    }
    format!(
        "{:0>4}-{:0>2}-{:0>2} {:0>2}:{:0>2}:{:0>2}",
        tm.tm_year + 1900, /* tm_year is years since 1900 */
        tm.tm_mon + 1,     /* tm_mon is months since Jan: [0, 11] */
        tm.tm_mday,
        tm.tm_hour,
        tm.tm_min,
        tm.tm_sec
    )
}

fn format_record(record: &Record) -> String {
    format!(
        "{} {:<5} {} {}\n",
        now_str(),
        record.level(),
        record.module_path().unwrap_or("unknown"),
        record.args()
    )
}

struct ConsoleLogger {
    level: Level,
}

impl ReInit for ConsoleLogger {}

impl Log for ConsoleLogger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.level() <= self.level
    }

    fn log(&self, record: &Record) {
        if !self.enabled(record.metadata()) {
            return;
        }
        let mut stdout = std::io::stdout().lock();
        if let Err(e) = stdout.write_all(format_record(record).as_bytes()) {
            eprintln!("Failed to log message: {}", e);
        }
    }

    fn flush(&self) {
        let _ = std::io::stdout().flush();
    }
}

struct FileLogger {
    level: Level,
    file_path: PathBuf,
    file_mode: u32,
    file: Mutex<Option<File>>,
}

impl FileLogger {
    fn new(level: Level, file_path: PathBuf, file_mode: u32) -> Result<Self, Error> {
        let file = Self::file_open(&file_path, file_mode)?;
        Ok(Self {
            level,
            file_path,
            file_mode,
            file: Mutex::new(Some(file)),
        })
    }

    fn file_open(file_path: &Path, file_mode: u32) -> Result<File, Error> {
        if let Some(dir) = file_path.parent() {
            if !dir.as_os_str().is_empty() && !dir.exists() {
                fs::create_dir_all(dir)?;
                fs::set_permissions(dir, fs::Permissions::from_mode(0o700))?;
            }
        }

        OpenOptions::new()
            .write(true)
            .create(true)
            .append(true)
            .mode(file_mode)
            .open(file_path)
    }
}

impl ReInit for FileLogger {
    fn reinit(&self) {
        match Self::file_open(&self.file_path, self.file_mode) {
            Ok(file) => {
                if let Ok(mut guard) = self.file.lock() {
                    *guard = Some(file);
                }
            }
            Err(e) => eprintln!(
                "Failed to reopen log file '{}': {}",
                self.file_path.display(),
                e
            ),
        }
    }
}

impl Log for FileLogger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.level() <= self.level
    }

    fn log(&self, record: &Record) {
        if !self.enabled(record.metadata()) {
            return;
        }
        let mut guard = match self.file.lock() {
            Err(_) => return,
            Ok(v) => v,
        };
        if let Some(file) = guard.as_mut() {
            if let Err(e) = file.write_all(format_record(record).as_bytes()) {
                eprintln!("Failed to write log file: {}", e);
            }
        }
    }

    fn flush(&self) {
        if let Ok(mut guard) = self.file.lock() {
            if let Some(file) = guard.as_mut() {
                let _ = file.flush();
            }
        }
    }
}

/// Collect different kinds of loggers together that implements `ReInit` trait.
struct CombinedLogger {
    loggers: Vec<Box<dyn ReInit>>,
}

impl ReInit for CombinedLogger {
    fn reinit(&self) {
        for logger in self.loggers.iter() {
            logger.reinit()
        }
    }
}

impl Log for CombinedLogger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        self.loggers.iter().any(|l| l.enabled(metadata))
    }

    fn log(&self, record: &Record) {
        for logger in &self.loggers {
            logger.log(record);
        }
    }

    fn flush(&self) {
        for logger in &self.loggers {
            logger.flush();
        }
    }
}

/// Parse a level name as used in configuration files, `info` on anything unknown.
pub fn parse_level(level: &str) -> Level {
    match level.trim().to_ascii_lowercase().as_str() {
        "error" => Level::Error,
        "warn" | "warning" => Level::Warn,
        "debug" => Level::Debug,
        "trace" => Level::Trace,
        _ => Level::Info,
    }
}

/// Initialize the global logger instance.
/// Available log `targets` are `console` and `file`; `file_path` only takes
/// effect on `file`. Repeated targets take effect only once.
///
/// # Arguments
///
/// * `name` - The application name that initializes the logger. Just used for debugging.
/// * `level` - Log message level.
/// * `targets` - A set of log targets.
/// * `file_path` - The log file path.
pub fn init_log(name: &str, level: Level, targets: &[&str], file_path: &str) {
    let mut loggers: Vec<Box<dyn ReInit>> = Vec::new();
    let mut seen: Vec<&str> = Vec::new();

    for target in targets.iter().map(|t| t.trim()) {
        if seen.contains(&target) {
            continue;
        }
        seen.push(target);

        let logger = match target {
            "console" => Box::new(ConsoleLogger { level }) as Box<dyn ReInit>,
            "file" => match FileLogger::new(level, PathBuf::from(file_path), 0o600) {
                Ok(logger) => Box::new(logger) as Box<dyn ReInit>,
                Err(e) => {
                    eprintln!(
                        "{} failed to create '{}' file logger: {:?}",
                        name, file_path, e
                    );
                    continue;
                }
            },
            _ => {
                eprintln!("{}: log target '{}' is strange, ignoring.", name, target);
                continue;
            }
        };
        loggers.push(logger);
    }

    if loggers.is_empty() {
        eprintln!("{}: no available log targets.", name);
    }

    if let Err(e) = crate::inner::set_boxed_logger(Box::new(CombinedLogger { loggers })) {
        eprintln!("{}: failed to set global logger: {:?}", name, e);
        return;
    }
    log::set_max_level(level.to_level_filter());
}
