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

//! Status notifications sent to the engine's event sink.
use std::fmt::{self, Display};

#[allow(missing_docs)]
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum EventStatus {
    AlreadyLoaded,
    Preparing,
    Prepared,
    Failed,
    CleanedUp,
}

impl Display for EventStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            EventStatus::AlreadyLoaded => "already-loaded",
            EventStatus::Preparing => "preparing",
            EventStatus::Prepared => "prepared",
            EventStatus::Failed => "failed",
            EventStatus::CleanedUp => "cleaned-up",
        };
        f.write_str(s)
    }
}

/// A status change of one unit.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Event {
    pub unit: String,
    pub status: EventStatus,
}

impl Event {
    ///
    pub fn new(unit: &str, status: EventStatus) -> Self {
        Event {
            unit: unit.to_string(),
            status,
        }
    }
}

impl Display for Event {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.unit, self.status)
    }
}
