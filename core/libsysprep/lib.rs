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

//! Dependency resolution and transactional preparation of units.
//!
//! A unit is loaded by name, its `Requires` and `Wants` lists are loaded and
//! prepared concurrently, recursively, and the unit's own service is prepared
//! last. The first failure anywhere cancels the whole preparation and
//! everything prepared so far is cleaned up.
pub mod config;
pub mod engine;
pub mod error;
pub mod event;
pub mod job;
pub mod unit;

#[cfg(test)]
pub(crate) mod test_utils;

pub use config::{ResolveConfig, WantsPolicy};
pub use engine::Engine;
pub use error::*;
pub use event::{Event, EventStatus};
pub use job::{build_units, DepKind, DepList, Transaction, UnitMap};
pub use unit::{NoopService, Service, Unit, UnitLoad, UnitTable};
