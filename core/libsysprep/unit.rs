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

//! Unit descriptors and the collaborators that produce and prepare them.
use crate::error::BoxError;
use async_trait::async_trait;
use std::{
    collections::HashMap,
    fmt::{self, Debug},
    sync::{Arc, RwLock},
};

/// The preparation capability of a unit, opaque to the resolver.
#[async_trait]
pub trait Service: Send + Sync {
    /// do everything the unit needs before it can be started
    async fn prepare(&self) -> Result<(), BoxError>;

    /// undo `prepare`; failures are logged by the caller and never escalated
    async fn cleanup(&self) -> Result<(), BoxError>;
}

/// A service with nothing to prepare, e.g. for grouping units.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopService;

#[async_trait]
impl Service for NoopService {
    async fn prepare(&self) -> Result<(), BoxError> {
        Ok(())
    }

    async fn cleanup(&self) -> Result<(), BoxError> {
        Ok(())
    }
}

/// A loaded unit: name, dependency lists and its service.
/// Immutable once loaded.
#[derive(Clone)]
pub struct Unit {
    name: String,
    requires: Vec<String>,
    wants: Vec<String>,
    before: Vec<String>,
    service: Arc<dyn Service>,
}

impl Debug for Unit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Unit")
            .field("name", &self.name)
            .field("requires", &self.requires)
            .field("wants", &self.wants)
            .field("before", &self.before)
            .finish_non_exhaustive()
    }
}

impl Unit {
    ///
    pub fn new(name: &str, service: Arc<dyn Service>) -> Self {
        Unit {
            name: name.to_string(),
            requires: Vec::new(),
            wants: Vec::new(),
            before: Vec::new(),
            service,
        }
    }

    /// set the hard dependencies
    pub fn with_requires<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.requires = names.into_iter().map(Into::into).collect();
        self
    }

    /// set the soft dependencies
    pub fn with_wants<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.wants = names.into_iter().map(Into::into).collect();
        self
    }

    /// set the start-ordering hints
    pub fn with_before<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.before = names.into_iter().map(Into::into).collect();
        self
    }

    ///
    pub fn name(&self) -> &str {
        &self.name
    }

    ///
    pub fn requires(&self) -> &[String] {
        &self.requires
    }

    ///
    pub fn wants(&self) -> &[String] {
        &self.wants
    }

    ///
    pub fn before(&self) -> &[String] {
        &self.before
    }

    ///
    pub fn service(&self) -> &Arc<dyn Service> {
        &self.service
    }
}

/// Loads a unit descriptor by name.
#[async_trait]
pub trait UnitLoad: Send + Sync {
    /// load the unit, or report why it is missing or invalid
    async fn load_unit(&self, name: &str) -> Result<Unit, BoxError>;
}

/// An in-memory set of unit descriptors that can serve as loader.
#[derive(Default)]
pub struct UnitTable {
    units: RwLock<HashMap<String, Unit>>,
}

impl UnitTable {
    ///
    pub fn new() -> Self {
        Self::default()
    }

    /// insert the unit, replacing the one with the same name
    pub fn insert(&self, unit: Unit) {
        if let Ok(mut units) = self.units.write() {
            units.insert(unit.name().to_string(), unit);
        }
    }

    ///
    pub fn remove(&self, name: &str) -> Option<Unit> {
        self.units.write().ok()?.remove(name)
    }

    ///
    pub fn len(&self) -> usize {
        self.units.read().map(|u| u.len()).unwrap_or(0)
    }

    ///
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl UnitLoad for UnitTable {
    async fn load_unit(&self, name: &str) -> Result<Unit, BoxError> {
        let units = self
            .units
            .read()
            .map_err(|_| BoxError::from("unit table lock poisoned"))?;
        match units.get(name) {
            Some(unit) => Ok(unit.clone()),
            None => Err(format!("unit file of '{}' not found", name).into()),
        }
    }
}
