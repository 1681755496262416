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

//! A unit together with the prepared transactions of its dependencies.
use super::abort::Abort;
use super::resolver::{resolve, UnitMap};
use super::{Chain, DepList};
use crate::engine::Engine;
use crate::error::*;
use crate::event::EventStatus;
use crate::unit::Unit;
use futures::future::{BoxFuture, FutureExt};
use std::fmt::{self, Debug};
use std::sync::Arc;

/// The preparation state of one unit.
///
/// A transaction owns its dependencies' transactions. Cleaning it up
/// consumes it, so every transaction is cleaned up at most once.
pub struct Transaction {
    engine: Arc<Engine>,
    unit: Arc<Unit>,
    prepared: bool,
    deps: UnitMap,
}

impl Debug for Transaction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut deps: Vec<&String> = self.deps.keys().collect();
        deps.sort();
        f.debug_struct("Transaction")
            .field("unit", &self.unit.name())
            .field("prepared", &self.prepared)
            .field("deps", &deps)
            .finish()
    }
}

impl Transaction {
    ///
    pub fn new(engine: &Arc<Engine>, unit: Arc<Unit>) -> Self {
        Transaction {
            engine: engine.clone(),
            unit,
            prepared: false,
            deps: UnitMap::new(),
        }
    }

    ///
    pub fn name(&self) -> &str {
        self.unit.name()
    }

    ///
    pub fn unit(&self) -> &Arc<Unit> {
        &self.unit
    }

    ///
    pub fn is_prepared(&self) -> bool {
        self.prepared
    }

    /// prepared dependencies, keyed by unit name
    pub fn deps(&self) -> &UnitMap {
        &self.deps
    }

    /// Resolve the dependencies, then prepare the unit itself.
    ///
    /// On failure everything this call prepared is cleaned up, the unit's
    /// own service included, and the first error is returned. Preparing a
    /// prepared transaction does nothing.
    pub async fn prepare(&mut self) -> Result<()> {
        self.prepare_with(&Chain::default(), None).await
    }

    pub(crate) fn prepare_with<'a>(
        &'a mut self,
        chain: &'a Chain,
        parent: Option<&'a Abort>,
    ) -> BoxFuture<'a, Result<()>> {
        async move {
            if self.prepared {
                return Ok(());
            }

            let name = self.name().to_string();
            log::debug!("Preparing unit {}", name);
            self.engine.notify(&name, EventStatus::Preparing);

            let lists = vec![
                DepList::requires(self.unit.requires().iter().cloned()),
                DepList::wants(self.unit.wants().iter().cloned()),
            ];
            let resolved = resolve(
                self.engine.clone(),
                chain.push(&name),
                parent.cloned(),
                lists,
            )
            .await;
            let result = match resolved {
                Ok(deps) => {
                    self.deps = deps;
                    self.prepare_service(parent).await
                }
                Err(e) => Err(e),
            };

            if let Err(e) = result {
                if e.is_cancelled() {
                    log::debug!("Preparation of unit {} cancelled", name);
                } else {
                    log::error!("Failed to prepare unit {}: {}", name, e);
                }
                self.rollback().await;
                self.engine.notify(&name, EventStatus::Failed);
                return Err(e);
            }

            self.prepared = true;
            log::info!("Prepared unit {}", name);
            self.engine.notify(&name, EventStatus::Prepared);
            Ok(())
        }
        .boxed()
    }

    async fn prepare_service(&self, parent: Option<&Abort>) -> Result<()> {
        if parent.map_or(false, |p| p.is_aborted()) {
            return Err(Error::Cancelled);
        }
        self.unit
            .service()
            .prepare()
            .await
            .context(PrepareSnafu { name: self.name() })
    }

    /// Start the prepared unit.
    pub async fn start(&self) -> Result<()> {
        if !self.prepared {
            return NotPreparedSnafu { name: self.name() }.fail();
        }

        for after in self.unit.before() {
            log::debug!("Unit {} is ordered before {}", self.name(), after);
        }
        log::info!("Starting unit {}", self.name());
        Ok(())
    }

    /// Undo the preparation of the unit and of all its dependencies.
    /// Failures are logged, never returned.
    pub fn cleanup(mut self) -> BoxFuture<'static, ()> {
        async move { self.rollback().await }.boxed()
    }

    async fn rollback(&mut self) {
        let name = self.name().to_string();
        if let Err(e) = self.unit.service().cleanup().await {
            log::warn!("Failed to clean up unit {}: {}", name, e);
        }
        self.engine.notify(&name, EventStatus::CleanedUp);

        for (_, dep) in self.deps.drain() {
            dep.cleanup().await;
        }
    }
}
