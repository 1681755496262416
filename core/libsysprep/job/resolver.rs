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

//! One resolution pass over the dependency lists of a parent.
use super::abort::Abort;
use super::builder::TransactionBuilder;
use super::merge::{drain, merge};
use super::source::UnitSource;
use super::transaction::Transaction;
use super::{Chain, DepList};
use crate::engine::Engine;
use crate::error::*;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tokio::sync::mpsc;

/// prepared transactions by unit name
pub type UnitMap = HashMap<String, Transaction>;

/// Load and prepare every unit named in `lists`, concurrently.
///
/// Either every unit is prepared and returned, or the first error is
/// returned and everything prepared by this pass has been cleaned up.
/// A name appearing in several lists is prepared once, as the strongest
/// kind naming it. No work of the pass outlives the call.
pub async fn build_units(engine: &Arc<Engine>, lists: Vec<DepList>) -> Result<UnitMap> {
    resolve(engine.clone(), Chain::default(), None, lists).await
}

pub(crate) async fn resolve(
    engine: Arc<Engine>,
    chain: Chain,
    parent: Option<Abort>,
    lists: Vec<DepList>,
) -> Result<UnitMap> {
    let lists = dedup(lists);
    if lists.is_empty() {
        return Ok(UnitMap::new());
    }

    let abort = match &parent {
        Some(parent) => parent.child(),
        None => Abort::new(),
    };

    let mut handles = Vec::new();
    let mut outputs = Vec::new();
    for list in lists {
        let (units, source) = UnitSource::new(&engine, &abort, &chain, list.kind).spawn(list.names);
        let (transactions, builder) =
            TransactionBuilder::new(&engine, &abort, &chain, list.kind).spawn(units);
        handles.push(source);
        handles.push(builder);
        outputs.push(transactions);
    }
    let (merged, merger) = merge(&abort, engine.config().channel_capacity(), outputs);
    handles.push(merger);

    let mut pass = Pass::new(&abort, merged);
    loop {
        let transaction = tokio::select! {
            biased;
            _ = abort.aborted() => break,
            transaction = pass.recv() => transaction,
        };
        match transaction {
            Some(t) => pass.insert(t),
            None => break,
        }
    }

    for handle in handles {
        if let Err(e) = handle.await {
            log::error!("Resolution stage failed: {}", e);
            abort.fail(Error::Internal { msg: e.to_string() });
        }
    }

    if !abort.is_aborted() {
        return Ok(pass.into_units());
    }

    pass.rollback().await;
    Err(abort.take_error().unwrap_or(Error::Cancelled))
}

/// The accumulated result of a pass. Dropped before it is finished, e.g.
/// by a caller's deadline, it aborts the pass so that every stage stops,
/// and rolls back what it holds in a detached task.
struct Pass {
    abort: Abort,
    merged: Option<mpsc::Receiver<Transaction>>,
    units: UnitMap,
    finished: bool,
}

impl Pass {
    fn new(abort: &Abort, merged: mpsc::Receiver<Transaction>) -> Self {
        Pass {
            abort: abort.clone(),
            merged: Some(merged),
            units: UnitMap::new(),
            finished: false,
        }
    }

    async fn recv(&mut self) -> Option<Transaction> {
        match self.merged.as_mut() {
            Some(merged) => merged.recv().await,
            None => None,
        }
    }

    fn insert(&mut self, transaction: Transaction) {
        self.units
            .insert(transaction.name().to_string(), transaction);
    }

    fn into_units(mut self) -> UnitMap {
        self.finished = true;
        std::mem::take(&mut self.units)
    }

    async fn rollback(mut self) {
        self.finished = true;
        rollback(self.merged.take(), std::mem::take(&mut self.units)).await;
    }
}

impl Drop for Pass {
    fn drop(&mut self) {
        if self.finished {
            return;
        }

        log::debug!("Resolution dropped before completion, cancelling");
        self.abort.fail(Error::Cancelled);
        let merged = self.merged.take();
        let units = std::mem::take(&mut self.units);
        match tokio::runtime::Handle::try_current() {
            Ok(runtime) => {
                runtime.spawn(rollback(merged, units));
            }
            Err(e) => log::error!("Failed to roll back dropped resolution: {}", e),
        }
    }
}

async fn rollback(merged: Option<mpsc::Receiver<Transaction>>, units: UnitMap) {
    if let Some(merged) = merged {
        drain(merged).await;
    }
    for (name, transaction) in units {
        log::debug!("Rolling back {}", name);
        transaction.cleanup().await;
    }
}

/// Drop repeated names and empty lists. `Requires` lists go first, so a
/// name in both kinds stays a hard dependency.
fn dedup(mut lists: Vec<DepList>) -> Vec<DepList> {
    lists.sort_by_key(|list| list.kind);
    let mut seen = HashSet::new();
    lists
        .into_iter()
        .map(|list| DepList {
            kind: list.kind,
            names: list
                .names
                .into_iter()
                .filter(|name| seen.insert(name.clone()))
                .collect(),
        })
        .filter(|list| !list.names.is_empty())
        .collect()
}
