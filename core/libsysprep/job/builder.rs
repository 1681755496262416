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

//! The second stage of a dependency list: prepares one transaction per unit.
use super::abort::Abort;
use super::transaction::Transaction;
use super::{report_failure, Chain, DepKind};
use crate::engine::Engine;
use crate::unit::Unit;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

pub(crate) struct TransactionBuilder {
    engine: Arc<Engine>,
    abort: Abort,
    chain: Chain,
    kind: DepKind,
}

impl TransactionBuilder {
    pub(crate) fn new(engine: &Arc<Engine>, abort: &Abort, chain: &Chain, kind: DepKind) -> Self {
        TransactionBuilder {
            engine: engine.clone(),
            abort: abort.clone(),
            chain: chain.clone(),
            kind,
        }
    }

    /// Prepare every unit received in a background task. A prepared
    /// transaction is either delivered or cleaned up here.
    pub(crate) fn spawn(
        self,
        units: mpsc::Receiver<Arc<Unit>>,
    ) -> (mpsc::Receiver<Transaction>, JoinHandle<()>) {
        let (tx, rx) = mpsc::channel(self.engine.config().channel_capacity());
        let handle = tokio::spawn(self.run(units, tx));
        (rx, handle)
    }

    async fn run(self, mut units: mpsc::Receiver<Arc<Unit>>, out: mpsc::Sender<Transaction>) {
        loop {
            let unit = tokio::select! {
                biased;
                _ = self.abort.aborted() => break,
                unit = units.recv() => match unit {
                    Some(unit) => unit,
                    None => break,
                },
            };

            let mut transaction = Transaction::new(&self.engine, unit);
            if let Err(e) = transaction
                .prepare_with(&self.chain, Some(&self.abort))
                .await
            {
                if report_failure(&self.engine, &self.abort, self.kind, e) {
                    break;
                }
                continue;
            }

            tokio::select! {
                biased;
                _ = self.abort.aborted() => {
                    transaction.cleanup().await;
                    break;
                }
                permit = out.reserve() => match permit {
                    Ok(permit) => permit.send(transaction),
                    Err(_) => {
                        transaction.cleanup().await;
                        break;
                    }
                },
            }
        }

        /* the units still queued were never prepared, nothing to undo */
        units.close();
    }
}
