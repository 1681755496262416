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

//! Fan-in of the builders' outputs into a single stream.
use super::abort::Abort;
use super::transaction::Transaction;
use crate::error::Error;
use tokio::sync::mpsc;
use tokio::task::{JoinHandle, JoinSet};

/// Forward every input to one output. The output closes after all inputs
/// are closed or the pass is aborted; the returned handle completes after
/// every forwarder has stopped.
pub(crate) fn merge(
    abort: &Abort,
    capacity: usize,
    inputs: Vec<mpsc::Receiver<Transaction>>,
) -> (mpsc::Receiver<Transaction>, JoinHandle<()>) {
    let (tx, rx) = mpsc::channel(capacity);
    let mut forwarders = JoinSet::new();
    for input in inputs {
        forwarders.spawn(forward(abort.clone(), input, tx.clone()));
    }
    drop(tx);

    let abort = abort.clone();
    let handle = tokio::spawn(async move {
        while let Some(res) = forwarders.join_next().await {
            if let Err(e) = res {
                log::error!("Transaction forwarder failed: {}", e);
                abort.fail(Error::Internal { msg: e.to_string() });
            }
        }
    });
    (rx, handle)
}

async fn forward(abort: Abort, mut input: mpsc::Receiver<Transaction>, out: mpsc::Sender<Transaction>) {
    loop {
        let transaction = tokio::select! {
            biased;
            _ = abort.aborted() => break,
            transaction = input.recv() => match transaction {
                Some(t) => t,
                None => return,
            },
        };

        tokio::select! {
            biased;
            _ = abort.aborted() => {
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

    drop(out);
    drain(input).await;
}

/// Close `rx` and clean up every transaction still buffered in it.
pub(crate) async fn drain(mut rx: mpsc::Receiver<Transaction>) {
    rx.close();
    while let Some(transaction) = rx.recv().await {
        log::debug!("Rolling back undelivered transaction {}", transaction.name());
        transaction.cleanup().await;
    }
}
