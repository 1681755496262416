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

//! Broadcast-once cancellation of a resolution pass.
use crate::error::Error;
use futures::future::select_all;
use std::sync::{Arc, Mutex};
use tokio::sync::watch;

struct Shared {
    flag: watch::Sender<bool>,
    first: Mutex<Option<Error>>,
}

/// The abort signal of one resolution pass.
///
/// The first error reported wins and flips the flag seen by every stage of
/// the pass. A child signal also observes all of its ancestors, so aborting
/// a pass reaches the nested passes running inside its builders.
#[derive(Clone)]
pub(crate) struct Abort {
    shared: Arc<Shared>,
    /* own receiver first, then the ancestors' */
    watchers: Vec<watch::Receiver<bool>>,
}

impl Abort {
    pub(crate) fn new() -> Self {
        let (flag, rx) = watch::channel(false);
        Abort {
            shared: Arc::new(Shared {
                flag,
                first: Mutex::new(None),
            }),
            watchers: vec![rx],
        }
    }

    /// a signal for a nested pass
    pub(crate) fn child(&self) -> Self {
        let mut child = Abort::new();
        child.watchers.extend(self.watchers.iter().cloned());
        child
    }

    /// Record `err` unless an error is recorded already, then abort the pass.
    pub(crate) fn fail(&self, err: Error) {
        match self.shared.first.lock() {
            Ok(mut first) => {
                if first.is_none() {
                    log::debug!("Aborting resolution: {}", err);
                    *first = Some(err);
                } else {
                    log::debug!("Discarding error of an aborted resolution: {}", err);
                }
            }
            Err(_) => log::error!("Failed to record resolution error: {}", err),
        }
        self.shared.flag.send_replace(true);
    }

    /// whether this pass or any enclosing pass is aborted
    pub(crate) fn is_aborted(&self) -> bool {
        self.watchers.iter().any(|rx| *rx.borrow())
    }

    /// Completes once this pass or any enclosing pass is aborted.
    pub(crate) async fn aborted(&self) {
        let mut watchers = self.watchers.clone();
        let waits = watchers.iter_mut().map(|rx| {
            Box::pin(async move {
                let closed = rx.wait_for(|aborted| *aborted).await.is_err();
                if closed {
                    /* the pass is gone without aborting */
                    std::future::pending::<()>().await;
                }
            })
        });
        select_all(waits).await;
    }

    /// the error recorded by this pass
    pub(crate) fn take_error(&self) -> Option<Error> {
        self.shared.first.lock().ok()?.take()
    }
}
