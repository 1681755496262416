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

//! The first stage of a dependency list: turns names into loaded units.
use super::abort::Abort;
use super::{report_failure, Chain, DepKind};
use crate::engine::Engine;
use crate::error::Error;
use crate::event::EventStatus;
use crate::unit::Unit;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

pub(crate) struct UnitSource {
    engine: Arc<Engine>,
    abort: Abort,
    chain: Chain,
    kind: DepKind,
}

impl UnitSource {
    pub(crate) fn new(engine: &Arc<Engine>, abort: &Abort, chain: &Chain, kind: DepKind) -> Self {
        UnitSource {
            engine: engine.clone(),
            abort: abort.clone(),
            chain: chain.clone(),
            kind,
        }
    }

    /// Load `names` in order in a background task. The receiver closes when
    /// the names are exhausted or the pass is aborted.
    pub(crate) fn spawn(self, names: Vec<String>) -> (mpsc::Receiver<Arc<Unit>>, JoinHandle<()>) {
        let (tx, rx) = mpsc::channel(self.engine.config().channel_capacity());
        let handle = tokio::spawn(self.run(names, tx));
        (rx, handle)
    }

    async fn run(self, names: Vec<String>, units: mpsc::Sender<Arc<Unit>>) {
        for name in names {
            if self.abort.is_aborted() {
                break;
            }

            if let Some(cycle) = self.chain.cycle_with(&name) {
                if report_failure(&self.engine, &self.abort, self.kind, Error::Cycle { cycle }) {
                    break;
                }
                continue;
            }

            if self.engine.skip_registered(&name) {
                log::debug!("Unit {} is already loaded, skipping", name);
                self.engine.notify(&name, EventStatus::AlreadyLoaded);
                continue;
            }

            let loaded = tokio::select! {
                biased;
                _ = self.abort.aborted() => break,
                loaded = self.engine.load_unit(&name) => loaded,
            };
            let unit = match loaded {
                Ok(unit) => unit,
                Err(e) => {
                    if report_failure(&self.engine, &self.abort, self.kind, e) {
                        break;
                    }
                    continue;
                }
            };

            tokio::select! {
                biased;
                _ = self.abort.aborted() => break,
                sent = units.send(unit) => {
                    if sent.is_err() {
                        /* the builder stopped */
                        break;
                    }
                }
            }
        }
    }
}
