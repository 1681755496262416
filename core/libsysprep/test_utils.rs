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

//! Counting services and a scriptable loader for the unit tests.
use crate::config::ResolveConfig;
use crate::error::BoxError;
use crate::unit::{Service, Unit, UnitLoad};
use async_trait::async_trait;
use std::collections::HashMap;
use std::future::Future;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::Notify;

/// Run `f` on a fresh multi-thread runtime, failing the test if it hangs.
pub(crate) fn block_on<F: Future>(f: F) -> F::Output {
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .unwrap();
    runtime.block_on(async {
        tokio::time::timeout(Duration::from_secs(10), f)
            .await
            .expect("test timed out")
    })
}

/// configuration ignoring failed wanted units
pub(crate) fn soft_wants() -> ResolveConfig {
    ResolveConfig {
        WantsFailure: "ignore".to_string(),
        ..Default::default()
    }
}

/// A service counting its calls.
#[derive(Default)]
pub(crate) struct TestService {
    prepare_calls: AtomicUsize,
    cleanup_calls: AtomicUsize,
    prepared_ok: AtomicUsize,
    fail_prepare: AtomicBool,
    fail_cleanup: AtomicBool,
    panic_prepare: AtomicBool,
    prepared: Notify,
}

impl TestService {
    pub(crate) fn prepares(&self) -> usize {
        self.prepare_calls.load(Ordering::SeqCst)
    }

    pub(crate) fn cleanups(&self) -> usize {
        self.cleanup_calls.load(Ordering::SeqCst)
    }

    pub(crate) fn fail_prepare(&self) {
        self.fail_prepare.store(true, Ordering::SeqCst);
    }

    pub(crate) fn panic_prepare(&self) {
        self.panic_prepare.store(true, Ordering::SeqCst);
    }

    pub(crate) fn fail_cleanup(&self) {
        self.fail_cleanup.store(true, Ordering::SeqCst);
    }

    /// wait for a successful prepare
    pub(crate) async fn wait_prepared(&self) {
        loop {
            let notified = self.prepared.notified();
            if self.prepared_ok.load(Ordering::SeqCst) > 0 {
                return;
            }
            notified.await;
        }
    }
}

#[async_trait]
impl Service for TestService {
    async fn prepare(&self) -> Result<(), BoxError> {
        self.prepare_calls.fetch_add(1, Ordering::SeqCst);
        if self.panic_prepare.load(Ordering::SeqCst) {
            panic!("prepare panicked");
        }
        if self.fail_prepare.load(Ordering::SeqCst) {
            return Err("prepare failed".into());
        }
        self.prepared_ok.fetch_add(1, Ordering::SeqCst);
        self.prepared.notify_waiters();
        Ok(())
    }

    async fn cleanup(&self) -> Result<(), BoxError> {
        self.cleanup_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_cleanup.load(Ordering::SeqCst) {
            return Err("cleanup failed".into());
        }
        Ok(())
    }
}

#[derive(Clone)]
enum LoadBehavior {
    Fail,
    Hang,
    After(Arc<TestService>),
}

struct InFlight(Arc<AtomicUsize>);

impl InFlight {
    fn new(count: &Arc<AtomicUsize>) -> Self {
        count.fetch_add(1, Ordering::SeqCst);
        InFlight(count.clone())
    }
}

impl Drop for InFlight {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

/// A loader serving units from memory, with scripted failures and delays.
#[derive(Default)]
pub(crate) struct TestLoader {
    units: Mutex<HashMap<String, Unit>>,
    behaviors: Mutex<HashMap<String, LoadBehavior>>,
    loads: Mutex<HashMap<String, usize>>,
    in_flight: Arc<AtomicUsize>,
}

impl TestLoader {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// add a unit backed by a fresh counting service
    pub(crate) fn add(&self, name: &str, requires: &[&str], wants: &[&str]) -> Arc<TestService> {
        let service = Arc::new(TestService::default());
        self.add_unit(
            Unit::new(name, service.clone())
                .with_requires(requires.iter().copied())
                .with_wants(wants.iter().copied()),
        );
        service
    }

    pub(crate) fn add_unit(&self, unit: Unit) {
        self.units
            .lock()
            .unwrap()
            .insert(unit.name().to_string(), unit);
    }

    pub(crate) fn fail_load(&self, name: &str) {
        self.script(name, LoadBehavior::Fail);
    }

    /// loading `name` never completes
    pub(crate) fn hang_load(&self, name: &str) {
        self.script(name, LoadBehavior::Hang);
    }

    /// loading `name` waits until `service` is prepared
    pub(crate) fn load_after(&self, name: &str, service: &Arc<TestService>) {
        self.script(name, LoadBehavior::After(service.clone()));
    }

    fn script(&self, name: &str, behavior: LoadBehavior) {
        self.behaviors
            .lock()
            .unwrap()
            .insert(name.to_string(), behavior);
    }

    /// how often `name` was requested
    pub(crate) fn loads(&self, name: &str) -> usize {
        self.loads.lock().unwrap().get(name).copied().unwrap_or(0)
    }

    /// loads started and not yet finished or dropped
    pub(crate) fn in_flight(&self) -> usize {
        self.in_flight.load(Ordering::SeqCst)
    }

    /// wait until no load is in progress
    pub(crate) async fn wait_idle(&self) {
        while self.in_flight() > 0 {
            tokio::time::sleep(Duration::from_millis(1)).await;
        }
    }

    pub(crate) async fn wait_loading(&self, name: &str) {
        while self.loads(name) == 0 {
            tokio::time::sleep(Duration::from_millis(1)).await;
        }
    }
}

#[async_trait]
impl UnitLoad for TestLoader {
    async fn load_unit(&self, name: &str) -> Result<Unit, BoxError> {
        let _guard = InFlight::new(&self.in_flight);
        *self
            .loads
            .lock()
            .unwrap()
            .entry(name.to_string())
            .or_insert(0) += 1;

        let behavior = self.behaviors.lock().unwrap().get(name).cloned();
        match behavior {
            Some(LoadBehavior::Fail) => return Err(format!("cannot load {}", name).into()),
            Some(LoadBehavior::Hang) => std::future::pending::<()>().await,
            Some(LoadBehavior::After(service)) => service.wait_prepared().await,
            None => {}
        }

        let unit = self.units.lock().unwrap().get(name).cloned();
        unit.ok_or_else(|| format!("unit file of '{}' not found", name).into())
    }
}
