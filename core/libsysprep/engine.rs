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

//! The engine shared by every transaction: unit loader, registry of units
//! already running, event sink and configuration.
use crate::config::{ResolveConfig, WantsPolicy};
use crate::error::*;
use crate::event::{Event, EventStatus};
use crate::job::{build_units, DepList, Transaction, UnitMap};
use crate::unit::{Unit, UnitLoad};
use std::collections::HashSet;
use std::sync::{Arc, RwLock};
use tokio::sync::broadcast;

// 1024 should be big enough for the status events of one preparation.
const EVENT_CHANNEL_LEN: usize = 1024;

/// Entry of the resolution core.
pub struct Engine {
    loader: Arc<dyn UnitLoad>,
    registry: RwLock<HashSet<String>>,
    events: broadcast::Sender<Event>,
    config: ResolveConfig,
    wants_policy: WantsPolicy,
}

impl Engine {
    /// create the engine
    pub fn new(loader: Arc<dyn UnitLoad>, config: ResolveConfig) -> Arc<Engine> {
        let wants_policy = config.wants_policy().unwrap_or_else(|e| {
            log::warn!("{}, treating failed wanted units as fatal", e);
            WantsPolicy::default()
        });
        let (events, _) = broadcast::channel(EVENT_CHANNEL_LEN);
        Arc::new(Engine {
            loader,
            registry: RwLock::new(HashSet::new()),
            events,
            config,
            wants_policy,
        })
    }

    ///
    pub fn config(&self) -> &ResolveConfig {
        &self.config
    }

    pub(crate) fn wants_policy(&self) -> WantsPolicy {
        self.wants_policy
    }

    /// Mark the unit as already running. Returns false if it was registered before.
    pub fn register(&self, name: &str) -> bool {
        match self.registry.write() {
            Ok(mut registry) => registry.insert(name.to_string()),
            Err(_) => {
                log::error!("Failed to register unit {}: registry lock poisoned", name);
                false
            }
        }
    }

    /// Returns false if the unit was not registered.
    pub fn unregister(&self, name: &str) -> bool {
        match self.registry.write() {
            Ok(mut registry) => registry.remove(name),
            Err(_) => false,
        }
    }

    /// whether the unit is registered as running
    pub fn has_unit(&self, name: &str) -> bool {
        self.registry
            .read()
            .map(|registry| registry.contains(name))
            .unwrap_or(false)
    }

    /// subscribe to the unit status events
    pub fn subscribe(&self) -> broadcast::Receiver<Event> {
        self.events.subscribe()
    }

    /// Fire and forget: nobody listening is not an error.
    pub(crate) fn notify(&self, unit: &str, status: EventStatus) {
        log::debug!("unit {}: {}", unit, status);
        let _ = self.events.send(Event::new(unit, status));
    }

    /// whether resolution should pass over this registered unit
    pub(crate) fn skip_registered(&self, name: &str) -> bool {
        self.config.SkipRegistered && self.has_unit(name)
    }

    /// Load the unit descriptor through the loader.
    pub async fn load_unit(&self, name: &str) -> Result<Arc<Unit>> {
        log::debug!("Loading unit {}", name);
        let unit = self
            .loader
            .load_unit(name)
            .await
            .context(LoadSnafu { name })?;
        Ok(Arc::new(unit))
    }

    /// Load the unit and prepare it with all its dependencies.
    pub async fn prepare_unit(self: &Arc<Self>, name: &str) -> Result<Transaction> {
        if self.skip_registered(name) {
            self.notify(name, EventStatus::AlreadyLoaded);
            return AlreadyLoadedSnafu { name }.fail();
        }

        let unit = self.load_unit(name).await?;
        let mut transaction = Transaction::new(self, unit);
        transaction.prepare().await?;
        Ok(transaction)
    }

    /// Prepare the given top-level lists in one resolution pass.
    pub async fn resolve(
        self: &Arc<Self>,
        requires: &[String],
        wants: &[String],
    ) -> Result<UnitMap> {
        build_units(
            self,
            vec![
                DepList::requires(requires.iter().cloned()),
                DepList::wants(wants.iter().cloned()),
            ],
        )
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::{block_on, TestLoader};

    #[test]
    fn test_registry() {
        let engine = Engine::new(Arc::new(TestLoader::new()), ResolveConfig::default());
        assert!(!engine.has_unit("a.service"));
        assert!(engine.register("a.service"));
        assert!(!engine.register("a.service"));
        assert!(engine.has_unit("a.service"));
        /* registered units are only skipped when configured */
        assert!(!engine.skip_registered("a.service"));
        assert!(engine.unregister("a.service"));
        assert!(!engine.unregister("a.service"));
    }

    #[test]
    fn test_bad_policy_falls_back() {
        let config = ResolveConfig {
            WantsFailure: "maybe".to_string(),
            ..Default::default()
        };
        let engine = Engine::new(Arc::new(TestLoader::new()), config);
        assert_eq!(engine.wants_policy(), WantsPolicy::Fatal);
    }

    #[test]
    fn test_prepare_unit() {
        let loader = Arc::new(TestLoader::new());
        let a = loader.add("a.service", &["b.service"], &[]);
        let b = loader.add("b.service", &[], &[]);
        let engine = Engine::new(loader.clone(), ResolveConfig::default());

        let transaction = block_on(engine.prepare_unit("a.service")).unwrap();
        assert!(transaction.is_prepared());
        assert!(transaction.deps().contains_key("b.service"));
        assert_eq!(a.prepares(), 1);
        assert_eq!(b.prepares(), 1);

        let err = block_on(engine.prepare_unit("x.service")).unwrap_err();
        assert!(matches!(err, Error::Load { name, .. } if name == "x.service"));
    }

    #[test]
    fn test_prepare_registered_unit() {
        let loader = Arc::new(TestLoader::new());
        loader.add("a.service", &[], &[]);
        let config = ResolveConfig {
            SkipRegistered: true,
            ..Default::default()
        };
        let engine = Engine::new(loader.clone(), config);
        engine.register("a.service");
        let mut events = engine.subscribe();

        let err = block_on(engine.prepare_unit("a.service")).unwrap_err();
        assert!(matches!(err, Error::AlreadyLoaded { name } if name == "a.service"));
        assert_eq!(loader.loads("a.service"), 0);
        assert_eq!(
            events.try_recv().unwrap(),
            Event::new("a.service", EventStatus::AlreadyLoaded)
        );
    }

    #[test]
    fn test_resolve() {
        let loader = Arc::new(TestLoader::new());
        loader.add("a.service", &[], &[]);
        loader.add("b.service", &[], &[]);
        loader.add("c.service", &[], &[]);
        let engine = Engine::new(loader, ResolveConfig::default());

        let units = block_on(engine.resolve(
            &["a.service".to_string(), "b.service".to_string()],
            &["c.service".to_string()],
        ))
        .unwrap();
        let mut names: Vec<&String> = units.keys().collect();
        names.sort();
        assert_eq!(names, ["a.service", "b.service", "c.service"]);
        assert!(units.values().all(|t| t.is_prepared()));
    }
}
