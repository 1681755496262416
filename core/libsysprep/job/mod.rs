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

//! Transactions and the resolution of their dependencies.
//!
//! dependency:
//!    [transaction]
//!         ↓ ↑
//!     [resolver] → [merge]
//!         ↓
//!  [source] → [builder] → transaction
//!         ↘      ↙
//!          [abort]
//!
//! One resolution pass runs a source and a builder per dependency list, merges
//! their outputs and accumulates them in a single map. Every stage races its
//! channel operations against the pass's abort signal.

mod abort;
mod builder;
mod merge;
mod resolver;
mod source;
mod transaction;

pub use resolver::{build_units, UnitMap};
pub use transaction::Transaction;

use crate::config::WantsPolicy;
use crate::engine::Engine;
use crate::error::Error;
use abort::Abort;
use std::fmt::{self, Display};

/// The dependency list a unit name was taken from.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum DepKind {
    /// hard dependencies
    Requires,
    /// soft dependencies
    Wants,
}

impl Display for DepKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DepKind::Requires => f.write_str("Requires"),
            DepKind::Wants => f.write_str("Wants"),
        }
    }
}

/// One dependency list of a parent unit.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DepList {
    pub kind: DepKind,
    pub names: Vec<String>,
}

impl DepList {
    ///
    pub fn new<I, S>(kind: DepKind, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        DepList {
            kind,
            names: names.into_iter().map(Into::into).collect(),
        }
    }

    ///
    pub fn requires<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::new(DepKind::Requires, names)
    }

    ///
    pub fn wants<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::new(DepKind::Wants, names)
    }
}

/// The units currently being prepared above a resolution pass, outermost first.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub(crate) struct Chain {
    names: Vec<String>,
}

impl Chain {
    /// the chain one level deeper
    pub(crate) fn push(&self, name: &str) -> Chain {
        let mut names = self.names.clone();
        names.push(name.to_string());
        Chain { names }
    }

    /// The cycle closed by entering `name`, from its first occurrence back to itself.
    pub(crate) fn cycle_with(&self, name: &str) -> Option<Vec<String>> {
        let pos = self.names.iter().position(|n| n == name)?;
        let mut cycle = self.names[pos..].to_vec();
        cycle.push(name.to_string());
        Some(cycle)
    }
}

/// Report the failure of one entry of a dependency list to the pass.
/// Returns whether the list has to stop; a wanted unit may be ignored
/// depending on `WantsFailure`.
pub(crate) fn report_failure(engine: &Engine, abort: &Abort, kind: DepKind, err: Error) -> bool {
    if kind == DepKind::Wants
        && engine.wants_policy() == WantsPolicy::Ignore
        && !err.is_cancelled()
    {
        log::warn!("Ignoring failed wanted unit: {}", err);
        return false;
    }

    abort.fail(err);
    true
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_chain_cycle() {
        let chain = Chain::default().push("a").push("b").push("c");
        assert_eq!(chain.cycle_with("d"), None);
        assert_eq!(
            chain.cycle_with("b"),
            Some(vec!["b".to_string(), "c".to_string(), "b".to_string()])
        );
        assert_eq!(chain.cycle_with("a").map(|c| c.len()), Some(4));
        assert_eq!(Chain::default().cycle_with("a"), None);
    }

    #[test]
    fn test_dep_list() {
        let list = DepList::requires(["a", "b"]);
        assert_eq!(list.kind, DepKind::Requires);
        assert_eq!(list.names, vec!["a".to_string(), "b".to_string()]);
        assert!(DepKind::Requires < DepKind::Wants);
        assert_eq!(DepList::wants(Vec::<String>::new()).kind.to_string(), "Wants");
    }
}
