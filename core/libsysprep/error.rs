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

//! Error define of sysprep.
//! Only the first error of a resolution pass is ever reported to the caller,
//! the variants below are therefore kept disjoint: each one names exactly one
//! reason why a unit could not be prepared.

use snafu::prelude::*;
#[allow(unused_imports)]
pub use snafu::ResultExt;

/// Errors produced by the collaborators (loader, services).
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// sysprep Error
#[allow(missing_docs)]
#[derive(Debug, Snafu)]
#[snafu(visibility(pub))]
#[non_exhaustive]
pub enum Error {
    /// The unit file is missing or invalid.
    #[snafu(display("failed to load unit '{}': {}", name, source))]
    Load { name: String, source: BoxError },

    /// The unit's own preparation failed.
    #[snafu(display("failed to prepare unit '{}': {}", name, source))]
    Prepare { name: String, source: BoxError },

    /// The dependency graph loops back to a unit that is being prepared.
    /// `cycle` starts and ends with the same unit.
    #[snafu(display("dependency cycle detected: {}", cycle.join(" -> ")))]
    Cycle { cycle: Vec<String> },

    /// An enclosing resolution pass failed first.
    #[snafu(display("resolution cancelled"))]
    Cancelled,

    #[snafu(display("unit '{}' is already loaded, transaction canceled", name))]
    AlreadyLoaded { name: String },

    #[snafu(display("unit '{}' is not prepared", name))]
    NotPrepared { name: String },

    #[snafu(display("internal error: '{}'.", msg))]
    Internal { msg: String },

    #[snafu(display("invalid configuration: '{}'.", msg))]
    InvalidConfig { msg: String },

    #[snafu(display("Confique error: {}", source))]
    Confique { source: confique::Error },

    #[snafu(display("IoError: {}", source))]
    Io { source: std::io::Error },
}

impl Error {
    /// whether the error only reflects the failure of an enclosing pass
    pub fn is_cancelled(&self) -> bool {
        matches!(self, Error::Cancelled)
    }
}

impl From<std::io::Error> for Error {
    fn from(source: std::io::Error) -> Error {
        Error::Io { source }
    }
}

impl From<confique::Error> for Error {
    fn from(source: confique::Error) -> Error {
        Error::Confique { source }
    }
}

/// new Result
pub type Result<T, E = Error> = std::result::Result<T, E>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cycle_display() {
        let e = Error::Cycle {
            cycle: vec!["a.service".into(), "b.service".into(), "a.service".into()],
        };
        assert_eq!(
            e.to_string(),
            "dependency cycle detected: a.service -> b.service -> a.service"
        );
    }

    #[test]
    fn test_context() {
        let r: std::result::Result<(), BoxError> = Err("no such file".into());
        let e = r.context(LoadSnafu { name: "a.service" }).unwrap_err();
        assert!(matches!(&e, Error::Load { name, .. } if name == "a.service"));
        assert_eq!(
            e.to_string(),
            "failed to load unit 'a.service': no such file"
        );
        assert!(!e.is_cancelled());
        assert!(Error::Cancelled.is_cancelled());
    }
}
