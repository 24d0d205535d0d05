// This file is part of Gear.
//
// Copyright (C) 2025 Gear Technologies Inc.
// SPDX-License-Identifier: GPL-3.0-or-later WITH Classpath-exception-2.0
//
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU General Public License as published by
// the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.
//
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE. See the
// GNU General Public License for more details.
//
// You should have received a copy of the GNU General Public License
// along with this program. If not, see <https://www.gnu.org/licenses/>.

//! Fan-out/fan-in over independent hosts.
//!
//! [`HostResults::run`] issues one operation per host concurrently and only
//! returns once every host has reported. Each spawned task owns exactly one
//! host id and yields exactly one outcome for it; the join loop is the only
//! writer of the result map. [`HostSet`] rejects duplicate ids up front so two
//! tasks can never race for the same key.

mod results;

pub use results::{FailureReport, HostError, HostResults};

use serde::{Deserialize, Serialize};
use std::{collections::BTreeSet, fmt};
use thiserror::Error;

/// Stable host identifier (e.g. a node id or instance id).
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct HostId(String);

impl HostId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for HostId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for HostId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

/// A remote host the aggregator can address.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Host {
    pub id: HostId,
    /// Where the host's API is reachable.
    pub endpoint: String,
}

impl Host {
    pub fn new(id: impl Into<String>, endpoint: impl Into<String>) -> Self {
        Self {
            id: HostId::new(id),
            endpoint: endpoint.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("host '{0}' is listed more than once")]
pub struct DuplicateHostError(pub HostId);

/// Hosts with pairwise distinct ids.
#[derive(Clone, Debug, Default)]
pub struct HostSet {
    hosts: Vec<Host>,
}

impl HostSet {
    pub fn new(hosts: Vec<Host>) -> Result<Self, DuplicateHostError> {
        let mut seen = BTreeSet::new();
        for host in &hosts {
            if !seen.insert(&host.id) {
                return Err(DuplicateHostError(host.id.clone()));
            }
        }

        Ok(Self { hosts })
    }

    pub fn iter(&self) -> impl Iterator<Item = &Host> {
        self.hosts.iter()
    }

    pub fn len(&self) -> usize {
        self.hosts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.hosts.is_empty()
    }

    pub fn ids(&self) -> Vec<HostId> {
        self.hosts.iter().map(|h| h.id.clone()).collect()
    }
}

impl TryFrom<Vec<Host>> for HostSet {
    type Error = DuplicateHostError;

    fn try_from(hosts: Vec<Host>) -> Result<Self, Self::Error> {
        Self::new(hosts)
    }
}
