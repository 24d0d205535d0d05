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

//! Aggregated per-host outcomes.

use super::{Host, HostId, HostSet};
use futures::FutureExt;
use std::{
    any::Any,
    collections::BTreeMap,
    fmt,
    future::Future,
    panic::{self, AssertUnwindSafe},
};
use tokio::task::JoinSet;

/// Why a host produced no value.
#[derive(Debug)]
pub enum HostError<E> {
    /// The operation itself returned an error.
    Operation(E),
    /// The operation panicked; the payload message is kept.
    Panicked(String),
    /// The task was cancelled before reporting (runtime shutdown).
    Aborted,
}

impl<E: fmt::Display> fmt::Display for HostError<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Operation(err) => err.fmt(f),
            Self::Panicked(msg) => write!(f, "operation panicked: {msg}"),
            Self::Aborted => f.write_str("operation aborted before reporting"),
        }
    }
}

impl<E: fmt::Debug + fmt::Display> std::error::Error for HostError<E> {}

/// Outcome of running one operation against every host of a [`HostSet`].
///
/// Immutable once built: every query is read-only and ordered by host id, so
/// two runs over the same hosts produce identical reports regardless of the
/// order in which hosts answered.
#[derive(Debug)]
pub struct HostResults<T, E> {
    outcomes: BTreeMap<HostId, Result<T, HostError<E>>>,
}

impl<T, E> HostResults<T, E>
where
    T: Send + 'static,
    E: Send + 'static,
{
    /// Run `op` against every host concurrently and wait for all of them.
    ///
    /// A failing or panicking host never cancels its siblings. No timeout is
    /// applied here; `op` is expected to bound its own execution time.
    pub async fn run<F, Fut>(hosts: &HostSet, op: F) -> Self
    where
        F: Fn(Host) -> Fut,
        Fut: Future<Output = Result<T, E>> + Send + 'static,
    {
        let mut tasks = JoinSet::new();
        let mut outcomes = BTreeMap::new();

        for host in hosts.iter() {
            let id = host.id.clone();
            // `op` may panic while building its future, before any task exists.
            let fut = match panic::catch_unwind(AssertUnwindSafe(|| op(host.clone()))) {
                Ok(fut) => fut,
                Err(payload) => {
                    outcomes.insert(id, Err(HostError::Panicked(panic_message(payload))));
                    continue;
                }
            };

            tasks.spawn(async move {
                let outcome = match AssertUnwindSafe(fut).catch_unwind().await {
                    Ok(Ok(value)) => Ok(value),
                    Ok(Err(err)) => Err(HostError::Operation(err)),
                    Err(payload) => Err(HostError::Panicked(panic_message(payload))),
                };
                (id, outcome)
            });
        }

        while let Some(joined) = tasks.join_next().await {
            // Panics are caught inside the task, so a join error means the
            // task was cancelled; its host is filled in below.
            if let Ok((id, outcome)) = joined {
                outcomes.insert(id, outcome);
            }
        }

        for id in hosts.ids() {
            outcomes.entry(id).or_insert(Err(HostError::Aborted));
        }

        Self { outcomes }
    }
}

impl<T, E> HostResults<T, E> {
    /// Number of hosts that reported.
    pub fn len(&self) -> usize {
        self.outcomes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.outcomes.is_empty()
    }

    pub fn has_errors(&self) -> bool {
        self.outcomes.values().any(Result::is_err)
    }

    pub fn errors_by_host(&self) -> BTreeMap<&HostId, &HostError<E>> {
        self.outcomes
            .iter()
            .filter_map(|(id, outcome)| outcome.as_ref().err().map(|err| (id, err)))
            .collect()
    }

    /// Hosts whose successful value satisfies `predicate`.
    ///
    /// Errored hosts never match; use [`Self::errors_by_host`] for those.
    pub fn filter<P>(&self, predicate: P) -> Vec<HostId>
    where
        P: Fn(&T) -> bool,
    {
        self.values()
            .filter(|(_, value)| predicate(value))
            .map(|(id, _)| id.clone())
            .collect()
    }

    /// Successful values, ordered by host id.
    pub fn values(&self) -> impl Iterator<Item = (&HostId, &T)> {
        self.outcomes
            .iter()
            .filter_map(|(id, outcome)| outcome.as_ref().ok().map(|value| (id, value)))
    }

    pub fn succeeded(&self) -> Vec<HostId> {
        self.values().map(|(id, _)| id.clone()).collect()
    }

    pub fn outcome(&self, id: &HostId) -> Option<&Result<T, HostError<E>>> {
        self.outcomes.get(id)
    }

    /// Deterministic summary of every failed host.
    pub fn failure_report(&self) -> FailureReport
    where
        E: fmt::Display,
    {
        FailureReport {
            total: self.outcomes.len(),
            failures: self
                .errors_by_host()
                .into_iter()
                .map(|(id, err)| (id.clone(), err.to_string()))
                .collect(),
        }
    }
}

/// Host-ordered list of failures out of a run.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FailureReport {
    total: usize,
    failures: Vec<(HostId, String)>,
}

impl FailureReport {
    pub fn is_empty(&self) -> bool {
        self.failures.is_empty()
    }

    pub fn failures(&self) -> &[(HostId, String)] {
        &self.failures
    }

    pub fn hosts(&self) -> Vec<&HostId> {
        self.failures.iter().map(|(id, _)| id).collect()
    }
}

impl fmt::Display for FailureReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.failures.is_empty() {
            return write!(f, "all {} hosts succeeded", self.total);
        }

        write!(f, "{} of {} hosts failed:", self.failures.len(), self.total)?;
        for (id, message) in &self.failures {
            write!(f, "\n  {id}: {message}")?;
        }
        Ok(())
    }
}

fn panic_message(payload: Box<dyn Any + Send>) -> String {
    if let Some(msg) = payload.downcast_ref::<&str>() {
        (*msg).to_string()
    } else if let Some(msg) = payload.downcast_ref::<String>() {
        msg.clone()
    } else {
        "unknown panic payload".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn hosts(n: usize) -> HostSet {
        HostSet::new(
            (0..n)
                .map(|i| Host::new(format!("node-{i}"), format!("http://10.0.0.{i}:9650")))
                .collect(),
        )
        .unwrap()
    }

    #[tokio::test]
    async fn waits_for_slow_hosts() {
        let results = HostResults::run(&hosts(3), |host| async move {
            if host.id.as_str() == "node-0" {
                tokio::time::sleep(Duration::from_millis(50)).await;
            }
            Ok::<_, String>(host.endpoint)
        })
        .await;

        assert_eq!(results.len(), 3);
        assert!(!results.has_errors());
        assert_eq!(
            results.outcome(&"node-0".into()).unwrap().as_ref().unwrap(),
            "http://10.0.0.0:9650"
        );
    }

    #[tokio::test]
    async fn panicking_host_is_an_error_for_that_host_only() {
        let results = HostResults::run(&hosts(3), |host| async move {
            if host.id.as_str() == "node-1" {
                panic!("host lookup exploded");
            }
            Ok::<_, String>(())
        })
        .await;

        let errors = results.errors_by_host();
        assert_eq!(errors.len(), 1);
        assert!(matches!(
            errors[&HostId::from("node-1")],
            HostError::Panicked(msg) if msg == "host lookup exploded"
        ));
        assert_eq!(results.succeeded().len(), 2);
    }

    #[tokio::test]
    async fn panic_before_future_is_an_error_for_that_host_only() {
        let versions = BTreeMap::from([("node-0", "1.11.0"), ("node-2", "1.11.0")]);

        let results = HostResults::run(&hosts(3), |host| {
            let version = versions[host.id.as_str()];
            async move { Ok::<_, String>(version) }
        })
        .await;

        assert_eq!(results.len(), 3);
        assert_eq!(
            results.succeeded(),
            vec![HostId::from("node-0"), HostId::from("node-2")]
        );
        assert!(matches!(
            results.outcome(&"node-1".into()),
            Some(Err(HostError::Panicked(_)))
        ));
    }

    #[tokio::test]
    async fn empty_set_yields_empty_results() {
        let results = HostResults::run(&HostSet::default(), |_| async { Ok::<u8, String>(1) }).await;

        assert!(results.is_empty());
        assert!(!results.has_errors());
        assert!(results.failure_report().is_empty());
    }

    #[tokio::test]
    async fn failure_report_is_host_ordered() {
        let results = HostResults::run(&hosts(4), |host| async move {
            match host.id.as_str() {
                "node-3" => Err("connection refused".to_string()),
                "node-0" => Err("timeout".to_string()),
                _ => Ok(()),
            }
        })
        .await;

        let report = results.failure_report();
        assert_eq!(
            report.to_string(),
            "2 of 4 hosts failed:\n  node-0: timeout\n  node-3: connection refused"
        );
    }
}
