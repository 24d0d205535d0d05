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

//! command `cluster`

use crate::{
    app::App,
    rpc::{NodeProbe, NodeStatus, RpcClient},
};
use anyhow::{Context, Result, bail};
use clap::Subcommand;
use colored::Colorize;
use quorum::cluster::{Host, HostId, HostResults, HostSet};
use serde::Deserialize;
use std::{
    collections::BTreeMap,
    fs,
    path::{Path, PathBuf},
};

/// Probe every host of a cluster.
#[derive(Clone, Debug, Subcommand)]
pub enum Cluster {
    /// Check that every node is healthy, bootstrapped and on the same version.
    Status {
        /// TOML file listing the hosts as `[[hosts]]` tables with `id` and `endpoint`.
        #[arg(long)]
        hosts: PathBuf,
        /// Chain whose bootstrap state is checked.
        #[arg(long, default_value = "P")]
        chain: String,
        /// Version every node must run; the most common one when omitted.
        #[arg(long)]
        expected_version: Option<String>,
    },
}

#[derive(Deserialize)]
struct HostsFile {
    hosts: Vec<Host>,
}

/// Reads a hosts file, rejecting duplicate host ids.
pub fn read_hosts(path: &Path) -> Result<HostSet> {
    let contents =
        fs::read_to_string(path).with_context(|| format!("failed to read {}", path.display()))?;
    let file: HostsFile = toml::from_str(&contents)
        .with_context(|| format!("invalid hosts file {}", path.display()))?;

    Ok(HostSet::new(file.hosts)?)
}

/// Hosts grouped by what is wrong with them.
#[derive(Debug, Default, PartialEq, Eq)]
pub struct Readiness {
    pub unhealthy: Vec<HostId>,
    pub not_bootstrapped: Vec<HostId>,
    pub incompatible: Vec<HostId>,
    pub version: Option<String>,
}

impl Readiness {
    pub fn is_ready(&self) -> bool {
        self.unhealthy.is_empty()
            && self.not_bootstrapped.is_empty()
            && self.incompatible.is_empty()
    }
}

/// Classify the hosts that answered.
pub fn readiness<E>(results: &HostResults<NodeStatus, E>, expected: Option<String>) -> Readiness {
    let version = expected.or_else(|| {
        let mut counts = BTreeMap::<&str, usize>::new();
        for (_, status) in results.values() {
            *counts.entry(status.version.as_str()).or_default() += 1;
        }
        // Ties go to the lowest version string so the choice is stable.
        counts
            .into_iter()
            .max_by(|(va, a), (vb, b)| a.cmp(b).then(vb.cmp(va)))
            .map(|(version, _)| version.to_string())
    });

    Readiness {
        unhealthy: results.filter(|status| !status.healthy),
        not_bootstrapped: results.filter(|status| !status.bootstrapped),
        incompatible: results.filter(|status| Some(&status.version) != version.as_ref()),
        version,
    }
}

impl Cluster {
    pub async fn exec(self, app: &App) -> Result<()> {
        match self {
            Cluster::Status {
                hosts,
                chain,
                expected_version,
            } => {
                let hosts = read_hosts(&hosts)?;
                let timeout = app.timeout();
                tracing::info!("Probing {} hosts", hosts.len());

                let results = HostResults::run(&hosts, |host| {
                    let chain = chain.clone();
                    async move {
                        let client = RpcClient::new(&host.endpoint, timeout)
                            .map_err(|err| err.to_string())?;
                        NodeProbe::new(client, chain)
                            .status()
                            .await
                            .map_err(|err| err.to_string())
                    }
                })
                .await;

                let readiness = readiness(&results, expected_version);
                for (id, status) in results.values() {
                    tracing::debug!("{id}: {status:?}");
                }

                print_hosts("Unhealthy", &readiness.unhealthy);
                print_hosts("Not bootstrapped", &readiness.not_bootstrapped);
                if let Some(version) = &readiness.version {
                    print_hosts(&format!("Not on {version}"), &readiness.incompatible);
                }

                let report = results.failure_report();
                if !report.is_empty() {
                    println!("{}", report.to_string().red());
                }

                if results.has_errors() || !readiness.is_ready() {
                    bail!("cluster is not ready");
                }

                println!(
                    "{}",
                    format!("✓ All {} hosts ready", results.len()).green().bold()
                );
            }
        }

        Ok(())
    }
}

fn print_hosts(label: &str, hosts: &[HostId]) {
    if hosts.is_empty() {
        return;
    }

    println!("{}", format!("{label}:").yellow().bold());
    for id in hosts {
        println!("  {} {id}", "•".bright_blue());
    }
}
