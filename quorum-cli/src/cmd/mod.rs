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

//! commands

use crate::app::App;
use anyhow::Result;
use clap::Subcommand;

pub mod cluster;
pub mod config;
pub mod key;
pub mod multisig;
pub mod transfer;

pub use self::{
    cluster::Cluster, config::Config, key::Key, multisig::Multisig, transfer::Transfer,
};

/// All quorum commands.
#[derive(Debug, Clone, Subcommand)]
pub enum Command {
    /// Access persistent configuration.
    Config(Config),
    /// Manage the local keyring.
    #[clap(subcommand)]
    Key(Key),
    /// Collect threshold signatures for a transaction.
    #[clap(subcommand)]
    Multisig(Multisig),
    /// Probe every host of a cluster.
    #[clap(subcommand)]
    Cluster(Cluster),
    /// Move funds across ledgers through an intermediate ledger.
    Transfer(Transfer),
}

impl Command {
    /// Execute the command.
    pub async fn exec(self, app: &mut App) -> Result<()> {
        match self {
            Command::Config(config) => config.exec(app),
            Command::Key(key) => key.exec(app),
            Command::Multisig(multisig) => multisig.exec(app).await,
            Command::Cluster(cluster) => cluster.exec(app).await,
            Command::Transfer(transfer) => transfer.exec(app).await,
        }
    }
}
