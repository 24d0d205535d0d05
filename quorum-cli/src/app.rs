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

use crate::{
    cmd::{
        Command,
        config::{ConfigSettings, Endpoint},
    },
    rpc::RpcClient,
};
use anyhow::{Context, Result, anyhow};
use clap::Parser;
use quorum_signer::{Keyring, StoredSigner};
use std::{env, path::PathBuf, time::Duration};
use tracing_subscriber::EnvFilter;

const KEYRING_PATH: &str = "quorum/keyring";

#[derive(Debug, Clone, Parser)]
pub struct Opts {
    /// Timeout for RPC requests and leg confirmation, in milliseconds.
    #[arg(short, long, default_value = "60000", global = true)]
    pub timeout: u64,

    /// Increase verbosity level, maximum is 3.
    #[clap(short, long = "verbose", action = clap::ArgAction::Count, global = true)]
    pub verbosity: u8,

    /// Ledger RPC endpoint.
    ///
    /// Can be `mainnet`, `fuji`, `local` or a custom URL.
    #[arg(short, long, global = true)]
    pub endpoint: Option<Endpoint>,

    /// Keyring directory holding the local signing keys.
    #[arg(long, env = "QUORUM_KEYRING", global = true)]
    pub keyring: Option<PathBuf>,
}

/// Application state.
///
/// Everything a command needs is derived from here; nothing is kept in
/// process-wide state.
#[derive(Debug)]
pub struct App {
    opts: Opts,
}

impl App {
    /// Constructs new application instance.
    pub fn new(opts: Opts) -> Self {
        Self { opts }
    }

    pub async fn run(mut self, command: Command) -> Result<()> {
        let filter = if env::var(EnvFilter::DEFAULT_ENV).is_ok() {
            EnvFilter::from_default_env()
        } else {
            match self.opts.verbosity {
                0 => "quorum_cli=info,quorum_signer=info".into(),
                1 => "quorum_cli=debug,quorum_signer=debug".into(),
                2 => "debug".into(),
                _ => "trace".into(),
            }
        };

        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .without_time()
            .try_init()
            .map_err(|err| anyhow!("{err}"))?;

        command.exec(&mut self).await
    }

    /// Returns the persistent configuration.
    pub fn config(&self) -> Result<ConfigSettings> {
        ConfigSettings::read()
    }

    /// Endpoint from the command line, falling back to the configuration.
    pub fn endpoint(&self) -> Result<Endpoint> {
        match self.opts.endpoint.clone() {
            Some(endpoint) => Ok(endpoint),
            None => Ok(self.config()?.endpoint),
        }
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.opts.timeout)
    }

    /// Returns a JSON-RPC client for the ledger endpoint.
    pub fn rpc(&self) -> Result<RpcClient> {
        let endpoint = self.endpoint()?;
        tracing::debug!("Using endpoint {}", endpoint.as_str());
        RpcClient::new(endpoint.as_str(), self.timeout())
    }

    /// Keyring from `--keyring`, the configuration, or the data directory.
    pub fn keyring(&self) -> Result<Keyring> {
        let path = match &self.opts.keyring {
            Some(path) => path.clone(),
            None => match self.config()?.keyring {
                Some(path) => path,
                None => dirs::data_dir()
                    .context("failed to get data directory")?
                    .join(KEYRING_PATH),
            },
        };

        Keyring::load(path).context("failed to load keyring")
    }

    /// Signer for the named key, or the primary key when none is given.
    pub fn signer(&self, name: Option<&str>) -> Result<StoredSigner> {
        let mut keyring = self.keyring()?;
        let keystore = match name {
            Some(name) => keyring
                .get(name)
                .with_context(|| format!("key '{name}' not found in keyring"))?,
            None => keyring
                .primary()
                .context("no signing key, run `quorum key create` first")?,
        };

        Ok(keystore.signer()?)
    }
}
