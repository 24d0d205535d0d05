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

//! command `config`
//!
//! Settings live in `<config dir>/quorum/config.toml`. Command-line flags
//! always take precedence over them.

use crate::app::App;
use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use colored::Colorize;
use serde::{Deserialize, Serialize};
use std::{
    fs,
    path::{Path, PathBuf},
    str::FromStr,
};
use url::Url;

const CONFIG_PATH: &str = "quorum/config.toml";

/// Show or change the defaults used when no flag overrides them.
#[derive(Clone, Debug, Parser)]
pub struct Config {
    #[clap(subcommand)]
    action: Action,
}

#[derive(Clone, Debug, Subcommand)]
enum Action {
    /// Change one setting.
    #[clap(subcommand)]
    Set(Setting),
    /// Show the current settings.
    Get,
    /// Go back to the built-in defaults.
    Reset,
}

#[derive(Clone, Debug, Subcommand)]
enum Setting {
    /// Node every ledger command talks to.
    Endpoint {
        /// `mainnet`, `fuji`, `local` or a node URL.
        endpoint: Endpoint,
    },
    /// Keyring directory used when `--keyring` is not given.
    Keyring { path: PathBuf },
}

impl Config {
    pub fn exec(self, app: &mut App) -> Result<()> {
        let (settings, message) = match self.action {
            Action::Get => {
                app.config()?.pretty_print();
                return Ok(());
            }
            Action::Set(setting) => {
                let mut settings = app.config()?;
                match setting {
                    Setting::Endpoint { endpoint } => settings.endpoint = endpoint,
                    Setting::Keyring { path } => settings.keyring = Some(path),
                }
                (settings, "Successfully updated the configuration")
            }
            Action::Reset => (ConfigSettings::default(), "Successfully reset the configuration"),
        };

        let path = ConfigSettings::config_path()?;
        settings
            .write_to(&path)
            .with_context(|| format!("failed to write {}", path.display()))?;

        println!("{}", message.green());
        println!();
        settings.pretty_print();
        Ok(())
    }
}

/// Persistent defaults.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(default)]
pub struct ConfigSettings {
    // Plain values ahead of `endpoint`, which may serialize as a table.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub keyring: Option<PathBuf>,
    #[serde(alias = "url")]
    pub endpoint: Endpoint,
}

impl ConfigSettings {
    fn config_path() -> Result<PathBuf> {
        Ok(dirs::config_dir()
            .context("failed to get config directory")?
            .join(CONFIG_PATH))
    }

    /// Settings on disk, or the defaults when nothing was saved yet.
    pub fn read() -> Result<Self> {
        Self::read_from(&Self::config_path()?)
    }

    fn read_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let contents = fs::read_to_string(path)?;
        toml::from_str(&contents).with_context(|| format!("invalid configuration at {}", path.display()))
    }

    fn write_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        fs::write(path, toml::to_string_pretty(self)?)?;
        Ok(())
    }

    pub fn pretty_print(&self) {
        println!("{} {}", "Endpoint:".bright_blue(), self.endpoint.as_str());
        match &self.keyring {
            Some(path) => println!("{} {}", "Keyring:".bright_blue(), path.display()),
            None => println!("{} {}", "Keyring:".bright_blue(), "default".bright_black()),
        }
    }
}

/// Node to talk to.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Endpoint {
    #[default]
    Mainnet,
    Fuji,
    Local,
    Custom(Url),
}

impl Endpoint {
    pub const MAINNET: &'static str = "https://api.avax.network";
    pub const FUJI: &'static str = "https://api.avax-test.network";
    pub const LOCAL: &'static str = "http://127.0.0.1:9650";

    pub fn as_str(&self) -> &str {
        match self {
            Self::Mainnet => Self::MAINNET,
            Self::Fuji => Self::FUJI,
            Self::Local => Self::LOCAL,
            Self::Custom(url) => url.as_str(),
        }
    }
}

impl FromStr for Endpoint {
    type Err = url::ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "mainnet" => Ok(Self::Mainnet),
            "fuji" => Ok(Self::Fuji),
            "local" | "localhost" => Ok(Self::Local),
            url => Url::parse(url).map(Self::Custom),
        }
    }
}
