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

//! command `key`

use crate::app::App;
use anyhow::{Context, Result};
use clap::Subcommand;
use colored::Colorize;
use quorum_signer::Keystore;
use std::path::PathBuf;

/// Manage the local keyring.
#[derive(Clone, Debug, Subcommand)]
pub enum Key {
    /// Generate a new key.
    Create {
        /// Name of the new key.
        name: String,
    },
    /// Import a key from a hex secret or an exported keystore file.
    Import {
        /// Name of the imported key.
        name: String,
        /// Hex-encoded 32-byte secret.
        #[arg(conflicts_with = "file", required_unless_present = "file")]
        secret: Option<String>,
        /// Keystore JSON file exported from another keyring.
        #[arg(long)]
        file: Option<PathBuf>,
    },
    /// List every key.
    List,
    /// Show or set the primary key.
    Primary {
        /// Key to make primary.
        name: Option<String>,
    },
    /// Delete a key.
    Remove {
        /// Key to delete.
        name: String,
    },
}

impl Key {
    pub fn exec(self, app: &App) -> Result<()> {
        let mut keyring = app.keyring()?;

        match self {
            Key::Create { name } => {
                let keystore = keyring
                    .create(&name)
                    .with_context(|| format!("failed to create key '{name}'"))?;

                println!("{}", "✓ Generated key".green().bold());
                print_keystore(&keystore);
            }
            Key::Import { name, secret, file } => {
                let keystore = match file {
                    Some(file) => keyring.import_as(&file, &name),
                    None => keyring.add_hex(&name, secret.as_deref().unwrap_or_default()),
                }
                .with_context(|| format!("failed to import key '{name}'"))?;

                println!("{}", "✓ Imported key".green().bold());
                print_keystore(&keystore);
            }
            Key::List => {
                let primary = keyring.primary_name().map(str::to_owned);
                let keys = keyring.list();

                if keys.is_empty() {
                    println!("{}", "No keys found".yellow());
                    return Ok(());
                }

                println!("{}", format!("Found {} key(s):", keys.len()).green().bold());
                for keystore in keys {
                    let marker = if primary.as_deref() == Some(keystore.name.as_str()) {
                        "*".green().bold()
                    } else {
                        "•".bright_blue()
                    };
                    println!("  {marker} {:<16} {}", keystore.name, keystore.address);
                }
            }
            Key::Primary { name: Some(name) } => {
                keyring.set_primary(&name)?;
                println!("{} {name}", "✓ Primary key set to".green().bold());
            }
            Key::Primary { name: None } => {
                let keystore = keyring.primary()?;
                print_keystore(keystore);
            }
            Key::Remove { name } => {
                let keystore = keyring.remove(&name)?;
                println!("{} {}", "✓ Removed key".green().bold(), keystore.name);
            }
        }

        Ok(())
    }
}

fn print_keystore(keystore: &Keystore) {
    println!("  {} {}", "Name:".bright_blue(), keystore.name);
    println!("  {} {}", "Address:".bright_blue(), keystore.address);
}
