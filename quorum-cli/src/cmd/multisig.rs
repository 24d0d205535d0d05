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

//! command `multisig`
//!
//! The transaction file is the hand-off between operators: one signs and
//! passes it on. Two processes must never work on the same file at once.

use crate::{app::App, rpc::RpcSubmitter};
use anyhow::{Context, Result, bail};
use clap::Subcommand;
use colored::Colorize;
use quorum::{
    Address,
    auth::{OwnerSet, ThresholdAuthorizer},
    multisig::{
        self, Lifecycle, MultisigError, MultisigWorkflow, PendingTransaction, TxPayload, TxState,
    },
};
use quorum_signer::Keyring;
use std::path::{Path, PathBuf};

/// Collect threshold signatures for a transaction.
#[derive(Clone, Debug, Subcommand)]
pub enum Multisig {
    /// Authorize a signer selection and write an unsigned transaction file.
    Create {
        /// Owner addresses of the controlling key set.
        #[arg(long, value_delimiter = ',', required = true)]
        owners: Vec<Address>,
        /// How many owners must sign.
        #[arg(long)]
        threshold: usize,
        /// Owners that will sign; picked automatically when omitted.
        #[arg(long, value_delimiter = ',')]
        auth_keys: Vec<Address>,
        /// Local keys to prefer when picking signers; all keys when omitted.
        #[arg(long, value_delimiter = ',')]
        keys: Vec<String>,
        /// Hex-encoded transaction bytes.
        #[arg(long)]
        payload: String,
        /// Where to write the transaction file.
        #[arg(short, long)]
        output: PathBuf,
    },
    /// Add signatures from the local keyring and save the file in place.
    Sign {
        /// Transaction file.
        file: PathBuf,
        /// Local keys to sign with; all keys when omitted.
        #[arg(long, value_delimiter = ',')]
        keys: Vec<String>,
    },
    /// Show signing progress.
    Status {
        /// Transaction file.
        file: PathBuf,
    },
    /// Issue a fully signed transaction to the ledger.
    Submit {
        /// Transaction file.
        file: PathBuf,
        /// Chain the transaction belongs to.
        #[arg(long, default_value = "P")]
        chain: String,
    },
    /// Give up on a transaction.
    Abandon {
        /// Transaction file.
        file: PathBuf,
    },
}

impl Multisig {
    pub async fn exec(self, app: &App) -> Result<()> {
        match self {
            Multisig::Create {
                owners,
                threshold,
                auth_keys,
                keys,
                payload,
                output,
            } => {
                if output.exists() {
                    bail!("{} already exists", output.display());
                }

                let bytes = hex::decode(payload.strip_prefix("0x").unwrap_or(&payload))
                    .context("invalid `payload`")?;
                let authorizer = ThresholdAuthorizer::new(OwnerSet::new(owners, threshold)?);
                let pool = local_addresses(&app.keyring()?, &keys)?;

                let selection = if auth_keys.is_empty() {
                    authorizer.auto_select(&pool)
                } else {
                    authorizer.validate(&auth_keys)?
                };

                let tx = PendingTransaction::new(TxPayload::new(bytes), &selection);
                multisig::persist(&tx, &output)?;

                println!("{}", "✓ Created transaction".green().bold());
                println!("  {} {}", "Id:".bright_blue(), tx.id());
                println!("  {} {}", "File:".bright_blue(), output.display());
                println!(
                    "  {} {} of {} owners",
                    "Threshold:".bright_blue(),
                    threshold,
                    authorizer.owner_set().len()
                );
                for signer in selection.signers() {
                    let local = if pool.contains(signer) {
                        " (local)".bright_black().to_string()
                    } else {
                        String::new()
                    };
                    println!("  {} {signer}{local}", "Signer:".bright_blue());
                }
            }
            Multisig::Sign { file, keys } => {
                let mut tx = multisig::load(&file)?;
                let signers = app.keyring()?.signers(&keys)?;
                let before = tx.signed_signers().len();

                let result = tx.sign(&signers);
                // Keep whatever was signed before a failing signer.
                if tx.signed_signers().len() != before {
                    multisig::persist(&tx, &file)?;
                }

                match result {
                    Ok(report) => {
                        for address in &report.signed {
                            println!("{} {address}", "✓ Signed by".green().bold());
                        }
                        print_status(&tx, &file);
                    }
                    Err(MultisigError::NoMatchingSigner { remaining }) => {
                        tracing::debug!("Local keys: {}", signers.len());
                        bail!(
                            "none of the local keys can sign; remaining signers:\n  {}\nuse a keyring holding one of them and retry",
                            join(&remaining, "\n  ")
                        );
                    }
                    Err(err) => return Err(err.into()),
                }
            }
            Multisig::Status { file } => {
                let tx = multisig::load(&file)?;
                print_status(&tx, &file);
            }
            Multisig::Submit { file, chain } => {
                let mut tx = multisig::load(&file)?;
                let workflow = MultisigWorkflow::new(RpcSubmitter::new(app.rpc()?, chain));

                let receipt = workflow.submit(&mut tx).await?;
                multisig::persist(&tx, &file)
                    .context("transaction was submitted but the file could not be updated")?;

                println!("{} {receipt}", "✓ Submitted transaction".green().bold());
            }
            Multisig::Abandon { file } => {
                let mut tx = multisig::load(&file)?;
                tx.abandon()?;
                multisig::persist(&tx, &file)?;

                println!("{} {}", "✓ Abandoned transaction".yellow().bold(), tx.id());
            }
        }

        Ok(())
    }
}

fn local_addresses(keyring: &Keyring, keys: &[String]) -> Result<Vec<Address>> {
    if keys.is_empty() {
        return Ok(keyring.addresses());
    }

    keys.iter()
        .map(|name| {
            keyring
                .get(name)
                .map(|keystore| keystore.address)
                .with_context(|| format!("key '{name}' not found in keyring"))
        })
        .collect()
}

fn join(addresses: &[Address], separator: &str) -> String {
    addresses
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(separator)
}

fn print_status(tx: &PendingTransaction, file: &Path) {
    let state = match tx.state() {
        TxState::FullySigned | TxState::Submitted => tx.state().to_string().green().bold(),
        TxState::Abandoned => tx.state().to_string().red().bold(),
        _ => tx.state().to_string().yellow().bold(),
    };

    println!("{} {}", "Transaction".bold(), tx.id());
    println!("  {} {}", "File:".bright_blue(), file.display());
    println!("  {} {state}", "State:".bright_blue());
    println!(
        "  {} {}/{}",
        "Signatures:".bright_blue(),
        tx.signed_signers().len(),
        tx.required_signers().len()
    );

    for address in tx.signed_signers() {
        println!("    {} {address}", "✓".green());
    }
    for address in tx.remaining_signers() {
        println!("    {} {address}", "…".yellow());
    }

    if let Lifecycle::Submitted { receipt } = tx.lifecycle() {
        println!("  {} {receipt}", "Receipt:".bright_blue());
    }
}
