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

//! command `transfer`

use crate::{
    app::App,
    rpc::{RpcLegExecutor, namespace},
};
use anyhow::Result;
use clap::Parser;
use colored::Colorize;
use quorum::{
    Address, Signer,
    transfer::{RecoveryStep, TransferError, TransferPlan, TransferWorkflow},
};

/// Move funds from the source ledger to the destination through the
/// intermediate ledger.
///
/// Legs run in order from `--recovery-step`. When a leg fails, the command
/// prints the step to resume at; pass it back once the cause is fixed.
#[derive(Clone, Debug, Parser)]
pub struct Transfer {
    /// Amount to move, in the ledger's smallest unit.
    #[arg(long)]
    amount: u128,

    /// Recipient on the destination ledger.
    #[arg(long)]
    to: Address,

    /// Next leg to execute: 0 export from source, 1 export from intermediate,
    /// 2 import into destination. Only pass a non-zero step after confirming
    /// the earlier legs on their ledgers.
    #[arg(long, default_value = "0")]
    recovery_step: RecoveryStep,

    /// Key to sign the legs with; the primary key when omitted.
    #[arg(long)]
    key: Option<String>,

    /// Ledger the funds leave.
    #[arg(long, default_value = "X")]
    source: String,

    /// Ledger the funds pass through.
    #[arg(long, default_value = "P")]
    intermediate: String,

    /// Ledger the funds arrive at.
    #[arg(long, default_value = "C")]
    destination: String,
}

impl Transfer {
    fn plan(&self) -> TransferPlan {
        TransferPlan {
            source: self.source.clone(),
            intermediate: self.intermediate.clone(),
            destination: self.destination.clone(),
            amount: self.amount,
            recipient: self.to,
        }
    }

    pub async fn exec(self, app: &App) -> Result<()> {
        let signer = app.signer(self.key.as_deref())?;
        tracing::info!(
            "Transferring {} from {} ({}) via {} to {} as {}",
            self.amount,
            self.source,
            namespace(&self.source),
            self.intermediate,
            self.destination,
            signer.address()
        );

        let executor = RpcLegExecutor::new(app.rpc()?, signer);
        let mut workflow = TransferWorkflow::resume(executor, self.recovery_step);

        let result = workflow.run_remaining(&self.plan()).await;
        for receipt in workflow.journey().completed() {
            println!("{} {}: {}", "✓".green(), receipt.leg, receipt.tx_id);
        }

        match result {
            Ok(_) => {
                println!("{}", "✓ Transfer complete".green().bold());
                Ok(())
            }
            Err(err) => {
                match &err {
                    TransferError::LegIndeterminate { step, .. } => {
                        eprintln!(
                            "{}",
                            format!(
                                "Check the ledger before retrying. Re-running step {step} after it \
                                 was accepted would move the funds twice."
                            )
                            .yellow()
                            .bold()
                        );
                    }
                    _ => {
                        if workflow.journey().in_flight() {
                            eprintln!("{}", workflow.abandon().to_string().yellow());
                        }
                    }
                }

                Err(err.into())
            }
        }
    }
}
