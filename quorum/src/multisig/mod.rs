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

//! Partial signature collection for M-of-N owner sets.
//!
//! A [`PendingTransaction`] is created for an authorized signer selection,
//! signed by whichever parties hold the keys, checkpointed to disk between
//! passes with [`persist`]/[`load`] and finally handed to a [`Submitter`].
//!
//! ```text
//! Unsigned -> PartiallySigned -> FullySigned -> Submitted
//!        \            \               \
//!         `------------`---------------`-> Abandoned
//! ```

mod file;
mod tx;

pub use file::{load, persist};
pub use tx::{
    FORMAT_VERSION, Lifecycle, PendingTransaction, SignReport, SignedTransaction, TxId, TxPayload,
    TxState,
};

use async_trait::async_trait;
use quorum_signer::{Address, SignerError, SignerOrigin};
use serde::{Deserialize, Serialize};
use std::{fmt, path::PathBuf};
use thiserror::Error;

/// Ledger acknowledgement of a submitted transaction.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubmitReceipt {
    pub tx_id: String,
}

impl fmt::Display for SubmitReceipt {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.tx_id)
    }
}

#[derive(Debug, Error)]
pub enum MultisigError {
    #[error("none of the local keys can sign for the remaining signers: {}", join(.remaining))]
    NoMatchingSigner { remaining: Vec<Address> },
    #[error("transaction still needs signatures from: {}", join(.remaining))]
    NotFullySigned { remaining: Vec<Address> },
    #[error("transaction was already submitted as {receipt}")]
    AlreadySubmitted { receipt: SubmitReceipt },
    #[error("transaction was abandoned")]
    Abandoned,
    #[error("signer for {expected} produced a signature recovering to {actual}")]
    SignerMismatch { expected: Address, actual: Address },
    #[error("signer {address} ({origin}) failed: {source}")]
    Signer {
        address: Address,
        origin: SignerOrigin,
        source: SignerError,
    },
    #[error("failed to access {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("malformed transaction file: {0}")]
    Format(#[from] serde_json::Error),
    #[error("corrupted transaction file: {0}")]
    Corrupted(String),
    #[error("unsupported transaction file version {found}, expected {FORMAT_VERSION}")]
    UnsupportedVersion { found: u32 },
    #[error("submission failed: {0}")]
    Submission(Box<dyn std::error::Error + Send + Sync>),
}

fn join(addresses: &[Address]) -> String {
    addresses
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

/// Hands fully signed transactions to the ledger.
#[async_trait]
pub trait Submitter: Send + Sync {
    type Error: std::error::Error + Send + Sync + 'static;

    async fn submit(&self, tx: &SignedTransaction) -> Result<SubmitReceipt, Self::Error>;
}

/// Signing, checkpointing and submission bound to one ledger.
#[derive(Clone, Debug)]
pub struct MultisigWorkflow<S> {
    submitter: S,
}

impl<S: Submitter> MultisigWorkflow<S> {
    pub fn new(submitter: S) -> Self {
        Self { submitter }
    }

    pub fn submitter(&self) -> &S {
        &self.submitter
    }

    /// Submit a fully signed transaction exactly once.
    ///
    /// The workflow never retries. On failure the transaction stays fully
    /// signed so the operator can decide whether to resubmit after checking
    /// the ledger.
    pub async fn submit(&self, tx: &mut PendingTransaction) -> Result<SubmitReceipt, MultisigError> {
        let signed = tx.signed()?;
        let receipt = self
            .submitter
            .submit(&signed)
            .await
            .map_err(|err| MultisigError::Submission(Box::new(err)))?;

        tx.mark_submitted(receipt.clone());
        Ok(receipt)
    }
}
