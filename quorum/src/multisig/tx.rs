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

//! Pending transaction value type.

use super::{MultisigError, SubmitReceipt};
use crate::auth::AuthKeySelection;
use quorum_signer::{Address, Signature, Signer, hash::keccak256};
use serde::{Deserialize, Serialize};
use std::{
    collections::{BTreeMap, BTreeSet},
    fmt,
};

/// Current persisted file format.
pub const FORMAT_VERSION: u32 = 1;

/// Transaction identity assigned by the ledger SDK, or derived from the bytes.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TxId(#[serde(with = "hex_array")] [u8; 32]);

impl TxId {
    pub fn from_bytes(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    pub fn to_bytes(&self) -> [u8; 32] {
        self.0
    }
}

impl fmt::Display for TxId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{}", hex::encode(self.0))
    }
}

impl fmt::Debug for TxId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "TxId({self})")
    }
}

/// Opaque transaction blob understood only by the ledger SDK.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TxPayload {
    pub id: TxId,
    #[serde(with = "hex_vec")]
    pub bytes: Vec<u8>,
}

impl TxPayload {
    /// Wrap raw bytes, deriving the id as their keccak256 hash.
    pub fn new(bytes: Vec<u8>) -> Self {
        Self {
            id: TxId(keccak256(&bytes)),
            bytes,
        }
    }

    pub fn with_id(id: TxId, bytes: Vec<u8>) -> Self {
        Self { id, bytes }
    }
}

/// Where a transaction is in its life.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TxState {
    Unsigned,
    PartiallySigned,
    FullySigned,
    Submitted,
    Abandoned,
}

impl fmt::Display for TxState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Unsigned => "unsigned",
            Self::PartiallySigned => "partially signed",
            Self::FullySigned => "fully signed",
            Self::Submitted => "submitted",
            Self::Abandoned => "abandoned",
        })
    }
}

/// Terminal markers persisted with the transaction.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum Lifecycle {
    #[default]
    Open,
    Submitted {
        receipt: SubmitReceipt,
    },
    Abandoned,
}

/// Addresses newly signed during one pass.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct SignReport {
    pub signed: Vec<Address>,
    pub remaining: Vec<Address>,
}

/// A transaction collecting signatures from its required signers.
///
/// Required signers are fixed at creation. Signatures are only ever added,
/// so [`PendingTransaction::remaining_signers`] only ever shrinks.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PendingTransaction {
    pub(super) version: u32,
    pub(super) payload: TxPayload,
    pub(super) threshold: usize,
    pub(super) required: BTreeSet<Address>,
    #[serde(default)]
    pub(super) signatures: BTreeMap<Address, Signature>,
    #[serde(default)]
    pub(super) lifecycle: Lifecycle,
}

impl PendingTransaction {
    /// Create an unsigned transaction requiring every selected signer.
    pub fn new(payload: TxPayload, selection: &AuthKeySelection) -> Self {
        Self {
            version: FORMAT_VERSION,
            payload,
            threshold: selection.threshold(),
            required: selection.signers().iter().copied().collect(),
            signatures: BTreeMap::new(),
            lifecycle: Lifecycle::Open,
        }
    }

    pub fn payload(&self) -> &TxPayload {
        &self.payload
    }

    pub fn id(&self) -> TxId {
        self.payload.id
    }

    /// Owner-set threshold the selection was authorized against.
    pub fn threshold(&self) -> usize {
        self.threshold
    }

    pub fn required_signers(&self) -> Vec<Address> {
        self.required.iter().copied().collect()
    }

    pub fn signed_signers(&self) -> Vec<Address> {
        self.signatures.keys().copied().collect()
    }

    pub fn signature(&self, address: &Address) -> Option<&Signature> {
        self.signatures.get(address)
    }

    /// Required signers without a signature yet; empty exactly when fully signed.
    pub fn remaining_signers(&self) -> Vec<Address> {
        self.required
            .iter()
            .filter(|address| !self.signatures.contains_key(*address))
            .copied()
            .collect()
    }

    pub fn lifecycle(&self) -> &Lifecycle {
        &self.lifecycle
    }

    pub fn state(&self) -> TxState {
        match self.lifecycle {
            Lifecycle::Submitted { .. } => TxState::Submitted,
            Lifecycle::Abandoned => TxState::Abandoned,
            Lifecycle::Open if self.signatures.is_empty() => TxState::Unsigned,
            Lifecycle::Open if self.remaining_signers().is_empty() => TxState::FullySigned,
            Lifecycle::Open => TxState::PartiallySigned,
        }
    }

    fn ensure_open(&self) -> Result<(), MultisigError> {
        match &self.lifecycle {
            Lifecycle::Open => Ok(()),
            Lifecycle::Submitted { receipt } => Err(MultisigError::AlreadySubmitted {
                receipt: receipt.clone(),
            }),
            Lifecycle::Abandoned => Err(MultisigError::Abandoned),
        }
    }

    /// Run one signing pass with the local signers.
    ///
    /// Each still-required signer that has a matching local signer is signed
    /// for. If a signer fails midway, signatures gathered earlier in the pass
    /// stay applied. Signing an already fully signed transaction is a no-op.
    pub fn sign<S: Signer>(&mut self, signers: &[S]) -> Result<SignReport, MultisigError> {
        self.ensure_open()?;

        let remaining = self.remaining_signers();
        if remaining.is_empty() {
            return Ok(SignReport::default());
        }

        let matching: Vec<&S> = remaining
            .iter()
            .filter_map(|address| signers.iter().find(|s| s.address() == *address))
            .collect();

        if matching.is_empty() {
            return Err(MultisigError::NoMatchingSigner { remaining });
        }

        let mut signed = Vec::with_capacity(matching.len());
        for signer in matching {
            let address = signer.address();
            let signature = signer
                .sign(&self.payload.bytes)
                .map_err(|source| MultisigError::Signer {
                    address,
                    origin: signer.origin(),
                    source,
                })?;

            let actual = signature.recover(&self.payload.bytes).map_err(|source| {
                MultisigError::Signer {
                    address,
                    origin: signer.origin(),
                    source,
                }
            })?;
            if actual != address {
                return Err(MultisigError::SignerMismatch {
                    expected: address,
                    actual,
                });
            }

            self.signatures.insert(address, signature);
            signed.push(address);
        }

        Ok(SignReport {
            signed,
            remaining: self.remaining_signers(),
        })
    }

    /// Mark the transaction as given up on by the operator.
    ///
    /// Idempotent; a submitted transaction cannot be abandoned.
    pub fn abandon(&mut self) -> Result<(), MultisigError> {
        match self.lifecycle {
            Lifecycle::Submitted { .. } => self.ensure_open(),
            Lifecycle::Abandoned => Ok(()),
            Lifecycle::Open => {
                self.lifecycle = Lifecycle::Abandoned;
                Ok(())
            }
        }
    }

    /// The fully signed form handed to the ledger.
    pub fn signed(&self) -> Result<SignedTransaction, MultisigError> {
        self.ensure_open()?;

        let remaining = self.remaining_signers();
        if !remaining.is_empty() {
            return Err(MultisigError::NotFullySigned { remaining });
        }

        Ok(SignedTransaction {
            payload: self.payload.clone(),
            signatures: self
                .signatures
                .iter()
                .map(|(address, signature)| (*address, *signature))
                .collect(),
        })
    }

    pub(super) fn mark_submitted(&mut self, receipt: SubmitReceipt) {
        self.lifecycle = Lifecycle::Submitted { receipt };
    }

    /// Structural checks run on every load.
    pub(super) fn check_integrity(&self) -> Result<(), MultisigError> {
        if self.version != FORMAT_VERSION {
            return Err(MultisigError::UnsupportedVersion {
                found: self.version,
            });
        }
        if self.required.is_empty() {
            return Err(MultisigError::Corrupted(
                "no required signers recorded".into(),
            ));
        }
        if self.threshold == 0 || self.threshold > self.required.len() {
            return Err(MultisigError::Corrupted(format!(
                "threshold {} does not fit {} required signers",
                self.threshold,
                self.required.len()
            )));
        }

        for (address, signature) in &self.signatures {
            if !self.required.contains(address) {
                return Err(MultisigError::Corrupted(format!(
                    "signature from {address} who is not a required signer"
                )));
            }
            signature
                .verify(&self.payload.bytes, *address)
                .map_err(|err| {
                    MultisigError::Corrupted(format!("bad signature from {address}: {err}"))
                })?;
        }

        Ok(())
    }
}

/// A transaction carrying every required signature.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignedTransaction {
    pub payload: TxPayload,
    pub signatures: Vec<(Address, Signature)>,
}

impl SignedTransaction {
    /// Wire encoding handed to the ledger.
    pub fn encode(&self) -> Result<Vec<u8>, MultisigError> {
        Ok(serde_json::to_vec(self)?)
    }
}

mod hex_vec {
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(bytes: &[u8], serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&format!("0x{}", hex::encode(bytes)))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<u8>, D::Error> {
        let s = String::deserialize(deserializer)?;
        hex::decode(s.strip_prefix("0x").unwrap_or(&s)).map_err(serde::de::Error::custom)
    }
}

mod hex_array {
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(bytes: &[u8; 32], serializer: S) -> Result<S::Ok, S::Error> {
        super::hex_vec::serialize(bytes, serializer)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<[u8; 32], D::Error> {
        let s = String::deserialize(deserializer)?;
        let mut bytes = [0u8; 32];
        hex::decode_to_slice(s.strip_prefix("0x").unwrap_or(&s), &mut bytes)
            .map_err(serde::de::Error::custom)?;
        Ok(bytes)
    }
}
