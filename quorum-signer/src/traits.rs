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

//! The signing capability consumed by the workflows.

use crate::{address::Address, error::Result, signature::Signature};
use core::fmt;
use serde::{Deserialize, Serialize};

/// Where a signer's key material lives.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SignerOrigin {
    /// A key stored in the local keyring under `name`.
    Stored { name: String },
    /// A key held by a hardware ledger at derivation `index`.
    Ledger { index: u32 },
}

impl fmt::Display for SignerOrigin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Stored { name } => write!(f, "stored key '{name}'"),
            Self::Ledger { index } => write!(f, "ledger index {index}"),
        }
    }
}

/// An addressable signing capability.
///
/// Implementors are owned by the process for one command invocation. The
/// workflows only ever call [`Signer::sign`]; they never see key material.
pub trait Signer: Send + Sync {
    /// Address this signer signs for.
    fn address(&self) -> Address;

    /// Backend holding the key.
    fn origin(&self) -> SignerOrigin;

    /// Sign an opaque payload.
    fn sign(&self, payload: &[u8]) -> Result<Signature>;
}

impl<S: Signer + ?Sized> Signer for Box<S> {
    fn address(&self) -> Address {
        (**self).address()
    }

    fn origin(&self) -> SignerOrigin {
        (**self).origin()
    }

    fn sign(&self, payload: &[u8]) -> Result<Signature> {
        (**self).sign(payload)
    }
}
