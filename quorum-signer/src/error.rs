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

//! Error types for signer operations.

use std::io;
use thiserror::Error;

/// Errors produced by signers and the keyring.
#[derive(Debug, Error)]
pub enum SignerError {
    /// Key material could not be decoded or is out of range.
    #[error("Invalid key: {0}")]
    InvalidKey(String),

    /// Signature bytes are malformed or not recoverable.
    #[error("Invalid signature: {0}")]
    InvalidSignature(String),

    /// Address string is malformed.
    #[error("Invalid address: {0}")]
    InvalidAddress(String),

    /// The underlying curve implementation refused the operation.
    #[error("Crypto error: {0}")]
    Crypto(String),

    /// Named key is not present in the keyring.
    #[error("Key '{0}' not found in keyring")]
    KeyNotFound(String),

    /// The keyring holds no keys at all.
    #[error("No keys in keyring")]
    EmptyKeyring,

    /// Key names map to file names, so only `[A-Za-z0-9_-]` is accepted.
    #[error("Invalid key name '{0}': use letters, digits, '-' and '_' only")]
    InvalidName(String),

    /// A key with the same name already exists.
    #[error("Key '{0}' already exists in keyring")]
    KeyExists(String),

    /// Signing device (e.g. a hardware ledger) is not reachable.
    #[error("Signing device unavailable: {0}")]
    Unavailable(String),

    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Result type for signer operations.
pub type Result<T, E = SignerError> = core::result::Result<T, E>;
