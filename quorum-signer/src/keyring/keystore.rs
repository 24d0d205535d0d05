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

//! JSON keystore entries and the signer decoded from them.

use crate::{
    address::Address,
    error::{Result, SignerError},
    key::PrivateKey,
    signature::Signature,
    traits::{Signer, SignerOrigin},
};
use serde::{Deserialize, Serialize};
use std::time::{SystemTime, UNIX_EPOCH};

/// JSON keystore representation of a stored key.
#[derive(Clone, Serialize, Deserialize)]
pub struct Keystore {
    /// Human readable key name.
    #[serde(default)]
    pub name: String,
    /// Address controlled by the key.
    pub address: Address,
    /// Hex-encoded private key (prefixed with 0x).
    pub private_key: String,
    #[serde(default)]
    pub meta: Meta,
}

/// Keystore metadata.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Meta {
    #[serde(rename = "whenCreated")]
    pub when_created: u128,
}

impl Default for Meta {
    fn default() -> Self {
        Self {
            when_created: SystemTime::now()
                .duration_since(UNIX_EPOCH)
                .unwrap_or_default()
                .as_millis(),
        }
    }
}

impl Keystore {
    /// Create a keystore entry from a private key.
    pub fn from_private_key(name: &str, private_key: &PrivateKey) -> Self {
        Self {
            name: name.to_string(),
            address: private_key.address(),
            private_key: private_key.to_string(),
            meta: Meta::default(),
        }
    }

    /// Decode the stored private key.
    pub fn private_key(&self) -> Result<PrivateKey> {
        self.private_key.parse()
    }

    /// Decode the entry into a signer, checking the recorded address.
    pub fn signer(&self) -> Result<StoredSigner> {
        let key = self.private_key()?;
        if key.address() != self.address {
            return Err(SignerError::InvalidKey(format!(
                "keystore '{}' records address {} but its key controls {}",
                self.name,
                self.address,
                key.address()
            )));
        }

        Ok(StoredSigner {
            name: self.name.clone(),
            key,
        })
    }
}

/// Signer backed by a key from the local keyring.
#[derive(Clone, Debug)]
pub struct StoredSigner {
    name: String,
    key: PrivateKey,
}

impl StoredSigner {
    pub fn new(name: impl Into<String>, key: PrivateKey) -> Self {
        Self {
            name: name.into(),
            key,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }
}

impl Signer for StoredSigner {
    fn address(&self) -> Address {
        self.key.address()
    }

    fn origin(&self) -> SignerOrigin {
        SignerOrigin::Stored {
            name: self.name.clone(),
        }
    }

    fn sign(&self, payload: &[u8]) -> Result<Signature> {
        self.key.sign(payload)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tampered_address_is_rejected() {
        let mut keystore = Keystore::from_private_key("alice", &PrivateKey::random());
        keystore.address = Address([1; 20]);

        assert!(matches!(keystore.signer(), Err(SignerError::InvalidKey(_))));
    }

    #[test]
    fn stored_signer_signs_for_its_address() {
        let keystore = Keystore::from_private_key("alice", &PrivateKey::random());
        let signer = keystore.signer().unwrap();

        let signature = signer.sign(b"payload").unwrap();
        assert_eq!(signature.recover(b"payload").unwrap(), keystore.address);
        assert_eq!(
            signer.origin(),
            SignerOrigin::Stored {
                name: "alice".into()
            }
        );
    }
}
