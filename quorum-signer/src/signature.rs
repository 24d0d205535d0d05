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

//! Recoverable secp256k1 signature.

use crate::{
    address::Address,
    error::{Result, SignerError},
    hash::keccak256,
};
use core::str::FromStr;
use k256::ecdsa::{RecoveryId, Signature as EcdsaSignature, VerifyingKey};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// Signature bytes laid out as `r || s || v`, where `v` is the recovery id.
#[derive(Clone, Copy, PartialEq, Eq, derive_more::Debug, derive_more::Display)]
#[display("0x{}", hex::encode(_0))]
#[debug("Signature(0x{})", hex::encode(_0))]
pub struct Signature([u8; 65]);

impl Signature {
    /// Signature size in bytes.
    pub const SIZE: usize = 65;

    pub fn from_bytes(bytes: [u8; 65]) -> Self {
        Self(bytes)
    }

    pub fn to_bytes(&self) -> [u8; 65] {
        self.0
    }

    pub(crate) fn from_parts(signature: EcdsaSignature, recovery_id: RecoveryId) -> Self {
        let mut bytes = [0u8; 65];
        bytes[..64].copy_from_slice(&signature.to_bytes());
        bytes[64] = recovery_id.to_byte();
        Self(bytes)
    }

    /// Recover the address that signed `payload`.
    pub fn recover(&self, payload: &[u8]) -> Result<Address> {
        let signature = EcdsaSignature::from_slice(&self.0[..64])
            .map_err(|err| SignerError::InvalidSignature(err.to_string()))?;
        let recovery_id = RecoveryId::from_byte(self.0[64])
            .ok_or_else(|| SignerError::InvalidSignature("invalid recovery id".into()))?;

        let digest = keccak256(payload);
        let key = VerifyingKey::recover_from_prehash(&digest, &signature, recovery_id)
            .map_err(|err| SignerError::Crypto(format!("Recovery failed: {err}")))?;

        Ok(Address::from_verifying_key(&key))
    }

    /// Check that `address` produced this signature over `payload`.
    pub fn verify(&self, payload: &[u8], address: Address) -> Result<()> {
        let recovered = self.recover(payload)?;
        if recovered == address {
            Ok(())
        } else {
            Err(SignerError::Crypto(format!(
                "Signature belongs to {recovered}, expected {address}"
            )))
        }
    }
}

impl FromStr for Signature {
    type Err = SignerError;

    fn from_str(s: &str) -> Result<Self> {
        let stripped = s.strip_prefix("0x").unwrap_or(s);
        let mut bytes = [0u8; 65];
        hex::decode_to_slice(stripped, &mut bytes)
            .map_err(|err| SignerError::InvalidSignature(err.to_string()))?;
        Ok(Self(bytes))
    }
}

impl Serialize for Signature {
    fn serialize<S>(&self, serializer: S) -> core::result::Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        self.to_string().serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for Signature {
    fn deserialize<D>(deserializer: D) -> core::result::Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let signature = String::deserialize(deserializer)?;
        Signature::from_str(&signature).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::key::PrivateKey;

    #[test]
    fn recovers_signer_address() {
        let key = PrivateKey::random();
        let signature = key.sign(b"hello world").unwrap();

        assert_eq!(signature.recover(b"hello world").unwrap(), key.address());
        signature.verify(b"hello world", key.address()).unwrap();
    }

    #[test]
    fn verify_rejects_other_payload() {
        let key = PrivateKey::random();
        let signature = key.sign(b"hello world").unwrap();

        assert!(signature.verify(b"goodbye", key.address()).is_err());
    }

    #[test]
    fn hex_roundtrip() {
        let key = PrivateKey::random();
        let signature = key.sign(b"payload").unwrap();

        let parsed = Signature::from_str(&signature.to_string()).unwrap();
        assert_eq!(parsed, signature);
    }
}
