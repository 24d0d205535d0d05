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

//! secp256k1 private key backed by `k256`.

use crate::{
    address::Address,
    error::{Result, SignerError},
    hash::keccak256,
    signature::Signature,
};
use core::{fmt, str::FromStr};
use k256::ecdsa::SigningKey;
use rand::rngs::OsRng;

/// secp256k1 private key.
#[derive(Clone)]
pub struct PrivateKey(SigningKey);

impl PrivateKey {
    /// Generate a new random private key.
    pub fn random() -> Self {
        Self(SigningKey::random(&mut OsRng))
    }

    /// Construct from a raw 32-byte secret.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        SigningKey::from_slice(bytes)
            .map(Self)
            .map_err(|err| SignerError::InvalidKey(err.to_string()))
    }

    /// Return the raw secret bytes.
    pub fn to_bytes(&self) -> [u8; 32] {
        self.0.to_bytes().into()
    }

    /// Address controlled by this key.
    pub fn address(&self) -> Address {
        Address::from_verifying_key(self.0.verifying_key())
    }

    /// Sign the keccak256 digest of `payload`.
    pub fn sign(&self, payload: &[u8]) -> Result<Signature> {
        let digest = keccak256(payload);
        let (signature, recovery_id) = self
            .0
            .sign_prehash_recoverable(&digest)
            .map_err(|err| SignerError::Crypto(format!("Signing failed: {err}")))?;

        Ok(Signature::from_parts(signature, recovery_id))
    }
}

impl fmt::Debug for PrivateKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("PrivateKey(<redacted>)")
    }
}

impl fmt::Display for PrivateKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{}", hex::encode(self.to_bytes()))
    }
}

impl FromStr for PrivateKey {
    type Err = SignerError;

    fn from_str(s: &str) -> Result<Self> {
        let trimmed = s.trim();
        let stripped = trimmed.strip_prefix("0x").unwrap_or(trimmed);
        let mut bytes = [0u8; 32];
        hex::decode_to_slice(stripped, &mut bytes)
            .map_err(|err| SignerError::InvalidKey(format!("expected 32-byte hex: {err}")))?;
        Self::from_bytes(&bytes)
    }
}

impl PartialEq for PrivateKey {
    fn eq(&self, other: &Self) -> bool {
        self.to_bytes() == other.to_bytes()
    }
}

impl Eq for PrivateKey {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hex_roundtrip_keeps_address() {
        let key = PrivateKey::random();
        let restored = PrivateKey::from_str(&key.to_string()).unwrap();

        assert_eq!(restored, key);
        assert_eq!(restored.address(), key.address());
    }

    #[test]
    fn rejects_zero_scalar() {
        assert!(PrivateKey::from_bytes(&[0u8; 32]).is_err());
    }

    #[test]
    fn debug_is_redacted() {
        let key = PrivateKey::random();
        assert_eq!(format!("{key:?}"), "PrivateKey(<redacted>)");
    }
}
