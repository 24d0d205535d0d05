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

//! Signer address.

use crate::{error::SignerError, hash::keccak256};
use core::str::FromStr;
use k256::ecdsa::VerifyingKey;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// Fixed-length account identifier.
///
/// Obtained from the least significant 20 bytes of the keccak256 hash of the
/// uncompressed secp256k1 public key, the same way Ethereum-style accounts are.
#[derive(
    Default,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    derive_more::From,
    derive_more::Debug,
    derive_more::Display,
)]
#[from([u8; 20])]
#[display("0x{}", hex::encode(_0))]
#[debug("0x{}", hex::encode(_0))]
pub struct Address(pub [u8; 20]);

impl Address {
    /// Lowercase hex representation without `0x` prefix.
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }

    /// Derive the address owned by a secp256k1 public key.
    pub fn from_verifying_key(key: &VerifyingKey) -> Self {
        let uncompressed = key.to_encoded_point(false);
        // Skip the 0x04 SEC1 tag.
        let hash = keccak256(&uncompressed.as_bytes()[1..]);

        let mut address = Address::default();
        address.0.copy_from_slice(&hash[12..]);
        address
    }
}

impl AsRef<[u8]> for Address {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

impl From<&VerifyingKey> for Address {
    fn from(key: &VerifyingKey) -> Self {
        Self::from_verifying_key(key)
    }
}

impl FromStr for Address {
    type Err = SignerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        let stripped = trimmed.strip_prefix("0x").unwrap_or(trimmed);

        let mut bytes = [0u8; 20];
        hex::decode_to_slice(stripped, &mut bytes)
            .map_err(|err| SignerError::InvalidAddress(format!("{s}: {err}")))?;

        Ok(Self(bytes))
    }
}

impl Serialize for Address {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        self.to_string().serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for Address {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let address = String::deserialize(deserializer)?;
        Address::from_str(&address).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_with_and_without_prefix() {
        let with = Address::from_str("0x000102030405060708090a0b0c0d0e0f10111213").unwrap();
        let without = Address::from_str("000102030405060708090a0b0c0d0e0f10111213").unwrap();

        assert_eq!(with, without);
        assert_eq!(with.to_string(), "0x000102030405060708090a0b0c0d0e0f10111213");
    }

    #[test]
    fn rejects_wrong_length() {
        assert!(matches!(
            Address::from_str("0xdeadbeef"),
            Err(SignerError::InvalidAddress(_))
        ));
    }

    #[test]
    fn serde_uses_prefixed_hex() {
        let address = Address([0xab; 20]);
        let json = serde_json::to_string(&address).unwrap();

        assert_eq!(json, format!("\"0x{}\"", "ab".repeat(20)));
        assert_eq!(serde_json::from_str::<Address>(&json).unwrap(), address);
    }
}
