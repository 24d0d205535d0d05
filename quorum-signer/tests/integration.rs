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

//! Integration tests for quorum-signer.
//!
//! These tests exercise the keyring on disk end to end: keys written by one
//! keyring instance must sign identically when loaded by another.

use quorum_signer::{Keyring, PrivateKey, Signer, SignerError};

#[test]
fn keys_survive_reload() {
    let tmp = tempfile::tempdir().unwrap();

    let created = {
        let mut keyring = Keyring::load(tmp.path().to_path_buf()).unwrap();
        keyring.create("alice").unwrap()
    };

    let keyring = Keyring::load(tmp.path().to_path_buf()).unwrap();
    let signers = keyring.signers(&["alice".into()]).unwrap();

    let signature = signers[0].sign(b"message").unwrap();
    signature.verify(b"message", created.address).unwrap();
}

#[test]
fn import_from_exported_file() {
    let source = tempfile::tempdir().unwrap();
    let target = tempfile::tempdir().unwrap();

    let mut keyring = Keyring::load(source.path().to_path_buf()).unwrap();
    let exported = keyring.create("carol").unwrap();

    let mut other = Keyring::load(target.path().to_path_buf()).unwrap();
    let imported = other.import(&source.path().join("carol.json")).unwrap();

    assert_eq!(imported.name, "carol");
    assert_eq!(imported.address, exported.address);
    assert!(other.find_by_address(exported.address).is_some());
}

#[test]
fn add_hex_matches_private_key_address() {
    let tmp = tempfile::tempdir().unwrap();
    let mut keyring = Keyring::load(tmp.path().to_path_buf()).unwrap();

    let key = PrivateKey::random();
    let keystore = keyring.add_hex("dave", &key.to_string()).unwrap();

    assert_eq!(keystore.address, key.address());
    assert!(matches!(
        keyring.add_hex("erin", "0x1234"),
        Err(SignerError::InvalidKey(_))
    ));
}
