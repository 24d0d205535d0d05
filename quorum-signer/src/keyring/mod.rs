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

//! On-disk keyring of stored signing keys.
//!
//! # Directory Structure
//!
//! ```text
//! keyring/
//! ├── keyring.json          # Configuration (primary key)
//! ├── alice.json            # Individual keystores
//! ├── bob.json
//! └── ...
//! ```

mod keystore;

pub use keystore::{Keystore, Meta, StoredSigner};

use crate::{
    address::Address,
    error::{Result, SignerError},
    key::PrivateKey,
};
use serde::{Deserialize, Serialize};
use std::{
    fs,
    path::{Path, PathBuf},
};

pub(crate) const CONFIG_FILE: &str = "keyring.json";

/// Keyring configuration stored on disk.
#[derive(Default, Serialize, Deserialize)]
struct KeyringConfig {
    /// The primary key name (if set).
    primary: Option<String>,
}

/// Collection of named keystores with a primary key concept.
pub struct Keyring {
    /// Path to the keyring directory.
    store: PathBuf,
    /// Loaded keystores.
    keystores: Vec<Keystore>,
    /// Primary key name.
    primary: Option<String>,
}

impl Keyring {
    /// Load keyring from directory.
    ///
    /// Creates the directory if it doesn't exist. Entries that fail to parse
    /// are skipped with a warning so one broken file does not lock the
    /// operator out of the remaining keys.
    pub fn load(store: PathBuf) -> Result<Self> {
        fs::create_dir_all(&store)?;

        let mut keystores = Vec::new();
        for entry in fs::read_dir(&store)? {
            let entry = match entry {
                Ok(entry) => entry,
                Err(err) => {
                    tracing::warn!("Failed to iterate keyring directory: {err}");
                    continue;
                }
            };

            let path = entry.path();
            if Self::is_config_file(&path) || !Self::is_keystore_file(&path) {
                continue;
            }

            match Self::read_keystore(&path) {
                Ok(keystore) => keystores.push(keystore),
                Err(err) => tracing::warn!("Failed to load keystore at {:?}: {err}", path),
            }
        }
        keystores.sort_by(|a, b| a.name.cmp(&b.name));

        let config_path = store.join(CONFIG_FILE);
        let primary = if config_path.exists() {
            let config: KeyringConfig = serde_json::from_slice(&fs::read(&config_path)?)?;
            config.primary
        } else {
            None
        };

        Ok(Self {
            store,
            keystores,
            primary,
        })
    }

    /// Keyring directory.
    pub fn path(&self) -> &Path {
        &self.store
    }

    fn is_config_file(path: &Path) -> bool {
        path.file_name().is_some_and(|name| name == CONFIG_FILE)
    }

    fn is_keystore_file(path: &Path) -> bool {
        path.is_file() && path.extension().is_some_and(|ext| ext == "json")
    }

    fn read_keystore(path: &Path) -> Result<Keystore> {
        let mut keystore: Keystore = serde_json::from_slice(&fs::read(path)?)?;

        if keystore.name.is_empty() {
            if let Some(stem) = path.file_stem().and_then(|s| s.to_str()) {
                keystore.name = stem.to_string();
            }
        }

        Ok(keystore)
    }

    fn keystore_path(&self, name: &str) -> PathBuf {
        self.store.join(format!("{name}.json"))
    }

    /// Names become file names inside the keyring directory.
    fn validate_name(name: &str) -> Result<()> {
        let valid = !name.is_empty()
            && name
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
            && format!("{name}.json") != CONFIG_FILE;

        if valid {
            Ok(())
        } else {
            Err(SignerError::InvalidName(name.to_string()))
        }
    }

    fn save_config(&self) -> Result<()> {
        let config = KeyringConfig {
            primary: self.primary.clone(),
        };
        fs::write(
            self.store.join(CONFIG_FILE),
            serde_json::to_vec_pretty(&config)?,
        )?;
        Ok(())
    }

    /// Persist a keystore entry, overwriting any entry with the same name.
    pub fn store(&mut self, name: &str, mut keystore: Keystore) -> Result<Keystore> {
        Self::validate_name(name)?;
        keystore.name = name.to_string();
        fs::write(
            self.keystore_path(name),
            serde_json::to_vec_pretty(&keystore)?,
        )?;

        match self.keystores.iter().position(|entry| entry.name == name) {
            Some(index) => self.keystores[index] = keystore.clone(),
            None => {
                self.keystores.push(keystore.clone());
                self.keystores.sort_by(|a, b| a.name.cmp(&b.name));
            }
        }

        tracing::debug!(name, address = %keystore.address, "Stored key in keyring");
        Ok(keystore)
    }

    /// Add an existing private key under a fresh name.
    pub fn add(&mut self, name: &str, private_key: PrivateKey) -> Result<Keystore> {
        Self::validate_name(name)?;
        if self.get(name).is_some() {
            return Err(SignerError::KeyExists(name.to_string()));
        }

        self.store(name, Keystore::from_private_key(name, &private_key))
    }

    /// Add a private key from its hex representation.
    pub fn add_hex(&mut self, name: &str, hex: &str) -> Result<Keystore> {
        let private_key = hex.parse::<PrivateKey>()?;
        self.add(name, private_key)
    }

    /// Generate and store a new private key.
    pub fn create(&mut self, name: &str) -> Result<Keystore> {
        self.add(name, PrivateKey::random())
    }

    /// Import a keystore from an arbitrary JSON file, named after the file.
    pub fn import(&mut self, path: &Path) -> Result<Keystore> {
        let name = path
            .file_stem()
            .and_then(|s| s.to_str())
            .ok_or_else(|| SignerError::InvalidName(path.display().to_string()))?
            .to_string();

        self.import_as(path, &name)
    }

    /// Import a keystore from a JSON file under a fresh name.
    pub fn import_as(&mut self, path: &Path, name: &str) -> Result<Keystore> {
        Self::validate_name(name)?;
        if self.get(name).is_some() {
            return Err(SignerError::KeyExists(name.to_string()));
        }

        let keystore = Self::read_keystore(path)?;
        // Reject files whose address does not match their key.
        keystore.signer()?;
        self.store(name, keystore)
    }

    /// Get the primary keystore.
    ///
    /// Falls back to (and records) the first key when no primary is set yet.
    pub fn primary(&mut self) -> Result<&Keystore> {
        let first = self
            .keystores
            .first()
            .map(|k| k.name.clone())
            .ok_or(SignerError::EmptyKeyring)?;

        let name = match self.primary.clone() {
            Some(name) => name,
            None => {
                self.primary = Some(first.clone());
                self.save_config()?;
                first
            }
        };

        self.get(&name).ok_or(SignerError::KeyNotFound(name))
    }

    /// Set the primary key by name.
    pub fn set_primary(&mut self, name: &str) -> Result<()> {
        if self.get(name).is_none() {
            return Err(SignerError::KeyNotFound(name.to_string()));
        }

        self.primary = Some(name.to_string());
        self.save_config()
    }

    /// Name of the primary key, if one has been chosen.
    pub fn primary_name(&self) -> Option<&str> {
        self.primary.as_deref()
    }

    /// All keystores, ordered by name.
    pub fn list(&self) -> &[Keystore] {
        &self.keystores
    }

    /// Get a keystore by name.
    pub fn get(&self, name: &str) -> Option<&Keystore> {
        self.keystores.iter().find(|k| k.name == name)
    }

    /// Find the keystore controlling `address`.
    pub fn find_by_address(&self, address: Address) -> Option<&Keystore> {
        self.keystores.iter().find(|k| k.address == address)
    }

    /// Remove a keystore by name.
    pub fn remove(&mut self, name: &str) -> Result<Keystore> {
        let index = self
            .keystores
            .iter()
            .position(|k| k.name == name)
            .ok_or_else(|| SignerError::KeyNotFound(name.to_string()))?;

        let keystore = self.keystores.remove(index);

        let path = self.keystore_path(name);
        if path.exists() {
            fs::remove_file(&path)?;
        }

        if self.primary.as_deref() == Some(name) {
            self.primary = None;
            self.save_config()?;
        }

        tracing::debug!(name, "Removed key from keyring");
        Ok(keystore)
    }

    /// Decode stored keys into signers.
    ///
    /// An empty `names` selects every key in the keyring.
    pub fn signers(&self, names: &[String]) -> Result<Vec<StoredSigner>> {
        if names.is_empty() {
            return self.keystores.iter().map(Keystore::signer).collect();
        }

        names
            .iter()
            .map(|name| {
                self.get(name)
                    .ok_or_else(|| SignerError::KeyNotFound(name.clone()))
                    .and_then(Keystore::signer)
            })
            .collect()
    }

    /// Addresses of every stored key.
    pub fn addresses(&self) -> Vec<Address> {
        self.keystores.iter().map(|k| k.address).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn keyring_operations() {
        let temp_dir = tempfile::tempdir().unwrap();
        let mut keyring = Keyring::load(temp_dir.path().to_path_buf()).unwrap();

        keyring.create("alice").unwrap();
        keyring.create("bob").unwrap();

        assert_eq!(keyring.list().len(), 2);
        assert_eq!(
            keyring
                .list()
                .iter()
                .map(|k| k.name.as_str())
                .collect::<HashSet<_>>(),
            HashSet::from(["alice", "bob"])
        );

        assert!(keyring.get("alice").is_some());
        assert!(keyring.get("charlie").is_none());

        keyring.set_primary("bob").unwrap();
        assert_eq!(keyring.primary().unwrap().name, "bob");

        keyring.remove("bob").unwrap();
        assert_eq!(keyring.list().len(), 1);
        assert!(keyring.primary_name().is_none());
    }

    #[test]
    fn primary_defaults_to_first_key() {
        let temp_dir = tempfile::tempdir().unwrap();
        let mut keyring = Keyring::load(temp_dir.path().to_path_buf()).unwrap();
        assert!(matches!(keyring.primary(), Err(SignerError::EmptyKeyring)));

        keyring.create("zed").unwrap();
        keyring.create("amy").unwrap();

        assert_eq!(keyring.primary().unwrap().name, "amy");

        let reloaded = Keyring::load(temp_dir.path().to_path_buf()).unwrap();
        assert_eq!(reloaded.primary_name(), Some("amy"));
    }

    #[test]
    fn duplicate_names_are_rejected() {
        let temp_dir = tempfile::tempdir().unwrap();
        let mut keyring = Keyring::load(temp_dir.path().to_path_buf()).unwrap();

        keyring.create("alice").unwrap();
        assert!(matches!(
            keyring.create("alice"),
            Err(SignerError::KeyExists(_))
        ));
    }

    #[test]
    fn dotted_name_cannot_overwrite_another_key() {
        let temp_dir = tempfile::tempdir().unwrap();
        let mut keyring = Keyring::load(temp_dir.path().to_path_buf()).unwrap();
        let alice = keyring.create("alice").unwrap();

        for name in ["alice.v2", "../alice", "a/b", "", "keyring"] {
            assert!(
                matches!(keyring.create(name), Err(SignerError::InvalidName(_))),
                "{name:?} accepted"
            );
        }
        keyring.create("alice_v2-backup").unwrap();

        let reloaded = Keyring::load(temp_dir.path().to_path_buf()).unwrap();
        assert_eq!(reloaded.get("alice").unwrap().address, alice.address);
        assert_eq!(reloaded.list().len(), 2);
        assert!(!temp_dir.path().parent().unwrap().join("alice.json").exists());
    }

    #[test]
    fn broken_entries_are_skipped() {
        let temp_dir = tempfile::tempdir().unwrap();
        let mut keyring = Keyring::load(temp_dir.path().to_path_buf()).unwrap();
        keyring.create("alice").unwrap();

        fs::write(temp_dir.path().join("broken.json"), b"{ not json").unwrap();

        let reloaded = Keyring::load(temp_dir.path().to_path_buf()).unwrap();
        assert_eq!(reloaded.list().len(), 1);
    }

    #[test]
    fn signers_by_name() {
        let temp_dir = tempfile::tempdir().unwrap();
        let mut keyring = Keyring::load(temp_dir.path().to_path_buf()).unwrap();
        let alice = keyring.create("alice").unwrap();
        keyring.create("bob").unwrap();

        let selected = keyring.signers(&["alice".into()]).unwrap();
        assert_eq!(selected.len(), 1);
        assert_eq!(crate::Signer::address(&selected[0]), alice.address);

        assert_eq!(keyring.signers(&[]).unwrap().len(), 2);
        assert!(matches!(
            keyring.signers(&["nobody".into()]),
            Err(SignerError::KeyNotFound(_))
        ));
    }
}
