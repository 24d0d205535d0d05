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

//! Durable checkpoint of a pending transaction.

use super::{MultisigError, PendingTransaction};
use std::{fs, io::Write, path::Path};
use tempfile::NamedTempFile;

fn io_error(path: &Path) -> impl FnOnce(std::io::Error) -> MultisigError + '_ {
    move |source| MultisigError::Io {
        path: path.to_path_buf(),
        source,
    }
}

/// Write `tx` to `path`, replacing any previous checkpoint.
///
/// The new state goes to a temporary file in the same directory which is
/// synced and then renamed over `path`, so a crash leaves either the old file
/// or the new one. Concurrent writers to the same path are not guarded
/// against; hand the file from one operator to the next.
pub fn persist(tx: &PendingTransaction, path: &Path) -> Result<(), MultisigError> {
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };

    let json = serde_json::to_vec_pretty(tx)?;

    let mut file = NamedTempFile::new_in(dir).map_err(io_error(path))?;
    file.write_all(&json).map_err(io_error(path))?;
    file.as_file().sync_all().map_err(io_error(path))?;
    file.persist(path).map_err(|err| io_error(path)(err.error))?;

    Ok(())
}

/// Read a checkpoint back, rejecting files that fail integrity checks.
pub fn load(path: &Path) -> Result<PendingTransaction, MultisigError> {
    let json = fs::read(path).map_err(io_error(path))?;
    let tx: PendingTransaction = serde_json::from_slice(&json)?;
    tx.check_integrity()?;
    Ok(tx)
}
