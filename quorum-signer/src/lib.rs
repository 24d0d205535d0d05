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

//! Signer capability for quorum workflows.
//!
//! The multi-party workflows never touch key material directly. They only see
//! the [`Signer`] trait: something bound to an [`Address`] that can produce a
//! [`Signature`] over an opaque payload. This crate provides that trait, the
//! address and signature types shared with the workflows, and a stored-key
//! backend built on secp256k1 together with the on-disk [`Keyring`] that holds
//! those keys.

pub mod address;
pub mod error;
pub mod hash;
pub mod key;
pub mod keyring;
pub mod signature;
pub mod traits;

pub use address::Address;
pub use error::{Result, SignerError};
pub use key::PrivateKey;
pub use keyring::{Keyring, Keystore, StoredSigner};
pub use signature::Signature;
pub use traits::{Signer, SignerOrigin};
