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

//! Multi-party authorization and resumable workflows.
//!
//! Four pieces coordinate outcomes across independent, unreliable actors
//! without a central transaction log:
//!
//! - [`cluster`]: fan-out/fan-in over many hosts with per-host outcomes.
//! - [`auth`]: M-of-N owner-set checks for a requested signer subset.
//! - [`multisig`]: partial signature collection persisted between passes.
//! - [`transfer`]: a three-leg cross-ledger transfer resumable at an explicit
//!   step.
//!
//! State lives in explicit, serializable values. Nothing here logs or prints;
//! every failure comes back as a typed error for the caller to present.

pub mod auth;
pub mod cluster;
pub mod multisig;
pub mod transfer;

pub use quorum_signer::{Address, Signature, Signer, SignerOrigin};
