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

//! Threshold authorization over an owner set.
//!
//! An [`OwnerSet`] names the addresses allowed to approve a change and how
//! many of them must sign. [`ThresholdAuthorizer`] checks a requested signer
//! subset against it and works out which owners the local signer pool can
//! cover. Everything here is a pure function of its inputs.

use quorum_signer::Address;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use thiserror::Error;

/// Invalid owner-set parameters.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum OwnerSetError {
    #[error("owner set is empty")]
    Empty,
    #[error("owner {0} is listed more than once")]
    DuplicateOwner(Address),
    #[error("threshold must be at least 1")]
    ZeroThreshold,
    #[error("threshold {threshold} exceeds the {owners} owners")]
    ThresholdTooHigh { threshold: usize, owners: usize },
}

/// Failed authorization of a requested signer subset.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AuthError {
    #[error("{address} is not one of the owners")]
    UnknownSigner { address: Address },
    #[error("{provided} signer(s) requested but the threshold is {threshold}")]
    InsufficientSigners { provided: usize, threshold: usize },
}

/// Addresses authorized to approve a change, plus how many must sign.
///
/// Immutable once built; owner order is preserved as read from the source.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "RawOwnerSet", into = "RawOwnerSet")]
pub struct OwnerSet {
    owners: Vec<Address>,
    threshold: usize,
}

#[derive(Serialize, Deserialize)]
struct RawOwnerSet {
    owners: Vec<Address>,
    threshold: usize,
}

impl TryFrom<RawOwnerSet> for OwnerSet {
    type Error = OwnerSetError;

    fn try_from(raw: RawOwnerSet) -> Result<Self, Self::Error> {
        Self::new(raw.owners, raw.threshold)
    }
}

impl From<OwnerSet> for RawOwnerSet {
    fn from(set: OwnerSet) -> Self {
        Self {
            owners: set.owners,
            threshold: set.threshold,
        }
    }
}

impl OwnerSet {
    pub fn new(owners: Vec<Address>, threshold: usize) -> Result<Self, OwnerSetError> {
        if owners.is_empty() {
            return Err(OwnerSetError::Empty);
        }

        let mut seen = BTreeSet::new();
        for owner in &owners {
            if !seen.insert(*owner) {
                return Err(OwnerSetError::DuplicateOwner(*owner));
            }
        }

        if threshold == 0 {
            return Err(OwnerSetError::ZeroThreshold);
        }
        if threshold > owners.len() {
            return Err(OwnerSetError::ThresholdTooHigh {
                threshold,
                owners: owners.len(),
            });
        }

        Ok(Self { owners, threshold })
    }

    pub fn owners(&self) -> &[Address] {
        &self.owners
    }

    pub fn threshold(&self) -> usize {
        self.threshold
    }

    pub fn len(&self) -> usize {
        self.owners.len()
    }

    pub fn is_empty(&self) -> bool {
        self.owners.is_empty()
    }

    pub fn contains(&self, address: &Address) -> bool {
        self.owners.contains(address)
    }
}

/// Owners chosen to sign, at least `threshold` of them, in owner order.
///
/// Being selected says nothing about having signed yet.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthKeySelection {
    signers: Vec<Address>,
    threshold: usize,
}

impl AuthKeySelection {
    pub fn signers(&self) -> &[Address] {
        &self.signers
    }

    pub fn threshold(&self) -> usize {
        self.threshold
    }

    pub fn len(&self) -> usize {
        self.signers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.signers.is_empty()
    }

    pub fn contains(&self, address: &Address) -> bool {
        self.signers.contains(address)
    }
}

/// Checks signer subsets against an [`OwnerSet`].
#[derive(Clone, Debug)]
pub struct ThresholdAuthorizer {
    owners: OwnerSet,
}

impl ThresholdAuthorizer {
    pub fn new(owners: OwnerSet) -> Self {
        Self { owners }
    }

    pub fn owner_set(&self) -> &OwnerSet {
        &self.owners
    }

    /// Validate an explicitly requested signer subset.
    ///
    /// Duplicated requests count once. Any non-owner fails the whole request
    /// before the threshold is considered.
    pub fn validate(&self, requested: &[Address]) -> Result<AuthKeySelection, AuthError> {
        if let Some(address) = requested.iter().find(|a| !self.owners.contains(a)) {
            return Err(AuthError::UnknownSigner { address: *address });
        }

        let requested: BTreeSet<_> = requested.iter().collect();
        let signers: Vec<_> = self
            .owners
            .owners()
            .iter()
            .filter(|owner| requested.contains(owner))
            .copied()
            .collect();

        if signers.len() < self.owners.threshold() {
            return Err(AuthError::InsufficientSigners {
                provided: signers.len(),
                threshold: self.owners.threshold(),
            });
        }

        Ok(AuthKeySelection {
            signers,
            threshold: self.owners.threshold(),
        })
    }

    /// Owners the local signer pool can sign for, in owner order.
    pub fn signable(&self, pool: &[Address]) -> Vec<Address> {
        self.owners
            .owners()
            .iter()
            .filter(|owner| pool.contains(owner))
            .copied()
            .collect()
    }

    /// Pick exactly `threshold` owners when the operator requested none.
    ///
    /// Owners the local pool can sign for come first so this machine can make
    /// progress immediately; the remainder is filled from the other owners
    /// in owner order and signed elsewhere.
    pub fn auto_select(&self, pool: &[Address]) -> AuthKeySelection {
        let threshold = self.owners.threshold();
        let local = self.signable(pool);

        let chosen: BTreeSet<_> = local
            .iter()
            .chain(self.owners.owners().iter().filter(|o| !local.contains(o)))
            .take(threshold)
            .copied()
            .collect();

        AuthKeySelection {
            signers: self
                .owners
                .owners()
                .iter()
                .filter(|owner| chosen.contains(*owner))
                .copied()
                .collect(),
            threshold,
        }
    }
}
