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

//! Properties that must hold for arbitrary owner sets and host orderings.

use proptest::prelude::*;
use quorum::{
    Signer,
    auth::{OwnerSet, ThresholdAuthorizer},
    cluster::{Host, HostId, HostResults, HostSet},
    multisig::{self, PendingTransaction, TxPayload},
};
use quorum_signer::{PrivateKey, StoredSigner};
use std::collections::BTreeSet;

fn pool(n: usize) -> Vec<StoredSigner> {
    (0..n)
        .map(|i| StoredSigner::new(format!("k{i}"), PrivateKey::random()))
        .collect()
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(32))]

    #[test]
    fn signing_only_shrinks_remaining(
        owners in 1usize..5,
        passes in proptest::collection::vec(proptest::collection::vec(0usize..5, 0..4), 1..5),
    ) {
        let keys = pool(owners);
        let addresses: Vec<_> = keys.iter().map(Signer::address).collect();
        let auth = ThresholdAuthorizer::new(OwnerSet::new(addresses.clone(), owners).unwrap());
        let selection = auth.validate(&addresses).unwrap();
        let mut tx = PendingTransaction::new(TxPayload::new(b"payload".to_vec()), &selection);

        for pass in passes {
            let local: Vec<_> = pass.iter().filter(|i| **i < owners).map(|i| keys[*i].clone()).collect();
            let before_remaining: BTreeSet<_> = tx.remaining_signers().into_iter().collect();
            let before_signed = tx.signed_signers();

            if tx.sign(&local).is_ok() {
                let after_remaining: BTreeSet<_> = tx.remaining_signers().into_iter().collect();
                prop_assert!(after_remaining.is_subset(&before_remaining));
                for address in &before_signed {
                    prop_assert!(tx.signature(address).is_some());
                }
            } else {
                prop_assert_eq!(tx.signed_signers(), before_signed);
            }
        }
    }

    #[test]
    fn persisted_state_round_trips(owners in 1usize..5, signed in 0usize..5) {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tx.json");

        let keys = pool(owners);
        let addresses: Vec<_> = keys.iter().map(Signer::address).collect();
        let auth = ThresholdAuthorizer::new(OwnerSet::new(addresses, 1).unwrap());
        let mut tx = PendingTransaction::new(TxPayload::new(vec![0xab; 64]), &auth.auto_select(&[]));
        let _ = tx.sign(&keys[..signed.min(owners)]);

        multisig::persist(&tx, &path).unwrap();
        let loaded = multisig::load(&path).unwrap();

        prop_assert_eq!(loaded.required_signers(), tx.required_signers());
        prop_assert_eq!(loaded.signed_signers(), tx.signed_signers());
    }

    #[test]
    fn error_hosts_independent_of_order(
        failing in proptest::collection::btree_set(0usize..8, 0..8),
        order in Just((0usize..8).collect::<Vec<_>>()).prop_shuffle(),
    ) {
        let runtime = tokio::runtime::Builder::new_current_thread().build().unwrap();
        let host = |i: usize| Host::new(format!("h{i}"), format!("http://h{i}"));

        let sorted = HostSet::new((0..8).map(host).collect()).unwrap();
        let shuffled = HostSet::new(order.iter().copied().map(host).collect()).unwrap();

        let op = |host: Host| {
            let fails = failing.iter().any(|i| host.id.as_str() == format!("h{i}"));
            async move { if fails { Err("down") } else { Ok(()) } }
        };

        let a = runtime.block_on(HostResults::run(&sorted, op));
        let b = runtime.block_on(HostResults::run(&shuffled, op));

        let keys = |r: &HostResults<(), &str>| -> Vec<HostId> {
            r.errors_by_host().into_keys().cloned().collect()
        };
        prop_assert_eq!(keys(&a), keys(&b));
        prop_assert_eq!(a.failure_report(), b.failure_report());
        prop_assert_eq!(keys(&a).len(), failing.len());
    }
}
