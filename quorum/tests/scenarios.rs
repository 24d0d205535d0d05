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

//! End-to-end flows across the authorization, signing, aggregation and
//! transfer components.

use async_trait::async_trait;
use quorum::{
    Address, Signer,
    auth::{AuthError, OwnerSet, ThresholdAuthorizer},
    cluster::{Host, HostId, HostResults, HostSet},
    multisig::{
        self, MultisigError, MultisigWorkflow, PendingTransaction, SignedTransaction,
        SubmitReceipt, Submitter, TxPayload, TxState,
    },
    transfer::{
        Leg, LegError, LegExecutor, LegParams, LegReceipt, RecoveryStep, TransferError,
        TransferPlan, TransferWorkflow,
    },
};
use quorum_signer::{PrivateKey, StoredSigner};
use std::convert::Infallible;

fn signer(name: &str) -> StoredSigner {
    StoredSigner::new(name, PrivateKey::random())
}

fn owners(signers: &[&StoredSigner], threshold: usize) -> ThresholdAuthorizer {
    let addresses = signers.iter().map(|s| s.address()).collect();
    ThresholdAuthorizer::new(OwnerSet::new(addresses, threshold).unwrap())
}

#[test]
fn two_of_three_selection() {
    let (a, b, c) = (signer("a"), signer("b"), signer("c"));
    let auth = owners(&[&a, &b, &c], 2);

    let selection = auth.validate(&[a.address(), c.address()]).unwrap();

    assert_eq!(selection.signers(), &[a.address(), c.address()]);
}

#[test]
fn three_of_three_rejects_two() {
    let (a, b, c) = (signer("a"), signer("b"), signer("c"));
    let auth = owners(&[&a, &b, &c], 3);

    assert_eq!(
        auth.validate(&[a.address(), c.address()]),
        Err(AuthError::InsufficientSigners {
            provided: 2,
            threshold: 3
        })
    );
}

struct AcceptAll;

#[async_trait]
impl Submitter for AcceptAll {
    type Error = Infallible;

    async fn submit(&self, tx: &SignedTransaction) -> Result<SubmitReceipt, Infallible> {
        Ok(SubmitReceipt {
            tx_id: tx.payload.id.to_string(),
        })
    }
}

#[tokio::test]
async fn signing_split_across_two_machines() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("add-validator.json");

    let (a, b) = (signer("a"), signer("b"));
    let auth = owners(&[&a, &b], 2);
    let selection = auth.validate(&[a.address(), b.address()]).unwrap();
    let workflow = MultisigWorkflow::new(AcceptAll);

    // Machine holding only A.
    let mut tx = PendingTransaction::new(TxPayload::new(vec![1, 2, 3]), &selection);
    tx.sign(std::slice::from_ref(&a)).unwrap();
    assert_eq!(tx.remaining_signers(), vec![b.address()]);
    assert!(matches!(
        workflow.submit(&mut tx).await,
        Err(MultisigError::NotFullySigned { .. })
    ));
    multisig::persist(&tx, &path).unwrap();

    // Machine holding only B picks up the file.
    let mut tx = multisig::load(&path).unwrap();
    assert_eq!(tx.signed_signers(), vec![a.address()]);
    tx.sign(std::slice::from_ref(&b)).unwrap();
    assert_eq!(tx.state(), TxState::FullySigned);

    let receipt = workflow.submit(&mut tx).await.unwrap();
    multisig::persist(&tx, &path).unwrap();

    let reloaded = multisig::load(&path).unwrap();
    assert_eq!(reloaded.state(), TxState::Submitted);
    assert_eq!(receipt.tx_id, reloaded.id().to_string());
}

#[tokio::test]
async fn two_of_five_hosts_fail() {
    let hosts = HostSet::new(
        (1..=5)
            .map(|i| Host::new(format!("i-{i:04}"), format!("http://10.0.1.{i}:9650")))
            .collect(),
    )
    .unwrap();

    let results = HostResults::run(&hosts, |host| async move {
        match host.id.as_str() {
            "i-0002" | "i-0004" => Err(format!("{} unreachable", host.endpoint)),
            id => Ok(id.ends_with('1')),
        }
    })
    .await;

    assert!(results.has_errors());
    assert_eq!(results.errors_by_host().len(), 2);
    assert_eq!(results.filter(|bootstrapped| *bootstrapped), vec![HostId::from("i-0001")]);
    assert_eq!(
        results.filter(|bootstrapped| !*bootstrapped),
        vec![HostId::from("i-0003"), HostId::from("i-0005")]
    );
}

#[derive(Default)]
struct Ledger;

#[async_trait]
impl LegExecutor for Ledger {
    async fn execute(
        &self,
        params: &LegParams,
        _: Option<&LegReceipt>,
    ) -> Result<LegReceipt, LegError> {
        Ok(LegReceipt {
            leg: params.leg,
            tx_id: format!("{}->{}", params.from, params.to),
        })
    }
}

#[tokio::test]
async fn transfer_resumes_at_explicit_step() {
    let plan = TransferPlan {
        source: "X".into(),
        intermediate: "P".into(),
        destination: "C".into(),
        amount: 5,
        recipient: Address([9; 20]),
    };

    let mut first = TransferWorkflow::new(Ledger);
    first
        .execute_leg(0, &plan.leg_params(Leg::ExportFromSource))
        .await
        .unwrap();
    drop(first);

    let mut resumed = TransferWorkflow::resume(Ledger, "1".parse::<RecoveryStep>().unwrap());
    resumed
        .execute_leg(1, &plan.leg_params(Leg::ExportFromIntermediate))
        .await
        .unwrap();

    let mut fresh = TransferWorkflow::new(Ledger);
    assert!(matches!(
        fresh
            .execute_leg(2, &plan.leg_params(Leg::ImportIntoDestination))
            .await,
        Err(TransferError::OutOfOrderLeg {
            requested: 2,
            expected: 0
        })
    ));
}
