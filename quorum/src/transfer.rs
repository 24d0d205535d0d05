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

//! Three-leg cross-ledger transfer, resumable at an explicit step.
//!
//! No single atomic transaction moves value from the source ledger to the
//! destination. Funds leave the source (leg 0), leave the intermediate
//! ledger (leg 1) and are imported at the destination (leg 2). Each leg is
//! confirmed by its own ledger, which is the only durability anchor: the
//! journey is never persisted between legs and a crashed transfer is resumed
//! by the operator naming the next leg to run.
//!
//! A leg whose outcome is unknown is never retried automatically. The
//! operator confirms on the ledger first, then resumes at the right step.

use async_trait::async_trait;
use quorum_signer::Address;
use serde::{Deserialize, Serialize};
use std::{fmt, str::FromStr};
use thiserror::Error;

/// One remote transaction of the journey, in execution order.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Leg {
    ExportFromSource,
    ExportFromIntermediate,
    ImportIntoDestination,
}

impl Leg {
    pub const ALL: [Leg; 3] = [
        Leg::ExportFromSource,
        Leg::ExportFromIntermediate,
        Leg::ImportIntoDestination,
    ];

    pub fn step(self) -> RecoveryStep {
        RecoveryStep(self as u8)
    }

    pub fn index(self) -> u8 {
        self as u8
    }
}

impl fmt::Display for Leg {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::ExportFromSource => "export from source",
            Self::ExportFromIntermediate => "export from intermediate",
            Self::ImportIntoDestination => "import into destination",
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid recovery step '{0}', expected 0, 1 or 2")]
pub struct InvalidStep(pub String);

/// Validated index of the next leg to execute.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub struct RecoveryStep(u8);

impl RecoveryStep {
    pub fn leg(self) -> Leg {
        Leg::ALL[self.0 as usize]
    }

    pub fn get(self) -> u8 {
        self.0
    }
}

impl TryFrom<u8> for RecoveryStep {
    type Error = InvalidStep;

    fn try_from(step: u8) -> Result<Self, Self::Error> {
        if (step as usize) < Leg::ALL.len() {
            Ok(Self(step))
        } else {
            Err(InvalidStep(step.to_string()))
        }
    }
}

impl From<RecoveryStep> for u8 {
    fn from(step: RecoveryStep) -> Self {
        step.0
    }
}

impl FromStr for RecoveryStep {
    type Err = InvalidStep;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.trim()
            .parse::<u8>()
            .map_err(|_| InvalidStep(s.to_string()))
            .and_then(Self::try_from)
    }
}

impl fmt::Display for RecoveryStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Everything needed to derive each leg's parameters.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransferPlan {
    pub source: String,
    pub intermediate: String,
    pub destination: String,
    pub amount: u128,
    pub recipient: Address,
}

impl TransferPlan {
    pub fn leg_params(&self, leg: Leg) -> LegParams {
        let (from, to) = match leg {
            Leg::ExportFromSource => (&self.source, &self.intermediate),
            Leg::ExportFromIntermediate | Leg::ImportIntoDestination => {
                (&self.intermediate, &self.destination)
            }
        };

        LegParams {
            leg,
            from: from.clone(),
            to: to.clone(),
            amount: self.amount,
            recipient: self.recipient,
        }
    }
}

/// Inputs of a single leg.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct LegParams {
    pub leg: Leg,
    pub from: String,
    pub to: String,
    pub amount: u128,
    pub recipient: Address,
}

/// Ledger confirmation of a completed leg.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct LegReceipt {
    pub leg: Leg,
    pub tx_id: String,
}

/// How a leg executor failed.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LegError {
    /// The ledger definitely did not apply the leg.
    #[error("rejected: {0}")]
    Rejected(String),
    /// The leg may or may not have been applied.
    #[error("outcome unknown: {0}")]
    Indeterminate(String),
}

/// Issues one leg against its ledger and waits for the verdict.
#[async_trait]
pub trait LegExecutor: Send + Sync {
    /// `previous` is the receipt of the leg before this one when it ran in the
    /// same journey, and `None` after a resume.
    async fn execute(
        &self,
        params: &LegParams,
        previous: Option<&LegReceipt>,
    ) -> Result<LegReceipt, LegError>;
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransferError {
    #[error(transparent)]
    InvalidStep(#[from] InvalidStep),
    #[error("leg {requested} cannot run yet, leg {expected} is next")]
    OutOfOrderLeg { requested: u8, expected: u8 },
    #[error("leg {requested} already completed, leg {expected} is next")]
    LegAlreadyCompleted { requested: u8, expected: u8 },
    #[error("all legs already completed")]
    Completed,
    #[error("parameters are for leg {params}, not leg {step}")]
    ParamsMismatch { step: u8, params: u8 },
    #[error("leg {step} failed: {reason}; retry with recovery step {step}")]
    LegFailed { step: u8, reason: String },
    #[error(
        "leg {step} outcome unknown: {reason}; confirm on the ledger, then resume with \
         recovery step {step} if it was not applied or {} if it was", .step + 1
    )]
    LegIndeterminate { step: u8, reason: String },
}

impl TransferError {
    /// Step the operator should pass back in, when there is one to suggest.
    pub fn resume_step(&self) -> Option<u8> {
        match self {
            Self::LegFailed { step, .. } | Self::LegIndeterminate { step, .. } => Some(*step),
            Self::OutOfOrderLeg { expected, .. } | Self::LegAlreadyCompleted { expected, .. } => {
                Some(*expected)
            }
            _ => None,
        }
    }
}

/// Progress through the three legs.
///
/// The step only moves forward, one leg at a time, on confirmed success.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransferJourney {
    next: u8,
    /// Legs confirmed since the journey was created or resumed, in order.
    #[serde(default)]
    completed: Vec<LegReceipt>,
}

impl TransferJourney {
    pub fn new() -> Self {
        Self::default()
    }

    /// Resume at `step`, on the operator's word that every earlier leg is
    /// confirmed on its ledger.
    pub fn resume(step: RecoveryStep) -> Self {
        Self {
            next: step.get(),
            completed: Vec::new(),
        }
    }

    /// The next step to run, or `None` once all legs are done.
    pub fn next_step(&self) -> Option<RecoveryStep> {
        RecoveryStep::try_from(self.next).ok()
    }

    pub fn next_leg(&self) -> Option<Leg> {
        self.next_step().map(RecoveryStep::leg)
    }

    pub fn is_complete(&self) -> bool {
        self.next as usize >= Leg::ALL.len()
    }

    /// At least one leg moved funds and the journey has not finished.
    pub fn in_flight(&self) -> bool {
        self.next > 0 && !self.is_complete()
    }

    pub fn last_receipt(&self) -> Option<&LegReceipt> {
        self.completed.last()
    }

    /// Receipts of every leg confirmed by this journey, oldest first.
    ///
    /// Legs confirmed before a resume are not known here.
    pub fn completed(&self) -> &[LegReceipt] {
        &self.completed
    }

    fn advance(&mut self, receipt: LegReceipt) {
        self.next += 1;
        self.completed.push(receipt);
    }

    /// Manual cleanup guidance for giving up at this point.
    pub fn abandon(mut self) -> AbandonReport {
        AbandonReport {
            next: self.next,
            last_receipt: self.completed.pop(),
        }
    }
}

/// Where the funds sit when a journey is given up.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AbandonReport {
    next: u8,
    last_receipt: Option<LegReceipt>,
}

impl AbandonReport {
    /// Whether funds left the source ledger and need manual attention.
    pub fn needs_cleanup(&self) -> bool {
        self.next > 0 && (self.next as usize) < Leg::ALL.len()
    }
}

impl fmt::Display for AbandonReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.next {
            0 => f.write_str("no leg was executed; no funds moved")?,
            1 => f.write_str(
                "funds left the source and are held on the intermediate ledger; \
                 resume with recovery step 1 to move them on",
            )?,
            2 => f.write_str(
                "funds were exported from the intermediate ledger and await import; \
                 resume with recovery step 2 to import them into the destination",
            )?,
            _ => f.write_str("all legs completed; nothing to clean up")?,
        }

        if let Some(receipt) = &self.last_receipt {
            write!(f, " (last confirmed {}: {})", receipt.leg, receipt.tx_id)?;
        }
        Ok(())
    }
}

/// Drives a [`TransferJourney`] through a [`LegExecutor`].
pub struct TransferWorkflow<E> {
    executor: E,
    journey: TransferJourney,
}

impl<E: LegExecutor> TransferWorkflow<E> {
    pub fn new(executor: E) -> Self {
        Self::with_journey(executor, TransferJourney::new())
    }

    pub fn resume(executor: E, step: RecoveryStep) -> Self {
        Self::with_journey(executor, TransferJourney::resume(step))
    }

    pub fn with_journey(executor: E, journey: TransferJourney) -> Self {
        Self { executor, journey }
    }

    pub fn journey(&self) -> &TransferJourney {
        &self.journey
    }

    pub fn executor(&self) -> &E {
        &self.executor
    }

    /// Execute exactly leg `step`.
    ///
    /// Only the journey's next leg may run. On success the journey advances
    /// by one and the receipt becomes the next leg's context. On failure the
    /// journey is left untouched and the error names the step to retry.
    pub async fn execute_leg(
        &mut self,
        step: u8,
        params: &LegParams,
    ) -> Result<LegReceipt, TransferError> {
        let step = RecoveryStep::try_from(step)?;
        let Some(expected) = self.journey.next_step() else {
            return Err(TransferError::Completed);
        };

        if step > expected {
            return Err(TransferError::OutOfOrderLeg {
                requested: step.get(),
                expected: expected.get(),
            });
        }
        if step < expected {
            return Err(TransferError::LegAlreadyCompleted {
                requested: step.get(),
                expected: expected.get(),
            });
        }
        if params.leg != step.leg() {
            return Err(TransferError::ParamsMismatch {
                step: step.get(),
                params: params.leg.index(),
            });
        }

        let receipt = self
            .executor
            .execute(params, self.journey.last_receipt())
            .await
            .map_err(|err| match err {
                LegError::Rejected(reason) => TransferError::LegFailed {
                    step: step.get(),
                    reason,
                },
                LegError::Indeterminate(reason) => TransferError::LegIndeterminate {
                    step: step.get(),
                    reason,
                },
            })?;

        self.journey.advance(receipt.clone());
        Ok(receipt)
    }

    /// Run every remaining leg of `plan` in order, stopping at the first
    /// failure.
    pub async fn run_remaining(
        &mut self,
        plan: &TransferPlan,
    ) -> Result<Vec<LegReceipt>, TransferError> {
        let mut receipts = Vec::new();
        while let Some(leg) = self.journey.next_leg() {
            receipts.push(self.execute_leg(leg.index(), &plan.leg_params(leg)).await?);
        }
        Ok(receipts)
    }

    pub fn abandon(self) -> AbandonReport {
        self.journey.abandon()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    /// Records every call and fails legs listed in `fail`.
    #[derive(Default)]
    struct ScriptedLedger {
        calls: Mutex<Vec<(Leg, Option<LegReceipt>)>>,
        fail: Vec<(Leg, LegError)>,
    }

    #[async_trait]
    impl LegExecutor for ScriptedLedger {
        async fn execute(
            &self,
            params: &LegParams,
            previous: Option<&LegReceipt>,
        ) -> Result<LegReceipt, LegError> {
            self.calls
                .lock()
                .unwrap()
                .push((params.leg, previous.cloned()));

            if let Some((_, err)) = self.fail.iter().find(|(leg, _)| *leg == params.leg) {
                return Err(err.clone());
            }

            Ok(LegReceipt {
                leg: params.leg,
                tx_id: format!("tx-{}", params.leg.index()),
            })
        }
    }

    fn plan() -> TransferPlan {
        TransferPlan {
            source: "X".into(),
            intermediate: "P".into(),
            destination: "C".into(),
            amount: 1_000_000_000,
            recipient: Address([7; 20]),
        }
    }

    fn params(step: u8) -> LegParams {
        plan().leg_params(Leg::ALL[step as usize])
    }

    #[tokio::test]
    async fn resume_after_restart() {
        let mut workflow = TransferWorkflow::new(ScriptedLedger::default());
        workflow.execute_leg(0, &params(0)).await.unwrap();
        assert!(workflow.journey().in_flight());

        let step = workflow.journey().next_step().unwrap();
        let mut resumed = TransferWorkflow::resume(ScriptedLedger::default(), step);
        resumed.execute_leg(1, &params(1)).await.unwrap();
        assert_eq!(resumed.journey().next_leg(), Some(Leg::ImportIntoDestination));

        let mut fresh = TransferWorkflow::new(ScriptedLedger::default());
        assert_eq!(
            fresh.execute_leg(2, &params(2)).await,
            Err(TransferError::OutOfOrderLeg {
                requested: 2,
                expected: 0
            })
        );
        assert!(fresh.executor().calls.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn receipts_chain_between_legs() {
        let mut workflow = TransferWorkflow::new(ScriptedLedger::default());
        let receipts = workflow.run_remaining(&plan()).await.unwrap();

        assert_eq!(receipts.len(), 3);
        assert!(workflow.journey().is_complete());
        assert!(!workflow.journey().in_flight());

        let calls = workflow.executor().calls.lock().unwrap();
        assert_eq!(calls[0].1, None);
        assert_eq!(calls[1].1.as_ref(), Some(&receipts[0]));
        assert_eq!(calls[2].1.as_ref(), Some(&receipts[1]));
    }

    #[tokio::test]
    async fn failure_names_step_and_does_not_advance() {
        let ledger = ScriptedLedger {
            fail: vec![(
                Leg::ExportFromIntermediate,
                LegError::Rejected("insufficient funds".into()),
            )],
            ..Default::default()
        };
        let mut workflow = TransferWorkflow::new(ledger);

        let err = workflow.run_remaining(&plan()).await.unwrap_err();

        assert_eq!(err.resume_step(), Some(1));
        assert!(err.to_string().contains("retry with recovery step 1"));
        assert_eq!(workflow.journey().next_step(), Some(Leg::ExportFromIntermediate.step()));
        assert_eq!(workflow.executor().calls.lock().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn failed_late_leg_keeps_earlier_receipts() {
        let ledger = ScriptedLedger {
            fail: vec![(
                Leg::ImportIntoDestination,
                LegError::Rejected("atomic input already consumed".into()),
            )],
            ..Default::default()
        };
        let mut workflow = TransferWorkflow::new(ledger);

        let err = workflow.run_remaining(&plan()).await.unwrap_err();
        assert_eq!(err.resume_step(), Some(2));

        let tx_ids: Vec<_> = workflow
            .journey()
            .completed()
            .iter()
            .map(|receipt| (receipt.leg, receipt.tx_id.as_str()))
            .collect();
        assert_eq!(
            tx_ids,
            vec![
                (Leg::ExportFromSource, "tx-0"),
                (Leg::ExportFromIntermediate, "tx-1")
            ]
        );
        assert!(workflow.abandon().to_string().contains("tx-1"));
    }

    #[tokio::test]
    async fn indeterminate_is_not_a_plain_failure() {
        let ledger = ScriptedLedger {
            fail: vec![(
                Leg::ExportFromSource,
                LegError::Indeterminate("status polling timed out".into()),
            )],
            ..Default::default()
        };
        let mut workflow = TransferWorkflow::new(ledger);

        let err = workflow.execute_leg(0, &params(0)).await.unwrap_err();

        assert!(matches!(err, TransferError::LegIndeterminate { step: 0, .. }));
        assert!(err.to_string().contains("confirm on the ledger"));
        assert!(!workflow.journey().in_flight());
    }

    #[tokio::test]
    async fn completed_legs_are_not_rerun() {
        let mut workflow =
            TransferWorkflow::resume(ScriptedLedger::default(), RecoveryStep::try_from(2).unwrap());

        assert_eq!(
            workflow.execute_leg(1, &params(1)).await,
            Err(TransferError::LegAlreadyCompleted {
                requested: 1,
                expected: 2
            })
        );
        workflow.execute_leg(2, &params(2)).await.unwrap();
        assert_eq!(
            workflow.execute_leg(2, &params(2)).await,
            Err(TransferError::Completed)
        );
    }

    #[tokio::test]
    async fn params_must_match_step() {
        let mut workflow = TransferWorkflow::new(ScriptedLedger::default());
        assert_eq!(
            workflow.execute_leg(0, &params(1)).await,
            Err(TransferError::ParamsMismatch { step: 0, params: 1 })
        );
    }

    #[tokio::test]
    async fn out_of_range_step_rejected() {
        let mut workflow = TransferWorkflow::new(ScriptedLedger::default());
        assert_eq!(
            workflow.execute_leg(3, &params(0)).await,
            Err(TransferError::InvalidStep(InvalidStep("3".into())))
        );
    }

    #[test]
    fn recovery_step_parsing() {
        assert_eq!("1".parse::<RecoveryStep>().unwrap().leg(), Leg::ExportFromIntermediate);
        assert!("3".parse::<RecoveryStep>().is_err());
        assert!("-1".parse::<RecoveryStep>().is_err());
        assert!(serde_json::from_str::<RecoveryStep>("5").is_err());
    }

    #[test]
    fn abandon_guidance_depends_on_progress() {
        let report = TransferJourney::new().abandon();
        assert!(!report.needs_cleanup());
        assert!(report.to_string().contains("no funds moved"));

        let report = TransferJourney::resume(Leg::ImportIntoDestination.step()).abandon();
        assert!(report.needs_cleanup());
        assert!(report.to_string().contains("await import"));
    }
}
