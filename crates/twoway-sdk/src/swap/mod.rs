//! DRUID-bound two-party swaps.
//!
//! Each party builds and signs its own half. Halves are exchanged through an
//! untrusted relay as [`PendingSwap`] entries and matched by the ledger on
//! their shared DRUID.

pub mod coordinator;
pub mod druid;
pub mod traits;

use serde::{Deserialize, Serialize};

use crate::balance::BalanceSnapshot;
use crate::error::{Result, SwapError};
use crate::keys::KeyPairMap;
use crate::tx::{
    DruidExpectation, DruidValues, TxPayload, build_transaction, finalize_signatures,
    select_inputs,
};

pub use coordinator::{FinalizeReport, Proposal, Response, SwapConfig, SwapCoordinator};
pub use druid::generate_druid;
pub use traits::{
    BalanceProvider, KeyManagement, RelayStore, SettlementClient, SettlementResponse,
    SettlementStatus,
};

/// Number of parties bound by one DRUID.
pub const SWAP_PARTICIPANTS: u8 = 2;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SwapStatus {
    Pending,
    Accepted,
    Rejected,
}

impl std::fmt::Display for SwapStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            SwapStatus::Pending => "pending",
            SwapStatus::Accepted => "accepted",
            SwapStatus::Rejected => "rejected",
        })
    }
}

/// The counterparty's answer to a proposal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    Accept,
    Reject,
}

/// Relay entry describing a swap in flight.
///
/// `sender_expectation` is what the initiator receives, `receiver_expectation`
/// what the counterparty receives.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PendingSwap {
    pub druid: String,
    pub sender_expectation: DruidExpectation,
    pub receiver_expectation: DruidExpectation,
    pub status: SwapStatus,
    #[serde(rename = "mempoolHost")]
    pub settlement_host: String,
}

impl PendingSwap {
    /// Move out of `pending`. Only one transition is ever allowed.
    pub fn resolve(&mut self, decision: Decision) -> std::result::Result<(), SwapError> {
        if self.status != SwapStatus::Pending {
            return Err(SwapError::AlreadyResolved {
                druid: self.druid.clone(),
                status: self.status,
            });
        }
        self.status = match decision {
            Decision::Accept => SwapStatus::Accepted,
            Decision::Reject => SwapStatus::Rejected,
        };
        Ok(())
    }

    pub fn is_terminal(&self) -> bool {
        self.status != SwapStatus::Pending
    }
}

/// Build one signed half of a swap.
///
/// The half pays `receiver_expectation.asset` to `receiver_expectation.to`
/// and commits, through its DRUID values, to `sender_expectation`: what the
/// builder expects back from the other half.
pub fn build_swap_half(
    snapshot: &BalanceSnapshot,
    druid: &str,
    sender_expectation: DruidExpectation,
    receiver_expectation: &DruidExpectation,
    excess_address: &str,
    keypairs: &KeyPairMap,
) -> Result<TxPayload> {
    let selection = select_inputs(&receiver_expectation.asset, snapshot, keypairs)?;

    let druid_info = DruidValues {
        druid: druid.to_string(),
        participants: SWAP_PARTICIPANTS,
        expectations: vec![sender_expectation],
    };

    let mut payload = build_transaction(
        &receiver_expectation.to,
        &receiver_expectation.asset,
        excess_address,
        Some(druid_info),
        selection,
        0,
    )?;
    payload.transaction = finalize_signatures(payload.transaction, snapshot, keypairs)?;
    Ok(payload)
}
