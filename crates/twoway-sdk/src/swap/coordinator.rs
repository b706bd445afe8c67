use serde::Serialize;

use crate::asset::Asset;
use crate::error::{Error, SwapError};
use crate::keys::{KeyPair, KeyPairMap};
use crate::script::aggregate_inputs_address;
use crate::tx::{DruidExpectation, EncryptedTransaction, Transaction};
use crate::validation::validate_address;

use super::traits::{
    BalanceProvider, KeyManagement, RelayStore, SettlementClient, SettlementResponse,
    SettlementStatus,
};
use super::{Decision, PendingSwap, SwapStatus, build_swap_half};

type SwapResult<T> = std::result::Result<T, SwapError>;

pub const DEFAULT_SETTLEMENT_HOST: &str = "http://127.0.0.1:3003";

#[derive(Debug, Clone)]
pub struct SwapConfig {
    /// Stamped into every proposal and used for the initiator's submission.
    pub settlement_host: String,
}

impl Default for SwapConfig {
    fn default() -> Self {
        Self {
            settlement_host: DEFAULT_SETTLEMENT_HOST.to_string(),
        }
    }
}

/// Result of [`SwapCoordinator::propose_swap`].
#[derive(Debug, Clone)]
pub struct Proposal {
    pub druid: String,
    /// The initiator's own signed half, to be retained until finalization.
    pub encrypted_half: EncryptedTransaction,
    pub relay_entry: PendingSwap,
}

/// Result of [`SwapCoordinator::respond_to_swap`].
#[derive(Debug, Clone)]
pub struct Response {
    pub entry: PendingSwap,
    /// The responder's half, present only when the swap was accepted.
    pub submitted: Option<Transaction>,
}

/// Result of one [`SwapCoordinator::finalize_swap`] pass.
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FinalizeReport {
    /// DRUIDs whose initiator half was submitted.
    pub submitted: Vec<String>,
    /// DRUIDs rejected by the counterparty and cleaned up.
    pub discarded: Vec<String>,
    /// Entries still awaiting this wallet's answer.
    pub pending: Vec<PendingSwap>,
    pub garbage: usize,
}

impl std::fmt::Display for FinalizeReport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "submitted={}, discarded={}, pending={}, garbage={}",
            self.submitted.len(),
            self.discarded.len(),
            self.pending.len(),
            self.garbage
        )
    }
}

/// Drives the initiator and counterparty sides of a DRUID swap.
///
/// Transaction construction is synchronous; the coordinator only awaits at
/// the balance, relay and settlement boundaries.
pub struct SwapCoordinator<B, R, S, K> {
    config: SwapConfig,
    balance: B,
    relay: R,
    settlement: S,
    keys: K,
}

impl<B, R, S, K> SwapCoordinator<B, R, S, K>
where
    B: BalanceProvider,
    R: RelayStore,
    S: SettlementClient,
    K: KeyManagement,
{
    pub fn new(config: SwapConfig, balance: B, relay: R, settlement: S, keys: K) -> Self {
        Self {
            config,
            balance,
            relay,
            settlement,
            keys,
        }
    }

    pub fn config(&self) -> &SwapConfig {
        &self.config
    }

    pub fn relay(&self) -> &R {
        &self.relay
    }

    /// Start a swap: build and retain our half, then publish the proposal
    /// under the counterparty's address.
    pub async fn propose_swap(
        &self,
        counterparty_address: &str,
        send_asset: &Asset,
        receive_asset: &Asset,
        keypairs: &KeyPairMap,
        self_address: &str,
    ) -> SwapResult<Proposal> {
        validate_address(counterparty_address)?;
        validate_address(self_address)?;
        send_asset.validate()?;
        receive_asset.validate()?;
        let signer = signer_for(keypairs, self_address)?;

        let snapshot = self
            .balance
            .fetch_balance(&keypairs.addresses())
            .await
            .map_err(SwapError::Balance)?;
        let druid = self.keys.new_druid().map_err(SwapError::Vault)?;

        let sender_expectation = DruidExpectation {
            from: String::new(),
            to: self_address.to_string(),
            asset: receive_asset.clone(),
        };
        let mut receiver_expectation = DruidExpectation {
            from: String::new(),
            to: counterparty_address.to_string(),
            asset: send_asset.clone(),
        };

        let half = build_swap_half(
            &snapshot,
            &druid,
            sender_expectation.clone(),
            &receiver_expectation,
            self_address,
            keypairs,
        )?;
        receiver_expectation.from = aggregate_inputs_address(&half.transaction.inputs)?;

        let encrypted_half = self
            .keys
            .encrypt_transaction(&druid, &half.transaction)
            .map_err(SwapError::Vault)?;

        let relay_entry = PendingSwap {
            druid: druid.clone(),
            sender_expectation,
            receiver_expectation,
            status: SwapStatus::Pending,
            settlement_host: self.config.settlement_host.clone(),
        };
        self.relay
            .set(counterparty_address, &druid, &relay_entry, signer)
            .await
            .map_err(SwapError::Relay)?;

        log::info!("proposed swap {druid} to {counterparty_address}");
        Ok(Proposal {
            druid,
            encrypted_half,
            relay_entry,
        })
    }

    /// Answer a proposal addressed to one of `keypairs`.
    ///
    /// Accepting builds and submits our half before the answer is published
    /// back under the initiator's address.
    pub async fn respond_to_swap(
        &self,
        druid: &str,
        pending: &PendingSwap,
        decision: Decision,
        keypairs: &KeyPairMap,
    ) -> SwapResult<Response> {
        if pending.druid != druid {
            return Err(Error::InvalidDruidProvided.into());
        }

        let mut entry = pending.clone();
        entry.resolve(decision)?;
        let signer = signer_for(keypairs, &entry.receiver_expectation.to)?;

        let submitted = match decision {
            Decision::Reject => None,
            Decision::Accept => {
                let snapshot = self
                    .balance
                    .fetch_balance(&keypairs.addresses())
                    .await
                    .map_err(SwapError::Balance)?;

                // Our half pays what the initiator expects and commits to
                // what we expect back.
                let half = build_swap_half(
                    &snapshot,
                    druid,
                    entry.receiver_expectation.clone(),
                    &entry.sender_expectation,
                    signer.address(),
                    keypairs,
                )?;
                entry.sender_expectation.from =
                    aggregate_inputs_address(&half.transaction.inputs)?;

                let transactions = [half.transaction];
                let response = self
                    .settlement
                    .submit(&entry.settlement_host, &transactions)
                    .await
                    .map_err(SwapError::Settlement)?;
                check_settlement(response)?;
                let [transaction] = transactions;
                Some(transaction)
            }
        };

        self.relay
            .set(&entry.sender_expectation.to, druid, &entry, signer)
            .await
            .map_err(SwapError::Relay)?;

        log::info!("swap {druid} {}", entry.status);
        Ok(Response { entry, submitted })
    }

    /// Poll the relay under `self_address` and settle resolved swaps.
    ///
    /// Accepted entries have their retained half patched with the
    /// counterparty's disclosed expectation and submitted in one batch;
    /// rejected entries are dropped. Both are then deleted from the relay.
    /// Entries that fail to parse are skipped.
    pub async fn finalize_swap(
        &self,
        self_address: &str,
        keypairs: &KeyPairMap,
        retained: &[EncryptedTransaction],
    ) -> SwapResult<FinalizeReport> {
        let signer = signer_for(keypairs, self_address)?;
        let raw = self
            .relay
            .get(self_address, signer)
            .await
            .map_err(SwapError::Relay)?;

        let mut report = FinalizeReport::default();
        let mut accepted = Vec::new();

        for (field, value) in raw {
            let entry = match serde_json::from_value::<PendingSwap>(value) {
                Ok(entry) if !entry.druid.is_empty() => entry,
                Ok(_) => {
                    log::warn!("skipping relay entry {field}: empty druid");
                    report.garbage += 1;
                    continue;
                }
                Err(e) => {
                    log::warn!("skipping unparseable relay entry {field}: {e}");
                    report.garbage += 1;
                    continue;
                }
            };

            match entry.status {
                SwapStatus::Pending => report.pending.push(entry),
                SwapStatus::Rejected => report.discarded.push(entry.druid),
                SwapStatus::Accepted => {
                    let transaction = self.patch_retained(&entry, retained)?;
                    accepted.push((entry.druid, transaction));
                }
            }
        }

        if !accepted.is_empty() {
            let transactions: Vec<Transaction> =
                accepted.iter().map(|(_, tx)| tx.clone()).collect();
            let response = self
                .settlement
                .submit(&self.config.settlement_host, &transactions)
                .await
                .map_err(SwapError::Settlement)?;
            check_settlement(response)?;
            report.submitted = accepted.into_iter().map(|(druid, _)| druid).collect();
        }

        for druid in report.submitted.iter().chain(&report.discarded) {
            self.relay
                .delete(self_address, druid, signer)
                .await
                .map_err(SwapError::Relay)?;
            log::info!("finalized swap {druid}");
        }

        log::debug!("finalize pass for {self_address}: {report}");
        Ok(report)
    }

    fn patch_retained(
        &self,
        entry: &PendingSwap,
        retained: &[EncryptedTransaction],
    ) -> SwapResult<Transaction> {
        let encrypted = retained
            .iter()
            .find(|half| half.druid == entry.druid)
            .ok_or(Error::InvalidDruidProvided)?;
        let mut transaction = self
            .keys
            .decrypt_transaction(encrypted)
            .map_err(SwapError::Vault)?;

        let druid_info = transaction
            .druid_info
            .as_mut()
            .ok_or(Error::NoDruidValues)?;
        match druid_info.expectations.first_mut() {
            Some(expectation) => *expectation = entry.sender_expectation.clone(),
            None => druid_info
                .expectations
                .push(entry.sender_expectation.clone()),
        }
        Ok(transaction)
    }
}

fn signer_for<'a>(keypairs: &'a KeyPairMap, address: &str) -> SwapResult<&'a KeyPair> {
    keypairs
        .get(address)
        .ok_or_else(|| SwapError::Sdk(Error::UnableToGetKeypair))
}

fn check_settlement(response: SettlementResponse) -> SwapResult<()> {
    match response.status {
        SettlementStatus::Success | SettlementStatus::InProgress => Ok(()),
        SettlementStatus::Error | SettlementStatus::Unknown => {
            Err(SwapError::Settlement(response.reason))
        }
    }
}
