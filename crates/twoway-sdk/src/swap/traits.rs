use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::balance::BalanceSnapshot;
use crate::keys::KeyPair;
use crate::tx::{EncryptedTransaction, Transaction};

use super::PendingSwap;
use super::druid::generate_druid;

/// Source of balance snapshots.
#[async_trait]
pub trait BalanceProvider: Send + Sync {
    /// Snapshot covering `addresses`, with outputs in the provider's order.
    async fn fetch_balance(&self, addresses: &[String]) -> Result<BalanceSnapshot, String>;
}

/// Untrusted key-value service swap proposals travel through.
///
/// Entries live under the address of the party meant to read them and are
/// keyed by DRUID. Requests are authenticated with `signer`.
#[async_trait]
pub trait RelayStore: Send + Sync {
    async fn set(
        &self,
        address: &str,
        entry_id: &str,
        entry: &PendingSwap,
        signer: &KeyPair,
    ) -> Result<(), String>;

    /// Raw entries under `address`. Values are unvalidated.
    async fn get(
        &self,
        address: &str,
        signer: &KeyPair,
    ) -> Result<Vec<(String, serde_json::Value)>, String>;

    async fn delete(&self, address: &str, entry_id: &str, signer: &KeyPair)
    -> Result<(), String>;
}

/// Status reported by the settlement network.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SettlementStatus {
    Success,
    Error,
    InProgress,
    #[serde(other)]
    Unknown,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SettlementResponse {
    pub status: SettlementStatus,
    pub reason: String,
}

/// The network that validates and settles transactions.
#[async_trait]
pub trait SettlementClient: Send + Sync {
    async fn submit(
        &self,
        host: &str,
        transactions: &[Transaction],
    ) -> Result<SettlementResponse, String>;
}

/// DRUID issue and at-rest protection of retained halves.
pub trait KeyManagement: Send + Sync {
    fn new_druid(&self) -> Result<String, String> {
        Ok(generate_druid())
    }

    fn encrypt_transaction(
        &self,
        druid: &str,
        transaction: &Transaction,
    ) -> Result<EncryptedTransaction, String>;

    fn decrypt_transaction(&self, encrypted: &EncryptedTransaction) -> Result<Transaction, String>;
}
