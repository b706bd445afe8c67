//! Fixtures and in-memory collaborators for tests.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::Mutex;

use crate::asset::{Asset, DEFAULT_GENESIS_HASH};
use crate::balance::{BalanceSnapshot, OutPointValue};
use crate::keys::{AddressVersion, KeyPair, KeyPairMap};
use crate::swap::{
    BalanceProvider, KeyManagement, PendingSwap, RelayStore, SettlementClient, SettlementResponse,
    SettlementStatus,
};
use crate::tx::{EncryptedTransaction, OutPoint, Transaction};

/// Addresses of [`fixture_keypairs`], in snapshot order.
pub const FIXTURE_ADDRESSES: [&str; 3] = [
    "cf0067d6c42463b2c1e4236e9669df546c74b16c0e2ef37114549b2944e05b7c",
    "f226b92e6868e178f722e9cf71ad2a0c16d864c5d8fcadc70153bbd021f11ea0",
    "9b28bf45e5e5285a8eb10003046f5ed48571903ea767915acf0fe77e257b43fa",
];

const FIXTURE_SECRETS: [&str; 3] = [
    "787072763976443650373355356b444a7164326d344b64525335466f6654456e5e6d463ec66d7999769fa4de56f690dfb62e685b97032f5926b0cb6c93ba83c6",
    "787072763976443650373355356b444a7346385875626f4e5667526a4472366358272ba93c1e79df280d4c417de47dbf6a7e330ba52793d7baa8e00ae5c34e59",
    "787072763976443650373355356b444a7545555a35434479585a535038417558efa9dcba0f3282b3ed4a6aa1ccdb169d6685a30d7b2af7a2171a5682f3112359",
];

pub const FIXTURE_ITEM_METADATA: &str = "{'test': 'test'}";

pub fn fixture_keypairs() -> KeyPairMap {
    FIXTURE_SECRETS
        .iter()
        .map(|secret| {
            let bytes = hex::decode(secret).expect("fixture secret is hex");
            KeyPair::from_secret_bytes(&bytes, AddressVersion::Default)
                .expect("fixture secret is a valid keypair")
        })
        .collect()
}

/// Token 10 and Item 3 on the first address, Token 50 on the second,
/// Token 1000 on the third.
pub fn fixture_snapshot() -> BalanceSnapshot {
    let output = |tx_hash: &str, index: u32, value: Asset| OutPointValue {
        out_point: OutPoint::new(tx_hash, index),
        value,
    };
    BalanceSnapshot::from_entries([
        (
            FIXTURE_ADDRESSES[0],
            vec![
                output("000000", 0, Asset::token(10)),
                output(
                    "000000",
                    1,
                    Asset::item(
                        3,
                        DEFAULT_GENESIS_HASH,
                        Some(FIXTURE_ITEM_METADATA.to_string()),
                    ),
                ),
            ],
        ),
        (
            FIXTURE_ADDRESSES[1],
            vec![output("000001", 0, Asset::token(50))],
        ),
        (
            FIXTURE_ADDRESSES[2],
            vec![output("000002", 0, Asset::token(1000))],
        ),
    ])
}

// ── Balance ─────────────────────────────────────────────────────────────

/// Serves a fixed snapshot, restricted to the requested addresses.
#[derive(Debug, Clone)]
pub struct StaticBalance {
    snapshot: BalanceSnapshot,
}

impl StaticBalance {
    pub fn new(snapshot: BalanceSnapshot) -> Self {
        Self { snapshot }
    }
}

#[async_trait]
impl BalanceProvider for StaticBalance {
    async fn fetch_balance(&self, addresses: &[String]) -> Result<BalanceSnapshot, String> {
        let entries = self
            .snapshot
            .address_list
            .iter()
            .filter(|(address, _)| addresses.iter().any(|a| a == *address))
            .map(|(address, outputs)| (address.to_string(), outputs.to_vec()))
            .collect::<Vec<_>>();
        Ok(BalanceSnapshot::from_entries(entries))
    }
}

// ── Relay ───────────────────────────────────────────────────────────────

/// Relay shared between clones, like a remote service would be.
#[derive(Debug, Clone, Default)]
pub struct InMemoryRelay {
    entries: Arc<Mutex<HashMap<String, BTreeMap<String, serde_json::Value>>>>,
}

impl InMemoryRelay {
    /// Store an arbitrary value, bypassing [`PendingSwap`] serialization.
    pub async fn insert_raw(&self, address: &str, field: &str, value: serde_json::Value) {
        self.entries
            .lock()
            .await
            .entry(address.to_string())
            .or_default()
            .insert(field.to_string(), value);
    }

    pub async fn entry(&self, address: &str, field: &str) -> Option<serde_json::Value> {
        self.entries
            .lock()
            .await
            .get(address)
            .and_then(|fields| fields.get(field).cloned())
    }

    pub async fn len(&self, address: &str) -> usize {
        self.entries
            .lock()
            .await
            .get(address)
            .map_or(0, BTreeMap::len)
    }
}

#[async_trait]
impl RelayStore for InMemoryRelay {
    async fn set(
        &self,
        address: &str,
        entry_id: &str,
        entry: &PendingSwap,
        _signer: &KeyPair,
    ) -> Result<(), String> {
        let value = serde_json::to_value(entry).map_err(|e| e.to_string())?;
        self.insert_raw(address, entry_id, value).await;
        Ok(())
    }

    async fn get(
        &self,
        address: &str,
        _signer: &KeyPair,
    ) -> Result<Vec<(String, serde_json::Value)>, String> {
        Ok(self
            .entries
            .lock()
            .await
            .get(address)
            .map(|fields| fields.clone().into_iter().collect())
            .unwrap_or_default())
    }

    async fn delete(
        &self,
        address: &str,
        entry_id: &str,
        _signer: &KeyPair,
    ) -> Result<(), String> {
        if let Some(fields) = self.entries.lock().await.get_mut(address) {
            fields.remove(entry_id);
        }
        Ok(())
    }
}

// ── Settlement ──────────────────────────────────────────────────────────

/// Records every submission and answers with a fixed status.
#[derive(Debug, Clone)]
pub struct RecordingSettlement {
    status: SettlementStatus,
    submissions: Arc<Mutex<Vec<(String, Vec<Transaction>)>>>,
}

impl Default for RecordingSettlement {
    fn default() -> Self {
        Self::answering(SettlementStatus::Success)
    }
}

impl RecordingSettlement {
    pub fn answering(status: SettlementStatus) -> Self {
        Self {
            status,
            submissions: Arc::default(),
        }
    }

    pub async fn submissions(&self) -> Vec<(String, Vec<Transaction>)> {
        self.submissions.lock().await.clone()
    }
}

#[async_trait]
impl SettlementClient for RecordingSettlement {
    async fn submit(
        &self,
        host: &str,
        transactions: &[Transaction],
    ) -> Result<SettlementResponse, String> {
        self.submissions
            .lock()
            .await
            .push((host.to_string(), transactions.to_vec()));
        let reason = match self.status {
            SettlementStatus::Success => "Transaction(s) processing",
            SettlementStatus::InProgress => "Transaction(s) pending",
            SettlementStatus::Error | SettlementStatus::Unknown => "Invalid transaction",
        };
        Ok(SettlementResponse {
            status: self.status,
            reason: reason.to_string(),
        })
    }
}

// ── Keys ────────────────────────────────────────────────────────────────

/// Unencrypted "vault": `save` holds the retained half as plain JSON.
#[derive(Debug, Clone, Copy, Default)]
pub struct PlainVault;

impl KeyManagement for PlainVault {
    fn encrypt_transaction(
        &self,
        druid: &str,
        transaction: &Transaction,
    ) -> Result<EncryptedTransaction, String> {
        Ok(EncryptedTransaction {
            druid: druid.to_string(),
            nonce: String::new(),
            save: serde_json::to_string(transaction).map_err(|e| e.to_string())?,
        })
    }

    fn decrypt_transaction(&self, encrypted: &EncryptedTransaction) -> Result<Transaction, String> {
        serde_json::from_str(&encrypted.save).map_err(|e| e.to_string())
    }
}
