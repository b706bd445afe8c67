use std::collections::{BTreeMap, HashMap};

use serde::{Deserialize, Serialize};

use twoway_sdk::{
    Asset, BalanceSnapshot, EncryptedKeypair, EncryptedTransaction, FinalizeReport, KeyPair,
    SettlementStatus,
};

use crate::error::{Result, WalletError};
use crate::network::NetworkResponse;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ClientStatus {
    Success,
    Error,
    Pending,
    Unknown,
}

impl From<SettlementStatus> for ClientStatus {
    fn from(status: SettlementStatus) -> Self {
        match status {
            SettlementStatus::Success => ClientStatus::Success,
            SettlementStatus::Error => ClientStatus::Error,
            SettlementStatus::InProgress => ClientStatus::Pending,
            SettlementStatus::Unknown => ClientStatus::Unknown,
        }
    }
}

/// Uniform answer of every [`Wallet`](super::Wallet) operation.
#[derive(Debug, Clone, Serialize)]
pub struct ClientResponse {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub status: ClientStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content: Option<ClientContent>,
}

impl ClientResponse {
    pub fn success(reason: &str, content: Option<ClientContent>) -> Self {
        Self {
            id: None,
            status: ClientStatus::Success,
            reason: Some(reason.to_string()),
            content,
        }
    }

    /// Carry a node's status and reason through, attaching `content`.
    pub fn from_network(response: &NetworkResponse, content: Option<ClientContent>) -> Self {
        Self {
            id: response.id.clone(),
            status: response.status.into(),
            reason: response.reason.clone(),
            content,
        }
    }

    pub fn is_success(&self) -> bool {
        self.status == ClientStatus::Success
    }
}

impl From<WalletError> for ClientResponse {
    fn from(e: WalletError) -> Self {
        Self {
            id: None,
            status: ClientStatus::Error,
            reason: Some(e.to_string()),
            content: None,
        }
    }
}

/// Operation-specific payload, keyed by operation on the wire.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum ClientContent {
    FetchBalanceResponse(BalanceSnapshot),
    FetchTransactionsResponse(serde_json::Value),
    CreateItemResponse(serde_json::Value),
    MakePaymentResponse(MakePaymentResponse),
    Make2WayPaymentResponse(Make2WayPaymentResponse),
    FetchPending2WayResponse(FinalizeReport),
    NewDruidResponse(String),
    NewKeypairResponse(EncryptedKeypair),
    DecryptKeypairResponse(KeypairView),
    SignMessageResponse(BTreeMap<String, String>),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MakePaymentResponse {
    pub transaction_hash: String,
    pub payment_address: String,
    pub asset: Asset,
    pub metadata: Option<String>,
    pub used_addresses: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
enum CreatedOutput {
    Described {
        asset: Asset,
        #[serde(default)]
        metadata: Option<String>,
    },
    Bare(Asset),
}

impl MakePaymentResponse {
    /// Flatten `/create_transactions` content, `{hash: [address, output]}`,
    /// where `output` is either an asset or `{asset, metadata}`.
    pub fn from_network(content: serde_json::Value, used_addresses: Vec<String>) -> Result<Self> {
        let created: HashMap<String, (String, CreatedOutput)> = serde_json::from_value(content)?;
        let (transaction_hash, (payment_address, output)) =
            created.into_iter().next().ok_or_else(|| WalletError::Network {
                status: "Success".into(),
                reason: "no transaction hash returned".into(),
            })?;
        let (asset, metadata) = match output {
            CreatedOutput::Described { asset, metadata } => (asset, metadata),
            CreatedOutput::Bare(asset) => (asset, None),
        };
        Ok(Self {
            transaction_hash,
            payment_address,
            asset,
            metadata,
            used_addresses,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Make2WayPaymentResponse {
    pub druid: String,
    /// The initiator's half; keep it until the swap is finalized.
    pub encrypted_tx: EncryptedTransaction,
}

/// Public part of a decrypted keypair.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct KeypairView {
    pub address: String,
    pub public_key: String,
    pub version: Option<u64>,
}

impl From<&KeyPair> for KeypairView {
    fn from(keypair: &KeyPair) -> Self {
        Self {
            address: keypair.address().to_string(),
            public_key: keypair.public_key_hex(),
            version: keypair.version().to_wire(),
        }
    }
}
