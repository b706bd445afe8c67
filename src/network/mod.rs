//! HTTP clients for mempool/storage nodes and the relay.

pub mod node;
pub mod relay;

use std::collections::HashMap;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use twoway_sdk::SettlementStatus;

use crate::error::{Result, WalletError};

pub use node::NodeClient;
pub use relay::RelayClient;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApiRoute {
    DebugData,
    FetchBalance,
    CreateTransactions,
    CreateItemAsset,
    BlockchainEntry,
    RelaySet,
    RelayGet,
    RelayDel,
}

impl ApiRoute {
    pub fn path(self) -> &'static str {
        match self {
            ApiRoute::DebugData => "/debug_data",
            ApiRoute::FetchBalance => "/fetch_balance",
            ApiRoute::CreateTransactions => "/create_transactions",
            ApiRoute::CreateItemAsset => "/create_item_asset",
            ApiRoute::BlockchainEntry => "/blockchain_entry",
            ApiRoute::RelaySet => "/set_data",
            ApiRoute::RelayGet => "/get_data",
            ApiRoute::RelayDel => "/del_data",
        }
    }

    /// Key of this route in a node's `routes_pow` table.
    pub fn pow_key(self) -> &'static str {
        self.path().trim_start_matches('/')
    }
}

/// Envelope every node endpoint answers with.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NetworkResponse {
    #[serde(default)]
    pub id: Option<String>,
    pub status: SettlementStatus,
    #[serde(default)]
    pub reason: Option<String>,
    #[serde(default)]
    pub route: Option<String>,
    #[serde(default)]
    pub content: Option<serde_json::Value>,
}

impl NetworkResponse {
    pub fn reason(&self) -> &str {
        self.reason.as_deref().unwrap_or_default()
    }

    pub fn is_failure(&self) -> bool {
        matches!(
            self.status,
            SettlementStatus::Error | SettlementStatus::Unknown
        )
    }

    fn failure(&self, reason: &str) -> WalletError {
        WalletError::Network {
            status: format!("{:?}", self.status),
            reason: reason.to_string(),
        }
    }

    pub fn ensure_ok(&self) -> Result<()> {
        if self.is_failure() {
            return Err(self.failure(self.reason()));
        }
        Ok(())
    }

    /// Typed content of a successful response.
    pub fn content_as<T: DeserializeOwned>(&self) -> Result<T> {
        self.ensure_ok()?;
        let content = self
            .content
            .clone()
            .ok_or_else(|| self.failure("no content returned"))?;
        Ok(serde_json::from_value(content)?)
    }
}

/// `/debug_data` content.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DebugData {
    #[serde(default)]
    pub node_type: String,
    #[serde(default)]
    pub node_api: Vec<String>,
    #[serde(default)]
    pub node_peers: Vec<String>,
    #[serde(default)]
    pub routes_pow: HashMap<String, usize>,
}
