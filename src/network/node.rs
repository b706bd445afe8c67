use std::collections::HashMap;

use async_trait::async_trait;
use serde::Serialize;

use twoway_sdk::{
    BalanceProvider, BalanceSnapshot, ItemCreationPayload, SettlementClient, SettlementResponse,
    Transaction,
};

use crate::error::Result;
use crate::pow::{self, CACHE_ID_HEADER, NONCE_HEADER};

use super::{ApiRoute, DebugData, NetworkResponse};

/// Client for one mempool or storage node, with the node's proof-of-work
/// table fetched at connect time.
#[derive(Debug, Clone)]
pub struct NodeClient {
    host: String,
    http: reqwest::Client,
    routes_pow: HashMap<String, usize>,
}

impl NodeClient {
    /// Fetch `/debug_data` from `host` and record its route difficulties.
    pub async fn connect(http: reqwest::Client, host: &str) -> Result<Self> {
        let host = host.trim_end_matches('/').to_string();
        let url = format!("{host}{}", ApiRoute::DebugData.path());
        let response: NetworkResponse = http.get(&url).send().await?.json().await?;

        response.ensure_ok()?;
        let routes_pow = response
            .content
            .map(serde_json::from_value::<DebugData>)
            .transpose()?
            .unwrap_or_default()
            .routes_pow;

        log::info!("connected to {host}, {} PoW route(s)", routes_pow.len());
        Ok(Self {
            host,
            http,
            routes_pow,
        })
    }

    pub fn host(&self) -> &str {
        &self.host
    }

    pub fn difficulty(&self, route: ApiRoute) -> usize {
        self.routes_pow.get(route.pow_key()).copied().unwrap_or(0)
    }

    async fn post<B: Serialize + ?Sized>(
        &self,
        route: ApiRoute,
        body: &B,
    ) -> Result<NetworkResponse> {
        let headers = pow::headers_for(self.difficulty(route)).await?;
        let response = self
            .http
            .post(format!("{}{}", self.host, route.path()))
            .header(CACHE_ID_HEADER, headers.cache_id)
            .header(NONCE_HEADER, headers.nonce.to_string())
            .json(body)
            .send()
            .await?
            .json::<NetworkResponse>()
            .await?;
        log::debug!("{} -> {:?}: {}", route.path(), response.status, response.reason());
        Ok(response)
    }

    pub async fn balance(&self, addresses: &[String]) -> Result<NetworkResponse> {
        self.post(ApiRoute::FetchBalance, addresses).await
    }

    pub async fn create_transactions(&self, transactions: &[Transaction]) -> Result<NetworkResponse> {
        self.post(ApiRoute::CreateTransactions, transactions).await
    }

    pub async fn create_item_asset(&self, payload: &ItemCreationPayload) -> Result<NetworkResponse> {
        self.post(ApiRoute::CreateItemAsset, payload).await
    }

    pub async fn blockchain_entry(&self, hashes: &[String]) -> Result<NetworkResponse> {
        self.post(ApiRoute::BlockchainEntry, hashes).await
    }
}

#[async_trait]
impl BalanceProvider for NodeClient {
    async fn fetch_balance(&self, addresses: &[String]) -> std::result::Result<BalanceSnapshot, String> {
        self.balance(addresses)
            .await
            .and_then(|response| response.content_as())
            .map_err(|e| e.to_string())
    }
}

#[async_trait]
impl SettlementClient for NodeClient {
    async fn submit(
        &self,
        host: &str,
        transactions: &[Transaction],
    ) -> std::result::Result<SettlementResponse, String> {
        let result = if host.trim_end_matches('/') == self.host {
            self.create_transactions(transactions).await
        } else {
            // A foreign host has its own PoW table.
            match NodeClient::connect(self.http.clone(), host).await {
                Ok(node) => node.create_transactions(transactions).await,
                Err(e) => Err(e),
            }
        };
        let response = result.map_err(|e| e.to_string())?;

        Ok(SettlementResponse {
            status: response.status,
            reason: response.reason().to_string(),
        })
    }
}
