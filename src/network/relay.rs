use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use twoway_sdk::{KeyPair, PendingSwap, RelayStore};

use super::ApiRoute;

/// Body of `/set_data`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RelaySetBody<T> {
    pub key: String,
    pub field: String,
    pub public_key: String,
    pub signature: String,
    pub value: T,
}

/// Body of `/get_data`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RelayGetBody {
    pub key: String,
    pub public_key: String,
    pub signature: String,
}

/// Body of `/del_data`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RelayDelBody {
    pub key: String,
    pub field: String,
    pub public_key: String,
    pub signature: String,
}

/// One stored field as returned by `/get_data`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RelayRecord {
    #[serde(default)]
    pub timestamp: Option<u64>,
    pub value: serde_json::Value,
}

/// Public key and signature over the hex-decoded `key`, proving the caller
/// owns the address it reads or writes under.
pub fn authenticate(key: &str, signer: &KeyPair) -> Result<(String, String), String> {
    let key_bytes = hex::decode(key).map_err(|e| format!("relay key is not hex: {e}"))?;
    Ok((signer.public_key_hex(), signer.sign(&key_bytes)))
}

#[derive(Debug, Clone)]
pub struct RelayClient {
    host: String,
    http: reqwest::Client,
}

impl RelayClient {
    pub fn new(http: reqwest::Client, host: &str) -> Self {
        Self {
            host: host.trim_end_matches('/').to_string(),
            http,
        }
    }

    pub fn host(&self) -> &str {
        &self.host
    }

    fn url(&self, route: ApiRoute) -> String {
        format!("{}{}", self.host, route.path())
    }
}

#[async_trait]
impl RelayStore for RelayClient {
    async fn set(
        &self,
        address: &str,
        entry_id: &str,
        entry: &PendingSwap,
        signer: &KeyPair,
    ) -> Result<(), String> {
        let (public_key, signature) = authenticate(address, signer)?;
        let body = RelaySetBody {
            key: address.to_string(),
            field: entry_id.to_string(),
            public_key,
            signature,
            value: entry,
        };
        self.http
            .post(self.url(ApiRoute::RelaySet))
            .json(&body)
            .send()
            .await
            .and_then(|r| r.error_for_status())
            .map_err(|e| format!("relay set failed: {e}"))?;
        Ok(())
    }

    async fn get(
        &self,
        address: &str,
        signer: &KeyPair,
    ) -> Result<Vec<(String, serde_json::Value)>, String> {
        let (public_key, signature) = authenticate(address, signer)?;
        let body = RelayGetBody {
            key: address.to_string(),
            public_key,
            signature,
        };
        let records = self
            .http
            .post(self.url(ApiRoute::RelayGet))
            .json(&body)
            .send()
            .await
            .and_then(|r| r.error_for_status())
            .map_err(|e| format!("relay get failed: {e}"))?
            .json::<serde_json::Map<String, serde_json::Value>>()
            .await
            .map_err(|e| format!("relay get returned malformed data: {e}"))?;

        // Records that don't match the envelope are handed on as-is and
        // rejected later as garbage.
        Ok(records
            .into_iter()
            .map(|(field, raw)| {
                let value = match serde_json::from_value::<RelayRecord>(raw.clone()) {
                    Ok(record) => record.value,
                    Err(_) => raw,
                };
                (field, value)
            })
            .collect())
    }

    async fn delete(&self, address: &str, entry_id: &str, signer: &KeyPair) -> Result<(), String> {
        let (public_key, signature) = authenticate(address, signer)?;
        let body = RelayDelBody {
            key: address.to_string(),
            field: entry_id.to_string(),
            public_key,
            signature,
        };
        self.http
            .delete(self.url(ApiRoute::RelayDel))
            .json(&body)
            .send()
            .await
            .and_then(|r| r.error_for_status())
            .map_err(|e| format!("relay delete failed: {e}"))?;
        Ok(())
    }
}
