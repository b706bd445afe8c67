use serde::{Deserialize, Serialize};

use crate::error::{Result, WalletError};

pub const DEFAULT_MEMPOOL_HOST: &str = "http://127.0.0.1:3003";

/// Hosts and passphrase a [`Wallet`](crate::Wallet) session is opened with.
#[derive(Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClientConfig {
    pub mempool_host: String,
    #[serde(default)]
    pub storage_host: Option<String>,
    #[serde(default)]
    pub relay_host: Option<String>,
    pub passphrase: String,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            mempool_host: DEFAULT_MEMPOOL_HOST.to_string(),
            storage_host: None,
            relay_host: None,
            passphrase: String::new(),
        }
    }
}

impl std::fmt::Debug for ClientConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClientConfig")
            .field("mempool_host", &self.mempool_host)
            .field("storage_host", &self.storage_host)
            .field("relay_host", &self.relay_host)
            .finish_non_exhaustive()
    }
}

impl ClientConfig {
    /// Check every host and return a copy with trailing slashes trimmed.
    pub fn validated(&self) -> Result<Self> {
        if self.passphrase.is_empty() {
            return Err(WalletError::InvalidConfig("passphrase is empty".into()));
        }
        Ok(Self {
            mempool_host: normalize_host(&self.mempool_host)?,
            storage_host: self.storage_host.as_deref().map(normalize_host).transpose()?,
            relay_host: self.relay_host.as_deref().map(normalize_host).transpose()?,
            passphrase: self.passphrase.clone(),
        })
    }
}

fn normalize_host(host: &str) -> Result<String> {
    let trimmed = host.trim().trim_end_matches('/');
    let rest = trimmed
        .strip_prefix("http://")
        .or_else(|| trimmed.strip_prefix("https://"))
        .ok_or_else(|| WalletError::InvalidConfig(format!("not an http(s) URL: {host}")))?;
    if rest.is_empty() || rest.contains(char::is_whitespace) {
        return Err(WalletError::InvalidConfig(format!("missing host in {host}")));
    }
    Ok(trimmed.to_string())
}
