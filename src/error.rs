use thiserror::Error;

use twoway_sdk::SwapError;

#[derive(Error, Debug)]
pub enum WalletError {
    #[error("Client not initialized")]
    NotInitialized,

    #[error("Storage host not configured")]
    StorageNotInitialized,

    #[error("Relay host not configured")]
    RelayNotInitialized,

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Crypto error: {0}")]
    Crypto(String),

    #[error("Wrong passphrase")]
    WrongPassphrase,

    #[error("Network returned {status}: {reason}")]
    Network { status: String, reason: String },

    #[error("{0}")]
    Sdk(#[from] twoway_sdk::Error),

    #[error("{0}")]
    Swap(#[from] SwapError),

    #[error("Invalid config: {0}")]
    InvalidConfig(String),
}

pub type Result<T> = std::result::Result<T, WalletError>;
