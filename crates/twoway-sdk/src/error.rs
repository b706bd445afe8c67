use thiserror::Error;

use crate::swap::SwapStatus;

#[derive(Debug, Error)]
pub enum Error {
    #[error("Some inputs are invalid: {0}")]
    InvalidInputs(String),

    #[error("Insufficient funds")]
    InsufficientFunds,

    #[error("No inputs for transaction")]
    NoInputs,

    #[error("Unable to get key-pair")]
    UnableToGetKeypair,

    #[error("No key-pairs provided")]
    NoKeypairsProvided,

    #[error("Assets are incompatible")]
    IncompatibleAssets,

    #[error("asset subtraction would produce a negative amount")]
    NegativeResult,

    #[error("asset amount overflow")]
    AssetOverflow,

    #[error("Unable to determine address version")]
    InvalidAddressVersion,

    #[error("invalid key material: {0}")]
    InvalidKey(String),

    #[error("DRUID values are null")]
    NoDruidValues,

    #[error("Invalid DRUID value provided")]
    InvalidDruidProvided,

    #[error("serialization error: {0}")]
    Serialization(String),
}

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Error::Serialization(e.to_string())
    }
}

pub type Result<T> = std::result::Result<T, Error>;

/// Errors produced by [`SwapCoordinator`](crate::swap::SwapCoordinator) operations.
#[derive(Debug)]
pub enum SwapError {
    /// A pure transaction-construction step failed.
    Sdk(Error),
    /// The balance collaborator could not produce a snapshot.
    Balance(String),
    /// The relay store rejected or failed a request.
    Relay(String),
    /// The settlement network refused the submitted transaction(s).
    Settlement(String),
    /// Encrypting or decrypting a retained half failed.
    Vault(String),
    /// The entry already left `pending`; it can transition only once.
    AlreadyResolved { druid: String, status: SwapStatus },
}

impl std::fmt::Display for SwapError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SwapError::Sdk(e) => write!(f, "{e}"),
            SwapError::Balance(e) => write!(f, "balance error: {e}"),
            SwapError::Relay(e) => write!(f, "relay error: {e}"),
            SwapError::Settlement(e) => write!(f, "settlement error: {e}"),
            SwapError::Vault(e) => write!(f, "vault error: {e}"),
            SwapError::AlreadyResolved { druid, status } => {
                write!(f, "swap {druid} already resolved as {status}")
            }
        }
    }
}

impl std::error::Error for SwapError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            SwapError::Sdk(e) => Some(e),
            _ => None,
        }
    }
}

impl From<Error> for SwapError {
    fn from(e: Error) -> Self {
        SwapError::Sdk(e)
    }
}
