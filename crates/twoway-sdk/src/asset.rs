use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Maximum size of `Item` metadata, in bytes.
pub const METADATA_MAX_BYTES: usize = 800;

/// Genesis hash used for generic (untracked) `Item` assets.
pub const DEFAULT_GENESIS_HASH: &str = "default_genesis_hash";

/// `Item` balance tied to the transaction that first created it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemAsset {
    pub amount: u64,
    pub genesis_hash: String,
    pub metadata: Option<String>,
}

/// A ledger value. Serializes as `{"Token":10}` or
/// `{"Item":{"amount":1,"genesis_hash":"..","metadata":null}}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Asset {
    Token(u64),
    Item(ItemAsset),
}

impl Asset {
    pub fn token(amount: u64) -> Self {
        Asset::Token(amount)
    }

    pub fn item(amount: u64, genesis_hash: impl Into<String>, metadata: Option<String>) -> Self {
        Asset::Item(ItemAsset {
            amount,
            genesis_hash: genesis_hash.into(),
            metadata,
        })
    }

    pub fn amount(&self) -> u64 {
        match self {
            Asset::Token(amount) => *amount,
            Asset::Item(item) => item.amount,
        }
    }

    /// The genesis hash for `Item` assets, `None` for tokens.
    pub fn genesis_hash(&self) -> Option<&str> {
        match self {
            Asset::Token(_) => None,
            Asset::Item(item) => Some(&item.genesis_hash),
        }
    }

    /// A zero amount of the same asset class, keeping the identity fields.
    pub fn zero_like(&self) -> Self {
        self.with_amount(0)
    }

    fn with_amount(&self, amount: u64) -> Self {
        match self {
            Asset::Token(_) => Asset::Token(amount),
            Asset::Item(item) => Asset::Item(ItemAsset {
                amount,
                genesis_hash: item.genesis_hash.clone(),
                metadata: item.metadata.clone(),
            }),
        }
    }

    /// Two assets are compatible when they share a variant and, for items,
    /// a genesis hash. Metadata never affects compatibility.
    pub fn is_compatible(&self, other: &Asset) -> bool {
        match (self, other) {
            (Asset::Token(_), Asset::Token(_)) => true,
            (Asset::Item(a), Asset::Item(b)) => a.genesis_hash == b.genesis_hash,
            _ => false,
        }
    }

    fn ensure_compatible(&self, other: &Asset) -> Result<()> {
        if self.is_compatible(other) {
            Ok(())
        } else {
            Err(Error::IncompatibleAssets)
        }
    }

    /// `self + rhs`; item metadata is taken from `self`.
    pub fn add(&self, rhs: &Asset) -> Result<Asset> {
        self.ensure_compatible(rhs)?;
        let amount = self
            .amount()
            .checked_add(rhs.amount())
            .ok_or(Error::AssetOverflow)?;
        Ok(self.with_amount(amount))
    }

    /// `self - rhs`; item metadata is taken from `self`.
    pub fn sub(&self, rhs: &Asset) -> Result<Asset> {
        self.ensure_compatible(rhs)?;
        let amount = self
            .amount()
            .checked_sub(rhs.amount())
            .ok_or(Error::NegativeResult)?;
        Ok(self.with_amount(amount))
    }

    pub fn lt(&self, rhs: &Asset) -> Result<bool> {
        self.ensure_compatible(rhs)?;
        Ok(self.amount() < rhs.amount())
    }

    pub fn gt(&self, rhs: &Asset) -> Result<bool> {
        self.ensure_compatible(rhs)?;
        Ok(self.amount() > rhs.amount())
    }

    pub fn gte(&self, rhs: &Asset) -> Result<bool> {
        self.ensure_compatible(rhs)?;
        Ok(self.amount() >= rhs.amount())
    }

    /// Structural checks applied before an asset is used in a payment.
    pub fn validate(&self) -> Result<()> {
        if let Asset::Item(item) = self {
            if item.genesis_hash.is_empty() {
                return Err(Error::InvalidInputs("item genesis_hash is empty".into()));
            }
            if let Some(metadata) = &item.metadata {
                validate_metadata(metadata)?;
            }
        }
        Ok(())
    }
}

pub fn validate_metadata(metadata: &str) -> Result<()> {
    if metadata.len() > METADATA_MAX_BYTES {
        return Err(Error::InvalidInputs(format!(
            "metadata exceeds {METADATA_MAX_BYTES} bytes"
        )));
    }
    Ok(())
}
