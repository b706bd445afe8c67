//! Transaction data model and the payment pipeline:
//! [`select_inputs`] → [`build_transaction`] → [`finalize_signatures`].

pub mod build;
pub mod select;
pub mod sign;

use serde::{Deserialize, Serialize};

use crate::asset::Asset;

pub use build::{TxPayload, build_transaction, create_payment_tx};
pub use select::{InputSelection, select_inputs};
pub use sign::finalize_signatures;

/// Protocol version stamped on every transaction.
pub const NETWORK_VERSION: u32 = 2;

/// Reference to an output created by an earlier transaction.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct OutPoint {
    #[serde(rename = "t_hash")]
    pub tx_hash: String,
    #[serde(rename = "n")]
    pub index: u32,
}

impl OutPoint {
    pub fn new(tx_hash: impl Into<String>, index: u32) -> Self {
        Self {
            tx_hash: tx_hash.into(),
            index,
        }
    }
}

impl std::fmt::Display for OutPoint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}-{}", self.index, self.tx_hash)
    }
}

/// Pay-to-public-key-hash unlocking data.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Pay2PkH {
    pub signable_data: String,
    pub signature: String,
    pub public_key: String,
    pub address_version: Option<u64>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ScriptSig {
    Pay2PkH(Pay2PkH),
}

impl ScriptSig {
    pub fn pay2pkh(&self) -> &Pay2PkH {
        match self {
            ScriptSig::Pay2PkH(p) => p,
        }
    }

    fn pay2pkh_mut(&mut self) -> &mut Pay2PkH {
        match self {
            ScriptSig::Pay2PkH(p) => p,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TxIn {
    pub previous_out: Option<OutPoint>,
    pub script_signature: Option<ScriptSig>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TxOut {
    pub value: Asset,
    pub locktime: u64,
    pub script_public_key: String,
}

/// What one party of a swap expects to receive, and from which inputs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DruidExpectation {
    pub from: String,
    pub to: String,
    pub asset: Asset,
}

/// Binds a transaction half to its counterpart.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DruidValues {
    pub druid: String,
    pub participants: u8,
    pub expectations: Vec<DruidExpectation>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transaction {
    pub inputs: Vec<TxIn>,
    pub outputs: Vec<TxOut>,
    pub version: u32,
    pub druid_info: Option<DruidValues>,
}

/// A retained transaction half, encrypted at rest.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EncryptedTransaction {
    pub druid: String,
    pub nonce: String,
    pub save: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn outpoint_wire_names() {
        let op = OutPoint::new("000000", 1);
        assert_eq!(serde_json::to_string(&op).unwrap(), r#"{"t_hash":"000000","n":1}"#);
        assert_eq!(op.to_string(), "1-000000");
    }

    #[test]
    fn txout_field_order() {
        let out = TxOut {
            value: Asset::token(5),
            locktime: 0,
            script_public_key: "ab".into(),
        };
        assert_eq!(
            serde_json::to_string(&out).unwrap(),
            r#"{"value":{"Token":5},"locktime":0,"script_public_key":"ab"}"#
        );
    }
}
