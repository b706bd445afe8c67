//! Pay-to-public-key-hash scripts and the digests inputs are signed over.

use sha3::{Digest, Sha3_256};

use crate::asset::Asset;
use crate::error::{Error, Result};
use crate::keys::{AddressVersion, construct_address};
use crate::tx::{OutPoint, TxIn, TxOut};

/// Lower-case hex SHA3-256 of `data`.
pub fn sha3_hex(data: &[u8]) -> String {
    let mut hasher = Sha3_256::new();
    hasher.update(data);
    hex::encode(hasher.finalize())
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OpCode {
    Dup,
    Hash256,
    Hash256Temp,
    EqualVerify,
    CheckSig,
}

impl OpCode {
    pub fn name(self) -> &'static str {
        match self {
            OpCode::Dup => "OP_DUP",
            OpCode::Hash256 => "OP_HASH256",
            OpCode::Hash256Temp => "OP_HASH256_TEMP",
            OpCode::EqualVerify => "OP_EQUALVERIFY",
            OpCode::CheckSig => "OP_CHECKSIG",
        }
    }

    /// The hash opcode matching an address version.
    pub fn hash_for(version: AddressVersion) -> Self {
        match version {
            AddressVersion::Default => OpCode::Hash256,
            AddressVersion::Temp | AddressVersion::Legacy => OpCode::Hash256Temp,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StackEntry {
    Op(OpCode),
    Bytes(String),
    Signature(String),
    PubKey(String),
}

impl std::fmt::Display for StackEntry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StackEntry::Op(op) => f.write_str(op.name()),
            StackEntry::Bytes(v) | StackEntry::Signature(v) | StackEntry::PubKey(v) => {
                f.write_str(v)
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Script {
    pub stack: Vec<StackEntry>,
}

impl std::fmt::Display for Script {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        for (i, entry) in self.stack.iter().enumerate() {
            if i > 0 {
                f.write_str("-")?;
            }
            write!(f, "{entry}")?;
        }
        Ok(())
    }
}

/// Build the P2PKH stack for a signed input.
///
/// `address_version` is the wire value carried by the script signature.
pub fn build_pay2pkh(
    check_data: &str,
    signature: &str,
    public_key_hex: &str,
    address_version: Option<u64>,
) -> Result<Script> {
    let version = AddressVersion::from_wire(address_version)?;
    let public_key =
        hex::decode(public_key_hex).map_err(|e| Error::InvalidKey(e.to_string()))?;
    let address = construct_address(&public_key, version);

    Ok(Script {
        stack: vec![
            StackEntry::Bytes(check_data.to_string()),
            StackEntry::Signature(signature.to_string()),
            StackEntry::PubKey(public_key_hex.to_string()),
            StackEntry::Op(OpCode::Dup),
            StackEntry::Op(OpCode::hash_for(version)),
            StackEntry::Bytes(address),
            StackEntry::Op(OpCode::EqualVerify),
            StackEntry::Op(OpCode::CheckSig),
        ],
    })
}

/// Digest signed when creating new assets. Only the variant and amount are
/// committed to; genesis hash and metadata are not part of it.
pub fn signable_asset_hash(asset: &Asset) -> String {
    let preimage = match asset {
        Asset::Token(amount) => format!("Token:{amount}"),
        Asset::Item(item) => format!("Item:{}", item.amount),
    };
    sha3_hex(preimage.as_bytes())
}

/// Digest an input is signed over: the JSON of every output, concatenated,
/// followed by the JSON of the spent outpoint (`null` when absent).
pub fn signable_tx_hash(previous_out: Option<&OutPoint>, outputs: &[TxOut]) -> Result<String> {
    let mut preimage = String::new();
    for output in outputs {
        preimage.push_str(&serde_json::to_string(output)?);
    }
    preimage.push_str(&serde_json::to_string(&previous_out)?);
    Ok(sha3_hex(preimage.as_bytes()))
}

/// Fingerprint of a set of inputs, disclosed as the `from` of a swap
/// expectation so the counterparty can check what funded it.
pub fn aggregate_inputs_address(inputs: &[TxIn]) -> Result<String> {
    let mut parts = Vec::with_capacity(inputs.len());
    for input in inputs {
        let sig = input
            .script_signature
            .as_ref()
            .ok_or_else(|| Error::InvalidInputs("input has no script signature".into()))?
            .pay2pkh();
        let script = build_pay2pkh(
            &sig.signable_data,
            &sig.signature,
            &sig.public_key,
            sig.address_version,
        )?;
        let outpoint = match &input.previous_out {
            Some(out) => out.to_string(),
            None => "null".to_string(),
        };
        parts.push(format!("{outpoint}-{script}"));
    }
    Ok(sha3_hex(parts.join("-").as_bytes()))
}
