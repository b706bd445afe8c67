use serde::{Deserialize, Serialize};

use crate::asset::{Asset, validate_metadata};
use crate::error::Result;
use crate::keys::KeyPair;
use crate::script::signable_asset_hash;

/// Default number of `Item` assets minted per creation request.
pub const ITEM_DEFAULT: u64 = 1000;

/// Whether new items share the generic genesis hash or get their own.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum GenesisHashSpec {
    Create,
    Default,
}

/// Body of a `/create_item_asset` request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemCreationPayload {
    pub item_amount: u64,
    pub script_public_key: String,
    pub public_key: String,
    pub signature: String,
    pub version: Option<u64>,
    pub genesis_hash_spec: GenesisHashSpec,
    pub metadata: Option<String>,
}

pub fn create_item_payload(
    keypair: &KeyPair,
    amount: u64,
    default_genesis_hash: bool,
    metadata: Option<String>,
) -> Result<ItemCreationPayload> {
    if let Some(metadata) = &metadata {
        validate_metadata(metadata)?;
    }

    // The genesis hash does not exist yet and is not part of the digest.
    let asset = Asset::item(amount, "", metadata.clone());
    let signature = keypair.sign(signable_asset_hash(&asset).as_bytes());

    Ok(ItemCreationPayload {
        item_amount: amount,
        script_public_key: keypair.address().to_string(),
        public_key: keypair.public_key_hex(),
        signature,
        version: keypair.version().to_wire(),
        genesis_hash_spec: if default_genesis_hash {
            GenesisHashSpec::Default
        } else {
            GenesisHashSpec::Create
        },
        metadata,
    })
}
