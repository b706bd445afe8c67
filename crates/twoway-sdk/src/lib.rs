pub mod asset;
pub mod balance;
pub mod error;
pub mod item;
pub mod keys;
pub mod script;
pub mod swap;
#[cfg(any(test, feature = "testing"))]
pub mod testing;
pub mod tx;
pub mod validation;

// Core types
pub use asset::{Asset, DEFAULT_GENESIS_HASH, ItemAsset, METADATA_MAX_BYTES};
pub use balance::{AddressList, BalanceSnapshot, BalanceTotals, OutPointValue};
pub use error::{Error, Result, SwapError};
pub use keys::{AddressVersion, EncryptedKeypair, KeyPair, KeyPairMap, verify_signature};

// Scripts and digests
pub use script::{
    Script, aggregate_inputs_address, build_pay2pkh, sha3_hex, signable_asset_hash,
    signable_tx_hash,
};

// Transaction construction
pub use tx::{
    DruidExpectation, DruidValues, EncryptedTransaction, InputSelection, NETWORK_VERSION,
    OutPoint, Pay2PkH, ScriptSig, Transaction, TxIn, TxOut, TxPayload, build_transaction,
    create_payment_tx, finalize_signatures, select_inputs,
};

// Item creation
pub use item::{GenesisHashSpec, ITEM_DEFAULT, ItemCreationPayload, create_item_payload};

// Swaps
pub use swap::{
    BalanceProvider, Decision, FinalizeReport, KeyManagement, PendingSwap, Proposal,
    RelayStore, Response, SettlementClient, SettlementResponse, SettlementStatus, SwapConfig,
    SwapCoordinator, SwapStatus, build_swap_half, generate_druid,
};

pub use validation::{is_druid, validate_address, validate_transaction_hash};
