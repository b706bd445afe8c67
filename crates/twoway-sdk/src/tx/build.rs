use crate::asset::Asset;
use crate::balance::BalanceSnapshot;
use crate::error::{Error, Result};
use crate::keys::KeyPairMap;
use crate::validation::validate_address;

use super::{
    DruidValues, InputSelection, NETWORK_VERSION, Transaction, TxOut, finalize_signatures,
    select_inputs,
};

/// A transaction ready for `/create_transactions`, with bookkeeping the
/// caller needs afterwards.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TxPayload {
    pub transaction: Transaction,
    /// Whether a change output was added.
    pub excess_address_used: bool,
    pub used_addresses: Vec<String>,
}

/// Assemble outputs around a selection. The payment output carries
/// `locktime`; the change output, when present, is always unlocked.
pub fn build_transaction(
    payment_address: &str,
    payment: &Asset,
    excess_address: &str,
    druid_info: Option<DruidValues>,
    selection: InputSelection,
    locktime: u64,
) -> Result<TxPayload> {
    validate_address(payment_address)?;
    validate_address(excess_address)?;
    payment.validate()?;

    let InputSelection {
        inputs,
        total_gathered,
        used_addresses,
        ..
    } = selection;

    if inputs.is_empty() {
        return Err(Error::NoInputs);
    }

    let mut outputs = vec![TxOut {
        value: payment.clone(),
        locktime,
        script_public_key: payment_address.to_string(),
    }];

    let has_excess = total_gathered.gt(payment)?;
    if has_excess {
        outputs.push(TxOut {
            value: total_gathered.sub(payment)?,
            locktime: 0,
            script_public_key: excess_address.to_string(),
        });
    }

    Ok(TxPayload {
        transaction: Transaction {
            inputs,
            outputs,
            version: NETWORK_VERSION,
            druid_info,
        },
        excess_address_used: has_excess,
        used_addresses,
    })
}

/// Single-asset payment: select, build, then sign over the final outputs.
pub fn create_payment_tx(
    payment_address: &str,
    payment: &Asset,
    excess_address: &str,
    snapshot: &BalanceSnapshot,
    keypairs: &KeyPairMap,
    locktime: u64,
) -> Result<TxPayload> {
    let selection = select_inputs(payment, snapshot, keypairs)?;
    let mut payload = build_transaction(
        payment_address,
        payment,
        excess_address,
        None,
        selection,
        locktime,
    )?;
    payload.transaction = finalize_signatures(payload.transaction, snapshot, keypairs)?;
    Ok(payload)
}
