use crate::balance::BalanceSnapshot;
use crate::error::{Error, Result};
use crate::keys::KeyPairMap;
use crate::script::signable_tx_hash;

use super::Transaction;

/// Second signing pass: re-sign every input over the transaction's final
/// outputs, replacing the placeholder written during selection.
///
/// The owning key is found through the snapshot: the first address holding
/// an output with the input's transaction hash.
pub fn finalize_signatures(
    mut transaction: Transaction,
    snapshot: &BalanceSnapshot,
    keypairs: &KeyPairMap,
) -> Result<Transaction> {
    let outputs = transaction.outputs.clone();

    for input in transaction.inputs.iter_mut() {
        let (Some(previous_out), Some(script_sig)) =
            (input.previous_out.as_ref(), input.script_signature.as_mut())
        else {
            continue;
        };

        let keypair = snapshot
            .owner_of(&previous_out.tx_hash)
            .and_then(|address| keypairs.get(address))
            .ok_or(Error::UnableToGetKeypair)?;

        let signable_data = signable_tx_hash(Some(previous_out), &outputs)?;
        let signature = keypair.sign(signable_data.as_bytes());

        let p2pkh = script_sig.pay2pkh_mut();
        p2pkh.signable_data = signable_data;
        p2pkh.signature = signature;
    }

    log::debug!(
        "signed {} input(s) over {} output(s)",
        transaction.inputs.len(),
        outputs.len()
    );
    Ok(transaction)
}
