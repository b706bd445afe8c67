use crate::asset::Asset;
use crate::balance::BalanceSnapshot;
use crate::error::{Error, Result};
use crate::keys::{KeyPairMap, address_version_of};
use crate::script::signable_tx_hash;

use super::{Pay2PkH, ScriptSig, TxIn};

/// Inputs gathered for a payment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InputSelection {
    pub inputs: Vec<TxIn>,
    pub total_gathered: Asset,
    pub used_addresses: Vec<String>,
    /// Addresses whose every output was consumed.
    pub depleted_addresses: Vec<String>,
}

/// First-fit input selection in snapshot order.
///
/// Each consumed output gets a placeholder signature computed against an
/// empty output list; [`finalize_signatures`](super::finalize_signatures)
/// replaces it once the outputs are known.
pub fn select_inputs(
    payment: &Asset,
    snapshot: &BalanceSnapshot,
    keypairs: &KeyPairMap,
) -> Result<InputSelection> {
    payment.validate()?;

    if payment.amount() > snapshot.available_for(payment) {
        return Err(Error::InsufficientFunds);
    }

    let mut total_gathered = payment.zero_like();
    let mut inputs = Vec::new();
    let mut used_addresses: Vec<String> = Vec::new();
    let mut depleted_addresses = Vec::new();

    for (address, outputs) in snapshot.address_list.iter() {
        let mut used_here = 0usize;

        for output in outputs {
            if !total_gathered.lt(payment)? || !payment.is_compatible(&output.value) {
                continue;
            }

            let keypair = keypairs.get(address).ok_or(Error::UnableToGetKeypair)?;
            let version = address_version_of(&keypair.public_key(), address)?;

            let signable_data = signable_tx_hash(Some(&output.out_point), &[])?;
            let signature = keypair.sign(signable_data.as_bytes());

            inputs.push(TxIn {
                previous_out: Some(output.out_point.clone()),
                script_signature: Some(ScriptSig::Pay2PkH(Pay2PkH {
                    signable_data,
                    signature,
                    public_key: keypair.public_key_hex(),
                    address_version: version.to_wire(),
                })),
            });

            total_gathered = total_gathered.add(&output.value)?;
            if !used_addresses.iter().any(|a| a == address) {
                used_addresses.push(address.to_string());
            }

            used_here += 1;
            if used_here == outputs.len() {
                depleted_addresses.push(address.to_string());
            }
        }
    }

    log::debug!(
        "selected {} input(s) from {} address(es), gathered {}",
        inputs.len(),
        used_addresses.len(),
        total_gathered.amount()
    );

    Ok(InputSelection {
        inputs,
        total_gathered,
        used_addresses,
        depleted_addresses,
    })
}
