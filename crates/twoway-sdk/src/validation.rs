use crate::error::{Error, Result};

/// DRUID values start with this prefix.
pub const DRUID_PREFIX: &str = "DRUID0x";

/// Addresses are 64 lower-case hex characters.
pub fn validate_address(address: &str) -> Result<()> {
    let well_formed = address.len() == 64
        && address
            .bytes()
            .all(|b| b.is_ascii_digit() || (b'a'..=b'f').contains(&b));
    if well_formed {
        Ok(())
    } else {
        Err(Error::InvalidInputs(format!("malformed address: {address}")))
    }
}

/// Transaction hashes are `g` followed by 31 lower-case hex characters. The
/// all-zero `000000` placeholder is also accepted.
pub fn validate_transaction_hash(hash: &str) -> Result<()> {
    let well_formed = hash == "000000"
        || hash.strip_prefix('g').is_some_and(|rest| {
            rest.len() == 31
                && rest
                    .bytes()
                    .all(|b| b.is_ascii_digit() || (b'a'..=b'f').contains(&b))
        });
    if well_formed {
        Ok(())
    } else {
        Err(Error::InvalidInputs(format!("malformed transaction hash: {hash}")))
    }
}

pub fn is_druid(value: &str) -> bool {
    value
        .strip_prefix(DRUID_PREFIX)
        .is_some_and(|rest| !rest.is_empty() && rest.bytes().all(|b| b.is_ascii_hexdigit()))
}
