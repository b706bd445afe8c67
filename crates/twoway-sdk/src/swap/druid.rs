use uuid::Uuid;

use crate::script::sha3_hex;
use crate::validation::DRUID_PREFIX;

const DRUID_HASH_CHARS: usize = 32;

/// Fresh DRUID: the prefix followed by 32 hex characters of the SHA3 of a
/// random v4 UUID.
pub fn generate_druid() -> String {
    let seed = Uuid::new_v4().simple().to_string();
    let hash = sha3_hex(seed.as_bytes());
    format!("{DRUID_PREFIX}{}", &hash[..DRUID_HASH_CHARS])
}
