use std::collections::HashMap;

use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64;
use ed25519_dalek::{Signature, Signer, SigningKey, Verifier, VerifyingKey};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::script::sha3_hex;

/// Wire value of [`AddressVersion::Temp`].
pub const TEMP_ADDRESS_VERSION: u64 = 99999;
/// Wire value of [`AddressVersion::Legacy`].
pub const LEGACY_ADDRESS_VERSION: u64 = 0;
/// Explicit wire value accepted for [`AddressVersion::Default`].
pub const DEFAULT_ADDRESS_VERSION: u64 = 1;

const LEGACY_PREFIX: [u8; 8] = [32, 0, 0, 0, 0, 0, 0, 0];

/// How an address is derived from a public key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AddressVersion {
    /// `sha3(pubkey)`. Written as `null` on the wire.
    Default,
    /// `sha3` over the base64 form of the key.
    Temp,
    /// Truncated, prefixed hash. Only ever validated, never produced.
    Legacy,
}

impl AddressVersion {
    pub fn from_wire(version: Option<u64>) -> Result<Self> {
        match version {
            None | Some(DEFAULT_ADDRESS_VERSION) => Ok(Self::Default),
            Some(TEMP_ADDRESS_VERSION) => Ok(Self::Temp),
            Some(LEGACY_ADDRESS_VERSION) => Ok(Self::Legacy),
            Some(_) => Err(Error::InvalidAddressVersion),
        }
    }

    pub fn to_wire(self) -> Option<u64> {
        match self {
            Self::Default => None,
            Self::Temp => Some(TEMP_ADDRESS_VERSION),
            Self::Legacy => Some(LEGACY_ADDRESS_VERSION),
        }
    }
}

/// Derive the address of `public_key` under `version`.
pub fn construct_address(public_key: &[u8], version: AddressVersion) -> String {
    match version {
        AddressVersion::Default => sha3_hex(public_key),
        AddressVersion::Temp => sha3_hex(&lenient_hex_bytes(&BASE64.encode(public_key))),
        AddressVersion::Legacy => {
            let mut data = LEGACY_PREFIX.to_vec();
            data.extend_from_slice(public_key);
            let mut hash = sha3_hex(&data);
            hash.truncate(hash.len() - 16);
            hash
        }
    }
}

/// Which version, if any, produces `address` from `public_key`.
///
/// Only the two current versions are recognised; legacy addresses are
/// checked through [`verify_address`].
pub fn address_version_of(public_key: &[u8], address: &str) -> Result<AddressVersion> {
    [AddressVersion::Temp, AddressVersion::Default]
        .into_iter()
        .find(|version| construct_address(public_key, *version) == address)
        .ok_or(Error::InvalidAddressVersion)
}

/// Check an address against a key under an explicit version, legacy included.
pub fn verify_address(public_key: &[u8], address: &str, version: AddressVersion) -> bool {
    construct_address(public_key, version) == address
}

/// Bytes from a string read two characters at a time with a permissive hex
/// parser: leading hex digits are taken, a leading `+` is skipped, anything
/// else reads as 0. A trailing odd character is dropped.
pub(crate) fn lenient_hex_bytes(s: &str) -> Vec<u8> {
    fn digit(c: u8) -> Option<u8> {
        (c as char).to_digit(16).map(|d| d as u8)
    }

    s.as_bytes()
        .chunks_exact(2)
        .map(|chunk| match (chunk[0], chunk[1]) {
            (b'+', c) => digit(c).unwrap_or(0),
            (a, b) => match (digit(a), digit(b)) {
                (Some(hi), Some(lo)) => hi * 16 + lo,
                (Some(hi), None) => hi,
                _ => 0,
            },
        })
        .collect()
}

/// An Ed25519 signing key together with its address.
#[derive(Clone)]
pub struct KeyPair {
    signing_key: SigningKey,
    address: String,
    version: AddressVersion,
}

impl std::fmt::Debug for KeyPair {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KeyPair")
            .field("address", &self.address)
            .field("version", &self.version)
            .finish_non_exhaustive()
    }
}

impl KeyPair {
    /// Fresh random keypair.
    pub fn generate(version: AddressVersion) -> Self {
        let signing_key = SigningKey::generate(&mut rand::rngs::OsRng);
        Self::from_signing_key(signing_key, version)
    }

    /// From a 32-byte seed.
    pub fn from_seed(seed: &[u8; 32], version: AddressVersion) -> Self {
        Self::from_signing_key(SigningKey::from_bytes(seed), version)
    }

    /// From secret key bytes: either a 32-byte seed or the 64-byte
    /// `seed || public key` form.
    pub fn from_secret_bytes(secret: &[u8], version: AddressVersion) -> Result<Self> {
        let signing_key = match secret.len() {
            32 => {
                let mut seed = [0u8; 32];
                seed.copy_from_slice(secret);
                SigningKey::from_bytes(&seed)
            }
            64 => {
                let mut bytes = [0u8; 64];
                bytes.copy_from_slice(secret);
                SigningKey::from_keypair_bytes(&bytes)
                    .map_err(|e| Error::InvalidKey(e.to_string()))?
            }
            n => return Err(Error::InvalidKey(format!("expected 32 or 64 bytes, got {n}"))),
        };
        Ok(Self::from_signing_key(signing_key, version))
    }

    fn from_signing_key(signing_key: SigningKey, version: AddressVersion) -> Self {
        let address = construct_address(signing_key.verifying_key().as_bytes(), version);
        Self {
            signing_key,
            address,
            version,
        }
    }

    pub fn address(&self) -> &str {
        &self.address
    }

    pub fn version(&self) -> AddressVersion {
        self.version
    }

    pub fn public_key(&self) -> [u8; 32] {
        self.signing_key.verifying_key().to_bytes()
    }

    pub fn public_key_hex(&self) -> String {
        hex::encode(self.public_key())
    }

    /// The 64-byte `seed || public key` form.
    pub fn secret_key_bytes(&self) -> [u8; 64] {
        self.signing_key.to_keypair_bytes()
    }

    /// Detached signature over `message`, hex encoded.
    pub fn sign(&self, message: &[u8]) -> String {
        hex::encode(self.signing_key.sign(message).to_bytes())
    }
}

/// Verify a hex-encoded detached signature against a hex-encoded public key.
pub fn verify_signature(public_key_hex: &str, message: &[u8], signature_hex: &str) -> Result<bool> {
    let pk_bytes: [u8; 32] = hex::decode(public_key_hex)
        .map_err(|e| Error::InvalidKey(e.to_string()))?
        .try_into()
        .map_err(|_| Error::InvalidKey("public key must be 32 bytes".into()))?;
    let verifying_key =
        VerifyingKey::from_bytes(&pk_bytes).map_err(|e| Error::InvalidKey(e.to_string()))?;
    let sig_bytes: [u8; 64] = hex::decode(signature_hex)
        .map_err(|e| Error::InvalidKey(e.to_string()))?
        .try_into()
        .map_err(|_| Error::InvalidKey("signature must be 64 bytes".into()))?;
    let signature = Signature::from_bytes(&sig_bytes);
    Ok(verifying_key.verify(message, &signature).is_ok())
}

/// Keypairs indexed by address, kept in the order they were given.
///
/// Balances are requested in this order and selection walks the returned
/// snapshot, so the order decides which outputs a payment spends.
#[derive(Debug, Clone, Default)]
pub struct KeyPairMap {
    keypairs: Vec<KeyPair>,
    index: HashMap<String, usize>,
}

impl KeyPairMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add `keypair`. A keypair for an address already present replaces the
    /// old one in its original position.
    pub fn insert(&mut self, keypair: KeyPair) {
        match self.index.get(keypair.address()) {
            Some(&i) => self.keypairs[i] = keypair,
            None => {
                self.index
                    .insert(keypair.address().to_string(), self.keypairs.len());
                self.keypairs.push(keypair);
            }
        }
    }

    pub fn get(&self, address: &str) -> Option<&KeyPair> {
        self.index.get(address).map(|&i| &self.keypairs[i])
    }

    pub fn addresses(&self) -> Vec<String> {
        self.keypairs
            .iter()
            .map(|keypair| keypair.address().to_string())
            .collect()
    }

    pub fn len(&self) -> usize {
        self.keypairs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keypairs.is_empty()
    }
}

impl FromIterator<KeyPair> for KeyPairMap {
    fn from_iter<I: IntoIterator<Item = KeyPair>>(iter: I) -> Self {
        let mut map = Self::new();
        for keypair in iter {
            map.insert(keypair);
        }
        map
    }
}

/// A keypair as held at rest: `save` is the encrypted secret, `nonce` the
/// cipher nonce.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EncryptedKeypair {
    pub address: String,
    pub nonce: String,
    pub save: String,
    pub version: Option<u64>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_address_is_sha3_of_public_key() {
        let kp = KeyPair::from_seed(&[7u8; 32], AddressVersion::Default);
        assert_eq!(kp.address(), sha3_hex(&kp.public_key()));
        assert_eq!(kp.address().len(), 64);
        assert_eq!(
            address_version_of(&kp.public_key(), kp.address()).unwrap(),
            AddressVersion::Default
        );
    }

    #[test]
    fn temp_address_detected() {
        let kp = KeyPair::from_seed(&[9u8; 32], AddressVersion::Temp);
        assert_ne!(kp.address(), sha3_hex(&kp.public_key()));
        assert_eq!(
            address_version_of(&kp.public_key(), kp.address()).unwrap(),
            AddressVersion::Temp
        );
    }

    #[test]
    fn legacy_address_only_validates() {
        let kp = KeyPair::from_seed(&[3u8; 32], AddressVersion::Default);
        let legacy = construct_address(&kp.public_key(), AddressVersion::Legacy);
        assert_eq!(legacy.len(), 48);
        assert!(verify_address(&kp.public_key(), &legacy, AddressVersion::Legacy));
        assert!(matches!(
            address_version_of(&kp.public_key(), &legacy),
            Err(Error::InvalidAddressVersion)
        ));
    }

    #[test]
    fn unknown_address_version_rejected() {
        assert!(matches!(
            AddressVersion::from_wire(Some(5)),
            Err(Error::InvalidAddressVersion)
        ));
        assert_eq!(AddressVersion::from_wire(Some(1)).unwrap(), AddressVersion::Default);
        assert_eq!(AddressVersion::Default.to_wire(), None);
        assert_eq!(AddressVersion::Temp.to_wire(), Some(TEMP_ADDRESS_VERSION));
    }

    #[test]
    fn lenient_hex_parsing() {
        assert_eq!(lenient_hex_bytes("ff00"), vec![0xff, 0x00]);
        assert_eq!(lenient_hex_bytes("aZ"), vec![0x0a]);
        assert_eq!(lenient_hex_bytes("Zz"), vec![0]);
        assert_eq!(lenient_hex_bytes("+a"), vec![0x0a]);
        assert_eq!(lenient_hex_bytes("/="), vec![0]);
        assert_eq!(lenient_hex_bytes("abc"), vec![0xab]);
    }

    #[test]
    fn secret_bytes_forms_agree() {
        let kp = KeyPair::from_seed(&[1u8; 32], AddressVersion::Default);
        let full = kp.secret_key_bytes();
        let from_full = KeyPair::from_secret_bytes(&full, AddressVersion::Default).unwrap();
        let from_seed = KeyPair::from_secret_bytes(&full[..32], AddressVersion::Default).unwrap();
        assert_eq!(from_full.address(), kp.address());
        assert_eq!(from_seed.address(), kp.address());
        assert!(KeyPair::from_secret_bytes(&[0u8; 10], AddressVersion::Default).is_err());
    }

    #[test]
    fn sign_and_verify() {
        let kp = KeyPair::generate(AddressVersion::Default);
        let sig = kp.sign(b"hello");
        assert!(verify_signature(&kp.public_key_hex(), b"hello", &sig).unwrap());
        assert!(!verify_signature(&kp.public_key_hex(), b"other", &sig).unwrap());
    }

    #[test]
    fn keypair_map_keeps_insertion_order() {
        let keypairs: Vec<KeyPair> = (1u8..=6)
            .map(|i| KeyPair::from_seed(&[i; 32], AddressVersion::Default))
            .collect();
        let given: Vec<String> = keypairs.iter().map(|kp| kp.address().to_string()).collect();
        let mut sorted = given.clone();
        sorted.sort();
        assert_ne!(given, sorted, "seeds should not already be address ordered");

        let map: KeyPairMap = keypairs.into_iter().collect();
        assert_eq!(map.addresses(), given);
        assert_eq!(map.len(), 6);
    }

    #[test]
    fn keypair_map_reinsert_keeps_position() {
        let first = KeyPair::from_seed(&[1u8; 32], AddressVersion::Default);
        let second = KeyPair::from_seed(&[2u8; 32], AddressVersion::Default);
        let mut map: KeyPairMap = [first.clone(), second.clone()].into_iter().collect();

        map.insert(first.clone());
        assert_eq!(map.len(), 2);
        assert_eq!(
            map.addresses(),
            vec![first.address().to_string(), second.address().to_string()]
        );
        assert_eq!(map.get(second.address()).unwrap().address(), second.address());
    }
}
