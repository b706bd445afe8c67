use aes_gcm::aead::Aead;
use aes_gcm::{Aes256Gcm, KeyInit, Nonce};
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use zeroize::Zeroizing;

use twoway_sdk::keys::AddressVersion;
use twoway_sdk::{
    EncryptedKeypair, EncryptedTransaction, KeyManagement, KeyPair, KeyPairMap, Transaction,
};

use crate::error::{Result, WalletError};

const SALT_LEN: usize = 16;
const NONCE_LEN: usize = 12;

/// Passphrase-based at-rest protection for keypairs and retained swap halves.
///
/// Each record is sealed with AES-256-GCM under an Argon2 key derived from
/// a fresh salt. `save` holds `base64(salt || ciphertext)`, `nonce` the
/// base64 cipher nonce.
#[derive(Clone)]
pub struct KeyVault {
    passphrase: Zeroizing<String>,
}

impl std::fmt::Debug for KeyVault {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KeyVault").finish_non_exhaustive()
    }
}

impl KeyVault {
    pub fn new(passphrase: &str) -> Self {
        Self {
            passphrase: Zeroizing::new(passphrase.to_string()),
        }
    }

    fn cipher(&self, salt: &[u8]) -> Result<Aes256Gcm> {
        let mut key_bytes = Zeroizing::new([0u8; 32]);
        argon2::Argon2::default()
            .hash_password_into(self.passphrase.as_bytes(), salt, &mut key_bytes[..])
            .map_err(|e| WalletError::Crypto(e.to_string()))?;
        Aes256Gcm::new_from_slice(&key_bytes[..]).map_err(|e| WalletError::Crypto(e.to_string()))
    }

    fn seal(&self, plaintext: &[u8]) -> Result<(String, String)> {
        let salt: [u8; SALT_LEN] = rand::random();
        let nonce_bytes: [u8; NONCE_LEN] = rand::random();

        let ciphertext = self
            .cipher(&salt)?
            .encrypt(Nonce::from_slice(&nonce_bytes), plaintext)
            .map_err(|e| WalletError::Crypto(e.to_string()))?;

        let mut save = Vec::with_capacity(SALT_LEN + ciphertext.len());
        save.extend_from_slice(&salt);
        save.extend_from_slice(&ciphertext);
        Ok((BASE64.encode(nonce_bytes), BASE64.encode(save)))
    }

    fn open(&self, nonce: &str, save: &str) -> Result<Zeroizing<Vec<u8>>> {
        let nonce_bytes = BASE64
            .decode(nonce)
            .map_err(|e| WalletError::Crypto(e.to_string()))?;
        if nonce_bytes.len() != NONCE_LEN {
            return Err(WalletError::Crypto(format!(
                "nonce must be {NONCE_LEN} bytes, got {}",
                nonce_bytes.len()
            )));
        }
        let save = BASE64
            .decode(save)
            .map_err(|e| WalletError::Crypto(e.to_string()))?;
        if save.len() <= SALT_LEN {
            return Err(WalletError::Crypto("sealed record too short".into()));
        }
        let (salt, ciphertext) = save.split_at(SALT_LEN);

        let plaintext = self
            .cipher(salt)?
            .decrypt(Nonce::from_slice(&nonce_bytes), ciphertext)
            .map_err(|_| WalletError::WrongPassphrase)?;
        Ok(Zeroizing::new(plaintext))
    }

    pub fn encrypt_keypair(&self, keypair: &KeyPair) -> Result<EncryptedKeypair> {
        let secret = Zeroizing::new(keypair.secret_key_bytes());
        let (nonce, save) = self.seal(&secret[..])?;
        Ok(EncryptedKeypair {
            address: keypair.address().to_string(),
            nonce,
            save,
            version: keypair.version().to_wire(),
        })
    }

    pub fn decrypt_keypair(&self, encrypted: &EncryptedKeypair) -> Result<KeyPair> {
        let secret = self.open(&encrypted.nonce, &encrypted.save)?;
        let version = AddressVersion::from_wire(encrypted.version)?;
        let keypair = KeyPair::from_secret_bytes(&secret, version)?;
        if keypair.address() != encrypted.address {
            return Err(WalletError::Crypto(format!(
                "decrypted key does not match address {}",
                encrypted.address
            )));
        }
        Ok(keypair)
    }

    /// Decrypt every keypair into an address-indexed map.
    pub fn keypair_map(&self, encrypted: &[EncryptedKeypair]) -> Result<KeyPairMap> {
        encrypted.iter().map(|e| self.decrypt_keypair(e)).collect()
    }

    pub fn encrypt_transaction(
        &self,
        druid: &str,
        transaction: &Transaction,
    ) -> Result<EncryptedTransaction> {
        let json = Zeroizing::new(serde_json::to_vec(transaction)?);
        let (nonce, save) = self.seal(&json)?;
        Ok(EncryptedTransaction {
            druid: druid.to_string(),
            nonce,
            save,
        })
    }

    pub fn decrypt_transaction(&self, encrypted: &EncryptedTransaction) -> Result<Transaction> {
        let json = self.open(&encrypted.nonce, &encrypted.save)?;
        Ok(serde_json::from_slice(&json)?)
    }
}

impl KeyManagement for KeyVault {
    fn encrypt_transaction(
        &self,
        druid: &str,
        transaction: &Transaction,
    ) -> std::result::Result<EncryptedTransaction, String> {
        KeyVault::encrypt_transaction(self, druid, transaction).map_err(|e| e.to_string())
    }

    fn decrypt_transaction(
        &self,
        encrypted: &EncryptedTransaction,
    ) -> std::result::Result<Transaction, String> {
        KeyVault::decrypt_transaction(self, encrypted).map_err(|e| e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use twoway_sdk::testing::{fixture_keypairs, FIXTURE_ADDRESSES};
    use twoway_sdk::{Asset, TxOut, NETWORK_VERSION};

    #[test]
    fn keypair_roundtrip() {
        let vault = KeyVault::new("test");
        let keypair = KeyPair::generate(AddressVersion::Default);
        let sealed = vault.encrypt_keypair(&keypair).unwrap();
        assert_eq!(sealed.address, keypair.address());
        assert!(sealed.version.is_none());

        let opened = vault.decrypt_keypair(&sealed).unwrap();
        assert_eq!(opened.public_key(), keypair.public_key());
    }

    #[test]
    fn temp_version_survives() {
        let vault = KeyVault::new("test");
        let keypair = KeyPair::generate(AddressVersion::Temp);
        let sealed = vault.encrypt_keypair(&keypair).unwrap();
        assert_eq!(sealed.version, Some(99999));
        assert_eq!(vault.decrypt_keypair(&sealed).unwrap().version(), AddressVersion::Temp);
    }

    #[test]
    fn wrong_passphrase() {
        let keypair = KeyPair::generate(AddressVersion::Default);
        let sealed = KeyVault::new("correct").encrypt_keypair(&keypair).unwrap();
        assert!(matches!(
            KeyVault::new("wrong").decrypt_keypair(&sealed),
            Err(WalletError::WrongPassphrase)
        ));
    }

    #[test]
    fn swapped_address_is_detected() {
        let vault = KeyVault::new("test");
        let mut sealed = vault
            .encrypt_keypair(&KeyPair::generate(AddressVersion::Default))
            .unwrap();
        sealed.address = FIXTURE_ADDRESSES[0].to_string();
        assert!(matches!(vault.decrypt_keypair(&sealed), Err(WalletError::Crypto(_))));
    }

    #[test]
    fn salts_differ_per_record() {
        let vault = KeyVault::new("test");
        let keypair = KeyPair::generate(AddressVersion::Default);
        let a = vault.encrypt_keypair(&keypair).unwrap();
        let b = vault.encrypt_keypair(&keypair).unwrap();
        assert_ne!(a.save, b.save);
    }

    #[test]
    fn keypair_map_indexes_by_address() {
        let vault = KeyVault::new("test");
        let fixtures = fixture_keypairs();
        let sealed: Vec<_> = FIXTURE_ADDRESSES
            .iter()
            .map(|a| vault.encrypt_keypair(fixtures.get(a).unwrap()).unwrap())
            .collect();
        let map = vault.keypair_map(&sealed).unwrap();
        assert_eq!(map.len(), 3);
        assert!(map.get(FIXTURE_ADDRESSES[2]).is_some());
    }

    #[test]
    fn transaction_roundtrip() {
        let vault = KeyVault::new("test");
        let tx = Transaction {
            inputs: vec![],
            outputs: vec![TxOut {
                value: Asset::token(7),
                locktime: 0,
                script_public_key: FIXTURE_ADDRESSES[1].to_string(),
            }],
            version: NETWORK_VERSION,
            druid_info: None,
        };
        let sealed = vault.encrypt_transaction("DRUID0xabc", &tx).unwrap();
        assert_eq!(sealed.druid, "DRUID0xabc");
        assert_eq!(KeyManagement::decrypt_transaction(&vault, &sealed).unwrap(), tx);
    }
}
