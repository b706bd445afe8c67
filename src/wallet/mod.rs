//! The outward-facing client. Every operation answers with a
//! [`ClientResponse`]; failures never escape as `Err`.

pub mod types;
pub mod vault;

use std::collections::BTreeMap;

use twoway_sdk::keys::AddressVersion;
use twoway_sdk::{
    Asset, BalanceSnapshot, DEFAULT_GENESIS_HASH, Decision, EncryptedKeypair, EncryptedTransaction,
    KeyPair, KeyPairMap, PendingSwap, SwapConfig, SwapCoordinator, create_item_payload,
    create_payment_tx, validate_address, validate_transaction_hash, verify_signature,
};

use crate::config::ClientConfig;
use crate::error::{Result, WalletError};
use crate::network::{NodeClient, RelayClient};

pub use types::{
    ClientContent, ClientResponse, ClientStatus, KeypairView, Make2WayPaymentResponse,
    MakePaymentResponse,
};
pub use vault::KeyVault;

type NodeSwapCoordinator = SwapCoordinator<NodeClient, RelayClient, NodeClient, KeyVault>;

/// Hosts, route tables and key vault resolved by [`Wallet::init_network`].
struct Session {
    mempool: NodeClient,
    storage: Option<NodeClient>,
    relay: Option<RelayClient>,
    vault: KeyVault,
}

#[derive(Default)]
pub struct Wallet {
    session: Option<Session>,
}

/// Item genesis hashes are transaction hashes, apart from the shared
/// default used for untracked items.
fn check_genesis_hash(genesis_hash: &str) -> Result<()> {
    if genesis_hash != DEFAULT_GENESIS_HASH {
        validate_transaction_hash(genesis_hash)?;
    }
    Ok(())
}

fn respond(operation: &str, result: Result<ClientResponse>) -> ClientResponse {
    result.unwrap_or_else(|e| {
        log::debug!("{operation} failed: {e}");
        ClientResponse::from(e)
    })
}

impl Wallet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_initialized(&self) -> bool {
        self.session.is_some()
    }

    fn session(&self) -> Result<&Session> {
        self.session.as_ref().ok_or(WalletError::NotInitialized)
    }

    fn vault(&self) -> Result<&KeyVault> {
        Ok(&self.session()?.vault)
    }

    fn coordinator(&self) -> Result<NodeSwapCoordinator> {
        let session = self.session()?;
        let relay = session
            .relay
            .clone()
            .ok_or(WalletError::RelayNotInitialized)?;
        Ok(SwapCoordinator::new(
            SwapConfig {
                settlement_host: session.mempool.host().to_string(),
            },
            session.mempool.clone(),
            relay,
            session.mempool.clone(),
            session.vault.clone(),
        ))
    }

    // ── Session ─────────────────────────────────────────────────────────

    /// Validate `config`, then fetch the proof-of-work tables of the
    /// mempool and, when configured, the storage node.
    pub async fn init_network(&mut self, config: ClientConfig) -> ClientResponse {
        let result = Self::open_session(config).await.map(|session| {
            self.session = Some(session);
            ClientResponse::success("Client initialized", None)
        });
        respond("init_network", result)
    }

    async fn open_session(config: ClientConfig) -> Result<Session> {
        let config = config.validated()?;
        let http = reqwest::Client::new();

        let mempool = NodeClient::connect(http.clone(), &config.mempool_host).await?;
        let storage = match config.storage_host.as_deref() {
            Some(host) => Some(NodeClient::connect(http.clone(), host).await?),
            None => None,
        };
        let relay = config
            .relay_host
            .as_deref()
            .map(|host| RelayClient::new(http.clone(), host));

        log::info!(
            "session opened: mempool={}, storage={}, relay={}",
            mempool.host(),
            storage.as_ref().map(NodeClient::host).unwrap_or("-"),
            relay.as_ref().map(RelayClient::host).unwrap_or("-"),
        );
        Ok(Session {
            mempool,
            storage,
            relay,
            vault: KeyVault::new(&config.passphrase),
        })
    }

    // ── Balances and entries ────────────────────────────────────────────

    pub async fn fetch_balance(&self, addresses: &[String]) -> ClientResponse {
        respond("fetch_balance", self.try_fetch_balance(addresses).await)
    }

    async fn try_fetch_balance(&self, addresses: &[String]) -> Result<ClientResponse> {
        for address in addresses {
            validate_address(address)?;
        }
        let response = self.session()?.mempool.balance(addresses).await?;
        let content = if response.is_failure() {
            None
        } else {
            Some(ClientContent::FetchBalanceResponse(response.content_as()?))
        };
        Ok(ClientResponse::from_network(&response, content))
    }

    pub async fn fetch_transactions(&self, hashes: &[String]) -> ClientResponse {
        respond("fetch_transactions", self.try_fetch_transactions(hashes).await)
    }

    async fn try_fetch_transactions(&self, hashes: &[String]) -> Result<ClientResponse> {
        for hash in hashes {
            validate_transaction_hash(hash)?;
        }
        let storage = self
            .session()?
            .storage
            .as_ref()
            .ok_or(WalletError::StorageNotInitialized)?;
        let response = storage.blockchain_entry(hashes).await?;
        let content = response
            .content
            .clone()
            .filter(|_| !response.is_failure())
            .map(ClientContent::FetchTransactionsResponse);
        Ok(ClientResponse::from_network(&response, content))
    }

    // ── Items and payments ──────────────────────────────────────────────

    pub async fn create_items(
        &self,
        keypair: &EncryptedKeypair,
        default_genesis_hash: bool,
        amount: u64,
        metadata: Option<String>,
    ) -> ClientResponse {
        let result = self
            .try_create_items(keypair, default_genesis_hash, amount, metadata)
            .await;
        respond("create_items", result)
    }

    async fn try_create_items(
        &self,
        keypair: &EncryptedKeypair,
        default_genesis_hash: bool,
        amount: u64,
        metadata: Option<String>,
    ) -> Result<ClientResponse> {
        let session = self.session()?;
        let keypair = session.vault.decrypt_keypair(keypair)?;
        let payload = create_item_payload(&keypair, amount, default_genesis_hash, metadata)?;
        let response = session.mempool.create_item_asset(&payload).await?;
        let content = response
            .content
            .clone()
            .filter(|_| !response.is_failure())
            .map(ClientContent::CreateItemResponse);
        Ok(ClientResponse::from_network(&response, content))
    }

    pub async fn make_token_payment(
        &self,
        payment_address: &str,
        amount: u64,
        all_keypairs: &[EncryptedKeypair],
        excess_keypair: &EncryptedKeypair,
        locktime: u64,
    ) -> ClientResponse {
        let result = self
            .make_payment(
                payment_address,
                Asset::token(amount),
                all_keypairs,
                excess_keypair,
                locktime,
            )
            .await;
        respond("make_token_payment", result)
    }

    #[allow(clippy::too_many_arguments)]
    pub async fn make_item_payment(
        &self,
        payment_address: &str,
        amount: u64,
        genesis_hash: &str,
        all_keypairs: &[EncryptedKeypair],
        excess_keypair: &EncryptedKeypair,
        metadata: Option<String>,
        locktime: u64,
    ) -> ClientResponse {
        let result = match check_genesis_hash(genesis_hash) {
            Ok(()) => {
                self.make_payment(
                    payment_address,
                    Asset::item(amount, genesis_hash, metadata),
                    all_keypairs,
                    excess_keypair,
                    locktime,
                )
                .await
            }
            Err(e) => Err(e),
        };
        respond("make_item_payment", result)
    }

    async fn make_payment(
        &self,
        payment_address: &str,
        asset: Asset,
        all_keypairs: &[EncryptedKeypair],
        excess_keypair: &EncryptedKeypair,
        locktime: u64,
    ) -> Result<ClientResponse> {
        validate_address(payment_address)?;
        let session = self.session()?;
        if all_keypairs.is_empty() {
            return Err(twoway_sdk::Error::NoKeypairsProvided.into());
        }
        let keypairs = session.vault.keypair_map(all_keypairs)?;
        let excess = session.vault.decrypt_keypair(excess_keypair)?;

        let snapshot: BalanceSnapshot = session
            .mempool
            .balance(&keypairs.addresses())
            .await?
            .content_as()?;

        let payload = create_payment_tx(
            payment_address,
            &asset,
            excess.address(),
            &snapshot,
            &keypairs,
            locktime,
        )?;

        let response = session
            .mempool
            .create_transactions(std::slice::from_ref(&payload.transaction))
            .await?;
        let content = match response.content.clone() {
            Some(content) if !response.is_failure() => Some(ClientContent::MakePaymentResponse(
                MakePaymentResponse::from_network(content, payload.used_addresses)?,
            )),
            _ => None,
        };
        Ok(ClientResponse::from_network(&response, content))
    }

    // ── Two-way payments ────────────────────────────────────────────────

    /// Propose a swap of `send_asset` for `receive_asset` with the owner of
    /// `payment_address`. The returned half must be kept and handed back
    /// to [`fetch_pending_2way_payments`](Self::fetch_pending_2way_payments).
    pub async fn make_2way_payment(
        &self,
        payment_address: &str,
        send_asset: &Asset,
        receive_asset: &Asset,
        all_keypairs: &[EncryptedKeypair],
        receive_keypair: &EncryptedKeypair,
    ) -> ClientResponse {
        let result = self
            .try_make_2way_payment(
                payment_address,
                send_asset,
                receive_asset,
                all_keypairs,
                receive_keypair,
            )
            .await;
        respond("make_2way_payment", result)
    }

    async fn try_make_2way_payment(
        &self,
        payment_address: &str,
        send_asset: &Asset,
        receive_asset: &Asset,
        all_keypairs: &[EncryptedKeypair],
        receive_keypair: &EncryptedKeypair,
    ) -> Result<ClientResponse> {
        let coordinator = self.coordinator()?;
        if all_keypairs.is_empty() {
            return Err(twoway_sdk::Error::NoKeypairsProvided.into());
        }
        let vault = self.vault()?;
        let mut keypairs = vault.keypair_map(all_keypairs)?;
        let receiver = vault.decrypt_keypair(receive_keypair)?;
        let self_address = receiver.address().to_string();
        keypairs.insert(receiver);

        let proposal = coordinator
            .propose_swap(
                payment_address,
                send_asset,
                receive_asset,
                &keypairs,
                &self_address,
            )
            .await?;
        Ok(ClientResponse::success(
            "2-Way payment processing",
            Some(ClientContent::Make2WayPaymentResponse(Make2WayPaymentResponse {
                druid: proposal.druid,
                encrypted_tx: proposal.encrypted_half,
            })),
        ))
    }

    /// Read the relay under `keypair`'s address: settle accepted swaps with
    /// the matching halves from `retained`, drop rejected ones, and list
    /// proposals still waiting for an answer.
    pub async fn fetch_pending_2way_payments(
        &self,
        keypair: &EncryptedKeypair,
        retained: &[EncryptedTransaction],
    ) -> ClientResponse {
        let result = self.try_fetch_pending(keypair, retained).await;
        respond("fetch_pending_2way_payments", result)
    }

    async fn try_fetch_pending(
        &self,
        keypair: &EncryptedKeypair,
        retained: &[EncryptedTransaction],
    ) -> Result<ClientResponse> {
        let coordinator = self.coordinator()?;
        let owner = self.vault()?.decrypt_keypair(keypair)?;
        let self_address = owner.address().to_string();
        let keypairs: KeyPairMap = std::iter::once(owner).collect();

        let report = coordinator
            .finalize_swap(&self_address, &keypairs, retained)
            .await?;
        Ok(ClientResponse::success(
            "Successfully fetched pending 2 way transactions",
            Some(ClientContent::FetchPending2WayResponse(report)),
        ))
    }

    pub async fn accept_2way_payment(
        &self,
        druid: &str,
        pending: &PendingSwap,
        all_keypairs: &[EncryptedKeypair],
    ) -> ClientResponse {
        let result = self
            .respond_2way(druid, pending, Decision::Accept, all_keypairs)
            .await;
        respond("accept_2way_payment", result)
    }

    pub async fn reject_2way_payment(
        &self,
        druid: &str,
        pending: &PendingSwap,
        all_keypairs: &[EncryptedKeypair],
    ) -> ClientResponse {
        let result = self
            .respond_2way(druid, pending, Decision::Reject, all_keypairs)
            .await;
        respond("reject_2way_payment", result)
    }

    async fn respond_2way(
        &self,
        druid: &str,
        pending: &PendingSwap,
        decision: Decision,
        all_keypairs: &[EncryptedKeypair],
    ) -> Result<ClientResponse> {
        let coordinator = self.coordinator()?;
        let keypairs = self.vault()?.keypair_map(all_keypairs)?;
        coordinator
            .respond_to_swap(druid, pending, decision, &keypairs)
            .await?;
        Ok(ClientResponse::success(
            "Successfully responded to 2 way payment",
            None,
        ))
    }

    // ── Keys and messages ───────────────────────────────────────────────

    pub fn get_new_druid(&self) -> ClientResponse {
        ClientResponse::success(
            "New DRUID generated",
            Some(ClientContent::NewDruidResponse(twoway_sdk::generate_druid())),
        )
    }

    /// Fresh random keypair, returned encrypted. Legacy addresses can only
    /// be validated, not issued.
    pub fn generate_keypair(&self, version: AddressVersion) -> ClientResponse {
        let result = (|| -> Result<ClientResponse> {
            if version == AddressVersion::Legacy {
                return Err(twoway_sdk::Error::InvalidAddressVersion.into());
            }
            let encrypted = self.vault()?.encrypt_keypair(&KeyPair::generate(version))?;
            Ok(ClientResponse::success(
                "Successfully generated new address",
                Some(ClientContent::NewKeypairResponse(encrypted)),
            ))
        })();
        respond("generate_keypair", result)
    }

    pub fn decrypt_keypair(&self, encrypted: &EncryptedKeypair) -> ClientResponse {
        let result = self.vault().and_then(|vault| {
            let keypair = vault.decrypt_keypair(encrypted)?;
            Ok(ClientResponse::success(
                "Successfully decrypted key-pair",
                Some(ClientContent::DecryptKeypairResponse(KeypairView::from(
                    &keypair,
                ))),
            ))
        });
        respond("decrypt_keypair", result)
    }

    /// Sign `message` with every keypair; the content maps address to
    /// hex signature.
    pub fn sign_message(&self, keypairs: &[EncryptedKeypair], message: &str) -> ClientResponse {
        let result = self.vault().and_then(|vault| {
            let mut signatures = BTreeMap::new();
            for encrypted in keypairs {
                let keypair = vault.decrypt_keypair(encrypted)?;
                signatures.insert(
                    keypair.address().to_string(),
                    keypair.sign(message.as_bytes()),
                );
            }
            Ok(ClientResponse::success(
                "Successfully signed message",
                Some(ClientContent::SignMessageResponse(signatures)),
            ))
        });
        respond("sign_message", result)
    }

    /// Succeeds only if every keypair has a valid signature in `signatures`.
    pub fn verify_message(
        &self,
        message: &str,
        signatures: &BTreeMap<String, String>,
        keypairs: &[EncryptedKeypair],
    ) -> ClientResponse {
        let result = self.vault().and_then(|vault| {
            for encrypted in keypairs {
                let keypair = vault.decrypt_keypair(encrypted)?;
                let signature = signatures.get(keypair.address()).ok_or_else(|| {
                    WalletError::Crypto(format!("no signature for {}", keypair.address()))
                })?;
                if !verify_signature(&keypair.public_key_hex(), message.as_bytes(), signature)? {
                    return Err(WalletError::Crypto(format!(
                        "signature verification failed for {}",
                        keypair.address()
                    )));
                }
            }
            Ok(ClientResponse::success("Successfully verified message", None))
        });
        respond("verify_message", result)
    }
}
