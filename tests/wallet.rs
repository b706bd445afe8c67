use std::collections::{BTreeMap, HashMap};
use std::net::SocketAddr;
use std::sync::Arc;

use axum::extract::State;
use axum::http::{HeaderMap, StatusCode};
use axum::routing::{delete, get, post};
use axum::{Json, Router};
use serde_json::{json, Value};
use tokio::sync::Mutex;

use twoway_lib::network::relay::{RelayDelBody, RelayGetBody, RelaySetBody};
use twoway_lib::pow::{meets_difficulty, CACHE_ID_HEADER, NONCE_HEADER};
use twoway_lib::{ClientConfig, ClientContent, ClientResponse, ClientStatus, KeyVault, Wallet};
use twoway_sdk::keys::{construct_address, AddressVersion};
use twoway_sdk::testing::{fixture_keypairs, fixture_snapshot, FIXTURE_ADDRESSES};
use twoway_sdk::{
    verify_signature, Asset, BalanceSnapshot, EncryptedKeypair, FinalizeReport, ItemCreationPayload,
    KeyPair, OutPoint, OutPointValue, SwapStatus, Transaction,
};

const PASSPHRASE: &str = "test";

// ── Mock node ───────────────────────────────────────────────────────────

#[derive(Default)]
struct Ledger {
    utxos: Vec<(String, OutPointValue)>,
    submitted: Vec<Transaction>,
    relay: HashMap<String, BTreeMap<String, Value>>,
    next_tx: u32,
}

struct NodeState {
    difficulty: usize,
    ledger: Mutex<Ledger>,
}

/// Mempool, storage and relay routes served from one local listener.
struct MockNode {
    addr: SocketAddr,
    state: Arc<NodeState>,
}

impl MockNode {
    async fn run(difficulty: usize) -> Self {
        let state = Arc::new(NodeState {
            difficulty,
            ledger: Mutex::new(Ledger::default()),
        });
        let app = Router::new()
            .route("/debug_data", get(debug_data))
            .route("/fetch_balance", post(fetch_balance))
            .route("/create_transactions", post(create_transactions))
            .route("/create_item_asset", post(create_item_asset))
            .route("/blockchain_entry", post(blockchain_entry))
            .route("/set_data", post(set_data))
            .route("/get_data", post(get_data))
            .route("/del_data", delete(del_data))
            .with_state(state.clone());

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        Self { addr, state }
    }

    fn url(&self) -> String {
        format!("http://{}", self.addr)
    }

    async fn seed(&self, snapshot: &BalanceSnapshot) {
        let mut ledger = self.state.ledger.lock().await;
        for (address, outputs) in snapshot.address_list.iter() {
            for output in outputs {
                ledger.utxos.push((address.to_string(), output.clone()));
            }
        }
    }

    async fn submitted(&self) -> Vec<Transaction> {
        self.state.ledger.lock().await.submitted.clone()
    }

    async fn relay_len(&self, address: &str) -> usize {
        self.state
            .ledger
            .lock()
            .await
            .relay
            .get(address)
            .map_or(0, BTreeMap::len)
    }
}

fn ok(route: &str, reason: &str, content: Value) -> Json<Value> {
    Json(json!({
        "id": "mock",
        "status": "Success",
        "reason": reason,
        "route": route,
        "content": content,
    }))
}

fn failed(route: &str, reason: &str) -> Json<Value> {
    Json(json!({ "id": "mock", "status": "Error", "reason": reason, "route": route }))
}

fn has_valid_pow(headers: &HeaderMap, difficulty: usize) -> bool {
    let id = headers.get(CACHE_ID_HEADER).and_then(|v| v.to_str().ok());
    let nonce = headers
        .get(NONCE_HEADER)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.parse::<u64>().ok());
    matches!((id, nonce), (Some(id), Some(nonce)) if id.len() == 32 && meets_difficulty(id, nonce, difficulty))
}

async fn debug_data(State(node): State<Arc<NodeState>>) -> Json<Value> {
    ok(
        "debug_data",
        "Debug data successfully retrieved",
        json!({
            "node_type": "Mempool",
            "node_api": [],
            "node_peers": [],
            "routes_pow": { "create_transactions": node.difficulty },
        }),
    )
}

async fn fetch_balance(
    State(node): State<Arc<NodeState>>,
    Json(addresses): Json<Vec<String>>,
) -> Json<Value> {
    let ledger = node.ledger.lock().await;
    let entries: Vec<(String, Vec<OutPointValue>)> = addresses
        .iter()
        .map(|address| {
            let outputs = ledger
                .utxos
                .iter()
                .filter(|(owner, _)| owner == address)
                .map(|(_, output)| output.clone())
                .collect();
            (address.clone(), outputs)
        })
        .collect();
    let snapshot = BalanceSnapshot::from_entries(entries);
    ok(
        "fetch_balance",
        "Balance successfully fetched",
        serde_json::to_value(snapshot).unwrap(),
    )
}

async fn create_transactions(
    State(node): State<Arc<NodeState>>,
    headers: HeaderMap,
    Json(transactions): Json<Vec<Transaction>>,
) -> Json<Value> {
    if !has_valid_pow(&headers, node.difficulty) {
        return failed("create_transactions", "Invalid proof of work");
    }
    let mut ledger = node.ledger.lock().await;
    for tx in &transactions {
        for input in &tx.inputs {
            let unspent = input.previous_out.as_ref().is_some_and(|previous| {
                ledger.utxos.iter().any(|(_, o)| &o.out_point == previous)
            });
            if !unspent {
                return failed("create_transactions", "Invalid transaction");
            }
        }
    }

    let mut content = serde_json::Map::new();
    for tx in transactions {
        let hash = format!("g{:031x}", ledger.next_tx);
        ledger.next_tx += 1;
        ledger.utxos.retain(|(_, o)| {
            !tx.inputs
                .iter()
                .any(|i| i.previous_out.as_ref() == Some(&o.out_point))
        });
        for (n, out) in tx.outputs.iter().enumerate() {
            ledger.utxos.push((
                out.script_public_key.clone(),
                OutPointValue {
                    out_point: OutPoint::new(hash.clone(), n as u32),
                    value: out.value.clone(),
                },
            ));
        }
        if let Some(first) = tx.outputs.first() {
            content.insert(
                hash,
                json!([first.script_public_key, { "asset": first.value, "metadata": null }]),
            );
        }
        ledger.submitted.push(tx);
    }
    ok("create_transactions", "Transaction(s) processing", Value::Object(content))
}

async fn create_item_asset(Json(payload): Json<ItemCreationPayload>) -> Json<Value> {
    ok(
        "create_item_asset",
        "Item asset(s) created",
        json!({
            "to_address": payload.script_public_key,
            "item_amount": payload.item_amount,
            "genesis_hash_spec": payload.genesis_hash_spec,
        }),
    )
}

async fn blockchain_entry(Json(hashes): Json<Vec<String>>) -> Json<Value> {
    let entries: serde_json::Map<String, Value> = hashes
        .into_iter()
        .map(|hash| (hash, json!({ "Transaction": { "version": 2 } })))
        .collect();
    ok(
        "blockchain_entry",
        "Database item(s) successfully retrieved",
        Value::Object(entries),
    )
}

fn signed(key: &str, public_key: &str, signature: &str) -> bool {
    hex::decode(key)
        .ok()
        .and_then(|bytes| verify_signature(public_key, &bytes, signature).ok())
        .unwrap_or(false)
}

fn owns(key: &str, public_key: &str) -> bool {
    hex::decode(public_key)
        .map(|pk| construct_address(&pk, AddressVersion::Default) == key)
        .unwrap_or(false)
}

async fn set_data(
    State(node): State<Arc<NodeState>>,
    Json(body): Json<RelaySetBody<Value>>,
) -> Result<Json<Value>, StatusCode> {
    if !signed(&body.key, &body.public_key, &body.signature) {
        return Err(StatusCode::UNAUTHORIZED);
    }
    let mut ledger = node.ledger.lock().await;
    ledger
        .relay
        .entry(body.key)
        .or_default()
        .insert(body.field, json!({ "timestamp": 0, "value": body.value }));
    Ok(Json(json!({})))
}

async fn get_data(
    State(node): State<Arc<NodeState>>,
    Json(body): Json<RelayGetBody>,
) -> Result<Json<Value>, StatusCode> {
    if !signed(&body.key, &body.public_key, &body.signature) || !owns(&body.key, &body.public_key)
    {
        return Err(StatusCode::UNAUTHORIZED);
    }
    let ledger = node.ledger.lock().await;
    let fields: serde_json::Map<String, Value> = ledger
        .relay
        .get(&body.key)
        .map(|entries| entries.clone().into_iter().collect())
        .unwrap_or_default();
    Ok(Json(Value::Object(fields)))
}

async fn del_data(
    State(node): State<Arc<NodeState>>,
    Json(body): Json<RelayDelBody>,
) -> Result<Json<Value>, StatusCode> {
    if !signed(&body.key, &body.public_key, &body.signature) || !owns(&body.key, &body.public_key)
    {
        return Err(StatusCode::UNAUTHORIZED);
    }
    let mut ledger = node.ledger.lock().await;
    if let Some(entries) = ledger.relay.get_mut(&body.key) {
        entries.remove(&body.field);
    }
    Ok(Json(json!({})))
}

// ── Helpers ─────────────────────────────────────────────────────────────

async fn open_wallet(node: &MockNode, passphrase: &str, with_relay: bool) -> Wallet {
    let mut wallet = Wallet::new();
    let response = wallet
        .init_network(ClientConfig {
            mempool_host: node.url(),
            storage_host: Some(format!("{}/", node.url())),
            relay_host: with_relay.then(|| node.url()),
            passphrase: passphrase.into(),
        })
        .await;
    assert!(response.is_success(), "{:?}", response.reason);
    wallet
}

fn sealed_fixtures() -> Vec<EncryptedKeypair> {
    let vault = KeyVault::new(PASSPHRASE);
    let keypairs = fixture_keypairs();
    FIXTURE_ADDRESSES
        .iter()
        .map(|address| vault.encrypt_keypair(keypairs.get(address).unwrap()).unwrap())
        .collect()
}

fn content(response: ClientResponse) -> ClientContent {
    assert!(response.is_success(), "{:?}", response.reason);
    response.content.expect("response has content")
}

fn report(response: ClientResponse) -> FinalizeReport {
    match content(response) {
        ClientContent::FetchPending2WayResponse(report) => report,
        other => panic!("unexpected content: {other:?}"),
    }
}

async fn balance_of(wallet: &Wallet, address: &str) -> BalanceSnapshot {
    match content(wallet.fetch_balance(&[address.to_string()]).await) {
        ClientContent::FetchBalanceResponse(snapshot) => snapshot,
        other => panic!("unexpected content: {other:?}"),
    }
}

// ── Payments ────────────────────────────────────────────────────────────

#[tokio::test]
async fn token_payment_reaches_the_mempool() {
    let node = MockNode::run(1).await;
    node.seed(&fixture_snapshot()).await;
    let wallet = open_wallet(&node, PASSPHRASE, false).await;
    let sealed = sealed_fixtures();
    let recipient = KeyPair::generate(AddressVersion::Default);

    let response = wallet
        .make_token_payment(recipient.address(), 55, &sealed, &sealed[2], 0)
        .await;
    let ClientContent::MakePaymentResponse(payment) = content(response) else {
        panic!("expected a payment response");
    };
    assert_eq!(payment.payment_address, recipient.address());
    assert_eq!(payment.asset, Asset::token(55));
    // 10 + 50 from the first two keypairs covers the payment.
    assert_eq!(
        payment.used_addresses,
        vec![FIXTURE_ADDRESSES[0].to_string(), FIXTURE_ADDRESSES[1].to_string()]
    );

    let submitted = node.submitted().await;
    assert_eq!(submitted.len(), 1);
    assert_eq!(submitted[0].inputs.len(), 2);
    assert_eq!(submitted[0].outputs[1].value, Asset::token(5));
    assert_eq!(submitted[0].outputs[1].script_public_key, FIXTURE_ADDRESSES[2]);

    assert_eq!(balance_of(&wallet, recipient.address()).await.total.tokens, 55);
}

#[tokio::test]
async fn payment_spends_keypairs_in_the_order_given() {
    let node = MockNode::run(0).await;
    node.seed(&fixture_snapshot()).await;
    let wallet = open_wallet(&node, PASSPHRASE, false).await;
    let mut sealed = sealed_fixtures();
    sealed.reverse();
    let recipient = KeyPair::generate(AddressVersion::Default);

    let response = wallet
        .make_token_payment(recipient.address(), 55, &sealed, &sealed[2], 0)
        .await;
    let ClientContent::MakePaymentResponse(payment) = content(response) else {
        panic!("expected a payment response");
    };
    // The third fixture now comes first and covers 55 on its own.
    assert_eq!(payment.used_addresses, vec![FIXTURE_ADDRESSES[2].to_string()]);

    let submitted = node.submitted().await;
    assert_eq!(submitted[0].inputs.len(), 1);
    assert_eq!(submitted[0].outputs[1].value, Asset::token(945));
    assert_eq!(submitted[0].outputs[1].script_public_key, FIXTURE_ADDRESSES[0]);
}

#[tokio::test]
async fn unfunded_payment_is_refused_locally() {
    let node = MockNode::run(0).await;
    node.seed(&fixture_snapshot()).await;
    let wallet = open_wallet(&node, PASSPHRASE, false).await;
    let sealed = sealed_fixtures();

    let response = wallet
        .make_token_payment(FIXTURE_ADDRESSES[0], 5_000, &sealed, &sealed[0], 0)
        .await;
    assert_eq!(response.status, ClientStatus::Error);
    assert_eq!(response.reason.as_deref(), Some("Insufficient funds"));
    assert!(node.submitted().await.is_empty());
}

#[tokio::test]
async fn item_payment_keeps_genesis_hash() {
    let node = MockNode::run(0).await;
    node.seed(&fixture_snapshot()).await;
    let wallet = open_wallet(&node, PASSPHRASE, false).await;
    let sealed = sealed_fixtures();
    let recipient = KeyPair::generate(AddressVersion::Default);

    let response = wallet
        .make_item_payment(
            recipient.address(),
            1,
            twoway_sdk::DEFAULT_GENESIS_HASH,
            &sealed,
            &sealed[0],
            None,
            0,
        )
        .await;
    assert!(response.is_success(), "{:?}", response.reason);

    let received = balance_of(&wallet, recipient.address()).await;
    assert_eq!(
        received.total.items.get(twoway_sdk::DEFAULT_GENESIS_HASH),
        Some(&1)
    );
}

#[tokio::test]
async fn item_payment_rejects_malformed_genesis_hash() {
    let node = MockNode::run(0).await;
    node.seed(&fixture_snapshot()).await;
    let wallet = open_wallet(&node, PASSPHRASE, false).await;
    let sealed = sealed_fixtures();

    let response = wallet
        .make_item_payment(
            FIXTURE_ADDRESSES[1],
            1,
            "not_a_hash",
            &sealed,
            &sealed[0],
            None,
            0,
        )
        .await;
    assert_eq!(response.status, ClientStatus::Error);
    assert!(
        response.reason.as_deref().unwrap().contains("malformed transaction hash"),
        "{:?}",
        response.reason
    );
    assert!(node.submitted().await.is_empty());
}

// ── Items, entries and messages ─────────────────────────────────────────

#[tokio::test]
async fn items_and_blockchain_entries() {
    let node = MockNode::run(0).await;
    let wallet = open_wallet(&node, PASSPHRASE, false).await;
    let sealed = sealed_fixtures();

    let ClientContent::CreateItemResponse(created) =
        content(wallet.create_items(&sealed[0], true, 1000, None).await)
    else {
        panic!("expected an item response");
    };
    assert_eq!(created["to_address"], FIXTURE_ADDRESSES[0]);
    assert_eq!(created["item_amount"], 1000);

    let hash = "g48dda5bbe9171a6656206ec56c595c5".to_string();
    let ClientContent::FetchTransactionsResponse(entries) =
        content(wallet.fetch_transactions(&[hash.clone()]).await)
    else {
        panic!("expected entries");
    };
    assert!(entries.get(&hash).is_some());
}

#[tokio::test]
async fn entries_need_a_storage_host() {
    let node = MockNode::run(0).await;
    let mut wallet = Wallet::new();
    let response = wallet
        .init_network(ClientConfig {
            mempool_host: node.url(),
            passphrase: PASSPHRASE.into(),
            ..ClientConfig::default()
        })
        .await;
    assert!(response.is_success());

    let response = wallet
        .fetch_transactions(&["g48dda5bbe9171a6656206ec56c595c5".into()])
        .await;
    assert_eq!(response.reason.as_deref(), Some("Storage host not configured"));
}

#[tokio::test]
async fn malformed_entry_hashes_are_refused() {
    let node = MockNode::run(0).await;
    let wallet = open_wallet(&node, PASSPHRASE, false).await;

    for hash in ["g1", "", "G48dda5bbe9171a6656206ec56c595c5"] {
        let response = wallet.fetch_transactions(&[hash.to_string()]).await;
        assert_eq!(response.status, ClientStatus::Error, "{hash:?}");
        assert!(response.content.is_none());
    }
}

#[tokio::test]
async fn signed_messages_verify() {
    let node = MockNode::run(0).await;
    let wallet = open_wallet(&node, PASSPHRASE, false).await;
    let sealed = sealed_fixtures();

    let ClientContent::SignMessageResponse(signatures) =
        content(wallet.sign_message(&sealed[..2], "hello"))
    else {
        panic!("expected signatures");
    };
    assert_eq!(signatures.len(), 2);

    assert!(wallet.verify_message("hello", &signatures, &sealed[..2]).is_success());
    let tampered = wallet.verify_message("hullo", &signatures, &sealed[..2]);
    assert_eq!(tampered.status, ClientStatus::Error);
    let missing = wallet.verify_message("hello", &signatures, &sealed);
    assert_eq!(missing.status, ClientStatus::Error);
}

#[tokio::test]
async fn generated_keypairs_decrypt_under_the_session_passphrase() {
    let node = MockNode::run(0).await;
    let wallet = open_wallet(&node, PASSPHRASE, false).await;

    let ClientContent::NewKeypairResponse(sealed) =
        content(wallet.generate_keypair(AddressVersion::Default))
    else {
        panic!("expected a keypair");
    };
    let ClientContent::DecryptKeypairResponse(view) = content(wallet.decrypt_keypair(&sealed))
    else {
        panic!("expected a keypair view");
    };
    assert_eq!(view.address, sealed.address);

    let foreign = KeyVault::new("other")
        .encrypt_keypair(&KeyPair::generate(AddressVersion::Default))
        .unwrap();
    let response = wallet.decrypt_keypair(&foreign);
    assert_eq!(response.reason.as_deref(), Some("Wrong passphrase"));

    let legacy = wallet.generate_keypair(AddressVersion::Legacy);
    assert_eq!(legacy.status, ClientStatus::Error);
}

// ── Two-way payments ────────────────────────────────────────────────────

struct Counterparty {
    keypair: KeyPair,
    sealed: EncryptedKeypair,
}

impl Counterparty {
    const PASSPHRASE: &'static str = "bob";

    async fn funded(node: &MockNode) -> Self {
        let keypair = KeyPair::generate(AddressVersion::Default);
        node.seed(&BalanceSnapshot::from_entries([(
            keypair.address().to_string(),
            vec![OutPointValue {
                out_point: OutPoint::new("b0b000", 0),
                value: Asset::item(1, "genesis_y", None),
            }],
        )]))
        .await;
        let sealed = KeyVault::new(Self::PASSPHRASE)
            .encrypt_keypair(&keypair)
            .unwrap();
        Self { keypair, sealed }
    }

    fn address(&self) -> &str {
        self.keypair.address()
    }
}

#[tokio::test]
async fn accepted_two_way_payment_settles_both_halves() {
    let node = MockNode::run(1).await;
    node.seed(&fixture_snapshot()).await;
    let bob = Counterparty::funded(&node).await;
    let alice_wallet = open_wallet(&node, PASSPHRASE, true).await;
    let bob_wallet = open_wallet(&node, Counterparty::PASSPHRASE, true).await;
    let alice = sealed_fixtures();

    let ClientContent::Make2WayPaymentResponse(proposal) = content(
        alice_wallet
            .make_2way_payment(
                bob.address(),
                &Asset::token(20),
                &Asset::item(1, "genesis_y", None),
                &alice,
                &alice[0],
            )
            .await,
    ) else {
        panic!("expected a proposal");
    };
    assert!(twoway_sdk::is_druid(&proposal.druid));
    assert_eq!(node.relay_len(bob.address()).await, 1);

    let inbox = report(
        bob_wallet
            .fetch_pending_2way_payments(&bob.sealed, &[])
            .await,
    );
    assert_eq!(inbox.pending.len(), 1);
    let pending = inbox.pending[0].clone();
    assert_eq!(pending.druid, proposal.druid);
    assert_eq!(pending.status, SwapStatus::Pending);

    let answer = bob_wallet
        .accept_2way_payment(&proposal.druid, &pending, &[bob.sealed.clone()])
        .await;
    assert!(answer.is_success(), "{:?}", answer.reason);
    assert_eq!(node.submitted().await.len(), 1);

    let settled = report(
        alice_wallet
            .fetch_pending_2way_payments(&alice[0], &[proposal.encrypted_tx])
            .await,
    );
    assert_eq!(settled.submitted, vec![proposal.druid.clone()]);
    assert_eq!(node.relay_len(FIXTURE_ADDRESSES[0]).await, 0);

    let submitted = node.submitted().await;
    assert_eq!(submitted.len(), 2);
    for tx in &submitted {
        let druid_info = tx.druid_info.as_ref().unwrap();
        assert_eq!(druid_info.druid, proposal.druid);
        assert_eq!(druid_info.participants, 2);
    }

    assert_eq!(balance_of(&alice_wallet, bob.address()).await.total.tokens, 20);
    let alice_items = balance_of(&alice_wallet, FIXTURE_ADDRESSES[0]).await.total.items;
    assert_eq!(alice_items.get("genesis_y"), Some(&1));
}

#[tokio::test]
async fn rejected_two_way_payment_is_discarded() {
    let node = MockNode::run(0).await;
    node.seed(&fixture_snapshot()).await;
    let bob = Counterparty::funded(&node).await;
    let alice_wallet = open_wallet(&node, PASSPHRASE, true).await;
    let bob_wallet = open_wallet(&node, Counterparty::PASSPHRASE, true).await;
    let alice = sealed_fixtures();

    let ClientContent::Make2WayPaymentResponse(proposal) = content(
        alice_wallet
            .make_2way_payment(
                bob.address(),
                &Asset::token(20),
                &Asset::item(1, "genesis_y", None),
                &alice,
                &alice[0],
            )
            .await,
    ) else {
        panic!("expected a proposal");
    };

    let inbox = report(
        bob_wallet
            .fetch_pending_2way_payments(&bob.sealed, &[])
            .await,
    );
    let answer = bob_wallet
        .reject_2way_payment(&proposal.druid, &inbox.pending[0], &[bob.sealed.clone()])
        .await;
    assert!(answer.is_success(), "{:?}", answer.reason);

    let settled = report(
        alice_wallet
            .fetch_pending_2way_payments(&alice[0], &[proposal.encrypted_tx])
            .await,
    );
    assert_eq!(settled.discarded, vec![proposal.druid]);
    assert!(settled.submitted.is_empty());
    assert!(node.submitted().await.is_empty());
    assert_eq!(node.relay_len(FIXTURE_ADDRESSES[0]).await, 0);
}

#[tokio::test]
async fn two_way_payments_need_a_relay() {
    let node = MockNode::run(0).await;
    let wallet = open_wallet(&node, PASSPHRASE, false).await;
    let alice = sealed_fixtures();

    let response = wallet
        .make_2way_payment(
            FIXTURE_ADDRESSES[1],
            &Asset::token(1),
            &Asset::token(1),
            &alice,
            &alice[0],
        )
        .await;
    assert_eq!(response.reason.as_deref(), Some("Relay host not configured"));
}

#[tokio::test]
async fn two_way_payment_needs_keypairs() {
    let node = MockNode::run(0).await;
    node.seed(&fixture_snapshot()).await;
    let wallet = open_wallet(&node, PASSPHRASE, true).await;
    let alice = sealed_fixtures();

    let response = wallet
        .make_2way_payment(
            FIXTURE_ADDRESSES[1],
            &Asset::token(1),
            &Asset::token(1),
            &[],
            &alice[0],
        )
        .await;
    assert_eq!(response.reason.as_deref(), Some("No key-pairs provided"));
    assert_eq!(node.relay_len(FIXTURE_ADDRESSES[1]).await, 0);
}
