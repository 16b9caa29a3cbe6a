//! An in-memory stand-in for a pair of cnd nodes.
//!
//! The two fake nodes share one network state: a swap created on one
//! becomes visible on both, with role-dependent representations, and
//! executing an action advances the swap the way the real nodes would
//! (eventually) report it.

#![allow(dead_code)]

use async_trait::async_trait;
use cnd_client::{
    action::{ActionKind, BuildPolicy, BuiltRequest},
    client::{ApiClient, Error, PeerInfo},
    config::CndSettings,
    correlate::{Ambiguity, CorrelationConfig},
    ledger::{AssetDescription, AssetKind, LedgerKind, Quantity},
    poll::PollConfig,
    swap::{
        Communication, CommunicationStatus, HtlcState, LedgerState, Role, Side, SwapProperties,
        SwapRequestBody, SwapState, SwapStatus,
    },
    wallet::{Wallet, Wallets},
    Actor, Actors, SecretHash, Settings, Timestamp,
};
use std::{
    collections::HashMap,
    sync::{
        atomic::{AtomicUsize, Ordering},
        Arc, Mutex,
    },
    time::Duration,
};
use url::Url;

pub struct FakeNetwork {
    state: Mutex<NetworkState>,
}

#[derive(Default)]
struct NetworkState {
    swaps: Vec<FakeSwap>,
    /// Fetches of Bob's representation before the accept action shows
    /// up, simulating the lag between request and availability.
    accept_visible_after: usize,
}

struct FakeSwap {
    id: String,
    secret_hash: SecretHash,
    communication: CommunicationStatus,
    alpha: HtlcState,
    beta: HtlcState,
    alpha_expiry: Timestamp,
    beta_expiry: Timestamp,
    alpha_asset: AssetDescription,
    beta_asset: AssetDescription,
    accept_visible_after: usize,
    bob_fetches: usize,
}

impl FakeSwap {
    fn overall_status(&self) -> SwapStatus {
        if self.alpha == HtlcState::Redeemed && self.beta == HtlcState::Redeemed {
            SwapStatus::Swapped
        } else if self.alpha == HtlcState::Refunded || self.beta == HtlcState::Refunded {
            SwapStatus::NotSwapped
        } else {
            SwapStatus::InProgress
        }
    }

    fn ledger(&self, side: Side) -> HtlcState {
        match side {
            Side::Alpha => self.alpha,
            Side::Beta => self.beta,
        }
    }

    fn set_ledger(&mut self, side: Side, status: HtlcState) {
        match side {
            Side::Alpha => self.alpha = status,
            Side::Beta => self.beta = status,
        }
    }

    fn asset(&self, side: Side) -> AssetDescription {
        match side {
            Side::Alpha => self.alpha_asset,
            Side::Beta => self.beta_asset,
        }
    }

    fn ledger_kind(&self, side: Side) -> LedgerKind {
        self.asset(side).name.ledger()
    }
}

impl Default for FakeNetwork {
    fn default() -> Self {
        Self {
            state: Mutex::new(NetworkState::default()),
        }
    }
}

impl FakeNetwork {
    /// Delay the accept action by this many fetches of Bob's resource.
    pub fn delay_accept_by(&self, fetches: usize) {
        self.state().accept_visible_after = fetches;
    }

    /// Plant a swap with the given secret hash, unrelated to whatever
    /// the actors are doing.
    pub fn seed_decoy_swap(&self, secret_hash: SecretHash) {
        let mut state = self.state();

        let swap = FakeSwap {
            id: uuid::Uuid::new_v4().to_string(),
            secret_hash,
            communication: CommunicationStatus::Sent,
            alpha: HtlcState::NotDeployed,
            beta: HtlcState::NotDeployed,
            alpha_expiry: Timestamp::now().plus(8),
            beta_expiry: Timestamp::now().plus(3),
            alpha_asset: zero_asset(AssetKind::Bitcoin),
            beta_asset: zero_asset(AssetKind::Ether),
            accept_visible_after: usize::MAX,
            bob_fetches: 0,
        };

        state.swaps.push(swap);
    }

    fn state(&self) -> std::sync::MutexGuard<'_, NetworkState> {
        self.state.lock().unwrap()
    }
}

fn zero_asset(kind: AssetKind) -> AssetDescription {
    AssetDescription {
        name: kind,
        quantity: Quantity::zero(),
    }
}

/// One actor's view of the fake network, implementing the same API the
/// real node serves.
pub struct FakeCnd {
    role: Role,
    peer_id: String,
    base_url: Url,
    network: Arc<FakeNetwork>,
    bitcoin: Arc<StubWallet>,
    ethereum: Arc<StubWallet>,
}

impl FakeCnd {
    pub fn new(
        role: Role,
        peer_id: &str,
        network: Arc<FakeNetwork>,
        bitcoin: Arc<StubWallet>,
        ethereum: Arc<StubWallet>,
    ) -> Self {
        let host = match role {
            Role::Alice => "http://alice.cnd.local:8000",
            Role::Bob => "http://bob.cnd.local:8000",
        };

        Self {
            role,
            peer_id: peer_id.to_owned(),
            base_url: host.parse().unwrap(),
            network,
            bitcoin,
            ethereum,
        }
    }

    fn wallet(&self, ledger: LedgerKind) -> &Arc<StubWallet> {
        match ledger {
            LedgerKind::Bitcoin => &self.bitcoin,
            LedgerKind::Ethereum => &self.ethereum,
        }
    }

    fn swap_path(id: &str) -> String {
        format!("/swaps/rfc003/{}", id)
    }

    fn collection_entity(&self, state: &NetworkState) -> siren::Entity {
        let mut collection = siren::Entity::default().with_class_member("swaps");

        for swap in &state.swaps {
            collection.push_sub_entity(siren::SubEntity::from_link(siren::EntityLink {
                class: vec![],
                title: None,
                rel: vec!["item".to_owned()],
                href: Self::swap_path(&swap.id),
                _type: None,
            }));
        }

        collection
    }

    fn swap_entity(&self, swap: &FakeSwap) -> siren::Entity {
        let properties = SwapProperties {
            role: self.role,
            status: swap.overall_status(),
            state: SwapState {
                communication: Communication {
                    status: swap.communication,
                    alpha_expiry: swap.alpha_expiry,
                    beta_expiry: swap.beta_expiry,
                    secret_hash: swap.secret_hash,
                },
                alpha_ledger: LedgerState { status: swap.alpha },
                beta_ledger: LedgerState { status: swap.beta },
            },
        };

        let mut entity = siren::Entity::default()
            .with_class_member("swap")
            .with_properties(properties)
            .unwrap()
            .with_link(siren::NavigationalLink::new(
                &["self"],
                Self::swap_path(&swap.id),
            ));

        for action in self.available_actions(swap) {
            entity = entity.with_action(action);
        }

        entity
    }

    fn available_actions(&self, swap: &FakeSwap) -> Vec<siren::Action> {
        let mut actions = Vec::new();

        if self.role == Role::Bob
            && swap.communication == CommunicationStatus::Sent
            && swap.bob_fetches >= swap.accept_visible_after
        {
            actions.push(siren::Action {
                name: ActionKind::Accept.to_string(),
                class: vec![],
                method: http::Method::POST,
                href: format!("{}/accept", Self::swap_path(&swap.id)),
                _type: Some("application/json".to_owned()),
                fields: vec![field(
                    "beta_ledger_refund_identity",
                    &["ethereum", "address"],
                )],
                title: None,
            });
        }

        if swap.communication == CommunicationStatus::Accepted {
            let funding_side = Side::funded_by(self.role);
            if swap.ledger(funding_side) == HtlcState::NotDeployed {
                actions.push(simple_action(
                    ActionKind::Fund,
                    &swap.id,
                    swap.ledger_kind(funding_side),
                ));
            }

            let redeeming_side = Side::redeemed_by(self.role);
            if swap.ledger(redeeming_side) == HtlcState::Funded {
                actions.push(simple_action(
                    ActionKind::Redeem,
                    &swap.id,
                    swap.ledger_kind(redeeming_side),
                ));
            }

            if swap.ledger(funding_side) == HtlcState::Funded {
                actions.push(simple_action(
                    ActionKind::Refund,
                    &swap.id,
                    swap.ledger_kind(funding_side),
                ));
            }
        }

        actions
    }
}

fn field(name: &str, class: &[&str]) -> siren::Field {
    siren::Field {
        name: name.to_owned(),
        class: class.iter().map(|class| (*class).to_owned()).collect(),
        _type: Some("text".to_owned()),
        value: None,
        title: None,
    }
}

/// Fund, redeem and refund the way cnd describes them: bitcoin actions
/// are GETs parameterized with an address and a fee rate, ethereum
/// actions are plain JSON POSTs.
fn simple_action(kind: ActionKind, swap_id: &str, ledger: LedgerKind) -> siren::Action {
    let href = format!("{}/{}", FakeCnd::swap_path(swap_id), kind);

    match ledger {
        LedgerKind::Bitcoin => siren::Action {
            name: kind.to_string(),
            class: vec![],
            method: http::Method::GET,
            href,
            _type: None,
            fields: match kind {
                // Funding goes to a fresh HTLC address the node provides.
                ActionKind::Fund => vec![],
                _ => vec![
                    field("address", &["bitcoin", "address"]),
                    field("fee_per_wu", &["bitcoin", "feePerWU"]),
                ],
            },
            title: None,
        },
        LedgerKind::Ethereum => siren::Action {
            name: kind.to_string(),
            class: vec![],
            method: http::Method::POST,
            href,
            _type: Some("application/json".to_owned()),
            fields: vec![],
            title: None,
        },
    }
}

#[async_trait]
impl ApiClient for FakeCnd {
    fn base_url(&self) -> &Url {
        &self.base_url
    }

    async fn get_entity(&self, url: &Url) -> Result<siren::Entity, Error> {
        let mut state = self.network.state();

        if url.path() == "/swaps" {
            return Ok(self.collection_entity(&state));
        }

        let id = url
            .path()
            .strip_prefix("/swaps/rfc003/")
            .unwrap_or_default()
            .to_owned();

        let swap = state
            .swaps
            .iter_mut()
            .find(|swap| swap.id == id)
            .ok_or_else(|| Error::UnexpectedStatus {
                url: url.clone(),
                status: http::StatusCode::NOT_FOUND,
            })?;

        if self.role == Role::Bob {
            swap.bob_fetches += 1;
        }

        Ok(self.swap_entity(swap))
    }

    async fn create_swap(&self, body: &SwapRequestBody) -> Result<Url, Error> {
        let mut state = self.network.state();

        let accept_visible_after = state.accept_visible_after;
        let swap = FakeSwap {
            id: uuid::Uuid::new_v4().to_string(),
            secret_hash: SecretHash::from(rand::random::<[u8; 32]>()),
            communication: CommunicationStatus::Sent,
            alpha: HtlcState::NotDeployed,
            beta: HtlcState::NotDeployed,
            alpha_expiry: body.alpha_expiry,
            beta_expiry: body.beta_expiry,
            alpha_asset: body.alpha_asset,
            beta_asset: body.beta_asset,
            accept_visible_after,
            bob_fetches: 0,
        };

        let location = self.base_url.join(&FakeCnd::swap_path(&swap.id))?;

        state.swaps.push(swap);

        Ok(location)
    }

    async fn execute(&self, request: &BuiltRequest) -> Result<(), Error> {
        let path = request.url.path().to_owned();
        let mut segments = path.trim_start_matches('/').split('/');

        let (id, action) = match (
            segments.next(),
            segments.next(),
            segments.next(),
            segments.next(),
        ) {
            (Some("swaps"), Some("rfc003"), Some(id), Some(action)) => (id, action),
            _ => {
                return Err(Error::UnexpectedStatus {
                    url: request.url.clone(),
                    status: http::StatusCode::NOT_FOUND,
                })
            }
        };

        let not_found = || Error::UnexpectedStatus {
            url: request.url.clone(),
            status: http::StatusCode::NOT_FOUND,
        };
        let bad_request = || Error::UnexpectedStatus {
            url: request.url.clone(),
            status: http::StatusCode::BAD_REQUEST,
        };

        let mut state = self.network.state();
        let swap = state
            .swaps
            .iter_mut()
            .find(|swap| swap.id == id)
            .ok_or_else(not_found)?;

        match action {
            "accept" => {
                if self.role != Role::Bob || swap.communication != CommunicationStatus::Sent {
                    return Err(bad_request());
                }

                let has_refund_identity = request
                    .body
                    .as_ref()
                    .and_then(|body| body.get("beta_ledger_refund_identity"))
                    .is_some();
                if !has_refund_identity {
                    return Err(bad_request());
                }

                swap.communication = CommunicationStatus::Accepted;
            }
            "fund" => {
                let side = Side::funded_by(self.role);
                if swap.ledger(side) != HtlcState::NotDeployed {
                    return Err(bad_request());
                }

                swap.set_ledger(side, HtlcState::Funded);

                let asset = swap.asset(side);
                self.wallet(asset.name.ledger()).debit(asset.quantity);
            }
            "redeem" => {
                let side = Side::redeemed_by(self.role);
                if swap.ledger(side) != HtlcState::Funded {
                    return Err(bad_request());
                }

                if swap.ledger_kind(side) == LedgerKind::Bitcoin {
                    expect_bitcoin_parameters(request)?;
                }

                swap.set_ledger(side, HtlcState::Redeemed);

                let asset = swap.asset(side);
                self.wallet(asset.name.ledger()).credit(asset.quantity);
            }
            "refund" => {
                let side = Side::funded_by(self.role);
                if swap.ledger(side) != HtlcState::Funded {
                    return Err(bad_request());
                }

                if swap.ledger_kind(side) == LedgerKind::Bitcoin {
                    expect_bitcoin_parameters(request)?;
                }

                swap.set_ledger(side, HtlcState::Refunded);

                let asset = swap.asset(side);
                self.wallet(asset.name.ledger()).credit(asset.quantity);
            }
            _ => return Err(not_found()),
        }

        Ok(())
    }

    async fn peer_info(&self) -> Result<PeerInfo, Error> {
        Ok(PeerInfo {
            id: self.peer_id.clone(),
            listen_addresses: vec!["/ip4/127.0.0.1/tcp/9939".to_owned()],
        })
    }
}

/// Bitcoin redeems and refunds are parameterized via the query string.
fn expect_bitcoin_parameters(request: &BuiltRequest) -> Result<(), Error> {
    let query: HashMap<String, String> =
        serde_urlencoded::from_str(request.url.query().unwrap_or_default()).unwrap_or_default();

    if query.contains_key("address") && query.contains_key("fee_per_wu") {
        Ok(())
    } else {
        Err(Error::UnexpectedStatus {
            url: request.url.clone(),
            status: http::StatusCode::BAD_REQUEST,
        })
    }
}

/// A wallet with a scripted balance and a ledger clock that advances a
/// fixed amount every time it is read.
pub struct StubWallet {
    ledger: LedgerKind,
    balance: Mutex<Quantity>,
    time: Mutex<Timestamp>,
    time_step: u32,
    time_queries: AtomicUsize,
    identities: AtomicUsize,
    max_fee: Quantity,
}

impl StubWallet {
    pub fn bitcoin() -> Arc<Self> {
        Arc::new(Self {
            ledger: LedgerKind::Bitcoin,
            balance: Mutex::new(Quantity::zero()),
            time: Mutex::new(Timestamp::now()),
            time_step: 5,
            time_queries: AtomicUsize::new(0),
            identities: AtomicUsize::new(0),
            max_fee: Quantity::new(2_000),
        })
    }

    pub fn ethereum() -> Arc<Self> {
        Arc::new(Self {
            ledger: LedgerKind::Ethereum,
            balance: Mutex::new(Quantity::zero()),
            time: Mutex::new(Timestamp::now()),
            time_step: 5,
            time_queries: AtomicUsize::new(0),
            identities: AtomicUsize::new(0),
            max_fee: Quantity::new(1_000_000_000_000_000),
        })
    }

    pub fn credit(&self, amount: Quantity) {
        let mut balance = self.balance.lock().unwrap();
        *balance = balance
            .checked_add(amount)
            .expect("stub balance does not overflow");
    }

    pub fn debit(&self, amount: Quantity) {
        let mut balance = self.balance.lock().unwrap();
        *balance = balance.saturating_sub(amount);
    }

    pub fn time_queries(&self) -> usize {
        self.time_queries.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Wallet for StubWallet {
    async fn new_identity(&self) -> anyhow::Result<String> {
        let n = self.identities.fetch_add(1, Ordering::SeqCst);

        Ok(match self.ledger {
            LedgerKind::Bitcoin => format!("bcrt1qstub{:026}", n),
            LedgerKind::Ethereum => format!("0x{:040x}", n),
        })
    }

    async fn balance(&self) -> anyhow::Result<Quantity> {
        Ok(*self.balance.lock().unwrap())
    }

    async fn ledger_time(&self) -> anyhow::Result<Timestamp> {
        self.time_queries.fetch_add(1, Ordering::SeqCst);

        let mut time = self.time.lock().unwrap();
        let current = *time;
        *time = current.plus(self.time_step);

        Ok(current)
    }

    async fn mint(&self, amount: Quantity) -> anyhow::Result<()> {
        self.credit(amount);

        Ok(())
    }

    fn max_fee(&self) -> Quantity {
        self.max_fee
    }
}

pub struct TestWorld {
    pub actors: Actors,
    pub network: Arc<FakeNetwork>,
    pub alice_bitcoin: Arc<StubWallet>,
    pub alice_ethereum: Arc<StubWallet>,
    pub bob_bitcoin: Arc<StubWallet>,
    pub bob_ethereum: Arc<StubWallet>,
}

/// Two actors, each with their own fake node, on one shared network.
pub fn create_actors() -> TestWorld {
    let network = Arc::new(FakeNetwork::default());

    let alice_bitcoin = StubWallet::bitcoin();
    let alice_ethereum = StubWallet::ethereum();
    let bob_bitcoin = StubWallet::bitcoin();
    let bob_ethereum = StubWallet::ethereum();

    let alice = actor(
        "alice",
        Role::Alice,
        "QmAliceTestPeerIdXXXXXXXXXXXXXXXXXXXXXXXXXXXXXX",
        &network,
        &alice_bitcoin,
        &alice_ethereum,
    );
    let bob = actor(
        "bob",
        Role::Bob,
        "QmBobTestPeerIdXXXXXXXXXXXXXXXXXXXXXXXXXXXXXXXX",
        &network,
        &bob_bitcoin,
        &bob_ethereum,
    );

    TestWorld {
        actors: Actors::new(alice, bob),
        network,
        alice_bitcoin,
        alice_ethereum,
        bob_bitcoin,
        bob_ethereum,
    }
}

fn actor(
    name: &str,
    role: Role,
    peer_id: &str,
    network: &Arc<FakeNetwork>,
    bitcoin: &Arc<StubWallet>,
    ethereum: &Arc<StubWallet>,
) -> Actor {
    let client = FakeCnd::new(
        role,
        peer_id,
        network.clone(),
        bitcoin.clone(),
        ethereum.clone(),
    );

    let mut wallets = Wallets::new();
    wallets.insert(LedgerKind::Bitcoin, bitcoin.clone());
    wallets.insert(LedgerKind::Ethereum, ethereum.clone());

    Actor::new(name, Arc::new(client), wallets, test_settings())
}

/// Tight pacing so the suite runs quickly; same structure as the
/// defaults the library ships.
fn test_settings() -> Settings {
    Settings {
        cnd: CndSettings::default(),
        poll: PollConfig {
            interval: Duration::from_millis(100),
            timeout: Duration::from_secs(5),
        },
        correlation: CorrelationConfig {
            backoff: Duration::from_millis(50),
            ambiguity: Ambiguity::Deny,
        },
        action: BuildPolicy::default(),
    }
}
