use crate::{
    action::{self, ActionKind},
    client::ApiClient,
    config::Settings,
    correlate,
    ledger::{
        default_asset, default_expiries, default_ledger, AssetDescription, AssetKind,
        LedgerDescription, LedgerKind, Quantity,
    },
    poll,
    swap::{
        CommunicationStatus, DialInformation, HtlcState, Side, SwapProperties, SwapRequestBody,
        SwapStatus,
    },
    timestamp::Timestamp,
    wallet::{Wallet, Wallets},
};
use anyhow::{anyhow, Context, Result};
use std::{
    collections::HashMap,
    fmt,
    sync::{Arc, Mutex, MutexGuard, Weak},
    time::Duration,
};
use url::Url;

/// How often the blockchain-time oracle is consulted while waiting for
/// an expiry. There is deliberately no deadline: an expiry that never
/// arrives blocks forever, matching the protocol's own unboundedness.
const LEDGER_TIME_INTERVAL: Duration = Duration::from_secs(1);

/// How often a swap resource is re-fetched while waiting for a status.
const STATUS_INTERVAL: Duration = Duration::from_millis(200);

/// One local participant driving one side of a swap.
///
/// Cloning yields another handle onto the same participant.
#[derive(Clone)]
pub struct Actor {
    inner: Arc<Inner>,
}

struct Inner {
    name: String,
    client: Arc<dyn ApiClient>,
    wallets: Wallets,
    settings: Settings,
    state: Mutex<State>,
}

#[derive(Default)]
struct State {
    counterparty: Option<Weak<Inner>>,
    /// The locator of the most recently created or discovered swap.
    /// Reassigned at most once, from "created" to "discovered".
    swap: Option<Url>,
    alpha_ledger: Option<LedgerDescription>,
    beta_ledger: Option<LedgerDescription>,
    starting_balances: HashMap<AssetKind, Quantity>,
    expected_balance_changes: HashMap<AssetKind, Quantity>,
}

/// The two actors of a run, wired to each other.
#[derive(Debug)]
pub struct Actors {
    pub alice: Actor,
    pub bob: Actor,
}

impl Actors {
    pub fn new(alice: Actor, bob: Actor) -> Self {
        alice.set_counterparty(&bob);
        bob.set_counterparty(&alice);

        Self { alice, bob }
    }
}

/// A lifecycle step was invoked although no swap has been established.
#[derive(Clone, Debug, thiserror::Error, PartialEq)]
#[error("{actor} has no swap to {operation}")]
pub struct NoSwap {
    actor: String,
    operation: &'static str,
}

impl Actor {
    pub fn new(
        name: impl Into<String>,
        client: Arc<dyn ApiClient>,
        wallets: Wallets,
        settings: Settings,
    ) -> Self {
        let name = name.into();

        tracing::info!("created new actor {} at {}", name, client.base_url());

        Self {
            inner: Arc::new(Inner {
                name,
                client,
                wallets,
                settings,
                state: Mutex::new(State::default()),
            }),
        }
    }

    pub fn name(&self) -> &str {
        &self.inner.name
    }

    /// The locator of this actor's current swap, if any.
    pub fn swap(&self) -> Option<Url> {
        self.state().swap.clone()
    }

    /// Negotiate a new swap with the counterparty.
    ///
    /// On success this actor holds the locator of the created resource
    /// and the counterparty holds the locator of its own view of the
    /// same swap, discovered by matching the secret hash.
    pub async fn send_request(&self, alpha: AssetKind, beta: AssetKind) -> Result<Url> {
        let to = self.counterparty()?;

        tracing::info!("{} sends a swap request to {}", self.name(), to.name());

        let alpha_ledger = default_ledger(alpha);
        let beta_ledger = default_ledger(beta);
        let alpha_asset = default_asset(alpha);
        let beta_asset = default_asset(beta);

        tracing::debug!("derived {:?} and {:?} from asset {}", alpha_ledger, alpha_asset, alpha);
        tracing::debug!("derived {:?} and {:?} from asset {}", beta_ledger, beta_asset, beta);

        self.record_negotiated_ledgers(alpha_ledger, beta_ledger);
        to.record_negotiated_ledgers(alpha_ledger, beta_ledger);

        let ledgers = [alpha.ledger(), beta.ledger()];
        self.inner.wallets.ensure_initialized_for(&ledgers)?;
        to.inner.wallets.ensure_initialized_for(&ledgers)?;

        // The sender spends the alpha asset and gains the beta asset;
        // the recipient mirrors that.
        self.set_starting_balances(&[alpha_asset, zero(beta)]).await?;
        to.set_starting_balances(&[zero(alpha), beta_asset]).await?;
        self.expect_balance_change(beta, beta_asset.quantity);
        to.expect_balance_change(alpha, alpha_asset.quantity);

        let peer = to
            .inner
            .client
            .peer_info()
            .await
            .context("failed to fetch counterparty peer info")?;

        let (alpha_expiry, beta_expiry) = default_expiries();

        let body = SwapRequestBody {
            alpha_ledger,
            beta_ledger,
            alpha_asset,
            beta_asset,
            alpha_expiry,
            beta_expiry,
            beta_ledger_redeem_identity: self.upfront_redeem_identity(alpha, beta).await?,
            peer: DialInformation {
                peer_id: peer.id,
                address_hint: peer.listen_addresses.into_iter().next(),
            },
        };

        let locator = self
            .inner
            .client
            .create_swap(&body)
            .await
            .context("failed to create swap")?;
        self.set_swap(locator.clone());

        tracing::debug!("created new swap at {}", locator);

        let properties = self.fetch_swap_properties().await?;
        let secret_hash = properties.state.communication.secret_hash;

        tracing::debug!("swap {} has secret hash {}", locator, secret_hash);

        let discovered = correlate::find_swap(
            to.inner.client.as_ref(),
            secret_hash,
            &self.inner.settings.correlation,
        )
        .await
        .context("failed to find the swap on the counterparty's node")?;
        to.set_swap(discovered);

        Ok(locator)
    }

    /// Accept the current swap as soon as the action becomes available.
    pub async fn accept(&self) -> Result<()> {
        let swap = self.swap_locator("accept")?;
        let config = self.inner.settings.poll;

        tracing::debug!(
            "{} accepts swap {} within {:?}",
            self.name(),
            swap,
            config.timeout
        );

        let entity = poll::poll_until(
            self.inner.client.as_ref(),
            &swap,
            action::has_action(ActionKind::Accept),
            config,
        )
        .await
        .context("accept action did not become available in time")?;

        self.execute_action(&entity, ActionKind::Accept).await
    }

    /// Fund this actor's side of the swap and wait until both parties'
    /// nodes have seen the funding.
    pub async fn fund(&self) -> Result<()> {
        let swap = self.swap_locator("fund")?;

        let entity = self.inner.client.get_entity(&swap).await?;
        let properties = SwapProperties::from_entity(&entity)?;

        self.execute_action(&entity, ActionKind::Fund).await?;
        tracing::debug!("{} funded swap {}", self.name(), swap);

        self.fan_out_ledger_status(Side::funded_by(properties.role), HtlcState::Funded)
            .await
    }

    /// Redeem the counterparty's HTLC and wait until both parties'
    /// nodes have seen the redeem.
    pub async fn redeem(&self) -> Result<()> {
        let swap = self.swap_locator("redeem")?;

        let entity = self.inner.client.get_entity(&swap).await?;
        let properties = SwapProperties::from_entity(&entity)?;

        self.execute_action(&entity, ActionKind::Redeem).await?;
        tracing::debug!("{} redeemed swap {}", self.name(), swap);

        self.fan_out_ledger_status(Side::redeemed_by(properties.role), HtlcState::Redeemed)
            .await
    }

    /// Refund this actor's own HTLC once its expiry has passed on the
    /// ledger, then wait until both parties' nodes have seen the refund.
    pub async fn refund(&self) -> Result<()> {
        let swap = self.swap_locator("refund")?;

        let entity = self.inner.client.get_entity(&swap).await?;
        let properties = SwapProperties::from_entity(&entity)?;

        let side = Side::funded_by(properties.role);
        let expiry = properties.state.communication.expiry(side);
        let ledger = self.negotiated_ledger(side)?;
        let wallet = self.inner.wallets.for_ledger(ledger)?.clone();

        self.wait_for_ledger_time(wallet.as_ref(), expiry).await?;

        // The representation may have moved while we waited.
        let entity = self.inner.client.get_entity(&swap).await?;

        self.execute_action(&entity, ActionKind::Refund).await?;
        tracing::debug!("{} refunded swap {}", self.name(), swap);

        self.fan_out_ledger_status(side, HtlcState::Refunded).await
    }

    /// Block until the counterparty has accepted the swap.
    pub async fn expect_accepted(&self) -> Result<()> {
        let swap = self.swap_locator("await acceptance of")?;

        loop {
            let properties = self.fetch_swap_properties().await?;

            if properties.state.communication.status == CommunicationStatus::Accepted {
                tracing::debug!("swap {} is accepted", swap);
                return Ok(());
            }

            tokio::time::sleep(STATUS_INTERVAL).await;
        }
    }

    /// Block until cnd reports the swap as swapped, then verify every
    /// recorded balance change, tolerating up to the wallet's maximum
    /// fee per asset.
    pub async fn assert_swapped(&self) -> Result<()> {
        let swap = self.swap_locator("assert as swapped")?;

        tracing::debug!("checking if cnd reports status SWAPPED for {}", swap);

        loop {
            let properties = self.fetch_swap_properties().await?;

            if properties.status == SwapStatus::Swapped {
                break;
            }

            tokio::time::sleep(STATUS_INTERVAL).await;
        }

        let expected_changes = {
            let state = self.state();
            state
                .expected_balance_changes
                .iter()
                .map(|(asset, change)| (*asset, *change))
                .collect::<Vec<_>>()
        };

        for (asset, change) in expected_changes {
            tracing::debug!("checking that {} balance changed by {}", asset, change);

            let starting = self.starting_balance(asset);
            let expected = starting
                .checked_add(change)
                .context("expected balance does not fit the quantity type")?;

            self.assert_balance_at_least(asset, expected).await?;
        }

        Ok(())
    }

    /// Verify that every starting balance is restored, tolerating up to
    /// the wallet's maximum fee per asset.
    pub async fn assert_refunded(&self) -> Result<()> {
        let swap = self.swap_locator("assert as refunded")?;

        tracing::debug!("checking if swap @ {} was refunded", swap);

        let starting_balances = {
            let state = self.state();
            state
                .starting_balances
                .iter()
                .map(|(asset, starting)| (*asset, *starting))
                .collect::<Vec<_>>()
        };

        for (asset, starting) in starting_balances {
            self.assert_balance_at_least(asset, starting).await?;
        }

        Ok(())
    }

    pub async fn assert_alpha_funded(&self) -> Result<()> {
        self.expect_ledger_status(Side::Alpha, HtlcState::Funded).await
    }

    pub async fn assert_beta_funded(&self) -> Result<()> {
        self.expect_ledger_status(Side::Beta, HtlcState::Funded).await
    }

    pub async fn assert_alpha_redeemed(&self) -> Result<()> {
        self.expect_ledger_status(Side::Alpha, HtlcState::Redeemed).await
    }

    pub async fn assert_beta_redeemed(&self) -> Result<()> {
        self.expect_ledger_status(Side::Beta, HtlcState::Redeemed).await
    }

    pub async fn assert_alpha_refunded(&self) -> Result<()> {
        self.expect_ledger_status(Side::Alpha, HtlcState::Refunded).await
    }

    pub async fn assert_beta_refunded(&self) -> Result<()> {
        self.expect_ledger_status(Side::Beta, HtlcState::Refunded).await
    }

    /// Block until cnd reports the given per-ledger status.
    ///
    /// There is no deadline here; a status that never arrives hangs the
    /// caller, which must bound the wait externally if needed.
    pub async fn expect_ledger_status(&self, side: Side, target: HtlcState) -> Result<()> {
        let swap = self.swap_locator("observe a ledger status on")?;

        tracing::debug!(
            "waiting for cnd to see {} in state {} for swap @ {}",
            side,
            target,
            swap
        );

        loop {
            let properties = self.fetch_swap_properties().await?;

            if properties.state.ledger(side).status == target {
                tracing::debug!("cnd saw {} in state {} for swap @ {}", side, target, swap);
                return Ok(());
            }

            tokio::time::sleep(STATUS_INTERVAL).await;
        }
    }

    /// The typed properties of this actor's current swap resource.
    pub async fn fetch_swap_properties(&self) -> Result<SwapProperties> {
        let swap = self.swap_locator("inspect")?;

        let entity = self.inner.client.get_entity(&swap).await?;

        Ok(SwapProperties::from_entity(&entity)?)
    }

    async fn execute_action(&self, entity: &siren::Entity, kind: ActionKind) -> Result<()> {
        let action = action::resolve(entity, kind)
            .ok_or_else(|| anyhow!("{} action is not available on the current representation", kind))?;

        let request = action::build(
            action,
            self.inner.client.base_url(),
            &self.inner.wallets,
            &self.inner.settings.action,
        )
        .await?;

        self.inner
            .client
            .execute(&request)
            .await
            .with_context(|| format!("failed to execute {} action", kind))?;

        Ok(())
    }

    async fn fan_out_ledger_status(&self, side: Side, target: HtlcState) -> Result<()> {
        let to = self.counterparty()?;

        futures::future::try_join(
            self.expect_ledger_status(side, target),
            to.expect_ledger_status(side, target),
        )
        .await?;

        Ok(())
    }

    async fn wait_for_ledger_time(&self, wallet: &dyn Wallet, expiry: Timestamp) -> Result<()> {
        let mut current = wallet.ledger_time().await?;

        tracing::debug!("current ledger time is {}", current);

        while current < expiry {
            tracing::debug!("waiting for ledger time to pass {}", expiry);
            tokio::time::sleep(LEDGER_TIME_INTERVAL).await;

            current = wallet.ledger_time().await?;
            tracing::debug!("current ledger time is {}", current);
        }

        Ok(())
    }

    /// Only this asset combination commits a redeem identity before
    /// acceptance: the ether redeem path needs one up front.
    async fn upfront_redeem_identity(
        &self,
        alpha: AssetKind,
        beta: AssetKind,
    ) -> Result<Option<String>> {
        match (alpha, beta) {
            (AssetKind::Bitcoin, AssetKind::Ether) => {
                let wallet = self.inner.wallets.for_ledger(LedgerKind::Ethereum)?;

                Ok(Some(wallet.new_identity().await?))
            }
            _ => Ok(None),
        }
    }

    async fn set_starting_balances(&self, assets: &[AssetDescription]) -> Result<()> {
        for asset in assets {
            if asset.quantity.is_zero() {
                self.state()
                    .starting_balances
                    .insert(asset.name, Quantity::zero());
                continue;
            }

            let ledger = asset.name.ledger();

            tracing::debug!("minting {} on {}", asset.name, ledger);

            let wallet = self.inner.wallets.for_ledger(ledger)?;
            wallet.mint(asset.quantity).await?;

            let balance = wallet.balance().await?;

            tracing::debug!(
                "starting {} balance of {}: {}",
                asset.name,
                self.name(),
                balance
            );
            self.state().starting_balances.insert(asset.name, balance);
        }

        Ok(())
    }

    async fn assert_balance_at_least(&self, asset: AssetKind, expected: Quantity) -> Result<()> {
        let wallet = self.inner.wallets.for_ledger(asset.ledger())?;

        let floor = expected.saturating_sub(wallet.max_fee());
        let balance = wallet.balance().await?;

        anyhow::ensure!(
            balance >= floor,
            "{} balance of {} is {}, expected at least {}",
            asset,
            self.name(),
            balance,
            floor
        );

        Ok(())
    }

    fn expect_balance_change(&self, asset: AssetKind, change: Quantity) {
        self.state().expected_balance_changes.insert(asset, change);
    }

    fn starting_balance(&self, asset: AssetKind) -> Quantity {
        self.state()
            .starting_balances
            .get(&asset)
            .copied()
            .unwrap_or_default()
    }

    fn record_negotiated_ledgers(&self, alpha: LedgerDescription, beta: LedgerDescription) {
        let mut state = self.state();
        state.alpha_ledger = Some(alpha);
        state.beta_ledger = Some(beta);
    }

    fn negotiated_ledger(&self, side: Side) -> Result<LedgerKind> {
        let state = self.state();
        let descriptor = match side {
            Side::Alpha => state.alpha_ledger,
            Side::Beta => state.beta_ledger,
        };

        descriptor
            .map(|ledger| ledger.kind())
            .with_context(|| format!("{} has not negotiated a {}", self.inner.name, side))
    }

    fn set_counterparty(&self, other: &Actor) {
        self.state().counterparty = Some(Arc::downgrade(&other.inner));
    }

    fn counterparty(&self) -> Result<Actor> {
        let inner = self
            .state()
            .counterparty
            .as_ref()
            .and_then(Weak::upgrade)
            .with_context(|| format!("{} has no counterparty", self.inner.name))?;

        Ok(Actor { inner })
    }

    fn set_swap(&self, locator: Url) {
        self.state().swap = Some(locator);
    }

    fn swap_locator(&self, operation: &'static str) -> Result<Url, NoSwap> {
        self.state().swap.clone().ok_or_else(|| NoSwap {
            actor: self.inner.name.clone(),
            operation,
        })
    }

    fn state(&self) -> MutexGuard<'_, State> {
        self.inner.state.lock().expect("actor state mutex poisoned")
    }
}

fn zero(asset: AssetKind) -> AssetDescription {
    AssetDescription {
        name: asset,
        quantity: Quantity::zero(),
    }
}

impl fmt::Debug for Actor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Actor")
            .field("name", &self.inner.name)
            .field("swap", &self.state().swap)
            .finish()
    }
}
