use crate::{
    ledger::{LedgerKind, Quantity},
    timestamp::Timestamp,
};
use anyhow::Context;
use async_trait::async_trait;
use std::{collections::HashMap, fmt, sync::Arc};

/// The ledger-specific capabilities an actor owns.
///
/// The driver never talks to a chain itself; identities, balances and
/// the blockchain-time oracle all come from here.
#[async_trait]
pub trait Wallet: Send + Sync {
    /// A fresh identity (an address-like string) on this ledger.
    async fn new_identity(&self) -> anyhow::Result<String>;

    async fn balance(&self) -> anyhow::Result<Quantity>;

    /// The current time as reported by the ledger itself, not the host.
    async fn ledger_time(&self) -> anyhow::Result<Timestamp>;

    /// Credit this wallet so the swap has something to move.
    async fn mint(&self, amount: Quantity) -> anyhow::Result<()>;

    /// Upper bound for what a single transaction on this ledger can
    /// consume in fees; balance assertions tolerate up to this much.
    fn max_fee(&self) -> Quantity;
}

/// An actor's wallets, keyed by the ledger they operate on.
#[derive(Clone, Default)]
pub struct Wallets {
    inner: HashMap<LedgerKind, Arc<dyn Wallet>>,
}

impl Wallets {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, ledger: LedgerKind, wallet: Arc<dyn Wallet>) {
        self.inner.insert(ledger, wallet);
    }

    pub fn for_ledger(&self, ledger: LedgerKind) -> anyhow::Result<&Arc<dyn Wallet>> {
        self.inner
            .get(&ledger)
            .with_context(|| format!("no wallet initialized for {}", ledger))
    }

    /// Fails if any of the given ledgers has no wallet.
    pub fn ensure_initialized_for(&self, ledgers: &[LedgerKind]) -> anyhow::Result<()> {
        for ledger in ledgers {
            self.for_ledger(*ledger)?;
        }

        Ok(())
    }
}

impl fmt::Debug for Wallets {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.inner.keys()).finish()
    }
}
