use crate::timestamp::Timestamp;
use serde::{de, Deserialize, Deserializer, Serialize, Serializer};
use std::{fmt, str::FromStr};

/// The ledgers a swap can move value on.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LedgerKind {
    Bitcoin,
    Ethereum,
}

impl fmt::Display for LedgerKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LedgerKind::Bitcoin => write!(f, "bitcoin"),
            LedgerKind::Ethereum => write!(f, "ethereum"),
        }
    }
}

/// The assets a swap can exchange.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum AssetKind {
    Bitcoin,
    Ether,
}

impl AssetKind {
    /// The ledger this asset natively lives on.
    pub fn ledger(self) -> LedgerKind {
        match self {
            AssetKind::Bitcoin => LedgerKind::Bitcoin,
            AssetKind::Ether => LedgerKind::Ethereum,
        }
    }
}

impl fmt::Display for AssetKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AssetKind::Bitcoin => write!(f, "bitcoin"),
            AssetKind::Ether => write!(f, "ether"),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum BitcoinNetwork {
    Mainnet,
    Testnet,
    Regtest,
}

/// A ledger as described on the wire in a swap request.
#[derive(Clone, Copy, Debug, PartialEq, Deserialize, Serialize)]
#[serde(tag = "name", rename_all = "lowercase")]
pub enum LedgerDescription {
    Bitcoin { network: BitcoinNetwork },
    Ethereum { chain_id: u32 },
}

impl LedgerDescription {
    pub fn kind(&self) -> LedgerKind {
        match self {
            LedgerDescription::Bitcoin { .. } => LedgerKind::Bitcoin,
            LedgerDescription::Ethereum { .. } => LedgerKind::Ethereum,
        }
    }
}

/// An asset as described on the wire in a swap request.
#[derive(Clone, Copy, Debug, PartialEq, Deserialize, Serialize)]
pub struct AssetDescription {
    pub name: AssetKind,
    pub quantity: Quantity,
}

/// An amount of an asset, in the asset's smallest unit.
///
/// Serialized as a decimal string, which is how cnd represents
/// quantities of any magnitude.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Quantity(u128);

impl Quantity {
    pub const fn new(amount: u128) -> Self {
        Quantity(amount)
    }

    pub const fn zero() -> Self {
        Quantity(0)
    }

    pub fn is_zero(self) -> bool {
        self.0 == 0
    }

    pub fn checked_add(self, rhs: Quantity) -> Option<Quantity> {
        self.0.checked_add(rhs.0).map(Quantity)
    }

    pub fn saturating_sub(self, rhs: Quantity) -> Quantity {
        Quantity(self.0.saturating_sub(rhs.0))
    }
}

impl fmt::Display for Quantity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Clone, Copy, Debug, thiserror::Error, PartialEq)]
#[error("quantity is not a valid decimal number")]
pub struct ParseQuantityError;

impl FromStr for Quantity {
    type Err = ParseQuantityError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.parse::<u128>().map(Quantity).map_err(|_| ParseQuantityError)
    }
}

impl Serialize for Quantity {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&self.0.to_string())
    }
}

impl<'de> Deserialize<'de> for Quantity {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let decimal = String::deserialize(deserializer)?;

        decimal.parse().map_err(|_| {
            de::Error::invalid_value(de::Unexpected::Str(&decimal), &"a decimal number")
        })
    }
}

const SATS_IN_ONE_BITCOIN: u128 = 100_000_000;
const WEI_IN_TEN_ETHER: u128 = 10_000_000_000_000_000_000;

/// The ledger an asset is swapped on by default.
pub fn default_ledger(asset: AssetKind) -> LedgerDescription {
    match asset {
        AssetKind::Bitcoin => LedgerDescription::Bitcoin {
            network: BitcoinNetwork::Regtest,
        },
        AssetKind::Ether => LedgerDescription::Ethereum { chain_id: 17 },
    }
}

/// The amount of an asset swapped by default: 1 BTC respectively 10 ether.
pub fn default_asset(asset: AssetKind) -> AssetDescription {
    match asset {
        AssetKind::Bitcoin => AssetDescription {
            name: asset,
            quantity: Quantity::new(SATS_IN_ONE_BITCOIN),
        },
        AssetKind::Ether => AssetDescription {
            name: asset,
            quantity: Quantity::new(WEI_IN_TEN_ETHER),
        },
    }
}

/// Default expiries relative to now.
///
/// The alpha expiry is deliberately further out than the beta expiry:
/// the alpha HTLC is funded first and must outlive the beta one.
pub fn default_expiries() -> (Timestamp, Timestamp) {
    let now = Timestamp::now();

    (now.plus(8), now.plus(3))
}
