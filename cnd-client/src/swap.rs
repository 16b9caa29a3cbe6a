use crate::{
    ledger::{AssetDescription, LedgerDescription},
    secret_hash::SecretHash,
    timestamp::Timestamp,
};
use serde::{Deserialize, Serialize};
use std::fmt;

/// The role an actor plays in a swap.
///
/// Alice initiates the swap and knows the secret, Bob accepts it.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Deserialize, Serialize)]
pub enum Role {
    Alice,
    Bob,
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Role::Alice => write!(f, "Alice"),
            Role::Bob => write!(f, "Bob"),
        }
    }
}

/// Which of the two ledgers of a swap an operation refers to.
///
/// Alpha and beta are swap-relative labels, not actor-relative ones:
/// both parties agree on which ledger is alpha, independently of who is
/// acting. Deriving the side from a role therefore always goes through
/// this mapping instead of being decided at the call site.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Side {
    Alpha,
    Beta,
}

impl Side {
    /// The side whose HTLC the given role funds, and consequently the
    /// side it refunds.
    pub fn funded_by(role: Role) -> Side {
        match role {
            Role::Alice => Side::Alpha,
            Role::Bob => Side::Beta,
        }
    }

    /// The side whose HTLC the given role redeems.
    pub fn redeemed_by(role: Role) -> Side {
        match role {
            Role::Alice => Side::Beta,
            Role::Bob => Side::Alpha,
        }
    }
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Side::Alpha => write!(f, "alpha_ledger"),
            Side::Beta => write!(f, "beta_ledger"),
        }
    }
}

/// Where the swap stands overall.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SwapStatus {
    InProgress,
    Swapped,
    NotSwapped,
    InternalFailure,
}

/// Where the negotiation between the two parties stands.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CommunicationStatus {
    Sent,
    Accepted,
    Declined,
}

/// The state of one ledger's HTLC as cnd reports it.
///
/// Transitions are monotonic along this set; a status never regresses.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum HtlcState {
    NotDeployed,
    Deployed,
    Funded,
    Redeemed,
    Refunded,
    IncorrectlyFunded,
}

impl fmt::Display for HtlcState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HtlcState::NotDeployed => write!(f, "NOT_DEPLOYED"),
            HtlcState::Deployed => write!(f, "DEPLOYED"),
            HtlcState::Funded => write!(f, "FUNDED"),
            HtlcState::Redeemed => write!(f, "REDEEMED"),
            HtlcState::Refunded => write!(f, "REFUNDED"),
            HtlcState::IncorrectlyFunded => write!(f, "INCORRECTLY_FUNDED"),
        }
    }
}

/// The typed view of a swap resource's properties.
///
/// The resource carries more than this (identities, transaction ids,
/// protocol parameters); this is the minimal shape the driver depends
/// on, unknown fields are ignored.
#[derive(Clone, Debug, PartialEq, Deserialize, Serialize)]
pub struct SwapProperties {
    pub role: Role,
    pub status: SwapStatus,
    pub state: SwapState,
}

#[derive(Clone, Debug, PartialEq, Deserialize, Serialize)]
pub struct SwapState {
    pub communication: Communication,
    pub alpha_ledger: LedgerState,
    pub beta_ledger: LedgerState,
}

impl SwapState {
    pub fn ledger(&self, side: Side) -> &LedgerState {
        match side {
            Side::Alpha => &self.alpha_ledger,
            Side::Beta => &self.beta_ledger,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Deserialize, Serialize)]
pub struct Communication {
    pub status: CommunicationStatus,
    pub alpha_expiry: Timestamp,
    pub beta_expiry: Timestamp,
    pub secret_hash: SecretHash,
}

impl Communication {
    pub fn expiry(&self, side: Side) -> Timestamp {
        match side {
            Side::Alpha => self.alpha_expiry,
            Side::Beta => self.beta_expiry,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Deserialize, Serialize)]
pub struct LedgerState {
    pub status: HtlcState,
}

#[derive(Debug, thiserror::Error)]
pub enum ParseError {
    #[error("swap resource has no properties")]
    MissingProperties,
    #[error("malformed swap properties")]
    Malformed(#[from] serde_json::Error),
}

impl SwapProperties {
    /// Decode the typed swap properties out of a fetched representation.
    pub fn from_entity(entity: &siren::Entity) -> Result<Self, ParseError> {
        let properties = entity
            .properties
            .clone()
            .ok_or(ParseError::MissingProperties)?;

        Ok(serde_json::from_value(properties)?)
    }
}

/// The payload POSTed to create a new swap.
#[derive(Clone, Debug, Serialize)]
pub struct SwapRequestBody {
    pub alpha_ledger: LedgerDescription,
    pub beta_ledger: LedgerDescription,
    pub alpha_asset: AssetDescription,
    pub beta_asset: AssetDescription,
    pub alpha_expiry: Timestamp,
    pub beta_expiry: Timestamp,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub beta_ledger_redeem_identity: Option<String>,
    pub peer: DialInformation,
}

/// How to reach the counterparty's node.
#[derive(Clone, Debug, PartialEq, Deserialize, Serialize)]
pub struct DialInformation {
    pub peer_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub address_hint: Option<String>,
}
