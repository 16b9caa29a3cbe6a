use crate::{
    ledger::LedgerKind,
    wallet::Wallets,
};
use serde::{Deserialize, Serialize};
use url::Url;

/// The closed set of next-steps a swap resource can expose.
#[derive(
    Clone,
    Copy,
    Debug,
    PartialEq,
    Eq,
    strum_macros::AsRefStr,
    strum_macros::Display,
    strum_macros::EnumString,
)]
#[strum(serialize_all = "lowercase")]
pub enum ActionKind {
    Accept,
    Decline,
    Deploy,
    Fund,
    Redeem,
    Refund,
}

/// Locate the descriptor for `kind` on a representation.
///
/// Absence is a normal outcome while the counterparty has not yet acted;
/// callers combine this with polling rather than treating it as failure.
pub fn resolve(entity: &siren::Entity, kind: ActionKind) -> Option<&siren::Action> {
    entity
        .actions
        .iter()
        .find(|action| action.name == kind.as_ref())
}

/// A predicate for the poll loop: does the representation expose `kind`?
pub fn has_action(kind: ActionKind) -> impl Fn(&siren::Entity) -> bool {
    move |entity| resolve(entity, kind).is_some()
}

/// The role of an action field, classified from its class tags.
///
/// First matching rule wins; rules are evaluated independently per
/// field, so one action can mix fields filled from different rules.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FieldRole {
    EthereumAddress,
    BitcoinFeePerWu,
    BitcoinAddress,
    Unrecognized,
}

impl FieldRole {
    pub fn classify(field: &siren::Field) -> FieldRole {
        let tagged = |tag: &str| field.class.iter().any(|class| class == tag);

        if tagged("ethereum") && tagged("address") {
            FieldRole::EthereumAddress
        } else if tagged("bitcoin") && tagged("feePerWU") {
            FieldRole::BitcoinFeePerWu
        } else if tagged("bitcoin") && tagged("address") {
            FieldRole::BitcoinAddress
        } else {
            FieldRole::Unrecognized
        }
    }
}

/// What to do with a field that matches no known role.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum UnknownFields {
    /// Fail the build; the node would reject a request missing a
    /// required field anyway, better to fail before submitting.
    Deny,
    /// Leave the field unset, for forward compatibility with nodes that
    /// declare fields this client does not know yet.
    Skip,
}

impl Default for UnknownFields {
    fn default() -> Self {
        UnknownFields::Deny
    }
}

/// How requests are synthesized from action descriptors.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct BuildPolicy {
    /// Fee rate filled into bitcoin feePerWU fields, in sat/WU.
    pub fee_per_wu: u64,
    pub unknown_fields: UnknownFields,
}

impl Default for BuildPolicy {
    fn default() -> Self {
        Self {
            fee_per_wu: 20,
            unknown_fields: UnknownFields::default(),
        }
    }
}

/// A concrete request, ready to be submitted.
#[derive(Clone, Debug, PartialEq)]
pub struct BuiltRequest {
    pub method: http::Method,
    pub url: Url,
    pub body: Option<serde_json::Value>,
}

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error(
        "action {action} declares content type {content_type}, only application/json is \
         supported for non-GET actions"
    )]
    UnsupportedContentType {
        action: String,
        content_type: String,
    },
    #[error("field {field} of action {action} matches no known role")]
    UnknownField { action: String, field: String },
    #[error("action {action} has an invalid target {href}")]
    InvalidTarget {
        action: String,
        href: String,
        #[source]
        source: url::ParseError,
    },
    #[error("failed to encode action values as a query string")]
    QueryEncoding(#[from] serde_urlencoded::ser::Error),
    #[error("failed to obtain a value for field {field} of action {action}")]
    Provider {
        action: String,
        field: String,
        #[source]
        source: anyhow::Error,
    },
}

/// Synthesize a concrete request from an action descriptor.
///
/// Field values come from the actor's capability providers: fresh
/// identities for address fields, a fixed fee rate for fee fields.
pub async fn build(
    action: &siren::Action,
    base_url: &Url,
    wallets: &Wallets,
    policy: &BuildPolicy,
) -> Result<BuiltRequest, Error> {
    if action.method != http::Method::GET {
        match action._type.as_deref() {
            Some("application/json") => {}
            declared => {
                return Err(Error::UnsupportedContentType {
                    action: action.name.clone(),
                    content_type: declared.unwrap_or("none").to_owned(),
                });
            }
        }
    }

    let mut values = serde_json::Map::new();

    for field in &action.fields {
        match FieldRole::classify(field) {
            FieldRole::EthereumAddress => {
                let identity = new_identity(action, field, wallets, LedgerKind::Ethereum).await?;
                tracing::debug!(
                    "ethereum identity for action {} is {}",
                    action.name,
                    identity
                );
                values.insert(field.name.clone(), identity.into());
            }
            FieldRole::BitcoinFeePerWu => {
                values.insert(field.name.clone(), policy.fee_per_wu.into());
            }
            FieldRole::BitcoinAddress => {
                let identity = new_identity(action, field, wallets, LedgerKind::Bitcoin).await?;
                tracing::debug!(
                    "bitcoin identity for action {} is {}",
                    action.name,
                    identity
                );
                values.insert(field.name.clone(), identity.into());
            }
            FieldRole::Unrecognized => match policy.unknown_fields {
                UnknownFields::Deny => {
                    return Err(Error::UnknownField {
                        action: action.name.clone(),
                        field: field.name.clone(),
                    });
                }
                UnknownFields::Skip => {
                    tracing::debug!(
                        "leaving field {} of action {} unset",
                        field.name,
                        action.name
                    );
                }
            },
        }
    }

    let mut url = base_url
        .join(&action.href)
        .map_err(|source| Error::InvalidTarget {
            action: action.name.clone(),
            href: action.href.clone(),
            source,
        })?;

    if action.method == http::Method::GET {
        if values.is_empty() {
            url.set_query(None);
        } else {
            let pairs = values
                .iter()
                .map(|(name, value)| (name.as_str(), plain(value)))
                .collect::<Vec<_>>();

            url.set_query(Some(&serde_urlencoded::to_string(&pairs)?));
        }

        Ok(BuiltRequest {
            method: http::Method::GET,
            url,
            body: None,
        })
    } else {
        Ok(BuiltRequest {
            method: action.method.clone(),
            url,
            body: Some(serde_json::Value::Object(values)),
        })
    }
}

async fn new_identity(
    action: &siren::Action,
    field: &siren::Field,
    wallets: &Wallets,
    ledger: LedgerKind,
) -> Result<String, Error> {
    let provider = |source| Error::Provider {
        action: action.name.clone(),
        field: field.name.clone(),
        source,
    };

    let wallet = wallets.for_ledger(ledger).map_err(provider)?;

    wallet.new_identity().await.map_err(provider)
}

// Query strings carry bare values, not JSON literals.
fn plain(value: &serde_json::Value) -> String {
    match value {
        serde_json::Value::String(string) => string.clone(),
        other => other.to_string(),
    }
}
