use crate::{
    client::{self, ApiClient},
    secret_hash::SecretHash,
    swap::SwapProperties,
};
use std::time::Duration;
use url::Url;

/// Pacing and strictness of a correlation scan.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct CorrelationConfig {
    /// How long to wait between two full scans of the counterparty's
    /// swap collection.
    pub backoff: Duration,
    pub ambiguity: Ambiguity,
}

impl Default for CorrelationConfig {
    fn default() -> Self {
        Self {
            backoff: Duration::from_millis(500),
            ambiguity: Ambiguity::Deny,
        }
    }
}

/// What to do when more than one swap carries the same secret hash.
///
/// The protocol assumes secret hashes are collision-free in practice
/// but does not guarantee it, so neither resolution is assumed.
#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Deserialize, serde::Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum Ambiguity {
    Deny,
    FirstMatch,
}

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("{count} swaps share the secret hash {secret_hash}")]
    Ambiguous {
        secret_hash: SecretHash,
        count: usize,
    },
    #[error(transparent)]
    Client(#[from] client::Error),
}

/// Find the swap on a node whose commitment value is `secret_hash`.
///
/// No shared swap identifier exists before this succeeds, so the scan
/// fetches the node's full swap collection and every listed resource,
/// one fetch per entry. If nothing matches yet the scan starts over
/// after a backoff and keeps going; callers that need a bound race this
/// against a deadline.
pub async fn find_swap(
    client: &dyn ApiClient,
    secret_hash: SecretHash,
    config: &CorrelationConfig,
) -> Result<Url, Error> {
    tracing::debug!("looking for swap with secret hash {}", secret_hash);

    let swaps_url = client.base_url().join("/swaps").map_err(client::Error::Url)?;

    loop {
        let collection = client.get_entity(&swaps_url).await?;

        let mut matches = Vec::new();

        for sub_entity in &collection.entities {
            let href = match sub_entity.href() {
                Some(href) => href,
                None => {
                    tracing::debug!("skipping swap collection entry without a locator");
                    continue;
                }
            };
            let locator = client.base_url().join(href).map_err(client::Error::Url)?;

            let swap = client.get_entity(&locator).await?;

            match SwapProperties::from_entity(&swap) {
                Ok(properties) if properties.state.communication.secret_hash == secret_hash => {
                    matches.push(locator);
                }
                Ok(_) => {}
                Err(e) => {
                    tracing::debug!("skipping swap at {} with unreadable properties: {}", locator, e);
                }
            }
        }

        match (matches.len(), config.ambiguity) {
            (0, _) => {
                tokio::time::sleep(config.backoff).await;
            }
            (1, _) | (_, Ambiguity::FirstMatch) => {
                let locator = matches.swap_remove(0);
                tracing::debug!("found swap with secret hash {} as {}", secret_hash, locator);

                return Ok(locator);
            }
            (count, Ambiguity::Deny) => {
                return Err(Error::Ambiguous { secret_hash, count });
            }
        }
    }
}
