use crate::client::{self, ApiClient};
use std::time::Duration;
use url::Url;

/// Pacing of a bounded poll: how often to re-fetch and how long to keep
/// trying overall.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PollConfig {
    pub interval: Duration,
    pub timeout: Duration,
}

impl Default for PollConfig {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(1),
            timeout: Duration::from_secs(5),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The deadline elapsed before the predicate held. This is an
    /// expected outcome the caller must handle, distinct from the
    /// predicate merely not holding yet on an individual fetch.
    #[error("predicate was not satisfied within {timeout:?}")]
    Timeout { timeout: Duration },
    #[error(transparent)]
    Client(#[from] client::Error),
}

/// Repeatedly fetch the resource at `url` until `predicate` holds,
/// racing against a deadline.
///
/// The deadline timer elapses independently of the fetch/retry loop;
/// whichever side completes first wins and the loser is dropped, so an
/// abandoned in-flight fetch can never act on the outcome. A predicate
/// that already holds on the first fetch returns without sleeping.
pub async fn poll_until<P>(
    client: &dyn ApiClient,
    url: &Url,
    predicate: P,
    config: PollConfig,
) -> Result<siren::Entity, Error>
where
    P: Fn(&siren::Entity) -> bool,
{
    let attempts = async {
        loop {
            let entity = client.get_entity(url).await?;

            if predicate(&entity) {
                return Ok(entity);
            }

            tracing::trace!("predicate does not hold yet on {}, retrying", url);
            tokio::time::sleep(config.interval).await;
        }
    };

    match tokio::time::timeout(config.timeout, attempts).await {
        Ok(result) => result,
        Err(_elapsed) => Err(Error::Timeout {
            timeout: config.timeout,
        }),
    }
}
