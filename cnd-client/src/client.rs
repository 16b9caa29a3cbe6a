use crate::{action::BuiltRequest, swap::SwapRequestBody};
use async_trait::async_trait;
use serde::Deserialize;
use url::Url;

/// The operations the driver needs from a cnd node.
///
/// `Cnd` is the HTTP implementation; tests substitute an in-memory one.
#[async_trait]
pub trait ApiClient: Send + Sync {
    /// The endpoint this client talks to; hrefs found in documents are
    /// resolved against it.
    fn base_url(&self) -> &Url;

    /// The current representation of the resource at `url`.
    async fn get_entity(&self, url: &Url) -> Result<siren::Entity, Error>;

    /// Create a new swap, returning the locator of the created resource.
    async fn create_swap(&self, body: &SwapRequestBody) -> Result<Url, Error>;

    /// Execute a previously built action request.
    ///
    /// The response is not interpreted beyond success or failure.
    async fn execute(&self, request: &BuiltRequest) -> Result<(), Error>;

    async fn peer_info(&self) -> Result<PeerInfo, Error>;
}

/// What a node reports about itself on its root endpoint.
#[derive(Clone, Debug, PartialEq, Deserialize)]
pub struct PeerInfo {
    pub id: String,
    pub listen_addresses: Vec<String>,
}

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("connection error: {0}")]
    Connection(#[from] reqwest::Error),
    #[error("{url} responded with unexpected status {status}")]
    UnexpectedStatus { url: Url, status: http::StatusCode },
    #[error("swap creation response carries no usable Location header")]
    MissingLocation,
    #[error("invalid url")]
    Url(#[from] url::ParseError),
}

/// HTTP client for one cnd instance.
#[derive(Clone, Debug)]
pub struct Cnd {
    inner: reqwest::Client,
    base_url: Url,
}

impl Cnd {
    pub fn new(base_url: Url) -> Self {
        Self {
            inner: reqwest::Client::new(),
            base_url,
        }
    }
}

const SIREN_MEDIA_TYPE: &str = "application/vnd.siren+json";

#[async_trait]
impl ApiClient for Cnd {
    fn base_url(&self) -> &Url {
        &self.base_url
    }

    async fn get_entity(&self, url: &Url) -> Result<siren::Entity, Error> {
        let response = self
            .inner
            .get(url.clone())
            .header(http::header::ACCEPT, SIREN_MEDIA_TYPE)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(Error::UnexpectedStatus {
                url: url.clone(),
                status,
            });
        }

        Ok(response.json().await?)
    }

    async fn create_swap(&self, body: &SwapRequestBody) -> Result<Url, Error> {
        let url = self.base_url.join("/swaps/rfc003")?;

        let response = self.inner.post(url.clone()).json(body).send().await?;

        let status = response.status();
        if !status.is_success() {
            return Err(Error::UnexpectedStatus { url, status });
        }

        let location = response
            .headers()
            .get(http::header::LOCATION)
            .and_then(|location| location.to_str().ok())
            .ok_or(Error::MissingLocation)?;

        Ok(self.base_url.join(location)?)
    }

    async fn execute(&self, request: &BuiltRequest) -> Result<(), Error> {
        let mut builder = self
            .inner
            .request(request.method.clone(), request.url.clone());

        if let Some(body) = &request.body {
            builder = builder.json(body);
        }

        let response = builder.send().await?;

        let status = response.status();
        if !status.is_success() {
            return Err(Error::UnexpectedStatus {
                url: request.url.clone(),
                status,
            });
        }

        Ok(())
    }

    async fn peer_info(&self) -> Result<PeerInfo, Error> {
        let url = self.base_url.join("/")?;

        let response = self.inner.get(url.clone()).send().await?;

        let status = response.status();
        if !status.is_success() {
            return Err(Error::UnexpectedStatus { url, status });
        }

        Ok(response.json().await?)
    }
}
