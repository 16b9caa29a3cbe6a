use crate::{
    action::UnknownFields,
    config::serde_duration,
    correlate::Ambiguity,
};
use serde::{Deserialize, Serialize};
use std::{path::Path, time::Duration};
use url::Url;

/// The configuration file as it appears on disk.
///
/// Optional elements are represented as `Option`s here; filling in
/// default values for absent options is a dedicated step when turning
/// this into `Settings`.
#[derive(Clone, Debug, Default, PartialEq, Deserialize, Serialize)]
pub struct File {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cnd: Option<Cnd>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub poll: Option<Poll>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub correlation: Option<Correlation>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub action: Option<Action>,
}

impl File {
    pub fn read(path: &Path) -> anyhow::Result<File> {
        let contents = std::fs::read_to_string(path)?;

        Ok(toml::from_str(&contents)?)
    }
}

#[derive(Clone, Debug, PartialEq, Deserialize, Serialize)]
pub struct Cnd {
    pub url: Url,
}

#[derive(Clone, Debug, Default, PartialEq, Deserialize, Serialize)]
pub struct Poll {
    /// Seconds between two fetches of the same resource.
    #[serde(
        default,
        with = "serde_duration::opt_secs",
        skip_serializing_if = "Option::is_none"
    )]
    pub interval: Option<Duration>,
    /// Seconds after which a bounded poll gives up.
    #[serde(
        default,
        with = "serde_duration::opt_secs",
        skip_serializing_if = "Option::is_none"
    )]
    pub timeout: Option<Duration>,
}

#[derive(Clone, Debug, Default, PartialEq, Deserialize, Serialize)]
pub struct Correlation {
    /// Milliseconds between two scans of the counterparty's swaps.
    #[serde(
        default,
        with = "serde_duration::opt_millis",
        skip_serializing_if = "Option::is_none"
    )]
    pub backoff: Option<Duration>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub on_ambiguity: Option<Ambiguity>,
}

#[derive(Clone, Debug, Default, PartialEq, Deserialize, Serialize)]
pub struct Action {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fee_per_wu: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub unknown_fields: Option<UnknownFields>,
}
