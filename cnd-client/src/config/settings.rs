use crate::{
    action::BuildPolicy,
    config::file::{self, File},
    correlate::CorrelationConfig,
    poll::PollConfig,
};
use url::Url;

/// Runtime settings, with every absent configuration value replaced by
/// its default.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Settings {
    pub cnd: CndSettings,
    pub poll: PollConfig,
    pub correlation: CorrelationConfig,
    pub action: BuildPolicy,
}

#[derive(Clone, Debug, PartialEq)]
pub struct CndSettings {
    pub url: Url,
}

impl Default for CndSettings {
    fn default() -> Self {
        Self {
            url: Url::parse("http://localhost:8000").expect("default cnd url is valid"),
        }
    }
}

impl Settings {
    pub fn from_config_file_and_defaults(file: File) -> Self {
        let File {
            cnd,
            poll,
            correlation,
            action,
        } = file;

        Self {
            cnd: cnd
                .map(|cnd| CndSettings { url: cnd.url })
                .unwrap_or_default(),
            poll: poll
                .map(|poll| {
                    let defaults = PollConfig::default();
                    PollConfig {
                        interval: poll.interval.unwrap_or(defaults.interval),
                        timeout: poll.timeout.unwrap_or(defaults.timeout),
                    }
                })
                .unwrap_or_default(),
            correlation: correlation
                .map(|correlation| {
                    let defaults = CorrelationConfig::default();
                    CorrelationConfig {
                        backoff: correlation.backoff.unwrap_or(defaults.backoff),
                        ambiguity: correlation.on_ambiguity.unwrap_or(defaults.ambiguity),
                    }
                })
                .unwrap_or_default(),
            action: action
                .map(|action| {
                    let defaults = BuildPolicy::default();
                    BuildPolicy {
                        fee_per_wu: action.fee_per_wu.unwrap_or(defaults.fee_per_wu),
                        unknown_fields: action.unknown_fields.unwrap_or_default(),
                    }
                })
                .unwrap_or_default(),
        }
    }
}

impl From<Settings> for File {
    fn from(settings: Settings) -> Self {
        let Settings {
            cnd,
            poll,
            correlation,
            action,
        } = settings;

        File {
            cnd: Some(file::Cnd { url: cnd.url }),
            poll: Some(file::Poll {
                interval: Some(poll.interval),
                timeout: Some(poll.timeout),
            }),
            correlation: Some(file::Correlation {
                backoff: Some(correlation.backoff),
                on_ambiguity: Some(correlation.ambiguity),
            }),
            action: Some(file::Action {
                fee_per_wu: Some(action.fee_per_wu),
                unknown_fields: Some(action.unknown_fields),
            }),
        }
    }
}
