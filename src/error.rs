//! Error taxonomy for the acquisition pipeline.
//!
//! Construction-time errors ([`FetchError::UnsupportedSourceType`],
//! [`FetchError::MissingConfig`], [`FetchError::Selector`]) are fatal for the
//! single source being built but never abort the factory loop. Everything
//! raised during a fetch is absorbed by the manager's error boundary and
//! surfaces only as a `failed` [`crate::models::FetchOutcome`].

use thiserror::Error;

/// Errors produced while constructing fetchers or fetching from a source.
#[derive(Debug, Error)]
pub enum FetchError {
    /// The configuration named a source type the factory has no builder for.
    /// A misconfigured source is a setup bug, so this fails loudly instead of
    /// being skipped.
    #[error("unsupported source type: {0}")]
    UnsupportedSourceType(String),

    /// A limit-shaped call was made on a keyword fetcher, or vice versa.
    #[error("{source_name} does not support {operation}")]
    UnsupportedOperation {
        source_name: String,
        operation: &'static str,
    },

    /// A required configuration key (selector, endpoint, keyword list) is
    /// absent or empty.
    #[error("source {source_name}: missing required config key `{key}`")]
    MissingConfig { source_name: String, key: String },

    /// A CSS selector string failed to parse at construction time.
    #[error("invalid CSS selector `{0}`")]
    Selector(String),

    /// The HTTP client itself could not be built.
    #[error("failed to build HTTP client: {0}")]
    Client(#[source] reqwest::Error),

    /// Timeout, DNS failure, connection refused, or any other transport
    /// fault from the HTTP client.
    #[error("request to {url} failed: {source}")]
    Transport {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    /// The server answered, but with a non-2xx status.
    #[error("HTTP {status} from {url}")]
    Status {
        url: String,
        status: reqwest::StatusCode,
    },

    /// The document arrived but did not contain what the configuration
    /// expects (empty feed, selector matching nothing). Kept distinct from
    /// [`FetchError::Transport`] so operators can tell "site changed" from
    /// "site unreachable".
    #[error("{0}")]
    Structure(String),

    /// The feed body could not be parsed even by the lenient recovery scan.
    #[error("feed at {url} could not be parsed: {reason}")]
    FeedParse { url: String, reason: String },
}
