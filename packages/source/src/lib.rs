#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Permit dataset fetching and field normalization.
//!
//! Raw records come from a [`DatasetFetcher`] (the Socrata client in
//! production, an in-memory fake in tests), optionally memoized through
//! [`cache::CachedFetcher`], and are normalized into the canonical permit
//! schema by [`normalize::normalize_records`] using the embedded dataset
//! table in [`registry`].

pub mod cache;
pub mod normalize;
pub mod parsing;
pub mod registry;
pub mod retry;
pub mod socrata;

use async_trait::async_trait;
use community_map_source_models::SocrataQuery;

/// Errors that can occur while fetching or configuring datasets.
#[derive(Debug, thiserror::Error)]
pub enum SourceError {
    /// HTTP request failed.
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// The API answered with a non-success status.
    #[error("HTTP {status} from {url}")]
    Status {
        /// Response status code.
        status: u16,
        /// Requested URL.
        url: String,
    },

    /// JSON parsing failed.
    #[error("JSON parse error: {0}")]
    Json(#[from] serde_json::Error),

    /// A response had an unexpected shape.
    #[error("Unexpected response: {message}")]
    UnexpectedResponse {
        /// Description of what went wrong.
        message: String,
    },

    /// A dataset definition could not be parsed.
    #[error("Invalid dataset definition {name}: {message}")]
    Dataset {
        /// Definition name.
        name: String,
        /// Parser message.
        message: String,
    },
}

/// A source of raw open-data records.
///
/// Each record is a string-keyed JSON object with untyped values.
/// Transport, auth, and rate-limit failures must be returned, never
/// swallowed.
#[async_trait]
pub trait DatasetFetcher: Send + Sync {
    /// Fetches the records of `dataset_id` matching `query`.
    ///
    /// # Errors
    ///
    /// Returns [`SourceError`] if the request or decoding fails.
    async fn fetch(
        &self,
        dataset_id: &str,
        query: &SocrataQuery,
    ) -> Result<Vec<serde_json::Value>, SourceError>;
}

#[async_trait]
impl<T: DatasetFetcher + ?Sized> DatasetFetcher for std::sync::Arc<T> {
    async fn fetch(
        &self,
        dataset_id: &str,
        query: &SocrataQuery,
    ) -> Result<Vec<serde_json::Value>, SourceError> {
        (**self).fetch(dataset_id, query).await
    }
}
