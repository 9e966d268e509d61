//! Socrata SODA API client.
//!
//! Fetches a dataset's records from `https://{domain}/resource/{id}.json`
//! using the `$limit`, `$where`, `$order`, and `$$exclude_system_fields`
//! query parameters plus plain column filters (`communityname`). An app
//! token, when configured, is passed through untouched in the
//! `X-App-Token` header.

use async_trait::async_trait;
use community_map_source_models::SocrataQuery;

use crate::retry::{self, MAX_RETRIES};
use crate::{DatasetFetcher, SourceError};

/// A [`DatasetFetcher`] backed by a Socrata open-data portal.
#[derive(Debug, Clone)]
pub struct SocrataClient {
    client: reqwest::Client,
    domain: String,
    app_token: Option<String>,
}

impl SocrataClient {
    /// Creates a client for `domain` (e.g. `"data.calgary.ca"`).
    #[must_use]
    pub fn new(domain: impl Into<String>, app_token: Option<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            domain: domain.into(),
            app_token,
        }
    }
}

/// Builds the JSON resource URL for a dataset.
#[must_use]
pub fn resource_url(domain: &str, dataset_id: &str) -> String {
    format!("https://{domain}/resource/{dataset_id}.json")
}

#[async_trait]
impl DatasetFetcher for SocrataClient {
    async fn fetch(
        &self,
        dataset_id: &str,
        query: &SocrataQuery,
    ) -> Result<Vec<serde_json::Value>, SourceError> {
        let url = resource_url(&self.domain, dataset_id);
        let params = query.params();

        log::info!("Fetching {dataset_id}: {params:?}");

        let body = retry::send_json(
            || {
                let request = self.client.get(&url).query(&params);
                match &self.app_token {
                    Some(token) => request.header("X-App-Token", token),
                    None => request,
                }
            },
            MAX_RETRIES,
        )
        .await?;

        let serde_json::Value::Array(records) = body else {
            return Err(SourceError::UnexpectedResponse {
                message: format!("{dataset_id}: expected a JSON array of records"),
            });
        };

        log::info!("Downloaded {} {dataset_id} records", records.len());

        Ok(records)
    }
}
