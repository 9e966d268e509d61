#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Permit dataset definitions and the normalized per-source permit format.
//!
//! A [`DatasetSpec`] captures everything that differs between the permit
//! datasets: where to fetch them, which columns to drop and rename, and how
//! coordinates are stored. The normalizer turns raw records into
//! [`NormalizedPermit`]s using nothing but that table.

use std::collections::BTreeMap;

use community_map_permit_models::{PermitColumn, PermitRow, PermitSource};
use serde::{Deserialize, Serialize};

/// Static configuration for one permit dataset.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DatasetSpec {
    /// Which permit source this dataset provides.
    pub source: PermitSource,
    /// Socrata dataset identifier (e.g. `"c2es-76ed"`).
    pub dataset_id: String,
    /// Map layer name (e.g. `"Building Permits"`).
    pub label: String,
    /// Map marker color as a CSS color string.
    pub color: String,
    /// Maximum number of records per fetch.
    pub limit: u64,
    /// Source-specific columns removed before renaming.
    #[serde(default)]
    pub drop: Vec<String>,
    /// Source column name -> canonical column name.
    #[serde(default)]
    pub rename: BTreeMap<String, String>,
    /// Where the record's coordinates live.
    #[serde(default)]
    pub coordinates: CoordinateMode,
    /// Column shown as the marker's description on hover.
    #[serde(default = "default_tooltip")]
    pub tooltip: PermitColumn,
    /// Link for a permit number, with `{permit_number}` as placeholder.
    #[serde(default)]
    pub link_template: Option<String>,
}

const fn default_tooltip() -> PermitColumn {
    PermitColumn::Description
}

impl DatasetSpec {
    /// Whether this dataset accepts a server-side community name filter.
    #[must_use]
    pub const fn supports_community_filter(&self) -> bool {
        self.source.supports_community_filter()
    }

    /// Returns the human-readable portal page for this dataset.
    ///
    /// `data.calgary.ca` + `c2es-76ed` -> `https://data.calgary.ca/d/c2es-76ed`
    #[must_use]
    pub fn portal_url(&self, domain: &str) -> String {
        format!("https://{domain}/d/{}", self.dataset_id)
    }

    /// Builds a hyperlink for a permit number, if this dataset has one.
    #[must_use]
    pub fn permit_link(&self, permit_number: &str) -> Option<String> {
        self.link_template
            .as_deref()
            .map(|template| template.replace("{permit_number}", permit_number))
    }
}

/// How a dataset stores coordinates.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum CoordinateMode {
    /// Flat `latitude` / `longitude` fields (possibly rounded).
    #[default]
    Flat,
    /// A nested `GeoJSON` point `{"coordinates": [lon, lat]}` holding the
    /// unrounded position.
    NestedPoint {
        /// JSON field holding the point.
        field: String,
    },
}

/// Query parameters for a single Socrata dataset fetch.
///
/// Also serves as the memoization key together with the dataset id.
#[derive(Debug, Clone, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SocrataQuery {
    /// `$limit`
    pub limit: Option<u64>,
    /// Exact-match `communityname` filter.
    pub community_name: Option<String>,
    /// `$where` predicate (e.g. `applieddate > '2023-01-01T00:00:00'`).
    pub where_clause: Option<String>,
    /// `$order` (e.g. `applieddate DESC`).
    pub order: Option<String>,
    /// `$$exclude_system_fields`
    pub exclude_system_fields: bool,
}

impl SocrataQuery {
    /// Returns the query as URL parameter pairs, in a stable order.
    #[must_use]
    pub fn params(&self) -> Vec<(&'static str, String)> {
        let mut params = Vec::new();
        if let Some(limit) = self.limit {
            params.push(("$limit", limit.to_string()));
        }
        if let Some(community) = &self.community_name {
            params.push(("communityname", community.clone()));
        }
        if let Some(where_clause) = &self.where_clause {
            params.push(("$where", where_clause.clone()));
        }
        if let Some(order) = &self.order {
            params.push(("$order", order.clone()));
        }
        if self.exclude_system_fields {
            params.push(("$$exclude_system_fields", "true".to_string()));
        }
        params
    }
}

/// A permit normalized to the canonical column set, tagged with its source.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NormalizedPermit {
    pub source: PermitSource,
    pub row: PermitRow,
    /// Flat latitude (WGS84), `None` if missing or unusable.
    pub latitude: Option<f64>,
    /// Flat longitude (WGS84), `None` if missing or unusable.
    pub longitude: Option<f64>,
    /// Nested point geometry for [`CoordinateMode::NestedPoint`] datasets.
    pub point: Option<serde_json::Value>,
}
