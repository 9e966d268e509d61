#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! API request and response types for the community map server.
//!
//! These types are serialized to JSON for the REST API. They are separate
//! from the pipeline types to allow independent evolution of the API
//! contract.

use chrono::NaiveDate;
use community_map_geography_models::MapCenter;
use community_map_permit_models::{GeoTaggedRecord, HOVER_TEMPLATE, PermitRecord, PermitSource};
use community_map_pipeline::Dashboard;
use community_map_source_models::DatasetSpec;
use serde::{Deserialize, Serialize};

/// Query parameters for the dashboard endpoint.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardQueryParams {
    /// Free-text community name, possibly HTML-escaped.
    pub community: Option<String>,
}

/// Everything the dashboard page renders.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiDashboard {
    /// The community actually shown.
    pub community: String,
    /// The normalized community that was asked for, if any.
    pub requested: Option<String>,
    /// Set when the requested community was unknown.
    pub warning: Option<String>,
    pub center: ApiMapCenter,
    pub layers: Vec<ApiLayer>,
    pub table: Vec<ApiPermit>,
}

impl From<Dashboard> for ApiDashboard {
    fn from(dashboard: Dashboard) -> Self {
        let Dashboard {
            selection,
            center,
            layers,
            table,
        } = dashboard;

        let table = table
            .into_iter()
            .map(|(source, record)| {
                let dataset = layers
                    .iter()
                    .find(|l| l.dataset.source == source)
                    .map(|l| &l.dataset);
                ApiPermit::new(source, record, dataset)
            })
            .collect();

        Self {
            community: selection.name,
            requested: selection.requested,
            warning: selection.warning,
            center: center.into(),
            layers: layers
                .iter()
                .map(|l| ApiLayer::new(&l.dataset, &l.points))
                .collect(),
            table,
        }
    }
}

/// Initial map viewport.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiMapCenter {
    pub latitude: f64,
    pub longitude: f64,
    pub zoom: u8,
}

impl From<MapCenter> for ApiMapCenter {
    fn from(center: MapCenter) -> Self {
        Self {
            latitude: center.latitude,
            longitude: center.longitude,
            zoom: center.zoom,
        }
    }
}

/// One marker layer on the map.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiLayer {
    pub source: PermitSource,
    /// Legend label.
    pub name: String,
    /// Marker color as a CSS color string.
    pub color: String,
    /// Hover template with `{permit_number}`, `{current_status}`, and
    /// `{description}` placeholders.
    pub hover_template: String,
    pub points: Vec<ApiPoint>,
}

impl ApiLayer {
    /// Builds the layer for `dataset` from its geo-tagged records.
    #[must_use]
    pub fn new(dataset: &DatasetSpec, records: &[GeoTaggedRecord]) -> Self {
        Self {
            source: dataset.source,
            name: dataset.label.clone(),
            color: dataset.color.clone(),
            hover_template: HOVER_TEMPLATE.to_string(),
            points: records
                .iter()
                .map(|record| ApiPoint::new(dataset, record))
                .collect(),
        }
    }
}

/// A single map marker.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiPoint {
    pub latitude: f64,
    pub longitude: f64,
    pub permit_number: Option<String>,
    pub status: Option<String>,
    /// Value of the dataset's tooltip column.
    pub description: Option<String>,
    /// Fully rendered hover text.
    pub hover: String,
}

impl ApiPoint {
    #[must_use]
    pub fn new(dataset: &DatasetSpec, record: &GeoTaggedRecord) -> Self {
        Self {
            latitude: record.latitude,
            longitude: record.longitude,
            permit_number: record.row.permit_number.clone(),
            status: record.row.current_status.clone(),
            description: record.row.get(dataset.tooltip).map(str::to_string),
            hover: record.hover_text(dataset.tooltip),
        }
    }
}

/// A row of the unified permit table as returned by the API.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiPermit {
    pub source: PermitSource,
    pub permit_number: Option<String>,
    pub address: Option<String>,
    pub applicant: Option<String>,
    pub description: Option<String>,
    pub applied_date: Option<NaiveDate>,
    pub issued_date: Option<NaiveDate>,
    pub current_status: Option<String>,
    pub permit_type: Option<String>,
    pub estimated_project_cost: Option<String>,
    pub contractor_name: Option<String>,
    /// Link to the permit on the city's development map, if the source
    /// has one.
    pub permit_link: Option<String>,
}

impl ApiPermit {
    /// Converts a table record, linking its permit number through
    /// `dataset` when given.
    #[must_use]
    pub fn new(source: PermitSource, record: PermitRecord, dataset: Option<&DatasetSpec>) -> Self {
        let permit_link = record
            .permit_number
            .as_deref()
            .zip(dataset)
            .and_then(|(number, dataset)| dataset.permit_link(number));

        Self {
            source,
            permit_number: record.permit_number,
            address: record.address,
            applicant: record.applicant,
            description: record.description,
            applied_date: record.applied_date,
            issued_date: record.issued_date,
            current_status: record.current_status,
            permit_type: record.permit_type,
            estimated_project_cost: record.estimated_project_cost,
            contractor_name: record.contractor_name,
            permit_link,
        }
    }
}

/// A configured permit dataset, for attribution.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiSource {
    pub source: PermitSource,
    pub name: String,
    pub dataset_id: String,
    pub color: String,
    /// Human-readable dataset page on the open-data portal.
    pub portal_url: String,
    /// Whether the dataset is filtered by community name upstream.
    pub community_filter: bool,
}

impl ApiSource {
    #[must_use]
    pub fn new(dataset: &DatasetSpec, domain: &str) -> Self {
        Self {
            source: dataset.source,
            name: dataset.label.clone(),
            dataset_id: dataset.dataset_id.clone(),
            color: dataset.color.clone(),
            portal_url: dataset.portal_url(domain),
            community_filter: dataset.supports_community_filter(),
        }
    }
}

/// Health check response.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiHealth {
    /// Whether the server is healthy.
    pub healthy: bool,
    /// Server version.
    pub version: String,
}

/// Error body for failed requests.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiError {
    pub error: String,
}
