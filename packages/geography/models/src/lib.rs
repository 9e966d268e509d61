#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Community boundary, selection, and map center types.
//!
//! Community polygons scope the land-use dataset, which cannot be filtered
//! by community name upstream. A [`CommunitySelection`] records which
//! community a request resolved to and why.

use geo::MultiPolygon;
use serde::{Deserialize, Serialize};

/// Community used when nothing (or nothing valid) was requested.
pub const DEFAULT_COMMUNITY: &str = "SUNALTA";

/// Zoom level for a single-community map.
pub const DEFAULT_ZOOM: u8 = 14;

/// Map center used when neither a polygon nor any points are available.
pub const DEFAULT_CENTER: MapCenter = MapCenter {
    latitude: 51.0425,
    longitude: -114.1,
    zoom: DEFAULT_ZOOM,
};

/// The boundary of a named community.
#[derive(Debug, Clone, PartialEq)]
pub struct CommunityPolygon {
    /// Upper-case community name, unique across the city.
    pub name: String,
    /// WGS84 boundary (`x` = longitude, `y` = latitude).
    pub boundary: MultiPolygon<f64>,
}

/// The outcome of resolving a requested community name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CommunitySelection {
    /// The community the dashboard will show.
    pub name: String,
    /// The normalized name that was asked for, if any.
    pub requested: Option<String>,
    /// User-facing message when the request fell back to the default.
    pub warning: Option<String>,
}

/// Where the map is centered.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MapCenter {
    pub latitude: f64,
    pub longitude: f64,
    pub zoom: u8,
}
