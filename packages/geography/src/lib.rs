#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Community boundaries, community selection, and permit geo resolution.
//!
//! Loads community polygons from the open-data portal, resolves a
//! requested community (including deep links) to a polygon with a safe
//! fallback, and turns normalized permits into map-ready
//! [`GeoTaggedRecord`](community_map_permit_models::GeoTaggedRecord)s.

pub mod communities;
pub mod resolve;
pub mod selection;

use thiserror::Error;

/// Errors that can occur during geography operations.
#[derive(Debug, Error)]
pub enum GeographyError {
    /// Fetching the boundary dataset failed.
    #[error("Source error: {0}")]
    Source(#[from] community_map_source::SourceError),

    /// Geometry conversion error.
    #[error("Conversion error: {message}")]
    Conversion {
        /// Description of what went wrong.
        message: String,
    },
}
