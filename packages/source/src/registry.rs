//! Dataset registry: loads every permit dataset definition from embedded
//! TOML.
//!
//! Each `.toml` file in `packages/source/datasets/` is baked into the
//! binary at compile time via [`include_str!`]. Adding a source is a new
//! TOML file plus an entry in the list below.

use community_map_permit_models::PermitSource;
use community_map_source_models::DatasetSpec;

use crate::SourceError;

/// TOML configs embedded at compile time, in unified-table order.
const DATASET_TOMLS: &[(&str, &str)] = &[
    (
        "development_permits",
        include_str!("../datasets/development_permits.toml"),
    ),
    (
        "building_permits",
        include_str!("../datasets/building_permits.toml"),
    ),
    (
        "tenancy_changes",
        include_str!("../datasets/tenancy_changes.toml"),
    ),
    ("land_use", include_str!("../datasets/land_use.toml")),
];

/// Parses a [`DatasetSpec`] from a TOML string.
///
/// # Errors
///
/// Returns [`SourceError::Dataset`] if the TOML is malformed or missing
/// required fields.
pub fn parse_dataset_toml(name: &str, toml_str: &str) -> Result<DatasetSpec, SourceError> {
    toml::de::from_str(toml_str).map_err(|e| SourceError::Dataset {
        name: name.to_string(),
        message: e.to_string(),
    })
}

/// Returns every configured dataset definition.
///
/// # Panics
///
/// Panics if any embedded TOML config is malformed (the configs ship
/// inside the binary, so this is caught by the registry tests).
#[must_use]
pub fn all_datasets() -> Vec<DatasetSpec> {
    DATASET_TOMLS
        .iter()
        .map(|(name, toml)| parse_dataset_toml(name, toml).unwrap_or_else(|e| panic!("{e}")))
        .collect()
}

/// Returns the dataset definition for `source`, if one is configured.
#[must_use]
pub fn dataset_for(source: PermitSource) -> Option<DatasetSpec> {
    all_datasets().into_iter().find(|spec| spec.source == source)
}
