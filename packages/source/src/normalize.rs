//! Field normalizer: raw Socrata records to the canonical permit schema.
//!
//! One routine serves every dataset. What differs between datasets (drop
//! list, rename map, coordinate mode) comes from the [`DatasetSpec`], so a
//! new source is a new TOML file rather than a new code path.
//!
//! A record is never rejected: missing or null columns become `None`.

use community_map_permit_models::{PermitColumn, PermitRow};
use community_map_source_models::{CoordinateMode, DatasetSpec, NormalizedPermit};

use crate::parsing::{parse_coordinate, valid_lat_lng, value_to_text};

/// Normalizes a page of raw records from the dataset described by `spec`.
#[must_use]
pub fn normalize_records(
    spec: &DatasetSpec,
    records: &[serde_json::Value],
) -> Vec<NormalizedPermit> {
    let permits: Vec<NormalizedPermit> = records
        .iter()
        .map(|record| normalize_record(spec, record))
        .collect();

    log::debug!(
        "Normalized {} {} records",
        permits.len(),
        spec.source.as_ref()
    );

    permits
}

/// Normalizes a single raw record.
#[must_use]
pub fn normalize_record(spec: &DatasetSpec, record: &serde_json::Value) -> NormalizedPermit {
    let Some(object) = record.as_object() else {
        log::warn!(
            "{}: record is not a JSON object, keeping it with every column empty",
            spec.dataset_id
        );
        return NormalizedPermit {
            source: spec.source,
            row: PermitRow::default(),
            latitude: None,
            longitude: None,
            point: None,
        };
    };

    // Read before dropping so a drop list may remove the raw point column.
    let point = match &spec.coordinates {
        CoordinateMode::Flat => None,
        CoordinateMode::NestedPoint { field } => {
            object.get(field).filter(|value| !value.is_null()).cloned()
        }
    };

    let mut fields = object.clone();
    for column in &spec.drop {
        fields.remove(column);
    }
    for (from, to) in &spec.rename {
        if let Some(value) = fields.remove(from) {
            fields.insert(to.clone(), value);
        }
    }

    let mut row = PermitRow::default();
    for column in PermitColumn::ALL {
        row.set(
            column,
            fields.get(column.as_ref()).and_then(value_to_text),
        );
    }

    let latitude = fields.get("latitude").and_then(parse_coordinate);
    let longitude = fields.get("longitude").and_then(parse_coordinate);
    let (latitude, longitude) = valid_lat_lng(latitude, longitude)
        .map_or((None, None), |(lat, lng)| (Some(lat), Some(lng)));

    NormalizedPermit {
        source: spec.source,
        row,
        latitude,
        longitude,
        point,
    }
}
