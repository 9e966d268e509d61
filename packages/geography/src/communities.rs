//! Community boundary loading.
//!
//! Reads the community boundary dataset through the same
//! [`DatasetFetcher`] as the permit datasets and converts each row's
//! `GeoJSON` geometry column into a [`CommunityPolygon`].

use std::collections::BTreeSet;

use community_map_geography_models::CommunityPolygon;
use community_map_source::DatasetFetcher;
use community_map_source_models::SocrataQuery;
use geo::MultiPolygon;
use geojson::GeoJson;

use crate::GeographyError;

/// Where community boundaries live on the portal.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommunityDataset {
    /// Socrata dataset identifier.
    pub dataset_id: String,
    /// Column holding the community name.
    pub name_field: String,
    /// Column holding the boundary as `GeoJSON`.
    pub geometry_field: String,
    /// Record limit; the city has a few hundred communities.
    pub limit: u64,
}

impl Default for CommunityDataset {
    fn default() -> Self {
        Self {
            dataset_id: "jd78-wxjp".to_string(),
            name_field: "name".to_string(),
            geometry_field: "multipolygon".to_string(),
            limit: 1000,
        }
    }
}

/// Fetches and normalizes every community boundary.
///
/// # Errors
///
/// Returns [`GeographyError::Source`] if the fetch fails.
pub async fn fetch_communities(
    fetcher: &dyn DatasetFetcher,
    dataset: &CommunityDataset,
) -> Result<Vec<CommunityPolygon>, GeographyError> {
    let query = SocrataQuery {
        limit: Some(dataset.limit),
        order: Some(format!("{} ASC", dataset.name_field)),
        exclude_system_fields: true,
        ..SocrataQuery::default()
    };
    let rows = fetcher.fetch(&dataset.dataset_id, &query).await?;
    let communities = normalize_communities(&rows, dataset);

    log::info!(
        "Loaded {} community boundaries from {} rows",
        communities.len(),
        rows.len()
    );

    Ok(communities)
}

/// Normalizes raw boundary rows.
///
/// Rows with a missing name or unusable geometry are skipped, and only the
/// first row for each name is kept.
#[must_use]
pub fn normalize_communities(
    rows: &[serde_json::Value],
    dataset: &CommunityDataset,
) -> Vec<CommunityPolygon> {
    let mut seen = BTreeSet::new();
    let mut communities = Vec::with_capacity(rows.len());

    for row in rows {
        let Some(name) = row
            .get(&dataset.name_field)
            .and_then(serde_json::Value::as_str)
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_uppercase)
        else {
            continue;
        };

        let Some(geometry) = row.get(&dataset.geometry_field) else {
            log::warn!("Community {name} has no boundary, skipping");
            continue;
        };

        let boundary = match parse_boundary(geometry) {
            Ok(boundary) => boundary,
            Err(e) => {
                log::warn!("Community {name}: {e}");
                continue;
            }
        };

        if !seen.insert(name.clone()) {
            log::warn!("Duplicate community {name}, keeping the first boundary");
            continue;
        }

        communities.push(CommunityPolygon { name, boundary });
    }

    communities
}

/// Converts a `GeoJSON` geometry (object or JSON text) into a
/// [`MultiPolygon`]. Handles both `Polygon` and `MultiPolygon`.
///
/// # Errors
///
/// Returns [`GeographyError::Conversion`] if the value is not a polygonal
/// `GeoJSON` geometry.
pub fn parse_boundary(geometry: &serde_json::Value) -> Result<MultiPolygon<f64>, GeographyError> {
    let geojson = match geometry {
        serde_json::Value::String(text) => text.parse::<GeoJson>(),
        other => GeoJson::from_json_value(other.clone()),
    }
    .map_err(|e| GeographyError::Conversion {
        message: format!("invalid GeoJSON boundary: {e}"),
    })?;

    let GeoJson::Geometry(geometry) = geojson else {
        return Err(GeographyError::Conversion {
            message: "boundary is not a bare GeoJSON geometry".to_string(),
        });
    };

    let geometry: geo::Geometry<f64> =
        geometry
            .try_into()
            .map_err(|e: geojson::Error| GeographyError::Conversion {
                message: format!("unsupported boundary geometry: {e}"),
            })?;

    match geometry {
        geo::Geometry::MultiPolygon(mp) => Ok(mp),
        geo::Geometry::Polygon(p) => Ok(MultiPolygon(vec![p])),
        _ => Err(GeographyError::Conversion {
            message: "boundary is not a polygon".to_string(),
        }),
    }
}
