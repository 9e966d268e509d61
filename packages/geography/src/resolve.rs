//! Geo resolution for normalized permits.
//!
//! Some datasets publish rounded flat coordinates next to an exact
//! `GeoJSON` point; [`resolve_points`] prefers the point. Land-use records
//! cannot be filtered by community upstream, so [`filter_within`] performs
//! the spatial inner join locally.

use community_map_geography_models::{CommunityPolygon, DEFAULT_CENTER, MapCenter};
use community_map_permit_models::GeoTaggedRecord;
use community_map_source::parsing::{parse_coordinate, valid_lat_lng};
use community_map_source_models::NormalizedPermit;
use geo::{Centroid, Intersects, Point};

/// Reads `(latitude, longitude)` from a `GeoJSON` point.
///
/// `GeoJSON` orders positions `[longitude, latitude]`, so index 1 is the
/// latitude.
#[must_use]
pub fn extract_point(point: &serde_json::Value) -> Option<(f64, f64)> {
    let coordinates = point.get("coordinates")?.as_array()?;
    let longitude = coordinates.first().and_then(parse_coordinate);
    let latitude = coordinates.get(1).and_then(parse_coordinate);
    valid_lat_lng(latitude, longitude)
}

/// Overwrites flat coordinates with the nested point where one is usable.
///
/// Permits without a nested point, or with a malformed one, keep their
/// flat coordinates.
pub fn resolve_points(permits: &mut [NormalizedPermit]) {
    for permit in permits {
        if let Some((latitude, longitude)) = permit.point.as_ref().and_then(extract_point) {
            permit.latitude = Some(latitude);
            permit.longitude = Some(longitude);
        }
    }
}

/// Builds map markers from normalized permits.
///
/// Permits without both coordinates are left off the map; they still
/// appear in the table.
#[must_use]
pub fn geo_tag(permits: &[NormalizedPermit]) -> Vec<GeoTaggedRecord> {
    let records: Vec<GeoTaggedRecord> = permits
        .iter()
        .filter_map(|permit| {
            Some(GeoTaggedRecord {
                source: permit.source,
                row: permit.row.clone(),
                latitude: permit.latitude?,
                longitude: permit.longitude?,
            })
        })
        .collect();

    if records.len() < permits.len() {
        log::debug!(
            "{} of {} permits have no coordinates",
            permits.len() - records.len(),
            permits.len()
        );
    }

    records
}

/// Keeps only records inside `community`, boundary included.
///
/// This is an inner join: records outside the polygon are dropped.
#[must_use]
pub fn filter_within(
    records: Vec<GeoTaggedRecord>,
    community: &CommunityPolygon,
) -> Vec<GeoTaggedRecord> {
    let total = records.len();
    let kept: Vec<GeoTaggedRecord> = records
        .into_iter()
        .filter(|record| {
            community
                .boundary
                .intersects(&Point::new(record.longitude, record.latitude))
        })
        .collect();

    log::debug!(
        "{} of {total} records fall inside {}",
        kept.len(),
        community.name
    );

    kept
}

/// Approximates where the map should be centered.
///
/// Uses the community centroid when a polygon is selected, otherwise the
/// unweighted mean of `points`, otherwise [`DEFAULT_CENTER`].
#[must_use]
pub fn map_center(community: Option<&CommunityPolygon>, points: &[GeoTaggedRecord]) -> MapCenter {
    if let Some(centroid) = community.and_then(|c| c.boundary.centroid()) {
        return MapCenter {
            latitude: centroid.y(),
            longitude: centroid.x(),
            ..DEFAULT_CENTER
        };
    }

    if points.is_empty() {
        return DEFAULT_CENTER;
    }

    #[allow(clippy::cast_precision_loss)]
    let count = points.len() as f64;
    let latitude = points.iter().map(|p| p.latitude).sum::<f64>() / count;
    let longitude = points.iter().map(|p| p.longitude).sum::<f64>() / count;

    MapCenter {
        latitude,
        longitude,
        ..DEFAULT_CENTER
    }
}

#[cfg(test)]
mod tests {
    use community_map_permit_models::{PermitRow, PermitSource};
    use geo::{MultiPolygon, polygon};

    use super::*;

    fn permit(latitude: Option<f64>, longitude: Option<f64>) -> NormalizedPermit {
        NormalizedPermit {
            source: PermitSource::DevelopmentPermit,
            row: PermitRow::default(),
            latitude,
            longitude,
            point: None,
        }
    }

    fn record(latitude: f64, longitude: f64) -> GeoTaggedRecord {
        GeoTaggedRecord {
            source: PermitSource::LandUse,
            row: PermitRow {
                permit_number: Some(format!("{latitude},{longitude}")),
                ..PermitRow::default()
            },
            latitude,
            longitude,
        }
    }

    fn square_community() -> CommunityPolygon {
        CommunityPolygon {
            name: "SQUARE".to_string(),
            boundary: MultiPolygon(vec![polygon![
                (x: 0.0, y: 0.0),
                (x: 10.0, y: 0.0),
                (x: 10.0, y: 10.0),
                (x: 0.0, y: 10.0),
            ]]),
        }
    }

    #[test]
    fn nested_point_is_lon_lat() {
        let point = serde_json::json!({ "type": "Point", "coordinates": [-114.1, 51.04] });
        let (latitude, longitude) = extract_point(&point).unwrap();
        assert!((latitude - 51.04).abs() < f64::EPSILON);
        assert!((longitude - -114.1).abs() < f64::EPSILON);
    }

    #[test]
    fn malformed_points_are_ignored() {
        assert!(extract_point(&serde_json::json!({ "coordinates": [-114.1] })).is_none());
        assert!(extract_point(&serde_json::json!({ "type": "Point" })).is_none());
        assert!(extract_point(&serde_json::json!("POINT (-114.1 51.04)")).is_none());
    }

    #[test]
    fn resolve_points_overwrites_rounded_flat_values() {
        let mut permits = vec![permit(Some(51.0), Some(-114.0)), permit(Some(51.0), Some(-114.0))];
        permits[0].point = Some(serde_json::json!({ "coordinates": [-114.0987, 51.0412] }));
        permits[1].point = Some(serde_json::json!({ "coordinates": [] }));
        resolve_points(&mut permits);

        assert!((permits[0].latitude.unwrap() - 51.0412).abs() < f64::EPSILON);
        assert!((permits[0].longitude.unwrap() - -114.0987).abs() < f64::EPSILON);
        assert!((permits[1].latitude.unwrap() - 51.0).abs() < f64::EPSILON);
    }

    #[test]
    fn geo_tag_skips_permits_without_coordinates() {
        let permits = vec![
            permit(Some(51.04), Some(-114.1)),
            permit(None, Some(-114.1)),
            permit(None, None),
        ];
        let tagged = geo_tag(&permits);
        assert_eq!(tagged.len(), 1);
        assert_eq!(tagged[0].source, PermitSource::DevelopmentPermit);
    }

    #[test]
    fn filter_keeps_boundary_and_drops_outside() {
        let records = vec![
            record(5.0, 5.0),
            record(0.0, 5.0),
            record(10.0, 10.0),
            record(5.0, 10.5),
            record(-0.1, 5.0),
        ];
        let kept = filter_within(records, &square_community());
        let numbers: Vec<&str> = kept
            .iter()
            .filter_map(|r| r.row.permit_number.as_deref())
            .collect();
        assert_eq!(numbers, vec!["5,5", "0,5", "10,10"]);
    }

    #[test]
    fn centers_on_community_centroid() {
        let center = map_center(Some(&square_community()), &[record(100.0, 100.0)]);
        assert!((center.latitude - 5.0).abs() < 1e-9);
        assert!((center.longitude - 5.0).abs() < 1e-9);
        assert_eq!(center.zoom, DEFAULT_CENTER.zoom);
    }

    #[test]
    fn centers_on_mean_of_points_without_community() {
        let center = map_center(None, &[record(51.0, -114.0), record(51.1, -114.2)]);
        assert!((center.latitude - 51.05).abs() < 1e-9);
        assert!((center.longitude - -114.1).abs() < 1e-9);
    }

    #[test]
    fn falls_back_to_default_center() {
        assert_eq!(map_center(None, &[]), DEFAULT_CENTER);
    }
}
