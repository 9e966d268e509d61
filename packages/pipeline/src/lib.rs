#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! The community permit pipeline.
//!
//! One [`Pipeline::run`] call resolves the requested community, fetches
//! every permit dataset, normalizes and geo-resolves the records, filters
//! land use by the community polygon, and unifies everything into a single
//! table. Steps are awaited one after another; nothing is spawned and no
//! state is kept between runs. Memoization belongs to the injected
//! [`DatasetFetcher`].

pub mod config;
pub mod unify;

use std::sync::Arc;

use chrono::NaiveDateTime;
use community_map_geography::GeographyError;
use community_map_geography::communities::fetch_communities;
use community_map_geography::resolve::{filter_within, geo_tag, map_center, resolve_points};
use community_map_geography::selection::{find_community, resolve_community};
use community_map_geography_models::{CommunityPolygon, CommunitySelection, MapCenter};
use community_map_permit_models::{GeoTaggedRecord, PermitRecord, PermitRow, PermitSource};
use community_map_source::cache::CachedFetcher;
use community_map_source::normalize::normalize_records;
use community_map_source::registry::all_datasets;
use community_map_source::socrata::SocrataClient;
use community_map_source::{DatasetFetcher, SourceError};
use community_map_source_models::DatasetSpec;

use crate::config::PipelineConfig;

/// Errors that abort a pipeline run.
#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    /// Fetching a permit dataset failed.
    #[error(transparent)]
    Source(#[from] SourceError),

    /// Loading community boundaries failed.
    #[error(transparent)]
    Geography(#[from] GeographyError),

    /// Invalid configuration value.
    #[error("Invalid configuration: {message}")]
    Config {
        /// What was wrong.
        message: String,
    },
}

/// One map layer: a dataset and the markers it contributes.
#[derive(Debug, Clone)]
pub struct MapLayer {
    pub dataset: DatasetSpec,
    pub points: Vec<GeoTaggedRecord>,
}

/// Everything the dashboard renders for one community.
#[derive(Debug, Clone)]
pub struct Dashboard {
    pub selection: CommunitySelection,
    pub center: MapCenter,
    /// One layer per fetched dataset, in source order.
    pub layers: Vec<MapLayer>,
    /// The unified table, newest first, with each record's source.
    pub table: Vec<(PermitSource, PermitRecord)>,
}

impl Dashboard {
    /// The layer for `source`, if that dataset was fetched.
    #[must_use]
    pub fn layer(&self, source: PermitSource) -> Option<&MapLayer> {
        self.layers.iter().find(|l| l.dataset.source == source)
    }
}

/// The configured pipeline.
pub struct Pipeline {
    fetcher: Arc<dyn DatasetFetcher>,
    datasets: Vec<DatasetSpec>,
    config: PipelineConfig,
}

impl Pipeline {
    /// Builds a pipeline over `datasets`, sorted into source order.
    #[must_use]
    pub fn new(
        fetcher: Arc<dyn DatasetFetcher>,
        mut datasets: Vec<DatasetSpec>,
        config: PipelineConfig,
    ) -> Self {
        datasets.sort_by_key(|d| d.source);
        Self {
            fetcher,
            datasets,
            config,
        }
    }

    /// Builds the production pipeline: a Socrata client memoized for
    /// `config.cache_ttl`, over every embedded dataset definition.
    #[must_use]
    pub fn from_config(config: PipelineConfig) -> Self {
        let client = SocrataClient::new(config.domain.clone(), config.app_token.clone());
        let fetcher = CachedFetcher::new(client, config.cache_ttl);
        Self::new(Arc::new(fetcher), all_datasets(), config)
    }

    #[must_use]
    pub const fn config(&self) -> &PipelineConfig {
        &self.config
    }

    #[must_use]
    pub fn datasets(&self) -> &[DatasetSpec] {
        &self.datasets
    }

    /// Loads every community boundary, sorted by name.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::Geography`] if the boundary fetch fails.
    pub async fn communities(&self) -> Result<Vec<CommunityPolygon>, PipelineError> {
        let mut communities =
            fetch_communities(self.fetcher.as_ref(), &self.config.community_dataset).await?;
        communities.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(communities)
    }

    /// Runs the pipeline for `requested` as of the current local time.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError`] if any fetch fails. An unknown community
    /// is not an error; see [`CommunitySelection::warning`].
    pub async fn run(&self, requested: Option<&str>) -> Result<Dashboard, PipelineError> {
        self.run_at(requested, chrono::Local::now().naive_local())
            .await
    }

    /// Runs the pipeline for `requested` as of `now`.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError`] if any fetch fails.
    pub async fn run_at(
        &self,
        requested: Option<&str>,
        now: NaiveDateTime,
    ) -> Result<Dashboard, PipelineError> {
        let communities = self.communities().await?;
        let selection = resolve_community(&communities, requested, &self.config.default_community);
        let polygon = find_community(&communities, &selection.name);

        log::info!("Building dashboard for {}", selection.name);

        let mut layers = Vec::with_capacity(self.datasets.len());
        let mut tables: Vec<(PermitSource, Vec<PermitRow>)> = Vec::with_capacity(self.datasets.len());

        for dataset in &self.datasets {
            let polygon_filter = if dataset.supports_community_filter() {
                None
            } else if !self.config.include_land_use {
                log::debug!("Skipping {}: disabled", dataset.label);
                continue;
            } else if let Some(polygon) = polygon {
                Some(polygon)
            } else {
                log::warn!(
                    "Skipping {}: no boundary for {}",
                    dataset.label,
                    selection.name
                );
                continue;
            };

            let query = self.config.query_for(dataset, &selection.name, now);
            log::info!("Fetching {} ({})", dataset.label, dataset.dataset_id);
            let records = self.fetcher.fetch(&dataset.dataset_id, &query).await?;

            let mut permits = normalize_records(dataset, &records);
            resolve_points(&mut permits);
            let mut points = geo_tag(&permits);

            let rows: Vec<PermitRow> = if let Some(polygon) = polygon_filter {
                points = filter_within(points, polygon);
                points.iter().map(|p| p.row.clone()).collect()
            } else {
                permits.into_iter().map(|p| p.row).collect()
            };

            log::debug!(
                "{}: {} records, {} on the map",
                dataset.label,
                records.len(),
                points.len()
            );

            tables.push((dataset.source, rows));
            layers.push(MapLayer {
                dataset: dataset.clone(),
                points,
            });
        }

        let building_points: Vec<GeoTaggedRecord> = layers
            .iter()
            .filter(|l| l.dataset.source == PermitSource::BuildingPermit)
            .flat_map(|l| l.points.iter().cloned())
            .collect();
        let center = map_center(polygon, &building_points);

        Ok(Dashboard {
            selection,
            center,
            layers,
            table: unify::unify_tagged(tables),
        })
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;
    use std::sync::Mutex;

    use async_trait::async_trait;
    use community_map_source_models::SocrataQuery;

    use super::*;

    /// Serves canned rows per dataset id and records every query.
    #[derive(Default)]
    struct FakeFetcher {
        rows: BTreeMap<String, Vec<serde_json::Value>>,
        failing: Option<String>,
        queries: Mutex<Vec<(String, SocrataQuery)>>,
    }

    impl FakeFetcher {
        fn with(mut self, dataset_id: &str, rows: Vec<serde_json::Value>) -> Self {
            self.rows.insert(dataset_id.to_string(), rows);
            self
        }

        fn query_for(&self, dataset_id: &str) -> Option<SocrataQuery> {
            self.queries
                .lock()
                .unwrap()
                .iter()
                .find(|(id, _)| id == dataset_id)
                .map(|(_, q)| q.clone())
        }
    }

    #[async_trait]
    impl DatasetFetcher for FakeFetcher {
        async fn fetch(
            &self,
            dataset_id: &str,
            query: &SocrataQuery,
        ) -> Result<Vec<serde_json::Value>, SourceError> {
            self.queries
                .lock()
                .unwrap()
                .push((dataset_id.to_string(), query.clone()));
            if self.failing.as_deref() == Some(dataset_id) {
                return Err(SourceError::Status {
                    status: 503,
                    url: dataset_id.to_string(),
                });
            }
            Ok(self.rows.get(dataset_id).cloned().unwrap_or_default())
        }
    }

    fn square(name: &str, x0: f64, y0: f64) -> serde_json::Value {
        serde_json::json!({
            "name": name,
            "multipolygon": {
                "type": "MultiPolygon",
                "coordinates": [[[
                    [x0, y0], [x0 + 0.1, y0], [x0 + 0.1, y0 + 0.1], [x0, y0 + 0.1], [x0, y0]
                ]]]
            }
        })
    }

    fn calgary() -> FakeFetcher {
        FakeFetcher::default()
            .with(
                "jd78-wxjp",
                vec![square("SUNALTA", -114.15, 51.0), square("BELTLINE", -114.05, 51.0)],
            )
            .with(
                "6933-unw5",
                vec![serde_json::json!({
                    "permitnum": "DP1",
                    "applieddate": "2023-01-05T00:00:00.000",
                    "statuscurrent": "Released",
                    "description": "New deck",
                    "latitude": "51.0",
                    "longitude": "-114.1",
                    "point": { "type": "Point", "coordinates": [-114.1012, 51.0412] },
                })],
            )
            .with(
                "c2es-76ed",
                vec![
                    serde_json::json!({
                        "permitnum": "BP1",
                        "applieddate": "2023-02-10T00:00:00.000",
                        "originaladdress": "1 MAIN ST SW",
                        "latitude": "51.04",
                        "longitude": "-114.12",
                    }),
                    serde_json::json!({ "permitnum": "BP2", "applieddate": "2022-12-01T00:00:00.000" }),
                ],
            )
            .with(
                "wrtt-2nqs",
                vec![serde_json::json!({
                    "permitnum": "TC1",
                    "applieddate": "2023-01-05T00:00:00.000",
                    "applicantname": "ACME LTD",
                    "point": { "type": "Point", "coordinates": [-114.11, 51.05] },
                })],
            )
            .with(
                "33vi-ew4s",
                vec![
                    serde_json::json!({
                        "permitnum": "LOC-IN",
                        "applieddate": "2023-03-01T00:00:00.000",
                        "latitude": "51.05",
                        "longitude": "-114.1",
                    }),
                    serde_json::json!({
                        "permitnum": "LOC-OUT",
                        "applieddate": "2023-03-02T00:00:00.000",
                        "latitude": "51.05",
                        "longitude": "-114.0",
                    }),
                    serde_json::json!({ "permitnum": "LOC-NOWHERE", "applieddate": "2023-03-03T00:00:00.000" }),
                ],
            )
    }

    fn pipeline(fetcher: FakeFetcher) -> (Arc<FakeFetcher>, Pipeline) {
        let fetcher = Arc::new(fetcher);
        let pipeline = Pipeline::new(fetcher.clone(), all_datasets(), PipelineConfig::default());
        (fetcher, pipeline)
    }

    fn now() -> NaiveDateTime {
        NaiveDateTime::parse_from_str("2023-06-01T12:00:00", "%Y-%m-%dT%H:%M:%S").unwrap()
    }

    fn table_numbers(dashboard: &Dashboard) -> Vec<&str> {
        dashboard
            .table
            .iter()
            .filter_map(|(_, r)| r.permit_number.as_deref())
            .collect()
    }

    #[tokio::test]
    async fn builds_layers_and_sorted_table() {
        let (_, pipeline) = pipeline(calgary());
        let dashboard = pipeline.run_at(Some("sunalta"), now()).await.unwrap();

        assert_eq!(dashboard.selection.name, "SUNALTA");
        assert!(dashboard.selection.warning.is_none());
        assert_eq!(dashboard.layers.len(), 4);
        assert_eq!(
            table_numbers(&dashboard),
            vec!["LOC-IN", "BP1", "DP1", "TC1", "BP2"]
        );
    }

    #[tokio::test]
    async fn prefers_nested_points_and_skips_unlocated_markers() {
        let (_, pipeline) = pipeline(calgary());
        let dashboard = pipeline.run_at(None, now()).await.unwrap();

        let development = dashboard.layer(PermitSource::DevelopmentPermit).unwrap();
        assert!((development.points[0].latitude - 51.0412).abs() < f64::EPSILON);
        assert!((development.points[0].longitude - -114.1012).abs() < f64::EPSILON);

        let building = dashboard.layer(PermitSource::BuildingPermit).unwrap();
        assert_eq!(building.points.len(), 1);
    }

    #[tokio::test]
    async fn land_use_is_filtered_by_polygon_only() {
        let (fetcher, pipeline) = pipeline(calgary());
        let dashboard = pipeline.run_at(None, now()).await.unwrap();

        let land_use = dashboard.layer(PermitSource::LandUse).unwrap();
        let numbers: Vec<&str> = land_use
            .points
            .iter()
            .filter_map(|p| p.row.permit_number.as_deref())
            .collect();
        assert_eq!(numbers, vec!["LOC-IN"]);
        assert!(!table_numbers(&dashboard).contains(&"LOC-OUT"));

        let land_use_query = fetcher.query_for("33vi-ew4s").unwrap();
        assert!(land_use_query.community_name.is_none());
        let building_query = fetcher.query_for("c2es-76ed").unwrap();
        assert_eq!(building_query.community_name.as_deref(), Some("SUNALTA"));
        assert_eq!(
            building_query.where_clause.as_deref(),
            Some("applieddate > '2022-06-01T00:00:00'")
        );
    }

    #[tokio::test]
    async fn unknown_community_falls_back_with_warning() {
        let (fetcher, pipeline) = pipeline(calgary());
        let dashboard = pipeline.run_at(Some("NOTREAL"), now()).await.unwrap();

        assert_eq!(dashboard.selection.name, "SUNALTA");
        assert!(dashboard.selection.warning.is_some());
        let query = fetcher.query_for("6933-unw5").unwrap();
        assert_eq!(query.community_name.as_deref(), Some("SUNALTA"));
    }

    #[tokio::test]
    async fn centers_on_selected_community() {
        let (_, pipeline) = pipeline(calgary());
        let dashboard = pipeline.run_at(Some("BELTLINE"), now()).await.unwrap();
        assert!((dashboard.center.longitude - -114.0).abs() < 1e-9);
        assert!((dashboard.center.latitude - 51.05).abs() < 1e-9);
    }

    #[tokio::test]
    async fn skips_land_use_without_boundaries() {
        let mut fetcher = calgary();
        fetcher.rows.remove("jd78-wxjp");
        let (fetcher, pipeline) = pipeline(fetcher);
        let dashboard = pipeline.run_at(None, now()).await.unwrap();

        assert_eq!(dashboard.layers.len(), 3);
        assert!(dashboard.layer(PermitSource::LandUse).is_none());
        assert!(fetcher.query_for("33vi-ew4s").is_none());
        // Mean of the single located building permit.
        assert!((dashboard.center.latitude - 51.04).abs() < 1e-9);
    }

    #[tokio::test]
    async fn fetch_failure_aborts_the_run() {
        let mut fetcher = calgary();
        fetcher.failing = Some("c2es-76ed".to_string());
        let (_, pipeline) = pipeline(fetcher);
        let err = pipeline.run_at(None, now()).await.unwrap_err();
        assert!(matches!(
            err,
            PipelineError::Source(SourceError::Status { status: 503, .. })
        ));
    }

    #[tokio::test]
    async fn lists_communities_by_name() {
        let (_, pipeline) = pipeline(calgary());
        let names: Vec<String> = pipeline
            .communities()
            .await
            .unwrap()
            .into_iter()
            .map(|c| c.name)
            .collect();
        assert_eq!(names, vec!["BELTLINE", "SUNALTA"]);
    }
}
