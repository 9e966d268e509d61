//! Process-wide pipeline configuration.
//!
//! Built once at startup, from environment variables with defaults, and
//! passed into [`crate::Pipeline`]. Nothing here changes per request.

use std::time::Duration;

use chrono::{Days, NaiveDate, NaiveDateTime, NaiveTime};
use community_map_geography::communities::CommunityDataset;
use community_map_geography_models::DEFAULT_COMMUNITY;
use community_map_source::cache::DEFAULT_TTL;
use community_map_source::parsing::parse_socrata_datetime;
use community_map_source_models::{DatasetSpec, SocrataQuery};

use crate::PipelineError;

/// Open-data portal serving every dataset.
pub const DEFAULT_DOMAIN: &str = "data.calgary.ca";

/// How far back the dashboard looks by default.
pub const DEFAULT_LOOKBACK_DAYS: u32 = 365;

/// Socrata timestamp format used in `$where` predicates.
const SOQL_TIMESTAMP_FORMAT: &str = "%Y-%m-%dT%H:%M:%S";

/// Which permits are recent enough to show, by application date.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LookbackWindow {
    /// Everything applied for in the last `days` days, counted from
    /// midnight so the window only moves once a day. The window therefore
    /// spans up to one extra partial day before `now`.
    Rolling { days: u32 },
    /// Everything applied for after a fixed timestamp.
    Since(NaiveDateTime),
}

impl Default for LookbackWindow {
    fn default() -> Self {
        Self::Rolling {
            days: DEFAULT_LOOKBACK_DAYS,
        }
    }
}

impl LookbackWindow {
    /// Returns the exclusive lower bound on `applieddate` as of `now`.
    #[must_use]
    pub fn since(&self, now: NaiveDateTime) -> NaiveDateTime {
        match self {
            Self::Rolling { days } => now
                .date()
                .checked_sub_days(Days::new(u64::from(*days)))
                .unwrap_or(NaiveDate::MIN)
                .and_time(NaiveTime::default()),
            Self::Since(since) => *since,
        }
    }
}

/// Everything the pipeline needs besides its fetcher.
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// Socrata domain, e.g. `data.calgary.ca`.
    pub domain: String,
    /// Opaque Socrata app token, passed through as-is.
    pub app_token: Option<String>,
    /// Community shown when none (or an unknown one) is requested.
    pub default_community: String,
    pub lookback: LookbackWindow,
    /// Whether to fetch and polygon-filter the land-use dataset.
    pub include_land_use: bool,
    pub community_dataset: CommunityDataset,
    /// How long fetched datasets are memoized.
    pub cache_ttl: Duration,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            domain: DEFAULT_DOMAIN.to_string(),
            app_token: None,
            default_community: DEFAULT_COMMUNITY.to_string(),
            lookback: LookbackWindow::default(),
            include_land_use: true,
            community_dataset: CommunityDataset::default(),
            cache_ttl: DEFAULT_TTL,
        }
    }
}

impl PipelineConfig {
    /// Reads configuration from the process environment.
    ///
    /// | Variable | Default |
    /// |---|---|
    /// | `SOCRATA_DOMAIN` | `data.calgary.ca` |
    /// | `SOCRATA_APP_TOKEN` | none |
    /// | `COMMUNITY_MAP_DEFAULT_COMMUNITY` | `SUNALTA` |
    /// | `COMMUNITY_MAP_LOOKBACK_DAYS` | `365` |
    /// | `COMMUNITY_MAP_SINCE` | unset (rolling window) |
    /// | `COMMUNITY_MAP_CACHE_TTL_SECS` | `86400` |
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::Config`] if a variable is set to an
    /// unparseable value.
    pub fn from_env() -> Result<Self, PipelineError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Reads configuration through `lookup` instead of the environment.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::Config`] if a value is unparseable.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, PipelineError> {
        let var = |key: &str| {
            lookup(key)
                .map(|value| value.trim().to_string())
                .filter(|value| !value.is_empty())
        };

        let mut config = Self::default();

        if let Some(domain) = var("SOCRATA_DOMAIN") {
            config.domain = domain;
        }
        config.app_token = var("SOCRATA_APP_TOKEN");
        if let Some(community) = var("COMMUNITY_MAP_DEFAULT_COMMUNITY") {
            config.default_community = community.to_uppercase();
        }

        if let Some(since) = var("COMMUNITY_MAP_SINCE") {
            config.lookback = LookbackWindow::Since(parse_since(&since)?);
        } else if let Some(days) = var("COMMUNITY_MAP_LOOKBACK_DAYS") {
            let days = days.parse::<u32>().map_err(|e| PipelineError::Config {
                message: format!("COMMUNITY_MAP_LOOKBACK_DAYS={days}: {e}"),
            })?;
            config.lookback = LookbackWindow::Rolling { days };
        }

        if let Some(ttl) = var("COMMUNITY_MAP_CACHE_TTL_SECS") {
            let secs = ttl.parse::<u64>().map_err(|e| PipelineError::Config {
                message: format!("COMMUNITY_MAP_CACHE_TTL_SECS={ttl}: {e}"),
            })?;
            config.cache_ttl = Duration::from_secs(secs);
        }

        Ok(config)
    }

    /// The `$where` predicate selecting permits inside the lookback window.
    #[must_use]
    pub fn where_clause(&self, now: NaiveDateTime) -> String {
        format!(
            "applieddate > '{}'",
            self.lookback.since(now).format(SOQL_TIMESTAMP_FORMAT)
        )
    }

    /// Builds the fetch query for `dataset` scoped to `community`.
    ///
    /// Datasets without a community column are queried city-wide.
    #[must_use]
    pub fn query_for(
        &self,
        dataset: &DatasetSpec,
        community: &str,
        now: NaiveDateTime,
    ) -> SocrataQuery {
        SocrataQuery {
            limit: Some(dataset.limit),
            community_name: dataset
                .supports_community_filter()
                .then(|| community.to_string()),
            where_clause: Some(self.where_clause(now)),
            order: Some("applieddate DESC".to_string()),
            exclude_system_fields: true,
        }
    }
}

/// Parses `COMMUNITY_MAP_SINCE`: a full timestamp or a bare date.
fn parse_since(value: &str) -> Result<NaiveDateTime, PipelineError> {
    parse_socrata_datetime(value)
        .or_else(|| {
            NaiveDate::parse_from_str(value, "%Y-%m-%d")
                .ok()
                .map(|date| date.and_time(NaiveTime::default()))
        })
        .ok_or_else(|| PipelineError::Config {
            message: format!("COMMUNITY_MAP_SINCE={value}: expected YYYY-MM-DD[THH:MM:SS]"),
        })
}
