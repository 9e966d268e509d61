#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Permit source taxonomy and the unified permit record schema.
//!
//! Every open-data permit dataset (development permits, building permits,
//! tenancy changes, land-use redesignations) is normalized into the same
//! ten-column [`PermitRow`] shape, and the unifier turns those rows into
//! typed [`PermitRecord`]s for the dashboard table.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use strum_macros::{AsRefStr, Display, EnumString};

/// Hover text shown for every map marker. The `description` slot is filled
/// from the source's tooltip column.
pub const HOVER_TEMPLATE: &str =
    "{permit_number}:<br>Status: {current_status}<br><br>Description: {description}";

/// The permit dataset a record came from.
///
/// Declaration order is the concatenation order of the unified table.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    AsRefStr,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum PermitSource {
    /// Development permit applications
    DevelopmentPermit,
    /// Building permit applications
    BuildingPermit,
    /// Tenancy change applications
    TenancyChange,
    /// Land-use redesignation applications
    LandUse,
}

impl PermitSource {
    /// All sources, in unified-table order.
    pub const ALL: [Self; 4] = [
        Self::DevelopmentPermit,
        Self::BuildingPermit,
        Self::TenancyChange,
        Self::LandUse,
    ];

    /// Whether the upstream dataset can be filtered by community name
    /// server-side. Land use cannot, so it is over-fetched and filtered
    /// by polygon instead.
    #[must_use]
    pub const fn supports_community_filter(self) -> bool {
        !matches!(self, Self::LandUse)
    }
}

/// A canonical column of the unified permit schema, named by the source
/// field it is read from after renaming.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    AsRefStr,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum PermitColumn {
    /// `permitnum`
    PermitNum,
    /// `address`
    Address,
    /// `applicant`
    Applicant,
    /// `description`
    Description,
    /// `applieddate`
    AppliedDate,
    /// `issueddate`
    IssuedDate,
    /// `statuscurrent`
    StatusCurrent,
    /// `permittype`
    PermitType,
    /// `estprojectcost`
    EstProjectCost,
    /// `contractorname`
    ContractorName,
}

impl PermitColumn {
    /// Every column of the schema, in table order.
    pub const ALL: [Self; 10] = [
        Self::PermitNum,
        Self::Address,
        Self::Applicant,
        Self::Description,
        Self::AppliedDate,
        Self::IssuedDate,
        Self::StatusCurrent,
        Self::PermitType,
        Self::EstProjectCost,
        Self::ContractorName,
    ];
}

/// One permit in the canonical column set, values still as source text.
///
/// A column the source does not provide is `None`, never a default.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PermitRow {
    pub permit_number: Option<String>,
    pub address: Option<String>,
    pub applicant: Option<String>,
    pub description: Option<String>,
    /// Raw `applieddate` timestamp.
    pub applied_at: Option<String>,
    /// Raw `issueddate` timestamp.
    pub issued_at: Option<String>,
    pub current_status: Option<String>,
    pub permit_type: Option<String>,
    pub estimated_project_cost: Option<String>,
    pub contractor_name: Option<String>,
}

impl PermitRow {
    /// Returns the value held in `column`.
    #[must_use]
    pub fn get(&self, column: PermitColumn) -> Option<&str> {
        let value = match column {
            PermitColumn::PermitNum => &self.permit_number,
            PermitColumn::Address => &self.address,
            PermitColumn::Applicant => &self.applicant,
            PermitColumn::Description => &self.description,
            PermitColumn::AppliedDate => &self.applied_at,
            PermitColumn::IssuedDate => &self.issued_at,
            PermitColumn::StatusCurrent => &self.current_status,
            PermitColumn::PermitType => &self.permit_type,
            PermitColumn::EstProjectCost => &self.estimated_project_cost,
            PermitColumn::ContractorName => &self.contractor_name,
        };
        value.as_deref()
    }

    /// Replaces the value held in `column`.
    pub fn set(&mut self, column: PermitColumn, value: Option<String>) {
        let slot = match column {
            PermitColumn::PermitNum => &mut self.permit_number,
            PermitColumn::Address => &mut self.address,
            PermitColumn::Applicant => &mut self.applicant,
            PermitColumn::Description => &mut self.description,
            PermitColumn::AppliedDate => &mut self.applied_at,
            PermitColumn::IssuedDate => &mut self.issued_at,
            PermitColumn::StatusCurrent => &mut self.current_status,
            PermitColumn::PermitType => &mut self.permit_type,
            PermitColumn::EstProjectCost => &mut self.estimated_project_cost,
            PermitColumn::ContractorName => &mut self.contractor_name,
        };
        *slot = value;
    }
}

/// A row of the unified permit table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PermitRecord {
    /// Source-assigned permit identifier.
    pub permit_number: Option<String>,
    pub address: Option<String>,
    /// Not provided by development-permit or land-use sources.
    pub applicant: Option<String>,
    pub description: Option<String>,
    /// Application date with the time of day discarded.
    pub applied_date: Option<NaiveDate>,
    pub issued_date: Option<NaiveDate>,
    pub current_status: Option<String>,
    pub permit_type: Option<String>,
    /// Kept as text; source formatting is inconsistent.
    pub estimated_project_cost: Option<String>,
    pub contractor_name: Option<String>,
}

/// A permit with resolved WGS84 coordinates, ready to become a map marker.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeoTaggedRecord {
    pub source: PermitSource,
    pub row: PermitRow,
    pub latitude: f64,
    pub longitude: f64,
}

impl GeoTaggedRecord {
    /// Renders [`HOVER_TEMPLATE`] for this record, filling the description
    /// slot from `tooltip`. Missing values render as empty strings.
    #[must_use]
    pub fn hover_text(&self, tooltip: PermitColumn) -> String {
        render_hover(
            self.row.permit_number.as_deref(),
            self.row.current_status.as_deref(),
            self.row.get(tooltip),
        )
    }
}

/// Fills [`HOVER_TEMPLATE`] with the given values.
#[must_use]
pub fn render_hover(
    permit_number: Option<&str>,
    current_status: Option<&str>,
    description: Option<&str>,
) -> String {
    let permit_number = permit_number.unwrap_or_default();
    let current_status = current_status.unwrap_or_default();
    let description = description.unwrap_or_default();
    format!("{permit_number}:<br>Status: {current_status}<br><br>Description: {description}")
}
