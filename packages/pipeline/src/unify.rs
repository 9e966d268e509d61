//! Record unifier: per-source permit rows to one sorted table.
//!
//! Tables are concatenated in [`PermitSource`] declaration order no matter
//! how they are passed in, then stably sorted newest first by application
//! date. Ties keep concatenation order. Nothing is merged or deduplicated.

use std::cmp::Reverse;

use community_map_permit_models::{PermitRecord, PermitRow, PermitSource};
use community_map_source::parsing::parse_socrata_date;

/// Unifies per-source rows into the dashboard table.
#[must_use]
pub fn unify(tables: Vec<(PermitSource, Vec<PermitRow>)>) -> Vec<PermitRecord> {
    unify_tagged(tables)
        .into_iter()
        .map(|(_, record)| record)
        .collect()
}

/// Same as [`unify`], keeping each record's source alongside it.
#[must_use]
pub fn unify_tagged(
    mut tables: Vec<(PermitSource, Vec<PermitRow>)>,
) -> Vec<(PermitSource, PermitRecord)> {
    tables.sort_by_key(|(source, _)| *source);

    let mut records: Vec<(PermitSource, PermitRecord)> = tables
        .into_iter()
        .flat_map(|(source, rows)| {
            rows.into_iter()
                .map(move |row| (source, to_record(source, row)))
        })
        .collect();

    // `Reverse(None)` sorts after every `Reverse(Some(_))`.
    records.sort_by_key(|(_, record)| Reverse(record.applied_date));

    records
}

/// Projects a row onto the table schema, parsing its dates.
#[must_use]
pub fn to_record(source: PermitSource, row: PermitRow) -> PermitRecord {
    let applied_date = parse_date(source, &row, row.applied_at.as_deref(), "applieddate");
    let issued_date = parse_date(source, &row, row.issued_at.as_deref(), "issueddate");

    PermitRecord {
        permit_number: row.permit_number,
        address: row.address,
        applicant: row.applicant,
        description: row.description,
        applied_date,
        issued_date,
        current_status: row.current_status,
        permit_type: row.permit_type,
        estimated_project_cost: row.estimated_project_cost,
        contractor_name: row.contractor_name,
    }
}

fn parse_date(
    source: PermitSource,
    row: &PermitRow,
    value: Option<&str>,
    column: &str,
) -> Option<chrono::NaiveDate> {
    let value = value?;
    let date = parse_socrata_date(value);
    if date.is_none() {
        log::warn!(
            "{source} {}: unparseable {column} {value:?}",
            row.permit_number.as_deref().unwrap_or("<no permit number>")
        );
    }
    date
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;

    use super::*;

    fn row(permit_number: &str, applied_at: Option<&str>) -> PermitRow {
        PermitRow {
            permit_number: Some(permit_number.to_string()),
            applied_at: applied_at.map(str::to_string),
            ..PermitRow::default()
        }
    }

    fn numbers(records: &[PermitRecord]) -> Vec<&str> {
        records
            .iter()
            .filter_map(|r| r.permit_number.as_deref())
            .collect()
    }

    #[test]
    fn newest_first_with_ties_in_source_order() {
        let records = unify(vec![
            (
                PermitSource::DevelopmentPermit,
                vec![row("DP1", Some("2023-01-05T00:00:00"))],
            ),
            (
                PermitSource::BuildingPermit,
                vec![row("BP1", Some("2023-02-10T00:00:00"))],
            ),
            (
                PermitSource::TenancyChange,
                vec![row("TC1", Some("2023-01-05T00:00:00"))],
            ),
        ]);
        assert_eq!(numbers(&records), vec!["BP1", "DP1", "TC1"]);
    }

    #[test]
    fn concatenates_in_source_order_regardless_of_argument_order() {
        let records = unify(vec![
            (
                PermitSource::LandUse,
                vec![row("LOC1", Some("2023-03-01T00:00:00"))],
            ),
            (
                PermitSource::TenancyChange,
                vec![row("TC1", Some("2023-03-01T09:00:00"))],
            ),
            (
                PermitSource::DevelopmentPermit,
                vec![row("DP1", Some("2023-03-01T17:45:00.000"))],
            ),
            (
                PermitSource::BuildingPermit,
                vec![row("BP1", Some("2023-03-01"))],
            ),
        ]);
        assert_eq!(numbers(&records), vec!["DP1", "BP1", "TC1", "LOC1"]);
    }

    #[test]
    fn ties_within_a_source_keep_arrival_order() {
        let records = unify(vec![(
            PermitSource::BuildingPermit,
            vec![
                row("BP2", Some("2023-01-01T00:00:00")),
                row("BP1", Some("2023-01-01T12:00:00")),
                row("BP3", Some("2023-01-01T06:00:00")),
            ],
        )]);
        assert_eq!(numbers(&records), vec!["BP2", "BP1", "BP3"]);
    }

    #[test]
    fn truncates_timestamps_to_dates() {
        let records = unify(vec![(
            PermitSource::DevelopmentPermit,
            vec![PermitRow {
                issued_at: Some("2023-07-15T08:00:00.000".to_string()),
                ..row("DP1", Some("2023-06-01T14:32:00"))
            }],
        )]);
        assert_eq!(
            records[0].applied_date,
            Some(NaiveDate::from_ymd_opt(2023, 6, 1).unwrap())
        );
        assert_eq!(
            records[0].issued_date,
            Some(NaiveDate::from_ymd_opt(2023, 7, 15).unwrap())
        );
    }

    #[test]
    fn missing_and_unparseable_dates_sort_last() {
        let records = unify(vec![
            (
                PermitSource::DevelopmentPermit,
                vec![row("DP1", None), row("DP2", Some("2023-01-01T00:00:00"))],
            ),
            (
                PermitSource::BuildingPermit,
                vec![row("BP1", Some("not a date")), row("BP2", Some("2022-01-01"))],
            ),
        ]);
        assert_eq!(numbers(&records), vec!["DP2", "BP2", "DP1", "BP1"]);
        assert!(records[3].applied_date.is_none());
    }

    #[test]
    fn keeps_every_column_and_duplicates() {
        let full = PermitRow {
            permit_number: Some("BP1".to_string()),
            address: Some("1 MAIN ST SW".to_string()),
            applicant: Some("ACME".to_string()),
            description: Some("Addition".to_string()),
            applied_at: Some("2023-01-01T00:00:00".to_string()),
            issued_at: None,
            current_status: Some("Issued".to_string()),
            permit_type: Some("Residential".to_string()),
            estimated_project_cost: Some("125000.00".to_string()),
            contractor_name: Some("BUILDERS INC".to_string()),
        };
        let records = unify(vec![(
            PermitSource::BuildingPermit,
            vec![full.clone(), full],
        )]);
        assert_eq!(records.len(), 2);
        assert_eq!(records[0], records[1]);
        assert_eq!(records[0].estimated_project_cost.as_deref(), Some("125000.00"));
        assert_eq!(records[0].contractor_name.as_deref(), Some("BUILDERS INC"));
        assert!(records[0].issued_date.is_none());
    }

    #[test]
    fn tagged_output_keeps_sources() {
        let tagged = unify_tagged(vec![
            (
                PermitSource::LandUse,
                vec![row("LOC1", Some("2024-01-01T00:00:00"))],
            ),
            (
                PermitSource::BuildingPermit,
                vec![row("BP1", Some("2023-01-01T00:00:00"))],
            ),
        ]);
        let sources: Vec<PermitSource> = tagged.iter().map(|(source, _)| *source).collect();
        assert_eq!(sources, vec![PermitSource::LandUse, PermitSource::BuildingPermit]);
    }
}
