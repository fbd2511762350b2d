//! Export command: writes the lifetime report as a JSON document.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use chrono::{DateTime, Utc};
use serde::Serialize;
use tl_core::report::round_one_decimal;
use tl_core::{Category, CategoryTable, Domain, Report, ReportSummary};
use tl_db::Database;

use crate::commands::report::{ReportScope, load_report};
use crate::commands::util::{format_generated_at, local_timezone};

/// The exported file's contents.
#[derive(Debug, Serialize)]
pub struct ExportDocument {
    pub generated_at: String,
    pub timezone: String,
    pub summary: ReportSummary,
    pub detailed_data: Vec<ExportEntry>,
}

#[derive(Debug, Serialize)]
pub struct ExportEntry {
    pub domain: Domain,
    /// Rounded to the nearest minute.
    pub time_minutes: i64,
    pub category: Category,
    /// Share of total time with one decimal.
    pub percentage: f64,
}

impl ExportDocument {
    pub fn build(report: &Report, generated_at: DateTime<Utc>, timezone: &str) -> Self {
        Self {
            generated_at: format_generated_at(generated_at),
            timezone: timezone.to_string(),
            summary: report.summary(),
            detailed_data: report
                .sites
                .iter()
                .map(|site| ExportEntry {
                    domain: site.domain.clone(),
                    time_minutes: rounded_minutes(site.time_ms),
                    category: site.category,
                    percentage: round_one_decimal(site.percentage),
                })
                .collect(),
        }
    }
}

/// `timelens-report-YYYY-MM-DD.json`, dated in UTC.
pub fn default_filename(generated_at: DateTime<Utc>) -> PathBuf {
    PathBuf::from(format!(
        "timelens-report-{}.json",
        generated_at.format("%Y-%m-%d")
    ))
}

fn rounded_minutes(ms: i64) -> i64 {
    (ms + 30_000).div_euclid(60_000)
}

/// Writes the export file and returns its path.
pub fn run(db: &Database, table: &CategoryTable, output: Option<&Path>) -> Result<PathBuf> {
    let report = load_report(db, table, ReportScope::Lifetime)?;
    if report.is_empty() {
        bail!("no data to export");
    }

    let generated_at = Utc::now();
    let path = output.map_or_else(|| default_filename(generated_at), Path::to_path_buf);
    let document = ExportDocument::build(&report, generated_at, &local_timezone());
    let mut contents = serde_json::to_string_pretty(&document)?;
    contents.push('\n');
    std::fs::write(&path, contents)
        .with_context(|| format!("failed to write {}", path.display()))?;

    tracing::info!(path = %path.display(), sites = report.site_count(), "exported report");
    Ok(path)
}

#[cfg(test)]
mod tests {
    use chrono::{NaiveDate, TimeZone};
    use insta::assert_snapshot;
    use tl_core::DomainTotals;

    use super::*;

    #[test]
    fn document_rounds_minutes_and_percentages() {
        let totals: DomainTotals = [
            (Domain::new("github.com").unwrap(), 150_000),
            (Domain::new("randomsite.xyz").unwrap(), 20_000),
        ]
        .into_iter()
        .collect();
        let report = Report::generate(&totals, CategoryTable::builtin());
        let generated_at = Utc.with_ymd_and_hms(2025, 3, 15, 23, 30, 0).unwrap();

        let document = ExportDocument::build(&report, generated_at, "UTC");

        assert_snapshot!(serde_json::to_string_pretty(&document).unwrap(), @r#"
        {
          "generated_at": "2025-03-15T23:30:00.000Z",
          "timezone": "UTC",
          "summary": {
            "total_minutes": 2.8333333333333335,
            "productive_minutes": 2.5,
            "unproductive_minutes": 0.0,
            "neutral_minutes": 0.3333333333333333,
            "productivity_score": 88.2,
            "sites_visited": 2
          },
          "detailed_data": [
            {
              "domain": "github.com",
              "time_minutes": 3,
              "category": "productive",
              "percentage": 88.2
            },
            {
              "domain": "randomsite.xyz",
              "time_minutes": 0,
              "category": "neutral",
              "percentage": 11.8
            }
          ]
        }
        "#);
        assert_eq!(
            default_filename(generated_at),
            PathBuf::from("timelens-report-2025-03-15.json")
        );
    }

    #[test]
    fn export_writes_file() {
        let temp = tempfile::tempdir().unwrap();
        let mut db = Database::open_in_memory().unwrap();
        let day = NaiveDate::from_ymd_opt(2025, 3, 15).unwrap();
        db.add_time(&Domain::new("github.com").unwrap(), day, 60_000)
            .unwrap();

        let target = temp.path().join("out.json");
        let path = run(&db, CategoryTable::builtin(), Some(&target)).unwrap();

        assert_eq!(path, target);
        let written: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(written["detailed_data"][0]["domain"], "github.com");
        assert_eq!(written["summary"]["sites_visited"], 1);
    }

    #[test]
    fn export_without_data_fails() {
        let temp = tempfile::tempdir().unwrap();
        let db = Database::open_in_memory().unwrap();
        let target = temp.path().join("out.json");

        let err = run(&db, CategoryTable::builtin(), Some(&target)).unwrap_err();

        assert_eq!(err.to_string(), "no data to export");
        assert!(!target.exists());
    }
}
