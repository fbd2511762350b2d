//! Report command for the detailed, dashboard-style view.
//!
//! This module implements `tl report` over lifetime totals or one day's
//! bucket (`--today`, `--day`), with an optional category filter and
//! human-readable or JSON output.

use std::fmt::Write as _;
use std::io::Write;

use anyhow::{Context, Result};
use chrono::{DateTime, NaiveDate, Utc};
use serde::Serialize;
use tl_core::report::round_one_decimal;
use tl_core::{Category, CategoryTable, Domain, Report, ReportSummary};
use tl_db::Database;

use crate::CategoryFilter;
use crate::commands::util::{format_duration, format_generated_at, local_timezone};

const NO_DATA: &str = "No data available yet. Start browsing to see your activity!";
const NO_MATCH: &str = "No sites match the selected filter.";

/// Which totals a report covers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReportScope {
    /// Lifetime totals.
    Lifetime,
    /// One local calendar day's bucket.
    Day(NaiveDate),
}

impl ReportScope {
    fn label(self) -> String {
        match self {
            Self::Lifetime => "all time".to_string(),
            Self::Day(day) => day.format("%Y-%m-%d").to_string(),
        }
    }

    const fn day(self) -> Option<NaiveDate> {
        match self {
            Self::Lifetime => None,
            Self::Day(day) => Some(day),
        }
    }
}

/// Reads the totals for `scope` and aggregates them.
pub fn load_report(db: &Database, table: &CategoryTable, scope: ReportScope) -> Result<Report> {
    let totals = match scope {
        ReportScope::Lifetime => db.domain_totals(),
        ReportScope::Day(day) => db.daily_totals(day),
    }
    .context("failed to read tracked time")?;
    Ok(Report::generate(&totals, table))
}

pub fn run<W: Write>(
    writer: &mut W,
    db: &Database,
    table: &CategoryTable,
    scope: ReportScope,
    filter: CategoryFilter,
    json: bool,
) -> Result<()> {
    let report = load_report(db, table, scope)?;
    let rendered = if json {
        render_json(&report, scope, filter, Utc::now(), &local_timezone())?
    } else {
        render_text(&report, scope, filter)
    };
    writer.write_all(rendered.as_bytes())?;
    Ok(())
}

// ========== Human-Readable Output ==========

pub fn render_text(report: &Report, scope: ReportScope, filter: CategoryFilter) -> String {
    let mut output = String::new();

    writeln!(output, "TimeLens report ({})", scope.label()).unwrap();
    writeln!(output).unwrap();

    if report.is_empty() {
        writeln!(output, "{NO_DATA}").unwrap();
        return output;
    }

    writeln!(output, "Total time:    {}", format_duration(report.total_ms)).unwrap();
    for category in Category::ALL {
        writeln!(
            output,
            "{:<14} {}",
            format!("{}:", capitalize(category.as_str())),
            format_duration(report.time_for(category))
        ).unwrap();
    }
    writeln!(output, "Productivity:  {:.1}%", report.productivity_score()).unwrap();
    writeln!(output, "Sites visited: {}", report.site_count()).unwrap();
    writeln!(output).unwrap();

    let sites: Vec<_> = match filter.category() {
        Some(category) => report.sites_in(category).collect(),
        None => report.sites.iter().collect(),
    };
    if sites.is_empty() {
        writeln!(output, "{NO_MATCH}").unwrap();
        return output;
    }

    for site in sites {
        writeln!(
            output,
            "- {} [{}]: {} ({:.1}%)",
            site.domain,
            site.category,
            format_duration(site.time_ms),
            site.percentage
        ).unwrap();
    }
    output
}

fn capitalize(word: &str) -> String {
    let mut chars = word.chars();
    chars.next().map_or_else(String::new, |first| {
        first.to_uppercase().chain(chars).collect()
    })
}

// ========== JSON Output ==========

#[derive(Debug, Serialize)]
struct JsonReport {
    generated_at: String,
    timezone: String,
    /// `None` for lifetime totals.
    day: Option<NaiveDate>,
    summary: ReportSummary,
    sites: Vec<JsonSite>,
}

#[derive(Debug, Serialize)]
struct JsonSite {
    domain: Domain,
    time_ms: i64,
    category: Category,
    percentage: f64,
}

pub fn render_json(
    report: &Report,
    scope: ReportScope,
    filter: CategoryFilter,
    generated_at: DateTime<Utc>,
    timezone: &str,
) -> Result<String> {
    let sites = report
        .sites
        .iter()
        .filter(|site| filter.category().is_none_or(|category| site.category == category))
        .map(|site| JsonSite {
            domain: site.domain.clone(),
            time_ms: site.time_ms,
            category: site.category,
            percentage: round_one_decimal(site.percentage),
        })
        .collect();

    let json = JsonReport {
        generated_at: format_generated_at(generated_at),
        timezone: timezone.to_string(),
        day: scope.day(),
        summary: report.summary(),
        sites,
    };
    let mut rendered = serde_json::to_string_pretty(&json)?;
    rendered.push('\n');
    Ok(rendered)
}
