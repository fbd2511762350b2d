//! Summary command: the quick popup-style overview.

use std::io::Write;

use anyhow::{Context, Result};
use serde::Serialize;
use tl_core::report::percent;
use tl_core::{Category, CategoryTable, Domain, Report};
use tl_db::Database;

use crate::commands::report::{ReportScope, load_report};
use crate::commands::util::format_duration_short;

const TOP_SITES: usize = 5;

/// Coarse band for the productivity score.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Rating {
    Good,
    Fair,
    Low,
}

impl Rating {
    pub const fn from_percent(percent: i64) -> Self {
        match percent {
            70.. => Self::Good,
            40..=69 => Self::Fair,
            _ => Self::Low,
        }
    }

    const fn as_str(self) -> &'static str {
        match self {
            Self::Good => "good",
            Self::Fair => "fair",
            Self::Low => "low",
        }
    }
}

#[derive(Debug, Serialize)]
struct JsonSummary {
    tracking_paused: bool,
    total_ms: i64,
    productive_ms: i64,
    productivity_percent: i64,
    rating: Rating,
    top_sites: Vec<JsonTopSite>,
}

#[derive(Debug, Serialize)]
struct JsonTopSite {
    domain: Domain,
    time_ms: i64,
    category: Category,
    percentage: i64,
}

pub fn run<W: Write>(
    writer: &mut W,
    db: &Database,
    table: &CategoryTable,
    json: bool,
) -> Result<()> {
    let paused = db
        .tracking_paused()
        .context("failed to read pause flag")?;
    let report = load_report(db, table, ReportScope::Lifetime)?;
    if json {
        write_json(writer, &report, paused)
    } else {
        write_text(writer, &report, paused)
    }
}

#[allow(clippy::cast_possible_truncation)]
fn whole_percent(part: i64, total: i64) -> i64 {
    percent(part, total).round() as i64
}

fn write_text<W: Write>(writer: &mut W, report: &Report, paused: bool) -> Result<()> {
    writeln!(
        writer,
        "Tracking: {}",
        if paused { "paused" } else { "active" }
    )?;

    if report.is_empty() {
        writeln!(writer, "Start browsing to see data.")?;
        return Ok(());
    }

    let score = report.productivity_percent();
    writeln!(writer, "Total: {}", format_duration_short(report.total_ms))?;
    writeln!(
        writer,
        "Productive: {}",
        format_duration_short(report.productive_ms)
    )?;
    writeln!(
        writer,
        "Productivity: {score}% ({})",
        Rating::from_percent(score).as_str()
    )?;
    writeln!(writer, "Top sites:")?;
    for site in report.top(TOP_SITES) {
        writeln!(
            writer,
            "- {} [{}]: {} ({}%)",
            site.domain,
            site.category,
            format_duration_short(site.time_ms),
            whole_percent(site.time_ms, report.total_ms)
        )?;
    }
    Ok(())
}

fn write_json<W: Write>(writer: &mut W, report: &Report, paused: bool) -> Result<()> {
    let score = report.productivity_percent();
    let summary = JsonSummary {
        tracking_paused: paused,
        total_ms: report.total_ms,
        productive_ms: report.productive_ms,
        productivity_percent: score,
        rating: Rating::from_percent(score),
        top_sites: report
            .top(TOP_SITES)
            .iter()
            .map(|site| JsonTopSite {
                domain: site.domain.clone(),
                time_ms: site.time_ms,
                category: site.category,
                percentage: whole_percent(site.time_ms, report.total_ms),
            })
            .collect(),
    };
    serde_json::to_writer_pretty(&mut *writer, &summary)?;
    writeln!(writer)?;
    Ok(())
}
