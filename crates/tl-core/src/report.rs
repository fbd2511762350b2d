//! Aggregation of per-domain totals into report statistics.

use std::collections::BTreeMap;

use serde::Serialize;

use crate::category::CategoryTable;
use crate::types::{Category, Domain};

/// Accumulated milliseconds per domain.
pub type DomainTotals = BTreeMap<Domain, i64>;

const MS_PER_MINUTE: f64 = 60_000.0;

/// One ranked row of a report.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SiteEntry {
    pub domain: Domain,
    pub time_ms: i64,
    pub category: Category,
    /// Share of the report's total time, 0-100.
    pub percentage: f64,
}

/// Summary statistics over a set of domain totals.
#[derive(Debug, Clone, PartialEq)]
pub struct Report {
    pub total_ms: i64,
    pub productive_ms: i64,
    pub unproductive_ms: i64,
    pub neutral_ms: i64,
    /// Sites sorted by time, descending; ties by domain.
    pub sites: Vec<SiteEntry>,
}

/// Headline numbers in minutes, as rendered on the dashboard and in exports.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReportSummary {
    pub total_minutes: f64,
    pub productive_minutes: f64,
    pub unproductive_minutes: f64,
    pub neutral_minutes: f64,
    /// Productive share of total time, rounded to one decimal.
    pub productivity_score: f64,
    pub sites_visited: usize,
}

impl Report {
    /// Aggregates `totals`, classifying each domain with `table`.
    pub fn generate(totals: &DomainTotals, table: &CategoryTable) -> Self {
        let total_ms: i64 = totals.values().sum();
        let mut report = Self {
            total_ms,
            productive_ms: 0,
            unproductive_ms: 0,
            neutral_ms: 0,
            sites: Vec::with_capacity(totals.len()),
        };

        for (domain, &time_ms) in totals {
            let category = table.classify(domain.as_str());
            match category {
                Category::Productive => report.productive_ms += time_ms,
                Category::Unproductive => report.unproductive_ms += time_ms,
                Category::Neutral => report.neutral_ms += time_ms,
            }
            report.sites.push(SiteEntry {
                domain: domain.clone(),
                time_ms,
                category,
                percentage: percent(time_ms, total_ms),
            });
        }

        // BTreeMap iteration already orders by domain; the stable sort keeps
        // that order for equal times.
        report
            .sites
            .sort_by_key(|site| std::cmp::Reverse(site.time_ms));
        report
    }

    pub fn is_empty(&self) -> bool {
        self.sites.is_empty()
    }

    pub const fn site_count(&self) -> usize {
        self.sites.len()
    }

    /// Time for one category.
    pub const fn time_for(&self, category: Category) -> i64 {
        match category {
            Category::Productive => self.productive_ms,
            Category::Unproductive => self.unproductive_ms,
            Category::Neutral => self.neutral_ms,
        }
    }

    /// Productive share of total time with one decimal; 0 with no data.
    pub fn productivity_score(&self) -> f64 {
        round_one_decimal(percent(self.productive_ms, self.total_ms))
    }

    /// Productive share of total time rounded to a whole percent.
    #[allow(clippy::cast_possible_truncation)]
    pub fn productivity_percent(&self) -> i64 {
        percent(self.productive_ms, self.total_ms).round() as i64
    }

    /// The `n` largest sites.
    pub fn top(&self, n: usize) -> &[SiteEntry] {
        &self.sites[..n.min(self.sites.len())]
    }

    /// Sites in one category, still ranked by time.
    pub fn sites_in(&self, category: Category) -> impl Iterator<Item = &SiteEntry> {
        self.sites
            .iter()
            .filter(move |site| site.category == category)
    }

    pub fn summary(&self) -> ReportSummary {
        ReportSummary {
            total_minutes: minutes(self.total_ms),
            productive_minutes: minutes(self.productive_ms),
            unproductive_minutes: minutes(self.unproductive_ms),
            neutral_minutes: minutes(self.neutral_ms),
            productivity_score: self.productivity_score(),
            sites_visited: self.site_count(),
        }
    }
}

#[allow(clippy::cast_precision_loss)]
fn minutes(ms: i64) -> f64 {
    ms as f64 / MS_PER_MINUTE
}

/// `part / total * 100`, or 0 when `total` is not positive.
#[allow(clippy::cast_precision_loss)]
pub fn percent(part: i64, total: i64) -> f64 {
    if total <= 0 {
        return 0.0;
    }
    part as f64 / total as f64 * 100.0
}

pub fn round_one_decimal(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}

#[cfg(test)]
mod tests {
    use super::*;

    fn totals(entries: &[(&str, i64)]) -> DomainTotals {
        entries
            .iter()
            .map(|(domain, ms)| (Domain::new(*domain).unwrap(), *ms))
            .collect()
    }

    #[test]
    #[expect(
        clippy::float_cmp,
        reason = "values are exact binary fractions or rounded"
    )]
    fn two_site_report_matches_dashboard_numbers() {
        let report = Report::generate(
            &totals(&[("github.com", 120_000), ("facebook.com", 60_000)]),
            CategoryTable::builtin(),
        );
        let summary = report.summary();

        assert_eq!(summary.total_minutes, 3.0);
        assert_eq!(summary.productive_minutes, 2.0);
        assert_eq!(summary.unproductive_minutes, 1.0);
        assert_eq!(summary.neutral_minutes, 0.0);
        assert_eq!(summary.productivity_score, 66.7);
        assert_eq!(summary.sites_visited, 2);
        assert_eq!(report.productivity_percent(), 67);
    }

    #[test]
    fn sites_are_ranked_by_time_with_percentages() {
        let report = Report::generate(
            &totals(&[
                ("randomsite.xyz", 30_000),
                ("github.com", 120_000),
                ("reddit.com", 50_000),
            ]),
            CategoryTable::builtin(),
        );

        let ranked: Vec<_> = report
            .sites
            .iter()
            .map(|site| (site.domain.as_str(), site.category))
            .collect();
        assert_eq!(
            ranked,
            vec![
                ("github.com", Category::Productive),
                ("reddit.com", Category::Unproductive),
                ("randomsite.xyz", Category::Neutral),
            ]
        );
        assert!((report.sites[0].percentage - 60.0).abs() < 1e-9);
        assert!((report.sites[2].percentage - 15.0).abs() < 1e-9);
        assert_eq!(report.neutral_ms, 30_000);
    }

    #[test]
    fn ties_are_ordered_by_domain() {
        let report = Report::generate(
            &totals(&[("b.example", 10_000), ("a.example", 10_000)]),
            CategoryTable::builtin(),
        );
        assert_eq!(report.sites[0].domain.as_str(), "a.example");
        assert_eq!(report.sites[1].domain.as_str(), "b.example");
    }

    #[test]
    #[expect(clippy::float_cmp, reason = "zero is exact")]
    fn empty_totals_yield_zero_score() {
        let report = Report::generate(&DomainTotals::new(), CategoryTable::builtin());
        assert!(report.is_empty());
        assert_eq!(report.productivity_score(), 0.0);
        assert_eq!(report.productivity_percent(), 0);
        assert_eq!(report.summary().total_minutes, 0.0);
        assert_eq!(report.summary().sites_visited, 0);
    }

    #[test]
    #[expect(clippy::float_cmp, reason = "zero is exact")]
    fn zero_time_entries_have_zero_percentage() {
        let report = Report::generate(&totals(&[("github.com", 0)]), CategoryTable::builtin());
        assert_eq!(report.sites[0].percentage, 0.0);
        assert_eq!(report.productivity_score(), 0.0);
    }

    #[test]
    fn top_and_category_filters() {
        let report = Report::generate(
            &totals(&[
                ("github.com", 50_000),
                ("gitlab.com", 40_000),
                ("youtube.com", 30_000),
            ]),
            CategoryTable::builtin(),
        );
        assert_eq!(report.top(2).len(), 2);
        assert_eq!(report.top(10).len(), 3);
        let productive: Vec<_> = report
            .sites_in(Category::Productive)
            .map(|site| site.domain.as_str())
            .collect();
        assert_eq!(productive, vec!["github.com", "gitlab.com"]);
        assert_eq!(report.time_for(Category::Unproductive), 30_000);
    }
}
