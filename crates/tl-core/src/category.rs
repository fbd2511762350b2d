//! Productivity classification of domains.
//!
//! Classification is a pure lookup against an ordered table:
//!
//! 1. exact match on the domain,
//! 2. otherwise the first table entry (in table order) that is a substring of
//!    the domain, so `sub.github.com` resolves through `github.com`,
//! 3. otherwise [`Category::Neutral`].
//!
//! Because step 2 is order-sensitive the table is a `Vec`, never a hash map.

use std::collections::HashMap;
use std::sync::LazyLock;

use serde::{Deserialize, Serialize};

use crate::types::Category;

/// Built-in classification entries, in match order.
const BUILTIN_ENTRIES: &[(&str, Category)] = &[
    ("github.com", Category::Productive),
    ("stackoverflow.com", Category::Productive),
    ("developer.mozilla.org", Category::Productive),
    ("docs.google.com", Category::Productive),
    ("notion.so", Category::Productive),
    ("trello.com", Category::Productive),
    ("slack.com", Category::Productive),
    ("figma.com", Category::Productive),
    ("codepen.io", Category::Productive),
    ("medium.com", Category::Productive),
    ("dev.to", Category::Productive),
    ("leetcode.com", Category::Productive),
    ("coursera.org", Category::Productive),
    ("udemy.com", Category::Productive),
    ("khanacademy.org", Category::Productive),
    ("w3schools.com", Category::Productive),
    ("mdn.dev", Category::Productive),
    ("freecodecamp.org", Category::Productive),
    ("codecademy.com", Category::Productive),
    ("replit.com", Category::Productive),
    ("codesandbox.io", Category::Productive),
    ("jsfiddle.net", Category::Productive),
    ("gitlab.com", Category::Productive),
    ("bitbucket.org", Category::Productive),
    ("atlassian.com", Category::Productive),
    ("linear.app", Category::Productive),
    ("asana.com", Category::Productive),
    ("monday.com", Category::Productive),
    ("facebook.com", Category::Unproductive),
    ("instagram.com", Category::Unproductive),
    ("twitter.com", Category::Unproductive),
    ("x.com", Category::Unproductive),
    ("youtube.com", Category::Unproductive),
    ("tiktok.com", Category::Unproductive),
    ("reddit.com", Category::Unproductive),
    ("9gag.com", Category::Unproductive),
    ("twitch.tv", Category::Unproductive),
    ("netflix.com", Category::Unproductive),
    ("hulu.com", Category::Unproductive),
    ("disneyplus.com", Category::Unproductive),
    ("primevideo.com", Category::Unproductive),
    ("buzzfeed.com", Category::Unproductive),
    ("pinterest.com", Category::Unproductive),
    ("snapchat.com", Category::Unproductive),
    ("discord.com", Category::Unproductive),
    ("whatsapp.com", Category::Unproductive),
    ("telegram.org", Category::Unproductive),
];

static BUILTIN_TABLE: LazyLock<CategoryTable> = LazyLock::new(|| {
    CategoryTable::from_entries(
        BUILTIN_ENTRIES
            .iter()
            .map(|(pattern, category)| CategoryEntry::new(*pattern, *category)),
    )
});

/// One row of the category table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategoryEntry {
    /// Domain, or domain fragment for substring matches.
    pub domain: String,
    pub category: Category,
}

impl CategoryEntry {
    pub fn new(domain: impl Into<String>, category: Category) -> Self {
        Self {
            domain: domain.into(),
            category,
        }
    }
}

/// An ordered, immutable domain classification table.
#[derive(Debug, Clone)]
pub struct CategoryTable {
    entries: Vec<CategoryEntry>,
    exact: HashMap<String, Category>,
}

impl CategoryTable {
    /// Builds a table from entries in match order.
    ///
    /// When a domain appears twice the first occurrence wins, for both exact and
    /// substring matching.
    pub fn from_entries(entries: impl IntoIterator<Item = CategoryEntry>) -> Self {
        let entries: Vec<CategoryEntry> = entries
            .into_iter()
            .filter(|entry| !entry.domain.is_empty())
            .collect();
        let mut exact = HashMap::with_capacity(entries.len());
        for entry in &entries {
            exact
                .entry(entry.domain.clone())
                .or_insert(entry.category);
        }
        Self { entries, exact }
    }

    /// The built-in table shipped with the tracker.
    pub fn builtin() -> &'static Self {
        &BUILTIN_TABLE
    }

    /// Returns the built-in table with `overrides` consulted first.
    pub fn with_overrides(overrides: impl IntoIterator<Item = CategoryEntry>) -> Self {
        Self::from_entries(
            overrides
                .into_iter()
                .chain(Self::builtin().entries.iter().cloned()),
        )
    }

    /// Classifies a normalized domain.
    pub fn classify(&self, domain: &str) -> Category {
        if let Some(category) = self.exact.get(domain) {
            return *category;
        }

        self.entries
            .iter()
            .find(|entry| domain.contains(entry.domain.as_str()))
            .map_or(Category::Neutral, |entry| entry.category)
    }

    /// Entries in match order.
    pub fn entries(&self) -> &[CategoryEntry] {
        &self.entries
    }
}

impl Default for CategoryTable {
    fn default() -> Self {
        Self::builtin().clone()
    }
}

/// Classifies a domain against the built-in table.
pub fn category_of(domain: &str) -> Category {
    CategoryTable::builtin().classify(domain)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exact_matches() {
        assert_eq!(category_of("github.com"), Category::Productive);
        assert_eq!(category_of("facebook.com"), Category::Unproductive);
    }

    #[test]
    fn subdomains_resolve_by_substring() {
        assert_eq!(category_of("sub.github.com"), Category::Productive);
        assert_eq!(category_of("www.github.com"), Category::Productive);
        assert_eq!(category_of("m.youtube.com"), Category::Unproductive);
    }

    #[test]
    fn unknown_domains_are_neutral() {
        assert_eq!(category_of("randomsite.xyz"), Category::Neutral);
        assert_eq!(category_of(""), Category::Neutral);
    }

    #[test]
    fn normalized_www_domain_is_classified() {
        let domain = crate::normalize_url("https://www.github.com/").unwrap();
        assert_eq!(category_of(domain.as_str()), Category::Productive);
    }

    #[test]
    fn substring_ties_follow_table_order() {
        // "x.com" is a substring of "dropbox.com"; with "dropbox.com" absent
        // the first matching entry decides.
        assert_eq!(category_of("dropbox.com"), Category::Unproductive);

        let table = CategoryTable::from_entries([
            CategoryEntry::new("box.com", Category::Productive),
            CategoryEntry::new("x.com", Category::Unproductive),
        ]);
        assert_eq!(table.classify("dropbox.com"), Category::Productive);

        let reversed = CategoryTable::from_entries([
            CategoryEntry::new("x.com", Category::Unproductive),
            CategoryEntry::new("box.com", Category::Productive),
        ]);
        assert_eq!(reversed.classify("dropbox.com"), Category::Unproductive);
    }

    #[test]
    fn exact_match_beats_earlier_substring_entry() {
        let table = CategoryTable::from_entries([
            CategoryEntry::new("tube.com", Category::Productive),
            CategoryEntry::new("youtube.com", Category::Unproductive),
        ]);
        assert_eq!(table.classify("youtube.com"), Category::Unproductive);
        assert_eq!(table.classify("m.youtube.com"), Category::Productive);
    }

    #[test]
    fn overrides_take_precedence_over_builtin() {
        let table = CategoryTable::with_overrides([
            CategoryEntry::new("youtube.com", Category::Productive),
            CategoryEntry::new("internal.corp", Category::Productive),
        ]);
        assert_eq!(table.classify("youtube.com"), Category::Productive);
        assert_eq!(table.classify("wiki.internal.corp"), Category::Productive);
        assert_eq!(table.classify("reddit.com"), Category::Unproductive);
    }

    #[test]
    fn empty_patterns_are_ignored() {
        let table = CategoryTable::from_entries([CategoryEntry::new("", Category::Productive)]);
        assert!(table.entries().is_empty());
        assert_eq!(table.classify("anything.org"), Category::Neutral);
    }
}
