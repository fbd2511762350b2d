//! Core domain logic for TimeLens.
//!
//! This crate contains the fundamental types and logic for:
//! - Domain normalization: turning tab URLs into attribution keys
//! - Classification: mapping domains to productivity categories
//! - Session tracking: attributing foreground time to exactly one domain
//! - Retention: expiring old per-day totals
//! - Reporting: aggregating totals into summary statistics

pub mod category;
mod domain;
pub mod event;
pub mod report;
pub mod retention;
pub mod session;
pub mod tracker;
pub mod types;

pub use category::{CategoryEntry, CategoryTable, category_of};
pub use domain::normalize_url;
pub use event::{BrowserEvent, Effect, SessionEvent};
pub use report::{DomainTotals, Report, ReportSummary, SiteEntry};
pub use session::{ActiveSession, OpenSession, SessionMachine};
pub use tracker::{Commit, Tab, TabSource, TimeStore, Tracker, TrackerConfig};
pub use types::{Category, Domain, TabId, ValidationError, WindowId};
