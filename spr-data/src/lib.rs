//! Comparative performance aggregation for the reporting dashboards.
//!
//! This crate turns user-chosen filters into:
//! - a single-year ranking table (`snapshot`, `presentation`)
//! - multi-year trend series per selected school (`trend`)
//! - a summary block, recomputed locally when the filter is finer than
//!   the service's global statistics (`aggregate`)
//!
//! `session` ties these together for one screen and discards responses
//! that arrive after a newer filter change.

pub mod aggregate;
pub mod catalog;
pub mod config;
pub mod filter;
pub mod presentation;
pub mod selector;
pub mod session;
pub mod snapshot;
pub mod suggest;
pub mod trend;

pub use catalog::ReferenceCatalog;
pub use config::{ComparisonConfig, ComparisonScreen, Metric};
pub use filter::{FilterError, FilterState, RegionLevel, SnapshotFilter, SortKey};
pub use selector::{EntitySelector, ToggleOutcome};
pub use session::{ComparisonSession, DashboardView, ViewState};
