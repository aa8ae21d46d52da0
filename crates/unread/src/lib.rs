//! Process-wide unread-notification bookkeeping for the Ladle dashboard.
//!
//! [`UnreadCounts`] is the single source of truth for the badge value:
//! it snapshots the first page of notifications at startup, listens to
//! the live stream for increments, and owns every decrement through its
//! centralized mutation API.

pub mod counts;

pub use counts::UnreadCounts;
