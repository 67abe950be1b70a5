//! SM-2 spaced repetition scheduling.
//!
//! - [`srs::Scheduler`] grades a card and returns its next [`domain::ReviewState`]
//! - [`srs::due_items`] builds the ordered queue of cards due now
//! - [`srs::format_interval`] renders an interval as `3d` or `45m`
//!
//! No I/O happens here. Review states come from, and go back to, a store
//! owned by the caller; [`domain::ReviewRow`] is the persisted shape.

pub mod access;
pub mod config;
pub mod domain;
pub mod error;
pub mod srs;

pub use error::{Result, ScheduleError};
