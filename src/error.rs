//! Error types for scheduling and due-set selection.
//!
//! All failures are local validation errors returned synchronously. Nothing
//! here is retried: a corrupt review state has to surface to the caller
//! rather than be patched up, or the learner's history drifts.

use chrono::{DateTime, Utc};
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ScheduleError {
  /// Grade outside 0..=5.
  #[error("invalid grade {0}: expected 0-5")]
  InvalidGrade(i64),

  /// Stored review state breaks an invariant (ease below floor, negative interval, ...).
  #[error("invalid review state: {reason}")]
  InvalidState { reason: String },

  /// Suspended items are out of rotation and cannot be graded.
  #[error("item is suspended")]
  SuspendedItem,

  /// The grading clock is behind the last review.
  #[error("review time {now} is before last review {last_review}")]
  NegativeElapsed {
    last_review: DateTime<Utc>,
    now: DateTime<Utc>,
  },

  #[error("user {user_id} may not view review data")]
  Forbidden { user_id: i64 },

  #[error("config error: {message}")]
  Config { message: String },
}

pub type Result<T> = std::result::Result<T, ScheduleError>;

impl ScheduleError {
  pub fn invalid_state(reason: impl Into<String>) -> Self {
    Self::InvalidState {
      reason: reason.into(),
    }
  }

  pub fn config(message: impl Into<String>) -> Self {
    Self::Config {
      message: message.into(),
    }
  }

  /// Returns a user-facing message without echoing stored values.
  pub fn user_message(&self) -> &'static str {
    match self {
      Self::InvalidGrade(_) => "Grade must be between 0 and 5",
      Self::InvalidState { .. } => "Stored review data is corrupt",
      Self::SuspendedItem => "This card is suspended",
      Self::NegativeElapsed { .. } => "Review time is earlier than the last review",
      Self::Forbidden { .. } => "You do not have access to review data",
      Self::Config { .. } => "Scheduler configuration is invalid",
    }
  }
}
