//! Human-readable rendering of scheduled intervals ("3d", "45m").

use chrono::{DateTime, Utc};

use crate::domain::ReviewState;

const MS_PER_MINUTE: f64 = 60_000.0;

/// Render an interval for display.
///
/// Day intervals print as `{days}d`. Sub-day intervals print the minutes
/// left until `due`, never less than `1m`.
pub fn format_interval(now: DateTime<Utc>, due: DateTime<Utc>, scheduled_days: u32) -> String {
  if scheduled_days >= 1 {
    return format!("{}d", scheduled_days);
  }
  let remaining_ms = (due - now).num_milliseconds() as f64;
  let minutes = (remaining_ms / MS_PER_MINUTE).round().max(1.0);
  format!("{}m", minutes as i64)
}

/// Millisecond-timestamp variant for callers holding epoch values.
pub fn format_interval_ms(now_ms: i64, due_ms: i64, scheduled_days: f64) -> String {
  if scheduled_days >= 1.0 {
    return format!("{}d", scheduled_days.round() as i64);
  }
  let minutes = ((due_ms.saturating_sub(now_ms)) as f64 / MS_PER_MINUTE)
    .round()
    .max(1.0);
  format!("{}m", minutes as i64)
}

impl ReviewState {
  /// Label for the card's current interval, as seen at `now`.
  pub fn interval_label(&self, now: DateTime<Utc>) -> String {
    format_interval(now, self.due, self.scheduled_days)
  }
}
