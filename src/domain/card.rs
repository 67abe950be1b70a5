use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{Result, ScheduleError};

/// Ease never drops below this, on any path.
pub const MIN_EASE_FACTOR: f64 = 1.3;

/// Ease assigned to an item when it first enters review.
pub const DEFAULT_EASE_FACTOR: f64 = 2.5;

/// Lifecycle stage of a card
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CardState {
  New,
  Learning,
  Review,
  Relearning,
}

impl CardState {
  pub fn from_str(s: &str) -> Option<Self> {
    match s {
      "new" => Some(Self::New),
      "learning" => Some(Self::Learning),
      "review" => Some(Self::Review),
      "relearning" => Some(Self::Relearning),
      _ => None,
    }
  }

  pub fn as_str(&self) -> &'static str {
    match self {
      Self::New => "new",
      Self::Learning => "learning",
      Self::Review => "review",
      Self::Relearning => "relearning",
    }
  }

  /// Tie-break rank in the due queue; higher surfaces first.
  pub fn urgency(&self) -> u8 {
    match self {
      Self::Relearning => 3,
      Self::Learning => 2,
      Self::Review => 1,
      Self::New => 0,
    }
  }

  /// True while the card is climbing a sub-day step ladder.
  pub fn is_learning(&self) -> bool {
    matches!(self, Self::New | Self::Learning | Self::Relearning)
  }
}

/// Scheduling state attached to one learning item.
///
/// Serde goes through [`ReviewRow`], so deserializing a state validates it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "ReviewRow", into = "ReviewRow")]
pub struct ReviewState {
  pub state: CardState,
  pub due: DateTime<Utc>,
  pub last_review: Option<DateTime<Utc>>,
  /// Last day-granularity interval. Kept through sub-day steps so
  /// re-graduation can grow from it.
  pub stability: f64,
  pub ease_factor: f64,
  /// Interval chosen at the last scheduling event; 0 means a sub-day step.
  pub scheduled_days: u32,
  /// Completed steps on the current learning ladder.
  pub learning_steps: u32,
  pub reps: u32,
  pub lapses: u32,
  pub suspended: bool,
}

impl ReviewState {
  /// Fresh state for an item entering the review system.
  pub fn new(now: DateTime<Utc>) -> Self {
    Self::with_ease(now, DEFAULT_EASE_FACTOR)
  }

  pub fn with_ease(now: DateTime<Utc>, ease_factor: f64) -> Self {
    Self {
      state: CardState::New,
      due: now,
      last_review: None,
      stability: 0.0,
      ease_factor,
      scheduled_days: 1,
      learning_steps: 0,
      reps: 0,
      lapses: 0,
      suspended: false,
    }
  }

  /// Check the invariants a stored state must hold before it is scheduled.
  pub fn validate(&self) -> Result<()> {
    if !(self.ease_factor >= MIN_EASE_FACTOR) || !self.ease_factor.is_finite() {
      return Err(ScheduleError::invalid_state(format!(
        "ease factor {} below floor {}",
        self.ease_factor, MIN_EASE_FACTOR
      )));
    }
    if !(self.stability >= 0.0) || !self.stability.is_finite() {
      return Err(ScheduleError::invalid_state(format!(
        "stability {} must be a non-negative number",
        self.stability
      )));
    }
    if self.state == CardState::Review && self.scheduled_days < 1 {
      return Err(ScheduleError::invalid_state(
        "review card must have an interval of at least one day",
      ));
    }
    if let Some(last) = self.last_review {
      if self.due < last {
        return Err(ScheduleError::invalid_state(format!(
          "due {} is before last review {}",
          self.due, last
        )));
      }
    }
    Ok(())
  }

  pub fn is_due(&self, now: DateTime<Utc>) -> bool {
    !self.suspended && self.due <= now
  }

  /// Time between the last review and the due date.
  pub fn scheduled_span(&self) -> Option<Duration> {
    self.last_review.map(|last| self.due - last)
  }

  pub fn suspend(&mut self) {
    self.suspended = true;
  }

  pub fn unsuspend(&mut self) {
    self.suspended = false;
  }
}

/// Persisted shape of a review state, as the external store hands it over.
///
/// Loosely typed on purpose: signed counters and a free-form state string.
/// Converting into [`ReviewState`] validates every column.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReviewRow {
  pub state: String,
  pub due: DateTime<Utc>,
  pub last_review: Option<DateTime<Utc>>,
  pub stability: f64,
  pub ease_factor: f64,
  pub scheduled_days: i64,
  pub learning_steps: i64,
  pub reps: i64,
  pub lapses: i64,
  pub suspended: bool,
}

fn counter(column: &str, value: i64) -> Result<u32> {
  u32::try_from(value)
    .map_err(|_| ScheduleError::invalid_state(format!("{} out of range: {}", column, value)))
}

impl TryFrom<ReviewRow> for ReviewState {
  type Error = ScheduleError;

  fn try_from(row: ReviewRow) -> Result<Self> {
    let state = CardState::from_str(&row.state)
      .ok_or_else(|| ScheduleError::invalid_state(format!("unknown card state '{}'", row.state)))?;

    let review = ReviewState {
      state,
      due: row.due,
      last_review: row.last_review,
      stability: row.stability,
      ease_factor: row.ease_factor,
      scheduled_days: counter("scheduled_days", row.scheduled_days)?,
      learning_steps: counter("learning_steps", row.learning_steps)?,
      reps: counter("reps", row.reps)?,
      lapses: counter("lapses", row.lapses)?,
      suspended: row.suspended,
    };

    if let Err(e) = review.validate() {
      tracing::warn!("Rejected stored review row: {}", e);
      return Err(e);
    }
    Ok(review)
  }
}

impl From<ReviewState> for ReviewRow {
  fn from(review: ReviewState) -> Self {
    Self {
      state: review.state.as_str().to_string(),
      due: review.due,
      last_review: review.last_review,
      stability: review.stability,
      ease_factor: review.ease_factor,
      scheduled_days: i64::from(review.scheduled_days),
      learning_steps: i64::from(review.learning_steps),
      reps: i64::from(review.reps),
      lapses: i64::from(review.lapses),
      suspended: review.suspended,
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use chrono::TimeZone;

  fn t0() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 3, 1, 9, 0, 0).unwrap()
  }

  fn review_card() -> ReviewState {
    ReviewState {
      state: CardState::Review,
      due: t0() + Duration::days(6),
      last_review: Some(t0()),
      stability: 6.0,
      ease_factor: 2.5,
      scheduled_days: 6,
      learning_steps: 0,
      reps: 2,
      lapses: 0,
      suspended: false,
    }
  }

  // CardState tests

  #[test]
  fn test_card_state_from_str() {
    assert_eq!(CardState::from_str("new"), Some(CardState::New));
    assert_eq!(CardState::from_str("learning"), Some(CardState::Learning));
    assert_eq!(CardState::from_str("review"), Some(CardState::Review));
    assert_eq!(CardState::from_str("relearning"), Some(CardState::Relearning));
  }

  #[test]
  fn test_card_state_from_str_invalid() {
    assert_eq!(CardState::from_str(""), None);
    assert_eq!(CardState::from_str("Review"), None); // case sensitive
    assert_eq!(CardState::from_str("graduated"), None);
  }

  #[test]
  fn test_card_state_serde_matches_as_str() {
    for state in [
      CardState::New,
      CardState::Learning,
      CardState::Review,
      CardState::Relearning,
    ] {
      let json = serde_json::to_string(&state).unwrap();
      assert_eq!(json, format!("\"{}\"", state.as_str()));
    }
  }

  #[test]
  fn test_card_state_urgency_order() {
    assert!(CardState::Relearning.urgency() > CardState::Learning.urgency());
    assert!(CardState::Learning.urgency() > CardState::Review.urgency());
    assert!(CardState::Review.urgency() > CardState::New.urgency());
  }

  // ReviewState tests

  #[test]
  fn test_new_state_defaults() {
    let state = ReviewState::new(t0());
    assert_eq!(state.state, CardState::New);
    assert_eq!(state.due, t0());
    assert!(state.last_review.is_none());
    assert!((state.ease_factor - 2.5).abs() < f64::EPSILON);
    assert_eq!(state.scheduled_days, 1);
    assert_eq!(state.reps, 0);
    assert_eq!(state.lapses, 0);
    assert!(!state.suspended);
    assert!(state.validate().is_ok());
  }

  #[test]
  fn test_validate_rejects_low_ease() {
    let mut state = review_card();
    state.ease_factor = 1.29;
    assert!(matches!(state.validate(), Err(ScheduleError::InvalidState { .. })));
  }

  #[test]
  fn test_validate_rejects_nan_ease() {
    let mut state = review_card();
    state.ease_factor = f64::NAN;
    assert!(state.validate().is_err());
  }

  #[test]
  fn test_validate_accepts_ease_floor() {
    let mut state = review_card();
    state.ease_factor = MIN_EASE_FACTOR;
    assert!(state.validate().is_ok());
  }

  #[test]
  fn test_validate_rejects_zero_interval_in_review() {
    let mut state = review_card();
    state.scheduled_days = 0;
    assert!(state.validate().is_err());
  }

  #[test]
  fn test_validate_rejects_due_before_last_review() {
    let mut state = review_card();
    state.due = t0() - Duration::minutes(1);
    assert!(state.validate().is_err());
  }

  #[test]
  fn test_is_due_skips_suspended() {
    let mut state = review_card();
    let later = t0() + Duration::days(10);
    assert!(state.is_due(later));
    state.suspend();
    assert!(!state.is_due(later));
    state.unsuspend();
    assert!(state.is_due(later));
  }

  #[test]
  fn test_scheduled_span() {
    assert_eq!(review_card().scheduled_span(), Some(Duration::days(6)));
    assert_eq!(ReviewState::new(t0()).scheduled_span(), None);
  }

  // ReviewRow boundary tests

  #[test]
  fn test_row_roundtrip_is_lossless() {
    let state = review_card();
    let row = ReviewRow::from(state.clone());
    assert_eq!(row.state, "review");
    assert_eq!(row.scheduled_days, 6);
    let back = ReviewState::try_from(row).unwrap();
    assert_eq!(back, state);
  }

  #[test]
  fn test_row_rejects_unknown_state() {
    let mut row = ReviewRow::from(review_card());
    row.state = "mastered".to_string();
    let err = ReviewState::try_from(row).unwrap_err();
    assert!(err.to_string().contains("mastered"));
  }

  #[test]
  fn test_row_rejects_negative_interval() {
    let mut row = ReviewRow::from(review_card());
    row.scheduled_days = -1;
    assert!(matches!(
      ReviewState::try_from(row),
      Err(ScheduleError::InvalidState { .. })
    ));
  }

  #[test]
  fn test_row_rejects_negative_counters() {
    let mut row = ReviewRow::from(review_card());
    row.lapses = -3;
    assert!(ReviewState::try_from(row).is_err());
  }

  #[test]
  fn test_json_roundtrip() {
    let state = review_card();
    let json = serde_json::to_string(&state).unwrap();
    assert!(json.contains("\"state\":\"review\""));
    let back: ReviewState = serde_json::from_str(&json).unwrap();
    assert_eq!(back, state);
  }

  #[test]
  fn test_json_deserialize_validates() {
    let mut row = ReviewRow::from(review_card());
    row.ease_factor = 0.9;
    let json = serde_json::to_string(&row).unwrap();
    let parsed: std::result::Result<ReviewState, _> = serde_json::from_str(&json);
    assert!(parsed.is_err());
  }
}
