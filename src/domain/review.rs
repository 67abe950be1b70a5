use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::card::CardState;
use crate::error::ScheduleError;

/// Review quality on the SM-2 0-5 scale.
///
/// 0-2 are failures (lapse, interval reset), 3-5 are successes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub struct Grade(u8);

impl Grade {
  pub const BLACKOUT: Grade = Grade(0);
  pub const AGAIN: Grade = Grade(1);
  pub const WRONG_BUT_FAMILIAR: Grade = Grade(2);
  pub const HARD: Grade = Grade(3);
  pub const GOOD: Grade = Grade(4);
  pub const EASY: Grade = Grade(5);

  pub const MAX: u8 = 5;

  pub fn new(value: u8) -> Result<Self, ScheduleError> {
    if value > Self::MAX {
      return Err(ScheduleError::InvalidGrade(i64::from(value)));
    }
    Ok(Self(value))
  }

  pub fn value(&self) -> u8 {
    self.0
  }

  pub fn is_success(&self) -> bool {
    self.0 >= 3
  }
}

impl TryFrom<u8> for Grade {
  type Error = ScheduleError;

  fn try_from(value: u8) -> Result<Self, Self::Error> {
    Self::new(value)
  }
}

impl TryFrom<i64> for Grade {
  type Error = ScheduleError;

  fn try_from(value: i64) -> Result<Self, Self::Error> {
    u8::try_from(value)
      .map_err(|_| ScheduleError::InvalidGrade(value))
      .and_then(Self::new)
  }
}

impl From<Grade> for u8 {
  fn from(grade: Grade) -> Self {
    grade.0
  }
}

impl std::fmt::Display for Grade {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    write!(f, "{}", self.0)
  }
}

/// Record of one grading event, for audit and statistics.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReviewLog {
  pub quality: Grade,
  pub reviewed_at: DateTime<Utc>,
  pub previous_state: CardState,
  pub state: CardState,
  /// Whole days since the previous review (0 for a first review).
  pub elapsed_days: i64,
  pub scheduled_days: u32,
  pub ease_factor: f64,
}

impl ReviewLog {
  pub fn is_correct(&self) -> bool {
    self.quality.is_success()
  }

  /// True if this event pushed a graduated card back into relearning.
  pub fn is_lapse(&self) -> bool {
    self.previous_state == CardState::Review && self.state == CardState::Relearning
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use chrono::TimeZone;

  #[test]
  fn test_grade_accepts_range() {
    for v in 0..=5u8 {
      assert_eq!(Grade::new(v).unwrap().value(), v);
    }
  }

  #[test]
  fn test_grade_rejects_out_of_range() {
    assert_eq!(Grade::new(6), Err(ScheduleError::InvalidGrade(6)));
    assert_eq!(Grade::try_from(255u8), Err(ScheduleError::InvalidGrade(255)));
  }

  #[test]
  fn test_grade_from_i64() {
    assert_eq!(Grade::try_from(4i64), Ok(Grade::GOOD));
    assert_eq!(Grade::try_from(-1i64), Err(ScheduleError::InvalidGrade(-1)));
    assert_eq!(Grade::try_from(300i64), Err(ScheduleError::InvalidGrade(300)));
  }

  #[test]
  fn test_grade_success_boundary() {
    assert!(!Grade::BLACKOUT.is_success());
    assert!(!Grade::AGAIN.is_success());
    assert!(!Grade::WRONG_BUT_FAMILIAR.is_success());
    assert!(Grade::HARD.is_success());
    assert!(Grade::GOOD.is_success());
    assert!(Grade::EASY.is_success());
  }

  #[test]
  fn test_grade_serde() {
    assert_eq!(serde_json::to_string(&Grade::GOOD).unwrap(), "4");
    let g: Grade = serde_json::from_str("5").unwrap();
    assert_eq!(g, Grade::EASY);
    assert!(serde_json::from_str::<Grade>("9").is_err());
  }

  #[test]
  fn test_review_log_lapse() {
    let log = ReviewLog {
      quality: Grade::AGAIN,
      reviewed_at: Utc.with_ymd_and_hms(2024, 3, 1, 9, 0, 0).unwrap(),
      previous_state: CardState::Review,
      state: CardState::Relearning,
      elapsed_days: 6,
      scheduled_days: 1,
      ease_factor: 2.3,
    };
    assert!(log.is_lapse());
    assert!(!log.is_correct());
  }
}
