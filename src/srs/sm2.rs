use chrono::{DateTime, Duration, Utc};

use crate::config::SchedulerConfig;
use crate::domain::{CardState, Grade, ReviewLog, ReviewState, MIN_EASE_FACTOR};
use crate::error::{Result, ScheduleError};

/// Interval a failed card falls back to when there is no relearning ladder.
const RESET_INTERVAL_DAYS: u32 = 1;

/// Upper bound on a scheduled interval (~100 years).
pub const MAX_INTERVAL_DAYS: u32 = 36_500;

/// Ease after a successful review.
///
/// EF' = EF + (0.1 - (5 - q) * (0.08 + (5 - q) * 0.02)), floored at 1.3
pub fn ease_after_success(current_ease_factor: f64, quality: Grade) -> f64 {
  let q = f64::from(quality.value());
  let ease_delta = 0.1 - (5.0 - q) * (0.08 + (5.0 - q) * 0.02);
  (current_ease_factor + ease_delta).max(MIN_EASE_FACTOR)
}

/// SM-2 scheduler with optional sub-day learning ladders.
///
/// Pure: every call reads the given state and returns a new one. Callers
/// persisting the result must guard against concurrent grades of the same
/// item, e.g. by updating only where the stored `last_review` still matches
/// the one that was read.
#[derive(Debug, Clone, Default)]
pub struct Scheduler {
  config: SchedulerConfig,
}

impl Scheduler {
  pub fn new(config: SchedulerConfig) -> Result<Self> {
    config.validate()?;
    Ok(Self { config })
  }

  pub fn config(&self) -> &SchedulerConfig {
    &self.config
  }

  /// Review state for an item entering the system now.
  pub fn new_card(&self, now: DateTime<Utc>) -> ReviewState {
    ReviewState::with_ease(now, self.config.initial_ease)
  }

  /// Grade a card and compute its next review state.
  ///
  /// Rejects suspended items, states that break their invariants, and a
  /// `now` earlier than the last review. Nothing is clamped silently.
  pub fn schedule(&self, state: &ReviewState, quality: Grade, now: DateTime<Utc>) -> Result<ReviewState> {
    if state.suspended {
      tracing::warn!("Refusing to schedule suspended card");
      return Err(ScheduleError::SuspendedItem);
    }
    state.validate()?;
    if let Some(last_review) = state.last_review {
      if now < last_review {
        tracing::warn!("Refusing to schedule card: {} is before last review {}", now, last_review);
        return Err(ScheduleError::NegativeElapsed { last_review, now });
      }
    }

    let next = if quality.is_success() {
      self.on_success(state, quality, now)?
    } else {
      self.on_failure(state, now)?
    };

    tracing::debug!(
      "Scheduled card: {} -> {} (q={}, ease {:.2} -> {:.2}, interval {}d, due {})",
      state.state.as_str(),
      next.state.as_str(),
      quality,
      state.ease_factor,
      next.ease_factor,
      next.scheduled_days,
      next.due
    );

    Ok(next)
  }

  /// Same as [`Scheduler::schedule`], also returning a log of the event.
  pub fn schedule_with_log(
    &self,
    state: &ReviewState,
    quality: Grade,
    now: DateTime<Utc>,
  ) -> Result<(ReviewState, ReviewLog)> {
    let next = self.schedule(state, quality, now)?;
    let log = ReviewLog {
      quality,
      reviewed_at: now,
      previous_state: state.state,
      state: next.state,
      elapsed_days: state
        .last_review
        .map(|last| (now - last).num_days())
        .unwrap_or(0),
      scheduled_days: next.scheduled_days,
      ease_factor: next.ease_factor,
    };
    Ok((next, log))
  }

  fn ladder_for(&self, state: CardState) -> &[i64] {
    match state {
      CardState::New | CardState::Learning => self.config.learning_steps.as_slice(),
      CardState::Relearning => self.config.relearning_steps.as_slice(),
      CardState::Review => &[],
    }
  }

  fn on_failure(&self, state: &ReviewState, now: DateTime<Utc>) -> Result<ReviewState> {
    let next_state = match state.state {
      CardState::Review | CardState::Relearning => CardState::Relearning,
      CardState::New | CardState::Learning => CardState::Learning,
    };

    let mut next = state.clone();
    next.state = next_state;
    next.last_review = Some(now);
    next.lapses = state.lapses.saturating_add(1);
    next.ease_factor = (state.ease_factor - self.config.lapse_ease_penalty).max(MIN_EASE_FACTOR);
    next.stability = f64::from(RESET_INTERVAL_DAYS);
    next.learning_steps = 0;

    // Failure re-enters the ladder at step 0, or falls back to one day
    match self.ladder_for(next_state).first() {
      Some(&minutes) => {
        next.scheduled_days = 0;
        next.due = add_minutes(now, minutes)?;
      }
      None => {
        next.scheduled_days = RESET_INTERVAL_DAYS;
        next.due = add_days(now, RESET_INTERVAL_DAYS)?;
      }
    }
    Ok(next)
  }

  fn on_success(&self, state: &ReviewState, quality: Grade, now: DateTime<Utc>) -> Result<ReviewState> {
    let mut next = state.clone();
    next.last_review = Some(now);
    next.reps = state.reps.saturating_add(1);
    next.ease_factor = ease_after_success(state.ease_factor, quality);

    if state.state.is_learning() {
      let ladder = self.ladder_for(state.state);
      let next_step = state.learning_steps.saturating_add(1);
      if let Some(&minutes) = ladder.get(next_step as usize) {
        // Still climbing: stay sub-day
        next.state = match state.state {
          CardState::Relearning => CardState::Relearning,
          _ => CardState::Learning,
        };
        next.learning_steps = next_step;
        next.scheduled_days = 0;
        next.due = add_minutes(now, minutes)?;
        return Ok(next);
      }
    }

    let interval = match state.state {
      CardState::New | CardState::Learning => self.config.graduating_interval,
      CardState::Review | CardState::Relearning => match next.reps {
        0 | 1 => self.config.graduating_interval,
        2 => self.config.second_interval,
        _ => grown_interval(state.stability, next.ease_factor),
      },
    };

    next.state = CardState::Review;
    next.learning_steps = 0;
    next.scheduled_days = interval;
    next.stability = f64::from(interval);
    next.due = add_days(now, interval)?;
    Ok(next)
  }
}

fn grown_interval(previous_days: f64, ease_factor: f64) -> u32 {
  let grown = (previous_days * ease_factor).round();
  // `as` saturates; the clamp keeps it inside the scheduling range
  (grown as u32).clamp(1, MAX_INTERVAL_DAYS)
}

fn add_days(now: DateTime<Utc>, days: u32) -> Result<DateTime<Utc>> {
  now
    .checked_add_signed(Duration::days(i64::from(days)))
    .ok_or_else(|| ScheduleError::invalid_state(format!("due date overflows {} + {}d", now, days)))
}

fn add_minutes(now: DateTime<Utc>, minutes: i64) -> Result<DateTime<Utc>> {
  Duration::try_minutes(minutes)
    .and_then(|step| now.checked_add_signed(step))
    .ok_or_else(|| ScheduleError::invalid_state(format!("due date overflows {} + {}m", now, minutes)))
}

/// Schedule with the default policy (no learning ladders).
pub fn schedule(state: &ReviewState, quality: Grade, now: DateTime<Utc>) -> Result<ReviewState> {
  Scheduler::default().schedule(state, quality, now)
}
