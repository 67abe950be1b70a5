//! Due-set selection: which cards to show now, and in what order.
//!
//! Ordering:
//! - Most overdue first (`due` ascending)
//! - Ties go to the more urgent state: relearning, learning, review, new
//! - Remaining ties keep insertion order
//!
//! Works on a snapshot. Cards graded while a queue is being built may be
//! ordered from stale data; the next query picks them up.

use chrono::{DateTime, Utc};
use std::cmp::Ordering;

use crate::domain::{CardState, ReviewState};

/// Counts shown on a progress page
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DueSummary {
  pub new: usize,
  pub learning: usize,
  pub review: usize,
  pub relearning: usize,
  pub suspended: usize,
  pub not_due: usize,
}

impl DueSummary {
  pub fn total_due(&self) -> usize {
    self.new + self.learning + self.review + self.relearning
  }
}

fn queue_order(a: &ReviewState, b: &ReviewState) -> Ordering {
  a.due
    .cmp(&b.due)
    .then_with(|| b.state.urgency().cmp(&a.state.urgency()))
}

/// Ordered ids of every card due at `now`. Suspended cards never appear.
pub fn due_items<Id: Clone>(items: &[(Id, ReviewState)], now: DateTime<Utc>) -> Vec<Id> {
  let mut due: Vec<&(Id, ReviewState)> = items.iter().filter(|(_, s)| s.is_due(now)).collect();

  // sort_by is stable, which keeps insertion order for full ties
  due.sort_by(|(_, a), (_, b)| queue_order(a, b));

  tracing::debug!("Due set: {} of {} cards", due.len(), items.len());
  due.into_iter().map(|(id, _)| id.clone()).collect()
}

/// One page of [`due_items`].
pub fn due_items_page<Id: Clone>(
  items: &[(Id, ReviewState)],
  now: DateTime<Utc>,
  offset: usize,
  limit: usize,
) -> Vec<Id> {
  due_items(items, now)
    .into_iter()
    .skip(offset)
    .take(limit)
    .collect()
}

/// Count due cards by state, plus suspended and not-yet-due cards.
pub fn due_summary<Id>(items: &[(Id, ReviewState)], now: DateTime<Utc>) -> DueSummary {
  let mut summary = DueSummary::default();
  for (_, state) in items {
    if state.suspended {
      summary.suspended += 1;
      continue;
    }
    if state.due > now {
      summary.not_due += 1;
      continue;
    }
    match state.state {
      CardState::New => summary.new += 1,
      CardState::Learning => summary.learning += 1,
      CardState::Review => summary.review += 1,
      CardState::Relearning => summary.relearning += 1,
    }
  }
  summary
}

/// Earliest upcoming due time among active cards not yet due.
pub fn next_due<Id>(items: &[(Id, ReviewState)], now: DateTime<Utc>) -> Option<DateTime<Utc>> {
  items
    .iter()
    .map(|(_, s)| s)
    .filter(|s| !s.suspended && s.due > now)
    .map(|s| s.due)
    .min()
}
