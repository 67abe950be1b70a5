//! Capability check for viewing review data.
//!
//! The scheduler has no notion of users. Callers decide who may see a due
//! queue, then hand over the items.

use chrono::{DateTime, Utc};
use std::collections::HashSet;

use crate::config::ReviewConfig;
use crate::domain::ReviewState;
use crate::error::{Result, ScheduleError};
use crate::srs::due_items;

pub trait ReviewAccess {
  fn can_view_reviews(&self, user_id: i64) -> bool;
}

/// Fixed set of user ids allowed to see review data
#[derive(Debug, Clone, Default)]
pub struct AllowList {
  user_ids: HashSet<i64>,
}

impl AllowList {
  pub fn new(user_ids: impl IntoIterator<Item = i64>) -> Self {
    Self {
      user_ids: user_ids.into_iter().collect(),
    }
  }

  pub fn from_config(config: &ReviewConfig) -> Self {
    Self::new(config.review_admins.iter().copied())
  }

  pub fn is_empty(&self) -> bool {
    self.user_ids.is_empty()
  }
}

impl ReviewAccess for AllowList {
  fn can_view_reviews(&self, user_id: i64) -> bool {
    self.user_ids.contains(&user_id)
  }
}

/// [`due_items`] behind a capability check.
pub fn due_items_for<Id: Clone>(
  access: &impl ReviewAccess,
  user_id: i64,
  items: &[(Id, ReviewState)],
  now: DateTime<Utc>,
) -> Result<Vec<Id>> {
  if !access.can_view_reviews(user_id) {
    tracing::warn!("User {} denied access to review queue", user_id);
    return Err(ScheduleError::Forbidden { user_id });
  }
  Ok(due_items(items, now))
}
