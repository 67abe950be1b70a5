pub mod due_selector;
pub mod interval;
pub mod sm2;

pub use due_selector::{due_items, due_items_page, due_summary, next_due, DueSummary};
pub use interval::{format_interval, format_interval_ms};
pub use sm2::{ease_after_success, schedule, Scheduler};
