pub mod card;
pub mod review;

pub use card::{CardState, ReviewRow, ReviewState, DEFAULT_EASE_FACTOR, MIN_EASE_FACTOR};
pub use review::{Grade, ReviewLog};
