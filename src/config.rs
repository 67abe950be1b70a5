//! Scheduler configuration.
//!
//! Values are resolved per field with priority: config.toml > environment
//! (.env is loaded first) > built-in defaults.
//!
//! ```toml
//! [scheduler]
//! focus_mode = false
//! learning_steps = [1, 10, 60, 240]
//! relearning_steps = [10]
//! initial_ease = 2.5
//!
//! [access]
//! review_admins = [1]
//! ```

use serde::Deserialize;
use std::path::Path;

use crate::domain::{DEFAULT_EASE_FACTOR, MIN_EASE_FACTOR};
use crate::error::{Result, ScheduleError};

// ==================== Learning Steps ====================

/// Normal learning steps in minutes: 1min → 10min → 1hr → 4hr (~5 hours to graduate)
pub const LEARNING_STEPS_NORMAL: [i64; 4] = [1, 10, 60, 240];

/// Focus mode learning steps in minutes: 1min → 5min → 15min → 30min (~50 minutes to graduate)
pub const LEARNING_STEPS_FOCUS: [i64; 4] = [1, 5, 15, 30];

/// Get learning steps based on focus mode
pub fn get_learning_steps(focus_mode: bool) -> &'static [i64; 4] {
    if focus_mode {
        &LEARNING_STEPS_FOCUS
    } else {
        &LEARNING_STEPS_NORMAL
    }
}

// ==================== Scheduling Defaults ====================

/// Interval in days given to a card when it first graduates
pub const GRADUATING_INTERVAL_DAYS: u32 = 1;

/// Interval in days for the second successful review
pub const SECOND_INTERVAL_DAYS: u32 = 6;

/// Ease subtracted on every failed review
pub const LAPSE_EASE_PENALTY: f64 = 0.2;

/// Default config file, relative to the working directory
pub const CONFIG_FILE: &str = "config.toml";

// ==================== Scheduler Policy ====================

/// Policy knobs for the SM-2 scheduler.
///
/// An empty ladder means cards skip sub-day steps entirely: the first
/// success graduates straight to a one-day interval.
#[derive(Debug, Clone, PartialEq)]
pub struct SchedulerConfig {
    /// Minutes for each learning step of a new card
    pub learning_steps: Vec<i64>,
    /// Minutes for each step after a lapse
    pub relearning_steps: Vec<i64>,
    pub initial_ease: f64,
    pub graduating_interval: u32,
    pub second_interval: u32,
    pub lapse_ease_penalty: f64,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            learning_steps: Vec::new(),
            relearning_steps: Vec::new(),
            initial_ease: DEFAULT_EASE_FACTOR,
            graduating_interval: GRADUATING_INTERVAL_DAYS,
            second_interval: SECOND_INTERVAL_DAYS,
            lapse_ease_penalty: LAPSE_EASE_PENALTY,
        }
    }
}

impl SchedulerConfig {
    /// Default policy with the normal or focus learning ladder
    pub fn with_ladder(focus_mode: bool) -> Self {
        Self {
            learning_steps: get_learning_steps(focus_mode).to_vec(),
            ..Self::default()
        }
    }

    pub fn validate(&self) -> Result<()> {
        let mut steps = self.learning_steps.iter().chain(&self.relearning_steps);
        if let Some(bad) = steps.find(|&&m| m <= 0) {
            return Err(ScheduleError::config(format!(
                "learning steps must be positive minutes, got {}",
                bad
            )));
        }
        if !(self.initial_ease >= MIN_EASE_FACTOR) {
            return Err(ScheduleError::config(format!(
                "initial_ease {} below floor {}",
                self.initial_ease, MIN_EASE_FACTOR
            )));
        }
        if self.graduating_interval < 1 || self.second_interval < 1 {
            return Err(ScheduleError::config("intervals must be at least one day"));
        }
        if !(self.lapse_ease_penalty >= 0.0) {
            return Err(ScheduleError::config(format!(
                "lapse_ease_penalty {} must be non-negative",
                self.lapse_ease_penalty
            )));
        }
        Ok(())
    }
}

/// Everything the scheduler crate reads from configuration
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ReviewConfig {
    pub scheduler: SchedulerConfig,
    /// User ids allowed to see review data
    pub review_admins: Vec<i64>,
}

// ==================== File Format ====================

#[derive(Debug, Default, Deserialize)]
struct FileConfig {
    scheduler: Option<SchedulerSection>,
    access: Option<AccessSection>,
}

#[derive(Debug, Default, Deserialize)]
struct SchedulerSection {
    focus_mode: Option<bool>,
    learning_steps: Option<Vec<i64>>,
    relearning_steps: Option<Vec<i64>>,
    initial_ease: Option<f64>,
    graduating_interval: Option<u32>,
    second_interval: Option<u32>,
    lapse_ease_penalty: Option<f64>,
}

#[derive(Debug, Default, Deserialize)]
struct AccessSection {
    review_admins: Option<Vec<i64>>,
}

// ==================== Loading ====================

/// Load config with priority: config.toml > .env > default
pub fn load_scheduler_config() -> Result<ReviewConfig> {
    // Load .env file if present
    let _ = dotenvy::dotenv();

    let path = Path::new(CONFIG_FILE);
    let file = if path.exists() {
        tracing::info!("Using scheduler config from {}", CONFIG_FILE);
        Some(read_file_config(path)?)
    } else {
        None
    };

    resolve(file, |key| std::env::var(key).ok())
}

/// Load config from an explicit file, still falling back to env and defaults
pub fn load_scheduler_config_from(path: &Path) -> Result<ReviewConfig> {
    let _ = dotenvy::dotenv();
    tracing::info!("Using scheduler config from {}", path.display());
    let file = read_file_config(path)?;
    resolve(Some(file), |key| std::env::var(key).ok())
}

fn read_file_config(path: &Path) -> Result<FileConfig> {
    let contents = std::fs::read_to_string(path)
        .map_err(|e| ScheduleError::config(format!("cannot read {}: {}", path.display(), e)))?;
    toml::from_str::<FileConfig>(&contents).map_err(|e| {
        tracing::warn!("Failed to parse {}: {}", path.display(), e);
        ScheduleError::config(format!("cannot parse {}: {}", path.display(), e))
    })
}

fn parse_list(key: &str, raw: &str) -> Result<Vec<i64>> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|s| {
            s.parse::<i64>()
                .map_err(|_| ScheduleError::config(format!("{}: '{}' is not an integer", key, s)))
        })
        .collect()
}

fn parse_flag(raw: &str) -> bool {
    matches!(raw.trim().to_ascii_lowercase().as_str(), "1" | "true" | "yes" | "on")
}

fn resolve(file: Option<FileConfig>, env: impl Fn(&str) -> Option<String>) -> Result<ReviewConfig> {
    let file = file.unwrap_or_default();
    let section = file.scheduler.unwrap_or_default();
    let defaults = SchedulerConfig::default();

    let focus_mode = match section.focus_mode {
        Some(flag) => Some(flag),
        None => env("SRS_FOCUS_MODE").map(|v| parse_flag(&v)),
    };

    let learning_steps = match section.learning_steps {
        Some(steps) => steps,
        None => match env("SRS_LEARNING_STEPS") {
            Some(raw) => parse_list("SRS_LEARNING_STEPS", &raw)?,
            None => focus_mode
                .map(|focus| get_learning_steps(focus).to_vec())
                .unwrap_or(defaults.learning_steps),
        },
    };

    let relearning_steps = match section.relearning_steps {
        Some(steps) => steps,
        None => match env("SRS_RELEARNING_STEPS") {
            Some(raw) => parse_list("SRS_RELEARNING_STEPS", &raw)?,
            None => defaults.relearning_steps,
        },
    };

    let scheduler = SchedulerConfig {
        learning_steps,
        relearning_steps,
        initial_ease: section.initial_ease.unwrap_or(defaults.initial_ease),
        graduating_interval: section
            .graduating_interval
            .unwrap_or(defaults.graduating_interval),
        second_interval: section.second_interval.unwrap_or(defaults.second_interval),
        lapse_ease_penalty: section
            .lapse_ease_penalty
            .unwrap_or(defaults.lapse_ease_penalty),
    };
    scheduler.validate()?;

    let review_admins = match file.access.and_then(|a| a.review_admins) {
        Some(ids) => ids,
        None => match env("SRS_REVIEW_ADMINS") {
            Some(raw) => parse_list("SRS_REVIEW_ADMINS", &raw)?,
            None => Vec::new(),
        },
    };

    tracing::debug!(
        "Scheduler config: {} learning steps, {} relearning steps, {} review admins",
        scheduler.learning_steps.len(),
        scheduler.relearning_steps.len(),
        review_admins.len()
    );

    Ok(ReviewConfig {
        scheduler,
        review_admins,
    })
}
