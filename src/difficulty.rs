//! Difficulty feedback loop.
//!
//! Any validated read lowers the level by one immediately. Escalation only
//! starts once no read has validated for longer than the patience window,
//! then continues one level per failing tick up to `Hard`.

use std::time::Instant;

use log::info;

use crate::config::DifficultyConfig;
use crate::models::Difficulty;

#[derive(Debug, Clone)]
pub struct DifficultyController {
    level: Difficulty,
    last_success_at: Instant,
    config: DifficultyConfig,
}

impl DifficultyController {
    /// Start at `Easy`; the success clock starts at `now`
    pub fn new(now: Instant, config: DifficultyConfig) -> Self {
        Self {
            level: Difficulty::Easy,
            last_success_at: now,
            config,
        }
    }

    pub fn level(&self) -> Difficulty {
        self.level
    }

    pub fn last_success_at(&self) -> Instant {
        self.last_success_at
    }

    /// A tick produced a validated candidate
    pub fn record_success(&mut self, now: Instant) {
        self.last_success_at = now;
        self.set(self.level.lower());
    }

    /// A tick produced nothing valid
    pub fn record_failure(&mut self, now: Instant) {
        if now.saturating_duration_since(self.last_success_at) > self.config.patience() {
            self.set(self.level.raise());
        }
    }

    /// Dispatch on the tick outcome; returns the new level
    pub fn update(&mut self, success: bool, now: Instant) -> Difficulty {
        if success {
            self.record_success(now);
        } else {
            self.record_failure(now);
        }
        self.level
    }

    fn set(&mut self, level: Difficulty) {
        if level != self.level {
            info!("difficulty {} -> {}", self.level, level);
            self.level = level;
        }
    }
}
