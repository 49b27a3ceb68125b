//! Acceptance state machine: temporal consensus plus cooldown.
//!
//! A validated code is emitted only after it has been read `min_hits` times
//! within the consensus window. Once emitted, the same code is suppressed
//! until the cooldown expires, so a barcode that stays in view is reported
//! once per cooldown rather than once per tick.

use std::collections::VecDeque;
use std::time::Instant;

use log::{debug, info};

use crate::config::AcceptanceConfig;

/// Outcome of observing one validated code
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Verdict {
    /// Consensus reached; the code should be emitted
    Accepted,
    /// Recorded, waiting for corroborating reads
    Pending { hits: usize },
    /// Same code as the last acceptance, still inside the cooldown
    CoolingDown,
}

/// Coarse state for observers
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Idle,
    CoolingDown,
}

#[derive(Debug, Clone)]
struct Hit {
    code: String,
    at: Instant,
}

#[derive(Debug, Clone)]
pub struct AcceptanceState {
    last_accepted: Option<(String, Instant)>,
    recent: VecDeque<Hit>,
    config: AcceptanceConfig,
}

impl AcceptanceState {
    pub fn new(config: AcceptanceConfig) -> Self {
        Self {
            last_accepted: None,
            recent: VecDeque::new(),
            config,
        }
    }

    /// Feed one validated code read at `now`
    pub fn observe(&mut self, code: &str, now: Instant) -> Verdict {
        if self.in_cooldown(code, now) {
            debug!("{code} suppressed by cooldown");
            return Verdict::CoolingDown;
        }

        self.recent.push_back(Hit {
            code: code.to_string(),
            at: now,
        });
        let window = self.config.consensus_window();
        while self
            .recent
            .front()
            .is_some_and(|h| now.saturating_duration_since(h.at) > window)
        {
            self.recent.pop_front();
        }

        let hits = self.recent.iter().filter(|h| h.code == code).count();
        if hits < self.config.min_hits {
            return Verdict::Pending { hits };
        }

        info!("accepted {code} after {hits} reads");
        self.recent.clear();
        self.last_accepted = Some((code.to_string(), now));
        Verdict::Accepted
    }

    /// `CoolingDown` while the last acceptance is younger than the cooldown
    pub fn phase(&self, now: Instant) -> Phase {
        match &self.last_accepted {
            Some((_, at)) if now.saturating_duration_since(*at) < self.config.cooldown() => {
                Phase::CoolingDown
            }
            _ => Phase::Idle,
        }
    }

    pub fn last_accepted(&self) -> Option<&str> {
        self.last_accepted.as_ref().map(|(code, _)| code.as_str())
    }

    /// Reads currently inside the consensus window
    pub fn pending_hits(&self) -> usize {
        self.recent.len()
    }

    fn in_cooldown(&self, code: &str, now: Instant) -> bool {
        match &self.last_accepted {
            Some((last, at)) => {
                last == code && now.saturating_duration_since(*at) < self.config.cooldown()
            }
            None => false,
        }
    }
}

impl Default for AcceptanceState {
    fn default() -> Self {
        Self::new(AcceptanceConfig::default())
    }
}
