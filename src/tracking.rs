//! Per-card time tracking state machine.
//!
//! ```text
//!            start / resume
//!   idle  ------------------>  tracking
//!         <------------------
//!             pause / stop
//! ```
//!
//! Leaving the tracking state adds the elapsed whole seconds to the card's
//! running total. Every transition is also written to the journal.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

use crate::database::models::Card;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum TrackingError {
    #[error("Time tracking is already running for this card")]
    AlreadyTracking,

    #[error("Time tracking is not running for this card")]
    NotTracking,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TrackingAction {
    Start,
    Pause,
    Resume,
    Stop,
}

impl TrackingAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            TrackingAction::Start => "start",
            TrackingAction::Pause => "pause",
            TrackingAction::Resume => "resume",
            TrackingAction::Stop => "stop",
        }
    }
}

impl fmt::Display for TrackingAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TrackingAction {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "start" => Ok(TrackingAction::Start),
            "pause" => Ok(TrackingAction::Pause),
            "resume" => Ok(TrackingAction::Resume),
            "stop" => Ok(TrackingAction::Stop),
            other => Err(format!("Invalid tracking action '{}'", other)),
        }
    }
}

/// Tracking columns of a card
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrackingState {
    /// Seconds
    pub total_time_spent: i64,
    pub is_tracking: bool,
    pub tracking_start_time: Option<DateTime<Utc>>,
    pub tracking_pause_time: i64,
}

impl From<&Card> for TrackingState {
    fn from(card: &Card) -> Self {
        Self {
            total_time_spent: card.total_time_spent,
            is_tracking: card.is_tracking,
            tracking_start_time: card.tracking_start_time,
            tracking_pause_time: card.tracking_pause_time,
        }
    }
}

impl TrackingState {
    pub fn idle() -> Self {
        Self {
            total_time_spent: 0,
            is_tracking: false,
            tracking_start_time: None,
            tracking_pause_time: 0,
        }
    }

    fn elapsed(&self, now: DateTime<Utc>) -> i64 {
        self.tracking_start_time
            .map(|start| (now - start).num_seconds().max(0))
            .unwrap_or(0)
    }
}

/// Result of one transition: the new card state plus the journal row fields
#[derive(Debug, Clone, PartialEq)]
pub struct Transition {
    pub state: TrackingState,
    pub entry_start_time: Option<DateTime<Utc>>,
    pub entry_end_time: Option<DateTime<Utc>>,
    pub duration: i64,
}

pub fn apply(
    state: &TrackingState,
    action: TrackingAction,
    now: DateTime<Utc>,
) -> Result<Transition, TrackingError> {
    match action {
        TrackingAction::Start | TrackingAction::Resume => {
            if state.is_tracking {
                return Err(TrackingError::AlreadyTracking);
            }
            Ok(Transition {
                state: TrackingState {
                    total_time_spent: state.total_time_spent,
                    is_tracking: true,
                    tracking_start_time: Some(now),
                    tracking_pause_time: 0,
                },
                entry_start_time: Some(now),
                entry_end_time: None,
                duration: 0,
            })
        }
        TrackingAction::Pause | TrackingAction::Stop => {
            if !state.is_tracking {
                return Err(TrackingError::NotTracking);
            }
            let duration = state.elapsed(now);
            Ok(Transition {
                state: TrackingState {
                    total_time_spent: state.total_time_spent + duration,
                    is_tracking: false,
                    tracking_start_time: None,
                    tracking_pause_time: 0,
                },
                entry_start_time: state.tracking_start_time,
                entry_end_time: Some(now),
                duration,
            })
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TrackingSummary {
    #[serde(flatten)]
    pub state: TrackingState,
    pub current_session_time: i64,
}

pub fn summary(state: &TrackingState, now: DateTime<Utc>) -> TrackingSummary {
    let current_session_time = if state.is_tracking { state.elapsed(now) } else { 0 };
    TrackingSummary {
        state: state.clone(),
        current_session_time,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn start_then_stop_accumulates_seconds() {
        let t0 = Utc::now();
        let started = apply(&TrackingState::idle(), TrackingAction::Start, t0).unwrap();
        assert!(started.state.is_tracking);
        assert_eq!(started.state.tracking_start_time, Some(t0));

        let stopped = apply(&started.state, TrackingAction::Stop, t0 + Duration::milliseconds(90_900)).unwrap();
        assert_eq!(stopped.duration, 90);
        assert_eq!(stopped.state.total_time_spent, 90);
        assert!(!stopped.state.is_tracking);
        assert_eq!(stopped.entry_start_time, Some(t0));
    }

    #[test]
    fn pause_resume_cycles_add_up() {
        let t0 = Utc::now();
        let s = apply(&TrackingState::idle(), TrackingAction::Start, t0).unwrap().state;
        let s = apply(&s, TrackingAction::Pause, t0 + Duration::seconds(30)).unwrap().state;
        let s = apply(&s, TrackingAction::Resume, t0 + Duration::seconds(100)).unwrap().state;
        let s = apply(&s, TrackingAction::Stop, t0 + Duration::seconds(130)).unwrap().state;
        assert_eq!(s.total_time_spent, 60);
    }

    #[test]
    fn rejects_invalid_transitions() {
        let now = Utc::now();
        assert_eq!(
            apply(&TrackingState::idle(), TrackingAction::Stop, now),
            Err(TrackingError::NotTracking)
        );
        let running = apply(&TrackingState::idle(), TrackingAction::Start, now).unwrap().state;
        assert_eq!(
            apply(&running, TrackingAction::Resume, now),
            Err(TrackingError::AlreadyTracking)
        );
    }

    #[test]
    fn clock_skew_never_subtracts() {
        let now = Utc::now();
        let running = apply(&TrackingState::idle(), TrackingAction::Start, now).unwrap().state;
        let stopped = apply(&running, TrackingAction::Pause, now - Duration::seconds(5)).unwrap();
        assert_eq!(stopped.duration, 0);
    }

    #[test]
    fn summary_reports_running_session() {
        let now = Utc::now();
        let running = apply(&TrackingState::idle(), TrackingAction::Start, now - Duration::seconds(42))
            .unwrap()
            .state;
        assert_eq!(summary(&running, now).current_session_time, 42);
        assert_eq!(summary(&TrackingState::idle(), now).current_session_time, 0);
    }

    #[test]
    fn parses_actions() {
        assert_eq!("resume".parse::<TrackingAction>(), Ok(TrackingAction::Resume));
        assert!("rewind".parse::<TrackingAction>().is_err());
    }
}
