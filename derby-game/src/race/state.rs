//! The race record owned by the engine and its read-only snapshot.
use serde::{Deserialize, Serialize};

use super::event::TimerToken;
use crate::horse::{Entrant, Horse};
use crate::labels::lap_label;
use crate::ranking::RoundResult;
use crate::round::Round;

/// Lifecycle of a race.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RaceStatus {
    #[default]
    Idle,
    Running,
    Paused,
    Finished,
}

impl RaceStatus {
    /// Caption for the start/pause control.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Idle => "Start",
            Self::Running => "Pause",
            Self::Paused => "Resume",
            Self::Finished => "Finished",
        }
    }
}

impl std::fmt::Display for RaceStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Idle => write!(f, "idle"),
            Self::Running => write!(f, "running"),
            Self::Paused => write!(f, "paused"),
            Self::Finished => write!(f, "finished"),
        }
    }
}

/// Complete race state. Only the engine mutates it.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Race {
    pub roster: Vec<Horse>,
    pub rounds: Vec<Round>,
    pub current_round: usize,
    pub status: RaceStatus,
    /// One ranked entry per completed round, in round order.
    pub round_results: Vec<RoundResult>,
    /// Live only while the current round is ticking.
    pub tick_timer: Option<TimerToken>,
    /// Live only during the pause between rounds.
    pub pending_rollover: Option<TimerToken>,
}

impl Race {
    #[must_use]
    pub fn current(&self) -> Option<&Round> {
        self.rounds.get(self.current_round)
    }

    /// Entrants of the current round, or an empty slice before planning.
    #[must_use]
    pub fn current_horses(&self) -> &[Entrant] {
        self.current()
            .map(|round| round.horses.as_slice())
            .unwrap_or_default()
    }

    #[must_use]
    pub fn status_label(&self) -> &'static str {
        self.status.label()
    }

    /// Lap heading for the current round, empty before planning.
    #[must_use]
    pub fn lap_label(&self) -> String {
        self.current()
            .map(|round| lap_label(self.current_round, round.distance))
            .unwrap_or_default()
    }

    #[must_use]
    pub fn is_last_round(&self) -> bool {
        self.current_round + 1 >= self.rounds.len()
    }

    /// Read-only copy for renderers.
    #[must_use]
    pub fn snapshot(&self) -> RaceSnapshot {
        RaceSnapshot {
            roster: self.roster.clone(),
            rounds: self.rounds.clone(),
            current_round: self.current_round,
            round_results: self.round_results.clone(),
            status: self.status,
            status_label: self.status_label().to_string(),
            lap_label: self.lap_label(),
        }
    }
}

/// Published view of the race. Timer tokens stay private to the engine.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RaceSnapshot {
    pub roster: Vec<Horse>,
    pub rounds: Vec<Round>,
    pub current_round: usize,
    pub round_results: Vec<RoundResult>,
    pub status: RaceStatus,
    pub status_label: String,
    pub lap_label: String,
}

impl RaceSnapshot {
    #[must_use]
    pub fn current_horses(&self) -> &[Entrant] {
        self.rounds
            .get(self.current_round)
            .map(|round| round.horses.as_slice())
            .unwrap_or_default()
    }

    #[must_use]
    pub fn is_finished(&self) -> bool {
        self.status == RaceStatus::Finished
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn labels_follow_status() {
        assert_eq!(RaceStatus::Idle.label(), "Start");
        assert_eq!(RaceStatus::Running.label(), "Pause");
        assert_eq!(RaceStatus::Paused.label(), "Resume");
        assert_eq!(RaceStatus::Finished.label(), "Finished");
        assert_eq!(RaceStatus::Paused.to_string(), "paused");
    }

    #[test]
    fn empty_race_has_no_current_round() {
        let race = Race::default();
        assert!(race.current().is_none());
        assert!(race.current_horses().is_empty());
        assert_eq!(race.lap_label(), "");
        let snapshot = race.snapshot();
        assert_eq!(snapshot.status_label, "Start");
        assert!(snapshot.current_horses().is_empty());
    }

    #[test]
    fn lap_label_tracks_current_round() {
        let race = Race {
            rounds: vec![Round::new(1200, Vec::new()), Round::new(1400, Vec::new())],
            current_round: 1,
            ..Race::default()
        };
        assert_eq!(race.lap_label(), "2.nd Lap 1400m");
        assert!(race.is_last_round());
    }

    #[test]
    fn snapshot_status_serializes_lowercase() {
        let snapshot = Race::default().snapshot();
        let json = serde_json::to_value(&snapshot).unwrap();
        assert_eq!(json["status"], "idle");
        assert_eq!(json["lap_label"], "");
    }
}
