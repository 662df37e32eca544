//! Commands accepted by the engine and the actions it hands back to drivers.
use serde::{Deserialize, Serialize};
use std::time::Duration;

use super::state::RaceStatus;

/// Opaque handle naming one scheduled timer.
///
/// Every deferred continuation carries the token it was scheduled with; the
/// engine ignores firings whose token is no longer the live one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TimerToken(u64);

impl TimerToken {
    pub(crate) const fn new(id: u64) -> Self {
        Self(id)
    }

    #[must_use]
    pub const fn id(self) -> u64 {
        self.0
    }
}

/// What a timer does when it fires.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TimerKind {
    /// Repeats every period until cancelled.
    Tick,
    /// Fires once after the inter-round pause.
    RoundDelay,
}

impl TimerKind {
    #[must_use]
    pub const fn repeats(self) -> bool {
        matches!(self, Self::Tick)
    }
}

/// Inbound commands from a presentation layer or CLI.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "command", content = "count")]
pub enum Command {
    GenerateRoster(usize),
    GenerateRounds,
    Start,
    Pause,
    Toggle,
    ResetAll,
    GenerateAll,
}

/// Side effects requested by the engine.
#[derive(Debug, Clone, PartialEq)]
pub enum Action {
    SetTimer {
        token: TimerToken,
        kind: TimerKind,
        duration: Duration,
    },
    CancelTimer {
        token: TimerToken,
    },
    Emit(RaceEvent),
}

/// Change notifications published for observers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "event")]
pub enum RaceEvent {
    RosterGenerated {
        horses: usize,
    },
    RoundsGenerated {
        rounds: usize,
    },
    StatusChanged {
        from: RaceStatus,
        to: RaceStatus,
    },
    RoundStarted {
        round_index: usize,
        distance: u32,
    },
    HorseFinished {
        round_index: usize,
        horse_id: u32,
        finish_time: u64,
    },
    RoundCompleted {
        round_index: usize,
        winner_id: Option<u32>,
    },
    RaceFinished,
    Reset,
}

/// Split engine output into its emitted events.
#[must_use]
pub fn events_of(actions: &[Action]) -> Vec<RaceEvent> {
    actions
        .iter()
        .filter_map(|action| match action {
            Action::Emit(event) => Some(event.clone()),
            Action::SetTimer { .. } | Action::CancelTimer { .. } => None,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn commands_use_tagged_json() {
        let json = serde_json::to_string(&Command::GenerateRoster(12)).unwrap();
        assert_eq!(json, r#"{"command":"generate_roster","count":12}"#);
        let back: Command = serde_json::from_str(r#"{"command":"toggle"}"#).unwrap();
        assert_eq!(back, Command::Toggle);
    }

    #[test]
    fn events_are_filtered_from_actions() {
        let actions = vec![
            Action::CancelTimer {
                token: TimerToken::new(1),
            },
            Action::Emit(RaceEvent::RaceFinished),
        ];
        assert_eq!(events_of(&actions), vec![RaceEvent::RaceFinished]);
        assert!(TimerKind::Tick.repeats());
        assert!(!TimerKind::RoundDelay.repeats());
    }
}
