//! Horses and their per-round entries.
use serde::{Deserialize, Serialize};

use crate::constants::FINISH_LINE;

/// A roster horse. Identity and condition never change after generation.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Horse {
    pub id: u32,
    pub name: String,
    /// Hex color used by renderers for lanes and icons.
    pub color: String,
    /// Fitness in `1..=100`; drives the stride distribution.
    pub condition: u8,
}

/// A horse's independent copy inside one round.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Entrant {
    #[serde(flatten)]
    pub horse: Horse,
    /// Track position in `0..=100`.
    pub position: f64,
    /// Milliseconds from round start to the tick that reached the line.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub finish_time: Option<u64>,
}

impl Entrant {
    /// Enter a horse at the starting gate.
    #[must_use]
    pub fn new(horse: Horse) -> Self {
        Self {
            horse,
            position: 0.0,
            finish_time: None,
        }
    }

    #[must_use]
    pub fn has_finished(&self) -> bool {
        self.finish_time.is_some()
    }

    /// Whether the entrant still needs stride rolls.
    #[must_use]
    pub fn is_running(&self) -> bool {
        self.position < FINISH_LINE
    }
}

impl From<Horse> for Entrant {
    fn from(horse: Horse) -> Self {
        Self::new(horse)
    }
}
