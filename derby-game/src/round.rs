//! Rounds and the planner that draws their line-ups.
use rand::Rng;
use rand::seq::SliceRandom;
use serde::{Deserialize, Serialize};

use crate::horse::{Entrant, Horse};

/// One timed heat of the race.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct Round {
    /// Distance in meters; a label only, never used by the stride math.
    pub distance: u32,
    pub horses: Vec<Entrant>,
    /// Clock timestamp (ms) stamped the first time the round starts ticking.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub race_start_time: Option<u64>,
}

impl Round {
    #[must_use]
    pub fn new(distance: u32, horses: Vec<Entrant>) -> Self {
        Self {
            distance,
            horses,
            race_start_time: None,
        }
    }

    /// Every entrant has a recorded finish time. Empty rounds never complete.
    #[must_use]
    pub fn is_complete(&self) -> bool {
        !self.horses.is_empty() && self.horses.iter().all(Entrant::has_finished)
    }

    #[must_use]
    pub const fn has_started(&self) -> bool {
        self.race_start_time.is_some()
    }

    /// Stamp the start time unless one is already recorded; returns the
    /// effective start time.
    pub fn stamp_start(&mut self, now: u64) -> u64 {
        *self.race_start_time.get_or_insert(now)
    }

    /// Entrants that have crossed the line so far.
    #[must_use]
    pub fn finished_count(&self) -> usize {
        self.horses.iter().filter(|e| e.has_finished()).count()
    }
}

/// Build one round per distance. Each line-up is an independent uniform
/// shuffle of the roster truncated to `capacity`; the roster itself is left
/// untouched and every entrant starts at the gate.
pub fn generate_rounds<R: Rng + ?Sized>(
    roster: &[Horse],
    distances: &[u32],
    capacity: usize,
    rng: &mut R,
) -> Vec<Round> {
    distances
        .iter()
        .map(|&distance| {
            let mut line_up: Vec<&Horse> = roster.iter().collect();
            line_up.shuffle(rng);
            let horses = line_up
                .into_iter()
                .take(capacity)
                .cloned()
                .map(Entrant::new)
                .collect();
            Round::new(distance, horses)
        })
        .collect()
}
