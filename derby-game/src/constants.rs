//! Centralized catalogs and timing constants for Derby race logic.
//!
//! These values define the default shape of a race. `RaceConfig` may
//! override timing and shape at runtime; the catalogs and stride tuning are
//! fixed.

// Timing -------------------------------------------------------------------
/// Interval between position updates while a round is ticking.
pub const TICK_PERIOD_MS: u64 = 100;
/// Pause between a completed round and the start of the next one.
pub const ROUND_DELAY_MS: u64 = 1_000;

// Race shape ---------------------------------------------------------------
/// Distance in meters for each round, in running order.
pub const ROUND_DISTANCES: [u32; 6] = [1200, 1400, 1600, 1800, 2000, 2200];
/// Maximum entrants drawn into a single round.
pub const ROUND_CAPACITY: usize = 10;
/// Horses generated for a fresh race.
pub const ROSTER_SIZE: usize = 20;
/// Position at which a horse has crossed the line.
pub const FINISH_LINE: f64 = 100.0;

// Stride tuning ------------------------------------------------------------
pub const CONDITION_MIN: u8 = 1;
pub const CONDITION_MAX: u8 = 100;
/// Condition points that buy one extra unit of maximum stride.
pub(crate) const CONDITION_STRIDE_DIVISOR: f64 = 20.0;
/// Stride every horse gets regardless of roll.
pub(crate) const BASE_STRIDE: f64 = 1.0;

// Catalogs -----------------------------------------------------------------
pub const BASE_COLORS: [&str; 20] = [
    "#e6194b", "#3cb44b", "#ffe119", "#4363d8", "#f58231", "#911eb4", "#46f0f0", "#f032e6",
    "#bcf60c", "#fabebe", "#008080", "#e6beff", "#9a6324", "#fffac8", "#800000", "#aaffc3",
    "#808000", "#ffd8b1", "#000075", "#808080",
];

pub const HORSE_NAMES: [&str; 20] = [
    "Ada Lovelace",
    "Grace Hopper",
    "Margaret Hamilton",
    "Joan Clarke",
    "Alan Turing",
    "Katherine Johnson",
    "Barbara Liskov",
    "Donald Knuth",
    "Tim Berners-Lee",
    "Linus Torvalds",
    "Dennis Ritchie",
    "Ken Thompson",
    "John von Neumann",
    "Edsger Dijkstra",
    "Jean Bartik",
    "Mary Wilkes",
    "Frances Allen",
    "Radia Perlman",
    "Brian Kernighan",
    "John McCarthy",
];

/// Largest roster the name and color catalogs can supply without repeats.
#[must_use]
pub const fn catalog_capacity() -> usize {
    if HORSE_NAMES.len() < BASE_COLORS.len() {
        HORSE_NAMES.len()
    } else {
        BASE_COLORS.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn catalogs_hold_unique_entries() {
        let names: HashSet<_> = HORSE_NAMES.iter().collect();
        let colors: HashSet<_> = BASE_COLORS.iter().collect();
        assert_eq!(names.len(), HORSE_NAMES.len());
        assert_eq!(colors.len(), BASE_COLORS.len());
        assert!(catalog_capacity() >= ROSTER_SIZE);
    }
}
