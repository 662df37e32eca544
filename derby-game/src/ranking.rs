//! Final standings for a round.
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

use crate::horse::Entrant;

/// Ranked outcome of one completed round.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoundResult {
    pub round_index: usize,
    pub distance: u32,
    /// Entrants from first place to last.
    pub standings: Vec<Entrant>,
}

impl RoundResult {
    #[must_use]
    pub fn winner(&self) -> Option<&Entrant> {
        self.standings.first()
    }
}

/// Order entrants for the results board.
///
/// Finished entrants come first by ascending finish time, keeping input order
/// on ties. Unfinished entrants follow by descending position, then by
/// descending condition. The input is not modified.
#[must_use]
pub fn sorted_by_ranking(entrants: &[Entrant]) -> Vec<Entrant> {
    let mut standings = entrants.to_vec();
    standings.sort_by(compare_standing);
    standings
}

fn compare_standing(a: &Entrant, b: &Entrant) -> Ordering {
    match (a.finish_time, b.finish_time) {
        (Some(left), Some(right)) => left.cmp(&right),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => b
            .position
            .total_cmp(&a.position)
            .then_with(|| b.horse.condition.cmp(&a.horse.condition)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::horse::Horse;

    fn entrant(id: u32, condition: u8, position: f64, finish_time: Option<u64>) -> Entrant {
        Entrant {
            horse: Horse {
                id,
                name: format!("Horse {id}"),
                color: "#ffffff".to_string(),
                condition,
            },
            position,
            finish_time,
        }
    }

    fn ids(standings: &[Entrant]) -> Vec<u32> {
        standings.iter().map(|e| e.horse.id).collect()
    }

    #[test]
    fn earlier_finish_ranks_higher() {
        let field = vec![
            entrant(1, 50, 100.0, Some(3_200)),
            entrant(2, 50, 100.0, Some(2_900)),
            entrant(3, 50, 100.0, Some(4_100)),
        ];
        assert_eq!(ids(&sorted_by_ranking(&field)), vec![2, 1, 3]);
    }

    #[test]
    fn ties_keep_input_order() {
        let field = vec![
            entrant(4, 10, 100.0, Some(1_000)),
            entrant(9, 90, 100.0, Some(1_000)),
            entrant(2, 50, 100.0, Some(900)),
        ];
        assert_eq!(ids(&sorted_by_ranking(&field)), vec![2, 4, 9]);
    }

    #[test]
    fn unfinished_fall_back_to_position_then_condition() {
        let field = vec![
            entrant(1, 30, 80.0, None),
            entrant(2, 70, 80.0, None),
            entrant(3, 10, 95.0, None),
            entrant(4, 10, 100.0, Some(5_000)),
        ];
        assert_eq!(ids(&sorted_by_ranking(&field)), vec![4, 3, 2, 1]);
    }

    #[test]
    fn ranking_does_not_mutate_input() {
        let field = vec![
            entrant(1, 30, 100.0, Some(20)),
            entrant(2, 70, 100.0, Some(10)),
        ];
        let before = field.clone();
        let standings = sorted_by_ranking(&field);
        assert_eq!(field, before);
        let result = RoundResult {
            round_index: 0,
            distance: 1200,
            standings,
        };
        assert_eq!(result.winner().map(|e| e.horse.id), Some(2));
    }
}
