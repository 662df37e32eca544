//! Stride math and per-tick position updates.
use rand::Rng;
use serde::{Deserialize, Serialize};
use smallvec::SmallVec;

use crate::constants::{BASE_STRIDE, CONDITION_STRIDE_DIVISOR, FINISH_LINE};
use crate::horse::Entrant;
use crate::round::Round;

/// Updates are kept inline up to a full round line-up.
pub type UpdateSet = SmallVec<[PositionUpdate; 10]>;

/// Next position for a horse given a roll in `[0, 1)`.
///
/// A horse always gains one unit plus up to `condition / 20` more, and never
/// passes the finish line.
#[must_use]
pub fn calculate_new_position(position: f64, condition: u8, roll: f64) -> f64 {
    let advance = roll * (f64::from(condition) / CONDITION_STRIDE_DIVISOR) + BASE_STRIDE;
    (position + advance).min(FINISH_LINE)
}

/// Draw a roll and compute the entrant's next position.
pub fn advance_horse<R: Rng + ?Sized>(entrant: &Entrant, rng: &mut R) -> f64 {
    let roll = rng.r#gen::<f64>();
    calculate_new_position(entrant.position, entrant.horse.condition, roll)
}

/// New state for one entrant produced by a tick.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PositionUpdate {
    /// Index of the entrant within its round.
    pub index: usize,
    pub position: f64,
    /// Present only on the tick where the entrant first reaches the line.
    pub finish_time: Option<u64>,
}

/// All updates produced by one tick of one round.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TickBatch {
    pub updates: UpdateSet,
}

impl TickBatch {
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.updates.is_empty()
    }

    /// Updates that carry a finish time.
    pub fn finishers(&self) -> impl Iterator<Item = &PositionUpdate> {
        self.updates.iter().filter(|u| u.finish_time.is_some())
    }
}

/// Roll every entrant still short of the line and collect the results
/// without touching the round. `now` and `started_at` are clock millis.
pub fn plan_tick<R: Rng + ?Sized>(
    round: &Round,
    rng: &mut R,
    started_at: u64,
    now: u64,
) -> TickBatch {
    let elapsed = now.saturating_sub(started_at);
    let updates = round
        .horses
        .iter()
        .enumerate()
        .filter(|(_, entrant)| entrant.is_running())
        .map(|(index, entrant)| {
            let position = advance_horse(entrant, rng);
            let finish_time =
                (position >= FINISH_LINE && entrant.finish_time.is_none()).then_some(elapsed);
            PositionUpdate {
                index,
                position,
                finish_time,
            }
        })
        .collect();
    TickBatch { updates }
}

impl Round {
    /// Apply a planned batch in one step. Positions never move backwards and
    /// an existing finish time is never overwritten.
    pub fn apply_tick(&mut self, batch: &TickBatch) {
        for update in &batch.updates {
            let Some(entrant) = self.horses.get_mut(update.index) else {
                continue;
            };
            entrant.position = update.position.clamp(entrant.position, FINISH_LINE);
            if entrant.finish_time.is_none() {
                entrant.finish_time = update.finish_time;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::horse::Horse;
    use rand::RngCore;
    use rand::SeedableRng;
    use rand::rngs::SmallRng;

    /// Always yields the same 64-bit word; `1 << 63` samples as exactly 0.5.
    struct StubRng {
        value: u64,
        calls: u32,
    }

    impl StubRng {
        fn half() -> Self {
            Self {
                value: 1 << 63,
                calls: 0,
            }
        }
    }

    impl RngCore for StubRng {
        fn next_u32(&mut self) -> u32 {
            self.calls = self.calls.saturating_add(1);
            (self.value >> 32) as u32
        }

        fn next_u64(&mut self) -> u64 {
            self.calls = self.calls.saturating_add(1);
            self.value
        }

        fn fill_bytes(&mut self, dest: &mut [u8]) {
            let value = self.next_u64().to_le_bytes();
            for (idx, byte) in dest.iter_mut().enumerate() {
                *byte = value[idx % value.len()];
            }
        }

        fn try_fill_bytes(&mut self, dest: &mut [u8]) -> Result<(), rand::Error> {
            self.fill_bytes(dest);
            Ok(())
        }
    }

    fn entrant(id: u32, condition: u8, position: f64) -> Entrant {
        let mut entrant = Entrant::new(Horse {
            id,
            name: format!("Horse {id}"),
            color: "#000000".to_string(),
            condition,
        });
        entrant.position = position;
        entrant
    }

    #[test]
    fn stride_formula_matches_expected_values() {
        assert!((calculate_new_position(0.0, 100, 0.5) - 3.5).abs() < 1e-9);
        assert!((calculate_new_position(10.0, 20, 0.5) - 11.5).abs() < 1e-9);
        assert!((calculate_new_position(10.0, 1, 0.0) - 11.0).abs() < 1e-9);
        assert!((calculate_new_position(99.0, 40, 0.5) - 100.0).abs() < f64::EPSILON);
    }

    #[test]
    fn stub_rng_rolls_exactly_half() {
        let mut rng = StubRng::half();
        let roll = rng.r#gen::<f64>();
        assert!((roll - 0.5).abs() < f64::EPSILON);
    }

    #[test]
    fn tick_crosses_one_horse_and_advances_the_other() {
        let mut round = Round::new(1200, vec![entrant(1, 40, 99.0), entrant(2, 20, 10.0)]);
        round.race_start_time = Some(1_000);
        let mut rng = StubRng::half();

        let batch = plan_tick(&round, &mut rng, 1_000, 1_700);
        round.apply_tick(&batch);

        assert!((round.horses[0].position - 100.0).abs() < f64::EPSILON);
        assert_eq!(round.horses[0].finish_time, Some(700));
        assert!((round.horses[1].position - 11.5).abs() < 1e-9);
        assert_eq!(round.horses[1].finish_time, None);
        assert_eq!(batch.finishers().count(), 1);
    }

    #[test]
    fn finished_horses_are_left_alone() {
        let mut finished = entrant(1, 90, 100.0);
        finished.finish_time = Some(300);
        let round = Round::new(1200, vec![finished, entrant(2, 50, 40.0)]);
        let mut rng = StubRng::half();

        let batch = plan_tick(&round, &mut rng, 0, 900);
        assert_eq!(batch.updates.len(), 1);
        assert_eq!(batch.updates[0].index, 1);
        assert_eq!(rng.calls, 1, "one roll per running horse");
    }

    #[test]
    fn apply_never_rewinds_or_rewrites_finish() {
        let mut done = entrant(1, 50, 100.0);
        done.finish_time = Some(400);
        let mut round = Round::new(1200, vec![done, entrant(2, 50, 60.0)]);
        let mut batch = TickBatch::default();
        batch.updates.push(PositionUpdate {
            index: 0,
            position: 100.0,
            finish_time: Some(999),
        });
        batch.updates.push(PositionUpdate {
            index: 1,
            position: 20.0,
            finish_time: None,
        });
        batch.updates.push(PositionUpdate {
            index: 7,
            position: 50.0,
            finish_time: None,
        });
        round.apply_tick(&batch);
        assert_eq!(round.horses[0].finish_time, Some(400));
        assert!((round.horses[1].position - 60.0).abs() < f64::EPSILON);
    }

    #[test]
    fn positions_stay_monotonic_and_bounded() {
        let mut rng = SmallRng::seed_from_u64(31);
        let mut round = Round::new(
            1600,
            (1..=10u8)
                .map(|i| entrant(u32::from(i), i * 10, 0.0))
                .collect(),
        );
        let mut finish_seen = vec![None; round.horses.len()];
        for tick in 1..=200u64 {
            let before: Vec<f64> = round.horses.iter().map(|e| e.position).collect();
            let batch = plan_tick(&round, &mut rng, 0, tick * 100);
            round.apply_tick(&batch);
            for (idx, entrant) in round.horses.iter().enumerate() {
                assert!(entrant.position >= before[idx]);
                assert!(entrant.position <= FINISH_LINE);
                if let Some(first) = finish_seen[idx] {
                    assert_eq!(entrant.finish_time, Some(first), "finish time is write-once");
                } else if entrant.finish_time.is_some() {
                    assert!((entrant.position - FINISH_LINE).abs() < f64::EPSILON);
                    finish_seen[idx] = entrant.finish_time;
                }
            }
        }
        assert!(round.is_complete());
    }

    #[test]
    fn stronger_condition_crosses_first_under_fixed_rolls() {
        let conditions = [1u8, 50, 100, 1, 1];
        let mut round = Round::new(
            1200,
            conditions
                .iter()
                .zip(1u32..)
                .map(|(&condition, id)| entrant(id, condition, 0.0))
                .collect(),
        );
        let mut rng = StubRng::half();
        let mut tick = 0u64;
        while !round.is_complete() {
            tick += 1;
            let batch = plan_tick(&round, &mut rng, 0, tick * 100);
            round.apply_tick(&batch);
        }
        let strong = round.horses[2].finish_time.unwrap();
        for weak in [0, 3, 4] {
            assert!(strong < round.horses[weak].finish_time.unwrap());
        }
    }
}
