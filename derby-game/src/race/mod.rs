//! Race progression engine: the status machine, the tick loop and round
//! rollover.
//!
//! The engine is synchronous and deterministic. Commands and timer firings
//! go in; [`Action`]s come out for a driver to execute (arm or cancel a
//! timer, publish an event). Every timer carries a [`TimerToken`], and a
//! firing whose token is no longer live is ignored, so cancellation holds
//! even when a driver delivers a firing that was already in flight.
use log::{debug, info, trace};

pub mod event;
pub mod simulate;
pub mod state;

pub use event::{Action, Command, RaceEvent, TimerKind, TimerToken, events_of};
pub use simulate::{SimulationReport, Simulator, simulate_race, step_budget};
pub use state::{Race, RaceSnapshot, RaceStatus};

use crate::advance::plan_tick;
use crate::clock::{Clock, SystemClock};
use crate::config::{RaceConfig, RaceConfigError};
use crate::ranking::{RoundResult, sorted_by_ranking};
use crate::rng::RngBundle;
use crate::roster::{RosterError, generate_horses};
use crate::round::generate_rounds;

/// Owns a [`Race`] exclusively and drives it through its lifecycle.
#[derive(Debug, Clone)]
pub struct RaceEngine<C: Clock = SystemClock> {
    config: RaceConfig,
    clock: C,
    rng: RngBundle,
    race: Race,
    next_token: u64,
}

impl RaceEngine<SystemClock> {
    /// Engine with the default configuration on the wall clock.
    #[must_use]
    pub fn new(seed: u64) -> Self {
        Self::build(RaceConfig::default(), seed, SystemClock)
    }
}

impl<C: Clock> RaceEngine<C> {
    /// Create an engine from an explicit configuration and clock.
    ///
    /// # Errors
    ///
    /// Returns `RaceConfigError` when the configuration fails validation.
    pub fn with_config(config: RaceConfig, seed: u64, clock: C) -> Result<Self, RaceConfigError> {
        config.validate()?;
        Ok(Self::build(config, seed, clock))
    }

    fn build(config: RaceConfig, seed: u64, clock: C) -> Self {
        Self {
            config,
            clock,
            rng: RngBundle::from_user_seed(seed),
            race: Race::default(),
            next_token: 0,
        }
    }

    /// Borrow the race record.
    #[must_use]
    pub const fn race(&self) -> &Race {
        &self.race
    }

    #[must_use]
    pub const fn config(&self) -> &RaceConfig {
        &self.config
    }

    #[must_use]
    pub const fn clock(&self) -> &C {
        &self.clock
    }

    #[must_use]
    pub const fn status(&self) -> RaceStatus {
        self.race.status
    }

    #[must_use]
    pub fn snapshot(&self) -> RaceSnapshot {
        self.race.snapshot()
    }

    /// Number of timers the engine currently considers live.
    #[must_use]
    pub fn live_timers(&self) -> usize {
        usize::from(self.race.tick_timer.is_some())
            + usize::from(self.race.pending_rollover.is_some())
    }

    /// Deterministically reseed engine-owned RNGs.
    pub fn reseed(&mut self, seed: u64) {
        self.rng = RngBundle::from_user_seed(seed);
    }

    /// Dispatch an inbound command.
    ///
    /// # Errors
    ///
    /// Returns `RosterError` when a roster request exceeds the catalogs.
    pub fn handle(&mut self, command: Command) -> Result<Vec<Action>, RosterError> {
        match command {
            Command::GenerateRoster(count) => self.generate_roster(count),
            Command::GenerateRounds => Ok(self.generate_rounds()),
            Command::Start => Ok(self.start()),
            Command::Pause => Ok(self.pause()),
            Command::Toggle => Ok(self.toggle()),
            Command::ResetAll => Ok(self.reset_all()),
            Command::GenerateAll => self.generate_all(),
        }
    }

    /// Replace the roster. Rounds already planned keep their own copies.
    ///
    /// # Errors
    ///
    /// Returns `RosterError::CatalogExhausted` when `count` exceeds the catalogs.
    pub fn generate_roster(&mut self, count: usize) -> Result<Vec<Action>, RosterError> {
        let horses = generate_horses(count, self.rng.roster())?;
        debug!("generated roster of {count} horses");
        self.race.roster = horses;
        Ok(vec![Action::Emit(RaceEvent::RosterGenerated { horses: count })])
    }

    /// Plan a fresh set of rounds from the roster. Any progress on the
    /// previous rounds is discarded and the race returns to idle.
    pub fn generate_rounds(&mut self) -> Vec<Action> {
        let mut actions = Vec::new();
        self.cancel_timers(&mut actions);
        self.race.rounds = generate_rounds(
            &self.race.roster,
            &self.config.round_distances,
            self.config.round_capacity,
            self.rng.planner(),
        );
        self.race.round_results.clear();
        self.race.current_round = 0;
        self.set_status(RaceStatus::Idle, &mut actions);
        actions.push(Action::Emit(RaceEvent::RoundsGenerated {
            rounds: self.race.rounds.len(),
        }));
        actions
    }

    /// Fresh roster of the configured size, fresh rounds, idle status.
    ///
    /// # Errors
    ///
    /// Returns `RosterError` when the configured roster exceeds the catalogs.
    pub fn generate_all(&mut self) -> Result<Vec<Action>, RosterError> {
        let mut actions = self.generate_roster(self.config.roster_size)?;
        actions.extend(self.generate_rounds());
        Ok(actions)
    }

    /// Start or resume the current round.
    pub fn start(&mut self) -> Vec<Action> {
        let status = self.race.status;
        if matches!(status, RaceStatus::Running | RaceStatus::Finished) {
            debug!("start ignored while {status}");
            return Vec::new();
        }
        if self
            .race
            .current()
            .is_none_or(|round| round.horses.is_empty())
        {
            debug!("start ignored: no runnable round");
            return Vec::new();
        }
        let mut actions = Vec::new();
        self.set_status(RaceStatus::Running, &mut actions);
        self.begin_ticking(&mut actions);
        actions
    }

    /// Freeze the race in place. Positions, finish times and the round's
    /// start time are kept.
    pub fn pause(&mut self) -> Vec<Action> {
        if self.race.status != RaceStatus::Running {
            debug!("pause ignored while {}", self.race.status);
            return Vec::new();
        }
        let mut actions = Vec::new();
        self.cancel_timers(&mut actions);
        self.set_status(RaceStatus::Paused, &mut actions);
        actions
    }

    /// Pause when running, otherwise start.
    pub fn toggle(&mut self) -> Vec<Action> {
        if self.race.status == RaceStatus::Running {
            self.pause()
        } else {
            self.start()
        }
    }

    /// Drop roster, rounds and results and return to idle.
    pub fn reset_all(&mut self) -> Vec<Action> {
        let mut actions = Vec::new();
        self.cancel_timers(&mut actions);
        self.set_status(RaceStatus::Idle, &mut actions);
        self.race = Race::default();
        actions.push(Action::Emit(RaceEvent::Reset));
        actions
    }

    /// Deliver a timer firing.
    pub fn on_timer(&mut self, token: TimerToken, kind: TimerKind) -> Vec<Action> {
        match kind {
            TimerKind::Tick => self.on_tick(token),
            TimerKind::RoundDelay => self.on_round_delay(token),
        }
    }

    fn on_tick(&mut self, token: TimerToken) -> Vec<Action> {
        if self.race.tick_timer != Some(token) {
            trace!("stale tick {} ignored", token.id());
            return Vec::new();
        }
        let mut actions = Vec::new();
        if self.race.status != RaceStatus::Running {
            self.cancel_timers(&mut actions);
            return actions;
        }

        let index = self.race.current_round;
        let now = self.clock.now_ms();
        let Some(round) = self.race.rounds.get_mut(index) else {
            debug!("tick ignored: round {index} does not exist");
            return actions;
        };
        if round.horses.is_empty() {
            return actions;
        }

        let started_at = round.stamp_start(now);
        let batch = plan_tick(round, self.rng.stride(), started_at, now);
        round.apply_tick(&batch);
        for update in batch.finishers() {
            if let (Some(entrant), Some(finish_time)) =
                (round.horses.get(update.index), update.finish_time)
            {
                actions.push(Action::Emit(RaceEvent::HorseFinished {
                    round_index: index,
                    horse_id: entrant.horse.id,
                    finish_time,
                }));
            }
        }
        trace!(
            "round {index} tick: {} moved, {}/{} finished",
            batch.updates.len(),
            round.finished_count(),
            round.horses.len()
        );

        if round.is_complete() {
            self.complete_round(index, &mut actions);
        }
        actions
    }

    fn on_round_delay(&mut self, token: TimerToken) -> Vec<Action> {
        if self.race.pending_rollover != Some(token) {
            debug!("stale round delay {} ignored", token.id());
            return Vec::new();
        }
        self.race.pending_rollover = None;
        if self.race.status != RaceStatus::Running {
            debug!("rollover held while {}", self.race.status);
            return Vec::new();
        }
        let mut actions = Vec::new();
        self.begin_ticking(&mut actions);
        actions
    }

    fn complete_round(&mut self, index: usize, actions: &mut Vec<Action>) {
        if let Some(token) = self.race.tick_timer.take() {
            actions.push(Action::CancelTimer { token });
        }
        let Some(round) = self.race.rounds.get(index) else {
            return;
        };
        let standings = sorted_by_ranking(&round.horses);
        let distance = round.distance;
        let winner_id = standings.first().map(|entrant| entrant.horse.id);

        if self.race.round_results.len() == index {
            self.race.round_results.push(RoundResult {
                round_index: index,
                distance,
                standings,
            });
        } else {
            debug!("result for round {index} already recorded");
        }
        info!("round {} ({distance}m) complete", index + 1);
        actions.push(Action::Emit(RaceEvent::RoundCompleted {
            round_index: index,
            winner_id,
        }));

        if !self.race.is_last_round() {
            self.race.current_round = index + 1;
            let token = self.issue_token();
            self.race.pending_rollover = Some(token);
            actions.push(Action::SetTimer {
                token,
                kind: TimerKind::RoundDelay,
                duration: self.config.round_delay(),
            });
        } else {
            self.set_status(RaceStatus::Finished, actions);
            info!(
                "race finished after {} rounds ({} stride draws)",
                self.race.rounds.len(),
                self.rng.stride().draws()
            );
            actions.push(Action::Emit(RaceEvent::RaceFinished));
        }
    }

    /// Arm the tick loop for the current round, replacing any live timer.
    fn begin_ticking(&mut self, actions: &mut Vec<Action>) {
        self.cancel_timers(actions);
        let index = self.race.current_round;
        let now = self.clock.now_ms();
        let Some(round) = self.race.rounds.get_mut(index) else {
            return;
        };
        if round.horses.is_empty() {
            return;
        }
        if !round.has_started() {
            round.stamp_start(now);
            actions.push(Action::Emit(RaceEvent::RoundStarted {
                round_index: index,
                distance: round.distance,
            }));
        }
        let token = self.issue_token();
        self.race.tick_timer = Some(token);
        actions.push(Action::SetTimer {
            token,
            kind: TimerKind::Tick,
            duration: self.config.tick_period(),
        });
    }

    fn cancel_timers(&mut self, actions: &mut Vec<Action>) {
        if let Some(token) = self.race.tick_timer.take() {
            actions.push(Action::CancelTimer { token });
        }
        if let Some(token) = self.race.pending_rollover.take() {
            actions.push(Action::CancelTimer { token });
        }
    }

    fn set_status(&mut self, to: RaceStatus, actions: &mut Vec<Action>) {
        let from = self.race.status;
        if from == to {
            return;
        }
        debug!("race status {from} -> {to}");
        self.race.status = to;
        actions.push(Action::Emit(RaceEvent::StatusChanged { from, to }));
    }

    fn issue_token(&mut self) -> TimerToken {
        self.next_token = self.next_token.wrapping_add(1);
        TimerToken::new(self.next_token)
    }
}
