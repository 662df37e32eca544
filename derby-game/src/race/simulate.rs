//! Virtual-time execution of engine actions.
//!
//! Timers are kept in an ordered queue keyed by due time and insertion
//! order. Stepping pops the earliest entry, moves the [`ManualClock`] to its
//! due time and delivers it to the engine, so a full race runs in
//! microseconds with the same timeline a real driver would produce.
use log::debug;
use std::collections::{BTreeMap, HashMap};
use std::time::Duration;

use super::RaceEngine;
use super::event::{Action, Command, RaceEvent, TimerKind, TimerToken};
use crate::clock::{Clock, ManualClock};
use crate::constants::FINISH_LINE;
use crate::numbers::{duration_to_millis, round_f64_to_i32};
use crate::roster::RosterError;

type QueueKey = (u64, u64);

#[derive(Debug, Clone, Copy)]
struct Scheduled {
    token: TimerToken,
    kind: TimerKind,
    period: Duration,
}

/// Outcome of a simulated run.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SimulationReport {
    /// Tick firings delivered to the engine.
    pub ticks: u64,
    /// Virtual milliseconds between the simulator's creation and its last step.
    pub elapsed_ms: u64,
    pub events: Vec<RaceEvent>,
}

/// Upper bound on timer firings for a race of `rounds` rounds.
///
/// Every running horse gains at least one unit per tick, so a round needs
/// at most `FINISH_LINE` ticks plus its rollover delay.
#[must_use]
pub fn step_budget(rounds: usize) -> u64 {
    let per_round = u64::try_from(round_f64_to_i32(FINISH_LINE.ceil()))
        .unwrap_or(0)
        .saturating_add(2);
    u64::try_from(rounds)
        .unwrap_or(u64::MAX)
        .saturating_add(1)
        .saturating_mul(per_round)
}

/// Executes engine actions against a virtual timeline.
pub struct Simulator<'a> {
    engine: &'a mut RaceEngine<ManualClock>,
    queue: BTreeMap<QueueKey, Scheduled>,
    keys: HashMap<TimerToken, QueueKey>,
    seq: u64,
    started_at: u64,
    ticks: u64,
    events: Vec<RaceEvent>,
}

impl<'a> Simulator<'a> {
    #[must_use]
    pub fn new(engine: &'a mut RaceEngine<ManualClock>) -> Self {
        let started_at = engine.clock().now_ms();
        Self {
            engine,
            queue: BTreeMap::new(),
            keys: HashMap::new(),
            seq: 0,
            started_at,
            ticks: 0,
            events: Vec::new(),
        }
    }

    #[must_use]
    pub fn engine(&self) -> &RaceEngine<ManualClock> {
        &*self.engine
    }

    /// Timers currently queued.
    #[must_use]
    pub fn live_timers(&self) -> usize {
        self.keys.len()
    }

    #[must_use]
    pub fn now_ms(&self) -> u64 {
        self.engine.clock().now_ms()
    }

    /// Send a command to the engine and execute the resulting actions.
    ///
    /// # Errors
    ///
    /// Propagates `RosterError` from roster generation.
    pub fn dispatch(&mut self, command: Command) -> Result<(), RosterError> {
        let actions = self.engine.handle(command)?;
        self.execute(actions);
        Ok(())
    }

    /// Jump the clock forward without firing anything, as if the user
    /// waited while paused.
    pub fn idle_for(&mut self, millis: u64) {
        self.engine.clock().advance(millis);
    }

    /// Fire the earliest queued timer. Returns `None` once the queue is empty.
    pub fn step(&mut self) -> Option<TimerKind> {
        let (key, scheduled) = self.queue.pop_first()?;
        self.keys.remove(&scheduled.token);
        let (due, _) = key;
        self.engine.clock().set(due);

        if scheduled.kind.repeats() {
            let next = due.saturating_add(duration_to_millis(scheduled.period));
            self.schedule(scheduled, next);
        }
        if scheduled.kind == TimerKind::Tick {
            self.ticks += 1;
        }
        let actions = self.engine.on_timer(scheduled.token, scheduled.kind);
        self.execute(actions);
        Some(scheduled.kind)
    }

    /// Step until no timer remains or `max_steps` firings were delivered.
    pub fn run_until_settled(&mut self, max_steps: u64) -> SimulationReport {
        let mut steps = 0;
        while steps < max_steps && self.step().is_some() {
            steps += 1;
        }
        if !self.queue.is_empty() {
            debug!("simulation stopped after {steps} steps with timers pending");
        }
        self.report()
    }

    /// Step until `done` holds for the engine, the queue drains or the
    /// budget runs out. Returns whether `done` was reached.
    pub fn run_until<F>(&mut self, max_steps: u64, mut done: F) -> bool
    where
        F: FnMut(&RaceEngine<ManualClock>) -> bool,
    {
        for _ in 0..max_steps {
            if done(&*self.engine) {
                return true;
            }
            if self.step().is_none() {
                break;
            }
        }
        done(&*self.engine)
    }

    #[must_use]
    pub fn report(&self) -> SimulationReport {
        SimulationReport {
            ticks: self.ticks,
            elapsed_ms: self.now_ms().saturating_sub(self.started_at),
            events: self.events.clone(),
        }
    }

    fn execute(&mut self, actions: Vec<Action>) {
        for action in actions {
            match action {
                Action::SetTimer {
                    token,
                    kind,
                    duration,
                } => {
                    let due = self.now_ms().saturating_add(duration_to_millis(duration));
                    self.schedule(
                        Scheduled {
                            token,
                            kind,
                            period: duration,
                        },
                        due,
                    );
                }
                Action::CancelTimer { token } => {
                    if let Some(key) = self.keys.remove(&token) {
                        self.queue.remove(&key);
                    }
                }
                Action::Emit(event) => self.events.push(event),
            }
        }
    }

    fn schedule(&mut self, scheduled: Scheduled, due: u64) {
        self.seq += 1;
        let key = (due, self.seq);
        if let Some(previous) = self.keys.insert(scheduled.token, key) {
            self.queue.remove(&previous);
        }
        self.queue.insert(key, scheduled);
    }
}

/// Start a prepared engine and run it to the end on virtual time.
pub fn simulate_race(engine: &mut RaceEngine<ManualClock>) -> SimulationReport {
    let budget = step_budget(engine.race().rounds.len());
    let mut simulator = Simulator::new(engine);
    // Start is a no-op when there is nothing to run; the report then stays empty.
    let _ = simulator.dispatch(Command::Start);
    simulator.run_until_settled(budget)
}
