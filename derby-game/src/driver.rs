//! Tokio driver executing engine actions on real (or paused) time.
//!
//! The driver task is the only owner of the [`RaceEngine`]. Callers talk to
//! it through a [`RaceHandle`]: commands travel over an mpsc inbox, the
//! latest [`RaceSnapshot`] is published on a `watch` channel and engine
//! events fan out over a `broadcast` channel.
use log::{debug, warn};
use std::collections::HashMap;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::{broadcast, mpsc, oneshot, watch};
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior, interval_at, sleep};

use crate::clock::Clock;
use crate::config::{RaceConfig, RaceConfigError};
use crate::numbers::duration_to_millis;
use crate::race::{Action, Command, RaceEngine, RaceEvent, RaceSnapshot, TimerKind, TimerToken};
use crate::roster::RosterError;

const COMMAND_QUEUE: usize = 32;
const EVENT_QUEUE: usize = 256;

/// Monotonic milliseconds on the tokio timeline. Honors paused test time.
#[derive(Debug, Clone, Copy)]
pub struct TokioClock {
    origin: Instant,
}

impl TokioClock {
    #[must_use]
    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
        }
    }
}

impl Default for TokioClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for TokioClock {
    fn now_ms(&self) -> u64 {
        duration_to_millis(self.origin.elapsed())
    }
}

/// Errors surfaced to [`RaceHandle`] callers.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum DriverError {
    #[error("race driver has stopped")]
    Closed,
    #[error(transparent)]
    Roster(#[from] RosterError),
}

type Firing = (TimerToken, TimerKind);

/// One tokio task per live token. Aborting the task is the cancellation;
/// a firing already queued when the abort lands is rejected by the engine.
struct TimerManager {
    fired: mpsc::UnboundedSender<Firing>,
    tasks: HashMap<TimerToken, JoinHandle<()>>,
}

impl TimerManager {
    fn new(fired: mpsc::UnboundedSender<Firing>) -> Self {
        Self {
            fired,
            tasks: HashMap::new(),
        }
    }

    fn set(&mut self, token: TimerToken, kind: TimerKind, duration: Duration) {
        let fired = self.fired.clone();
        let task = if kind.repeats() {
            tokio::spawn(async move {
                let mut interval = interval_at(Instant::now() + duration, duration);
                interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
                loop {
                    interval.tick().await;
                    if fired.send((token, kind)).is_err() {
                        break;
                    }
                }
            })
        } else {
            tokio::spawn(async move {
                sleep(duration).await;
                let _ = fired.send((token, kind));
            })
        };
        if let Some(previous) = self.tasks.insert(token, task) {
            previous.abort();
        }
    }

    fn cancel(&mut self, token: TimerToken) {
        if let Some(task) = self.tasks.remove(&token) {
            task.abort();
        }
    }

    /// Drop bookkeeping for a one-shot timer that already fired.
    fn forget(&mut self, token: TimerToken) {
        self.tasks.remove(&token);
    }

    fn cancel_all(&mut self) {
        for (_, task) in self.tasks.drain() {
            task.abort();
        }
    }
}

enum Request {
    Command(Command, oneshot::Sender<Result<(), RosterError>>),
    Shutdown(oneshot::Sender<()>),
}

/// Event loop that owns the engine and its timers.
pub struct RaceDriver {
    engine: RaceEngine<TokioClock>,
    timers: TimerManager,
    fired: mpsc::UnboundedReceiver<Firing>,
    requests: mpsc::Receiver<Request>,
    snapshots: watch::Sender<RaceSnapshot>,
    events: broadcast::Sender<RaceEvent>,
}

impl RaceDriver {
    /// Build a driver and the handle that controls it. Call [`RaceDriver::run`]
    /// (or use [`spawn`]) to start processing.
    ///
    /// # Errors
    ///
    /// Returns `RaceConfigError` when the configuration fails validation.
    pub fn new(config: RaceConfig, seed: u64) -> Result<(Self, RaceHandle), RaceConfigError> {
        let engine = RaceEngine::with_config(config, seed, TokioClock::new())?;
        let (fired_tx, fired_rx) = mpsc::unbounded_channel();
        let (request_tx, request_rx) = mpsc::channel(COMMAND_QUEUE);
        let (snapshot_tx, snapshot_rx) = watch::channel(engine.snapshot());
        let (event_tx, _) = broadcast::channel(EVENT_QUEUE);

        let handle = RaceHandle {
            requests: request_tx,
            snapshots: snapshot_rx,
            events: event_tx.clone(),
        };
        let driver = Self {
            engine,
            timers: TimerManager::new(fired_tx),
            fired: fired_rx,
            requests: request_rx,
            snapshots: snapshot_tx,
            events: event_tx,
        };
        Ok((driver, handle))
    }

    /// Process commands and timer firings until shutdown or until every
    /// handle is dropped.
    pub async fn run(mut self) {
        loop {
            tokio::select! {
                request = self.requests.recv() => match request {
                    Some(Request::Command(command, reply)) => {
                        let result = match self.engine.handle(command) {
                            Ok(actions) => {
                                self.execute(actions);
                                Ok(())
                            }
                            Err(err) => {
                                warn!("command {command:?} rejected: {err}");
                                Err(err)
                            }
                        };
                        let _ = reply.send(result);
                    }
                    Some(Request::Shutdown(done)) => {
                        self.timers.cancel_all();
                        let _ = done.send(());
                        break;
                    }
                    None => break,
                },
                Some((token, kind)) = self.fired.recv() => {
                    if !kind.repeats() {
                        self.timers.forget(token);
                    }
                    let actions = self.engine.on_timer(token, kind);
                    self.execute(actions);
                }
            }
        }
        self.timers.cancel_all();
        debug!("race driver stopped");
    }

    fn execute(&mut self, actions: Vec<Action>) {
        for action in actions {
            match action {
                Action::SetTimer {
                    token,
                    kind,
                    duration,
                } => self.timers.set(token, kind, duration),
                Action::CancelTimer { token } => self.timers.cancel(token),
                Action::Emit(event) => {
                    // No subscribers is not an error.
                    let _ = self.events.send(event);
                }
            }
        }
        self.snapshots.send_replace(self.engine.snapshot());
    }
}

/// Build a driver and run it on the current tokio runtime.
///
/// # Errors
///
/// Returns `RaceConfigError` when the configuration fails validation.
pub fn spawn(config: RaceConfig, seed: u64) -> Result<RaceHandle, RaceConfigError> {
    let (driver, handle) = RaceDriver::new(config, seed)?;
    tokio::spawn(driver.run());
    Ok(handle)
}

/// Cloneable control surface for a running [`RaceDriver`].
#[derive(Debug, Clone)]
pub struct RaceHandle {
    requests: mpsc::Sender<Request>,
    snapshots: watch::Receiver<RaceSnapshot>,
    events: broadcast::Sender<RaceEvent>,
}

impl RaceHandle {
    /// Send a command and wait for the engine to apply it.
    ///
    /// # Errors
    ///
    /// Returns `DriverError::Closed` when the driver has stopped, or the
    /// engine's `RosterError` when roster generation is rejected.
    pub async fn send(&self, command: Command) -> Result<(), DriverError> {
        let (reply, response) = oneshot::channel();
        self.requests
            .send(Request::Command(command, reply))
            .await
            .map_err(|_| DriverError::Closed)?;
        response.await.map_err(|_| DriverError::Closed)??;
        Ok(())
    }

    /// Latest published snapshot.
    #[must_use]
    pub fn snapshot(&self) -> RaceSnapshot {
        self.snapshots.borrow().clone()
    }

    /// Receiver that observes every published snapshot.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<RaceSnapshot> {
        self.snapshots.clone()
    }

    /// Receiver for engine events emitted after this call.
    #[must_use]
    pub fn events(&self) -> broadcast::Receiver<RaceEvent> {
        self.events.subscribe()
    }

    /// Wait until a published snapshot satisfies `done`.
    ///
    /// # Errors
    ///
    /// Returns `DriverError::Closed` if the driver stops first.
    pub async fn wait_until<F>(&self, mut done: F) -> Result<RaceSnapshot, DriverError>
    where
        F: FnMut(&RaceSnapshot) -> bool,
    {
        let mut receiver = self.snapshots.clone();
        let snapshot = receiver
            .wait_for(|snapshot| done(snapshot))
            .await
            .map_err(|_| DriverError::Closed)?;
        Ok(snapshot.clone())
    }

    /// Stop the driver and cancel its timers.
    ///
    /// # Errors
    ///
    /// Returns `DriverError::Closed` if the driver already stopped.
    pub async fn shutdown(&self) -> Result<(), DriverError> {
        let (done, stopped) = oneshot::channel();
        self.requests
            .send(Request::Shutdown(done))
            .await
            .map_err(|_| DriverError::Closed)?;
        stopped.await.map_err(|_| DriverError::Closed)
    }
}
