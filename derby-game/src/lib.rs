//! Derby Race Engine
//!
//! Platform-agnostic core logic for a multi-round horse race simulation.
//! This crate generates rosters and round line-ups, advances horses on a
//! timer-driven tick loop and ranks each round, without UI or platform
//! dependencies. Enable the `async` feature for the tokio driver.

pub mod advance;
pub mod clock;
pub mod config;
pub mod constants;
#[cfg(feature = "async")]
pub mod driver;
pub mod horse;
pub mod labels;
pub mod numbers;
pub mod race;
pub mod ranking;
pub mod rng;
pub mod roster;
pub mod round;

// Re-export commonly used types
pub use advance::{PositionUpdate, TickBatch, advance_horse, calculate_new_position, plan_tick};
pub use clock::{Clock, ManualClock, SystemClock};
pub use config::{RaceConfig, RaceConfigError};
#[cfg(feature = "async")]
pub use driver::{DriverError, RaceDriver, RaceHandle, TokioClock};
pub use horse::{Entrant, Horse};
pub use labels::{lap_label, ordinal_suffix};
pub use race::{
    Action, Command, Race, RaceEngine, RaceEvent, RaceSnapshot, RaceStatus, SimulationReport,
    Simulator, TimerKind, TimerToken, events_of, simulate_race,
};
pub use ranking::{RoundResult, sorted_by_ranking};
pub use rng::{CountingRng, RngBundle};
pub use roster::{RosterError, generate_colors, generate_horses, generate_names, random_condition};
pub use round::{Round, generate_rounds};
