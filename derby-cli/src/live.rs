use colored::Colorize;
use log::warn;
use std::time::Duration;
use tokio::sync::broadcast::{Receiver, error::RecvError};

use derby_game::{RaceEvent, RaceHandle, RaceSnapshot, lap_label};

fn horse_name(snapshot: &RaceSnapshot, horse_id: u32) -> String {
    snapshot
        .roster
        .iter()
        .find(|horse| horse.id == horse_id)
        .map_or_else(|| format!("#{horse_id}"), |horse| horse.name.clone())
}

/// One progress line for an event, or `None` for bookkeeping events.
pub fn describe(event: &RaceEvent, snapshot: &RaceSnapshot) -> Option<String> {
    match event {
        RaceEvent::RoundStarted {
            round_index,
            distance,
        } => Some(format!(
            "🏇 {} started",
            lap_label(*round_index, *distance).bold()
        )),
        RaceEvent::HorseFinished {
            horse_id,
            finish_time,
            ..
        } => Some(format!(
            "   {} crossed the line at {:.1}s",
            horse_name(snapshot, *horse_id),
            Duration::from_millis(*finish_time).as_secs_f64()
        )),
        RaceEvent::RoundCompleted {
            round_index,
            winner_id,
        } => {
            let distance = snapshot.rounds.get(*round_index)?.distance;
            let winner = winner_id.map_or_else(|| "nobody".to_string(), |id| horse_name(snapshot, id));
            Some(format!(
                "🏁 {} won by {}",
                lap_label(*round_index, distance),
                winner.green()
            ))
        }
        RaceEvent::RaceFinished => Some("🎉 Race finished".bright_green().bold().to_string()),
        RaceEvent::StatusChanged { from, to } => Some(format!("   status {from} -> {to}")),
        RaceEvent::RosterGenerated { .. } | RaceEvent::RoundsGenerated { .. } | RaceEvent::Reset => {
            None
        }
    }
}

/// Print progress for a live race until it finishes or the driver stops.
pub async fn follow(mut events: Receiver<RaceEvent>, handle: RaceHandle) {
    loop {
        match events.recv().await {
            Ok(event) => {
                if let Some(line) = describe(&event, &handle.snapshot()) {
                    eprintln!("{line}");
                }
                if event == RaceEvent::RaceFinished {
                    break;
                }
            }
            Err(RecvError::Lagged(skipped)) => warn!("progress skipped {skipped} events"),
            Err(RecvError::Closed) => break,
        }
    }
}

/// Replay recorded events after an instant run.
pub fn replay(events: &[RaceEvent], snapshot: &RaceSnapshot) {
    for line in events.iter().filter_map(|event| describe(event, snapshot)) {
        eprintln!("{line}");
    }
}
