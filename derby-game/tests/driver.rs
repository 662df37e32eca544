#![cfg(feature = "async")]

use derby_game::driver::spawn;
use derby_game::{Command, DriverError, RaceConfig, RaceEvent, RaceStatus, RosterError};
use std::time::Duration;

fn fast_config() -> RaceConfig {
    RaceConfig {
        tick_period_ms: 10,
        round_delay_ms: 50,
        ..RaceConfig::default()
    }
}

#[tokio::test(start_paused = true)]
async fn driver_runs_full_race() {
    let handle = spawn(fast_config(), 314).unwrap();
    let mut events = handle.events();
    handle.send(Command::GenerateAll).await.unwrap();
    handle.send(Command::Start).await.unwrap();

    let snapshot = handle
        .wait_until(|snapshot| snapshot.is_finished())
        .await
        .unwrap();
    assert_eq!(snapshot.round_results.len(), 6);
    assert_eq!(snapshot.status_label, "Finished");

    let mut finished = false;
    while let Ok(event) = events.try_recv() {
        if event == RaceEvent::RaceFinished {
            finished = true;
        }
    }
    assert!(finished);
    handle.shutdown().await.unwrap();
}

#[tokio::test(start_paused = true)]
async fn driver_matches_virtual_simulation() {
    let handle = spawn(fast_config(), 2718).unwrap();
    handle.send(Command::GenerateAll).await.unwrap();
    handle.send(Command::Start).await.unwrap();
    let live = handle
        .wait_until(|snapshot| snapshot.is_finished())
        .await
        .unwrap();

    let mut engine = derby_game::RaceEngine::with_config(
        fast_config(),
        2718,
        derby_game::ManualClock::default(),
    )
    .unwrap();
    engine.generate_all().unwrap();
    derby_game::simulate_race(&mut engine);

    let simulated = engine.snapshot();
    assert_eq!(live.rounds.len(), simulated.rounds.len());
    for (live, simulated) in live.round_results.iter().zip(&simulated.round_results) {
        let live_order: Vec<u32> = live.standings.iter().map(|e| e.horse.id).collect();
        let sim_order: Vec<u32> = simulated.standings.iter().map(|e| e.horse.id).collect();
        assert_eq!(live_order, sim_order);
    }
}

#[tokio::test(start_paused = true)]
async fn pause_freezes_positions() {
    let handle = spawn(fast_config(), 9).unwrap();
    handle.send(Command::GenerateAll).await.unwrap();
    handle.send(Command::Start).await.unwrap();
    tokio::time::sleep(Duration::from_millis(55)).await;
    handle.send(Command::Pause).await.unwrap();

    let frozen = handle.snapshot();
    assert_eq!(frozen.status, RaceStatus::Paused);
    assert_eq!(frozen.status_label, "Resume");
    tokio::time::sleep(Duration::from_secs(5)).await;
    assert_eq!(handle.snapshot().current_horses(), frozen.current_horses());

    handle.send(Command::Toggle).await.unwrap();
    let resumed = handle
        .wait_until(|snapshot| snapshot.round_results.len() == 1)
        .await
        .unwrap();
    assert_eq!(resumed.status, RaceStatus::Running);
}

#[tokio::test(start_paused = true)]
async fn roster_errors_reach_the_caller() {
    let handle = spawn(fast_config(), 1).unwrap();
    let err = handle.send(Command::GenerateRoster(50)).await.unwrap_err();
    assert_eq!(
        err,
        DriverError::Roster(RosterError::CatalogExhausted {
            requested: 50,
            available: 20
        })
    );
    handle.shutdown().await.unwrap();
    assert_eq!(
        handle.send(Command::Start).await,
        Err(DriverError::Closed)
    );
}
