use anyhow::Result;
use colored::Colorize;
use serde::Serialize;
use std::io::Write;
use std::time::Duration;

use derby_game::{Horse, RaceSnapshot, RoundResult, lap_label, ordinal_suffix};

/// Serialized shape of a finished (or abandoned) race.
#[derive(Debug, Serialize)]
struct RaceReport<'a> {
    seed: u64,
    status: &'a str,
    horses: &'a [Horse],
    program: Vec<ProgramRound>,
    results: &'a [RoundResult],
}

#[derive(Debug, Serialize)]
struct ProgramRound {
    lap: String,
    distance: u32,
    lanes: Vec<ProgramLane>,
}

#[derive(Debug, Serialize)]
struct ProgramLane {
    lane: usize,
    horse_id: u32,
    name: String,
}

fn program(snapshot: &RaceSnapshot) -> Vec<ProgramRound> {
    snapshot
        .rounds
        .iter()
        .enumerate()
        .map(|(index, round)| ProgramRound {
            lap: lap_label(index, round.distance),
            distance: round.distance,
            lanes: round
                .horses
                .iter()
                .enumerate()
                .map(|(lane, entrant)| ProgramLane {
                    lane: lane + 1,
                    horse_id: entrant.horse.id,
                    name: entrant.horse.name.clone(),
                })
                .collect(),
        })
        .collect()
}

fn seconds(finish_time: Option<u64>) -> String {
    finish_time.map_or_else(
        || "-".to_string(),
        |ms| format!("{:.1}s", Duration::from_millis(ms).as_secs_f64()),
    )
}

pub fn generate_console_report<W: Write>(
    out: &mut W,
    snapshot: &RaceSnapshot,
    elapsed: Duration,
) -> Result<()> {
    writeln!(out)?;
    writeln!(out, "{}", "🐎 Horse List".bright_cyan().bold())?;
    writeln!(out, "{}", "=============".cyan())?;
    for horse in &snapshot.roster {
        writeln!(
            out,
            "  {:>2}  {:<12} condition {:>3}  {}",
            horse.id, horse.name, horse.condition, horse.color
        )?;
    }
    writeln!(out)?;

    writeln!(out, "{}", "📋 Program".bright_yellow().bold())?;
    writeln!(out, "{}", "==========".yellow())?;
    for round in program(snapshot) {
        writeln!(out, "{}", round.lap.bold())?;
        for lane in &round.lanes {
            writeln!(out, "  {:>2}  {}", lane.lane, lane.name)?;
        }
    }
    writeln!(out)?;

    writeln!(out, "{}", "🏆 Results".bright_green().bold())?;
    writeln!(out, "{}", "==========".green())?;
    if snapshot.round_results.is_empty() {
        writeln!(out, "No rounds completed.")?;
    }
    for result in &snapshot.round_results {
        writeln!(
            out,
            "{}",
            lap_label(result.round_index, result.distance).bold()
        )?;
        for (place, entrant) in result.standings.iter().enumerate() {
            let line = format!(
                "  {:>2}{:<4} {:<12} {:>7}",
                place + 1,
                ordinal_suffix(place + 1),
                entrant.horse.name,
                seconds(entrant.finish_time)
            );
            if place == 0 {
                writeln!(out, "{}", line.green())?;
            } else {
                writeln!(out, "{line}")?;
            }
        }
    }
    writeln!(out)?;
    writeln!(out, "Status: {}", snapshot.status)?;
    writeln!(out, "Race time: {elapsed:?}")?;
    Ok(())
}

pub fn generate_json_report<W: Write>(out: &mut W, snapshot: &RaceSnapshot, seed: u64) -> Result<()> {
    let status = snapshot.status.to_string();
    let report = RaceReport {
        seed,
        status: &status,
        horses: &snapshot.roster,
        program: program(snapshot),
        results: &snapshot.round_results,
    };
    serde_json::to_writer_pretty(&mut *out, &report)?;
    writeln!(out)?;
    Ok(())
}

pub fn generate_markdown_report<W: Write>(
    out: &mut W,
    snapshot: &RaceSnapshot,
    seed: u64,
) -> Result<()> {
    writeln!(out, "# Derby Race Results\n")?;
    writeln!(out, "- **Seed**: {seed}")?;
    writeln!(out, "- **Status**: {}", snapshot.status)?;
    writeln!(
        out,
        "- **Rounds completed**: {}/{}\n",
        snapshot.round_results.len(),
        snapshot.rounds.len()
    )?;

    writeln!(out, "## Horses\n")?;
    writeln!(out, "| # | Name | Condition | Color |")?;
    writeln!(out, "|---|------|-----------|-------|")?;
    for horse in &snapshot.roster {
        writeln!(
            out,
            "| {} | {} | {} | {} |",
            horse.id, horse.name, horse.condition, horse.color
        )?;
    }
    writeln!(out)?;

    writeln!(out, "## Program\n")?;
    for round in program(snapshot) {
        writeln!(out, "### {}\n", round.lap)?;
        let names: Vec<String> = round
            .lanes
            .iter()
            .map(|lane| format!("{}. {}", lane.lane, lane.name))
            .collect();
        writeln!(out, "{}\n", names.join(", "))?;
    }

    writeln!(out, "## Results\n")?;
    for result in &snapshot.round_results {
        writeln!(
            out,
            "### {}\n",
            lap_label(result.round_index, result.distance)
        )?;
        writeln!(out, "| Place | Name | Time |")?;
        writeln!(out, "|-------|------|------|")?;
        for (place, entrant) in result.standings.iter().enumerate() {
            writeln!(
                out,
                "| {}{} | {} | {} |",
                place + 1,
                ordinal_suffix(place + 1),
                entrant.horse.name,
                seconds(entrant.finish_time)
            )?;
        }
        writeln!(out)?;
    }
    Ok(())
}
