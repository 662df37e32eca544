mod live;
mod reports;

use anyhow::{Context, Result, bail};
use clap::{Parser, ValueEnum};
use colored::Colorize;
use log::info;
use std::fs::File;
use std::io::{BufWriter, Write, stdout};
use std::path::PathBuf;
use std::time::Instant;

use derby_game::driver::spawn;
use derby_game::{Command, ManualClock, RaceConfig, RaceEngine, RaceSnapshot, simulate_race};

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum RunMode {
    /// Simulate on virtual time and print the outcome immediately
    Instant,
    /// Play the race on the wall clock with live progress
    Realtime,
}

#[derive(Debug, Parser)]
#[command(name = "derby", version = "0.1.0")]
#[command(about = "Run a multi-round horse race and report the results")]
struct Args {
    /// Run mode: instant (virtual time) or realtime (wall clock)
    #[arg(long, value_enum, default_value_t = RunMode::Instant)]
    mode: RunMode,

    /// Seed for roster conditions, line-ups and strides
    #[arg(long, default_value_t = 1337)]
    seed: u64,

    /// Optional JSON race configuration; flags below override it
    #[arg(long)]
    config: Option<PathBuf>,

    /// Number of horses in the roster
    #[arg(long)]
    roster_size: Option<usize>,

    /// Tick period in milliseconds
    #[arg(long)]
    tick_ms: Option<u64>,

    /// Pause between rounds in milliseconds
    #[arg(long)]
    delay_ms: Option<u64>,

    /// Output report format
    #[arg(long, default_value = "console")]
    #[arg(value_parser = ["json", "markdown", "console"])]
    report: String,

    /// Print race progress to stderr
    #[arg(short, long)]
    verbose: bool,

    /// Optional path to write the report output instead of stdout
    #[arg(long)]
    output: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::init();
    let args = Args::parse();
    let config = load_config(&args)?;

    if args.report == "console" {
        announce_banner();
    }

    let start_time = Instant::now();
    let snapshot = match args.mode {
        RunMode::Instant => run_instant(&args, config)?,
        RunMode::Realtime => run_realtime(&args, config).await?,
    };

    write_reports(&args, &snapshot, start_time)?;

    if !snapshot.is_finished() {
        bail!("race stopped before the last round ({})", snapshot.status);
    }
    Ok(())
}

fn announce_banner() {
    println!("{}", "🏇 Derby Race Runner".bright_cyan().bold());
    println!("{}", "====================".cyan());
}

fn load_config(args: &Args) -> Result<RaceConfig> {
    let mut config = match &args.config {
        Some(path) => {
            let text = std::fs::read_to_string(path)
                .with_context(|| format!("failed to read {}", path.display()))?;
            RaceConfig::from_json(&text)
                .with_context(|| format!("failed to parse {}", path.display()))?
        }
        None => RaceConfig::default(),
    };
    if let Some(roster_size) = args.roster_size {
        config.roster_size = roster_size;
    }
    if let Some(tick_ms) = args.tick_ms {
        config.tick_period_ms = tick_ms;
    }
    if let Some(delay_ms) = args.delay_ms {
        config.round_delay_ms = delay_ms;
    }
    config.validate().context("invalid race configuration")?;
    Ok(config)
}

fn run_instant(args: &Args, config: RaceConfig) -> Result<RaceSnapshot> {
    let mut engine = RaceEngine::with_config(config, args.seed, ManualClock::default())?;
    engine
        .generate_all()
        .context("failed to generate the race")?;
    let report = simulate_race(&mut engine);
    info!(
        "simulated {} ticks over {}ms of race time",
        report.ticks, report.elapsed_ms
    );

    let snapshot = engine.snapshot();
    if args.verbose {
        live::replay(&report.events, &snapshot);
    }
    Ok(snapshot)
}

async fn run_realtime(args: &Args, config: RaceConfig) -> Result<RaceSnapshot> {
    let handle = spawn(config, args.seed)?;
    let events = handle.events();
    handle
        .send(Command::GenerateAll)
        .await
        .context("failed to generate the race")?;

    let progress = args
        .verbose
        .then(|| tokio::spawn(live::follow(events, handle.clone())));

    handle.send(Command::Start).await?;
    let snapshot = handle.wait_until(RaceSnapshot::is_finished).await?;
    if let Some(progress) = progress {
        progress.await.context("progress printer failed")?;
    }
    handle.shutdown().await?;
    Ok(snapshot)
}

fn write_reports(args: &Args, snapshot: &RaceSnapshot, start_time: Instant) -> Result<()> {
    let mut output_target = OutputTarget::new(args.output.clone())?;

    match args.report.as_str() {
        "json" => reports::generate_json_report(&mut output_target, snapshot, args.seed)?,
        "markdown" => reports::generate_markdown_report(&mut output_target, snapshot, args.seed)?,
        _ => reports::generate_console_report(&mut output_target, snapshot, start_time.elapsed())?,
    }

    output_target.flush_inner()?;
    Ok(())
}

enum OutputTarget {
    Stdout(BufWriter<std::io::Stdout>),
    File(BufWriter<File>),
}

impl OutputTarget {
    fn new(path: Option<PathBuf>) -> Result<Self> {
        if let Some(path) = path {
            let file = File::create(&path)
                .with_context(|| format!("failed to create {}", path.display()))?;
            Ok(Self::File(BufWriter::new(file)))
        } else {
            Ok(Self::Stdout(BufWriter::new(stdout())))
        }
    }

    fn writer(&mut self) -> &mut dyn Write {
        match self {
            Self::Stdout(w) => w,
            Self::File(w) => w,
        }
    }

    fn flush_inner(&mut self) -> std::io::Result<()> {
        match self {
            Self::Stdout(w) => w.flush(),
            Self::File(w) => w.flush(),
        }
    }
}

impl Write for OutputTarget {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.writer().write(buf)
    }

    fn flush(&mut self) -> std::io::Result<()> {
        self.flush_inner()
    }
}
