//! RAIZ Demo - Watch TRONs live and die in real time
//!
//! Drives a `RaizSystem` against the wall clock and prints periodic
//! snapshots. Commands typed on stdin act on the running system.

mod command;
mod render;

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use clap::Parser;
use parking_lot::Mutex;
use raiz_core::{RandomSource, SeededRandom, SimTime};
use raiz_runtime::{logging, RaizSystem, SystemConfig};
use raiz_time::Pacer;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::mpsc;
use tracing::{info, warn};

use crate::command::{Command, HELP};

#[derive(Parser)]
#[command(name = "raiz-demo")]
#[command(about = "Ephemeral TRON substrate simulation", long_about = None)]
struct Args {
    /// TOML configuration file (defaults are used when omitted)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Stop after this many simulated seconds (runs until `quit` otherwise)
    #[arg(long)]
    seconds: Option<u64>,

    /// Seed for reproducible runs
    #[arg(long)]
    seed: Option<u64>,

    /// Emit logs as JSON
    #[arg(long)]
    json_logs: bool,

    /// Enable auto-spawn with this interval (e.g. "2s")
    #[arg(long, value_parser = humantime::parse_duration)]
    spawn_every: Option<Duration>,

    /// Snapshot print interval
    #[arg(long, value_parser = humantime::parse_duration, default_value = "5s")]
    status_every: Duration,

    /// Playback rate (2.0 runs twice as fast as real time)
    #[arg(long, default_value = "1.0")]
    rate: f64,
}

/// Events from the stdin task to the driver loop
enum Signal {
    /// The schedule may have changed
    Wake,
    Quit,
}

type Shared = Arc<Mutex<RaizSystem>>;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    if args.json_logs {
        logging::init_json();
    } else {
        logging::init();
    }

    let mut config = match &args.config {
        Some(path) => SystemConfig::from_file(path)
            .with_context(|| format!("loading config from {}", path.display()))?,
        None => SystemConfig::default(),
    };
    if let Some(every) = args.spawn_every {
        config.auto_spawn.enabled = true;
        config.auto_spawn.interval = every;
    }

    let random: Box<dyn RandomSource + Send> = match args.seed {
        Some(seed) => Box::new(SeededRandom::new(seed)),
        None => Box::new(SeededRandom::from_entropy()),
    };
    let mut system = RaizSystem::with_random(config, random).context("building system")?;
    system.start();
    info!(nodes = system.nodes().len(), seed = ?args.seed, "RAIZ demo started");
    println!("{HELP}");

    let system: Shared = Arc::new(Mutex::new(system));
    let pacer = Pacer::new(SimTime::ZERO).with_rate(args.rate);
    let (tx, rx) = mpsc::unbounded_channel();
    tokio::spawn(read_commands(system.clone(), pacer, tx));

    drive(system, pacer, rx, &args).await;
    Ok(())
}

/// Advance virtual time with the wall clock until quit or the time limit
async fn drive(system: Shared, pacer: Pacer, mut rx: mpsc::UnboundedReceiver<Signal>, args: &Args) {
    let end = args.seconds.map(SimTime::from_secs);
    let mut next_status = SimTime::ZERO + args.status_every;
    let mut stdin_open = true;

    loop {
        let mut wake = system.lock().next_deadline().map_or(next_status, |d| d.min(next_status));
        if let Some(end) = end {
            wake = wake.min(end);
        }

        tokio::select! {
            _ = tokio::time::sleep_until(pacer.instant_for(wake).into()) => {}
            signal = rx.recv(), if stdin_open => match signal {
                Some(Signal::Wake) => {}
                Some(Signal::Quit) => break,
                None => stdin_open = false,
            },
        }

        let now = pacer.sim_now();
        let mut sys = system.lock();
        sys.run_until(now);
        if now >= next_status {
            print!("{}", render::snapshot(&sys.snapshot()));
            next_status = now + args.status_every;
        }
        if end.is_some_and(|end| now >= end) {
            print!("{}", render::snapshot(&sys.snapshot()));
            break;
        }
    }
    info!(at = %pacer.sim_now(), "RAIZ demo finished");
}

/// Apply stdin commands to the shared system
async fn read_commands(system: Shared, pacer: Pacer, tx: mpsc::UnboundedSender<Signal>) {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    loop {
        let line = match lines.next_line().await {
            Ok(Some(line)) => line,
            Ok(None) => break,
            Err(err) => {
                warn!(%err, "stdin closed");
                break;
            }
        };
        if line.trim().is_empty() {
            continue;
        }

        let command = match line.parse::<Command>() {
            Ok(command) => command,
            Err(err) => {
                println!("{err} (try `help`)");
                continue;
            }
        };
        if command == Command::Quit {
            let _ = tx.send(Signal::Quit);
            return;
        }

        {
            let mut sys = system.lock();
            // Catch up so the command lands at the right virtual time
            sys.run_until(pacer.sim_now());
            apply(&mut sys, command);
        }
        if tx.send(Signal::Wake).is_err() {
            return;
        }
    }
}

fn apply(sys: &mut RaizSystem, command: Command) {
    match command {
        Command::Spawn(n) => {
            for _ in 0..n {
                match sys.spawn_tron() {
                    Ok(id) => println!("spawned {id}"),
                    Err(err) => {
                        println!("{err}");
                        break;
                    }
                }
            }
        }
        Command::Kill => println!("apoptosis forced on {} TRONs", sys.force_apoptosis()),
        Command::Reset => {
            sys.reset();
            println!("system reset (use `start` to resume)");
        }
        Command::Start => sys.start(),
        Command::Stop => sys.stop(),
        Command::Status => print!("{}", render::snapshot(&sys.snapshot())),
        Command::Json => match sys.snapshot().to_json() {
            Ok(json) => println!("{json}"),
            Err(err) => warn!(%err, "snapshot serialization failed"),
        },
        Command::Toggle(channel) => {
            let gateway = sys.gateway_mut();
            let active = !gateway.is_active(channel);
            gateway.set_active(channel, active);
            println!("{channel} {}", if active { "on" } else { "off" });
        }
        Command::Help => println!("{HELP}"),
        Command::Quit => {}
    }
}
