//! Shattered Colony - headless driver
//!
//! Runs the simulation core from the terminal. With `--ticks` it plays a
//! fixed number of frames and prints a JSON summary; otherwise it drops
//! into a small command loop for poking at a live colony.

use std::io::{self, Write};
use std::path::PathBuf;

use clap::Parser;
use serde::Serialize;

use shattered_colony::core::error::Result;
use shattered_colony::core::types::{GridPosition, StructureId};
use shattered_colony::simulation::{Command, Simulation, TimeSpeed};
use shattered_colony::{BalanceConfig, LevelKind, ResourceKind, StructureType};

/// Wall-clock seconds per frame
const FRAME: f32 = 0.1;

/// Shattered Colony - deterministic colony-defense simulation
#[derive(Parser, Debug)]
#[command(name = "shattered-colony")]
#[command(about = "Run the colony-defense simulation core headless")]
struct Args {
    /// Random seed for deterministic runs
    #[arg(long, default_value_t = 1)]
    seed: u64,

    /// Balance file (TOML); missing keys keep their defaults
    #[arg(long)]
    config: Option<PathBuf>,

    /// Level to load: standard, empty or blank
    #[arg(long, default_value = "standard")]
    level: String,

    /// Run this many frames, print a JSON summary and exit
    #[arg(long)]
    ticks: Option<u32>,
}

#[derive(Serialize)]
struct Summary {
    seed: u64,
    tick: u64,
    elapsed: f32,
    outcome: Option<&'static str>,
    structures: usize,
    couriers: usize,
    civilians: usize,
    hostiles: usize,
    holdings: shattered_colony::Resources,
}

impl Summary {
    fn of(sim: &Simulation, seed: u64) -> Self {
        Self {
            seed,
            tick: sim.tick,
            elapsed: sim.elapsed,
            outcome: sim.outcome.map(|v| if v { "victory" } else { "defeat" }),
            structures: sim.structures.len(),
            couriers: sim.couriers.len(),
            civilians: sim.civilians.len(),
            hostiles: sim.hostiles.len(),
            holdings: sim.colony_holdings(),
        }
    }
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("shattered_colony=info")),
        )
        .with_writer(io::stderr)
        .init();

    let args = Args::parse();
    let config = match &args.config {
        Some(path) => BalanceConfig::load(path)?,
        None => BalanceConfig::default(),
    };
    let Some(level) = LevelKind::parse(&args.level) else {
        eprintln!("Unknown level '{}'", args.level);
        std::process::exit(2);
    };

    tracing::info!("Shattered Colony starting (seed {}, level {:?})", args.seed, level);
    let mut sim = Simulation::from_level(level, config, args.seed);

    if let Some(frames) = args.ticks {
        for _ in 0..frames {
            sim.update(FRAME);
            if sim.is_over() {
                break;
            }
        }
        println!("{}", serde_json::to_string_pretty(&Summary::of(&sim, args.seed))?);
        return Ok(());
    }

    println!("\n=== SHATTERED COLONY ===");
    println!("Commands:");
    println!("  tick / t                     - Advance one frame");
    println!("  run <n>                      - Advance n frames");
    println!("  place <kind> <x> <y>         - Build depot/workshop/outpost/wall");
    println!("  quota <id> <resource> <+/-n> - Adjust a quota");
    println!("  retreat <id>                 - Empty and remove a structure");
    println!("  speed <0|1|2|4|10>           - Set time speed");
    println!("  status / s                   - Show structures and units");
    println!("  events / e                   - Print buffered events as JSON");
    println!("  quit / q                     - Exit");
    println!();

    loop {
        print!("[t{} {:.1}s] > ", sim.tick, sim.elapsed);
        io::stdout().flush()?;

        let mut input = String::new();
        if io::stdin().read_line(&mut input)? == 0 {
            break;
        }
        let words: Vec<&str> = input.split_whitespace().collect();
        let Some((&verb, rest)) = words.split_first() else {
            continue;
        };

        match verb {
            "quit" | "q" => break,
            "tick" | "t" => {
                sim.update(FRAME);
            }
            "run" => match rest.first().and_then(|n| n.parse::<u32>().ok()) {
                Some(n) => {
                    for _ in 0..n {
                        sim.update(FRAME);
                    }
                    println!("Now at tick {}", sim.tick);
                }
                None => println!("Usage: run <number>"),
            },
            "status" | "s" => display_status(&sim),
            "events" | "e" => {
                for event in sim.drain_events() {
                    println!("{}", serde_json::to_string(&event)?);
                }
            }
            _ => match parse_command(verb, rest) {
                Some(command) => match sim.apply(command) {
                    Ok(outcome) => println!("{:?}", outcome),
                    Err(e) => println!("Rejected: {}", e),
                },
                None => println!("Unknown or malformed command"),
            },
        }

        if let Some(victory) = sim.outcome {
            println!("Game over: {}", if victory { "victory" } else { "defeat" });
        }
    }

    println!("\n{}", serde_json::to_string_pretty(&Summary::of(&sim, args.seed))?);
    Ok(())
}

fn parse_command(verb: &str, rest: &[&str]) -> Option<Command> {
    match (verb, rest) {
        ("place", [kind, x, y]) => Some(Command::PlaceStructure {
            structure: StructureType::parse(kind)?,
            cell: GridPosition::new(x.parse().ok()?, y.parse().ok()?),
        }),
        ("quota", [id, resource, delta]) => Some(Command::AdjustQuota {
            id: StructureId(id.parse().ok()?),
            resource: ResourceKind::parse(resource)?,
            delta: delta.trim_start_matches('+').parse().ok()?,
        }),
        ("retreat", [id]) => Some(Command::Retreat { id: StructureId(id.parse().ok()?) }),
        ("speed", [value]) => Some(Command::SetTimeSpeed { speed: TimeSpeed::from_multiplier(value.parse().ok()?)? }),
        _ => None,
    }
}

fn display_status(sim: &Simulation) {
    println!("--- Structures ---");
    for s in sim.structures.values() {
        println!(
            "  {:>3} {:?} at {}  present {}  quota {}",
            s.id.0,
            s.structure_type(),
            s.cell,
            s.present,
            s.quotas
        );
    }
    println!(
        "--- Units: {} couriers, {} civilians, {} hostiles ---",
        sim.couriers.len(),
        sim.civilians.len(),
        sim.hostiles.len()
    );
    println!("Next wave in {:.0}s, speed {:?}", sim.round_timer, sim.time_speed);
}
