#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Command-line adapter that runs a LionEngine scenario headless and prints
//! what happened.

mod scenario;
mod simulation;

use std::{cell::RefCell, collections::BTreeMap, fs, path::PathBuf, rc::Rc};

use anyhow::{ensure, Context, Result};
use clap::Parser;
use lionengine_core::Event;
use lionengine_world::query;
use log::{debug, info, warn};

use crate::{scenario::Scenario, simulation::Simulation};

/// Headless LionEngine simulator.
#[derive(Parser)]
#[command(version, about = "Runs a LionEngine scenario without rendering.")]
struct Cli {
    /// Scenario definition to load.
    #[arg(long, value_name = "PATH")]
    scenario: PathBuf,

    /// Number of ticks to simulate.
    #[arg(long, default_value_t = 240)]
    ticks: u64,

    /// Extrapolation factor applied to every update.
    #[arg(long, default_value_t = 1.0)]
    extrp: f64,

    /// Seed for weapon damages.
    #[arg(long, default_value_t = 0)]
    seed: u64,
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();
    ensure!(
        cli.extrp.is_finite() && cli.extrp > 0.0,
        "extrapolation must be a positive number, got {}",
        cli.extrp
    );

    let text = fs::read_to_string(&cli.scenario)
        .with_context(|| format!("could not read {}", cli.scenario.display()))?;
    let scenario = Scenario::from_toml_str(&text)
        .with_context(|| format!("could not parse {}", cli.scenario.display()))?;

    let mut simulation = Simulation::new(&scenario, cli.seed)?;
    let tally = Rc::new(RefCell::new(BTreeMap::<&'static str, u64>::new()));
    simulation.subscribe(log_event);
    let counter = Rc::clone(&tally);
    simulation.subscribe(move |event: &Event| {
        *counter.borrow_mut().entry(event_name(event)).or_default() += 1;
    });

    info!("running {} ticks", cli.ticks);
    simulation.run(cli.ticks, cli.extrp);

    println!("simulated {} ticks", simulation.now());
    println!("events:");
    for (name, count) in tally.borrow().iter() {
        println!("  {name:<24} {count}");
    }
    println!("entities:");
    for entity in query::entities(simulation.world()) {
        let kind = query::kind_name(simulation.world(), entity.kind()).unwrap_or("?");
        let owner = entity
            .owner()
            .map_or_else(|| "-".to_owned(), |owner| owner.get().to_string());
        println!(
            "  #{:<3} {kind:<10} owner {owner:<2} life {:<4} at {:?}",
            entity.id().get(),
            entity.life(),
            entity.footprint().origin()
        );
    }
    println!("bodies:");
    for body in simulation.bodies() {
        let position = body.position();
        println!(
            "  {:<10} ({:.1}, {:.1}){}",
            body.name(),
            position.x,
            position.y,
            if body.grounded() { " grounded" } else { "" }
        );
    }

    Ok(())
}

fn log_event(event: &Event) {
    match event {
        Event::TilePlacementRejected { coord, reason } => {
            warn!("tile at {coord:?} rejected: {reason:?}");
        }
        Event::ProductionBlocked { .. } | Event::ProductionSkipped { .. } => info!("{event:?}"),
        Event::ProductionCompleted { entity, .. } => info!("entity {} produced", entity.get()),
        Event::AttackEnded {
            attacker,
            target,
            damages,
        } => info!(
            "entity {} hits {} for {damages}",
            attacker.get(),
            target.get()
        ),
        _ => debug!("{event:?}"),
    }
}

fn event_name(event: &Event) -> &'static str {
    match event {
        Event::TilePlaced { .. } => "tile-placed",
        Event::TileRemoved { .. } => "tile-removed",
        Event::TilePlacementRejected { .. } => "tile-rejected",
        Event::ProductionBlocked { .. } => "production-blocked",
        Event::ProductionStarted { .. } => "production-started",
        Event::ProductionProgress { .. } => "production-progress",
        Event::ProductionCompleted { .. } => "production-completed",
        Event::ProductionSkipped { .. } => "production-skipped",
        Event::ReachingTarget { .. } => "reaching-target",
        Event::AttackStarted { .. } => "attack-started",
        Event::PreparingAttack { .. } => "preparing-attack",
        Event::AttackEnded { .. } => "attack-ended",
        Event::AttackAnimEnded { .. } => "attack-anim-ended",
    }
}
