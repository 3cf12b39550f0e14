use std::path::PathBuf;

use anyhow::Context;
use clap::Parser;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

use cellworld_sim::config::ModelConfig;
use cellworld_sim::domain::{Agent, Footprint, Position, RandomWalk, State};
use cellworld_sim::world::{Hexagon, ShapeSpec, WorldData};

#[derive(Parser)]
#[command(name = "cellworld-sim", about = "Headless agent simulation in a polygonal arena")]
struct Cli {
    /// World file (JSON); a built-in hexagonal world is used if omitted
    #[arg(short, long)]
    world: Option<PathBuf>,

    /// Number of ticks to simulate
    #[arg(short, long, default_value = "100")]
    ticks: u64,

    /// RNG seed for spawn headings and agent dynamics
    #[arg(short, long, default_value = "42")]
    seed: u64,

    /// Number of random-walking agents
    #[arg(short, long, default_value = "3")]
    agents: usize,

    /// Seconds per tick
    #[arg(long, default_value = "0.1")]
    time_step: f64,

    /// Pace ticks to wall-clock time
    #[arg(long)]
    real_time: bool,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,
}

/// Hexagonal arena of radius 10 with an occlusion in its center.
fn demo_world() -> WorldData {
    let hexagon = |size| ShapeSpec::Hexagon {
        hexagon: Hexagon {
            center: Position::default(),
            size,
            rotation: 0.0,
        },
    };
    WorldData {
        arena: hexagon(10.0),
        occlusions: vec![hexagon(2.0)],
        cell_shape: None,
        cells: vec![],
        paths: None,
        adjacency: None,
        cell_visibility: vec![],
        cell_groups: Default::default(),
    }
}

/// Spawn group of the world, falling back to every open cell and then to a ring around the arena
/// center.
fn spawn_locations(world: &WorldData, count: usize) -> anyhow::Result<Vec<Position>> {
    if world.cell_groups.contains_key("spawn_locations") {
        return Ok(world.cell_group_locations("spawn_locations")?);
    }
    let open = world.open_locations();
    if !open.is_empty() {
        return Ok(open);
    }
    let arena = world.arena()?;
    let center = arena.centroid();
    let radius = arena
        .vertices()
        .iter()
        .map(|v| v.distance(center))
        .fold(f64::INFINITY, f64::min)
        * 0.6;
    Ok((0..count.max(1))
        .map(|i| {
            let angle = 360.0 * i as f64 / count.max(1) as f64 + 30.0;
            Position::new(
                center.x() + radius * angle.to_radians().cos(),
                center.y() + radius * angle.to_radians().sin(),
            )
        })
        .collect())
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let filter = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(filter))
        .init();

    let world = match &cli.world {
        Some(path) => WorldData::load(path)
            .with_context(|| format!("loading world {}", path.display()))?,
        None => demo_world(),
    };
    let config = ModelConfig {
        real_time: cli.real_time,
        time_step: cli.time_step,
        field_of_view: None,
    };
    let mut model = world.model(config)?;

    let spawns = spawn_locations(&world, cli.agents)?;
    anyhow::ensure!(!spawns.is_empty(), "world has no spawn locations");
    let footprint_size = world.cell_shape.map_or(0.3, |shape| shape.size * 0.5);
    let mut rng = ChaCha8Rng::seed_from_u64(cli.seed);
    for idx in 0..cli.agents {
        let location = spawns[rng.random_range(0..spawns.len())];
        let state = State::new(location, rng.random_range(-180.0..180.0));
        let dynamics = RandomWalk::new(rng.random(), footprint_size * 10.0, 90.0);
        let agent = Agent::new(
            state,
            Footprint::regular(footprint_size, 6)?,
            Box::new(dynamics),
        );
        model.add_agent(format!("agent-{idx}"), agent)?;
    }

    info!(
        agents = cli.agents,
        ticks = cli.ticks,
        seed = cli.seed,
        "starting simulation"
    );
    model.reset();
    for _ in 0..cli.ticks {
        model.step()?;
        for (name, agent) in model.agents() {
            debug!(tick = model.tick(), agent = name, state = ?agent.state());
        }
    }

    let observations = model.observations();
    for (name, observation) in &observations {
        info!(
            agent = %name,
            visible = observation.visible_agents().count() - 1,
            "final observation"
        );
    }
    println!("{}", serde_json::to_string_pretty(&observations)?);
    Ok(())
}
