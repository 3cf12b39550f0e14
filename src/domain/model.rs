//! The simulation stepper.
//!
//! The model owns the agent registry and is the only writer of agent poses. Agents are kept in
//! registration order, which is the iteration order of every tick and of every observation pass.

use std::thread;
use std::time::{Duration, Instant};

use thiserror::Error;
use tracing::{debug, trace, warn};

use super::{
    bearing, Agent, FieldOfView, GeometryError, Movement, Observation, PairCache, Polygon,
    Sighting, State, Visibility, WallDistance, WallReading,
};
use crate::config::{ConfigError, ModelConfig};

#[derive(Error, Debug)]
pub enum ModelError {
    #[error("an agent named {0:?} is already registered")]
    DuplicateAgent(String),
    #[error("no agent named {0:?}")]
    UnknownAgent(String),
    #[error("the model must be reset before stepping")]
    NotReset,
    #[error(transparent)]
    InvalidConfig(#[from] ConfigError),
    #[error(transparent)]
    Geometry(#[from] GeometryError),
}

pub struct Model {
    visibility: Visibility,
    config: ModelConfig,
    agents: Vec<(String, Agent)>,
    last_step: Option<Instant>,
    tick: u64,
}

impl Model {
    pub fn new(
        arena: Polygon,
        occlusions: Vec<Polygon>,
        config: ModelConfig,
    ) -> Result<Self, ModelError> {
        config.validate()?;
        Ok(Self {
            visibility: Visibility::new(arena, occlusions),
            config,
            agents: vec![],
            last_step: None,
            tick: 0,
        })
    }

    pub fn arena(&self) -> &Polygon {
        self.visibility.arena()
    }

    pub fn occlusions(&self) -> &[Polygon] {
        self.visibility.occlusions()
    }

    pub fn visibility(&self) -> &Visibility {
        &self.visibility
    }

    pub fn config(&self) -> &ModelConfig {
        &self.config
    }

    /// Number of ticks since the last reset.
    pub fn tick(&self) -> u64 {
        self.tick
    }

    pub fn agents(&self) -> impl Iterator<Item = (&str, &Agent)> + '_ {
        self.agents
            .iter()
            .map(|(name, agent)| (name.as_str(), agent))
    }

    pub fn agent(&self, name: &str) -> Result<&Agent, ModelError> {
        self.index_of(name).map(|idx| &self.agents[idx].1)
    }

    fn index_of(&self, name: &str) -> Result<usize, ModelError> {
        self.agents
            .iter()
            .position(|(n, _)| n == name)
            .ok_or_else(|| ModelError::UnknownAgent(name.to_string()))
    }

    pub fn add_agent(&mut self, name: impl Into<String>, agent: Agent) -> Result<(), ModelError> {
        let name = name.into();
        if self.agents.iter().any(|(n, _)| *n == name) {
            return Err(ModelError::DuplicateAgent(name));
        }
        debug!(agent = %name, state = ?agent.state(), "agent registered");
        self.agents.push((name, agent));
        Ok(())
    }

    pub fn remove_agent(&mut self, name: &str) -> Result<Agent, ModelError> {
        let idx = self.index_of(name)?;
        let (name, agent) = self.agents.remove(idx);
        debug!(agent = %name, "agent removed");
        Ok(agent)
    }

    /// Puts every agent back into its initial condition and restarts the tick clock.
    pub fn reset(&mut self) {
        for (_, agent) in &mut self.agents {
            agent.reset();
        }
        // Warm-up pass, its result is not needed.
        let _ = self.observations();
        for (_, agent) in &mut self.agents {
            agent.start();
        }
        self.tick = 0;
        self.last_step = Some(Instant::now());
        debug!(agents = self.agents.len(), "model reset");
    }

    /// Advances the simulation by one time step.
    pub fn step(&mut self) -> Result<(), ModelError> {
        let last_step = self.last_step.ok_or(ModelError::NotReset)?;
        if self.config.real_time {
            self.wait_for_tick(last_step);
        }
        self.last_step = Some(Instant::now());

        let delta_t = self.config.time_step;
        for idx in 0..self.agents.len() {
            let movement = self.agents[idx].1.change(delta_t);
            let next = self.arbitrate(&self.agents[idx].1, movement);
            self.agents[idx].1.set_state(next);
        }
        for (_, agent) in &mut self.agents {
            agent.step(delta_t);
        }

        self.tick += 1;
        trace!(tick = self.tick, agents = self.agents.len(), "step");
        Ok(())
    }

    fn wait_for_tick(&self, last_step: Instant) {
        let deadline = last_step + Duration::from_secs_f64(self.config.time_step);
        let now = Instant::now();
        match deadline.checked_duration_since(now) {
            Some(remaining) => thread::sleep(remaining),
            None => warn!(
                tick = self.tick,
                lag_ms = now.duration_since(deadline).as_secs_f64() * 1000.0,
                "tick overran its time step"
            ),
        }
    }

    /// First legal pose among the full move, the rotation alone and the distance alone. The agent
    /// keeps its pose if none is legal.
    fn arbitrate(&self, agent: &Agent, movement: Movement) -> State {
        let current = *agent.state();
        if !agent.collision() {
            return current.apply(movement);
        }
        let candidates = [
            movement,
            Movement::new(0.0, movement.rotation),
            Movement::new(movement.distance, 0.0),
        ];
        candidates
            .into_iter()
            .map(|candidate| current.apply(candidate))
            .find(|state| self.is_valid_state(&agent.polygon_at(state), true))
            .unwrap_or(current)
    }

    /// The arena must always contain the footprint; occlusions are only checked with `collisions`.
    pub fn is_valid_state(&self, footprint: &Polygon, collisions: bool) -> bool {
        self.arena().contains(footprint)
            && !(collisions
                && self
                    .occlusions()
                    .iter()
                    .any(|occlusion| occlusion.intersects(footprint)))
    }

    fn wall_readings(&self, src: State, ranked: &[WallDistance]) -> Vec<WallReading> {
        ranked
            .iter()
            .map(|w| WallReading {
                distance: w.distance,
                bearing: bearing(src.location, self.visibility.walls()[w.index].centroid),
            })
            .collect()
    }

    fn sighting(&self, idx: usize, visible: bool) -> (String, Sighting) {
        let (name, agent) = &self.agents[idx];
        let sighting = if visible {
            Sighting::Visible(*agent.state())
        } else {
            Sighting::Hidden
        };
        (name.clone(), sighting)
    }

    /// Observations of every agent, in registration order. Line of sight is evaluated once per
    /// pair of agents.
    pub fn observations(&self) -> Vec<(String, Observation)> {
        let ranked = self
            .agents
            .iter()
            .map(|(_, agent)| self.visibility.walls_by_distance(agent.state().location))
            .collect::<Vec<_>>();
        let mut cache = PairCache::new();

        self.agents
            .iter()
            .enumerate()
            .map(|(src, (name, agent))| {
                let location = agent.state().location;
                let agent_states = (0..self.agents.len())
                    .map(|dst| {
                        let visible = src == dst
                            || cache.get_or_insert_with(src, dst, || {
                                self.visibility.line_of_sight(
                                    location,
                                    self.agents[dst].1.state().location,
                                    Some(&ranked[src]),
                                )
                            });
                        self.sighting(dst, visible)
                    })
                    .collect();
                let observation = Observation {
                    walls: self.wall_readings(*agent.state(), &ranked[src]),
                    agent_states,
                };
                (name.clone(), observation)
            })
            .collect()
    }

    /// Observation of a single agent.
    ///
    /// With `polygonal`, another agent is visible when its footprint intersects the region visible
    /// from the observer, restricted to the configured field of view around the observer's heading.
    pub fn observation(&self, name: &str, polygonal: bool) -> Result<Observation, ModelError> {
        let src = self.index_of(name)?;
        let state = *self.agents[src].1.state();
        let ranked = self.visibility.walls_by_distance(state.location);
        let region = if polygonal {
            let field_of_view = FieldOfView {
                direction: state.direction,
                aperture: self.config.field_of_view.unwrap_or(360.0),
            };
            Some(
                self.visibility
                    .visibility_polygon(state.location, Some(field_of_view))?,
            )
        } else {
            None
        };

        let agent_states = self
            .agents
            .iter()
            .enumerate()
            .map(|(dst, (_, agent))| {
                let visible = src == dst
                    || match &region {
                        Some(region) => agent.polygon().intersects(region),
                        None => self.visibility.line_of_sight(
                            state.location,
                            agent.state().location,
                            Some(&ranked),
                        ),
                    };
                self.sighting(dst, visible)
            })
            .collect();

        Ok(Observation {
            walls: self.wall_readings(state, &ranked),
            agent_states,
        })
    }
}
