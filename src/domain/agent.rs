//! Mobile agent with a kinematic pose, a pluggable dynamics policy and a polygonal footprint.

use std::fmt;

use nalgebra::{Isometry2, Point2, Vector2};
use serde::{Deserialize, Serialize};

use super::{make_regular_polygon, normalize_deg, Angle, GeometryError, Polygon, Position};

/// Pose of an agent. `direction` is the heading in degrees, `[-180, 180)`.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct State {
    pub location: Position,
    pub direction: f64,
}

impl State {
    pub fn new(location: Position, direction: f64) -> Self {
        Self {
            location,
            direction: normalize_deg(direction),
        }
    }

    /// Turn by `rotation` degrees first, then travel `distance` along the new heading.
    pub fn update(&self, rotation: f64, distance: f64) -> State {
        let direction = normalize_deg(self.direction + rotation);
        State {
            location: self
                .location
                .moved(distance, Angle::from_deg(direction)),
            direction,
        }
    }

    pub fn apply(&self, movement: Movement) -> State {
        self.update(movement.rotation, movement.distance)
    }
}

/// Requested change of pose for one tick.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Movement {
    pub distance: f64,
    pub rotation: f64,
}

impl Movement {
    pub const NONE: Movement = Movement::new(0.0, 0.0);

    pub const fn new(distance: f64, rotation: f64) -> Self {
        Self { distance, rotation }
    }
}

/// Motion policy of an agent.
///
/// Implementations must only depend on the elapsed time and their own internal state; the pose of
/// the agent is owned by the simulation model.
pub trait Dynamics {
    fn change(&mut self, delta_t: f64) -> Movement;

    /// Return to the initial condition.
    fn reset(&mut self) {}

    /// Called once after the warm-up observation pass of a reset.
    fn start(&mut self) {}

    /// Called after every agent's pose of the current tick has been committed.
    fn step(&mut self, _delta_t: f64) {}
}

/// Footprint shape in the agent's local frame: origin at the agent's location, facing along the
/// positive x-axis.
#[derive(Clone, Debug, PartialEq)]
pub struct Footprint {
    local: Vec<Point2<f64>>,
}

impl Footprint {
    pub fn new(vertices: Vec<Position>) -> Result<Self, GeometryError> {
        let polygon = Polygon::new(vertices)?;
        Ok(Self {
            local: polygon
                .vertices()
                .iter()
                .map(|v| Point2::new(v.x(), v.y()))
                .collect(),
        })
    }

    pub fn regular(size: f64, sides: usize) -> Result<Self, GeometryError> {
        let polygon = make_regular_polygon(Position::default(), size, 0.0, sides)?;
        Self::new(polygon.vertices().to_vec())
    }

    /// Footprint polygon the agent would occupy in `state`.
    pub fn at(&self, state: &State) -> Polygon {
        let isometry = Isometry2::new(
            Vector2::new(state.location.x(), state.location.y()),
            state.direction.to_radians(),
        );
        Polygon::new_unchecked(
            self.local
                .iter()
                .map(|p| {
                    let world = isometry.transform_point(p);
                    Position::new(world.x, world.y)
                })
                .collect(),
        )
    }
}

pub struct Agent {
    state: State,
    initial_state: State,
    dynamics: Box<dyn Dynamics>,
    footprint: Footprint,
    collision: bool,
}

impl Agent {
    pub fn new(initial_state: State, footprint: Footprint, dynamics: Box<dyn Dynamics>) -> Self {
        Self {
            state: initial_state,
            initial_state,
            dynamics,
            footprint,
            collision: true,
        }
    }

    pub fn with_collision(self, collision: bool) -> Self {
        Self { collision, ..self }
    }

    pub fn state(&self) -> &State {
        &self.state
    }

    pub fn initial_state(&self) -> &State {
        &self.initial_state
    }

    /// Takes effect on the next reset.
    pub fn set_initial_state(&mut self, state: State) {
        self.initial_state = state;
    }

    pub fn collision(&self) -> bool {
        self.collision
    }

    pub fn footprint(&self) -> &Footprint {
        &self.footprint
    }

    /// Footprint polygon at a hypothetical state. Does not touch the agent's own state.
    pub fn polygon_at(&self, state: &State) -> Polygon {
        self.footprint.at(state)
    }

    pub fn polygon(&self) -> Polygon {
        self.footprint.at(&self.state)
    }

    pub(crate) fn set_state(&mut self, state: State) {
        self.state = state;
    }

    pub(crate) fn change(&mut self, delta_t: f64) -> Movement {
        self.dynamics.change(delta_t)
    }

    pub(crate) fn reset(&mut self) {
        self.state = self.initial_state;
        self.dynamics.reset();
    }

    pub(crate) fn start(&mut self) {
        self.dynamics.start();
    }

    pub(crate) fn step(&mut self, delta_t: f64) {
        self.dynamics.step(delta_t);
    }
}

impl fmt::Debug for Agent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Agent")
            .field("state", &self.state)
            .field("initial_state", &self.initial_state)
            .field("footprint", &self.footprint)
            .field("collision", &self.collision)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use approx::assert_abs_diff_eq;
    use pretty_assertions::assert_eq;
    use rstest::rstest;

    use super::*;
    use crate::domain::Idle;

    const EPSILON: f64 = 1e-12;

    #[rstest]
    #[case::forward(0.0, 0.0, 1.0, (1.0, 0.0), 0.0)]
    #[case::turn_then_move(0.0, 90.0, 2.0, (0.0, 2.0), 90.0)]
    #[case::turn_only(45.0, 45.0, 0.0, (0.0, 0.0), 90.0)]
    #[case::wrap_around(170.0, 20.0, 0.0, (0.0, 0.0), -170.0)]
    #[case::backwards(180.0, 0.0, 1.0, (-1.0, 0.0), -180.0)]
    fn test_state_update(
        #[case] direction: f64,
        #[case] rotation: f64,
        #[case] distance: f64,
        #[case] location: (f64, f64),
        #[case] expected_direction: f64,
    ) {
        let state = State::new(Position::new(0.0, 0.0), direction).update(rotation, distance);
        assert_abs_diff_eq!(state.location.x(), location.0, epsilon = EPSILON);
        assert_abs_diff_eq!(state.location.y(), location.1, epsilon = EPSILON);
        assert_abs_diff_eq!(state.direction, expected_direction, epsilon = EPSILON);
    }

    #[rstest]
    #[case(0.0, Position::new(3.0, 2.0))]
    #[case(90.0, Position::new(2.0, 3.0))]
    #[case(-90.0, Position::new(2.0, 1.0))]
    fn test_footprint_follows_pose(#[case] direction: f64, #[case] nose: Position) {
        let footprint = Footprint::new(vec![
            Position::new(1.0, 0.0),
            Position::new(-0.5, 0.5),
            Position::new(-0.5, -0.5),
        ])
        .unwrap();
        let polygon = footprint.at(&State::new(Position::new(2.0, 2.0), direction));
        assert_abs_diff_eq!(polygon.vertices()[0].x(), nose.x(), epsilon = EPSILON);
        assert_abs_diff_eq!(polygon.vertices()[0].y(), nose.y(), epsilon = EPSILON);
        assert_abs_diff_eq!(polygon.area(), 0.75, epsilon = EPSILON);
    }

    #[test]
    fn test_footprint_rejects_degenerate_shape() {
        assert_eq!(
            Footprint::new(vec![
                Position::new(0.0, 0.0),
                Position::new(1.0, 0.0),
                Position::new(2.0, 0.0),
            ]),
            Err(GeometryError::Degenerate)
        );
    }

    #[test]
    fn test_agent_polygon_at_does_not_mutate_state() {
        let start = State::new(Position::new(1.0, 1.0), 0.0);
        let agent = Agent::new(
            start,
            Footprint::regular(0.5, 6).unwrap(),
            Box::new(Idle),
        );
        let moved = agent.polygon_at(&start.update(0.0, 3.0));
        assert_abs_diff_eq!(moved.centroid().x(), 4.0, epsilon = EPSILON);
        assert_eq!(agent.state(), &start);
    }

    #[test]
    fn test_agent_reset_restores_initial_state() {
        let start = State::new(Position::new(1.0, 1.0), 30.0);
        let mut agent = Agent::new(
            start,
            Footprint::regular(0.5, 6).unwrap(),
            Box::new(Idle),
        )
        .with_collision(false);
        agent.set_state(start.update(10.0, 1.0));
        assert_ne!(agent.state(), &start);
        agent.reset();
        assert_eq!(agent.state(), &start);
        assert!(!agent.collision());
    }
}
