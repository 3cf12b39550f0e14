//! The domain module encapsulates the core simulation logic. It defines the geometry of the arena
//! and its occlusions, the `Agent` entities moving through it, and the `Model` that arbitrates
//! their movements and assembles what each of them observes.
//!
//! The module has no knowledge of how worlds are stored or how the simulation is driven.

mod agent;
mod basis;
mod dynamics;
mod model;
mod navigation;
mod observation;
mod polygon;
mod visibility;

pub use agent::{Agent, Dynamics, Footprint, Movement, State};
pub use basis::{bearing, normalize_deg, Angle, LineSegment, Position, EPSILON};
pub use dynamics::{Constant, Idle, RandomWalk, Scripted};
pub use model::{Model, ModelError};
pub use navigation::{Navigation, NavigationError};
pub use observation::{Observation, PairCache, Sighting, WallReading};
pub use polygon::{make_hexagon, make_regular_polygon, GeometryError, Polygon};
pub use visibility::{FieldOfView, Visibility, Wall, WallDistance, WallKind};
