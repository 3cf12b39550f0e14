//! Closed polygons and the predicates collision testing relies on.
//!
//! Boundary semantics are inclusive everywhere: a point on an edge is contained, two polygons
//! touching in a single point or sharing an edge intersect, and a polygon touching the boundary of
//! another one from the inside is still contained in it.

use thiserror::Error;

use super::{LineSegment, Position};

#[derive(Error, Debug, PartialEq)]
pub enum GeometryError {
    #[error("a polygon needs at least 3 vertices, got {0}")]
    TooFewVertices(usize),
    #[error("a regular polygon needs at least 3 sides, got {0}")]
    TooFewSides(usize),
    #[error("polygon vertex {0} is not finite")]
    NonFiniteVertex(usize),
    #[error("polygon has no area")]
    Degenerate,
    #[error("invalid polygon size {0}")]
    InvalidSize(f64),
}

#[derive(Clone, Debug, PartialEq)]
pub struct Polygon {
    vertices: Vec<Position>,
}

impl Polygon {
    /// Closed polygon through `vertices`; the closing edge from the last back to the first vertex is
    /// implied.
    pub fn new(vertices: Vec<Position>) -> Result<Self, GeometryError> {
        if vertices.len() < 3 {
            return Err(GeometryError::TooFewVertices(vertices.len()));
        }
        if let Some(idx) = vertices.iter().position(|v| !v.is_finite()) {
            return Err(GeometryError::NonFiniteVertex(idx));
        }
        let polygon = Self { vertices };
        if polygon.area() <= f64::EPSILON {
            return Err(GeometryError::Degenerate);
        }
        Ok(polygon)
    }

    /// Rigid transforms and ray casts from a valid polygon cannot produce an invalid one.
    pub(crate) fn new_unchecked(vertices: Vec<Position>) -> Self {
        Self { vertices }
    }

    pub fn vertices(&self) -> &[Position] {
        &self.vertices
    }

    pub fn edges(&self) -> impl Iterator<Item = LineSegment> + '_ {
        self.vertices
            .iter()
            .zip(self.vertices.iter().cycle().skip(1))
            .map(|(p1, p2)| LineSegment::new(*p1, *p2))
    }

    /// Shoelace area, independent of the winding order.
    pub fn area(&self) -> f64 {
        self.edges()
            .map(|e| e.p1().cross(e.p2()))
            .sum::<f64>()
            .abs()
            / 2.0
    }

    pub fn centroid(&self) -> Position {
        let sum = self
            .vertices
            .iter()
            .fold(Position::default(), |acc, v| acc + *v);
        sum * (1.0 / self.vertices.len() as f64)
    }

    pub fn on_boundary(&self, position: Position) -> bool {
        self.edges().any(|e| e.contains(position))
    }

    pub fn contains_point(&self, position: Position) -> bool {
        if self.on_boundary(position) {
            return true;
        }
        let mut inside = false;
        for edge in self.edges() {
            let (a, b) = (edge.p1(), edge.p2());
            if (a.y() > position.y()) != (b.y() > position.y()) {
                let x = (b.x() - a.x()) * (position.y() - a.y()) / (b.y() - a.y()) + a.x();
                if position.x() < x {
                    inside = !inside;
                }
            }
        }
        inside
    }

    pub fn intersects(&self, other: &Polygon) -> bool {
        self.edges()
            .any(|e| other.edges().any(|o| e.intersects(&o)))
            || self.contains_point(other.vertices[0])
            || other.contains_point(self.vertices[0])
    }

    pub fn contains(&self, other: &Polygon) -> bool {
        other.vertices.iter().all(|v| self.contains_point(*v))
            && other.edges().all(|o| {
                self.contains_point(o.centroid()) && !self.edges().any(|e| e.crosses(&o))
            })
    }
}

/// Ordered vertices of a regular polygon with circumradius `size`, the first vertex lying at
/// `rotation` degrees from the positive x-axis.
pub fn make_regular_polygon(
    center: Position,
    size: f64,
    rotation: f64,
    sides: usize,
) -> Result<Polygon, GeometryError> {
    if sides < 3 {
        return Err(GeometryError::TooFewSides(sides));
    }
    if !(size.is_finite() && size > 0.0) {
        return Err(GeometryError::InvalidSize(size));
    }
    let step = 360.0 / sides as f64;
    Polygon::new(
        (0..sides)
            .map(|i| {
                let angle = (rotation + step * i as f64).to_radians();
                Position::new(
                    center.x() + size * angle.cos(),
                    center.y() + size * angle.sin(),
                )
            })
            .collect(),
    )
}

pub fn make_hexagon(center: Position, size: f64, rotation: f64) -> Result<Polygon, GeometryError> {
    make_regular_polygon(center, size, rotation, 6)
}
