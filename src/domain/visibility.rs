//! Occlusion-aware visibility over the arena and occlusion boundaries.
//!
//! Walls are indexed once at construction: the arena edges come first, followed by the edges of
//! every occlusion in order. Indices are stable for the lifetime of the engine.

use super::{bearing, normalize_deg, GeometryError, LineSegment, Polygon, Position, EPSILON};

/// Angular offset (degrees) of the two extra rays cast next to every vertex, so that the region
/// behind a silhouette corner is reached.
const RAY_OFFSET: f64 = 1e-4;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum WallKind {
    Arena,
    Occlusion(usize),
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Wall {
    pub index: usize,
    pub kind: WallKind,
    pub segment: LineSegment,
    pub centroid: Position,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct WallDistance {
    pub index: usize,
    pub segment: LineSegment,
    pub distance: f64,
}

/// Viewing cone: centered on `direction`, `aperture` degrees wide.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct FieldOfView {
    pub direction: f64,
    pub aperture: f64,
}

#[derive(Clone, Debug)]
pub struct Visibility {
    arena: Polygon,
    occlusions: Vec<Polygon>,
    walls: Vec<Wall>,
}

impl Visibility {
    pub fn new(arena: Polygon, occlusions: Vec<Polygon>) -> Self {
        let walls = arena
            .edges()
            .map(|segment| (WallKind::Arena, segment))
            .chain(occlusions.iter().enumerate().flat_map(|(idx, occlusion)| {
                occlusion
                    .edges()
                    .map(move |segment| (WallKind::Occlusion(idx), segment))
            }))
            .enumerate()
            .map(|(index, (kind, segment))| Wall {
                index,
                kind,
                segment,
                centroid: segment.centroid(),
            })
            .collect();
        Self {
            arena,
            occlusions,
            walls,
        }
    }

    pub fn arena(&self) -> &Polygon {
        &self.arena
    }

    pub fn occlusions(&self) -> &[Polygon] {
        &self.occlusions
    }

    pub fn walls(&self) -> &[Wall] {
        &self.walls
    }

    pub fn wall(&self, index: usize) -> Option<&Wall> {
        self.walls.get(index)
    }

    /// All walls ranked by their distance from `src`, ties broken by ascending wall index.
    pub fn walls_by_distance(&self, src: Position) -> Vec<WallDistance> {
        let mut ranked = self
            .walls
            .iter()
            .map(|w| WallDistance {
                index: w.index,
                segment: w.segment,
                distance: w.segment.distance_to(src),
            })
            .collect::<Vec<_>>();
        ranked.sort_by(|a, b| {
            a.distance
                .total_cmp(&b.distance)
                .then(a.index.cmp(&b.index))
        });
        ranked
    }

    /// Whether the segment from `src` to `dst` is unobstructed.
    ///
    /// Any contact with an occlusion boundary blocks the line of sight. Arena walls only block
    /// when crossed, which matters for non-convex arenas. `walls_by_distance` must be the ranking
    /// for `src` if given; walls farther away than `dst` are then skipped.
    pub fn line_of_sight(
        &self,
        src: Position,
        dst: Position,
        walls_by_distance: Option<&[WallDistance]>,
    ) -> bool {
        let sight = LineSegment::new(src, dst);
        match walls_by_distance {
            Some(ranked) => {
                let reach = src.distance(dst) + EPSILON;
                !ranked
                    .iter()
                    .take_while(|w| w.distance <= reach)
                    .any(|w| self.blocks(&self.walls[w.index], &sight))
            }
            None => !self.walls.iter().any(|w| self.blocks(w, &sight)),
        }
    }

    fn blocks(&self, wall: &Wall, sight: &LineSegment) -> bool {
        match wall.kind {
            WallKind::Arena => wall.segment.crosses(sight),
            WallKind::Occlusion(_) => wall.segment.intersects(sight),
        }
    }

    /// Region visible from `src`, optionally restricted to a viewing cone.
    ///
    /// Rays are cast towards every arena and occlusion vertex (plus a slightly rotated ray on each
    /// side) and clipped at the nearest wall; the hits, sorted by angle, form the boundary. With a
    /// cone narrower than 360 degrees, `src` itself becomes a vertex of the polygon.
    pub fn visibility_polygon(
        &self,
        src: Position,
        field_of_view: Option<FieldOfView>,
    ) -> Result<Polygon, GeometryError> {
        let cone = field_of_view.filter(|f| f.aperture < 360.0);

        let mut rays = self
            .arena
            .vertices()
            .iter()
            .chain(self.occlusions.iter().flat_map(|o| o.vertices()))
            .flat_map(|v| {
                let angle = bearing(src, *v);
                [angle - RAY_OFFSET, angle, angle + RAY_OFFSET]
            })
            .collect::<Vec<_>>();
        if let Some(f) = cone {
            rays.push(f.direction - f.aperture / 2.0);
            rays.push(f.direction + f.aperture / 2.0);
        }

        let mut hits = rays
            .into_iter()
            .filter_map(|angle| {
                let key = normalize_deg(angle - cone.map_or(0.0, |f| f.direction));
                if let Some(f) = cone {
                    if key.abs() > f.aperture / 2.0 + EPSILON {
                        return None;
                    }
                }
                self.cast(src, angle).map(|hit| (key, hit))
            })
            .collect::<Vec<_>>();
        hits.sort_by(|a, b| a.0.total_cmp(&b.0));

        let mut vertices = Vec::with_capacity(hits.len() + 1);
        if cone.is_some() {
            vertices.push(src);
        }
        for (_, hit) in hits {
            if vertices
                .last()
                .map_or(true, |last: &Position| last.distance(hit) > EPSILON)
            {
                vertices.push(hit);
            }
        }
        if vertices.len() > 1 && vertices[0].distance(vertices[vertices.len() - 1]) <= EPSILON {
            vertices.pop();
        }
        Polygon::new(vertices)
    }

    /// Nearest wall hit by the ray leaving `src` at `angle` degrees.
    fn cast(&self, src: Position, angle: f64) -> Option<Position> {
        let radians = angle.to_radians();
        let direction = Position::new(radians.cos(), radians.sin());
        self.walls
            .iter()
            .filter_map(|w| w.segment.ray_parameter(src, direction))
            .filter(|t| *t > EPSILON)
            .min_by(|a, b| a.total_cmp(b))
            .map(|t| src + direction * t)
    }
}
