//! Basic building blocks.

use std::{
    f64::consts::PI,
    ops::{Add, Mul, Sub},
};

use serde::{Deserialize, Serialize};

/// Tolerance used by all geometric predicates.
pub const EPSILON: f64 = 1e-9;

#[derive(Clone, Copy, Debug, Default, PartialEq, PartialOrd, Serialize, Deserialize)]
#[serde(from = "[f64; 2]", into = "[f64; 2]")]
pub struct Position {
    x: f64,
    y: f64,
}

impl Position {
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    pub fn x(&self) -> f64 {
        self.x
    }

    pub fn y(&self) -> f64 {
        self.y
    }

    pub fn distance(&self, position: Self) -> f64 {
        ((self.x - position.x).powi(2) + (self.y - position.y).powi(2)).sqrt()
    }

    pub fn length(&self) -> f64 {
        self.distance(Position::default())
    }

    pub fn dot(&self, other: Self) -> f64 {
        self.x * other.x + self.y * other.y
    }

    /// z component of the 3D cross product.
    pub fn cross(&self, other: Self) -> f64 {
        self.x * other.y - self.y * other.x
    }

    /// Point reached by travelling `distance` from here along `angle`.
    pub fn moved(&self, distance: f64, angle: Angle) -> Position {
        *self + Position::new(angle.0.cos(), angle.0.sin()) * distance
    }

    pub fn is_finite(&self) -> bool {
        self.x.is_finite() && self.y.is_finite()
    }
}

impl From<Position> for (f64, f64) {
    fn from(value: Position) -> Self {
        (value.x, value.y)
    }
}

impl From<(f64, f64)> for Position {
    fn from(value: (f64, f64)) -> Self {
        Self::new(value.0, value.1)
    }
}

impl From<[f64; 2]> for Position {
    fn from(value: [f64; 2]) -> Self {
        Self::new(value[0], value[1])
    }
}

impl From<Position> for [f64; 2] {
    fn from(value: Position) -> Self {
        [value.x, value.y]
    }
}

impl Add for Position {
    type Output = Position;

    fn add(self, rhs: Self) -> Self::Output {
        Self {
            x: self.x + rhs.x,
            y: self.y + rhs.y,
        }
    }
}

impl Sub for Position {
    type Output = Position;

    fn sub(self, rhs: Self) -> Self::Output {
        Self {
            x: self.x - rhs.x,
            y: self.y - rhs.y,
        }
    }
}

impl Mul<f64> for Position {
    type Output = Position;

    fn mul(self, rhs: f64) -> Self::Output {
        Self {
            x: self.x * rhs,
            y: self.y * rhs,
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, PartialOrd)]
pub struct Angle(f64);

impl Angle {
    pub fn from_deg(degree: f64) -> Self {
        Self(degree * PI / 180.0)
    }
}

/// Wraps an angle in degrees to `[-180, 180)`.
pub fn normalize_deg(degrees: f64) -> f64 {
    let wrapped = (degrees + 180.0).rem_euclid(360.0) - 180.0;
    // rem_euclid can round up to the modulus itself for tiny negative inputs
    if wrapped >= 180.0 {
        wrapped - 360.0
    } else {
        wrapped
    }
}

/// Signed planar bearing from `from` to `to` in degrees, `[-180, 180)`, counter-clockwise from
/// the positive x-axis.
pub fn bearing(from: Position, to: Position) -> f64 {
    let delta = to - from;
    normalize_deg(delta.y().atan2(delta.x()).to_degrees())
}

#[derive(Clone, Copy, Debug, PartialEq, PartialOrd)]
pub struct LineSegment {
    p1: Position,
    p2: Position,
}

impl LineSegment {
    pub fn new(p1: Position, p2: Position) -> Self {
        Self { p1, p2 }
    }

    pub fn p1(&self) -> Position {
        self.p1
    }

    pub fn p2(&self) -> Position {
        self.p2
    }

    pub fn length(&self) -> f64 {
        self.p1.distance(self.p2)
    }

    pub fn centroid(&self) -> Position {
        (self.p1 + self.p2) * 0.5
    }

    /// Euclidean distance from `position` to the closest point of the segment.
    pub fn distance_to(&self, position: Position) -> f64 {
        let direction = self.p2 - self.p1;
        let squared_length = direction.dot(direction);
        if squared_length == 0.0 {
            return self.p1.distance(position);
        }
        let t = ((position - self.p1).dot(direction) / squared_length).clamp(0.0, 1.0);
        (self.p1 + direction * t).distance(position)
    }

    /// Check whether `position` lies on the segment (within tolerance).
    pub fn contains(&self, position: Position) -> bool {
        self.distance_to(position) <= EPSILON
    }

    /// Check if the segments share at least one point, touching endpoints and collinear overlap
    /// included.
    pub fn intersects(&self, other: &LineSegment) -> bool {
        let d1 = orientation(other.p1, other.p2, self.p1);
        let d2 = orientation(other.p1, other.p2, self.p2);
        let d3 = orientation(self.p1, self.p2, other.p1);
        let d4 = orientation(self.p1, self.p2, other.p2);

        if d1 * d2 < 0 && d3 * d4 < 0 {
            return true;
        }

        (d1 == 0 && other.contains(self.p1))
            || (d2 == 0 && other.contains(self.p2))
            || (d3 == 0 && self.contains(other.p1))
            || (d4 == 0 && self.contains(other.p2))
    }

    /// Check if the segments cross at a single point interior to both of them.
    pub fn crosses(&self, other: &LineSegment) -> bool {
        let d1 = orientation(other.p1, other.p2, self.p1);
        let d2 = orientation(other.p1, other.p2, self.p2);
        let d3 = orientation(self.p1, self.p2, other.p1);
        let d4 = orientation(self.p1, self.p2, other.p2);
        d1 * d2 < 0 && d3 * d4 < 0
    }

    /// Distance along the ray `origin + t * direction` (`direction` being a unit vector) to the
    /// first point shared with the segment.
    pub fn ray_parameter(&self, origin: Position, direction: Position) -> Option<f64> {
        let segment = self.p2 - self.p1;
        let offset = self.p1 - origin;
        let denominator = direction.cross(segment);

        if denominator.abs() < EPSILON {
            // Ray and line are parallel
            if offset.cross(direction).abs() < EPSILON && self.contains(origin) {
                return Some(0.0);
            }
            return None;
        }

        let t = offset.cross(segment) / denominator;
        let u = offset.cross(direction) / denominator;

        if t >= -EPSILON && (-EPSILON..=1.0 + EPSILON).contains(&u) {
            Some(t.max(0.0))
        } else {
            None
        }
    }
}

fn orientation(a: Position, b: Position, c: Position) -> i8 {
    let value = (b - a).cross(c - a);
    if value > EPSILON {
        1
    } else if value < -EPSILON {
        -1
    } else {
        0
    }
}

#[cfg(test)]
mod tests {
    use std::f64::consts::FRAC_1_SQRT_2;

    use approx::{assert_abs_diff_eq, AbsDiffEq};
    use pretty_assertions::assert_eq;
    use rstest::rstest;

    use super::*;

    const TOLERANCE: f64 = 1e-12;

    #[test]
    fn test_position() {
        let position = Position::new(1.0, 2.0);
        assert_abs_diff_eq!(position.x(), 1.0);
        assert_abs_diff_eq!(position.y(), 2.0);
    }

    #[test]
    fn test_position_moved() {
        let position = Position::new(1.0, 1.0).moved(2.0, Angle::from_deg(90.0));
        assert_abs_diff_eq!(position, Position::new(1.0, 3.0), epsilon = TOLERANCE);
    }

    #[test]
    fn test_position_serde() {
        let position: Position = serde_json::from_str("[1.5, -2.0]").unwrap();
        assert_eq!(position, Position::new(1.5, -2.0));
        assert_eq!(serde_json::to_string(&position).unwrap(), "[1.5,-2.0]");
    }

    #[rstest]
    #[case(0.0, 0.0)]
    #[case(180.0, -180.0)]
    #[case(-180.0, -180.0)]
    #[case(270.0, -90.0)]
    #[case(-190.0, 170.0)]
    #[case(725.0, 5.0)]
    fn test_normalize_deg(#[case] degrees: f64, #[case] expected: f64) {
        assert_abs_diff_eq!(normalize_deg(degrees), expected, epsilon = TOLERANCE);
    }

    #[rstest]
    #[case::east(Position::new(1.0, 0.0), 0.0)]
    #[case::north(Position::new(0.0, 1.0), 90.0)]
    #[case::south_west(Position::new(-1.0, -1.0), -135.0)]
    #[case::south(Position::new(0.0, -1.0), -90.0)]
    #[case::north_east(Position::new(1.0, 1.0), 45.0)]
    fn test_bearing(#[case] to: Position, #[case] expected: f64) {
        assert_abs_diff_eq!(
            bearing(Position::new(0.0, 0.0), to),
            expected,
            epsilon = TOLERANCE
        );
    }

    #[rstest]
    #[case::perpendicular(Position::new(1.0, 1.0), 1.0)]
    #[case::beyond_p2(Position::new(3.0, 0.0), 1.0)]
    #[case::before_p1(Position::new(-3.0, 4.0), 5.0)]
    #[case::on_segment(Position::new(0.5, 0.0), 0.0)]
    fn test_line_segment_distance_to(#[case] position: Position, #[case] expected: f64) {
        let segment = LineSegment::new(Position::new(0.0, 0.0), Position::new(2.0, 0.0));
        assert_abs_diff_eq!(segment.distance_to(position), expected, epsilon = TOLERANCE);
    }

    #[rstest]
    #[case::crossing((0.0, -1.0), (0.0, 1.0), true, true)]
    #[case::touching_endpoint((1.0, 0.0), (1.0, 1.0), true, false)]
    #[case::collinear_overlap((0.5, 0.0), (3.0, 0.0), true, false)]
    #[case::collinear_disjoint((1.5, 0.0), (3.0, 0.0), false, false)]
    #[case::parallel((-1.0, 1.0), (1.0, 1.0), false, false)]
    #[case::t_junction((0.0, 0.0), (0.0, 2.0), true, false)]
    fn test_line_segment_intersects(
        #[case] p1: (f64, f64),
        #[case] p2: (f64, f64),
        #[case] intersects: bool,
        #[case] crosses: bool,
    ) {
        let segment = LineSegment::new(Position::new(-1.0, 0.0), Position::new(1.0, 0.0));
        let other = LineSegment::new(p1.into(), p2.into());
        assert_eq!(segment.intersects(&other), intersects);
        assert_eq!(other.intersects(&segment), intersects);
        assert_eq!(segment.crosses(&other), crosses);
        assert_eq!(other.crosses(&segment), crosses);
    }

    /// Rays cast from the center of a 10 x 10 room holding an occlusion at x = 6.
    #[rstest]
    #[case::towards_wall(
        LineSegment::new(Position::new(10.0, 0.0), Position::new(10.0, 10.0)),
        Position::new(5.0, 5.0),
        Position::new(1.0, 0.0),
        Some(5.0)
    )]
    #[case::into_corner(
        LineSegment::new(Position::new(10.0, 0.0), Position::new(10.0, 10.0)),
        Position::new(5.0, 5.0),
        Position::new(FRAC_1_SQRT_2, FRAC_1_SQRT_2),
        Some(5.0 * 2.0_f64.sqrt())
    )]
    #[case::away_from_wall(
        LineSegment::new(Position::new(10.0, 0.0), Position::new(10.0, 10.0)),
        Position::new(5.0, 5.0),
        Position::new(-1.0, 0.0),
        None
    )]
    #[case::grazing_occlusion_corner(
        LineSegment::new(Position::new(6.0, 4.0), Position::new(6.0, 6.0)),
        Position::new(5.0, 5.0),
        Position::new(FRAC_1_SQRT_2, FRAC_1_SQRT_2),
        Some(2.0_f64.sqrt())
    )]
    #[case::past_occlusion_edge(
        LineSegment::new(Position::new(6.0, 4.0), Position::new(6.0, 6.0)),
        Position::new(5.0, 5.0),
        Position::new(0.6, 0.8),
        None
    )]
    #[case::parallel_to_wall(
        LineSegment::new(Position::new(0.0, 0.0), Position::new(10.0, 0.0)),
        Position::new(5.0, 5.0),
        Position::new(1.0, 0.0),
        None
    )]
    #[case::along_wall_from_its_inside(
        LineSegment::new(Position::new(0.0, 10.0), Position::new(10.0, 10.0)),
        Position::new(5.0, 10.0),
        Position::new(1.0, 0.0),
        Some(0.0)
    )]
    #[case::leaving_wall(
        LineSegment::new(Position::new(0.0, 0.0), Position::new(10.0, 0.0)),
        Position::new(5.0, 0.0),
        Position::new(0.0, 1.0),
        Some(0.0)
    )]
    fn test_line_segment_ray_parameter(
        #[case] segment: LineSegment,
        #[case] origin: Position,
        #[case] direction: Position,
        #[case] expected: Option<f64>,
    ) {
        let result = segment.ray_parameter(origin, direction);
        if let (Some(r), Some(e)) = (result, expected) {
            assert_abs_diff_eq!(r, e, epsilon = TOLERANCE);
        } else {
            assert_eq!(result, expected);
        }
    }

    impl AbsDiffEq for Position {
        type Epsilon = f64;

        fn default_epsilon() -> f64 {
            f64::EPSILON
        }

        fn abs_diff_eq(&self, other: &Self, epsilon: f64) -> bool {
            f64::abs_diff_eq(&self.x, &other.x, epsilon)
                && f64::abs_diff_eq(&self.y, &other.y, epsilon)
        }
    }
}
