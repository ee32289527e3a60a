use std::f64::consts::TAU;

use geo::{Coord, LineString, Polygon};

use super::{CoordExt, METERS_PER_DEGREE};

/// Radius of the marker returned when a rectangle can't be built, in metres.
pub const FALLBACK_RADIUS: f64 = 0.1;


#[derive(Clone, Debug)]
pub struct Circle {
    center: Coord,
    radius: f64,
}

impl Circle {
    pub fn new(center: Coord, radius: f64) -> Self {
        assert!(radius > 0.0);
        Self {
            center,
            radius,
        }
    }

    pub fn into_polygon(self, resolution: f64) -> Polygon {
        let circum = TAU * self.radius;
        let segments = (circum / resolution).ceil() as usize;
        let segments = segments.max(6);
        let angle = TAU / segments as f64;

        let mut boundary = vec![];
        let mut v = Coord { x: 0.0, y: self.radius };

        for _ in 0..segments {
            boundary.push(self.center + v);
            v = v.rotate_ccwise(angle);
        }

        // Close on the exact starting point
        boundary.push(self.center + Coord { x: 0.0, y: self.radius });

        Polygon::new(LineString::new(boundary), vec![])
    }
}


/// A tiny disc around `center` standing in for geometry that could not be built.
/// Non-finite centres collapse to the origin.
pub fn fallback_marker(center: Coord) -> Polygon {
    let center = if center.is_finite() { center } else { Coord { x: 0.0, y: 0.0 } };
    let radius = FALLBACK_RADIUS / METERS_PER_DEGREE;

    Circle::new(center, radius).into_polygon(radius / 2.0)
}
