use geo::{Coord, LineString, MapCoords, Polygon};
use log::warn;

use crate::error::{GeoResult, GeometryError};

use super::{CoordExt, DegreeScale, EPSILON, fallback_marker};

/// Azimuth of an unrotated (south facing) rectangle.
pub const BASELINE_AZIMUTH: f64 = 180.0;

/// Projections closer than this (in coordinate units) are treated as touching.
const SEPARATION_TOLERANCE: f64 = 1e-10;


/// Clockwise rotation in degrees that turns the baseline orientation into `azimuth`.
pub fn azimuth_rotation(azimuth: f64) -> f64 {
    BASELINE_AZIMUTH - azimuth
}

/// Build a `width` x `height` metre rectangle centred on `center`, facing `azimuth`.
pub fn try_make_rectangle(center: Coord, width: f64, height: f64, azimuth: f64, scale: DegreeScale) -> GeoResult<Polygon> {
    if !center.is_finite() || !azimuth.is_finite() {
        return Err(GeometryError::InvalidGeometry(format!("rectangle at {center:?} facing {azimuth}")));
    }

    if !(width.is_finite() && height.is_finite() && width > 0.0 && height > 0.0) {
        return Err(GeometryError::DegenerateConfig(format!("rectangle size {width} x {height}")));
    }

    if !scale.is_usable() {
        return Err(GeometryError::DegenerateConfig(format!("degree scale {scale:?}")));
    }

    let half = scale.to_degrees(Coord { x: width / 2.0, y: height / 2.0 });

    let boundary: Vec<Coord> = [(-1.0, -1.0), (1.0, -1.0), (1.0, 1.0), (-1.0, 1.0), (-1.0, -1.0)]
        .into_iter()
        .map(|(sx, sy)| Coord { x: center.x + sx * half.x, y: center.y + sy * half.y })
        .collect();

    let rectangle = Polygon::new(LineString::new(boundary), vec![]);

    let rotation = azimuth_rotation(azimuth);
    if rotation.abs() < EPSILON {
        return Ok(rectangle);
    }

    Ok(rotate_about(&rectangle, center, rotation, scale))
}

/// Same as [`try_make_rectangle`], but never fails: bad input yields a tiny marker disc.
pub fn make_rectangle(center: Coord, width: f64, height: f64, azimuth: f64, scale: DegreeScale) -> Polygon {
    try_make_rectangle(center, width, height, azimuth, scale).unwrap_or_else(|err| {
        warn!("Could not build a rectangle, using a marker instead: {err}");
        fallback_marker(center)
    })
}

/// Rotate clockwise around `pivot`. The rotation happens in metres so right
/// angles on the ground stay right angles.
pub fn rotate_about(polygon: &Polygon, pivot: Coord, degrees_cw: f64, scale: DegreeScale) -> Polygon {
    let angle = -degrees_cw.to_radians();

    polygon.map_coords(|c| {
        let offset = scale.to_meters(c - pivot).rotate_ccwise(angle);
        pivot + scale.to_degrees(offset)
    })
}


fn project(polygon: &Polygon, axis: Coord) -> (f64, f64) {
    let mut lo = f64::INFINITY;
    let mut hi = f64::NEG_INFINITY;

    for c in polygon.exterior().coords() {
        let dot = c.x * axis.x + c.y * axis.y;
        lo = lo.min(dot);
        hi = hi.max(dot);
    }

    (lo, hi)
}

/// True if the interiors of two convex polygons overlap, including when one
/// contains the other. Shared edges or corners are not an overlap.
pub fn convex_overlap(a: &Polygon, b: &Polygon) -> bool {
    for polygon in [a, b] {
        for edge in polygon.exterior().lines() {
            let normal = Coord { x: -edge.dy(), y: edge.dx() };
            let length = normal.x.hypot(normal.y);
            if length < f64::EPSILON {
                continue;
            }
            let axis = normal / length;

            let (min_a, max_a) = project(a, axis);
            let (min_b, max_b) = project(b, axis);

            if max_a <= min_b + SEPARATION_TOLERANCE || max_b <= min_a + SEPARATION_TOLERANCE {
                return false;
            }
        }
    }

    true
}
