mod circle;
mod rect;

use geo::{
    BoundingRect, Contains, Coord, GeodesicArea, Intersects, Line, LineString, Polygon, Rect,
    RemoveRepeatedPoints, line_intersection::{LineIntersection, line_intersection},
};

pub use circle::*;
pub use rect::*;

pub const EPSILON: f64 = 0.000000001;

/// Length of one degree of latitude, in metres.
pub const METERS_PER_DEGREE: f64 = 111_320.0;


pub trait CoordExt: Sized {
    fn rotate_ccwise(&self, angle_rad: f64) -> Self;

    fn is_finite(&self) -> bool;
}


impl CoordExt for Coord {
    fn rotate_ccwise(&self, angle_rad: f64) -> Self {
        let sin = angle_rad.sin();
        let cos = angle_rad.cos();

        Self {
            x: cos * self.x - sin * self.y,
            y: sin * self.x + cos * self.y,
        }
    }

    fn is_finite(&self) -> bool {
        self.x.is_finite() && self.y.is_finite()
    }
}


/// Metres per degree of longitude and latitude around some latitude.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct DegreeScale {
    pub lon: f64,
    pub lat: f64,
}

impl DegreeScale {
    pub fn is_usable(&self) -> bool {
        self.lon.is_finite() && self.lat.is_finite() && self.lon > EPSILON && self.lat > EPSILON
    }

    /// Degree offset to metre offset.
    pub fn to_meters(&self, d: Coord) -> Coord {
        Coord { x: d.x * self.lon, y: d.y * self.lat }
    }

    /// Metre offset to degree offset.
    pub fn to_degrees(&self, m: Coord) -> Coord {
        Coord { x: m.x / self.lon, y: m.y / self.lat }
    }
}

/// Longitude degrees shrink towards the poles, so the factor has to be taken
/// at a latitude close to the geometry it is used for.
pub fn meters_per_degree(latitude: f64) -> DegreeScale {
    DegreeScale {
        lon: METERS_PER_DEGREE * latitude.to_radians().cos(),
        lat: METERS_PER_DEGREE,
    }
}


/// Surface area in square metres on the WGS84 ellipsoid, holes excluded.
/// Anything that can't be measured comes back as `0.0`.
pub fn area(polygon: &Polygon) -> f64 {
    let area = polygon.geodesic_area_unsigned();
    if area.is_finite() { area } else { 0.0 }
}

pub fn bounding_box(polygon: &Polygon) -> Option<Rect> {
    polygon.bounding_rect()
}

/// Boundary points count as inside; points inside a hole do not.
pub fn point_in_polygon(point: Coord, polygon: &Polygon) -> bool {
    point.is_finite() && polygon.intersects(&point)
}

/// Close the ring and drop consecutive duplicates.
pub fn normalize_ring(mut ring: LineString) -> LineString {
    ring.remove_repeated_points_mut();
    ring.close();
    ring
}

pub fn ring_from_points(points: &[[f64; 2]]) -> LineString {
    let coords: Vec<Coord> = points.iter()
        .map(|&[x, y]| Coord { x, y })
        .collect();
    normalize_ring(LineString::new(coords))
}

pub fn ring_to_points(ring: &LineString) -> Vec<[f64; 2]> {
    ring.coords().map(|c| [c.x, c.y]).collect()
}

pub fn is_valid_polygon(polygon: &Polygon) -> bool {
    let rings_ok = std::iter::once(polygon.exterior())
        .chain(polygon.interiors())
        .all(|ring| ring.is_closed() && ring.0.len() >= 4 && ring.coords().all(|c| c.is_finite()));

    rings_ok && area(polygon) > 0.0 && is_simple(polygon)
}

/// No ring crosses itself or another ring, and every hole sits inside the
/// exterior without nesting in another hole.
pub fn is_simple(polygon: &Polygon) -> bool {
    let rings: Vec<&LineString> = std::iter::once(polygon.exterior())
        .chain(polygon.interiors())
        .collect();

    if !rings.iter().all(|ring| ring_is_simple(ring)) {
        return false;
    }

    for (i, a) in rings.iter().enumerate() {
        for b in rings.iter().skip(i + 1) {
            if rings_touch(a, b) {
                return false;
            }
        }
    }

    let shell = Polygon::new(polygon.exterior().clone(), vec![]);
    let holes: Vec<Polygon> = polygon.interiors().iter()
        .map(|ring| Polygon::new(ring.clone(), vec![]))
        .collect();

    for (i, hole) in holes.iter().enumerate() {
        let Some(&probe) = hole.exterior().0.first() else {
            return false;
        };

        if !shell.contains(&probe) {
            return false;
        }

        let nested = holes.iter()
            .enumerate()
            .any(|(j, other)| i != j && other.contains(&probe));
        if nested {
            return false;
        }
    }

    true
}

fn ring_is_simple(ring: &LineString) -> bool {
    let segments: Vec<Line> = ring.lines().collect();
    let n = segments.len();

    if segments.iter().any(|s| s.dx().abs() < f64::EPSILON && s.dy().abs() < f64::EPSILON) {
        return false;
    }

    for i in 0..n {
        for j in (i + 1)..n {
            let adjacent = j == i + 1 || (i == 0 && j == n - 1);

            match line_intersection(segments[i], segments[j]) {
                None => {},
                // Neighbours share exactly their common vertex
                Some(LineIntersection::SinglePoint { is_proper: false, .. }) if adjacent => {},
                Some(_) => return false,
            }
        }
    }

    true
}

fn rings_touch(a: &LineString, b: &LineString) -> bool {
    a.lines().any(|la| b.lines().any(|lb| la.intersects(&lb)))
}


#[cfg(test)]
mod tests {
    use geo::polygon;

    use super::*;

    fn unit_square() -> Polygon {
        polygon![(x: 0.0, y: 0.0), (x: 1.0, y: 0.0), (x: 1.0, y: 1.0), (x: 0.0, y: 1.0)]
    }

    #[test]
    fn scale_shrinks_towards_poles() {
        let equator = meters_per_degree(0.0);
        let north = meters_per_degree(60.0);

        assert!((equator.lon - METERS_PER_DEGREE).abs() < EPSILON);
        assert!((north.lon - METERS_PER_DEGREE / 2.0).abs() < 1e-6);
        assert_eq!(north.lat, METERS_PER_DEGREE);
    }

    #[test]
    fn point_in_hole_is_outside() {
        let donut = polygon!(
            exterior: [(x: 0.0, y: 0.0), (x: 10.0, y: 0.0), (x: 10.0, y: 10.0), (x: 0.0, y: 10.0)],
            interiors: [[(x: 4.0, y: 4.0), (x: 5.0, y: 4.0), (x: 5.0, y: 5.0), (x: 4.0, y: 5.0)]],
        );

        assert!(point_in_polygon(Coord { x: 1.0, y: 1.0 }, &donut));
        assert!(!point_in_polygon(Coord { x: 4.5, y: 4.5 }, &donut));
        assert!(!point_in_polygon(Coord { x: 11.0, y: 1.0 }, &donut));
    }

    #[test]
    fn validity() {
        assert!(is_valid_polygon(&unit_square()));

        let bowtie = polygon![(x: 0.0, y: 0.0), (x: 1.0, y: 1.0), (x: 1.0, y: 0.0), (x: 0.0, y: 1.0)];
        assert!(!is_valid_polygon(&bowtie));

        let flat = polygon![(x: 0.0, y: 0.0), (x: 1.0, y: 0.0), (x: 2.0, y: 0.0)];
        assert!(!is_valid_polygon(&flat));

        let escaped_hole = polygon!(
            exterior: [(x: 0.0, y: 0.0), (x: 1.0, y: 0.0), (x: 1.0, y: 1.0), (x: 0.0, y: 1.0)],
            interiors: [[(x: 5.0, y: 5.0), (x: 6.0, y: 5.0), (x: 6.0, y: 6.0), (x: 5.0, y: 6.0)]],
        );
        assert!(!is_valid_polygon(&escaped_hole));
    }

    #[test]
    fn ring_normalization() {
        let ring = ring_from_points(&[[0.0, 0.0], [1.0, 0.0], [1.0, 0.0], [1.0, 1.0]]);

        assert!(ring.is_closed());
        assert_eq!(ring.0.len(), 4);
    }
}
