use anyhow::Result;
use geo::{Area, Polygon, polygon};

use crate::{
    boolean::subtract,
    design::DesignState,
    error::GeometryError,
    geometry::is_valid_polygon,
};

use super::*;

fn square(x: f64, y: f64, size: f64) -> Polygon {
    polygon![
        (x: x, y: y),
        (x: x + size, y: y),
        (x: x + size, y: y + size),
        (x: x, y: y + size),
    ]
}

/// Same corners, in any order or direction.
fn same_ring(a: &LineString, b: &LineString) -> bool {
    let corners = |ring: &LineString| {
        let mut corners: Vec<(i64, i64)> = ring.coords()
            .map(|c| ((c.x * 1e6).round() as i64, (c.y * 1e6).round() as i64))
            .collect();
        corners.sort();
        corners.dedup();
        corners
    };

    corners(a) == corners(b)
}


#[test]
fn hole_in_the_middle() -> Result<()> {
    init_test_logger();

    let outer = square(0.0, 0.0, 10.0);
    let inner = square(2.0, 2.0, 2.0);

    let result = subtract(&outer, &inner)?;

    assert!((result.unsigned_area() - 96.0).abs() < 1e-9);
    assert_eq!(result.interiors().len(), 1);
    assert!(same_ring(&result.interiors()[0], inner.exterior()));
    assert!(same_ring(result.exterior(), outer.exterior()));

    Ok(())
}

#[test]
fn holes_accumulate() -> Result<()> {
    init_test_logger();

    let mut polygon = square(0.0, 0.0, 10.0);
    let cuts = [square(1.0, 1.0, 2.0), square(6.0, 1.0, 2.0), square(3.0, 6.0, 2.0)];

    for cut in &cuts {
        polygon = subtract(&polygon, cut)?;
    }

    assert_eq!(polygon.interiors().len(), 3);
    assert!((polygon.unsigned_area() - 88.0).abs() < 1e-9);

    for cut in &cuts {
        let found = polygon.interiors().iter().filter(|hole| same_ring(hole, cut.exterior())).count();
        assert_eq!(found, 1, "{cut:?} should be a hole exactly once");
    }

    Ok(())
}

#[test]
fn same_cut_twice() -> Result<()> {
    init_test_logger();

    let outer = square(0.0, 0.0, 10.0);
    let inner = square(2.0, 2.0, 2.0);

    let once = subtract(&outer, &inner)?;

    match subtract(&once, &inner) {
        Ok(twice) => {
            assert_eq!(twice.interiors().len(), 1);
            assert!(same_ring(&twice.interiors()[0], inner.exterior()));
            assert!((twice.unsigned_area() - 96.0).abs() < 1e-9);
        },
        Err(err) => assert_eq!(err, GeometryError::BooleanOpFailed),
    }

    Ok(())
}

#[test]
fn notch_from_the_edge() -> Result<()> {
    init_test_logger();

    let outer = square(0.0, 0.0, 10.0);
    let notch = square(8.0, 4.0, 4.0);

    let result = subtract(&outer, &notch)?;

    assert!(result.interiors().is_empty());
    assert!((result.unsigned_area() - 92.0).abs() < 1e-9);
    assert!(is_valid_polygon(&result));

    Ok(())
}

#[test]
fn split_is_refused() {
    init_test_logger();

    let outer = square(0.0, 0.0, 10.0);
    let strip = polygon![
        (x: -1.0, y: 4.0),
        (x: 11.0, y: 4.0),
        (x: 11.0, y: 6.0),
        (x: -1.0, y: 6.0),
    ];

    assert_eq!(subtract(&outer, &strip), Err(GeometryError::BooleanOpFailed));
}

#[test]
fn design_keeps_geometry_on_failure() -> Result<()> {
    init_test_logger();

    let mut state = DesignState::new();
    let id = state.add_polygon(ground_square(0.0, 0.0, 20.0))?;
    let before = state.polygons()[0].clone();

    let far_away = ground_ring(near_site(500.0, 500.0), 5.0, 5.0);
    assert_eq!(state.subtract_from_overlapping(far_away), Err(GeometryError::NoOverlappingPolygon));
    assert_eq!(state.polygons()[0], before);

    let strip = ground_ring(near_site(0.0, 0.0), 30.0, 2.0);
    assert_eq!(state.subtract_from_overlapping(strip), Err(GeometryError::BooleanOpFailed));
    assert_eq!(state.polygons()[0], before);

    let flat = LineString::from(vec![near_site(0.0, 0.0), near_site(1.0, 0.0), near_site(2.0, 0.0)]);
    assert!(matches!(state.subtract_from_overlapping(flat), Err(GeometryError::InvalidGeometry(_))));

    let hole = ground_ring(near_site(0.0, 0.0), 4.0, 4.0);
    assert_eq!(state.subtract_from_overlapping(hole), Ok(id));

    let after = &state.polygons()[0];
    assert_eq!(after.id(), id);
    assert_eq!(after.geometry().interiors().len(), 1);
    assert!((before.area() - after.area() - 16.0).abs() < 0.5, "{} -> {}", before.area(), after.area());

    save("subtract-design", &state)?;

    Ok(())
}

#[test]
fn first_overlapping_polygon_wins() -> Result<()> {
    init_test_logger();

    let mut state = DesignState::new();
    let west = state.add_polygon(ground_square(-15.0, 0.0, 20.0))?;
    let east = state.add_polygon(ground_square(15.0, 0.0, 20.0))?;

    // Straddles both
    let cut = ground_ring(near_site(0.0, 0.0), 20.0, 4.0);
    assert_eq!(state.subtract_from_overlapping(cut), Ok(west));

    let untouched = state.polygons().iter().find(|p| p.id() == east).map(|p| p.geometry().clone());
    assert_eq!(untouched, Some(ground_square(15.0, 0.0, 20.0)));

    Ok(())
}
