use std::panic::{AssertUnwindSafe, catch_unwind};

use geo::{Area, BooleanOps, LineString, MultiPolygon, Polygon, Simplify};
use geo_offset::{ArcResolution, Offset};
use log::{debug, warn};

use crate::{error::{GeoResult, GeometryError}, geometry::{area, is_valid_polygon}};

/// Growth applied to both shapes to pull apart nearly touching edges, in degrees.
pub const NUDGE: f64 = 0.0000001;

/// Douglas-Peucker tolerance of the last resort, in degrees.
pub const SIMPLIFY_TOLERANCE: f64 = 0.0001;


type Strategy = fn(&Polygon, &Polygon) -> Option<Polygon>;

const STRATEGIES: &[(&str, Strategy)] = &[
    ("direct difference", direct),
    ("nudged difference", nudged),
    ("wide nudged difference", nudged_wide),
    ("manual hole", manual_hole),
    ("simplified difference", simplified),
];


/// Cut `inner` out of `outer`, keeping every hole `outer` already has.
///
/// The strategies are tried in order and the first one producing a valid
/// polygon wins. When all of them fail `outer` should be kept as is.
pub fn subtract(outer: &Polygon, inner: &Polygon) -> GeoResult<Polygon> {
    for (name, strategy) in STRATEGIES {
        match strategy(outer, inner) {
            Some(result) if is_valid_polygon(&result) => {
                debug!("Subtraction succeeded with the {name}");
                return Ok(result);
            },
            Some(_) => debug!("The {name} produced an invalid polygon"),
            None => debug!("The {name} failed"),
        }
    }

    warn!("Every subtraction strategy failed");
    Err(GeometryError::BooleanOpFailed)
}


/// True when the interiors of `a` and `b` share some area, either way round.
pub fn overlaps(a: &Polygon, b: &Polygon) -> bool {
    catch_unwind(AssertUnwindSafe(|| a.intersection(b)))
        .map(|common| common.unsigned_area() > 0.0)
        .unwrap_or(false)
}


fn shell(polygon: &Polygon) -> Polygon {
    Polygon::new(polygon.exterior().clone(), vec![])
}

/// `geo` boolean operations may panic on degenerate topology; treat that as a failed attempt.
fn difference(a: &Polygon, b: &Polygon) -> Option<MultiPolygon> {
    catch_unwind(AssertUnwindSafe(|| a.difference(b))).ok()
}

fn grow(polygon: &Polygon, distance: f64) -> Option<Polygon> {
    let resolution = ArcResolution::SegmentLength(distance);

    let grown = catch_unwind(AssertUnwindSafe(|| polygon.offset_with_arc_resolution(distance, resolution))).ok()?.ok()?;

    grown.into_iter().max_by(|a, b| area(a).total_cmp(&area(b)))
}

/// Turn a difference result back into a single polygon. The largest piece
/// provides the exterior, every other piece becomes one more hole.
fn assemble(result: MultiPolygon, existing_holes: &[LineString]) -> Option<Polygon> {
    let mut pieces = result.0;

    let largest = pieces.iter()
        .enumerate()
        .max_by(|(_, a), (_, b)| area(a).total_cmp(&area(b)))
        .map(|(i, _)| i)?;

    let (exterior, interiors) = pieces.swap_remove(largest).into_inner();

    if !pieces.is_empty() {
        debug!("Subtraction split the shape into {} pieces", pieces.len() + 1);
    }

    let new_holes = interiors.into_iter()
        .chain(pieces.into_iter().map(|p| p.into_inner().0));

    let mut holes = existing_holes.to_vec();
    for hole in new_holes {
        push_unique(&mut holes, hole);
    }

    Some(Polygon::new(exterior, holes))
}

fn push_unique(holes: &mut Vec<LineString>, hole: LineString) {
    if !holes.contains(&hole) {
        holes.push(hole);
    }
}

fn difference_keeping_holes(outer_shell: &Polygon, inner: &Polygon, existing_holes: &[LineString]) -> Option<Polygon> {
    let result = difference(outer_shell, inner)?;
    assemble(result, existing_holes)
}


fn direct(outer: &Polygon, inner: &Polygon) -> Option<Polygon> {
    difference_keeping_holes(&shell(outer), &shell(inner), outer.interiors())
}

fn nudged_by(outer: &Polygon, inner: &Polygon, distance: f64) -> Option<Polygon> {
    let outer_shell = grow(&shell(outer), distance)?;
    let inner = grow(&shell(inner), distance)?;
    difference_keeping_holes(&outer_shell, &inner, outer.interiors())
}

fn nudged(outer: &Polygon, inner: &Polygon) -> Option<Polygon> {
    nudged_by(outer, inner, NUDGE)
}

fn nudged_wide(outer: &Polygon, inner: &Polygon) -> Option<Polygon> {
    nudged_by(outer, inner, NUDGE * 10.0)
}

/// Splice the reversed inner ring in as a hole. Only valid when `inner` stays
/// clear of the boundary of `outer`.
fn manual_hole(outer: &Polygon, inner: &Polygon) -> Option<Polygon> {
    let mut hole = inner.exterior().clone();
    hole.0.reverse();

    let mut holes = outer.interiors().to_vec();
    push_unique(&mut holes, hole);

    Some(Polygon::new(outer.exterior().clone(), holes))
}

fn simplified(outer: &Polygon, inner: &Polygon) -> Option<Polygon> {
    let outer = outer.simplify(&SIMPLIFY_TOLERANCE);
    let inner = inner.simplify(&SIMPLIFY_TOLERANCE);
    difference_keeping_holes(&shell(&outer), &shell(&inner), outer.interiors())
}
