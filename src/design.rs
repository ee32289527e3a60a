use std::collections::BTreeSet;

use geo::{Coord, LineString, Polygon};
use log::{debug, info, warn};
use serde::Serialize;

use crate::{
    boolean::{overlaps, subtract},
    config::LayoutConfig,
    error::{GeoResult, GeometryError},
    geometry::{area, is_valid_polygon, normalize_ring, point_in_polygon},
    layout::{GroupId, PanelCell, layout},
};

/// Estimated peak output of one panel, in kilowatts.
pub const KW_PER_PANEL: f64 = 0.4;


/// A user-drawn area that panels are placed on.
#[derive(Clone, Debug, PartialEq)]
pub struct GroundPolygon {
    id: u64,
    geometry: Polygon,
    area: f64,
}

impl GroundPolygon {
    fn new(id: u64, geometry: Polygon) -> Self {
        let area = area(&geometry);
        Self {
            id,
            geometry,
            area,
        }
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn geometry(&self) -> &Polygon {
        &self.geometry
    }

    /// Square metres, always in sync with the geometry.
    pub fn area(&self) -> f64 {
        self.area
    }

    fn set_geometry(&mut self, geometry: Polygon) {
        self.area = area(&geometry);
        self.geometry = geometry;
    }
}


#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Metrics {
    pub total_area: f64,
    pub total_arrays: usize,
    pub total_panels: usize,
    #[serde(rename = "estimatedCapacityKW")]
    pub estimated_capacity_kw: f64,
}


/// Every polygon and panel of one design.
///
/// Changes to the polygons re-run the layout with the last applied settings,
/// so panels never refer to geometry that is gone.
#[derive(Debug, Default)]
pub struct DesignState {
    polygons: Vec<GroundPolygon>,
    panels: Vec<PanelCell>,
    config: Option<LayoutConfig>,
    next_id: u64,
}

impl DesignState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn polygons(&self) -> &[GroundPolygon] {
        &self.polygons
    }

    pub fn panels(&self) -> &[PanelCell] {
        &self.panels
    }

    /// Settings of the last layout pass, if there was one, with bad values replaced.
    pub fn config(&self) -> Option<&LayoutConfig> {
        self.config.as_ref()
    }

    pub fn add_polygon(&mut self, geometry: Polygon) -> GeoResult<u64> {
        let (exterior, interiors) = geometry.into_inner();
        let geometry = Polygon::new(
            normalize_ring(exterior),
            interiors.into_iter().map(normalize_ring).collect(),
        );

        if !is_valid_polygon(&geometry) {
            return Err(GeometryError::InvalidGeometry("the drawn area is empty or crosses itself".to_string()));
        }

        let id = self.next_id;
        self.next_id += 1;

        let polygon = GroundPolygon::new(id, geometry);
        info!("Added polygon {id} covering {:.1} m2", polygon.area());
        self.polygons.push(polygon);

        self.refresh();
        Ok(id)
    }

    /// Remove the first polygon, in insertion order, whose area holds `point`.
    /// A point inside one of its holes doesn't count.
    pub fn remove_polygon_containing(&mut self, point: Coord) -> Option<GroundPolygon> {
        let index = self.polygons.iter().position(|p| point_in_polygon(point, p.geometry()))?;
        let removed = self.polygons.remove(index);

        info!("Removed polygon {}", removed.id());
        self.refresh();
        Some(removed)
    }

    /// Cut `ring` out of the first polygon it overlaps and return that polygon's id.
    ///
    /// Polygons are tried in insertion order. A polygon the cut can't be applied
    /// to is left unchanged and the next overlapping one is tried.
    pub fn subtract_from_overlapping(&mut self, ring: LineString) -> GeoResult<u64> {
        let inner = Polygon::new(normalize_ring(ring), vec![]);
        if !is_valid_polygon(&inner) {
            return Err(GeometryError::InvalidGeometry("the cut-out is empty or crosses itself".to_string()));
        }

        let mut overlapped = false;

        for index in 0..self.polygons.len() {
            let current = &self.polygons[index];
            let id = current.id();

            if !overlaps(current.geometry(), &inner) {
                continue;
            }
            overlapped = true;

            match subtract(current.geometry(), &inner) {
                Ok(result) => {
                    let polygon = &mut self.polygons[index];
                    polygon.set_geometry(result);
                    info!("Cut a hole into polygon {id}, {:.1} m2 left", polygon.area());

                    self.refresh();
                    return Ok(id);
                },
                Err(err) => debug!("Polygon {id} kept as is: {err}"),
            }
        }

        if overlapped {
            Err(GeometryError::BooleanOpFailed)
        } else {
            Err(GeometryError::NoOverlappingPolygon)
        }
    }

    /// Lay panels out on every polygon. The previous panels stay in place until
    /// the whole pass is done.
    pub fn recompute_layout(&mut self, config: LayoutConfig) {
        let config = config.sanitized();

        let panels: Vec<PanelCell> = self.polygons.iter()
            .flat_map(|polygon| layout(polygon.id(), polygon.geometry(), &config))
            .flat_map(|group| group.cells)
            .collect();

        self.panels = panels;
        self.config = Some(config);

        let metrics = self.metrics();
        info!(
            "Layout: {} arrays, {} panels, {:.1} kW",
            metrics.total_arrays, metrics.total_panels, metrics.estimated_capacity_kw,
        );
    }

    /// Drop one array of panels. Returns how many panels went away.
    pub fn remove_panel_group(&mut self, id: GroupId) -> usize {
        let before = self.panels.len();
        self.panels.retain(|cell| cell.group_id != id);
        let removed = before - self.panels.len();

        if removed == 0 {
            warn!("There is no panel group {id}");
        } else {
            info!("Removed panel group {id} ({removed} panels)");
        }

        removed
    }

    /// Forget every polygon and panel. Layout settings are kept.
    pub fn clear(&mut self) {
        self.polygons.clear();
        self.panels.clear();
        info!("Cleared the design");
    }

    pub fn metrics(&self) -> Metrics {
        let total_arrays = self.panels.iter()
            .map(|cell| cell.group_id)
            .collect::<BTreeSet<_>>()
            .len();

        Metrics {
            total_area: self.polygons.iter().map(GroundPolygon::area).sum(),
            total_arrays,
            total_panels: self.panels.len(),
            estimated_capacity_kw: self.panels.len() as f64 * KW_PER_PANEL,
        }
    }

    fn refresh(&mut self) {
        match self.config {
            Some(config) => self.recompute_layout(config),
            None => self.panels.clear(),
        }
    }
}
