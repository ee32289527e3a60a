use std::{fmt, str::FromStr};

use anyhow::Context;
use geo::{Contains, Coord, Polygon};
use log::{debug, info, warn};

use crate::{
    config::LayoutConfig,
    error::{GeoResult, GeometryError},
    geometry::{
        BASELINE_AZIMUTH, DegreeScale, EPSILON, azimuth_rotation, bounding_box, convex_overlap,
        is_valid_polygon, meters_per_degree, point_in_polygon, rotate_about, try_make_rectangle,
    },
};

/// Candidate positions examined for a single polygon are capped so a pass always ends.
pub const MAX_CANDIDATES: usize = 1_000_000;

/// Largest number of panels a single group may hold.
pub const MAX_PANELS_PER_GROUP: usize = 10_000;


#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct GroupId {
    pub polygon: u64,
    pub index: usize,
}

impl fmt::Display for GroupId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.polygon, self.index)
    }
}

impl FromStr for GroupId {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (polygon, index) = s.split_once('-').context("Group id should look like <polygon>-<index>")?;
        Ok(Self {
            polygon: polygon.trim().parse()?,
            index: index.trim().parse()?,
        })
    }
}


/// One panel on the ground.
#[derive(Clone, Debug, PartialEq)]
pub struct PanelCell {
    pub geometry: Polygon,
    pub group_id: GroupId,
    pub polygon_id: u64,
    pub row: usize,
    pub col: usize,
    pub original_width: f64,
    pub original_height: f64,
    pub adjusted_height: f64,
}

impl PanelCell {
    pub fn panel_id(&self) -> String {
        format!("{}-panel-{}-{}", self.group_id, self.row, self.col)
    }
}


/// An array of panels placed and tested as one rigid rectangle.
#[derive(Clone, Debug, PartialEq)]
pub struct PanelGroup {
    pub id: GroupId,
    pub center: Coord,
    pub footprint: Polygon,
    pub cells: Vec<PanelCell>,
}


/// Tile `polygon` with non-overlapping panel groups.
///
/// Never fails: invalid polygons, unusable configurations and oversized grids
/// are logged and produce an empty layout.
pub fn layout(polygon_id: u64, polygon: &Polygon, config: &LayoutConfig) -> Vec<PanelGroup> {
    match try_layout(polygon_id, polygon, config) {
        Ok(groups) => groups,
        Err(err) => {
            warn!("No panels for polygon {polygon_id}: {err}");
            vec![]
        },
    }
}

pub fn try_layout(polygon_id: u64, polygon: &Polygon, config: &LayoutConfig) -> GeoResult<Vec<PanelGroup>> {
    if !is_valid_polygon(polygon) {
        return Err(GeometryError::InvalidGeometry(format!("polygon {polygon_id} is empty or self-intersecting")));
    }

    let config = config.sanitized();
    panels_per_group(&config)?;
    let (group_width, group_height) = config.group_size();

    if !(group_width.is_finite() && group_height.is_finite() && group_width > 0.0 && group_height > 0.0) {
        return Err(GeometryError::DegenerateConfig(format!("group size {group_width} x {group_height}")));
    }

    let bounds = bounding_box(polygon)
        .ok_or_else(|| GeometryError::InvalidGeometry(format!("polygon {polygon_id} has no extent")))?;

    let scale = meters_per_degree(bounds.center().y);
    if !scale.is_usable() {
        return Err(GeometryError::DegenerateConfig(format!("degree scale {scale:?} at {:?}", bounds.center())));
    }

    // Half a group in each direction, so no feasible position is skipped
    let step = scale.to_degrees(Coord { x: group_width / 2.0, y: group_height / 2.0 });

    let columns = (bounds.width() / step.x).floor() as usize + 1;
    let rows = (bounds.height() / step.y).floor() as usize + 1;
    let total = columns.saturating_mul(rows);
    if total > MAX_CANDIDATES {
        return Err(GeometryError::GridTooDense { candidates: total });
    }

    let origin = bounds.min();
    let mut candidates: Vec<Coord> = (0..rows)
        .flat_map(|r| (0..columns).map(move |c| Coord {
            x: origin.x + c as f64 * step.x,
            y: origin.y + r as f64 * step.y,
        }))
        .filter(|&c| point_in_polygon(c, polygon))
        .collect();

    // Placement order decides who wins contested space
    candidates.sort_by(|a, b| a.y.total_cmp(&b.y).then(a.x.total_cmp(&b.x)));

    debug!("Polygon {polygon_id}: {} of {total} grid positions are inside, group {group_width:.2}m x {group_height:.2}m", candidates.len());

    let mut groups: Vec<PanelGroup> = vec![];
    let mut clearances: Vec<Polygon> = vec![];

    for center in candidates {
        let footprint = match try_make_rectangle(center, group_width, group_height, config.azimuth_angle, scale) {
            Ok(footprint) => footprint,
            Err(err) => {
                debug!("Skipping position {center:?}: {err}");
                continue;
            },
        };

        let inside = footprint.exterior().coords().all(|&c| point_in_polygon(c, polygon))
            && polygon.contains(&footprint);
        if !inside {
            continue;
        }

        // The footprint grown by half the array spacing on each side
        let clearance = match try_make_rectangle(
            center,
            group_width + config.h_array_spacing,
            group_height + config.v_array_spacing,
            config.azimuth_angle,
            scale,
        ) {
            Ok(clearance) => clearance,
            Err(err) => {
                debug!("Skipping position {center:?}: {err}");
                continue;
            },
        };

        if clearances.iter().any(|placed| convex_overlap(placed, &clearance)) {
            continue;
        }

        let id = GroupId { polygon: polygon_id, index: groups.len() };
        let cells = match group_cells(id, center, &config, scale) {
            Ok(cells) => cells,
            Err(err) => {
                debug!("Skipping group at {center:?}: {err}");
                continue;
            },
        };

        clearances.push(clearance);
        groups.push(PanelGroup {
            id,
            center,
            footprint,
            cells,
        });
    }

    if groups.is_empty() {
        info!("Polygon {polygon_id}: no panel group fits");
    } else {
        let panels: usize = groups.iter().map(|g| g.cells.len()).sum();
        info!("Polygon {polygon_id}: placed {} groups, {panels} panels", groups.len());
    }

    Ok(groups)
}

fn panels_per_group(config: &LayoutConfig) -> GeoResult<usize> {
    config.rows_per_array()
        .checked_mul(config.panels_per_row())
        .filter(|&n| n <= MAX_PANELS_PER_GROUP)
        .ok_or_else(|| GeometryError::DegenerateConfig(format!(
            "{} rows of {} panels is more than {MAX_PANELS_PER_GROUP} panels per group",
            config.rows_per_array, config.panels_per_row,
        )))
}

/// Lay out the panels of one group and turn them all around the group centre.
fn group_cells(id: GroupId, center: Coord, config: &LayoutConfig, scale: DegreeScale) -> GeoResult<Vec<PanelCell>> {
    let adjusted_height = config.adjusted_panel_height();
    let (group_width, group_height) = config.group_size();

    let corner = center - scale.to_degrees(Coord { x: group_width / 2.0, y: group_height / 2.0 });
    let panel = scale.to_degrees(Coord { x: config.panel_width, y: adjusted_height });
    let gap = scale.to_degrees(Coord { x: config.h_panel_spacing, y: config.v_panel_spacing });
    let rotation = azimuth_rotation(config.azimuth_angle);

    let mut cells = Vec::with_capacity(panels_per_group(config)?);

    for row in 0..config.rows_per_array() {
        for col in 0..config.panels_per_row() {
            let cell_center = Coord {
                x: corner.x + col as f64 * (panel.x + gap.x) + panel.x / 2.0,
                y: corner.y + row as f64 * (panel.y + gap.y) + panel.y / 2.0,
            };

            let mut geometry = try_make_rectangle(cell_center, config.panel_width, adjusted_height, BASELINE_AZIMUTH, scale)?;
            if rotation.abs() > EPSILON {
                geometry = rotate_about(&geometry, center, rotation, scale);
            }

            cells.push(PanelCell {
                geometry,
                group_id: id,
                polygon_id: id.polygon,
                row,
                col,
                original_width: config.panel_width,
                original_height: config.panel_height,
                adjusted_height,
            });
        }
    }

    Ok(cells)
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn group_id_round_trip() {
        let id = GroupId { polygon: 17, index: 3 };

        assert_eq!(id.to_string(), "17-3");
        assert_eq!("17-3".parse::<GroupId>().expect("parse"), id);
        assert!("17".parse::<GroupId>().is_err());
        assert!("a-b".parse::<GroupId>().is_err());
    }

    #[test]
    fn cells_are_named_by_position() {
        let scale = meters_per_degree(0.0);
        let id = GroupId { polygon: 1, index: 0 };
        let config = LayoutConfig { panels_per_row: 2.0, rows_per_array: 2.0, ..LayoutConfig::default() };

        let cells = group_cells(id, Coord { x: 0.0, y: 0.0 }, &config, scale).expect("cells");

        assert_eq!(cells.len(), 4);
        assert_eq!(cells[3].panel_id(), "1-0-panel-1-1");
        assert!(cells.iter().all(|c| c.geometry.exterior().0.len() == 5));
    }

    #[test]
    fn cell_count_is_capped() {
        let scale = meters_per_degree(0.0);
        let id = GroupId { polygon: 1, index: 0 };
        let config = LayoutConfig { panels_per_row: 1e12, rows_per_array: 1e12, ..LayoutConfig::default() };

        let cells = group_cells(id, Coord { x: 0.0, y: 0.0 }, &config, scale);

        assert!(matches!(cells, Err(GeometryError::DegenerateConfig(_))));
    }
}
