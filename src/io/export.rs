use anyhow::Result;
use chrono::{DateTime, Utc};
use geo::Polygon;
use serde::Serialize;

use crate::{
    config::LayoutConfig,
    design::{DesignState, GroundPolygon, Metrics},
    geometry::ring_to_points,
    layout::PanelCell,
};

#[derive(Debug, Serialize)]
pub struct Feature<P> {
    #[serde(rename = "type")]
    pub kind: &'static str,
    pub properties: P,
    pub geometry: FeatureGeometry,
}

/// A GeoJSON polygon: the outer ring first, then the holes.
#[derive(Debug, Serialize)]
pub struct FeatureGeometry {
    #[serde(rename = "type")]
    pub kind: &'static str,
    pub coordinates: Vec<Vec<[f64; 2]>>,
}

impl From<&Polygon> for FeatureGeometry {
    fn from(polygon: &Polygon) -> Self {
        let coordinates = std::iter::once(polygon.exterior())
            .chain(polygon.interiors())
            .map(ring_to_points)
            .collect();

        Self {
            kind: "Polygon",
            coordinates,
        }
    }
}

fn feature<P>(properties: P, geometry: &Polygon) -> Feature<P> {
    Feature {
        kind: "Feature",
        properties,
        geometry: geometry.into(),
    }
}


#[derive(Debug, Serialize)]
pub struct PolygonProperties {
    pub id: u64,
    pub area: f64,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PanelProperties {
    pub group_id: String,
    pub panel_id: String,
    pub polygon_id: u64,
    pub row: usize,
    pub col: usize,
    pub original_width: f64,
    pub original_height: f64,
    pub adjusted_height: f64,
}

impl From<&GroundPolygon> for Feature<PolygonProperties> {
    fn from(polygon: &GroundPolygon) -> Self {
        let properties = PolygonProperties {
            id: polygon.id(),
            area: polygon.area(),
        };
        feature(properties, polygon.geometry())
    }
}

impl From<&PanelCell> for Feature<PanelProperties> {
    fn from(cell: &PanelCell) -> Self {
        let properties = PanelProperties {
            group_id: cell.group_id.to_string(),
            panel_id: cell.panel_id(),
            polygon_id: cell.polygon_id,
            row: cell.row,
            col: cell.col,
            original_width: cell.original_width,
            original_height: cell.original_height,
            adjusted_height: cell.adjusted_height,
        };
        feature(properties, &cell.geometry)
    }
}


/// A one-shot record of a design. It can't be loaded back.
#[derive(Debug, Serialize)]
pub struct DesignSnapshot {
    pub timestamp: DateTime<Utc>,
    pub polygons: Vec<Feature<PolygonProperties>>,
    pub panels: Vec<Feature<PanelProperties>>,
    pub settings: LayoutConfig,
    pub results: Metrics,
}

impl DesignSnapshot {
    /// `settings` is only used when the design was never laid out.
    pub fn capture(state: &DesignState, settings: LayoutConfig) -> Self {
        Self {
            timestamp: Utc::now(),
            polygons: state.polygons().iter().map(Feature::from).collect(),
            panels: state.panels().iter().map(Feature::from).collect(),
            settings: state.config().copied().unwrap_or(settings),
            results: state.metrics(),
        }
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}


#[cfg(test)]
mod tests {
    use geo::polygon;

    use super::*;

    #[test]
    fn holes_follow_the_outer_ring() {
        let polygon = polygon!(
            exterior: [(x: 0.0, y: 0.0), (x: 4.0, y: 0.0), (x: 4.0, y: 4.0), (x: 0.0, y: 4.0)],
            interiors: [[(x: 1.0, y: 1.0), (x: 1.0, y: 2.0), (x: 2.0, y: 2.0), (x: 2.0, y: 1.0)]],
        );

        let geometry = FeatureGeometry::from(&polygon);

        assert_eq!(geometry.kind, "Polygon");
        assert_eq!(geometry.coordinates.len(), 2);
        assert_eq!(geometry.coordinates[0][2], [4.0, 4.0]);
        assert_eq!(geometry.coordinates[1][0], [1.0, 1.0]);
    }

    #[test]
    fn empty_design() -> Result<()> {
        let snapshot = DesignSnapshot::capture(&DesignState::new(), LayoutConfig::default());
        let json: serde_json::Value = serde_json::from_str(&snapshot.to_json()?)?;

        assert_eq!(json["polygons"].as_array().map(Vec::len), Some(0));
        assert_eq!(json["settings"]["panelsPerRow"], 4.0);
        assert_eq!(json["results"]["totalPanels"], 0);
        assert_eq!(json["results"]["estimatedCapacityKW"], 0.0);
        assert!(json["timestamp"].as_str().is_some_and(|t| DateTime::parse_from_rfc3339(t).is_ok()));

        Ok(())
    }
}
