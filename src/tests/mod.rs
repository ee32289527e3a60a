mod subtract;

use std::path::Path;

use anyhow::{ensure, Result};
use geo::{Coord, LineString, Polygon};

use crate::{
    design::{DesignState, GroundPolygon, Metrics},
    geometry::{BASELINE_AZIMUTH, make_rectangle, meters_per_degree},
    io::svg_output::make_svg,
    layout::PanelCell,
    session::MapSurface,
};

pub const OUTDIR: &'_ str = "tmp/test-output/";

/// Somewhere in San Francisco.
pub const SITE: Coord = Coord { x: -122.42, y: 37.77 };

fn ensure_dir(dir: impl AsRef<Path>) -> Result<()> {
    let dir = dir.as_ref();
    if !dir.exists() {
        std::fs::create_dir_all(&dir)?;
    }
    ensure!(dir.is_dir(), "{dir:?} should be a directory");
    Ok(())
}

pub fn init_test_logger() {
    let _ = env_logger::builder()
        .filter_level(log::LevelFilter::Debug)
        .format_timestamp(None)
        .format_target(false)
        .is_test(true)
        .try_init();
}

/// Render the design for a look by eye.
pub fn save(name: &str, state: &DesignState) -> Result<()> {
    ensure_dir(&OUTDIR)?;

    let output = Path::new(OUTDIR).join(name).with_extension("svg");
    svg::save(output, &make_svg(state))?;

    Ok(())
}

/// `dx`, `dy` metres east and north of [`SITE`].
pub fn near_site(dx: f64, dy: f64) -> Coord {
    SITE + meters_per_degree(SITE.y).to_degrees(Coord { x: dx, y: dy })
}

/// An axis-aligned `width` x `height` metre ring around `center`.
pub fn ground_ring(center: Coord, width: f64, height: f64) -> LineString {
    let scale = meters_per_degree(center.y);
    make_rectangle(center, width, height, BASELINE_AZIMUTH, scale).into_inner().0
}

pub fn ground_square(dx: f64, dy: f64, size: f64) -> Polygon {
    Polygon::new(ground_ring(near_site(dx, dy), size, size), vec![])
}


#[derive(Debug, Default)]
pub struct RecordingSurface {
    pub calculating: Vec<bool>,
    pub warnings: Vec<String>,
    pub polygons: usize,
    pub panels: usize,
    pub metrics: Option<Metrics>,
    pub renders: usize,
}

impl MapSurface for RecordingSurface {
    fn show_polygons(&mut self, polygons: &[GroundPolygon]) {
        self.polygons = polygons.len();
        self.renders += 1;
    }

    fn show_panels(&mut self, panels: &[PanelCell]) {
        self.panels = panels.len();
    }

    fn show_metrics(&mut self, metrics: &Metrics) {
        self.metrics = Some(*metrics);
    }

    fn set_calculating(&mut self, calculating: bool) {
        self.calculating.push(calculating);
    }

    fn warn(&mut self, message: &str) {
        self.warnings.push(message.to_string());
    }
}
