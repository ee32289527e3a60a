pub mod boolean;
pub mod config;
pub mod design;
pub mod error;
pub mod geometry;
pub mod io;
pub mod layout;
pub mod session;

#[cfg(test)]
mod tests;

use std::path::PathBuf;

use anyhow::{ensure, Context, Result};
use clap::Parser;
use config::{Action, DesignConfig, LayoutConfig};
use geo::Coord;
use log::{error, info};

use crate::{
    geometry::ring_from_points,
    io::{export::DesignSnapshot, svg_output::make_svg},
    layout::GroupId,
    session::{DrawIntent, LogSurface, MapEvent, Session},
};


#[derive(Parser)]
pub struct Args {
    /// Path to the design job.
    pub config: PathBuf,
}


fn main() {
    if let Err(_) = std::env::var("RUST_LOG") {
        unsafe { std::env::set_var("RUST_LOG", "info") };
    }

    env_logger::init();
    let args = Args::parse();
    if let Err(err) = run(args) {
        error!("{err:#}");
        std::process::exit(1);
    }
}


fn to_event(action: Action, layout: &LayoutConfig) -> Result<MapEvent> {
    Ok(match action {
        Action::Draw(points) => MapEvent::DrawComplete {
            ring: ring_from_points(&points),
            intent: DrawIntent::Add,
        },
        Action::Subtract(points) => MapEvent::DrawComplete {
            ring: ring_from_points(&points),
            intent: DrawIntent::Subtract,
        },
        Action::RemoveAt([x, y]) => MapEvent::PointClick(Coord { x, y }),
        Action::RemoveGroup(id) => MapEvent::PanelClick(id.parse::<GroupId>().with_context(|| format!("Bad group id {id:?}"))?),
        Action::Clear => MapEvent::ClearAll,
        Action::Recompute => MapEvent::RecomputeRequest(*layout),
    })
}


fn run(args: Args) -> Result<()> {
    let config: DesignConfig = serde_norway::from_reader(std::fs::File::open(&args.config)?)
        .with_context(|| format!("Reading {:?}", args.config))?;

    if !config.outdir.exists() {
        std::fs::create_dir_all(&config.outdir)?;
    }
    ensure!(config.outdir.is_dir(), "{:?} should be a directory", config.outdir);

    let name = config.name;
    let layout = config.layout;

    let events = config.actions
        .into_iter()
        .map(|action| to_event(action, &layout))
        .collect::<Result<Vec<_>>>()?;

    info!("Loaded {} actions", events.len());

    let mut session = Session::new(LogSurface::default());
    session.submit_all(events);
    session.surface_ready();

    let (state, surface) = session.into_parts();

    let snapshot = DesignSnapshot::capture(&state, layout);
    let output_path = config.outdir.join(format!("{name}.json"));
    std::fs::write(output_path, snapshot.to_json()?)?;

    info!("Exported the design");

    let document = make_svg(&state);
    let output_path = config.outdir.join(format!("{name}.svg"));
    svg::save(output_path, &document)?;

    info!("Produced the overview SVG");

    let metrics = state.metrics();
    info!(
        "{:.1} m2 of ground, {} arrays, {} panels, {:.1} kW, {} warnings",
        metrics.total_area,
        metrics.total_arrays,
        metrics.total_panels,
        metrics.estimated_capacity_kw,
        surface.warnings.len(),
    );

    Ok(())
}
