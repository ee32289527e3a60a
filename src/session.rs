use std::{collections::VecDeque, ops::{Deref, DerefMut}};

use geo::{Coord, LineString, Polygon};
use log::{debug, info, warn};

use crate::{
    config::LayoutConfig,
    design::{DesignState, GroundPolygon, Metrics},
    layout::{GroupId, PanelCell},
};

/// Whatever shows the design to the user and collects their input.
pub trait MapSurface {
    fn show_polygons(&mut self, polygons: &[GroundPolygon]);
    fn show_panels(&mut self, panels: &[PanelCell]);
    fn show_metrics(&mut self, metrics: &Metrics);
    fn set_calculating(&mut self, calculating: bool);
    fn warn(&mut self, message: &str);
}


#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DrawIntent {
    Add,
    Subtract,
}

#[derive(Clone, Debug, PartialEq)]
pub enum MapEvent {
    DrawComplete {
        ring: LineString,
        intent: DrawIntent,
    },
    PointClick(Coord),
    PanelClick(GroupId),
    RecomputeRequest(LayoutConfig),
    ClearAll,
}


/// Keeps the surface in the "calculating" state while alive.
struct Calculating<'a, S: MapSurface> {
    surface: &'a mut S,
}

impl<'a, S: MapSurface> Calculating<'a, S> {
    fn new(surface: &'a mut S) -> Self {
        surface.set_calculating(true);
        Self {
            surface,
        }
    }
}

impl<S: MapSurface> Drop for Calculating<'_, S> {
    fn drop(&mut self) {
        self.surface.set_calculating(false);
    }
}

impl<S: MapSurface> Deref for Calculating<'_, S> {
    type Target = S;

    fn deref(&self) -> &S {
        self.surface
    }
}

impl<S: MapSurface> DerefMut for Calculating<'_, S> {
    fn deref_mut(&mut self) -> &mut S {
        self.surface
    }
}


/// The single writer of a [`DesignState`].
///
/// Events are handled one at a time in arrival order. Until the surface reports
/// it is ready they are only queued. Back-to-back recompute requests collapse
/// into the last one.
pub struct Session<S: MapSurface> {
    state: DesignState,
    surface: S,
    ready: bool,
    queue: VecDeque<MapEvent>,
}

impl<S: MapSurface> Session<S> {
    pub fn new(surface: S) -> Self {
        Self {
            state: DesignState::new(),
            surface,
            ready: false,
            queue: VecDeque::new(),
        }
    }

    pub fn state(&self) -> &DesignState {
        &self.state
    }

    pub fn surface(&self) -> &S {
        &self.surface
    }

    pub fn is_ready(&self) -> bool {
        self.ready
    }

    pub fn pending(&self) -> usize {
        self.queue.len()
    }

    pub fn into_parts(self) -> (DesignState, S) {
        (self.state, self.surface)
    }

    /// Called once the surface has loaded. Everything queued so far is handled now.
    pub fn surface_ready(&mut self) {
        if !self.ready {
            info!("Map surface is ready, {} events waiting", self.queue.len());
        }
        self.ready = true;
        self.drain();
    }

    pub fn submit(&mut self, event: MapEvent) {
        self.queue.push_back(event);
        if self.ready {
            self.drain();
        }
    }

    /// Queue several events before handling any, so recompute requests among
    /// them can be coalesced.
    pub fn submit_all(&mut self, events: impl IntoIterator<Item = MapEvent>) {
        self.queue.extend(events);
        if self.ready {
            self.drain();
        }
    }

    fn drain(&mut self) {
        while let Some(event) = self.queue.pop_front() {
            let event = self.coalesce(event);
            self.handle(event);
        }
    }

    fn coalesce(&mut self, event: MapEvent) -> MapEvent {
        let MapEvent::RecomputeRequest(mut config) = event else {
            return event;
        };

        let mut skipped = 0;
        while let Some(MapEvent::RecomputeRequest(next)) = self.queue.front() {
            config = *next;
            self.queue.pop_front();
            skipped += 1;
        }

        if skipped > 0 {
            debug!("Skipped {skipped} stale recompute requests");
        }

        MapEvent::RecomputeRequest(config)
    }

    fn handle(&mut self, event: MapEvent) {
        if self.lays_out(&event) {
            let mut surface = Calculating::new(&mut self.surface);
            apply(&mut self.state, &mut *surface, event);
        } else {
            apply(&mut self.state, &mut self.surface, event);
        }

        self.surface.show_polygons(self.state.polygons());
        self.surface.show_panels(self.state.panels());
        self.surface.show_metrics(&self.state.metrics());
    }

    /// Whether handling `event` may run a layout pass.
    fn lays_out(&self, event: &MapEvent) -> bool {
        match event {
            MapEvent::RecomputeRequest(_) => true,
            MapEvent::DrawComplete { .. } | MapEvent::PointClick(_) => self.state.config().is_some(),
            MapEvent::PanelClick(_) | MapEvent::ClearAll => false,
        }
    }
}

fn apply<S: MapSurface>(state: &mut DesignState, surface: &mut S, event: MapEvent) {
    match event {
        MapEvent::DrawComplete { ring, intent: DrawIntent::Add } => {
            if let Err(err) = state.add_polygon(Polygon::new(ring, vec![])) {
                surface.warn(&format!("The area was not added: {err}"));
            }
        },
        MapEvent::DrawComplete { ring, intent: DrawIntent::Subtract } => {
            if let Err(err) = state.subtract_from_overlapping(ring) {
                surface.warn(&format!("Unable to subtract: {err}"));
            }
        },
        MapEvent::PointClick(point) => {
            if state.remove_polygon_containing(point).is_none() {
                debug!("No polygon under {point:?}");
            }
        },
        MapEvent::PanelClick(id) => {
            state.remove_panel_group(id);
        },
        MapEvent::RecomputeRequest(config) => state.recompute_layout(config),
        MapEvent::ClearAll => state.clear(),
    }
}


/// A surface for running without a map: everything goes to the log.
#[derive(Debug, Default)]
pub struct LogSurface {
    pub warnings: Vec<String>,
}

impl MapSurface for LogSurface {
    fn show_polygons(&mut self, polygons: &[GroundPolygon]) {
        debug!("{} polygons", polygons.len());
    }

    fn show_panels(&mut self, panels: &[PanelCell]) {
        debug!("{} panels", panels.len());
    }

    fn show_metrics(&mut self, metrics: &Metrics) {
        debug!("{metrics:?}");
    }

    fn set_calculating(&mut self, calculating: bool) {
        if calculating {
            debug!("Calculating...");
        }
    }

    fn warn(&mut self, message: &str) {
        warn!("{message}");
        self.warnings.push(message.to_string());
    }
}
