use geo::{Coord, LineString, Polygon};
use svg::{node::element, Document};

use crate::{
    design::DesignState,
    geometry::{DegreeScale, bounding_box, meters_per_degree},
};

pub struct ViewBox {
    pub min_x: f64,
    pub min_y: f64,
    pub max_x: f64,
    pub max_y: f64,
}

impl ViewBox {
    pub fn new() -> Self {
        Self {
            min_x: f64::INFINITY,
            min_y: f64::INFINITY,
            max_x: f64::NEG_INFINITY,
            max_y: f64::NEG_INFINITY,
        }
    }

    pub fn include(&mut self, (x, y): (f64, f64)) {
        self.min_x = self.min_x.min(x);
        self.min_y = self.min_y.min(y);
        self.max_x = self.max_x.max(x);
        self.max_y = self.max_y.max(y);
    }

    pub fn add_margin(&mut self, margin: f64) {
        self.min_x -= margin;
        self.min_y -= margin;
        self.max_x += margin;
        self.max_y += margin;
    }

    pub fn get(&self) -> (f64, f64, f64, f64) {
        if self.min_x > self.max_x || self.min_y > self.max_y {
            return (0.0, 0.0, 1.0, 1.0);
        }
        (self.min_x, self.min_y, self.max_x - self.min_x, self.max_y - self.min_y)
    }
}


/// Maps lon/lat onto a flat metre grid around `origin`, with north up.
struct Projection {
    origin: Coord,
    scale: DegreeScale,
}

impl Projection {
    fn around(state: &DesignState) -> Self {
        let origin = state.polygons()
            .first()
            .and_then(|p| bounding_box(p.geometry()))
            .map(|bounds| bounds.center())
            .unwrap_or(Coord { x: 0.0, y: 0.0 });

        Self {
            origin,
            scale: meters_per_degree(origin.y),
        }
    }

    fn project(&self, c: Coord) -> (f64, f64) {
        let m = self.scale.to_meters(c - self.origin);
        (m.x, -m.y)
    }
}


fn add_ring(mut data: element::path::Data, ring: &LineString, projection: &Projection, view_box: &mut ViewBox) -> element::path::Data {
    let mut points = ring.coords().map(|&c| projection.project(c));

    let Some(p0) = points.next() else {
        return data;
    };

    data = data.move_to(p0);
    view_box.include(p0);

    for p in points {
        data = data.line_to(p);
        view_box.include(p);
    }

    data.close()
}

fn make_svg_path(polygon: &Polygon, projection: &Projection, view_box: &mut ViewBox) -> element::Path {
    let mut data = element::path::Data::new();

    for ring in std::iter::once(polygon.exterior()).chain(polygon.interiors()) {
        data = add_ring(data, ring, projection, view_box);
    }

    element::Path::new()
        .set("d", data)
        .set("vector-effect", "non-scaling-stroke")
}

fn make_svg_paths<'a>(polygons: impl Iterator<Item = &'a Polygon>, fill: &str, stroke: &str, projection: &Projection, view_box: &mut ViewBox) -> element::Group {
    let mut group = element::Group::new()
        .set("fill", fill)
        .set("fill-rule", "evenodd")
        .set("stroke", stroke)
        .set("stroke-width", 1);

    for polygon in polygons {
        group = group.add(make_svg_path(polygon, projection, view_box));
    }

    group
}


/// Render the polygons and panels of `state`, one SVG unit per metre.
pub fn make_svg(state: &DesignState) -> Document {
    let projection = Projection::around(state);
    let mut view_box = ViewBox::new();

    let polygons = make_svg_paths(
        state.polygons().iter().map(|p| p.geometry()),
        "#4774AA22",
        "#4774AAFF",
        &projection,
        &mut view_box,
    );

    let panels = make_svg_paths(
        state.panels().iter().map(|cell| &cell.geometry),
        "#F2B134FF",
        "#893566FF",
        &projection,
        &mut view_box,
    );

    view_box.add_margin(5.0);

    Document::new()
        .add(polygons)
        .add(panels)
        .set("viewBox", view_box.get())
}
