use serde::{Deserialize, Serialize};

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Point {
    pub x: i32,
    pub y: i32,
}

impl Point {
    pub const fn new(x: i32, y: i32) -> Self {
        Point { x, y }
    }
}

/// Canvas placement: device-space origin, zoom factor and unscaled map size in pixels
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Viewport {
    pub origin: Point,
    pub zoom: f64,
    pub map_size: (u32, u32),
}

impl Default for Viewport {
    fn default() -> Self {
        Viewport {
            origin: Point::default(),
            zoom: 1.0,
            map_size: (0, 0),
        }
    }
}

fn scale_coord(v: i32, zoom: f64) -> i32 {
    (v as f64 * zoom + zoom / 2.0).floor() as i32
}

impl Viewport {
    pub fn new(map_size: (u32, u32)) -> Self {
        Viewport {
            map_size,
            ..Default::default()
        }
    }

    pub fn with_zoom(self, zoom: f64) -> Self {
        Viewport { zoom, ..self }
    }

    pub fn with_origin(self, origin: Point) -> Self {
        Viewport { origin, ..self }
    }

    /// `origin + floor(v * zoom + zoom / 2)` per axis
    pub fn to_device(&self, p: Point) -> Point {
        Point::new(
            self.origin.x + scale_coord(p.x, self.zoom),
            self.origin.y + scale_coord(p.y, self.zoom),
        )
    }
}

/// Map-space geometry of an item
#[derive(Clone, Debug, PartialEq)]
pub enum Geometry {
    Icon(Point),
    Polygon(Vec<Point>),
    Ellipse { center: Point, radius: i32 },
}

/// Device-space shape, relative to the item's anchor
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Placement {
    Icon,
    Polygon { points: Vec<Point> },
    Ellipse { width: i32, height: i32 },
}

#[derive(Clone, Debug, PartialEq)]
pub struct RenderItem {
    pub label: String,
    pub geometry: Geometry,
    anchor: Point,
    placement: Placement,
}

impl RenderItem {
    pub fn new(label: impl Into<String>, geometry: Geometry) -> Self {
        let mut item = RenderItem {
            label: label.into(),
            geometry,
            anchor: Point::default(),
            placement: Placement::Icon,
        };
        item.update(&Viewport::default());
        item
    }

    /// Device-space anchor: the icon position or the top-left of the shape's bounding box
    pub fn anchor(&self) -> Point {
        self.anchor
    }

    pub fn placement(&self) -> &Placement {
        &self.placement
    }

    /// Map-space point the item is attached to
    pub fn map_location(&self) -> Point {
        match &self.geometry {
            Geometry::Icon(p) => *p,
            Geometry::Polygon(points) => Point::new(
                points.iter().map(|p| p.x).min().unwrap_or(0),
                points.iter().map(|p| p.y).min().unwrap_or(0),
            ),
            Geometry::Ellipse { center, .. } => *center,
        }
    }

    pub fn update(&mut self, viewport: &Viewport) {
        match &self.geometry {
            Geometry::Icon(p) => {
                self.anchor = viewport.to_device(*p);
                self.placement = Placement::Icon;
            }
            Geometry::Polygon(points) => {
                let device: Vec<Point> = points.iter().map(|&p| viewport.to_device(p)).collect();
                let left = device.iter().map(|p| p.x).min().unwrap_or(0);
                let top = device.iter().map(|p| p.y).min().unwrap_or(0);
                self.anchor = Point::new(left, top);
                self.placement = Placement::Polygon {
                    points: device
                        .into_iter()
                        .map(|p| Point::new(p.x - left, p.y - top))
                        .collect(),
                };
            }
            Geometry::Ellipse { center, radius } => {
                let top_left = viewport.to_device(Point::new(center.x - radius, center.y - radius));
                let bottom_right = viewport.to_device(Point::new(center.x + radius, center.y + radius));
                self.anchor = top_left;
                self.placement = Placement::Ellipse {
                    width: bottom_right.x - top_left.x,
                    height: bottom_right.y - top_left.y,
                };
            }
        }
    }
}
