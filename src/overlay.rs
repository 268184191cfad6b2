//! Rasterise item descriptors onto an exported map bitmap.
//!
//! Polygons and ellipses are drawn as outlines; icons as small filled markers.

use image::{Rgba, RgbaImage};

use crate::layer::{ItemDescriptor, LayerKind, Placement, Point};

const ICON_RADIUS: u32 = 4;

fn layer_colour(kind: LayerKind) -> Rgba<u8> {
    match kind {
        LayerKind::Actor => Rgba([255, 64, 64, 255]),
        LayerKind::Region => Rgba([255, 160, 0, 255]),
        LayerKind::Entrance => Rgba([64, 255, 64, 255]),
        LayerKind::Container => Rgba([0, 192, 255, 255]),
        LayerKind::Ambient => Rgba([160, 96, 255, 255]),
        LayerKind::Door => Rgba([255, 255, 0, 255]),
        LayerKind::Animation => Rgba([255, 128, 192, 255]),
        LayerKind::AutomapNote => Rgba([255, 255, 255, 255]),
        LayerKind::SpawnPoint => Rgba([192, 0, 0, 255]),
        LayerKind::Transition => Rgba([0, 255, 192, 255]),
        LayerKind::ProjectileTrap => Rgba([255, 96, 0, 255]),
        LayerKind::DoorPolygon => Rgba([128, 128, 255, 255]),
        LayerKind::WallPolygon => Rgba([0, 96, 255, 255]),
    }
}

/// Draw every descriptor in order. Returns the number of items drawn.
pub fn draw_items(canvas: &mut RgbaImage, items: &[ItemDescriptor]) -> usize {
    for item in items {
        let colour = layer_colour(item.kind);
        let anchor = item.anchor;
        match &item.shape {
            Placement::Icon => draw_circle(canvas, anchor.x, anchor.y, ICON_RADIUS, colour),
            Placement::Polygon { points } => {
                let absolute: Vec<Point> = points
                    .iter()
                    .map(|p| Point::new(anchor.x + p.x, anchor.y + p.y))
                    .collect();
                draw_polygon(canvas, &absolute, colour);
            }
            Placement::Ellipse { width, height } => {
                draw_ellipse(canvas, anchor, *width, *height, colour);
            }
        }
    }
    items.len()
}

fn put(img: &mut RgbaImage, x: i32, y: i32, color: Rgba<u8>) {
    if x >= 0 && y >= 0 && (x as u32) < img.width() && (y as u32) < img.height() {
        img.put_pixel(x as u32, y as u32, color);
    }
}

fn draw_line(img: &mut RgbaImage, from: Point, to: Point, color: Rgba<u8>) {
    let (mut x, mut y) = (from.x, from.y);
    let dx = (to.x - from.x).abs();
    let dy = -(to.y - from.y).abs();
    let sx = if from.x < to.x { 1 } else { -1 };
    let sy = if from.y < to.y { 1 } else { -1 };
    let mut err = dx + dy;
    loop {
        put(img, x, y, color);
        if x == to.x && y == to.y {
            break;
        }
        let e2 = 2 * err;
        if e2 >= dy {
            err += dy;
            x += sx;
        }
        if e2 <= dx {
            err += dx;
            y += sy;
        }
    }
}

fn draw_polygon(img: &mut RgbaImage, points: &[Point], color: Rgba<u8>) {
    match points {
        [] => {}
        [single] => put(img, single.x, single.y, color),
        _ => {
            for (i, &from) in points.iter().enumerate() {
                let to = points[(i + 1) % points.len()];
                draw_line(img, from, to, color);
            }
        }
    }
}

fn draw_ellipse(img: &mut RgbaImage, top_left: Point, width: i32, height: i32, color: Rgba<u8>) {
    let rx = width as f64 / 2.0;
    let ry = height as f64 / 2.0;
    let cx = top_left.x as f64 + rx;
    let cy = top_left.y as f64 + ry;
    let steps = ((rx + ry) * 4.0).ceil().max(8.0) as u32;
    for step in 0..steps {
        let angle = step as f64 / steps as f64 * std::f64::consts::TAU;
        let x = (cx + rx * angle.cos()).round() as i32;
        let y = (cy + ry * angle.sin()).round() as i32;
        put(img, x, y, color);
    }
}

fn draw_circle(img: &mut RgbaImage, cx: i32, cy: i32, radius: u32, color: Rgba<u8>) {
    let r = radius as i32;
    let r_sq = r * r;
    for y_offset in -r..=r {
        for x_offset in -r..=r {
            if x_offset * x_offset + y_offset * y_offset <= r_sq {
                put(img, cx + x_offset, cy + y_offset, color);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn descriptor(kind: LayerKind, anchor: Point, shape: Placement) -> ItemDescriptor {
        ItemDescriptor {
            kind,
            label: String::new(),
            anchor,
            shape,
            animation: None,
        }
    }

    #[test]
    fn polygon_outline_is_closed() {
        let mut canvas = RgbaImage::new(32, 32);
        let square = descriptor(
            LayerKind::WallPolygon,
            Point::new(4, 4),
            Placement::Polygon {
                points: vec![Point::new(0, 0), Point::new(10, 0), Point::new(10, 10), Point::new(0, 10)],
            },
        );
        assert_eq!(draw_items(&mut canvas, &[square]), 1);
        let colour = layer_colour(LayerKind::WallPolygon);
        assert_eq!(*canvas.get_pixel(9, 4), colour);
        assert_eq!(*canvas.get_pixel(4, 9), colour);
        assert_eq!(*canvas.get_pixel(14, 14), colour);
        assert_eq!(canvas.get_pixel(9, 9).0[3], 0);
    }

    #[test]
    fn icons_and_ellipses_clip_at_edges() {
        let mut canvas = RgbaImage::new(16, 16);
        let items = [
            descriptor(LayerKind::Actor, Point::new(0, 0), Placement::Icon),
            descriptor(
                LayerKind::Ambient,
                Point::new(-8, 4),
                Placement::Ellipse { width: 40, height: 8 },
            ),
        ];
        draw_items(&mut canvas, &items);
        assert_eq!(*canvas.get_pixel(0, 0), layer_colour(LayerKind::Actor));
        assert_eq!(*canvas.get_pixel(12, 4), layer_colour(LayerKind::Ambient));
    }
}
