//! Software render pass and the raster flood fill.
//!
//! The renderer projects the scene through the camera into an RGBA8 pixel
//! buffer without anti-aliasing, so every pixel carries one of the exact
//! colors that were drawn. That exactness is what makes the flood fill's
//! exact-match rule meaningful.
//!
//! The flood fill operates on this rendered buffer, not on the vector model:
//! its result is visually correct only until the next full re-render, undo,
//! or sync replacement. This is a deliberate, documented limitation; true
//! persisted fills would need a raster compositing layer or filled-polygon
//! reconstruction.

use crate::camera::Camera;
use crate::scene::{Color, Scene, SceneObject, Stroke};
use image::{Rgba, RgbaImage};
use kurbo::Point;

/// Render the scene (and the in-flight draft, if any) into a fresh pixel
/// buffer sized to the camera viewport.
///
/// Objects draw in insertion order, tier-filtered by the current zoom; the
/// draft draws last, on top. Eraser strokes draw with the background color.
pub fn render(
    scene: &Scene,
    draft: Option<&SceneObject>,
    camera: &Camera,
    background: Color,
) -> RgbaImage {
    let width = camera.viewport.width.max(1.0) as u32;
    let height = camera.viewport.height.max(1.0) as u32;
    let mut frame = RgbaImage::from_pixel(width, height, background.into());

    for object in scene.visible(camera.zoom) {
        draw_object(&mut frame, object, camera, background);
    }
    if let Some(object) = draft {
        draw_object(&mut frame, object, camera, background);
    }

    frame
}

/// Flood the 4-connected region of pixels exactly matching the color under
/// `(x, y)` with `fill`, using an explicit stack.
///
/// Returns whether any pixel changed: no-op (false) when the seed lies
/// outside the buffer or the target color already equals the fill color
/// (idempotence).
pub fn flood_fill(frame: &mut RgbaImage, x: u32, y: u32, fill: Color) -> bool {
    let (width, height) = frame.dimensions();
    if x >= width || y >= height {
        return false;
    }

    let fill: Rgba<u8> = fill.into();
    let target = *frame.get_pixel(x, y);
    if target == fill {
        return false;
    }

    let mut stack = vec![(x, y)];
    while let Some((px, py)) = stack.pop() {
        if *frame.get_pixel(px, py) != target {
            continue;
        }
        frame.put_pixel(px, py, fill);

        if px > 0 {
            stack.push((px - 1, py));
        }
        if px + 1 < width {
            stack.push((px + 1, py));
        }
        if py > 0 {
            stack.push((px, py - 1));
        }
        if py + 1 < height {
            stack.push((px, py + 1));
        }
    }

    true
}

fn draw_object(frame: &mut RgbaImage, object: &SceneObject, camera: &Camera, background: Color) {
    match object {
        SceneObject::Freehand(stroke) => draw_stroke(frame, stroke, camera, stroke.color),
        // Not true deletion: erasure paints over with the background color.
        SceneObject::Eraser(stroke) => draw_stroke(frame, stroke, camera, background),
        SceneObject::Rectangle(rect) => {
            let c1 = camera.world_to_screen(rect.corner1);
            let c2 = camera.world_to_screen(rect.corner2);
            let corners = [
                c1,
                Point::new(c2.x, c1.y),
                c2,
                Point::new(c1.x, c2.y),
                c1,
            ];
            for pair in corners.windows(2) {
                draw_segment(frame, pair[0], pair[1], rect.stroke_width, rect.color);
            }
        }
        SceneObject::Circle(circle) => {
            let center = camera.world_to_screen(circle.center);
            let radius = circle.radius * camera.zoom;
            draw_circle_outline(frame, center, radius, circle.stroke_width, circle.color);
        }
        SceneObject::Line(line) => {
            let a = camera.world_to_screen(line.start);
            let b = camera.world_to_screen(line.end);
            draw_segment(frame, a, b, line.stroke_width, line.color);
        }
        // Bookkeeping only, nothing to draw.
        SceneObject::FillMarker(_) => {}
    }
}

fn draw_stroke(frame: &mut RgbaImage, stroke: &Stroke, camera: &Camera, color: Color) {
    for pair in stroke.points.windows(2) {
        let a = camera.world_to_screen(pair[0]);
        let b = camera.world_to_screen(pair[1]);
        draw_segment(frame, a, b, stroke.stroke_width, color);
    }
}

/// Draw a screen-space segment by stamping discs along it at sub-pixel
/// spacing. Hard edges, no anti-aliasing.
fn draw_segment(frame: &mut RgbaImage, a: Point, b: Point, stroke_width: f64, color: Color) {
    let radius = (stroke_width / 2.0).max(0.5);
    let length = a.distance(b);
    let steps = (length * 2.0).ceil().max(1.0) as usize;

    for i in 0..=steps {
        let t = i as f64 / steps as f64;
        let p = Point::new(a.x + (b.x - a.x) * t, a.y + (b.y - a.y) * t);
        stamp_disc(frame, p, radius, color);
    }
}

fn draw_circle_outline(
    frame: &mut RgbaImage,
    center: Point,
    radius: f64,
    stroke_width: f64,
    color: Color,
) {
    if radius <= 0.0 {
        stamp_disc(frame, center, (stroke_width / 2.0).max(0.5), color);
        return;
    }

    let circumference = std::f64::consts::TAU * radius;
    let steps = (circumference * 2.0).ceil().max(8.0) as usize;
    for i in 0..steps {
        let angle = std::f64::consts::TAU * i as f64 / steps as f64;
        let p = Point::new(
            center.x + radius * angle.cos(),
            center.y + radius * angle.sin(),
        );
        stamp_disc(frame, p, (stroke_width / 2.0).max(0.5), color);
    }
}

fn stamp_disc(frame: &mut RgbaImage, center: Point, radius: f64, color: Color) {
    let (width, height) = frame.dimensions();
    let color: Rgba<u8> = color.into();

    let min_x = (center.x - radius).floor() as i64;
    let max_x = (center.x + radius).ceil() as i64;
    let min_y = (center.y - radius).floor() as i64;
    let max_y = (center.y + radius).ceil() as i64;

    for py in min_y..=max_y {
        for px in min_x..=max_x {
            if px < 0 || py < 0 || px >= width as i64 || py >= height as i64 {
                continue;
            }
            let dx = px as f64 + 0.5 - center.x;
            let dy = py as f64 + 0.5 - center.y;
            if dx * dx + dy * dy <= radius * radius {
                frame.put_pixel(px as u32, py as u32, color);
            }
        }
    }
}
