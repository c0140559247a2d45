//! Camera module for pan/zoom transforms.

use kurbo::{Point, Size, Vec2};
use serde::{Deserialize, Serialize};

/// Minimum allowed zoom level.
pub const MIN_ZOOM: f64 = 0.04;
/// Maximum allowed zoom level.
pub const MAX_ZOOM: f64 = 30.0;
/// Multiplicative zoom change per wheel notch (12%).
pub const ZOOM_STEP: f64 = 0.12;

/// Camera manages the view transform for the canvas.
///
/// `pan` is the world-space coordinate that sits at the viewport center;
/// screen coordinates are derived from it and the zoom level. Panning and
/// zooming are permitted in any role, including viewer mode.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Camera {
    /// World-space offset of the viewport center.
    pub pan: Vec2,
    /// Current zoom level, always within [`MIN_ZOOM`, `MAX_ZOOM`].
    pub zoom: f64,
    /// Viewport size in screen pixels.
    pub viewport: Size,
}

impl Default for Camera {
    fn default() -> Self {
        Self {
            pan: Vec2::ZERO,
            zoom: 1.0,
            viewport: Size::new(800.0, 600.0),
        }
    }
}

impl Camera {
    /// Create a new camera with default settings.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the viewport size.
    pub fn set_viewport(&mut self, width: f64, height: f64) {
        self.viewport = Size::new(width, height);
    }

    /// Convert a world point to screen coordinates.
    pub fn world_to_screen(&self, world: Point) -> Point {
        Point::new(
            (world.x - self.pan.x) * self.zoom + self.viewport.width / 2.0,
            (world.y - self.pan.y) * self.zoom + self.viewport.height / 2.0,
        )
    }

    /// Convert a screen point to world coordinates.
    pub fn screen_to_world(&self, screen: Point) -> Point {
        Point::new(
            (screen.x - self.viewport.width / 2.0) / self.zoom + self.pan.x,
            (screen.y - self.viewport.height / 2.0) / self.zoom + self.pan.y,
        )
    }

    /// Pan the camera by a drag delta in screen coordinates.
    ///
    /// The delta is converted to world units at the current zoom and
    /// subtracted, so dragging right moves the camera left in world space.
    pub fn pan_by(&mut self, screen_delta: Vec2) {
        self.pan -= screen_delta / self.zoom;
    }

    /// Apply a wheel zoom of the given signed notch count, keeping the world
    /// point under `cursor` visually fixed.
    ///
    /// The anchor correction runs unconditionally at the clamped zoom, so the
    /// rule holds at the zoom bounds as well (where it degenerates to a no-op
    /// because the world point under the cursor has not moved).
    pub fn wheel_zoom(&mut self, cursor: Point, notches: f64) {
        let before = self.screen_to_world(cursor);

        let factor = (1.0 + ZOOM_STEP).powf(notches);
        self.zoom = (self.zoom * factor).clamp(MIN_ZOOM, MAX_ZOOM);

        let after = self.screen_to_world(cursor);
        self.pan += before - after;
    }

    /// Reset camera to the default position and zoom.
    pub fn reset(&mut self) {
        self.pan = Vec2::ZERO;
        self.zoom = 1.0;
    }
}
