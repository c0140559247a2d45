//! Scene model: drawable objects, detail tiers and visibility rules.

use kurbo::Point;
use serde::{Deserialize, Serialize};

/// Serializable color representation (RGBA8).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

impl Color {
    pub const fn new(r: u8, g: u8, b: u8, a: u8) -> Self {
        Self { r, g, b, a }
    }

    pub const fn black() -> Self {
        Self::new(0, 0, 0, 255)
    }

    pub const fn white() -> Self {
        Self::new(255, 255, 255, 255)
    }
}

impl From<Color> for image::Rgba<u8> {
    fn from(c: Color) -> Self {
        image::Rgba([c.r, c.g, c.b, c.a])
    }
}

/// Zoom-range visibility classification for an object.
///
/// Each tier is bound to a fixed zoom window; an object renders iff the
/// current zoom falls inside its tier's window.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DetailTier {
    Continent,
    #[default]
    Country,
    City,
}

impl DetailTier {
    /// The inclusive zoom window in which objects of this tier render.
    pub fn zoom_window(self) -> (f64, f64) {
        match self {
            DetailTier::Continent => (0.05, 0.6),
            DetailTier::Country => (0.4, 3.0),
            DetailTier::City => (1.8, 20.0),
        }
    }

    /// Whether objects of this tier are visible at the given zoom.
    pub fn visible_at(self, zoom: f64) -> bool {
        let (min, max) = self.zoom_window();
        zoom >= min && zoom <= max
    }
}

/// A polyline sampled from a pointer gesture.
///
/// Used by both freehand and eraser objects; a committed stroke always
/// carries at least two points.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Stroke {
    pub points: Vec<Point>,
    pub stroke_width: f64,
    pub color: Color,
    #[serde(default)]
    pub tier: DetailTier,
}

/// An axis-aligned rectangle defined by two opposite corners.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Rectangle {
    pub corner1: Point,
    pub corner2: Point,
    pub stroke_width: f64,
    pub color: Color,
    #[serde(default)]
    pub tier: DetailTier,
}

/// A circle defined by center and radius.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Circle {
    pub center: Point,
    pub radius: f64,
    pub stroke_width: f64,
    pub color: Color,
    #[serde(default)]
    pub tier: DetailTier,
}

/// A straight line segment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Line {
    pub start: Point,
    pub end: Point,
    pub stroke_width: f64,
    pub color: Color,
    #[serde(default)]
    pub tier: DetailTier,
}

/// Non-visual record that a flood fill occurred.
///
/// Carries no pixel data; the fill result itself is transient (see the
/// raster module).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FillMarker {
    #[serde(default)]
    pub tier: DetailTier,
    pub note: String,
}

/// Enum wrapper for all drawable object kinds (for serialization).
///
/// Matched exhaustively at the render and (de)serialization boundaries so
/// adding a kind is a compile-time-checked change.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SceneObject {
    Freehand(Stroke),
    /// Rendered with the background color rather than removed from the
    /// scene; a documented simplification, not true deletion.
    Eraser(Stroke),
    Rectangle(Rectangle),
    Circle(Circle),
    Line(Line),
    FillMarker(FillMarker),
}

impl SceneObject {
    pub fn tier(&self) -> DetailTier {
        match self {
            SceneObject::Freehand(s) => s.tier,
            SceneObject::Eraser(s) => s.tier,
            SceneObject::Rectangle(r) => r.tier,
            SceneObject::Circle(c) => c.tier,
            SceneObject::Line(l) => l.tier,
            SceneObject::FillMarker(m) => m.tier,
        }
    }

    /// Whether this object renders at the given zoom.
    pub fn visible_at(&self, zoom: f64) -> bool {
        self.tier().visible_at(zoom)
    }
}

/// The full ordered collection of persisted drawable objects.
///
/// Render order = insertion order = z-order. The sequence is only ever
/// replaced wholesale (edit commit append, undo/redo snapshot swap, sync
/// replacement), never patched.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Scene {
    objects: Vec<SceneObject>,
}

impl Scene {
    /// Create a new empty scene.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an object at the top of the z-order.
    pub fn push(&mut self, object: SceneObject) {
        self.objects.push(object);
    }

    /// Replace the entire object sequence.
    pub fn replace(&mut self, objects: Vec<SceneObject>) {
        self.objects = objects;
    }

    /// Remove all objects.
    pub fn clear(&mut self) {
        self.objects.clear();
    }

    /// All objects in z-order (back to front).
    pub fn objects(&self) -> &[SceneObject] {
        &self.objects
    }

    /// Objects visible at the given zoom, in z-order.
    pub fn visible(&self, zoom: f64) -> impl Iterator<Item = &SceneObject> {
        self.objects.iter().filter(move |o| o.visible_at(zoom))
    }

    pub fn len(&self) -> usize {
        self.objects.len()
    }

    pub fn is_empty(&self) -> bool {
        self.objects.is_empty()
    }
}
