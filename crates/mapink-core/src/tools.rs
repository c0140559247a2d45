//! Tool system and the per-gesture draft state machine.

use crate::scene::{Circle, Color, DetailTier, Line, Rectangle, SceneObject, Stroke};
use kurbo::Point;
use serde::{Deserialize, Serialize};

/// Available tools.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum ToolKind {
    /// Camera navigation; the only tool usable in viewer mode.
    #[default]
    Pan,
    Freehand,
    Eraser,
    Rectangle,
    Circle,
    Line,
    Fill,
}

impl ToolKind {
    /// Whether a press with this tool starts a draft gesture.
    pub fn is_drawing_tool(self) -> bool {
        !matches!(self, ToolKind::Pan | ToolKind::Fill)
    }
}

/// Style applied to newly drafted objects.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BrushStyle {
    pub stroke_width: f64,
    pub color: Color,
    pub tier: DetailTier,
}

impl Default for BrushStyle {
    fn default() -> Self {
        Self {
            stroke_width: 3.0,
            color: Color::black(),
            tier: DetailTier::default(),
        }
    }
}

/// State of the draft gesture.
#[derive(Debug, Clone, Default)]
pub enum DraftState {
    /// No gesture in progress.
    #[default]
    Idle,
    /// A gesture is in progress.
    Drafting {
        /// Anchor point fixed at gesture start (shape tools).
        anchor: Point,
        /// Latest sampled world position.
        current: Point,
    },
}

/// Per-gesture finite state machine producing at most one in-progress object.
///
/// The draft lives outside the scene until committed; the controller decides
/// when `begin` may run (editor role, non-pan tool, no pan modifier held).
#[derive(Debug, Clone, Default)]
pub struct DraftEditor {
    /// Currently selected tool.
    pub tool: ToolKind,
    /// Current gesture state.
    state: DraftState,
    /// Sampled world points for freehand/eraser gestures.
    points: Vec<Point>,
    /// Style for new objects.
    pub style: BrushStyle,
}

impl DraftEditor {
    /// Create a new draft editor with the default tool and style.
    pub fn new() -> Self {
        Self::default()
    }

    /// Select a tool, abandoning any gesture in progress.
    pub fn set_tool(&mut self, tool: ToolKind) {
        self.tool = tool;
        self.state = DraftState::Idle;
        self.points.clear();
    }

    /// Check if a gesture is in progress.
    pub fn is_drafting(&self) -> bool {
        matches!(self.state, DraftState::Drafting { .. })
    }

    /// Begin a gesture at a world point.
    ///
    /// A press while already drafting is ignored, so at most one draft
    /// exists at a time.
    pub fn begin(&mut self, world: Point) {
        if self.is_drafting() || !self.tool.is_drawing_tool() {
            return;
        }

        if matches!(self.tool, ToolKind::Freehand | ToolKind::Eraser) {
            self.points.clear();
            self.points.push(world);
        }

        self.state = DraftState::Drafting {
            anchor: world,
            current: world,
        };
    }

    /// Update the gesture with a newly sampled world point.
    ///
    /// Freehand tools append every sampled point without decimation; shape
    /// tools keep the anchor fixed and move the second coordinate.
    pub fn update(&mut self, world: Point) {
        if let DraftState::Drafting { current, .. } = &mut self.state {
            *current = world;
            if matches!(self.tool, ToolKind::Freehand | ToolKind::Eraser) {
                self.points.push(world);
            }
        }
    }

    /// End the gesture and return the object to commit, if any.
    ///
    /// The release itself does not sample a point; only press and move
    /// events do. Freehand/eraser drafts with fewer than two sampled points
    /// are discarded; shape drafts are produced unconditionally, degenerate
    /// (zero-size) ones included.
    pub fn finish(&mut self) -> Option<SceneObject> {
        let DraftState::Drafting { anchor, current } = self.state else {
            return None;
        };

        let object = self.build_object(anchor, current);
        self.state = DraftState::Idle;
        self.points.clear();
        object
    }

    /// The in-flight draft as it would render right now, if any.
    pub fn preview(&self) -> Option<SceneObject> {
        let DraftState::Drafting { anchor, current } = self.state else {
            return None;
        };
        self.build_object(anchor, current)
    }

    fn build_object(&self, anchor: Point, current: Point) -> Option<SceneObject> {
        let style = &self.style;
        match self.tool {
            ToolKind::Freehand | ToolKind::Eraser => {
                if self.points.len() < 2 {
                    return None;
                }
                let stroke = Stroke {
                    points: self.points.clone(),
                    stroke_width: style.stroke_width,
                    color: style.color,
                    tier: style.tier,
                };
                Some(match self.tool {
                    ToolKind::Eraser => SceneObject::Eraser(stroke),
                    _ => SceneObject::Freehand(stroke),
                })
            }
            ToolKind::Rectangle => Some(SceneObject::Rectangle(Rectangle {
                corner1: anchor,
                corner2: current,
                stroke_width: style.stroke_width,
                color: style.color,
                tier: style.tier,
            })),
            ToolKind::Circle => Some(SceneObject::Circle(Circle {
                center: anchor,
                radius: anchor.distance(current),
                stroke_width: style.stroke_width,
                color: style.color,
                tier: style.tier,
            })),
            ToolKind::Line => Some(SceneObject::Line(Line {
                start: anchor,
                end: current,
                stroke_width: style.stroke_width,
                color: style.color,
                tier: style.tier,
            })),
            ToolKind::Pan | ToolKind::Fill => None,
        }
    }
}
