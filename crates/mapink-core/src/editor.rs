//! The application context: one controller owning camera, scene, history,
//! gate and draft, with an event handler per input kind.
//!
//! Every handler runs to completion on the single event-processing context;
//! the sync client's events are drained here too, so scene and history never
//! observe a partially-applied mutation.

use crate::camera::Camera;
use crate::gate::AdminGate;
use crate::history::History;
use crate::persist::{PersistError, StateEndpoint};
use crate::raster;
use crate::scene::{Color, FillMarker, Scene, SceneObject};
use crate::sync::{StateSnapshot, SyncClient, SyncEvent};
use crate::tools::{DraftEditor, ToolKind};
use image::RgbaImage;
use kurbo::{Point, Vec2};

/// What a press event resolved to, for the caller to act on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PressOutcome {
    /// Start a camera drag; always available, including in viewer mode.
    Pan,
    /// A draft gesture began.
    DraftStarted,
    /// The fill tool fired; see [`Editor::fill_at`].
    FillApplied,
    /// Nothing happened (viewer role, or a press while already drafting).
    Ignored,
}

/// The annotation editor session.
pub struct Editor {
    pub scene: Scene,
    pub camera: Camera,
    pub history: History,
    pub gate: AdminGate,
    pub draft: DraftEditor,
    /// Canvas background; also what eraser strokes paint with.
    pub background: Color,
    /// Version of the last applied remote snapshot or accepted save.
    remote_version: u64,
    /// Human-readable status of the last persistence attempt.
    status: Option<String>,
}

impl Default for Editor {
    fn default() -> Self {
        Self::new()
    }
}

impl Editor {
    /// Create a fresh session: empty scene, default camera, viewer role.
    pub fn new() -> Self {
        Self {
            scene: Scene::new(),
            camera: Camera::new(),
            history: History::new(),
            gate: AdminGate::new(),
            draft: DraftEditor::new(),
            background: Color::white(),
            remote_version: 0,
            status: None,
        }
    }

    /// Version of the most recently applied snapshot.
    pub fn remote_version(&self) -> u64 {
        self.remote_version
    }

    /// Status text from the last persistence attempt, if any.
    pub fn status(&self) -> Option<&str> {
        self.status.as_deref()
    }

    // --- Pointer handlers ---

    /// Handle a press at a screen position.
    ///
    /// Pan wins whenever the pan tool is active or a panning modifier is
    /// held; otherwise the press is an edit and must pass the gate. Fill
    /// fires immediately on press; drawing tools start a draft.
    pub fn pointer_pressed(&mut self, screen: Point, pan_modifier: bool) -> PressOutcome {
        if self.draft.tool == ToolKind::Pan || pan_modifier {
            return PressOutcome::Pan;
        }
        if !self.gate.is_editor() {
            // Permission boundary, not an error.
            return PressOutcome::Ignored;
        }
        if self.draft.tool == ToolKind::Fill {
            return match self.fill_at(screen) {
                Some(_) => PressOutcome::FillApplied,
                None => PressOutcome::Ignored,
            };
        }
        if self.draft.is_drafting() {
            return PressOutcome::Ignored;
        }

        self.draft.begin(self.camera.screen_to_world(screen));
        PressOutcome::DraftStarted
    }

    /// Handle a pointer move while a draft gesture is in progress.
    pub fn pointer_moved(&mut self, screen: Point) {
        if self.draft.is_drafting() {
            self.draft.update(self.camera.screen_to_world(screen));
        }
    }

    /// Handle release: end the gesture and commit its object, if any.
    ///
    /// The history snapshot is taken before the scene mutation. Returns
    /// whether an object was committed.
    pub fn pointer_released(&mut self) -> bool {
        let Some(object) = self.draft.finish() else {
            return false;
        };
        // The gate may have been demoted mid-gesture; the commit is then a
        // silent no-op and the draft is dropped.
        if !self.gate.is_editor() {
            return false;
        }

        self.commit(object);
        true
    }

    /// Handle a camera drag delta in screen coordinates. Any role.
    pub fn pan_dragged(&mut self, screen_delta: Vec2) {
        self.camera.pan_by(screen_delta);
    }

    /// Handle a wheel event over the canvas. Any role.
    pub fn wheel(&mut self, cursor: Point, notches: f64) {
        self.camera.wheel_zoom(cursor, notches);
    }

    // --- Mutating operations (gated) ---

    /// Undo the last mutation. Silent no-op for viewers or an empty stack.
    pub fn undo(&mut self) -> bool {
        if !self.gate.is_editor() {
            return false;
        }
        self.history.undo(&mut self.scene)
    }

    /// Redo the last undone mutation. Silent no-op for viewers or an empty
    /// stack.
    pub fn redo(&mut self) -> bool {
        if !self.gate.is_editor() {
            return false;
        }
        self.history.redo(&mut self.scene)
    }

    /// Clear the scene. The caller is responsible for user confirmation.
    pub fn clear_scene(&mut self) -> bool {
        if !self.gate.is_editor() {
            return false;
        }
        self.history.record(&self.scene);
        self.scene.clear();
        true
    }

    /// Flood fill at a screen position, over the freshly rendered frame.
    ///
    /// Returns the mutated frame for display, or `None` on any silent no-op
    /// (viewer role, click outside the viewport, or target color already
    /// equal to the fill color). On success a [`FillMarker`] is committed
    /// through the normal path; the pixel result itself stays transient and
    /// is lost on the next full re-render, undo, or sync replacement.
    pub fn fill_at(&mut self, screen: Point) -> Option<RgbaImage> {
        if !self.gate.is_editor() {
            return None;
        }
        if screen.x < 0.0
            || screen.y < 0.0
            || screen.x >= self.camera.viewport.width
            || screen.y >= self.camera.viewport.height
        {
            return None;
        }

        let mut frame = self.render_frame();
        if !raster::flood_fill(&mut frame, screen.x as u32, screen.y as u32, self.draft.style.color)
        {
            return None;
        }

        self.commit(SceneObject::FillMarker(FillMarker {
            tier: self.draft.style.tier,
            note: "transient raster fill".to_string(),
        }));
        Some(frame)
    }

    /// Render the scene plus the in-flight draft at the current camera view.
    pub fn render_frame(&self) -> RgbaImage {
        raster::render(
            &self.scene,
            self.draft.preview().as_ref(),
            &self.camera,
            self.background,
        )
    }

    fn commit(&mut self, object: SceneObject) {
        self.history.record(&self.scene);
        self.scene.push(object);
    }

    // --- Synchronization ---

    /// Replace the scene wholesale with an inbound snapshot.
    ///
    /// Last received wins: no merge, no conflict detection; unsynced local
    /// mutations are discarded. The in-flight draft lives outside the scene
    /// and survives, but stages against the new base from here on — a known
    /// edge case, left as-is by design.
    pub fn apply_remote_state(&mut self, snapshot: StateSnapshot) {
        self.remote_version = snapshot.version;
        self.scene.replace(snapshot.objects);
    }

    /// Drain pending sync events, applying state snapshots in order.
    pub fn drain_sync(&mut self, client: &mut SyncClient) {
        for event in client.poll_events() {
            match event {
                SyncEvent::State(snapshot) => self.apply_remote_state(snapshot),
                SyncEvent::Connected => log::info!("sync channel connected"),
                SyncEvent::Disconnected => log::info!("sync channel lost, retrying"),
            }
        }
    }

    // --- Persistence ---

    /// Persist the scene through the endpoint.
    ///
    /// A rejected call demotes the gate back to viewer and leaves the scene
    /// untouched (edits remain local and unsaved); a success confirms the
    /// optimistic grant. Either way a textual status is surfaced.
    pub fn persist_scene<E: StateEndpoint>(
        &mut self,
        endpoint: &E,
        credential: &str,
    ) -> Result<u64, PersistError> {
        if !self.gate.is_editor() {
            return Err(PersistError::Rejected { status: 0 });
        }

        match endpoint.save_state(self.scene.objects(), credential) {
            Ok(version) => {
                self.gate.confirm();
                self.remote_version = version;
                self.status = Some(format!("saved (v{})", version));
                Ok(version)
            }
            Err(PersistError::Rejected { status }) => {
                self.gate.demote();
                self.status = Some(format!("save rejected ({}), demoted to viewer", status));
                Err(PersistError::Rejected { status })
            }
            Err(e) => {
                // Transport and decode failures are not credential verdicts;
                // the grant stands, unverified.
                self.status = Some(format!("save failed: {}", e));
                Err(e)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scene::{DetailTier, Line};

    const CENTER: Point = Point::new(400.0, 300.0);

    struct AcceptingEndpoint;
    impl StateEndpoint for AcceptingEndpoint {
        fn save_state(&self, _: &[SceneObject], _: &str) -> Result<u64, PersistError> {
            Ok(42)
        }
    }

    struct RejectingEndpoint;
    impl StateEndpoint for RejectingEndpoint {
        fn save_state(&self, _: &[SceneObject], _: &str) -> Result<u64, PersistError> {
            Err(PersistError::Rejected { status: 401 })
        }
    }

    fn editor_session() -> Editor {
        let mut editor = Editor::new();
        editor.gate.grant_editor();
        editor
    }

    fn line_at(x: f64) -> SceneObject {
        SceneObject::Line(Line {
            start: Point::new(x, 0.0),
            end: Point::new(x, 10.0),
            stroke_width: 2.0,
            color: Color::black(),
            tier: DetailTier::Country,
        })
    }

    fn draw_line(editor: &mut Editor, from: Point, to: Point) -> bool {
        editor.draft.set_tool(ToolKind::Line);
        editor.pointer_pressed(from, false);
        editor.pointer_moved(to);
        editor.pointer_released()
    }

    #[test]
    fn test_commit_appends_and_undo_restores() {
        let mut editor = editor_session();

        assert!(draw_line(
            &mut editor,
            Point::new(100.0, 100.0),
            Point::new(200.0, 200.0)
        ));
        assert_eq!(editor.scene.len(), 1);

        // The snapshot was taken before the mutation.
        assert!(editor.undo());
        assert!(editor.scene.is_empty());
        assert!(editor.redo());
        assert_eq!(editor.scene.len(), 1);
    }

    #[test]
    fn test_viewer_press_is_ignored() {
        let mut editor = Editor::new();
        editor.draft.set_tool(ToolKind::Line);

        let outcome = editor.pointer_pressed(CENTER, false);
        assert_eq!(outcome, PressOutcome::Ignored);
        assert!(!editor.pointer_released());
        assert!(editor.scene.is_empty());
    }

    #[test]
    fn test_viewer_can_always_pan_and_zoom() {
        let mut editor = Editor::new();
        editor.draft.set_tool(ToolKind::Line);

        assert_eq!(editor.pointer_pressed(CENTER, true), PressOutcome::Pan);
        editor.pan_dragged(Vec2::new(10.0, 0.0));
        editor.wheel(CENTER, 2.0);
        assert!(editor.camera.zoom > 1.0);
    }

    #[test]
    fn test_demotion_mid_gesture_drops_commit() {
        let mut editor = editor_session();
        editor.draft.set_tool(ToolKind::Line);

        editor.pointer_pressed(Point::new(100.0, 100.0), false);
        editor.pointer_moved(Point::new(200.0, 200.0));
        editor.gate.demote();

        assert!(!editor.pointer_released());
        assert!(editor.scene.is_empty());
        assert!(!editor.draft.is_drafting());
    }

    #[test]
    fn test_single_point_freehand_leaves_scene_unchanged() {
        let mut editor = editor_session();
        editor.draft.set_tool(ToolKind::Freehand);

        editor.pointer_pressed(CENTER, false);
        assert!(!editor.pointer_released());
        assert!(editor.scene.is_empty());

        editor.pointer_pressed(CENTER, false);
        editor.pointer_moved(Point::new(410.0, 310.0));
        assert!(editor.pointer_released());
        assert_eq!(editor.scene.len(), 1);
    }

    #[test]
    fn test_sync_replaces_scene_wholesale() {
        let mut editor = editor_session();
        for x in 0..3 {
            editor.commit(line_at(x as f64));
        }
        assert_eq!(editor.scene.len(), 3);

        editor.apply_remote_state(StateSnapshot {
            version: 9,
            objects: vec![line_at(99.0)],
        });

        assert_eq!(editor.scene.len(), 1);
        assert_eq!(editor.remote_version(), 9);
    }

    #[test]
    fn test_sync_mid_gesture_keeps_draft() {
        let mut editor = editor_session();
        editor.draft.set_tool(ToolKind::Line);
        editor.pointer_pressed(Point::new(100.0, 100.0), false);
        editor.pointer_moved(Point::new(200.0, 200.0));

        editor.apply_remote_state(StateSnapshot {
            version: 2,
            objects: vec![line_at(5.0)],
        });

        // The draft survives and commits against the new base.
        assert!(editor.draft.is_drafting());
        assert!(editor.pointer_released());
        assert_eq!(editor.scene.len(), 2);
    }

    #[test]
    fn test_rejected_save_demotes_and_blocks_commits() {
        let mut editor = editor_session();
        editor.commit(line_at(1.0));

        let result = editor.persist_scene(&RejectingEndpoint, "wrong");
        assert!(matches!(result, Err(PersistError::Rejected { status: 401 })));
        assert!(!editor.gate.is_editor());
        // The scene itself is untouched; edits stay local and unsaved.
        assert_eq!(editor.scene.len(), 1);
        assert!(editor.status().unwrap().contains("rejected"));

        // A subsequent draft commit attempt is a silent no-op.
        assert!(!draw_line(
            &mut editor,
            Point::new(100.0, 100.0),
            Point::new(200.0, 200.0)
        ));
        assert_eq!(editor.scene.len(), 1);
    }

    #[test]
    fn test_accepted_save_confirms_grant() {
        let mut editor = editor_session();
        assert!(!editor.gate.is_verified());

        let version = editor.persist_scene(&AcceptingEndpoint, "secret").unwrap();
        assert_eq!(version, 42);
        assert!(editor.gate.is_verified());
        assert_eq!(editor.remote_version(), 42);
    }

    #[test]
    fn test_viewer_mutations_are_noops() {
        let mut editor = editor_session();
        editor.commit(line_at(1.0));
        editor.gate.demote();

        assert!(!editor.undo());
        assert!(!editor.redo());
        assert!(!editor.clear_scene());
        assert!(editor.fill_at(CENTER).is_none());
        assert_eq!(editor.scene.len(), 1);
    }

    #[test]
    fn test_clear_records_history() {
        let mut editor = editor_session();
        editor.commit(line_at(1.0));

        assert!(editor.clear_scene());
        assert!(editor.scene.is_empty());
        assert!(editor.undo());
        assert_eq!(editor.scene.len(), 1);
    }

    #[test]
    fn test_fill_commits_marker_and_returns_frame() {
        let mut editor = editor_session();
        editor.draft.style.color = Color::new(255, 0, 0, 255);

        let frame = editor.fill_at(CENTER).expect("fill should apply");
        assert_eq!(
            *frame.get_pixel(400, 300),
            image::Rgba([255u8, 0, 0, 255])
        );
        assert_eq!(editor.scene.len(), 1);
        assert!(matches!(
            editor.scene.objects()[0],
            SceneObject::FillMarker(_)
        ));

        // The marker is undoable like any other commit.
        assert!(editor.undo());
        assert!(editor.scene.is_empty());
    }

    #[test]
    fn test_fill_outside_viewport_is_noop() {
        let mut editor = editor_session();
        assert!(editor.fill_at(Point::new(-5.0, 10.0)).is_none());
        assert!(editor.fill_at(Point::new(10.0, 900.0)).is_none());
        assert!(editor.scene.is_empty());
    }

    #[test]
    fn test_fill_same_color_is_noop_without_marker() {
        let mut editor = editor_session();
        editor.draft.style.color = editor.background;

        assert!(editor.fill_at(CENTER).is_none());
        assert!(editor.scene.is_empty());
    }

    #[test]
    fn test_fill_result_is_transient() {
        let mut editor = editor_session();
        editor.draft.style.color = Color::new(255, 0, 0, 255);

        editor.fill_at(CENTER).expect("fill should apply");

        // A fresh render pass knows nothing about the filled pixels.
        let frame = editor.render_frame();
        assert_eq!(
            *frame.get_pixel(400, 300),
            image::Rgba([255u8, 255, 255, 255])
        );
    }

    #[test]
    fn test_fill_tool_press_applies_fill() {
        let mut editor = editor_session();
        editor.draft.set_tool(ToolKind::Fill);
        editor.draft.style.color = Color::new(0, 0, 255, 255);

        assert_eq!(
            editor.pointer_pressed(CENTER, false),
            PressOutcome::FillApplied
        );
        assert_eq!(editor.scene.len(), 1);
    }
}
