//! MapInk Core Library
//!
//! Platform-agnostic model and logic for the MapInk annotation canvas:
//! camera, scene, history, tools, raster pass, and the sync/persistence
//! clients.

pub mod camera;
pub mod editor;
pub mod gate;
pub mod history;
pub mod persist;
pub mod raster;
pub mod scene;
pub mod storage;
pub mod sync;
pub mod tools;

pub use camera::{Camera, MAX_ZOOM, MIN_ZOOM, ZOOM_STEP};
pub use editor::{Editor, PressOutcome};
pub use gate::{AdminGate, Role};
pub use history::History;
pub use persist::{HttpStateEndpoint, PersistError, StateEndpoint};
pub use scene::{Color, DetailTier, Scene, SceneObject};
pub use storage::{CredentialStore, FileCredentialStore, MemoryCredentialStore};
pub use sync::{ConnectionState, StateSnapshot, SyncClient, SyncEvent};
pub use tools::{BrushStyle, DraftEditor, ToolKind};
