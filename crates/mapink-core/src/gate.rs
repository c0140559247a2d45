//! Authorization boundary between editor and viewer roles.

use serde::{Deserialize, Serialize};

/// Authorization role for the local session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    /// May only navigate the camera.
    #[default]
    Viewer,
    /// May mutate the scene (commit, fill, undo, redo, clear).
    Editor,
}

/// Gate over all mutating operations; camera navigation bypasses it.
///
/// The editor role is granted optimistically on local credential entry,
/// before any server-side validation. The only point of actual validation is
/// the persistence call: a rejected call demotes back to viewer. Until a
/// persistence call has succeeded, `is_verified` stays false so callers can
/// surface the unverified state instead of silently trusting the grant.
#[derive(Debug, Clone, Copy, Default)]
pub struct AdminGate {
    role: Role,
    verified: bool,
}

impl AdminGate {
    /// Create a gate in the default viewer role.
    pub fn new() -> Self {
        Self::default()
    }

    /// Current role.
    pub fn role(&self) -> Role {
        self.role
    }

    /// Whether mutating operations are currently permitted.
    pub fn is_editor(&self) -> bool {
        self.role == Role::Editor
    }

    /// Whether the editor grant has been confirmed by a successful
    /// persistence call.
    pub fn is_verified(&self) -> bool {
        self.verified
    }

    /// Optimistically grant the editor role on local credential entry.
    /// The grant stays unverified until a persistence call succeeds.
    pub fn grant_editor(&mut self) {
        log::info!("editor role granted optimistically (unverified)");
        self.role = Role::Editor;
        self.verified = false;
    }

    /// Mark the current grant as server-confirmed.
    pub fn confirm(&mut self) {
        if self.role == Role::Editor {
            self.verified = true;
        }
    }

    /// Demote back to viewer after a rejected persistence call.
    pub fn demote(&mut self) {
        if self.role == Role::Editor {
            log::warn!("credential rejected, demoting to viewer");
        }
        self.role = Role::Viewer;
        self.verified = false;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_to_viewer() {
        let gate = AdminGate::new();
        assert_eq!(gate.role(), Role::Viewer);
        assert!(!gate.is_editor());
        assert!(!gate.is_verified());
    }

    #[test]
    fn test_optimistic_grant_is_unverified() {
        let mut gate = AdminGate::new();
        gate.grant_editor();
        assert!(gate.is_editor());
        assert!(!gate.is_verified());
    }

    #[test]
    fn test_confirm_after_successful_persist() {
        let mut gate = AdminGate::new();
        gate.grant_editor();
        gate.confirm();
        assert!(gate.is_verified());
    }

    #[test]
    fn test_demotion_clears_grant_and_verification() {
        let mut gate = AdminGate::new();
        gate.grant_editor();
        gate.confirm();
        gate.demote();
        assert_eq!(gate.role(), Role::Viewer);
        assert!(!gate.is_verified());
    }

    #[test]
    fn test_confirm_without_grant_is_noop() {
        let mut gate = AdminGate::new();
        gate.confirm();
        assert!(!gate.is_verified());
    }
}
