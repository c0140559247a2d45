//! Persistence endpoint client.
//!
//! The persistence call is the only point where the optimistic editor grant
//! actually gets validated: the credential travels in a request header, and
//! any non-success response is treated as a credential rejection.

use crate::scene::SceneObject;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Header carrying the admin credential.
pub const ADMIN_HEADER: &str = "x-admin-password";

/// Request body for the state save call.
#[derive(Debug, Serialize)]
pub struct SaveRequest<'a> {
    pub objects: &'a [SceneObject],
}

/// Success response body. Extra fields from the server are ignored.
#[derive(Debug, Deserialize)]
pub struct SaveResponse {
    pub version: u64,
}

/// Errors from the persistence call.
#[derive(Debug, Error)]
pub enum PersistError {
    /// Non-success response; treated as credential rejection and grounds
    /// for demotion to viewer.
    #[error("save rejected with status {status}")]
    Rejected { status: u16 },
    /// The request never produced a response.
    #[error("transport error: {0}")]
    Transport(String),
    /// A success response whose body could not be decoded.
    #[error("invalid response: {0}")]
    InvalidResponse(String),
}

/// The persistence endpoint, abstracted so tests can reject or accept at
/// will without a live server.
pub trait StateEndpoint {
    /// Save the full object sequence; returns the new server-side version.
    fn save_state(&self, objects: &[SceneObject], credential: &str) -> Result<u64, PersistError>;
}

/// HTTP implementation of the persistence call.
pub struct HttpStateEndpoint {
    url: String,
    client: reqwest::blocking::Client,
}

impl HttpStateEndpoint {
    /// Create a client for the given state endpoint URL.
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            client: reqwest::blocking::Client::new(),
        }
    }
}

impl StateEndpoint for HttpStateEndpoint {
    fn save_state(&self, objects: &[SceneObject], credential: &str) -> Result<u64, PersistError> {
        let response = self
            .client
            .post(&self.url)
            .header(ADMIN_HEADER, credential)
            .json(&SaveRequest { objects })
            .send()
            .map_err(|e| PersistError::Transport(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(PersistError::Rejected {
                status: status.as_u16(),
            });
        }

        let body: SaveResponse = response
            .json()
            .map_err(|e| PersistError::InvalidResponse(e.to_string()))?;
        Ok(body.version)
    }
}
