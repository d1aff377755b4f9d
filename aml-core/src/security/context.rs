//! Deterministic encryption-context derivation.
//!
//! An encryption context scopes AEAD encryption to a project (and
//! optionally an agent) without ever being written to disk next to the
//! ciphertext — it is re-derived from `(projectId[, agent])` on every read.

use crate::types::{AgentName, ProjectId};
use sha2::{Digest, Sha256};

/// A 64-character lowercase-hex SHA-256 tag used as AEAD associated data.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct EncryptionContext(String);

impl EncryptionContext {
    /// `SHA-256(projectId)`, project-scoped only.
    #[must_use]
    pub fn for_project(project: &ProjectId) -> Self {
        Self(hex_sha256(project.0.as_bytes()))
    }

    /// `SHA-256(agent || ':' || projectId)`, scoped to one agent within one
    /// project.
    #[must_use]
    pub fn for_agent(agent: &AgentName, project: &ProjectId) -> Self {
        let mut input = Vec::with_capacity(agent.0.len() + 1 + project.0.len());
        input.extend_from_slice(agent.0.as_bytes());
        input.push(b':');
        input.extend_from_slice(project.0.as_bytes());
        Self(hex_sha256(&input))
    }

    /// The 64-hex-char tag, used as AEAD associated data.
    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        self.0.as_bytes()
    }

    /// The tag as a string.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

fn hex_sha256(input: &[u8]) -> String {
    let digest = Sha256::digest(input);
    digest.iter().map(|b| format!("{b:02x}")).collect()
}
