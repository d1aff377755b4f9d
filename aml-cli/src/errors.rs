//! CLI-level error wrapping: maps [`aml_core::Error`] to a process
//! exit path while preserving the structured `{kind, message}` shape for
//! JSON output.

use serde::Serialize;

/// The JSON-serializable shape of a failed command, mirroring the facade's
/// `Result{success, data?, error}` contract.
#[derive(Debug, Serialize)]
pub struct CliError {
    /// Stable error kind tag (e.g. `"NotFound"`).
    pub kind: String,
    /// Human-readable message.
    pub message: String,
}

impl From<&aml_core::Error> for CliError {
    fn from(err: &aml_core::Error) -> Self {
        Self {
            kind: err.kind().to_string(),
            message: err.to_string(),
        }
    }
}

impl std::fmt::Display for CliError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.kind, self.message)
    }
}
