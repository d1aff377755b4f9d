//! Roles, operations, and the principal identity used for access checks.

use crate::types::{AgentName, ProjectId};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Roles form a total order: `ReadOnly < Developer < Admin`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Role {
    /// Can read, never write.
    ReadOnly,
    /// Can read and write within their own project/agent scope.
    Developer,
    /// Unrestricted.
    Admin,
}

impl Role {
    /// Parses a role string, defaulting unknown values to `Developer`
    /// ("unknown role strings default to developer").
    #[must_use]
    pub fn parse_or_default(s: &str) -> Self {
        match s {
            "read-only" | "readonly" | "read_only" => Self::ReadOnly,
            "admin" => Self::Admin,
            _ => Self::Developer,
        }
    }

    /// `hasRole(principal, r)` holds iff `principal.role >= r`.
    #[must_use]
    pub fn at_least(self, required: Role) -> bool {
        self >= required
    }
}

/// Every access-controlled operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Operation {
    /// Read a pattern.
    PatternRead,
    /// Create or update a pattern.
    PatternWrite,
    /// Delete a pattern.
    PatternDelete,
    /// Read a solution.
    SolutionRead,
    /// Create or update a solution.
    SolutionWrite,
    /// Delete a solution.
    SolutionDelete,
    /// Read a decision.
    DecisionRead,
    /// Create a decision (decisions are append-only; no update/delete).
    DecisionWrite,
    /// Delete a decision (admin escape hatch only; see `minimum_role`).
    DecisionDelete,
    /// Export an agent's entire memory.
    MemoryExport,
    /// Import memory from an export.
    MemoryImport,
    /// Clear an agent's entire memory.
    MemoryClear,
    /// Create a backup.
    BackupCreate,
    /// Restore from a backup.
    BackupRestore,
    /// Read configuration.
    ConfigRead,
    /// Write configuration.
    ConfigWrite,
    /// Rotate the encryption key.
    KeyRotate,
    /// Delete a user/principal record.
    UserDelete,
}

impl Operation {
    /// Minimum role required to perform this operation:
    /// `read-only` gets all `*_READ`; `developer` additionally gets all
    /// `*_WRITE` plus non-destructive system ops; `admin` gets everything.
    #[must_use]
    pub fn minimum_role(self) -> Role {
        match self {
            Self::PatternRead | Self::SolutionRead | Self::DecisionRead | Self::ConfigRead => {
                Role::ReadOnly
            }
            Self::PatternWrite
            | Self::SolutionWrite
            | Self::DecisionWrite
            | Self::MemoryExport
            | Self::BackupCreate => Role::Developer,
            Self::PatternDelete
            | Self::SolutionDelete
            | Self::DecisionDelete
            | Self::MemoryImport
            | Self::MemoryClear
            | Self::BackupRestore
            | Self::ConfigWrite
            | Self::KeyRotate
            | Self::UserDelete => Role::Admin,
        }
    }

    /// Whether this operation is destructive (delete/clear/restore), which
    /// triggers the resource-owner check in [`crate::security::AccessControl`].
    #[must_use]
    pub fn is_destructive(self) -> bool {
        matches!(
            self,
            Self::PatternDelete
            | Self::SolutionDelete
            | Self::DecisionDelete
            | Self::MemoryClear
            | Self::BackupRestore
            | Self::UserDelete
        )
    }
}

/// The `(userId, role, projectId, agentName?)` tuple used for access
/// decisions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Principal {
    /// Identity of the calling user/service.
    pub user_id: String,
    /// The principal's role.
    pub role: Role,
    /// Project the principal is scoped to.
    pub project_id: ProjectId,
    /// Agent the principal is acting as, if any.
    pub agent_name: Option<AgentName>,
}

impl Principal {
    /// Convenience constructor for an admin principal (used by tests and
    /// administrative tooling).
    #[must_use]
    pub fn admin(user_id: impl Into<String>, project_id: ProjectId) -> Self {
        Self {
            user_id: user_id.into(),
            role: Role::Admin,
            project_id,
            agent_name: None,
        }
    }
}

/// Describes the resource an operation targets, for the ownership and
/// isolation checks in [`crate::security::AccessControl`].
#[derive(Debug, Clone, Default)]
pub struct ResourceRef {
    /// Project the resource belongs to, if scoped.
    pub project_id: Option<ProjectId>,
    /// Agent the resource belongs to, if scoped.
    pub agent_name: Option<AgentName>,
    /// User id of the resource's owner, for destructive-op checks.
    pub owner_id: Option<String>,
    /// Resource's own id, for audit linkage.
    pub resource_id: Option<Uuid>,
}
