//! Access control, audit logging, and encryption-context derivation.

pub mod access_control;
pub mod audit;
pub mod context;
pub mod roles;

pub use access_control::{AccessControl, AccessDecision, ViolatedRule};
pub use audit::{AuditEvent, AuditEventType, AuditFilter, AuditLogger, AuditReport};
pub use context::EncryptionContext;
pub use roles::{Operation, Principal, ResourceRef, Role};
