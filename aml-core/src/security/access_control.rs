//! Role, project, agent, and ownership checks applied by
//! `checkAccess`/`requireAccess`.

use crate::error::Error;
use crate::security::roles::{Operation, Principal, ResourceRef, Role};
use serde::{Deserialize, Serialize};

/// Which access-control rule a denied access violated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ViolatedRule {
    /// Rule 1: the principal's role doesn't permit the operation at all.
    InsufficientRole,
    /// Rule 2: the resource's project doesn't match the principal's.
    ProjectIsolation,
    /// Rule 3: the resource's agent doesn't match the principal's.
    AgentIsolation,
    /// Rule 4: a destructive op on a resource owned by someone else.
    OwnershipRequired,
}

/// The outcome of a `checkAccess` call.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccessDecision {
    /// Whether the operation is permitted.
    pub allowed: bool,
    /// Which rule was violated, if denied.
    pub violated_rule: Option<ViolatedRule>,
    /// Human-readable explanation, if denied.
    pub reason: Option<String>,
}

impl AccessDecision {
    fn allow() -> Self {
        Self {
            allowed: true,
            violated_rule: None,
            reason: None,
        }
    }

    fn deny(rule: ViolatedRule, reason: impl Into<String>) -> Self {
        Self {
            allowed: false,
            violated_rule: Some(rule),
            reason: Some(reason.into()),
        }
    }
}

/// Stateless access-control evaluator: the four rules above, applied in
/// order, each short-circuiting on the first violation.
#[derive(Debug, Default, Clone, Copy)]
pub struct AccessControl;

impl AccessControl {
    /// New evaluator. Stateless: all inputs are passed per-call.
    #[must_use]
    pub fn new() -> Self {
        Self
    }

    /// Evaluates `principal`'s access to `operation` against `resource`,
    /// returning a decision rather than raising.
    #[must_use]
    pub fn check_access(
        &self,
        principal: &Principal,
        operation: Operation,
        resource: Option<&ResourceRef>,
    ) -> AccessDecision {
        // Rule 1: role permits the operation.
        if !principal.role.at_least(operation.minimum_role()) {
            return AccessDecision::deny(
                ViolatedRule::InsufficientRole,
                format!(
                    "operation {operation:?} requires role >= {:?}, principal has {:?}",
                    operation.minimum_role(),
                    principal.role
                ),
            );
        }

        let Some(resource) = resource else {
            return AccessDecision::allow();
        };

        // Rule 2: project isolation, unless admin.
        if principal.role < Role::Admin {
            if let Some(project) = &resource.project_id {
                if *project != principal.project_id {
                    return AccessDecision::deny(
                        ViolatedRule::ProjectIsolation,
                        "resource belongs to a different project",
                    );
                }
            }

            // Rule 3: agent isolation, unless admin.
            if let Some(agent) = &resource.agent_name {
                if Some(agent) != principal.agent_name.as_ref() {
                    return AccessDecision::deny(
                        ViolatedRule::AgentIsolation,
                        "resource belongs to a different agent",
                    );
                }
            }
        }

        // Rule 4: ownership required for destructive ops on owned resources.
        if operation.is_destructive() && principal.role < Role::Admin {
            if let Some(owner) = &resource.owner_id {
                if owner != &principal.user_id {
                    return AccessDecision::deny(
                        ViolatedRule::OwnershipRequired,
                        "only the resource owner or an admin may perform this operation",
                    );
                }
            }
        }

        AccessDecision::allow()
    }

    /// Like [`Self::check_access`] but raises `Error::AccessDenied` instead
    /// of returning a decision.
    pub fn require_access(
        &self,
        principal: &Principal,
        operation: Operation,
        resource: Option<&ResourceRef>,
    ) -> Result<(), Error> {
        let decision = self.check_access(principal, operation, resource);
        if decision.allowed {
            Ok(())
        } else {
            Err(Error::AccessDenied(
                    decision.reason.unwrap_or_else(|| "access denied".to_string()),
            ))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::security::roles::Operation;

    fn principal(role: Role, project: &str, agent: Option<&str>) -> Principal {
        Principal {
            user_id: "u1".to_string(),
            role,
            project_id: project.into(),
            agent_name: agent.map(Into::into),
        }
    }

    #[test]
    fn read_only_cannot_write() {
        let ac = AccessControl::new();
        let p = principal(Role::ReadOnly, "proj", None);
        let decision = ac.check_access(&p, Operation::PatternWrite, None);
        assert!(!decision.allowed);
        assert_eq!(decision.violated_rule, Some(ViolatedRule::InsufficientRole));
    }

    #[test]
    fn developer_can_read_and_write_but_not_delete() {
        let ac = AccessControl::new();
        let p = principal(Role::Developer, "proj", None);
        assert!(ac.check_access(&p, Operation::PatternRead, None).allowed);
        assert!(ac.check_access(&p, Operation::PatternWrite, None).allowed);
        assert!(!ac.check_access(&p, Operation::PatternDelete, None).allowed);
    }

    #[test]
    fn cross_agent_read_denied_for_non_admin() {
        let ac = AccessControl::new();
        let bob = principal(Role::Developer, "proj", Some("agent-2"));
        let resource = ResourceRef {
            agent_name: Some("agent-1".into()),
            ..Default::default()
        };
        let decision = ac.check_access(&bob, Operation::PatternRead, Some(&resource));
        assert!(!decision.allowed);
        assert_eq!(decision.violated_rule, Some(ViolatedRule::AgentIsolation));
    }

    #[test]
    fn admin_bypasses_agent_isolation() {
        let ac = AccessControl::new();
        let admin = Principal::admin("root", "proj".into());
        let resource = ResourceRef {
            agent_name: Some("agent-1".into()),
            ..Default::default()
        };
        assert!(ac.check_access(&admin, Operation::PatternRead, Some(&resource)).allowed);
    }

    #[test]
    fn cross_project_denied_for_non_admin() {
        let ac = AccessControl::new();
        let p = principal(Role::Developer, "proj-a", Some("agent-1"));
        let resource = ResourceRef {
            project_id: Some("proj-b".into()),
            ..Default::default()
        };
        let decision = ac.check_access(&p, Operation::PatternRead, Some(&resource));
        assert_eq!(decision.violated_rule, Some(ViolatedRule::ProjectIsolation));
    }

    #[test]
    fn destructive_op_requires_ownership() {
        let ac = AccessControl::new();
        let p = principal(Role::Developer, "proj", Some("agent-1"));
        let resource = ResourceRef {
            agent_name: Some("agent-1".into()),
            owner_id: Some("someone-else".to_string()),
            ..Default::default()
        };
        let decision = ac.check_access(&p, Operation::PatternDelete, Some(&resource));
        assert!(!decision.allowed);
        assert_eq!(decision.violated_rule, Some(ViolatedRule::OwnershipRequired));
    }

    #[test]
    fn access_monotonicity_holds_across_role_levels() {
        let ac = AccessControl::new();
        let read_only = principal(Role::ReadOnly, "proj", None);
        let developer = principal(Role::Developer, "proj", None);
        let admin = Principal::admin("root", "proj".into());

        for op in [Operation::PatternRead, Operation::PatternWrite, Operation::PatternDelete] {
            let ro = ac.check_access(&read_only, op, None).allowed;
            let dev = ac.check_access(&developer, op, None).allowed;
            let adm = ac.check_access(&admin, op, None).allowed;
            // allowed(role) is monotone non-decreasing in role level.
            assert!(!ro || dev);
            assert!(!dev || adm);
        }
    }

    #[test]
    fn require_access_raises_access_denied() {
        let ac = AccessControl::new();
        let p = principal(Role::ReadOnly, "proj", None);
        let err = ac
        .require_access(&p, Operation::PatternWrite, None)
        .expect_err("should be denied");
        assert!(matches!(err, Error::AccessDenied(_)));
    }
}
