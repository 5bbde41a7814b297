//! Compound authorization: role × ownership × department × state ×
//! preconditions, resolved in a fixed order so the first failing check is the
//! reported reason.

use crate::actor::{ActorContext, Role};
use crate::error::{EngineError, Precondition};
use crate::fsm;
use crate::types::{Complaint, ComplaintStatus};

pub struct Policy;

impl Policy {
    /// May `actor` move `complaint` to `target` right now?
    ///
    /// Checks, in order: transition legality, role allow-list, ownership,
    /// department match, proof precondition. The first failure is returned.
    pub fn authorize(
        actor: &ActorContext,
        complaint: &Complaint,
        target: ComplaintStatus,
        proof_count: u64,
    ) -> Result<(), EngineError> {
        let rule = fsm::rule_for(complaint.status, target).ok_or(EngineError::InvalidTransition {
            from: complaint.status,
            to: target,
        })?;

        if !rule.allowed.contains(&actor.role) {
            return Err(EngineError::unauthorized(
                actor.role,
                format!("{} -> {}", complaint.status.as_str(), target.as_str()),
                rule.allowed,
            ));
        }

        if rule.ownership && actor.role == Role::Citizen && !actor.owns(&complaint.citizen_id) {
            return Err(EngineError::OwnershipRequired {
                actor: actor.user_id.clone().unwrap_or_default(),
            });
        }

        if rule.department
            && matches!(actor.role, Role::Staff | Role::DeptHead)
            && !actor.in_department(&complaint.department_id)
        {
            return Err(EngineError::DepartmentMismatch {
                actor_department: actor.department_id.clone(),
                complaint_department: complaint.department_id.clone(),
            });
        }

        if rule.proof && proof_count == 0 {
            return Err(EngineError::PreconditionFailed(Precondition::ProofRequired));
        }

        Ok(())
    }

    /// Transitions `actor` may legally request now. Drives callers that need
    /// to enumerate permissible actions without attempting them.
    pub fn allowed_transitions(
        actor: &ActorContext,
        complaint: &Complaint,
        proof_count: u64,
    ) -> Vec<ComplaintStatus> {
        fsm::targets_from(complaint.status)
            .into_iter()
            .filter(|&target| Self::authorize(actor, complaint, target, proof_count).is_ok())
            .collect()
    }
}
