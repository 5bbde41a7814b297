use crate::actor::Role;
use crate::types::ComplaintStatus;

/// Business precondition that was not met. Carried inside
/// `EngineError::PreconditionFailed` so callers can branch on the exact check.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Precondition {
    /// Resolve requested with zero resolution proofs on record.
    ProofRequired,
    /// Proof submission outside IN_PROGRESS.
    ProofWindowClosed,
    /// Rating attempted outside RESOLVED/CLOSED.
    RatingUnavailable,
    /// Rating already recorded; it is writable once.
    AlreadyRated,
    /// Signoff (accept/dispute) attempted outside RESOLVED.
    SignoffNotOpen,
    /// Dispute adjudication on a signoff that is not a pending dispute.
    DisputeNotPending,
}

impl Precondition {
    pub fn as_str(&self) -> &'static str {
        match self {
            Precondition::ProofRequired => "proof required before resolve",
            Precondition::ProofWindowClosed => "proofs accepted only while in progress",
            Precondition::RatingUnavailable => "rating allowed only after resolution",
            Precondition::AlreadyRated => "rating already recorded",
            Precondition::SignoffNotOpen => "signoff allowed only while resolved",
            Precondition::DisputeNotPending => "dispute is not pending",
        }
    }
}

/// Conflicting concurrent or duplicate request.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ConflictKind {
    SelfUpvote,
    AlreadyUpvoted,
    NotUpvoted,
    AlreadySignedOff,
    DuplicateAssignment,
    SweepInProgress,
}

impl ConflictKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ConflictKind::SelfUpvote => "citizens cannot upvote their own complaint",
            ConflictKind::AlreadyUpvoted => "already upvoted",
            ConflictKind::NotUpvoted => "no upvote to remove",
            ConflictKind::AlreadySignedOff => "an active signoff already exists",
            ConflictKind::DuplicateAssignment => "staff member already assigned",
            ConflictKind::SweepInProgress => "an escalation sweep is already running",
        }
    }
}

/// Which external collaborator failed.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ExternalService {
    Ai,
    Storage,
    Messaging,
}

impl ExternalService {
    pub fn as_str(&self) -> &'static str {
        match self {
            ExternalService::Ai => "ai oracle",
            ExternalService::Storage => "object storage",
            ExternalService::Messaging => "messaging channel",
        }
    }
}

/// The closed error taxonomy surfaced at the engine boundary. Expected
/// business outcomes are values of this type, never panics.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    #[error("illegal transition {from:?} -> {to:?}")]
    InvalidTransition {
        from: ComplaintStatus,
        to: ComplaintStatus,
    },

    #[error("role {role:?} may not perform {action} (allowed: {allowed:?})")]
    Unauthorized {
        role: Role,
        action: String,
        allowed: Vec<Role>,
    },

    #[error("actor {actor} is not the owner of this complaint")]
    OwnershipRequired { actor: String },

    #[error("actor department {actor_department:?} does not match complaint department {complaint_department}")]
    DepartmentMismatch {
        actor_department: Option<String>,
        complaint_department: String,
    },

    #[error("precondition failed: {}", .0.as_str())]
    PreconditionFailed(Precondition),

    #[error("{entity} not found: {id}")]
    NotFound { entity: &'static str, id: String },

    #[error("conflict: {}", .0.as_str())]
    Conflict(ConflictKind),

    #[error("{} unavailable: {message}", service.as_str())]
    ExternalUnavailable {
        service: ExternalService,
        message: String,
    },

    #[error("invalid {field}: {message}")]
    Validation { field: &'static str, message: String },

    #[error("storage failure")]
    Storage(#[from] anyhow::Error),
}

impl EngineError {
    pub fn unauthorized(role: Role, action: impl Into<String>, allowed: &[Role]) -> Self {
        EngineError::Unauthorized {
            role,
            action: action.into(),
            allowed: allowed.to_vec(),
        }
    }

    pub fn not_found(entity: &'static str, id: impl ToString) -> Self {
        EngineError::NotFound {
            entity,
            id: id.to_string(),
        }
    }

    pub fn validation(field: &'static str, message: impl Into<String>) -> Self {
        EngineError::Validation {
            field,
            message: message.into(),
        }
    }

    pub fn external(service: ExternalService, err: impl std::fmt::Display) -> Self {
        EngineError::ExternalUnavailable {
            service,
            message: err.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_names_the_failing_check() {
        let err = EngineError::unauthorized(
            Role::Citizen,
            format!(
                "{} -> {}",
                ComplaintStatus::InProgress.as_str(),
                ComplaintStatus::Resolved.as_str()
            ),
            &[Role::Staff, Role::DeptHead],
        );
        let msg = err.to_string();
        assert!(msg.contains("Citizen"));
        assert!(msg.contains("Staff"));

        let err = EngineError::PreconditionFailed(Precondition::ProofRequired);
        assert!(err.to_string().contains("proof required"));
    }
}
