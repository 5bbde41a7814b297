//! The pure complaint state machine: which transitions exist, who may request
//! them, and which side conditions gate them. It reads no complaint record;
//! the layered checks live in `policy`.

use crate::actor::Role;
use crate::types::ComplaintStatus;

/// One row of the transition table.
#[derive(Clone, Copy, Debug)]
pub struct TransitionRule {
    pub from: ComplaintStatus,
    pub to: ComplaintStatus,
    /// Roles that may request this transition.
    pub allowed: &'static [Role],
    /// When the requester is a CITIZEN, they must own the complaint.
    pub ownership: bool,
    /// When the requester is STAFF or DEPT_HEAD, their department must match.
    pub department: bool,
    /// At least one resolution proof must exist.
    pub proof: bool,
}

use ComplaintStatus::{Cancelled, Closed, Filed, InProgress, Resolved};
use Role::{Admin, Citizen, DeptHead, Staff, SuperAdmin, System};

/// Ordered transition table; first match wins.
pub const TRANSITIONS: &[TransitionRule] = &[
    // Auto-start once classification/assignment completed.
    TransitionRule {
        from: Filed,
        to: InProgress,
        allowed: &[System],
        ownership: false,
        department: false,
        proof: false,
    },
    // Staff claim completion, gated on proof.
    TransitionRule {
        from: InProgress,
        to: Resolved,
        allowed: &[Staff, DeptHead],
        ownership: false,
        department: true,
        proof: true,
    },
    // Citizen acceptance, or SYSTEM timeout close.
    TransitionRule {
        from: Resolved,
        to: Closed,
        allowed: &[Citizen, System],
        ownership: true,
        department: false,
        proof: false,
    },
    // Approved dispute re-opens; emitted by the protocol as SYSTEM.
    TransitionRule {
        from: Resolved,
        to: InProgress,
        allowed: &[System],
        ownership: false,
        department: false,
        proof: false,
    },
    // Cancellation by the owning citizen or an administrator.
    TransitionRule {
        from: Filed,
        to: Cancelled,
        allowed: &[Citizen, Admin, SuperAdmin],
        ownership: true,
        department: false,
        proof: false,
    },
    TransitionRule {
        from: InProgress,
        to: Cancelled,
        allowed: &[Citizen, Admin, SuperAdmin],
        ownership: true,
        department: false,
        proof: false,
    },
    TransitionRule {
        from: Resolved,
        to: Cancelled,
        allowed: &[Citizen, Admin, SuperAdmin],
        ownership: true,
        department: false,
        proof: false,
    },
];

/// First matching rule for `(from, to)`, if the transition is legal at all.
pub fn rule_for(from: ComplaintStatus, to: ComplaintStatus) -> Option<&'static TransitionRule> {
    TRANSITIONS.iter().find(|r| r.from == from && r.to == to)
}

pub fn is_legal(from: ComplaintStatus, to: ComplaintStatus) -> bool {
    rule_for(from, to).is_some()
}

/// Target states reachable from `from`, in table order.
pub fn targets_from(from: ComplaintStatus) -> Vec<ComplaintStatus> {
    let mut out = Vec::new();
    for rule in TRANSITIONS {
        if rule.from == from && !out.contains(&rule.to) {
            out.push(rule.to);
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn terminal_states_have_no_exits() {
        assert!(targets_from(Closed).is_empty());
        assert!(targets_from(Cancelled).is_empty());
    }

    #[test]
    fn filed_never_reentered() {
        assert!(TRANSITIONS.iter().all(|r| r.to != Filed));
    }

    #[test]
    fn legality_matches_table() {
        assert!(is_legal(Filed, InProgress));
        assert!(is_legal(InProgress, Resolved));
        assert!(is_legal(Resolved, Closed));
        assert!(is_legal(Resolved, InProgress));
        assert!(is_legal(Filed, Cancelled));
        assert!(is_legal(InProgress, Cancelled));
        assert!(is_legal(Resolved, Cancelled));

        assert!(!is_legal(Filed, Resolved));
        assert!(!is_legal(Filed, Closed));
        assert!(!is_legal(InProgress, Closed));
        assert!(!is_legal(Closed, InProgress));
        assert!(!is_legal(Cancelled, Filed));
        assert!(!is_legal(Closed, Cancelled));
    }

    #[test]
    fn resolve_is_proof_and_department_gated() {
        let rule = rule_for(InProgress, Resolved).unwrap();
        assert!(rule.proof);
        assert!(rule.department);
        assert_eq!(rule.allowed, &[Staff, DeptHead]);
    }

    #[test]
    fn auto_start_is_system_only() {
        let rule = rule_for(Filed, InProgress).unwrap();
        assert_eq!(rule.allowed, &[System]);
    }

    #[test]
    fn targets_from_in_progress() {
        assert_eq!(targets_from(InProgress), vec![Resolved, Cancelled]);
    }
}
