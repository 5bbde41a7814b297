//! The proof / signoff / dispute protocol: a two-party completion handshake
//! between staff and citizen, with department-head adjudication as the
//! supervisory escape hatch. All operations are single-writer per complaint.

use uuid::Uuid;

use crate::actor::{ActorContext, Role};
use crate::engine::ComplaintEngine;
use crate::error::{ConflictKind, EngineError, Precondition};
use crate::types::*;

impl ComplaintEngine {
    /// Staff attach photographic evidence of completed remediation. Additive:
    /// never replaces a prior proof; does not change status.
    pub async fn submit_proof(
        &self,
        id: Uuid,
        actor: &ActorContext,
        image_key: &str,
        remarks: &str,
        captured: Option<GeoPoint>,
    ) -> Result<ResolutionProof, EngineError> {
        if remarks.trim().is_empty() {
            return Err(EngineError::validation("remarks", "must not be empty"));
        }
        if image_key.trim().is_empty() {
            return Err(EngineError::validation("image", "proof image is required"));
        }
        if !matches!(actor.role, Role::Staff | Role::DeptHead) {
            return Err(EngineError::unauthorized(
                actor.role,
                "submit proof",
                &[Role::Staff, Role::DeptHead],
            ));
        }

        let _guard = self.locks.acquire(id).await;
        let complaint = self.load_or_fail(id).await?;
        if complaint.status != ComplaintStatus::InProgress {
            return Err(EngineError::PreconditionFailed(
                Precondition::ProofWindowClosed,
            ));
        }
        if !actor.in_department(&complaint.department_id) {
            return Err(EngineError::DepartmentMismatch {
                actor_department: actor.department_id.clone(),
                complaint_department: complaint.department_id.clone(),
            });
        }

        let now = self.clock.now();
        let proof = ResolutionProof {
            id: Uuid::now_v7(),
            complaint_id: id,
            author_staff_id: actor.user_id.clone().unwrap_or_default(),
            image_key: image_key.to_string(),
            captured,
            captured_at: captured.map(|_| now),
            remarks: remarks.trim().to_string(),
            submitted_at: now,
            verified: false,
        };
        self.store.append_proof(&proof).await?;

        self.audit
            .record(
                AuditEntity::Proof,
                id,
                AuditAction::Created,
                None,
                Some(proof.image_key.clone()),
                actor,
                Some(proof.remarks.clone()),
            )
            .await?;
        Ok(proof)
    }

    /// Staff claim completion. Requires at least one proof; transitions
    /// IN_PROGRESS -> RESOLVED and opens the citizen response window.
    pub async fn resolve(&self, id: Uuid, actor: &ActorContext) -> Result<Complaint, EngineError> {
        // Delegates to the generic transition: policy enforces the role,
        // department and proof gates in order.
        self.transition(
            id,
            ComplaintStatus::Resolved,
            actor,
            Some("resolution claimed by staff".to_string()),
        )
        .await
    }

    pub async fn resolution_proofs(&self, id: Uuid) -> Result<Vec<ResolutionProof>, EngineError> {
        self.load_or_fail(id).await?;
        Ok(self.store.load_proofs(id).await?)
    }

    /// Citizen accepts the resolution: RESOLVED -> CLOSED plus rating.
    /// Re-accepting an already-CLOSED complaint by the same citizen succeeds
    /// with no change.
    pub async fn accept(
        &self,
        id: Uuid,
        actor: &ActorContext,
        rating: u8,
        feedback: Option<String>,
    ) -> Result<Complaint, EngineError> {
        if !(1..=5).contains(&rating) {
            return Err(EngineError::validation("rating", "must be between 1 and 5"));
        }
        {
            let _guard = self.locks.acquire(id).await;
            let complaint = self.load_or_fail(id).await?;
            if !actor.owns(&complaint.citizen_id) {
                return Err(EngineError::OwnershipRequired {
                    actor: actor.user_id.clone().unwrap_or_default(),
                });
            }
            if complaint.status == ComplaintStatus::Closed && complaint.rating.is_some() {
                return Ok(complaint);
            }
            if complaint.status != ComplaintStatus::Resolved {
                return Err(EngineError::PreconditionFailed(Precondition::SignoffNotOpen));
            }
            if let Some(existing) = self.store.active_signoff(id).await? {
                if existing.pending_dispute() {
                    return Err(EngineError::Conflict(ConflictKind::AlreadySignedOff));
                }
            }

            let signoff = CitizenSignoff {
                id: Uuid::now_v7(),
                complaint_id: id,
                citizen_id: actor.user_id.clone().unwrap_or_default(),
                kind: SignoffKind::Acceptance {
                    rating,
                    feedback: feedback.clone(),
                },
                active: true,
                created_at: self.clock.now(),
                decided_at: None,
                decided_by: None,
            };
            self.store.append_signoff(&signoff).await?;
            self.audit
                .record(
                    AuditEntity::Signoff,
                    id,
                    AuditAction::Created,
                    None,
                    Some(format!("acceptance rating={rating}")),
                    actor,
                    feedback.clone(),
                )
                .await?;

            self.apply_transition(
                &complaint,
                ComplaintStatus::Closed,
                actor,
                Some("accepted by citizen".to_string()),
            )
            .await?;
        }
        // record_rating takes its own lock; the accept lock is released.
        self.record_rating(id, rating, feedback, actor).await
    }

    /// Citizen contests the claimed resolution. Creates a PENDING dispute;
    /// status stays RESOLVED until adjudication, and the pending dispute
    /// holds off the auto-close timer.
    pub async fn dispute(
        &self,
        id: Uuid,
        actor: &ActorContext,
        reason: &str,
        counter_proof_image_key: Option<String>,
    ) -> Result<CitizenSignoff, EngineError> {
        if reason.trim().is_empty() {
            return Err(EngineError::validation(
                "dispute_reason",
                "must not be empty",
            ));
        }
        let _guard = self.locks.acquire(id).await;
        let complaint = self.load_or_fail(id).await?;
        if !actor.owns(&complaint.citizen_id) {
            return Err(EngineError::OwnershipRequired {
                actor: actor.user_id.clone().unwrap_or_default(),
            });
        }
        if complaint.status != ComplaintStatus::Resolved {
            return Err(EngineError::PreconditionFailed(Precondition::SignoffNotOpen));
        }
        if self.store.active_signoff(id).await?.is_some() {
            return Err(EngineError::Conflict(ConflictKind::AlreadySignedOff));
        }

        let signoff = CitizenSignoff {
            id: Uuid::now_v7(),
            complaint_id: id,
            citizen_id: actor.user_id.clone().unwrap_or_default(),
            kind: SignoffKind::Dispute {
                reason: reason.trim().to_string(),
                counter_proof_image_key,
                status: DisputeStatus::Pending,
            },
            active: true,
            created_at: self.clock.now(),
            decided_at: None,
            decided_by: None,
        };
        self.store.append_signoff(&signoff).await?;

        self.audit
            .record(
                AuditEntity::Signoff,
                id,
                AuditAction::Created,
                None,
                Some("dispute PENDING".to_string()),
                actor,
                Some(reason.trim().to_string()),
            )
            .await?;

        self.notifier
            .dispatch(
                &crate::notify::recipient::dept_head(&complaint.department_id),
                NotificationKind::General,
                "Resolution disputed",
                format!("Citizen disputed resolution of \"{}\"", complaint.title),
                Some(id),
            )
            .await?;

        Ok(signoff)
    }

    /// Department head upholds the citizen's dispute: the complaint re-opens
    /// as SYSTEM, priority rises one step and the escalation level advances
    /// (capped at the commissioner level).
    pub async fn approve_dispute(
        &self,
        id: Uuid,
        signoff_id: Uuid,
        actor: &ActorContext,
    ) -> Result<Complaint, EngineError> {
        let reopen;
        {
            let _guard = self.locks.acquire(id).await;
            let complaint = self.load_or_fail(id).await?;
            self.adjudicate(&complaint, signoff_id, actor, DisputeStatus::Approved, None)
                .await?;

            let old_level = complaint.escalation_level;
            let new_level = (old_level + 1).min(2);
            let old_priority = complaint.priority;
            let new_priority = old_priority.raised();
            self.store
                .escalate_if_level(id, old_level, new_level, new_priority)
                .await?;
            if new_level != old_level {
                self.audit
                    .record(
                        AuditEntity::Complaint,
                        id,
                        AuditAction::Escalation,
                        Some(old_level.to_string()),
                        Some(new_level.to_string()),
                        &ActorContext::system(),
                        Some("dispute approved".to_string()),
                    )
                    .await?;
            }
            if new_priority != old_priority {
                self.audit
                    .record(
                        AuditEntity::Complaint,
                        id,
                        AuditAction::Updated,
                        Some(old_priority.as_str().to_string()),
                        Some(new_priority.as_str().to_string()),
                        &ActorContext::system(),
                        Some("dispute approved".to_string()),
                    )
                    .await?;
            }

            reopen = complaint.status == ComplaintStatus::Resolved;
        }
        if reopen {
            return self
                .system_transition(id, ComplaintStatus::InProgress, "dispute approved, re-opened")
                .await;
        }
        self.load_or_fail(id).await
    }

    /// Department head rejects the dispute: complaint remains RESOLVED and
    /// the normal auto-close timer continues.
    pub async fn reject_dispute(
        &self,
        id: Uuid,
        signoff_id: Uuid,
        actor: &ActorContext,
        reason: &str,
    ) -> Result<Complaint, EngineError> {
        let _guard = self.locks.acquire(id).await;
        let complaint = self.load_or_fail(id).await?;
        self.adjudicate(
            &complaint,
            signoff_id,
            actor,
            DisputeStatus::Rejected,
            Some(reason.to_string()),
        )
        .await?;

        self.notifier
            .dispatch(
                &complaint.citizen_id,
                NotificationKind::General,
                "Dispute rejected",
                format!("Your dispute on \"{}\" was rejected", complaint.title),
                Some(id),
            )
            .await?;
        self.load_or_fail(id).await
    }

    /// Shared adjudication body: validates the adjudicator and the pending
    /// dispute, then moves its sub-state. Callers hold the complaint lock.
    async fn adjudicate(
        &self,
        complaint: &Complaint,
        signoff_id: Uuid,
        actor: &ActorContext,
        verdict: DisputeStatus,
        reason: Option<String>,
    ) -> Result<CitizenSignoff, EngineError> {
        let permitted = actor.is_admin()
            || (actor.role == Role::DeptHead && actor.in_department(&complaint.department_id));
        if !permitted {
            if actor.role == Role::DeptHead {
                return Err(EngineError::DepartmentMismatch {
                    actor_department: actor.department_id.clone(),
                    complaint_department: complaint.department_id.clone(),
                });
            }
            return Err(EngineError::unauthorized(
                actor.role,
                "adjudicate dispute",
                &[Role::DeptHead, Role::Admin, Role::SuperAdmin],
            ));
        }

        let mut signoff = self
            .store
            .load_signoff(signoff_id)
            .await?
            .filter(|s| s.complaint_id == complaint.id)
            .ok_or_else(|| EngineError::not_found("signoff", signoff_id))?;

        match &mut signoff.kind {
            SignoffKind::Dispute { status, .. } if *status == DisputeStatus::Pending => {
                *status = verdict;
            }
            _ => {
                return Err(EngineError::PreconditionFailed(
                    Precondition::DisputeNotPending,
                ))
            }
        }
        signoff.active = false;
        signoff.decided_at = Some(self.clock.now());
        signoff.decided_by = actor.user_id.clone();
        self.store.update_signoff(&signoff).await?;

        let verdict_str = match verdict {
            DisputeStatus::Approved => "APPROVED",
            DisputeStatus::Rejected => "REJECTED",
            DisputeStatus::Pending => "PENDING",
        };
        self.audit
            .record(
                AuditEntity::Signoff,
                complaint.id,
                AuditAction::Updated,
                Some("dispute PENDING".to_string()),
                Some(format!("dispute {verdict_str}")),
                actor,
                reason,
            )
            .await?;
        Ok(signoff)
    }

    pub async fn signoffs(&self, id: Uuid) -> Result<Vec<CitizenSignoff>, EngineError> {
        self.load_or_fail(id).await?;
        Ok(self.store.load_signoffs(id).await?)
    }
}
