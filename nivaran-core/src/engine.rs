//! The complaint engine owns every mutation of the complaint entity. Each
//! operation: take the per-complaint lock, load, consult policy, apply the
//! change, append the audit record, enqueue in-app notifications.

use std::collections::HashMap;
use std::sync::Arc;

use serde::Serialize;
use uuid::Uuid;

use crate::actor::{ActorContext, Role};
use crate::audit::AuditSink;
use crate::clock::Clock;
use crate::config::EngineConfig;
use crate::error::{ConflictKind, EngineError, Precondition};
use crate::notify::NotificationDispatcher;
use crate::policy::Policy;
use crate::store::GrievanceStore;
use crate::types::*;

/// Raw intake fields, validated by the orchestrator before they get here.
#[derive(Clone, Debug)]
pub struct ComplaintDraft {
    pub citizen_id: String,
    pub title: String,
    pub description: String,
    pub location: String,
    pub coords: Option<GeoPoint>,
    pub image: Option<ImageRef>,
}

/// Complaint plus its child records, for the details endpoint.
#[derive(Clone, Debug, Serialize)]
pub struct ComplaintDetails {
    pub complaint: Complaint,
    pub proofs: Vec<ResolutionProof>,
    pub signoffs: Vec<CitizenSignoff>,
}

/// Per-complaint async mutexes so all mutations of one complaint are
/// serialized within this process. Conditional store writes are the second
/// line of defense across processes.
#[derive(Default)]
pub(crate) struct LockMap {
    locks: std::sync::Mutex<HashMap<Uuid, Arc<tokio::sync::Mutex<()>>>>,
}

impl LockMap {
    pub(crate) async fn acquire(&self, id: Uuid) -> tokio::sync::OwnedMutexGuard<()> {
        let lock = {
            let mut map = self.locks.lock().unwrap();
            map.entry(id).or_default().clone()
        };
        lock.lock_owned().await
    }
}

pub struct ComplaintEngine {
    pub(crate) store: Arc<dyn GrievanceStore>,
    pub(crate) audit: AuditSink,
    pub(crate) notifier: NotificationDispatcher,
    pub(crate) clock: Arc<dyn Clock>,
    pub(crate) config: Arc<EngineConfig>,
    pub(crate) locks: LockMap,
}

impl ComplaintEngine {
    pub fn new(
        store: Arc<dyn GrievanceStore>,
        audit: AuditSink,
        notifier: NotificationDispatcher,
        clock: Arc<dyn Clock>,
        config: Arc<EngineConfig>,
    ) -> Self {
        Self {
            store,
            audit,
            notifier,
            clock,
            config,
            locks: LockMap::default(),
        }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn audit_sink(&self) -> &AuditSink {
        &self.audit
    }

    pub fn notifier(&self) -> &NotificationDispatcher {
        &self.notifier
    }

    pub(crate) async fn load_or_fail(&self, id: Uuid) -> Result<Complaint, EngineError> {
        self.store
            .load_complaint(id)
            .await?
            .ok_or_else(|| EngineError::not_found("complaint", id))
    }

    // ── Intake ──

    /// Persist a classified draft. Routing and SLA come from configuration,
    /// falling back to the oracle's suggestion when the table has no entry.
    /// High-confidence, non-OTHER complaints auto-start as SYSTEM; the rest
    /// park in FILED for manual routing.
    pub async fn create_from_intake(
        &self,
        draft: ComplaintDraft,
        ai: AiDecision,
    ) -> Result<Complaint, EngineError> {
        let now = self.clock.now();
        let sla_days = self.config.sla_days_for(ai.category, ai.sla_days);
        let complaint = Complaint {
            id: Uuid::now_v7(),
            citizen_id: draft.citizen_id.clone(),
            title: draft.title,
            description: draft.description,
            location: draft.location,
            coords: draft.coords,
            image: draft.image,
            category: ai.category,
            priority: ai.priority,
            ai_reasoning: ai.reasoning.clone(),
            ai_confidence: ai.confidence,
            department_id: self.config.department_for(ai.category),
            staff_id: None,
            status: ComplaintStatus::Filed,
            filed_at: now,
            sla_days_assigned: sla_days,
            sla_deadline: now + chrono::Duration::days(sla_days as i64),
            resolved_at: None,
            closed_at: None,
            escalation_level: 0,
            upvote_count: 0,
            rating: None,
            rating_feedback: None,
        };
        self.store.insert_complaint(&complaint).await?;

        let citizen = ActorContext::citizen(&draft.citizen_id);
        self.audit
            .record(
                AuditEntity::Complaint,
                complaint.id,
                AuditAction::Created,
                None,
                Some(ComplaintStatus::Filed.as_str().to_string()),
                &citizen,
                Some(ai.reasoning),
            )
            .await?;

        tracing::info!(
            complaint_id = %complaint.id,
            category = complaint.category.as_str(),
            department = %complaint.department_id,
            confidence = ai.confidence,
            "complaint filed"
        );

        if ai.confidence >= self.config.ai_confidence_threshold
            && ai.category != ComplaintCategory::Other
        {
            return self
                .system_transition(complaint.id, ComplaintStatus::InProgress, "auto-start after classification")
                .await;
        }
        Ok(complaint)
    }

    // ── Transitions ──

    /// The generic authorized transition entry point.
    pub async fn transition(
        &self,
        id: Uuid,
        target: ComplaintStatus,
        actor: &ActorContext,
        reason: Option<String>,
    ) -> Result<Complaint, EngineError> {
        let _guard = self.locks.acquire(id).await;
        let complaint = self.load_or_fail(id).await?;
        let proof_count = self.store.count_proofs(id).await?;
        Policy::authorize(actor, &complaint, target, proof_count)?;
        self.apply_transition(&complaint, target, actor, reason)
            .await
    }

    /// SYSTEM-initiated transition (auto-start, timeout close, dispute
    /// re-open). Authorized as the SYSTEM principal.
    pub(crate) async fn system_transition(
        &self,
        id: Uuid,
        target: ComplaintStatus,
        reason: &str,
    ) -> Result<Complaint, EngineError> {
        let _guard = self.locks.acquire(id).await;
        let complaint = self.load_or_fail(id).await?;
        let proof_count = self.store.count_proofs(id).await?;
        let system = ActorContext::system();
        Policy::authorize(&system, &complaint, target, proof_count)?;
        self.apply_transition(&complaint, target, &system, Some(reason.to_string()))
            .await
    }

    /// Shared tail of every transition: conditional status write, timestamp
    /// invariants, audit record, citizen notification.
    pub(crate) async fn apply_transition(
        &self,
        complaint: &Complaint,
        target: ComplaintStatus,
        actor: &ActorContext,
        reason: Option<String>,
    ) -> Result<Complaint, EngineError> {
        let now = self.clock.now();
        let (resolved_at, closed_at) = match target {
            ComplaintStatus::Resolved => (Some(now), None),
            ComplaintStatus::Closed => (complaint.resolved_at, Some(now)),
            ComplaintStatus::Cancelled => (None, Some(now)),
            ComplaintStatus::InProgress | ComplaintStatus::Filed => (None, None),
        };

        let applied = self
            .store
            .set_status_if(complaint.id, complaint.status, target, resolved_at, closed_at)
            .await?;
        if !applied {
            // The row moved underneath us (e.g. scheduler auto-close racing a
            // citizen action in another process). Report against fresh state.
            let fresh = self.load_or_fail(complaint.id).await?;
            return Err(EngineError::InvalidTransition {
                from: fresh.status,
                to: target,
            });
        }

        self.audit
            .record(
                AuditEntity::Complaint,
                complaint.id,
                AuditAction::StateChange,
                Some(complaint.status.as_str().to_string()),
                Some(target.as_str().to_string()),
                actor,
                reason,
            )
            .await?;

        tracing::info!(
            complaint_id = %complaint.id,
            from = complaint.status.as_str(),
            to = target.as_str(),
            actor_role = actor.role.as_str(),
            "state change"
        );

        let kind = if target == ComplaintStatus::Resolved {
            NotificationKind::Resolution
        } else {
            NotificationKind::StatusChange
        };
        self.notifier
            .dispatch(
                &complaint.citizen_id,
                kind,
                format!("Complaint {}", target.as_str()),
                format!("\"{}\" is now {}", complaint.title, target.as_str()),
                Some(complaint.id),
            )
            .await?;

        self.load_or_fail(complaint.id).await
    }

    /// Explicit start of a FILED complaint, for the admin routing queue. The
    /// transition itself runs as SYSTEM once an administrator asks for it.
    pub async fn start(&self, id: Uuid, actor: &ActorContext) -> Result<Complaint, EngineError> {
        if !actor.is_admin() && !actor.is_system() {
            return Err(EngineError::unauthorized(
                actor.role,
                "start",
                &[Role::Admin, Role::SuperAdmin],
            ));
        }
        self.system_transition(id, ComplaintStatus::InProgress, "started by administrator")
            .await
    }

    // ── Routing & assignment ──

    /// Assign a staff member. Department heads assign within their own
    /// department; administrators may assign anywhere.
    pub async fn assign_staff(
        &self,
        id: Uuid,
        staff_id: &str,
        actor: &ActorContext,
    ) -> Result<Complaint, EngineError> {
        let _guard = self.locks.acquire(id).await;
        let mut complaint = self.load_or_fail(id).await?;
        if complaint.status.is_terminal() {
            return Err(EngineError::InvalidTransition {
                from: complaint.status,
                to: complaint.status,
            });
        }

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
                "assign staff",
                &[Role::DeptHead, Role::Admin, Role::SuperAdmin],
            ));
        }

        if complaint.staff_id.as_deref() == Some(staff_id) {
            return Err(EngineError::Conflict(ConflictKind::DuplicateAssignment));
        }

        let old = complaint.staff_id.clone();
        complaint.staff_id = Some(staff_id.to_string());
        self.store.update_complaint(&complaint).await?;

        self.audit
            .record(
                AuditEntity::Assignment,
                complaint.id,
                AuditAction::Assignment,
                old,
                Some(staff_id.to_string()),
                actor,
                None,
            )
            .await?;

        self.notifier
            .dispatch(
                staff_id,
                NotificationKind::Assignment,
                "Complaint assigned",
                format!("You have been assigned \"{}\"", complaint.title),
                Some(complaint.id),
            )
            .await?;

        self.load_or_fail(id).await
    }

    /// Administrator re-routes a complaint to a different department, the
    /// manual path for low-confidence intake. A FILED complaint starts once
    /// routing completes. A department change clears any staff assignment.
    pub async fn manual_route(
        &self,
        id: Uuid,
        department_id: &str,
        actor: &ActorContext,
        reason: Option<String>,
    ) -> Result<Complaint, EngineError> {
        if !actor.is_admin() {
            return Err(EngineError::unauthorized(
                actor.role,
                "manual routing",
                &[Role::Admin, Role::SuperAdmin],
            ));
        }
        let started;
        {
            let _guard = self.locks.acquire(id).await;
            let mut complaint = self.load_or_fail(id).await?;
            if complaint.status.is_terminal() {
                return Err(EngineError::InvalidTransition {
                    from: complaint.status,
                    to: ComplaintStatus::InProgress,
                });
            }

            let old = complaint.department_id.clone();
            if old != department_id {
                complaint.department_id = department_id.to_string();
                complaint.staff_id = None;
                self.store.update_complaint(&complaint).await?;
            }

            self.audit
                .record(
                    AuditEntity::Assignment,
                    complaint.id,
                    AuditAction::Assignment,
                    Some(old),
                    Some(department_id.to_string()),
                    actor,
                    reason,
                )
                .await?;

            started = complaint.status == ComplaintStatus::Filed;
        }
        if started {
            return self
                .system_transition(id, ComplaintStatus::InProgress, "manual routing completed")
                .await;
        }
        self.load_or_fail(id).await
    }

    // ── Rating, priority, SLA, comments ──

    /// Citizen rates the handling. Writable only while RESOLVED/CLOSED, only
    /// by the owner, only once.
    pub async fn record_rating(
        &self,
        id: Uuid,
        rating: u8,
        feedback: Option<String>,
        actor: &ActorContext,
    ) -> Result<Complaint, EngineError> {
        if !(1..=5).contains(&rating) {
            return Err(EngineError::validation("rating", "must be between 1 and 5"));
        }
        let _guard = self.locks.acquire(id).await;
        let mut complaint = self.load_or_fail(id).await?;
        if !actor.owns(&complaint.citizen_id) {
            return Err(EngineError::OwnershipRequired {
                actor: actor.user_id.clone().unwrap_or_default(),
            });
        }
        if !matches!(
            complaint.status,
            ComplaintStatus::Resolved | ComplaintStatus::Closed
        ) {
            return Err(EngineError::PreconditionFailed(
                Precondition::RatingUnavailable,
            ));
        }
        if complaint.rating.is_some() {
            return Err(EngineError::PreconditionFailed(Precondition::AlreadyRated));
        }

        complaint.rating = Some(rating);
        complaint.rating_feedback = feedback;
        self.store.update_complaint(&complaint).await?;

        self.audit
            .record(
                AuditEntity::Complaint,
                complaint.id,
                AuditAction::Rating,
                None,
                Some(rating.to_string()),
                actor,
                None,
            )
            .await?;
        Ok(complaint)
    }

    /// Raise priority one step (saturating at CRITICAL). Internal: escalation
    /// and community pressure call this; it is not an HTTP-facing operation.
    pub async fn apply_priority_upgrade(
        &self,
        id: Uuid,
        reason: &str,
    ) -> Result<Complaint, EngineError> {
        let _guard = self.locks.acquire(id).await;
        let mut complaint = self.load_or_fail(id).await?;
        if complaint.status.is_terminal() {
            return Ok(complaint);
        }
        let old = complaint.priority;
        let new = old.raised();
        if new == old {
            return Ok(complaint);
        }
        complaint.priority = new;
        self.store.update_complaint(&complaint).await?;

        self.audit
            .record(
                AuditEntity::Complaint,
                complaint.id,
                AuditAction::Updated,
                Some(old.as_str().to_string()),
                Some(new.as_str().to_string()),
                &ActorContext::system(),
                Some(reason.to_string()),
            )
            .await?;
        Ok(complaint)
    }

    /// Manual SLA override: re-records the deadline from the filing instant.
    pub async fn override_sla(
        &self,
        id: Uuid,
        sla_days: u32,
        actor: &ActorContext,
        reason: Option<String>,
    ) -> Result<Complaint, EngineError> {
        if !actor.is_admin() {
            return Err(EngineError::unauthorized(
                actor.role,
                "SLA override",
                &[Role::Admin, Role::SuperAdmin],
            ));
        }
        if sla_days == 0 {
            return Err(EngineError::validation("sla_days", "must be positive"));
        }
        let _guard = self.locks.acquire(id).await;
        let mut complaint = self.load_or_fail(id).await?;
        if complaint.status.is_terminal() {
            return Err(EngineError::InvalidTransition {
                from: complaint.status,
                to: complaint.status,
            });
        }

        let old_deadline = complaint.sla_deadline;
        complaint.sla_days_assigned = sla_days;
        complaint.sla_deadline = complaint.filed_at + chrono::Duration::days(sla_days as i64);
        self.store.update_complaint(&complaint).await?;

        self.audit
            .record(
                AuditEntity::Sla,
                complaint.id,
                AuditAction::SlaUpdate,
                Some(old_deadline.to_rfc3339()),
                Some(complaint.sla_deadline.to_rfc3339()),
                actor,
                reason,
            )
            .await?;
        Ok(complaint)
    }

    /// Append a free-text comment to the audit trail.
    pub async fn add_comment(
        &self,
        id: Uuid,
        actor: &ActorContext,
        text: &str,
    ) -> Result<AuditEvent, EngineError> {
        let trimmed = text.trim();
        if trimmed.is_empty() {
            return Err(EngineError::validation("comment", "must not be empty"));
        }
        if trimmed.len() > 2000 {
            return Err(EngineError::validation("comment", "too long (max 2000)"));
        }
        self.load_or_fail(id).await?;
        self.audit
            .record(
                AuditEntity::Complaint,
                id,
                AuditAction::Comment,
                None,
                Some(trimmed.to_string()),
                actor,
                None,
            )
            .await
    }

    // ── Reads ──

    pub async fn get(&self, id: Uuid) -> Result<Complaint, EngineError> {
        self.load_or_fail(id).await
    }

    pub async fn details(&self, id: Uuid) -> Result<ComplaintDetails, EngineError> {
        let complaint = self.load_or_fail(id).await?;
        let proofs = self.store.load_proofs(id).await?;
        let signoffs = self.store.load_signoffs(id).await?;
        Ok(ComplaintDetails {
            complaint,
            proofs,
            signoffs,
        })
    }

    /// What may this actor legally request on this complaint right now?
    pub async fn allowed_transitions(
        &self,
        id: Uuid,
        actor: &ActorContext,
    ) -> Result<Vec<ComplaintStatus>, EngineError> {
        let complaint = self.load_or_fail(id).await?;
        let proof_count = self.store.count_proofs(id).await?;
        Ok(Policy::allowed_transitions(actor, &complaint, proof_count))
    }

    pub async fn list_by_citizen(&self, citizen_id: &str) -> Result<Vec<Complaint>, EngineError> {
        Ok(self.store.list_by_citizen(citizen_id).await?)
    }

    pub async fn list_by_department(
        &self,
        department_id: &str,
    ) -> Result<Vec<Complaint>, EngineError> {
        Ok(self.store.list_by_department(department_id).await?)
    }

    pub async fn list_by_status(
        &self,
        statuses: &[ComplaintStatus],
    ) -> Result<Vec<Complaint>, EngineError> {
        Ok(self.store.list_by_status(statuses).await?)
    }

    /// The administrator's manual-routing queue.
    pub async fn pending_routing(&self) -> Result<Vec<Complaint>, EngineError> {
        Ok(self
            .store
            .list_pending_routing(self.config.ai_confidence_threshold)
            .await?)
    }
}
