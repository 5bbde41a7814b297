use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::types::*;

/// Result of an upvote insert/remove. Both directions report the count after
/// the operation so double-submits can be answered idempotently.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum UpvoteOutcome {
    /// The vote was recorded (or removed); count is the new total.
    Applied { count: u32 },
    /// Nothing changed: the pair already existed (on add) or did not exist
    /// (on remove); count is the current total.
    Unchanged { count: u32 },
}

impl UpvoteOutcome {
    pub fn count(&self) -> u32 {
        match self {
            UpvoteOutcome::Applied { count } | UpvoteOutcome::Unchanged { count } => *count,
        }
    }
}

/// Persistence trait for all grievance state.
///
/// Every mutator in the engine goes through this trait, enabling pluggable
/// backends (MemoryStore for tests and zero-config runs, Postgres for
/// production). The `..._if` methods are conditional writes: they apply only
/// when the stored row still matches the expectation and report whether they
/// did, which is what makes escalation and auto-close sweeps re-runnable.
#[async_trait]
pub trait GrievanceStore: Send + Sync {
    // ── Complaints ──

    async fn insert_complaint(&self, complaint: &Complaint) -> Result<()>;
    async fn load_complaint(&self, id: Uuid) -> Result<Option<Complaint>>;
    /// Full-row write; callers hold the per-complaint engine lock. The
    /// upvote counter is excluded: it belongs to `add_upvote`/`remove_upvote`
    /// and mutates outside that lock.
    async fn update_complaint(&self, complaint: &Complaint) -> Result<()>;

    /// Set status to `next` only if the row is still at `expect`. Also writes
    /// the accompanying timestamp columns. Returns false if the row moved.
    async fn set_status_if(
        &self,
        id: Uuid,
        expect: ComplaintStatus,
        next: ComplaintStatus,
        resolved_at: Option<DateTime<Utc>>,
        closed_at: Option<DateTime<Utc>>,
    ) -> Result<bool>;

    /// Advance escalation level only if it is still `expect_level`; raises
    /// priority in the same write. Returns false if another sweep won.
    async fn escalate_if_level(
        &self,
        id: Uuid,
        expect_level: u8,
        new_level: u8,
        new_priority: Priority,
    ) -> Result<bool>;

    async fn list_by_status(&self, statuses: &[ComplaintStatus]) -> Result<Vec<Complaint>>;
    async fn list_by_citizen(&self, citizen_id: &str) -> Result<Vec<Complaint>>;
    async fn list_by_department(&self, department_id: &str) -> Result<Vec<Complaint>>;
    /// FILED or IN_PROGRESS complaints whose deadline has passed.
    async fn list_overdue(&self, now: DateTime<Utc>) -> Result<Vec<Complaint>>;
    /// Complaints in `statuses` that carry coordinates (duplicate / nearby
    /// searches).
    async fn list_with_coords(&self, statuses: &[ComplaintStatus]) -> Result<Vec<Complaint>>;
    /// The admin manual-routing queue: FILED with classifier confidence below
    /// `confidence_below`, or classified OTHER.
    async fn list_pending_routing(&self, confidence_below: f64) -> Result<Vec<Complaint>>;
    /// Top `limit` non-terminal complaints by upvote count.
    async fn list_top_upvoted(&self, limit: usize) -> Result<Vec<Complaint>>;

    // ── Resolution proofs ──

    async fn append_proof(&self, proof: &ResolutionProof) -> Result<()>;
    async fn load_proofs(&self, complaint_id: Uuid) -> Result<Vec<ResolutionProof>>;
    async fn count_proofs(&self, complaint_id: Uuid) -> Result<u64>;

    // ── Citizen signoffs ──

    async fn append_signoff(&self, signoff: &CitizenSignoff) -> Result<()>;
    async fn load_signoffs(&self, complaint_id: Uuid) -> Result<Vec<CitizenSignoff>>;
    async fn load_signoff(&self, id: Uuid) -> Result<Option<CitizenSignoff>>;
    async fn active_signoff(&self, complaint_id: Uuid) -> Result<Option<CitizenSignoff>>;
    /// Adjudication: moves the dispute sub-state / active flag. Content is
    /// never rewritten.
    async fn update_signoff(&self, signoff: &CitizenSignoff) -> Result<()>;

    // ── Upvotes ──

    /// Insert if the (complaint, citizen) pair is new and bump the counter
    /// atomically.
    async fn add_upvote(&self, upvote: &Upvote) -> Result<UpvoteOutcome>;
    async fn remove_upvote(&self, complaint_id: Uuid, citizen_id: &str) -> Result<UpvoteOutcome>;

    // ── Audit log (append-only) ──

    /// Append an event and return its store-assigned sequence number.
    async fn append_audit(&self, event: &AuditEvent) -> Result<u64>;
    async fn audit_for_entity(
        &self,
        entity: AuditEntity,
        entity_id: &str,
    ) -> Result<Vec<AuditEvent>>;
    async fn audit_recent(&self, limit: usize) -> Result<Vec<AuditEvent>>;
    async fn audit_by_action(&self, action: AuditAction) -> Result<Vec<AuditEvent>>;
    async fn audit_by_actor(&self, actor_id: &str) -> Result<Vec<AuditEvent>>;
    async fn audit_in_range(
        &self,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> Result<Vec<AuditEvent>>;

    // ── Notifications ──

    async fn insert_notification(&self, notification: &Notification) -> Result<()>;
    async fn notifications_for(
        &self,
        recipient_id: &str,
        unread_only: bool,
        limit: usize,
    ) -> Result<Vec<Notification>>;
    async fn unread_count(&self, recipient_id: &str) -> Result<u64>;
    async fn mark_notification_read(&self, id: Uuid, recipient_id: &str) -> Result<bool>;
    /// Has `recipient_id` already been notified with `kind` about this
    /// complaint? Keeps stall warnings from repeating every sweep.
    async fn notification_exists(
        &self,
        recipient_id: &str,
        kind: NotificationKind,
        complaint_id: Uuid,
    ) -> Result<bool>;
}
