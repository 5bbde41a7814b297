use anyhow::{anyhow, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::store::{GrievanceStore, UpvoteOutcome};
use crate::types::*;

struct Inner {
    complaints: HashMap<Uuid, Complaint>,
    proofs: HashMap<Uuid, Vec<ResolutionProof>>,
    signoffs: HashMap<Uuid, Vec<CitizenSignoff>>,
    upvotes: HashMap<(Uuid, String), Upvote>,
    audit: Vec<AuditEvent>,
    audit_seq: u64,
    notifications: Vec<Notification>,
}

/// In-memory implementation of `GrievanceStore` for tests and zero-config
/// runs.
pub struct MemoryStore {
    inner: RwLock<Inner>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self {
            inner: RwLock::new(Inner {
                complaints: HashMap::new(),
                proofs: HashMap::new(),
                signoffs: HashMap::new(),
                upvotes: HashMap::new(),
                audit: Vec::new(),
                audit_seq: 0,
                notifications: Vec::new(),
            }),
        }
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

/// Stable ordering for list queries: filing time, then id.
fn sort_complaints(mut v: Vec<Complaint>) -> Vec<Complaint> {
    v.sort_by(|a, b| a.filed_at.cmp(&b.filed_at).then(a.id.cmp(&b.id)));
    v
}

/// Chronological ascending, insertion order as tiebreak.
fn sort_audit(mut v: Vec<AuditEvent>) -> Vec<AuditEvent> {
    v.sort_by(|a, b| a.created_at.cmp(&b.created_at).then(a.seq.cmp(&b.seq)));
    v
}

#[async_trait]
impl GrievanceStore for MemoryStore {
    // ── Complaints ──

    async fn insert_complaint(&self, complaint: &Complaint) -> Result<()> {
        let mut w = self.inner.write().await;
        w.complaints.insert(complaint.id, complaint.clone());
        Ok(())
    }

    async fn load_complaint(&self, id: Uuid) -> Result<Option<Complaint>> {
        let r = self.inner.read().await;
        Ok(r.complaints.get(&id).cloned())
    }

    async fn update_complaint(&self, complaint: &Complaint) -> Result<()> {
        let mut w = self.inner.write().await;
        let slot = w
            .complaints
            .get_mut(&complaint.id)
            .ok_or_else(|| anyhow!("complaint not found: {}", complaint.id))?;
        // The upvote counter is owned by the upvote operations and mutates
        // outside the engine lock; full-row writes never touch it.
        let upvote_count = slot.upvote_count;
        *slot = complaint.clone();
        slot.upvote_count = upvote_count;
        Ok(())
    }

    async fn set_status_if(
        &self,
        id: Uuid,
        expect: ComplaintStatus,
        next: ComplaintStatus,
        resolved_at: Option<DateTime<Utc>>,
        closed_at: Option<DateTime<Utc>>,
    ) -> Result<bool> {
        let mut w = self.inner.write().await;
        let c = w
            .complaints
            .get_mut(&id)
            .ok_or_else(|| anyhow!("complaint not found: {id}"))?;
        if c.status != expect {
            return Ok(false);
        }
        c.status = next;
        c.resolved_at = resolved_at;
        c.closed_at = closed_at;
        Ok(true)
    }

    async fn escalate_if_level(
        &self,
        id: Uuid,
        expect_level: u8,
        new_level: u8,
        new_priority: Priority,
    ) -> Result<bool> {
        let mut w = self.inner.write().await;
        let c = w
            .complaints
            .get_mut(&id)
            .ok_or_else(|| anyhow!("complaint not found: {id}"))?;
        if c.escalation_level != expect_level {
            return Ok(false);
        }
        c.escalation_level = new_level;
        c.priority = new_priority;
        Ok(true)
    }

    async fn list_by_status(&self, statuses: &[ComplaintStatus]) -> Result<Vec<Complaint>> {
        let r = self.inner.read().await;
        Ok(sort_complaints(
            r.complaints
                .values()
                .filter(|c| statuses.contains(&c.status))
                .cloned()
                .collect(),
        ))
    }

    async fn list_by_citizen(&self, citizen_id: &str) -> Result<Vec<Complaint>> {
        let r = self.inner.read().await;
        Ok(sort_complaints(
            r.complaints
                .values()
                .filter(|c| c.citizen_id == citizen_id)
                .cloned()
                .collect(),
        ))
    }

    async fn list_by_department(&self, department_id: &str) -> Result<Vec<Complaint>> {
        let r = self.inner.read().await;
        Ok(sort_complaints(
            r.complaints
                .values()
                .filter(|c| c.department_id == department_id)
                .cloned()
                .collect(),
        ))
    }

    async fn list_overdue(&self, now: DateTime<Utc>) -> Result<Vec<Complaint>> {
        let r = self.inner.read().await;
        Ok(sort_complaints(
            r.complaints
                .values()
                .filter(|c| {
                    matches!(
                        c.status,
                        ComplaintStatus::Filed | ComplaintStatus::InProgress
                    ) && now > c.sla_deadline
                })
                .cloned()
                .collect(),
        ))
    }

    async fn list_with_coords(&self, statuses: &[ComplaintStatus]) -> Result<Vec<Complaint>> {
        let r = self.inner.read().await;
        Ok(sort_complaints(
            r.complaints
                .values()
                .filter(|c| statuses.contains(&c.status) && c.coords.is_some())
                .cloned()
                .collect(),
        ))
    }

    async fn list_pending_routing(&self, confidence_below: f64) -> Result<Vec<Complaint>> {
        let r = self.inner.read().await;
        Ok(sort_complaints(
            r.complaints
                .values()
                .filter(|c| {
                    c.status == ComplaintStatus::Filed
                        && (c.ai_confidence < confidence_below
                            || c.category == ComplaintCategory::Other)
                })
                .cloned()
                .collect(),
        ))
    }

    async fn list_top_upvoted(&self, limit: usize) -> Result<Vec<Complaint>> {
        let r = self.inner.read().await;
        let mut v: Vec<Complaint> = r
            .complaints
            .values()
            .filter(|c| !c.status.is_terminal())
            .cloned()
            .collect();
        v.sort_by(|a, b| {
            b.upvote_count
                .cmp(&a.upvote_count)
                .then(a.filed_at.cmp(&b.filed_at))
        });
        v.truncate(limit);
        Ok(v)
    }

    // ── Resolution proofs ──

    async fn append_proof(&self, proof: &ResolutionProof) -> Result<()> {
        let mut w = self.inner.write().await;
        w.proofs
            .entry(proof.complaint_id)
            .or_default()
            .push(proof.clone());
        Ok(())
    }

    async fn load_proofs(&self, complaint_id: Uuid) -> Result<Vec<ResolutionProof>> {
        let r = self.inner.read().await;
        Ok(r.proofs.get(&complaint_id).cloned().unwrap_or_default())
    }

    async fn count_proofs(&self, complaint_id: Uuid) -> Result<u64> {
        let r = self.inner.read().await;
        Ok(r.proofs.get(&complaint_id).map_or(0, |p| p.len() as u64))
    }

    // ── Citizen signoffs ──

    async fn append_signoff(&self, signoff: &CitizenSignoff) -> Result<()> {
        let mut w = self.inner.write().await;
        w.signoffs
            .entry(signoff.complaint_id)
            .or_default()
            .push(signoff.clone());
        Ok(())
    }

    async fn load_signoffs(&self, complaint_id: Uuid) -> Result<Vec<CitizenSignoff>> {
        let r = self.inner.read().await;
        Ok(r.signoffs.get(&complaint_id).cloned().unwrap_or_default())
    }

    async fn load_signoff(&self, id: Uuid) -> Result<Option<CitizenSignoff>> {
        let r = self.inner.read().await;
        Ok(r.signoffs
            .values()
            .flatten()
            .find(|s| s.id == id)
            .cloned())
    }

    async fn active_signoff(&self, complaint_id: Uuid) -> Result<Option<CitizenSignoff>> {
        let r = self.inner.read().await;
        Ok(r.signoffs
            .get(&complaint_id)
            .and_then(|v| v.iter().find(|s| s.active))
            .cloned())
    }

    async fn update_signoff(&self, signoff: &CitizenSignoff) -> Result<()> {
        let mut w = self.inner.write().await;
        let list = w
            .signoffs
            .get_mut(&signoff.complaint_id)
            .ok_or_else(|| anyhow!("signoff not found: {}", signoff.id))?;
        let slot = list
            .iter_mut()
            .find(|s| s.id == signoff.id)
            .ok_or_else(|| anyhow!("signoff not found: {}", signoff.id))?;
        *slot = signoff.clone();
        Ok(())
    }

    // ── Upvotes ──

    async fn add_upvote(&self, upvote: &Upvote) -> Result<UpvoteOutcome> {
        let mut w = self.inner.write().await;
        let key = (upvote.complaint_id, upvote.citizen_id.clone());
        if w.upvotes.contains_key(&key) {
            let count = w
                .complaints
                .get(&upvote.complaint_id)
                .map_or(0, |c| c.upvote_count);
            return Ok(UpvoteOutcome::Unchanged { count });
        }
        let c = w
            .complaints
            .get_mut(&upvote.complaint_id)
            .ok_or_else(|| anyhow!("complaint not found: {}", upvote.complaint_id))?;
        c.upvote_count += 1;
        let count = c.upvote_count;
        w.upvotes.insert(key, upvote.clone());
        Ok(UpvoteOutcome::Applied { count })
    }

    async fn remove_upvote(&self, complaint_id: Uuid, citizen_id: &str) -> Result<UpvoteOutcome> {
        let mut w = self.inner.write().await;
        let key = (complaint_id, citizen_id.to_string());
        if w.upvotes.remove(&key).is_none() {
            let count = w.complaints.get(&complaint_id).map_or(0, |c| c.upvote_count);
            return Ok(UpvoteOutcome::Unchanged { count });
        }
        let c = w
            .complaints
            .get_mut(&complaint_id)
            .ok_or_else(|| anyhow!("complaint not found: {complaint_id}"))?;
        c.upvote_count = c.upvote_count.saturating_sub(1);
        Ok(UpvoteOutcome::Applied {
            count: c.upvote_count,
        })
    }

    // ── Audit log ──

    async fn append_audit(&self, event: &AuditEvent) -> Result<u64> {
        let mut w = self.inner.write().await;
        w.audit_seq += 1;
        let seq = w.audit_seq;
        let mut stored = event.clone();
        stored.seq = seq;
        w.audit.push(stored);
        Ok(seq)
    }

    async fn audit_for_entity(
        &self,
        entity: AuditEntity,
        entity_id: &str,
    ) -> Result<Vec<AuditEvent>> {
        let r = self.inner.read().await;
        Ok(sort_audit(
            r.audit
                .iter()
                .filter(|e| e.entity_type == entity && e.entity_id == entity_id)
                .cloned()
                .collect(),
        ))
    }

    async fn audit_recent(&self, limit: usize) -> Result<Vec<AuditEvent>> {
        let r = self.inner.read().await;
        let mut all = sort_audit(r.audit.clone());
        if all.len() > limit {
            all = all.split_off(all.len() - limit);
        }
        Ok(all)
    }

    async fn audit_by_action(&self, action: AuditAction) -> Result<Vec<AuditEvent>> {
        let r = self.inner.read().await;
        Ok(sort_audit(
            r.audit
                .iter()
                .filter(|e| e.action == action)
                .cloned()
                .collect(),
        ))
    }

    async fn audit_by_actor(&self, actor_id: &str) -> Result<Vec<AuditEvent>> {
        let r = self.inner.read().await;
        Ok(sort_audit(
            r.audit
                .iter()
                .filter(|e| e.actor_id.as_deref() == Some(actor_id))
                .cloned()
                .collect(),
        ))
    }

    async fn audit_in_range(
        &self,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> Result<Vec<AuditEvent>> {
        let r = self.inner.read().await;
        Ok(sort_audit(
            r.audit
                .iter()
                .filter(|e| e.created_at >= from && e.created_at <= to)
                .cloned()
                .collect(),
        ))
    }

    // ── Notifications ──

    async fn insert_notification(&self, notification: &Notification) -> Result<()> {
        let mut w = self.inner.write().await;
        w.notifications.push(notification.clone());
        Ok(())
    }

    async fn notifications_for(
        &self,
        recipient_id: &str,
        unread_only: bool,
        limit: usize,
    ) -> Result<Vec<Notification>> {
        let r = self.inner.read().await;
        let mut v: Vec<Notification> = r
            .notifications
            .iter()
            .filter(|n| n.recipient_id == recipient_id && (!unread_only || !n.read))
            .cloned()
            .collect();
        v.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        v.truncate(limit);
        Ok(v)
    }

    async fn unread_count(&self, recipient_id: &str) -> Result<u64> {
        let r = self.inner.read().await;
        Ok(r.notifications
            .iter()
            .filter(|n| n.recipient_id == recipient_id && !n.read)
            .count() as u64)
    }

    async fn mark_notification_read(&self, id: Uuid, recipient_id: &str) -> Result<bool> {
        let mut w = self.inner.write().await;
        match w
            .notifications
            .iter_mut()
            .find(|n| n.id == id && n.recipient_id == recipient_id)
        {
            Some(n) => {
                n.read = true;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn notification_exists(
        &self,
        recipient_id: &str,
        kind: NotificationKind,
        complaint_id: Uuid,
    ) -> Result<bool> {
        let r = self.inner.read().await;
        Ok(r.notifications.iter().any(|n| {
            n.recipient_id == recipient_id && n.kind == kind && n.complaint_id == Some(complaint_id)
        }))
    }
}
