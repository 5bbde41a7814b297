//! Periodic SLA-breach sweep: escalation level advancement, auto-close of
//! aged resolutions, and stall warnings for complaints stuck in intake.
//!
//! One sweep runs at a time. Every per-complaint action is an independently
//! committed conditional write, so a partial or repeated sweep is safe: the
//! store only applies "level X -> X+1" when the row is still at X.

use std::str::FromStr;
use std::sync::Arc;

use serde::Serialize;
use tokio::sync::watch;

use crate::actor::ActorContext;
use crate::engine::ComplaintEngine;
use crate::error::{ConflictKind, EngineError};
use crate::notify::recipient;
use crate::types::*;

/// What one sweep did. Returned to the admin trigger endpoint and logged.
#[derive(Clone, Copy, Debug, Default, Serialize)]
pub struct SweepReport {
    pub examined: usize,
    pub escalated_to_dept_head: usize,
    pub escalated_to_commissioner: usize,
    pub auto_closed: usize,
    pub stall_warnings: usize,
}

/// Snapshot counts for the escalation dashboard.
#[derive(Clone, Copy, Debug, Default, Serialize)]
pub struct EscalationStats {
    pub open: usize,
    pub overdue: usize,
    pub at_level: [usize; 3],
    pub awaiting_signoff: usize,
}

pub struct EscalationScheduler {
    engine: Arc<ComplaintEngine>,
    schedule: cron::Schedule,
    sweep_gate: tokio::sync::Mutex<()>,
}

impl std::fmt::Debug for EscalationScheduler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EscalationScheduler")
            .field("schedule", &self.schedule)
            .finish_non_exhaustive()
    }
}

impl EscalationScheduler {
    pub fn new(engine: Arc<ComplaintEngine>) -> Result<Self, EngineError> {
        let expr = engine.config().escalation_cron.clone();
        let schedule = cron::Schedule::from_str(&expr)
            .map_err(|e| EngineError::validation("escalation_cron", e.to_string()))?;
        Ok(Self {
            engine,
            schedule,
            sweep_gate: tokio::sync::Mutex::new(()),
        })
    }

    /// Background loop: sleep until the next cron fire, sweep, repeat.
    /// Returns when the shutdown signal flips.
    pub async fn run(self: Arc<Self>, mut shutdown: watch::Receiver<bool>) {
        loop {
            let now = self.engine.clock.now();
            let next = match self.schedule.after(&now).next() {
                Some(t) => t,
                None => {
                    tracing::error!("escalation cron yields no future fire, scheduler stopping");
                    return;
                }
            };
            let wait = (next - now).to_std().unwrap_or_default();
            tracing::debug!(next_fire = %next, "escalation sweep scheduled");

            tokio::select! {
                _ = tokio::time::sleep(wait) => {}
                _ = shutdown.changed() => {
                    if *shutdown.borrow() {
                        tracing::info!("escalation scheduler shutting down");
                        return;
                    }
                }
            }

            match self.sweep(Some(&shutdown)).await {
                Ok(report) => tracing::info!(?report, "escalation sweep finished"),
                Err(EngineError::Conflict(ConflictKind::SweepInProgress)) => {
                    tracing::warn!("sweep overlapped previous run, skipped");
                }
                Err(err) => tracing::error!(error = %err, "escalation sweep failed"),
            }
        }
    }

    /// One full sweep. Also the body of the explicit admin trigger; refuses
    /// to overlap a running sweep.
    pub async fn sweep(
        &self,
        shutdown: Option<&watch::Receiver<bool>>,
    ) -> Result<SweepReport, EngineError> {
        let _gate = self
            .sweep_gate
            .try_lock()
            .map_err(|_| EngineError::Conflict(ConflictKind::SweepInProgress))?;

        let now = self.engine.clock.now();
        let candidates = self
            .engine
            .store
            .list_by_status(&[
                ComplaintStatus::Filed,
                ComplaintStatus::InProgress,
                ComplaintStatus::Resolved,
            ])
            .await?;

        let mut report = SweepReport::default();
        for complaint in candidates {
            if shutdown.is_some_and(|s| *s.borrow()) {
                tracing::info!(?report, "sweep interrupted by shutdown");
                break;
            }
            report.examined += 1;
            match complaint.status {
                ComplaintStatus::InProgress if complaint.is_overdue(now) => {
                    self.escalate(&complaint, now, &mut report).await?;
                }
                ComplaintStatus::Resolved => {
                    self.maybe_auto_close(&complaint, now, &mut report).await?;
                }
                ComplaintStatus::Filed => {
                    self.maybe_warn_stalled(&complaint, now, &mut report).await?;
                }
                _ => {}
            }
        }
        Ok(report)
    }

    /// Level advancement for an overdue IN_PROGRESS complaint. The
    /// conditional write is what makes concurrent sweeps safe: only the one
    /// that moves the level emits audit and notifications.
    async fn escalate(
        &self,
        complaint: &Complaint,
        now: chrono::DateTime<chrono::Utc>,
        report: &mut SweepReport,
    ) -> Result<(), EngineError> {
        let breached_days = (now - complaint.sla_deadline).num_days();

        if complaint.escalation_level == 0 {
            let new_priority = complaint.priority.raised();
            let applied = self
                .engine
                .store
                .escalate_if_level(complaint.id, 0, 1, new_priority)
                .await?;
            if !applied {
                return Ok(());
            }
            report.escalated_to_dept_head += 1;
            self.record_escalation(complaint, 0, 1, new_priority, breached_days)
                .await?;
            self.engine
                .notifier
                .dispatch(
                    &recipient::dept_head(&complaint.department_id),
                    NotificationKind::Escalation,
                    "SLA breached",
                    format!(
                        "\"{}\" breached its SLA by {breached_days} day(s)",
                        complaint.title
                    ),
                    Some(complaint.id),
                )
                .await?;
        } else if complaint.escalation_level == 1
            && breached_days >= self.engine.config().escalation_l2_after_days
        {
            let applied = self
                .engine
                .store
                .escalate_if_level(complaint.id, 1, 2, Priority::Critical)
                .await?;
            if !applied {
                return Ok(());
            }
            report.escalated_to_commissioner += 1;
            self.record_escalation(complaint, 1, 2, Priority::Critical, breached_days)
                .await?;
            self.engine
                .notifier
                .dispatch(
                    recipient::COMMISSIONER,
                    NotificationKind::Escalation,
                    "SLA breach unresolved",
                    format!(
                        "\"{}\" remains unresolved {breached_days} day(s) past its SLA",
                        complaint.title
                    ),
                    Some(complaint.id),
                )
                .await?;
        }
        Ok(())
    }

    async fn record_escalation(
        &self,
        complaint: &Complaint,
        old_level: u8,
        new_level: u8,
        new_priority: Priority,
        breached_days: i64,
    ) -> Result<(), EngineError> {
        let system = ActorContext::system();
        self.engine
            .audit
            .record(
                AuditEntity::Complaint,
                complaint.id,
                AuditAction::Escalation,
                Some(old_level.to_string()),
                Some(new_level.to_string()),
                &system,
                Some(format!("SLA breached by {breached_days} days")),
            )
            .await?;
        if new_priority != complaint.priority {
            self.engine
                .audit
                .record(
                    AuditEntity::Complaint,
                    complaint.id,
                    AuditAction::Updated,
                    Some(complaint.priority.as_str().to_string()),
                    Some(new_priority.as_str().to_string()),
                    &system,
                    Some("escalation priority raise".to_string()),
                )
                .await?;
        }
        Ok(())
    }

    /// RESOLVED complaints past the citizen response window close as SYSTEM,
    /// unless a pending dispute is holding the handshake open.
    async fn maybe_auto_close(
        &self,
        complaint: &Complaint,
        now: chrono::DateTime<chrono::Utc>,
        report: &mut SweepReport,
    ) -> Result<(), EngineError> {
        let resolved_at = match complaint.resolved_at {
            Some(t) => t,
            None => return Ok(()),
        };
        if now - resolved_at < self.engine.config().signoff_window() {
            return Ok(());
        }
        if let Some(signoff) = self.engine.store.active_signoff(complaint.id).await? {
            if signoff.pending_dispute() {
                return Ok(());
            }
        }
        match self
            .engine
            .system_transition(
                complaint.id,
                ComplaintStatus::Closed,
                "auto-close after response window",
            )
            .await
        {
            Ok(_) => report.auto_closed += 1,
            // Lost the race to a citizen action in flight; nothing to do.
            Err(EngineError::InvalidTransition { .. }) => {}
            Err(err) => return Err(err),
        }
        Ok(())
    }

    /// A complaint still FILED long after intake points at a stalled routing
    /// pipeline. Warn the administrators once; never escalate.
    async fn maybe_warn_stalled(
        &self,
        complaint: &Complaint,
        now: chrono::DateTime<chrono::Utc>,
        report: &mut SweepReport,
    ) -> Result<(), EngineError> {
        if now - complaint.filed_at < self.engine.config().filed_stall_window() {
            return Ok(());
        }
        if self
            .engine
            .notifier
            .already_notified(recipient::ADMIN, NotificationKind::SlaWarning, complaint.id)
            .await?
        {
            return Ok(());
        }
        self.engine
            .notifier
            .dispatch(
                recipient::ADMIN,
                NotificationKind::SlaWarning,
                "Complaint awaiting routing",
                format!(
                    "\"{}\" has been FILED without routing since {}",
                    complaint.title,
                    complaint.filed_at.to_rfc3339()
                ),
                Some(complaint.id),
            )
            .await?;
        report.stall_warnings += 1;
        Ok(())
    }

    // ── Read surface ──

    /// FILED / IN_PROGRESS complaints past their deadline.
    pub async fn overdue(&self) -> Result<Vec<Complaint>, EngineError> {
        Ok(self
            .engine
            .store
            .list_overdue(self.engine.clock.now())
            .await?)
    }

    pub async fn stats(&self) -> Result<EscalationStats, EngineError> {
        let now = self.engine.clock.now();
        let open = self
            .engine
            .store
            .list_by_status(&[
                ComplaintStatus::Filed,
                ComplaintStatus::InProgress,
                ComplaintStatus::Resolved,
            ])
            .await?;
        let mut stats = EscalationStats {
            open: open.len(),
            ..Default::default()
        };
        for c in &open {
            if c.status == ComplaintStatus::Resolved {
                stats.awaiting_signoff += 1;
            }
            if !c.status.is_terminal() && c.status != ComplaintStatus::Resolved && c.is_overdue(now)
            {
                stats.overdue += 1;
            }
            if (c.escalation_level as usize) < 3 {
                stats.at_level[c.escalation_level as usize] += 1;
            }
        }
        Ok(stats)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audit::AuditSink;
    use crate::clock::Clock;
    use crate::clock::ManualClock;
    use crate::config::EngineConfig;
    use crate::notify::NotificationDispatcher;
    use crate::store::GrievanceStore;
    use crate::store_memory::MemoryStore;
    use chrono::{TimeZone, Utc};
    use uuid::Uuid;

    struct Harness {
        store: Arc<MemoryStore>,
        clock: Arc<ManualClock>,
        engine: Arc<ComplaintEngine>,
        scheduler: EscalationScheduler,
    }

    fn harness() -> Harness {
        let store = Arc::new(MemoryStore::new());
        let clock = Arc::new(ManualClock::new(
            Utc.with_ymd_and_hms(2025, 6, 10, 12, 0, 0).unwrap(),
        ));
        let config = Arc::new(EngineConfig::default());
        let audit = AuditSink::new(store.clone(), clock.clone());
        let notifier = NotificationDispatcher::new(store.clone(), clock.clone(), None);
        let engine = Arc::new(ComplaintEngine::new(
            store.clone(),
            audit,
            notifier,
            clock.clone(),
            config,
        ));
        let scheduler = EscalationScheduler::new(engine.clone()).unwrap();
        Harness {
            store,
            clock,
            engine,
            scheduler,
        }
    }

    fn complaint(
        status: ComplaintStatus,
        level: u8,
        deadline_offset_days: i64,
        now: chrono::DateTime<Utc>,
    ) -> Complaint {
        let filed_at = now - chrono::Duration::days(5);
        Complaint {
            id: Uuid::now_v7(),
            citizen_id: "c-42".to_string(),
            title: "Pothole on MG Road".to_string(),
            description: "large pothole".to_string(),
            location: "MG Road".to_string(),
            coords: None,
            image: None,
            category: ComplaintCategory::Pothole,
            priority: Priority::Medium,
            ai_reasoning: String::new(),
            ai_confidence: 0.9,
            department_id: "ROADS".to_string(),
            staff_id: None,
            status,
            filed_at,
            sla_days_assigned: 3,
            sla_deadline: now + chrono::Duration::days(deadline_offset_days),
            resolved_at: (status == ComplaintStatus::Resolved)
                .then(|| now - chrono::Duration::hours(80)),
            closed_at: None,
            escalation_level: level,
            upvote_count: 0,
            rating: None,
            rating_feedback: None,
        }
    }

    #[tokio::test]
    async fn escalates_overdue_level_zero_and_is_idempotent() {
        let h = harness();
        let now = h.clock.now();
        let c = complaint(ComplaintStatus::InProgress, 0, -2, now);
        h.store.insert_complaint(&c).await.unwrap();

        let report = h.scheduler.sweep(None).await.unwrap();
        assert_eq!(report.escalated_to_dept_head, 1);

        let after = h.store.load_complaint(c.id).await.unwrap().unwrap();
        assert_eq!(after.escalation_level, 1);
        assert_eq!(after.priority, Priority::High);

        let audits = h
            .engine
            .audit_sink()
            .by_action(AuditAction::Escalation)
            .await
            .unwrap();
        assert_eq!(audits.len(), 1);
        assert_eq!(audits[0].old_value.as_deref(), Some("0"));
        assert_eq!(audits[0].new_value.as_deref(), Some("1"));
        assert_eq!(
            audits[0].reason.as_deref(),
            Some("SLA breached by 2 days")
        );
        assert_eq!(audits[0].actor_type, ActorType::System);

        let inbox = h
            .engine
            .notifier()
            .inbox(&recipient::dept_head("ROADS"), false, 10)
            .await
            .unwrap();
        assert_eq!(inbox.len(), 1);

        // Second immediate run: same state, no extra audit, no extra mail.
        let report2 = h.scheduler.sweep(None).await.unwrap();
        assert_eq!(report2.escalated_to_dept_head, 0);
        let after2 = h.store.load_complaint(c.id).await.unwrap().unwrap();
        assert_eq!(after2.escalation_level, 1);
        assert_eq!(
            h.engine
                .audit_sink()
                .by_action(AuditAction::Escalation)
                .await
                .unwrap()
                .len(),
            1
        );
        assert_eq!(
            h.engine
                .notifier()
                .inbox(&recipient::dept_head("ROADS"), false, 10)
                .await
                .unwrap()
                .len(),
            1
        );
    }

    #[tokio::test]
    async fn advances_to_commissioner_after_grace_days() {
        let h = harness();
        let now = h.clock.now();

        // Breached by 2 days at level 1: not yet commissioner territory.
        let early = complaint(ComplaintStatus::InProgress, 1, -2, now);
        h.store.insert_complaint(&early).await.unwrap();
        h.scheduler.sweep(None).await.unwrap();
        assert_eq!(
            h.store
                .load_complaint(early.id)
                .await
                .unwrap()
                .unwrap()
                .escalation_level,
            1
        );

        // Breached by 4 days at level 1: goes to 2, priority CRITICAL.
        let late = complaint(ComplaintStatus::InProgress, 1, -4, now);
        h.store.insert_complaint(&late).await.unwrap();
        let report = h.scheduler.sweep(None).await.unwrap();
        assert_eq!(report.escalated_to_commissioner, 1);
        let after = h.store.load_complaint(late.id).await.unwrap().unwrap();
        assert_eq!(after.escalation_level, 2);
        assert_eq!(after.priority, Priority::Critical);

        let inbox = h
            .engine
            .notifier()
            .inbox(recipient::COMMISSIONER, false, 10)
            .await
            .unwrap();
        assert_eq!(inbox.len(), 1);
    }

    #[tokio::test]
    async fn auto_closes_aged_resolutions_but_not_pending_disputes() {
        let h = harness();
        let now = h.clock.now();

        let aged = complaint(ComplaintStatus::Resolved, 0, 1, now);
        h.store.insert_complaint(&aged).await.unwrap();

        let disputed = complaint(ComplaintStatus::Resolved, 0, 1, now);
        h.store.insert_complaint(&disputed).await.unwrap();
        h.store
            .append_signoff(&CitizenSignoff {
                id: Uuid::now_v7(),
                complaint_id: disputed.id,
                citizen_id: "c-42".to_string(),
                kind: SignoffKind::Dispute {
                    reason: "still broken".to_string(),
                    counter_proof_image_key: None,
                    status: DisputeStatus::Pending,
                },
                active: true,
                created_at: now,
                decided_at: None,
                decided_by: None,
            })
            .await
            .unwrap();

        let report = h.scheduler.sweep(None).await.unwrap();
        assert_eq!(report.auto_closed, 1);

        let closed = h.store.load_complaint(aged.id).await.unwrap().unwrap();
        assert_eq!(closed.status, ComplaintStatus::Closed);
        assert!(closed.closed_at.is_some());

        let held = h.store.load_complaint(disputed.id).await.unwrap().unwrap();
        assert_eq!(held.status, ComplaintStatus::Resolved);
    }

    #[tokio::test]
    async fn warns_once_about_stalled_intake() {
        let h = harness();
        let now = h.clock.now();

        let mut stalled = complaint(ComplaintStatus::Filed, 0, 1, now);
        stalled.filed_at = now - chrono::Duration::hours(72);
        h.store.insert_complaint(&stalled).await.unwrap();

        let report = h.scheduler.sweep(None).await.unwrap();
        assert_eq!(report.stall_warnings, 1);
        // still FILED, never escalated
        let after = h.store.load_complaint(stalled.id).await.unwrap().unwrap();
        assert_eq!(after.status, ComplaintStatus::Filed);
        assert_eq!(after.escalation_level, 0);

        let report2 = h.scheduler.sweep(None).await.unwrap();
        assert_eq!(report2.stall_warnings, 0);
        assert_eq!(
            h.engine
                .notifier()
                .inbox(recipient::ADMIN, false, 10)
                .await
                .unwrap()
                .len(),
            1
        );
    }

    #[tokio::test]
    async fn stats_counts_by_level() {
        let h = harness();
        let now = h.clock.now();
        h.store
            .insert_complaint(&complaint(ComplaintStatus::InProgress, 0, -1, now))
            .await
            .unwrap();
        h.store
            .insert_complaint(&complaint(ComplaintStatus::InProgress, 1, -4, now))
            .await
            .unwrap();
        h.store
            .insert_complaint(&complaint(ComplaintStatus::Resolved, 2, 1, now))
            .await
            .unwrap();

        let stats = h.scheduler.stats().await.unwrap();
        assert_eq!(stats.open, 3);
        assert_eq!(stats.overdue, 2);
        assert_eq!(stats.at_level, [1, 1, 1]);
        assert_eq!(stats.awaiting_signoff, 1);
    }

    #[tokio::test]
    async fn bad_cron_expression_is_a_validation_error() {
        let h = harness();
        let mut config = EngineConfig::default();
        config.escalation_cron = "not a cron".to_string();
        let engine = Arc::new(ComplaintEngine::new(
            h.store.clone(),
            AuditSink::new(h.store.clone(), h.clock.clone()),
            NotificationDispatcher::new(h.store.clone(), h.clock.clone(), None),
            h.clock.clone(),
            Arc::new(config),
        ));
        let err = EscalationScheduler::new(engine).unwrap_err();
        assert!(matches!(err, EngineError::Validation { .. }));
    }
}
