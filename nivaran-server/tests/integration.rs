//! Integration tests: exercise the full grievance lifecycle through the
//! engine facade that the HTTP handlers delegate to.
//!
//! Handlers are thin wrappers, so driving the engine with handler-shaped
//! inputs validates the full stack without a socket.

use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;
use chrono::{Duration, TimeZone, Utc};

use nivaran_core::actor::ActorContext;
use nivaran_core::audit::AuditSink;
use nivaran_core::clock::ManualClock;
use nivaran_core::config::EngineConfig;
use nivaran_core::duplicate::DuplicateResolver;
use nivaran_core::engine::ComplaintEngine;
use nivaran_core::error::{ConflictKind, EngineError, Precondition};
use nivaran_core::intake::{AiOracle, IntakeOrchestrator, IntakeOutcome, IntakeRequest, ObjectStore};
use nivaran_core::notify::NotificationDispatcher;
use nivaran_core::scheduler::EscalationScheduler;
use nivaran_core::store_memory::MemoryStore;
use nivaran_core::types::*;

/// Oracle returning one fixed decision for every submission.
struct FixedOracle(AiDecision);

#[async_trait]
impl AiOracle for FixedOracle {
    async fn analyze(&self, _text: &str, _image: Option<&[u8]>) -> Result<AiDecision> {
        Ok(self.0.clone())
    }
}

/// Oracle that is always down.
struct DownOracle;

#[async_trait]
impl AiOracle for DownOracle {
    async fn analyze(&self, _text: &str, _image: Option<&[u8]>) -> Result<AiDecision> {
        anyhow::bail!("classifier timeout")
    }
}

/// Object store that accepts everything.
struct NullObjects;

#[async_trait]
impl ObjectStore for NullObjects {
    async fn put(&self, _bytes: &[u8], _mime: &str) -> Result<String> {
        Ok("obj-1".to_string())
    }

    async fn get(&self, _key: &str) -> Result<Vec<u8>> {
        Ok(Vec::new())
    }
}

struct Ctx {
    clock: Arc<ManualClock>,
    engine: Arc<ComplaintEngine>,
    resolver: Arc<DuplicateResolver>,
    scheduler: EscalationScheduler,
    config: Arc<EngineConfig>,
}

fn ctx() -> Ctx {
    let store = Arc::new(MemoryStore::new());
    let clock = Arc::new(ManualClock::new(
        Utc.with_ymd_and_hms(2025, 6, 1, 9, 0, 0).unwrap(),
    ));
    let config = Arc::new(EngineConfig::default());
    let audit = AuditSink::new(store.clone(), clock.clone());
    let notifier = NotificationDispatcher::new(store.clone(), clock.clone(), None);
    let engine = Arc::new(ComplaintEngine::new(
        store.clone(),
        audit,
        notifier,
        clock.clone(),
        config.clone(),
    ));
    let resolver = Arc::new(DuplicateResolver::new(
        store,
        engine.clone(),
        clock.clone(),
        config.clone(),
    ));
    let scheduler = EscalationScheduler::new(engine.clone()).unwrap();
    Ctx {
        clock,
        engine,
        resolver,
        scheduler,
        config,
    }
}

fn intake_with(ctx: &Ctx, oracle: Arc<dyn AiOracle>) -> IntakeOrchestrator {
    IntakeOrchestrator::new(
        ctx.engine.clone(),
        ctx.resolver.clone(),
        oracle,
        Arc::new(NullObjects),
        ctx.config.clone(),
    )
}

fn pothole_decision(confidence: f64) -> AiDecision {
    AiDecision {
        category: ComplaintCategory::Pothole,
        priority: Priority::Medium,
        sla_days: 3,
        reasoning: "visible road damage".to_string(),
        confidence,
        image_findings: None,
    }
}

fn pothole_request(citizen: &str) -> IntakeRequest {
    IntakeRequest {
        citizen_id: citizen.to_string(),
        title: "Pothole on MG Road".to_string(),
        description: "large pothole, 1m wide".to_string(),
        location: "MG Road".to_string(),
        coords: Some(GeoPoint {
            lat: 12.97,
            lng: 77.59,
        }),
        image: None,
        upvote_on_duplicate: true,
    }
}

async fn filed_complaint(ctx: &Ctx, confidence: f64) -> Complaint {
    let intake = intake_with(ctx, Arc::new(FixedOracle(pothole_decision(confidence))));
    match intake.submit(pothole_request("c-42")).await.unwrap() {
        IntakeOutcome::Created { complaint } => complaint,
        other => panic!("expected creation, got {other:?}"),
    }
}

/// Scenario: high-confidence intake auto-starts as SYSTEM.
#[tokio::test]
async fn intake_happy_path_auto_starts() {
    let ctx = ctx();
    let complaint = filed_complaint(&ctx, 0.92).await;

    assert_eq!(complaint.status, ComplaintStatus::InProgress);
    assert_eq!(complaint.department_id, "ROADS");
    assert_eq!(complaint.sla_days_assigned, 3);
    assert_eq!(
        complaint.sla_deadline,
        complaint.filed_at + Duration::days(3)
    );

    let audits = ctx
        .engine
        .audit_sink()
        .for_entity(AuditEntity::Complaint, &complaint.id.to_string())
        .await
        .unwrap();
    assert_eq!(audits.len(), 2);
    assert_eq!(audits[0].action, AuditAction::Created);
    assert_eq!(audits[1].action, AuditAction::StateChange);
    assert_eq!(audits[1].old_value.as_deref(), Some("FILED"));
    assert_eq!(audits[1].new_value.as_deref(), Some("IN_PROGRESS"));
    assert_eq!(audits[1].actor_type, ActorType::System);
}

/// Scenario: low confidence parks the complaint for manual routing.
#[tokio::test]
async fn low_confidence_parks_in_filed() {
    let ctx = ctx();
    let complaint = filed_complaint(&ctx, 0.55).await;

    assert_eq!(complaint.status, ComplaintStatus::Filed);

    let pending = ctx.engine.pending_routing().await.unwrap();
    assert!(pending.iter().any(|c| c.id == complaint.id));

    let audits = ctx
        .engine
        .audit_sink()
        .for_entity(AuditEntity::Complaint, &complaint.id.to_string())
        .await
        .unwrap();
    assert_eq!(audits.len(), 1);
    assert_eq!(audits[0].action, AuditAction::Created);
}

/// Scenario: AI outage degrades to OTHER/LOW and still files.
#[tokio::test]
async fn ai_outage_degrades_to_other() {
    let ctx = ctx();
    let intake = intake_with(&ctx, Arc::new(DownOracle));
    let outcome = intake.submit(pothole_request("c-42")).await.unwrap();
    let IntakeOutcome::Created { complaint } = outcome else {
        panic!("expected creation");
    };
    assert_eq!(complaint.category, ComplaintCategory::Other);
    assert_eq!(complaint.priority, Priority::Low);
    assert_eq!(complaint.ai_confidence, 0.0);
    assert_eq!(complaint.status, ComplaintStatus::Filed);
    assert_eq!(complaint.sla_days_assigned, 14);
}

/// Scenario: resolve without proof is refused and leaves no audit trace.
#[tokio::test]
async fn resolve_without_proof_blocked() {
    let ctx = ctx();
    let complaint = filed_complaint(&ctx, 0.92).await;
    let staff = ActorContext::staff("s-7", "ROADS");

    let err = ctx.engine.resolve(complaint.id, &staff).await.unwrap_err();
    assert!(matches!(
        err,
        EngineError::PreconditionFailed(Precondition::ProofRequired)
    ));

    let fresh = ctx.engine.get(complaint.id).await.unwrap();
    assert_eq!(fresh.status, ComplaintStatus::InProgress);

    // no audit event for the refused transition: still CREATED + auto-start
    let audits = ctx
        .engine
        .audit_sink()
        .for_entity(AuditEntity::Complaint, &complaint.id.to_string())
        .await
        .unwrap();
    assert_eq!(audits.len(), 2);
}

/// Scenario: proof, resolve, citizen acceptance with rating.
#[tokio::test]
async fn proof_then_resolve_then_accept() {
    let ctx = ctx();
    let complaint = filed_complaint(&ctx, 0.92).await;
    let staff = ActorContext::staff("s-7", "ROADS");
    let citizen = ActorContext::citizen("c-42");

    ctx.engine
        .submit_proof(complaint.id, &staff, "k1", "filled", None)
        .await
        .unwrap();
    let resolved = ctx.engine.resolve(complaint.id, &staff).await.unwrap();
    assert_eq!(resolved.status, ComplaintStatus::Resolved);
    assert!(resolved.resolved_at.is_some());

    let closed = ctx
        .engine
        .accept(complaint.id, &citizen, 5, None)
        .await
        .unwrap();
    assert_eq!(closed.status, ComplaintStatus::Closed);
    assert_eq!(closed.rating, Some(5));
    assert!(closed.closed_at.is_some());

    // proof creation, staff resolve and citizen close appear in this order
    let complaint_audits = ctx
        .engine
        .audit_sink()
        .for_entity(AuditEntity::Complaint, &complaint.id.to_string())
        .await
        .unwrap();
    let proof_audits = ctx
        .engine
        .audit_sink()
        .for_entity(AuditEntity::Proof, &complaint.id.to_string())
        .await
        .unwrap();
    assert_eq!(proof_audits.len(), 1);

    let resolve_seq = complaint_audits
        .iter()
        .find(|e| e.new_value.as_deref() == Some("RESOLVED"))
        .map(|e| e.seq)
        .unwrap();
    let close_seq = complaint_audits
        .iter()
        .find(|e| e.new_value.as_deref() == Some("CLOSED"))
        .map(|e| e.seq)
        .unwrap();
    assert!(proof_audits[0].seq < resolve_seq);
    assert!(resolve_seq < close_seq);

    // accept is idempotent once CLOSED by the same citizen
    let again = ctx
        .engine
        .accept(complaint.id, &citizen, 5, None)
        .await
        .unwrap();
    assert_eq!(again.status, ComplaintStatus::Closed);
}

/// Scenario: dispute, approval, re-open with priority and escalation bumps.
#[tokio::test]
async fn dispute_approval_reopens() {
    let ctx = ctx();
    let complaint = filed_complaint(&ctx, 0.92).await;
    let staff = ActorContext::staff("s-7", "ROADS");
    let citizen = ActorContext::citizen("c-42");
    let head = ActorContext::dept_head("h-3", "ROADS");

    ctx.engine
        .submit_proof(complaint.id, &staff, "k1", "filled", None)
        .await
        .unwrap();
    ctx.engine.resolve(complaint.id, &staff).await.unwrap();

    let signoff = ctx
        .engine
        .dispute(complaint.id, &citizen, "still broken", Some("k2".to_string()))
        .await
        .unwrap();
    assert!(signoff.pending_dispute());

    // still resolved while pending
    assert_eq!(
        ctx.engine.get(complaint.id).await.unwrap().status,
        ComplaintStatus::Resolved
    );

    let reopened = ctx
        .engine
        .approve_dispute(complaint.id, signoff.id, &head)
        .await
        .unwrap();
    assert_eq!(reopened.status, ComplaintStatus::InProgress);
    assert_eq!(reopened.escalation_level, 1);
    assert_eq!(reopened.priority, Priority::High);
    assert!(reopened.resolved_at.is_none());

    let signoff_audits = ctx
        .engine
        .audit_sink()
        .for_entity(AuditEntity::Signoff, &complaint.id.to_string())
        .await
        .unwrap();
    assert!(signoff_audits
        .iter()
        .any(|e| e.action == AuditAction::Created));
    assert!(signoff_audits
        .iter()
        .any(|e| e.new_value.as_deref() == Some("dispute APPROVED")));
}

/// Scenario: dispute rejection keeps the complaint resolved; auto-close
/// still applies afterwards.
#[tokio::test]
async fn dispute_rejection_keeps_resolution() {
    let ctx = ctx();
    let complaint = filed_complaint(&ctx, 0.92).await;
    let staff = ActorContext::staff("s-7", "ROADS");
    let citizen = ActorContext::citizen("c-42");
    let head = ActorContext::dept_head("h-3", "ROADS");

    ctx.engine
        .submit_proof(complaint.id, &staff, "k1", "filled", None)
        .await
        .unwrap();
    ctx.engine.resolve(complaint.id, &staff).await.unwrap();
    let signoff = ctx
        .engine
        .dispute(complaint.id, &citizen, "not fixed", None)
        .await
        .unwrap();

    let still = ctx
        .engine
        .reject_dispute(complaint.id, signoff.id, &head, "photo shows repair")
        .await
        .unwrap();
    assert_eq!(still.status, ComplaintStatus::Resolved);

    // window expires: the sweep closes it now that no dispute is pending
    ctx.clock.advance(Duration::hours(73));
    let report = ctx.scheduler.sweep(None).await.unwrap();
    assert_eq!(report.auto_closed, 1);
    assert_eq!(
        ctx.engine.get(complaint.id).await.unwrap().status,
        ComplaintStatus::Closed
    );
}

/// Scenario: SLA breach escalates once; a second immediate sweep is a no-op.
#[tokio::test]
async fn escalation_end_to_end_idempotent() {
    let ctx = ctx();
    let complaint = filed_complaint(&ctx, 0.92).await;

    // SLA is 3 days; jump 5 days ahead -> breached by 2 days
    ctx.clock.advance(Duration::days(5));
    let report = ctx.scheduler.sweep(None).await.unwrap();
    assert_eq!(report.escalated_to_dept_head, 1);

    let escalated = ctx.engine.get(complaint.id).await.unwrap();
    assert_eq!(escalated.escalation_level, 1);
    assert_eq!(escalated.priority, Priority::High);

    let escalations = ctx
        .engine
        .audit_sink()
        .by_action(AuditAction::Escalation)
        .await
        .unwrap();
    assert_eq!(escalations.len(), 1);
    assert_eq!(escalations[0].reason.as_deref(), Some("SLA breached by 2 days"));

    let report2 = ctx.scheduler.sweep(None).await.unwrap();
    assert_eq!(report2.escalated_to_dept_head, 0);
    assert_eq!(
        ctx.engine
            .audit_sink()
            .by_action(AuditAction::Escalation)
            .await
            .unwrap()
            .len(),
        1
    );
}

/// Scenario: near-certain duplicate short-circuits into an upvote, twice.
#[tokio::test]
async fn duplicate_intake_upvotes_existing() {
    let ctx = ctx();
    let original = filed_complaint(&ctx, 0.92).await;

    let intake = intake_with(&ctx, Arc::new(FixedOracle(pothole_decision(0.9))));
    // ~80 m north, near-identical description, consenting to upvote
    let mut request = pothole_request("c-99");
    request.coords = Some(GeoPoint {
        lat: 12.97072,
        lng: 77.59,
    });

    let outcome = intake.submit(request.clone()).await.unwrap();
    let IntakeOutcome::Duplicate { existing, upvoted } = outcome else {
        panic!("expected duplicate short-circuit");
    };
    assert_eq!(existing.id, original.id);
    assert!(upvoted);
    assert_eq!(existing.upvote_count, 1);

    // identical re-submission: conflict swallowed, count unchanged
    let outcome2 = intake.submit(request).await.unwrap();
    let IntakeOutcome::Duplicate { existing, upvoted } = outcome2 else {
        panic!("expected duplicate short-circuit");
    };
    assert!(!upvoted);
    assert_eq!(existing.upvote_count, 1);
}

/// Upvote laws: self-upvote refused, add/remove round-trips the count.
#[tokio::test]
async fn upvote_round_trip_and_self_upvote() {
    let ctx = ctx();
    let complaint = filed_complaint(&ctx, 0.92).await;

    let err = ctx
        .resolver
        .upvote(complaint.id, "c-42", None)
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        EngineError::Conflict(ConflictKind::SelfUpvote)
    ));

    let count = ctx.resolver.upvote(complaint.id, "c-99", None).await.unwrap();
    assert_eq!(count, 1);

    let err = ctx
        .resolver
        .upvote(complaint.id, "c-99", None)
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        EngineError::Conflict(ConflictKind::AlreadyUpvoted)
    ));

    let count = ctx
        .resolver
        .remove_upvote(complaint.id, "c-99")
        .await
        .unwrap();
    assert_eq!(count, 0);
}

/// Trending and nearby read surfaces.
#[tokio::test]
async fn nearby_and_trending() {
    let ctx = ctx();
    let a = filed_complaint(&ctx, 0.92).await;

    let intake = intake_with(&ctx, Arc::new(FixedOracle(pothole_decision(0.9))));
    let mut far = pothole_request("c-50");
    far.description = "street light flickers all night near the temple".to_string();
    far.coords = Some(GeoPoint {
        lat: 12.99,
        lng: 77.62,
    });
    let IntakeOutcome::Created { complaint: b } = intake.submit(far).await.unwrap() else {
        panic!("expected creation");
    };

    ctx.resolver.upvote(b.id, "c-60", None).await.unwrap();

    let nearby = ctx
        .resolver
        .nearby(
            GeoPoint {
                lat: 12.97,
                lng: 77.59,
            },
            Some(500.0),
        )
        .await
        .unwrap();
    assert_eq!(nearby.len(), 1);
    assert_eq!(nearby[0].0.id, a.id);

    let trending = ctx.resolver.trending(10).await.unwrap();
    assert_eq!(trending[0].id, b.id);
}

/// Ownership and single-shot rating rules.
#[tokio::test]
async fn rating_rules() {
    let ctx = ctx();
    let complaint = filed_complaint(&ctx, 0.92).await;
    let citizen = ActorContext::citizen("c-42");

    // not resolved yet
    let err = ctx
        .engine
        .record_rating(complaint.id, 4, None, &citizen)
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        EngineError::PreconditionFailed(Precondition::RatingUnavailable)
    ));

    let staff = ActorContext::staff("s-7", "ROADS");
    ctx.engine
        .submit_proof(complaint.id, &staff, "k1", "done", None)
        .await
        .unwrap();
    ctx.engine.resolve(complaint.id, &staff).await.unwrap();

    // stranger cannot rate
    let err = ctx
        .engine
        .record_rating(complaint.id, 4, None, &ActorContext::citizen("c-99"))
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::OwnershipRequired { .. }));

    ctx.engine
        .record_rating(complaint.id, 4, Some("ok".to_string()), &citizen)
        .await
        .unwrap();

    // rating is once-only
    let err = ctx
        .engine
        .record_rating(complaint.id, 2, None, &citizen)
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        EngineError::PreconditionFailed(Precondition::AlreadyRated)
    ));
}

/// Cancellation: owner may cancel, stranger may not, terminal stays closed.
#[tokio::test]
async fn cancellation_rules() {
    let ctx = ctx();
    let complaint = filed_complaint(&ctx, 0.92).await;

    let err = ctx
        .engine
        .transition(
            complaint.id,
            ComplaintStatus::Cancelled,
            &ActorContext::citizen("c-99"),
            None,
        )
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::OwnershipRequired { .. }));

    let cancelled = ctx
        .engine
        .transition(
            complaint.id,
            ComplaintStatus::Cancelled,
            &ActorContext::citizen("c-42"),
            Some("filed by mistake".to_string()),
        )
        .await
        .unwrap();
    assert_eq!(cancelled.status, ComplaintStatus::Cancelled);
    assert!(cancelled.closed_at.is_some());
    assert!(cancelled.resolved_at.is_none());

    // terminal: nothing moves any more
    let err = ctx
        .engine
        .transition(
            complaint.id,
            ComplaintStatus::InProgress,
            &ActorContext::system(),
            None,
        )
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::InvalidTransition { .. }));
}

/// Manual routing starts a parked complaint and clears staff assignment.
#[tokio::test]
async fn manual_routing_starts_parked_complaint() {
    let ctx = ctx();
    let complaint = filed_complaint(&ctx, 0.55).await;
    let admin = ActorContext::admin("a-1");

    let routed = ctx
        .engine
        .manual_route(
            complaint.id,
            "ROADS",
            &admin,
            Some("verified as road damage".to_string()),
        )
        .await
        .unwrap();
    assert_eq!(routed.status, ComplaintStatus::InProgress);
    assert_eq!(routed.department_id, "ROADS");

    // non-admin is refused
    let err = ctx
        .engine
        .manual_route(
            complaint.id,
            "PARKS",
            &ActorContext::staff("s-7", "ROADS"),
            None,
        )
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::Unauthorized { .. }));
}

/// SLA override re-records the deadline and audits old/new.
#[tokio::test]
async fn sla_override_recomputes_deadline() {
    let ctx = ctx();
    let complaint = filed_complaint(&ctx, 0.92).await;
    let admin = ActorContext::admin("a-1");

    let updated = ctx
        .engine
        .override_sla(complaint.id, 7, &admin, Some("monsoon backlog".to_string()))
        .await
        .unwrap();
    assert_eq!(updated.sla_days_assigned, 7);
    assert_eq!(updated.sla_deadline, updated.filed_at + Duration::days(7));

    let audits = ctx
        .engine
        .audit_sink()
        .by_action(AuditAction::SlaUpdate)
        .await
        .unwrap();
    assert_eq!(audits.len(), 1);
    assert!(audits[0].old_value.is_some());
    assert!(audits[0].new_value.is_some());
}

/// Staff assignment: department head in-department, duplicate refused.
#[tokio::test]
async fn staff_assignment_rules() {
    let ctx = ctx();
    let complaint = filed_complaint(&ctx, 0.92).await;
    let head = ActorContext::dept_head("h-3", "ROADS");

    let assigned = ctx
        .engine
        .assign_staff(complaint.id, "s-7", &head)
        .await
        .unwrap();
    assert_eq!(assigned.staff_id.as_deref(), Some("s-7"));

    let err = ctx
        .engine
        .assign_staff(complaint.id, "s-7", &head)
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        EngineError::Conflict(ConflictKind::DuplicateAssignment)
    ));

    let err = ctx
        .engine
        .assign_staff(complaint.id, "s-9", &ActorContext::dept_head("h-4", "PARKS"))
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::DepartmentMismatch { .. }));
}

/// Community pressure raises priority exactly once at the threshold.
#[tokio::test]
async fn upvote_threshold_raises_priority() {
    let store = Arc::new(MemoryStore::new());
    let clock = Arc::new(ManualClock::new(
        Utc.with_ymd_and_hms(2025, 6, 1, 9, 0, 0).unwrap(),
    ));
    let mut config = EngineConfig::default();
    config.upvote_priority_threshold = 2;
    let config = Arc::new(config);
    let engine = Arc::new(ComplaintEngine::new(
        store.clone(),
        AuditSink::new(store.clone(), clock.clone()),
        NotificationDispatcher::new(store.clone(), clock.clone(), None),
        clock.clone(),
        config.clone(),
    ));
    let resolver = DuplicateResolver::new(store, engine.clone(), clock, config.clone());

    let intake = IntakeOrchestrator::new(
        engine.clone(),
        Arc::new(resolver.clone()),
        Arc::new(FixedOracle(pothole_decision(0.92))),
        Arc::new(NullObjects),
        config,
    );
    let IntakeOutcome::Created { complaint } =
        intake.submit(pothole_request("c-42")).await.unwrap()
    else {
        panic!("expected creation");
    };
    assert_eq!(complaint.priority, Priority::Medium);

    resolver.upvote(complaint.id, "c-1", None).await.unwrap();
    let after_one = engine.get(complaint.id).await.unwrap();
    assert_eq!(after_one.priority, Priority::Medium);

    resolver.upvote(complaint.id, "c-2", None).await.unwrap();
    let at_threshold = engine.get(complaint.id).await.unwrap();
    assert_eq!(at_threshold.priority, Priority::High);

    // past the threshold: no further bumps from votes alone
    resolver.upvote(complaint.id, "c-3", None).await.unwrap();
    let past = engine.get(complaint.id).await.unwrap();
    assert_eq!(past.priority, Priority::High);
}

/// The allowed-transitions read drives per-actor action menus.
#[tokio::test]
async fn allowed_transitions_read() {
    let ctx = ctx();
    let complaint = filed_complaint(&ctx, 0.92).await;

    let owner = ctx
        .engine
        .allowed_transitions(complaint.id, &ActorContext::citizen("c-42"))
        .await
        .unwrap();
    assert_eq!(owner, vec![ComplaintStatus::Cancelled]);

    let staff = ctx
        .engine
        .allowed_transitions(complaint.id, &ActorContext::staff("s-7", "ROADS"))
        .await
        .unwrap();
    // no proof yet, so resolve is not offered
    assert!(staff.is_empty());
}
