//! Append-only audit sink. Single entry point `record`; query surface is
//! strictly read-only. No update or delete path exists anywhere in the crate.

use std::borrow::Cow;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::actor::ActorContext;
use crate::clock::Clock;
use crate::error::EngineError;
use crate::store::GrievanceStore;
use crate::types::{ActorType, AuditAction, AuditEntity, AuditEvent};

/// Value fields longer than this are truncated in log output. The stored
/// record keeps the payload verbatim.
const LOG_VALUE_MAX: usize = 256;

fn truncate_for_log(value: &Option<String>) -> Cow<'_, str> {
    match value.as_deref() {
        None => Cow::Borrowed(""),
        Some(s) if s.len() <= LOG_VALUE_MAX => Cow::Borrowed(s),
        Some(s) => {
            let mut cut = LOG_VALUE_MAX;
            while !s.is_char_boundary(cut) {
                cut -= 1;
            }
            Cow::Owned(format!("{}…", &s[..cut]))
        }
    }
}

#[derive(Clone)]
pub struct AuditSink {
    store: Arc<dyn GrievanceStore>,
    clock: Arc<dyn Clock>,
}

impl AuditSink {
    pub fn new(store: Arc<dyn GrievanceStore>, clock: Arc<dyn Clock>) -> Self {
        Self { store, clock }
    }

    /// Append one immutable who/what/when/why record.
    #[allow(clippy::too_many_arguments)]
    pub async fn record(
        &self,
        entity_type: AuditEntity,
        entity_id: impl ToString,
        action: AuditAction,
        old_value: Option<String>,
        new_value: Option<String>,
        actor: &ActorContext,
        reason: Option<String>,
    ) -> Result<AuditEvent, EngineError> {
        let mut event = AuditEvent {
            id: Uuid::now_v7(),
            seq: 0,
            entity_type,
            entity_id: entity_id.to_string(),
            action,
            old_value,
            new_value,
            actor_type: actor.actor_type,
            actor_id: actor.user_id.clone(),
            reason,
            created_at: self.clock.now(),
        };
        event.seq = self.store.append_audit(&event).await?;

        tracing::info!(
            entity = event.entity_type.as_str(),
            entity_id = %event.entity_id,
            action = event.action.as_str(),
            actor = event.actor_id.as_deref().unwrap_or(ActorType::System.as_str()),
            old = %truncate_for_log(&event.old_value),
            new = %truncate_for_log(&event.new_value),
            "audit"
        );
        Ok(event)
    }

    // ── Read-only query surface ──

    pub async fn for_entity(
        &self,
        entity: AuditEntity,
        entity_id: &str,
    ) -> Result<Vec<AuditEvent>, EngineError> {
        Ok(self.store.audit_for_entity(entity, entity_id).await?)
    }

    pub async fn recent(&self, limit: usize) -> Result<Vec<AuditEvent>, EngineError> {
        Ok(self.store.audit_recent(limit).await?)
    }

    pub async fn by_action(&self, action: AuditAction) -> Result<Vec<AuditEvent>, EngineError> {
        Ok(self.store.audit_by_action(action).await?)
    }

    pub async fn by_actor(&self, actor_id: &str) -> Result<Vec<AuditEvent>, EngineError> {
        Ok(self.store.audit_by_actor(actor_id).await?)
    }

    pub async fn in_range(
        &self,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> Result<Vec<AuditEvent>, EngineError> {
        Ok(self.store.audit_in_range(from, to).await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use crate::store_memory::MemoryStore;
    use chrono::TimeZone;

    #[test]
    fn truncation_is_log_only() {
        let long = Some("x".repeat(500));
        let shown = truncate_for_log(&long);
        assert!(shown.len() <= LOG_VALUE_MAX + '…'.len_utf8());
        assert!(shown.ends_with('…'));

        let short = Some("ok".to_string());
        assert_eq!(truncate_for_log(&short), "ok");
    }

    #[tokio::test]
    async fn records_are_ordered_and_verbatim() {
        let store = Arc::new(MemoryStore::new());
        let clock = Arc::new(ManualClock::new(
            Utc.with_ymd_and_hms(2025, 6, 1, 0, 0, 0).unwrap(),
        ));
        let sink = AuditSink::new(store, clock.clone());
        let actor = ActorContext::admin("a-1");

        let long_value = "y".repeat(500);
        sink.record(
            AuditEntity::Complaint,
            "c1",
            AuditAction::Created,
            None,
            Some(long_value.clone()),
            &actor,
            None,
        )
        .await
        .unwrap();
        clock.advance(chrono::Duration::seconds(1));
        sink.record(
            AuditEntity::Complaint,
            "c1",
            AuditAction::StateChange,
            Some("FILED".into()),
            Some("IN_PROGRESS".into()),
            &actor,
            None,
        )
        .await
        .unwrap();

        let events = sink.for_entity(AuditEntity::Complaint, "c1").await.unwrap();
        assert_eq!(events.len(), 2);
        assert_eq!(events[0].action, AuditAction::Created);
        assert_eq!(events[1].action, AuditAction::StateChange);
        // stored verbatim, not truncated
        assert_eq!(events[0].new_value.as_deref(), Some(long_value.as_str()));
        assert!(events[0].seq < events[1].seq);
    }
}
