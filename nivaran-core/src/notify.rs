//! Notification fanout: synchronous in-app inbox write plus a best-effort
//! external messaging sink. Messaging failures are logged and swallowed;
//! they never fail the originating mutation, and the core does not retry.

use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;
use uuid::Uuid;

use crate::clock::Clock;
use crate::error::EngineError;
use crate::store::GrievanceStore;
use crate::types::{Notification, NotificationKind};

/// One-way external channel (SMS / messaging app). Out-of-scope collaborator;
/// implementations carry their own deadlines.
#[async_trait]
pub trait MessagingClient: Send + Sync {
    async fn send(&self, recipient_id: &str, text: &str) -> Result<()>;
}

/// Role-addressed recipients for principals the engine cannot resolve to a
/// concrete user (the user directory is external).
pub mod recipient {
    pub const ADMIN: &str = "role:ADMIN";
    pub const COMMISSIONER: &str = "role:MUNICIPAL_COMMISSIONER";

    pub fn dept_head(department_id: &str) -> String {
        format!("role:DEPT_HEAD:{department_id}")
    }
}

#[derive(Clone)]
pub struct NotificationDispatcher {
    store: Arc<dyn GrievanceStore>,
    clock: Arc<dyn Clock>,
    messaging: Option<Arc<dyn MessagingClient>>,
}

impl NotificationDispatcher {
    pub fn new(
        store: Arc<dyn GrievanceStore>,
        clock: Arc<dyn Clock>,
        messaging: Option<Arc<dyn MessagingClient>>,
    ) -> Self {
        Self {
            store,
            clock,
            messaging,
        }
    }

    /// Persist an inbox record, then try the external channel. The inbox
    /// write shares the emitting operation's fate; the channel does not.
    pub async fn dispatch(
        &self,
        recipient_id: &str,
        kind: NotificationKind,
        title: impl Into<String>,
        message: impl Into<String>,
        complaint_id: Option<Uuid>,
    ) -> Result<Notification, EngineError> {
        let notification = Notification {
            id: Uuid::now_v7(),
            recipient_id: recipient_id.to_string(),
            kind,
            title: title.into(),
            message: message.into(),
            complaint_id,
            read: false,
            created_at: self.clock.now(),
        };
        self.store.insert_notification(&notification).await?;

        if let Some(messaging) = &self.messaging {
            let text = format!("{}: {}", notification.title, notification.message);
            if let Err(err) = messaging.send(recipient_id, &text).await {
                tracing::warn!(
                    recipient = recipient_id,
                    kind = kind.as_str(),
                    error = %err,
                    "external notification delivery failed, inbox record kept"
                );
            }
        }
        Ok(notification)
    }

    /// True if `recipient_id` was already told about this complaint with this
    /// kind; used by the scheduler to keep warnings idempotent.
    pub async fn already_notified(
        &self,
        recipient_id: &str,
        kind: NotificationKind,
        complaint_id: Uuid,
    ) -> Result<bool, EngineError> {
        Ok(self
            .store
            .notification_exists(recipient_id, kind, complaint_id)
            .await?)
    }

    // ── Inbox reads ──

    pub async fn inbox(
        &self,
        recipient_id: &str,
        unread_only: bool,
        limit: usize,
    ) -> Result<Vec<Notification>, EngineError> {
        Ok(self
            .store
            .notifications_for(recipient_id, unread_only, limit)
            .await?)
    }

    pub async fn unread_count(&self, recipient_id: &str) -> Result<u64, EngineError> {
        Ok(self.store.unread_count(recipient_id).await?)
    }

    pub async fn mark_read(&self, id: Uuid, recipient_id: &str) -> Result<(), EngineError> {
        if self.store.mark_notification_read(id, recipient_id).await? {
            Ok(())
        } else {
            Err(EngineError::not_found("notification", id))
        }
    }
}
