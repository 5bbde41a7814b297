use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::Row;
use uuid::Uuid;

use crate::store::{GrievanceStore, UpvoteOutcome};
use crate::types::*;

/// PostgreSQL-backed implementation of `GrievanceStore`.
pub struct PostgresStore {
    pool: sqlx::PgPool,
}

impl PostgresStore {
    pub fn new(pool: sqlx::PgPool) -> Self {
        Self { pool }
    }

    /// Run embedded migrations.
    pub async fn migrate(&self) -> Result<()> {
        sqlx::migrate!("./migrations")
            .run(&self.pool)
            .await
            .context("failed to run nivaran migrations")?;
        Ok(())
    }
}

fn statuses_as_strings(statuses: &[ComplaintStatus]) -> Vec<String> {
    statuses.iter().map(|s| s.as_str().to_string()).collect()
}

fn coords_of(row: &sqlx::postgres::PgRow) -> Option<GeoPoint> {
    let lat: Option<f64> = row.get("latitude");
    let lng: Option<f64> = row.get("longitude");
    match (lat, lng) {
        (Some(lat), Some(lng)) => Some(GeoPoint { lat, lng }),
        _ => None,
    }
}

fn complaint_from_row(row: &sqlx::postgres::PgRow) -> Result<Complaint> {
    let category: String = row.get("category");
    let priority: String = row.get("priority");
    let status: String = row.get("status");
    let image: Option<serde_json::Value> = row.get("image");
    let escalation_level: i16 = row.get("escalation_level");
    let sla_days: i32 = row.get("sla_days");
    let upvote_count: i32 = row.get("upvote_count");
    let rating: Option<i16> = row.get("rating");

    Ok(Complaint {
        id: row.get("id"),
        citizen_id: row.get("citizen_id"),
        title: row.get("title"),
        description: row.get("description"),
        location: row.get("location"),
        coords: coords_of(row),
        image: image.map(serde_json::from_value).transpose()?,
        category: category.parse().map_err(|e: String| anyhow!(e))?,
        priority: priority.parse().map_err(|e: String| anyhow!(e))?,
        ai_reasoning: row.get("ai_reasoning"),
        ai_confidence: row.get("ai_confidence"),
        department_id: row.get("department_id"),
        staff_id: row.get("staff_id"),
        status: status.parse().map_err(|e: String| anyhow!(e))?,
        filed_at: row.get("filed_at"),
        sla_days_assigned: sla_days as u32,
        sla_deadline: row.get("sla_deadline"),
        resolved_at: row.get("resolved_at"),
        closed_at: row.get("closed_at"),
        escalation_level: escalation_level as u8,
        upvote_count: upvote_count as u32,
        rating: rating.map(|r| r as u8),
        rating_feedback: row.get("rating_feedback"),
    })
}

fn audit_from_row(row: &sqlx::postgres::PgRow) -> Result<AuditEvent> {
    let entity_type: String = row.get("entity_type");
    let action: String = row.get("action");
    let actor_type: String = row.get("actor_type");
    let seq: i64 = row.get("seq");

    Ok(AuditEvent {
        id: row.get("id"),
        seq: seq as u64,
        entity_type: entity_type.parse().map_err(|e: String| anyhow!(e))?,
        entity_id: row.get("entity_id"),
        action: action.parse().map_err(|e: String| anyhow!(e))?,
        old_value: row.get("old_value"),
        new_value: row.get("new_value"),
        actor_type: actor_type.parse().map_err(|e: String| anyhow!(e))?,
        actor_id: row.get("actor_id"),
        reason: row.get("reason"),
        created_at: row.get("created_at"),
    })
}

fn proof_from_row(row: &sqlx::postgres::PgRow) -> ResolutionProof {
    let lat: Option<f64> = row.get("captured_lat");
    let lng: Option<f64> = row.get("captured_lng");
    ResolutionProof {
        id: row.get("id"),
        complaint_id: row.get("complaint_id"),
        author_staff_id: row.get("author_staff_id"),
        image_key: row.get("image_key"),
        captured: match (lat, lng) {
            (Some(lat), Some(lng)) => Some(GeoPoint { lat, lng }),
            _ => None,
        },
        captured_at: row.get("captured_at"),
        remarks: row.get("remarks"),
        submitted_at: row.get("submitted_at"),
        verified: row.get("verified"),
    }
}

fn signoff_from_row(row: &sqlx::postgres::PgRow) -> Result<CitizenSignoff> {
    let kind: serde_json::Value = row.get("kind");
    Ok(CitizenSignoff {
        id: row.get("id"),
        complaint_id: row.get("complaint_id"),
        citizen_id: row.get("citizen_id"),
        kind: serde_json::from_value(kind).context("failed to deserialize signoff kind")?,
        active: row.get("active"),
        created_at: row.get("created_at"),
        decided_at: row.get("decided_at"),
        decided_by: row.get("decided_by"),
    })
}

fn notification_from_row(row: &sqlx::postgres::PgRow) -> Result<Notification> {
    let kind: String = row.get("kind");
    Ok(Notification {
        id: row.get("id"),
        recipient_id: row.get("recipient_id"),
        kind: kind.parse().map_err(|e: String| anyhow!(e))?,
        title: row.get("title"),
        message: row.get("message"),
        complaint_id: row.get("complaint_id"),
        read: row.get("read"),
        created_at: row.get("created_at"),
    })
}

const COMPLAINT_COLUMNS: &str = "id, citizen_id, title, description, location, latitude, longitude, \
     image, category, priority, ai_reasoning, ai_confidence, department_id, staff_id, status, \
     filed_at, sla_days, sla_deadline, resolved_at, closed_at, escalation_level, upvote_count, \
     rating, rating_feedback";

const AUDIT_COLUMNS: &str = "seq, id, entity_type, entity_id, action, old_value, new_value, \
     actor_type, actor_id, reason, created_at";

#[async_trait]
impl GrievanceStore for PostgresStore {
    // ── Complaints ──

    async fn insert_complaint(&self, c: &Complaint) -> Result<()> {
        let image = c.image.as_ref().map(serde_json::to_value).transpose()?;
        sqlx::query(
            r#"
            INSERT INTO complaints (
                id, citizen_id, title, description, location, latitude, longitude,
                image, category, priority, ai_reasoning, ai_confidence, department_id,
                staff_id, status, filed_at, sla_days, sla_deadline, resolved_at,
                closed_at, escalation_level, upvote_count, rating, rating_feedback
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14,
                      $15, $16, $17, $18, $19, $20, $21, $22, $23, $24)
            "#,
        )
        .bind(c.id)
        .bind(&c.citizen_id)
        .bind(&c.title)
        .bind(&c.description)
        .bind(&c.location)
        .bind(c.coords.map(|g| g.lat))
        .bind(c.coords.map(|g| g.lng))
        .bind(&image)
        .bind(c.category.as_str())
        .bind(c.priority.as_str())
        .bind(&c.ai_reasoning)
        .bind(c.ai_confidence)
        .bind(&c.department_id)
        .bind(&c.staff_id)
        .bind(c.status.as_str())
        .bind(c.filed_at)
        .bind(c.sla_days_assigned as i32)
        .bind(c.sla_deadline)
        .bind(c.resolved_at)
        .bind(c.closed_at)
        .bind(c.escalation_level as i16)
        .bind(c.upvote_count as i32)
        .bind(c.rating.map(|r| r as i16))
        .bind(&c.rating_feedback)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn load_complaint(&self, id: Uuid) -> Result<Option<Complaint>> {
        let row = sqlx::query(&format!(
            "SELECT {COMPLAINT_COLUMNS} FROM complaints WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        row.as_ref().map(complaint_from_row).transpose()
    }

    async fn update_complaint(&self, c: &Complaint) -> Result<()> {
        let image = c.image.as_ref().map(serde_json::to_value).transpose()?;
        let result = sqlx::query(
            r#"
            UPDATE complaints SET
                title = $2, description = $3, location = $4, latitude = $5,
                longitude = $6, image = $7, category = $8, priority = $9,
                ai_reasoning = $10, ai_confidence = $11, department_id = $12,
                staff_id = $13, status = $14, sla_days = $15, sla_deadline = $16,
                resolved_at = $17, closed_at = $18, escalation_level = $19,
                rating = $20, rating_feedback = $21
            WHERE id = $1
            "#,
        )
        .bind(c.id)
        .bind(&c.title)
        .bind(&c.description)
        .bind(&c.location)
        .bind(c.coords.map(|g| g.lat))
        .bind(c.coords.map(|g| g.lng))
        .bind(&image)
        .bind(c.category.as_str())
        .bind(c.priority.as_str())
        .bind(&c.ai_reasoning)
        .bind(c.ai_confidence)
        .bind(&c.department_id)
        .bind(&c.staff_id)
        .bind(c.status.as_str())
        .bind(c.sla_days_assigned as i32)
        .bind(c.sla_deadline)
        .bind(c.resolved_at)
        .bind(c.closed_at)
        .bind(c.escalation_level as i16)
        .bind(c.rating.map(|r| r as i16))
        .bind(&c.rating_feedback)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(anyhow!("complaint not found: {}", c.id));
        }
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
        let result = sqlx::query(
            r#"
            UPDATE complaints
            SET status = $3, resolved_at = $4, closed_at = $5
            WHERE id = $1 AND status = $2
            "#,
        )
        .bind(id)
        .bind(expect.as_str())
        .bind(next.as_str())
        .bind(resolved_at)
        .bind(closed_at)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn escalate_if_level(
        &self,
        id: Uuid,
        expect_level: u8,
        new_level: u8,
        new_priority: Priority,
    ) -> Result<bool> {
        let result = sqlx::query(
            r#"
            UPDATE complaints
            SET escalation_level = $3, priority = $4
            WHERE id = $1 AND escalation_level = $2
            "#,
        )
        .bind(id)
        .bind(expect_level as i16)
        .bind(new_level as i16)
        .bind(new_priority.as_str())
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn list_by_status(&self, statuses: &[ComplaintStatus]) -> Result<Vec<Complaint>> {
        let rows = sqlx::query(&format!(
            "SELECT {COMPLAINT_COLUMNS} FROM complaints WHERE status = ANY($1) ORDER BY filed_at, id"
        ))
        .bind(statuses_as_strings(statuses))
        .fetch_all(&self.pool)
        .await?;
        rows.iter().map(complaint_from_row).collect()
    }

    async fn list_by_citizen(&self, citizen_id: &str) -> Result<Vec<Complaint>> {
        let rows = sqlx::query(&format!(
            "SELECT {COMPLAINT_COLUMNS} FROM complaints WHERE citizen_id = $1 ORDER BY filed_at, id"
        ))
        .bind(citizen_id)
        .fetch_all(&self.pool)
        .await?;
        rows.iter().map(complaint_from_row).collect()
    }

    async fn list_by_department(&self, department_id: &str) -> Result<Vec<Complaint>> {
        let rows = sqlx::query(&format!(
            "SELECT {COMPLAINT_COLUMNS} FROM complaints WHERE department_id = $1 ORDER BY filed_at, id"
        ))
        .bind(department_id)
        .fetch_all(&self.pool)
        .await?;
        rows.iter().map(complaint_from_row).collect()
    }

    async fn list_overdue(&self, now: DateTime<Utc>) -> Result<Vec<Complaint>> {
        let rows = sqlx::query(&format!(
            r#"
            SELECT {COMPLAINT_COLUMNS} FROM complaints
            WHERE status IN ('FILED', 'IN_PROGRESS') AND sla_deadline < $1
            ORDER BY filed_at, id
            "#
        ))
        .bind(now)
        .fetch_all(&self.pool)
        .await?;
        rows.iter().map(complaint_from_row).collect()
    }

    async fn list_with_coords(&self, statuses: &[ComplaintStatus]) -> Result<Vec<Complaint>> {
        let rows = sqlx::query(&format!(
            r#"
            SELECT {COMPLAINT_COLUMNS} FROM complaints
            WHERE status = ANY($1) AND latitude IS NOT NULL AND longitude IS NOT NULL
            ORDER BY filed_at, id
            "#
        ))
        .bind(statuses_as_strings(statuses))
        .fetch_all(&self.pool)
        .await?;
        rows.iter().map(complaint_from_row).collect()
    }

    async fn list_pending_routing(&self, confidence_below: f64) -> Result<Vec<Complaint>> {
        let rows = sqlx::query(&format!(
            r#"
            SELECT {COMPLAINT_COLUMNS} FROM complaints
            WHERE status = 'FILED' AND (ai_confidence < $1 OR category = 'OTHER')
            ORDER BY filed_at, id
            "#
        ))
        .bind(confidence_below)
        .fetch_all(&self.pool)
        .await?;
        rows.iter().map(complaint_from_row).collect()
    }

    async fn list_top_upvoted(&self, limit: usize) -> Result<Vec<Complaint>> {
        let rows = sqlx::query(&format!(
            r#"
            SELECT {COMPLAINT_COLUMNS} FROM complaints
            WHERE status NOT IN ('CLOSED', 'CANCELLED')
            ORDER BY upvote_count DESC, filed_at
            LIMIT $1
            "#
        ))
        .bind(limit as i64)
        .fetch_all(&self.pool)
        .await?;
        rows.iter().map(complaint_from_row).collect()
    }

    // ── Resolution proofs ──

    async fn append_proof(&self, p: &ResolutionProof) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO resolution_proofs (
                id, complaint_id, author_staff_id, image_key, captured_lat,
                captured_lng, captured_at, remarks, submitted_at, verified
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
            "#,
        )
        .bind(p.id)
        .bind(p.complaint_id)
        .bind(&p.author_staff_id)
        .bind(&p.image_key)
        .bind(p.captured.map(|g| g.lat))
        .bind(p.captured.map(|g| g.lng))
        .bind(p.captured_at)
        .bind(&p.remarks)
        .bind(p.submitted_at)
        .bind(p.verified)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn load_proofs(&self, complaint_id: Uuid) -> Result<Vec<ResolutionProof>> {
        let rows = sqlx::query(
            "SELECT * FROM resolution_proofs WHERE complaint_id = $1 ORDER BY submitted_at, id",
        )
        .bind(complaint_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.iter().map(proof_from_row).collect())
    }

    async fn count_proofs(&self, complaint_id: Uuid) -> Result<u64> {
        let row = sqlx::query("SELECT COUNT(*) AS n FROM resolution_proofs WHERE complaint_id = $1")
            .bind(complaint_id)
            .fetch_one(&self.pool)
            .await?;
        let n: i64 = row.get("n");
        Ok(n as u64)
    }

    // ── Citizen signoffs ──

    async fn append_signoff(&self, s: &CitizenSignoff) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO citizen_signoffs (
                id, complaint_id, citizen_id, kind, active, created_at,
                decided_at, decided_by
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            "#,
        )
        .bind(s.id)
        .bind(s.complaint_id)
        .bind(&s.citizen_id)
        .bind(serde_json::to_value(&s.kind)?)
        .bind(s.active)
        .bind(s.created_at)
        .bind(s.decided_at)
        .bind(&s.decided_by)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn load_signoffs(&self, complaint_id: Uuid) -> Result<Vec<CitizenSignoff>> {
        let rows = sqlx::query(
            "SELECT * FROM citizen_signoffs WHERE complaint_id = $1 ORDER BY created_at, id",
        )
        .bind(complaint_id)
        .fetch_all(&self.pool)
        .await?;
        rows.iter().map(signoff_from_row).collect()
    }

    async fn load_signoff(&self, id: Uuid) -> Result<Option<CitizenSignoff>> {
        let row = sqlx::query("SELECT * FROM citizen_signoffs WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        row.as_ref().map(signoff_from_row).transpose()
    }

    async fn active_signoff(&self, complaint_id: Uuid) -> Result<Option<CitizenSignoff>> {
        let row = sqlx::query(
            "SELECT * FROM citizen_signoffs WHERE complaint_id = $1 AND active ORDER BY created_at DESC LIMIT 1",
        )
        .bind(complaint_id)
        .fetch_optional(&self.pool)
        .await?;
        row.as_ref().map(signoff_from_row).transpose()
    }

    async fn update_signoff(&self, s: &CitizenSignoff) -> Result<()> {
        let result = sqlx::query(
            r#"
            UPDATE citizen_signoffs
            SET kind = $2, active = $3, decided_at = $4, decided_by = $5
            WHERE id = $1
            "#,
        )
        .bind(s.id)
        .bind(serde_json::to_value(&s.kind)?)
        .bind(s.active)
        .bind(s.decided_at)
        .bind(&s.decided_by)
        .execute(&self.pool)
        .await?;
        if result.rows_affected() == 0 {
            return Err(anyhow!("signoff not found: {}", s.id));
        }
        Ok(())
    }

    // ── Upvotes ──

    async fn add_upvote(&self, u: &Upvote) -> Result<UpvoteOutcome> {
        let mut tx = self.pool.begin().await?;
        let inserted = sqlx::query(
            r#"
            INSERT INTO upvotes (complaint_id, citizen_id, latitude, longitude, created_at)
            VALUES ($1, $2, $3, $4, $5)
            ON CONFLICT (complaint_id, citizen_id) DO NOTHING
            "#,
        )
        .bind(u.complaint_id)
        .bind(&u.citizen_id)
        .bind(u.coords.map(|g| g.lat))
        .bind(u.coords.map(|g| g.lng))
        .bind(u.created_at)
        .execute(&mut *tx)
        .await?;

        if inserted.rows_affected() == 0 {
            let row = sqlx::query("SELECT upvote_count FROM complaints WHERE id = $1")
                .bind(u.complaint_id)
                .fetch_one(&mut *tx)
                .await?;
            let count: i32 = row.get("upvote_count");
            tx.commit().await?;
            return Ok(UpvoteOutcome::Unchanged {
                count: count as u32,
            });
        }

        let row = sqlx::query(
            "UPDATE complaints SET upvote_count = upvote_count + 1 WHERE id = $1 RETURNING upvote_count",
        )
        .bind(u.complaint_id)
        .fetch_one(&mut *tx)
        .await?;
        let count: i32 = row.get("upvote_count");
        tx.commit().await?;
        Ok(UpvoteOutcome::Applied {
            count: count as u32,
        })
    }

    async fn remove_upvote(&self, complaint_id: Uuid, citizen_id: &str) -> Result<UpvoteOutcome> {
        let mut tx = self.pool.begin().await?;
        let deleted =
            sqlx::query("DELETE FROM upvotes WHERE complaint_id = $1 AND citizen_id = $2")
                .bind(complaint_id)
                .bind(citizen_id)
                .execute(&mut *tx)
                .await?;

        if deleted.rows_affected() == 0 {
            let row = sqlx::query("SELECT upvote_count FROM complaints WHERE id = $1")
                .bind(complaint_id)
                .fetch_one(&mut *tx)
                .await?;
            let count: i32 = row.get("upvote_count");
            tx.commit().await?;
            return Ok(UpvoteOutcome::Unchanged {
                count: count as u32,
            });
        }

        let row = sqlx::query(
            "UPDATE complaints SET upvote_count = GREATEST(upvote_count - 1, 0) WHERE id = $1 RETURNING upvote_count",
        )
        .bind(complaint_id)
        .fetch_one(&mut *tx)
        .await?;
        let count: i32 = row.get("upvote_count");
        tx.commit().await?;
        Ok(UpvoteOutcome::Applied {
            count: count as u32,
        })
    }

    // ── Audit log ──

    async fn append_audit(&self, e: &AuditEvent) -> Result<u64> {
        let row = sqlx::query(
            r#"
            INSERT INTO audit_events (
                id, entity_type, entity_id, action, old_value, new_value,
                actor_type, actor_id, reason, created_at
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
            RETURNING seq
            "#,
        )
        .bind(e.id)
        .bind(e.entity_type.as_str())
        .bind(&e.entity_id)
        .bind(e.action.as_str())
        .bind(&e.old_value)
        .bind(&e.new_value)
        .bind(e.actor_type.as_str())
        .bind(&e.actor_id)
        .bind(&e.reason)
        .bind(e.created_at)
        .fetch_one(&self.pool)
        .await?;
        let seq: i64 = row.get("seq");
        Ok(seq as u64)
    }

    async fn audit_for_entity(
        &self,
        entity: AuditEntity,
        entity_id: &str,
    ) -> Result<Vec<AuditEvent>> {
        let rows = sqlx::query(&format!(
            r#"
            SELECT {AUDIT_COLUMNS} FROM audit_events
            WHERE entity_type = $1 AND entity_id = $2
            ORDER BY created_at, seq
            "#
        ))
        .bind(entity.as_str())
        .bind(entity_id)
        .fetch_all(&self.pool)
        .await?;
        rows.iter().map(audit_from_row).collect()
    }

    async fn audit_recent(&self, limit: usize) -> Result<Vec<AuditEvent>> {
        let rows = sqlx::query(&format!(
            r#"
            SELECT {AUDIT_COLUMNS} FROM (
                SELECT {AUDIT_COLUMNS} FROM audit_events
                ORDER BY created_at DESC, seq DESC
                LIMIT $1
            ) latest
            ORDER BY created_at, seq
            "#
        ))
        .bind(limit as i64)
        .fetch_all(&self.pool)
        .await?;
        rows.iter().map(audit_from_row).collect()
    }

    async fn audit_by_action(&self, action: AuditAction) -> Result<Vec<AuditEvent>> {
        let rows = sqlx::query(&format!(
            "SELECT {AUDIT_COLUMNS} FROM audit_events WHERE action = $1 ORDER BY created_at, seq"
        ))
        .bind(action.as_str())
        .fetch_all(&self.pool)
        .await?;
        rows.iter().map(audit_from_row).collect()
    }

    async fn audit_by_actor(&self, actor_id: &str) -> Result<Vec<AuditEvent>> {
        let rows = sqlx::query(&format!(
            "SELECT {AUDIT_COLUMNS} FROM audit_events WHERE actor_id = $1 ORDER BY created_at, seq"
        ))
        .bind(actor_id)
        .fetch_all(&self.pool)
        .await?;
        rows.iter().map(audit_from_row).collect()
    }

    async fn audit_in_range(
        &self,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> Result<Vec<AuditEvent>> {
        let rows = sqlx::query(&format!(
            r#"
            SELECT {AUDIT_COLUMNS} FROM audit_events
            WHERE created_at >= $1 AND created_at <= $2
            ORDER BY created_at, seq
            "#
        ))
        .bind(from)
        .bind(to)
        .fetch_all(&self.pool)
        .await?;
        rows.iter().map(audit_from_row).collect()
    }

    // ── Notifications ──

    async fn insert_notification(&self, n: &Notification) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO notifications (
                id, recipient_id, kind, title, message, complaint_id, read, created_at
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            "#,
        )
        .bind(n.id)
        .bind(&n.recipient_id)
        .bind(n.kind.as_str())
        .bind(&n.title)
        .bind(&n.message)
        .bind(n.complaint_id)
        .bind(n.read)
        .bind(n.created_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn notifications_for(
        &self,
        recipient_id: &str,
        unread_only: bool,
        limit: usize,
    ) -> Result<Vec<Notification>> {
        let rows = sqlx::query(
            r#"
            SELECT * FROM notifications
            WHERE recipient_id = $1 AND (NOT $2 OR NOT read)
            ORDER BY created_at DESC
            LIMIT $3
            "#,
        )
        .bind(recipient_id)
        .bind(unread_only)
        .bind(limit as i64)
        .fetch_all(&self.pool)
        .await?;
        rows.iter().map(notification_from_row).collect()
    }

    async fn unread_count(&self, recipient_id: &str) -> Result<u64> {
        let row =
            sqlx::query("SELECT COUNT(*) AS n FROM notifications WHERE recipient_id = $1 AND NOT read")
                .bind(recipient_id)
                .fetch_one(&self.pool)
                .await?;
        let n: i64 = row.get("n");
        Ok(n as u64)
    }

    async fn mark_notification_read(&self, id: Uuid, recipient_id: &str) -> Result<bool> {
        let result =
            sqlx::query("UPDATE notifications SET read = TRUE WHERE id = $1 AND recipient_id = $2")
                .bind(id)
                .bind(recipient_id)
                .execute(&self.pool)
                .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn notification_exists(
        &self,
        recipient_id: &str,
        kind: NotificationKind,
        complaint_id: Uuid,
    ) -> Result<bool> {
        let row = sqlx::query(
            r#"
            SELECT EXISTS (
                SELECT 1 FROM notifications
                WHERE recipient_id = $1 AND kind = $2 AND complaint_id = $3
            ) AS found
            "#,
        )
        .bind(recipient_id)
        .bind(kind.as_str())
        .bind(complaint_id)
        .fetch_one(&self.pool)
        .await?;
        Ok(row.get("found"))
    }
}
