use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

// ─── Geometry ─────────────────────────────────────────────────

/// WGS-84 coordinate pair attached to complaints, proofs and upvotes.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct GeoPoint {
    pub lat: f64,
    pub lng: f64,
}

impl GeoPoint {
    /// Both members must be inside their valid WGS-84 range.
    pub fn is_valid(&self) -> bool {
        (-90.0..=90.0).contains(&self.lat) && (-180.0..=180.0).contains(&self.lng)
    }
}

// ─── Classification ───────────────────────────────────────────

/// Fixed complaint taxonomy. Each category routes to a default department
/// and carries a default SLA-days entry (see `config`).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ComplaintCategory {
    Pothole,
    Streetlight,
    WaterShortage,
    SewerDrainage,
    Garbage,
    TrafficSignals,
    ParkMaintenance,
    ElectricalDamage,
    Other,
}

impl ComplaintCategory {
    pub const ALL: [ComplaintCategory; 9] = [
        ComplaintCategory::Pothole,
        ComplaintCategory::Streetlight,
        ComplaintCategory::WaterShortage,
        ComplaintCategory::SewerDrainage,
        ComplaintCategory::Garbage,
        ComplaintCategory::TrafficSignals,
        ComplaintCategory::ParkMaintenance,
        ComplaintCategory::ElectricalDamage,
        ComplaintCategory::Other,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ComplaintCategory::Pothole => "POTHOLE",
            ComplaintCategory::Streetlight => "STREETLIGHT",
            ComplaintCategory::WaterShortage => "WATER_SHORTAGE",
            ComplaintCategory::SewerDrainage => "SEWER_DRAINAGE",
            ComplaintCategory::Garbage => "GARBAGE",
            ComplaintCategory::TrafficSignals => "TRAFFIC_SIGNALS",
            ComplaintCategory::ParkMaintenance => "PARK_MAINTENANCE",
            ComplaintCategory::ElectricalDamage => "ELECTRICAL_DAMAGE",
            ComplaintCategory::Other => "OTHER",
        }
    }
}

impl std::str::FromStr for ComplaintCategory {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ComplaintCategory::ALL
            .iter()
            .find(|c| c.as_str() == s)
            .copied()
            .ok_or_else(|| format!("unknown complaint category: {s}"))
    }
}

/// Urgency assigned at intake and raised by escalation / community pressure.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Priority {
    Low,
    Medium,
    High,
    Critical,
}

impl Priority {
    /// One step up, saturating at Critical.
    pub fn raised(&self) -> Priority {
        match self {
            Priority::Low => Priority::Medium,
            Priority::Medium => Priority::High,
            Priority::High | Priority::Critical => Priority::Critical,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Priority::Low => "LOW",
            Priority::Medium => "MEDIUM",
            Priority::High => "HIGH",
            Priority::Critical => "CRITICAL",
        }
    }
}

impl std::str::FromStr for Priority {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "LOW" => Ok(Priority::Low),
            "MEDIUM" => Ok(Priority::Medium),
            "HIGH" => Ok(Priority::High),
            "CRITICAL" => Ok(Priority::Critical),
            other => Err(format!("unknown priority: {other}")),
        }
    }
}

// ─── Lifecycle ────────────────────────────────────────────────

/// Complaint lifecycle states. FILED is initial; CLOSED and CANCELLED are
/// terminal. Legal transitions are declared in `fsm`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ComplaintStatus {
    Filed,
    InProgress,
    Resolved,
    Closed,
    Cancelled,
}

impl ComplaintStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, ComplaintStatus::Closed | ComplaintStatus::Cancelled)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ComplaintStatus::Filed => "FILED",
            ComplaintStatus::InProgress => "IN_PROGRESS",
            ComplaintStatus::Resolved => "RESOLVED",
            ComplaintStatus::Closed => "CLOSED",
            ComplaintStatus::Cancelled => "CANCELLED",
        }
    }
}

impl std::str::FromStr for ComplaintStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "FILED" => Ok(ComplaintStatus::Filed),
            "IN_PROGRESS" => Ok(ComplaintStatus::InProgress),
            "RESOLVED" => Ok(ComplaintStatus::Resolved),
            "CLOSED" => Ok(ComplaintStatus::Closed),
            "CANCELLED" => Ok(ComplaintStatus::Cancelled),
            other => Err(format!("unknown complaint status: {other}")),
        }
    }
}

// ─── Image attachment ─────────────────────────────────────────

/// Reference to an uploaded image in the external object store. The engine
/// never touches pixels; `analysis` is whatever the AI oracle said about it.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ImageRef {
    pub key: String,
    pub mime: String,
    pub analysis: Option<String>,
    pub analyzed_at: Option<DateTime<Utc>>,
}

// ─── Complaint ────────────────────────────────────────────────

/// The central entity. Created at intake, never destroyed; terminates in
/// CLOSED or CANCELLED. Child records (proofs, signoffs, audit events) refer
/// to it by id and are queried on demand.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Complaint {
    pub id: Uuid,
    /// The citizen who filed it. User directory is external; ids are opaque.
    pub citizen_id: String,

    pub title: String,
    pub description: String,
    /// Free-text location as entered by the citizen.
    pub location: String,
    pub coords: Option<GeoPoint>,
    pub image: Option<ImageRef>,

    pub category: ComplaintCategory,
    pub priority: Priority,
    pub ai_reasoning: String,
    /// Classifier confidence in [0,1]. Below the configured threshold the
    /// complaint parks in FILED for manual routing.
    pub ai_confidence: f64,

    pub department_id: String,
    pub staff_id: Option<String>,

    pub status: ComplaintStatus,
    pub filed_at: DateTime<Utc>,
    pub sla_days_assigned: u32,
    pub sla_deadline: DateTime<Utc>,
    pub resolved_at: Option<DateTime<Utc>>,
    pub closed_at: Option<DateTime<Utc>>,

    /// 0 = none, 1 = department head, 2 = municipal commissioner (terminal).
    pub escalation_level: u8,

    pub upvote_count: u32,
    pub rating: Option<u8>,
    pub rating_feedback: Option<String>,
}

impl Complaint {
    pub fn is_overdue(&self, now: DateTime<Utc>) -> bool {
        now > self.sla_deadline
    }
}

// ─── Resolution proof ─────────────────────────────────────────

/// Photographic evidence submitted by staff before a complaint may enter
/// RESOLVED. Append-only; never replaces a prior proof.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ResolutionProof {
    pub id: Uuid,
    pub complaint_id: Uuid,
    pub author_staff_id: String,
    pub image_key: String,
    pub captured: Option<GeoPoint>,
    pub captured_at: Option<DateTime<Utc>>,
    pub remarks: String,
    pub submitted_at: DateTime<Utc>,
    pub verified: bool,
}

// ─── Citizen signoff ──────────────────────────────────────────

/// Sub-state of a dispute while it awaits department-head adjudication.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DisputeStatus {
    Pending,
    Approved,
    Rejected,
}

/// What the citizen said after staff claimed resolution.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SignoffKind {
    Acceptance {
        rating: u8,
        feedback: Option<String>,
    },
    Dispute {
        reason: String,
        counter_proof_image_key: Option<String>,
        status: DisputeStatus,
    },
}

/// Citizen response to a RESOLVED complaint. Physically 1:N with at most one
/// active record; content is append-only, only the dispute sub-state and the
/// active flag move.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct CitizenSignoff {
    pub id: Uuid,
    pub complaint_id: Uuid,
    pub citizen_id: String,
    pub kind: SignoffKind,
    pub active: bool,
    pub created_at: DateTime<Utc>,
    pub decided_at: Option<DateTime<Utc>>,
    pub decided_by: Option<String>,
}

impl CitizenSignoff {
    pub fn pending_dispute(&self) -> bool {
        matches!(
            self.kind,
            SignoffKind::Dispute {
                status: DisputeStatus::Pending,
                ..
            }
        )
    }
}

// ─── Upvote ───────────────────────────────────────────────────

/// Community "me too" on an existing complaint. Unique per (complaint,
/// citizen); a citizen cannot upvote their own complaint.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Upvote {
    pub complaint_id: Uuid,
    pub citizen_id: String,
    pub coords: Option<GeoPoint>,
    pub created_at: DateTime<Utc>,
}

// ─── Audit ────────────────────────────────────────────────────

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AuditEntity {
    Complaint,
    Sla,
    Assignment,
    Proof,
    Signoff,
}

impl AuditEntity {
    pub fn as_str(&self) -> &'static str {
        match self {
            AuditEntity::Complaint => "COMPLAINT",
            AuditEntity::Sla => "SLA",
            AuditEntity::Assignment => "ASSIGNMENT",
            AuditEntity::Proof => "PROOF",
            AuditEntity::Signoff => "SIGNOFF",
        }
    }
}

impl std::str::FromStr for AuditEntity {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "COMPLAINT" => Ok(AuditEntity::Complaint),
            "SLA" => Ok(AuditEntity::Sla),
            "ASSIGNMENT" => Ok(AuditEntity::Assignment),
            "PROOF" => Ok(AuditEntity::Proof),
            "SIGNOFF" => Ok(AuditEntity::Signoff),
            other => Err(format!("unknown audit entity: {other}")),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AuditAction {
    StateChange,
    Escalation,
    SlaUpdate,
    Assignment,
    Suspension,
    Created,
    Updated,
    Comment,
    Rating,
}

impl AuditAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            AuditAction::StateChange => "STATE_CHANGE",
            AuditAction::Escalation => "ESCALATION",
            AuditAction::SlaUpdate => "SLA_UPDATE",
            AuditAction::Assignment => "ASSIGNMENT",
            AuditAction::Suspension => "SUSPENSION",
            AuditAction::Created => "CREATED",
            AuditAction::Updated => "UPDATED",
            AuditAction::Comment => "COMMENT",
            AuditAction::Rating => "RATING",
        }
    }
}

impl std::str::FromStr for AuditAction {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "STATE_CHANGE" => Ok(AuditAction::StateChange),
            "ESCALATION" => Ok(AuditAction::Escalation),
            "SLA_UPDATE" => Ok(AuditAction::SlaUpdate),
            "ASSIGNMENT" => Ok(AuditAction::Assignment),
            "SUSPENSION" => Ok(AuditAction::Suspension),
            "CREATED" => Ok(AuditAction::Created),
            "UPDATED" => Ok(AuditAction::Updated),
            "COMMENT" => Ok(AuditAction::Comment),
            "RATING" => Ok(AuditAction::Rating),
            other => Err(format!("unknown audit action: {other}")),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ActorType {
    User,
    System,
}

impl ActorType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ActorType::User => "USER",
            ActorType::System => "SYSTEM",
        }
    }
}

impl std::str::FromStr for ActorType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "USER" => Ok(ActorType::User),
            "SYSTEM" => Ok(ActorType::System),
            other => Err(format!("unknown actor type: {other}")),
        }
    }
}

/// Immutable who/what/when/why record. Insert-only: the store exposes no
/// update or delete path for these.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct AuditEvent {
    pub id: Uuid,
    /// Store-assigned, monotonically increasing. Tiebreaker inside a single
    /// `created_at` instant; chronological order is `(created_at, seq)`.
    pub seq: u64,
    pub entity_type: AuditEntity,
    pub entity_id: String,
    pub action: AuditAction,
    pub old_value: Option<String>,
    pub new_value: Option<String>,
    pub actor_type: ActorType,
    pub actor_id: Option<String>,
    pub reason: Option<String>,
    pub created_at: DateTime<Utc>,
}

// ─── Notification ─────────────────────────────────────────────

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum NotificationKind {
    Escalation,
    StatusChange,
    Assignment,
    SlaWarning,
    SlaBreach,
    Resolution,
    General,
}

impl NotificationKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            NotificationKind::Escalation => "ESCALATION",
            NotificationKind::StatusChange => "STATUS_CHANGE",
            NotificationKind::Assignment => "ASSIGNMENT",
            NotificationKind::SlaWarning => "SLA_WARNING",
            NotificationKind::SlaBreach => "SLA_BREACH",
            NotificationKind::Resolution => "RESOLUTION",
            NotificationKind::General => "GENERAL",
        }
    }
}

impl std::str::FromStr for NotificationKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "ESCALATION" => Ok(NotificationKind::Escalation),
            "STATUS_CHANGE" => Ok(NotificationKind::StatusChange),
            "ASSIGNMENT" => Ok(NotificationKind::Assignment),
            "SLA_WARNING" => Ok(NotificationKind::SlaWarning),
            "SLA_BREACH" => Ok(NotificationKind::SlaBreach),
            "RESOLUTION" => Ok(NotificationKind::Resolution),
            "GENERAL" => Ok(NotificationKind::General),
            other => Err(format!("unknown notification kind: {other}")),
        }
    }
}

/// In-app inbox record. `read` is the only mutable field.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Notification {
    pub id: Uuid,
    pub recipient_id: String,
    pub kind: NotificationKind,
    pub title: String,
    pub message: String,
    pub complaint_id: Option<Uuid>,
    pub read: bool,
    pub created_at: DateTime<Utc>,
}

// ─── AI oracle decision ───────────────────────────────────────

/// What the external classifier returned for an intake submission. Consumed
/// as-is; the engine only thresholds on `confidence`.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct AiDecision {
    pub category: ComplaintCategory,
    pub priority: Priority,
    pub sla_days: u32,
    pub reasoning: String,
    pub confidence: f64,
    pub image_findings: Option<String>,
}

impl AiDecision {
    /// Fallback used when the oracle is unavailable: park as OTHER/LOW for
    /// manual routing.
    pub fn degraded(sla_days: u32) -> Self {
        Self {
            category: ComplaintCategory::Other,
            priority: Priority::Low,
            sla_days,
            reasoning: "classifier unavailable, defaulted".to_string(),
            confidence: 0.0,
            image_findings: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn priority_raises_and_saturates() {
        assert_eq!(Priority::Low.raised(), Priority::Medium);
        assert_eq!(Priority::High.raised(), Priority::Critical);
        assert_eq!(Priority::Critical.raised(), Priority::Critical);
    }

    #[test]
    fn status_round_trips_through_str() {
        for s in [
            ComplaintStatus::Filed,
            ComplaintStatus::InProgress,
            ComplaintStatus::Resolved,
            ComplaintStatus::Closed,
            ComplaintStatus::Cancelled,
        ] {
            assert_eq!(s.as_str().parse::<ComplaintStatus>().unwrap(), s);
        }
    }

    #[test]
    fn category_round_trips_through_str() {
        for c in ComplaintCategory::ALL {
            assert_eq!(c.as_str().parse::<ComplaintCategory>().unwrap(), c);
        }
    }

    #[test]
    fn geo_point_validation() {
        assert!(GeoPoint { lat: 12.97, lng: 77.59 }.is_valid());
        assert!(!GeoPoint { lat: 91.0, lng: 0.0 }.is_valid());
        assert!(!GeoPoint { lat: 0.0, lng: -181.0 }.is_valid());
    }
}
