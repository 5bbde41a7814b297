//! Engine configuration. `Default` carries every documented default; a YAML
//! file may override any subset and is loaded once at startup.

use std::collections::BTreeMap;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::types::ComplaintCategory;

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Sweep cadence as a cron expression (seconds field included).
    pub escalation_cron: String,
    /// Citizen response window after RESOLVED, in hours.
    pub signoff_window_hours: u32,
    /// Days past the SLA deadline before level 1 advances to level 2.
    pub escalation_l2_after_days: i64,
    /// Age in hours after which a still-FILED complaint indicates an intake
    /// stall and warns the administrators.
    pub filed_stall_hours: u32,

    /// Radius for the geospatial duplicate search, in meters.
    pub duplicate_radius_meters: f64,
    /// Minimum similarity for a candidate to be reported at all.
    pub duplicate_min_similarity: f64,
    /// Similarity at which a candidate is flagged "likely duplicate".
    pub duplicate_flag_threshold: f64,
    /// Similarity at which a candidate is flagged "near-certain duplicate"
    /// and intake short-circuits into an upvote.
    pub duplicate_block_threshold: f64,

    /// Classifier confidence below which a complaint parks in FILED for
    /// manual routing.
    pub ai_confidence_threshold: f64,
    /// Hard-fail intake when the classifier is unavailable instead of
    /// degrading to OTHER/LOW.
    pub ai_required: bool,

    /// Upvote count at which community pressure raises priority one step.
    pub upvote_priority_threshold: u32,

    /// Per-category SLA days.
    pub sla_days: BTreeMap<ComplaintCategory, u32>,
    /// Per-category default routing department.
    pub departments: BTreeMap<ComplaintCategory, String>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        use ComplaintCategory::*;
        let sla_days = BTreeMap::from([
            (Pothole, 3),
            (Streetlight, 2),
            (WaterShortage, 1),
            (SewerDrainage, 2),
            (Garbage, 1),
            (TrafficSignals, 1),
            (ParkMaintenance, 7),
            (ElectricalDamage, 3),
            (Other, 14),
        ]);
        let departments = BTreeMap::from([
            (Pothole, "ROADS".to_string()),
            (Streetlight, "STREET_LIGHTING".to_string()),
            (WaterShortage, "WATER_SUPPLY".to_string()),
            (SewerDrainage, "SEWERAGE".to_string()),
            (Garbage, "SANITATION".to_string()),
            (TrafficSignals, "TRAFFIC".to_string()),
            (ParkMaintenance, "PARKS".to_string()),
            (ElectricalDamage, "ELECTRICAL".to_string()),
            (Other, "GENERAL_ADMIN".to_string()),
        ]);
        Self {
            escalation_cron: "0 0 */6 * * *".to_string(),
            signoff_window_hours: 72,
            escalation_l2_after_days: 3,
            filed_stall_hours: 48,
            duplicate_radius_meters: 500.0,
            duplicate_min_similarity: 0.4,
            duplicate_flag_threshold: 0.6,
            duplicate_block_threshold: 0.8,
            ai_confidence_threshold: 0.7,
            ai_required: false,
            upvote_priority_threshold: 10,
            sla_days,
            departments,
        }
    }
}

impl EngineConfig {
    pub fn from_yaml_file(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let raw = std::fs::read_to_string(path.as_ref())?;
        let config: EngineConfig = serde_yaml::from_str(&raw)?;
        Ok(config)
    }

    /// SLA days for a category; `fallback` is the AI-suggested value used
    /// when no table entry exists.
    pub fn sla_days_for(&self, category: ComplaintCategory, fallback: u32) -> u32 {
        self.sla_days.get(&category).copied().unwrap_or(fallback)
    }

    /// Routing department for a category.
    pub fn department_for(&self, category: ComplaintCategory) -> String {
        self.departments
            .get(&category)
            .cloned()
            .unwrap_or_else(|| "GENERAL_ADMIN".to_string())
    }

    pub fn signoff_window(&self) -> chrono::Duration {
        chrono::Duration::hours(self.signoff_window_hours as i64)
    }

    pub fn filed_stall_window(&self) -> chrono::Duration {
        chrono::Duration::hours(self.filed_stall_hours as i64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_documented_values() {
        let c = EngineConfig::default();
        assert_eq!(c.signoff_window_hours, 72);
        assert_eq!(c.duplicate_radius_meters, 500.0);
        assert_eq!(c.duplicate_flag_threshold, 0.6);
        assert_eq!(c.duplicate_block_threshold, 0.8);
        assert_eq!(c.ai_confidence_threshold, 0.7);
        assert_eq!(c.sla_days_for(ComplaintCategory::Pothole, 99), 3);
        assert_eq!(c.sla_days_for(ComplaintCategory::Other, 99), 14);
        assert_eq!(c.department_for(ComplaintCategory::Pothole), "ROADS");
    }

    #[test]
    fn partial_yaml_overrides_keep_defaults() {
        let yaml = r#"
signoff_window_hours: 48
duplicate_radius_meters: 250.0
"#;
        let c: EngineConfig = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(c.signoff_window_hours, 48);
        assert_eq!(c.duplicate_radius_meters, 250.0);
        // untouched defaults survive
        assert_eq!(c.ai_confidence_threshold, 0.7);
        assert_eq!(c.sla_days_for(ComplaintCategory::Garbage, 99), 1);
    }

    #[test]
    fn sla_table_fallback_uses_ai_value() {
        let mut c = EngineConfig::default();
        c.sla_days.remove(&ComplaintCategory::Pothole);
        assert_eq!(c.sla_days_for(ComplaintCategory::Pothole, 5), 5);
    }
}
