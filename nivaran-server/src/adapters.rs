//! Local default implementations of the out-of-scope collaborators, so the
//! server runs end-to-end without any external services. Production
//! deployments swap these for real clients at wiring time.

use anyhow::Result;
use async_trait::async_trait;
use uuid::Uuid;

use nivaran_core::intake::{AiOracle, ObjectStore};
use nivaran_core::notify::MessagingClient;
use nivaran_core::types::{AiDecision, ComplaintCategory, Priority};

/// Keyword-based stand-in for the external classifier. Returns a moderate
/// confidence on a keyword hit so high-stakes routing still goes through the
/// manual queue unless the text is unambiguous.
pub struct KeywordClassifier;

const KEYWORDS: &[(&str, ComplaintCategory, Priority)] = &[
    ("pothole", ComplaintCategory::Pothole, Priority::Medium),
    ("road", ComplaintCategory::Pothole, Priority::Medium),
    ("streetlight", ComplaintCategory::Streetlight, Priority::Medium),
    ("street light", ComplaintCategory::Streetlight, Priority::Medium),
    ("water", ComplaintCategory::WaterShortage, Priority::High),
    ("sewer", ComplaintCategory::SewerDrainage, Priority::High),
    ("drain", ComplaintCategory::SewerDrainage, Priority::Medium),
    ("garbage", ComplaintCategory::Garbage, Priority::Medium),
    ("trash", ComplaintCategory::Garbage, Priority::Medium),
    ("traffic", ComplaintCategory::TrafficSignals, Priority::High),
    ("signal", ComplaintCategory::TrafficSignals, Priority::Medium),
    ("park", ComplaintCategory::ParkMaintenance, Priority::Low),
    ("wire", ComplaintCategory::ElectricalDamage, Priority::High),
    ("electric", ComplaintCategory::ElectricalDamage, Priority::High),
];

const DEFAULT_SLA_DAYS: &[(ComplaintCategory, u32)] = &[
    (ComplaintCategory::Pothole, 3),
    (ComplaintCategory::Streetlight, 2),
    (ComplaintCategory::WaterShortage, 1),
    (ComplaintCategory::SewerDrainage, 2),
    (ComplaintCategory::Garbage, 1),
    (ComplaintCategory::TrafficSignals, 1),
    (ComplaintCategory::ParkMaintenance, 7),
    (ComplaintCategory::ElectricalDamage, 3),
    (ComplaintCategory::Other, 14),
];

fn sla_for(category: ComplaintCategory) -> u32 {
    DEFAULT_SLA_DAYS
        .iter()
        .find(|(c, _)| *c == category)
        .map(|(_, d)| *d)
        .unwrap_or(14)
}

#[async_trait]
impl AiOracle for KeywordClassifier {
    async fn analyze(&self, text: &str, _image: Option<&[u8]>) -> Result<AiDecision> {
        let haystack = text.to_lowercase();
        let hit = KEYWORDS
            .iter()
            .find(|(keyword, _, _)| haystack.contains(keyword));
        let decision = match hit {
            Some((keyword, category, priority)) => AiDecision {
                category: *category,
                priority: *priority,
                sla_days: sla_for(*category),
                reasoning: format!("matched keyword \"{keyword}\""),
                confidence: 0.75,
                image_findings: None,
            },
            None => AiDecision {
                category: ComplaintCategory::Other,
                priority: Priority::Low,
                sla_days: sla_for(ComplaintCategory::Other),
                reasoning: "no keyword matched".to_string(),
                confidence: 0.3,
                image_findings: None,
            },
        };
        Ok(decision)
    }
}

/// Filesystem-backed object store: keys are uuids under a base directory.
pub struct FsObjectStore {
    base: std::path::PathBuf,
}

impl FsObjectStore {
    pub fn new(base: impl Into<std::path::PathBuf>) -> Self {
        Self { base: base.into() }
    }
}

#[async_trait]
impl ObjectStore for FsObjectStore {
    async fn put(&self, bytes: &[u8], mime: &str) -> Result<String> {
        tokio::fs::create_dir_all(&self.base).await?;
        let extension = mime.rsplit('/').next().unwrap_or("bin");
        let key = format!("{}.{extension}", Uuid::now_v7());
        tokio::fs::write(self.base.join(&key), bytes).await?;
        Ok(key)
    }

    async fn get(&self, key: &str) -> Result<Vec<u8>> {
        Ok(tokio::fs::read(self.base.join(key)).await?)
    }
}

/// Messaging sink that only logs. The in-app inbox is the delivery channel
/// of record in this deployment.
pub struct LogMessaging;

#[async_trait]
impl MessagingClient for LogMessaging {
    async fn send(&self, recipient_id: &str, text: &str) -> Result<()> {
        tracing::info!(recipient = recipient_id, text, "outbound message");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn keyword_classifier_routes_potholes() {
        let decision = KeywordClassifier
            .analyze("large pothole near the bus stop", None)
            .await
            .unwrap();
        assert_eq!(decision.category, ComplaintCategory::Pothole);
        assert!(decision.confidence >= 0.7);
    }

    #[tokio::test]
    async fn keyword_classifier_falls_back_to_other() {
        let decision = KeywordClassifier
            .analyze("something vague happened", None)
            .await
            .unwrap();
        assert_eq!(decision.category, ComplaintCategory::Other);
        assert!(decision.confidence < 0.7);
    }
}
