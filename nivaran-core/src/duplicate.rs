//! Geospatial + textual duplicate detection at intake, and the community
//! upvote counter. Both jobs read and write through the same store the
//! engine uses.

use std::sync::Arc;

use serde::Serialize;
use uuid::Uuid;

use crate::clock::Clock;
use crate::config::EngineConfig;
use crate::engine::ComplaintEngine;
use crate::error::{ConflictKind, EngineError};
use crate::store::{GrievanceStore, UpvoteOutcome};
use crate::types::{Complaint, ComplaintStatus, GeoPoint, Upvote};

/// Statuses considered when matching duplicates: anything still alive.
const MATCHABLE: &[ComplaintStatus] = &[
    ComplaintStatus::Filed,
    ComplaintStatus::InProgress,
    ComplaintStatus::Resolved,
];

/// Great-circle distance between two WGS-84 points, in meters.
pub fn haversine_meters(a: GeoPoint, b: GeoPoint) -> f64 {
    const EARTH_RADIUS_M: f64 = 6_371_000.0;
    let (lat1, lat2) = (a.lat.to_radians(), b.lat.to_radians());
    let dlat = (b.lat - a.lat).to_radians();
    let dlng = (b.lng - a.lng).to_radians();
    let h = (dlat / 2.0).sin().powi(2) + lat1.cos() * lat2.cos() * (dlng / 2.0).sin().powi(2);
    2.0 * EARTH_RADIUS_M * h.sqrt().asin()
}

/// Lowercased alphanumeric tokens joined by single spaces. Similarity is
/// computed on this normal form so punctuation and casing never matter.
fn normalize(text: &str) -> String {
    text.to_lowercase()
        .split(|c: char| !c.is_alphanumeric())
        .filter(|t| !t.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}

/// Deterministic similarity in [0,1] between two descriptions.
pub fn similarity(a: &str, b: &str) -> f64 {
    let (a, b) = (normalize(a), normalize(b));
    if a.is_empty() || b.is_empty() {
        return 0.0;
    }
    strsim::sorensen_dice(&a, &b)
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DuplicateFlag {
    Possible,
    Likely,
    NearCertain,
}

#[derive(Clone, Debug, Serialize)]
pub struct DuplicateCandidate {
    pub complaint: Complaint,
    pub distance_meters: f64,
    pub similarity: f64,
    pub flag: DuplicateFlag,
}

#[derive(Clone)]
pub struct DuplicateResolver {
    store: Arc<dyn GrievanceStore>,
    engine: Arc<ComplaintEngine>,
    clock: Arc<dyn Clock>,
    config: Arc<EngineConfig>,
}

impl DuplicateResolver {
    pub fn new(
        store: Arc<dyn GrievanceStore>,
        engine: Arc<ComplaintEngine>,
        clock: Arc<dyn Clock>,
        config: Arc<EngineConfig>,
    ) -> Self {
        Self {
            store,
            engine,
            clock,
            config,
        }
    }

    /// Candidates within `radius_meters` of `at` whose description scores at
    /// least the configured minimum similarity, ordered by descending
    /// similarity.
    pub async fn check(
        &self,
        description: &str,
        at: GeoPoint,
        radius_meters: Option<f64>,
    ) -> Result<Vec<DuplicateCandidate>, EngineError> {
        let radius = radius_meters.unwrap_or(self.config.duplicate_radius_meters);
        let mut out = Vec::new();
        for complaint in self.store.list_with_coords(MATCHABLE).await? {
            let coords = match complaint.coords {
                Some(c) => c,
                None => continue,
            };
            let distance = haversine_meters(at, coords);
            if distance > radius {
                continue;
            }
            let score = similarity(description, &complaint.description);
            if score < self.config.duplicate_min_similarity {
                continue;
            }
            let flag = if score >= self.config.duplicate_block_threshold {
                DuplicateFlag::NearCertain
            } else if score >= self.config.duplicate_flag_threshold {
                DuplicateFlag::Likely
            } else {
                DuplicateFlag::Possible
            };
            out.push(DuplicateCandidate {
                complaint,
                distance_meters: distance,
                similarity: score,
                flag,
            });
        }
        out.sort_by(|a, b| {
            b.similarity
                .partial_cmp(&a.similarity)
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        Ok(out)
    }

    /// Record an upvote. Conflict on self-upvote and on an existing pair;
    /// the latter carries the unchanged count so callers that want idempotent
    /// semantics can swallow it.
    pub async fn upvote(
        &self,
        complaint_id: Uuid,
        citizen_id: &str,
        coords: Option<GeoPoint>,
    ) -> Result<u32, EngineError> {
        let complaint = self
            .store
            .load_complaint(complaint_id)
            .await?
            .ok_or_else(|| EngineError::not_found("complaint", complaint_id))?;
        if complaint.citizen_id == citizen_id {
            return Err(EngineError::Conflict(ConflictKind::SelfUpvote));
        }

        let upvote = Upvote {
            complaint_id,
            citizen_id: citizen_id.to_string(),
            coords,
            created_at: self.clock.now(),
        };
        match self.store.add_upvote(&upvote).await? {
            UpvoteOutcome::Unchanged { .. } => {
                Err(EngineError::Conflict(ConflictKind::AlreadyUpvoted))
            }
            UpvoteOutcome::Applied { count } => {
                // Community pressure feeds priority exactly once, when the
                // count first reaches the threshold.
                if count == self.config.upvote_priority_threshold {
                    self.engine
                        .apply_priority_upgrade(
                            complaint_id,
                            &format!("community upvotes reached {count}"),
                        )
                        .await?;
                }
                Ok(count)
            }
        }
    }

    /// Symmetric reverse of `upvote`.
    pub async fn remove_upvote(
        &self,
        complaint_id: Uuid,
        citizen_id: &str,
    ) -> Result<u32, EngineError> {
        self.store
            .load_complaint(complaint_id)
            .await?
            .ok_or_else(|| EngineError::not_found("complaint", complaint_id))?;
        match self.store.remove_upvote(complaint_id, citizen_id).await? {
            UpvoteOutcome::Unchanged { .. } => Err(EngineError::Conflict(ConflictKind::NotUpvoted)),
            UpvoteOutcome::Applied { count } => Ok(count),
        }
    }

    /// Live complaints within `radius_meters` of a point, nearest first.
    pub async fn nearby(
        &self,
        at: GeoPoint,
        radius_meters: Option<f64>,
    ) -> Result<Vec<(Complaint, f64)>, EngineError> {
        let radius = radius_meters.unwrap_or(self.config.duplicate_radius_meters);
        let mut out: Vec<(Complaint, f64)> = self
            .store
            .list_with_coords(MATCHABLE)
            .await?
            .into_iter()
            .filter_map(|c| {
                let coords = c.coords?;
                let d = haversine_meters(at, coords);
                (d <= radius).then_some((c, d))
            })
            .collect();
        out.sort_by(|a, b| a.1.partial_cmp(&b.1).unwrap_or(std::cmp::Ordering::Equal));
        Ok(out)
    }

    /// Top `limit` live complaints by upvote count.
    pub async fn trending(&self, limit: usize) -> Result<Vec<Complaint>, EngineError> {
        Ok(self.store.list_top_upvoted(limit).await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn haversine_known_distance() {
        // Two points in central Bangalore about half a kilometer apart.
        let a = GeoPoint { lat: 12.9716, lng: 77.5946 };
        let b = GeoPoint { lat: 12.9763, lng: 77.5929 };
        let d = haversine_meters(a, b);
        assert!(d > 400.0 && d < 700.0, "got {d}");

        // identical points
        assert_eq!(haversine_meters(a, a), 0.0);
    }

    #[test]
    fn haversine_80_meters_is_inside_default_radius() {
        let a = GeoPoint { lat: 12.97, lng: 77.59 };
        // ~0.00072 degrees of latitude is ~80 m
        let b = GeoPoint { lat: 12.97072, lng: 77.59 };
        let d = haversine_meters(a, b);
        assert!(d > 60.0 && d < 100.0, "got {d}");
    }

    #[test]
    fn similarity_is_deterministic_and_normalized() {
        let a = "Large pothole, 1m wide!";
        let b = "large POTHOLE 1m wide";
        let s1 = similarity(a, b);
        let s2 = similarity(a, b);
        assert_eq!(s1, s2);
        assert!(s1 > 0.95, "normalization should make these near-equal: {s1}");
    }

    #[test]
    fn similarity_extremes() {
        assert_eq!(similarity("", "anything"), 0.0);
        assert_eq!(similarity("pothole on mg road", "pothole on mg road"), 1.0);
        assert!(similarity("pothole on mg road", "water leaking near park") < 0.4);
    }
}
