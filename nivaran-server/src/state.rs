use std::sync::Arc;

use nivaran_core::config::EngineConfig;
use nivaran_core::duplicate::DuplicateResolver;
use nivaran_core::engine::ComplaintEngine;
use nivaran_core::intake::{IntakeOrchestrator, ObjectStore};
use nivaran_core::scheduler::EscalationScheduler;

/// Shared application state handed to every handler.
#[derive(Clone)]
pub struct AppState {
    pub engine: Arc<ComplaintEngine>,
    pub intake: Arc<IntakeOrchestrator>,
    pub resolver: Arc<DuplicateResolver>,
    pub scheduler: Arc<EscalationScheduler>,
    pub objects: Arc<dyn ObjectStore>,
    pub config: Arc<EngineConfig>,
}
