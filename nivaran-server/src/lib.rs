//! Axum front for the grievance engine. Handlers are thin: extract the actor
//! context and parameters, delegate to `nivaran-core`, map errors to status
//! codes.

pub mod actor;
pub mod adapters;
pub mod error;
pub mod handlers;
pub mod routes;
pub mod state;
