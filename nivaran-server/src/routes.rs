use axum::routing::{get, post, put};
use axum::Router;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::handlers::{audit, community, complaints, escalations, notifications};
use crate::state::AppState;

pub fn router(state: AppState) -> Router {
    let cors = CorsLayer::new().allow_origin(Any).allow_methods(Any);

    let complaint_routes = Router::new()
        .route("/citizen/:citizen_id", post(complaints::create))
        .route(
            "/citizen/:citizen_id/with-image",
            post(complaints::create_with_image),
        )
        .route("/check-duplicates", post(complaints::check_duplicates))
        .route("/pending-routing", get(complaints::pending_routing))
        .route("/", get(complaints::list))
        .route("/:id", get(complaints::get))
        .route("/:id/details", get(complaints::details))
        .route(
            "/:id/allowed-transitions",
            get(complaints::allowed_transitions),
        )
        .route("/:id/state", put(complaints::change_state))
        .route("/:id/start", put(complaints::start))
        .route("/:id/resolve", put(complaints::resolve))
        .route("/:id/close", put(complaints::close))
        .route("/:id/cancel", put(complaints::cancel))
        .route("/:id/rate", put(complaints::rate))
        .route("/:id/sla", put(complaints::override_sla))
        .route("/:id/comments", post(complaints::add_comment))
        .route("/:id/assign-department", put(complaints::assign_department))
        .route("/:id/assign-staff/:staff_id", put(complaints::assign_staff))
        .route("/:id/resolution-proof", post(complaints::submit_proof))
        .route("/:id/resolution-proofs", get(complaints::list_proofs))
        .route("/:id/signoff", post(complaints::signoff))
        .route(
            "/:id/dispute/:signoff_id/approve",
            post(complaints::approve_dispute),
        )
        .route(
            "/:id/dispute/:signoff_id/reject",
            post(complaints::reject_dispute),
        );

    let community_routes = Router::new()
        .route(
            "/complaints/:id/upvote",
            post(community::upvote).delete(community::remove_upvote),
        )
        .route("/complaints/nearby", get(community::nearby))
        .route("/complaints/trending", get(community::trending));

    let escalation_routes = Router::new()
        .route("/overdue", get(escalations::overdue))
        .route("/stats", get(escalations::stats))
        .route("/trigger", post(escalations::trigger));

    let audit_routes = Router::new()
        .route("/complaint/:id", get(audit::for_complaint))
        .route("/recent", get(audit::recent))
        .route("/action/:action", get(audit::by_action))
        .route("/actor/:actor_id", get(audit::by_actor));

    let notification_routes = Router::new()
        .route("/", get(notifications::inbox))
        .route("/:id/read", put(notifications::mark_read));

    Router::new()
        .route("/healthz", get(|| async { "ok" }))
        .nest("/complaints", complaint_routes)
        .nest("/community", community_routes)
        .nest("/escalations", escalation_routes)
        .nest("/audit", audit_routes)
        .nest("/notifications", notification_routes)
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}
