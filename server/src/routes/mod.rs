use axum::routing::{get, patch, post};
use axum::Router;
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;

use crate::config::{create_cors_layer, create_security_headers_layer, Config};
use crate::handlers::{
    health_check, pause_ticket, pay_order, post_comment, resume_ticket, update_company,
};
use crate::state::AppState;

pub fn create_routes(state: AppState, config: &Config) -> Router {
    let api = Router::new()
        .route("/tickets/:ticket_id/pause", post(pause_ticket))
        .route("/tickets/:ticket_id/resume", post(resume_ticket))
        .route("/tickets/:ticket_id/comments", post(post_comment))
        .route("/companies/:company_id", patch(update_company))
        .route("/orders/:order_id/pay", post(pay_order));

    let router = Router::new()
        .route("/health", get(health_check))
        .nest("/api/v1", api)
        .with_state(state);

    create_security_headers_layer(router, config.production)
        .layer(create_cors_layer(config.cors_allowed_origins.as_deref()))
        .layer(TimeoutLayer::new(config.request_timeout))
        .layer(TraceLayer::new_for_http())
}
