use axum::response::Response;
use serde::Serialize;

use crate::utils::response::success;

pub mod companies;
pub mod orders;
pub mod tickets;

pub use companies::update_company;
pub use orders::pay_order;
pub use tickets::{pause_ticket, post_comment, resume_ticket};

#[derive(Serialize)]
struct HealthPayload {
    status: &'static str,
    service: &'static str,
}

pub async fn health_check() -> Response {
    let payload = HealthPayload {
        status: "ok",
        service: "helpdesk-api",
    };

    success(payload, "Health check successful")
}
