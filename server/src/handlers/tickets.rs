use axum::extract::{Path, State};
use axum::response::Response;
use axum::Json;

use crate::services::CommentTransitionRequest;
use crate::state::AppState;
use crate::utils::error::AppError;
use crate::utils::response::{created, success};

pub async fn pause_ticket(
    State(state): State<AppState>,
    Path(ticket_id): Path<String>,
) -> Result<Response, AppError> {
    let ticket = state.services.timer.pause(&ticket_id).await?;
    Ok(success(ticket, "Ticket timer paused"))
}

pub async fn resume_ticket(
    State(state): State<AppState>,
    Path(ticket_id): Path<String>,
) -> Result<Response, AppError> {
    let ticket = state.services.timer.resume(&ticket_id).await?;
    Ok(success(ticket, "Ticket timer resumed"))
}

/// The ticket id always comes from the path.
pub async fn post_comment(
    State(state): State<AppState>,
    Path(ticket_id): Path<String>,
    Json(mut request): Json<CommentTransitionRequest>,
) -> Result<Response, AppError> {
    request.ticket_id = ticket_id;
    let comment = state
        .services
        .comments
        .apply_comment_transition(request)
        .await?;
    Ok(created(comment, "Comment posted"))
}
