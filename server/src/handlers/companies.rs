use axum::extract::{Path, State};
use axum::response::Response;
use axum::Json;

use crate::services::UpdateCompanyProfile;
use crate::state::AppState;
use crate::utils::error::AppError;
use crate::utils::response::success;

pub async fn update_company(
    State(state): State<AppState>,
    Path(company_id): Path<String>,
    Json(update): Json<UpdateCompanyProfile>,
) -> Result<Response, AppError> {
    let company = state
        .services
        .companies
        .update_profile(&company_id, update)
        .await?;
    Ok(success(company, "Company updated"))
}
