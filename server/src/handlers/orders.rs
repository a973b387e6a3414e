use axum::extract::{Path, State};
use axum::response::Response;

use crate::state::AppState;
use crate::utils::error::AppError;
use crate::utils::response::success;

pub async fn pay_order(
    State(state): State<AppState>,
    Path(order_id): Path<String>,
) -> Result<Response, AppError> {
    let order = state.services.orders.pay(&order_id).await?;
    Ok(success(order, "Order paid"))
}
