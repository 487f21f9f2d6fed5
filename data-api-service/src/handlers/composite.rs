use crate::error::DataApiError;
use crate::models::CompositeResponse;
use crate::services::assemble;
use crate::startup::AppState;
use axum::{
    extract::{Path, State},
    Json,
};

pub async fn get_composite(
    State(state): State<AppState>,
    Path(customer_id): Path<String>,
) -> Result<Json<CompositeResponse>, DataApiError> {
    let composite = assemble(&state.records, &customer_id).await?;
    Ok(Json(composite))
}
