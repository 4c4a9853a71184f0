//! View analytics status handler.

use axum::extract::{Path, State};
use axum::Json;
use vsight_models::{transform_from_features, ViewAnalyticsStatus};

use crate::error::{ApiError, ApiResult};
use crate::state::AppState;

/// Whether a view has any analytics and scene change detection configured.
pub async fn analytics_status(
    State(state): State<AppState>,
    Path(view_id): Path<String>,
) -> ApiResult<Json<ViewAnalyticsStatus>> {
    let view = state
        .pipeline
        .services()
        .views
        .view(&view_id)
        .await?
        .ok_or_else(|| ApiError::not_found(format!("View {}", view_id)))?;

    Ok(Json(transform_from_features(&view.features)))
}
