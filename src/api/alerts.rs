/// Alert threshold and alert history endpoints
use crate::{
    auth::AuthUser,
    context::AppContext,
    db::models::{AlertHistory, AlertThreshold, ThresholdPatch},
    error::{ApiError, ApiResult},
    validation::{CreateAlertThresholdRequest, UpdateAlertThresholdRequest, ValidatedJson},
};
use axum::{
    extract::{rejection::PathRejection, Path, State},
    routing::{get, patch},
    Json, Router,
};

/// Build alert routes
pub fn routes() -> Router<AppContext> {
    Router::new()
        .route(
            "/api/v1/alert-thresholds",
            get(list_thresholds).post(create_threshold),
        )
        .route("/api/v1/alert-thresholds/:id", patch(update_threshold))
        .route("/api/v1/alert-history", get(list_history))
        .route(
            "/api/v1/alert-history/:id/acknowledge",
            patch(acknowledge_alert),
        )
}

fn record_id(path: Result<Path<i64>, PathRejection>) -> ApiResult<i64> {
    path.map(|Path(id)| id)
        .map_err(|rejection| ApiError::BadRequest(rejection.body_text()))
}

async fn create_threshold(
    State(ctx): State<AppContext>,
    auth: AuthUser,
    ValidatedJson(req): ValidatedJson<CreateAlertThresholdRequest>,
) -> ApiResult<Json<AlertThreshold>> {
    let threshold = ctx
        .store
        .create_alert_threshold(auth.id(), req.into())
        .await?;
    tracing::info!(
        user_id = auth.id(),
        threshold_id = threshold.id,
        parameter = threshold.parameter_name.as_str(),
        "alert threshold created"
    );
    Ok(Json(threshold))
}

async fn list_thresholds(
    State(ctx): State<AppContext>,
    auth: AuthUser,
) -> ApiResult<Json<Vec<AlertThreshold>>> {
    Ok(Json(ctx.store.list_alert_thresholds(auth.id()).await?))
}

/// Apply a partial update to one of the caller's thresholds
async fn update_threshold(
    State(ctx): State<AppContext>,
    auth: AuthUser,
    path: Result<Path<i64>, PathRejection>,
    ValidatedJson(req): ValidatedJson<UpdateAlertThresholdRequest>,
) -> ApiResult<Json<AlertThreshold>> {
    let threshold_id = record_id(path)?;

    let updated = ctx
        .store
        .update_alert_threshold(auth.id(), threshold_id, ThresholdPatch::from(req))
        .await?;
    tracing::info!(
        user_id = auth.id(),
        threshold_id,
        version = updated.version,
        "alert threshold updated"
    );
    Ok(Json(updated))
}

async fn list_history(
    State(ctx): State<AppContext>,
    auth: AuthUser,
) -> ApiResult<Json<Vec<AlertHistory>>> {
    Ok(Json(ctx.store.list_alert_history(auth.id()).await?))
}

async fn acknowledge_alert(
    State(ctx): State<AppContext>,
    auth: AuthUser,
    path: Result<Path<i64>, PathRejection>,
) -> ApiResult<Json<AlertHistory>> {
    let alert_id = record_id(path)?;
    let alert = ctx.store.acknowledge_alert(auth.id(), alert_id).await?;
    tracing::info!(user_id = auth.id(), alert_id, "alert acknowledged");
    Ok(Json(alert))
}
