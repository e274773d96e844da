/// Diagnostic submission and mock telemetry endpoints
use crate::{
    alerts,
    auth::AuthUser,
    context::AppContext,
    db::models::BatteryDiagnostic,
    error::ApiResult,
    metrics,
    telemetry::{CellBalance, ChargeHistory, VoltageReading},
    validation::{CreateDiagnosticRequest, ValidatedJson},
};
use axum::{extract::State, routing::get, Json, Router};
use chrono::Utc;

/// Build diagnostic routes
pub fn routes() -> Router<AppContext> {
    Router::new()
        .route(
            "/api/diagnostics",
            get(list_diagnostics).post(create_diagnostic),
        )
        .route("/api/v1/diagnostics/voltage", get(voltage))
        .route("/api/v1/diagnostics/cell-balance", get(cell_balance))
        .route("/api/v1/diagnostics/history", get(charge_history))
}

/// Store a diagnostic and evaluate the caller's thresholds against it
async fn create_diagnostic(
    State(ctx): State<AppContext>,
    auth: AuthUser,
    ValidatedJson(req): ValidatedJson<CreateDiagnosticRequest>,
) -> ApiResult<Json<BatteryDiagnostic>> {
    let diagnostic = ctx.store.create_diagnostic(auth.id(), req.into()).await?;
    metrics::record_diagnostic_submitted(&diagnostic.battery_type);
    tracing::info!(
        user_id = auth.id(),
        diagnostic_id = diagnostic.id,
        battery_type = %diagnostic.battery_type,
        "diagnostic submitted"
    );

    let raised = alerts::raise_alerts(ctx.store.as_ref(), &diagnostic).await;
    if !raised.is_empty() {
        tracing::debug!(count = raised.len(), "thresholds breached");
    }

    Ok(Json(diagnostic))
}

async fn list_diagnostics(
    State(ctx): State<AppContext>,
    auth: AuthUser,
) -> ApiResult<Json<Vec<BatteryDiagnostic>>> {
    Ok(Json(ctx.store.list_diagnostics(auth.id()).await?))
}

async fn voltage(State(ctx): State<AppContext>) -> Json<VoltageReading> {
    Json(ctx.telemetry.voltage())
}

async fn cell_balance(State(ctx): State<AppContext>) -> Json<CellBalance> {
    Json(ctx.telemetry.cell_balance())
}

async fn charge_history(State(ctx): State<AppContext>) -> Json<ChargeHistory> {
    Json(ctx.telemetry.charge_history(Utc::now()))
}
