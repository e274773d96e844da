/// Signup endpoint
use crate::{
    auth,
    context::AppContext,
    db::models::NewUser,
    error::ApiResult,
    metrics,
    validation::{CreateUserRequest, ValidatedJson},
};
use axum::{extract::State, routing::post, Json, Router};
use serde::Serialize;

/// Build user routes
pub fn routes() -> Router<AppContext> {
    Router::new().route("/api/users", post(create_user))
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateUserResponse {
    pub api_key: String,
}

/// Register a user and hand back their API key
async fn create_user(
    State(ctx): State<AppContext>,
    ValidatedJson(req): ValidatedJson<CreateUserRequest>,
) -> ApiResult<Json<CreateUserResponse>> {
    tracing::info!(username = %req.username, "create_user: registering");

    let password_hash = auth::hash_password(&req.password)?;
    let user = ctx
        .store
        .create_user(NewUser {
            username: req.username,
            password_hash,
            api_key: auth::generate_api_key(),
        })
        .await
        .map_err(|e| {
            tracing::warn!("create_user: {}", e);
            e
        })?;

    metrics::record_user_created();
    tracing::info!(user_id = user.id, "create_user: user created");

    Ok(Json(CreateUserResponse {
        api_key: user.api_key,
    }))
}
