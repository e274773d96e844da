/// API routes and handlers
pub mod alerts;
pub mod diagnostics;
pub mod docs;
pub mod health;
pub mod users;

use crate::context::AppContext;
use axum::Router;

/// Build API routes
pub fn routes() -> Router<AppContext> {
    Router::new()
        .merge(users::routes())
        .merge(diagnostics::routes())
        .merge(alerts::routes())
        .merge(docs::routes())
        .merge(health::routes())
}
