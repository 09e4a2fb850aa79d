use std::sync::Arc;

use axum::{
    extract::State,
    http::{HeaderMap, StatusCode},
    response::IntoResponse,
    routing::get,
    Json, Router,
};

use super::{auth::AuthService, utils, LedgerHandle};

// Platform-wide totals across all owners. The only endpoint that bypasses
// per-owner scoping, so it is gated on the caller's role.
async fn platform_stats(
    headers: HeaderMap,
    State((service, ledger)): State<(Arc<AuthService>, LedgerHandle)>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    let user_id = match utils::validate_auth_token(&headers, &service) {
        Ok(val) => val,
        Err(err) => {
            return Err((err, "Invalid token".to_string()));
        }
    };

    match service.is_admin(user_id).await {
        Ok(true) => {}
        Ok(false) => {
            tracing::warn!("Non-admin user {user_id} requested platform stats");
            return Err((StatusCode::FORBIDDEN, "Admin access required".to_string()));
        }
        Err(err) => {
            tracing::error!("Failed to resolve role for user {user_id}: {err}");
            return Err((
                StatusCode::INTERNAL_SERVER_ERROR,
                "internal error".to_string(),
            ));
        }
    }

    match ledger.platform_totals().await {
        Ok(totals) => Ok((StatusCode::OK, Json(totals))),
        Err(err) => {
            tracing::error!("Failed to compute platform stats: {err}");
            Err(utils::ledger_error_response(err))
        }
    }
}

pub fn admin_routes(service: Arc<AuthService>, ledger: LedgerHandle) -> Router {
    Router::new()
        .route("/admin/stats", get(platform_stats))
        .with_state((service, ledger))
}
