use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::{HeaderMap, StatusCode},
    response::IntoResponse,
    routing::get,
    Json, Router,
};
use uuid::Uuid;

use crate::db::wallet::{NewWallet, WalletUpdate};

use super::{auth::AuthService, utils, LedgerHandle};

async fn create_wallet(
    headers: HeaderMap,
    State((service, ledger)): State<(Arc<AuthService>, LedgerHandle)>,
    Json(new): Json<NewWallet>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    let owner_id = match utils::validate_auth_token(&headers, &service) {
        Ok(val) => val,
        Err(err) => {
            tracing::error!("Invalid token: {err}");
            return Err((err, "Invalid token".to_string()));
        }
    };

    match ledger.create_wallet(owner_id, new).await {
        Ok(wallet) => Ok((StatusCode::CREATED, Json(wallet))),
        Err(err) => {
            tracing::warn!("Failed to create wallet for user {owner_id}: {err}");
            Err(utils::ledger_error_response(err))
        }
    }
}

// only active wallets are listed; deactivated ones stay queryable by id
async fn list_wallets(
    headers: HeaderMap,
    State((service, ledger)): State<(Arc<AuthService>, LedgerHandle)>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    let owner_id = match utils::validate_auth_token(&headers, &service) {
        Ok(val) => val,
        Err(err) => {
            return Err((err, "Invalid token".to_string()));
        }
    };

    match ledger.list_wallets(owner_id).await {
        Ok(wallets) => Ok((StatusCode::OK, Json(wallets))),
        Err(err) => {
            tracing::error!("Failed to list wallets for user {owner_id}: {err}");
            Err(utils::ledger_error_response(err))
        }
    }
}

async fn get_wallet(
    headers: HeaderMap,
    State((service, ledger)): State<(Arc<AuthService>, LedgerHandle)>,
    Path(wallet_id): Path<Uuid>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    let owner_id = match utils::validate_auth_token(&headers, &service) {
        Ok(val) => val,
        Err(err) => {
            return Err((err, "Invalid token".to_string()));
        }
    };

    match ledger.get_wallet(wallet_id, owner_id).await {
        Ok(wallet) => Ok((StatusCode::OK, Json(wallet))),
        Err(err) => Err(utils::ledger_error_response(err)),
    }
}

// wallet_number / is_active only; balance is owned by the ledger
async fn update_wallet(
    headers: HeaderMap,
    State((service, ledger)): State<(Arc<AuthService>, LedgerHandle)>,
    Path(wallet_id): Path<Uuid>,
    Json(changes): Json<WalletUpdate>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    let owner_id = match utils::validate_auth_token(&headers, &service) {
        Ok(val) => val,
        Err(err) => {
            return Err((err, "Invalid token".to_string()));
        }
    };

    match ledger.update_wallet(wallet_id, owner_id, changes).await {
        Ok(wallet) => Ok((StatusCode::OK, Json(wallet))),
        Err(err) => {
            tracing::warn!("Failed to update wallet {wallet_id}: {err}");
            Err(utils::ledger_error_response(err))
        }
    }
}

// soft delete; the wallet's transactions stay valid and reversible
async fn deactivate_wallet(
    headers: HeaderMap,
    State((service, ledger)): State<(Arc<AuthService>, LedgerHandle)>,
    Path(wallet_id): Path<Uuid>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    let owner_id = match utils::validate_auth_token(&headers, &service) {
        Ok(val) => val,
        Err(err) => {
            return Err((err, "Invalid token".to_string()));
        }
    };

    match ledger.deactivate_wallet(wallet_id, owner_id).await {
        Ok(()) => Ok((
            StatusCode::OK,
            "Wallet deactivated successfully".to_string(),
        )),
        Err(err) => {
            tracing::warn!("Failed to deactivate wallet {wallet_id}: {err}");
            Err(utils::ledger_error_response(err))
        }
    }
}

pub fn wallet_routes(service: Arc<AuthService>, ledger: LedgerHandle) -> Router {
    Router::new()
        .route("/wallets", get(list_wallets).post(create_wallet))
        .route(
            "/wallets/:id",
            get(get_wallet).put(update_wallet).delete(deactivate_wallet),
        )
        .with_state((service, ledger))
}
