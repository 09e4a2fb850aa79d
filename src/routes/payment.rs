use std::sync::Arc;

use axum::{
    extract::State,
    http::{HeaderMap, StatusCode},
    response::IntoResponse,
    routing::post,
    Json, Router,
};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::db::tx::{NewTransaction, PaymentMethod, TransactionStatus, TransactionType};
use crate::db::wallet::WalletType;

use super::{auth::AuthService, utils, LedgerHandle};

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Gateway {
    Esewa,
    Khalti,
}

impl Gateway {
    fn wallet_type(self) -> WalletType {
        match self {
            Gateway::Esewa => WalletType::Esewa,
            Gateway::Khalti => WalletType::Khalti,
        }
    }

    fn payment_method(self) -> PaymentMethod {
        match self {
            Gateway::Esewa => PaymentMethod::Esewa,
            Gateway::Khalti => PaymentMethod::Khalti,
        }
    }

    fn as_str(self) -> &'static str {
        match self {
            Gateway::Esewa => "esewa",
            Gateway::Khalti => "khalti",
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct InitiateRequest {
    wallet_id: Uuid,
    amount: Decimal,
    gateway: Gateway,
    description: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct InitiateResponse {
    payment_id: Uuid,
    wallet_id: Uuid,
    amount: Decimal,
    gateway: Gateway,
    description: Option<String>,
    message: &'static str,
}

#[derive(Debug, Deserialize)]
pub struct ConfirmRequest {
    payment_id: Uuid,
    gateway: Gateway,
    amount: Decimal,
}

// Placeholder initiation: validates ownership and hands back a payment id.
// TODO: call the real eSewa/Khalti initiation APIs once merchant credentials exist.
async fn initiate_payment(
    headers: HeaderMap,
    State((service, ledger)): State<(Arc<AuthService>, LedgerHandle)>,
    Json(req): Json<InitiateRequest>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    let owner_id = match utils::validate_auth_token(&headers, &service) {
        Ok(val) => val,
        Err(err) => {
            return Err((err, "Invalid token".to_string()));
        }
    };

    if req.amount <= Decimal::ZERO {
        return Err((
            StatusCode::BAD_REQUEST,
            "amount must be positive".to_string(),
        ));
    }

    if let Err(err) = ledger.get_wallet(req.wallet_id, owner_id).await {
        return Err(utils::ledger_error_response(err));
    }

    let response = InitiateResponse {
        payment_id: Uuid::new_v4(),
        wallet_id: req.wallet_id,
        amount: req.amount,
        gateway: req.gateway,
        description: req.description,
        message: "Payment initiated. Redirect to gateway for completion.",
    };
    tracing::info!(
        "payment {} initiated via {} for user {owner_id}",
        response.payment_id,
        req.gateway.as_str()
    );
    Ok((StatusCode::OK, Json(response)))
}

// Stub settlement: the reported amount is trusted as-is (no gateway signature
// verification) and recorded through the ledger like any other entry, into
// the caller's wallet for that gateway.
async fn confirm_payment(
    headers: HeaderMap,
    State((service, ledger)): State<(Arc<AuthService>, LedgerHandle)>,
    Json(req): Json<ConfirmRequest>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    let owner_id = match utils::validate_auth_token(&headers, &service) {
        Ok(val) => val,
        Err(err) => {
            return Err((err, "Invalid token".to_string()));
        }
    };

    let wallets = match ledger.list_wallets(owner_id).await {
        Ok(wallets) => wallets,
        Err(err) => {
            return Err(utils::ledger_error_response(err));
        }
    };
    let wallet = match wallets
        .into_iter()
        .find(|w| w.wallet_type == req.gateway.wallet_type())
    {
        Some(wallet) => wallet,
        None => {
            return Err((
                StatusCode::NOT_FOUND,
                format!("no active {} wallet", req.gateway.as_str()),
            ));
        }
    };

    let entry = NewTransaction {
        wallet_id: wallet.id,
        amount: req.amount,
        kind: TransactionType::Income,
        category: None,
        description: Some(format!("Payment via {}", req.gateway.as_str())),
        payment_method: Some(req.gateway.payment_method()),
        status: TransactionStatus::Completed,
        transaction_date: None,
    };

    match ledger.create_transaction(owner_id, entry).await {
        Ok(tx) => {
            tracing::info!(
                "payment {} settled as transaction {} for user {owner_id}",
                req.payment_id,
                tx.id
            );
            Ok((StatusCode::OK, Json(tx)))
        }
        Err(err) => {
            tracing::warn!("Failed to settle payment {}: {err}", req.payment_id);
            Err(utils::ledger_error_response(err))
        }
    }
}

pub fn payment_routes(service: Arc<AuthService>, ledger: LedgerHandle) -> Router {
    Router::new()
        .route("/payments/initiate", post(initiate_payment))
        .route("/payments/confirm", post(confirm_payment))
        .with_state((service, ledger))
}
