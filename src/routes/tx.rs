use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    http::{HeaderMap, StatusCode},
    response::IntoResponse,
    routing::get,
    Json, Router,
};
use chrono::{DateTime, Utc};
use serde::Deserialize;
use uuid::Uuid;

use crate::db::tx::{
    DateRange, MetadataUpdate, NewTransaction, Page, TransactionFilter, TransactionType,
};

use super::{auth::AuthService, utils, LedgerHandle};

#[derive(Debug, Deserialize)]
pub struct ListQuery {
    #[serde(rename = "type")]
    kind: Option<TransactionType>,
    category: Option<String>,
    start_date: Option<DateTime<Utc>>,
    end_date: Option<DateTime<Utc>>,
    limit: Option<i64>,
    offset: Option<i64>,
}

#[derive(Debug, Deserialize)]
pub struct StatsQuery {
    start_date: Option<DateTime<Utc>>,
    end_date: Option<DateTime<Utc>>,
}

fn date_range(start: Option<DateTime<Utc>>, end: Option<DateTime<Utc>>) -> Option<DateRange> {
    if start.is_none() && end.is_none() {
        None
    } else {
        Some(DateRange { start, end })
    }
}

async fn create_transaction(
    headers: HeaderMap,
    State((service, ledger)): State<(Arc<AuthService>, LedgerHandle)>,
    Json(entry): Json<NewTransaction>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    let owner_id = match utils::validate_auth_token(&headers, &service) {
        Ok(val) => val,
        Err(err) => {
            tracing::error!("Invalid token: {err}");
            return Err((err, "Invalid token".to_string()));
        }
    };

    match ledger.create_transaction(owner_id, entry).await {
        Ok(tx) => Ok((StatusCode::CREATED, Json(tx))),
        Err(err) => {
            tracing::warn!("Failed to create transaction for user {owner_id}: {err}");
            Err(utils::ledger_error_response(err))
        }
    }
}

// return all transactions of the token's user, newest first, with optional
// type/category/date filters
async fn list_transactions(
    headers: HeaderMap,
    State((service, ledger)): State<(Arc<AuthService>, LedgerHandle)>,
    Query(query): Query<ListQuery>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    let owner_id = match utils::validate_auth_token(&headers, &service) {
        Ok(val) => val,
        Err(err) => {
            return Err((err, "Invalid token".to_string()));
        }
    };

    let filter = TransactionFilter {
        kind: query.kind,
        category: query.category,
        date_range: date_range(query.start_date, query.end_date),
    };
    let mut page = Page::default();
    if let Some(limit) = query.limit {
        page.limit = limit;
    }
    if let Some(offset) = query.offset {
        page.offset = offset;
    }

    match ledger.list_transactions(owner_id, &filter, page).await {
        Ok(transactions) => Ok((StatusCode::OK, Json(transactions))),
        Err(err) => {
            tracing::error!("Failed to list transactions for user {owner_id}: {err}");
            Err(utils::ledger_error_response(err))
        }
    }
}

// return a specific transaction by its id, scoped to the token's user
async fn get_transaction(
    headers: HeaderMap,
    State((service, ledger)): State<(Arc<AuthService>, LedgerHandle)>,
    Path(transaction_id): Path<Uuid>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    let owner_id = match utils::validate_auth_token(&headers, &service) {
        Ok(val) => val,
        Err(err) => {
            return Err((err, "Invalid token".to_string()));
        }
    };

    match ledger.get_transaction(transaction_id, owner_id).await {
        Ok(tx) => Ok((StatusCode::OK, Json(tx))),
        Err(err) => Err(utils::ledger_error_response(err)),
    }
}

// metadata-only edits; amount, type and wallet are immutable
async fn update_transaction(
    headers: HeaderMap,
    State((service, ledger)): State<(Arc<AuthService>, LedgerHandle)>,
    Path(transaction_id): Path<Uuid>,
    Json(changes): Json<MetadataUpdate>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    let owner_id = match utils::validate_auth_token(&headers, &service) {
        Ok(val) => val,
        Err(err) => {
            return Err((err, "Invalid token".to_string()));
        }
    };

    match ledger
        .update_transaction(transaction_id, owner_id, changes)
        .await
    {
        Ok(tx) => Ok((StatusCode::OK, Json(tx))),
        Err(err) => {
            tracing::warn!("Failed to update transaction {transaction_id}: {err}");
            Err(utils::ledger_error_response(err))
        }
    }
}

async fn delete_transaction(
    headers: HeaderMap,
    State((service, ledger)): State<(Arc<AuthService>, LedgerHandle)>,
    Path(transaction_id): Path<Uuid>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    let owner_id = match utils::validate_auth_token(&headers, &service) {
        Ok(val) => val,
        Err(err) => {
            return Err((err, "Invalid token".to_string()));
        }
    };

    match ledger.delete_transaction(transaction_id, owner_id).await {
        Ok(()) => Ok((
            StatusCode::OK,
            "Transaction deleted successfully".to_string(),
        )),
        Err(err) => {
            tracing::warn!("Failed to delete transaction {transaction_id}: {err}");
            Err(utils::ledger_error_response(err))
        }
    }
}

// income/expense totals plus the per-category expense breakdown
async fn transaction_stats(
    headers: HeaderMap,
    State((service, ledger)): State<(Arc<AuthService>, LedgerHandle)>,
    Query(query): Query<StatsQuery>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    let owner_id = match utils::validate_auth_token(&headers, &service) {
        Ok(val) => val,
        Err(err) => {
            return Err((err, "Invalid token".to_string()));
        }
    };

    let range = date_range(query.start_date, query.end_date);
    match ledger.stats(owner_id, range).await {
        Ok(stats) => Ok((StatusCode::OK, Json(stats))),
        Err(err) => {
            tracing::error!("Failed to compute stats for user {owner_id}: {err}");
            Err(utils::ledger_error_response(err))
        }
    }
}

pub fn tx_routes(service: Arc<AuthService>, ledger: LedgerHandle) -> Router {
    Router::new()
        .route(
            "/transactions",
            get(list_transactions).post(create_transaction),
        )
        .route("/transactions/stats", get(transaction_stats))
        .route(
            "/transactions/:id",
            get(get_transaction)
                .put(update_transaction)
                .delete(delete_transaction),
        )
        .with_state((service, ledger))
}
