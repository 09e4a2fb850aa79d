use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Serialize;
use uuid::Uuid;

use super::error::LedgerError;
use super::tx::{
    CategorySum, DateRange, MetadataUpdate, NewTransaction, Page, Transaction, TransactionFilter,
    TransactionType,
};
use super::wallet::{NewWallet, Wallet, WalletUpdate};

/// Cross-owner aggregate for privileged callers.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PlatformTotals {
    pub user_count: i64,
    pub transaction_count: i64,
    pub transaction_volume: Decimal,
    pub total_wallet_balance: Decimal,
}

/// Storage seam for the ledger. The handle is injected at construction time,
/// so the ledger can run over Postgres in production and over the in-memory
/// store in tests.
///
/// Every operation that takes an `owner_id` is ownership-scoped: a record that
/// exists but belongs to someone else is reported as `NotFound`, never as a
/// distinct error.
///
/// The two mutation entry points, [`insert_transaction`] and
/// [`delete_transaction`], are the atomic units of the ledger protocol. Each
/// implementation must persist the record change and apply the balance delta
/// in one storage transaction, serialized per wallet; no partial state may
/// become visible, and no read-modify-write of the balance may occur in
/// application code.
///
/// [`insert_transaction`]: LedgerStore::insert_transaction
/// [`delete_transaction`]: LedgerStore::delete_transaction
#[async_trait]
pub trait LedgerStore: Send + Sync {
    async fn create_wallet(&self, owner_id: Uuid, new: NewWallet) -> Result<Wallet, LedgerError>;

    /// The universal ownership guard: resolves a wallet only if it belongs to
    /// `owner_id`. Deactivated wallets still resolve; deactivation hides a
    /// wallet from listings, it does not invalidate it.
    async fn find_wallet_owned(&self, wallet_id: Uuid, owner_id: Uuid)
        -> Result<Wallet, LedgerError>;

    async fn list_active_wallets(&self, owner_id: Uuid) -> Result<Vec<Wallet>, LedgerError>;

    async fn update_wallet(
        &self,
        wallet_id: Uuid,
        owner_id: Uuid,
        changes: WalletUpdate,
    ) -> Result<Wallet, LedgerError>;

    /// Soft delete. Idempotent: deactivating an already inactive wallet is
    /// not an error.
    async fn deactivate_wallet(&self, wallet_id: Uuid, owner_id: Uuid) -> Result<(), LedgerError>;

    /// Persists the new record and applies `delta` to its wallet's balance in
    /// one atomic unit. When `enforce_floor` is set and the delta would take
    /// the balance below zero, nothing is written and
    /// `InsufficientBalance` is returned.
    async fn insert_transaction(
        &self,
        owner_id: Uuid,
        entry: &NewTransaction,
        occurred_at: DateTime<Utc>,
        delta: Decimal,
        enforce_floor: bool,
    ) -> Result<Transaction, LedgerError>;

    /// Removes the record and applies `reversal` to its wallet's balance in
    /// one atomic unit. Reversals are never floor-checked.
    async fn delete_transaction(
        &self,
        record: &Transaction,
        reversal: Decimal,
    ) -> Result<(), LedgerError>;

    async fn find_transaction_owned(
        &self,
        id: Uuid,
        owner_id: Uuid,
    ) -> Result<Transaction, LedgerError>;

    async fn update_transaction_metadata(
        &self,
        id: Uuid,
        owner_id: Uuid,
        changes: MetadataUpdate,
    ) -> Result<Transaction, LedgerError>;

    async fn list_transactions(
        &self,
        owner_id: Uuid,
        filter: &TransactionFilter,
        page: Page,
    ) -> Result<Vec<Transaction>, LedgerError>;

    /// Sum of `amount` over matching rows; zero when nothing matches.
    async fn sum_amounts(
        &self,
        owner_id: Uuid,
        kind: Option<TransactionType>,
        range: Option<DateRange>,
    ) -> Result<Decimal, LedgerError>;

    async fn sums_by_category(
        &self,
        owner_id: Uuid,
        kind: TransactionType,
        range: Option<DateRange>,
    ) -> Result<Vec<CategorySum>, LedgerError>;

    /// Scans across all owners; the only operation that is not
    /// ownership-scoped. Restricting who may call it is the route layer's
    /// concern.
    async fn platform_totals(&self) -> Result<PlatformTotals, LedgerError>;
}
