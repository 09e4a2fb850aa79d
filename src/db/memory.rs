use std::collections::{HashMap, HashSet};
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use uuid::Uuid;

use super::error::LedgerError;
use super::store::{LedgerStore, PlatformTotals};
use super::tx::{
    CategorySum, DateRange, MetadataUpdate, NewTransaction, Page, Transaction, TransactionFilter,
    TransactionStatus, TransactionType,
};
use super::wallet::{NewWallet, Wallet, WalletUpdate};

#[derive(Default)]
struct Inner {
    owners: HashSet<Uuid>,
    wallets: HashMap<Uuid, Wallet>,
    transactions: HashMap<Uuid, Transaction>,
}

/// In-memory ledger store.
///
/// The test double for [`PgStore`](super::postgres::PgStore): every operation
/// runs under one mutex, which gives it the same atomicity and per-wallet
/// serialization guarantees as the database transactions it stands in for.
/// Owner counting is approximated by the set of owners that ever created a
/// wallet.
pub struct MemoryStore {
    inner: Mutex<Inner>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(Inner::default()),
        }
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

fn matches_filter(tx: &Transaction, filter: &TransactionFilter) -> bool {
    if let Some(kind) = filter.kind {
        if tx.kind != kind {
            return false;
        }
    }
    if let Some(category) = &filter.category {
        if tx.category.as_deref() != Some(category.as_str()) {
            return false;
        }
    }
    if let Some(range) = &filter.date_range {
        if !range.contains(tx.transaction_date) {
            return false;
        }
    }
    true
}

fn in_range(tx: &Transaction, range: Option<DateRange>) -> bool {
    range.map_or(true, |range| range.contains(tx.transaction_date))
}

#[async_trait]
impl LedgerStore for MemoryStore {
    async fn create_wallet(&self, owner_id: Uuid, new: NewWallet) -> Result<Wallet, LedgerError> {
        let mut inner = self.inner.lock().unwrap();
        let now = Utc::now();
        let wallet = Wallet {
            id: Uuid::new_v4(),
            user_id: owner_id,
            balance: Decimal::ZERO,
            currency: new.currency,
            wallet_type: new.wallet_type,
            wallet_number: new.wallet_number,
            is_active: true,
            created_at: now,
            updated_at: now,
        };
        inner.owners.insert(owner_id);
        inner.wallets.insert(wallet.id, wallet.clone());
        Ok(wallet)
    }

    async fn find_wallet_owned(
        &self,
        wallet_id: Uuid,
        owner_id: Uuid,
    ) -> Result<Wallet, LedgerError> {
        let inner = self.inner.lock().unwrap();
        inner
            .wallets
            .get(&wallet_id)
            .filter(|w| w.user_id == owner_id)
            .cloned()
            .ok_or(LedgerError::NotFound)
    }

    async fn list_active_wallets(&self, owner_id: Uuid) -> Result<Vec<Wallet>, LedgerError> {
        let inner = self.inner.lock().unwrap();
        Ok(inner
            .wallets
            .values()
            .filter(|w| w.user_id == owner_id && w.is_active)
            .cloned()
            .collect())
    }

    async fn update_wallet(
        &self,
        wallet_id: Uuid,
        owner_id: Uuid,
        changes: WalletUpdate,
    ) -> Result<Wallet, LedgerError> {
        let mut inner = self.inner.lock().unwrap();
        let wallet = inner
            .wallets
            .get_mut(&wallet_id)
            .filter(|w| w.user_id == owner_id)
            .ok_or(LedgerError::NotFound)?;
        if let Some(wallet_number) = changes.wallet_number {
            wallet.wallet_number = Some(wallet_number);
        }
        if let Some(is_active) = changes.is_active {
            wallet.is_active = is_active;
        }
        wallet.updated_at = Utc::now();
        Ok(wallet.clone())
    }

    async fn deactivate_wallet(&self, wallet_id: Uuid, owner_id: Uuid) -> Result<(), LedgerError> {
        let mut inner = self.inner.lock().unwrap();
        let wallet = inner
            .wallets
            .get_mut(&wallet_id)
            .filter(|w| w.user_id == owner_id)
            .ok_or(LedgerError::NotFound)?;
        wallet.is_active = false;
        wallet.updated_at = Utc::now();
        Ok(())
    }

    async fn insert_transaction(
        &self,
        owner_id: Uuid,
        entry: &NewTransaction,
        occurred_at: DateTime<Utc>,
        delta: Decimal,
        enforce_floor: bool,
    ) -> Result<Transaction, LedgerError> {
        // Guard and apply happen under the same lock; this is the atomic unit.
        let mut inner = self.inner.lock().unwrap();
        let wallet = inner
            .wallets
            .get_mut(&entry.wallet_id)
            .ok_or(LedgerError::NotFound)?;
        let new_balance = wallet.balance + delta;
        if enforce_floor && new_balance < Decimal::ZERO {
            return Err(LedgerError::InsufficientBalance);
        }
        wallet.balance = new_balance;
        wallet.updated_at = Utc::now();

        let now = Utc::now();
        let tx = Transaction {
            id: Uuid::new_v4(),
            user_id: owner_id,
            wallet_id: entry.wallet_id,
            amount: entry.amount,
            kind: entry.kind,
            category: entry.category.clone(),
            description: entry.description.clone(),
            payment_method: entry.payment_method,
            status: entry.status,
            transaction_date: occurred_at,
            created_at: now,
            updated_at: now,
        };
        inner.transactions.insert(tx.id, tx.clone());
        Ok(tx)
    }

    async fn delete_transaction(
        &self,
        record: &Transaction,
        reversal: Decimal,
    ) -> Result<(), LedgerError> {
        let mut inner = self.inner.lock().unwrap();
        if inner.transactions.remove(&record.id).is_none() {
            return Err(LedgerError::NotFound);
        }
        let wallet = inner
            .wallets
            .get_mut(&record.wallet_id)
            .ok_or(LedgerError::NotFound)?;
        wallet.balance += reversal;
        wallet.updated_at = Utc::now();
        Ok(())
    }

    async fn find_transaction_owned(
        &self,
        id: Uuid,
        owner_id: Uuid,
    ) -> Result<Transaction, LedgerError> {
        let inner = self.inner.lock().unwrap();
        inner
            .transactions
            .get(&id)
            .filter(|t| t.user_id == owner_id)
            .cloned()
            .ok_or(LedgerError::NotFound)
    }

    async fn update_transaction_metadata(
        &self,
        id: Uuid,
        owner_id: Uuid,
        changes: MetadataUpdate,
    ) -> Result<Transaction, LedgerError> {
        let mut inner = self.inner.lock().unwrap();
        let tx = inner
            .transactions
            .get_mut(&id)
            .filter(|t| t.user_id == owner_id)
            .ok_or(LedgerError::NotFound)?;
        if let Some(category) = changes.category {
            tx.category = Some(category);
        }
        if let Some(description) = changes.description {
            tx.description = Some(description);
        }
        if let Some(status) = changes.status {
            tx.status = status;
        }
        tx.updated_at = Utc::now();
        Ok(tx.clone())
    }

    async fn list_transactions(
        &self,
        owner_id: Uuid,
        filter: &TransactionFilter,
        page: Page,
    ) -> Result<Vec<Transaction>, LedgerError> {
        let inner = self.inner.lock().unwrap();
        let mut matching: Vec<Transaction> = inner
            .transactions
            .values()
            .filter(|t| t.user_id == owner_id && matches_filter(t, filter))
            .cloned()
            .collect();
        matching.sort_by(|a, b| b.transaction_date.cmp(&a.transaction_date));
        Ok(matching
            .into_iter()
            .skip(page.offset.max(0) as usize)
            .take(page.limit.max(0) as usize)
            .collect())
    }

    async fn sum_amounts(
        &self,
        owner_id: Uuid,
        kind: Option<TransactionType>,
        range: Option<DateRange>,
    ) -> Result<Decimal, LedgerError> {
        let inner = self.inner.lock().unwrap();
        Ok(inner
            .transactions
            .values()
            .filter(|t| {
                t.user_id == owner_id
                    && kind.map_or(true, |k| t.kind == k)
                    && in_range(t, range)
            })
            .map(|t| t.amount)
            .sum())
    }

    async fn sums_by_category(
        &self,
        owner_id: Uuid,
        kind: TransactionType,
        range: Option<DateRange>,
    ) -> Result<Vec<CategorySum>, LedgerError> {
        let inner = self.inner.lock().unwrap();
        let mut sums: HashMap<Option<String>, Decimal> = HashMap::new();
        for tx in inner
            .transactions
            .values()
            .filter(|t| t.user_id == owner_id && t.kind == kind && in_range(t, range))
        {
            *sums.entry(tx.category.clone()).or_insert(Decimal::ZERO) += tx.amount;
        }
        let mut breakdown: Vec<CategorySum> = sums
            .into_iter()
            .map(|(category, total)| CategorySum { category, total })
            .collect();
        breakdown.sort_by(|a, b| b.total.cmp(&a.total));
        Ok(breakdown)
    }

    async fn platform_totals(&self) -> Result<PlatformTotals, LedgerError> {
        let inner = self.inner.lock().unwrap();
        let completed: Vec<&Transaction> = inner
            .transactions
            .values()
            .filter(|t| t.status == TransactionStatus::Completed)
            .collect();
        Ok(PlatformTotals {
            user_count: inner.owners.len() as i64,
            transaction_count: completed.len() as i64,
            transaction_volume: completed.iter().map(|t| t.amount).sum(),
            total_wallet_balance: inner.wallets.values().map(|w| w.balance).sum(),
        })
    }
}
