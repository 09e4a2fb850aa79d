use chrono::Utc;
use rust_decimal::Decimal;
use serde::Serialize;
use uuid::Uuid;

use crate::db::error::LedgerError;
use crate::db::store::{LedgerStore, PlatformTotals};
use crate::db::tx::{
    CategorySum, DateRange, MetadataUpdate, NewTransaction, Page, Transaction, TransactionFilter,
    TransactionType,
};
use crate::db::wallet::{NewWallet, Wallet, WalletUpdate};

/// Per-owner income/expense aggregate.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UserTotals {
    pub income: Decimal,
    pub expense: Decimal,
    pub net: Decimal,
}

/// The stats payload served to dashboards: totals plus the per-category
/// expense breakdown.
#[derive(Debug, Clone, Serialize)]
pub struct TransactionStats {
    pub total_income: Decimal,
    pub total_expense: Decimal,
    pub net_balance: Decimal,
    pub category_breakdown: Vec<CategorySum>,
}

/// The ledger service: the only path through which transactions and wallet
/// balances change together.
///
/// Every mutation is validated here, classified through
/// [`TransactionType::direction`], and handed to the store as one atomic
/// unit. Nothing else in the system writes a wallet balance.
pub struct Ledger<S> {
    store: S,
}

impl<S: LedgerStore> Ledger<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    // ----- wallets -----

    pub async fn create_wallet(
        &self,
        owner_id: Uuid,
        new: NewWallet,
    ) -> Result<Wallet, LedgerError> {
        if new.wallet_type.requires_wallet_number()
            && new.wallet_number.as_deref().map_or(true, str::is_empty)
        {
            return Err(LedgerError::validation(format!(
                "wallet_number is required for {} wallets",
                new.wallet_type.as_str()
            )));
        }
        if new.currency.trim().is_empty() {
            return Err(LedgerError::validation("currency must not be empty"));
        }
        let wallet = self.store.create_wallet(owner_id, new).await?;
        tracing::info!("wallet {} created for user {}", wallet.id, owner_id);
        Ok(wallet)
    }

    pub async fn get_wallet(&self, wallet_id: Uuid, owner_id: Uuid) -> Result<Wallet, LedgerError> {
        self.store.find_wallet_owned(wallet_id, owner_id).await
    }

    pub async fn list_wallets(&self, owner_id: Uuid) -> Result<Vec<Wallet>, LedgerError> {
        self.store.list_active_wallets(owner_id).await
    }

    pub async fn update_wallet(
        &self,
        wallet_id: Uuid,
        owner_id: Uuid,
        changes: WalletUpdate,
    ) -> Result<Wallet, LedgerError> {
        self.store.update_wallet(wallet_id, owner_id, changes).await
    }

    pub async fn deactivate_wallet(
        &self,
        wallet_id: Uuid,
        owner_id: Uuid,
    ) -> Result<(), LedgerError> {
        self.store.deactivate_wallet(wallet_id, owner_id).await?;
        tracing::info!("wallet {} deactivated for user {}", wallet_id, owner_id);
        Ok(())
    }

    // ----- mutation protocol -----

    /// Records a transaction and applies its balance effect in one atomic
    /// unit. Debits that would take the wallet below zero are rejected with
    /// `InsufficientBalance`; credits are never blocked, whatever the
    /// resulting sign.
    pub async fn create_transaction(
        &self,
        owner_id: Uuid,
        entry: NewTransaction,
    ) -> Result<Transaction, LedgerError> {
        if entry.amount <= Decimal::ZERO {
            return Err(LedgerError::validation("amount must be positive"));
        }

        // Ownership guard before anything is written.
        self.store
            .find_wallet_owned(entry.wallet_id, owner_id)
            .await?;

        let direction = entry.kind.direction();
        let delta = direction.signed(entry.amount);
        let occurred_at = entry.transaction_date.unwrap_or_else(Utc::now);

        let tx = self
            .store
            .insert_transaction(owner_id, &entry, occurred_at, delta, direction.is_debit())
            .await?;
        tracing::info!(
            "transaction {} recorded: {} {} on wallet {}",
            tx.id,
            tx.kind.as_str(),
            tx.amount,
            tx.wallet_id
        );
        Ok(tx)
    }

    /// Removes a transaction and reverses its balance effect exactly. The
    /// reversal is never floor-checked, and a deactivated wallet is still a
    /// valid reversal target.
    pub async fn delete_transaction(&self, id: Uuid, owner_id: Uuid) -> Result<(), LedgerError> {
        let record = self.store.find_transaction_owned(id, owner_id).await?;
        let reversal = -record.kind.direction().signed(record.amount);
        self.store.delete_transaction(&record, reversal).await?;
        tracing::info!(
            "transaction {} deleted, wallet {} adjusted by {}",
            record.id,
            record.wallet_id,
            reversal
        );
        Ok(())
    }

    /// Metadata edits never touch amount, type or wallet linkage, so they
    /// bypass the mutation protocol entirely.
    pub async fn update_transaction(
        &self,
        id: Uuid,
        owner_id: Uuid,
        changes: MetadataUpdate,
    ) -> Result<Transaction, LedgerError> {
        self.store
            .update_transaction_metadata(id, owner_id, changes)
            .await
    }

    // ----- read side -----

    pub async fn get_transaction(
        &self,
        id: Uuid,
        owner_id: Uuid,
    ) -> Result<Transaction, LedgerError> {
        self.store.find_transaction_owned(id, owner_id).await
    }

    pub async fn list_transactions(
        &self,
        owner_id: Uuid,
        filter: &TransactionFilter,
        page: Page,
    ) -> Result<Vec<Transaction>, LedgerError> {
        self.store.list_transactions(owner_id, filter, page).await
    }

    pub async fn user_totals(
        &self,
        owner_id: Uuid,
        range: Option<DateRange>,
    ) -> Result<UserTotals, LedgerError> {
        let income = self
            .store
            .sum_amounts(owner_id, Some(TransactionType::Income), range)
            .await?;
        let expense = self
            .store
            .sum_amounts(owner_id, Some(TransactionType::Expense), range)
            .await?;
        Ok(UserTotals {
            income,
            expense,
            net: income - expense,
        })
    }

    pub async fn stats(
        &self,
        owner_id: Uuid,
        range: Option<DateRange>,
    ) -> Result<TransactionStats, LedgerError> {
        let totals = self.user_totals(owner_id, range).await?;
        let category_breakdown = self
            .store
            .sums_by_category(owner_id, TransactionType::Expense, range)
            .await?;
        Ok(TransactionStats {
            total_income: totals.income,
            total_expense: totals.expense,
            net_balance: totals.net,
            category_breakdown,
        })
    }

    pub async fn platform_totals(&self) -> Result<PlatformTotals, LedgerError> {
        self.store.platform_totals().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::memory::MemoryStore;
    use crate::db::tx::TransactionStatus;
    use crate::db::wallet::WalletType;

    fn ledger() -> Ledger<MemoryStore> {
        Ledger::new(MemoryStore::new())
    }

    fn entry(wallet_id: Uuid, kind: TransactionType, amount: Decimal) -> NewTransaction {
        NewTransaction {
            wallet_id,
            amount,
            kind,
            category: None,
            description: None,
            payment_method: None,
            status: TransactionStatus::default(),
            transaction_date: None,
        }
    }

    #[tokio::test]
    async fn non_positive_amount_is_rejected_before_the_store() {
        let ledger = ledger();
        let owner = Uuid::new_v4();
        let wallet = ledger
            .create_wallet(
                owner,
                NewWallet {
                    wallet_type: WalletType::Internal,
                    wallet_number: None,
                    currency: "NPR".to_string(),
                },
            )
            .await
            .unwrap();

        for amount in [Decimal::ZERO, Decimal::new(-100, 2)] {
            let err = ledger
                .create_transaction(owner, entry(wallet.id, TransactionType::Income, amount))
                .await
                .unwrap_err();
            assert!(matches!(err, LedgerError::Validation(_)));
        }
        // nothing was recorded
        let listed = ledger
            .list_transactions(owner, &TransactionFilter::default(), Page::default())
            .await
            .unwrap();
        assert!(listed.is_empty());
    }

    #[tokio::test]
    async fn gateway_wallet_without_number_is_rejected() {
        let ledger = ledger();
        let owner = Uuid::new_v4();
        let err = ledger
            .create_wallet(
                owner,
                NewWallet {
                    wallet_type: WalletType::Esewa,
                    wallet_number: None,
                    currency: "NPR".to_string(),
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(err, LedgerError::Validation(_)));
    }

    #[tokio::test]
    async fn metadata_update_does_not_touch_balance() {
        let ledger = ledger();
        let owner = Uuid::new_v4();
        let wallet = ledger
            .create_wallet(
                owner,
                NewWallet {
                    wallet_type: WalletType::Internal,
                    wallet_number: None,
                    currency: "NPR".to_string(),
                },
            )
            .await
            .unwrap();
        let tx = ledger
            .create_transaction(
                owner,
                entry(wallet.id, TransactionType::Income, Decimal::new(5000, 2)),
            )
            .await
            .unwrap();

        let updated = ledger
            .update_transaction(
                tx.id,
                owner,
                MetadataUpdate {
                    category: Some("Salary".to_string()),
                    description: None,
                    status: Some(TransactionStatus::Pending),
                },
            )
            .await
            .unwrap();
        assert_eq!(updated.category.as_deref(), Some("Salary"));
        assert_eq!(updated.status, TransactionStatus::Pending);
        assert_eq!(updated.amount, tx.amount);

        let wallet = ledger.get_wallet(wallet.id, owner).await.unwrap();
        assert_eq!(wallet.balance, Decimal::new(5000, 2));
    }
}
