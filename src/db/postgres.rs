use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::{PgPool, Postgres, QueryBuilder};
use uuid::Uuid;

use super::error::LedgerError;
use super::store::{LedgerStore, PlatformTotals};
use super::tx::{
    CategorySum, DateRange, MetadataUpdate, NewTransaction, Page, Transaction, TransactionFilter,
    TransactionRow, TransactionType,
};
use super::wallet::{NewWallet, Wallet, WalletRow, WalletUpdate};

const WALLET_COLUMNS: &str =
    "id, user_id, balance, currency, wallet_type, wallet_number, is_active, created_at, updated_at";

const TRANSACTION_COLUMNS: &str = "id, user_id, wallet_id, amount, type, category, description, \
     payment_method, status, transaction_date, created_at, updated_at";

/// Postgres-backed ledger store.
///
/// Balance mutation is always a single conditional
/// `UPDATE ... SET balance = balance + $n` executed inside the same database
/// transaction as the record change. The row lock taken by that update is
/// what serializes concurrent mutations of one wallet.
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    fn push_date_range(builder: &mut QueryBuilder<'_, Postgres>, range: Option<DateRange>) {
        if let Some(range) = range {
            if let Some(start) = range.start {
                builder.push(" AND transaction_date >= ");
                builder.push_bind(start);
            }
            if let Some(end) = range.end {
                builder.push(" AND transaction_date <= ");
                builder.push_bind(end);
            }
        }
    }
}

#[async_trait]
impl LedgerStore for PgStore {
    async fn create_wallet(&self, owner_id: Uuid, new: NewWallet) -> Result<Wallet, LedgerError> {
        let sql = format!(
            "INSERT INTO wallets (user_id, wallet_type, wallet_number, currency) \
             VALUES ($1, $2, $3, $4) RETURNING {WALLET_COLUMNS}"
        );
        let row = sqlx::query_as::<_, WalletRow>(&sql)
            .bind(owner_id)
            .bind(new.wallet_type.as_str())
            .bind(new.wallet_number.as_deref())
            .bind(&new.currency)
            .fetch_one(&self.pool)
            .await?;
        Ok(Wallet::try_from(row)?)
    }

    async fn find_wallet_owned(
        &self,
        wallet_id: Uuid,
        owner_id: Uuid,
    ) -> Result<Wallet, LedgerError> {
        let sql = format!("SELECT {WALLET_COLUMNS} FROM wallets WHERE id = $1 AND user_id = $2");
        let row = sqlx::query_as::<_, WalletRow>(&sql)
            .bind(wallet_id)
            .bind(owner_id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or(LedgerError::NotFound)?;
        Ok(Wallet::try_from(row)?)
    }

    async fn list_active_wallets(&self, owner_id: Uuid) -> Result<Vec<Wallet>, LedgerError> {
        let sql = format!(
            "SELECT {WALLET_COLUMNS} FROM wallets WHERE user_id = $1 AND is_active = TRUE"
        );
        let rows = sqlx::query_as::<_, WalletRow>(&sql)
            .bind(owner_id)
            .fetch_all(&self.pool)
            .await?;
        let wallets = rows
            .into_iter()
            .map(Wallet::try_from)
            .collect::<Result<Vec<_>, _>>()?;
        Ok(wallets)
    }

    async fn update_wallet(
        &self,
        wallet_id: Uuid,
        owner_id: Uuid,
        changes: WalletUpdate,
    ) -> Result<Wallet, LedgerError> {
        let mut builder: QueryBuilder<Postgres> =
            QueryBuilder::new("UPDATE wallets SET updated_at = NOW()");
        if let Some(wallet_number) = &changes.wallet_number {
            builder.push(", wallet_number = ");
            builder.push_bind(wallet_number);
        }
        if let Some(is_active) = changes.is_active {
            builder.push(", is_active = ");
            builder.push_bind(is_active);
        }
        builder.push(" WHERE id = ");
        builder.push_bind(wallet_id);
        builder.push(" AND user_id = ");
        builder.push_bind(owner_id);
        builder.push(format!(" RETURNING {WALLET_COLUMNS}"));

        let row = builder
            .build_query_as::<WalletRow>()
            .fetch_optional(&self.pool)
            .await?
            .ok_or(LedgerError::NotFound)?;
        Ok(Wallet::try_from(row)?)
    }

    async fn deactivate_wallet(&self, wallet_id: Uuid, owner_id: Uuid) -> Result<(), LedgerError> {
        let result = sqlx::query(
            "UPDATE wallets SET is_active = FALSE, updated_at = NOW() \
             WHERE id = $1 AND user_id = $2",
        )
        .bind(wallet_id)
        .bind(owner_id)
        .execute(&self.pool)
        .await?;
        if result.rows_affected() == 0 {
            return Err(LedgerError::NotFound);
        }
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
        let mut dbtx = self.pool.begin().await?;

        // The guard lives in the UPDATE itself: zero rows affected means the
        // debit did not fit, and the enclosing transaction never commits.
        let updated = sqlx::query(
            "UPDATE wallets SET balance = balance + $1, updated_at = NOW() \
             WHERE id = $2 AND (NOT $3 OR balance + $1 >= 0)",
        )
        .bind(delta)
        .bind(entry.wallet_id)
        .bind(enforce_floor)
        .execute(&mut *dbtx)
        .await?;

        if updated.rows_affected() == 0 {
            dbtx.rollback().await?;
            return Err(LedgerError::InsufficientBalance);
        }

        let sql = format!(
            "INSERT INTO transactions \
             (user_id, wallet_id, amount, type, category, description, payment_method, status, transaction_date) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9) \
             RETURNING {TRANSACTION_COLUMNS}"
        );
        let row = sqlx::query_as::<_, TransactionRow>(&sql)
            .bind(owner_id)
            .bind(entry.wallet_id)
            .bind(entry.amount)
            .bind(entry.kind.as_str())
            .bind(entry.category.as_deref())
            .bind(entry.description.as_deref())
            .bind(entry.payment_method.map(|m| m.as_str()))
            .bind(entry.status.as_str())
            .bind(occurred_at)
            .fetch_one(&mut *dbtx)
            .await?;

        dbtx.commit().await?;
        Ok(Transaction::try_from(row)?)
    }

    async fn delete_transaction(
        &self,
        record: &Transaction,
        reversal: Decimal,
    ) -> Result<(), LedgerError> {
        let mut dbtx = self.pool.begin().await?;

        let deleted = sqlx::query("DELETE FROM transactions WHERE id = $1 AND user_id = $2")
            .bind(record.id)
            .bind(record.user_id)
            .execute(&mut *dbtx)
            .await?;
        if deleted.rows_affected() == 0 {
            // gone since the caller resolved it
            dbtx.rollback().await?;
            return Err(LedgerError::NotFound);
        }

        // No floor check on reversal; a reversal may take a wallet negative.
        let reversed = sqlx::query(
            "UPDATE wallets SET balance = balance + $1, updated_at = NOW() WHERE id = $2",
        )
        .bind(reversal)
        .bind(record.wallet_id)
        .execute(&mut *dbtx)
        .await?;
        if reversed.rows_affected() == 0 {
            dbtx.rollback().await?;
            return Err(LedgerError::Storage(sqlx::Error::RowNotFound));
        }

        dbtx.commit().await?;
        Ok(())
    }

    async fn find_transaction_owned(
        &self,
        id: Uuid,
        owner_id: Uuid,
    ) -> Result<Transaction, LedgerError> {
        let sql = format!(
            "SELECT {TRANSACTION_COLUMNS} FROM transactions WHERE id = $1 AND user_id = $2"
        );
        let row = sqlx::query_as::<_, TransactionRow>(&sql)
            .bind(id)
            .bind(owner_id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or(LedgerError::NotFound)?;
        Ok(Transaction::try_from(row)?)
    }

    async fn update_transaction_metadata(
        &self,
        id: Uuid,
        owner_id: Uuid,
        changes: MetadataUpdate,
    ) -> Result<Transaction, LedgerError> {
        let mut builder: QueryBuilder<Postgres> =
            QueryBuilder::new("UPDATE transactions SET updated_at = NOW()");
        if let Some(category) = &changes.category {
            builder.push(", category = ");
            builder.push_bind(category);
        }
        if let Some(description) = &changes.description {
            builder.push(", description = ");
            builder.push_bind(description);
        }
        if let Some(status) = changes.status {
            builder.push(", status = ");
            builder.push_bind(status.as_str());
        }
        builder.push(" WHERE id = ");
        builder.push_bind(id);
        builder.push(" AND user_id = ");
        builder.push_bind(owner_id);
        builder.push(format!(" RETURNING {TRANSACTION_COLUMNS}"));

        let row = builder
            .build_query_as::<TransactionRow>()
            .fetch_optional(&self.pool)
            .await?
            .ok_or(LedgerError::NotFound)?;
        Ok(Transaction::try_from(row)?)
    }

    async fn list_transactions(
        &self,
        owner_id: Uuid,
        filter: &TransactionFilter,
        page: Page,
    ) -> Result<Vec<Transaction>, LedgerError> {
        let mut builder: QueryBuilder<Postgres> = QueryBuilder::new(format!(
            "SELECT {TRANSACTION_COLUMNS} FROM transactions WHERE user_id = "
        ));
        builder.push_bind(owner_id);
        if let Some(kind) = filter.kind {
            builder.push(" AND type = ");
            builder.push_bind(kind.as_str());
        }
        if let Some(category) = &filter.category {
            builder.push(" AND category = ");
            builder.push_bind(category);
        }
        Self::push_date_range(&mut builder, filter.date_range);
        builder.push(" ORDER BY transaction_date DESC LIMIT ");
        builder.push_bind(page.limit);
        builder.push(" OFFSET ");
        builder.push_bind(page.offset);

        let rows = builder
            .build_query_as::<TransactionRow>()
            .fetch_all(&self.pool)
            .await?;
        let transactions = rows
            .into_iter()
            .map(Transaction::try_from)
            .collect::<Result<Vec<_>, _>>()?;
        Ok(transactions)
    }

    async fn sum_amounts(
        &self,
        owner_id: Uuid,
        kind: Option<TransactionType>,
        range: Option<DateRange>,
    ) -> Result<Decimal, LedgerError> {
        let mut builder: QueryBuilder<Postgres> =
            QueryBuilder::new("SELECT COALESCE(SUM(amount), 0) FROM transactions WHERE user_id = ");
        builder.push_bind(owner_id);
        if let Some(kind) = kind {
            builder.push(" AND type = ");
            builder.push_bind(kind.as_str());
        }
        Self::push_date_range(&mut builder, range);

        let total = builder
            .build_query_scalar::<Decimal>()
            .fetch_one(&self.pool)
            .await?;
        Ok(total)
    }

    async fn sums_by_category(
        &self,
        owner_id: Uuid,
        kind: TransactionType,
        range: Option<DateRange>,
    ) -> Result<Vec<CategorySum>, LedgerError> {
        let mut builder: QueryBuilder<Postgres> = QueryBuilder::new(
            "SELECT category, SUM(amount) AS total FROM transactions WHERE user_id = ",
        );
        builder.push_bind(owner_id);
        builder.push(" AND type = ");
        builder.push_bind(kind.as_str());
        Self::push_date_range(&mut builder, range);
        builder.push(" GROUP BY category ORDER BY total DESC");

        let sums = builder
            .build_query_as::<CategorySum>()
            .fetch_all(&self.pool)
            .await?;
        Ok(sums)
    }

    async fn platform_totals(&self) -> Result<PlatformTotals, LedgerError> {
        let user_count =
            sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM users WHERE is_active = TRUE")
                .fetch_one(&self.pool)
                .await?;

        let (transaction_count, transaction_volume) = sqlx::query_as::<_, (i64, Decimal)>(
            "SELECT COUNT(*), COALESCE(SUM(amount), 0) FROM transactions WHERE status = 'completed'",
        )
        .fetch_one(&self.pool)
        .await?;

        let total_wallet_balance =
            sqlx::query_scalar::<_, Decimal>("SELECT COALESCE(SUM(balance), 0) FROM wallets")
                .fetch_one(&self.pool)
                .await?;

        Ok(PlatformTotals {
            user_count,
            transaction_count,
            transaction_volume,
            total_wallet_balance,
        })
    }
}
