use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

use super::error::UnknownEnumValue;

#[derive(Debug, Clone, Serialize)]
pub struct Transaction {
    pub id: Uuid,
    pub user_id: Uuid,
    pub wallet_id: Uuid,
    pub amount: Decimal,
    #[serde(rename = "type")]
    pub kind: TransactionType,
    pub category: Option<String>,
    pub description: Option<String>,
    pub payment_method: Option<PaymentMethod>,
    pub status: TransactionStatus,
    pub transaction_date: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransactionType {
    Income,
    Expense,
    Transfer,
}

/// Whether an entry adds money to its wallet or takes money out.
///
/// This is the single place where transaction types are classified; both the
/// signed delta and the overdraft guard are derived from it, so a new type
/// cannot silently bypass the guard.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryDirection {
    Credit,
    Debit,
}

impl EntryDirection {
    /// Signed balance delta for an entry of the given magnitude.
    pub fn signed(self, amount: Decimal) -> Decimal {
        match self {
            EntryDirection::Credit => amount,
            EntryDirection::Debit => -amount,
        }
    }

    pub fn is_debit(self) -> bool {
        matches!(self, EntryDirection::Debit)
    }
}

impl TransactionType {
    pub fn as_str(self) -> &'static str {
        match self {
            TransactionType::Income => "income",
            TransactionType::Expense => "expense",
            TransactionType::Transfer => "transfer",
        }
    }

    /// Transfers are recorded as a single-wallet debit; there is no
    /// destination wallet, so they classify exactly like an expense.
    pub fn direction(self) -> EntryDirection {
        match self {
            TransactionType::Income => EntryDirection::Credit,
            TransactionType::Expense | TransactionType::Transfer => EntryDirection::Debit,
        }
    }
}

impl std::str::FromStr for TransactionType {
    type Err = UnknownEnumValue;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "income" => Ok(TransactionType::Income),
            "expense" => Ok(TransactionType::Expense),
            "transfer" => Ok(TransactionType::Transfer),
            other => Err(UnknownEnumValue {
                field: "type",
                value: other.to_string(),
            }),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransactionStatus {
    Pending,
    Completed,
    Failed,
}

impl Default for TransactionStatus {
    fn default() -> Self {
        TransactionStatus::Completed
    }
}

impl TransactionStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            TransactionStatus::Pending => "pending",
            TransactionStatus::Completed => "completed",
            TransactionStatus::Failed => "failed",
        }
    }
}

impl std::str::FromStr for TransactionStatus {
    type Err = UnknownEnumValue;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(TransactionStatus::Pending),
            "completed" => Ok(TransactionStatus::Completed),
            "failed" => Ok(TransactionStatus::Failed),
            other => Err(UnknownEnumValue {
                field: "status",
                value: other.to_string(),
            }),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PaymentMethod {
    Esewa,
    Khalti,
    Cash,
    Card,
}

impl PaymentMethod {
    pub fn as_str(self) -> &'static str {
        match self {
            PaymentMethod::Esewa => "esewa",
            PaymentMethod::Khalti => "khalti",
            PaymentMethod::Cash => "cash",
            PaymentMethod::Card => "card",
        }
    }
}

impl std::str::FromStr for PaymentMethod {
    type Err = UnknownEnumValue;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "esewa" => Ok(PaymentMethod::Esewa),
            "khalti" => Ok(PaymentMethod::Khalti),
            "cash" => Ok(PaymentMethod::Cash),
            "card" => Ok(PaymentMethod::Card),
            other => Err(UnknownEnumValue {
                field: "payment_method",
                value: other.to_string(),
            }),
        }
    }
}

/// Fields supplied by the caller when recording a new entry. Everything the
/// ledger derives itself (owner, delta, timestamps) stays out of this struct.
#[derive(Debug, Clone, Deserialize)]
pub struct NewTransaction {
    pub wallet_id: Uuid,
    pub amount: Decimal,
    #[serde(rename = "type")]
    pub kind: TransactionType,
    pub category: Option<String>,
    pub description: Option<String>,
    pub payment_method: Option<PaymentMethod>,
    #[serde(default)]
    pub status: TransactionStatus,
    pub transaction_date: Option<DateTime<Utc>>,
}

/// Metadata-only updates. Amount, type and wallet linkage are immutable once
/// a transaction exists; changing them would desynchronize the wallet balance.
#[derive(Debug, Default, Deserialize)]
pub struct MetadataUpdate {
    pub category: Option<String>,
    pub description: Option<String>,
    pub status: Option<TransactionStatus>,
}

impl MetadataUpdate {
    pub fn is_empty(&self) -> bool {
        self.category.is_none() && self.description.is_none() && self.status.is_none()
    }
}

/// Inclusive date window over `transaction_date`.
#[derive(Debug, Clone, Copy, Default, Deserialize)]
pub struct DateRange {
    pub start: Option<DateTime<Utc>>,
    pub end: Option<DateTime<Utc>>,
}

impl DateRange {
    pub fn contains(&self, at: DateTime<Utc>) -> bool {
        self.start.map_or(true, |start| at >= start) && self.end.map_or(true, |end| at <= end)
    }
}

/// Explicit listing filter, in place of ad hoc per-call filter maps.
#[derive(Debug, Clone, Default)]
pub struct TransactionFilter {
    pub kind: Option<TransactionType>,
    pub category: Option<String>,
    pub date_range: Option<DateRange>,
}

#[derive(Debug, Clone, Copy)]
pub struct Page {
    pub limit: i64,
    pub offset: i64,
}

impl Default for Page {
    fn default() -> Self {
        Page {
            limit: 50,
            offset: 0,
        }
    }
}

/// Per-category sum for reporting breakdowns.
#[derive(Debug, Clone, PartialEq, Serialize, FromRow)]
pub struct CategorySum {
    pub category: Option<String>,
    pub total: Decimal,
}

/// Raw row shape as stored; enums arrive as text and are decoded on the way
/// into [`Transaction`].
#[derive(Debug, FromRow)]
pub(crate) struct TransactionRow {
    pub id: Uuid,
    pub user_id: Uuid,
    pub wallet_id: Uuid,
    pub amount: Decimal,
    #[sqlx(rename = "type")]
    pub kind: String,
    pub category: Option<String>,
    pub description: Option<String>,
    pub payment_method: Option<String>,
    pub status: String,
    pub transaction_date: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl TryFrom<TransactionRow> for Transaction {
    type Error = sqlx::Error;

    fn try_from(row: TransactionRow) -> Result<Self, Self::Error> {
        let kind = row
            .kind
            .parse::<TransactionType>()
            .map_err(UnknownEnumValue::column_decode)?;
        let status = row
            .status
            .parse::<TransactionStatus>()
            .map_err(UnknownEnumValue::column_decode)?;
        let payment_method = row
            .payment_method
            .map(|m| m.parse::<PaymentMethod>())
            .transpose()
            .map_err(UnknownEnumValue::column_decode)?;
        Ok(Transaction {
            id: row.id,
            user_id: row.user_id,
            wallet_id: row.wallet_id,
            amount: row.amount,
            kind,
            category: row.category,
            description: row.description,
            payment_method,
            status,
            transaction_date: row.transaction_date,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn income_credits_everything_else_debits() {
        assert_eq!(TransactionType::Income.direction(), EntryDirection::Credit);
        assert_eq!(TransactionType::Expense.direction(), EntryDirection::Debit);
        assert_eq!(TransactionType::Transfer.direction(), EntryDirection::Debit);
    }

    #[test]
    fn signed_delta_follows_direction() {
        let amount = Decimal::new(2500, 2); // 25.00
        assert_eq!(EntryDirection::Credit.signed(amount), amount);
        assert_eq!(EntryDirection::Debit.signed(amount), -amount);
    }

    #[test]
    fn type_round_trips_through_text() {
        for ty in [
            TransactionType::Income,
            TransactionType::Expense,
            TransactionType::Transfer,
        ] {
            assert_eq!(ty.as_str().parse::<TransactionType>().unwrap(), ty);
        }
        assert!("refund".parse::<TransactionType>().is_err());
    }

    #[test]
    fn date_range_bounds_are_inclusive() {
        let start = Utc::now();
        let end = start + chrono::Duration::days(7);
        let range = DateRange {
            start: Some(start),
            end: Some(end),
        };
        assert!(range.contains(start));
        assert!(range.contains(end));
        assert!(!range.contains(start - chrono::Duration::seconds(1)));
        assert!(!range.contains(end + chrono::Duration::seconds(1)));
    }
}
