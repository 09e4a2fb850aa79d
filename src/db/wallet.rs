use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

use super::error::UnknownEnumValue;

/// Kind of wallet. Gateway wallets mirror an external account and therefore
/// carry the account identifier of that gateway.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WalletType {
    Esewa,
    Khalti,
    Internal,
}

impl WalletType {
    pub fn as_str(self) -> &'static str {
        match self {
            WalletType::Esewa => "esewa",
            WalletType::Khalti => "khalti",
            WalletType::Internal => "internal",
        }
    }

    /// Gateway-backed wallets must reference an external account number.
    pub fn requires_wallet_number(self) -> bool {
        matches!(self, WalletType::Esewa | WalletType::Khalti)
    }
}

impl std::str::FromStr for WalletType {
    type Err = UnknownEnumValue;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "esewa" => Ok(WalletType::Esewa),
            "khalti" => Ok(WalletType::Khalti),
            "internal" => Ok(WalletType::Internal),
            other => Err(UnknownEnumValue {
                field: "wallet_type",
                value: other.to_string(),
            }),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct Wallet {
    pub id: Uuid,
    pub user_id: Uuid,
    pub balance: Decimal,
    pub currency: String,
    pub wallet_type: WalletType,
    pub wallet_number: Option<String>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Request payload for creating a wallet. The balance always starts at zero;
/// money only ever enters through the ledger.
#[derive(Debug, Deserialize)]
pub struct NewWallet {
    pub wallet_type: WalletType,
    pub wallet_number: Option<String>,
    #[serde(default = "default_currency")]
    pub currency: String,
}

fn default_currency() -> String {
    "NPR".to_string()
}

/// Mutable wallet fields. Balance is deliberately absent.
#[derive(Debug, Default, Deserialize)]
pub struct WalletUpdate {
    pub wallet_number: Option<String>,
    pub is_active: Option<bool>,
}

impl WalletUpdate {
    pub fn is_empty(&self) -> bool {
        self.wallet_number.is_none() && self.is_active.is_none()
    }
}

/// Raw row shape as stored; converted into [`Wallet`] after decoding the
/// text-encoded wallet type.
#[derive(Debug, FromRow)]
pub(crate) struct WalletRow {
    pub id: Uuid,
    pub user_id: Uuid,
    pub balance: Decimal,
    pub currency: String,
    pub wallet_type: String,
    pub wallet_number: Option<String>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl TryFrom<WalletRow> for Wallet {
    type Error = sqlx::Error;

    fn try_from(row: WalletRow) -> Result<Self, Self::Error> {
        let wallet_type = row
            .wallet_type
            .parse::<WalletType>()
            .map_err(UnknownEnumValue::column_decode)?;
        Ok(Wallet {
            id: row.id,
            user_id: row.user_id,
            balance: row.balance,
            currency: row.currency,
            wallet_type,
            wallet_number: row.wallet_number,
            is_active: row.is_active,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn gateway_types_require_wallet_number() {
        assert!(WalletType::Esewa.requires_wallet_number());
        assert!(WalletType::Khalti.requires_wallet_number());
        assert!(!WalletType::Internal.requires_wallet_number());
    }

    #[test]
    fn wallet_type_round_trips_through_text() {
        for ty in [WalletType::Esewa, WalletType::Khalti, WalletType::Internal] {
            assert_eq!(ty.as_str().parse::<WalletType>().unwrap(), ty);
        }
        assert!("paypal".parse::<WalletType>().is_err());
    }
}
