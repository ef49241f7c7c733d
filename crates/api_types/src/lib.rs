use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Currency {
    #[default]
    Usd,
    Eur,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum TransactionKind {
    Transfer,
    Exchange,
}

pub mod user {
    use super::*;

    /// Request body for registering a user. Registration also opens one
    /// account per supported currency.
    #[derive(Debug, Serialize, Deserialize)]
    pub struct UserNew {
        pub username: String,
        pub password: String,
        pub email: String,
    }
}

pub mod account {
    use super::*;

    #[derive(Debug, Serialize, Deserialize)]
    pub struct AccountView {
        /// Account id (UUID).
        ///
        /// This is serialized as a string in JSON.
        pub id: Uuid,
        pub user_id: String,
        pub currency: Currency,
        /// Balance in minor units (cents).
        pub balance_minor: i64,
        pub created_at: DateTime<Utc>,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct BalanceView {
        pub account_id: Uuid,
        pub currency: Currency,
        pub balance_minor: i64,
        /// Human formatting of the balance, e.g. `"12.34"`.
        pub balance: String,
    }

    /// Result of reconciling an account's stored balance against the sum of
    /// its postings.
    #[derive(Debug, Serialize, Deserialize)]
    pub struct AuditView {
        pub account_id: Uuid,
        pub stored_minor: i64,
        pub reconciled_minor: i64,
        pub consistent: bool,
        pub discrepancy_minor: i64,
    }
}

pub mod transaction {
    use super::*;

    /// Request body for a same-currency transfer between two accounts.
    #[derive(Debug, Serialize, Deserialize)]
    pub struct TransferNew {
        pub from_account_id: Uuid,
        pub to_account_id: Uuid,
        /// Amount in minor units, strictly positive.
        pub amount_minor: i64,
        pub currency: Currency,
    }

    /// Request body for converting between the caller's currency accounts.
    #[derive(Debug, Serialize, Deserialize)]
    pub struct ExchangeNew {
        pub from_currency: Currency,
        pub to_currency: Currency,
        /// Amount in minor units of `from_currency`, strictly positive.
        pub amount_minor: i64,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct PostingView {
        pub account_id: Uuid,
        /// Signed amount: negative for DEBIT, positive for CREDIT.
        pub amount_minor: i64,
        pub entry: String,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct TransactionView {
        pub id: Uuid,
        pub from_account_id: Option<Uuid>,
        pub to_account_id: Option<Uuid>,
        /// Source-side amount in minor units.
        pub amount_minor: i64,
        pub currency: Currency,
        pub kind: TransactionKind,
        pub created_at: DateTime<Utc>,
        #[serde(default, skip_serializing_if = "Vec::is_empty")]
        pub postings: Vec<PostingView>,
    }

    /// One page of a transaction listing. `page` is 1-based.
    #[derive(Debug, Serialize, Deserialize)]
    pub struct TransactionListResponse {
        pub transactions: Vec<TransactionView>,
        pub total: u64,
        pub page: u64,
        pub page_size: u64,
    }
}
