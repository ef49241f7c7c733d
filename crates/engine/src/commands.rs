//! Engine command inputs.
//!
//! Callers (the HTTP layer, tests) build one of these structs from validated
//! primitive inputs and hand it to the matching engine operation. Amounts are
//! minor units; validation of sign/range happens in the engine, not here.

use uuid::Uuid;

use crate::{Currency, transactions::TransactionKind};

/// Same-currency movement between two accounts.
#[derive(Clone, Debug)]
pub struct TransferCmd {
    pub from_account_id: Uuid,
    pub to_account_id: Uuid,
    pub amount_minor: i64,
    pub currency: Currency,
}

/// Cross-currency movement between the two accounts of one user.
#[derive(Clone, Debug)]
pub struct ExchangeCmd {
    pub user_id: String,
    pub from_currency: Currency,
    pub to_currency: Currency,
    pub amount_minor: i64,
}

/// Paginated transaction listing for all accounts owned by a user.
///
/// `page` is 1-based.
#[derive(Clone, Debug)]
pub struct ListTransactionsCmd {
    pub user_id: String,
    pub kind: Option<TransactionKind>,
    pub page: u64,
    pub page_size: u64,
}
