//! Double-entry ledger and money-movement engine.
//!
//! The engine is the only path through which account balances change. Every
//! movement is one atomic unit against the database: two balance updates, one
//! transaction record and two paired postings commit or roll back together.
//! Identity (users, sessions) is supplied by the calling layer; the engine
//! only ever sees opaque user ids.

pub use accounts::Account;
pub use commands::{ExchangeCmd, ListTransactionsCmd, TransferCmd};
pub use currency::Currency;
pub use error::EngineError;
pub use money::Money;
pub use ops::{BalanceAudit, Engine, EngineBuilder, TransactionPage};
pub use postings::{EntryKind, Posting};
pub use rates::{FixedRateProvider, Rate, RateProvider};
pub use transactions::{Transaction, TransactionKind};

mod accounts;
mod commands;
mod currency;
mod error;
mod money;
mod ops;
mod postings;
mod rates;
mod transactions;

pub type ResultEngine<T> = Result<T, EngineError>;
