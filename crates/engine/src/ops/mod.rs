use std::sync::Arc;

use sea_orm::{ActiveValue, DatabaseConnection, DatabaseTransaction, QuerySelect, prelude::*};
use uuid::Uuid;

use crate::{
    EngineError, FixedRateProvider, Money, RateProvider, ResultEngine, Transaction, postings,
    transactions,
};

mod accounts;
mod audit;
mod exchanges;
mod list;
mod transfers;

pub use audit::BalanceAudit;
pub use list::TransactionPage;

/// Run a block inside a DB transaction, committing on success and rolling back on error.
macro_rules! with_tx {
    ($self:expr, |$tx:ident| $body:expr) => {{
        let $tx = $self.database.begin().await?;
        let result = $body;
        match result {
            Ok(value) => {
                $tx.commit().await?;
                Ok(value)
            }
            Err(err) => Err(err),
        }
    }};
}

pub(crate) use with_tx;

/// The money-movement engine.
///
/// Construct one per database via [`Engine::builder`]; it is cheap to share
/// behind an `Arc` and all operations take `&self`.
#[derive(Debug)]
pub struct Engine {
    database: DatabaseConnection,
    rates: Arc<dyn RateProvider>,
}

impl Engine {
    /// Return a builder for `Engine`. Help to build the struct.
    pub fn builder() -> EngineBuilder {
        EngineBuilder::default()
    }

    pub(crate) fn rates(&self) -> &dyn RateProvider {
        self.rates.as_ref()
    }

    pub(crate) fn database(&self) -> &DatabaseConnection {
        &self.database
    }

    /// Loads both accounts of a movement with row locks.
    ///
    /// Locks are always acquired in ascending account-id order, regardless of
    /// which side is the source: two operations on the same pair in opposite
    /// directions request the locks in the same order and cannot deadlock.
    /// Returns the models in the caller's `(first, second)` order.
    pub(crate) async fn lock_account_pair(
        &self,
        db_tx: &DatabaseTransaction,
        first: Uuid,
        second: Uuid,
    ) -> ResultEngine<(Option<crate::accounts::Model>, Option<crate::accounts::Model>)> {
        if first <= second {
            let a = find_account_locked(db_tx, first).await?;
            let b = find_account_locked(db_tx, second).await?;
            Ok((a, b))
        } else {
            let b = find_account_locked(db_tx, second).await?;
            let a = find_account_locked(db_tx, first).await?;
            Ok((a, b))
        }
    }

    /// Applies a signed delta to an account balance inside an atomic unit.
    ///
    /// Fails with [`EngineError::InsufficientFunds`] if the resulting balance
    /// would be negative and with [`EngineError::AmountOutOfRange`] if it
    /// does not fit the minor-unit range. Balances never change outside this
    /// path.
    pub(crate) async fn adjust_balance(
        &self,
        db_tx: &DatabaseTransaction,
        account: &crate::accounts::Model,
        delta: Money,
    ) -> ResultEngine<()> {
        let new_balance = Money::from_minor(account.balance_minor).checked_add(delta)?;
        if new_balance.is_negative() {
            return Err(EngineError::InsufficientFunds(format!(
                "account {}",
                account.id
            )));
        }

        let account_model = crate::accounts::ActiveModel {
            id: ActiveValue::Set(account.id.clone()),
            balance_minor: ActiveValue::Set(new_balance.minor()),
            ..Default::default()
        };
        account_model.update(db_tx).await?;
        Ok(())
    }

    /// Inserts the transaction record and its two postings.
    ///
    /// The caller must have already applied the matching balance deltas in the
    /// same atomic unit; a posting is never written without its sibling.
    pub(crate) async fn insert_ledger_records(
        &self,
        db_tx: &DatabaseTransaction,
        tx: &Transaction,
    ) -> ResultEngine<()> {
        transactions::ActiveModel::from(tx).insert(db_tx).await?;
        for posting in &tx.postings {
            postings::ActiveModel::from(posting).insert(db_tx).await?;
        }
        Ok(())
    }
}

async fn find_account_locked(
    db_tx: &DatabaseTransaction,
    id: Uuid,
) -> ResultEngine<Option<crate::accounts::Model>> {
    let model = crate::accounts::Entity::find_by_id(id.to_string())
        .lock_exclusive()
        .one(db_tx)
        .await?;
    Ok(model)
}

/// The builder for `Engine`
pub struct EngineBuilder {
    database: DatabaseConnection,
    rates: Arc<dyn RateProvider>,
}

impl Default for EngineBuilder {
    fn default() -> Self {
        Self {
            database: DatabaseConnection::default(),
            rates: Arc::new(FixedRateProvider::default()),
        }
    }
}

impl EngineBuilder {
    /// Pass the required database
    pub fn database(mut self, db: DatabaseConnection) -> EngineBuilder {
        self.database = db;
        self
    }

    /// Replace the default fixed rate provider.
    pub fn rates(mut self, rates: Arc<dyn RateProvider>) -> EngineBuilder {
        self.rates = rates;
        self
    }

    /// Construct `Engine`
    pub async fn build(self) -> ResultEngine<Engine> {
        Ok(Engine {
            database: self.database,
            rates: self.rates,
        })
    }
}
