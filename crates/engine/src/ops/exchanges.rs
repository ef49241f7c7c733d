use chrono::Utc;
use sea_orm::{DatabaseTransaction, QueryFilter, TransactionTrait, prelude::*};
use uuid::Uuid;

use crate::{
    Currency, EngineError, ExchangeCmd, Money, ResultEngine, Transaction, TransactionKind,
    postings,
};

use super::{Engine, with_tx};

impl Engine {
    /// Converts funds between the two currency accounts of one user.
    ///
    /// The rate is resolved from the provider before the atomic unit opens,
    /// so no external dependency is ever consulted while account locks are
    /// held. Inside the unit: both accounts are resolved by (user, currency),
    /// locked in id order, the source is debited by `amount` and the
    /// destination credited by the converted amount, and the EXCHANGE record
    /// is written with its posting pair. The transaction stores only the
    /// source amount and currency; the destination side lives in the CREDIT
    /// posting.
    ///
    /// Each posting individually matches its account's balance delta, so
    /// per-account reconciliation holds; value is intentionally *not*
    /// conserved across the currency boundary (see [`crate::rates`]).
    pub async fn exchange(&self, cmd: ExchangeCmd) -> ResultEngine<Transaction> {
        if cmd.amount_minor <= 0 {
            return Err(EngineError::InvalidAmount(
                "amount must be > 0".to_string(),
            ));
        }
        if cmd.from_currency == cmd.to_currency {
            return Err(EngineError::InvalidAmount(
                "currencies must differ".to_string(),
            ));
        }
        let amount = Money::from_minor(cmd.amount_minor);
        let rate = self.rates().rate(cmd.from_currency, cmd.to_currency)?;
        let converted = amount.convert(rate)?;

        with_tx!(self, |db_tx| {
            let from_id =
                account_id_for_user(&db_tx, &cmd.user_id, cmd.from_currency).await?;
            let to_id = account_id_for_user(&db_tx, &cmd.user_id, cmd.to_currency).await?;

            let (from, to) = self.lock_account_pair(&db_tx, from_id, to_id).await?;
            let (from, to) = match (from, to) {
                (Some(from), Some(to)) => (from, to),
                _ => {
                    return Err(EngineError::InvalidAccount(
                        "invalid account or currency".to_string(),
                    ));
                }
            };
            if from.balance_minor < amount.minor() {
                return Err(EngineError::InsufficientFunds(format!(
                    "account {}",
                    from.id
                )));
            }

            let now = Utc::now();
            let mut tx = Transaction::new(
                Some(from_id),
                Some(to_id),
                amount,
                cmd.from_currency,
                TransactionKind::Exchange,
                now,
            )?;
            tx.postings = vec![
                postings::Posting::debit(from_id, tx.id, amount, now),
                postings::Posting::credit(to_id, tx.id, converted, now),
            ];

            self.adjust_balance(&db_tx, &from, -amount).await?;
            self.adjust_balance(&db_tx, &to, converted).await?;
            self.insert_ledger_records(&db_tx, &tx).await?;

            Ok(tx)
        })
    }
}

/// Resolves the single account a user holds in `currency`.
///
/// The (user, currency) pair is unique by schema; a missing account is an
/// invalid-account error, not a not-found, because the caller named the
/// currency rather than an id.
async fn account_id_for_user(
    db_tx: &DatabaseTransaction,
    user_id: &str,
    currency: Currency,
) -> ResultEngine<Uuid> {
    let model = crate::accounts::Entity::find()
        .filter(crate::accounts::Column::UserId.eq(user_id))
        .filter(crate::accounts::Column::Currency.eq(currency.code()))
        .one(db_tx)
        .await?
        .ok_or_else(|| {
            EngineError::InvalidAccount(format!("no {currency} account for user"))
        })?;

    Uuid::parse_str(&model.id)
        .map_err(|_| EngineError::KeyNotFound("account not exists".to_string()))
}
