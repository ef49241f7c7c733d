use chrono::Utc;
use sea_orm::TransactionTrait;

use crate::{
    EngineError, Money, ResultEngine, Transaction, TransactionKind, TransferCmd, postings,
};

use super::{Engine, with_tx};

impl Engine {
    /// Moves `amount` between two accounts holding the same currency.
    ///
    /// One atomic unit: both accounts are locked in id order, the source is
    /// checked for funds, both balances move by the same amount and the
    /// TRANSFER record is written together with its DEBIT/CREDIT posting
    /// pair. Either everything commits or nothing does.
    pub async fn transfer(&self, cmd: TransferCmd) -> ResultEngine<Transaction> {
        if cmd.amount_minor <= 0 {
            return Err(EngineError::InvalidAmount(
                "amount must be > 0".to_string(),
            ));
        }
        if cmd.from_account_id == cmd.to_account_id {
            return Err(EngineError::InvalidAccount(
                "from and to accounts must differ".to_string(),
            ));
        }
        let amount = Money::from_minor(cmd.amount_minor);

        with_tx!(self, |db_tx| {
            let (from, to) = self
                .lock_account_pair(&db_tx, cmd.from_account_id, cmd.to_account_id)
                .await?;
            let (from, to) = match (from, to) {
                (Some(from), Some(to)) => (from, to),
                _ => {
                    return Err(EngineError::InvalidAccount(
                        "invalid account or currency".to_string(),
                    ));
                }
            };
            if from.currency != cmd.currency.code() || to.currency != cmd.currency.code() {
                return Err(EngineError::InvalidAccount(
                    "invalid account or currency".to_string(),
                ));
            }
            if from.balance_minor < amount.minor() {
                return Err(EngineError::InsufficientFunds(format!(
                    "account {}",
                    from.id
                )));
            }

            let now = Utc::now();
            let mut tx = Transaction::new(
                Some(cmd.from_account_id),
                Some(cmd.to_account_id),
                amount,
                cmd.currency,
                TransactionKind::Transfer,
                now,
            )?;
            tx.postings = vec![
                postings::Posting::debit(cmd.from_account_id, tx.id, amount, now),
                postings::Posting::credit(cmd.to_account_id, tx.id, amount, now),
            ];

            self.adjust_balance(&db_tx, &from, -amount).await?;
            self.adjust_balance(&db_tx, &to, amount).await?;
            self.insert_ledger_records(&db_tx, &tx).await?;

            Ok(tx)
        })
    }
}
