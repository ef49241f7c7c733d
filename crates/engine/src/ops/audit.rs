use sea_orm::{ConnectionTrait, DbErr, Statement};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{Money, ResultEngine};

use super::Engine;

/// Allowed difference between the stored balance and the posting sum, in
/// minor units.
///
/// All arithmetic in the engine is exact integer math, so the tolerance is
/// zero: any discrepancy means a balance was mutated outside the ledger path
/// and must be surfaced, never absorbed.
pub const BALANCE_TOLERANCE_MINOR: i64 = 0;

/// Result of reconciling one account against its postings.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct BalanceAudit {
    pub account_id: Uuid,
    /// The denormalized balance on the account row.
    pub stored: Money,
    /// The balance recomputed as the sum of all signed posting amounts.
    pub reconciled: Money,
    pub consistent: bool,
    pub discrepancy: Money,
}

impl Engine {
    /// Sums all signed posting amounts ever recorded against an account.
    ///
    /// Plain aggregate read; safe to call outside any atomic unit.
    pub async fn sum_postings(&self, account_id: Uuid) -> ResultEngine<Money> {
        let db = self.database();
        let stmt = Statement::from_sql_and_values(
            db.get_database_backend(),
            "SELECT COALESCE(SUM(amount_minor), 0) AS sum FROM postings WHERE account_id = ?",
            [account_id.to_string().into()],
        );
        let sum: i64 = match db.query_one(stmt).await? {
            Some(row) => row.try_get("", "sum").map_err(DbErr::from)?,
            None => 0,
        };
        Ok(Money::from_minor(sum))
    }

    /// Recomputes an account's balance from its postings and compares it with
    /// the stored balance.
    ///
    /// Read-only: never opens an atomic unit and never mutates state, so it
    /// can run at any time without interfering with in-flight movements. Two
    /// consecutive runs with no intervening mutation return identical
    /// results.
    pub async fn verify_balance(&self, account_id: Uuid) -> ResultEngine<BalanceAudit> {
        let account = self.account(account_id).await?;
        let reconciled = self.sum_postings(account_id).await?;
        let discrepancy = account.balance.checked_sub(reconciled)?;

        Ok(BalanceAudit {
            account_id,
            stored: account.balance,
            reconciled,
            consistent: discrepancy.minor().abs() <= BALANCE_TOLERANCE_MINOR,
            discrepancy,
        })
    }
}
