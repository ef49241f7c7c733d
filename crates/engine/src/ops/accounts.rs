use chrono::Utc;
use sea_orm::{QueryFilter, QueryOrder, TransactionTrait, prelude::*};
use uuid::Uuid;

use crate::{Account, Currency, EngineError, ResultEngine};

use super::{Engine, with_tx};

impl Engine {
    /// Opens a zero-balance account for a user in the given currency.
    ///
    /// A user holds at most one account per currency; opening a second fails
    /// with [`EngineError::ExistingKey`].
    pub async fn open_account(
        &self,
        user_id: &str,
        currency: Currency,
    ) -> ResultEngine<Account> {
        let user_id = user_id.to_string();
        with_tx!(self, |db_tx| {
            let existing = crate::accounts::Entity::find()
                .filter(crate::accounts::Column::UserId.eq(user_id.as_str()))
                .filter(crate::accounts::Column::Currency.eq(currency.code()))
                .one(&db_tx)
                .await?;
            if existing.is_some() {
                return Err(EngineError::ExistingKey(format!(
                    "{currency} account for {user_id}"
                )));
            }

            let account = Account::new(user_id.clone(), currency, Utc::now());
            crate::accounts::ActiveModel::from(&account)
                .insert(&db_tx)
                .await?;
            Ok(account)
        })
    }

    /// Returns one account by id.
    pub async fn account(&self, account_id: Uuid) -> ResultEngine<Account> {
        let model = crate::accounts::Entity::find_by_id(account_id.to_string())
            .one(&self.database)
            .await?
            .ok_or_else(|| EngineError::KeyNotFound("account not exists".to_string()))?;
        Account::try_from(model)
    }

    /// Returns every account owned by a user, stable-ordered by currency.
    pub async fn accounts_for_user(&self, user_id: &str) -> ResultEngine<Vec<Account>> {
        let models = crate::accounts::Entity::find()
            .filter(crate::accounts::Column::UserId.eq(user_id))
            .order_by_asc(crate::accounts::Column::Currency)
            .all(&self.database)
            .await?;

        models.into_iter().map(Account::try_from).collect()
    }
}
