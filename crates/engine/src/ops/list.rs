use sea_orm::{Condition, QueryFilter, QueryOrder, prelude::*};
use serde::{Deserialize, Serialize};

use crate::{EngineError, ListTransactionsCmd, ResultEngine, Transaction, transactions};

use super::Engine;

/// Hard cap on `page_size`, to bound the work a single listing request can do.
const MAX_PAGE_SIZE: u64 = 100;

/// One page of a user's transaction history.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct TransactionPage {
    pub items: Vec<Transaction>,
    /// Total matching transactions across all pages.
    pub total: u64,
    pub page: u64,
    pub page_size: u64,
}

impl Engine {
    /// Lists transactions touching any of a user's accounts, newest first.
    ///
    /// Pages are 1-based. A transaction appears once even when both of its
    /// sides belong to the same user, as every exchange does. Ties on the
    /// timestamp are broken by id so that repeated reads of the same page are
    /// stable.
    pub async fn list_transactions(
        &self,
        cmd: ListTransactionsCmd,
    ) -> ResultEngine<TransactionPage> {
        if cmd.page == 0 {
            return Err(EngineError::InvalidAmount("page must be >= 1".to_string()));
        }
        if cmd.page_size == 0 || cmd.page_size > MAX_PAGE_SIZE {
            return Err(EngineError::InvalidAmount(format!(
                "page_size must be between 1 and {MAX_PAGE_SIZE}"
            )));
        }

        let account_ids: Vec<String> = self
            .accounts_for_user(&cmd.user_id)
            .await?
            .into_iter()
            .map(|account| account.id.to_string())
            .collect();

        let mut query = transactions::Entity::find().filter(
            Condition::any()
                .add(transactions::Column::FromAccountId.is_in(account_ids.clone()))
                .add(transactions::Column::ToAccountId.is_in(account_ids)),
        );
        if let Some(kind) = cmd.kind {
            query = query.filter(transactions::Column::Kind.eq(kind.as_str()));
        }

        let paginator = query
            .order_by_desc(transactions::Column::CreatedAt)
            .order_by_desc(transactions::Column::Id)
            .paginate(&self.database, cmd.page_size);

        let total = paginator.num_items().await?;
        let models = paginator.fetch_page(cmd.page - 1).await?;
        let items = models
            .into_iter()
            .map(Transaction::try_from)
            .collect::<ResultEngine<Vec<_>>>()?;

        Ok(TransactionPage {
            items,
            total,
            page: cmd.page,
            page_size: cmd.page_size,
        })
    }
}
