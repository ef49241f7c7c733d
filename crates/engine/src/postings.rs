//! Ledger postings.
//!
//! A [`Posting`] is a single signed balance change applied to one account as
//! part of a [`Transaction`](crate::Transaction). Postings are append-only:
//! they are never updated or deleted, and a posting is never written without
//! its sibling in the same atomic unit.
//!
//! Amounts are signed integer minor units and the sign must match the entry
//! kind: DEBIT entries are negative, CREDIT entries are positive. The
//! constructors make this unrepresentable rather than checked.

use chrono::{DateTime, Utc};
use sea_orm::{ActiveValue, entity::prelude::*};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{EngineError, Money, ResultEngine};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum EntryKind {
    Debit,
    Credit,
}

impl EntryKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Debit => "DEBIT",
            Self::Credit => "CREDIT",
        }
    }
}

impl TryFrom<&str> for EntryKind {
    type Error = EngineError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value {
            "DEBIT" => Ok(Self::Debit),
            "CREDIT" => Ok(Self::Credit),
            other => Err(EngineError::InvalidAmount(format!(
                "invalid entry kind: {other}"
            ))),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Posting {
    pub id: Uuid,
    pub account_id: Uuid,
    pub transaction_id: Uuid,
    /// Signed amount: negative for DEBIT, positive for CREDIT.
    pub amount: Money,
    pub entry: EntryKind,
    pub created_at: DateTime<Utc>,
}

impl Posting {
    /// A debit of `amount` (given as a positive magnitude) against an account.
    pub fn debit(
        account_id: Uuid,
        transaction_id: Uuid,
        amount: Money,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            account_id,
            transaction_id,
            amount: -amount,
            entry: EntryKind::Debit,
            created_at,
        }
    }

    /// A credit of `amount` (given as a positive magnitude) to an account.
    pub fn credit(
        account_id: Uuid,
        transaction_id: Uuid,
        amount: Money,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            account_id,
            transaction_id,
            amount,
            entry: EntryKind::Credit,
            created_at,
        }
    }
}

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "postings")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,
    pub account_id: String,
    pub transaction_id: String,
    pub amount_minor: i64,
    pub entry_kind: String,
    pub created_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::accounts::Entity",
        from = "Column::AccountId",
        to = "super::accounts::Column::Id",
        on_update = "NoAction",
        on_delete = "NoAction"
    )]
    Accounts,
    #[sea_orm(
        belongs_to = "super::transactions::Entity",
        from = "Column::TransactionId",
        to = "super::transactions::Column::Id",
        on_update = "NoAction",
        on_delete = "NoAction"
    )]
    Transactions,
}

impl Related<super::accounts::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Accounts.def()
    }
}

impl Related<super::transactions::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Transactions.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl From<&Posting> for ActiveModel {
    fn from(posting: &Posting) -> Self {
        Self {
            id: ActiveValue::Set(posting.id.to_string()),
            account_id: ActiveValue::Set(posting.account_id.to_string()),
            transaction_id: ActiveValue::Set(posting.transaction_id.to_string()),
            amount_minor: ActiveValue::Set(posting.amount.minor()),
            entry_kind: ActiveValue::Set(posting.entry.as_str().to_string()),
            created_at: ActiveValue::Set(posting.created_at),
        }
    }
}

impl TryFrom<Model> for Posting {
    type Error = EngineError;

    fn try_from(model: Model) -> ResultEngine<Self> {
        let entry = EntryKind::try_from(model.entry_kind.as_str())?;
        let amount = Money::from_minor(model.amount_minor);
        let sign_matches = match entry {
            EntryKind::Debit => amount.is_negative(),
            EntryKind::Credit => amount.is_positive(),
        };
        if !sign_matches {
            return Err(EngineError::InvalidAmount(format!(
                "posting {} sign does not match its entry kind",
                model.id
            )));
        }

        Ok(Self {
            id: Uuid::parse_str(&model.id)
                .map_err(|_| EngineError::InvalidAmount("invalid posting id".to_string()))?,
            account_id: Uuid::parse_str(&model.account_id)
                .map_err(|_| EngineError::KeyNotFound("account not exists".to_string()))?,
            transaction_id: Uuid::parse_str(&model.transaction_id)
                .map_err(|_| EngineError::KeyNotFound("transaction not exists".to_string()))?,
            amount,
            entry,
            created_at: model.created_at,
        })
    }
}
