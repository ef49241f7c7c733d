//! Transaction primitives.
//!
//! A `Transaction` is the immutable record of one money-movement event. It
//! always links exactly two [`Posting`](crate::Posting)s: the debit on the
//! source account and the credit on the destination. For an exchange, the
//! stored amount and currency describe the **source** side; the destination
//! amount is derivable from the credit posting, not stored redundantly.

use chrono::{DateTime, Utc};
use sea_orm::{ActiveValue, entity::prelude::*};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{Currency, EngineError, Money, ResultEngine};

use super::postings;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum TransactionKind {
    Transfer,
    Exchange,
}

impl TransactionKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Transfer => "TRANSFER",
            Self::Exchange => "EXCHANGE",
        }
    }
}

impl TryFrom<&str> for TransactionKind {
    type Error = EngineError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value {
            "TRANSFER" => Ok(Self::Transfer),
            "EXCHANGE" => Ok(Self::Exchange),
            other => Err(EngineError::InvalidAmount(format!(
                "invalid transaction kind: {other}"
            ))),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transaction {
    pub id: Uuid,
    pub from_account_id: Option<Uuid>,
    pub to_account_id: Option<Uuid>,
    /// Amount debited from the source, in the source currency.
    pub amount: Money,
    pub currency: Currency,
    pub kind: TransactionKind,
    pub created_at: DateTime<Utc>,
    pub postings: Vec<postings::Posting>,
}

impl Transaction {
    pub fn new(
        from_account_id: Option<Uuid>,
        to_account_id: Option<Uuid>,
        amount: Money,
        currency: Currency,
        kind: TransactionKind,
        created_at: DateTime<Utc>,
    ) -> ResultEngine<Self> {
        if !amount.is_positive() {
            return Err(EngineError::InvalidAmount(
                "amount must be > 0".to_string(),
            ));
        }
        Ok(Self {
            id: Uuid::new_v4(),
            from_account_id,
            to_account_id,
            amount,
            currency,
            kind,
            created_at,
            postings: Vec::new(),
        })
    }
}

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "transactions")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,
    pub from_account_id: Option<String>,
    pub to_account_id: Option<String>,
    pub amount_minor: i64,
    pub currency: String,
    pub kind: String,
    pub created_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::postings::Entity")]
    Postings,
}

impl Related<super::postings::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Postings.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl From<&Transaction> for ActiveModel {
    fn from(tx: &Transaction) -> Self {
        Self {
            id: ActiveValue::Set(tx.id.to_string()),
            from_account_id: ActiveValue::Set(tx.from_account_id.map(|id| id.to_string())),
            to_account_id: ActiveValue::Set(tx.to_account_id.map(|id| id.to_string())),
            amount_minor: ActiveValue::Set(tx.amount.minor()),
            currency: ActiveValue::Set(tx.currency.code().to_string()),
            kind: ActiveValue::Set(tx.kind.as_str().to_string()),
            created_at: ActiveValue::Set(tx.created_at),
        }
    }
}

impl TryFrom<Model> for Transaction {
    type Error = EngineError;

    fn try_from(model: Model) -> ResultEngine<Self> {
        let parse_account = |raw: Option<String>| -> ResultEngine<Option<Uuid>> {
            raw.map(|s| {
                Uuid::parse_str(&s)
                    .map_err(|_| EngineError::KeyNotFound("account not exists".to_string()))
            })
            .transpose()
        };

        Ok(Self {
            id: Uuid::parse_str(&model.id)
                .map_err(|_| EngineError::KeyNotFound("transaction not exists".to_string()))?,
            from_account_id: parse_account(model.from_account_id)?,
            to_account_id: parse_account(model.to_account_id)?,
            amount: Money::from_minor(model.amount_minor),
            currency: Currency::try_from(model.currency.as_str())?,
            kind: TransactionKind::try_from(model.kind.as_str())?,
            created_at: model.created_at,
            postings: Vec::new(),
        })
    }
}
