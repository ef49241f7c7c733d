//! Accounts API endpoints

use api_types::account::{AccountView, AuditView, BalanceView};
use axum::{
    Extension, Json,
    extract::{Path, State},
};
use sea_orm::{ColumnTrait, EntityTrait, QueryFilter};
use uuid::Uuid;

use crate::{ServerError, server::ServerState, user};

pub fn map_currency(currency: engine::Currency) -> api_types::Currency {
    match currency {
        engine::Currency::Usd => api_types::Currency::Usd,
        engine::Currency::Eur => api_types::Currency::Eur,
    }
}

pub fn view_from(account: engine::Account) -> AccountView {
    AccountView {
        id: account.id,
        user_id: account.user_id,
        currency: map_currency(account.currency),
        balance_minor: account.balance.minor(),
        created_at: account.created_at,
    }
}

/// Loads an account and checks it belongs to `username`.
///
/// Someone else's account id answers 404, the same as an id that does not
/// exist; account ids of other users are not probeable.
async fn owned_account(
    state: &ServerState,
    username: &str,
    account_id: Uuid,
) -> Result<engine::Account, ServerError> {
    let account = state.engine.account(account_id).await?;
    if account.user_id != username {
        return Err(ServerError::Engine(engine::EngineError::KeyNotFound(
            "account not exists".to_string(),
        )));
    }
    Ok(account)
}

/// Lists the caller's accounts.
pub async fn list(
    Extension(user): Extension<user::Model>,
    State(state): State<ServerState>,
) -> Result<Json<Vec<AccountView>>, ServerError> {
    let accounts = state.engine.accounts_for_user(&user.username).await?;
    Ok(Json(accounts.into_iter().map(view_from).collect()))
}

/// Looks up another user's accounts by email, for addressing transfers.
pub async fn by_email(
    Extension(_): Extension<user::Model>,
    State(state): State<ServerState>,
    Path(email): Path<String>,
) -> Result<Json<Vec<AccountView>>, ServerError> {
    let owner = user::Entity::find()
        .filter(user::Column::Email.eq(email))
        .one(&state.db)
        .await
        .map_err(|err| ServerError::Generic(err.to_string()))?
        .ok_or_else(|| {
            ServerError::Engine(engine::EngineError::KeyNotFound("user not exists".to_string()))
        })?;

    let accounts = state.engine.accounts_for_user(&owner.username).await?;
    Ok(Json(accounts.into_iter().map(view_from).collect()))
}

/// Returns the stored balance of one of the caller's accounts.
pub async fn balance(
    Extension(user): Extension<user::Model>,
    State(state): State<ServerState>,
    Path(id): Path<Uuid>,
) -> Result<Json<BalanceView>, ServerError> {
    let account = owned_account(&state, &user.username, id).await?;
    Ok(Json(BalanceView {
        account_id: account.id,
        currency: map_currency(account.currency),
        balance_minor: account.balance.minor(),
        balance: account.balance.to_string(),
    }))
}

/// Reconciles one of the caller's accounts against its postings.
pub async fn verify_balance(
    Extension(user): Extension<user::Model>,
    State(state): State<ServerState>,
    Path(id): Path<Uuid>,
) -> Result<Json<AuditView>, ServerError> {
    owned_account(&state, &user.username, id).await?;
    let audit = state.engine.verify_balance(id).await?;
    Ok(Json(AuditView {
        account_id: audit.account_id,
        stored_minor: audit.stored.minor(),
        reconciled_minor: audit.reconciled.minor(),
        consistent: audit.consistent,
        discrepancy_minor: audit.discrepancy.minor(),
    }))
}
