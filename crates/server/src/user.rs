//! User registration and the `users` entity shared with the auth middleware.

use api_types::user::UserNew;
use axum::{Json, extract::State, http::StatusCode};
use sea_orm::{ActiveValue, entity::prelude::*};

use crate::{ServerError, accounts, server::ServerState};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Eq)]
#[sea_orm(table_name = "users")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub username: String,
    pub password: String,
    pub email: String,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

/// Registers a user and opens one zero-balance account per supported
/// currency. Unauthenticated: this is the entry point for new users.
pub async fn register(
    State(state): State<ServerState>,
    Json(payload): Json<UserNew>,
) -> Result<(StatusCode, Json<Vec<api_types::account::AccountView>>), ServerError> {
    if payload.username.trim().is_empty() || payload.password.is_empty() {
        return Err(ServerError::Generic(
            "username and password are required".to_string(),
        ));
    }
    if !payload.email.contains('@') {
        return Err(ServerError::Generic("invalid email".to_string()));
    }

    let existing = Entity::find_by_id(payload.username.as_str())
        .one(&state.db)
        .await
        .map_err(|err| ServerError::Generic(err.to_string()))?;
    if existing.is_some() {
        return Err(ServerError::Engine(engine::EngineError::ExistingKey(
            payload.username,
        )));
    }

    let user = ActiveModel {
        username: ActiveValue::Set(payload.username.clone()),
        password: ActiveValue::Set(payload.password),
        email: ActiveValue::Set(payload.email),
    };
    user.insert(&state.db)
        .await
        .map_err(|err| ServerError::Generic(err.to_string()))?;

    let mut views = Vec::new();
    for currency in [engine::Currency::Usd, engine::Currency::Eur] {
        let account = state.engine.open_account(&payload.username, currency).await?;
        views.push(accounts::view_from(account));
    }

    Ok((StatusCode::CREATED, Json(views)))
}
