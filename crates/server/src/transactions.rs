//! Transactions API endpoints

use api_types::transaction::{
    ExchangeNew, PostingView, TransactionListResponse, TransactionView, TransferNew,
};
use axum::{
    Extension, Json,
    extract::{Query, State},
    http::StatusCode,
};
use serde::Deserialize;

use crate::{ServerError, accounts::map_currency, server::ServerState, user};

fn map_kind(kind: engine::TransactionKind) -> api_types::TransactionKind {
    match kind {
        engine::TransactionKind::Transfer => api_types::TransactionKind::Transfer,
        engine::TransactionKind::Exchange => api_types::TransactionKind::Exchange,
    }
}

fn engine_currency(currency: api_types::Currency) -> engine::Currency {
    match currency {
        api_types::Currency::Usd => engine::Currency::Usd,
        api_types::Currency::Eur => engine::Currency::Eur,
    }
}

fn view_from(tx: engine::Transaction) -> TransactionView {
    TransactionView {
        id: tx.id,
        from_account_id: tx.from_account_id,
        to_account_id: tx.to_account_id,
        amount_minor: tx.amount.minor(),
        currency: map_currency(tx.currency),
        kind: map_kind(tx.kind),
        created_at: tx.created_at,
        postings: tx
            .postings
            .into_iter()
            .map(|posting| PostingView {
                account_id: posting.account_id,
                amount_minor: posting.amount.minor(),
                entry: posting.entry.as_str().to_string(),
            })
            .collect(),
    }
}

/// Moves funds between two same-currency accounts. The source must belong to
/// the caller; the destination may belong to anyone.
pub async fn transfer_new(
    Extension(user): Extension<user::Model>,
    State(state): State<ServerState>,
    Json(payload): Json<TransferNew>,
) -> Result<(StatusCode, Json<TransactionView>), ServerError> {
    let source = state.engine.account(payload.from_account_id).await?;
    if source.user_id != user.username {
        return Err(ServerError::Engine(engine::EngineError::KeyNotFound(
            "account not exists".to_string(),
        )));
    }

    let tx = state
        .engine
        .transfer(engine::TransferCmd {
            from_account_id: payload.from_account_id,
            to_account_id: payload.to_account_id,
            amount_minor: payload.amount_minor,
            currency: engine_currency(payload.currency),
        })
        .await?;

    Ok((StatusCode::CREATED, Json(view_from(tx))))
}

/// Converts funds between the caller's own currency accounts.
pub async fn exchange_new(
    Extension(user): Extension<user::Model>,
    State(state): State<ServerState>,
    Json(payload): Json<ExchangeNew>,
) -> Result<(StatusCode, Json<TransactionView>), ServerError> {
    let tx = state
        .engine
        .exchange(engine::ExchangeCmd {
            user_id: user.username,
            from_currency: engine_currency(payload.from_currency),
            to_currency: engine_currency(payload.to_currency),
            amount_minor: payload.amount_minor,
        })
        .await?;

    Ok((StatusCode::CREATED, Json(view_from(tx))))
}

#[derive(Debug, Deserialize)]
pub struct ListQuery {
    pub kind: Option<api_types::TransactionKind>,
    pub page: Option<u64>,
    pub page_size: Option<u64>,
}

/// Lists the caller's transactions, newest first, one page at a time.
pub async fn list(
    Extension(user): Extension<user::Model>,
    State(state): State<ServerState>,
    Query(query): Query<ListQuery>,
) -> Result<Json<TransactionListResponse>, ServerError> {
    let kind = query.kind.map(|kind| match kind {
        api_types::TransactionKind::Transfer => engine::TransactionKind::Transfer,
        api_types::TransactionKind::Exchange => engine::TransactionKind::Exchange,
    });

    let page = state
        .engine
        .list_transactions(engine::ListTransactionsCmd {
            user_id: user.username,
            kind,
            page: query.page.unwrap_or(1),
            page_size: query.page_size.unwrap_or(50),
        })
        .await?;

    Ok(Json(TransactionListResponse {
        transactions: page.items.into_iter().map(view_from).collect(),
        total: page.total,
        page: page.page,
        page_size: page.page_size,
    }))
}
