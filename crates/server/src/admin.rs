//! Admin endpoints. All routes here sit behind the admin-role guard.

use api_types::{
    activity::Activity,
    admin::Adjustment,
    transaction::Transaction,
    user::{SetActive, SetTransactable, UserOverview},
};
use std::collections::HashMap;

use axum::{
    Extension, Json,
    extract::{Path, State},
    http::StatusCode,
};
use sea_orm::EntityTrait;
use uuid::Uuid;

use crate::{
    ServerError,
    server::ServerState,
    wallet::{map_kind, transaction_view},
};
use engine::{LedgerError, MoneyCents, users};

fn overview_view(overview: engine::UserOverview) -> UserOverview {
    UserOverview {
        id: overview.id,
        email: overview.email,
        full_name: overview.full_name,
        can_transact: overview.can_transact,
        is_active: overview.is_active,
        has_pin: overview.has_pin,
        wallet_balance_minor: overview.wallet_balance.cents(),
        ledger_balance_minor: overview.ledger_balance.cents(),
        usd_balance_minor: overview.usd_balance.cents(),
    }
}

// Unlike the wallet routes, the acting admin is not the sender; the
// sender fields come from a lookup of the affected user.
async fn sender_for(
    state: &ServerState,
    sender_user_id: Option<Uuid>,
) -> Result<Option<users::Model>, ServerError> {
    let Some(id) = sender_user_id else {
        return Ok(None);
    };
    let model = users::Entity::find_by_id(id.to_string())
        .one(&state.db)
        .await
        .map_err(LedgerError::from)?;
    Ok(model)
}

pub async fn list_users(
    State(state): State<ServerState>,
) -> Result<Json<Vec<UserOverview>>, ServerError> {
    let users = state.engine.list_users().await?;
    Ok(Json(users.into_iter().map(overview_view).collect()))
}

pub async fn user_overview(
    State(state): State<ServerState>,
    Path(id): Path<Uuid>,
) -> Result<Json<UserOverview>, ServerError> {
    let overview = state.engine.user_overview(id).await?;
    Ok(Json(overview_view(overview)))
}

pub async fn credit(
    State(state): State<ServerState>,
    Json(payload): Json<Adjustment>,
) -> Result<Json<Transaction>, ServerError> {
    let tx = state
        .engine
        .credit(
            payload.user_id,
            map_kind(payload.kind),
            MoneyCents::new(payload.amount_minor),
        )
        .await?;
    let sender = sender_for(&state, tx.sender_user_id).await?;
    Ok(Json(transaction_view(tx, sender.as_ref())))
}

pub async fn debit(
    State(state): State<ServerState>,
    Json(payload): Json<Adjustment>,
) -> Result<Json<Transaction>, ServerError> {
    let tx = state
        .engine
        .debit(
            payload.user_id,
            map_kind(payload.kind),
            MoneyCents::new(payload.amount_minor),
        )
        .await?;
    let sender = sender_for(&state, tx.sender_user_id).await?;
    Ok(Json(transaction_view(tx, sender.as_ref())))
}

pub async fn revert(
    Extension(admin): Extension<users::Model>,
    State(state): State<ServerState>,
    Path(transaction_id): Path<Uuid>,
) -> Result<Json<Transaction>, ServerError> {
    let tx = state
        .engine
        .revert_transaction(transaction_id, &admin.email)
        .await?;
    let sender = sender_for(&state, tx.sender_user_id).await?;
    Ok(Json(transaction_view(tx, sender.as_ref())))
}

pub async fn set_transactable(
    Extension(admin): Extension<users::Model>,
    State(state): State<ServerState>,
    Path(id): Path<Uuid>,
    Json(payload): Json<SetTransactable>,
) -> Result<StatusCode, ServerError> {
    state
        .engine
        .set_transactable(id, payload.enabled, &admin.email)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn set_active(
    Extension(admin): Extension<users::Model>,
    State(state): State<ServerState>,
    Path(id): Path<Uuid>,
    Json(payload): Json<SetActive>,
) -> Result<StatusCode, ServerError> {
    state
        .engine
        .set_active(id, payload.active, &admin.email)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn list_transactions(
    State(state): State<ServerState>,
) -> Result<Json<Vec<Transaction>>, ServerError> {
    let transactions = state.engine.list_all_transactions().await?;
    let senders: HashMap<String, users::Model> = users::Entity::find()
        .all(&state.db)
        .await
        .map_err(LedgerError::from)?
        .into_iter()
        .map(|model| (model.id.clone(), model))
        .collect();
    let views = transactions
        .into_iter()
        .map(|tx| {
            let sender = tx
                .sender_user_id
                .and_then(|id| senders.get(&id.to_string()));
            transaction_view(tx, sender)
        })
        .collect();
    Ok(Json(views))
}

pub async fn list_activities(
    State(state): State<ServerState>,
) -> Result<Json<Vec<Activity>>, ServerError> {
    let activities = state.engine.list_activities().await?;
    let views = activities
        .into_iter()
        .map(|entry| Activity {
            id: entry.id,
            user_id: entry.user_id,
            user_email: entry.user_email,
            activity_type: entry.activity_type.as_str().to_string(),
            created_at: entry.created_at,
            details: entry.details,
            data: entry.data,
        })
        .collect();
    Ok(Json(views))
}
