//! User-facing wallet endpoints.

use api_types::{
    AccountKind as ApiKind,
    account::{Balance, BalanceGet},
    transaction::{InitiateTransfer, TopUpNew, Transaction, TransferFlavor, TransferNew},
    user::SetPin,
};
use axum::{
    Extension, Json,
    extract::{Query, State},
    http::StatusCode,
};
use uuid::Uuid;

use crate::{ServerError, server::ServerState};
use engine::{AccountKind, MoneyCents, TransactionKind, users};

pub(crate) fn map_kind(kind: ApiKind) -> AccountKind {
    match kind {
        ApiKind::Wallet => AccountKind::Wallet,
        ApiKind::Ledger => AccountKind::Ledger,
        ApiKind::Usd => AccountKind::Usd,
    }
}

fn kind_to_api(kind: AccountKind) -> ApiKind {
    match kind {
        AccountKind::Wallet => ApiKind::Wallet,
        AccountKind::Ledger => ApiKind::Ledger,
        AccountKind::Usd => ApiKind::Usd,
    }
}

fn map_flavor(flavor: TransferFlavor) -> TransactionKind {
    match flavor {
        TransferFlavor::Transfer => TransactionKind::Transfer,
        TransferFlavor::WireTransfer => TransactionKind::WireTransfer,
        TransferFlavor::BitcoinTransfer => TransactionKind::BitcoinTransfer,
    }
}

pub(crate) fn transaction_view(
    tx: engine::Transaction,
    sender: Option<&users::Model>,
) -> Transaction {
    Transaction {
        id: tx.id,
        sender_user_id: tx.sender_user_id,
        sender_name: sender.map(|s| s.full_name.clone()),
        sender_email: sender.map(|s| s.email.clone()),
        amount_minor: tx.amount.cents(),
        created_at: tx.created_at,
        modified_at: tx.modified_at,
        status: tx.status.as_str().to_string(),
        kind: tx.kind.as_str().to_string(),
        source_kind: kind_to_api(tx.source_kind),
        destination_kind: tx.destination_kind.map(kind_to_api),
        destination_address: tx.destination_address,
        details: tx.details,
        coin_type: tx.coin_type,
    }
}

pub(crate) fn user_id(user: &users::Model) -> Result<Uuid, ServerError> {
    Uuid::parse_str(&user.id)
        .map_err(|_| ServerError::Generic("malformed user id".to_string()))
}

pub async fn balance(
    Extension(user): Extension<users::Model>,
    State(state): State<ServerState>,
    Query(payload): Query<BalanceGet>,
) -> Result<Json<Balance>, ServerError> {
    let balance = state
        .engine
        .balance(user_id(&user)?, map_kind(payload.kind))
        .await?;

    Ok(Json(Balance {
        kind: payload.kind,
        balance_minor: balance.cents(),
        balance: balance.to_string(),
    }))
}

pub async fn set_pin(
    Extension(user): Extension<users::Model>,
    State(state): State<ServerState>,
    Json(payload): Json<SetPin>,
) -> Result<StatusCode, ServerError> {
    state.engine.set_pin(user_id(&user)?, &payload.pin).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn initiate_transfer(
    Extension(user): Extension<users::Model>,
    State(state): State<ServerState>,
) -> Result<Json<InitiateTransfer>, ServerError> {
    let (email, code) = state.engine.issue_transfer_code(user_id(&user)?).await?;

    // the initiation is already committed; delivery failure is reported,
    // not rolled back
    if let Err(err) = state.notifier.send(
        &email,
        "Your transfer code",
        &format!("Your one-time code is {code}. It expires in 2 minutes."),
    ) {
        tracing::error!("failed to deliver one-time code: {err}");
        return Err(ServerError::Generic(
            "failed to deliver the one-time code".to_string(),
        ));
    }

    Ok(Json(InitiateTransfer { sent_to: email }))
}

pub async fn transfer(
    Extension(user): Extension<users::Model>,
    State(state): State<ServerState>,
    Json(payload): Json<TransferNew>,
) -> Result<Json<Transaction>, ServerError> {
    let tx = state
        .engine
        .execute_transfer(
            user_id(&user)?,
            map_kind(payload.source_kind),
            MoneyCents::new(payload.amount_minor),
            &payload.destination_address,
            payload.details.as_deref(),
            &payload.code,
            &payload.pin,
            map_flavor(payload.flavor),
            payload.coin_type.as_deref(),
        )
        .await?;

    Ok(Json(transaction_view(tx, Some(&user))))
}

pub async fn top_up(
    Extension(user): Extension<users::Model>,
    State(state): State<ServerState>,
    Json(payload): Json<TopUpNew>,
) -> Result<Json<Transaction>, ServerError> {
    let tx = state
        .engine
        .top_up_wallet(
            user_id(&user)?,
            map_kind(payload.from_kind),
            map_kind(payload.to_kind),
            MoneyCents::new(payload.amount_minor),
            &payload.code,
            &payload.pin,
        )
        .await?;

    Ok(Json(transaction_view(tx, Some(&user))))
}

pub async fn list_transactions(
    Extension(user): Extension<users::Model>,
    State(state): State<ServerState>,
) -> Result<Json<Vec<Transaction>>, ServerError> {
    let transactions = state.engine.list_transactions(user_id(&user)?).await?;
    let views = transactions
        .into_iter()
        .map(|tx| transaction_view(tx, Some(&user)))
        .collect();
    Ok(Json(views))
}
