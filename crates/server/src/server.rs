use axum::{
    Router,
    extract::{Request, State},
    http::StatusCode,
    middleware::{self, Next},
    response::Response,
    routing::{get, post},
};
use axum_extra::{
    TypedHeader,
    headers::{Authorization, authorization::Basic},
};
use sea_orm::{ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter};

use std::sync::Arc;

use crate::{Notifier, admin, wallet};
use engine::{Engine, Role, users};

#[derive(Clone)]
pub struct ServerState {
    pub engine: Arc<Engine>,
    pub db: DatabaseConnection,
    pub notifier: Arc<dyn Notifier>,
}

async fn auth(
    auth_header: TypedHeader<Authorization<Basic>>,
    State(state): State<ServerState>,
    mut request: Request,
    next: Next,
) -> Result<Response, StatusCode> {
    if auth_header.username().is_empty() || auth_header.password().is_empty() {
        return Err(StatusCode::UNAUTHORIZED);
    }

    let email = auth_header.username().trim().to_ascii_lowercase();
    let user = users::Entity::find()
        .filter(users::Column::Email.eq(email))
        .filter(users::Column::Password.eq(auth_header.password()))
        .one(&state.db)
        .await
        .map_err(|_| StatusCode::UNAUTHORIZED)?;

    let Some(user) = user else {
        return Err(StatusCode::UNAUTHORIZED);
    };

    request.extensions_mut().insert(user);
    Ok(next.run(request).await)
}

// Runs after `auth`, which inserted the user extension.
async fn require_admin(request: Request, next: Next) -> Result<Response, StatusCode> {
    let is_admin = request
        .extensions()
        .get::<users::Model>()
        .is_some_and(|user| user.role == Role::Admin.as_str());

    if !is_admin {
        return Err(StatusCode::FORBIDDEN);
    }
    Ok(next.run(request).await)
}

pub fn router(state: ServerState) -> Router {
    let admin_routes = Router::new()
        .route("/users", get(admin::list_users))
        .route("/users/{id}", get(admin::user_overview))
        .route("/users/{id}/transactable", post(admin::set_transactable))
        .route("/users/{id}/active", post(admin::set_active))
        .route("/credit", post(admin::credit))
        .route("/debit", post(admin::debit))
        .route("/revert/{transaction_id}", post(admin::revert))
        .route("/transactions", get(admin::list_transactions))
        .route("/activities", get(admin::list_activities))
        .route_layer(middleware::from_fn(require_admin));

    Router::new()
        .route("/wallet/balance", get(wallet::balance))
        .route("/wallet/pin", post(wallet::set_pin))
        .route("/wallet/initiate-transfer", post(wallet::initiate_transfer))
        .route("/wallet/transfer", post(wallet::transfer))
        .route("/wallet/top-up", post(wallet::top_up))
        .route("/wallet/transactions", get(wallet::list_transactions))
        .nest("/admin", admin_routes)
        .route_layer(middleware::from_fn_with_state(state.clone(), auth))
        .with_state(state)
}

pub async fn run(engine: Engine, db: DatabaseConnection, notifier: Arc<dyn Notifier>) {
    let listener = match tokio::net::TcpListener::bind("127.0.0.1:3000").await {
        Ok(listener) => listener,
        Err(err) => {
            tracing::error!("failed to bind server listener: {err}");
            return;
        }
    };
    if let Err(err) = run_with_listener(engine, db, notifier, listener).await {
        tracing::error!("server failed: {err}");
    }
}

pub async fn run_with_listener(
    engine: Engine,
    db: DatabaseConnection,
    notifier: Arc<dyn Notifier>,
    listener: tokio::net::TcpListener,
) -> Result<(), std::io::Error> {
    let addr = listener.local_addr()?;
    tracing::info!("Server listening on {}", addr);

    let state = ServerState {
        engine: Arc::new(engine),
        db,
        notifier,
    };

    axum::serve(listener, router(state)).await
}

pub fn spawn_with_listener(
    engine: Engine,
    db: DatabaseConnection,
    notifier: Arc<dyn Notifier>,
    listener: tokio::net::TcpListener,
) -> Result<std::net::SocketAddr, std::io::Error> {
    let addr = listener.local_addr()?;

    tokio::spawn(async move {
        if let Err(err) = run_with_listener(engine, db, notifier, listener).await {
            tracing::error!("server failed: {err}");
        }
    });

    Ok(addr)
}
