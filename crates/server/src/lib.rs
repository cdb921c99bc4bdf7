use axum::{Json, http::StatusCode, response::IntoResponse};
use engine::LedgerError;
use serde::Serialize;

pub use notify::{Notifier, TracingNotifier};
pub use server::{ServerState, router, run, run_with_listener, spawn_with_listener};

mod admin;
mod notify;
mod server;
mod wallet;

pub mod types {
    pub mod account {
        pub use api_types::AccountKind;
        pub use api_types::account::{Balance, BalanceGet};
    }

    pub mod user {
        pub use api_types::user::{SetActive, SetPin, SetTransactable, UserOverview};
    }

    pub mod transaction {
        pub use api_types::transaction::{
            InitiateTransfer, TopUpNew, Transaction, TransferFlavor, TransferNew,
        };
    }

    pub mod activity {
        pub use api_types::activity::Activity;
    }

    pub mod admin {
        pub use api_types::admin::Adjustment;
    }
}

pub enum ServerError {
    Engine(LedgerError),
    Generic(String),
}

#[derive(Serialize)]
struct Error {
    error: String,
}

fn status_for_engine_error(err: &LedgerError) -> StatusCode {
    match err {
        LedgerError::KeyNotFound(_) => StatusCode::NOT_FOUND,
        LedgerError::ExistingKey(_)
        | LedgerError::AlreadyReverted(_)
        | LedgerError::NotRevertible(_) => StatusCode::CONFLICT,
        LedgerError::InvalidCode(_) | LedgerError::IncorrectPin => StatusCode::UNAUTHORIZED,
        LedgerError::AccountDisabled(_) => StatusCode::FORBIDDEN,
        LedgerError::Database(_) => StatusCode::INTERNAL_SERVER_ERROR,
        LedgerError::InvalidAmount(_)
        | LedgerError::InvalidInput(_)
        | LedgerError::InvalidKind(_)
        | LedgerError::InvalidPin(_)
        | LedgerError::InsufficientFunds(_) => StatusCode::UNPROCESSABLE_ENTITY,
    }
}

fn message_for_engine_error(err: LedgerError) -> String {
    match err {
        LedgerError::Database(db_err) => {
            tracing::error!("database error: {db_err}");
            "Unable to process request, please try again or contact an administrator".to_string()
        }
        other => other.to_string(),
    }
}

impl IntoResponse for ServerError {
    fn into_response(self) -> axum::response::Response {
        let (status, error) = match self {
            ServerError::Engine(err) => {
                (status_for_engine_error(&err), message_for_engine_error(err))
            }
            ServerError::Generic(err) => (StatusCode::BAD_REQUEST, err),
        };

        (status, Json(Error { error })).into_response()
    }
}

impl From<LedgerError> for ServerError {
    fn from(value: LedgerError) -> Self {
        Self::Engine(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn not_found_maps_to_404() {
        let res = ServerError::from(LedgerError::KeyNotFound("x".to_string())).into_response();
        assert_eq!(res.status(), StatusCode::NOT_FOUND);
    }

    #[test]
    fn conflicts_map_to_409() {
        for err in [
            LedgerError::ExistingKey("x".to_string()),
            LedgerError::AlreadyReverted("x".to_string()),
            LedgerError::NotRevertible("x".to_string()),
        ] {
            let res = ServerError::from(err).into_response();
            assert_eq!(res.status(), StatusCode::CONFLICT);
        }
    }

    #[test]
    fn challenge_failures_map_to_401() {
        for err in [
            LedgerError::InvalidCode("x".to_string()),
            LedgerError::IncorrectPin,
        ] {
            let res = ServerError::from(err).into_response();
            assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
        }
    }

    #[test]
    fn disabled_account_maps_to_403() {
        let res =
            ServerError::from(LedgerError::AccountDisabled("x".to_string())).into_response();
        assert_eq!(res.status(), StatusCode::FORBIDDEN);
    }

    #[test]
    fn validation_failures_map_to_422() {
        for err in [
            LedgerError::InvalidAmount("x".to_string()),
            LedgerError::InvalidInput("x".to_string()),
            LedgerError::InvalidKind("x".to_string()),
            LedgerError::InvalidPin("x".to_string()),
            LedgerError::InsufficientFunds("x".to_string()),
        ] {
            let res = ServerError::from(err).into_response();
            assert_eq!(res.status(), StatusCode::UNPROCESSABLE_ENTITY);
        }
    }

    #[test]
    fn generic_maps_to_400() {
        let res = ServerError::Generic("bad".to_string()).into_response();
        assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    }
}
