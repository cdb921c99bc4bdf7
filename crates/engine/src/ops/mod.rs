use sea_orm::{
    ActiveValue, ConnectionTrait, DatabaseConnection, QueryFilter, TransactionTrait, prelude::*,
};
use uuid::Uuid;

use crate::{
    Account, AccountKind, ChallengeVerifier, LedgerError, ResultEngine, Role, accounts, users,
};

mod access;
mod admin;
mod balances;
mod transfers;

pub use admin::UserOverview;

/// Run a block inside a DB transaction, committing on success and rolling back on error.
macro_rules! with_tx {
    ($self:expr, |$tx:ident| $body:expr) => {{
        let $tx = $self.database.begin().await?;
        let result = $body;
        match result {
            Ok(value) => {
                $tx.commit().await?;
                Ok(value)
            }
            Err(err) => Err(err),
        }
    }};
}

pub(crate) use with_tx;

#[derive(Debug)]
pub struct Engine {
    database: DatabaseConnection,
    challenge: ChallengeVerifier,
}

impl Engine {
    /// Return a builder for `Engine`. Help to build the struct.
    pub fn builder() -> EngineBuilder {
        EngineBuilder::default()
    }

    /// The verifier used to generate and check one-time codes.
    pub fn challenge(&self) -> &ChallengeVerifier {
        &self.challenge
    }

    pub(crate) async fn require_user<C>(&self, db: &C, user_id: Uuid) -> ResultEngine<users::Model>
    where
        C: ConnectionTrait,
    {
        users::Entity::find_by_id(user_id.to_string())
            .one(db)
            .await?
            .ok_or_else(|| LedgerError::KeyNotFound("user not exists".to_string()))
    }

    pub(crate) async fn require_account<C>(
        &self,
        db: &C,
        user_id: Uuid,
        kind: AccountKind,
    ) -> ResultEngine<accounts::Model>
    where
        C: ConnectionTrait,
    {
        accounts::Entity::find()
            .filter(accounts::Column::UserId.eq(user_id.to_string()))
            .filter(accounts::Column::Kind.eq(kind.as_str()))
            .one(db)
            .await?
            .ok_or_else(|| {
                LedgerError::KeyNotFound(format!("{} account not exists", kind.as_str()))
            })
    }

    /// Registers a user together with its three zero-balance accounts.
    ///
    /// Registration workflows live outside the engine; this exists so
    /// bootstrap tooling and tests can seed the ledger.
    pub async fn create_user(
        &self,
        email: &str,
        full_name: &str,
        password: &str,
        role: Role,
    ) -> ResultEngine<Uuid> {
        let email = email.trim().to_ascii_lowercase();
        if email.is_empty() {
            return Err(LedgerError::InvalidInput(
                "email must not be empty".to_string(),
            ));
        }

        with_tx!(self, |db_tx| {
            let existing = users::Entity::find()
                .filter(users::Column::Email.eq(email.clone()))
                .one(&db_tx)
                .await?;
            if existing.is_some() {
                return Err(LedgerError::ExistingKey(email));
            }

            let user_id = Uuid::new_v4();
            let user = users::ActiveModel {
                id: ActiveValue::Set(user_id.to_string()),
                email: ActiveValue::Set(email),
                full_name: ActiveValue::Set(full_name.to_string()),
                password: ActiveValue::Set(password.to_string()),
                role: ActiveValue::Set(role.as_str().to_string()),
                pin_hash: ActiveValue::Set(None),
                can_transact: ActiveValue::Set(true),
                is_active: ActiveValue::Set(true),
                last_code_step: ActiveValue::Set(None),
                created_at: ActiveValue::Set(chrono::Utc::now()),
            };
            user.insert(&db_tx).await?;

            for kind in AccountKind::ALL {
                let account = Account::new(user_id, kind);
                accounts::ActiveModel::from(&account).insert(&db_tx).await?;
            }

            Ok(user_id)
        })
    }
}

/// The builder for `Engine`
#[derive(Default)]
pub struct EngineBuilder {
    database: DatabaseConnection,
    challenge: Option<ChallengeVerifier>,
}

impl EngineBuilder {
    /// Pass the required database
    pub fn database(mut self, db: DatabaseConnection) -> EngineBuilder {
        self.database = db;
        self
    }

    /// Override the default one-time-code verifier (120 s step, 6 digits).
    pub fn challenge(mut self, verifier: ChallengeVerifier) -> EngineBuilder {
        self.challenge = Some(verifier);
        self
    }

    /// Construct `Engine`
    pub fn build(self) -> Engine {
        Engine {
            database: self.database,
            challenge: self.challenge.unwrap_or_default(),
        }
    }
}
