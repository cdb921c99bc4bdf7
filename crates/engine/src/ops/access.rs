use chrono::Utc;
use sea_orm::{
    ActiveValue, Condition, ConnectionTrait, QueryFilter, TransactionTrait, prelude::*,
    sea_query::Expr,
};
use uuid::Uuid;

use crate::{
    ActivityLog, ActivityType, LedgerError, ResultEngine, activity_log, pin, users,
};

use super::{Engine, with_tx};

impl Engine {
    /// Sets or replaces the user's transfer PIN.
    ///
    /// The PIN is stored as a salted hash; until one is set, every transfer
    /// is rejected with [`LedgerError::IncorrectPin`].
    pub async fn set_pin(&self, user_id: Uuid, new_pin: &str) -> ResultEngine<()> {
        pin::validate_format(new_pin)?;
        let pin_hash = pin::hash(new_pin)?;

        with_tx!(self, |db_tx| {
            let user = self.require_user(&db_tx, user_id).await?;

            let update = users::ActiveModel {
                id: ActiveValue::Set(user.id.clone()),
                pin_hash: ActiveValue::Set(Some(pin_hash)),
                ..Default::default()
            };
            update.update(&db_tx).await?;

            let entry = ActivityLog::new(
                Some(user_id),
                user.email.clone(),
                ActivityType::UserSetPin,
                format!("User with email {} set a new pin", user.email),
            );
            activity_log::ActiveModel::from(&entry).insert(&db_tx).await?;
            Ok(())
        })
    }

    /// Generates the current one-time code for the user and records the
    /// initiation in the activity log.
    ///
    /// Delivery is the caller's job (the code is keyed to the user's email);
    /// a delivery failure must not erase the log entry written here.
    pub async fn issue_transfer_code(&self, user_id: Uuid) -> ResultEngine<(String, String)> {
        with_tx!(self, |db_tx| {
            let user = self.require_user(&db_tx, user_id).await?;
            let code = self.challenge.generate(&user.email, Utc::now());
            tracing::info!(user_id = %user_id, "transfer code requested");

            let entry = ActivityLog::new(
                Some(user_id),
                user.email.clone(),
                ActivityType::TransferInitiated,
                format!("User with email {} initiated a transfer", user.email),
            );
            activity_log::ActiveModel::from(&entry).insert(&db_tx).await?;
            Ok((user.email, code))
        })
    }

    /// Rejects transfers for users whose account is deactivated or whose
    /// transact flag was switched off by an admin.
    pub(super) fn ensure_user_enabled(&self, user: &users::Model) -> ResultEngine<()> {
        if !user.is_active {
            return Err(LedgerError::AccountDisabled(
                "account is deactivated".to_string(),
            ));
        }
        if !user.can_transact {
            return Err(LedgerError::AccountDisabled(
                "account is not allowed to transact".to_string(),
            ));
        }
        Ok(())
    }

    /// Validates the one-time code and PIN, and consumes the code.
    ///
    /// The matched time step is persisted on the user row inside the
    /// caller's transaction, so a code that already authorized one transfer
    /// cannot authorize a second within its validity window.
    pub(super) async fn verify_challenge<C>(
        &self,
        db: &C,
        user: &users::Model,
        code: &str,
        submitted_pin: &str,
    ) -> ResultEngine<()>
    where
        C: ConnectionTrait,
    {
        let step = self
            .challenge
            .verify(&user.email, code, Utc::now())
            .ok_or_else(|| LedgerError::InvalidCode("code expired or invalid".to_string()))?;

        if user.last_code_step.is_some_and(|used| step <= used) {
            return Err(LedgerError::InvalidCode("code already used".to_string()));
        }

        let Some(stored_hash) = user.pin_hash.as_deref() else {
            return Err(LedgerError::IncorrectPin);
        };
        if !pin::verify(submitted_pin, stored_hash) {
            return Err(LedgerError::IncorrectPin);
        }

        // Conditional write, same discipline as the balance debit: the step
        // only advances monotonically, so two transfers racing on one code
        // cannot both record step N. The loser matches zero rows.
        let consumed = users::Entity::update_many()
            .col_expr(users::Column::LastCodeStep, Expr::value(step))
            .filter(users::Column::Id.eq(user.id.clone()))
            .filter(
                Condition::any()
                    .add(users::Column::LastCodeStep.is_null())
                    .add(users::Column::LastCodeStep.lt(step)),
            )
            .exec(db)
            .await?;
        if consumed.rows_affected == 0 {
            return Err(LedgerError::InvalidCode("code already used".to_string()));
        }
        Ok(())
    }
}
