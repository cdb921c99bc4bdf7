use chrono::Utc;
use sea_orm::{
    ActiveValue, ConnectionTrait, QueryFilter, QueryOrder, TransactionTrait, prelude::*,
    sea_query::Expr,
};
use serde::Serialize;
use uuid::Uuid;

use crate::{
    AccountKind, ActivityLog, ActivityType, LedgerError, MoneyCents, ResultEngine, Role,
    Transaction, TransactionKind, TransactionStatus, accounts, activity_log, transactions, users,
};

use super::{Engine, with_tx};

/// Denormalized per-user view for admin inspection.
#[derive(Clone, Debug, Serialize)]
pub struct UserOverview {
    pub id: Uuid,
    pub email: String,
    pub full_name: String,
    pub role: Role,
    pub can_transact: bool,
    pub is_active: bool,
    pub has_pin: bool,
    pub wallet_balance: MoneyCents,
    pub ledger_balance: MoneyCents,
    pub usd_balance: MoneyCents,
}

impl Engine {
    /// Admin credit: adds `amount` to the user's account of `kind`.
    ///
    /// The actor is trusted, so there is no upper bound; the credit, its
    /// transaction row and the audit entry commit together.
    pub async fn credit(
        &self,
        user_id: Uuid,
        kind: AccountKind,
        amount: MoneyCents,
    ) -> ResultEngine<Transaction> {
        if !amount.is_positive() {
            return Err(LedgerError::InvalidAmount(
                "amount must be > 0".to_string(),
            ));
        }

        with_tx!(self, |db_tx| {
            let user = self.require_user(&db_tx, user_id).await?;
            let account = self.require_account(&db_tx, user_id, kind).await?;
            self.credit_balance(&db_tx, &account, amount).await?;

            let tx = Transaction::new(
                user_id,
                amount,
                TransactionKind::Addition,
                kind,
                None,
                None,
                Some("admin credit".to_string()),
                None,
            )?;
            transactions::ActiveModel::from(&tx).insert(&db_tx).await?;

            let entry = ActivityLog::new(
                Some(user_id),
                user.email,
                ActivityType::FundsCredited,
                format!("Funds added to the {} account. Amount: {amount}.", kind.as_str()),
            );
            activity_log::ActiveModel::from(&entry).insert(&db_tx).await?;

            Ok(tx)
        })
    }

    /// Admin debit: removes `amount` from the user's account of `kind`,
    /// rejected with `InsufficientFunds` when the balance is too low.
    pub async fn debit(
        &self,
        user_id: Uuid,
        kind: AccountKind,
        amount: MoneyCents,
    ) -> ResultEngine<Transaction> {
        if !amount.is_positive() {
            return Err(LedgerError::InvalidAmount(
                "amount must be > 0".to_string(),
            ));
        }

        with_tx!(self, |db_tx| {
            let user = self.require_user(&db_tx, user_id).await?;
            let account = self.require_account(&db_tx, user_id, kind).await?;
            self.debit_balance(&db_tx, &account, amount).await?;

            let tx = Transaction::new(
                user_id,
                amount,
                TransactionKind::Deduction,
                kind,
                None,
                None,
                Some("admin debit".to_string()),
                None,
            )?;
            transactions::ActiveModel::from(&tx).insert(&db_tx).await?;

            let entry = ActivityLog::new(
                Some(user_id),
                user.email,
                ActivityType::FundsDebited,
                format!(
                    "Funds deducted from the {} account. Amount: {amount}.",
                    kind.as_str()
                ),
            );
            activity_log::ActiveModel::from(&entry).insert(&db_tx).await?;

            Ok(tx)
        })
    }

    /// Reverts a previously committed transaction.
    ///
    /// One-way state machine: only `successful` transactions revert. The
    /// balance effect recorded at creation time is undone on the original
    /// sender's accounts only: the source account gets back what it lost
    /// (or loses what an admin credit added, balance permitting), and an
    /// internal move additionally debits the destination-kind account of
    /// the same user. A second revert attempt is rejected without touching
    /// any balance.
    pub async fn revert_transaction(
        &self,
        transaction_id: Uuid,
        admin_email: &str,
    ) -> ResultEngine<Transaction> {
        with_tx!(self, |db_tx| {
            let model = transactions::Entity::find_by_id(transaction_id.to_string())
                .one(&db_tx)
                .await?
                .ok_or_else(|| {
                    LedgerError::KeyNotFound("transaction not exists".to_string())
                })?;
            let tx = Transaction::try_from(model)?;

            match tx.status {
                TransactionStatus::Successful => {}
                TransactionStatus::Reverted => {
                    return Err(LedgerError::AlreadyReverted(transaction_id.to_string()));
                }
                TransactionStatus::Failed | TransactionStatus::Pending => {
                    return Err(LedgerError::NotRevertible(format!(
                        "transaction is {}",
                        tx.status.as_str()
                    )));
                }
            }

            let sender_id = tx.sender_user_id.ok_or_else(|| {
                LedgerError::NotRevertible("transaction has no sender".to_string())
            })?;

            // The status flip is the reversal's claim on the row. It runs
            // before any balance change and only matches `successful`, so a
            // concurrent revert that read the same snapshot matches zero
            // rows and never reaches the credits.
            let now = Utc::now();
            let flipped = transactions::Entity::update_many()
                .col_expr(
                    transactions::Column::Status,
                    Expr::value(TransactionStatus::Reverted.as_str()),
                )
                .col_expr(transactions::Column::ModifiedAt, Expr::value(now))
                .filter(transactions::Column::Id.eq(transaction_id.to_string()))
                .filter(
                    transactions::Column::Status.eq(TransactionStatus::Successful.as_str()),
                )
                .exec(&db_tx)
                .await?;
            if flipped.rows_affected == 0 {
                return Err(LedgerError::AlreadyReverted(transaction_id.to_string()));
            }

            let source = self
                .require_account(&db_tx, sender_id, tx.source_kind)
                .await?;
            if tx.kind.debits_source() {
                self.credit_balance(&db_tx, &source, tx.amount).await?;
            } else {
                self.debit_balance(&db_tx, &source, tx.amount).await?;
            }

            // An internal move also credited a destination account; take
            // that credit back, balance permitting.
            if let Some(destination_kind) = tx.destination_kind {
                let destination = self
                    .require_account(&db_tx, sender_id, destination_kind)
                    .await?;
                self.debit_balance(&db_tx, &destination, tx.amount).await?;
            }

            let mut reverted = tx;
            reverted.status = TransactionStatus::Reverted;
            reverted.modified_at = Some(now);

            let entry = ActivityLog::new(
                None,
                admin_email,
                ActivityType::TransferReverted,
                format!("Transfer reverted for transaction ID {transaction_id}."),
            )
            .with_data(serde_json::to_string(&reverted).ok());
            activity_log::ActiveModel::from(&entry).insert(&db_tx).await?;

            tracing::info!(transaction_id = %transaction_id, "transaction reverted");
            Ok(reverted)
        })
    }

    /// Switches whether the user may call the transfer engine at all.
    pub async fn set_transactable(
        &self,
        user_id: Uuid,
        enabled: bool,
        admin_email: &str,
    ) -> ResultEngine<()> {
        self.set_user_flag(user_id, admin_email, |update| {
            update.can_transact = ActiveValue::Set(enabled);
            (
                ActivityType::TransactableToggled,
                format!("Transact flag set to {enabled}"),
            )
        })
        .await
    }

    /// Activates or deactivates the user account.
    pub async fn set_active(
        &self,
        user_id: Uuid,
        active: bool,
        admin_email: &str,
    ) -> ResultEngine<()> {
        self.set_user_flag(user_id, admin_email, |update| {
            update.is_active = ActiveValue::Set(active);
            if active {
                (ActivityType::AccountActivated, "Account activated".to_string())
            } else {
                (
                    ActivityType::AccountDeactivated,
                    "Account deactivated".to_string(),
                )
            }
        })
        .await
    }

    async fn set_user_flag<F>(
        &self,
        user_id: Uuid,
        admin_email: &str,
        apply: F,
    ) -> ResultEngine<()>
    where
        F: FnOnce(&mut users::ActiveModel) -> (ActivityType, String),
    {
        with_tx!(self, |db_tx| {
            let user = self.require_user(&db_tx, user_id).await?;

            let mut update = users::ActiveModel {
                id: ActiveValue::Set(user.id.clone()),
                ..Default::default()
            };
            let (activity_type, details) = apply(&mut update);
            update.update(&db_tx).await?;

            let entry = ActivityLog::new(
                Some(user_id),
                admin_email,
                activity_type,
                format!("{details} for user with email {}", user.email),
            );
            activity_log::ActiveModel::from(&entry).insert(&db_tx).await?;
            Ok(())
        })
    }

    /// Lists all non-admin users with their balances, newest first.
    pub async fn list_users(&self) -> ResultEngine<Vec<UserOverview>> {
        let models = users::Entity::find()
            .filter(users::Column::Role.eq(Role::User.as_str()))
            .order_by_desc(users::Column::CreatedAt)
            .all(&self.database)
            .await?;

        let mut overviews = Vec::with_capacity(models.len());
        for model in models {
            overviews.push(self.overview_for(&self.database, model).await?);
        }
        Ok(overviews)
    }

    /// Denormalized single-user view with all three balances.
    pub async fn user_overview(&self, user_id: Uuid) -> ResultEngine<UserOverview> {
        let user = self.require_user(&self.database, user_id).await?;
        self.overview_for(&self.database, user).await
    }

    async fn overview_for<C>(&self, db: &C, user: users::Model) -> ResultEngine<UserOverview>
    where
        C: ConnectionTrait,
    {
        let user_id = Uuid::parse_str(&user.id)
            .map_err(|_| LedgerError::KeyNotFound("user not exists".to_string()))?;

        let mut balances = [MoneyCents::ZERO; 3];
        let account_models = accounts::Entity::find()
            .filter(accounts::Column::UserId.eq(user.id.clone()))
            .all(db)
            .await?;
        for model in account_models {
            let kind = AccountKind::try_from(model.kind.as_str())?;
            let slot = AccountKind::ALL
                .iter()
                .position(|k| *k == kind)
                .unwrap_or_default();
            balances[slot] = MoneyCents::new(model.balance_minor);
        }

        Ok(UserOverview {
            id: user_id,
            email: user.email,
            full_name: user.full_name,
            role: Role::try_from(user.role.as_str())?,
            can_transact: user.can_transact,
            is_active: user.is_active,
            has_pin: user.pin_hash.is_some(),
            wallet_balance: balances[0],
            ledger_balance: balances[1],
            usd_balance: balances[2],
        })
    }

    /// All transactions across users, newest first.
    pub async fn list_all_transactions(&self) -> ResultEngine<Vec<Transaction>> {
        let models = transactions::Entity::find()
            .order_by_desc(transactions::Column::CreatedAt)
            .all(&self.database)
            .await?;
        models.into_iter().map(Transaction::try_from).collect()
    }

    /// The full audit trail, newest first.
    pub async fn list_activities(&self) -> ResultEngine<Vec<ActivityLog>> {
        let models = activity_log::Entity::find()
            .order_by_desc(activity_log::Column::CreatedAt)
            .all(&self.database)
            .await?;
        models.into_iter().map(ActivityLog::try_from).collect()
    }
}
