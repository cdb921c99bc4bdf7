use sea_orm::{QueryFilter, QueryOrder, TransactionTrait, prelude::*};
use uuid::Uuid;

use crate::{
    AccountKind, ActivityLog, ActivityType, LedgerError, MoneyCents, ResultEngine, Transaction,
    TransactionKind, activity_log, transactions,
};

use super::{Engine, with_tx};

impl Engine {
    /// Executes a user-initiated transfer to an external destination.
    ///
    /// `flavor` selects the recorded transfer kind (plain, wire or bitcoin);
    /// the balance logic is identical across flavors. Preconditions, the
    /// debit, the transaction row and the audit entry commit as one unit or
    /// not at all.
    #[allow(clippy::too_many_arguments)]
    pub async fn execute_transfer(
        &self,
        user_id: Uuid,
        source_kind: AccountKind,
        amount: MoneyCents,
        destination_address: &str,
        details: Option<&str>,
        code: &str,
        pin: &str,
        flavor: TransactionKind,
        coin_type: Option<&str>,
    ) -> ResultEngine<Transaction> {
        if !flavor.is_transfer_flavor() {
            return Err(LedgerError::InvalidKind(format!(
                "{} is not a transfer flavor",
                flavor.as_str()
            )));
        }
        if !amount.is_positive() {
            return Err(LedgerError::InvalidAmount(
                "amount must be > 0".to_string(),
            ));
        }

        with_tx!(self, |db_tx| {
            let user = self.require_user(&db_tx, user_id).await?;
            self.ensure_user_enabled(&user)?;
            self.verify_challenge(&db_tx, &user, code, pin).await?;

            let account = self.require_account(&db_tx, user_id, source_kind).await?;
            self.debit_balance(&db_tx, &account, amount).await?;

            let tx = Transaction::new(
                user_id,
                amount,
                flavor,
                source_kind,
                None,
                Some(destination_address.to_string()),
                details.map(|s| s.to_string()),
                coin_type.map(|s| s.to_string()),
            )?;
            transactions::ActiveModel::from(&tx).insert(&db_tx).await?;

            let entry = ActivityLog::new(
                Some(user_id),
                user.email.clone(),
                ActivityType::TransferCompleted,
                format!(
                    "User with email {} transferred {amount} to {destination_address} from the {} account",
                    user.email,
                    source_kind.as_str(),
                ),
            );
            activity_log::ActiveModel::from(&entry).insert(&db_tx).await?;

            tracing::info!(transaction_id = %tx.id, kind = flavor.as_str(), "transfer completed");
            Ok(tx)
        })
    }

    /// Moves value between two of the caller's own accounts.
    ///
    /// The source side carries the same guards as an external transfer; the
    /// destination is credited unconditionally.
    pub async fn top_up_wallet(
        &self,
        user_id: Uuid,
        from_kind: AccountKind,
        to_kind: AccountKind,
        amount: MoneyCents,
        code: &str,
        pin: &str,
    ) -> ResultEngine<Transaction> {
        if from_kind == to_kind {
            return Err(LedgerError::InvalidKind(
                "source and destination accounts must differ".to_string(),
            ));
        }
        if !amount.is_positive() {
            return Err(LedgerError::InvalidAmount(
                "amount must be > 0".to_string(),
            ));
        }

        with_tx!(self, |db_tx| {
            let user = self.require_user(&db_tx, user_id).await?;
            self.ensure_user_enabled(&user)?;
            self.verify_challenge(&db_tx, &user, code, pin).await?;

            let source = self.require_account(&db_tx, user_id, from_kind).await?;
            let destination = self.require_account(&db_tx, user_id, to_kind).await?;

            self.debit_balance(&db_tx, &source, amount).await?;
            self.credit_balance(&db_tx, &destination, amount).await?;

            let tx = Transaction::new(
                user_id,
                amount,
                TransactionKind::WalletTransfer,
                from_kind,
                Some(to_kind),
                None,
                None,
                None,
            )?;
            transactions::ActiveModel::from(&tx).insert(&db_tx).await?;

            let entry = ActivityLog::new(
                Some(user_id),
                user.email.clone(),
                ActivityType::WalletTopUp,
                format!(
                    "User with email {} moved {amount} from the {} account to the {} account",
                    user.email,
                    from_kind.as_str(),
                    to_kind.as_str(),
                ),
            );
            activity_log::ActiveModel::from(&entry).insert(&db_tx).await?;

            Ok(tx)
        })
    }

    /// Lists the user's transactions, newest first.
    pub async fn list_transactions(&self, user_id: Uuid) -> ResultEngine<Vec<Transaction>> {
        self.require_user(&self.database, user_id).await?;

        let models = transactions::Entity::find()
            .filter(transactions::Column::SenderUserId.eq(user_id.to_string()))
            .order_by_desc(transactions::Column::CreatedAt)
            .all(&self.database)
            .await?;

        models.into_iter().map(Transaction::try_from).collect()
    }
}
