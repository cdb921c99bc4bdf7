use sea_orm::{ConnectionTrait, QueryFilter, prelude::*, sea_query::Expr};
use uuid::Uuid;

use crate::{AccountKind, LedgerError, MoneyCents, ResultEngine, accounts};

use super::Engine;

impl Engine {
    /// Current balance of one of the user's accounts.
    pub async fn balance(&self, user_id: Uuid, kind: AccountKind) -> ResultEngine<MoneyCents> {
        self.require_user(&self.database, user_id).await?;
        let account = self.require_account(&self.database, user_id, kind).await?;
        Ok(MoneyCents::new(account.balance_minor))
    }

    /// Unconditionally adds `amount` to the account balance.
    pub(super) async fn credit_balance<C>(
        &self,
        db: &C,
        account: &accounts::Model,
        amount: MoneyCents,
    ) -> ResultEngine<()>
    where
        C: ConnectionTrait,
    {
        let result = accounts::Entity::update_many()
            .col_expr(
                accounts::Column::BalanceMinor,
                Expr::col(accounts::Column::BalanceMinor).add(amount.cents()),
            )
            .filter(accounts::Column::Id.eq(account.id.clone()))
            .exec(db)
            .await?;
        if result.rows_affected == 0 {
            return Err(LedgerError::KeyNotFound("account not exists".to_string()));
        }
        Ok(())
    }

    /// Subtracts `amount` from the account balance, guarded in SQL.
    ///
    /// The `balance >= amount` predicate runs inside the UPDATE itself, so
    /// two concurrent debits against the same account cannot both pass a
    /// stale sufficiency check: the second one matches zero rows and fails.
    pub(super) async fn debit_balance<C>(
        &self,
        db: &C,
        account: &accounts::Model,
        amount: MoneyCents,
    ) -> ResultEngine<()>
    where
        C: ConnectionTrait,
    {
        let result = accounts::Entity::update_many()
            .col_expr(
                accounts::Column::BalanceMinor,
                Expr::col(accounts::Column::BalanceMinor).sub(amount.cents()),
            )
            .filter(accounts::Column::Id.eq(account.id.clone()))
            .filter(accounts::Column::BalanceMinor.gte(amount.cents()))
            .exec(db)
            .await?;
        if result.rows_affected == 0 {
            return Err(LedgerError::InsufficientFunds(format!(
                "{} account balance is below {amount}",
                account.kind
            )));
        }
        Ok(())
    }
}
