//! Account primitives.
//!
//! Every user owns exactly one account of each [`AccountKind`]. The three
//! kinds share one table keyed by `(user_id, kind)` and one mutation path,
//! instead of three parallel code paths per operation.

use sea_orm::{ActiveValue, entity::prelude::*};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{LedgerError, MoneyCents, ResultEngine};

/// The three balance buckets a user owns.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AccountKind {
    Wallet,
    Ledger,
    Usd,
}

impl AccountKind {
    pub const ALL: [AccountKind; 3] = [Self::Wallet, Self::Ledger, Self::Usd];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Wallet => "wallet",
            Self::Ledger => "ledger",
            Self::Usd => "usd",
        }
    }
}

impl TryFrom<&str> for AccountKind {
    type Error = LedgerError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value {
            "wallet" => Ok(Self::Wallet),
            "ledger" => Ok(Self::Ledger),
            "usd" => Ok(Self::Usd),
            other => Err(LedgerError::InvalidKind(format!(
                "invalid account kind: {other}"
            ))),
        }
    }
}

/// A single balance bucket.
///
/// Created with balance 0 when the owning user is registered, mutated only
/// through the transfer and admin engines, never deleted. The non-negative
/// balance invariant is enforced at mutation time by the guarded debit
/// update, not by the storage layer.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Account {
    pub id: Uuid,
    pub user_id: Uuid,
    pub kind: AccountKind,
    pub balance: MoneyCents,
}

impl Account {
    pub fn new(user_id: Uuid, kind: AccountKind) -> Self {
        Self {
            id: Uuid::new_v4(),
            user_id,
            kind,
            balance: MoneyCents::ZERO,
        }
    }
}

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "accounts")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,
    pub user_id: String,
    pub kind: String,
    pub balance_minor: i64,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::users::Entity",
        from = "Column::UserId",
        to = "super::users::Column::Id",
        on_update = "NoAction",
        on_delete = "NoAction"
    )]
    Users,
}

impl Related<super::users::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Users.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl From<&Account> for ActiveModel {
    fn from(account: &Account) -> Self {
        Self {
            id: ActiveValue::Set(account.id.to_string()),
            user_id: ActiveValue::Set(account.user_id.to_string()),
            kind: ActiveValue::Set(account.kind.as_str().to_string()),
            balance_minor: ActiveValue::Set(account.balance.cents()),
        }
    }
}

impl TryFrom<Model> for Account {
    type Error = LedgerError;

    fn try_from(model: Model) -> ResultEngine<Self> {
        Ok(Self {
            id: Uuid::parse_str(&model.id)
                .map_err(|_| LedgerError::KeyNotFound("account not exists".to_string()))?,
            user_id: Uuid::parse_str(&model.user_id)
                .map_err(|_| LedgerError::KeyNotFound("account owner not exists".to_string()))?,
            kind: AccountKind::try_from(model.kind.as_str())?,
            balance: MoneyCents::new(model.balance_minor),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kind_parses_back() {
        for kind in AccountKind::ALL {
            assert_eq!(AccountKind::try_from(kind.as_str()).unwrap(), kind);
        }
        assert!(AccountKind::try_from("checking").is_err());
    }

    #[test]
    fn new_account_starts_empty() {
        let account = Account::new(Uuid::new_v4(), AccountKind::Usd);
        assert!(account.balance.is_zero());
    }
}
