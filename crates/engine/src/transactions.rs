//! Transaction primitives.
//!
//! A `Transaction` is the append-only record of one attempted value
//! movement. Once created it is immutable except for the
//! status/modified-timestamp transition performed by a reversal.

use chrono::{DateTime, Utc};
use sea_orm::{ActiveValue, entity::prelude::*};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{AccountKind, LedgerError, MoneyCents, ResultEngine};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransactionKind {
    /// External-style transfer to a free-text address.
    Transfer,
    /// Internal move between two of the same user's accounts.
    WalletTransfer,
    WireTransfer,
    BitcoinTransfer,
    /// Admin credit.
    Addition,
    /// Admin debit.
    Deduction,
}

impl TransactionKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Transfer => "transfer",
            Self::WalletTransfer => "wallet_transfer",
            Self::WireTransfer => "wire_transfer",
            Self::BitcoinTransfer => "bitcoin_transfer",
            Self::Addition => "addition",
            Self::Deduction => "deduction",
        }
    }

    /// Whether the recorded amount was debited from the source account.
    ///
    /// Everything but an admin credit debits the source; reversal undoes
    /// exactly this direction.
    pub fn debits_source(self) -> bool {
        !matches!(self, Self::Addition)
    }

    /// The external-style transfer flavors a user may request.
    pub fn is_transfer_flavor(self) -> bool {
        matches!(self, Self::Transfer | Self::WireTransfer | Self::BitcoinTransfer)
    }
}

impl TryFrom<&str> for TransactionKind {
    type Error = LedgerError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value {
            "transfer" => Ok(Self::Transfer),
            "wallet_transfer" => Ok(Self::WalletTransfer),
            "wire_transfer" => Ok(Self::WireTransfer),
            "bitcoin_transfer" => Ok(Self::BitcoinTransfer),
            "addition" => Ok(Self::Addition),
            "deduction" => Ok(Self::Deduction),
            other => Err(LedgerError::InvalidKind(format!(
                "invalid transaction kind: {other}"
            ))),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransactionStatus {
    Successful,
    Reverted,
    Failed,
    Pending,
}

impl TransactionStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Successful => "successful",
            Self::Reverted => "reverted",
            Self::Failed => "failed",
            Self::Pending => "pending",
        }
    }
}

impl TryFrom<&str> for TransactionStatus {
    type Error = LedgerError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value {
            "successful" => Ok(Self::Successful),
            "reverted" => Ok(Self::Reverted),
            "failed" => Ok(Self::Failed),
            "pending" => Ok(Self::Pending),
            other => Err(LedgerError::InvalidKind(format!(
                "invalid transaction status: {other}"
            ))),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transaction {
    pub id: Uuid,
    /// The user whose account funded (or received, for admin credits) the
    /// movement. Nullable in storage for adjustments not tied to a user
    /// action; every engine write sets it.
    pub sender_user_id: Option<Uuid>,
    /// Magnitude moved at creation time, always positive.
    pub amount: MoneyCents,
    pub created_at: DateTime<Utc>,
    pub modified_at: Option<DateTime<Utc>>,
    pub status: TransactionStatus,
    pub kind: TransactionKind,
    pub source_kind: AccountKind,
    /// Set only for internal moves between two of the sender's accounts.
    pub destination_kind: Option<AccountKind>,
    pub destination_address: Option<String>,
    pub details: Option<String>,
    pub coin_type: Option<String>,
}

impl Transaction {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        sender_user_id: Uuid,
        amount: MoneyCents,
        kind: TransactionKind,
        source_kind: AccountKind,
        destination_kind: Option<AccountKind>,
        destination_address: Option<String>,
        details: Option<String>,
        coin_type: Option<String>,
    ) -> ResultEngine<Self> {
        if !amount.is_positive() {
            return Err(LedgerError::InvalidAmount(
                "amount must be > 0".to_string(),
            ));
        }
        Ok(Self {
            id: Uuid::new_v4(),
            sender_user_id: Some(sender_user_id),
            amount,
            created_at: Utc::now(),
            modified_at: None,
            status: TransactionStatus::Successful,
            kind,
            source_kind,
            destination_kind,
            destination_address,
            details,
            coin_type,
        })
    }
}

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "transactions")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,
    pub sender_user_id: Option<String>,
    pub amount_minor: i64,
    pub created_at: DateTimeUtc,
    pub modified_at: Option<DateTimeUtc>,
    pub status: String,
    pub kind: String,
    pub source_kind: String,
    pub destination_kind: Option<String>,
    pub destination_address: Option<String>,
    pub details: Option<String>,
    pub coin_type: Option<String>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::users::Entity",
        from = "Column::SenderUserId",
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

impl From<&Transaction> for ActiveModel {
    fn from(tx: &Transaction) -> Self {
        Self {
            id: ActiveValue::Set(tx.id.to_string()),
            sender_user_id: ActiveValue::Set(tx.sender_user_id.map(|id| id.to_string())),
            amount_minor: ActiveValue::Set(tx.amount.cents()),
            created_at: ActiveValue::Set(tx.created_at),
            modified_at: ActiveValue::Set(tx.modified_at),
            status: ActiveValue::Set(tx.status.as_str().to_string()),
            kind: ActiveValue::Set(tx.kind.as_str().to_string()),
            source_kind: ActiveValue::Set(tx.source_kind.as_str().to_string()),
            destination_kind: ActiveValue::Set(
                tx.destination_kind.map(|kind| kind.as_str().to_string()),
            ),
            destination_address: ActiveValue::Set(tx.destination_address.clone()),
            details: ActiveValue::Set(tx.details.clone()),
            coin_type: ActiveValue::Set(tx.coin_type.clone()),
        }
    }
}

impl TryFrom<Model> for Transaction {
    type Error = LedgerError;

    fn try_from(model: Model) -> Result<Self, Self::Error> {
        Ok(Self {
            id: Uuid::parse_str(&model.id)
                .map_err(|_| LedgerError::KeyNotFound("transaction not exists".to_string()))?,
            sender_user_id: model
                .sender_user_id
                .and_then(|s| Uuid::parse_str(&s).ok()),
            amount: MoneyCents::new(model.amount_minor),
            created_at: model.created_at,
            modified_at: model.modified_at,
            status: TransactionStatus::try_from(model.status.as_str())?,
            kind: TransactionKind::try_from(model.kind.as_str())?,
            source_kind: AccountKind::try_from(model.source_kind.as_str())?,
            destination_kind: model
                .destination_kind
                .as_deref()
                .map(AccountKind::try_from)
                .transpose()?,
            destination_address: model.destination_address,
            details: model.details,
            coin_type: model.coin_type,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_non_positive_amounts() {
        for cents in [0, -100] {
            let result = Transaction::new(
                Uuid::new_v4(),
                MoneyCents::new(cents),
                TransactionKind::Transfer,
                AccountKind::Wallet,
                None,
                Some("addr".to_string()),
                None,
                None,
            );
            assert!(result.is_err());
        }
    }

    #[test]
    fn addition_is_the_only_credit_kind() {
        assert!(!TransactionKind::Addition.debits_source());
        assert!(TransactionKind::Deduction.debits_source());
        assert!(TransactionKind::Transfer.debits_source());
        assert!(TransactionKind::WalletTransfer.debits_source());
    }
}
