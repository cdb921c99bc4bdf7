//! Append-only audit trail.
//!
//! One entry per mutating operation, written inside the same database
//! transaction as the balance change it describes. Entries are never
//! updated or deleted and are not a source of truth for balances.

use chrono::{DateTime, Utc};
use sea_orm::{ActiveValue, entity::prelude::*};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::LedgerError;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActivityType {
    UserSetPin,
    TransferInitiated,
    TransferCompleted,
    WalletTopUp,
    FundsCredited,
    FundsDebited,
    TransferReverted,
    TransactableToggled,
    AccountActivated,
    AccountDeactivated,
}

impl ActivityType {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::UserSetPin => "user_set_pin",
            Self::TransferInitiated => "transfer_initiated",
            Self::TransferCompleted => "transfer_completed",
            Self::WalletTopUp => "wallet_top_up",
            Self::FundsCredited => "funds_credited",
            Self::FundsDebited => "funds_debited",
            Self::TransferReverted => "transfer_reverted",
            Self::TransactableToggled => "transactable_toggled",
            Self::AccountActivated => "account_activated",
            Self::AccountDeactivated => "account_deactivated",
        }
    }
}

impl TryFrom<&str> for ActivityType {
    type Error = LedgerError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value {
            "user_set_pin" => Ok(Self::UserSetPin),
            "transfer_initiated" => Ok(Self::TransferInitiated),
            "transfer_completed" => Ok(Self::TransferCompleted),
            "wallet_top_up" => Ok(Self::WalletTopUp),
            "funds_credited" => Ok(Self::FundsCredited),
            "funds_debited" => Ok(Self::FundsDebited),
            "transfer_reverted" => Ok(Self::TransferReverted),
            "transactable_toggled" => Ok(Self::TransactableToggled),
            "account_activated" => Ok(Self::AccountActivated),
            "account_deactivated" => Ok(Self::AccountDeactivated),
            other => Err(LedgerError::InvalidKind(format!(
                "invalid activity type: {other}"
            ))),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActivityLog {
    pub id: Uuid,
    pub user_id: Option<Uuid>,
    pub user_email: String,
    pub activity_type: ActivityType,
    pub created_at: DateTime<Utc>,
    /// Human-readable description of what happened.
    pub details: String,
    /// Optional JSON snapshot of the request or record that caused the entry.
    pub data: Option<String>,
}

impl ActivityLog {
    pub fn new(
        user_id: Option<Uuid>,
        user_email: impl Into<String>,
        activity_type: ActivityType,
        details: impl Into<String>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            user_id,
            user_email: user_email.into(),
            activity_type,
            created_at: Utc::now(),
            details: details.into(),
            data: None,
        }
    }

    pub fn with_data(mut self, data: Option<String>) -> Self {
        self.data = data;
        self
    }
}

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "activity_logs")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,
    pub user_id: Option<String>,
    pub user_email: String,
    pub activity_type: String,
    pub created_at: DateTimeUtc,
    pub details: String,
    pub data: Option<String>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

impl From<&ActivityLog> for ActiveModel {
    fn from(entry: &ActivityLog) -> Self {
        Self {
            id: ActiveValue::Set(entry.id.to_string()),
            user_id: ActiveValue::Set(entry.user_id.map(|id| id.to_string())),
            user_email: ActiveValue::Set(entry.user_email.clone()),
            activity_type: ActiveValue::Set(entry.activity_type.as_str().to_string()),
            created_at: ActiveValue::Set(entry.created_at),
            details: ActiveValue::Set(entry.details.clone()),
            data: ActiveValue::Set(entry.data.clone()),
        }
    }
}

impl TryFrom<Model> for ActivityLog {
    type Error = LedgerError;

    fn try_from(model: Model) -> Result<Self, Self::Error> {
        Ok(Self {
            id: Uuid::parse_str(&model.id)
                .map_err(|_| LedgerError::KeyNotFound("activity log not exists".to_string()))?,
            user_id: model.user_id.and_then(|s| Uuid::parse_str(&s).ok()),
            user_email: model.user_email,
            activity_type: ActivityType::try_from(model.activity_type.as_str())?,
            created_at: model.created_at,
            details: model.details,
            data: model.data,
        })
    }
}
