use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Which of the user's three balance buckets a request targets.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AccountKind {
    Wallet,
    Ledger,
    Usd,
}

impl AccountKind {
    /// Returns the canonical kind string used by the engine/database.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Wallet => "wallet",
            Self::Ledger => "ledger",
            Self::Usd => "usd",
        }
    }
}

pub mod account {
    use super::*;

    #[derive(Debug, Serialize, Deserialize)]
    pub struct BalanceGet {
        pub kind: AccountKind,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct Balance {
        pub kind: AccountKind,
        /// Balance in cents.
        pub balance_minor: i64,
        /// Human-readable USD rendering, e.g. `$12.34`.
        pub balance: String,
    }
}

pub mod user {
    use super::*;

    #[derive(Debug, Serialize, Deserialize)]
    pub struct SetPin {
        pub pin: String,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct SetTransactable {
        pub enabled: bool,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct SetActive {
        pub active: bool,
    }

    /// Admin-facing view of a user and all three balances.
    #[derive(Debug, Serialize, Deserialize)]
    pub struct UserOverview {
        pub id: Uuid,
        pub email: String,
        pub full_name: String,
        pub can_transact: bool,
        pub is_active: bool,
        pub has_pin: bool,
        pub wallet_balance_minor: i64,
        pub ledger_balance_minor: i64,
        pub usd_balance_minor: i64,
    }
}

pub mod transaction {
    use super::*;

    /// User-requestable transfer kinds. Internal moves and admin
    /// adjustments have their own endpoints.
    #[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
    #[serde(rename_all = "snake_case")]
    pub enum TransferFlavor {
        Transfer,
        WireTransfer,
        BitcoinTransfer,
    }

    impl TransferFlavor {
        pub fn as_str(self) -> &'static str {
            match self {
                Self::Transfer => "transfer",
                Self::WireTransfer => "wire_transfer",
                Self::BitcoinTransfer => "bitcoin_transfer",
            }
        }
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct TransferNew {
        pub source_kind: AccountKind,
        /// Amount in cents, must be positive.
        pub amount_minor: i64,
        pub destination_address: String,
        pub details: Option<String>,
        /// One-time code issued by the initiate step.
        pub code: String,
        pub pin: String,
        pub flavor: TransferFlavor,
        /// Set for bitcoin transfers.
        pub coin_type: Option<String>,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct TopUpNew {
        pub from_kind: AccountKind,
        pub to_kind: AccountKind,
        pub amount_minor: i64,
        pub code: String,
        pub pin: String,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct InitiateTransfer {
        /// Where the one-time code was sent.
        pub sent_to: String,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct Transaction {
        pub id: Uuid,
        pub sender_user_id: Option<Uuid>,
        /// Denormalized from the sending user, when one exists.
        pub sender_name: Option<String>,
        pub sender_email: Option<String>,
        pub amount_minor: i64,
        pub created_at: DateTime<Utc>,
        pub modified_at: Option<DateTime<Utc>>,
        pub status: String,
        pub kind: String,
        pub source_kind: AccountKind,
        pub destination_kind: Option<AccountKind>,
        pub destination_address: Option<String>,
        pub details: Option<String>,
        pub coin_type: Option<String>,
    }
}

pub mod activity {
    use super::*;

    #[derive(Debug, Serialize, Deserialize)]
    pub struct Activity {
        pub id: Uuid,
        pub user_id: Option<Uuid>,
        pub user_email: String,
        pub activity_type: String,
        pub created_at: DateTime<Utc>,
        pub details: String,
        /// JSON snapshot of the record that caused the entry, when one exists.
        pub data: Option<String>,
    }
}

pub mod admin {
    use super::*;

    /// Body for admin credit and debit endpoints.
    #[derive(Debug, Serialize, Deserialize)]
    pub struct Adjustment {
        pub user_id: Uuid,
        pub kind: AccountKind,
        pub amount_minor: i64,
    }
}
