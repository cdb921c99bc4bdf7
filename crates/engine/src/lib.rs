pub use accounts::{Account, AccountKind};
pub use activity_log::{ActivityLog, ActivityType};
pub use error::LedgerError;
pub use money::MoneyCents;
pub use ops::{Engine, EngineBuilder, UserOverview};
pub use otp::ChallengeVerifier;
pub use transactions::{Transaction, TransactionKind, TransactionStatus};
pub use users::Role;

pub mod accounts;
pub mod activity_log;
mod error;
mod money;
mod ops;
mod otp;
mod pin;
pub mod transactions;
pub mod users;

type ResultEngine<T> = Result<T, LedgerError>;
