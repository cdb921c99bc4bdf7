use chrono::{Duration, Utc};
use sea_orm::{Database, DatabaseConnection};
use uuid::Uuid;

use engine::{AccountKind, Engine, LedgerError, MoneyCents, Role, TransactionKind, TransactionStatus};
use migration::MigratorTrait;

async fn engine_with_user() -> (Engine, DatabaseConnection, Uuid) {
    let db = Database::connect("sqlite::memory:").await.unwrap();
    migration::Migrator::up(&db, None).await.unwrap();

    let engine = Engine::builder().database(db.clone()).build();
    let user_id = engine
        .create_user("alice@example.com", "Alice", "password", Role::User)
        .await
        .unwrap();
    engine.set_pin(user_id, "1234").await.unwrap();

    (engine, db, user_id)
}

// sqlite::memory: pools do not share state across connections, so tests
// that need genuinely concurrent transactions go through a throwaway file.
async fn engine_with_file_user() -> (Engine, Uuid, std::path::PathBuf) {
    let root =
        std::path::PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("../../target/test_dbs");
    std::fs::create_dir_all(&root).unwrap();

    let path = root.join(format!("engine_{}.db", Uuid::new_v4()));
    let url = format!("sqlite:{}?mode=rwc", path.display());

    let db = Database::connect(&url).await.unwrap();
    migration::Migrator::up(&db, None).await.unwrap();

    let engine = Engine::builder().database(db).build();
    let user_id = engine
        .create_user("alice@example.com", "Alice", "password", Role::User)
        .await
        .unwrap();
    engine.set_pin(user_id, "1234").await.unwrap();

    (engine, user_id, path)
}

fn current_code(engine: &Engine) -> String {
    engine.challenge().generate("alice@example.com", Utc::now())
}

#[tokio::test]
async fn transfer_debits_only_the_source_account() {
    let (engine, _db, user_id) = engine_with_user().await;
    engine
        .credit(user_id, AccountKind::Wallet, MoneyCents::new(10_000))
        .await
        .unwrap();

    let code = current_code(&engine);
    let tx = engine
        .execute_transfer(
            user_id,
            AccountKind::Wallet,
            MoneyCents::new(3_000),
            "acct-992",
            Some("rent"),
            &code,
            "1234",
            TransactionKind::Transfer,
            None,
        )
        .await
        .unwrap();

    assert_eq!(tx.status, TransactionStatus::Successful);
    assert_eq!(tx.kind, TransactionKind::Transfer);
    assert_eq!(
        engine.balance(user_id, AccountKind::Wallet).await.unwrap(),
        MoneyCents::new(7_000)
    );
    assert_eq!(
        engine.balance(user_id, AccountKind::Ledger).await.unwrap(),
        MoneyCents::ZERO
    );
    assert_eq!(
        engine.balance(user_id, AccountKind::Usd).await.unwrap(),
        MoneyCents::ZERO
    );

    // admin credit + transfer
    let history = engine.list_transactions(user_id).await.unwrap();
    assert_eq!(history.len(), 2);
}

#[tokio::test]
async fn insufficient_balance_writes_nothing() {
    let (engine, _db, user_id) = engine_with_user().await;

    let code = current_code(&engine);
    let err = engine
        .execute_transfer(
            user_id,
            AccountKind::Wallet,
            MoneyCents::new(5_000),
            "acct-1",
            None,
            &code,
            "1234",
            TransactionKind::WireTransfer,
            None,
        )
        .await
        .unwrap_err();
    assert!(matches!(err, LedgerError::InsufficientFunds(_)));

    assert!(engine.list_transactions(user_id).await.unwrap().is_empty());
    // set_pin wrote the only activity entry
    assert_eq!(engine.list_activities().await.unwrap().len(), 1);
}

#[tokio::test]
async fn revert_restores_the_balance_once() {
    let (engine, _db, user_id) = engine_with_user().await;
    engine
        .credit(user_id, AccountKind::Wallet, MoneyCents::new(10_000))
        .await
        .unwrap();

    let code = current_code(&engine);
    let tx = engine
        .execute_transfer(
            user_id,
            AccountKind::Wallet,
            MoneyCents::new(3_000),
            "acct-992",
            None,
            &code,
            "1234",
            TransactionKind::Transfer,
            None,
        )
        .await
        .unwrap();

    let reverted = engine
        .revert_transaction(tx.id, "admin@example.com")
        .await
        .unwrap();
    assert_eq!(reverted.status, TransactionStatus::Reverted);
    assert!(reverted.modified_at.is_some());
    assert_eq!(
        engine.balance(user_id, AccountKind::Wallet).await.unwrap(),
        MoneyCents::new(10_000)
    );

    let err = engine
        .revert_transaction(tx.id, "admin@example.com")
        .await
        .unwrap_err();
    assert!(matches!(err, LedgerError::AlreadyReverted(_)));
    assert_eq!(
        engine.balance(user_id, AccountKind::Wallet).await.unwrap(),
        MoneyCents::new(10_000)
    );
}

#[tokio::test]
async fn concurrent_reverts_credit_the_source_once() {
    let (engine, user_id, path) = engine_with_file_user().await;
    engine
        .credit(user_id, AccountKind::Wallet, MoneyCents::new(10_000))
        .await
        .unwrap();

    let code = current_code(&engine);
    let tx = engine
        .execute_transfer(
            user_id,
            AccountKind::Wallet,
            MoneyCents::new(3_000),
            "acct-992",
            None,
            &code,
            "1234",
            TransactionKind::Transfer,
            None,
        )
        .await
        .unwrap();

    // Two admins hit revert at the same time; the status flip admits one.
    // The loser's error depends on interleaving (conflict or a busy
    // database), so only the success count and the balance are asserted.
    let (first, second) = tokio::join!(
        engine.revert_transaction(tx.id, "admin@example.com"),
        engine.revert_transaction(tx.id, "root@example.com"),
    );
    let successes = [&first, &second].iter().filter(|r| r.is_ok()).count();
    assert_eq!(successes, 1);
    assert_eq!(
        engine.balance(user_id, AccountKind::Wallet).await.unwrap(),
        MoneyCents::new(10_000)
    );

    std::fs::remove_file(path).ok();
}

#[tokio::test]
async fn concurrent_transfers_cannot_share_a_code() {
    let (engine, user_id, path) = engine_with_file_user().await;
    engine
        .credit(user_id, AccountKind::Wallet, MoneyCents::new(10_000))
        .await
        .unwrap();

    let code = current_code(&engine);
    let (first, second) = tokio::join!(
        engine.execute_transfer(
            user_id,
            AccountKind::Wallet,
            MoneyCents::new(1_000),
            "acct-1",
            None,
            &code,
            "1234",
            TransactionKind::Transfer,
            None,
        ),
        engine.execute_transfer(
            user_id,
            AccountKind::Wallet,
            MoneyCents::new(1_000),
            "acct-2",
            None,
            &code,
            "1234",
            TransactionKind::Transfer,
            None,
        ),
    );
    let successes = [&first, &second].iter().filter(|r| r.is_ok()).count();
    assert_eq!(successes, 1);
    assert_eq!(
        engine.balance(user_id, AccountKind::Wallet).await.unwrap(),
        MoneyCents::new(9_000)
    );

    std::fs::remove_file(path).ok();
}

#[tokio::test]
async fn top_up_moves_between_own_accounts_and_reverts() {
    let (engine, _db, user_id) = engine_with_user().await;
    engine
        .credit(user_id, AccountKind::Usd, MoneyCents::new(5_000))
        .await
        .unwrap();

    let code = current_code(&engine);
    let tx = engine
        .top_up_wallet(
            user_id,
            AccountKind::Usd,
            AccountKind::Wallet,
            MoneyCents::new(2_000),
            &code,
            "1234",
        )
        .await
        .unwrap();
    assert_eq!(tx.kind, TransactionKind::WalletTransfer);
    assert_eq!(tx.destination_kind, Some(AccountKind::Wallet));
    assert_eq!(
        engine.balance(user_id, AccountKind::Usd).await.unwrap(),
        MoneyCents::new(3_000)
    );
    assert_eq!(
        engine.balance(user_id, AccountKind::Wallet).await.unwrap(),
        MoneyCents::new(2_000)
    );

    engine
        .revert_transaction(tx.id, "admin@example.com")
        .await
        .unwrap();
    assert_eq!(
        engine.balance(user_id, AccountKind::Usd).await.unwrap(),
        MoneyCents::new(5_000)
    );
    assert_eq!(
        engine.balance(user_id, AccountKind::Wallet).await.unwrap(),
        MoneyCents::ZERO
    );
}

#[tokio::test]
async fn top_up_rejects_same_source_and_destination() {
    let (engine, _db, user_id) = engine_with_user().await;

    let code = current_code(&engine);
    let err = engine
        .top_up_wallet(
            user_id,
            AccountKind::Wallet,
            AccountKind::Wallet,
            MoneyCents::new(100),
            &code,
            "1234",
        )
        .await
        .unwrap_err();
    assert!(matches!(err, LedgerError::InvalidKind(_)));
}

#[tokio::test]
async fn admin_credit_and_debit_round_trip() {
    let (engine, _db, user_id) = engine_with_user().await;

    engine
        .credit(user_id, AccountKind::Ledger, MoneyCents::new(2_500))
        .await
        .unwrap();
    engine
        .debit(user_id, AccountKind::Ledger, MoneyCents::new(1_000))
        .await
        .unwrap();

    assert_eq!(
        engine.balance(user_id, AccountKind::Ledger).await.unwrap(),
        MoneyCents::new(1_500)
    );
    assert_eq!(engine.list_all_transactions().await.unwrap().len(), 2);

    let activities = engine.list_activities().await.unwrap();
    let details: Vec<&str> = activities.iter().map(|a| a.details.as_str()).collect();
    assert!(details.iter().any(|d| d.contains("Funds added")));
    assert!(details.iter().any(|d| d.contains("Funds deducted")));
}

#[tokio::test]
async fn admin_debit_fails_on_insufficient_funds() {
    let (engine, _db, user_id) = engine_with_user().await;
    engine
        .credit(user_id, AccountKind::Usd, MoneyCents::new(500))
        .await
        .unwrap();

    let err = engine
        .debit(user_id, AccountKind::Usd, MoneyCents::new(1_000))
        .await
        .unwrap_err();
    assert!(matches!(err, LedgerError::InsufficientFunds(_)));
    assert_eq!(
        engine.balance(user_id, AccountKind::Usd).await.unwrap(),
        MoneyCents::new(500)
    );
}

#[tokio::test]
async fn transfer_rejects_wrong_and_expired_codes() {
    let (engine, _db, user_id) = engine_with_user().await;
    engine
        .credit(user_id, AccountKind::Wallet, MoneyCents::new(10_000))
        .await
        .unwrap();

    let err = engine
        .execute_transfer(
            user_id,
            AccountKind::Wallet,
            MoneyCents::new(100),
            "acct-1",
            None,
            "000000",
            "1234",
            TransactionKind::Transfer,
            None,
        )
        .await
        .unwrap_err();
    assert!(matches!(err, LedgerError::InvalidCode(_)));

    let stale = engine
        .challenge()
        .generate("alice@example.com", Utc::now() - Duration::seconds(600));
    let err = engine
        .execute_transfer(
            user_id,
            AccountKind::Wallet,
            MoneyCents::new(100),
            "acct-1",
            None,
            &stale,
            "1234",
            TransactionKind::Transfer,
            None,
        )
        .await
        .unwrap_err();
    assert!(matches!(err, LedgerError::InvalidCode(_)));

    assert_eq!(
        engine.balance(user_id, AccountKind::Wallet).await.unwrap(),
        MoneyCents::new(10_000)
    );
}

#[tokio::test]
async fn code_authorizes_a_single_transfer() {
    let (engine, _db, user_id) = engine_with_user().await;
    engine
        .credit(user_id, AccountKind::Wallet, MoneyCents::new(10_000))
        .await
        .unwrap();

    let code = current_code(&engine);
    engine
        .execute_transfer(
            user_id,
            AccountKind::Wallet,
            MoneyCents::new(1_000),
            "acct-1",
            None,
            &code,
            "1234",
            TransactionKind::Transfer,
            None,
        )
        .await
        .unwrap();

    let err = engine
        .execute_transfer(
            user_id,
            AccountKind::Wallet,
            MoneyCents::new(1_000),
            "acct-1",
            None,
            &code,
            "1234",
            TransactionKind::Transfer,
            None,
        )
        .await
        .unwrap_err();
    assert!(matches!(err, LedgerError::InvalidCode(_)));
    assert_eq!(
        engine.balance(user_id, AccountKind::Wallet).await.unwrap(),
        MoneyCents::new(9_000)
    );
}

#[tokio::test]
async fn disabled_users_cannot_transfer() {
    let (engine, _db, user_id) = engine_with_user().await;
    engine
        .credit(user_id, AccountKind::Wallet, MoneyCents::new(10_000))
        .await
        .unwrap();

    engine
        .set_transactable(user_id, false, "admin@example.com")
        .await
        .unwrap();
    let code = current_code(&engine);
    let err = engine
        .execute_transfer(
            user_id,
            AccountKind::Wallet,
            MoneyCents::new(100),
            "acct-1",
            None,
            &code,
            "1234",
            TransactionKind::Transfer,
            None,
        )
        .await
        .unwrap_err();
    assert!(matches!(err, LedgerError::AccountDisabled(_)));

    engine
        .set_transactable(user_id, true, "admin@example.com")
        .await
        .unwrap();
    engine
        .set_active(user_id, false, "admin@example.com")
        .await
        .unwrap();
    let code = current_code(&engine);
    let err = engine
        .execute_transfer(
            user_id,
            AccountKind::Wallet,
            MoneyCents::new(100),
            "acct-1",
            None,
            &code,
            "1234",
            TransactionKind::Transfer,
            None,
        )
        .await
        .unwrap_err();
    assert!(matches!(err, LedgerError::AccountDisabled(_)));

    assert_eq!(
        engine.balance(user_id, AccountKind::Wallet).await.unwrap(),
        MoneyCents::new(10_000)
    );
}

#[tokio::test]
async fn wrong_or_missing_pin_is_rejected() {
    let (engine, _db, user_id) = engine_with_user().await;
    engine
        .credit(user_id, AccountKind::Wallet, MoneyCents::new(10_000))
        .await
        .unwrap();

    let code = current_code(&engine);
    let err = engine
        .execute_transfer(
            user_id,
            AccountKind::Wallet,
            MoneyCents::new(100),
            "acct-1",
            None,
            &code,
            "9999",
            TransactionKind::Transfer,
            None,
        )
        .await
        .unwrap_err();
    assert!(matches!(err, LedgerError::IncorrectPin));

    let no_pin_id = engine
        .create_user("bob@example.com", "Bob", "password", Role::User)
        .await
        .unwrap();
    engine
        .credit(no_pin_id, AccountKind::Wallet, MoneyCents::new(1_000))
        .await
        .unwrap();
    let code = engine.challenge().generate("bob@example.com", Utc::now());
    let err = engine
        .execute_transfer(
            no_pin_id,
            AccountKind::Wallet,
            MoneyCents::new(100),
            "acct-1",
            None,
            &code,
            "1234",
            TransactionKind::Transfer,
            None,
        )
        .await
        .unwrap_err();
    assert!(matches!(err, LedgerError::IncorrectPin));
}

#[tokio::test]
async fn reverting_an_admin_credit_debits_the_account() {
    let (engine, _db, user_id) = engine_with_user().await;

    let credit = engine
        .credit(user_id, AccountKind::Usd, MoneyCents::new(4_000))
        .await
        .unwrap();
    engine
        .revert_transaction(credit.id, "admin@example.com")
        .await
        .unwrap();
    assert_eq!(
        engine.balance(user_id, AccountKind::Usd).await.unwrap(),
        MoneyCents::ZERO
    );

    // spend the credit first, then the revert has nothing left to take back
    let spent = engine
        .credit(user_id, AccountKind::Usd, MoneyCents::new(2_000))
        .await
        .unwrap();
    engine
        .debit(user_id, AccountKind::Usd, MoneyCents::new(1_500))
        .await
        .unwrap();
    let err = engine
        .revert_transaction(spent.id, "admin@example.com")
        .await
        .unwrap_err();
    assert!(matches!(err, LedgerError::InsufficientFunds(_)));
}

#[tokio::test]
async fn revert_rejects_unknown_transactions() {
    let (engine, _db, _user_id) = engine_with_user().await;

    let err = engine
        .revert_transaction(Uuid::new_v4(), "admin@example.com")
        .await
        .unwrap_err();
    assert!(matches!(err, LedgerError::KeyNotFound(_)));
}

#[tokio::test]
async fn transfer_rejects_non_transfer_kinds() {
    let (engine, _db, user_id) = engine_with_user().await;

    let code = current_code(&engine);
    let err = engine
        .execute_transfer(
            user_id,
            AccountKind::Wallet,
            MoneyCents::new(100),
            "acct-1",
            None,
            &code,
            "1234",
            TransactionKind::Addition,
            None,
        )
        .await
        .unwrap_err();
    assert!(matches!(err, LedgerError::InvalidKind(_)));
}

#[tokio::test]
async fn overview_reports_flags_and_balances() {
    let (engine, _db, user_id) = engine_with_user().await;
    engine
        .credit(user_id, AccountKind::Wallet, MoneyCents::new(1_200))
        .await
        .unwrap();
    engine
        .credit(user_id, AccountKind::Usd, MoneyCents::new(300))
        .await
        .unwrap();

    let overview = engine.user_overview(user_id).await.unwrap();
    assert_eq!(overview.email, "alice@example.com");
    assert!(overview.has_pin);
    assert!(overview.can_transact);
    assert_eq!(overview.wallet_balance, MoneyCents::new(1_200));
    assert_eq!(overview.ledger_balance, MoneyCents::ZERO);
    assert_eq!(overview.usd_balance, MoneyCents::new(300));

    let users = engine.list_users().await.unwrap();
    assert_eq!(users.len(), 1);
}

#[tokio::test]
async fn duplicate_email_is_rejected() {
    let (engine, _db, _user_id) = engine_with_user().await;

    let err = engine
        .create_user("Alice@Example.com", "Alice Again", "password", Role::User)
        .await
        .unwrap_err();
    assert!(matches!(err, LedgerError::ExistingKey(_)));
}
