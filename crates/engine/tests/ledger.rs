//! End-to-end ledger scenarios against a real (in-memory or file-backed)
//! SQLite database, with the schema applied by the migration crate.

use std::time::Duration;

use chrono::Utc;
use engine::{
    Currency, Engine, EngineError, ExchangeCmd, ListTransactionsCmd, Money, Rate, RateProvider,
    TransactionKind, TransferCmd,
};
use migration::{Migrator, MigratorTrait};
use sea_orm::{ConnectOptions, ConnectionTrait, Database, DatabaseConnection, Statement};
use uuid::Uuid;

/// One connection only: every handle to `sqlite::memory:` is its own database,
/// so the pool must never hand out a second one.
async fn connect_memory() -> DatabaseConnection {
    let mut options = ConnectOptions::new("sqlite::memory:");
    options.max_connections(1);
    let db = Database::connect(options).await.unwrap();
    Migrator::up(&db, None).await.unwrap();
    db
}

async fn engine_with_db() -> (Engine, DatabaseConnection) {
    let db = connect_memory().await;
    seed_users(&db).await;
    let engine = Engine::builder().database(db.clone()).build().await.unwrap();
    (engine, db)
}

/// File-backed variant for tests that need genuinely concurrent connections.
async fn engine_with_file_db(path: &str) -> (Engine, DatabaseConnection) {
    let mut options = ConnectOptions::new(format!("sqlite://{path}?mode=rwc"));
    options
        .max_connections(4)
        .acquire_timeout(Duration::from_secs(10));
    let db = Database::connect(options).await.unwrap();
    Migrator::up(&db, None).await.unwrap();
    seed_users(&db).await;
    let engine = Engine::builder().database(db.clone()).build().await.unwrap();
    (engine, db)
}

async fn seed_users(db: &DatabaseConnection) {
    for (username, email) in [("alice", "alice@example.com"), ("bob", "bob@example.com")] {
        let stmt = Statement::from_sql_and_values(
            db.get_database_backend(),
            "INSERT INTO users (username, password, email) VALUES (?, ?, ?)",
            [username.into(), "hunter2".into(), email.into()],
        );
        db.execute(stmt).await.unwrap();
    }
}

/// Funds an account the way an external deposit would: one transaction row,
/// one CREDIT posting and the matching balance bump, so that per-account
/// reconciliation still holds afterwards.
async fn fund_account(db: &DatabaseConnection, account_id: Uuid, amount_minor: i64) {
    let backend = db.get_database_backend();
    let tx_id = Uuid::new_v4().to_string();
    let now = Utc::now();

    let stmt = Statement::from_sql_and_values(
        backend,
        "INSERT INTO transactions \
         (id, from_account_id, to_account_id, amount_minor, currency, kind, created_at) \
         SELECT ?, NULL, id, ?, currency, 'TRANSFER', ? FROM accounts WHERE id = ?",
        [
            tx_id.clone().into(),
            amount_minor.into(),
            now.into(),
            account_id.to_string().into(),
        ],
    );
    db.execute(stmt).await.unwrap();

    let stmt = Statement::from_sql_and_values(
        backend,
        "INSERT INTO postings \
         (id, account_id, transaction_id, amount_minor, entry_kind, created_at) \
         VALUES (?, ?, ?, ?, 'CREDIT', ?)",
        [
            Uuid::new_v4().to_string().into(),
            account_id.to_string().into(),
            tx_id.into(),
            amount_minor.into(),
            now.into(),
        ],
    );
    db.execute(stmt).await.unwrap();

    let stmt = Statement::from_sql_and_values(
        backend,
        "UPDATE accounts SET balance_minor = balance_minor + ? WHERE id = ?",
        [amount_minor.into(), account_id.to_string().into()],
    );
    db.execute(stmt).await.unwrap();
}

async fn transaction_count(db: &DatabaseConnection) -> i64 {
    let stmt = Statement::from_string(
        db.get_database_backend(),
        "SELECT COUNT(*) AS count FROM transactions".to_string(),
    );
    let row = db.query_one(stmt).await.unwrap().unwrap();
    row.try_get("", "count").unwrap()
}

#[tokio::test]
async fn open_account_is_unique_per_user_and_currency() {
    let (engine, _db) = engine_with_db().await;

    let account = engine.open_account("alice", Currency::Usd).await.unwrap();
    assert_eq!(account.balance, Money::ZERO);
    assert_eq!(account.currency, Currency::Usd);

    let err = engine.open_account("alice", Currency::Usd).await.unwrap_err();
    assert!(matches!(err, EngineError::ExistingKey(_)));

    // A second currency for the same user is fine.
    engine.open_account("alice", Currency::Eur).await.unwrap();
    let accounts = engine.accounts_for_user("alice").await.unwrap();
    assert_eq!(accounts.len(), 2);
}

#[tokio::test]
async fn transfer_moves_funds_and_writes_posting_pair() {
    let (engine, db) = engine_with_db().await;
    let from = engine.open_account("alice", Currency::Usd).await.unwrap();
    let to = engine.open_account("bob", Currency::Usd).await.unwrap();
    fund_account(&db, from.id, 100_000).await;
    fund_account(&db, to.id, 50_000).await;

    let tx = engine
        .transfer(TransferCmd {
            from_account_id: from.id,
            to_account_id: to.id,
            amount_minor: 25_000,
            currency: Currency::Usd,
        })
        .await
        .unwrap();

    assert_eq!(tx.kind, TransactionKind::Transfer);
    assert_eq!(tx.amount, Money::from_minor(25_000));
    assert_eq!(tx.postings.len(), 2);
    assert_eq!(tx.postings[0].amount, Money::from_minor(-25_000));
    assert_eq!(tx.postings[1].amount, Money::from_minor(25_000));

    assert_eq!(engine.account(from.id).await.unwrap().balance.minor(), 75_000);
    assert_eq!(engine.account(to.id).await.unwrap().balance.minor(), 75_000);

    // Both sides still reconcile against their postings.
    assert!(engine.verify_balance(from.id).await.unwrap().consistent);
    assert!(engine.verify_balance(to.id).await.unwrap().consistent);
}

#[tokio::test]
async fn transfer_rejects_non_positive_amounts() {
    let (engine, _db) = engine_with_db().await;
    let from = engine.open_account("alice", Currency::Usd).await.unwrap();
    let to = engine.open_account("bob", Currency::Usd).await.unwrap();

    for amount_minor in [0, -100] {
        let err = engine
            .transfer(TransferCmd {
                from_account_id: from.id,
                to_account_id: to.id,
                amount_minor,
                currency: Currency::Usd,
            })
            .await
            .unwrap_err();
        assert!(matches!(err, EngineError::InvalidAmount(_)));
    }
}

#[tokio::test]
async fn transfer_rejects_same_account() {
    let (engine, _db) = engine_with_db().await;
    let from = engine.open_account("alice", Currency::Usd).await.unwrap();

    let err = engine
        .transfer(TransferCmd {
            from_account_id: from.id,
            to_account_id: from.id,
            amount_minor: 100,
            currency: Currency::Usd,
        })
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::InvalidAccount(_)));
}

#[tokio::test]
async fn transfer_rejects_currency_mismatch_without_writing() {
    let (engine, db) = engine_with_db().await;
    let from = engine.open_account("alice", Currency::Usd).await.unwrap();
    let to = engine.open_account("bob", Currency::Eur).await.unwrap();
    fund_account(&db, from.id, 10_000).await;
    let before = transaction_count(&db).await;

    let err = engine
        .transfer(TransferCmd {
            from_account_id: from.id,
            to_account_id: to.id,
            amount_minor: 100,
            currency: Currency::Usd,
        })
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::InvalidAccount(_)));

    // Unknown destination behaves the same.
    let err = engine
        .transfer(TransferCmd {
            from_account_id: from.id,
            to_account_id: Uuid::new_v4(),
            amount_minor: 100,
            currency: Currency::Usd,
        })
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::InvalidAccount(_)));

    assert_eq!(transaction_count(&db).await, before);
    assert_eq!(engine.account(from.id).await.unwrap().balance.minor(), 10_000);
}

#[tokio::test]
async fn transfer_insufficient_funds_leaves_state_unchanged() {
    let (engine, db) = engine_with_db().await;
    let from = engine.open_account("alice", Currency::Usd).await.unwrap();
    let to = engine.open_account("bob", Currency::Usd).await.unwrap();
    fund_account(&db, from.id, 5_000).await;
    let before = transaction_count(&db).await;

    let err = engine
        .transfer(TransferCmd {
            from_account_id: from.id,
            to_account_id: to.id,
            amount_minor: 5_001,
            currency: Currency::Usd,
        })
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::InsufficientFunds(_)));

    assert_eq!(transaction_count(&db).await, before);
    assert_eq!(engine.account(from.id).await.unwrap().balance.minor(), 5_000);
    assert_eq!(engine.account(to.id).await.unwrap().balance.minor(), 0);

    // Spending the exact balance is allowed; zero is not negative.
    engine
        .transfer(TransferCmd {
            from_account_id: from.id,
            to_account_id: to.id,
            amount_minor: 5_000,
            currency: Currency::Usd,
        })
        .await
        .unwrap();
    assert_eq!(engine.account(from.id).await.unwrap().balance.minor(), 0);
}

#[tokio::test]
async fn exchange_converts_at_the_fixed_rate() {
    let (engine, db) = engine_with_db().await;
    let usd = engine.open_account("alice", Currency::Usd).await.unwrap();
    let eur = engine.open_account("alice", Currency::Eur).await.unwrap();
    fund_account(&db, usd.id, 100_000).await;

    let tx = engine
        .exchange(ExchangeCmd {
            user_id: "alice".to_string(),
            from_currency: Currency::Usd,
            to_currency: Currency::Eur,
            amount_minor: 10_000,
        })
        .await
        .unwrap();

    assert_eq!(tx.kind, TransactionKind::Exchange);
    // The record stores the source side; the credit posting carries the
    // converted amount.
    assert_eq!(tx.amount, Money::from_minor(10_000));
    assert_eq!(tx.currency, Currency::Usd);
    assert_eq!(tx.postings[0].amount, Money::from_minor(-10_000));
    assert_eq!(tx.postings[1].amount, Money::from_minor(9_200));

    assert_eq!(engine.account(usd.id).await.unwrap().balance.minor(), 90_000);
    assert_eq!(engine.account(eur.id).await.unwrap().balance.minor(), 9_200);
    assert!(engine.verify_balance(usd.id).await.unwrap().consistent);
    assert!(engine.verify_balance(eur.id).await.unwrap().consistent);
}

#[tokio::test]
async fn exchange_reverse_direction_uses_the_reciprocal() {
    let (engine, db) = engine_with_db().await;
    let usd = engine.open_account("alice", Currency::Usd).await.unwrap();
    let eur = engine.open_account("alice", Currency::Eur).await.unwrap();
    fund_account(&db, eur.id, 9_200).await;

    engine
        .exchange(ExchangeCmd {
            user_id: "alice".to_string(),
            from_currency: Currency::Eur,
            to_currency: Currency::Usd,
            amount_minor: 9_200,
        })
        .await
        .unwrap();

    // 92.00 EUR * 100/92 lands back on 100.00 USD exactly.
    assert_eq!(engine.account(eur.id).await.unwrap().balance.minor(), 0);
    assert_eq!(engine.account(usd.id).await.unwrap().balance.minor(), 10_000);
}

#[tokio::test]
async fn exchange_requires_both_currency_accounts() {
    let (engine, db) = engine_with_db().await;
    let usd = engine.open_account("alice", Currency::Usd).await.unwrap();
    fund_account(&db, usd.id, 10_000).await;

    let err = engine
        .exchange(ExchangeCmd {
            user_id: "alice".to_string(),
            from_currency: Currency::Usd,
            to_currency: Currency::Eur,
            amount_minor: 1_000,
        })
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::InvalidAccount(_)));
    assert_eq!(engine.account(usd.id).await.unwrap().balance.minor(), 10_000);
}

#[tokio::test]
async fn exchange_insufficient_funds_leaves_state_unchanged() {
    let (engine, db) = engine_with_db().await;
    let usd = engine.open_account("alice", Currency::Usd).await.unwrap();
    let eur = engine.open_account("alice", Currency::Eur).await.unwrap();
    fund_account(&db, usd.id, 5_000).await;
    let before = transaction_count(&db).await;

    let err = engine
        .exchange(ExchangeCmd {
            user_id: "alice".to_string(),
            from_currency: Currency::Usd,
            to_currency: Currency::Eur,
            amount_minor: 10_000,
        })
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::InsufficientFunds(_)));

    assert_eq!(transaction_count(&db).await, before);
    assert_eq!(engine.account(usd.id).await.unwrap().balance.minor(), 5_000);
    assert_eq!(engine.account(eur.id).await.unwrap().balance.minor(), 0);
}

/// Quotes every pair at 2:1, standing in for an external rate source.
#[derive(Debug)]
struct DoublingRates;

impl RateProvider for DoublingRates {
    fn rate(&self, _from: Currency, _to: Currency) -> Result<Rate, EngineError> {
        Rate::new(2, 1)
    }
}

#[tokio::test]
async fn exchange_uses_the_injected_rate_provider() {
    let db = connect_memory().await;
    seed_users(&db).await;
    let engine = Engine::builder()
        .database(db.clone())
        .rates(std::sync::Arc::new(DoublingRates))
        .build()
        .await
        .unwrap();

    let usd = engine.open_account("alice", Currency::Usd).await.unwrap();
    let eur = engine.open_account("alice", Currency::Eur).await.unwrap();
    fund_account(&db, usd.id, 10_000).await;

    engine
        .exchange(ExchangeCmd {
            user_id: "alice".to_string(),
            from_currency: Currency::Usd,
            to_currency: Currency::Eur,
            amount_minor: 10_000,
        })
        .await
        .unwrap();

    assert_eq!(engine.account(usd.id).await.unwrap().balance.minor(), 0);
    assert_eq!(engine.account(eur.id).await.unwrap().balance.minor(), 20_000);
}

#[tokio::test]
async fn sum_postings_tracks_every_movement() {
    let (engine, db) = engine_with_db().await;
    let account = engine.open_account("alice", Currency::Usd).await.unwrap();

    // No postings yet: the aggregate decodes to an exact zero.
    assert_eq!(engine.sum_postings(account.id).await.unwrap(), Money::ZERO);

    fund_account(&db, account.id, 10_000).await;
    assert_eq!(
        engine.sum_postings(account.id).await.unwrap(),
        Money::from_minor(10_000)
    );
}

#[tokio::test]
async fn exchange_rejects_same_currency_pair() {
    let (engine, _db) = engine_with_db().await;
    engine.open_account("alice", Currency::Usd).await.unwrap();

    let err = engine
        .exchange(ExchangeCmd {
            user_id: "alice".to_string(),
            from_currency: Currency::Usd,
            to_currency: Currency::Usd,
            amount_minor: 1_000,
        })
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::InvalidAmount(_)));
}

#[tokio::test]
async fn verify_balance_detects_out_of_band_drift() {
    let (engine, db) = engine_with_db().await;
    let account = engine.open_account("alice", Currency::Usd).await.unwrap();
    fund_account(&db, account.id, 10_000).await;

    let audit = engine.verify_balance(account.id).await.unwrap();
    assert!(audit.consistent);
    assert_eq!(audit.stored, Money::from_minor(10_000));
    assert_eq!(audit.reconciled, Money::from_minor(10_000));
    assert_eq!(audit.discrepancy, Money::ZERO);

    // Auditing mutates nothing; a second run reports the same result.
    assert_eq!(engine.verify_balance(account.id).await.unwrap(), audit);

    // Drift the stored balance behind the ledger's back.
    let stmt = Statement::from_sql_and_values(
        db.get_database_backend(),
        "UPDATE accounts SET balance_minor = balance_minor + 1 WHERE id = ?",
        [account.id.to_string().into()],
    );
    db.execute(stmt).await.unwrap();

    let audit = engine.verify_balance(account.id).await.unwrap();
    assert!(!audit.consistent);
    assert_eq!(audit.discrepancy, Money::from_minor(1));
}

#[tokio::test]
async fn verify_balance_unknown_account_is_not_found() {
    let (engine, _db) = engine_with_db().await;
    let err = engine.verify_balance(Uuid::new_v4()).await.unwrap_err();
    assert!(matches!(err, EngineError::KeyNotFound(_)));
}

#[tokio::test]
async fn listing_pages_newest_first_with_kind_filter() {
    let (engine, db) = engine_with_db().await;
    let alice_usd = engine.open_account("alice", Currency::Usd).await.unwrap();
    engine.open_account("alice", Currency::Eur).await.unwrap();
    let bob_usd = engine.open_account("bob", Currency::Usd).await.unwrap();
    fund_account(&db, alice_usd.id, 100_000).await;

    for _ in 0..3 {
        engine
            .transfer(TransferCmd {
                from_account_id: alice_usd.id,
                to_account_id: bob_usd.id,
                amount_minor: 1_000,
                currency: Currency::Usd,
            })
            .await
            .unwrap();
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    let exchange = engine
        .exchange(ExchangeCmd {
            user_id: "alice".to_string(),
            from_currency: Currency::Usd,
            to_currency: Currency::Eur,
            amount_minor: 2_000,
        })
        .await
        .unwrap();

    // The funding deposit also touches alice's account: 5 in total.
    let page = engine
        .list_transactions(ListTransactionsCmd {
            user_id: "alice".to_string(),
            kind: None,
            page: 1,
            page_size: 2,
        })
        .await
        .unwrap();
    assert_eq!(page.total, 5);
    assert_eq!(page.items.len(), 2);
    assert_eq!(page.items[0].id, exchange.id);

    let last_page = engine
        .list_transactions(ListTransactionsCmd {
            user_id: "alice".to_string(),
            kind: None,
            page: 3,
            page_size: 2,
        })
        .await
        .unwrap();
    assert_eq!(last_page.items.len(), 1);

    let exchanges_only = engine
        .list_transactions(ListTransactionsCmd {
            user_id: "alice".to_string(),
            kind: Some(TransactionKind::Exchange),
            page: 1,
            page_size: 10,
        })
        .await
        .unwrap();
    assert_eq!(exchanges_only.total, 1);
    assert_eq!(exchanges_only.items[0].id, exchange.id);

    // Bob only ever saw the three transfers.
    let bob = engine
        .list_transactions(ListTransactionsCmd {
            user_id: "bob".to_string(),
            kind: None,
            page: 1,
            page_size: 10,
        })
        .await
        .unwrap();
    assert_eq!(bob.total, 3);
}

#[tokio::test]
async fn listing_rejects_bad_pagination() {
    let (engine, _db) = engine_with_db().await;

    for (page, page_size) in [(0, 10), (1, 0), (1, 1_000)] {
        let err = engine
            .list_transactions(ListTransactionsCmd {
                user_id: "alice".to_string(),
                kind: None,
                page,
                page_size,
            })
            .await
            .unwrap_err();
        assert!(matches!(err, EngineError::InvalidAmount(_)));
    }
}

#[tokio::test]
async fn concurrent_transfers_never_overdraw() {
    let path = std::env::temp_dir().join(format!("ledger-test-{}.db", Uuid::new_v4()));
    let path_str = path.to_str().unwrap().to_string();
    let (engine, db) = engine_with_file_db(&path_str).await;

    let from = engine.open_account("alice", Currency::Usd).await.unwrap();
    let to = engine.open_account("bob", Currency::Usd).await.unwrap();
    fund_account(&db, from.id, 40_000).await;

    let engine = std::sync::Arc::new(engine);
    let mut handles = Vec::new();
    for _ in 0..4 {
        let engine = engine.clone();
        let (from_id, to_id) = (from.id, to.id);
        handles.push(tokio::spawn(async move {
            for _ in 0..10 {
                loop {
                    match engine
                        .transfer(TransferCmd {
                            from_account_id: from_id,
                            to_account_id: to_id,
                            amount_minor: 1_000,
                            currency: Currency::Usd,
                        })
                        .await
                    {
                        Ok(_) => break,
                        Err(EngineError::Busy(_)) => {
                            tokio::time::sleep(Duration::from_millis(10)).await;
                        }
                        Err(err) => panic!("unexpected transfer error: {err}"),
                    }
                }
            }
        }));
    }
    for handle in handles {
        handle.await.unwrap();
    }

    // 40 transfers of 10.00 drain the source exactly to zero.
    assert_eq!(engine.account(from.id).await.unwrap().balance.minor(), 0);
    assert_eq!(engine.account(to.id).await.unwrap().balance.minor(), 40_000);
    assert!(engine.verify_balance(from.id).await.unwrap().consistent);
    assert!(engine.verify_balance(to.id).await.unwrap().consistent);

    drop(engine);
    db.close().await.unwrap();
    let _ = std::fs::remove_file(&path);
}
