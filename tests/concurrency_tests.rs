//! Concurrency integration tests
//!
//! These tests drive the in-memory ledger from many tokio tasks at once and
//! check that balances stay consistent:
//! - Debits of one wallet are serialized; a balance never goes negative
//! - Concurrent top-ups lose no update
//! - Transfers in opposite directions do not deadlock
//! - Concurrent retries with one idempotency key apply once
//! - Readers never observe half of a transfer

use std::sync::Arc;
use std::time::Duration;

use rstest::rstest;
use rust_decimal::Decimal;
use wallet_ledger::config::LedgerConfig;
use wallet_ledger::core::{AccountStore, MemoryBackend, MemoryDirectory, UnitOfWorkFactory};
use wallet_ledger::{
    EntryStatus, EntryType, LedgerError, OwnerId, TopUpRequest, TransferRequest, WalletService,
};

fn money(value: &str) -> Decimal {
    value.parse().unwrap()
}

fn top_up(amount: &str, key: Option<&str>) -> TopUpRequest {
    TopUpRequest {
        amount: money(amount),
        idempotency_key: key.map(str::to_string),
    }
}

fn transfer(destination: &str, amount: &str) -> TransferRequest {
    TransferRequest {
        destination: destination.to_string(),
        amount: money(amount),
        memo: None,
        idempotency_key: None,
    }
}

async fn two_users(
    service: &WalletService<MemoryBackend>,
    alice_funds: &str,
    bob_funds: &str,
) -> (OwnerId, OwnerId) {
    let (alice, _) = service
        .register("alice@example.com", "Alice")
        .await
        .unwrap();
    let (bob, _) = service.register("bob@example.com", "Bob").await.unwrap();
    for (owner, funds) in [(alice.id, alice_funds), (bob.id, bob_funds)] {
        if money(funds) > Decimal::ZERO {
            service.top_up(owner, top_up(funds, None)).await.unwrap();
        }
    }
    (alice.id, bob.id)
}

async fn balance(service: &WalletService<MemoryBackend>, owner: OwnerId) -> Decimal {
    service.balance(owner).await.unwrap().balance
}

/// Balance rebuilt from the owner's SUCCESS entries
async fn ledger_balance(service: &WalletService<MemoryBackend>, owner: OwnerId) -> Decimal {
    let wallet = service.balance(owner).await.unwrap().wallet_id;
    let history = service.history(owner, 1, 100).await.unwrap();
    assert!(history.pagination.total <= 100);
    history
        .entries
        .iter()
        .filter(|entry| entry.status == EntryStatus::Success)
        .fold(Decimal::ZERO, |sum, entry| {
            if entry.destination == wallet {
                sum + entry.amount
            } else if entry.source == Some(wallet) {
                sum - entry.amount
            } else {
                sum
            }
        })
}

async fn assert_balances_match_ledger(
    service: &WalletService<MemoryBackend>,
    owners: &[OwnerId],
) {
    for &owner in owners {
        assert_eq!(
            balance(service, owner).await,
            ledger_balance(service, owner).await
        );
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_debits_never_overdraw() {
    let service = WalletService::in_memory(&LedgerConfig::default());
    let (alice, bob) = two_users(&service, "100", "0").await;

    let mut tasks = Vec::new();
    for i in 0..40 {
        let service = service.clone();
        let amount = if i % 2 == 0 { "3.17" } else { "11.01" };
        tasks.push(tokio::spawn(async move {
            service
                .transfer(alice, transfer("bob@example.com", amount))
                .await
        }));
    }

    let mut moved = Decimal::ZERO;
    let mut succeeded = 0;
    for task in tasks {
        match task.await.unwrap() {
            Ok(result) => {
                moved += result.amount;
                succeeded += 1;
            }
            Err(LedgerError::InsufficientBalance { .. }) => {}
            Err(e) => panic!("unexpected error: {}", e),
        }
    }

    let alice_balance = balance(&service, alice).await;
    assert!(alice_balance >= Decimal::ZERO);
    assert!(succeeded < 40);
    assert_eq!(alice_balance, money("100.00") - moved);
    assert_eq!(balance(&service, bob).await, moved);

    let history = service.history(alice, 1, 100).await.unwrap();
    assert_eq!(history.pagination.total, succeeded + 1);
    assert!(history
        .entries
        .iter()
        .all(|entry| entry.status == EntryStatus::Success));
    assert_balances_match_ledger(&service, &[alice, bob]).await;
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_same_pair_transfers_of_mixed_amounts() {
    let service = WalletService::in_memory(&LedgerConfig::default());
    let (alice, bob) = two_users(&service, "1000", "0").await;

    let mut tasks = Vec::new();
    for i in 0..40 {
        let service = service.clone();
        let amount = if i % 2 == 0 { "3.17" } else { "11.01" };
        tasks.push(tokio::spawn(async move {
            service
                .transfer(alice, transfer("bob@example.com", amount))
                .await
        }));
    }
    for task in tasks {
        task.await.unwrap().unwrap();
    }

    assert_eq!(balance(&service, alice).await, money("716.40"));
    assert_eq!(balance(&service, bob).await, money("283.60"));
    assert_balances_match_ledger(&service, &[alice, bob]).await;
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_mixed_concurrent_run_matches_ledger() {
    let service = WalletService::in_memory(&LedgerConfig::default());
    let (alice, bob) = two_users(&service, "50", "50").await;

    let mut tasks = Vec::new();
    for i in 0..80 {
        let service = service.clone();
        tasks.push(tokio::spawn(async move {
            match i % 4 {
                0 => service
                    .top_up(alice, top_up("2.50", None))
                    .await
                    .map(|_| ()),
                1 => service.top_up(bob, top_up("1.99", None)).await.map(|_| ()),
                2 => service
                    .transfer(alice, transfer("bob@example.com", "4.33"))
                    .await
                    .map(|_| ()),
                _ => service
                    .transfer(bob, transfer("alice@example.com", "7.05"))
                    .await
                    .map(|_| ()),
            }
        }));
    }
    for task in tasks {
        match task.await.unwrap() {
            Ok(()) | Err(LedgerError::InsufficientBalance { .. }) => {}
            Err(e) => panic!("unexpected error: {}", e),
        }
    }

    let total = balance(&service, alice).await + balance(&service, bob).await;
    assert_eq!(total, money("189.80"));
    assert_balances_match_ledger(&service, &[alice, bob]).await;
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_top_ups_lose_no_update() {
    let service = WalletService::in_memory(&LedgerConfig::default());
    let (alice, _) = two_users(&service, "0", "0").await;

    let mut tasks = Vec::new();
    for _ in 0..50 {
        let service = service.clone();
        tasks.push(tokio::spawn(async move {
            service.top_up(alice, top_up("1.00", None)).await
        }));
    }
    for task in tasks {
        task.await.unwrap().unwrap();
    }

    let wallets = service.wallets().await.unwrap();
    let wallet = wallets.iter().find(|w| w.owner == alice).unwrap();
    assert_eq!(wallet.balance, money("50.00"));
    assert_eq!(wallet.version, 50);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_opposite_transfers_do_not_deadlock() {
    let service = WalletService::in_memory(&LedgerConfig::default());
    let (alice, bob) = two_users(&service, "1000", "1000").await;

    let mut tasks = Vec::new();
    for i in 0..100 {
        let service = service.clone();
        tasks.push(tokio::spawn(async move {
            if i % 2 == 0 {
                service
                    .transfer(alice, transfer("bob@example.com", "1"))
                    .await
            } else {
                service
                    .transfer(bob, transfer("alice@example.com", "1"))
                    .await
            }
        }));
    }

    let all = async {
        for task in tasks {
            task.await.unwrap().unwrap();
        }
    };
    tokio::time::timeout(Duration::from_secs(10), all)
        .await
        .expect("transfers deadlocked");

    assert_eq!(balance(&service, alice).await, money("1000.00"));
    assert_eq!(balance(&service, bob).await, money("1000.00"));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_retries_apply_once() {
    let service = WalletService::in_memory(&LedgerConfig::default());
    let (alice, _) = two_users(&service, "0", "0").await;

    let mut tasks = Vec::new();
    for _ in 0..10 {
        let service = service.clone();
        tasks.push(tokio::spawn(async move {
            service.top_up(alice, top_up("10", Some("retry-1"))).await
        }));
    }

    let mut transaction_ids = Vec::new();
    for task in tasks {
        let result = task.await.unwrap().unwrap();
        transaction_ids.push(result.transaction_id);
    }
    transaction_ids.dedup();

    assert_eq!(transaction_ids.len(), 1);
    assert_eq!(balance(&service, alice).await, money("10.00"));
    let history = service.history(alice, 1, 10).await.unwrap();
    assert_eq!(history.pagination.total, 1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_readers_never_see_half_a_transfer() {
    let service = WalletService::in_memory(&LedgerConfig::default());
    let (alice, bob) = two_users(&service, "500", "500").await;

    let mut writers = Vec::new();
    for i in 0..100 {
        let service = service.clone();
        writers.push(tokio::spawn(async move {
            let (from, to) = if i % 2 == 0 {
                (alice, "bob@example.com")
            } else {
                (bob, "alice@example.com")
            };
            service.transfer(from, transfer(to, "3.25")).await
        }));
    }

    let reader = {
        let service = service.clone();
        tokio::spawn(async move {
            for _ in 0..200 {
                let total: Decimal = service
                    .wallets()
                    .await
                    .unwrap()
                    .iter()
                    .map(|wallet| wallet.balance)
                    .sum();
                assert_eq!(total, money("1000.00"));
                tokio::task::yield_now().await;
            }
        })
    };

    for writer in writers {
        writer.await.unwrap().unwrap();
    }
    reader.await.unwrap();
}

#[tokio::test]
async fn test_dropped_unit_releases_its_lease() {
    let config = LedgerConfig::new(Duration::from_millis(100), 10, 100);
    let (units, accounts, ledger) = MemoryBackend::open(config.lock_timeout);
    let units = Arc::new(units);
    let accounts = Arc::new(accounts);
    let service = WalletService::<MemoryBackend>::new(
        Arc::clone(&units),
        Arc::clone(&accounts),
        Arc::new(ledger),
        Arc::new(MemoryDirectory::new()),
        &config,
    );
    let (alice, _) = two_users(&service, "0", "0").await;

    let mut unit = units.begin().await.unwrap();
    accounts.get_for_update(&mut unit, alice).await.unwrap();

    let blocked = service.top_up(alice, top_up("5", None)).await;
    assert!(matches!(blocked, Err(LedgerError::Conflict { .. })));

    drop(unit);

    let result = service.top_up(alice, top_up("5", None)).await.unwrap();
    assert_eq!(result.new_balance, money("5.00"));
}

#[tokio::test]
async fn test_aborted_task_releases_its_lease() {
    let config = LedgerConfig::new(Duration::from_millis(100), 10, 100);
    let (units, accounts, ledger) = MemoryBackend::open(config.lock_timeout);
    let units = Arc::new(units);
    let accounts = Arc::new(accounts);
    let service = WalletService::<MemoryBackend>::new(
        Arc::clone(&units),
        Arc::clone(&accounts),
        Arc::new(ledger),
        Arc::new(MemoryDirectory::new()),
        &config,
    );
    let (alice, _) = two_users(&service, "0", "0").await;

    let (locked_tx, locked_rx) = tokio::sync::oneshot::channel();
    let holder = {
        let units = Arc::clone(&units);
        let accounts = Arc::clone(&accounts);
        tokio::spawn(async move {
            let mut unit = units.begin().await.unwrap();
            accounts.get_for_update(&mut unit, alice).await.unwrap();
            let _ = locked_tx.send(());
            std::future::pending::<()>().await;
        })
    };
    locked_rx.await.unwrap();

    holder.abort();
    let _ = holder.await;

    service.top_up(alice, top_up("5", None)).await.unwrap();
    assert_eq!(balance(&service, alice).await, money("5.00"));
}

#[rstest]
#[case::first_page(1, 10, 10)]
#[case::second_page(2, 10, 5)]
#[case::past_the_end(3, 10, 0)]
#[tokio::test]
async fn test_history_pages_after_fifteen_entries(
    #[case] page: i64,
    #[case] limit: i64,
    #[case] expected_len: usize,
) {
    let service = WalletService::in_memory(&LedgerConfig::default());
    let (alice, _) = two_users(&service, "0", "0").await;
    for _ in 0..15 {
        service.top_up(alice, top_up("1", None)).await.unwrap();
    }

    let history = service.history(alice, page, limit).await.unwrap();

    assert_eq!(history.entries.len(), expected_len);
    assert_eq!(history.pagination.total, 15);
    assert_eq!(history.pagination.total_pages, 2);
    assert!(history
        .entries
        .windows(2)
        .all(|pair| pair[0].id > pair[1].id));
}

#[tokio::test]
async fn test_top_up_then_transfer_walkthrough() {
    let service = WalletService::in_memory(&LedgerConfig::default());
    let (alice, bob) = two_users(&service, "100", "0").await;

    let second = service.top_up(alice, top_up("50", None)).await.unwrap();
    assert_eq!(second.new_balance, money("150.00"));

    let sent = service
        .transfer(alice, transfer("bob@example.com", "30"))
        .await
        .unwrap();
    assert_eq!(sent.new_balance, money("120.00"));
    assert_eq!(sent.status, EntryStatus::Success);
    assert_eq!(balance(&service, bob).await, money("30.00"));

    let alice_history = service.history(alice, 1, 10).await.unwrap();
    assert_eq!(alice_history.pagination.total, 3);
    assert_eq!(alice_history.entries[0].entry_type, EntryType::Transfer);

    let bob_history = service.history(bob, 1, 10).await.unwrap();
    assert_eq!(bob_history.entries.len(), 1);
    assert_eq!(bob_history.entries[0].id, sent.transaction_id);
    assert_eq!(bob_history.entries[0].amount, money("30.00"));
}
