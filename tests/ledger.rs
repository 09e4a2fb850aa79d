use std::sync::Arc;

use chrono::{Duration, Utc};
use rust_decimal::Decimal;
use uuid::Uuid;

use backend_finance_ledger::db::error::LedgerError;
use backend_finance_ledger::db::memory::MemoryStore;
use backend_finance_ledger::db::tx::{
    DateRange, MetadataUpdate, NewTransaction, Page, TransactionFilter, TransactionStatus,
    TransactionType,
};
use backend_finance_ledger::db::wallet::{NewWallet, Wallet, WalletType};
use backend_finance_ledger::ledger::Ledger;

fn ledger() -> Ledger<MemoryStore> {
    Ledger::new(MemoryStore::new())
}

fn dec(n: i64) -> Decimal {
    Decimal::new(n, 0)
}

fn internal_wallet() -> NewWallet {
    NewWallet {
        wallet_type: WalletType::Internal,
        wallet_number: None,
        currency: "NPR".to_string(),
    }
}

fn entry(wallet_id: Uuid, kind: TransactionType, amount: Decimal) -> NewTransaction {
    NewTransaction {
        wallet_id,
        amount,
        kind,
        category: None,
        description: None,
        payment_method: None,
        status: TransactionStatus::default(),
        transaction_date: None,
    }
}

/// Creates a wallet and funds it with one income entry so tests start from a
/// known balance.
async fn funded_wallet(ledger: &Ledger<MemoryStore>, owner: Uuid, opening: Decimal) -> Wallet {
    let wallet = ledger.create_wallet(owner, internal_wallet()).await.unwrap();
    if opening > Decimal::ZERO {
        ledger
            .create_transaction(owner, entry(wallet.id, TransactionType::Income, opening))
            .await
            .unwrap();
    }
    ledger.get_wallet(wallet.id, owner).await.unwrap()
}

#[tokio::test]
async fn balance_equals_sum_of_surviving_entries() {
    let ledger = ledger();
    let owner = Uuid::new_v4();
    let wallet = ledger.create_wallet(owner, internal_wallet()).await.unwrap();

    ledger
        .create_transaction(owner, entry(wallet.id, TransactionType::Income, dec(500)))
        .await
        .unwrap();
    ledger
        .create_transaction(owner, entry(wallet.id, TransactionType::Expense, dec(120)))
        .await
        .unwrap();
    let transfer = ledger
        .create_transaction(owner, entry(wallet.id, TransactionType::Transfer, dec(80)))
        .await
        .unwrap();
    ledger
        .create_transaction(owner, entry(wallet.id, TransactionType::Income, dec(40)))
        .await
        .unwrap();

    ledger.delete_transaction(transfer.id, owner).await.unwrap();

    // surviving entries: +500 -120 +40
    let wallet = ledger.get_wallet(wallet.id, owner).await.unwrap();
    assert_eq!(wallet.balance, dec(420));

    let totals = ledger.user_totals(owner, None).await.unwrap();
    assert_eq!(totals.income, dec(540));
    assert_eq!(totals.expense, dec(120));
    assert_eq!(totals.net, dec(420));
}

#[tokio::test]
async fn rejected_debit_writes_nothing() {
    let ledger = ledger();
    let owner = Uuid::new_v4();
    let wallet = funded_wallet(&ledger, owner, dec(100)).await;

    let err = ledger
        .create_transaction(owner, entry(wallet.id, TransactionType::Expense, dec(150)))
        .await
        .unwrap_err();
    assert!(matches!(err, LedgerError::InsufficientBalance));

    // no orphan record, no balance change
    let listed = ledger
        .list_transactions(owner, &TransactionFilter::default(), Page::default())
        .await
        .unwrap();
    assert_eq!(listed.len(), 1); // only the funding income
    let wallet = ledger.get_wallet(wallet.id, owner).await.unwrap();
    assert_eq!(wallet.balance, dec(100));
}

#[tokio::test]
async fn delete_reverses_create_exactly() {
    for kind in [
        TransactionType::Income,
        TransactionType::Expense,
        TransactionType::Transfer,
    ] {
        let ledger = ledger();
        let owner = Uuid::new_v4();
        let wallet = funded_wallet(&ledger, owner, dec(1000)).await;

        let amount = Decimal::new(33333, 2); // 333.33
        let tx = ledger
            .create_transaction(owner, entry(wallet.id, kind, amount))
            .await
            .unwrap();
        ledger.delete_transaction(tx.id, owner).await.unwrap();

        let wallet = ledger.get_wallet(wallet.id, owner).await.unwrap();
        assert_eq!(wallet.balance, dec(1000), "reversal drifted for {kind:?}");
    }
}

#[tokio::test]
async fn foreign_wallets_and_transactions_are_invisible() {
    let ledger = ledger();
    let owner = Uuid::new_v4();
    let stranger = Uuid::new_v4();
    let wallet = funded_wallet(&ledger, owner, dec(100)).await;
    let tx = ledger
        .create_transaction(owner, entry(wallet.id, TransactionType::Expense, dec(10)))
        .await
        .unwrap();

    let err = ledger.get_wallet(wallet.id, stranger).await.unwrap_err();
    assert!(matches!(err, LedgerError::NotFound));

    let err = ledger
        .create_transaction(stranger, entry(wallet.id, TransactionType::Income, dec(5)))
        .await
        .unwrap_err();
    assert!(matches!(err, LedgerError::NotFound));

    let err = ledger.delete_transaction(tx.id, stranger).await.unwrap_err();
    assert!(matches!(err, LedgerError::NotFound));

    let err = ledger
        .update_transaction(
            tx.id,
            stranger,
            MetadataUpdate {
                category: Some("Food".to_string()),
                description: None,
                status: None,
            },
        )
        .await
        .unwrap_err();
    assert!(matches!(err, LedgerError::NotFound));

    // nothing leaked through
    let wallet = ledger.get_wallet(wallet.id, owner).await.unwrap();
    assert_eq!(wallet.balance, dec(90));
}

#[tokio::test]
async fn credits_are_unbounded_debits_are_floored() {
    let ledger = ledger();
    let owner = Uuid::new_v4();
    let wallet = funded_wallet(&ledger, owner, dec(100)).await;

    let err = ledger
        .create_transaction(owner, entry(wallet.id, TransactionType::Expense, dec(150)))
        .await
        .unwrap_err();
    assert!(matches!(err, LedgerError::InsufficientBalance));
    let after = ledger.get_wallet(wallet.id, owner).await.unwrap();
    assert_eq!(after.balance, dec(100));

    ledger
        .create_transaction(
            owner,
            entry(wallet.id, TransactionType::Income, dec(1_000_000)),
        )
        .await
        .unwrap();
    let after = ledger.get_wallet(wallet.id, owner).await.unwrap();
    assert_eq!(after.balance, dec(1_000_100));
}

#[tokio::test]
async fn concurrent_debits_settle_exactly_one_winner() {
    let ledger = Arc::new(ledger());
    let owner = Uuid::new_v4();
    let wallet = funded_wallet(&ledger, owner, dec(100)).await;

    // 75 + 75 > 100: only one of the two debits can fit above the floor
    let first = {
        let ledger = ledger.clone();
        let wallet_id = wallet.id;
        tokio::spawn(async move {
            ledger
                .create_transaction(owner, entry(wallet_id, TransactionType::Expense, dec(75)))
                .await
        })
    };
    let second = {
        let ledger = ledger.clone();
        let wallet_id = wallet.id;
        tokio::spawn(async move {
            ledger
                .create_transaction(owner, entry(wallet_id, TransactionType::Expense, dec(75)))
                .await
        })
    };

    let results = [first.await.unwrap(), second.await.unwrap()];
    let successes = results.iter().filter(|r| r.is_ok()).count();
    let insufficient = results
        .iter()
        .filter(|r| matches!(r, Err(LedgerError::InsufficientBalance)))
        .count();
    assert_eq!(successes, 1);
    assert_eq!(insufficient, 1);

    let wallet = ledger.get_wallet(wallet.id, owner).await.unwrap();
    assert_eq!(wallet.balance, dec(25));
}

#[tokio::test]
async fn category_breakdown_and_totals() {
    let ledger = ledger();
    let owner = Uuid::new_v4();
    let wallet = ledger.create_wallet(owner, internal_wallet()).await.unwrap();

    ledger
        .create_transaction(owner, entry(wallet.id, TransactionType::Income, dec(100)))
        .await
        .unwrap();
    for amount in [10, 20, 30] {
        let mut expense = entry(wallet.id, TransactionType::Expense, dec(amount));
        expense.category = Some("Food".to_string());
        ledger.create_transaction(owner, expense).await.unwrap();
    }

    let stats = ledger.stats(owner, None).await.unwrap();
    assert_eq!(stats.total_income, dec(100));
    assert_eq!(stats.total_expense, dec(60));
    assert_eq!(stats.net_balance, dec(40));
    assert_eq!(stats.category_breakdown.len(), 1);
    assert_eq!(
        stats.category_breakdown[0].category.as_deref(),
        Some("Food")
    );
    assert_eq!(stats.category_breakdown[0].total, dec(60));
}

#[tokio::test]
async fn deactivated_wallet_remains_a_reversal_target() {
    let ledger = ledger();
    let owner = Uuid::new_v4();
    let wallet = funded_wallet(&ledger, owner, dec(100)).await;
    let expense = ledger
        .create_transaction(owner, entry(wallet.id, TransactionType::Expense, dec(40)))
        .await
        .unwrap();

    ledger.deactivate_wallet(wallet.id, owner).await.unwrap();
    // deactivation again is a no-op, not an error
    ledger.deactivate_wallet(wallet.id, owner).await.unwrap();

    let listed = ledger.list_wallets(owner).await.unwrap();
    assert!(listed.is_empty());

    // the hidden wallet still resolves by id and still accepts reversals
    ledger.delete_transaction(expense.id, owner).await.unwrap();
    let wallet = ledger.get_wallet(wallet.id, owner).await.unwrap();
    assert_eq!(wallet.balance, dec(100));
    assert!(!wallet.is_active);
}

#[tokio::test]
async fn reversing_an_income_may_go_negative() {
    let ledger = ledger();
    let owner = Uuid::new_v4();
    let wallet = ledger.create_wallet(owner, internal_wallet()).await.unwrap();

    let income = ledger
        .create_transaction(owner, entry(wallet.id, TransactionType::Income, dec(100)))
        .await
        .unwrap();
    ledger
        .create_transaction(owner, entry(wallet.id, TransactionType::Expense, dec(60)))
        .await
        .unwrap();

    // reversal is never floor-checked
    ledger.delete_transaction(income.id, owner).await.unwrap();
    let wallet = ledger.get_wallet(wallet.id, owner).await.unwrap();
    assert_eq!(wallet.balance, dec(-60));
}

#[tokio::test]
async fn listing_respects_filters_and_pagination() {
    let ledger = ledger();
    let owner = Uuid::new_v4();
    let wallet = funded_wallet(&ledger, owner, dec(1000)).await;

    let base = Utc::now();
    let mut entries = Vec::new();
    for (i, (kind, category)) in [
        (TransactionType::Expense, Some("Food")),
        (TransactionType::Expense, Some("Travel")),
        (TransactionType::Expense, Some("Food")),
        (TransactionType::Transfer, None),
    ]
    .into_iter()
    .enumerate()
    {
        let mut e = entry(wallet.id, kind, dec(10));
        e.category = category.map(str::to_string);
        e.transaction_date = Some(base + Duration::days(i as i64));
        entries.push(ledger.create_transaction(owner, e).await.unwrap());
    }

    let food = ledger
        .list_transactions(
            owner,
            &TransactionFilter {
                kind: Some(TransactionType::Expense),
                category: Some("Food".to_string()),
                date_range: None,
            },
            Page::default(),
        )
        .await
        .unwrap();
    assert_eq!(food.len(), 2);
    assert!(food.iter().all(|t| t.category.as_deref() == Some("Food")));
    // newest first
    assert!(food[0].transaction_date > food[1].transaction_date);

    let windowed = ledger
        .list_transactions(
            owner,
            &TransactionFilter {
                kind: None,
                category: None,
                date_range: Some(DateRange {
                    start: Some(base + Duration::days(1)),
                    end: Some(base + Duration::days(2)),
                }),
            },
            Page::default(),
        )
        .await
        .unwrap();
    assert_eq!(windowed.len(), 2);

    let paged = ledger
        .list_transactions(
            owner,
            &TransactionFilter::default(),
            Page {
                limit: 2,
                offset: 1,
            },
        )
        .await
        .unwrap();
    assert_eq!(paged.len(), 2);
    assert_eq!(paged[0].id, entries[2].id);
    assert_eq!(paged[1].id, entries[1].id);
}

#[tokio::test]
async fn platform_totals_span_all_owners() {
    let ledger = ledger();
    let alice = Uuid::new_v4();
    let bob = Uuid::new_v4();
    let a_wallet = funded_wallet(&ledger, alice, dec(300)).await;
    let _b_wallet = funded_wallet(&ledger, bob, dec(200)).await;

    let mut pending = entry(a_wallet.id, TransactionType::Expense, dec(50));
    pending.status = TransactionStatus::Pending;
    ledger.create_transaction(alice, pending).await.unwrap();

    let totals = ledger.platform_totals().await.unwrap();
    assert_eq!(totals.user_count, 2);
    // the pending expense still moved the balance but does not count as volume
    assert_eq!(totals.transaction_count, 2);
    assert_eq!(totals.transaction_volume, dec(500));
    assert_eq!(totals.total_wallet_balance, dec(450));
}
