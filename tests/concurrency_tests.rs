use evrent::SettlementError;
use evrent::domain::money::Money;
use evrent::domain::penalty::PaymentMethod;
use evrent::domain::rental::RentalId;
use rand::Rng;
use std::sync::Arc;

mod common;

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_debits_never_overdraw() {
    let fx = common::fixture();
    let deposit = common::book_with_deposit(&fx.engine, 1, 1_000_000).await;
    let engine = Arc::new(fx.engine);

    // Ten debits of 150,000 against 1,000,000: exactly six fit.
    let mut handles = Vec::new();
    for _ in 0..10 {
        let engine = engine.clone();
        handles.push(tokio::spawn(async move {
            engine
                .ledger()
                .debit(deposit.id, Money::from_major(150_000))
                .await
        }));
    }

    let mut succeeded = 0;
    for handle in handles {
        match handle.await.unwrap() {
            Ok(_) => succeeded += 1,
            Err(SettlementError::InsufficientDeposit { .. }) => {}
            Err(other) => panic!("unexpected error: {other}"),
        }
    }
    assert_eq!(succeeded, 6);

    let stored = engine.ledger().get(deposit.id).await.unwrap();
    assert_eq!(stored.used_amount, Money::from_major(900_000));
    assert!(stored.used_amount <= stored.amount);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_settlements_collect_once() {
    let fx = common::fixture();
    common::book_with_deposit(&fx.engine, 1, 100_000).await;
    let entry = fx
        .engine
        .catalog()
        .register("DAMAGE", "Body damage", Money::from_major(500_000))
        .await
        .unwrap();
    let penalty = fx
        .engine
        .assessor()
        .assess(RentalId(1), entry.id, entry.amount, "", false)
        .await
        .unwrap();
    let engine = Arc::new(fx.engine);

    let mut handles = Vec::new();
    for _ in 0..8 {
        let engine = engine.clone();
        handles.push(tokio::spawn(async move {
            engine
                .settlement()
                .settle(
                    penalty.id,
                    Money::from_major(500_000),
                    PaymentMethod::Cash,
                    true,
                    None,
                )
                .await
        }));
    }

    let mut succeeded = 0;
    for handle in handles {
        if handle.await.unwrap().is_ok() {
            succeeded += 1;
        }
    }
    assert_eq!(succeeded, 1);

    let settled = engine.settlement().get(penalty.id).await.unwrap();
    assert_eq!(
        settled.deposit_used_amount + settled.paid_amount,
        Money::from_major(500_000)
    );
    let deposit = common::deposit_for(&engine, 1).await.unwrap();
    assert_eq!(deposit.used_amount, Money::from_major(100_000));
}

#[tokio::test]
async fn test_random_debit_sequences_keep_balance_invariant() {
    let mut rng = rand::thread_rng();

    for round in 0..20u64 {
        let fx = common::fixture();
        let amount = rng.gen_range(1..=50) * 100_000;
        let deposit = common::book_with_deposit(&fx.engine, round + 1, amount).await;

        let mut expected_used = Money::ZERO;
        for _ in 0..rng.gen_range(1..30) {
            let debit = Money::from_major(rng.gen_range(1..=20) * 50_000);
            let capped = rng.gen_range(0..4) == 0;
            let result = if capped {
                fx.engine.ledger().debit_up_to(deposit.id, debit).await
            } else {
                fx.engine.ledger().debit(deposit.id, debit).await
            };
            match result {
                Ok(done) => expected_used += done.debited,
                Err(SettlementError::InsufficientDeposit { available, requested }) => {
                    assert!(!capped);
                    assert!(requested > available);
                }
                Err(other) => panic!("unexpected error: {other}"),
            }

            let current = fx.engine.ledger().get(deposit.id).await.unwrap();
            assert_eq!(current.used_amount, expected_used);
            assert!(current.used_amount <= current.amount);
            assert!(!current.available_amount().is_negative());
        }
    }
}
