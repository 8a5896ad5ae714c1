use evrent::domain::deposit::DepositStatus;
use evrent::domain::money::Money;
use evrent::domain::penalty::{PaymentMethod, PenaltyId, PenaltyStatus};
use evrent::domain::rental::{RentalId, RentalStatus};
use evrent::{ErrorKind, SettlementEngine, SettlementError};

mod common;

async fn damage(engine: &SettlementEngine) -> PenaltyId {
    engine
        .catalog()
        .register("DAMAGE", "Body damage", Money::from_major(500_000))
        .await
        .unwrap()
        .id
}

#[tokio::test]
async fn test_penalty_fully_offset_by_deposit() {
    let fx = common::fixture();
    let deposit = common::book_with_deposit(&fx.engine, 1, 2_000_000).await;
    let catalog_id = damage(&fx.engine).await;

    let penalty = fx
        .engine
        .assessor()
        .assess(
            RentalId(1),
            catalog_id,
            Money::from_major(500_000),
            "",
            true,
        )
        .await
        .unwrap();

    assert_eq!(penalty.status, PenaltyStatus::OffsetFromDeposit);
    assert_eq!(penalty.deposit_used_amount, Money::from_major(500_000));
    assert_eq!(penalty.description, "Body damage");

    let deposit = fx.engine.ledger().get(deposit.id).await.unwrap();
    assert_eq!(deposit.used_amount, Money::from_major(500_000));
    assert_eq!(deposit.available_amount(), Money::from_major(1_500_000));
    assert_eq!(deposit.status, DepositStatus::PartiallyUsed);
}

#[tokio::test]
async fn test_short_deposit_leaves_remainder_outstanding_then_cash_settles() {
    let fx = common::fixture();
    let deposit = common::book_with_deposit(&fx.engine, 1, 300_000).await;
    let catalog_id = damage(&fx.engine).await;

    let penalty = fx
        .engine
        .assessor()
        .assess(
            RentalId(1),
            catalog_id,
            Money::from_major(500_000),
            "Scratched bumper",
            true,
        )
        .await
        .unwrap();
    assert_eq!(penalty.status, PenaltyStatus::Pending);
    assert_eq!(penalty.deposit_used_amount, Money::from_major(300_000));
    assert_eq!(penalty.outstanding(), Money::from_major(200_000));

    let deposit = fx.engine.ledger().get(deposit.id).await.unwrap();
    assert_eq!(deposit.used_amount, Money::from_major(300_000));
    assert_eq!(deposit.available_amount(), Money::ZERO);

    let settled = fx
        .engine
        .settlement()
        .settle(
            penalty.id,
            Money::from_major(200_000),
            PaymentMethod::Cash,
            false,
            None,
        )
        .await
        .unwrap();
    assert_eq!(settled.status, PenaltyStatus::Settled);
    assert_eq!(settled.paid_amount, Money::from_major(200_000));
    assert_eq!(settled.payment_method, Some(PaymentMethod::Cash));
    assert!(settled.paid_at.is_some());

    // Settling again is refused and changes nothing.
    let again = fx
        .engine
        .settlement()
        .settle(
            penalty.id,
            Money::from_major(1),
            PaymentMethod::Cash,
            true,
            None,
        )
        .await;
    assert!(matches!(again, Err(SettlementError::AlreadySettled(_))));
    let unchanged = fx.engine.settlement().get(penalty.id).await.unwrap();
    assert_eq!(unchanged.paid_amount, Money::from_major(200_000));
    assert_eq!(unchanged.deposit_used_amount, Money::from_major(300_000));
}

#[tokio::test]
async fn test_overpayment_rejected_without_side_effects() {
    let fx = common::fixture();
    let deposit = common::book_with_deposit(&fx.engine, 1, 1_000_000).await;
    let catalog_id = damage(&fx.engine).await;
    let penalty = fx
        .engine
        .assessor()
        .assess(
            RentalId(1),
            catalog_id,
            Money::from_major(500_000),
            "",
            false,
        )
        .await
        .unwrap();

    let result = fx
        .engine
        .settlement()
        .settle(
            penalty.id,
            Money::from_major(600_000),
            PaymentMethod::Cash,
            true,
            None,
        )
        .await;
    let err = result.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::State);
    assert!(matches!(err, SettlementError::OverPayment { .. }));

    let deposit = fx.engine.ledger().get(deposit.id).await.unwrap();
    assert_eq!(deposit.used_amount, Money::ZERO);
    let penalty = fx.engine.settlement().get(penalty.id).await.unwrap();
    assert_eq!(penalty.outstanding(), Money::from_major(500_000));
}

#[tokio::test]
async fn test_settle_mixes_deposit_and_direct_payment() {
    let fx = common::fixture();
    let deposit = common::book_with_deposit(&fx.engine, 1, 100_000).await;
    let catalog_id = damage(&fx.engine).await;
    let penalty = fx
        .engine
        .assessor()
        .assess(
            RentalId(1),
            catalog_id,
            Money::from_major(500_000),
            "",
            false,
        )
        .await
        .unwrap();
    assert_eq!(penalty.deposit_used_amount, Money::ZERO);

    let settled = fx
        .engine
        .settlement()
        .settle(
            penalty.id,
            Money::from_major(500_000),
            PaymentMethod::Cash,
            true,
            Some("front desk".into()),
        )
        .await
        .unwrap();
    assert_eq!(settled.deposit_used_amount, Money::from_major(100_000));
    assert_eq!(settled.paid_amount, Money::from_major(400_000));
    assert_eq!(settled.status, PenaltyStatus::Settled);
    assert_eq!(settled.note.as_deref(), Some("front desk"));

    let deposit = fx.engine.ledger().get(deposit.id).await.unwrap();
    assert_eq!(deposit.available_amount(), Money::ZERO);
}

#[tokio::test]
async fn test_bill_excludes_waived_penalties() {
    let fx = common::fixture();
    common::book_with_deposit(&fx.engine, 1, 500_000).await;
    let damage_id = damage(&fx.engine).await;
    let late = fx
        .engine
        .catalog()
        .register("LATE_RETURN", "Late return", Money::from_major(200_000))
        .await
        .unwrap();

    fx.engine
        .assessor()
        .assess(
            RentalId(1),
            damage_id,
            Money::from_major(300_000),
            "Cracked mirror",
            false,
        )
        .await
        .unwrap();
    let waived = fx
        .engine
        .assessor()
        .assess(RentalId(1), late.id, late.amount, "", false)
        .await
        .unwrap();
    fx.engine
        .settlement()
        .waive(waived.id, Some("traffic accident on route".into()))
        .await
        .unwrap();

    let bill = fx.engine.billing().build_bill(RentalId(1)).await.unwrap();
    assert_eq!(bill.rental_cost, Money::from_major(1_000_000));
    assert_eq!(bill.penalty_amount, Money::from_major(300_000));
    assert_eq!(bill.total_amount, Money::from_major(1_300_000));
    assert_eq!(bill.outstanding_amount, Money::from_major(300_000));
    assert_eq!(bill.refund_amount, Some(Money::from_major(200_000)));
    assert_eq!(bill.penalties.len(), 2);
    assert_eq!(bill.penalties[1].status, PenaltyStatus::Waived);
}

#[tokio::test]
async fn test_refund_twice_is_rejected() {
    let fx = common::fixture();
    let deposit = common::book_with_deposit(&fx.engine, 1, 2_000_000).await;
    fx
        .engine
        .ledger()
        .debit(deposit.id, Money::from_major(250_000))
        .await
        .unwrap();

    let refunded = fx.engine.ledger().refund(deposit.id, None).await.unwrap();
    assert_eq!(refunded.status, DepositStatus::Refunded);
    assert!(refunded.refund_date.is_some());

    let again = fx.engine.ledger().refund(deposit.id, None).await;
    assert!(matches!(again, Err(SettlementError::DepositTerminal { .. })));
    let debit = fx
        .engine
        .ledger()
        .debit(deposit.id, Money::from_major(1))
        .await;
    assert!(matches!(debit, Err(SettlementError::DepositTerminal { .. })));

    let stored = fx.engine.ledger().get(deposit.id).await.unwrap();
    assert_eq!(stored.used_amount, Money::from_major(250_000));
    assert_eq!(stored.status, DepositStatus::Refunded);

    let bill = fx.engine.billing().build_bill(RentalId(1)).await.unwrap();
    assert_eq!(bill.refund_amount, None);
}

#[tokio::test]
async fn test_rental_lifecycle_rebills_actual_interval() {
    let fx = common::fixture();
    common::book(&fx.engine, 1, 2).await;

    let active = fx
        .engine
        .rentals()
        .check_out(RentalId(1), None, None)
        .await
        .unwrap();
    assert_eq!(active.status, RentalStatus::Active);
    assert_eq!(active.start_at, common::at(1, 8));

    // One hour into the fourth day bills four days.
    fx.clock.set(common::at(4, 9));
    let done = fx
        .engine
        .rentals()
        .check_in(RentalId(1), None, None)
        .await
        .unwrap();
    assert_eq!(done.status, RentalStatus::Completed);
    assert_eq!(done.total_cost, Money::from_major(2_000_000));

    let cancel = fx.engine.rentals().cancel(RentalId(1)).await;
    assert!(matches!(cancel, Err(SettlementError::InvalidRentalState { .. })));
}

#[tokio::test]
async fn test_cancelled_rental_cannot_be_penalized() {
    let fx = common::fixture();
    common::book(&fx.engine, 1, 1).await;
    let catalog_id = damage(&fx.engine).await;
    fx.engine.rentals().cancel(RentalId(1)).await.unwrap();

    let result = fx
        .engine
        .assessor()
        .assess(
            RentalId(1),
            catalog_id,
            Money::from_major(500_000),
            "",
            true,
        )
        .await;
    assert!(matches!(result, Err(SettlementError::RentalCancelled(_))));
    let penalties = fx.engine.settlement().list_for_rental(RentalId(1)).await;
    assert!(penalties.unwrap().is_empty());
}

#[tokio::test]
async fn test_inactive_catalog_entry_cannot_be_assessed() {
    let fx = common::fixture();
    common::book(&fx.engine, 1, 1).await;
    let catalog_id = damage(&fx.engine).await;
    fx.engine.catalog().deactivate(catalog_id).await.unwrap();

    let result = fx
        .engine
        .assessor()
        .assess(
            RentalId(1),
            catalog_id,
            Money::from_major(500_000),
            "",
            false,
        )
        .await;
    assert!(matches!(result, Err(SettlementError::CatalogEntryInactive(_))));
    let active = fx.engine.catalog().find_active("DAMAGE").await;
    assert!(active.unwrap().is_none());
}
