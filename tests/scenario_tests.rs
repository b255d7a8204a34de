//! End-to-end ledger scenarios for one trader and instrument.
//!
//! Each scenario starts where the previous one left off:
//! A opens, B averages in, C freezes and settles the whole holding.
//! D and E branch off B.

mod support;

use std::future::Future;
use std::sync::Arc;

use position_ledger::domain::{Barrier, PositionStatus};
use position_ledger::error::{ErrorKind, Result};
use position_ledger::testkit::domain::{btc, manager, open_btc, user, MemoryManager};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;

use support::assertions::{assert_decimal_near, assert_position_sane};

async fn scenario_a() -> MemoryManager {
    let manager = manager();
    assert!(manager.find_open_position(&user(), &btc()).await.unwrap().is_none());

    manager
        .saga_add_position(&Barrier::new("gid-a", "buy"), &user(), &btc(), dec!(10), dec!(100))
        .await
        .unwrap();
    manager
}

async fn scenario_b() -> MemoryManager {
    let manager = scenario_a().await;
    manager
        .saga_add_position(&Barrier::new("gid-b", "buy"), &user(), &btc(), dec!(5), dec!(120))
        .await
        .unwrap();
    manager
}

fn entry_after_b() -> Decimal {
    (dec!(10) * dec!(100) + dec!(5) * dec!(120)) / dec!(15)
}

#[tokio::test]
async fn a_first_buy_opens_position() {
    let manager = scenario_a().await;
    let position = open_btc(&manager).await;

    assert_eq!(position.status(), PositionStatus::Open);
    assert_eq!(position.quantity(), dec!(10));
    assert_eq!(position.entry_price(), dec!(100));
    assert_eq!(position.user_id(), &user());
    assert_eq!(position.symbol(), &btc());
}

#[tokio::test]
async fn b_second_buy_averages_entry_price() {
    let manager = scenario_b().await;
    let position = open_btc(&manager).await;

    assert_eq!(position.quantity(), dec!(15));
    assert_eq!(position.entry_price(), entry_after_b());
    assert_decimal_near(position.entry_price(), dec!(106.6667), dec!(0.0001));
}

#[tokio::test]
async fn c_freeze_and_settle_realizes_pnl() {
    let manager = scenario_b().await;

    manager
        .try_freeze(&Barrier::new("gid-c", "freeze"), &user(), &btc(), dec!(15))
        .await
        .unwrap();
    manager
        .saga_deduct_frozen(&Barrier::new("gid-c", "settle"), &user(), &btc(), dec!(15), dec!(130))
        .await
        .unwrap();

    let position = open_btc(&manager).await;
    assert_position_sane(&position);
    assert_eq!(position.quantity(), Decimal::ZERO);
    assert_eq!(position.entry_price(), entry_after_b());
    assert_decimal_near(position.realized_pnl(), dec!(350), dec!(0.000001));
}

#[tokio::test]
async fn d_oversized_freeze_changes_nothing() {
    let manager = scenario_b().await;
    let before = open_btc(&manager).await;

    let err = manager
        .try_freeze(&Barrier::new("gid-d", "freeze"), &user(), &btc(), dec!(20))
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InsufficientQuantity);

    let after = open_btc(&manager).await;
    assert_eq!(after.quantity(), dec!(15));
    assert_eq!(after.version(), before.version());
}

#[tokio::test]
async fn e_cancelled_freeze_restores_holding() {
    let manager = scenario_b().await;
    let barrier = Barrier::new("gid-e", "freeze");

    manager
        .try_freeze(&barrier, &user(), &btc(), dec!(15))
        .await
        .unwrap();
    assert_eq!(open_btc(&manager).await.quantity(), Decimal::ZERO);

    manager
        .cancel_freeze(&barrier, &user(), &btc(), dec!(15))
        .await
        .unwrap();

    let position = open_btc(&manager).await;
    assert_eq!(position.quantity(), dec!(15));
    assert_eq!(position.entry_price(), entry_after_b());
    assert_eq!(position.realized_pnl(), Decimal::ZERO);
}

#[tokio::test]
async fn partial_settlement_then_refund_of_the_rest() {
    let manager = scenario_b().await;

    manager
        .try_freeze(&Barrier::new("gid-f", "freeze"), &user(), &btc(), dec!(6))
        .await
        .unwrap();
    manager
        .saga_deduct_frozen(&Barrier::new("gid-f", "settle"), &user(), &btc(), dec!(6), dec!(110))
        .await
        .unwrap();

    manager
        .try_freeze(&Barrier::new("gid-g", "freeze"), &user(), &btc(), dec!(4))
        .await
        .unwrap();
    manager
        .saga_refund_frozen(&Barrier::new("gid-g", "settle"), &user(), &btc(), dec!(4))
        .await
        .unwrap();

    let position = open_btc(&manager).await;
    assert_eq!(position.quantity(), dec!(9));
    assert_decimal_near(
        position.realized_pnl(),
        (dec!(110) - entry_after_b()) * dec!(6),
        dec!(0.000001),
    );
}

#[tokio::test]
async fn marked_price_feeds_unrealized_pnl_until_close() {
    let manager = scenario_b().await;
    let id = open_btc(&manager).await.id().clone();

    manager.update_position_price(&id, dec!(110)).await.unwrap();
    let marked = manager.get_position(&id).await.unwrap();
    assert_decimal_near(
        marked.unrealized_pnl(),
        (dec!(110) - entry_after_b()) * dec!(15),
        dec!(0.000001),
    );

    let closed = manager.close_position(&id, dec!(130)).await.unwrap();
    assert_position_sane(&closed);
    assert_decimal_near(closed.realized_pnl(), dec!(350), dec!(0.000001));

    let err = manager.update_position_price(&id, dec!(140)).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::PositionNotFound);
}

/// Run `work` on its own runtime task, the way an RPC server would.
async fn on_task<T, F>(work: F) -> T
where
    T: Send + 'static,
    F: Future<Output = Result<T>> + Send + 'static,
{
    tokio::spawn(work).await.unwrap().unwrap()
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn every_handler_runs_on_a_spawned_task() {
    let manager = Arc::new(manager());

    let m = Arc::clone(&manager);
    on_task(async move {
        m.saga_add_position(&Barrier::new("gid-s", "buy"), &user(), &btc(), dec!(10), dec!(100))
            .await
    })
    .await;

    let m = Arc::clone(&manager);
    on_task(async move {
        let undo = Barrier::new("gid-u", "buy");
        m.saga_add_position(&undo, &user(), &btc(), dec!(2), dec!(100)).await?;
        m.saga_sub_position(&undo, &user(), &btc(), dec!(2)).await
    })
    .await;

    let m = Arc::clone(&manager);
    on_task(async move {
        let sell = Barrier::new("gid-t", "freeze");
        m.try_freeze(&sell, &user(), &btc(), dec!(4)).await?;
        m.confirm_freeze(&sell, &user(), &btc(), dec!(4)).await
    })
    .await;

    let m = Arc::clone(&manager);
    on_task(async move {
        let sell = Barrier::new("gid-c", "freeze");
        m.try_freeze(&sell, &user(), &btc(), dec!(2)).await?;
        m.cancel_freeze(&sell, &user(), &btc(), dec!(2)).await
    })
    .await;

    let m = Arc::clone(&manager);
    on_task(async move {
        m.try_freeze(&Barrier::new("gid-d", "freeze"), &user(), &btc(), dec!(3)).await?;
        m.saga_deduct_frozen(&Barrier::new("gid-d", "settle"), &user(), &btc(), dec!(3), dec!(110))
            .await
    })
    .await;

    let m = Arc::clone(&manager);
    on_task(async move {
        m.try_freeze(&Barrier::new("gid-r", "freeze"), &user(), &btc(), dec!(1)).await?;
        m.saga_refund_frozen(&Barrier::new("gid-r", "settle"), &user(), &btc(), dec!(1))
            .await
    })
    .await;

    let m = Arc::clone(&manager);
    let open = on_task(async move { m.find_open_position(&user(), &btc()).await })
        .await
        .expect("open position");
    assert_position_sane(&open);
    assert_eq!(open.quantity(), dec!(3));
    assert_eq!(open.realized_pnl(), dec!(30));

    let m = Arc::clone(&manager);
    let id = open.id().clone();
    on_task(async move { m.update_position_price(&id, dec!(120)).await }).await;

    let m = Arc::clone(&manager);
    let id = open.id().clone();
    let marked = on_task(async move { m.get_position(&id).await }).await;
    assert_eq!(marked.unrealized_pnl(), dec!(60));

    let m = Arc::clone(&manager);
    let id = open.id().clone();
    let closed = on_task(async move { m.close_position(&id, dec!(120)).await }).await;
    assert_eq!(closed.status(), PositionStatus::Closed);
    assert_eq!(closed.realized_pnl(), dec!(90));

    let m = Arc::clone(&manager);
    let page = on_task(async move { m.list_positions(&user(), None, 0).await }).await;
    assert_eq!(page.total, 1);
}
