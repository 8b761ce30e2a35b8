//! Transfer saga failure handling.
//!
//! A [`FlakyStore`] injects failures and delays into individual store calls so
//! each saga step can be broken in isolation. After every failure no balance
//! may be left changed and the transfer must record how it ended.

mod common;

use std::sync::Arc;
use std::sync::atomic::Ordering;
use std::time::Duration;

use chrono::Utc;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;

use boveda_core::LedgerError;
use boveda_core::movement::{MovementKind, MovementStatus};
use boveda_core::period::Period;
use boveda_core::transfer::{Transfer, TransferRequest, TransferStatus};
use boveda_db::VaultLedger;
use boveda_shared::config::AppConfig;

use common::{FlakyStore, actor, config_with_openings, draft, key};

fn config() -> AppConfig {
    let mut config = config_with_openings(&[("azteca", dec!(1000.00))]);
    config.ledger.saga_step_timeout_ms = 100;
    config
}

async fn flaky_ledger(config: &AppConfig) -> (VaultLedger, Arc<FlakyStore>) {
    let store = Arc::new(FlakyStore::new());
    let ledger = VaultLedger::bootstrap(config, store.clone()).await.unwrap();
    (ledger, store)
}

fn request(amount: Decimal) -> TransferRequest {
    TransferRequest {
        origin: key("azteca"),
        destination: key("utilidades"),
        amount,
        concept: "Traspaso a utilidades".to_string(),
        occurred_on: None,
        actor: actor("ana"),
        operation_id: None,
    }
}

async fn only_transfer(ledger: &VaultLedger) -> Transfer {
    let transfers = ledger.list_transfers(&key("azteca")).await.unwrap();
    assert_eq!(transfers.len(), 1);
    transfers.into_iter().next().unwrap()
}

async fn assert_untouched(ledger: &VaultLedger) {
    assert_eq!(
        ledger.get_vault_balance(&key("azteca")).await.unwrap().amount,
        dec!(1000.00)
    );
    assert_eq!(
        ledger.get_vault_balance(&key("utilidades")).await.unwrap().amount,
        dec!(0)
    );
}

#[tokio::test]
async fn test_in_leg_write_failure_cancels_out_leg() {
    let (ledger, store) = flaky_ledger(&config()).await;
    *store.fail_insert_movement_for.lock().unwrap() = Some(key("utilidades"));

    let err = ledger.transfer(request(dec!(500.00))).await.unwrap_err();
    assert!(matches!(err, LedgerError::Storage(_)), "{err}");
    assert_untouched(&ledger).await;

    let transfer = only_transfer(&ledger).await;
    assert_eq!(transfer.status, TransferStatus::Failed);
    assert!(
        transfer
            .failure_reason
            .as_deref()
            .is_some_and(|r| r.starts_with("write_in_leg")),
        "{:?}",
        transfer.failure_reason
    );
    let out_leg = ledger.get_movement(transfer.out_leg).await.unwrap();
    assert_eq!(out_leg.status, MovementStatus::Cancelled);
    assert!(matches!(
        ledger.get_movement(transfer.in_leg).await,
        Err(LedgerError::MovementNotFound(_))
    ));
}

#[tokio::test]
async fn test_in_leg_apply_failure_reverts_out_leg() {
    let (ledger, store) = flaky_ledger(&config()).await;
    *store.fail_update_vault_for.lock().unwrap() = Some(key("utilidades"));

    let err = ledger.transfer(request(dec!(500.00))).await.unwrap_err();
    assert!(matches!(err, LedgerError::Storage(_)), "{err}");
    assert_untouched(&ledger).await;

    let transfer = only_transfer(&ledger).await;
    assert_eq!(transfer.status, TransferStatus::Compensated);
    let out_leg = ledger.get_movement(transfer.out_leg).await.unwrap();
    let in_leg = ledger.get_movement(transfer.in_leg).await.unwrap();
    assert_eq!(out_leg.status, MovementStatus::Reversed);
    assert_eq!(in_leg.status, MovementStatus::Failed);
}

#[tokio::test]
async fn test_slow_step_times_out_and_compensates() {
    let (ledger, store) = flaky_ledger(&config()).await;
    *store.delay_update_vault_for.lock().unwrap() =
        Some((key("utilidades"), Duration::from_millis(500)));

    let err = ledger.transfer(request(dec!(500.00))).await.unwrap_err();
    assert!(
        matches!(err, LedgerError::StepTimedOut { step: "apply_in_leg" }),
        "{err}"
    );
    assert_untouched(&ledger).await;

    let transfer = only_transfer(&ledger).await;
    assert_eq!(transfer.status, TransferStatus::Compensated);
}

#[tokio::test]
async fn test_out_leg_apply_failure_fails_transfer() {
    let (ledger, store) = flaky_ledger(&config()).await;
    *store.fail_update_vault_for.lock().unwrap() = Some(key("azteca"));

    let err = ledger.transfer(request(dec!(500.00))).await.unwrap_err();
    assert!(matches!(err, LedgerError::Storage(_)), "{err}");
    assert_untouched(&ledger).await;

    let transfer = only_transfer(&ledger).await;
    assert_eq!(transfer.status, TransferStatus::Failed);
    let out_leg = ledger.get_movement(transfer.out_leg).await.unwrap();
    let in_leg = ledger.get_movement(transfer.in_leg).await.unwrap();
    assert_eq!(out_leg.status, MovementStatus::Failed);
    assert_eq!(in_leg.status, MovementStatus::Cancelled);
}

#[tokio::test]
async fn test_transient_failures_are_retried() {
    let (ledger, store) = flaky_ledger(&config()).await;
    store.transient_update_vault_failures.store(2, Ordering::SeqCst);

    let done = ledger.transfer(request(dec!(500.00))).await.unwrap();
    assert_eq!(done.status, TransferStatus::Completed);
    assert_eq!(
        ledger.get_vault_balance(&key("azteca")).await.unwrap().amount,
        dec!(500.00)
    );
    assert_eq!(
        ledger.get_vault_balance(&key("utilidades")).await.unwrap().amount,
        dec!(500.00)
    );
}

#[tokio::test]
async fn test_exhausted_retries_need_manual_reconciliation() {
    let (ledger, store) = flaky_ledger(&config()).await;
    store.transient_update_vault_failures.store(10, Ordering::SeqCst);

    let today = Utc::now().date_naive();
    let err = ledger
        .record_movement(draft("azteca", MovementKind::Expense, dec!(10.00), "Papeleria", today))
        .await
        .unwrap_err();
    assert!(
        matches!(err, LedgerError::ManualReconciliationRequired(_)),
        "{err}"
    );
    assert_eq!(err.http_status_code(), 409);
    store.transient_update_vault_failures.store(0, Ordering::SeqCst);

    assert_eq!(
        ledger.get_vault_balance(&key("azteca")).await.unwrap().amount,
        dec!(1000.00)
    );
    let period = Period::new(today, today).unwrap();
    let movements = ledger.list_movements(&key("azteca"), &period).await.unwrap();
    let last = movements.last().unwrap();
    assert_eq!(last.concept, "Papeleria");
    assert_eq!(last.status, MovementStatus::Failed);
}

#[tokio::test]
async fn test_failed_transfer_key_can_be_retried() {
    let (ledger, store) = flaky_ledger(&config()).await;
    *store.fail_update_vault_for.lock().unwrap() = Some(key("utilidades"));

    let mut keyed = request(dec!(500.00));
    keyed.operation_id = Some("tr-retry".parse().unwrap());
    ledger.transfer(keyed.clone()).await.unwrap_err();

    *store.fail_update_vault_for.lock().unwrap() = None;
    let done = ledger.transfer(keyed).await.unwrap();
    assert_eq!(done.status, TransferStatus::Completed);
    assert_eq!(
        ledger.get_vault_balance(&key("utilidades")).await.unwrap().amount,
        dec!(500.00)
    );
}

#[tokio::test]
async fn test_unlinked_reversal_is_undone() {
    let (ledger, store) = flaky_ledger(&config()).await;
    let today = Utc::now().date_naive();
    let expense = ledger
        .record_movement(draft("azteca", MovementKind::Expense, dec!(300.00), "Renta", today))
        .await
        .unwrap();
    *store.fail_update_movement.lock().unwrap() = Some(expense.id);

    let err = ledger
        .reverse_movement(expense.id, "Captura duplicada", actor("luis"))
        .await
        .unwrap_err();
    assert!(matches!(err, LedgerError::Storage(_)), "{err}");
    assert_eq!(
        ledger.get_vault_balance(&key("azteca")).await.unwrap().amount,
        dec!(700.00)
    );
    assert_eq!(ledger.get_movement(expense.id).await.unwrap().reversed_by, None);

    let period = Period::new(today, today).unwrap();
    let movements = ledger.list_movements(&key("azteca"), &period).await.unwrap();
    let orphan = movements
        .iter()
        .find(|m| m.reverses == Some(expense.id))
        .unwrap();
    assert_eq!(orphan.status, MovementStatus::Failed);

    *store.fail_update_movement.lock().unwrap() = None;
    let reversal = ledger
        .reverse_movement(expense.id, "Captura duplicada", actor("luis"))
        .await
        .unwrap();
    assert_eq!(reversal.status, MovementStatus::Completed);
    assert_eq!(
        ledger.get_vault_balance(&key("azteca")).await.unwrap().amount,
        dec!(1000.00)
    );

    let err = ledger
        .reverse_movement(expense.id, "Otra vez", actor("luis"))
        .await
        .unwrap_err();
    assert!(matches!(err, LedgerError::AlreadyReversed(_)), "{err}");
}
