/// manual allocation - caller-chosen amounts checked against live balances
use condo_billing_rs::allocation::ManualAllocation;
use condo_billing_rs::store::{ChargeRow, Embedded, UnitRef};
use condo_billing_rs::{
    ActionOutcome, AllocationMode, BillingConfig, BillingService, MemoryStore, Money,
    PaymentIntake, PaymentMethod, SafeTimeProvider, TimeSource, Uuid,
};
use chrono::NaiveDate;
use rust_decimal::Decimal;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    println!("=== manual allocation example ===\n");

    let time = SafeTimeProvider::new(TimeSource::System);
    let unit_id = Uuid::new_v4();
    let charge_id = Uuid::new_v4();

    let mut store = MemoryStore::new();
    store.add_charge(ChargeRow {
        id: charge_id,
        unit: Embedded::Many(vec![UnitRef { id: unit_id, code: None }]),
        description: Some("extraordinary fee 2024-02".to_string()),
        amount: Decimal::from(50),
        balance: None,
        due_date: NaiveDate::from_ymd_opt(2024, 2, 10).unwrap(),
        status: "pending".to_string(),
    });

    let mut service = BillingService::new(BillingConfig::standard())?;
    let cashier = Uuid::new_v4();
    let intake = |amount: i64| PaymentIntake {
        unit_id,
        amount: Money::from_major(amount),
        method: PaymentMethod::Check,
        reference: "CHK-311".to_string(),
    };

    // asking for more than the charge owes
    let result = service.receive_payment(
        &mut store,
        cashier,
        intake(55),
        AllocationMode::Manual(vec![ManualAllocation::new(charge_id, Money::from_major(55))]),
        &time,
    );
    let outcome: ActionOutcome<_> = result.into();
    println!("over-allocation: {}", serde_json::to_string(&outcome)?);

    // a valid split, with the rest kept as credit
    let result = service.receive_payment(
        &mut store,
        cashier,
        intake(70),
        AllocationMode::Manual(vec![ManualAllocation::new(charge_id, Money::from_major(50))]),
        &time,
    );
    let outcome: ActionOutcome<_> = result.into();
    println!("valid allocation: {}", serde_json::to_string_pretty(&outcome)?);

    // the charge is paid now, so it no longer accepts money
    let result = service.receive_payment(
        &mut store,
        cashier,
        intake(10),
        AllocationMode::Manual(vec![ManualAllocation::new(charge_id, Money::from_major(10))]),
        &time,
    );
    let outcome: ActionOutcome<_> = result.into();
    println!("paid charge: {}", serde_json::to_string(&outcome)?);

    Ok(())
}
