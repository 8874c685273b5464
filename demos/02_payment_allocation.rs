/// payment allocation - oldest-due-first with credit for the remainder
use condo_billing_rs::store::{ChargeRow, Embedded, UnitRef};
use condo_billing_rs::{
    AllocationMode, BillingConfig, BillingService, BillingStore, MemoryStore, Money,
    PaymentIntake, PaymentMethod, SafeTimeProvider, TimeSource, Uuid,
};
use chrono::{Duration, NaiveDate, TimeZone, Utc};
use rust_decimal::Decimal;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    println!("=== payment allocation example ===\n");

    let time = SafeTimeProvider::new(TimeSource::Test(
        Utc.with_ymd_and_hms(2024, 4, 2, 10, 0, 0).unwrap()
    ));
    let controller = time.test_control().unwrap();

    let unit_id = Uuid::new_v4();
    let mut store = MemoryStore::new();
    for (month, amount) in [(3, 20), (1, 50), (2, 30)] {
        store.add_charge(ChargeRow {
            id: Uuid::new_v4(),
            unit: Embedded::One(UnitRef { id: unit_id, code: Some("B-204".to_string()) }),
            description: Some(format!("monthly fee 2024-{:02}", month)),
            amount: Decimal::from(amount),
            balance: None,
            due_date: NaiveDate::from_ymd_opt(2024, month, 10).unwrap(),
            status: "pending".to_string(),
        });
    }

    let mut service = BillingService::new(BillingConfig::standard())?;
    let cashier = Uuid::new_v4();

    // 60 covers january in full and part of february
    let receipt = service.receive_payment(
        &mut store,
        cashier,
        PaymentIntake {
            unit_id,
            amount: Money::from_major(60),
            method: PaymentMethod::Transfer,
            reference: "TRX-8841".to_string(),
        },
        AllocationMode::Auto,
        &time,
    )?;
    println!("first payment:");
    println!("{}\n", receipt.json());

    // overpay; the remainder is kept as credit
    controller.advance(Duration::days(15));
    let receipt = service.receive_payment(
        &mut store,
        cashier,
        PaymentIntake {
            unit_id,
            amount: Money::from_major(100),
            method: PaymentMethod::Cash,
            reference: "REC-0192".to_string(),
        },
        AllocationMode::Auto,
        &time,
    )?;
    println!("second payment credited: {}", receipt.credited);
    println!("credit on file: {}\n", store.load_credit(unit_id)?.balance());

    // a new charge arrives and the credit is applied to it
    store.add_charge(ChargeRow {
        id: Uuid::new_v4(),
        unit: Embedded::One(UnitRef { id: unit_id, code: None }),
        description: Some("monthly fee 2024-04".to_string()),
        amount: Decimal::from(45),
        balance: None,
        due_date: NaiveDate::from_ymd_opt(2024, 4, 10).unwrap(),
        status: "pending".to_string(),
    });
    let applied = service.apply_credit(&mut store, cashier, unit_id, &time)?;
    println!("credit applied:");
    println!("{}", applied.json());

    Ok(())
}
