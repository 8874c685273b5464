/// distribution - preview, adjust and issue a monthly fee
use condo_billing_rs::store::UnitRow;
use condo_billing_rs::{
    BillingConfig, BillingPeriod, BillingService, ChargeKind, DistributionRequest, MemoryStore,
    Money, SafeTimeProvider, TimeSource, Uuid,
};
use chrono::{TimeZone, Utc};
use rust_decimal_macros::dec;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    println!("=== charge distribution example ===\n");

    let time = SafeTimeProvider::new(TimeSource::Test(
        Utc.with_ymd_and_hms(2024, 5, 25, 9, 0, 0).unwrap()
    ));

    // a small building with three units by aliquot
    let condominium_id = Uuid::new_v4();
    let mut store = MemoryStore::new();
    let mut units = Vec::new();
    for (code, aliquot) in [("A-101", dec!(33.33)), ("A-102", dec!(33.33)), ("A-103", dec!(33.34))] {
        let id = Uuid::new_v4();
        store.add_unit(UnitRow {
            id,
            condominium_id,
            code: code.to_string(),
            aliquot: Some(aliquot),
            active: true,
            billable: None,
        });
        units.push(id);
    }

    let mut service = BillingService::new(BillingConfig::standard())?;
    let request = DistributionRequest {
        condominium_id,
        kind: ChargeKind::MonthlyFee,
        period: BillingPeriod::new(2024, 6)?,
        total: Money::from_major(1_000),
        method: None,
        description: None,
    };

    // preview first; nothing is persisted yet
    let mut preview = service.preview_distribution(&store, &request)?;
    println!("suggested split:");
    println!("{}\n", preview.json());

    // preparer tweaks one unit by hand
    preview.override_amount(units[0], Money::from_str_exact("330.00")?)?;
    println!("after override, difference: {}", preview.difference());

    // put the residual back so the batch reconciles
    preview.override_amount(units[2], Money::from_str_exact("336.70")?)?;
    println!("reconciled: {}\n", preview.is_reconciled());

    let admin = Uuid::new_v4();
    let issued = service.issue_charges(&mut store, admin, &request, &preview, &time)?;
    println!("issued {} charges totalling {}", issued.charge_ids.len(), issued.issued_total);

    // issuing the same period twice is refused
    match service.issue_charges(&mut store, admin, &request, &preview, &time) {
        Ok(_) => println!("unexpected second batch"),
        Err(e) => println!("second run rejected: {} ({})", e, e.code()),
    }

    println!("\nevents:");
    for event in service.take_events() {
        println!("  {:?}", event);
    }

    Ok(())
}
