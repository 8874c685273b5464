use std::collections::HashMap;

use chrono::{DateTime, Utc};
use tracing::debug;
use uuid::Uuid;

use crate::allocation::{
    validate_manual, AllocationLine, AllocationPlan, CreditAccount, LiveCharge, ManualAllocation,
};
use crate::decimal::Money;
use crate::errors::{BillingError, Result};
use crate::types::{
    BillingPeriod, ChargeId, ChargeKind, ChargeStatus, CondominiumId, PaymentId, PrincipalId,
    UnitId,
};

use super::rows::{normalize_charges, ChargeRow, Embedded, UnitRef, UnitRow};
use super::{BillingStore, ChargeBatch, ChargeUpdate, PaymentRecord};

const OPEN_STATUSES: [&str; 2] = ["pending", "partially_paid"];

/// credit consumed against charges, as logged by the store
#[derive(Debug, Clone, PartialEq)]
pub struct CreditApplicationRecord {
    pub unit_id: UnitId,
    pub line: AllocationLine,
    pub applied_by: PrincipalId,
    pub applied_at: DateTime<Utc>,
}

/// in-memory billing store with the same all-or-nothing write semantics
/// expected from the relational backend
#[derive(Debug, Default)]
pub struct MemoryStore {
    units: Vec<UnitRow>,
    charges: Vec<ChargeRow>,
    batches: Vec<(CondominiumId, ChargeKind, BillingPeriod)>,
    payments: Vec<PaymentRecord>,
    allocations: Vec<(PaymentId, AllocationLine)>,
    credits: HashMap<UnitId, CreditAccount>,
    credit_applications: Vec<CreditApplicationRecord>,
    unavailable: bool,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_unit(&mut self, row: UnitRow) {
        self.units.push(row);
    }

    pub fn add_charge(&mut self, row: ChargeRow) {
        self.charges.push(row);
    }

    pub fn set_unit_billable(&mut self, unit_id: UnitId, billable: bool) {
        if let Some(unit) = self.units.iter_mut().find(|u| u.id == unit_id) {
            unit.billable = Some(billable);
        }
    }

    /// make every subsequent call fail as if the backend were unreachable
    pub fn set_unavailable(&mut self, unavailable: bool) {
        self.unavailable = unavailable;
    }

    pub fn charge(&self, charge_id: ChargeId) -> Option<LiveCharge> {
        self.charges
            .iter()
            .find(|r| r.id == charge_id)
            .and_then(|r| LiveCharge::try_from(r).ok())
    }

    pub fn charges(&self) -> &[ChargeRow] {
        &self.charges
    }

    pub fn payments(&self) -> &[PaymentRecord] {
        &self.payments
    }

    pub fn allocations_for(&self, payment_id: PaymentId) -> Vec<AllocationLine> {
        self.allocations
            .iter()
            .filter(|(id, _)| *id == payment_id)
            .map(|(_, line)| line.clone())
            .collect()
    }

    pub fn credit_applications(&self) -> &[CreditApplicationRecord] {
        &self.credit_applications
    }

    fn check_available(&self) -> Result<()> {
        if self.unavailable {
            return Err(BillingError::Store {
                message: "backend unavailable".to_string(),
            });
        }
        Ok(())
    }

    /// re-read the referenced charges and validate the lines against them
    fn revalidate(&self, budget: Money, lines: &[AllocationLine]) -> Result<()> {
        let ids: Vec<ChargeId> = lines.iter().map(|l| l.charge_id).collect();
        let live = normalize_charges(&self.charges_by_id(&ids)?)?;
        let requested: Vec<ManualAllocation> = lines
            .iter()
            .map(|l| ManualAllocation::new(l.charge_id, l.amount_allocated))
            .collect();
        validate_manual(budget, &requested, &live)?;
        Ok(())
    }

    fn apply_line(&mut self, line: &AllocationLine) -> Result<()> {
        let row = self
            .charges
            .iter_mut()
            .find(|r| r.id == line.charge_id)
            .ok_or(BillingError::ChargeNotFound {
                charge_id: line.charge_id,
            })?;

        let amount = Money::from_decimal(row.amount);
        let balance = Money::from_decimal(row.balance.unwrap_or(row.amount)) - line.amount_allocated;
        row.balance = Some(balance.as_decimal());
        row.status = ChargeStatus::for_balance(amount, balance).as_str().to_string();
        Ok(())
    }

    fn unit_code(&self, unit_id: UnitId) -> Option<String> {
        self.units
            .iter()
            .find(|u| u.id == unit_id)
            .map(|u| u.code.clone())
    }
}

impl BillingStore for MemoryStore {
    fn active_units(&self, condominium_id: CondominiumId) -> Result<Vec<UnitRow>> {
        self.check_available()?;
        Ok(self
            .units
            .iter()
            .filter(|u| u.condominium_id == condominium_id && u.active)
            .cloned()
            .collect())
    }

    fn distribution_exists(
        &self,
        condominium_id: CondominiumId,
        kind: &ChargeKind,
        period: BillingPeriod,
    ) -> Result<bool> {
        self.check_available()?;
        Ok(self
            .batches
            .iter()
            .any(|(c, k, p)| *c == condominium_id && k == kind && *p == period))
    }

    fn insert_charges(&mut self, batch: &ChargeBatch) -> Result<Vec<ChargeId>> {
        self.check_available()?;
        if self.distribution_exists(batch.condominium_id, &batch.kind, batch.period)? {
            return Err(BillingError::Store {
                message: format!(
                    "unique violation on batch ({}, {})",
                    batch.condominium_id, batch.period
                ),
            });
        }

        let rows: Vec<ChargeRow> = batch
            .charges
            .iter()
            .map(|c| ChargeRow {
                id: Uuid::new_v4(),
                unit: Embedded::One(UnitRef {
                    id: c.unit_id,
                    code: self.unit_code(c.unit_id),
                }),
                description: Some(c.description.clone()),
                amount: c.amount.as_decimal(),
                balance: Some(c.amount.as_decimal()),
                due_date: c.due_date,
                status: ChargeStatus::Pending.as_str().to_string(),
            })
            .collect();

        let ids = rows.iter().map(|r| r.id).collect();
        self.charges.extend(rows);
        self.batches
            .push((batch.condominium_id, batch.kind.clone(), batch.period));
        Ok(ids)
    }

    fn open_charges(&self, unit_id: UnitId) -> Result<Vec<ChargeRow>> {
        self.check_available()?;
        Ok(self
            .charges
            .iter()
            .filter(|r| r.unit.first().map(|u| u.id) == Some(unit_id))
            .filter(|r| OPEN_STATUSES.contains(&r.status.as_str()))
            .cloned()
            .collect())
    }

    fn charges_by_id(&self, ids: &[ChargeId]) -> Result<Vec<ChargeRow>> {
        self.check_available()?;
        Ok(self
            .charges
            .iter()
            .filter(|r| ids.contains(&r.id))
            .cloned()
            .collect())
    }

    fn commit_payment(&mut self, payment: &PaymentRecord, lines: &[AllocationLine]) -> Result<()> {
        self.check_available()?;
        self.revalidate(payment.amount, lines)?;

        let allocated: Money = lines.iter().map(|l| l.amount_allocated).sum();
        if payment.credited.is_negative() || allocated + payment.credited > payment.amount {
            return Err(BillingError::SumExceedsPayment {
                allocated: allocated + payment.credited,
                payment: payment.amount,
            });
        }

        // validated; from here on nothing can fail half way
        for line in lines {
            self.apply_line(line)?;
            self.allocations.push((payment.payment_id, line.clone()));
        }

        if payment.credited.is_positive() {
            self.credits
                .entry(payment.unit_id)
                .or_insert_with(|| CreditAccount::new(payment.unit_id))
                .deposit(payment.credited, payment.payment_id, payment.received_at)?;
        }

        self.payments.push(payment.clone());
        debug!(payment_id = %payment.payment_id, lines = lines.len(), "payment committed");
        Ok(())
    }

    fn load_credit(&self, unit_id: UnitId) -> Result<CreditAccount> {
        self.check_available()?;
        Ok(self
            .credits
            .get(&unit_id)
            .cloned()
            .unwrap_or_else(|| CreditAccount::new(unit_id)))
    }

    fn commit_credit_application(
        &mut self,
        unit_id: UnitId,
        lines: &[AllocationLine],
        applied_by: PrincipalId,
        applied_at: DateTime<Utc>,
    ) -> Result<()> {
        self.check_available()?;
        let available = self
            .credits
            .get(&unit_id)
            .map(|c| c.balance())
            .ok_or(BillingError::NoCredit { unit_id })?;
        self.revalidate(available, lines)?;

        for line in lines {
            self.apply_line(line)?;
            self.credit_applications.push(CreditApplicationRecord {
                unit_id,
                line: line.clone(),
                applied_by,
                applied_at,
            });
        }

        if let Some(credit) = self.credits.get_mut(&unit_id) {
            credit.consume(&AllocationPlan::from_lines(available, lines.to_vec()))?;
        }
        Ok(())
    }

    fn update_charge(&mut self, charge_id: ChargeId, update: &ChargeUpdate) -> Result<()> {
        self.check_available()?;
        let row = self
            .charges
            .iter_mut()
            .find(|r| r.id == charge_id)
            .ok_or(BillingError::ChargeNotFound { charge_id })?;

        if let Some(amount) = update.amount {
            row.amount = amount.as_decimal();
        }
        if let Some(balance) = update.balance {
            row.balance = Some(balance.as_decimal());
        }
        if let Some(status) = update.status {
            row.status = status.as_str().to_string();
        }
        Ok(())
    }
}
