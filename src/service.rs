use std::collections::HashSet;

use chrono::{DateTime, Days, NaiveDate, Utc};
use hourglass_rs::SafeTimeProvider;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::allocation::{
    validate_manual, AllocationLine, AllocationMode, AllocationPlan, AllocationPlanner,
    ChargeBalance, LiveCharge,
};
use crate::config::BillingConfig;
use crate::decimal::Money;
use crate::distribution::{DistributionEngine, DistributionPreview, UnitShare};
use crate::errors::{BillingError, Result};
use crate::events::{Event, EventStore};
use crate::store::{
    normalize_charges, normalize_units, BillingStore, ChargeBatch, ChargeUpdate, NewCharge,
    PaymentMethod, PaymentRecord,
};
use crate::types::{
    BillingPeriod, ChargeId, ChargeKind, ChargeStatus, CondominiumId, DistributionMethod,
    PaymentId, PrincipalId, UnitId,
};

/// request to bill a total across a condominium's units
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DistributionRequest {
    pub condominium_id: CondominiumId,
    pub kind: ChargeKind,
    pub period: BillingPeriod,
    pub total: Money,
    /// configured default when absent
    pub method: Option<DistributionMethod>,
    pub description: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IssuedCharges {
    pub charge_ids: Vec<ChargeId>,
    pub issued_total: Money,
    /// units whose final amount was zero
    pub skipped_units: Vec<UnitId>,
}

/// incoming payment as captured by the intake form
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PaymentIntake {
    pub unit_id: UnitId,
    pub amount: Money,
    pub method: PaymentMethod,
    pub reference: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PaymentReceipt {
    pub payment_id: PaymentId,
    pub unit_id: UnitId,
    pub amount: Money,
    pub lines: Vec<AllocationLine>,
    pub allocated_total: Money,
    pub credited: Money,
    pub received_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CreditApplication {
    pub unit_id: UnitId,
    pub lines: Vec<AllocationLine>,
    pub applied_total: Money,
    pub remaining_credit: Money,
}

/// billing operations over an injected store
///
/// Every operation takes the store handle and the acting principal
/// explicitly; nothing is resolved from ambient context.
pub struct BillingService {
    config: BillingConfig,
    engine: DistributionEngine,
    planner: AllocationPlanner,
    events: EventStore,
}

impl BillingService {
    pub fn new(config: BillingConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            engine: DistributionEngine::new(config.distribution.residual_policy),
            planner: AllocationPlanner::new(),
            config,
            events: EventStore::new(),
        })
    }

    pub fn config(&self) -> &BillingConfig {
        &self.config
    }

    pub fn events(&self) -> &EventStore {
        &self.events
    }

    pub fn take_events(&mut self) -> Vec<Event> {
        self.events.take_events()
    }

    /// compute the billing preview from the condominium's active units
    pub fn preview_distribution<S: BillingStore + ?Sized>(
        &self,
        store: &S,
        request: &DistributionRequest,
    ) -> Result<DistributionPreview> {
        if request.total.is_negative() {
            return Err(BillingError::InvalidAmount {
                field: "total".to_string(),
                amount: request.total,
            });
        }

        let shares: Vec<UnitShare> = normalize_units(&store.active_units(request.condominium_id)?);
        if !shares.iter().any(|s| s.include) {
            return Err(BillingError::NoUnits);
        }

        let method = request.method.unwrap_or(self.config.distribution.default_method);
        let lines = self.engine.distribute(&shares, request.total, method);

        info!(
            condominium_id = %request.condominium_id,
            period = %request.period,
            total = %request.total,
            method = method.as_str(),
            units = lines.len(),
            "distribution preview computed"
        );

        Ok(DistributionPreview::new(request.total, method, lines))
    }

    /// persist one charge per preview line, using the final amounts
    pub fn issue_charges<S: BillingStore + ?Sized>(
        &mut self,
        store: &mut S,
        principal: PrincipalId,
        request: &DistributionRequest,
        preview: &DistributionPreview,
        time_provider: &SafeTimeProvider,
    ) -> Result<IssuedCharges> {
        if preview.is_empty() {
            return Err(BillingError::NoUnits);
        }
        if preview.requested_total != request.total {
            return Err(BillingError::Validation {
                message: format!(
                    "preview was computed for {} but request bills {}",
                    preview.requested_total, request.total
                ),
            });
        }
        if store.distribution_exists(request.condominium_id, &request.kind, request.period)? {
            return Err(BillingError::DuplicateDistribution {
                kind: request.kind.to_string(),
                period: request.period,
            });
        }

        // preview lines may have been edited or round-tripped; only bill units
        // the store still reports as billable for this condominium
        let billable: HashSet<UnitId> = normalize_units(&store.active_units(request.condominium_id)?)
            .into_iter()
            .filter(|s| s.include)
            .map(|s| s.unit_id)
            .collect();
        if let Some(line) = preview.lines.iter().find(|l| !billable.contains(&l.unit_id)) {
            return Err(BillingError::UnitNotInDistribution {
                unit_id: line.unit_id,
            });
        }

        let now = time_provider.now();
        let due_date = due_date_for(request.period, self.config.distribution.due_after_days)?;
        let description = request
            .description
            .clone()
            .unwrap_or_else(|| format!("{} {}", request.kind, request.period));

        let mut charges = Vec::with_capacity(preview.len());
        let mut skipped_units = Vec::new();
        for line in &preview.lines {
            if line.final_amount.is_negative() {
                return Err(BillingError::InvalidAmount {
                    field: format!("final amount for unit {}", line.unit_id),
                    amount: line.final_amount,
                });
            }
            if line.final_amount.is_zero() {
                skipped_units.push(line.unit_id);
                continue;
            }
            charges.push(NewCharge {
                unit_id: line.unit_id,
                description: description.clone(),
                amount: line.final_amount,
                due_date,
            });
        }
        if charges.is_empty() {
            return Err(BillingError::NoUnits);
        }

        let batch = ChargeBatch {
            condominium_id: request.condominium_id,
            kind: request.kind.clone(),
            period: request.period,
            method: preview.method,
            charges,
            issued_by: principal,
            issued_at: now,
        };
        let charge_ids = store.insert_charges(&batch)?;
        let issued_total: Money = batch.charges.iter().map(|c| c.amount).sum();

        for line in preview.overridden() {
            self.events.emit(Event::AmountOverridden {
                unit_id: line.unit_id,
                suggested_amount: line.suggested_amount,
                final_amount: line.final_amount,
            });
        }
        for (charge_id, charge) in charge_ids.iter().zip(&batch.charges) {
            self.events.emit(Event::ChargeIssued {
                charge_id: *charge_id,
                unit_id: charge.unit_id,
                amount: charge.amount,
                due_date: charge.due_date,
            });
        }
        self.events.emit(Event::ChargesDistributed {
            condominium_id: request.condominium_id,
            period: request.period,
            method: preview.method,
            requested_total: request.total,
            issued_total,
            unit_count: charge_ids.len(),
            issued_by: principal,
            timestamp: now,
        });

        if !preview.is_reconciled() {
            warn!(
                period = %request.period,
                difference = %preview.difference(),
                "issued charges differ from requested total after overrides"
            );
        }
        info!(
            condominium_id = %request.condominium_id,
            period = %request.period,
            charges = charge_ids.len(),
            issued_total = %issued_total,
            "charges issued"
        );

        Ok(IssuedCharges {
            charge_ids,
            issued_total,
            skipped_units,
        })
    }

    /// Record a payment and apply it to the unit's charges.
    ///
    /// Balances are always re-read from the store right before commit;
    /// nothing the client sent about balances is trusted.
    pub fn receive_payment<S: BillingStore + ?Sized>(
        &mut self,
        store: &mut S,
        principal: PrincipalId,
        intake: PaymentIntake,
        mode: AllocationMode,
        time_provider: &SafeTimeProvider,
    ) -> Result<PaymentReceipt> {
        if !intake.amount.is_positive() {
            return Err(BillingError::InvalidPaymentAmount {
                amount: intake.amount,
            });
        }
        if let Some(minimum) = self.config.payment.minimum_payment {
            if intake.amount < minimum {
                return Err(BillingError::PaymentBelowMinimum {
                    minimum,
                    provided: intake.amount,
                });
            }
        }

        let payment_id = Uuid::new_v4();
        let now = time_provider.now();

        let plan = match self.plan_payment(store, &intake, &mode) {
            Ok(plan) => plan,
            Err(err) => return Err(self.reject(payment_id, err, now)),
        };

        if plan.unallocated.is_positive() && !self.config.payment.allow_credit {
            let err = BillingError::Overpayment {
                remainder: plan.unallocated,
            };
            return Err(self.reject(payment_id, err, now));
        }

        let record = PaymentRecord {
            payment_id,
            unit_id: intake.unit_id,
            amount: intake.amount,
            method: intake.method,
            reference: intake.reference,
            credited: plan.unallocated,
            received_by: principal,
            received_at: now,
        };
        if let Err(err) = store.commit_payment(&record, &plan.lines) {
            return Err(self.reject(payment_id, err, now));
        }

        self.events.emit(Event::PaymentReceived {
            payment_id,
            unit_id: intake.unit_id,
            amount: intake.amount,
            received_by: principal,
            timestamp: now,
        });
        for line in &plan.lines {
            self.events.emit(Event::PaymentAllocated {
                payment_id,
                charge_id: line.charge_id,
                amount: line.amount_allocated,
                timestamp: now,
            });
        }
        if plan.unallocated.is_positive() {
            self.events.emit(Event::CreditRecorded {
                payment_id,
                unit_id: intake.unit_id,
                amount: plan.unallocated,
                timestamp: now,
            });
        }

        info!(
            payment_id = %payment_id,
            unit_id = %intake.unit_id,
            amount = %intake.amount,
            allocated = %plan.allocated_total,
            credited = %plan.unallocated,
            "payment recorded"
        );

        Ok(PaymentReceipt {
            payment_id,
            unit_id: intake.unit_id,
            amount: intake.amount,
            allocated_total: plan.allocated_total,
            credited: plan.unallocated,
            lines: plan.lines,
            received_at: now,
        })
    }

    fn plan_payment<S: BillingStore + ?Sized>(
        &self,
        store: &S,
        intake: &PaymentIntake,
        mode: &AllocationMode,
    ) -> Result<AllocationPlan> {
        match mode {
            AllocationMode::Auto => {
                let live = normalize_charges(&store.open_charges(intake.unit_id)?)?;
                Ok(self.planner.plan(intake.amount, &payable_balances(&live)))
            }
            AllocationMode::Manual(requested) => {
                let ids: Vec<ChargeId> = requested.iter().map(|a| a.charge_id).collect();
                let live = normalize_charges(&store.charges_by_id(&ids)?)?;
                if let Some(foreign) = live.iter().find(|c| c.unit_id != intake.unit_id) {
                    return Err(BillingError::Validation {
                        message: format!(
                            "charge {} belongs to another unit",
                            foreign.charge_id
                        ),
                    });
                }
                validate_manual(intake.amount, requested, &live)
            }
        }
    }

    /// apply a unit's accumulated credit to its open charges
    pub fn apply_credit<S: BillingStore + ?Sized>(
        &mut self,
        store: &mut S,
        principal: PrincipalId,
        unit_id: UnitId,
        time_provider: &SafeTimeProvider,
    ) -> Result<CreditApplication> {
        let credit = store.load_credit(unit_id)?;
        let live = normalize_charges(&store.open_charges(unit_id)?)?;
        let plan = credit.plan(&payable_balances(&live))?;

        let remaining_credit = credit.balance() - plan.allocated_total;
        if plan.lines.is_empty() {
            debug!(unit_id = %unit_id, credit = %remaining_credit, "no open charges for credit");
            return Ok(CreditApplication {
                unit_id,
                applied_total: Money::ZERO,
                lines: Vec::new(),
                remaining_credit,
            });
        }

        let now = time_provider.now();
        store.commit_credit_application(unit_id, &plan.lines, principal, now)?;

        self.events.emit(Event::CreditApplied {
            unit_id,
            amount: plan.allocated_total,
            remaining_credit,
            timestamp: now,
        });
        info!(
            unit_id = %unit_id,
            applied = %plan.allocated_total,
            remaining = %remaining_credit,
            "credit applied"
        );

        Ok(CreditApplication {
            unit_id,
            applied_total: plan.allocated_total,
            lines: plan.lines,
            remaining_credit,
        })
    }

    /// withdraw a charge that has not received any payment
    pub fn cancel_charge<S: BillingStore + ?Sized>(
        &mut self,
        store: &mut S,
        principal: PrincipalId,
        charge_id: ChargeId,
        reason: &str,
        time_provider: &SafeTimeProvider,
    ) -> Result<()> {
        let charge = fetch_charge(store, charge_id)?;
        ensure_untouched(&charge)?;

        store.update_charge(charge_id, &ChargeUpdate::status(ChargeStatus::Cancelled))?;
        self.events.emit(Event::ChargeCancelled {
            charge_id,
            reason: reason.to_string(),
            cancelled_by: principal,
            timestamp: time_provider.now(),
        });
        info!(charge_id = %charge_id, reason, "charge cancelled");
        Ok(())
    }

    /// change the amount of a charge that has not received any payment
    pub fn amend_charge<S: BillingStore + ?Sized>(
        &mut self,
        store: &mut S,
        principal: PrincipalId,
        charge_id: ChargeId,
        new_amount: Money,
        time_provider: &SafeTimeProvider,
    ) -> Result<()> {
        if !new_amount.is_positive() {
            return Err(BillingError::InvalidAmount {
                field: "charge amount".to_string(),
                amount: new_amount,
            });
        }

        let charge = fetch_charge(store, charge_id)?;
        ensure_untouched(&charge)?;

        store.update_charge(charge_id, &ChargeUpdate::amount(new_amount))?;
        self.events.emit(Event::ChargeAmended {
            charge_id,
            old_amount: charge.amount,
            new_amount,
            amended_by: principal,
            timestamp: time_provider.now(),
        });
        info!(charge_id = %charge_id, old = %charge.amount, new = %new_amount, "charge amended");
        Ok(())
    }

    fn reject(&mut self, payment_id: PaymentId, err: BillingError, at: DateTime<Utc>) -> BillingError {
        warn!(payment_id = %payment_id, code = err.code(), error = %err, "payment rejected");
        self.events.emit(Event::AllocationRejected {
            payment_id,
            code: err.code().to_string(),
            reason: err.to_string(),
            timestamp: at,
        });
        err
    }
}

fn payable_balances(live: &[LiveCharge]) -> Vec<ChargeBalance> {
    live.iter()
        .filter(|c| c.status.is_payable())
        .map(LiveCharge::to_balance)
        .collect()
}

fn fetch_charge<S: BillingStore + ?Sized>(store: &S, charge_id: ChargeId) -> Result<LiveCharge> {
    let rows = store.charges_by_id(&[charge_id])?;
    let row = rows
        .first()
        .ok_or(BillingError::ChargeNotFound { charge_id })?;
    LiveCharge::try_from(row)
}

/// terminal charges and charges with payments applied are frozen
fn ensure_untouched(charge: &LiveCharge) -> Result<()> {
    if charge.status.is_terminal() {
        return Err(BillingError::ChargeNotPayable {
            charge_id: charge.charge_id,
            status: charge.status,
        });
    }
    if charge.has_payments() {
        return Err(BillingError::ChargeHasPayments {
            charge_id: charge.charge_id,
            paid: charge.paid(),
        });
    }
    Ok(())
}

fn due_date_for(period: BillingPeriod, due_after_days: u32) -> Result<NaiveDate> {
    NaiveDate::from_ymd_opt(period.year, period.month, 1)
        .and_then(|start| start.checked_add_days(Days::new(u64::from(due_after_days))))
        .ok_or_else(|| BillingError::Validation {
            message: format!("no due date for period {}", period),
        })
}
