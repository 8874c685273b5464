use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::decimal::Money;
use crate::errors::{BillingError, Result};
use crate::types::{PaymentId, UnitId};

use super::{AllocationPlan, AllocationPlanner, ChargeBalance};

/// credit balance held for a unit from unallocated payment remainders
///
/// The balance is always deposits minus consumed credit; a stored account
/// that claims otherwise is refused on load.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "StoredCreditAccount")]
pub struct CreditAccount {
    pub unit_id: UnitId,
    deposits: Vec<CreditDeposit>,
    consumed: Money,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CreditDeposit {
    pub payment_id: PaymentId,
    pub amount: Money,
    pub deposited_at: DateTime<Utc>,
}

#[derive(Deserialize)]
struct StoredCreditAccount {
    unit_id: UnitId,
    #[serde(default)]
    deposits: Vec<CreditDeposit>,
    #[serde(default)]
    consumed: Money,
}

impl TryFrom<StoredCreditAccount> for CreditAccount {
    type Error = BillingError;

    fn try_from(stored: StoredCreditAccount) -> Result<Self> {
        if let Some(bad) = stored.deposits.iter().find(|d| !d.amount.is_positive()) {
            return Err(BillingError::Store {
                message: format!("credit deposit {} has non-positive amount {}", bad.payment_id, bad.amount),
            });
        }
        let deposited: Money = stored.deposits.iter().map(|d| d.amount).sum();
        if stored.consumed.is_negative() || stored.consumed > deposited {
            return Err(BillingError::Store {
                message: format!(
                    "credit for unit {} consumed {} of {} deposited",
                    stored.unit_id, stored.consumed, deposited
                ),
            });
        }
        Ok(CreditAccount {
            unit_id: stored.unit_id,
            deposits: stored.deposits,
            consumed: stored.consumed,
        })
    }
}

impl CreditAccount {
    pub fn new(unit_id: UnitId) -> Self {
        Self {
            unit_id,
            deposits: Vec::new(),
            consumed: Money::ZERO,
        }
    }

    pub fn balance(&self) -> Money {
        self.deposited() - self.consumed
    }

    pub fn deposited(&self) -> Money {
        self.deposits.iter().map(|d| d.amount).sum()
    }

    pub fn consumed(&self) -> Money {
        self.consumed
    }

    pub fn deposits(&self) -> &[CreditDeposit] {
        &self.deposits
    }

    pub fn has_credit(&self) -> bool {
        self.balance().is_positive()
    }

    pub fn deposit(&mut self, amount: Money, payment_id: PaymentId, at: DateTime<Utc>) -> Result<()> {
        if !amount.is_positive() {
            return Err(BillingError::InvalidAmount {
                field: "credit deposit".to_string(),
                amount,
            });
        }

        self.deposits.push(CreditDeposit {
            payment_id,
            amount,
            deposited_at: at,
        });
        Ok(())
    }

    /// plan how the available credit would cover `charges`, without consuming it
    pub fn plan(&self, charges: &[ChargeBalance]) -> Result<AllocationPlan> {
        if !self.has_credit() {
            return Err(BillingError::NoCredit {
                unit_id: self.unit_id,
            });
        }
        Ok(AllocationPlanner::new().plan(self.balance(), charges))
    }

    /// consume credit for a plan that has been committed
    pub fn consume(&mut self, plan: &AllocationPlan) -> Result<Money> {
        let available = self.balance();
        if plan.allocated_total > available {
            return Err(BillingError::SumExceedsPayment {
                allocated: plan.allocated_total,
                payment: available,
            });
        }
        self.consumed += plan.allocated_total;
        Ok(self.balance())
    }

    /// plan and consume in one step
    pub fn apply(&mut self, charges: &[ChargeBalance]) -> Result<AllocationPlan> {
        let plan = self.plan(charges)?;
        self.consume(&plan)?;
        Ok(plan)
    }
}
