pub mod credit;
pub mod manual;
pub mod planner;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::decimal::Money;
use crate::types::{ChargeId, ChargeStatus, UnitId};

pub use credit::{CreditAccount, CreditDeposit};
pub use manual::{validate_manual, ManualAllocation};
pub use planner::{allocate, AllocationPlanner};

/// one outstanding receivable as seen by the planner
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChargeBalance {
    pub charge_id: ChargeId,
    pub balance: Money,
    /// sort key only
    pub due_date: NaiveDate,
}

/// payment-to-charge assignment
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AllocationLine {
    pub charge_id: ChargeId,
    pub amount_allocated: Money,
}

/// authoritative snapshot of a stored charge, read right before commit
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LiveCharge {
    pub charge_id: ChargeId,
    pub unit_id: UnitId,
    pub amount: Money,
    pub balance: Money,
    pub due_date: NaiveDate,
    pub status: ChargeStatus,
}

impl LiveCharge {
    /// amount already covered by payments
    pub fn paid(&self) -> Money {
        (self.amount - self.balance).max(Money::ZERO)
    }

    pub fn has_payments(&self) -> bool {
        self.paid().is_positive()
    }

    pub fn to_balance(&self) -> ChargeBalance {
        ChargeBalance {
            charge_id: self.charge_id,
            balance: self.balance,
            due_date: self.due_date,
        }
    }
}

/// how an incoming payment is spread over charges
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AllocationMode {
    /// oldest-due-first over the unit's open charges
    Auto,
    /// caller-chosen amounts, validated against live balances
    Manual(Vec<ManualAllocation>),
}

/// result of planning or validating an allocation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AllocationPlan {
    pub payment_amount: Money,
    pub lines: Vec<AllocationLine>,
    pub allocated_total: Money,
    /// left for the caller, usually recorded as credit
    pub unallocated: Money,
}

impl AllocationPlan {
    pub fn from_lines(payment_amount: Money, lines: Vec<AllocationLine>) -> Self {
        let allocated_total: Money = lines.iter().map(|l| l.amount_allocated).sum();
        Self {
            payment_amount,
            allocated_total,
            unallocated: (payment_amount - allocated_total).max(Money::ZERO),
            lines,
        }
    }

    pub fn is_fully_allocated(&self) -> bool {
        self.unallocated.is_zero()
    }

    /// amount planned for one charge, zero if untouched
    pub fn allocated_to(&self, charge_id: ChargeId) -> Money {
        self.lines
            .iter()
            .filter(|l| l.charge_id == charge_id)
            .map(|l| l.amount_allocated)
            .sum()
    }
}
