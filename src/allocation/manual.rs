use std::collections::{HashMap, HashSet};

use serde::{Deserialize, Serialize};

use crate::decimal::Money;
use crate::errors::{BillingError, Result};
use crate::types::ChargeId;

use super::{AllocationLine, AllocationPlan, LiveCharge};

/// caller-chosen amount for one charge
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ManualAllocation {
    pub charge_id: ChargeId,
    pub amount: Money,
}

impl ManualAllocation {
    pub fn new(charge_id: ChargeId, amount: Money) -> Self {
        Self { charge_id, amount }
    }
}

/// Validate manual allocations against authoritative charge snapshots.
///
/// `live` must come from the store, never from the client. Lines are
/// checked in request order; the first violation rejects the whole request.
pub fn validate_manual(
    payment_amount: Money,
    requested: &[ManualAllocation],
    live: &[LiveCharge],
) -> Result<AllocationPlan> {
    let by_id: HashMap<ChargeId, &LiveCharge> = live.iter().map(|c| (c.charge_id, c)).collect();
    let mut seen = HashSet::with_capacity(requested.len());
    let mut lines = Vec::with_capacity(requested.len());

    for allocation in requested {
        if !seen.insert(allocation.charge_id) {
            return Err(BillingError::DuplicateAllocation {
                charge_id: allocation.charge_id,
            });
        }

        if !allocation.amount.is_positive() {
            return Err(BillingError::InvalidAmount {
                field: format!("allocation for charge {}", allocation.charge_id),
                amount: allocation.amount,
            });
        }

        let charge = by_id
            .get(&allocation.charge_id)
            .ok_or(BillingError::ChargeNotFound {
                charge_id: allocation.charge_id,
            })?;

        if !charge.status.is_payable() {
            return Err(BillingError::ChargeNotPayable {
                charge_id: charge.charge_id,
                status: charge.status,
            });
        }

        if allocation.amount > charge.balance {
            return Err(BillingError::AllocationExceedsBalance {
                charge_id: charge.charge_id,
                requested: allocation.amount,
                balance: charge.balance,
            });
        }

        lines.push(AllocationLine {
            charge_id: allocation.charge_id,
            amount_allocated: allocation.amount,
        });
    }

    let allocated: Money = lines.iter().map(|l| l.amount_allocated).sum();
    if allocated > payment_amount {
        return Err(BillingError::SumExceedsPayment {
            allocated,
            payment: payment_amount,
        });
    }

    Ok(AllocationPlan::from_lines(payment_amount, lines))
}
