use tracing::debug;

use crate::decimal::Money;

use super::{AllocationLine, AllocationPlan, ChargeBalance};

/// greedy oldest-first allocation, returning only the lines
pub fn allocate(payment_amount: Money, charges: &[ChargeBalance]) -> Vec<AllocationLine> {
    AllocationPlanner::new().plan(payment_amount, charges).lines
}

/// payment allocation planner
#[derive(Debug, Clone, Copy, Default)]
pub struct AllocationPlanner;

impl AllocationPlanner {
    pub fn new() -> Self {
        Self
    }

    /// Apply `payment_amount` to `charges` oldest due date first.
    ///
    /// Equal due dates keep input order. Charges with no positive balance
    /// are passed over. Whatever cannot be placed is reported as
    /// `unallocated`; no credit is created here.
    pub fn plan(&self, payment_amount: Money, charges: &[ChargeBalance]) -> AllocationPlan {
        let mut ordered: Vec<&ChargeBalance> = charges.iter().collect();
        ordered.sort_by_key(|c| c.due_date);

        let mut remaining = payment_amount;
        let mut lines = Vec::new();

        for charge in ordered {
            if !remaining.is_positive() {
                break;
            }

            let applied = remaining.min(charge.balance);
            if applied.is_positive() {
                lines.push(AllocationLine {
                    charge_id: charge.charge_id,
                    amount_allocated: applied,
                });
                remaining -= applied;
            }
        }

        let plan = AllocationPlan::from_lines(payment_amount, lines);
        debug!(
            payment = %payment_amount,
            allocated = %plan.allocated_total,
            unallocated = %plan.unallocated,
            lines = plan.lines.len(),
            "allocation planned"
        );
        plan
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use uuid::Uuid;

    fn charge(balance: i64, year: i32, month: u32) -> ChargeBalance {
        ChargeBalance {
            charge_id: Uuid::new_v4(),
            balance: Money::from_major(balance),
            due_date: NaiveDate::from_ymd_opt(year, month, 5).unwrap(),
        }
    }

    #[test]
    fn test_partial_payment_oldest_first() {
        let charges = vec![charge(50, 2024, 1), charge(30, 2024, 2), charge(20, 2024, 3)];
        let plan = AllocationPlanner::new().plan(Money::from_major(60), &charges);

        assert_eq!(plan.lines.len(), 2);
        assert_eq!(plan.allocated_to(charges[0].charge_id), Money::from_major(50));
        assert_eq!(plan.allocated_to(charges[1].charge_id), Money::from_major(10));
        assert_eq!(plan.allocated_to(charges[2].charge_id), Money::ZERO);
        assert!(plan.is_fully_allocated());
    }

    #[test]
    fn test_sorts_by_due_date_not_input_order() {
        let newest = charge(30, 2024, 6);
        let oldest = charge(30, 2023, 11);
        let lines = allocate(Money::from_major(40), &[newest.clone(), oldest.clone()]);

        assert_eq!(lines[0].charge_id, oldest.charge_id);
        assert_eq!(lines[0].amount_allocated, Money::from_major(30));
        assert_eq!(lines[1].charge_id, newest.charge_id);
        assert_eq!(lines[1].amount_allocated, Money::from_major(10));
    }

    #[test]
    fn test_ties_keep_input_order() {
        let first = charge(25, 2024, 4);
        let second = charge(25, 2024, 4);
        let lines = allocate(Money::from_major(30), &[first.clone(), second.clone()]);

        assert_eq!(lines[0].charge_id, first.charge_id);
        assert_eq!(lines[0].amount_allocated, Money::from_major(25));
        assert_eq!(lines[1].charge_id, second.charge_id);
        assert_eq!(lines[1].amount_allocated, Money::from_major(5));
    }

    #[test]
    fn test_exact_payment_clears_everything() {
        let charges = vec![charge(120, 2024, 1), charge(80, 2024, 2), charge(45, 2024, 3)];
        let total: Money = charges.iter().map(|c| c.balance).sum();
        let plan = AllocationPlanner::new().plan(total, &charges);

        for c in &charges {
            assert_eq!(plan.allocated_to(c.charge_id), c.balance);
        }
        assert!(plan.is_fully_allocated());
    }

    #[test]
    fn test_overpayment_leaves_remainder() {
        let charges = vec![charge(50, 2024, 1), charge(30, 2024, 2)];
        let plan = AllocationPlanner::new().plan(Money::from_major(100), &charges);

        assert_eq!(plan.allocated_total, Money::from_major(80));
        assert_eq!(plan.unallocated, Money::from_major(20));
    }

    #[test]
    fn test_zero_balances_are_skipped() {
        let charges = vec![charge(0, 2024, 1), charge(30, 2024, 2)];
        let lines = allocate(Money::from_major(10), &charges);

        assert_eq!(lines.len(), 1);
        assert_eq!(lines[0].charge_id, charges[1].charge_id);
    }

    #[test]
    fn test_no_charges_or_no_money() {
        assert!(allocate(Money::from_major(10), &[]).is_empty());
        assert!(allocate(Money::ZERO, &[charge(10, 2024, 1)]).is_empty());
    }

    #[test]
    fn test_cents_are_exact() {
        let charges = vec![
            ChargeBalance {
                charge_id: Uuid::new_v4(),
                balance: Money::from_str_exact("33.33").unwrap(),
                due_date: NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
            },
            ChargeBalance {
                charge_id: Uuid::new_v4(),
                balance: Money::from_str_exact("66.67").unwrap(),
                due_date: NaiveDate::from_ymd_opt(2024, 2, 1).unwrap(),
            },
        ];
        let plan = AllocationPlanner::new().plan(Money::from_major(100), &charges);
        assert_eq!(plan.allocated_total, Money::from_major(100));
        assert!(plan.unallocated.is_zero());
    }
}
