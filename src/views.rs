/// serializable views for presenting billing results
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::allocation::{AllocationLine, AllocationPlan};
use crate::decimal::Money;
use crate::distribution::DistributionPreview;
use crate::service::{CreditApplication, PaymentReceipt};
use crate::types::{ChargeId, DistributionMethod, PaymentId, UnitId};

/// preview grid as shown before charges are issued
#[derive(Debug, Serialize, Deserialize)]
pub struct DistributionPreviewView {
    pub method: DistributionMethod,
    pub requested_total: Money,
    pub suggested_total: Money,
    pub final_total: Money,
    /// final minus requested
    pub difference: Money,
    pub reconciled: bool,
    pub lines: Vec<DistributionLineView>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct DistributionLineView {
    pub unit_id: UnitId,
    pub suggested_amount: Money,
    pub final_amount: Money,
    pub overridden: bool,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct AllocationLineView {
    pub charge_id: ChargeId,
    pub amount_allocated: Money,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct AllocationPlanView {
    pub payment_amount: Money,
    pub allocated_total: Money,
    pub unallocated: Money,
    pub lines: Vec<AllocationLineView>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct PaymentReceiptView {
    pub payment_id: PaymentId,
    pub unit_id: UnitId,
    pub amount: Money,
    pub allocated_total: Money,
    pub credited: Money,
    pub received_at: DateTime<Utc>,
    pub lines: Vec<AllocationLineView>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct CreditApplicationView {
    pub unit_id: UnitId,
    pub applied_total: Money,
    pub remaining_credit: Money,
    pub lines: Vec<AllocationLineView>,
}

fn line_views<'a, I>(lines: I) -> Vec<AllocationLineView>
where
    I: IntoIterator<Item = &'a AllocationLine>,
{
    lines
        .into_iter()
        .map(|l| AllocationLineView {
            charge_id: l.charge_id,
            amount_allocated: l.amount_allocated,
        })
        .collect()
}

fn pretty<T: Serialize>(view: &T) -> String {
    serde_json::to_string_pretty(view).unwrap_or_else(|e| format!("JSON error: {}", e))
}

impl DistributionPreviewView {
    pub fn from_preview(preview: &DistributionPreview) -> Self {
        Self {
            method: preview.method,
            requested_total: preview.requested_total,
            suggested_total: preview.suggested_total(),
            final_total: preview.final_total(),
            difference: preview.difference(),
            reconciled: preview.is_reconciled(),
            lines: preview
                .lines
                .iter()
                .map(|l| DistributionLineView {
                    unit_id: l.unit_id,
                    suggested_amount: l.suggested_amount,
                    final_amount: l.final_amount,
                    overridden: l.is_overridden(),
                })
                .collect(),
        }
    }
}

impl AllocationPlanView {
    pub fn from_plan(plan: &AllocationPlan) -> Self {
        Self {
            payment_amount: plan.payment_amount,
            allocated_total: plan.allocated_total,
            unallocated: plan.unallocated,
            lines: line_views(&plan.lines),
        }
    }
}

impl PaymentReceiptView {
    pub fn from_receipt(receipt: &PaymentReceipt) -> Self {
        Self {
            payment_id: receipt.payment_id,
            unit_id: receipt.unit_id,
            amount: receipt.amount,
            allocated_total: receipt.allocated_total,
            credited: receipt.credited,
            received_at: receipt.received_at,
            lines: line_views(&receipt.lines),
        }
    }
}

impl CreditApplicationView {
    pub fn from_application(application: &CreditApplication) -> Self {
        Self {
            unit_id: application.unit_id,
            applied_total: application.applied_total,
            remaining_credit: application.remaining_credit,
            lines: line_views(&application.lines),
        }
    }
}

impl DistributionPreview {
    /// get current preview as json
    pub fn json(&self) -> String {
        pretty(&DistributionPreviewView::from_preview(self))
    }
}

impl AllocationPlan {
    pub fn json(&self) -> String {
        pretty(&AllocationPlanView::from_plan(self))
    }
}

impl PaymentReceipt {
    /// get receipt as json
    pub fn json(&self) -> String {
        pretty(&PaymentReceiptView::from_receipt(self))
    }
}

impl CreditApplication {
    pub fn json(&self) -> String {
        pretty(&CreditApplicationView::from_application(self))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::distribution::DistributionLine;
    use uuid::Uuid;

    #[test]
    fn test_preview_view_reports_overrides() {
        let a = Uuid::new_v4();
        let b = Uuid::new_v4();
        let mut preview = DistributionPreview::new(
            Money::from_major(100),
            DistributionMethod::Equal,
            vec![
                DistributionLine::new(a, Money::from_major(50)),
                DistributionLine::new(b, Money::from_major(50)),
            ],
        );
        preview.override_amount(b, Money::from_major(45)).unwrap();

        let view = DistributionPreviewView::from_preview(&preview);
        assert!(!view.reconciled);
        assert_eq!(view.difference, Money::from_major(-5));
        assert!(view.lines[1].overridden);
        assert!(!view.lines[0].overridden);

        let json: serde_json::Value = serde_json::from_str(&preview.json()).unwrap();
        assert_eq!(json["method"], "equal");
        assert_eq!(json["lines"].as_array().unwrap().len(), 2);
    }

    #[test]
    fn test_plan_view() {
        let charge_id = Uuid::new_v4();
        let plan = AllocationPlan::from_lines(
            Money::from_major(80),
            vec![AllocationLine {
                charge_id,
                amount_allocated: Money::from_major(60),
            }],
        );
        let view = AllocationPlanView::from_plan(&plan);
        assert_eq!(view.unallocated, Money::from_major(20));
        assert_eq!(view.lines[0].charge_id, charge_id);
    }
}
