use serde::{Deserialize, Serialize};

use crate::decimal::Money;
use crate::errors::{BillingError, Result};
use crate::types::{DistributionMethod, UnitId};

use super::DistributionLine;

/// billing preview the preparer reviews and edits before charges are issued
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DistributionPreview {
    pub requested_total: Money,
    pub method: DistributionMethod,
    pub lines: Vec<DistributionLine>,
}

impl DistributionPreview {
    pub fn new(requested_total: Money, method: DistributionMethod, lines: Vec<DistributionLine>) -> Self {
        Self {
            requested_total,
            method,
            lines,
        }
    }

    pub fn line(&self, unit_id: UnitId) -> Option<&DistributionLine> {
        self.lines.iter().find(|l| l.unit_id == unit_id)
    }

    /// replace the final amount for one unit
    pub fn override_amount(&mut self, unit_id: UnitId, amount: Money) -> Result<&DistributionLine> {
        if amount.is_negative() {
            return Err(BillingError::InvalidAmount {
                field: "final_amount".to_string(),
                amount,
            });
        }

        let line = self
            .lines
            .iter_mut()
            .find(|l| l.unit_id == unit_id)
            .ok_or(BillingError::UnitNotInDistribution { unit_id })?;
        line.final_amount = amount;
        Ok(&*line)
    }

    /// restore the suggested amount for one unit
    pub fn reset(&mut self, unit_id: UnitId) -> Result<()> {
        let line = self
            .lines
            .iter_mut()
            .find(|l| l.unit_id == unit_id)
            .ok_or(BillingError::UnitNotInDistribution { unit_id })?;
        line.final_amount = line.suggested_amount;
        Ok(())
    }

    pub fn reset_all(&mut self) {
        for line in &mut self.lines {
            line.final_amount = line.suggested_amount;
        }
    }

    pub fn suggested_total(&self) -> Money {
        self.lines.iter().map(|l| l.suggested_amount).sum()
    }

    pub fn final_total(&self) -> Money {
        self.lines.iter().map(|l| l.final_amount).sum()
    }

    /// final total minus requested total; positive when overrides bill more
    pub fn difference(&self) -> Money {
        self.final_total() - self.requested_total
    }

    pub fn is_reconciled(&self) -> bool {
        self.difference().is_zero()
    }

    pub fn overridden(&self) -> impl Iterator<Item = &DistributionLine> {
        self.lines.iter().filter(|l| l.is_overridden())
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    pub fn len(&self) -> usize {
        self.lines.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::decimal::Weight;
    use crate::distribution::{distribute, UnitShare};
    use rust_decimal_macros::dec;
    use uuid::Uuid;

    fn preview() -> (DistributionPreview, Vec<UnitId>) {
        let ids: Vec<UnitId> = (0..3).map(|_| Uuid::new_v4()).collect();
        let units: Vec<UnitShare> = ids
            .iter()
            .zip([dec!(50), dec!(30), dec!(20)])
            .map(|(id, w)| UnitShare::new(*id, Weight::from_percentage(w)))
            .collect();
        let total = Money::from_major(1000);
        let lines = distribute(&units, total, DistributionMethod::ByWeight);
        (DistributionPreview::new(total, DistributionMethod::ByWeight, lines), ids)
    }

    #[test]
    fn test_fresh_preview_is_reconciled() {
        let (preview, _) = preview();
        assert_eq!(preview.suggested_total(), Money::from_major(1000));
        assert!(preview.is_reconciled());
        assert_eq!(preview.overridden().count(), 0);
    }

    #[test]
    fn test_override_and_reset() {
        let (mut preview, ids) = preview();

        let line = preview.override_amount(ids[1], Money::from_major(250)).unwrap();
        assert_eq!(line.suggested_amount, Money::from_major(300));
        assert_eq!(line.final_amount, Money::from_major(250));

        assert_eq!(preview.difference(), Money::from_major(-50));
        assert!(!preview.is_reconciled());
        assert_eq!(preview.overridden().count(), 1);

        preview.reset(ids[1]).unwrap();
        assert!(preview.is_reconciled());
    }

    #[test]
    fn test_override_unknown_unit() {
        let (mut preview, _) = preview();
        let err = preview
            .override_amount(Uuid::new_v4(), Money::from_major(1))
            .unwrap_err();
        assert_eq!(err.code(), "UNIT_NOT_IN_DISTRIBUTION");
    }

    #[test]
    fn test_override_rejects_negative() {
        let (mut preview, ids) = preview();
        assert!(preview.override_amount(ids[0], Money::from_major(-1)).is_err());
        assert_eq!(preview.line(ids[0]).unwrap().final_amount, Money::from_major(500));
    }

    #[test]
    fn test_reset_all() {
        let (mut preview, ids) = preview();
        preview.override_amount(ids[0], Money::ZERO).unwrap();
        preview.override_amount(ids[2], Money::from_major(1)).unwrap();
        preview.reset_all();
        assert!(preview.is_reconciled());
    }
}
