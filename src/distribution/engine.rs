use rust_decimal::{Decimal, RoundingStrategy};
use tracing::debug;

use crate::decimal::{Money, Weight, CURRENCY_SCALE};
use crate::types::{DistributionMethod, ResidualPolicy};

use super::{DistributionLine, UnitShare};

/// split `total` across the included units with the default residual policy
pub fn distribute(
    units: &[UnitShare],
    total: Money,
    method: DistributionMethod,
) -> Vec<DistributionLine> {
    DistributionEngine::default().distribute(units, total, method)
}

/// charge distribution engine
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DistributionEngine {
    residual_policy: ResidualPolicy,
}

impl Default for DistributionEngine {
    fn default() -> Self {
        Self::new(ResidualPolicy::LastUnit)
    }
}

impl DistributionEngine {
    pub fn new(residual_policy: ResidualPolicy) -> Self {
        Self { residual_policy }
    }

    pub fn residual_policy(&self) -> ResidualPolicy {
        self.residual_policy
    }

    /// Compute each included unit's share of `total`.
    ///
    /// Excluded units produce no line. The returned suggested amounts always
    /// sum to `total` exactly. A zero weight sum under `ByWeight` degrades to
    /// an equal split.
    pub fn distribute(
        &self,
        units: &[UnitShare],
        total: Money,
        method: DistributionMethod,
    ) -> Vec<DistributionLine> {
        let included: Vec<&UnitShare> = units.iter().filter(|u| u.include).collect();
        if included.is_empty() {
            return Vec::new();
        }

        let weight_sum: Weight = included.iter().map(|u| u.weight).sum();
        let effective = match method {
            DistributionMethod::ByWeight if weight_sum.is_zero() => {
                debug!(
                    units = included.len(),
                    "weights sum to zero, falling back to equal split"
                );
                DistributionMethod::Equal
            }
            other => other,
        };

        let raw_shares: Vec<Decimal> = match effective {
            DistributionMethod::ByWeight => included
                .iter()
                .map(|u| total.raw_share(u.weight.as_decimal(), weight_sum.as_decimal()))
                .collect(),
            DistributionMethod::Equal => vec![total.raw_split(included.len()); included.len()],
        };

        let amounts = match self.residual_policy {
            ResidualPolicy::LastUnit => assign_residual_to_last(total, &raw_shares),
            ResidualPolicy::LargestRemainder => assign_by_largest_remainder(total, &raw_shares),
        };

        debug!(
            total = %total,
            method = effective.as_str(),
            units = included.len(),
            "distribution computed"
        );

        included
            .iter()
            .zip(amounts)
            .map(|(unit, amount)| DistributionLine::new(unit.unit_id, amount))
            .collect()
    }
}

/// round every share half-up, then the last share takes `total - sum`
fn assign_residual_to_last(total: Money, raw_shares: &[Decimal]) -> Vec<Money> {
    let mut amounts: Vec<Money> = raw_shares.iter().map(|r| Money::from_decimal(*r)).collect();
    let residual = total - amounts.iter().sum::<Money>();

    if !residual.is_zero() {
        if let Some(last) = amounts.last_mut() {
            *last += residual;
        }
    }

    amounts
}

/// truncate every share to cents, then hand out the leftover cents one at a
/// time by descending fractional remainder (ties keep input order)
fn assign_by_largest_remainder(total: Money, raw_shares: &[Decimal]) -> Vec<Money> {
    let truncated: Vec<Decimal> = raw_shares
        .iter()
        .map(|r| r.round_dp_with_strategy(CURRENCY_SCALE, RoundingStrategy::ToZero))
        .collect();
    let mut amounts: Vec<Money> = truncated.iter().map(|t| Money::from_decimal(*t)).collect();

    let mut residual = total - amounts.iter().sum::<Money>();
    if residual.is_zero() {
        return amounts;
    }

    let step = if residual.is_negative() {
        -Money::CENT
    } else {
        Money::CENT
    };

    let remainders: Vec<Decimal> = raw_shares
        .iter()
        .zip(&truncated)
        .map(|(raw, cut)| (*raw - *cut).abs())
        .collect();
    let mut order: Vec<usize> = (0..amounts.len()).collect();
    order.sort_by(|&a, &b| remainders[b].cmp(&remainders[a]));

    let mut cursor = 0;
    while !residual.is_zero() {
        let idx = order[cursor % order.len()];
        amounts[idx] += step;
        residual -= step;
        cursor += 1;
    }

    amounts
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;
    use uuid::Uuid;

    fn shares(weights: &[Decimal]) -> Vec<UnitShare> {
        weights
            .iter()
            .map(|w| UnitShare::new(Uuid::new_v4(), Weight::from_percentage(*w)))
            .collect()
    }

    fn amounts(lines: &[DistributionLine]) -> Vec<Money> {
        lines.iter().map(|l| l.suggested_amount).collect()
    }

    fn total_of(lines: &[DistributionLine]) -> Money {
        lines.iter().map(|l| l.suggested_amount).sum()
    }

    #[test]
    fn test_by_weight_conserves_total() {
        let units = shares(&[dec!(33.33), dec!(33.33), dec!(33.34)]);
        let lines = distribute(&units, Money::from_major(100), DistributionMethod::ByWeight);

        assert_eq!(
            amounts(&lines),
            vec![
                Money::from_cents(3333),
                Money::from_cents(3333),
                Money::from_cents(3334)
            ]
        );
        assert_eq!(total_of(&lines), Money::from_major(100));
        assert!(lines.iter().all(|l| l.final_amount == l.suggested_amount));
    }

    #[test]
    fn test_zero_weights_fall_back_to_equal() {
        let units = shares(&[dec!(0), dec!(0), dec!(0)]);
        let lines = distribute(&units, Money::from_major(10), DistributionMethod::ByWeight);

        assert_eq!(
            amounts(&lines),
            vec![
                Money::from_cents(333),
                Money::from_cents(333),
                Money::from_cents(334)
            ]
        );
    }

    #[test]
    fn test_equal_split() {
        let units = shares(&[dec!(10), dec!(50), dec!(40)]);
        let lines = distribute(&units, Money::from_major(90), DistributionMethod::Equal);
        assert!(lines.iter().all(|l| l.suggested_amount == Money::from_major(30)));
    }

    #[test]
    fn test_negative_residual_goes_to_last_unit() {
        // 0.05 / 3 rounds up to 0.02 each, overshooting by a cent
        let units = shares(&[dec!(1), dec!(1), dec!(1)]);
        let lines = distribute(&units, Money::from_cents(5), DistributionMethod::Equal);

        assert_eq!(
            amounts(&lines),
            vec![Money::from_cents(2), Money::from_cents(2), Money::from_cents(1)]
        );
        assert_eq!(total_of(&lines), Money::from_cents(5));
    }

    #[test]
    fn test_weights_not_summing_to_hundred() {
        let units = shares(&[dec!(12.5), dec!(30), dec!(7.25)]);
        let total = Money::from_str_exact("1234.57").unwrap();
        let lines = distribute(&units, total, DistributionMethod::ByWeight);
        assert_eq!(total_of(&lines), total);
    }

    #[test]
    fn test_excluded_units_get_no_line() {
        let kept = Uuid::new_v4();
        let units = vec![
            UnitShare::excluded(Uuid::new_v4(), Weight::from_percentage(dec!(50))),
            UnitShare::new(kept, Weight::from_percentage(dec!(50))),
        ];
        let lines = distribute(&units, Money::from_major(80), DistributionMethod::ByWeight);

        assert_eq!(lines.len(), 1);
        assert_eq!(lines[0].unit_id, kept);
        assert_eq!(lines[0].suggested_amount, Money::from_major(80));
    }

    #[test]
    fn test_empty_input_returns_empty() {
        assert!(distribute(&[], Money::from_major(100), DistributionMethod::Equal).is_empty());

        let all_excluded = vec![UnitShare::excluded(Uuid::new_v4(), Weight::ZERO)];
        assert!(distribute(&all_excluded, Money::from_major(100), DistributionMethod::ByWeight).is_empty());
    }

    #[test]
    fn test_zero_total() {
        let units = shares(&[dec!(60), dec!(40)]);
        let lines = distribute(&units, Money::ZERO, DistributionMethod::ByWeight);
        assert!(lines.iter().all(|l| l.suggested_amount.is_zero()));
    }

    #[test]
    fn test_largest_remainder_conserves_total() {
        let engine = DistributionEngine::new(ResidualPolicy::LargestRemainder);
        let units = shares(&[dec!(1); 7]);
        let lines = engine.distribute(&units, Money::from_major(1), DistributionMethod::ByWeight);

        // 7 x 0.14 = 0.98; the two leftover cents go to the first two ties
        assert_eq!(lines[0].suggested_amount, Money::from_cents(15));
        assert_eq!(lines[1].suggested_amount, Money::from_cents(15));
        assert!(lines[2..].iter().all(|l| l.suggested_amount == Money::from_cents(14)));
        assert_eq!(total_of(&lines), Money::from_major(1));
    }

    #[test]
    fn test_largest_remainder_prefers_bigger_fraction() {
        let engine = DistributionEngine::new(ResidualPolicy::LargestRemainder);
        let units = shares(&[dec!(2), dec!(1)]);
        let lines = engine.distribute(&units, Money::from_cents(5), DistributionMethod::ByWeight);

        // raw 0.0333.. and 0.0166..; the second has the larger remainder
        assert_eq!(amounts(&lines), vec![Money::from_cents(3), Money::from_cents(2)]);
    }

    #[test]
    fn test_policies_agree_when_exact() {
        let units = shares(&[dec!(10), dec!(20), dec!(70)]);
        let total = Money::from_major(1000);
        let last = DistributionEngine::new(ResidualPolicy::LastUnit)
            .distribute(&units, total, DistributionMethod::ByWeight);
        let largest = DistributionEngine::new(ResidualPolicy::LargestRemainder)
            .distribute(&units, total, DistributionMethod::ByWeight);
        assert_eq!(amounts(&last), amounts(&largest));
    }
}
