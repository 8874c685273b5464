use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

use crate::decimal::Money;
use crate::errors::BillingError;

/// unique identifier for a condominium
pub type CondominiumId = Uuid;

/// unique identifier for a billable unit
pub type UnitId = Uuid;

/// unique identifier for a charge (receivable)
pub type ChargeId = Uuid;

/// unique identifier for an incoming payment
pub type PaymentId = Uuid;

/// authenticated principal performing an operation
pub type PrincipalId = Uuid;

/// charge status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChargeStatus {
    /// issued, nothing paid yet
    Pending,
    /// some payments applied, balance remaining
    PartiallyPaid,
    /// balance fully covered
    Paid,
    /// withdrawn before any payment
    Cancelled,
    /// annulled after issue
    Voided,
}

impl ChargeStatus {
    /// cancelled and voided charges never change again
    pub fn is_terminal(&self) -> bool {
        matches!(self, ChargeStatus::Cancelled | ChargeStatus::Voided)
    }

    /// can receive allocations
    pub fn is_payable(&self) -> bool {
        matches!(self, ChargeStatus::Pending | ChargeStatus::PartiallyPaid)
    }

    /// status implied by an amount and its remaining balance
    pub fn for_balance(amount: Money, balance: Money) -> Self {
        if balance.is_zero() || balance.is_negative() {
            ChargeStatus::Paid
        } else if balance < amount {
            ChargeStatus::PartiallyPaid
        } else {
            ChargeStatus::Pending
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ChargeStatus::Pending => "pending",
            ChargeStatus::PartiallyPaid => "partially_paid",
            ChargeStatus::Paid => "paid",
            ChargeStatus::Cancelled => "cancelled",
            ChargeStatus::Voided => "voided",
        }
    }
}

impl fmt::Display for ChargeStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ChargeStatus {
    type Err = BillingError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "pending" => Ok(ChargeStatus::Pending),
            "partially_paid" | "partial" => Ok(ChargeStatus::PartiallyPaid),
            "paid" => Ok(ChargeStatus::Paid),
            "cancelled" | "canceled" => Ok(ChargeStatus::Cancelled),
            "voided" | "void" => Ok(ChargeStatus::Voided),
            other => Err(BillingError::Store {
                message: format!("unknown charge status '{}'", other),
            }),
        }
    }
}

/// how a total is split across units
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DistributionMethod {
    /// proportional to aliquot weight
    ByWeight,
    /// same share for every included unit
    Equal,
}

impl DistributionMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            DistributionMethod::ByWeight => "by_weight",
            DistributionMethod::Equal => "equal",
        }
    }
}

impl FromStr for DistributionMethod {
    type Err = BillingError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "by_weight" => Ok(DistributionMethod::ByWeight),
            "equal" => Ok(DistributionMethod::Equal),
            other => Err(BillingError::UnknownDistributionMethod {
                value: other.to_string(),
            }),
        }
    }
}

/// which unit(s) absorb the cents lost to per-line rounding
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResidualPolicy {
    /// the last included unit in input order takes the whole residual
    LastUnit,
    /// leftover cents go to the largest fractional remainders
    LargestRemainder,
}

/// kind of charge being billed
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChargeKind {
    MonthlyFee,
    Extraordinary,
    Utility,
    Fine,
    Other(String),
}

impl fmt::Display for ChargeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ChargeKind::MonthlyFee => f.write_str("monthly fee"),
            ChargeKind::Extraordinary => f.write_str("extraordinary fee"),
            ChargeKind::Utility => f.write_str("utility"),
            ChargeKind::Fine => f.write_str("fine"),
            ChargeKind::Other(label) => f.write_str(label),
        }
    }
}

/// calendar month a distribution is billed for
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct BillingPeriod {
    pub year: i32,
    pub month: u32,
}

impl BillingPeriod {
    pub fn new(year: i32, month: u32) -> Result<Self, BillingError> {
        if !(1..=12).contains(&month) {
            return Err(BillingError::Validation {
                message: format!("month must be between 1 and 12, got {}", month),
            });
        }
        Ok(Self { year, month })
    }
}

impl fmt::Display for BillingPeriod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:04}-{:02}", self.year, self.month)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_payability() {
        assert!(ChargeStatus::Pending.is_payable());
        assert!(ChargeStatus::PartiallyPaid.is_payable());
        assert!(!ChargeStatus::Paid.is_payable());
        assert!(!ChargeStatus::Cancelled.is_payable());
        assert!(ChargeStatus::Voided.is_terminal());
        assert!(!ChargeStatus::Paid.is_terminal());
    }

    #[test]
    fn test_status_for_balance() {
        let amount = Money::from_major(100);
        assert_eq!(ChargeStatus::for_balance(amount, amount), ChargeStatus::Pending);
        assert_eq!(ChargeStatus::for_balance(amount, Money::from_major(40)), ChargeStatus::PartiallyPaid);
        assert_eq!(ChargeStatus::for_balance(amount, Money::ZERO), ChargeStatus::Paid);
    }

    #[test]
    fn test_status_parsing() {
        assert_eq!("Cancelled".parse::<ChargeStatus>().unwrap(), ChargeStatus::Cancelled);
        assert_eq!("partial".parse::<ChargeStatus>().unwrap(), ChargeStatus::PartiallyPaid);
        assert!("archived".parse::<ChargeStatus>().is_err());
    }

    #[test]
    fn test_unknown_method_rejected() {
        assert_eq!("equal".parse::<DistributionMethod>().unwrap(), DistributionMethod::Equal);
        let err = "by_area".parse::<DistributionMethod>().unwrap_err();
        assert_eq!(err.code(), "UNKNOWN_DISTRIBUTION_METHOD");
    }

    #[test]
    fn test_billing_period() {
        assert!(BillingPeriod::new(2024, 13).is_err());
        assert_eq!(BillingPeriod::new(2024, 3).unwrap().to_string(), "2024-03");
    }
}
