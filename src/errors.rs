use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::decimal::Money;
use crate::types::{BillingPeriod, ChargeId, ChargeStatus, UnitId};

#[derive(Error, Debug, Clone, PartialEq)]
pub enum BillingError {
    #[error("allocations sum to {allocated}, exceeding payment of {payment}")]
    SumExceedsPayment {
        allocated: Money,
        payment: Money,
    },

    #[error("allocation of {requested} exceeds balance {balance} of charge {charge_id}")]
    AllocationExceedsBalance {
        charge_id: ChargeId,
        requested: Money,
        balance: Money,
    },

    #[error("charge {charge_id} is not payable: current status is {status}")]
    ChargeNotPayable {
        charge_id: ChargeId,
        status: ChargeStatus,
    },

    #[error("charge not found: {charge_id}")]
    ChargeNotFound {
        charge_id: ChargeId,
    },

    #[error("charge {charge_id} referenced more than once")]
    DuplicateAllocation {
        charge_id: ChargeId,
    },

    #[error("charge {charge_id} already has {paid} in payments applied")]
    ChargeHasPayments {
        charge_id: ChargeId,
        paid: Money,
    },

    #[error("invalid amount for {field}: {amount}")]
    InvalidAmount {
        field: String,
        amount: Money,
    },

    #[error("invalid payment amount: {amount}")]
    InvalidPaymentAmount {
        amount: Money,
    },

    #[error("payment less than minimum: minimum {minimum}, provided {provided}")]
    PaymentBelowMinimum {
        minimum: Money,
        provided: Money,
    },

    #[error("payment leaves {remainder} unallocated and credit is not allowed")]
    Overpayment {
        remainder: Money,
    },

    #[error("unknown distribution method: {value}")]
    UnknownDistributionMethod {
        value: String,
    },

    #[error("no units to distribute across")]
    NoUnits,

    #[error("unit {unit_id} is not part of this distribution")]
    UnitNotInDistribution {
        unit_id: UnitId,
    },

    #[error("a {kind} distribution already exists for period {period}")]
    DuplicateDistribution {
        kind: String,
        period: BillingPeriod,
    },

    #[error("no credit available for unit {unit_id}")]
    NoCredit {
        unit_id: UnitId,
    },

    #[error("invalid configuration: {message}")]
    InvalidConfiguration {
        message: String,
    },

    #[error("validation failed: {message}")]
    Validation {
        message: String,
    },

    #[error("storage failure: {message}")]
    Store {
        message: String,
    },
}

impl BillingError {
    /// stable machine-readable code
    pub fn code(&self) -> &'static str {
        match self {
            BillingError::SumExceedsPayment { .. } => "SUM_EXCEEDS_PAYMENT",
            BillingError::AllocationExceedsBalance { .. } => "ALLOCATION_EXCEEDS_BALANCE",
            BillingError::ChargeNotPayable { .. } => "CHARGE_NOT_PAYABLE",
            BillingError::ChargeNotFound { .. } => "CHARGE_NOT_FOUND",
            BillingError::DuplicateAllocation { .. } => "DUPLICATE_ALLOCATION",
            BillingError::ChargeHasPayments { .. } => "CHARGE_HAS_PAYMENTS",
            BillingError::InvalidAmount { .. } => "INVALID_AMOUNT",
            BillingError::InvalidPaymentAmount { .. } => "INVALID_PAYMENT_AMOUNT",
            BillingError::PaymentBelowMinimum { .. } => "PAYMENT_BELOW_MINIMUM",
            BillingError::Overpayment { .. } => "OVERPAYMENT",
            BillingError::UnknownDistributionMethod { .. } => "UNKNOWN_DISTRIBUTION_METHOD",
            BillingError::NoUnits => "NO_UNITS",
            BillingError::UnitNotInDistribution { .. } => "UNIT_NOT_IN_DISTRIBUTION",
            BillingError::DuplicateDistribution { .. } => "DUPLICATE_DISTRIBUTION",
            BillingError::NoCredit { .. } => "NO_CREDIT",
            BillingError::InvalidConfiguration { .. } => "INVALID_CONFIGURATION",
            BillingError::Validation { .. } => "VALIDATION_ERROR",
            BillingError::Store { .. } => "STORE_ERROR",
        }
    }

    /// store failures are reported generically; everything else is the caller's to fix
    pub fn is_store_failure(&self) -> bool {
        matches!(self, BillingError::Store { .. })
    }

    /// message safe to surface to the operator
    pub fn public_message(&self) -> String {
        if self.is_store_failure() {
            "could not complete the operation, please try again".to_string()
        } else {
            self.to_string()
        }
    }
}

pub type Result<T> = std::result::Result<T, BillingError>;

/// uniform action result: `{"success": true, ...}` or `{"error": "...", "code": "..."}`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ActionOutcome<T> {
    Success {
        success: bool,
        #[serde(flatten)]
        data: T,
    },
    Failure {
        error: String,
        code: String,
    },
}

impl<T> ActionOutcome<T> {
    pub fn success(data: T) -> Self {
        ActionOutcome::Success { success: true, data }
    }

    pub fn failure(err: &BillingError) -> Self {
        ActionOutcome::Failure {
            error: err.public_message(),
            code: err.code().to_string(),
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, ActionOutcome::Success { .. })
    }
}

impl<T> From<Result<T>> for ActionOutcome<T> {
    fn from(result: Result<T>) -> Self {
        match result {
            Ok(data) => ActionOutcome::success(data),
            Err(err) => {
                if err.is_store_failure() {
                    tracing::error!(error = %err, "action failed in storage layer");
                } else {
                    tracing::warn!(code = err.code(), error = %err, "action rejected");
                }
                ActionOutcome::failure(&err)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    struct Issued {
        count: u32,
    }

    #[test]
    fn test_error_codes() {
        let err = BillingError::AllocationExceedsBalance {
            charge_id: Uuid::new_v4(),
            requested: Money::from_major(55),
            balance: Money::from_major(50),
        };
        assert_eq!(err.code(), "ALLOCATION_EXCEEDS_BALANCE");
        assert!(err.to_string().contains("55.00"));
    }

    #[test]
    fn test_success_shape() {
        let outcome: ActionOutcome<Issued> = Ok(Issued { count: 3 }).into();
        let json = serde_json::to_value(&outcome).unwrap();
        assert_eq!(json["success"], true);
        assert_eq!(json["count"], 3);
    }

    #[test]
    fn test_failure_shape() {
        let outcome: ActionOutcome<Issued> = Err(BillingError::SumExceedsPayment {
            allocated: Money::from_major(120),
            payment: Money::from_major(100),
        })
        .into();
        assert!(!outcome.is_success());
        let json = serde_json::to_value(&outcome).unwrap();
        assert_eq!(json["code"], "SUM_EXCEEDS_PAYMENT");
        assert!(json.get("success").is_none());
    }

    #[test]
    fn test_store_failure_is_generic() {
        let outcome: ActionOutcome<Issued> = Err(BillingError::Store {
            message: "connection refused on 10.0.0.3".to_string(),
        })
        .into();
        match outcome {
            ActionOutcome::Failure { error, code } => {
                assert_eq!(code, "STORE_ERROR");
                assert!(!error.contains("10.0.0.3"));
            }
            _ => panic!("expected failure"),
        }
    }

    #[test]
    fn test_outcome_deserializes_both_shapes() {
        let ok: ActionOutcome<Issued> =
            serde_json::from_str(r#"{"success":true,"count":2}"#).unwrap();
        assert_eq!(ok, ActionOutcome::success(Issued { count: 2 }));

        let err: ActionOutcome<Issued> =
            serde_json::from_str(r#"{"error":"nope","code":"NO_UNITS"}"#).unwrap();
        assert!(!err.is_success());
    }
}
