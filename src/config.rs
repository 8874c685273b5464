use serde::{Deserialize, Serialize};

use crate::decimal::Money;
use crate::errors::{BillingError, Result};
use crate::types::{DistributionMethod, ResidualPolicy};

/// billing configuration for one condominium
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BillingConfig {
    pub distribution: DistributionConfig,
    pub payment: PaymentConfig,
}

/// distribution settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DistributionConfig {
    pub default_method: DistributionMethod,
    pub residual_policy: ResidualPolicy,
    /// days after the period start a newly issued charge falls due
    pub due_after_days: u32,
}

/// payment intake settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PaymentConfig {
    /// keep any unallocated remainder as credit on the unit
    pub allow_credit: bool,
    pub minimum_payment: Option<Money>,
}

impl BillingConfig {
    /// aliquot-weighted billing, last unit absorbs rounding, overpayments kept as credit
    pub fn standard() -> Self {
        Self {
            distribution: DistributionConfig {
                default_method: DistributionMethod::ByWeight,
                residual_policy: ResidualPolicy::LastUnit,
                due_after_days: 10,
            },
            payment: PaymentConfig {
                allow_credit: true,
                minimum_payment: None,
            },
        }
    }

    /// equal split for buildings without registered aliquots
    pub fn equal_split() -> Self {
        let mut config = Self::standard();
        config.distribution.default_method = DistributionMethod::Equal;
        config
    }

    /// load from JSON and validate
    pub fn from_json(json: &str) -> Result<Self> {
        let config: BillingConfig = serde_json::from_str(json).map_err(|e| {
            BillingError::InvalidConfiguration {
                message: e.to_string(),
            }
        })?;
        config.validate()?;
        Ok(config)
    }

    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string_pretty(self).map_err(|e| BillingError::InvalidConfiguration {
            message: e.to_string(),
        })
    }

    pub fn validate(&self) -> Result<()> {
        if let Some(minimum) = self.payment.minimum_payment {
            if !minimum.is_positive() {
                return Err(BillingError::InvalidConfiguration {
                    message: format!("minimum payment must be positive, got {}", minimum),
                });
            }
        }

        if self.distribution.due_after_days > 365 {
            return Err(BillingError::InvalidConfiguration {
                message: format!(
                    "due_after_days must be at most 365, got {}",
                    self.distribution.due_after_days
                ),
            });
        }

        Ok(())
    }
}

impl Default for BillingConfig {
    fn default() -> Self {
        Self::standard()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_standard_config_is_valid() {
        let config = BillingConfig::standard();
        assert!(config.validate().is_ok());
        assert_eq!(config.distribution.default_method, DistributionMethod::ByWeight);
        assert_eq!(config.distribution.residual_policy, ResidualPolicy::LastUnit);
        assert!(config.payment.allow_credit);
    }

    #[test]
    fn test_json_round_trip() {
        let config = BillingConfig::equal_split();
        let json = config.to_json().unwrap();
        assert!(json.contains("\"equal\""));
        assert_eq!(BillingConfig::from_json(&json).unwrap(), config);
    }

    #[test]
    fn test_from_json_rejects_bad_minimum() {
        let json = r#"{
            "distribution": {
                "default_method": "by_weight",
                "residual_policy": "largest_remainder",
                "due_after_days": 5
            },
            "payment": { "allow_credit": false, "minimum_payment": "0" }
        }"#;
        let err = BillingConfig::from_json(json).unwrap_err();
        assert_eq!(err.code(), "INVALID_CONFIGURATION");
    }

    #[test]
    fn test_from_json_rejects_unknown_method() {
        let json = r#"{
            "distribution": {
                "default_method": "by_area",
                "residual_policy": "last_unit",
                "due_after_days": 5
            },
            "payment": { "allow_credit": true, "minimum_payment": null }
        }"#;
        assert!(BillingConfig::from_json(json).is_err());
    }
}
