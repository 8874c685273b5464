pub mod engine;
pub mod preview;

use serde::{Deserialize, Serialize};

use crate::decimal::{Money, Weight};
use crate::types::UnitId;

pub use engine::{distribute, DistributionEngine};
pub use preview::DistributionPreview;

/// one unit's input to a distribution run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UnitShare {
    pub unit_id: UnitId,
    pub weight: Weight,
    pub include: bool,
}

impl UnitShare {
    pub fn new(unit_id: UnitId, weight: Weight) -> Self {
        Self {
            unit_id,
            weight,
            include: true,
        }
    }

    pub fn excluded(unit_id: UnitId, weight: Weight) -> Self {
        Self {
            unit_id,
            weight,
            include: false,
        }
    }
}

/// one computed row of a distribution
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DistributionLine {
    pub unit_id: UnitId,
    pub suggested_amount: Money,
    /// defaults to the suggestion, editable by the preparer
    pub final_amount: Money,
}

impl DistributionLine {
    pub fn new(unit_id: UnitId, suggested_amount: Money) -> Self {
        Self {
            unit_id,
            suggested_amount,
            final_amount: suggested_amount,
        }
    }

    pub fn is_overridden(&self) -> bool {
        self.final_amount != self.suggested_amount
    }
}
