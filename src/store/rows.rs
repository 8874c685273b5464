//! Row shapes as they come back from the relational backend, and the one
//! place they are turned into domain types.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::allocation::LiveCharge;
use crate::decimal::{Money, Weight};
use crate::distribution::UnitShare;
use crate::errors::{BillingError, Result};
use crate::types::{ChargeId, ChargeStatus, CondominiumId, UnitId};

/// embedded relation that the backend returns either as an object or as a
/// one-element array
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Embedded<T> {
    One(T),
    Many(Vec<T>),
}

impl<T> Embedded<T> {
    pub fn first(&self) -> Option<&T> {
        match self {
            Embedded::One(item) => Some(item),
            Embedded::Many(items) => items.first(),
        }
    }
}

/// unit row
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UnitRow {
    pub id: UnitId,
    pub condominium_id: CondominiumId,
    pub code: String,
    /// aliquot percentage, absent when never registered
    #[serde(default)]
    pub aliquot: Option<Decimal>,
    #[serde(default = "default_true")]
    pub active: bool,
    /// excluded from billing runs when false
    #[serde(default)]
    pub billable: Option<bool>,
}

fn default_true() -> bool {
    true
}

impl From<&UnitRow> for UnitShare {
    fn from(row: &UnitRow) -> Self {
        UnitShare {
            unit_id: row.id,
            weight: Weight::from_percentage(row.aliquot.unwrap_or(Decimal::ZERO)),
            include: row.active && row.billable.unwrap_or(true),
        }
    }
}

/// reference to the owning unit embedded in a charge row
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UnitRef {
    pub id: UnitId,
    #[serde(default)]
    pub code: Option<String>,
}

/// charge row
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChargeRow {
    pub id: ChargeId,
    pub unit: Embedded<UnitRef>,
    #[serde(default)]
    pub description: Option<String>,
    pub amount: Decimal,
    /// missing on rows that never received a payment
    #[serde(default)]
    pub balance: Option<Decimal>,
    pub due_date: NaiveDate,
    pub status: String,
}

impl TryFrom<&ChargeRow> for LiveCharge {
    type Error = BillingError;

    fn try_from(row: &ChargeRow) -> Result<Self> {
        let unit = row.unit.first().ok_or_else(|| BillingError::Store {
            message: format!("charge {} has no unit", row.id),
        })?;

        let amount = Money::from_decimal(row.amount);
        let balance = Money::from_decimal(row.balance.unwrap_or(row.amount));
        if balance.is_negative() {
            return Err(BillingError::Store {
                message: format!("charge {} has negative balance {}", row.id, balance),
            });
        }

        Ok(LiveCharge {
            charge_id: row.id,
            unit_id: unit.id,
            amount,
            balance,
            due_date: row.due_date,
            status: row.status.parse()?,
        })
    }
}

/// normalize a batch of charge rows, failing on the first malformed one
pub fn normalize_charges(rows: &[ChargeRow]) -> Result<Vec<LiveCharge>> {
    rows.iter().map(LiveCharge::try_from).collect()
}

pub fn normalize_units(rows: &[UnitRow]) -> Vec<UnitShare> {
    rows.iter().map(UnitShare::from).collect()
}

impl ChargeRow {
    pub fn status(&self) -> Result<ChargeStatus> {
        self.status.parse()
    }
}
