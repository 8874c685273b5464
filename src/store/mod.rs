pub mod memory;
pub mod rows;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::allocation::{AllocationLine, CreditAccount};
use crate::decimal::Money;
use crate::errors::Result;
use crate::types::{
    BillingPeriod, ChargeId, ChargeKind, ChargeStatus, CondominiumId, DistributionMethod,
    PaymentId, PrincipalId, UnitId,
};

pub use memory::MemoryStore;
pub use rows::{normalize_charges, normalize_units, ChargeRow, Embedded, UnitRef, UnitRow};

/// charge to be inserted
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewCharge {
    pub unit_id: UnitId,
    pub description: String,
    pub amount: Money,
    pub due_date: NaiveDate,
}

/// one distribution run's worth of charges, inserted together
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChargeBatch {
    pub condominium_id: CondominiumId,
    pub kind: ChargeKind,
    pub period: BillingPeriod,
    pub method: DistributionMethod,
    pub charges: Vec<NewCharge>,
    pub issued_by: PrincipalId,
    pub issued_at: DateTime<Utc>,
}

/// how the money came in
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentMethod {
    Cash,
    Transfer,
    Check,
    Card,
}

/// payment header persisted together with its allocation lines
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PaymentRecord {
    pub payment_id: PaymentId,
    pub unit_id: UnitId,
    pub amount: Money,
    pub method: PaymentMethod,
    pub reference: String,
    /// unallocated remainder credited to the unit in the same commit
    pub credited: Money,
    pub received_by: PrincipalId,
    pub received_at: DateTime<Utc>,
}

/// partial update of a stored charge
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ChargeUpdate {
    pub status: Option<ChargeStatus>,
    pub amount: Option<Money>,
    pub balance: Option<Money>,
}

impl ChargeUpdate {
    pub fn status(status: ChargeStatus) -> Self {
        Self {
            status: Some(status),
            ..Self::default()
        }
    }

    pub fn amount(amount: Money) -> Self {
        Self {
            status: Some(ChargeStatus::Pending),
            amount: Some(amount),
            balance: Some(amount),
        }
    }
}

/// The external relational store.
///
/// Writes are all-or-nothing: an implementation must re-check every
/// allocation line against the charge's current balance and status inside
/// the same transaction and leave nothing applied on failure.
pub trait BillingStore {
    fn active_units(&self, condominium_id: CondominiumId) -> Result<Vec<UnitRow>>;

    fn distribution_exists(
        &self,
        condominium_id: CondominiumId,
        kind: &ChargeKind,
        period: BillingPeriod,
    ) -> Result<bool>;

    fn insert_charges(&mut self, batch: &ChargeBatch) -> Result<Vec<ChargeId>>;

    /// pending and partially paid charges of a unit
    fn open_charges(&self, unit_id: UnitId) -> Result<Vec<ChargeRow>>;

    /// rows for the given ids; unknown ids are simply absent
    fn charges_by_id(&self, ids: &[ChargeId]) -> Result<Vec<ChargeRow>>;

    fn commit_payment(&mut self, payment: &PaymentRecord, lines: &[AllocationLine]) -> Result<()>;

    fn load_credit(&self, unit_id: UnitId) -> Result<CreditAccount>;

    /// apply part of a unit's credit to its charges, consuming that credit
    fn commit_credit_application(
        &mut self,
        unit_id: UnitId,
        lines: &[AllocationLine],
        applied_by: PrincipalId,
        applied_at: DateTime<Utc>,
    ) -> Result<()>;

    fn update_charge(&mut self, charge_id: ChargeId, update: &ChargeUpdate) -> Result<()>;
}
