use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::decimal::Money;
use crate::types::{
    BillingPeriod, ChargeId, CondominiumId, DistributionMethod, PaymentId, PrincipalId, UnitId,
};

/// all events emitted by billing operations
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Event {
    // distribution events
    ChargesDistributed {
        condominium_id: CondominiumId,
        period: BillingPeriod,
        method: DistributionMethod,
        requested_total: Money,
        issued_total: Money,
        unit_count: usize,
        issued_by: PrincipalId,
        timestamp: DateTime<Utc>,
    },
    ChargeIssued {
        charge_id: ChargeId,
        unit_id: UnitId,
        amount: Money,
        due_date: NaiveDate,
    },
    AmountOverridden {
        unit_id: UnitId,
        suggested_amount: Money,
        final_amount: Money,
    },

    // payment events
    PaymentReceived {
        payment_id: PaymentId,
        unit_id: UnitId,
        amount: Money,
        received_by: PrincipalId,
        timestamp: DateTime<Utc>,
    },
    PaymentAllocated {
        payment_id: PaymentId,
        charge_id: ChargeId,
        amount: Money,
        timestamp: DateTime<Utc>,
    },
    CreditRecorded {
        payment_id: PaymentId,
        unit_id: UnitId,
        amount: Money,
        timestamp: DateTime<Utc>,
    },
    CreditApplied {
        unit_id: UnitId,
        amount: Money,
        remaining_credit: Money,
        timestamp: DateTime<Utc>,
    },
    AllocationRejected {
        payment_id: PaymentId,
        code: String,
        reason: String,
        timestamp: DateTime<Utc>,
    },

    // charge lifecycle events
    ChargeCancelled {
        charge_id: ChargeId,
        reason: String,
        cancelled_by: PrincipalId,
        timestamp: DateTime<Utc>,
    },
    ChargeAmended {
        charge_id: ChargeId,
        old_amount: Money,
        new_amount: Money,
        amended_by: PrincipalId,
        timestamp: DateTime<Utc>,
    },
}

/// event store for collecting events during operations
#[derive(Debug, Default)]
pub struct EventStore {
    events: Vec<Event>,
}

impl EventStore {
    pub fn new() -> Self {
        Self { events: Vec::new() }
    }

    pub fn emit(&mut self, event: Event) {
        self.events.push(event);
    }

    pub fn take_events(&mut self) -> Vec<Event> {
        std::mem::take(&mut self.events)
    }

    pub fn events(&self) -> &[Event] {
        &self.events
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    pub fn clear(&mut self) {
        self.events.clear();
    }
}
