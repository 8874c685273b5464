pub mod allocation;
pub mod config;
pub mod decimal;
pub mod distribution;
pub mod errors;
pub mod events;
pub mod service;
pub mod store;
pub mod types;
pub mod views;

// re-export key types
pub use allocation::{
    allocate, validate_manual, AllocationLine, AllocationMode, AllocationPlan, AllocationPlanner,
    ChargeBalance, CreditAccount, LiveCharge, ManualAllocation,
};
pub use config::{BillingConfig, DistributionConfig, PaymentConfig};
pub use decimal::{Money, Weight};
pub use distribution::{
    distribute, DistributionEngine, DistributionLine, DistributionPreview, UnitShare,
};
pub use errors::{ActionOutcome, BillingError, Result};
pub use events::{Event, EventStore};
pub use service::{
    BillingService, CreditApplication, DistributionRequest, IssuedCharges, PaymentIntake,
    PaymentReceipt,
};
pub use store::{BillingStore, MemoryStore, PaymentMethod};
pub use types::{
    BillingPeriod, ChargeId, ChargeKind, ChargeStatus, CondominiumId, DistributionMethod,
    PaymentId, PrincipalId, ResidualPolicy, UnitId,
};

// re-export external dependencies that users will need
pub use chrono;
pub use hourglass_rs::{SafeTimeProvider, TimeSource};
pub use rust_decimal::Decimal;
pub use uuid::Uuid;
