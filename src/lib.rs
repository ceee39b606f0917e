pub mod calendar;
pub mod config;
pub mod entities;
pub mod errors;
pub mod events;
pub mod locks;
pub mod money;
pub mod payments;
pub mod service;
pub mod store;
pub mod types;
pub mod views;

// re-export key types
pub use config::LoanServiceConfig;
pub use entities::{Loan, ReceivedRepayment, ScheduledRepayment};
pub use errors::{LoanError, Result};
pub use events::{Event, EventStore};
pub use money::Money;
pub use payments::{
    Allocation, AllocationStep, BalanceUpdate, CreateLoanRequest, LoanBalanceUpdater,
    RepayLoanRequest, RepaymentAllocator, RepaymentSchedule,
};
pub use service::LoanService;
pub use store::{ChangeSet, InMemoryLoanStore, LoanStore, StoreError};
pub use types::{
    CurrencyCode, LoanId, LoanStatus, OwnerId, ReceivedRepaymentId, RepaymentStatus,
    ScheduledRepaymentId,
};
pub use views::LoanView;

// re-export external dependencies that users will need
pub use chrono;
pub use hourglass_rs::{SafeTimeProvider, TimeSource};
pub use rust_decimal::Decimal;
pub use uuid::Uuid;
