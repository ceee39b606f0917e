pub mod allocation;
pub mod balance;
pub mod schedule;

use crate::money::Money;
use crate::types::{CurrencyCode, LoanId, OwnerId};

pub use allocation::{Allocation, AllocationStep, RepaymentAllocator};
pub use balance::{BalanceUpdate, LoanBalanceUpdater};
pub use schedule::RepaymentSchedule;

/// loan creation request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreateLoanRequest {
    pub owner_id: OwnerId,
    pub amount: Money,
    pub currency_code: CurrencyCode,
    pub terms: u32,
    /// disbursement timestamp, rfc 3339 or `YYYY-MM-DD[ HH:MM:SS]`
    pub processed_at: String,
}

/// repayment request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RepayLoanRequest {
    pub loan_id: LoanId,
    pub amount: Money,
    pub currency_code: CurrencyCode,
    /// when the money arrived, same formats as `processed_at`
    pub received_at: String,
}
