pub mod memory;

use chrono::{DateTime, Utc};
use thiserror::Error;
use uuid::Uuid;

use crate::entities::{Loan, ReceivedRepayment, ScheduledRepayment};
use crate::money::Money;
use crate::types::{LoanId, LoanStatus, RepaymentStatus, ScheduledRepaymentId};

pub use memory::InMemoryLoanStore;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    #[error("{entity} {id} conflicts with the stored row")]
    Conflict {
        entity: &'static str,
        id: Uuid,
    },

    #[error("{entity} {id} does not exist")]
    MissingRow {
        entity: &'static str,
        id: Uuid,
    },

    #[error("store unavailable: {message}")]
    Unavailable {
        message: String,
    },
}

pub type StoreResult<T> = std::result::Result<T, StoreError>;

/// mutable loan fields written after a repayment
///
/// `previous_outstanding` is the balance the update was computed from; a store
/// refuses the write when the stored balance has moved since.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoanUpdate {
    pub id: LoanId,
    pub previous_outstanding: Money,
    pub outstanding_amount: Money,
    pub status: LoanStatus,
    pub updated_at: DateTime<Utc>,
}

impl LoanUpdate {
    /// update moving a loan from `previous_outstanding` to the state of `loan`
    pub fn from_payment(previous_outstanding: Money, loan: &Loan) -> Self {
        Self {
            id: loan.id,
            previous_outstanding,
            outstanding_amount: loan.outstanding_amount,
            status: loan.status,
            updated_at: loan.updated_at,
        }
    }
}

/// mutable installment fields written after an allocation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstallmentUpdate {
    pub id: ScheduledRepaymentId,
    pub previous_outstanding: Money,
    pub outstanding_amount: Money,
    pub status: RepaymentStatus,
    pub updated_at: DateTime<Utc>,
}

impl InstallmentUpdate {
    pub fn from_payment(previous_outstanding: Money, installment: &ScheduledRepayment) -> Self {
        Self {
            id: installment.id,
            previous_outstanding,
            outstanding_amount: installment.outstanding_amount,
            status: installment.status,
            updated_at: installment.updated_at,
        }
    }
}

/// single write inside a unit of work
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Change {
    InsertLoan(Loan),
    InsertInstallment(ScheduledRepayment),
    InsertReceivedRepayment(ReceivedRepayment),
    UpdateLoan(LoanUpdate),
    UpdateInstallment(InstallmentUpdate),
}

/// writes of one unit of work, committed all together or not at all
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChangeSet {
    changes: Vec<Change>,
}

impl ChangeSet {
    pub fn new() -> Self {
        Self {
            changes: Vec::new(),
        }
    }

    pub fn push(&mut self, change: Change) {
        self.changes.push(change);
    }

    pub fn insert_loan(&mut self, loan: Loan) {
        self.push(Change::InsertLoan(loan));
    }

    pub fn insert_installments(&mut self, installments: impl IntoIterator<Item = ScheduledRepayment>) {
        self.changes
            .extend(installments.into_iter().map(Change::InsertInstallment));
    }

    pub fn insert_received_repayment(&mut self, repayment: ReceivedRepayment) {
        self.push(Change::InsertReceivedRepayment(repayment));
    }

    pub fn update_loan(&mut self, update: LoanUpdate) {
        self.push(Change::UpdateLoan(update));
    }

    pub fn update_installment(&mut self, update: InstallmentUpdate) {
        self.push(Change::UpdateInstallment(update));
    }

    pub fn changes(&self) -> &[Change] {
        &self.changes
    }

    pub fn len(&self) -> usize {
        self.changes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.changes.is_empty()
    }
}

impl IntoIterator for ChangeSet {
    type Item = Change;
    type IntoIter = std::vec::IntoIter<Change>;

    fn into_iter(self) -> Self::IntoIter {
        self.changes.into_iter()
    }
}

/// persistence collaborator for loans, their schedules and received repayments
pub trait LoanStore {
    fn load_loan(&self, id: LoanId) -> StoreResult<Option<Loan>>;

    fn load_installment(&self, id: ScheduledRepaymentId) -> StoreResult<Option<ScheduledRepayment>>;

    /// due and partial installments of a loan, earliest due date first
    fn list_due_installments(&self, loan_id: LoanId) -> StoreResult<Vec<ScheduledRepayment>>;

    /// every installment of a loan, earliest due date first
    fn list_installments(&self, loan_id: LoanId) -> StoreResult<Vec<ScheduledRepayment>>;

    /// received repayments of a loan in the order they were recorded
    fn list_received_repayments(&self, loan_id: LoanId) -> StoreResult<Vec<ReceivedRepayment>>;

    /// apply every change atomically; on error nothing is written
    ///
    /// inserts of existing ids and updates whose `previous_outstanding` no
    /// longer matches the stored row fail with [`StoreError::Conflict`], so
    /// services sharing one store cannot overwrite each other's repayments.
    fn commit(&self, changes: ChangeSet) -> StoreResult<()>;
}
