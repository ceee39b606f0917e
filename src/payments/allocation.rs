use chrono::{DateTime, NaiveDate, Utc};

use crate::entities::ScheduledRepayment;
use crate::errors::{LoanError, Result};
use crate::money::Money;
use crate::types::{LoanId, RepaymentStatus, ScheduledRepaymentId};

/// effect of a payment on one installment
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AllocationStep {
    pub installment_id: ScheduledRepaymentId,
    pub installment_number: u32,
    pub due_date: NaiveDate,
    pub applied: Money,
    pub previous_outstanding: Money,
    pub outstanding: Money,
    pub previous_status: RepaymentStatus,
    pub status: RepaymentStatus,
}

/// result of running a payment through the installment waterfall
#[derive(Debug, Clone)]
pub struct Allocation {
    pub loan_id: LoanId,
    pub amount: Money,
    pub steps: Vec<AllocationStep>,
    updated: Vec<ScheduledRepayment>,
}

impl Allocation {
    /// total taken off installments; equals `amount` for a successful allocation
    pub fn total_applied(&self) -> Money {
        self.steps.iter().map(|s| s.applied).sum()
    }

    /// installments touched by the payment, in the order they were paid
    pub fn updated_installments(&self) -> &[ScheduledRepayment] {
        &self.updated
    }

    /// installments the payment settled in full
    pub fn settled_count(&self) -> usize {
        self.steps
            .iter()
            .filter(|s| s.status == RepaymentStatus::Repaid)
            .count()
    }
}

/// oldest-first payment waterfall over a loan's open installments
pub struct RepaymentAllocator;

impl RepaymentAllocator {
    /// apply `amount` to the open installments of a loan, earliest due date first
    ///
    /// each installment is paid off before the next one is touched; the first
    /// installment that cannot be cleared becomes partial and ends the walk.
    /// money left once every installment is repaid is an
    /// [`LoanError::OverpaymentUnallocated`] and nothing is allocated.
    pub fn allocate(
        loan_id: LoanId,
        installments: &[ScheduledRepayment],
        amount: Money,
        now: DateTime<Utc>,
    ) -> Result<Allocation> {
        if !amount.is_positive() {
            return Err(LoanError::InvalidAmount { amount });
        }

        let mut open: Vec<&ScheduledRepayment> = installments
            .iter()
            .filter(|i| i.loan_id == loan_id && i.is_open())
            .collect();
        open.sort_by_key(|i| (i.due_date, i.installment_number));

        let mut remaining = amount;
        let mut steps = Vec::new();
        let mut updated = Vec::new();

        for installment in open {
            if remaining.is_zero() {
                break;
            }

            let applied = remaining.min(installment.outstanding_amount);
            let paid = installment.with_payment(applied, now)?;
            remaining -= applied;

            tracing::debug!(
                loan_id = %loan_id,
                installment = installment.installment_number,
                applied = %applied,
                outstanding = %paid.outstanding_amount,
                status = %paid.status,
                "installment allocated"
            );

            steps.push(AllocationStep {
                installment_id: installment.id,
                installment_number: installment.installment_number,
                due_date: installment.due_date,
                applied,
                previous_outstanding: installment.outstanding_amount,
                outstanding: paid.outstanding_amount,
                previous_status: installment.status,
                status: paid.status,
            });
            updated.push(paid);
        }

        if remaining.is_positive() {
            return Err(LoanError::OverpaymentUnallocated {
                loan_id,
                unallocated: remaining,
            });
        }

        Ok(Allocation {
            loan_id,
            amount,
            steps,
            updated,
        })
    }
}
