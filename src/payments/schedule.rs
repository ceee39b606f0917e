use chrono::NaiveDate;

use crate::calendar::add_months;
use crate::entities::{Loan, ScheduledRepayment};
use crate::errors::{LoanError, Result};
use crate::money::Money;
use crate::types::LoanId;

/// repayment schedule of a loan, ordered by due date
#[derive(Debug, Clone)]
pub struct RepaymentSchedule {
    pub loan_id: LoanId,
    pub principal: Money,
    pub terms: u32,
    pub installments: Vec<ScheduledRepayment>,
}

impl RepaymentSchedule {
    /// generate the installment schedule for a newly created loan
    ///
    /// every installment but the last carries `amount / terms` (truncated); the
    /// last one absorbs the remainder so the schedule sums to the principal.
    /// installment `k` falls due `k` calendar months after `processed_at`.
    pub fn generate(loan: &Loan) -> Result<Self> {
        if loan.terms == 0 {
            return Err(LoanError::InvalidTerms {
                terms: loan.terms,
                max: u32::MAX,
            });
        }
        if loan.amount.is_negative() {
            return Err(LoanError::InvalidAmount { amount: loan.amount });
        }

        let base_installment = installment_amount(loan.amount, loan.terms)?;
        let start = loan.processed_at.date_naive();

        let mut installments = Vec::with_capacity(loan.terms as usize);
        for number in 1..loan.terms {
            let due_date = due_date_for(start, number)?;
            installments.push(ScheduledRepayment::new(loan, number, base_installment, due_date));
        }

        let scheduled_so_far = base_installment
            .checked_mul(i64::from(loan.terms - 1))
            .ok_or(LoanError::InvalidAmount { amount: loan.amount })?;
        let last_amount = loan.amount - scheduled_so_far;
        let last_due = due_date_for(start, loan.terms)?;
        installments.push(ScheduledRepayment::new(loan, loan.terms, last_amount, last_due));

        Ok(Self {
            loan_id: loan.id,
            principal: loan.amount,
            terms: loan.terms,
            installments,
        })
    }

    /// get installment by 1-based number
    pub fn get_installment(&self, installment_number: u32) -> Option<&ScheduledRepayment> {
        installment_number
            .checked_sub(1)
            .and_then(|index| self.installments.get(index as usize))
    }

    /// sum of all scheduled amounts
    pub fn total_amount(&self) -> Money {
        self.installments.iter().map(|i| i.amount).sum()
    }

    /// due date of the final installment
    pub fn maturity_date(&self) -> Option<NaiveDate> {
        self.installments.last().map(|i| i.due_date)
    }

    pub fn into_installments(self) -> Vec<ScheduledRepayment> {
        self.installments
    }
}

/// regular installment amount, truncated toward zero
pub fn installment_amount(amount: Money, terms: u32) -> Result<Money> {
    amount
        .checked_div(i64::from(terms))
        .ok_or(LoanError::InvalidTerms { terms, max: u32::MAX })
}

/// due date of installment `number`, counted from the disbursement date
pub fn due_date_for(processed_on: NaiveDate, number: u32) -> Result<NaiveDate> {
    add_months(processed_on, number)
}
