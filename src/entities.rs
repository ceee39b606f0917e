use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::errors::{LoanError, Result};
use crate::money::Money;
use crate::types::{
    CurrencyCode, LoanId, LoanStatus, OwnerId, ReceivedRepaymentId, RepaymentStatus,
    ScheduledRepaymentId,
};

/// a disbursed principal repayable over a fixed number of monthly installments
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Loan {
    pub id: LoanId,
    pub owner_id: OwnerId,
    pub amount: Money,
    pub outstanding_amount: Money,
    pub currency_code: CurrencyCode,
    pub terms: u32,
    pub processed_at: DateTime<Utc>,
    pub status: LoanStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Loan {
    /// new loan with the whole principal outstanding
    pub fn new(
        owner_id: OwnerId,
        amount: Money,
        currency_code: CurrencyCode,
        terms: u32,
        processed_at: DateTime<Utc>,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            owner_id,
            amount,
            outstanding_amount: amount,
            currency_code,
            terms,
            processed_at,
            status: LoanStatus::Due,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn is_repaid(&self) -> bool {
        self.status == LoanStatus::Repaid
    }

    /// outstanding within `0..=amount` and zero exactly when repaid
    pub fn is_consistent(&self) -> bool {
        let in_range = !self.outstanding_amount.is_negative() && self.outstanding_amount <= self.amount;
        in_range && (self.outstanding_amount.is_zero() == self.is_repaid())
    }
}

/// one planned installment of a loan's schedule
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScheduledRepayment {
    pub id: ScheduledRepaymentId,
    pub loan_id: LoanId,
    /// 1-based position in the schedule
    pub installment_number: u32,
    pub amount: Money,
    pub outstanding_amount: Money,
    pub currency_code: CurrencyCode,
    pub due_date: NaiveDate,
    pub status: RepaymentStatus,
    pub updated_at: DateTime<Utc>,
}

impl ScheduledRepayment {
    /// new installment with nothing paid
    pub fn new(
        loan: &Loan,
        installment_number: u32,
        amount: Money,
        due_date: NaiveDate,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            loan_id: loan.id,
            installment_number,
            amount,
            outstanding_amount: amount,
            currency_code: loan.currency_code.clone(),
            due_date,
            status: status_for(amount, amount),
            updated_at: loan.created_at,
        }
    }

    pub fn is_open(&self) -> bool {
        self.status.is_open()
    }

    /// paid so far
    pub fn paid_amount(&self) -> Money {
        self.amount - self.outstanding_amount
    }

    /// installment after `applied` is taken off its outstanding balance
    ///
    /// `applied` outside `0..=outstanding_amount` is an
    /// [`LoanError::InvalidAmount`].
    pub fn with_payment(&self, applied: Money, now: DateTime<Utc>) -> Result<Self> {
        if applied.is_negative() || applied > self.outstanding_amount {
            return Err(LoanError::InvalidAmount { amount: applied });
        }

        let outstanding_amount = self.outstanding_amount - applied;
        Ok(Self {
            outstanding_amount,
            status: status_for(self.amount, outstanding_amount),
            updated_at: now,
            ..self.clone()
        })
    }

    /// status agrees with the outstanding balance
    pub fn is_consistent(&self) -> bool {
        !self.outstanding_amount.is_negative()
            && self.outstanding_amount <= self.amount
            && self.status == status_for(self.amount, self.outstanding_amount)
    }
}

/// status implied by an installment's balances
///
/// zero outstanding is repaid (this includes zero-amount installments), a full
/// balance is due and anything in between is partial.
pub fn status_for(amount: Money, outstanding: Money) -> RepaymentStatus {
    if outstanding.is_zero() {
        RepaymentStatus::Repaid
    } else if outstanding == amount {
        RepaymentStatus::Due
    } else {
        RepaymentStatus::Partial
    }
}

/// append-only record of money received toward a loan
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReceivedRepayment {
    pub id: ReceivedRepaymentId,
    pub loan_id: LoanId,
    pub amount: Money,
    pub currency_code: CurrencyCode,
    pub received_at: DateTime<Utc>,
    pub recorded_at: DateTime<Utc>,
}

impl ReceivedRepayment {
    pub fn new(
        loan_id: LoanId,
        amount: Money,
        currency_code: CurrencyCode,
        received_at: DateTime<Utc>,
        recorded_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            loan_id,
            amount,
            currency_code,
            received_at,
            recorded_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn test_loan() -> Loan {
        let now = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        Loan::new(
            "user-1".to_string(),
            Money::from_minor(1200),
            CurrencyCode::sgd(),
            12,
            now,
            now,
        )
    }

    #[test]
    fn test_new_loan_is_fully_outstanding() {
        let loan = test_loan();

        assert_eq!(loan.outstanding_amount, loan.amount);
        assert_eq!(loan.status, LoanStatus::Due);
        assert!(loan.is_consistent());
    }

    #[test]
    fn test_loan_consistency_checks() {
        let mut loan = test_loan();

        loan.outstanding_amount = Money::ZERO;
        assert!(!loan.is_consistent());

        loan.status = LoanStatus::Repaid;
        assert!(loan.is_consistent());

        loan.outstanding_amount = Money::from_minor(-5);
        loan.status = LoanStatus::Due;
        assert!(!loan.is_consistent());
    }

    #[test]
    fn test_status_for_balances() {
        let amount = Money::from_minor(100);

        assert_eq!(status_for(amount, amount), RepaymentStatus::Due);
        assert_eq!(status_for(amount, Money::from_minor(60)), RepaymentStatus::Partial);
        assert_eq!(status_for(amount, Money::ZERO), RepaymentStatus::Repaid);
        assert_eq!(status_for(Money::ZERO, Money::ZERO), RepaymentStatus::Repaid);
    }

    #[test]
    fn test_installment_with_payment() {
        let loan = test_loan();
        let due = NaiveDate::from_ymd_opt(2024, 2, 1).unwrap();
        let installment = ScheduledRepayment::new(&loan, 1, Money::from_minor(100), due);
        assert_eq!(installment.status, RepaymentStatus::Due);
        assert_eq!(installment.currency_code, loan.currency_code);

        let later = Utc.with_ymd_and_hms(2024, 1, 15, 0, 0, 0).unwrap();
        let partial = installment.with_payment(Money::from_minor(40), later).unwrap();
        assert_eq!(partial.outstanding_amount, Money::from_minor(60));
        assert_eq!(partial.status, RepaymentStatus::Partial);
        assert_eq!(partial.paid_amount(), Money::from_minor(40));
        assert_eq!(partial.updated_at, later);
        assert_eq!(partial.id, installment.id);
        assert!(partial.is_consistent());

        let repaid = partial.with_payment(Money::from_minor(60), later).unwrap();
        assert_eq!(repaid.outstanding_amount, Money::ZERO);
        assert_eq!(repaid.status, RepaymentStatus::Repaid);
        assert!(!repaid.is_open());
        assert!(repaid.is_consistent());
    }

    #[test]
    fn test_payment_outside_outstanding_rejected() {
        let loan = test_loan();
        let due = NaiveDate::from_ymd_opt(2024, 2, 1).unwrap();
        let later = Utc.with_ymd_and_hms(2024, 1, 15, 0, 0, 0).unwrap();
        let installment = ScheduledRepayment::new(&loan, 1, Money::from_minor(100), due);

        let err = installment.with_payment(Money::from_minor(101), later).unwrap_err();
        assert_eq!(err, LoanError::InvalidAmount { amount: Money::from_minor(101) });

        let err = installment.with_payment(Money::from_minor(-1), later).unwrap_err();
        assert_eq!(err, LoanError::InvalidAmount { amount: Money::from_minor(-1) });

        let untouched = installment.with_payment(Money::ZERO, later).unwrap();
        assert_eq!(untouched.outstanding_amount, Money::from_minor(100));
        assert_eq!(untouched.status, RepaymentStatus::Due);

        let partial = installment.with_payment(Money::from_minor(70), later).unwrap();
        assert!(partial.with_payment(Money::from_minor(31), later).is_err());
    }
}
