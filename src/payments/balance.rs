use chrono::{DateTime, Utc};

use crate::entities::Loan;
use crate::errors::{LoanError, Result};
use crate::money::Money;
use crate::types::LoanStatus;

/// loan after a payment was applied to its aggregate balance
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BalanceUpdate {
    pub loan: Loan,
    pub applied: Money,
    pub previous_outstanding: Money,
    pub previous_status: LoanStatus,
}

impl BalanceUpdate {
    /// payment brought the loan to zero
    pub fn settled(&self) -> bool {
        self.previous_status == LoanStatus::Due && self.loan.status == LoanStatus::Repaid
    }
}

/// keeps a loan's outstanding amount and status in step with payments
pub struct LoanBalanceUpdater;

impl LoanBalanceUpdater {
    /// take `amount` off the loan's outstanding balance
    ///
    /// reaching exactly zero marks the loan repaid. going below zero is
    /// rejected as [`LoanError::OverpaymentUnallocated`].
    pub fn apply_payment(loan: &Loan, amount: Money, now: DateTime<Utc>) -> Result<BalanceUpdate> {
        if !amount.is_positive() {
            return Err(LoanError::InvalidAmount { amount });
        }
        if loan.is_repaid() {
            return Err(LoanError::OverpaymentUnallocated {
                loan_id: loan.id,
                unallocated: amount,
            });
        }

        let new_outstanding = loan.outstanding_amount - amount;
        if new_outstanding.is_negative() {
            return Err(LoanError::OverpaymentUnallocated {
                loan_id: loan.id,
                unallocated: Money::ZERO - new_outstanding,
            });
        }

        let status = if new_outstanding.is_zero() {
            LoanStatus::Repaid
        } else {
            LoanStatus::Due
        };

        Ok(BalanceUpdate {
            loan: Loan {
                outstanding_amount: new_outstanding,
                status,
                updated_at: now,
                ..loan.clone()
            },
            applied: amount,
            previous_outstanding: loan.outstanding_amount,
            previous_status: loan.status,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::CurrencyCode;
    use chrono::TimeZone;

    fn create_test_loan(amount: i64) -> Loan {
        let processed_at = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        Loan::new(
            "user-1".to_string(),
            Money::from_minor(amount),
            CurrencyCode::sgd(),
            12,
            processed_at,
            processed_at,
        )
    }

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 2, 1, 0, 0, 0).unwrap()
    }

    #[test]
    fn test_partial_balance_stays_due() {
        let loan = create_test_loan(1200);

        let update = LoanBalanceUpdater::apply_payment(&loan, Money::from_minor(100), now()).unwrap();

        assert_eq!(update.loan.outstanding_amount, Money::from_minor(1100));
        assert_eq!(update.loan.status, LoanStatus::Due);
        assert_eq!(update.previous_outstanding, Money::from_minor(1200));
        assert_eq!(update.loan.updated_at, now());
        assert!(!update.settled());
        assert!(update.loan.is_consistent());
    }

    #[test]
    fn test_paying_to_zero_marks_repaid() {
        let mut loan = create_test_loan(1200);
        loan.outstanding_amount = Money::from_minor(100);

        let update = LoanBalanceUpdater::apply_payment(&loan, Money::from_minor(100), now()).unwrap();

        assert_eq!(update.loan.outstanding_amount, Money::ZERO);
        assert_eq!(update.loan.status, LoanStatus::Repaid);
        assert!(update.settled());
        assert!(update.loan.is_consistent());
    }

    #[test]
    fn test_balance_never_goes_negative() {
        let loan = create_test_loan(1200);

        let err = LoanBalanceUpdater::apply_payment(&loan, Money::from_minor(1250), now()).unwrap_err();

        assert!(matches!(
            err,
            LoanError::OverpaymentUnallocated { unallocated, .. } if unallocated == Money::from_minor(50)
        ));
    }

    #[test]
    fn test_repaid_loan_rejects_payment() {
        let mut loan = create_test_loan(1200);
        loan.outstanding_amount = Money::ZERO;
        loan.status = LoanStatus::Repaid;

        let err = LoanBalanceUpdater::apply_payment(&loan, Money::from_minor(1), now()).unwrap_err();
        assert!(matches!(err, LoanError::OverpaymentUnallocated { .. }));
    }
}
