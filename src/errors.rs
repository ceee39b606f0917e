use thiserror::Error;

use crate::money::Money;
use crate::store::StoreError;
use crate::types::{CurrencyCode, LoanId, ScheduledRepaymentId};

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LoanError {
    #[error("invalid amount: {amount}")]
    InvalidAmount {
        amount: Money,
    },

    #[error("invalid terms: {terms}, expected between 1 and {max}")]
    InvalidTerms {
        terms: u32,
        max: u32,
    },

    #[error("invalid date: {message}")]
    InvalidDate {
        message: String,
    },

    #[error("invalid currency code: {code:?}")]
    InvalidCurrency {
        code: String,
    },

    #[error("unsupported currency: {currency}")]
    UnsupportedCurrency {
        currency: CurrencyCode,
    },

    #[error("currency mismatch: loan is {expected}, payment is {provided}")]
    CurrencyMismatch {
        expected: CurrencyCode,
        provided: CurrencyCode,
    },

    #[error("invalid configuration: {message}")]
    InvalidConfiguration {
        message: String,
    },

    #[error("loan not found: {id}")]
    LoanNotFound {
        id: LoanId,
    },

    #[error("installment not found: {id}")]
    InstallmentNotFound {
        id: ScheduledRepaymentId,
    },

    #[error("unallocated overpayment on loan {loan_id}: {unallocated} left after all installments")]
    OverpaymentUnallocated {
        loan_id: LoanId,
        unallocated: Money,
    },

    #[error(transparent)]
    Store(#[from] StoreError),
}

impl LoanError {
    /// caller supplied a bad argument; nothing was mutated
    pub fn is_invalid_argument(&self) -> bool {
        matches!(
            self,
            LoanError::InvalidAmount { .. }
                | LoanError::InvalidTerms { .. }
                | LoanError::InvalidDate { .. }
                | LoanError::InvalidCurrency { .. }
                | LoanError::UnsupportedCurrency { .. }
                | LoanError::CurrencyMismatch { .. }
                | LoanError::InvalidConfiguration { .. }
        )
    }

    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            LoanError::LoanNotFound { .. } | LoanError::InstallmentNotFound { .. }
        )
    }
}

pub type Result<T> = std::result::Result<T, LoanError>;
