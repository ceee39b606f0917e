use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

use crate::errors::LoanError;

/// unique identifier for a loan
pub type LoanId = Uuid;

/// unique identifier for a scheduled installment
pub type ScheduledRepaymentId = Uuid;

/// unique identifier for a received repayment
pub type ReceivedRepaymentId = Uuid;

/// opaque reference to the borrower owning a loan
pub type OwnerId = String;

/// loan status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LoanStatus {
    /// outstanding balance remains
    Due,
    /// fully paid off, terminal
    Repaid,
}

impl fmt::Display for LoanStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LoanStatus::Due => write!(f, "due"),
            LoanStatus::Repaid => write!(f, "repaid"),
        }
    }
}

/// scheduled installment status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RepaymentStatus {
    /// nothing paid yet
    Due,
    /// paid in part
    Partial,
    /// fully paid, terminal
    Repaid,
}

impl RepaymentStatus {
    /// whether the installment still accepts money
    pub fn is_open(&self) -> bool {
        !matches!(self, RepaymentStatus::Repaid)
    }
}

impl fmt::Display for RepaymentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RepaymentStatus::Due => write!(f, "due"),
            RepaymentStatus::Partial => write!(f, "partial"),
            RepaymentStatus::Repaid => write!(f, "repaid"),
        }
    }
}

/// three-letter currency code carried as a tag, never converted
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct CurrencyCode(String);

impl CurrencyCode {
    /// parse and normalise to upper case
    pub fn new(code: &str) -> Result<Self, LoanError> {
        let code = code.trim();
        if code.len() != 3 || !code.chars().all(|c| c.is_ascii_alphabetic()) {
            return Err(LoanError::InvalidCurrency {
                code: code.to_string(),
            });
        }
        Ok(CurrencyCode(code.to_ascii_uppercase()))
    }

    pub fn sgd() -> Self {
        CurrencyCode("SGD".to_string())
    }

    pub fn thb() -> Self {
        CurrencyCode("THB".to_string())
    }

    pub fn vnd() -> Self {
        CurrencyCode("VND".to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// decimal places between minor and major units
    pub fn minor_unit_exponent(&self) -> u32 {
        match self.0.as_str() {
            "VND" | "JPY" | "KRW" | "IDR" => 0,
            _ => 2,
        }
    }
}

impl fmt::Display for CurrencyCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for CurrencyCode {
    type Err = LoanError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        CurrencyCode::new(s)
    }
}

impl TryFrom<String> for CurrencyCode {
    type Error = LoanError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        CurrencyCode::new(&value)
    }
}

impl From<CurrencyCode> for String {
    fn from(code: CurrencyCode) -> Self {
        code.0
    }
}
