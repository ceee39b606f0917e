/// serialization support for loans
use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::entities::{Loan, ReceivedRepayment, ScheduledRepayment};
use crate::money::Money;
use crate::types::{
    CurrencyCode, LoanId, LoanStatus, OwnerId, ReceivedRepaymentId, RepaymentStatus,
    ScheduledRepaymentId,
};

/// serializable view of a loan's state
#[derive(Debug, Serialize, Deserialize)]
pub struct LoanView {
    pub id: LoanId,
    pub owner_id: OwnerId,
    pub currency_code: CurrencyCode,
    pub status: LoanStatus,
    pub terms: u32,
    pub processed_at: DateTime<Utc>,
    pub financial: FinancialView,
    pub schedule: Vec<InstallmentView>,
    pub repayments: Vec<RepaymentView>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct FinancialView {
    pub amount: Money,
    pub outstanding_amount: Money,
    pub total_received: Money,
    /// the same balances in major units
    pub amount_major: Decimal,
    pub outstanding_major: Decimal,
    pub installments_repaid: u32,
    pub next_due_date: Option<NaiveDate>,
    pub next_due_amount: Option<Money>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct InstallmentView {
    pub id: ScheduledRepaymentId,
    pub installment_number: u32,
    pub due_date: NaiveDate,
    pub amount: Money,
    pub outstanding_amount: Money,
    pub status: RepaymentStatus,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct RepaymentView {
    pub id: ReceivedRepaymentId,
    pub amount: Money,
    pub received_at: DateTime<Utc>,
}

impl LoanView {
    pub fn new(
        loan: &Loan,
        schedule: &[ScheduledRepayment],
        repayments: &[ReceivedRepayment],
    ) -> Self {
        let next_due = schedule
            .iter()
            .filter(|i| i.is_open())
            .min_by_key(|i| (i.due_date, i.installment_number));

        LoanView {
            id: loan.id,
            owner_id: loan.owner_id.clone(),
            currency_code: loan.currency_code.clone(),
            status: loan.status,
            terms: loan.terms,
            processed_at: loan.processed_at,
            financial: FinancialView {
                amount: loan.amount,
                outstanding_amount: loan.outstanding_amount,
                total_received: repayments.iter().map(|r| r.amount).sum(),
                amount_major: loan.amount.to_major(&loan.currency_code),
                outstanding_major: loan.outstanding_amount.to_major(&loan.currency_code),
                installments_repaid: schedule
                    .iter()
                    .filter(|i| i.status == RepaymentStatus::Repaid)
                    .count() as u32,
                next_due_date: next_due.map(|i| i.due_date),
                next_due_amount: next_due.map(|i| i.outstanding_amount),
            },
            schedule: schedule
                .iter()
                .map(|i| InstallmentView {
                    id: i.id,
                    installment_number: i.installment_number,
                    due_date: i.due_date,
                    amount: i.amount,
                    outstanding_amount: i.outstanding_amount,
                    status: i.status,
                })
                .collect(),
            repayments: repayments
                .iter()
                .map(|r| RepaymentView {
                    id: r.id,
                    amount: r.amount,
                    received_at: r.received_at,
                })
                .collect(),
        }
    }

    /// convert to pretty-printed json string
    pub fn to_json_pretty(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }
}
