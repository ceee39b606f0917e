use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::money::Money;
use crate::types::{
    CurrencyCode, LoanId, OwnerId, ReceivedRepaymentId, RepaymentStatus, ScheduledRepaymentId,
};

/// all events that can be emitted by the loan service
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Event {
    // lifecycle events
    LoanCreated {
        loan_id: LoanId,
        owner_id: OwnerId,
        amount: Money,
        currency_code: CurrencyCode,
        terms: u32,
        processed_at: DateTime<Utc>,
        timestamp: DateTime<Utc>,
    },
    InstallmentScheduled {
        loan_id: LoanId,
        installment_id: ScheduledRepaymentId,
        installment_number: u32,
        amount: Money,
        due_date: NaiveDate,
    },
    LoanRepaid {
        loan_id: LoanId,
        final_payment: Money,
        timestamp: DateTime<Utc>,
    },

    // payment events
    RepaymentReceived {
        loan_id: LoanId,
        repayment_id: ReceivedRepaymentId,
        amount: Money,
        currency_code: CurrencyCode,
        received_at: DateTime<Utc>,
        outstanding_after: Money,
    },
    InstallmentPaid {
        loan_id: LoanId,
        installment_id: ScheduledRepaymentId,
        installment_number: u32,
        applied: Money,
        outstanding: Money,
        previous_status: RepaymentStatus,
        new_status: RepaymentStatus,
        timestamp: DateTime<Utc>,
    },
}

impl Event {
    pub fn loan_id(&self) -> LoanId {
        match self {
            Event::LoanCreated { loan_id, .. }
            | Event::InstallmentScheduled { loan_id, .. }
            | Event::LoanRepaid { loan_id, .. }
            | Event::RepaymentReceived { loan_id, .. }
            | Event::InstallmentPaid { loan_id, .. } => *loan_id,
        }
    }
}

/// event store for collecting events during operations
#[derive(Debug, Default)]
pub struct EventStore {
    events: Vec<Event>,
}

impl EventStore {
    pub fn new() -> Self {
        Self {
            events: Vec::new(),
        }
    }

    pub fn emit(&mut self, event: Event) {
        self.events.push(event);
    }

    pub fn take_events(&mut self) -> Vec<Event> {
        std::mem::take(&mut self.events)
    }

    pub fn events(&self) -> &[Event] {
        &self.events
    }

    pub fn clear(&mut self) {
        self.events.clear();
    }
}

impl Extend<Event> for EventStore {
    fn extend<T: IntoIterator<Item = Event>>(&mut self, iter: T) {
        self.events.extend(iter);
    }
}
