use std::sync::{Mutex, PoisonError};

use chrono::{DateTime, Utc};
use hourglass_rs::SafeTimeProvider;

use crate::calendar::parse_timestamp;
use crate::config::LoanServiceConfig;
use crate::entities::{Loan, ReceivedRepayment, ScheduledRepayment};
use crate::errors::{LoanError, Result};
use crate::events::{Event, EventStore};
use crate::locks::LoanLocks;
use crate::money::Money;
use crate::payments::{
    Allocation, BalanceUpdate, CreateLoanRequest, LoanBalanceUpdater, RepayLoanRequest,
    RepaymentAllocator, RepaymentSchedule,
};
use crate::store::{ChangeSet, InstallmentUpdate, LoanStore, LoanUpdate};
use crate::types::{CurrencyCode, LoanId, ScheduledRepaymentId};
use crate::views::LoanView;

/// creates loans with their schedules and applies repayments against them
pub struct LoanService<S> {
    store: S,
    config: LoanServiceConfig,
    locks: LoanLocks,
    events: Mutex<EventStore>,
}

impl<S: LoanStore> LoanService<S> {
    pub fn new(store: S, config: LoanServiceConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            store,
            config,
            locks: LoanLocks::new(),
            events: Mutex::new(EventStore::new()),
        })
    }

    /// service with the default configuration
    pub fn with_store(store: S) -> Self {
        Self {
            store,
            config: LoanServiceConfig::default(),
            locks: LoanLocks::new(),
            events: Mutex::new(EventStore::new()),
        }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn config(&self) -> &LoanServiceConfig {
        &self.config
    }

    /// create a loan and its repayment schedule
    ///
    /// the loan and every installment are written in one unit of work.
    pub fn create_loan(
        &self,
        request: CreateLoanRequest,
        time_provider: &SafeTimeProvider,
    ) -> Result<Loan> {
        validate_amount(request.amount)?;
        self.validate_terms(request.terms)?;
        self.validate_currency(&request.currency_code)?;
        let processed_at = parse_timestamp(&request.processed_at)?;

        let loan = Loan::new(
            request.owner_id,
            request.amount,
            request.currency_code,
            request.terms,
            processed_at,
            time_provider.now(),
        );
        let schedule = RepaymentSchedule::generate(&loan)?;

        let mut changes = ChangeSet::new();
        changes.insert_loan(loan.clone());
        changes.insert_installments(schedule.installments.iter().cloned());
        self.store.commit(changes)?;

        tracing::info!(
            loan_id = %loan.id,
            owner_id = %loan.owner_id,
            amount = %loan.amount,
            currency = %loan.currency_code,
            terms = loan.terms,
            "loan created"
        );

        let mut events = vec![Event::LoanCreated {
            loan_id: loan.id,
            owner_id: loan.owner_id.clone(),
            amount: loan.amount,
            currency_code: loan.currency_code.clone(),
            terms: loan.terms,
            processed_at: loan.processed_at,
            timestamp: loan.created_at,
        }];
        events.extend(schedule.installments.iter().map(|i| Event::InstallmentScheduled {
            loan_id: loan.id,
            installment_id: i.id,
            installment_number: i.installment_number,
            amount: i.amount,
            due_date: i.due_date,
        }));
        self.emit(events);

        Ok(loan)
    }

    /// record a received payment and allocate it over the loan's schedule
    ///
    /// the received repayment, the installment updates and the loan update are
    /// committed together; any error leaves the loan untouched.
    pub fn repay_loan(
        &self,
        request: RepayLoanRequest,
        time_provider: &SafeTimeProvider,
    ) -> Result<ReceivedRepayment> {
        validate_amount(request.amount)?;
        let received_at = parse_timestamp(&request.received_at)?;

        self.apply_repayment(
            request.loan_id,
            request.amount,
            request.currency_code,
            received_at,
            time_provider,
        )
    }

    /// repay with the receipt time taken from the time provider
    pub fn repay_loan_now(
        &self,
        loan_id: LoanId,
        amount: Money,
        currency_code: CurrencyCode,
        time_provider: &SafeTimeProvider,
    ) -> Result<ReceivedRepayment> {
        validate_amount(amount)?;
        self.apply_repayment(loan_id, amount, currency_code, time_provider.now(), time_provider)
    }

    fn apply_repayment(
        &self,
        loan_id: LoanId,
        amount: Money,
        currency_code: CurrencyCode,
        received_at: DateTime<Utc>,
        time_provider: &SafeTimeProvider,
    ) -> Result<ReceivedRepayment> {
        self.locks.with_lock(loan_id, || {
            self.apply_repayment_locked(loan_id, amount, currency_code, received_at, time_provider)
        })
    }

    /// caller holds the loan's lock
    fn apply_repayment_locked(
        &self,
        loan_id: LoanId,
        amount: Money,
        currency_code: CurrencyCode,
        received_at: DateTime<Utc>,
        time_provider: &SafeTimeProvider,
    ) -> Result<ReceivedRepayment> {
        let loan = self.require_loan(loan_id)?;
        if loan.currency_code != currency_code {
            tracing::warn!(
                loan_id = %loan_id,
                expected = %loan.currency_code,
                provided = %currency_code,
                "repayment currency mismatch"
            );
            return Err(LoanError::CurrencyMismatch {
                expected: loan.currency_code,
                provided: currency_code,
            });
        }

        let now = time_provider.now();
        let due = self.store.list_due_installments(loan_id)?;
        let (allocation, balance) = match allocate_and_settle(&loan, &due, amount, now) {
            Ok(result) => result,
            Err(err) => {
                if let LoanError::OverpaymentUnallocated { unallocated, .. } = &err {
                    tracing::warn!(
                        loan_id = %loan_id,
                        amount = %amount,
                        unallocated = %unallocated,
                        outstanding = %loan.outstanding_amount,
                        "repayment rejected, amount exceeds outstanding schedule"
                    );
                }
                return Err(err);
            }
        };

        let received = ReceivedRepayment::new(loan_id, amount, currency_code, received_at, now);

        let mut changes = ChangeSet::new();
        changes.insert_received_repayment(received.clone());
        for (step, installment) in allocation.steps.iter().zip(allocation.updated_installments()) {
            changes.update_installment(InstallmentUpdate::from_payment(step.previous_outstanding, installment));
        }
        changes.update_loan(LoanUpdate::from_payment(balance.previous_outstanding, &balance.loan));
        self.store.commit(changes)?;

        tracing::info!(
            loan_id = %loan_id,
            repayment_id = %received.id,
            amount = %amount,
            installments = allocation.steps.len(),
            outstanding = %balance.loan.outstanding_amount,
            status = %balance.loan.status,
            "repayment applied"
        );

        self.emit(repayment_events(&received, &allocation, &balance, now));

        Ok(received)
    }

    pub fn loan(&self, loan_id: LoanId) -> Result<Loan> {
        self.require_loan(loan_id)
    }

    pub fn installment(&self, installment_id: ScheduledRepaymentId) -> Result<ScheduledRepayment> {
        self.store
            .load_installment(installment_id)?
            .ok_or(LoanError::InstallmentNotFound { id: installment_id })
    }

    /// full schedule of a loan, earliest due date first
    pub fn schedule(&self, loan_id: LoanId) -> Result<Vec<ScheduledRepayment>> {
        self.require_loan(loan_id)?;
        Ok(self.store.list_installments(loan_id)?)
    }

    pub fn received_repayments(&self, loan_id: LoanId) -> Result<Vec<ReceivedRepayment>> {
        self.require_loan(loan_id)?;
        Ok(self.store.list_received_repayments(loan_id)?)
    }

    /// serializable snapshot of a loan with its schedule and repayment ledger
    pub fn loan_view(&self, loan_id: LoanId) -> Result<LoanView> {
        let loan = self.require_loan(loan_id)?;
        let schedule = self.store.list_installments(loan_id)?;
        let repayments = self.store.list_received_repayments(loan_id)?;
        Ok(LoanView::new(&loan, &schedule, &repayments))
    }

    /// get events
    pub fn take_events(&self) -> Vec<Event> {
        self.events
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take_events()
    }

    fn emit(&self, events: impl IntoIterator<Item = Event>) {
        self.events
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .extend(events);
    }

    fn require_loan(&self, loan_id: LoanId) -> Result<Loan> {
        self.store
            .load_loan(loan_id)?
            .ok_or(LoanError::LoanNotFound { id: loan_id })
    }

    fn validate_terms(&self, terms: u32) -> Result<()> {
        if terms == 0 || terms > self.config.max_terms {
            return Err(LoanError::InvalidTerms {
                terms,
                max: self.config.max_terms,
            });
        }
        Ok(())
    }

    fn validate_currency(&self, currency: &CurrencyCode) -> Result<()> {
        if !self.config.accepts_currency(currency) {
            return Err(LoanError::UnsupportedCurrency {
                currency: currency.clone(),
            });
        }
        Ok(())
    }
}

fn validate_amount(amount: Money) -> Result<()> {
    if !amount.is_positive() {
        return Err(LoanError::InvalidAmount { amount });
    }
    Ok(())
}

/// run the waterfall then the loan balance update, both in memory
fn allocate_and_settle(
    loan: &Loan,
    due: &[ScheduledRepayment],
    amount: Money,
    now: DateTime<Utc>,
) -> Result<(Allocation, BalanceUpdate)> {
    if loan.is_repaid() {
        return Err(LoanError::OverpaymentUnallocated {
            loan_id: loan.id,
            unallocated: amount,
        });
    }
    let allocation = RepaymentAllocator::allocate(loan.id, due, amount, now)?;
    let balance = LoanBalanceUpdater::apply_payment(loan, allocation.total_applied(), now)?;
    Ok((allocation, balance))
}

fn repayment_events(
    received: &ReceivedRepayment,
    allocation: &Allocation,
    balance: &BalanceUpdate,
    now: DateTime<Utc>,
) -> Vec<Event> {
    let mut events = vec![Event::RepaymentReceived {
        loan_id: received.loan_id,
        repayment_id: received.id,
        amount: received.amount,
        currency_code: received.currency_code.clone(),
        received_at: received.received_at,
        outstanding_after: balance.loan.outstanding_amount,
    }];

    events.extend(allocation.steps.iter().map(|step| Event::InstallmentPaid {
        loan_id: received.loan_id,
        installment_id: step.installment_id,
        installment_number: step.installment_number,
        applied: step.applied,
        outstanding: step.outstanding,
        previous_status: step.previous_status,
        new_status: step.status,
        timestamp: now,
    }));

    if balance.settled() {
        events.push(Event::LoanRepaid {
            loan_id: received.loan_id,
            final_payment: received.amount,
            timestamp: now,
        });
    }

    events
}
