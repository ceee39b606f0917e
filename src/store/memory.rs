use std::collections::{HashMap, HashSet};
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use uuid::Uuid;

use crate::entities::{Loan, ReceivedRepayment, ScheduledRepayment};
use crate::money::Money;
use crate::types::{LoanId, ScheduledRepaymentId};

use super::{Change, ChangeSet, LoanStore, StoreError, StoreResult};

#[derive(Debug, Default)]
struct Tables {
    loans: HashMap<LoanId, Loan>,
    installments: HashMap<ScheduledRepaymentId, ScheduledRepayment>,
    received: Vec<ReceivedRepayment>,
}

/// loan store kept in process memory
///
/// a commit checks the whole change set under the write lock before applying
/// any of it, so readers never observe half a unit of work.
#[derive(Debug, Default)]
pub struct InMemoryLoanStore {
    tables: RwLock<Tables>,
}

impl InMemoryLoanStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn loan_count(&self) -> StoreResult<usize> {
        Ok(self.read()?.loans.len())
    }

    pub fn received_repayment_count(&self) -> StoreResult<usize> {
        Ok(self.read()?.received.len())
    }

    fn read(&self) -> StoreResult<RwLockReadGuard<'_, Tables>> {
        self.tables.read().map_err(|_| StoreError::Unavailable {
            message: "loan tables lock poisoned".to_string(),
        })
    }

    fn write(&self) -> StoreResult<RwLockWriteGuard<'_, Tables>> {
        self.tables.write().map_err(|_| StoreError::Unavailable {
            message: "loan tables lock poisoned".to_string(),
        })
    }

    fn sorted_installments<F>(&self, loan_id: LoanId, keep: F) -> StoreResult<Vec<ScheduledRepayment>>
    where
        F: Fn(&ScheduledRepayment) -> bool,
    {
        let tables = self.read()?;
        let mut installments: Vec<ScheduledRepayment> = tables
            .installments
            .values()
            .filter(|i| i.loan_id == loan_id && keep(i))
            .cloned()
            .collect();
        installments.sort_by_key(|i| (i.due_date, i.installment_number));
        Ok(installments)
    }
}

impl LoanStore for InMemoryLoanStore {
    fn load_loan(&self, id: LoanId) -> StoreResult<Option<Loan>> {
        Ok(self.read()?.loans.get(&id).cloned())
    }

    fn load_installment(&self, id: ScheduledRepaymentId) -> StoreResult<Option<ScheduledRepayment>> {
        Ok(self.read()?.installments.get(&id).cloned())
    }

    fn list_due_installments(&self, loan_id: LoanId) -> StoreResult<Vec<ScheduledRepayment>> {
        self.sorted_installments(loan_id, |i| i.is_open())
    }

    fn list_installments(&self, loan_id: LoanId) -> StoreResult<Vec<ScheduledRepayment>> {
        self.sorted_installments(loan_id, |_| true)
    }

    fn list_received_repayments(&self, loan_id: LoanId) -> StoreResult<Vec<ReceivedRepayment>> {
        Ok(self
            .read()?
            .received
            .iter()
            .filter(|r| r.loan_id == loan_id)
            .cloned()
            .collect())
    }

    fn commit(&self, changes: ChangeSet) -> StoreResult<()> {
        let mut tables = self.write()?;
        validate(&tables, &changes)?;

        for change in changes {
            match change {
                Change::InsertLoan(loan) => {
                    tables.loans.insert(loan.id, loan);
                }
                Change::InsertInstallment(installment) => {
                    tables.installments.insert(installment.id, installment);
                }
                Change::InsertReceivedRepayment(repayment) => {
                    tables.received.push(repayment);
                }
                Change::UpdateLoan(update) => {
                    if let Some(loan) = tables.loans.get_mut(&update.id) {
                        loan.outstanding_amount = update.outstanding_amount;
                        loan.status = update.status;
                        loan.updated_at = update.updated_at;
                    }
                }
                Change::UpdateInstallment(update) => {
                    if let Some(installment) = tables.installments.get_mut(&update.id) {
                        installment.outstanding_amount = update.outstanding_amount;
                        installment.status = update.status;
                        installment.updated_at = update.updated_at;
                    }
                }
            }
        }

        Ok(())
    }
}

/// reject the change set if any write would collide, miss its target or
/// start from a balance the stored row no longer has
fn validate(tables: &Tables, changes: &ChangeSet) -> StoreResult<()> {
    // balances as they stand part way through the change set
    let mut loan_balances: HashMap<Uuid, Money> = HashMap::new();
    let mut installment_balances: HashMap<Uuid, Money> = HashMap::new();
    let mut pending_received: HashSet<Uuid> = HashSet::new();

    let loan_balance = |id: &Uuid, pending: &HashMap<Uuid, Money>| {
        pending
            .get(id)
            .copied()
            .or_else(|| tables.loans.get(id).map(|l| l.outstanding_amount))
    };
    let installment_balance = |id: &Uuid, pending: &HashMap<Uuid, Money>| {
        pending
            .get(id)
            .copied()
            .or_else(|| tables.installments.get(id).map(|i| i.outstanding_amount))
    };

    for change in changes.changes() {
        match change {
            Change::InsertLoan(loan) => {
                if loan_balance(&loan.id, &loan_balances).is_some() {
                    return Err(StoreError::Conflict { entity: "loan", id: loan.id });
                }
                loan_balances.insert(loan.id, loan.outstanding_amount);
            }
            Change::InsertInstallment(installment) => {
                if installment_balance(&installment.id, &installment_balances).is_some() {
                    return Err(StoreError::Conflict {
                        entity: "scheduled repayment",
                        id: installment.id,
                    });
                }
                if loan_balance(&installment.loan_id, &loan_balances).is_none() {
                    return Err(StoreError::MissingRow {
                        entity: "loan",
                        id: installment.loan_id,
                    });
                }
                installment_balances.insert(installment.id, installment.outstanding_amount);
            }
            Change::InsertReceivedRepayment(repayment) => {
                if tables.received.iter().any(|r| r.id == repayment.id)
                    || pending_received.contains(&repayment.id)
                {
                    return Err(StoreError::Conflict {
                        entity: "received repayment",
                        id: repayment.id,
                    });
                }
                if loan_balance(&repayment.loan_id, &loan_balances).is_none() {
                    return Err(StoreError::MissingRow {
                        entity: "loan",
                        id: repayment.loan_id,
                    });
                }
                pending_received.insert(repayment.id);
            }
            Change::UpdateLoan(update) => match loan_balance(&update.id, &loan_balances) {
                None => return Err(StoreError::MissingRow { entity: "loan", id: update.id }),
                Some(current) if current != update.previous_outstanding => {
                    return Err(StoreError::Conflict { entity: "loan", id: update.id });
                }
                Some(_) => {
                    loan_balances.insert(update.id, update.outstanding_amount);
                }
            },
            Change::UpdateInstallment(update) => {
                match installment_balance(&update.id, &installment_balances) {
                    None => {
                        return Err(StoreError::MissingRow {
                            entity: "scheduled repayment",
                            id: update.id,
                        })
                    }
                    Some(current) if current != update.previous_outstanding => {
                        return Err(StoreError::Conflict {
                            entity: "scheduled repayment",
                            id: update.id,
                        });
                    }
                    Some(_) => {
                        installment_balances.insert(update.id, update.outstanding_amount);
                    }
                }
            }
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::payments::RepaymentSchedule;
    use crate::store::{InstallmentUpdate, LoanUpdate};
    use crate::types::{CurrencyCode, LoanStatus, RepaymentStatus};
    use chrono::{TimeZone, Utc};

    fn seeded_store() -> (InMemoryLoanStore, Loan, Vec<ScheduledRepayment>) {
        let now = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        let loan = Loan::new("user-1".to_string(), Money::from_minor(300), CurrencyCode::sgd(), 3, now, now);
        let installments = RepaymentSchedule::generate(&loan).unwrap().into_installments();

        let store = InMemoryLoanStore::new();
        let mut changes = ChangeSet::new();
        changes.insert_loan(loan.clone());
        changes.insert_installments(installments.clone());
        store.commit(changes).unwrap();

        (store, loan, installments)
    }

    fn paid(installment: &ScheduledRepayment, amount: i64, now: chrono::DateTime<Utc>) -> InstallmentUpdate {
        let after = installment.with_payment(Money::from_minor(amount), now).unwrap();
        InstallmentUpdate::from_payment(installment.outstanding_amount, &after)
    }

    #[test]
    fn test_commit_and_read_back() {
        let (store, loan, installments) = seeded_store();

        assert_eq!(store.load_loan(loan.id).unwrap(), Some(loan.clone()));
        assert_eq!(store.list_installments(loan.id).unwrap(), installments);
        assert_eq!(store.list_due_installments(loan.id).unwrap().len(), 3);
        assert_eq!(
            store.load_installment(installments[1].id).unwrap(),
            Some(installments[1].clone())
        );
        assert!(store.load_loan(Uuid::new_v4()).unwrap().is_none());
        assert_eq!(store.loan_count().unwrap(), 1);
    }

    #[test]
    fn test_due_listing_excludes_repaid_and_sorts() {
        let (store, loan, installments) = seeded_store();
        let now = Utc.with_ymd_and_hms(2024, 2, 1, 0, 0, 0).unwrap();

        let mut changes = ChangeSet::new();
        changes.update_installment(paid(&installments[0], 100, now));
        changes.update_installment(paid(&installments[1], 30, now));
        store.commit(changes).unwrap();

        let due = store.list_due_installments(loan.id).unwrap();
        let summary: Vec<(u32, RepaymentStatus)> = due.iter().map(|i| (i.installment_number, i.status)).collect();
        assert_eq!(summary, vec![(2, RepaymentStatus::Partial), (3, RepaymentStatus::Due)]);
    }

    #[test]
    fn test_failed_commit_writes_nothing() {
        let (store, loan, installments) = seeded_store();
        let now = Utc.with_ymd_and_hms(2024, 2, 1, 0, 0, 0).unwrap();

        let mut changes = ChangeSet::new();
        changes.insert_received_repayment(ReceivedRepayment::new(
            loan.id,
            Money::from_minor(100),
            CurrencyCode::sgd(),
            now,
            now,
        ));
        changes.update_installment(paid(&installments[0], 100, now));
        changes.update_loan(LoanUpdate {
            id: Uuid::new_v4(),
            previous_outstanding: Money::from_minor(300),
            outstanding_amount: Money::from_minor(200),
            status: LoanStatus::Due,
            updated_at: now,
        });

        let err = store.commit(changes).unwrap_err();
        assert!(matches!(err, StoreError::MissingRow { entity: "loan", .. }));

        assert_eq!(store.received_repayment_count().unwrap(), 0);
        assert_eq!(store.list_installments(loan.id).unwrap(), installments);
        assert_eq!(store.load_loan(loan.id).unwrap(), Some(loan));
    }

    #[test]
    fn test_duplicate_insert_conflicts() {
        let (store, loan, _) = seeded_store();

        let mut changes = ChangeSet::new();
        changes.insert_loan(loan.clone());
        let err = store.commit(changes).unwrap_err();

        assert_eq!(err, StoreError::Conflict { entity: "loan", id: loan.id });
    }

    #[test]
    fn test_orphan_installment_rejected() {
        let store = InMemoryLoanStore::new();
        let now = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        let loan = Loan::new("user-1".to_string(), Money::from_minor(100), CurrencyCode::sgd(), 1, now, now);
        let installments = RepaymentSchedule::generate(&loan).unwrap().into_installments();

        let mut changes = ChangeSet::new();
        changes.insert_installments(installments);
        let err = store.commit(changes).unwrap_err();

        assert_eq!(err, StoreError::MissingRow { entity: "loan", id: loan.id });
        assert_eq!(store.loan_count().unwrap(), 0);
    }

    #[test]
    fn test_stale_loan_update_conflicts() {
        let (store, loan, installments) = seeded_store();
        let now = Utc.with_ymd_and_hms(2024, 2, 1, 0, 0, 0).unwrap();

        // two writers both read the loan at 300 and each pay 50
        let mut after = loan.clone();
        after.outstanding_amount = Money::from_minor(250);
        after.updated_at = now;

        let mut first = ChangeSet::new();
        first.update_installment(paid(&installments[0], 50, now));
        first.update_loan(LoanUpdate::from_payment(loan.outstanding_amount, &after));
        let mut second = first.clone();
        second.insert_received_repayment(ReceivedRepayment::new(
            loan.id,
            Money::from_minor(50),
            CurrencyCode::sgd(),
            now,
            now,
        ));

        store.commit(first).unwrap();
        let err = store.commit(second).unwrap_err();

        assert_eq!(
            err,
            StoreError::Conflict {
                entity: "scheduled repayment",
                id: installments[0].id,
            }
        );
        assert_eq!(store.received_repayment_count().unwrap(), 0);
        assert_eq!(
            store.load_loan(loan.id).unwrap().unwrap().outstanding_amount,
            Money::from_minor(250)
        );
    }

    #[test]
    fn test_stale_loan_balance_conflicts() {
        let (store, loan, _) = seeded_store();
        let now = Utc.with_ymd_and_hms(2024, 2, 1, 0, 0, 0).unwrap();
        let mut after = loan.clone();
        after.outstanding_amount = Money::from_minor(200);
        after.updated_at = now;

        let mut changes = ChangeSet::new();
        changes.update_loan(LoanUpdate::from_payment(Money::from_minor(290), &after));
        let err = store.commit(changes).unwrap_err();

        assert_eq!(err, StoreError::Conflict { entity: "loan", id: loan.id });
        assert_eq!(store.load_loan(loan.id).unwrap(), Some(loan));
    }

    #[test]
    fn test_chained_updates_in_one_commit() {
        let (store, loan, installments) = seeded_store();
        let now = Utc.with_ymd_and_hms(2024, 2, 1, 0, 0, 0).unwrap();
        let part = installments[0].with_payment(Money::from_minor(40), now).unwrap();

        let mut changes = ChangeSet::new();
        changes.update_installment(paid(&installments[0], 40, now));
        changes.update_installment(paid(&part, 60, now));
        store.commit(changes).unwrap();

        let stored = store.load_installment(installments[0].id).unwrap().unwrap();
        assert_eq!(stored.outstanding_amount, Money::ZERO);
        assert_eq!(stored.status, RepaymentStatus::Repaid);
        assert_eq!(store.list_due_installments(loan.id).unwrap().len(), 2);
    }
}
