//! In-memory loan store
//!
//! Reference implementation of the `LoanStore` trait backed by a HashMap,
//! used by the replay CLI and the test suite. Every record carries a version
//! token that `save` compares before committing, so concurrent writers with
//! a stale token get an explicit conflict instead of a lost update.

use crate::core::traits::{LoanStore, StoreError, VersionToken};
use crate::types::{Loan, LoanState};
use std::collections::HashMap;

/// HashMap-backed loan store with optimistic versioning
#[derive(Debug, Default)]
pub struct MemoryLoanStore {
    loans: HashMap<String, (Loan, VersionToken)>,
}

impl MemoryLoanStore {
    /// Create an empty store
    pub fn new() -> Self {
        MemoryLoanStore {
            loans: HashMap::new(),
        }
    }

    /// Number of stored loans
    pub fn len(&self) -> usize {
        self.loans.len()
    }

    /// Whether the store holds no loans
    pub fn is_empty(&self) -> bool {
        self.loans.is_empty()
    }

    /// Snapshot of all loans, sorted by pid for deterministic output
    pub fn all_loans(&self) -> Vec<Loan> {
        let mut loans: Vec<Loan> = self.loans.values().map(|(loan, _)| loan.clone()).collect();
        loans.sort_by(|a, b| a.pid.cmp(&b.pid));
        loans
    }
}

impl LoanStore for MemoryLoanStore {
    fn create(&mut self, loan: &Loan) -> Result<VersionToken, StoreError> {
        if self.loans.contains_key(&loan.pid) {
            return Err(StoreError::AlreadyExists {
                loan_pid: loan.pid.clone(),
            });
        }
        self.loans.insert(loan.pid.clone(), (loan.clone(), 1));
        Ok(1)
    }

    fn load(&self, loan_pid: &str) -> Result<(Loan, VersionToken), StoreError> {
        self.loans
            .get(loan_pid)
            .map(|(loan, version)| (loan.clone(), *version))
            .ok_or_else(|| StoreError::NotFound {
                loan_pid: loan_pid.to_string(),
            })
    }

    fn save(&mut self, loan: &Loan, expected: VersionToken) -> Result<VersionToken, StoreError> {
        let entry = self
            .loans
            .get_mut(&loan.pid)
            .ok_or_else(|| StoreError::NotFound {
                loan_pid: loan.pid.clone(),
            })?;

        let current = entry.1;
        if current != expected {
            return Err(StoreError::Conflict {
                loan_pid: loan.pid.clone(),
                expected,
                actual: current,
            });
        }

        let next = current + 1;
        *entry = (loan.clone(), next);
        Ok(next)
    }

    fn pending_loans_for_document(&self, document_pid: &str) -> Result<Vec<Loan>, StoreError> {
        let mut pending: Vec<Loan> = self
            .loans
            .values()
            .map(|(loan, _)| loan)
            .filter(|loan| loan.state == LoanState::Pending && loan.document_pid == document_pid)
            .cloned()
            .collect();

        // Oldest request first; pid as tie-breaker for determinism.
        pending.sort_by(|a, b| {
            a.request_date
                .cmp(&b.request_date)
                .then_with(|| a.pid.cmp(&b.pid))
        });
        Ok(pending)
    }

    fn active_loan_for_item(&self, item_pid: &str) -> Result<Option<Loan>, StoreError> {
        let mut active = self.loans.values().map(|(loan, _)| loan).filter(|loan| {
            loan.state.is_active() && loan.item_pid.as_deref() == Some(item_pid)
        });

        let first = active.next().cloned();
        if first.is_some() && active.next().is_some() {
            return Err(StoreError::MultipleActiveLoans {
                item_pid: item_pid.to_string(),
            });
        }
        Ok(first)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    fn pending_loan(pid: &str, document_pid: &str, request_hour: u32) -> Loan {
        let mut loan = Loan::new(pid, "patron-1", document_pid, LoanState::Pending);
        loan.request_date = Some(Utc.with_ymd_and_hms(2024, 3, 1, request_hour, 0, 0).unwrap());
        loan
    }

    #[test]
    fn test_create_and_load() {
        let mut store = MemoryLoanStore::new();
        let loan = Loan::new("loan-1", "patron-1", "doc-1", LoanState::Pending);

        let version = store.create(&loan).unwrap();
        assert_eq!(version, 1);

        let (loaded, loaded_version) = store.load("loan-1").unwrap();
        assert_eq!(loaded, loan);
        assert_eq!(loaded_version, 1);
    }

    #[test]
    fn test_create_rejects_duplicate_pid() {
        let mut store = MemoryLoanStore::new();
        let loan = Loan::new("loan-1", "patron-1", "doc-1", LoanState::Pending);

        store.create(&loan).unwrap();
        let result = store.create(&loan);
        assert!(matches!(result, Err(StoreError::AlreadyExists { .. })));
    }

    #[test]
    fn test_load_missing_loan() {
        let store = MemoryLoanStore::new();
        let result = store.load("ghost");
        assert!(matches!(result, Err(StoreError::NotFound { .. })));
    }

    #[test]
    fn test_save_bumps_version() {
        let mut store = MemoryLoanStore::new();
        let mut loan = Loan::new("loan-1", "patron-1", "doc-1", LoanState::Pending);
        let v1 = store.create(&loan).unwrap();

        loan.state = LoanState::ItemOnLoan;
        let v2 = store.save(&loan, v1).unwrap();
        assert_eq!(v2, v1 + 1);

        let (loaded, version) = store.load("loan-1").unwrap();
        assert_eq!(loaded.state, LoanState::ItemOnLoan);
        assert_eq!(version, v2);
    }

    #[test]
    fn test_save_with_stale_token_conflicts() {
        let mut store = MemoryLoanStore::new();
        let mut loan = Loan::new("loan-1", "patron-1", "doc-1", LoanState::Pending);
        let v1 = store.create(&loan).unwrap();

        loan.state = LoanState::ItemOnLoan;
        store.save(&loan, v1).unwrap();

        // A second writer still holding v1 must lose.
        loan.state = LoanState::Cancelled;
        let result = store.save(&loan, v1);
        assert!(matches!(result, Err(StoreError::Conflict { .. })));

        // The first write is what remains visible.
        let (loaded, _) = store.load("loan-1").unwrap();
        assert_eq!(loaded.state, LoanState::ItemOnLoan);
    }

    #[test]
    fn test_pending_loans_ordered_by_request_date() {
        let mut store = MemoryLoanStore::new();
        store.create(&pending_loan("loan-b", "doc-1", 10)).unwrap();
        store.create(&pending_loan("loan-a", "doc-1", 12)).unwrap();
        store.create(&pending_loan("loan-c", "doc-2", 8)).unwrap();

        let pending = store.pending_loans_for_document("doc-1").unwrap();
        let pids: Vec<&str> = pending.iter().map(|l| l.pid.as_str()).collect();
        assert_eq!(pids, vec!["loan-b", "loan-a"]);
    }

    #[test]
    fn test_active_loan_for_item() {
        let mut store = MemoryLoanStore::new();
        let mut on_loan = Loan::new("loan-1", "patron-1", "doc-1", LoanState::ItemOnLoan);
        on_loan.item_pid = Some("item-1".to_string());
        store.create(&on_loan).unwrap();

        let mut returned = Loan::new("loan-2", "patron-2", "doc-1", LoanState::ItemReturned);
        returned.item_pid = Some("item-1".to_string());
        store.create(&returned).unwrap();

        let active = store.active_loan_for_item("item-1").unwrap();
        assert_eq!(active.unwrap().pid, "loan-1");

        assert!(store.active_loan_for_item("item-9").unwrap().is_none());
    }

    #[test]
    fn test_two_active_loans_on_item_is_reported() {
        let mut store = MemoryLoanStore::new();
        for pid in ["loan-1", "loan-2"] {
            let mut loan = Loan::new(pid, "patron-1", "doc-1", LoanState::ItemOnLoan);
            loan.item_pid = Some("item-1".to_string());
            store.create(&loan).unwrap();
        }

        let result = store.active_loan_for_item("item-1");
        assert!(matches!(
            result,
            Err(StoreError::MultipleActiveLoans { .. })
        ));
    }

    #[test]
    fn test_all_loans_sorted_by_pid() {
        let mut store = MemoryLoanStore::new();
        for pid in ["loan-c", "loan-a", "loan-b"] {
            store
                .create(&Loan::new(pid, "patron-1", "doc-1", LoanState::Pending))
                .unwrap();
        }

        let pids: Vec<String> = store.all_loans().into_iter().map(|l| l.pid).collect();
        assert_eq!(pids, vec!["loan-a", "loan-b", "loan-c"]);
    }
}
