//! Loan management service
//!
//! Owns the lending rules: who may borrow, how many copies, renewals,
//! returns and late fines. All persistence goes through the store traits
//! so the rules can be exercised against test doubles.

use std::collections::HashSet;
use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use rust_decimal::Decimal;

use crate::{
    config::LoanPolicy,
    error::{AppError, AppResult},
    models::{
        copy::CopyStatus,
        fine::NewFine,
        loan::{LineStatus, Loan, LoanStatus, NewLoan},
        patron::PatronStatus,
    },
    repository::{CopyRegistry, FineLedger, LoanStore, PatronStore},
};

#[derive(Clone)]
pub struct LoansService {
    patrons: Arc<dyn PatronStore>,
    copies: Arc<dyn CopyRegistry>,
    loans: Arc<dyn LoanStore>,
    fines: Arc<dyn FineLedger>,
    policy: LoanPolicy,
}

impl LoansService {
    pub fn new(
        patrons: Arc<dyn PatronStore>,
        copies: Arc<dyn CopyRegistry>,
        loans: Arc<dyn LoanStore>,
        fines: Arc<dyn FineLedger>,
        policy: LoanPolicy,
    ) -> Self {
        Self {
            patrons,
            copies,
            loans,
            fines,
            policy,
        }
    }

    /// Create a new loan for a patron over one or more copies.
    ///
    /// Checks, in order: the copy list is sane, the patron exists and is
    /// active, has no unpaid fine, is under the active-loan cap, and every
    /// requested copy exists and is available. Nothing is written until
    /// every check has passed; the store then persists the loan, its lines
    /// and the copy flips in one transaction.
    pub async fn create_loan(&self, patron_id: i32, copy_ids: &[i32]) -> AppResult<Loan> {
        if copy_ids.is_empty() {
            return Err(AppError::Validation(
                "At least one copy is required".to_string(),
            ));
        }

        let mut seen = HashSet::new();
        for &copy_id in copy_ids {
            if !seen.insert(copy_id) {
                return Err(AppError::Validation(format!(
                    "Copy {} requested more than once in the same loan",
                    copy_id
                )));
            }
        }

        let patron = self
            .patrons
            .find_by_id(patron_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Patron with id {} not found", patron_id)))?;

        if patron.status() != PatronStatus::Active {
            return Err(AppError::Ineligible(format!(
                "Patron {} is not active",
                patron_id
            )));
        }

        if self.fines.has_active_fine(patron_id).await? {
            return Err(AppError::Ineligible(format!(
                "Patron {} has an unpaid fine",
                patron_id
            )));
        }

        let active = self.loans.count_active_for_patron(patron_id).await?;
        if active >= self.policy.max_active_loans {
            return Err(AppError::LimitExceeded(format!(
                "Patron {} already has {} active loan(s)",
                patron_id, active
            )));
        }

        for &copy_id in copy_ids {
            let copy = self
                .copies
                .find_by_id(copy_id)
                .await?
                .ok_or_else(|| AppError::NotFound(format!("Copy with id {} not found", copy_id)))?;

            if copy.status() != CopyStatus::Available {
                return Err(AppError::Unavailable(format!(
                    "Copy {} is not available ({})",
                    copy_id,
                    copy.status()
                )));
            }
        }

        let now = Utc::now();
        let loan = self
            .loans
            .create(NewLoan {
                patron_id,
                copy_ids: copy_ids.to_vec(),
                loan_date: now,
                due_date: now + Duration::days(self.policy.loan_period_days),
            })
            .await?;

        tracing::info!(
            "Loan {} created for patron {} ({} copies, due {})",
            loan.id,
            patron_id,
            copy_ids.len(),
            loan.due_date
        );

        Ok(loan)
    }

    /// Renew an active loan.
    ///
    /// The due date is extended by one loan period from its current value,
    /// not from today. Renewal count is capped; proximity to the due date
    /// is deliberately not checked.
    pub async fn renew_loan(&self, loan_id: i32) -> AppResult<Loan> {
        let loan = self
            .loans
            .find_by_id(loan_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Loan with id {} not found", loan_id)))?;

        if loan.status() != LoanStatus::Active {
            return Err(AppError::Ineligible(format!(
                "Loan {} was already returned",
                loan_id
            )));
        }

        let renewals = self.loans.count_renewals(loan_id).await?;
        if renewals >= self.policy.max_renewals {
            return Err(AppError::LimitExceeded(format!(
                "Loan {} was already renewed {} time(s)",
                loan_id, renewals
            )));
        }

        let due_date = loan.due_date + Duration::days(self.policy.loan_period_days);
        let renewed = self.loans.renew(loan_id, due_date).await?;

        tracing::info!("Loan {} renewed until {}", loan_id, renewed.due_date);

        Ok(renewed)
    }

    /// Register the return of a loan.
    ///
    /// Every line still out is closed and its copy made available again,
    /// then the loan itself is closed. A return after the due date issues
    /// exactly one fine for the whole loan, however many copies it covers.
    pub async fn return_loan(&self, loan_id: i32, returned_at: DateTime<Utc>) -> AppResult<Loan> {
        let loan = self
            .loans
            .find_by_id(loan_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Loan with id {} not found", loan_id)))?;

        if loan.status() != LoanStatus::Active {
            return Err(AppError::Ineligible(format!(
                "Loan {} was already returned",
                loan_id
            )));
        }

        for line in &loan.lines {
            if line.status() != LineStatus::Loaned {
                continue;
            }
            self.loans.mark_line_returned(line.id, returned_at).await?;
            self.copies
                .set_status(line.copy_id, CopyStatus::Available)
                .await?;
        }

        let returned = self.loans.mark_returned(loan_id, returned_at).await?;

        if returned_at > loan.due_date {
            let fine = self
                .fines
                .create(NewFine {
                    patron_id: loan.patron_id,
                    loan_id,
                    amount: self.late_fine_amount(loan.due_date, returned_at),
                })
                .await?;
            tracing::info!(
                "Loan {} returned late, fine {} of {} issued for patron {}",
                loan_id,
                fine.id,
                fine.amount,
                loan.patron_id
            );
        } else {
            tracing::info!("Loan {} returned", loan_id);
        }

        Ok(returned)
    }

    /// Late fee: days overdue at the configured daily rate, charging at
    /// least one day for any late return
    fn late_fine_amount(&self, due_date: DateTime<Utc>, returned_at: DateTime<Utc>) -> Decimal {
        let days_late = (returned_at - due_date).num_days().max(1);
        Decimal::from(days_late) * self.policy.fine_per_day
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{
        copy::Copy,
        fine::Fine,
        loan::LoanLine,
        patron::{Patron, PatronStatus},
    };
    use crate::repository::{MockCopyRegistry, MockFineLedger, MockLoanStore, MockPatronStore};
    use mockall::predicate::*;

    fn patron(id: i32, status: PatronStatus) -> Patron {
        Patron {
            id,
            first_name: "Juan".to_string(),
            last_name: "García López".to_string(),
            national_id: "12345678A".to_string(),
            address: None,
            phone: None,
            email: None,
            patron_type: 0,
            status: status.into(),
            registered_date: Utc::now(),
        }
    }

    fn copy(id: i32, status: CopyStatus) -> Copy {
        Copy {
            id,
            book_id: 1,
            barcode: format!("CPY-{:06}", id),
            shelf_location: None,
            status: status.into(),
            acquired_date: Utc::now(),
        }
    }

    fn loan_with_lines(id: i32, due_date: DateTime<Utc>, line_statuses: &[LineStatus]) -> Loan {
        let lines = line_statuses
            .iter()
            .enumerate()
            .map(|(i, &status)| LoanLine {
                id: (i + 1) as i32 * 10,
                loan_id: id,
                copy_id: (i + 1) as i32,
                status: status.into(),
                returned_date: None,
            })
            .collect();

        Loan {
            id,
            patron_id: 1,
            loan_date: due_date - Duration::days(15),
            due_date,
            nb_renewals: 0,
            renewed_date: None,
            status: LoanStatus::Active.into(),
            returned_date: None,
            lines,
        }
    }

    fn service(
        patrons: MockPatronStore,
        copies: MockCopyRegistry,
        loans: MockLoanStore,
        fines: MockFineLedger,
    ) -> LoansService {
        LoansService::new(
            Arc::new(patrons),
            Arc::new(copies),
            Arc::new(loans),
            Arc::new(fines),
            LoanPolicy::default(),
        )
    }

    // ------------------------------------------------------------------
    // create_loan
    // ------------------------------------------------------------------

    #[tokio::test]
    async fn create_loan_succeeds_for_eligible_patron() {
        let mut patrons = MockPatronStore::new();
        let mut copies = MockCopyRegistry::new();
        let mut loans = MockLoanStore::new();
        let mut fines = MockFineLedger::new();

        patrons
            .expect_find_by_id()
            .with(eq(1))
            .returning(|_| Ok(Some(patron(1, PatronStatus::Active))));
        fines
            .expect_has_active_fine()
            .with(eq(1))
            .returning(|_| Ok(false));
        loans
            .expect_count_active_for_patron()
            .with(eq(1))
            .returning(|_| Ok(0));
        copies
            .expect_find_by_id()
            .with(eq(1))
            .returning(|_| Ok(Some(copy(1, CopyStatus::Available))));
        copies
            .expect_find_by_id()
            .with(eq(2))
            .returning(|_| Ok(Some(copy(2, CopyStatus::Available))));
        loans
            .expect_create()
            .withf(|new: &NewLoan| {
                new.patron_id == 1
                    && new.copy_ids == vec![1, 2]
                    && new.due_date - new.loan_date == Duration::days(15)
            })
            .returning(|new| {
                let mut loan =
                    loan_with_lines(7, new.due_date, &[LineStatus::Loaned, LineStatus::Loaned]);
                loan.loan_date = new.loan_date;
                Ok(loan)
            });

        let svc = service(patrons, copies, loans, fines);
        let loan = svc.create_loan(1, &[1, 2]).await.unwrap();

        assert_eq!(loan.id, 7);
        assert_eq!(loan.status(), LoanStatus::Active);
        assert_eq!(loan.lines.len(), 2);
        assert_eq!(loan.due_date - loan.loan_date, Duration::days(15));
    }

    #[tokio::test]
    async fn create_loan_fails_for_unknown_patron() {
        let mut patrons = MockPatronStore::new();
        patrons
            .expect_find_by_id()
            .with(eq(999))
            .returning(|_| Ok(None));

        // No further store is touched and nothing is written
        let svc = service(
            patrons,
            MockCopyRegistry::new(),
            MockLoanStore::new(),
            MockFineLedger::new(),
        );
        let err = svc.create_loan(999, &[1]).await.unwrap_err();

        assert!(matches!(err, AppError::NotFound(_)));
    }

    #[tokio::test]
    async fn create_loan_fails_for_inactive_patron() {
        let mut patrons = MockPatronStore::new();
        patrons
            .expect_find_by_id()
            .with(eq(1))
            .returning(|_| Ok(Some(patron(1, PatronStatus::Inactive))));

        let svc = service(
            patrons,
            MockCopyRegistry::new(),
            MockLoanStore::new(),
            MockFineLedger::new(),
        );
        let err = svc.create_loan(1, &[1]).await.unwrap_err();

        assert!(matches!(err, AppError::Ineligible(_)));
    }

    #[tokio::test]
    async fn create_loan_fails_for_blocked_patron() {
        let mut patrons = MockPatronStore::new();
        patrons
            .expect_find_by_id()
            .with(eq(1))
            .returning(|_| Ok(Some(patron(1, PatronStatus::Blocked))));

        let svc = service(
            patrons,
            MockCopyRegistry::new(),
            MockLoanStore::new(),
            MockFineLedger::new(),
        );
        let err = svc.create_loan(1, &[1]).await.unwrap_err();

        assert!(matches!(err, AppError::Ineligible(_)));
    }

    #[tokio::test]
    async fn create_loan_fails_when_patron_has_unpaid_fine() {
        let mut patrons = MockPatronStore::new();
        let mut fines = MockFineLedger::new();

        patrons
            .expect_find_by_id()
            .with(eq(1))
            .returning(|_| Ok(Some(patron(1, PatronStatus::Active))));
        fines
            .expect_has_active_fine()
            .with(eq(1))
            .returning(|_| Ok(true));

        let svc = service(patrons, MockCopyRegistry::new(), MockLoanStore::new(), fines);
        let err = svc.create_loan(1, &[1]).await.unwrap_err();

        assert!(matches!(err, AppError::Ineligible(_)));
    }

    #[tokio::test]
    async fn create_loan_fails_at_active_loan_cap() {
        let mut patrons = MockPatronStore::new();
        let mut loans = MockLoanStore::new();
        let mut fines = MockFineLedger::new();

        patrons
            .expect_find_by_id()
            .with(eq(1))
            .returning(|_| Ok(Some(patron(1, PatronStatus::Active))));
        fines
            .expect_has_active_fine()
            .with(eq(1))
            .returning(|_| Ok(false));
        loans
            .expect_count_active_for_patron()
            .with(eq(1))
            .returning(|_| Ok(5));
        loans.expect_create().never();

        let svc = service(patrons, MockCopyRegistry::new(), loans, fines);
        let err = svc.create_loan(1, &[1]).await.unwrap_err();

        assert!(matches!(err, AppError::LimitExceeded(_)));
    }

    #[tokio::test]
    async fn create_loan_fails_when_copy_not_available() {
        let mut patrons = MockPatronStore::new();
        let mut copies = MockCopyRegistry::new();
        let mut loans = MockLoanStore::new();
        let mut fines = MockFineLedger::new();

        patrons
            .expect_find_by_id()
            .with(eq(1))
            .returning(|_| Ok(Some(patron(1, PatronStatus::Active))));
        fines
            .expect_has_active_fine()
            .with(eq(1))
            .returning(|_| Ok(false));
        loans
            .expect_count_active_for_patron()
            .with(eq(1))
            .returning(|_| Ok(0));
        copies
            .expect_find_by_id()
            .with(eq(1))
            .returning(|_| Ok(Some(copy(1, CopyStatus::Loaned))));
        loans.expect_create().never();

        let svc = service(patrons, copies, loans, fines);
        let err = svc.create_loan(1, &[1]).await.unwrap_err();

        assert!(matches!(err, AppError::Unavailable(_)));
    }

    #[tokio::test]
    async fn create_loan_fails_when_copy_in_repair() {
        let mut patrons = MockPatronStore::new();
        let mut copies = MockCopyRegistry::new();
        let mut loans = MockLoanStore::new();
        let mut fines = MockFineLedger::new();

        patrons
            .expect_find_by_id()
            .with(eq(1))
            .returning(|_| Ok(Some(patron(1, PatronStatus::Active))));
        fines
            .expect_has_active_fine()
            .with(eq(1))
            .returning(|_| Ok(false));
        loans
            .expect_count_active_for_patron()
            .with(eq(1))
            .returning(|_| Ok(0));
        copies
            .expect_find_by_id()
            .with(eq(1))
            .returning(|_| Ok(Some(copy(1, CopyStatus::InRepair))));
        loans.expect_create().never();

        let svc = service(patrons, copies, loans, fines);
        let err = svc.create_loan(1, &[1]).await.unwrap_err();

        assert!(matches!(err, AppError::Unavailable(_)));
    }

    #[tokio::test]
    async fn create_loan_fails_for_unknown_copy() {
        let mut patrons = MockPatronStore::new();
        let mut copies = MockCopyRegistry::new();
        let mut loans = MockLoanStore::new();
        let mut fines = MockFineLedger::new();

        patrons
            .expect_find_by_id()
            .with(eq(1))
            .returning(|_| Ok(Some(patron(1, PatronStatus::Active))));
        fines
            .expect_has_active_fine()
            .with(eq(1))
            .returning(|_| Ok(false));
        loans
            .expect_count_active_for_patron()
            .with(eq(1))
            .returning(|_| Ok(0));
        copies
            .expect_find_by_id()
            .with(eq(404))
            .returning(|_| Ok(None));
        loans.expect_create().never();

        let svc = service(patrons, copies, loans, fines);
        let err = svc.create_loan(1, &[404]).await.unwrap_err();

        assert!(matches!(err, AppError::NotFound(_)));
    }

    #[tokio::test]
    async fn create_loan_rejects_duplicate_copy_ids_up_front() {
        // No expectations at all: the request must be rejected before any
        // store is consulted
        let svc = service(
            MockPatronStore::new(),
            MockCopyRegistry::new(),
            MockLoanStore::new(),
            MockFineLedger::new(),
        );
        let err = svc.create_loan(1, &[1, 2, 1]).await.unwrap_err();

        assert!(matches!(err, AppError::Validation(_)));
    }

    #[tokio::test]
    async fn create_loan_rejects_empty_copy_list() {
        let svc = service(
            MockPatronStore::new(),
            MockCopyRegistry::new(),
            MockLoanStore::new(),
            MockFineLedger::new(),
        );
        let err = svc.create_loan(1, &[]).await.unwrap_err();

        assert!(matches!(err, AppError::Validation(_)));
    }

    // ------------------------------------------------------------------
    // renew_loan
    // ------------------------------------------------------------------

    #[tokio::test]
    async fn renew_loan_extends_from_current_due_date() {
        let due = Utc::now() + Duration::days(2);
        let expected = due + Duration::days(15);

        let mut loans = MockLoanStore::new();
        loans
            .expect_find_by_id()
            .with(eq(1))
            .returning(move |_| Ok(Some(loan_with_lines(1, due, &[LineStatus::Loaned]))));
        loans
            .expect_count_renewals()
            .with(eq(1))
            .returning(|_| Ok(0));
        loans
            .expect_renew()
            .with(eq(1), eq(expected))
            .returning(move |id, new_due| {
                let mut loan = loan_with_lines(id, new_due, &[LineStatus::Loaned]);
                loan.nb_renewals = 1;
                Ok(loan)
            });

        let svc = service(
            MockPatronStore::new(),
            MockCopyRegistry::new(),
            loans,
            MockFineLedger::new(),
        );
        let renewed = svc.renew_loan(1).await.unwrap();

        assert_eq!(renewed.due_date, expected);
        assert_eq!(renewed.nb_renewals, 1);
    }

    #[tokio::test]
    async fn renew_loan_fails_for_unknown_loan() {
        let mut loans = MockLoanStore::new();
        loans
            .expect_find_by_id()
            .with(eq(999))
            .returning(|_| Ok(None));

        let svc = service(
            MockPatronStore::new(),
            MockCopyRegistry::new(),
            loans,
            MockFineLedger::new(),
        );
        let err = svc.renew_loan(999).await.unwrap_err();

        assert!(matches!(err, AppError::NotFound(_)));
    }

    #[tokio::test]
    async fn renew_loan_fails_when_already_returned() {
        let mut loans = MockLoanStore::new();
        loans.expect_find_by_id().with(eq(1)).returning(|_| {
            let mut loan = loan_with_lines(1, Utc::now(), &[LineStatus::Returned]);
            loan.status = LoanStatus::Returned.into();
            Ok(Some(loan))
        });
        loans.expect_renew().never();

        let svc = service(
            MockPatronStore::new(),
            MockCopyRegistry::new(),
            loans,
            MockFineLedger::new(),
        );
        let err = svc.renew_loan(1).await.unwrap_err();

        assert!(matches!(err, AppError::Ineligible(_)));
    }

    #[tokio::test]
    async fn renew_loan_fails_at_renewal_cap() {
        let mut loans = MockLoanStore::new();
        loans
            .expect_find_by_id()
            .with(eq(1))
            .returning(|_| Ok(Some(loan_with_lines(1, Utc::now(), &[LineStatus::Loaned]))));
        loans
            .expect_count_renewals()
            .with(eq(1))
            .returning(|_| Ok(2));
        loans.expect_renew().never();

        let svc = service(
            MockPatronStore::new(),
            MockCopyRegistry::new(),
            loans,
            MockFineLedger::new(),
        );
        let err = svc.renew_loan(1).await.unwrap_err();

        assert!(matches!(err, AppError::LimitExceeded(_)));
    }

    // ------------------------------------------------------------------
    // return_loan
    // ------------------------------------------------------------------

    #[tokio::test]
    async fn return_on_time_closes_lines_and_creates_no_fine() {
        let due = Utc::now() + Duration::days(5);
        let returned_at = Utc::now();

        let mut copies = MockCopyRegistry::new();
        let mut loans = MockLoanStore::new();
        let mut fines = MockFineLedger::new();

        loans.expect_find_by_id().with(eq(1)).returning(move |_| {
            Ok(Some(loan_with_lines(
                1,
                due,
                &[LineStatus::Loaned, LineStatus::Loaned],
            )))
        });
        loans
            .expect_mark_line_returned()
            .with(eq(10), eq(returned_at))
            .times(1)
            .returning(|_, _| Ok(()));
        loans
            .expect_mark_line_returned()
            .with(eq(20), eq(returned_at))
            .times(1)
            .returning(|_, _| Ok(()));
        copies
            .expect_set_status()
            .with(eq(1), eq(CopyStatus::Available))
            .times(1)
            .returning(|_, _| Ok(()));
        copies
            .expect_set_status()
            .with(eq(2), eq(CopyStatus::Available))
            .times(1)
            .returning(|_, _| Ok(()));
        loans
            .expect_mark_returned()
            .with(eq(1), eq(returned_at))
            .returning(move |id, date| {
                let mut loan =
                    loan_with_lines(id, due, &[LineStatus::Returned, LineStatus::Returned]);
                loan.status = LoanStatus::Returned.into();
                loan.returned_date = Some(date);
                Ok(loan)
            });
        fines.expect_create().never();

        let svc = service(MockPatronStore::new(), copies, loans, fines);
        let returned = svc.return_loan(1, returned_at).await.unwrap();

        assert_eq!(returned.status(), LoanStatus::Returned);
        assert_eq!(returned.returned_date, Some(returned_at));
    }

    #[tokio::test]
    async fn late_return_creates_exactly_one_fine() {
        let due = Utc::now() - Duration::days(5);
        let returned_at = Utc::now();

        let mut copies = MockCopyRegistry::new();
        let mut loans = MockLoanStore::new();
        let mut fines = MockFineLedger::new();

        loans.expect_find_by_id().with(eq(1)).returning(move |_| {
            Ok(Some(loan_with_lines(
                1,
                due,
                &[LineStatus::Loaned, LineStatus::Loaned],
            )))
        });
        loans
            .expect_mark_line_returned()
            .times(2)
            .returning(|_, _| Ok(()));
        copies.expect_set_status().times(2).returning(|_, _| Ok(()));
        loans
            .expect_mark_returned()
            .with(eq(1), eq(returned_at))
            .returning(move |id, date| {
                let mut loan =
                    loan_with_lines(id, due, &[LineStatus::Returned, LineStatus::Returned]);
                loan.status = LoanStatus::Returned.into();
                loan.returned_date = Some(date);
                Ok(loan)
            });
        // One fine for the whole loan, not one per copy
        fines
            .expect_create()
            .withf(|fine: &NewFine| {
                fine.patron_id == 1
                    && fine.loan_id == 1
                    && fine.amount == Decimal::from(5) * Decimal::new(150, 2)
            })
            .times(1)
            .returning(|fine| {
                Ok(Fine {
                    id: 1,
                    patron_id: fine.patron_id,
                    loan_id: fine.loan_id,
                    amount: fine.amount,
                    issued_date: Utc::now(),
                    settled_date: None,
                })
            });

        let svc = service(MockPatronStore::new(), copies, loans, fines);
        let returned = svc.return_loan(1, returned_at).await.unwrap();

        assert_eq!(returned.status(), LoanStatus::Returned);
    }

    #[tokio::test]
    async fn return_minutes_late_charges_one_day() {
        let due = Utc::now() - Duration::minutes(30);
        let returned_at = Utc::now();

        let mut copies = MockCopyRegistry::new();
        let mut loans = MockLoanStore::new();
        let mut fines = MockFineLedger::new();

        loans
            .expect_find_by_id()
            .with(eq(1))
            .returning(move |_| Ok(Some(loan_with_lines(1, due, &[LineStatus::Loaned]))));
        loans
            .expect_mark_line_returned()
            .times(1)
            .returning(|_, _| Ok(()));
        copies.expect_set_status().times(1).returning(|_, _| Ok(()));
        loans
            .expect_mark_returned()
            .returning(move |id, date| {
                let mut loan = loan_with_lines(id, due, &[LineStatus::Returned]);
                loan.status = LoanStatus::Returned.into();
                loan.returned_date = Some(date);
                Ok(loan)
            });
        fines
            .expect_create()
            .withf(|fine: &NewFine| fine.amount == Decimal::new(150, 2))
            .times(1)
            .returning(|fine| {
                Ok(Fine {
                    id: 1,
                    patron_id: fine.patron_id,
                    loan_id: fine.loan_id,
                    amount: fine.amount,
                    issued_date: Utc::now(),
                    settled_date: None,
                })
            });

        let svc = service(MockPatronStore::new(), copies, loans, fines);
        svc.return_loan(1, returned_at).await.unwrap();
    }

    #[tokio::test]
    async fn return_fails_for_unknown_loan() {
        let mut loans = MockLoanStore::new();
        loans
            .expect_find_by_id()
            .with(eq(999))
            .returning(|_| Ok(None));

        let svc = service(
            MockPatronStore::new(),
            MockCopyRegistry::new(),
            loans,
            MockFineLedger::new(),
        );
        let err = svc.return_loan(999, Utc::now()).await.unwrap_err();

        assert!(matches!(err, AppError::NotFound(_)));
    }

    #[tokio::test]
    async fn second_return_is_rejected_without_side_effects() {
        let due = Utc::now() - Duration::days(5);

        let mut copies = MockCopyRegistry::new();
        let mut loans = MockLoanStore::new();
        let mut fines = MockFineLedger::new();

        loans.expect_find_by_id().with(eq(1)).returning(move |_| {
            let mut loan = loan_with_lines(1, due, &[LineStatus::Returned]);
            loan.status = LoanStatus::Returned.into();
            Ok(Some(loan))
        });
        // A repeated return must not touch lines, copies or the ledger,
        // even when the loan came back late
        loans.expect_mark_line_returned().never();
        loans.expect_mark_returned().never();
        copies.expect_set_status().never();
        fines.expect_create().never();

        let svc = service(MockPatronStore::new(), copies, loans, fines);
        let err = svc.return_loan(1, Utc::now()).await.unwrap_err();

        assert!(matches!(err, AppError::Ineligible(_)));
    }

    #[tokio::test]
    async fn return_skips_lines_already_closed() {
        let due = Utc::now() + Duration::days(5);
        let returned_at = Utc::now();

        let mut copies = MockCopyRegistry::new();
        let mut loans = MockLoanStore::new();

        loans.expect_find_by_id().with(eq(1)).returning(move |_| {
            Ok(Some(loan_with_lines(
                1,
                due,
                &[LineStatus::Returned, LineStatus::Loaned],
            )))
        });
        // Only the second line (id 20, copy 2) is still out
        loans
            .expect_mark_line_returned()
            .with(eq(20), eq(returned_at))
            .times(1)
            .returning(|_, _| Ok(()));
        copies
            .expect_set_status()
            .with(eq(2), eq(CopyStatus::Available))
            .times(1)
            .returning(|_, _| Ok(()));
        loans
            .expect_mark_returned()
            .returning(move |id, date| {
                let mut loan =
                    loan_with_lines(id, due, &[LineStatus::Returned, LineStatus::Returned]);
                loan.status = LoanStatus::Returned.into();
                loan.returned_date = Some(date);
                Ok(loan)
            });

        let svc = service(MockPatronStore::new(), copies, loans, MockFineLedger::new());
        let returned = svc.return_loan(1, returned_at).await.unwrap();

        assert_eq!(returned.status(), LoanStatus::Returned);
    }
}
