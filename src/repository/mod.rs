//! Repository layer for database operations
//!
//! The loan service consumes its collaborators through the store traits
//! below; the concrete sqlx repositories implement them. The traits are
//! mockable so the lending rules can be tested without a database.

pub mod books;
pub mod copies;
pub mod fines;
pub mod loans;
pub mod patrons;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{Pool, Postgres};

use crate::{
    error::AppResult,
    models::{
        copy::{Copy, CopyStatus},
        fine::{Fine, NewFine},
        loan::{Loan, NewLoan},
        patron::Patron,
    },
};

/// Patron directory as seen by the loan service
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait PatronStore: Send + Sync {
    async fn find_by_id(&self, id: i32) -> AppResult<Option<Patron>>;
}

/// Copy registry as seen by the loan service
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait CopyRegistry: Send + Sync {
    async fn find_by_id(&self, id: i32) -> AppResult<Option<Copy>>;
    async fn set_status(&self, id: i32, status: CopyStatus) -> AppResult<()>;
}

/// Loan aggregate store; owns loan rows and their line items
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait LoanStore: Send + Sync {
    async fn find_by_id(&self, id: i32) -> AppResult<Option<Loan>>;
    async fn count_active_for_patron(&self, patron_id: i32) -> AppResult<i64>;
    async fn count_renewals(&self, loan_id: i32) -> AppResult<i64>;
    /// Persists the loan, its lines and the copy state flips atomically
    async fn create(&self, loan: NewLoan) -> AppResult<Loan>;
    async fn renew(&self, loan_id: i32, due_date: DateTime<Utc>) -> AppResult<Loan>;
    async fn mark_line_returned(&self, line_id: i32, returned_date: DateTime<Utc>) -> AppResult<()>;
    async fn mark_returned(&self, loan_id: i32, returned_date: DateTime<Utc>) -> AppResult<Loan>;
}

/// Fine ledger as seen by the loan service
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait FineLedger: Send + Sync {
    async fn has_active_fine(&self, patron_id: i32) -> AppResult<bool>;
    async fn create(&self, fine: NewFine) -> AppResult<Fine>;
}

/// Main repository struct holding database connection pool
#[derive(Clone)]
pub struct Repository {
    pub pool: Pool<Postgres>,
    pub patrons: patrons::PatronsRepository,
    pub books: books::BooksRepository,
    pub copies: copies::CopiesRepository,
    pub loans: loans::LoansRepository,
    pub fines: fines::FinesRepository,
}

impl Repository {
    /// Create a new repository with the given database pool
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self {
            patrons: patrons::PatronsRepository::new(pool.clone()),
            books: books::BooksRepository::new(pool.clone()),
            copies: copies::CopiesRepository::new(pool.clone()),
            loans: loans::LoansRepository::new(pool.clone()),
            fines: fines::FinesRepository::new(pool.clone()),
            pool,
        }
    }
}
