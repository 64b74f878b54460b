//! Loan aggregate and line item models

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;

/// Loan status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[repr(i16)]
pub enum LoanStatus {
    Active = 0,
    Returned = 1,
}

impl From<i16> for LoanStatus {
    fn from(v: i16) -> Self {
        match v {
            1 => LoanStatus::Returned,
            _ => LoanStatus::Active,
        }
    }
}

impl From<LoanStatus> for i16 {
    fn from(s: LoanStatus) -> Self {
        s as i16
    }
}

/// Line item status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[repr(i16)]
pub enum LineStatus {
    Loaned = 0,
    Returned = 1,
}

impl From<i16> for LineStatus {
    fn from(v: i16) -> Self {
        match v {
            1 => LineStatus::Returned,
            _ => LineStatus::Loaned,
        }
    }
}

impl From<LineStatus> for i16 {
    fn from(s: LineStatus) -> Self {
        s as i16
    }
}

/// Internal row structure for loan queries (without lines)
#[derive(Debug, Clone, FromRow)]
pub struct LoanRow {
    pub id: i32,
    pub patron_id: i32,
    pub loan_date: DateTime<Utc>,
    pub due_date: DateTime<Utc>,
    pub nb_renewals: i16,
    pub renewed_date: Option<DateTime<Utc>>,
    pub status: i16,
    pub returned_date: Option<DateTime<Utc>>,
}

impl From<LoanRow> for Loan {
    fn from(row: LoanRow) -> Self {
        Loan {
            id: row.id,
            patron_id: row.patron_id,
            loan_date: row.loan_date,
            due_date: row.due_date,
            nb_renewals: row.nb_renewals,
            renewed_date: row.renewed_date,
            status: row.status,
            returned_date: row.returned_date,
            lines: Vec::new(),
        }
    }
}

/// Loan aggregate: one borrowing transaction covering one or more copies
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct Loan {
    pub id: i32,
    pub patron_id: i32,
    pub loan_date: DateTime<Utc>,
    /// Expected return date; extended on renewal
    pub due_date: DateTime<Utc>,
    pub nb_renewals: i16,
    pub renewed_date: Option<DateTime<Utc>>,
    pub status: i16, // 0=Active, 1=Returned
    pub returned_date: Option<DateTime<Utc>>,
    /// One line per borrowed copy, in request order
    pub lines: Vec<LoanLine>,
}

impl Loan {
    pub fn status(&self) -> LoanStatus {
        LoanStatus::from(self.status)
    }

    pub fn is_overdue(&self, now: DateTime<Utc>) -> bool {
        self.status() == LoanStatus::Active && now > self.due_date
    }
}

/// Per-copy record within a loan, never deleted
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct LoanLine {
    pub id: i32,
    pub loan_id: i32,
    pub copy_id: i32,
    pub status: i16, // 0=Loaned, 1=Returned
    pub returned_date: Option<DateTime<Utc>>,
}

impl LoanLine {
    pub fn status(&self) -> LineStatus {
        LineStatus::from(self.status)
    }
}

/// Command for creating a loan with its lines
#[derive(Debug, Clone)]
pub struct NewLoan {
    pub patron_id: i32,
    pub copy_ids: Vec<i32>,
    pub loan_date: DateTime<Utc>,
    pub due_date: DateTime<Utc>,
}

/// Loan with per-line copy details for display
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct LoanDetails {
    pub id: i32,
    pub patron_id: i32,
    pub loan_date: DateTime<Utc>,
    pub due_date: DateTime<Utc>,
    pub nb_renewals: i16,
    pub status: i16,
    pub is_overdue: bool,
    pub lines: Vec<LoanLineDetails>,
}

/// Line detail joined with copy and title info
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct LoanLineDetails {
    pub copy_id: i32,
    pub barcode: String,
    pub title: String,
    pub author: String,
    pub status: i16,
    pub returned_date: Option<DateTime<Utc>>,
}
