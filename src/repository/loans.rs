//! Loans repository for database operations

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{Pool, Postgres};

use crate::{
    error::{AppError, AppResult},
    models::{
        copy::CopyStatus,
        loan::{LineStatus, Loan, LoanDetails, LoanLine, LoanLineDetails, LoanRow, LoanStatus, NewLoan},
    },
    repository::LoanStore,
};

#[derive(Clone)]
pub struct LoansRepository {
    pool: Pool<Postgres>,
}

impl LoansRepository {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }

    async fn load(&self, id: i32) -> AppResult<Option<Loan>> {
        let row = sqlx::query_as::<_, LoanRow>("SELECT * FROM loans WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        let Some(row) = row else {
            return Ok(None);
        };

        let lines =
            sqlx::query_as::<_, LoanLine>("SELECT * FROM loan_lines WHERE loan_id = $1 ORDER BY id")
                .bind(id)
                .fetch_all(&self.pool)
                .await?;

        let mut loan = Loan::from(row);
        loan.lines = lines;
        Ok(Some(loan))
    }

    async fn get(&self, id: i32) -> AppResult<Loan> {
        self.load(id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Loan with id {} not found", id)))
    }

    /// Active loans of a patron with joined copy and title details
    pub async fn active_for_patron(&self, patron_id: i32) -> AppResult<Vec<LoanDetails>> {
        let rows = sqlx::query_as::<_, LoanRow>(
            "SELECT * FROM loans WHERE patron_id = $1 AND status = 0 ORDER BY loan_date",
        )
        .bind(patron_id)
        .fetch_all(&self.pool)
        .await?;

        let now = Utc::now();

        let mut result = Vec::new();
        for row in rows {
            let lines = sqlx::query_as::<_, LoanLineDetails>(
                r#"
                SELECT ll.copy_id, c.barcode, b.title, b.author, ll.status, ll.returned_date
                FROM loan_lines ll
                JOIN copies c ON ll.copy_id = c.id
                JOIN books b ON c.book_id = b.id
                WHERE ll.loan_id = $1
                ORDER BY ll.id
                "#,
            )
            .bind(row.id)
            .fetch_all(&self.pool)
            .await?;

            result.push(LoanDetails {
                id: row.id,
                patron_id: row.patron_id,
                loan_date: row.loan_date,
                due_date: row.due_date,
                nb_renewals: row.nb_renewals,
                status: row.status,
                is_overdue: now > row.due_date,
                lines,
            });
        }

        Ok(result)
    }
}

#[async_trait]
impl LoanStore for LoansRepository {
    async fn find_by_id(&self, id: i32) -> AppResult<Option<Loan>> {
        self.load(id).await
    }

    async fn count_active_for_patron(&self, patron_id: i32) -> AppResult<i64> {
        let count: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM loans WHERE patron_id = $1 AND status = 0")
                .bind(patron_id)
                .fetch_one(&self.pool)
                .await?;
        Ok(count)
    }

    async fn count_renewals(&self, loan_id: i32) -> AppResult<i64> {
        let renewals: i16 = sqlx::query_scalar("SELECT nb_renewals FROM loans WHERE id = $1")
            .bind(loan_id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Loan with id {} not found", loan_id)))?;
        Ok(renewals as i64)
    }

    async fn create(&self, loan: NewLoan) -> AppResult<Loan> {
        let mut tx = self.pool.begin().await?;

        let loan_id = sqlx::query_scalar::<_, i32>(
            r#"
            INSERT INTO loans (patron_id, loan_date, due_date, nb_renewals, status)
            VALUES ($1, $2, $3, 0, $4)
            RETURNING id
            "#,
        )
        .bind(loan.patron_id)
        .bind(loan.loan_date)
        .bind(loan.due_date)
        .bind(i16::from(LoanStatus::Active))
        .fetch_one(&mut *tx)
        .await?;

        for &copy_id in &loan.copy_ids {
            sqlx::query(
                "INSERT INTO loan_lines (loan_id, copy_id, status) VALUES ($1, $2, $3)",
            )
            .bind(loan_id)
            .bind(copy_id)
            .bind(i16::from(LineStatus::Loaned))
            .execute(&mut *tx)
            .await?;

            // Guarded flip: aborts the whole transaction if the copy was
            // taken between validation and here
            let flipped = sqlx::query("UPDATE copies SET status = $1 WHERE id = $2 AND status = $3")
                .bind(i16::from(CopyStatus::Loaned))
                .bind(copy_id)
                .bind(i16::from(CopyStatus::Available))
                .execute(&mut *tx)
                .await?;

            if flipped.rows_affected() == 0 {
                return Err(AppError::Unavailable(format!(
                    "Copy {} is no longer available",
                    copy_id
                )));
            }
        }

        tx.commit().await?;

        self.get(loan_id).await
    }

    async fn renew(&self, loan_id: i32, due_date: DateTime<Utc>) -> AppResult<Loan> {
        let now = Utc::now();

        let result = sqlx::query(
            r#"
            UPDATE loans
            SET due_date = $1, renewed_date = $2, nb_renewals = nb_renewals + 1
            WHERE id = $3 AND status = 0
            "#,
        )
        .bind(due_date)
        .bind(now)
        .bind(loan_id)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::Ineligible(format!(
                "Loan {} is no longer active",
                loan_id
            )));
        }

        self.get(loan_id).await
    }

    async fn mark_line_returned(&self, line_id: i32, returned_date: DateTime<Utc>) -> AppResult<()> {
        // Status guard keeps the update idempotent on retries
        sqlx::query(
            "UPDATE loan_lines SET status = $1, returned_date = $2 WHERE id = $3 AND status = $4",
        )
        .bind(i16::from(LineStatus::Returned))
        .bind(returned_date)
        .bind(line_id)
        .bind(i16::from(LineStatus::Loaned))
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn mark_returned(&self, loan_id: i32, returned_date: DateTime<Utc>) -> AppResult<Loan> {
        sqlx::query("UPDATE loans SET status = $1, returned_date = $2 WHERE id = $3 AND status = 0")
            .bind(i16::from(LoanStatus::Returned))
            .bind(returned_date)
            .bind(loan_id)
            .execute(&self.pool)
            .await?;

        self.get(loan_id).await
    }
}
