//! Fines repository for database operations

use async_trait::async_trait;
use chrono::Utc;
use sqlx::{Pool, Postgres};

use crate::{
    error::{AppError, AppResult},
    models::fine::{Fine, NewFine},
    repository::FineLedger,
};

#[derive(Clone)]
pub struct FinesRepository {
    pool: Pool<Postgres>,
}

impl FinesRepository {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }

    /// Get fine by ID
    pub async fn get_by_id(&self, id: i32) -> AppResult<Fine> {
        sqlx::query_as::<_, Fine>("SELECT * FROM fines WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Fine with id {} not found", id)))
    }

    /// List fines of a patron, newest first
    pub async fn list_for_patron(&self, patron_id: i32) -> AppResult<Vec<Fine>> {
        let fines = sqlx::query_as::<_, Fine>(
            "SELECT * FROM fines WHERE patron_id = $1 ORDER BY issued_date DESC",
        )
        .bind(patron_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(fines)
    }

    /// Settle an open fine
    pub async fn settle(&self, id: i32) -> AppResult<Fine> {
        let now = Utc::now();

        let result = sqlx::query(
            "UPDATE fines SET settled_date = $1 WHERE id = $2 AND settled_date IS NULL",
        )
        .bind(now)
        .bind(id)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            // Distinguish a missing fine from one already settled
            let fine = self.get_by_id(id).await?;
            return Err(AppError::Conflict(format!(
                "Fine {} was already settled on {}",
                id,
                fine.settled_date.map(|d| d.to_rfc3339()).unwrap_or_default()
            )));
        }

        self.get_by_id(id).await
    }
}

#[async_trait]
impl FineLedger for FinesRepository {
    async fn has_active_fine(&self, patron_id: i32) -> AppResult<bool> {
        let exists: bool = sqlx::query_scalar(
            "SELECT EXISTS(SELECT 1 FROM fines WHERE patron_id = $1 AND settled_date IS NULL)",
        )
        .bind(patron_id)
        .fetch_one(&self.pool)
        .await?;
        Ok(exists)
    }

    async fn create(&self, fine: NewFine) -> AppResult<Fine> {
        let now = Utc::now();

        let created = sqlx::query_as::<_, Fine>(
            r#"
            INSERT INTO fines (patron_id, loan_id, amount, issued_date)
            VALUES ($1, $2, $3, $4)
            RETURNING *
            "#,
        )
        .bind(fine.patron_id)
        .bind(fine.loan_id)
        .bind(fine.amount)
        .bind(now)
        .fetch_one(&self.pool)
        .await?;

        Ok(created)
    }
}
