//! Copies repository for database operations

use async_trait::async_trait;
use chrono::Utc;
use sqlx::{Pool, Postgres};

use crate::{
    error::{AppError, AppResult},
    models::copy::{Copy, CopyStatus, CreateCopy},
    repository::CopyRegistry,
};

#[derive(Clone)]
pub struct CopiesRepository {
    pool: Pool<Postgres>,
}

impl CopiesRepository {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }

    /// Get copy by ID
    pub async fn get_by_id(&self, id: i32) -> AppResult<Copy> {
        sqlx::query_as::<_, Copy>("SELECT * FROM copies WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Copy with id {} not found", id)))
    }

    /// List copies of a book
    pub async fn list_for_book(&self, book_id: i32) -> AppResult<Vec<Copy>> {
        let copies =
            sqlx::query_as::<_, Copy>("SELECT * FROM copies WHERE book_id = $1 ORDER BY id")
                .bind(book_id)
                .fetch_all(&self.pool)
                .await?;
        Ok(copies)
    }

    /// Add a copy to a book; the barcode is derived from the copy id
    /// when none is supplied
    pub async fn create(&self, book_id: i32, copy: &CreateCopy) -> AppResult<Copy> {
        let now = Utc::now();

        // Pre-allocate the id so a generated barcode can reference it
        let id: i32 = sqlx::query_scalar(
            "SELECT nextval(pg_get_serial_sequence('copies', 'id'))::int",
        )
        .fetch_one(&self.pool)
        .await?;

        let barcode = copy
            .barcode
            .clone()
            .unwrap_or_else(|| format!("CPY-{:06}", id));

        sqlx::query(
            r#"
            INSERT INTO copies (id, book_id, barcode, shelf_location, status, acquired_date)
            VALUES ($1, $2, $3, $4, $5, $6)
            "#,
        )
        .bind(id)
        .bind(book_id)
        .bind(&barcode)
        .bind(&copy.shelf_location)
        .bind(i16::from(CopyStatus::Available))
        .bind(now)
        .execute(&self.pool)
        .await?;

        self.get_by_id(id).await
    }

    /// Delete a copy; refused while it is on loan
    pub async fn delete(&self, id: i32) -> AppResult<()> {
        let copy = self.get_by_id(id).await?;

        if copy.status() == CopyStatus::Loaned {
            return Err(AppError::Conflict(format!("Copy {} is currently on loan", id)));
        }

        sqlx::query("DELETE FROM copies WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        Ok(())
    }
}

#[async_trait]
impl CopyRegistry for CopiesRepository {
    async fn find_by_id(&self, id: i32) -> AppResult<Option<Copy>> {
        let copy = sqlx::query_as::<_, Copy>("SELECT * FROM copies WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(copy)
    }

    async fn set_status(&self, id: i32, status: CopyStatus) -> AppResult<()> {
        let result = sqlx::query("UPDATE copies SET status = $1 WHERE id = $2")
            .bind(i16::from(status))
            .bind(id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound(format!("Copy with id {} not found", id)));
        }

        Ok(())
    }
}
