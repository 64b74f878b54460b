//! Patrons repository for database operations

use async_trait::async_trait;
use chrono::Utc;
use sqlx::{Pool, Postgres};

use crate::{
    error::{AppError, AppResult},
    models::patron::{CreatePatron, Patron, PatronQuery, PatronShort, PatronStatus, UpdatePatron},
    repository::PatronStore,
};

#[derive(Clone)]
pub struct PatronsRepository {
    pool: Pool<Postgres>,
}

impl PatronsRepository {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }

    /// Get patron by ID
    pub async fn get_by_id(&self, id: i32) -> AppResult<Patron> {
        sqlx::query_as::<_, Patron>("SELECT * FROM patrons WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Patron with id {} not found", id)))
    }

    /// Check if a national id is already registered
    pub async fn national_id_exists(&self, national_id: &str, exclude_id: Option<i32>) -> AppResult<bool> {
        let exists: bool = if let Some(id) = exclude_id {
            sqlx::query_scalar(
                "SELECT EXISTS(SELECT 1 FROM patrons WHERE national_id = $1 AND id != $2)",
            )
            .bind(national_id)
            .bind(id)
            .fetch_one(&self.pool)
            .await?
        } else {
            sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM patrons WHERE national_id = $1)")
                .bind(national_id)
                .fetch_one(&self.pool)
                .await?
        };
        Ok(exists)
    }

    /// Search patrons with pagination
    pub async fn search(&self, query: &PatronQuery) -> AppResult<(Vec<PatronShort>, i64)> {
        let page = query.page.unwrap_or(1);
        let per_page = query.per_page.unwrap_or(20);
        let offset = (page - 1) * per_page;

        let mut conditions = Vec::new();
        let mut params: Vec<String> = Vec::new();

        if let Some(ref name) = query.name {
            params.push(format!("%{}%", name.to_lowercase()));
            conditions.push(format!(
                "(LOWER(first_name) LIKE ${} OR LOWER(last_name) LIKE ${})",
                params.len(),
                params.len()
            ));
        }

        if let Some(ref national_id) = query.national_id {
            params.push(national_id.clone());
            conditions.push(format!("national_id = ${}", params.len()));
        }

        let where_clause = if conditions.is_empty() {
            String::new()
        } else {
            format!("WHERE {}", conditions.join(" AND "))
        };

        let count_query = format!("SELECT COUNT(*) FROM patrons {}", where_clause);
        let mut count_builder = sqlx::query_scalar::<_, i64>(&count_query);
        for param in &params {
            count_builder = count_builder.bind(param);
        }
        let total = count_builder.fetch_one(&self.pool).await?;

        let list_query = format!(
            r#"
            SELECT p.id, p.first_name, p.last_name, p.national_id, p.status,
                   (SELECT COUNT(*) FROM loans l
                    WHERE l.patron_id = p.id AND l.status = 0) as nb_active_loans
            FROM patrons p {}
            ORDER BY p.last_name, p.first_name
            LIMIT {} OFFSET {}
            "#,
            where_clause, per_page, offset
        );

        let mut list_builder = sqlx::query_as::<_, PatronShort>(&list_query);
        for param in &params {
            list_builder = list_builder.bind(param);
        }
        let patrons = list_builder.fetch_all(&self.pool).await?;

        Ok((patrons, total))
    }

    /// Create a new patron
    pub async fn create(&self, patron: &CreatePatron) -> AppResult<Patron> {
        let now = Utc::now();

        let id = sqlx::query_scalar::<_, i32>(
            r#"
            INSERT INTO patrons (first_name, last_name, national_id, address, phone, email,
                                 patron_type, status, registered_date)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            RETURNING id
            "#,
        )
        .bind(&patron.first_name)
        .bind(&patron.last_name)
        .bind(&patron.national_id)
        .bind(&patron.address)
        .bind(&patron.phone)
        .bind(&patron.email)
        .bind(patron.patron_type.map(i16::from).unwrap_or(0))
        .bind(i16::from(PatronStatus::Active))
        .bind(now)
        .fetch_one(&self.pool)
        .await?;

        self.get_by_id(id).await
    }

    /// Update an existing patron
    pub async fn update(&self, id: i32, update: &UpdatePatron) -> AppResult<Patron> {
        let current = self.get_by_id(id).await?;

        sqlx::query(
            r#"
            UPDATE patrons
            SET first_name = $1, last_name = $2, address = $3, phone = $4, email = $5,
                patron_type = $6, status = $7
            WHERE id = $8
            "#,
        )
        .bind(update.first_name.as_ref().unwrap_or(&current.first_name))
        .bind(update.last_name.as_ref().unwrap_or(&current.last_name))
        .bind(update.address.as_ref().or(current.address.as_ref()))
        .bind(update.phone.as_ref().or(current.phone.as_ref()))
        .bind(update.email.as_ref().or(current.email.as_ref()))
        .bind(update.patron_type.map(i16::from).unwrap_or(current.patron_type))
        .bind(update.status.map(i16::from).unwrap_or(current.status))
        .bind(id)
        .execute(&self.pool)
        .await?;

        self.get_by_id(id).await
    }

    /// Delete a patron; refused while loans are still active
    pub async fn delete(&self, id: i32) -> AppResult<()> {
        self.get_by_id(id).await?;

        let active_loans: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM loans WHERE patron_id = $1 AND status = 0")
                .bind(id)
                .fetch_one(&self.pool)
                .await?;

        if active_loans > 0 {
            return Err(AppError::Conflict(format!(
                "Patron {} still has {} active loan(s)",
                id, active_loans
            )));
        }

        sqlx::query("DELETE FROM patrons WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        Ok(())
    }
}

#[async_trait]
impl PatronStore for PatronsRepository {
    async fn find_by_id(&self, id: i32) -> AppResult<Option<Patron>> {
        let patron = sqlx::query_as::<_, Patron>("SELECT * FROM patrons WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(patron)
    }
}
