//! Books and categories repository for database operations

use chrono::Utc;
use sqlx::{Pool, Postgres};

use crate::{
    error::{AppError, AppResult},
    models::book::{Book, BookQuery, BookShort, Category, CreateBook, UpdateBook},
};

#[derive(Clone)]
pub struct BooksRepository {
    pool: Pool<Postgres>,
}

impl BooksRepository {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }

    /// Get book by ID
    pub async fn get_by_id(&self, id: i32) -> AppResult<Book> {
        sqlx::query_as::<_, Book>("SELECT * FROM books WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Book with id {} not found", id)))
    }

    /// Check if an ISBN is already catalogued
    pub async fn isbn_exists(&self, isbn: &str, exclude_id: Option<i32>) -> AppResult<bool> {
        let exists: bool = if let Some(id) = exclude_id {
            sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM books WHERE isbn = $1 AND id != $2)")
                .bind(isbn)
                .bind(id)
                .fetch_one(&self.pool)
                .await?
        } else {
            sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM books WHERE isbn = $1)")
                .bind(isbn)
                .fetch_one(&self.pool)
                .await?
        };
        Ok(exists)
    }

    /// Search books with pagination
    pub async fn search(&self, query: &BookQuery) -> AppResult<(Vec<BookShort>, i64)> {
        let page = query.page.unwrap_or(1);
        let per_page = query.per_page.unwrap_or(20);
        let offset = (page - 1) * per_page;

        let mut conditions = Vec::new();
        let mut params: Vec<String> = Vec::new();

        if let Some(ref title) = query.title {
            params.push(format!("%{}%", title.to_lowercase()));
            conditions.push(format!("LOWER(title) LIKE ${}", params.len()));
        }

        if let Some(ref author) = query.author {
            params.push(format!("%{}%", author.to_lowercase()));
            conditions.push(format!("LOWER(author) LIKE ${}", params.len()));
        }

        if let Some(ref isbn) = query.isbn {
            params.push(isbn.clone());
            conditions.push(format!("isbn = ${}", params.len()));
        }

        if let Some(category_id) = query.category_id {
            params.push(category_id.to_string());
            conditions.push(format!("category_id = ${}::int", params.len()));
        }

        let where_clause = if conditions.is_empty() {
            String::new()
        } else {
            format!("WHERE {}", conditions.join(" AND "))
        };

        let count_query = format!("SELECT COUNT(*) FROM books {}", where_clause);
        let mut count_builder = sqlx::query_scalar::<_, i64>(&count_query);
        for param in &params {
            count_builder = count_builder.bind(param);
        }
        let total = count_builder.fetch_one(&self.pool).await?;

        let list_query = format!(
            r#"
            SELECT b.id, b.title, b.author, b.isbn,
                   (SELECT COUNT(*) FROM copies c WHERE c.book_id = b.id) as nb_copies,
                   (SELECT COUNT(*) FROM copies c
                    WHERE c.book_id = b.id AND c.status = 0) as nb_available
            FROM books b {}
            ORDER BY b.title
            LIMIT {} OFFSET {}
            "#,
            where_clause, per_page, offset
        );

        let mut list_builder = sqlx::query_as::<_, BookShort>(&list_query);
        for param in &params {
            list_builder = list_builder.bind(param);
        }
        let books = list_builder.fetch_all(&self.pool).await?;

        Ok((books, total))
    }

    /// Create a new book
    pub async fn create(&self, book: &CreateBook) -> AppResult<Book> {
        let now = Utc::now();

        let id = sqlx::query_scalar::<_, i32>(
            r#"
            INSERT INTO books (title, author, publisher, publication_year, isbn,
                               category_id, description, added_date)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            RETURNING id
            "#,
        )
        .bind(&book.title)
        .bind(&book.author)
        .bind(&book.publisher)
        .bind(book.publication_year)
        .bind(&book.isbn)
        .bind(book.category_id)
        .bind(&book.description)
        .bind(now)
        .fetch_one(&self.pool)
        .await?;

        self.get_by_id(id).await
    }

    /// Update an existing book
    pub async fn update(&self, id: i32, update: &UpdateBook) -> AppResult<Book> {
        let current = self.get_by_id(id).await?;

        sqlx::query(
            r#"
            UPDATE books
            SET title = $1, author = $2, publisher = $3, publication_year = $4,
                isbn = $5, category_id = $6, description = $7
            WHERE id = $8
            "#,
        )
        .bind(update.title.as_ref().unwrap_or(&current.title))
        .bind(update.author.as_ref().unwrap_or(&current.author))
        .bind(update.publisher.as_ref().or(current.publisher.as_ref()))
        .bind(update.publication_year.or(current.publication_year))
        .bind(update.isbn.as_ref().or(current.isbn.as_ref()))
        .bind(update.category_id.or(current.category_id))
        .bind(update.description.as_ref().or(current.description.as_ref()))
        .bind(id)
        .execute(&self.pool)
        .await?;

        self.get_by_id(id).await
    }

    /// Delete a book and its copies; refused while any copy is on loan
    pub async fn delete(&self, id: i32) -> AppResult<()> {
        self.get_by_id(id).await?;

        let loaned: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM copies WHERE book_id = $1 AND status = 1")
                .bind(id)
                .fetch_one(&self.pool)
                .await?;

        if loaned > 0 {
            return Err(AppError::Conflict(format!(
                "Book {} has {} copy(ies) currently on loan",
                id, loaned
            )));
        }

        let mut tx = self.pool.begin().await?;
        sqlx::query("DELETE FROM copies WHERE book_id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?;
        sqlx::query("DELETE FROM books WHERE id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?;
        tx.commit().await?;

        Ok(())
    }

    /// List all categories
    pub async fn list_categories(&self) -> AppResult<Vec<Category>> {
        let categories =
            sqlx::query_as::<_, Category>("SELECT * FROM categories ORDER BY name")
                .fetch_all(&self.pool)
                .await?;
        Ok(categories)
    }
}
