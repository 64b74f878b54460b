//! Catalog management service

use validator::Validate;

use crate::{
    error::{AppError, AppResult},
    models::{
        book::{Book, BookQuery, BookShort, Category, CreateBook, UpdateBook},
        copy::{Copy, CopyStatus, CreateCopy},
    },
    repository::{CopyRegistry, Repository},
};

#[derive(Clone)]
pub struct CatalogService {
    repository: Repository,
}

impl CatalogService {
    pub fn new(repository: Repository) -> Self {
        Self { repository }
    }

    /// Search books with filters
    pub async fn search_books(&self, query: &BookQuery) -> AppResult<(Vec<BookShort>, i64)> {
        self.repository.books.search(query).await
    }

    /// Get book by ID
    pub async fn get_book(&self, id: i32) -> AppResult<Book> {
        self.repository.books.get_by_id(id).await
    }

    /// Create a new book
    pub async fn create_book(&self, book: CreateBook) -> AppResult<Book> {
        book.validate()
            .map_err(|e| AppError::Validation(e.to_string()))?;

        if let Some(ref isbn) = book.isbn {
            if self.repository.books.isbn_exists(isbn, None).await? {
                return Err(AppError::Conflict(format!(
                    "Book with ISBN {} already exists",
                    isbn
                )));
            }
        }

        let created = self.repository.books.create(&book).await?;
        tracing::info!("Book {} added to the catalog", created.id);
        Ok(created)
    }

    /// Update an existing book
    pub async fn update_book(&self, id: i32, book: UpdateBook) -> AppResult<Book> {
        book.validate()
            .map_err(|e| AppError::Validation(e.to_string()))?;

        if let Some(ref isbn) = book.isbn {
            if self.repository.books.isbn_exists(isbn, Some(id)).await? {
                return Err(AppError::Conflict(format!(
                    "Book with ISBN {} already exists",
                    isbn
                )));
            }
        }

        self.repository.books.update(id, &book).await
    }

    /// Delete a book with all its copies
    pub async fn delete_book(&self, id: i32) -> AppResult<()> {
        self.repository.books.delete(id).await
    }

    /// List copies of a book
    pub async fn list_copies(&self, book_id: i32) -> AppResult<Vec<Copy>> {
        self.repository.books.get_by_id(book_id).await?;
        self.repository.copies.list_for_book(book_id).await
    }

    /// Add a copy to a book
    pub async fn add_copy(&self, book_id: i32, copy: CreateCopy) -> AppResult<Copy> {
        self.repository.books.get_by_id(book_id).await?;
        self.repository.copies.create(book_id, &copy).await
    }

    /// Remove a copy from the catalog
    pub async fn remove_copy(&self, id: i32) -> AppResult<()> {
        self.repository.copies.delete(id).await
    }

    /// Move a copy in or out of repair.
    ///
    /// The loaned state is owned by the loan service; it cannot be entered
    /// or left through this maintenance endpoint.
    pub async fn set_copy_status(&self, id: i32, status: CopyStatus) -> AppResult<Copy> {
        if status == CopyStatus::Loaned {
            return Err(AppError::BadRequest(
                "The loaned state is managed by loan operations".to_string(),
            ));
        }

        let copy = self.repository.copies.get_by_id(id).await?;
        if copy.status() == CopyStatus::Loaned {
            return Err(AppError::Conflict(format!(
                "Copy {} is currently on loan",
                id
            )));
        }

        self.repository.copies.set_status(id, status).await?;
        self.repository.copies.get_by_id(id).await
    }

    /// List all categories
    pub async fn list_categories(&self) -> AppResult<Vec<Category>> {
        self.repository.books.list_categories().await
    }
}
