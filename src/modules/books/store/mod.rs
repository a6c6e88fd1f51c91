//! Record store contract for books and the bundled adapters.

use std::collections::BTreeMap;

use async_trait::async_trait;
use bookstore_http::error::AppError;
use thiserror::Error;

use super::models::{Book, BookChanges};

mod memory;
mod sqlite;

pub use memory::MemoryBookStore;
pub use sqlite::SqliteBookStore;

/// Query parameters forwarded verbatim from `GET /books`.
pub type ListFilters = BTreeMap<String, String>;

pub type StoreResult<T> = Result<T, StoreError>;

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("There is no book with an isbn '{isbn}'")]
    NotFound { isbn: String },

    #[error("A book with isbn '{isbn}' already exists")]
    Conflict { isbn: String },

    #[error("book store unavailable")]
    Unavailable(#[source] anyhow::Error),
}

impl StoreError {
    pub fn not_found(isbn: impl Into<String>) -> Self {
        Self::NotFound { isbn: isbn.into() }
    }

    pub fn conflict(isbn: impl Into<String>) -> Self {
        Self::Conflict { isbn: isbn.into() }
    }
}

impl From<StoreError> for AppError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound { .. } => AppError::not_found(err.to_string()),
            StoreError::Conflict { .. } => AppError::conflict(err.to_string()),
            StoreError::Unavailable(source) => {
                AppError::Internal(source.context("book store unavailable"))
            }
        }
    }
}

/// Persistence capability consumed by the books routes.
///
/// Each call is atomic from the caller's point of view: it either fully
/// applies or returns an error without side effects.
#[async_trait]
pub trait BookStore: Send + Sync {
    /// All books ordered by title.
    async fn list(&self, filters: &ListFilters) -> StoreResult<Vec<Book>>;

    async fn get(&self, isbn: &str) -> StoreResult<Book>;

    /// Persist a new book. Fails with `Conflict` if the ISBN is taken.
    async fn insert(&self, book: Book) -> StoreResult<Book>;

    /// Replace every mutable field of an existing book.
    async fn update(&self, isbn: &str, changes: BookChanges) -> StoreResult<Book>;

    async fn remove(&self, isbn: &str) -> StoreResult<()>;
}
