use std::collections::BTreeMap;

use async_trait::async_trait;
use tokio::sync::RwLock;

use super::{BookStore, ListFilters, StoreError, StoreResult};
use crate::modules::books::models::{Book, BookChanges};

/// Process-local store, used when no database is configured and in tests.
#[derive(Default)]
pub struct MemoryBookStore {
    books: RwLock<BTreeMap<String, Book>>,
}

impl MemoryBookStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl BookStore for MemoryBookStore {
    async fn list(&self, filters: &ListFilters) -> StoreResult<Vec<Book>> {
        if !filters.is_empty() {
            tracing::debug!(?filters, "memory store ignores list filters");
        }

        let mut books: Vec<Book> = self.books.read().await.values().cloned().collect();
        books.sort_by(|a, b| a.title.cmp(&b.title).then_with(|| a.isbn.cmp(&b.isbn)));
        Ok(books)
    }

    async fn get(&self, isbn: &str) -> StoreResult<Book> {
        self.books
            .read()
            .await
            .get(isbn)
            .cloned()
            .ok_or_else(|| StoreError::not_found(isbn))
    }

    async fn insert(&self, book: Book) -> StoreResult<Book> {
        let mut books = self.books.write().await;
        if books.contains_key(&book.isbn) {
            return Err(StoreError::conflict(book.isbn));
        }

        books.insert(book.isbn.clone(), book.clone());
        Ok(book)
    }

    async fn update(&self, isbn: &str, changes: BookChanges) -> StoreResult<Book> {
        let mut books = self.books.write().await;
        let book = books
            .get_mut(isbn)
            .ok_or_else(|| StoreError::not_found(isbn))?;

        book.apply(changes);
        Ok(book.clone())
    }

    async fn remove(&self, isbn: &str) -> StoreResult<()> {
        self.books
            .write()
            .await
            .remove(isbn)
            .map(|_| ())
            .ok_or_else(|| StoreError::not_found(isbn))
    }
}
