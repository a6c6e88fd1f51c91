use async_trait::async_trait;
use bookstore_db::{Database, DbError};
use rusqlite::{params, OptionalExtension, Row};

use super::{BookStore, ListFilters, StoreError, StoreResult};
use crate::modules::books::models::{Book, BookChanges};

const BOOK_COLUMNS: &str = "isbn, amazon_url, author, language, pages, publisher, title, year";

/// Store backed by the `books` table.
///
/// Requires the books module migrations to have been applied.
pub struct SqliteBookStore {
    db: Database,
}

impl SqliteBookStore {
    pub fn new(db: Database) -> Self {
        Self { db }
    }
}

fn row_to_book(row: &Row<'_>) -> rusqlite::Result<Book> {
    Ok(Book {
        isbn: row.get(0)?,
        amazon_url: row.get(1)?,
        author: row.get(2)?,
        language: row.get(3)?,
        pages: row.get(4)?,
        publisher: row.get(5)?,
        title: row.get(6)?,
        year: row.get(7)?,
    })
}

fn unavailable(err: DbError) -> StoreError {
    StoreError::Unavailable(err.into())
}

#[async_trait]
impl BookStore for SqliteBookStore {
    async fn list(&self, filters: &ListFilters) -> StoreResult<Vec<Book>> {
        if !filters.is_empty() {
            tracing::debug!(?filters, "sqlite store ignores list filters");
        }

        self.db
            .call(|conn| {
                let mut stmt =
                    conn.prepare(&format!("SELECT {BOOK_COLUMNS} FROM books ORDER BY title"))?;
                let books = stmt
                    .query_map([], row_to_book)?
                    .collect::<rusqlite::Result<Vec<_>>>()?;
                Ok(books)
            })
            .await
            .map_err(unavailable)
    }

    async fn get(&self, isbn: &str) -> StoreResult<Book> {
        let key = isbn.to_string();
        self.db
            .call(move |conn| {
                conn.query_row(
                    &format!("SELECT {BOOK_COLUMNS} FROM books WHERE isbn = ?1"),
                    params![key],
                    row_to_book,
                )
                .optional()
            })
            .await
            .map_err(unavailable)?
            .ok_or_else(|| StoreError::not_found(isbn))
    }

    async fn insert(&self, book: Book) -> StoreResult<Book> {
        let isbn = book.isbn.clone();
        let result = self
            .db
            .call(move |conn| {
                conn.query_row(
                    &format!(
                        "INSERT INTO books ({BOOK_COLUMNS})
                         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
                         RETURNING {BOOK_COLUMNS}"
                    ),
                    params![
                        book.isbn,
                        book.amazon_url,
                        book.author,
                        book.language,
                        book.pages,
                        book.publisher,
                        book.title,
                        book.year
                    ],
                    row_to_book,
                )
            })
            .await;

        match result {
            Ok(book) => Ok(book),
            Err(err) if err.is_constraint_violation() => Err(StoreError::conflict(isbn)),
            Err(err) => Err(unavailable(err)),
        }
    }

    async fn update(&self, isbn: &str, changes: BookChanges) -> StoreResult<Book> {
        let key = isbn.to_string();
        self.db
            .call(move |conn| {
                conn.query_row(
                    &format!(
                        "UPDATE books
                         SET amazon_url = ?1, author = ?2, language = ?3, pages = ?4,
                             publisher = ?5, title = ?6, year = ?7
                         WHERE isbn = ?8
                         RETURNING {BOOK_COLUMNS}"
                    ),
                    params![
                        changes.amazon_url,
                        changes.author,
                        changes.language,
                        changes.pages,
                        changes.publisher,
                        changes.title,
                        changes.year,
                        key
                    ],
                    row_to_book,
                )
                .optional()
            })
            .await
            .map_err(unavailable)?
            .ok_or_else(|| StoreError::not_found(isbn))
    }

    async fn remove(&self, isbn: &str) -> StoreResult<()> {
        let key = isbn.to_string();
        let deleted = self
            .db
            .call(move |conn| conn.execute("DELETE FROM books WHERE isbn = ?1", params![key]))
            .await
            .map_err(unavailable)?;

        if deleted == 0 {
            return Err(StoreError::not_found(isbn));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::modules::books;

    async fn store() -> SqliteBookStore {
        let db = Database::open_in_memory().unwrap();
        let migrations: Vec<_> = books::migrations()
            .into_iter()
            .map(|migration| ("books".to_string(), migration))
            .collect();
        db.apply_migrations(&migrations).await.unwrap();
        SqliteBookStore::new(db)
    }

    fn book(isbn: &str, title: &str) -> Book {
        Book {
            isbn: isbn.to_string(),
            amazon_url: "http://a.co/12345".to_string(),
            author: "Test Author".to_string(),
            language: "english".to_string(),
            pages: 400,
            publisher: "Test Publiser".to_string(),
            title: title.to_string(),
            year: 2024,
        }
    }

    #[tokio::test]
    async fn insert_then_get_round_trips() {
        let store = store().await;
        let created = store.insert(book("987654321", "Test Title")).await.unwrap();

        assert_eq!(created, book("987654321", "Test Title"));
        assert_eq!(store.get("987654321").await.unwrap(), created);
    }

    #[tokio::test]
    async fn list_orders_by_title() {
        let store = store().await;
        assert!(store.list(&ListFilters::new()).await.unwrap().is_empty());

        store.insert(book("2", "Beta")).await.unwrap();
        store.insert(book("1", "Alpha")).await.unwrap();

        let isbns: Vec<String> = store
            .list(&ListFilters::new())
            .await
            .unwrap()
            .into_iter()
            .map(|b| b.isbn)
            .collect();
        assert_eq!(isbns, vec!["1", "2"]);
    }

    #[tokio::test]
    async fn duplicate_isbn_is_a_conflict() {
        let store = store().await;
        store.insert(book("1", "First")).await.unwrap();

        let err = store.insert(book("1", "Again")).await.unwrap_err();
        assert!(matches!(err, StoreError::Conflict { .. }));
    }

    #[tokio::test]
    async fn update_and_remove_missing_rows_are_not_found() {
        let store = store().await;
        let changes = BookChanges {
            amazon_url: "http://a.co/1".to_string(),
            author: "A".to_string(),
            language: "english".to_string(),
            pages: 1,
            publisher: "P".to_string(),
            title: "T".to_string(),
            year: 2000,
        };

        assert!(matches!(
            store.update("0000", changes).await,
            Err(StoreError::NotFound { .. })
        ));
        assert!(matches!(
            store.remove("0000").await,
            Err(StoreError::NotFound { .. })
        ));
        assert!(matches!(
            store.get("0000").await,
            Err(StoreError::NotFound { .. })
        ));
    }

    #[tokio::test]
    async fn update_replaces_the_record() {
        let store = store().await;
        store.insert(book("1", "Old")).await.unwrap();

        let changes = BookChanges {
            amazon_url: "http://a.co/new".to_string(),
            author: "New Test Author".to_string(),
            language: "Spanish".to_string(),
            pages: 250,
            publisher: "Other".to_string(),
            title: "New Test Title".to_string(),
            year: 2023,
        };
        let updated = store.update("1", changes.clone()).await.unwrap();

        let mut expected = book("1", "Old");
        expected.apply(changes);
        assert_eq!(updated, expected);
        assert_eq!(store.get("1").await.unwrap(), expected);

        store.remove("1").await.unwrap();
        assert!(store.list(&ListFilters::new()).await.unwrap().is_empty());
    }
}
