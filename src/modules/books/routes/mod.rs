//! HTTP handlers for the books resource.
//!
//! Writes are validated against the JSON Schemas before any typed value is
//! built or the store is touched. On update the `isbn` guard runs first, so
//! a body carrying `isbn` is always reported as such.

use std::sync::Arc;

use axum::{
    extract::State,
    http::StatusCode,
    routing::get,
    Json, Router,
};
use bookstore_http::{
    error::AppError,
    extract::{JsonDocument, PathParam, QueryParams},
};
use serde::de::DeserializeOwned;
use serde_json::Value;

use super::models::{Book, BookChanges, BookEnvelope, BookList, MessageResponse};
use super::schema::{normalize_integers, BookValidator, SchemaKind, Validation};
use super::store::{BookStore, ListFilters};

pub const ISBN_IMMUTABLE_MESSAGE: &str = "Cannot update isbn";
pub const BOOK_DELETED_MESSAGE: &str = "Book deleted";

/// Shared handler state: the injected store and the compiled schemas.
#[derive(Clone)]
pub struct BooksState {
    store: Arc<dyn BookStore>,
    validator: Arc<BookValidator>,
}

impl BooksState {
    pub fn new(store: Arc<dyn BookStore>, validator: Arc<BookValidator>) -> Self {
        Self { store, validator }
    }

    /// Validate `document` against `kind`, then deserialize it.
    fn validated<T: DeserializeOwned>(&self, mut document: Value, kind: SchemaKind) -> Result<T, AppError> {
        if let Validation::Invalid(messages) = self.validator.validate(&document, kind) {
            return Err(AppError::validation(messages));
        }

        // The schema accepts `400.0` as an integer; serde's i32 does not.
        normalize_integers(&mut document);

        serde_json::from_value(document).map_err(|err| AppError::validation(vec![err.to_string()]))
    }
}

pub fn router(state: BooksState) -> Router {
    Router::new()
        .route("/", get(list_books).post(create_book))
        .route(
            "/{isbn}",
            get(get_book).put(update_book).delete(delete_book),
        )
        .with_state(state)
}

/// `GET /books` => `{books: [book, ...]}`
async fn list_books(
    State(state): State<BooksState>,
    QueryParams(filters): QueryParams<ListFilters>,
) -> Result<Json<BookList>, AppError> {
    let books = state.store.list(&filters).await?;
    Ok(Json(BookList { books }))
}

/// `GET /books/{isbn}` => `{book: book}`
async fn get_book(
    State(state): State<BooksState>,
    PathParam(isbn): PathParam<String>,
) -> Result<Json<BookEnvelope>, AppError> {
    let book = state.store.get(&isbn).await?;
    Ok(Json(BookEnvelope { book }))
}

/// `POST /books` => `201 {book: book}`
async fn create_book(
    State(state): State<BooksState>,
    JsonDocument(document): JsonDocument,
) -> Result<(StatusCode, Json<BookEnvelope>), AppError> {
    let book: Book = state.validated(document, SchemaKind::Create)?;

    let book = state.store.insert(book).await?;
    tracing::info!(isbn = %book.isbn, "book created");

    Ok((StatusCode::CREATED, Json(BookEnvelope { book })))
}

/// `PUT /books/{isbn}` => `{book: book}`
async fn update_book(
    State(state): State<BooksState>,
    PathParam(isbn): PathParam<String>,
    JsonDocument(document): JsonDocument,
) -> Result<Json<BookEnvelope>, AppError> {
    if document.get("isbn").is_some() {
        return Err(AppError::invalid(ISBN_IMMUTABLE_MESSAGE));
    }
    let changes: BookChanges = state.validated(document, SchemaKind::Edit)?;

    let book = state.store.update(&isbn, changes).await?;
    tracing::info!(isbn = %book.isbn, "book updated");

    Ok(Json(BookEnvelope { book }))
}

/// `DELETE /books/{isbn}` => `{message: "Book deleted"}`
async fn delete_book(
    State(state): State<BooksState>,
    PathParam(isbn): PathParam<String>,
) -> Result<Json<MessageResponse>, AppError> {
    state.store.remove(&isbn).await?;
    tracing::info!(isbn = %isbn, "book deleted");

    Ok(Json(MessageResponse {
        message: BOOK_DELETED_MESSAGE.to_string(),
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::modules::books::store::{StoreError, StoreResult};
    use async_trait::async_trait;
    use axum::{
        body::{to_bytes, Body},
        http::Request,
    };
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tower::ServiceExt;

    /// Store that counts calls and fails every one of them.
    #[derive(Default)]
    struct BrokenStore {
        calls: AtomicUsize,
    }

    impl BrokenStore {
        fn fail<T>(&self) -> StoreResult<T> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Err(StoreError::Unavailable(anyhow::anyhow!(
                "connection refused (host=db.internal)"
            )))
        }
    }

    #[async_trait]
    impl BookStore for BrokenStore {
        async fn list(&self, _filters: &ListFilters) -> StoreResult<Vec<Book>> {
            self.fail()
        }

        async fn get(&self, _isbn: &str) -> StoreResult<Book> {
            self.fail()
        }

        async fn insert(&self, _book: Book) -> StoreResult<Book> {
            self.fail()
        }

        async fn update(&self, _isbn: &str, _changes: BookChanges) -> StoreResult<Book> {
            self.fail()
        }

        async fn remove(&self, _isbn: &str) -> StoreResult<()> {
            self.fail()
        }
    }

    fn app(store: Arc<BrokenStore>) -> Router {
        let validator = Arc::new(BookValidator::new().unwrap());
        router(BooksState::new(store, validator))
    }

    fn request(method: &str, uri: &str, body: Value) -> Request<Body> {
        Request::builder()
            .method(method)
            .uri(uri)
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    async fn send(router: Router, request: Request<Body>) -> (StatusCode, Value) {
        let response = router.oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    fn edit_body() -> Value {
        json!({
            "amazon_url": "http://a.co/12345",
            "author": "Testing",
            "language": "Spanish",
            "pages": 400,
            "publisher": "Test Publiser",
            "title": "New Test Title",
            "year": 2024
        })
    }

    #[tokio::test]
    async fn isbn_guard_runs_before_schema_validation() {
        let store = Arc::new(BrokenStore::default());
        let body = json!({"isbn": "12345678", "pages": "Four hundred"});

        let (status, body) = send(app(store.clone()), request("PUT", "/987654321", body)).await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body, json!({"message": ISBN_IMMUTABLE_MESSAGE}));
        assert_eq!(store.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn null_isbn_is_still_rejected() {
        let store = Arc::new(BrokenStore::default());
        let mut body = edit_body();
        body["isbn"] = Value::Null;

        let (status, body) = send(app(store), request("PUT", "/987654321", body)).await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body, json!({"message": ISBN_IMMUTABLE_MESSAGE}));
    }

    #[tokio::test]
    async fn invalid_payload_never_reaches_the_store() {
        let store = Arc::new(BrokenStore::default());
        let body = json!({"author": false, "pages": "Four hundred"});

        let (status, body) = send(app(store.clone()), request("POST", "/", body)).await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body["message"].as_array().is_some_and(|m| !m.is_empty()));
        assert_eq!(store.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn integral_floats_reach_the_store_as_integers() {
        let store = Arc::new(BrokenStore::default());
        let mut body = edit_body();
        body["pages"] = json!(400.0);
        body["year"] = json!(2024.0);

        let (status, _) = send(app(store.clone()), request("PUT", "/1", body)).await;

        // Passing validation and deserialization means the store was called.
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(store.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn store_failures_become_opaque_500s() {
        let store = Arc::new(BrokenStore::default());

        let (status, body) = send(app(store.clone()), request("PUT", "/1", edit_body())).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body, json!({"message": bookstore_http::error::INTERNAL_ERROR_MESSAGE}));

        let list = Request::builder().uri("/").body(Body::empty()).unwrap();
        let (status, _) = send(app(store.clone()), list).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);

        assert_eq!(store.calls.load(Ordering::SeqCst), 2);
    }
}
