use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// A catalogued book, keyed by its ISBN.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(deny_unknown_fields)]
pub struct Book {
    /// Business key, fixed at creation
    pub isbn: String,
    pub amazon_url: String,
    pub author: String,
    pub language: String,
    pub pages: i32,
    pub publisher: String,
    pub title: String,
    pub year: i32,
}

/// Full replacement of every mutable field of a [`Book`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(deny_unknown_fields)]
pub struct BookChanges {
    pub amazon_url: String,
    pub author: String,
    pub language: String,
    pub pages: i32,
    pub publisher: String,
    pub title: String,
    pub year: i32,
}

impl Book {
    /// Replace every mutable field, keeping the ISBN.
    pub fn apply(&mut self, changes: BookChanges) {
        let BookChanges {
            amazon_url,
            author,
            language,
            pages,
            publisher,
            title,
            year,
        } = changes;

        self.amazon_url = amazon_url;
        self.author = author;
        self.language = language;
        self.pages = pages;
        self.publisher = publisher;
        self.title = title;
        self.year = year;
    }
}

/// `{"book": ...}`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BookEnvelope {
    pub book: Book,
}

/// `{"books": [...]}`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BookList {
    pub books: Vec<Book>,
}

/// `{"message": "..."}`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MessageResponse {
    pub message: String,
}
