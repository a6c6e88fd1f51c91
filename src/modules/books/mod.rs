pub mod models;
pub mod routes;
pub mod schema;
pub mod store;

use std::sync::Arc;

use async_trait::async_trait;
use axum::Router;
use bookstore_kernel::{InitCtx, Migration, Module};
use serde_json::json;
use utoipa::ToSchema;

use models::{Book, BookChanges};
use routes::BooksState;
use schema::BookValidator;
use store::BookStore;

/// The books resource: CRUD over [`Book`] records keyed by ISBN.
pub struct BooksModule {
    store: Arc<dyn BookStore>,
    validator: Arc<BookValidator>,
}

impl BooksModule {
    /// Build the module around `store`. Fails if the bundled schemas do not compile.
    pub fn new(store: Arc<dyn BookStore>) -> anyhow::Result<Self> {
        Ok(Self {
            store,
            validator: Arc::new(BookValidator::new()?),
        })
    }
}

/// Schema migrations for the `books` table.
pub fn migrations() -> Vec<Migration> {
    vec![Migration {
        id: "001_create_books",
        up: r#"
            CREATE TABLE IF NOT EXISTS books (
                isbn       TEXT PRIMARY KEY,
                amazon_url TEXT NOT NULL,
                author     TEXT NOT NULL,
                language   TEXT NOT NULL,
                pages      INTEGER NOT NULL CHECK (pages > 0),
                publisher  TEXT NOT NULL,
                title      TEXT NOT NULL,
                year       INTEGER NOT NULL
            );
            CREATE INDEX IF NOT EXISTS books_title_idx ON books (title);
            "#,
    }]
}

#[async_trait]
impl Module for BooksModule {
    fn name(&self) -> &'static str {
        "books"
    }

    async fn init(&self, ctx: &InitCtx<'_>) -> anyhow::Result<()> {
        tracing::info!(
            module = self.name(),
            environment = ?ctx.settings.environment,
            backend = ?ctx.settings.database.backend,
            "books module initialized"
        );
        Ok(())
    }

    fn routes(&self) -> Router {
        routes::router(BooksState::new(
            Arc::clone(&self.store),
            Arc::clone(&self.validator),
        ))
    }

    fn openapi(&self) -> Option<serde_json::Value> {
        let error = |description: &str| {
            json!({
                "description": description,
                "content": {
                    "application/json": {
                        "schema": { "$ref": "#/components/schemas/ErrorResponse" }
                    }
                }
            })
        };
        let book_envelope = |description: &str| {
            json!({
                "description": description,
                "content": {
                    "application/json": {
                        "schema": {
                            "type": "object",
                            "properties": { "book": { "$ref": "#/components/schemas/Book" } },
                            "required": ["book"]
                        }
                    }
                }
            })
        };
        let isbn_param = json!({
            "name": "isbn",
            "in": "path",
            "required": true,
            "schema": { "type": "string" }
        });

        Some(json!({
            "paths": {
                "/": {
                    "get": {
                        "summary": "List books",
                        "tags": ["Books"],
                        "responses": {
                            "200": {
                                "description": "All books ordered by title",
                                "content": {
                                    "application/json": {
                                        "schema": {
                                            "type": "object",
                                            "properties": {
                                                "books": {
                                                    "type": "array",
                                                    "items": { "$ref": "#/components/schemas/Book" }
                                                }
                                            },
                                            "required": ["books"]
                                        }
                                    }
                                }
                            },
                            "500": error("Internal server error")
                        }
                    },
                    "post": {
                        "summary": "Create a book",
                        "tags": ["Books"],
                        "requestBody": {
                            "required": true,
                            "content": {
                                "application/json": {
                                    "schema": { "$ref": "#/components/schemas/Book" }
                                }
                            }
                        },
                        "responses": {
                            "201": book_envelope("Created book"),
                            "400": error("Schema validation failed"),
                            "409": error("ISBN already exists"),
                            "500": error("Internal server error")
                        }
                    }
                },
                "/{isbn}": {
                    "get": {
                        "summary": "Get a book by ISBN",
                        "tags": ["Books"],
                        "parameters": [isbn_param.clone()],
                        "responses": {
                            "200": book_envelope("The book"),
                            "404": error("No book with this ISBN"),
                            "500": error("Internal server error")
                        }
                    },
                    "put": {
                        "summary": "Replace every field of a book except its ISBN",
                        "tags": ["Books"],
                        "parameters": [isbn_param.clone()],
                        "requestBody": {
                            "required": true,
                            "content": {
                                "application/json": {
                                    "schema": { "$ref": "#/components/schemas/BookChanges" }
                                }
                            }
                        },
                        "responses": {
                            "200": book_envelope("Updated book"),
                            "400": error("ISBN present in body or schema validation failed"),
                            "404": error("No book with this ISBN"),
                            "500": error("Internal server error")
                        }
                    },
                    "delete": {
                        "summary": "Delete a book",
                        "tags": ["Books"],
                        "parameters": [isbn_param],
                        "responses": {
                            "200": {
                                "description": "Book deleted",
                                "content": {
                                    "application/json": {
                                        "schema": {
                                            "type": "object",
                                            "properties": { "message": { "type": "string" } },
                                            "required": ["message"]
                                        }
                                    }
                                }
                            },
                            "404": error("No book with this ISBN"),
                            "500": error("Internal server error")
                        }
                    }
                }
            },
            "components": {
                "schemas": {
                    "Book": component::<Book>(),
                    "BookChanges": component::<BookChanges>()
                }
            }
        }))
    }

    fn migrations(&self) -> Vec<Migration> {
        migrations()
    }

    async fn start(&self, _ctx: &InitCtx<'_>) -> anyhow::Result<()> {
        tracing::info!(module = self.name(), "books module started");
        Ok(())
    }

    async fn stop(&self) -> anyhow::Result<()> {
        tracing::info!(module = self.name(), "books module stopped");
        Ok(())
    }
}

fn component<T: ToSchema>() -> serde_json::Value {
    serde_json::to_value(<T as utoipa::PartialSchema>::schema()).unwrap_or_default()
}
