//! Runtime validation of untyped book documents.
//!
//! Payloads are checked against the JSON Schemas under `schemas/` before
//! anything is deserialized into [`Book`](super::models::Book) or
//! [`BookChanges`](super::models::BookChanges).

use anyhow::anyhow;
use jsonschema::{Draft, JSONSchema};
use serde_json::Value;

const CREATE_SCHEMA: &str = include_str!("../../../schemas/book_create.json");
const EDIT_SCHEMA: &str = include_str!("../../../schemas/book_edit.json");

/// Which schema a document is checked against.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchemaKind {
    /// Every field including `isbn`
    Create,
    /// Every field except `isbn`
    Edit,
}

/// Outcome of a validation run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Validation {
    Valid,
    /// Violation messages in the order the schema engine reported them
    Invalid(Vec<String>),
}

impl Validation {
    pub fn is_valid(&self) -> bool {
        matches!(self, Validation::Valid)
    }
}

/// Compiled create and edit schemas.
pub struct BookValidator {
    create: JSONSchema,
    edit: JSONSchema,
}

impl BookValidator {
    /// Compile the bundled schemas.
    pub fn new() -> anyhow::Result<Self> {
        Ok(Self {
            create: compile("book_create", CREATE_SCHEMA)?,
            edit: compile("book_edit", EDIT_SCHEMA)?,
        })
    }

    /// Check `document` against the schema for `kind`. Never panics on bad input.
    pub fn validate(&self, document: &Value, kind: SchemaKind) -> Validation {
        let schema = match kind {
            SchemaKind::Create => &self.create,
            SchemaKind::Edit => &self.edit,
        };

        match schema.validate(document) {
            Ok(()) => Validation::Valid,
            Err(errors) => Validation::Invalid(
                errors
                    .map(|error| format!("instance{}: {}", error.instance_path, error))
                    .collect(),
            ),
        }
    }
}

/// Rewrite integral floats (`400.0`) among an object's top-level values as
/// integers. The schemas accept them as integers but serde's `i32` does not.
pub fn normalize_integers(document: &mut Value) {
    let Some(fields) = document.as_object_mut() else {
        return;
    };

    for value in fields.values_mut() {
        if !value.is_f64() {
            continue;
        }
        let Some(number) = value.as_f64() else {
            continue;
        };
        if number.fract() == 0.0 && number >= i64::MIN as f64 && number < i64::MAX as f64 {
            *value = Value::from(number as i64);
        }
    }
}

fn compile(name: &str, source: &str) -> anyhow::Result<JSONSchema> {
    let schema: Value = serde_json::from_str(source)
        .map_err(|err| anyhow!("schema '{}' is not valid JSON: {}", name, err))?;

    let compiled = JSONSchema::options()
        .with_draft(Draft::Draft7)
        .compile(&schema)
        .map_err(|err| anyhow!("schema '{}' failed to compile: {}", name, err))?;

    Ok(compiled)
}
