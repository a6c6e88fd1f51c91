//! Extractors whose rejections are reported as [`AppError`] JSON bodies.

use axum::{
    body::Bytes,
    extract::{FromRequest, FromRequestParts, Path, Query, Request},
    http::request::Parts,
};
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};

use crate::error::AppError;

/// Untyped JSON request body.
///
/// An empty body is read as an empty object so that schema validation,
/// not the extractor, reports the missing fields. The `Content-Type`
/// header is not inspected.
#[derive(Debug, Clone, PartialEq)]
pub struct JsonDocument(pub Value);

impl<S> FromRequest<S> for JsonDocument
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let bytes = Bytes::from_request(req, state)
            .await
            .map_err(|rejection| AppError::rejected(rejection.status(), rejection.body_text()))?;

        parse_document(&bytes).map(JsonDocument)
    }
}

/// [`Path`] with a JSON rejection.
#[derive(Debug, Clone, PartialEq)]
pub struct PathParam<T>(pub T);

impl<S, T> FromRequestParts<S> for PathParam<T>
where
    T: DeserializeOwned + Send,
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        Path::<T>::from_request_parts(parts, state)
            .await
            .map(|Path(value)| PathParam(value))
            .map_err(|rejection| AppError::rejected(rejection.status(), rejection.body_text()))
    }
}

/// [`Query`] with a JSON rejection.
#[derive(Debug, Clone, PartialEq)]
pub struct QueryParams<T>(pub T);

impl<S, T> FromRequestParts<S> for QueryParams<T>
where
    T: DeserializeOwned + Send,
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        Query::<T>::from_request_parts(parts, state)
            .await
            .map(|Query(value)| QueryParams(value))
            .map_err(|rejection| AppError::rejected(rejection.status(), rejection.body_text()))
    }
}

fn parse_document(bytes: &[u8]) -> Result<Value, AppError> {
    if bytes.iter().all(u8::is_ascii_whitespace) {
        return Ok(Value::Object(Map::new()));
    }

    serde_json::from_slice(bytes)
        .map_err(|err| AppError::invalid(format!("request body is not valid JSON: {}", err)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{body::Body, http::StatusCode};
    use serde_json::json;
    use std::collections::BTreeMap;

    #[tokio::test]
    async fn oversized_body_is_payload_too_large() {
        // Larger than axum's default 2 MiB body limit
        let body = vec![b' '; 3 * 1024 * 1024];
        let request = Request::builder()
            .method("POST")
            .uri("/books")
            .body(Body::from(body))
            .unwrap();

        let err = JsonDocument::from_request(request, &()).await.unwrap_err();
        assert_eq!(err.status_code(), StatusCode::PAYLOAD_TOO_LARGE);
    }

    #[tokio::test]
    async fn query_rejection_is_a_json_bad_request() {
        let request = Request::builder()
            .uri("/books?pages=many")
            .body(())
            .unwrap();
        let (mut parts, _) = request.into_parts();

        let err = QueryParams::<BTreeMap<String, u32>>::from_request_parts(&mut parts, &())
            .await
            .unwrap_err();
        assert_eq!(err.status_code(), StatusCode::BAD_REQUEST);
        assert!(matches!(err.body().message, crate::error::ErrorMessage::Single(_)));
    }

    #[test]
    fn empty_body_is_an_empty_object() {
        assert_eq!(parse_document(b"").unwrap(), json!({}));
        assert_eq!(parse_document(b" \n").unwrap(), json!({}));
    }

    #[test]
    fn body_is_parsed_as_json() {
        assert_eq!(
            parse_document(br#"{"pages": 400}"#).unwrap(),
            json!({"pages": 400})
        );
        assert_eq!(parse_document(b"[1, 2]").unwrap(), json!([1, 2]));
    }

    #[test]
    fn malformed_body_is_a_validation_error() {
        match parse_document(b"{\"title\":") {
            Err(AppError::Validation { message }) => {
                assert!(message.to_string().starts_with("request body is not valid JSON"))
            }
            other => panic!("expected validation error, got {:?}", other),
        }
    }
}
