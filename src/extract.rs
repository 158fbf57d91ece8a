//! Body and query extractors whose rejections use the JSON error body.
//!
//! axum's own `Json` and `Query` reject with plain text and stop at the first
//! bad field. These wrappers turn every rejection into an `AppError`, and a
//! JSON body with values of the wrong type is reported field by field.

use std::{error::Error as _, sync::LazyLock};

use axum::{
    Json,
    extract::{
        FromRequest, FromRequestParts, Query, Request,
        rejection::{JsonDataError, JsonRejection, QueryRejection},
    },
    http::request::Parts,
};
use regex::Regex;
use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::{
    error::{AppError, ValidationErrors},
    validation::Validate,
};

static SOURCE_POSITION: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r" at line \d+ column \d+$").expect("position regex is valid")
});
static MISSING_FIELD: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^missing field `([^`]+)`").expect("field regex is valid"));

// Field name used when a problem cannot be tied to a top-level key.
const BODY_FIELD: &str = "body";

/// ApiJson
///
/// JSON request body. Syntax errors are 400 and a missing JSON content type
/// is 415. Type errors become `AppError::Validation` listing every offending
/// top-level field plus whatever the remaining fields fail on their own.
#[derive(Debug, Clone)]
pub struct ApiJson<T>(pub T);

impl<S, T> FromRequest<S> for ApiJson<T>
where
    T: DeserializeOwned + Validate,
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let Json(body) = Json::<Value>::from_request(req, state).await?;
        decode(body).map(ApiJson)
    }
}

/// ApiQuery
///
/// Query string extractor. Malformed values and unknown parameters are 400.
#[derive(Debug, Clone)]
pub struct ApiQuery<T>(pub T);

impl<S, T> FromRequestParts<S> for ApiQuery<T>
where
    T: DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let Query(value) = Query::<T>::from_request_parts(parts, state).await?;
        Ok(ApiQuery(value))
    }
}

impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        match rejection {
            JsonRejection::JsonDataError(err) => {
                let (field, reason) = describe(&err);
                let mut errors = ValidationErrors::new();
                errors.add(&field, reason);
                AppError::Validation(errors)
            }
            JsonRejection::MissingJsonContentType(_) => AppError::UnsupportedMediaType,
            other => AppError::BadRequest(other.body_text()),
        }
    }
}

impl From<QueryRejection> for AppError {
    fn from(rejection: QueryRejection) -> Self {
        AppError::BadRequest(rejection.body_text())
    }
}

/// decode
///
/// Deserializes `body` into `T`. On a type error the offending top-level key
/// is recorded and dropped, and decoding is retried until the rest fits. The
/// payload's own shape checks then fill in every field not yet reported.
fn decode<T>(mut body: Value) -> Result<T, AppError>
where
    T: DeserializeOwned + Validate,
{
    let mut errors = ValidationErrors::new();

    loop {
        let bytes = serde_json::to_vec(&body).map_err(|err| AppError::Internal(err.to_string()))?;
        match Json::<T>::from_bytes(&bytes) {
            Ok(Json(parsed)) if errors.is_empty() => return Ok(parsed),
            Ok(Json(parsed)) => {
                errors.merge(parsed.problems());
                return Err(AppError::Validation(errors));
            }
            Err(JsonRejection::JsonDataError(err)) => {
                let (field, reason) = describe(&err);
                let seen = errors.has(&field);
                errors.add(&field, reason);

                let dropped = !seen
                    && body
                        .as_object_mut()
                        .and_then(|fields| fields.remove(&field))
                        .is_some();
                if !dropped {
                    return Err(AppError::Validation(errors));
                }
            }
            Err(other) => return Err(other.into()),
        }
    }
}

/// Top-level field and reason of a type error, read from the path-annotated
/// deserializer message (`roles[0]: unknown variant ...`).
fn describe(err: &JsonDataError) -> (String, String) {
    let detail = err
        .source()
        .map(ToString::to_string)
        .unwrap_or_else(|| err.body_text());
    let detail = SOURCE_POSITION.replace(&detail, "");

    if let Some((path, reason)) = detail
        .split_once(": ")
        .filter(|(path, _)| !path.contains(char::is_whitespace))
    {
        return (top_level(path).to_string(), reason.to_string());
    }
    if let Some(caps) = MISSING_FIELD.captures(&detail) {
        return (caps[1].to_string(), "is required".to_string());
    }
    (BODY_FIELD.to_string(), detail.into_owned())
}

fn top_level(path: &str) -> &str {
    path.split(['.', '['])
        .next()
        .filter(|key| !key.is_empty() && *key != "?")
        .unwrap_or(BODY_FIELD)
}

