use axum::{
    body::Body,
    extract::{FromRequest, FromRequestParts},
    http::{Request, header},
};
use iban_registry::{
    AppError,
    extract::{ApiJson, ApiQuery},
    models::{FilterCriteria, IbanRequest, LoginRequest, UserRequest},
};
use serde_json::{Value, json};

// --- Helper Functions ---

fn json_request(body: &Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri("/")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

fn failing_fields(err: AppError) -> Vec<String> {
    match err {
        AppError::Validation(errors) => errors.fields().map(str::to_string).collect(),
        other => panic!("expected a validation error, got {other:?}"),
    }
}

async fn decode<T>(body: Value) -> Result<T, AppError>
where
    T: serde::de::DeserializeOwned + iban_registry::validation::Validate,
{
    ApiJson::<T>::from_request(json_request(&body), &())
        .await
        .map(|ApiJson(value)| value)
}

// --- JSON Bodies ---

#[tokio::test]
async fn test_valid_body_decodes() {
    let parsed: IbanRequest = decode(json!({ "ibanCode": "MD12AGRN0000123456789012", "year": 2024 }))
        .await
        .unwrap();
    assert_eq!(parsed.year, Some(2024));
    assert_eq!(parsed.iban_code, "MD12AGRN0000123456789012");
}

#[tokio::test]
async fn test_wrong_type_is_reported_with_every_other_problem() {
    let err = decode::<IbanRequest>(json!({
        "ibanCode": "md12",
        "year": "2024",
        "ecoCode": "",
        "localityCode": ""
    }))
    .await
    .unwrap_err();
    assert_eq!(
        failing_fields(err),
        vec!["ecoCode", "ibanCode", "localityCode", "year"]
    );
}

#[tokio::test]
async fn test_every_mistyped_field_is_listed() {
    let err = decode::<IbanRequest>(json!({
        "ibanCode": 42,
        "year": "2024",
        "ecoCode": "111110",
        "localityCode": ["0101"]
    }))
    .await
    .unwrap_err();
    assert_eq!(
        failing_fields(err),
        vec!["ibanCode", "localityCode", "year"]
    );
}

#[tokio::test]
async fn test_unknown_role_is_reported_on_roles() {
    let err = decode::<UserRequest>(json!({
        "username": "nina",
        "password": "secret1",
        "fullName": "Nina Lungu",
        "email": "nina@primaria.md",
        "roles": ["ADMIN", "SUPERUSER"]
    }))
    .await
    .unwrap_err();
    match err {
        AppError::Validation(errors) => {
            assert!(errors.has("roles"));
            assert_eq!(errors.fields().count(), 1);
        }
        other => panic!("expected a validation error, got {other:?}"),
    }
}

#[tokio::test]
async fn test_missing_required_field_is_named() {
    let err = decode::<LoginRequest>(json!({ "password": "x" }))
        .await
        .unwrap_err();
    assert_eq!(failing_fields(err), vec!["username"]);
}

#[tokio::test]
async fn test_non_object_body_is_reported_on_body() {
    let err = decode::<IbanRequest>(json!([1, 2])).await.unwrap_err();
    assert_eq!(failing_fields(err), vec!["body"]);
}

#[tokio::test]
async fn test_syntax_error_is_bad_request() {
    let request = Request::builder()
        .method("POST")
        .uri("/")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from("{\"year\": "))
        .unwrap();
    let err = ApiJson::<IbanRequest>::from_request(request, &())
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::BadRequest(_)));
    assert_eq!(err.status_code(), axum::http::StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_missing_content_type_is_unsupported() {
    let request = Request::builder()
        .method("POST")
        .uri("/")
        .body(Body::from("{}"))
        .unwrap();
    let err = ApiJson::<IbanRequest>::from_request(request, &())
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::UnsupportedMediaType));
}

// --- Query Strings ---

#[tokio::test]
async fn test_query_rejects_unknown_parameter() {
    let (mut parts, _) = Request::builder()
        .uri("/ibans?year=2024&bogus=1")
        .body(())
        .unwrap()
        .into_parts();
    let result = ApiQuery::<FilterCriteria>::from_request_parts(&mut parts, &()).await;
    assert!(matches!(result, Err(AppError::BadRequest(_))));
}

#[tokio::test]
async fn test_query_parses_known_parameters() {
    let (mut parts, _) = Request::builder()
        .uri("/ibans?year=2024&raionCode=0300")
        .body(())
        .unwrap()
        .into_parts();
    let ApiQuery(criteria) = ApiQuery::<FilterCriteria>::from_request_parts(&mut parts, &())
        .await
        .unwrap();
    assert_eq!(criteria.year, Some(2024));
    assert_eq!(criteria.district_code.as_deref(), Some("0300"));
}
