use axum::{
    extract::{FromRef, FromRequestParts},
    http::{header, request::Parts},
};
use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{DecodingKey, EncodingKey, Header, Validation, decode, encode, errors::ErrorKind};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
    config::AppConfig,
    error::{AppError, AppResult},
    models::{Account, LoginRequest, LoginResponse, MeResponse, RoleSet},
    password,
    repository::Repository,
};

/// Claims
///
/// Payload of a session token. Everything authorization needs travels inside
/// the signed token, so validating a request requires no storage round-trip.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// Subject (sub): the account id.
    pub sub: Uuid,
    pub username: String,
    pub roles: RoleSet,
    /// Present only for district operators.
    #[serde(
        rename = "districtCode",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub district_code: Option<String>,
    /// Expiration Time (exp), seconds since the epoch.
    pub exp: usize,
    /// Issued At (iat), seconds since the epoch.
    pub iat: usize,
}

/// AuthUser
///
/// The validated identity of the caller. Every protected operation receives it
/// explicitly; nothing reads a "current user" from ambient state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthUser {
    pub id: Uuid,
    pub username: String,
    pub roles: RoleSet,
    pub district_code: Option<String>,
}

impl From<Claims> for AuthUser {
    fn from(claims: Claims) -> Self {
        Self {
            id: claims.sub,
            username: claims.username,
            roles: claims.roles,
            district_code: claims.district_code.filter(|code| !code.is_empty()),
        }
    }
}

impl From<&AuthUser> for MeResponse {
    fn from(user: &AuthUser) -> Self {
        Self {
            id: user.id,
            username: user.username.clone(),
            roles: user.roles.to_vec(),
            district_code: user.district_code.clone(),
        }
    }
}

/// Sign a session token for `account`, valid for the configured lifetime.
pub fn issue_token(account: &Account, config: &AppConfig) -> AppResult<(String, DateTime<Utc>)> {
    let issued_at = Utc::now();
    let expires_at = issued_at + Duration::seconds(config.jwt_expiration_secs);

    let claims = Claims {
        sub: account.id,
        username: account.username.clone(),
        roles: account.roles.clone(),
        district_code: account.scope_district().map(str::to_string),
        exp: expires_at.timestamp() as usize,
        iat: issued_at.timestamp() as usize,
    };

    let key = EncodingKey::from_secret(config.jwt_secret.as_bytes());
    let token = encode(&Header::default(), &claims, &key)
        .map_err(|e| AppError::Internal(format!("token signing failed: {e}")))?;

    Ok((token, expires_at))
}

/// Verify signature and expiry of `token` and return its claims.
pub fn decode_token(token: &str, secret: &str) -> AppResult<Claims> {
    let decoding_key = DecodingKey::from_secret(secret.as_bytes());
    let mut validation = Validation::default();
    validation.validate_exp = true;

    match decode::<Claims>(token, &decoding_key, &validation) {
        Ok(data) => Ok(data.claims),
        Err(e) => {
            match e.kind() {
                ErrorKind::ExpiredSignature => tracing::debug!("Rejected expired token"),
                _ => tracing::debug!(error = %e, "Rejected invalid token"),
            }
            Err(AppError::Unauthenticated)
        }
    }
}

/// authenticate
///
/// Exchanges a username/password pair for a session token. An unknown username
/// and a wrong password fail identically, and both run one hash verification.
pub async fn authenticate(
    repo: &dyn Repository,
    config: &AppConfig,
    req: LoginRequest,
) -> AppResult<LoginResponse> {
    let account = repo.find_account_by_username(req.username.trim()).await?;

    let verified = match &account {
        Some(account) => password::verify_password(&req.password, &account.password_hash),
        None => password::verify_against_dummy(&req.password),
    };

    let account = match account {
        Some(account) if verified => account,
        _ => {
            tracing::warn!("Failed login attempt");
            return Err(AppError::InvalidCredentials);
        }
    };

    let (token, expires_at) = issue_token(&account, config)?;
    tracing::info!(username = %account.username, "User logged in");

    Ok(LoginResponse {
        token,
        token_type: "Bearer".to_string(),
        id: account.id,
        district_code: account.scope_district().map(str::to_string),
        username: account.username,
        email: account.email,
        roles: account.roles.to_vec(),
        expires_at,
    })
}

/// AuthUser Extractor Implementation
///
/// Makes `AuthUser` usable as a handler argument. The flow is:
/// 1. Pull `AppConfig` from the application state for the signing secret.
/// 2. Extract the `Authorization: Bearer <token>` header.
/// 3. Verify signature and expiry.
///
/// Rejection: `AppError::Unauthenticated` (401) on any failure.
impl<S> FromRequestParts<S> for AuthUser
where
    S: Send + Sync,
    AppConfig: FromRef<S>,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let config = AppConfig::from_ref(state);

        let token = parts
            .headers
            .get(header::AUTHORIZATION)
            .and_then(|value| value.to_str().ok())
            .and_then(|value| value.strip_prefix("Bearer "))
            .map(str::trim)
            .filter(|token| !token.is_empty())
            .ok_or(AppError::Unauthenticated)?;

        let claims = decode_token(token, &config.jwt_secret)?;
        Ok(AuthUser::from(claims))
    }
}
