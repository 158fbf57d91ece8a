use std::{collections::BTreeSet, fmt, str::FromStr};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize, de};
use sqlx::FromRow;
use thiserror::Error;
use ts_rs::TS;
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;

// --- Roles ---

/// Role
///
/// The closed set of capabilities an account can hold. Capabilities are additive:
/// an account holding several roles gets the union of their permissions.
/// Input accepts the legacy `ROLE_` prefix; output always uses the bare name.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS, ToSchema,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[ts(export)]
pub enum Role {
    #[serde(alias = "ROLE_ADMIN")]
    Admin,
    #[serde(alias = "ROLE_OPERATOR")]
    Operator,
    #[serde(alias = "ROLE_OPERATOR_RAION")]
    OperatorRaion,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Admin => "ADMIN",
            Role::Operator => "OPERATOR",
            Role::OperatorRaion => "OPERATOR_RAION",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
#[error("unknown role `{0}`")]
pub struct UnknownRole(pub String);

impl FromStr for Role {
    type Err = UnknownRole;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        match raw.strip_prefix("ROLE_").unwrap_or(raw) {
            "ADMIN" => Ok(Role::Admin),
            "OPERATOR" => Ok(Role::Operator),
            "OPERATOR_RAION" => Ok(Role::OperatorRaion),
            _ => Err(UnknownRole(raw.to_string())),
        }
    }
}

/// RoleSet
///
/// Set of roles held by one account. All authorization questions are answered
/// by the capability methods below rather than by comparing role names.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RoleSet(BTreeSet<Role>);

impl RoleSet {
    pub fn contains(&self, role: Role) -> bool {
        self.0.contains(&role)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = Role> + '_ {
        self.0.iter().copied()
    }

    pub fn to_vec(&self) -> Vec<Role> {
        self.iter().collect()
    }

    /// Role names as persisted in the `accounts.roles` column.
    pub fn to_strings(&self) -> Vec<String> {
        self.iter().map(|role| role.as_str().to_string()).collect()
    }

    /// ADMIN and OPERATOR may create, edit and delete IBAN records.
    pub fn can_edit_ibans(&self) -> bool {
        self.contains(Role::Admin) || self.contains(Role::Operator)
    }

    pub fn can_manage_users(&self) -> bool {
        self.contains(Role::Admin)
    }

    /// True when the only IBAN visibility this set grants is the district one.
    pub fn is_district_scoped(&self) -> bool {
        self.contains(Role::OperatorRaion) && !self.can_edit_ibans()
    }
}

impl FromIterator<Role> for RoleSet {
    fn from_iter<I: IntoIterator<Item = Role>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl TryFrom<Vec<String>> for RoleSet {
    type Error = UnknownRole;

    fn try_from(raw: Vec<String>) -> Result<Self, Self::Error> {
        raw.iter().map(|name| name.parse::<Role>()).collect()
    }
}

// --- Core Application Schemas (Mapped to Database) ---

/// Account
///
/// A staff account from the `accounts` table. Never serialized directly: the
/// password hash stays server-side and `UserResponse` is what leaves the service.
#[derive(Debug, Clone, FromRow)]
pub struct Account {
    pub id: Uuid,
    pub username: String,
    pub password_hash: String,
    pub full_name: String,
    pub email: String,
    #[sqlx(try_from = "Vec<String>")]
    pub roles: RoleSet,
    pub district_code: Option<String>,
    // Loaded via a LEFT JOIN on `districts`.
    #[sqlx(default)]
    pub district_name: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl Account {
    /// The district that limits this account's IBAN visibility, if any.
    /// A district stored on a non district-operator account is ignored.
    pub fn scope_district(&self) -> Option<&str> {
        if self.roles.contains(Role::OperatorRaion) {
            self.district_code.as_deref().filter(|code| !code.is_empty())
        } else {
            None
        }
    }
}

/// District ("raion"). Immutable reference data.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS, ToSchema, FromRow, Default)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct District {
    pub code: String,
    pub name: String,
}

/// Locality, identified by its code within the owning district.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS, ToSchema, FromRow, Default)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct Locality {
    pub code: String,
    pub name: String,
    pub district_code: String,
}

/// Economic classification code.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS, ToSchema, FromRow, Default)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct EcoCode {
    pub code: String,
    pub label: String,
}

/// IbanView
///
/// An IBAN record joined with the display names of its eco code, district and
/// locality. This is the shape every read path returns.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS, ToSchema, FromRow, Default)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct IbanView {
    pub id: i64,
    pub iban_code: String,
    pub year: i32,
    pub eco_code: String,
    pub eco_label: String,
    pub district_code: String,
    pub district_name: String,
    pub locality_code: String,
    pub locality_name: String,
}

/// A validated IBAN record ready to be written.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IbanDraft {
    pub iban_code: String,
    pub year: i32,
    pub eco_code: String,
    pub district_code: String,
    pub locality_code: String,
}

/// Fields of a new account, password already hashed.
#[derive(Debug, Clone)]
pub struct NewAccount {
    pub username: String,
    pub password_hash: String,
    pub full_name: String,
    pub email: String,
    pub roles: RoleSet,
    pub district_code: Option<String>,
}

/// Replacement fields for an existing account. `password_hash: None` keeps the stored hash.
#[derive(Debug, Clone)]
pub struct AccountChanges {
    pub username: String,
    pub password_hash: Option<String>,
    pub full_name: String,
    pub email: String,
    pub roles: RoleSet,
    pub district_code: Option<String>,
}

// --- Query Parameters ---

/// FilterCriteria
///
/// The fixed set of IBAN filter fields. Absent fields are wildcards; present
/// fields are ANDed. Unknown query parameters are rejected, and empty values
/// (`?ecoCode=`) count as absent.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, IntoParams)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
#[into_params(parameter_in = Query)]
pub struct FilterCriteria {
    #[serde(default, deserialize_with = "empty_as_none")]
    pub year: Option<i32>,
    #[serde(default, deserialize_with = "empty_as_none")]
    pub eco_code: Option<String>,
    /// Also accepted as `raionCode`.
    #[serde(default, alias = "raionCode", deserialize_with = "empty_as_none")]
    pub district_code: Option<String>,
    #[serde(default, deserialize_with = "empty_as_none")]
    pub locality_code: Option<String>,
}

/// Optional year narrowing for `GET /ibans/raion/{districtCode}`.
#[derive(Debug, Clone, Default, Deserialize, IntoParams)]
#[serde(deny_unknown_fields)]
#[into_params(parameter_in = Query)]
pub struct YearQuery {
    #[serde(default, deserialize_with = "empty_as_none")]
    pub year: Option<i32>,
}

fn empty_as_none<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: FromStr,
    T::Err: fmt::Display,
{
    let raw = Option::<String>::deserialize(deserializer)?;
    match raw.as_deref().map(str::trim) {
        None | Some("") => Ok(None),
        Some(value) => value.parse::<T>().map(Some).map_err(de::Error::custom),
    }
}

// --- Request Payloads (Input Schemas) ---

/// LoginRequest
///
/// Credentials for `POST /auth/login`. The password is only ever compared
/// against the stored hash and never logged.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

/// IbanRequest
///
/// Payload for creating or replacing an IBAN record. Every field defaults so
/// that missing values surface as field-level validation errors instead of a
/// single deserialization failure.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct IbanRequest {
    #[serde(default)]
    #[schema(example = "MD12AGRN0000123456789012")]
    pub iban_code: String,
    #[serde(default)]
    pub year: Option<i32>,
    #[serde(default)]
    pub eco_code: String,
    /// When omitted, the locality's owning district is used.
    #[serde(default, alias = "raionCode")]
    pub district_code: Option<String>,
    #[serde(default)]
    pub locality_code: String,
}

/// UserRequest
///
/// Payload for `POST /users` and `PUT /users/{id}`. On update an empty or
/// missing password leaves the stored one unchanged.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct UserRequest {
    #[serde(default)]
    pub username: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,
    #[serde(default, alias = "full_name", alias = "name")]
    pub full_name: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub roles: Vec<Role>,
    #[serde(default, alias = "raionCode", skip_serializing_if = "Option::is_none")]
    pub district_code: Option<String>,
}

// --- Response Schemas (Output) ---

/// LoginResponse
///
/// Returned by a successful login: the bearer token plus the identity it carries,
/// so the client never has to decode the token itself.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct LoginResponse {
    pub token: String,
    pub token_type: String,
    pub id: Uuid,
    pub username: String,
    pub email: String,
    pub roles: Vec<Role>,
    pub district_code: Option<String>,
    #[ts(type = "string")]
    pub expires_at: DateTime<Utc>,
}

/// Identity of the current caller, as carried by the session token.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct MeResponse {
    pub id: Uuid,
    pub username: String,
    pub roles: Vec<Role>,
    pub district_code: Option<String>,
}

/// Public view of an account.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS, ToSchema)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct UserResponse {
    pub id: Uuid,
    pub username: String,
    pub full_name: String,
    pub email: String,
    pub roles: Vec<Role>,
    pub district_code: Option<String>,
    pub district_name: Option<String>,
}

impl From<Account> for UserResponse {
    fn from(account: Account) -> Self {
        Self {
            id: account.id,
            username: account.username,
            full_name: account.full_name,
            email: account.email,
            roles: account.roles.to_vec(),
            district_code: account.district_code,
            district_name: account.district_name,
        }
    }
}
