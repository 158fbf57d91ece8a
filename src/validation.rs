use std::sync::LazyLock;

use regex::Regex;

use crate::{
    error::ValidationErrors,
    models::{IbanRequest, LoginRequest, Role, UserRequest},
};

pub const IBAN_LENGTH: usize = 24;
pub const IBAN_PREFIX: &str = "MD";
pub const IBAN_NUMERIC_SUFFIX: usize = 14;

pub const MIN_YEAR: i32 = 2000;
pub const MAX_YEAR: i32 = 2099;

pub const USERNAME_MIN: usize = 3;
pub const USERNAME_MAX: usize = 20;
pub const PASSWORD_MIN: usize = 6;
pub const PASSWORD_MAX: usize = 40;
pub const FULL_NAME_MIN: usize = 2;
pub const FULL_NAME_MAX: usize = 100;

static EMAIL_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").expect("email regex is valid"));

/// Validate
///
/// Shape checks a request body can run on itself, without the store. Used by
/// the JSON extractor to report the remaining problems of a body that had
/// fields of the wrong type.
pub trait Validate {
    fn problems(&self) -> ValidationErrors;
}

impl Validate for IbanRequest {
    fn problems(&self) -> ValidationErrors {
        validate_iban_request(self)
    }
}

// Whether a password is required depends on the route, so the lenient rule applies here.
impl Validate for UserRequest {
    fn problems(&self) -> ValidationErrors {
        validate_user_request(self, UserMode::Update)
    }
}

impl Validate for LoginRequest {
    fn problems(&self) -> ValidationErrors {
        ValidationErrors::new()
    }
}

/// Whether the user form is creating an account or editing one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UserMode {
    Create,
    Update,
}

/// Every reason `code` is not a valid Moldovan IBAN. Empty means valid.
///
/// Valid: exactly 24 characters, `MD` prefix, only uppercase ASCII letters and
/// digits, last 14 characters all digits. No case folding is applied.
pub fn iban_code_problems(code: &str) -> Vec<String> {
    if code.is_empty() {
        return vec!["IBAN code is required".to_string()];
    }

    let mut problems = Vec::new();
    let chars: Vec<char> = code.chars().collect();

    if chars.len() != IBAN_LENGTH {
        problems.push(format!("must be exactly {IBAN_LENGTH} characters long"));
    }
    if !code.starts_with(IBAN_PREFIX) {
        problems.push(format!("must start with '{IBAN_PREFIX}'"));
    }
    if !chars
        .iter()
        .all(|c| c.is_ascii_uppercase() || c.is_ascii_digit())
    {
        problems.push("must contain only uppercase letters and digits".to_string());
    }
    let suffix_is_numeric = chars.len() >= IBAN_NUMERIC_SUFFIX
        && chars[chars.len() - IBAN_NUMERIC_SUFFIX..]
            .iter()
            .all(char::is_ascii_digit);
    if !suffix_is_numeric {
        problems.push(format!(
            "last {IBAN_NUMERIC_SUFFIX} characters must be digits"
        ));
    }

    problems
}

pub fn is_valid_iban_code(code: &str) -> bool {
    iban_code_problems(code).is_empty()
}

pub fn is_valid_email(email: &str) -> bool {
    EMAIL_RE.is_match(email)
}

/// Shape checks on an IBAN payload that need no lookups. Reference checks
/// (eco code, locality, district) happen in the record store.
pub fn validate_iban_request(req: &IbanRequest) -> ValidationErrors {
    let mut errors = ValidationErrors::new();

    for problem in iban_code_problems(&req.iban_code) {
        errors.add("ibanCode", problem);
    }

    match req.year {
        None => errors.add("year", "year is required"),
        Some(year) if !(MIN_YEAR..=MAX_YEAR).contains(&year) => {
            errors.add("year", format!("must be between {MIN_YEAR} and {MAX_YEAR}"))
        }
        Some(_) => {}
    }

    if req.eco_code.trim().is_empty() {
        errors.add("ecoCode", "eco code is required");
    }
    if req.locality_code.trim().is_empty() {
        errors.add("localityCode", "locality code is required");
    }

    errors
}

/// Shape checks on a user payload. District existence and uniqueness of
/// username/email are checked against the store by the caller.
pub fn validate_user_request(req: &UserRequest, mode: UserMode) -> ValidationErrors {
    let mut errors = ValidationErrors::new();

    let username_len = req.username.trim().chars().count();
    if username_len < USERNAME_MIN {
        errors.add(
            "username",
            format!("must be at least {USERNAME_MIN} characters"),
        );
    } else if username_len > USERNAME_MAX {
        errors.add(
            "username",
            format!("must be at most {USERNAME_MAX} characters"),
        );
    }

    let password = req.password.as_deref().unwrap_or("");
    if password.is_empty() {
        if mode == UserMode::Create {
            errors.add("password", "password is required");
        }
    } else {
        let len = password.chars().count();
        if len < PASSWORD_MIN {
            errors.add(
                "password",
                format!("must be at least {PASSWORD_MIN} characters"),
            );
        } else if len > PASSWORD_MAX {
            errors.add(
                "password",
                format!("must be at most {PASSWORD_MAX} characters"),
            );
        }
    }

    let full_name_len = req.full_name.trim().chars().count();
    if full_name_len < FULL_NAME_MIN || full_name_len > FULL_NAME_MAX {
        errors.add(
            "fullName",
            format!("must be between {FULL_NAME_MIN} and {FULL_NAME_MAX} characters"),
        );
    }

    if req.email.trim().is_empty() {
        errors.add("email", "email is required");
    } else if !is_valid_email(req.email.trim()) {
        errors.add("email", "email is not well-formed");
    }

    if req.roles.is_empty() {
        errors.add("roles", "at least one role must be selected");
    }

    let has_district = req
        .district_code
        .as_deref()
        .is_some_and(|code| !code.trim().is_empty());
    if req.roles.contains(&Role::OperatorRaion) && !has_district {
        errors.add(
            "districtCode",
            "a district is required for the OPERATOR_RAION role",
        );
    }

    errors
}
