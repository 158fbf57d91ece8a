//! Authorization policy.
//!
//! Two questions are answered here, both as pure functions of the caller:
//! whether an action is allowed at all, and which IBAN rows the caller may see.
//! District operators are confined to their own district; their scope always
//! overrides any district value the client sent.

use crate::{
    auth::AuthUser,
    error::{AppError, AppResult},
    models::FilterCriteria,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    ViewReferenceData,
    ViewIban,
    CreateIban,
    UpdateIban,
    DeleteIban,
    ManageUsers,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    Allow,
    Deny,
}

/// Which IBAN rows a caller may see.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Scope {
    /// ADMIN / OPERATOR: every record.
    Unrestricted,
    /// District operator: only records of this district.
    District(String),
    /// No readable records (no IBAN role, or a district operator with no district).
    Nothing,
}

pub fn scope_of(caller: &AuthUser) -> Scope {
    let roles = &caller.roles;
    if roles.can_edit_ibans() {
        Scope::Unrestricted
    } else if roles.is_district_scoped() {
        match caller.district_code.as_deref().filter(|code| !code.is_empty()) {
            Some(code) => Scope::District(code.to_string()),
            None => Scope::Nothing,
        }
    } else {
        Scope::Nothing
    }
}

/// authorize
///
/// Decides whether `caller` may perform `action`. For `ViewIban`,
/// `resource_district` is the district of the record being read; a scoped
/// caller is denied records of any other district.
pub fn authorize(caller: &AuthUser, action: Action, resource_district: Option<&str>) -> Decision {
    let roles = &caller.roles;
    let allowed = match action {
        Action::ViewReferenceData => true,
        Action::ViewIban => match scope_of(caller) {
            Scope::Unrestricted => true,
            Scope::District(own) => resource_district.is_none_or(|district| district == own),
            Scope::Nothing => false,
        },
        Action::CreateIban | Action::UpdateIban | Action::DeleteIban => roles.can_edit_ibans(),
        Action::ManageUsers => roles.can_manage_users(),
    };

    if allowed { Decision::Allow } else { Decision::Deny }
}

/// `authorize` without a resource district, mapped to `AppError::Forbidden` on deny.
pub fn require(caller: &AuthUser, action: Action) -> AppResult<()> {
    match authorize(caller, action, None) {
        Decision::Allow => Ok(()),
        Decision::Deny => {
            tracing::warn!(username = %caller.username, ?action, "Action denied");
            Err(AppError::Forbidden)
        }
    }
}

/// effective_criteria
///
/// The filter actually run for `caller`. Unrestricted callers get `requested`
/// unchanged; district operators get it with the district forced to their own.
/// A caller with no readable scope is refused with `AppError::Forbidden`.
pub fn effective_criteria(caller: &AuthUser, requested: FilterCriteria) -> AppResult<FilterCriteria> {
    match scope_of(caller) {
        Scope::Unrestricted => Ok(requested),
        Scope::District(own) => Ok(FilterCriteria {
            district_code: Some(own),
            ..requested
        }),
        Scope::Nothing => {
            tracing::warn!(username = %caller.username, "No readable IBAN scope");
            Err(AppError::Forbidden)
        }
    }
}
