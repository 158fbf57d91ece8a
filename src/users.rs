//! User management. Every operation here is ADMIN-only.

use uuid::Uuid;

use crate::{
    auth::AuthUser,
    error::{AppError, AppResult, ValidationErrors},
    models::{AccountChanges, NewAccount, Role, RoleSet, UserRequest, UserResponse},
    password,
    policy::{self, Action},
    repository::Repository,
    validation::{self, UserMode},
};

pub async fn list(repo: &dyn Repository, caller: &AuthUser) -> AppResult<Vec<UserResponse>> {
    policy::require(caller, Action::ManageUsers)?;
    let accounts = repo.list_accounts().await?;
    Ok(accounts.into_iter().map(UserResponse::from).collect())
}

pub async fn get(repo: &dyn Repository, caller: &AuthUser, id: Uuid) -> AppResult<UserResponse> {
    policy::require(caller, Action::ManageUsers)?;
    repo.get_account(id)
        .await?
        .map(UserResponse::from)
        .ok_or(AppError::NotFound("User"))
}

pub async fn get_by_username(
    repo: &dyn Repository,
    caller: &AuthUser,
    username: &str,
) -> AppResult<UserResponse> {
    policy::require(caller, Action::ManageUsers)?;
    repo.find_account_by_username(username.trim())
        .await?
        .map(UserResponse::from)
        .ok_or(AppError::NotFound("User"))
}

/// create
///
/// Validates every field at once, then checks the district exists and that
/// username and email are free.
pub async fn create(
    repo: &dyn Repository,
    caller: &AuthUser,
    req: UserRequest,
) -> AppResult<UserResponse> {
    policy::require(caller, Action::ManageUsers)?;

    let fields = checked_fields(repo, &req, UserMode::Create).await?;
    ensure_unique(repo, &fields, None).await?;

    let plain = req.password.as_deref().unwrap_or_default();
    let account = repo
        .create_account(NewAccount {
            password_hash: password::hash_password(plain)?,
            username: fields.username,
            full_name: fields.full_name,
            email: fields.email,
            roles: fields.roles,
            district_code: fields.district_code,
        })
        .await?;

    tracing::info!(
        id = %account.id,
        username = %account.username,
        by = %caller.username,
        "User created"
    );
    Ok(account.into())
}

/// update
///
/// Replaces the account fields. An empty or missing password keeps the stored hash.
pub async fn update(
    repo: &dyn Repository,
    caller: &AuthUser,
    id: Uuid,
    req: UserRequest,
) -> AppResult<UserResponse> {
    policy::require(caller, Action::ManageUsers)?;

    if repo.get_account(id).await?.is_none() {
        return Err(AppError::NotFound("User"));
    }

    let fields = checked_fields(repo, &req, UserMode::Update).await?;
    ensure_unique(repo, &fields, Some(id)).await?;

    let password_hash = match req.password.as_deref().filter(|p| !p.is_empty()) {
        Some(plain) => Some(password::hash_password(plain)?),
        None => None,
    };

    let account = repo
        .update_account(
            id,
            AccountChanges {
                username: fields.username,
                password_hash,
                full_name: fields.full_name,
                email: fields.email,
                roles: fields.roles,
                district_code: fields.district_code,
            },
        )
        .await?
        .ok_or(AppError::NotFound("User"))?;

    tracing::info!(id = %account.id, by = %caller.username, "User updated");
    Ok(account.into())
}

pub async fn delete(repo: &dyn Repository, caller: &AuthUser, id: Uuid) -> AppResult<()> {
    policy::require(caller, Action::ManageUsers)?;

    if !repo.delete_account(id).await? {
        return Err(AppError::NotFound("User"));
    }
    tracing::info!(%id, by = %caller.username, "User deleted");
    Ok(())
}

/// ensure_bootstrap_admin
///
/// Creates an ADMIN account when the store holds no accounts at all.
/// Returns whether an account was created.
pub async fn ensure_bootstrap_admin(
    repo: &dyn Repository,
    username: &str,
    plain_password: &str,
) -> AppResult<bool> {
    if repo.count_accounts().await? > 0 {
        return Ok(false);
    }

    let account = repo
        .create_account(NewAccount {
            username: username.to_string(),
            password_hash: password::hash_password(plain_password)?,
            full_name: "Administrator".to_string(),
            email: format!("{username}@iban-registry.local"),
            roles: RoleSet::from_iter([Role::Admin]),
            district_code: None,
        })
        .await?;

    tracing::info!(username = %account.username, "Bootstrap administrator created");
    Ok(true)
}

/// Normalized user fields that passed validation.
struct UserFields {
    username: String,
    full_name: String,
    email: String,
    roles: RoleSet,
    district_code: Option<String>,
}

async fn checked_fields(
    repo: &dyn Repository,
    req: &UserRequest,
    mode: UserMode,
) -> AppResult<UserFields> {
    let mut errors: ValidationErrors = validation::validate_user_request(req, mode);

    let district_code = req
        .district_code
        .as_deref()
        .map(str::trim)
        .filter(|code| !code.is_empty())
        .map(str::to_string);

    if let Some(code) = &district_code {
        if repo.get_district(code).await?.is_none() {
            errors.add("districtCode", format!("unknown district '{code}'"));
        }
    }

    errors.into_result()?;

    Ok(UserFields {
        username: req.username.trim().to_string(),
        full_name: req.full_name.trim().to_string(),
        email: req.email.trim().to_string(),
        roles: req.roles.iter().copied().collect(),
        district_code,
    })
}

async fn ensure_unique(
    repo: &dyn Repository,
    fields: &UserFields,
    except: Option<Uuid>,
) -> AppResult<()> {
    if repo.username_taken(&fields.username, except).await? {
        return Err(AppError::Conflict(format!(
            "Username '{}' is already taken",
            fields.username
        )));
    }
    if repo.email_taken(&fields.email, except).await? {
        return Err(AppError::Conflict(format!(
            "Email '{}' is already in use",
            fields.email
        )));
    }
    Ok(())
}
