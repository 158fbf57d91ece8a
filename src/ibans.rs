//! IBAN record store and filter engine.
//!
//! Every operation takes the caller explicitly and runs the authorization
//! policy before touching the repository. Reads are narrowed to the caller's
//! scope; a district operator never learns that records outside the district exist.

use crate::{
    auth::AuthUser,
    error::{AppError, AppResult, ValidationErrors},
    models::{District, EcoCode, FilterCriteria, IbanDraft, IbanRequest, IbanView, Locality},
    policy::{self, Action, Decision},
    repository::Repository,
    validation,
};

// --- Reference Data ---

pub async fn list_eco_codes(repo: &dyn Repository, caller: &AuthUser) -> AppResult<Vec<EcoCode>> {
    policy::require(caller, Action::ViewReferenceData)?;
    Ok(repo.list_eco_codes().await?)
}

pub async fn list_districts(repo: &dyn Repository, caller: &AuthUser) -> AppResult<Vec<District>> {
    policy::require(caller, Action::ViewReferenceData)?;
    Ok(repo.list_districts().await?)
}

/// An unknown district yields an empty list, not an error.
pub async fn list_localities(
    repo: &dyn Repository,
    caller: &AuthUser,
    district_code: &str,
) -> AppResult<Vec<Locality>> {
    policy::require(caller, Action::ViewReferenceData)?;
    Ok(repo.list_localities(district_code.trim()).await?)
}

// --- Reads ---

/// filter
///
/// Records matching every supplied criterion, ordered by id. District operators
/// get their own district substituted for whatever district was requested.
pub async fn filter(
    repo: &dyn Repository,
    caller: &AuthUser,
    requested: FilterCriteria,
) -> AppResult<Vec<IbanView>> {
    let criteria = policy::effective_criteria(caller, requested)?;
    let records = repo.filter_ibans(&criteria).await?;
    tracing::debug!(
        username = %caller.username,
        ?criteria,
        count = records.len(),
        "Filtered IBAN records"
    );
    Ok(records)
}

/// list_by_district
///
/// `filter({districtCode, year})`. A district operator asking for another
/// district gets an empty list.
pub async fn list_by_district(
    repo: &dyn Repository,
    caller: &AuthUser,
    district_code: &str,
    year: Option<i32>,
) -> AppResult<Vec<IbanView>> {
    policy::require(caller, Action::ViewIban)?;

    let district_code = district_code.trim();
    if policy::authorize(caller, Action::ViewIban, Some(district_code)) == Decision::Deny {
        tracing::debug!(
            username = %caller.username,
            district = %district_code,
            "District outside caller scope, returning no records"
        );
        return Ok(Vec::new());
    }

    let criteria = FilterCriteria {
        year,
        district_code: Some(district_code.to_string()),
        ..FilterCriteria::default()
    };
    filter(repo, caller, criteria).await
}

/// A record outside the caller's scope is reported exactly like a missing one.
pub async fn get_by_id(repo: &dyn Repository, caller: &AuthUser, id: i64) -> AppResult<IbanView> {
    policy::require(caller, Action::ViewIban)?;

    match repo.get_iban(id).await? {
        Some(record)
            if policy::authorize(caller, Action::ViewIban, Some(&record.district_code))
                == Decision::Allow =>
        {
            Ok(record)
        }
        _ => Err(AppError::NotFound("IBAN record")),
    }
}

// --- Writes ---

pub async fn create(
    repo: &dyn Repository,
    caller: &AuthUser,
    req: IbanRequest,
) -> AppResult<IbanView> {
    policy::require(caller, Action::CreateIban)?;

    let draft = resolve_draft(repo, req).await?;
    if repo.find_iban_in_slot(&draft).await?.is_some() {
        return Err(slot_conflict(&draft));
    }

    let record = repo.create_iban(draft, caller.id).await?;
    tracing::info!(id = record.id, username = %caller.username, "IBAN record created");
    Ok(record)
}

pub async fn update(
    repo: &dyn Repository,
    caller: &AuthUser,
    id: i64,
    req: IbanRequest,
) -> AppResult<IbanView> {
    policy::require(caller, Action::UpdateIban)?;

    if repo.get_iban(id).await?.is_none() {
        return Err(AppError::NotFound("IBAN record"));
    }

    let draft = resolve_draft(repo, req).await?;
    // Re-saving a record onto its own slot is fine; taking another record's is not.
    if repo
        .find_iban_in_slot(&draft)
        .await?
        .is_some_and(|existing| existing != id)
    {
        return Err(slot_conflict(&draft));
    }

    let record = repo
        .update_iban(id, draft, caller.id)
        .await?
        .ok_or(AppError::NotFound("IBAN record"))?;
    tracing::info!(id, username = %caller.username, "IBAN record updated");
    Ok(record)
}

pub async fn delete(repo: &dyn Repository, caller: &AuthUser, id: i64) -> AppResult<()> {
    policy::require(caller, Action::DeleteIban)?;

    if !repo.delete_iban(id).await? {
        return Err(AppError::NotFound("IBAN record"));
    }
    tracing::info!(id, username = %caller.username, "IBAN record deleted");
    Ok(())
}

fn slot_conflict(draft: &IbanDraft) -> AppError {
    AppError::Conflict(format!(
        "An IBAN already exists for year {}, eco code {} and locality {} of district {}",
        draft.year, draft.eco_code, draft.locality_code, draft.district_code
    ))
}

fn non_empty(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .map(str::to_string)
}

/// resolve_draft
///
/// Runs the shape checks, then the reference checks against the store, and
/// collects every problem before failing. The district is taken from the
/// payload when given (and must own the locality), otherwise from the locality.
async fn resolve_draft(repo: &dyn Repository, req: IbanRequest) -> AppResult<IbanDraft> {
    let mut errors = validation::validate_iban_request(&req);

    let eco_code = req.eco_code.trim().to_string();
    let locality_code = req.locality_code.trim().to_string();
    let requested_district = non_empty(req.district_code.as_deref());

    if !eco_code.is_empty() && repo.get_eco_code(&eco_code).await?.is_none() {
        errors.add("ecoCode", format!("unknown eco code '{eco_code}'"));
    }

    let district_code = match requested_district {
        Some(district) => {
            check_requested_district(repo, &district, &locality_code, &mut errors).await?;
            Some(district)
        }
        None if locality_code.is_empty() => None,
        None => {
            let candidates = repo.find_localities_by_code(&locality_code).await?;
            match candidates.as_slice() {
                [] => {
                    errors.add("localityCode", format!("unknown locality '{locality_code}'"));
                    None
                }
                [only] => Some(only.district_code.clone()),
                _ => {
                    errors.add(
                        "districtCode",
                        format!("locality '{locality_code}' exists in several districts, a district is required"),
                    );
                    None
                }
            }
        }
    };

    match (req.year, district_code) {
        (Some(year), Some(district_code)) if errors.is_empty() => Ok(IbanDraft {
            iban_code: req.iban_code,
            year,
            eco_code,
            district_code,
            locality_code,
        }),
        _ => Err(AppError::Validation(ensure_reported(errors))),
    }
}

async fn check_requested_district(
    repo: &dyn Repository,
    district: &str,
    locality_code: &str,
    errors: &mut ValidationErrors,
) -> AppResult<()> {
    if repo.get_district(district).await?.is_none() {
        errors.add("districtCode", format!("unknown district '{district}'"));
        return Ok(());
    }
    if !locality_code.is_empty() && repo.get_locality(district, locality_code).await?.is_none() {
        errors.add(
            "localityCode",
            format!("locality '{locality_code}' does not belong to district '{district}'"),
        );
    }
    Ok(())
}

// A validation error always names at least one field.
fn ensure_reported(mut errors: ValidationErrors) -> ValidationErrors {
    if errors.is_empty() {
        errors.add("districtCode", "district could not be determined");
    }
    errors
}
