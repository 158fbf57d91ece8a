use crate::{
    AppState,
    auth::{self, AuthUser},
    error::{AppResult, ErrorBody},
    export::{self, CSV_CONTENT_TYPE},
    extract::{ApiJson, ApiQuery},
    ibans,
    models::{
        District, EcoCode, FilterCriteria, IbanRequest, IbanView, Locality, LoginRequest,
        LoginResponse, MeResponse, UserRequest, UserResponse, YearQuery,
    },
    users,
};
use axum::{
    Json,
    extract::{Path, State},
    http::{StatusCode, header},
    response::IntoResponse,
};
use uuid::Uuid;

// --- Authentication ---

/// login
///
/// [Public Route] Exchanges credentials for a bearer token. Unknown usernames and
/// wrong passwords produce the same 401 body.
#[utoipa::path(
    post,
    path = "/auth/login",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Authenticated", body = LoginResponse),
        (status = 401, description = "Invalid credentials", body = ErrorBody)
    )
)]
pub async fn login(
    State(state): State<AppState>,
    ApiJson(payload): ApiJson<LoginRequest>,
) -> AppResult<Json<LoginResponse>> {
    let response = auth::authenticate(state.repo.as_ref(), &state.config, payload).await?;
    Ok(Json(response))
}

/// get_me
///
/// [Authenticated Route] Identity carried by the caller's token.
#[utoipa::path(
    get,
    path = "/auth/me",
    responses(
        (status = 200, description = "Current caller", body = MeResponse),
        (status = 401, description = "Missing or invalid token", body = ErrorBody)
    )
)]
pub async fn get_me(caller: AuthUser) -> Json<MeResponse> {
    Json(MeResponse::from(&caller))
}

// --- Reference Data ---

#[utoipa::path(
    get,
    path = "/ibans/eco-codes",
    responses((status = 200, description = "Eco codes", body = [EcoCode]))
)]
pub async fn get_eco_codes(
    caller: AuthUser,
    State(state): State<AppState>,
) -> AppResult<Json<Vec<EcoCode>>> {
    Ok(Json(ibans::list_eco_codes(state.repo.as_ref(), &caller).await?))
}

#[utoipa::path(
    get,
    path = "/ibans/raions",
    responses((status = 200, description = "Districts", body = [District]))
)]
pub async fn get_districts(
    caller: AuthUser,
    State(state): State<AppState>,
) -> AppResult<Json<Vec<District>>> {
    Ok(Json(ibans::list_districts(state.repo.as_ref(), &caller).await?))
}

/// get_localities
///
/// [Authenticated Route] Localities of one district. An unknown district returns
/// an empty list because the UI queries this path while the user types.
#[utoipa::path(
    get,
    path = "/ibans/localities/{districtCode}",
    params(("districtCode" = String, Path, description = "District code")),
    responses((status = 200, description = "Localities, possibly empty", body = [Locality]))
)]
pub async fn get_localities(
    caller: AuthUser,
    State(state): State<AppState>,
    Path(district_code): Path<String>,
) -> AppResult<Json<Vec<Locality>>> {
    Ok(Json(
        ibans::list_localities(state.repo.as_ref(), &caller, &district_code).await?,
    ))
}

// --- IBAN Records ---

/// list_ibans
///
/// [Authenticated Route] Records visible to the caller. Accepts the same
/// criteria as `/ibans/filter`; unknown parameters are rejected with 400.
#[utoipa::path(
    get,
    path = "/ibans",
    params(FilterCriteria),
    responses(
        (status = 200, description = "Visible records, ordered by id", body = [IbanView]),
        (status = 400, description = "Malformed or unknown query parameter", body = ErrorBody)
    )
)]
pub async fn list_ibans(
    caller: AuthUser,
    State(state): State<AppState>,
    ApiQuery(criteria): ApiQuery<FilterCriteria>,
) -> AppResult<Json<Vec<IbanView>>> {
    let records = ibans::filter(state.repo.as_ref(), &caller, criteria).await?;
    Ok(Json(records))
}

/// filter_ibans
///
/// [Authenticated Route] Compound filter. Supplied criteria are ANDed; district
/// operators are always narrowed to their own district. Unknown parameters are
/// rejected with 400.
#[utoipa::path(
    get,
    path = "/ibans/filter",
    params(FilterCriteria),
    responses(
        (status = 200, description = "Matching records, ordered by id", body = [IbanView]),
        (status = 400, description = "Malformed or unknown query parameter", body = ErrorBody)
    )
)]
pub async fn filter_ibans(
    caller: AuthUser,
    State(state): State<AppState>,
    ApiQuery(criteria): ApiQuery<FilterCriteria>,
) -> AppResult<Json<Vec<IbanView>>> {
    Ok(Json(
        ibans::filter(state.repo.as_ref(), &caller, criteria).await?,
    ))
}

/// get_ibans_by_district
///
/// [Authenticated Route] Records of one district, optionally for one year.
/// A district operator asking for a foreign district receives an empty list.
#[utoipa::path(
    get,
    path = "/ibans/raion/{districtCode}",
    params(("districtCode" = String, Path, description = "District code"), YearQuery),
    responses((status = 200, description = "Records of the district", body = [IbanView]))
)]
pub async fn get_ibans_by_district(
    caller: AuthUser,
    State(state): State<AppState>,
    Path(district_code): Path<String>,
    ApiQuery(query): ApiQuery<YearQuery>,
) -> AppResult<Json<Vec<IbanView>>> {
    let records =
        ibans::list_by_district(state.repo.as_ref(), &caller, &district_code, query.year).await?;
    Ok(Json(records))
}

/// export_ibans
///
/// [Authenticated Route] The filtered, scoped registry as a CSV attachment.
#[utoipa::path(
    get,
    path = "/ibans/export",
    params(FilterCriteria),
    responses(
        (status = 200, description = "CSV file", content_type = "text/csv", body = String),
        (status = 400, description = "Malformed or unknown query parameter", body = ErrorBody)
    )
)]
pub async fn export_ibans(
    caller: AuthUser,
    State(state): State<AppState>,
    ApiQuery(criteria): ApiQuery<FilterCriteria>,
) -> AppResult<impl IntoResponse> {
    let export = export::export(state.repo.as_ref(), &caller, criteria).await?;

    let headers = [
        (header::CONTENT_TYPE, CSV_CONTENT_TYPE.to_string()),
        (
            header::CONTENT_DISPOSITION,
            format!("attachment; filename=\"{}\"", export.filename),
        ),
        (header::CACHE_CONTROL, "must-revalidate".to_string()),
    ];
    Ok((headers, export.bytes))
}

/// get_iban
///
/// [Authenticated Route] One record. Records outside the caller's district
/// answer 404 exactly like missing ones.
#[utoipa::path(
    get,
    path = "/ibans/{id}",
    params(("id" = i64, Path, description = "IBAN record id")),
    responses(
        (status = 200, description = "Found", body = IbanView),
        (status = 404, description = "Not found", body = ErrorBody)
    )
)]
pub async fn get_iban(
    caller: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> AppResult<Json<IbanView>> {
    Ok(Json(ibans::get_by_id(state.repo.as_ref(), &caller, id).await?))
}

/// create_iban
///
/// [Authenticated Route, ADMIN / OPERATOR] Validates and stores a new record.
#[utoipa::path(
    post,
    path = "/ibans",
    request_body = IbanRequest,
    responses(
        (status = 201, description = "Created", body = IbanView),
        (status = 403, description = "Role not allowed", body = ErrorBody),
        (status = 409, description = "Slot already taken", body = ErrorBody),
        (status = 422, description = "Invalid fields", body = ErrorBody)
    )
)]
pub async fn create_iban(
    caller: AuthUser,
    State(state): State<AppState>,
    ApiJson(payload): ApiJson<IbanRequest>,
) -> AppResult<(StatusCode, Json<IbanView>)> {
    let record = ibans::create(state.repo.as_ref(), &caller, payload).await?;
    Ok((StatusCode::CREATED, Json(record)))
}

/// update_iban
///
/// [Authenticated Route, ADMIN / OPERATOR] Replaces every field of a record.
#[utoipa::path(
    put,
    path = "/ibans/{id}",
    params(("id" = i64, Path, description = "IBAN record id")),
    request_body = IbanRequest,
    responses(
        (status = 200, description = "Updated", body = IbanView),
        (status = 403, description = "Role not allowed", body = ErrorBody),
        (status = 404, description = "Not found", body = ErrorBody),
        (status = 409, description = "Slot already taken", body = ErrorBody),
        (status = 422, description = "Invalid fields", body = ErrorBody)
    )
)]
pub async fn update_iban(
    caller: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<i64>,
    ApiJson(payload): ApiJson<IbanRequest>,
) -> AppResult<Json<IbanView>> {
    Ok(Json(
        ibans::update(state.repo.as_ref(), &caller, id, payload).await?,
    ))
}

#[utoipa::path(
    delete,
    path = "/ibans/{id}",
    params(("id" = i64, Path, description = "IBAN record id")),
    responses(
        (status = 204, description = "Deleted"),
        (status = 403, description = "Role not allowed", body = ErrorBody),
        (status = 404, description = "Not found", body = ErrorBody)
    )
)]
pub async fn delete_iban(
    caller: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> AppResult<StatusCode> {
    ibans::delete(state.repo.as_ref(), &caller, id).await?;
    Ok(StatusCode::NO_CONTENT)
}

// --- User Management (ADMIN) ---

#[utoipa::path(
    get,
    path = "/users",
    responses(
        (status = 200, description = "All accounts", body = [UserResponse]),
        (status = 403, description = "Not an administrator", body = ErrorBody)
    )
)]
pub async fn list_users(
    caller: AuthUser,
    State(state): State<AppState>,
) -> AppResult<Json<Vec<UserResponse>>> {
    Ok(Json(users::list(state.repo.as_ref(), &caller).await?))
}

#[utoipa::path(
    get,
    path = "/users/{id}",
    params(("id" = Uuid, Path, description = "Account id")),
    responses(
        (status = 200, description = "Found", body = UserResponse),
        (status = 404, description = "Not found", body = ErrorBody)
    )
)]
pub async fn get_user(
    caller: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> AppResult<Json<UserResponse>> {
    Ok(Json(users::get(state.repo.as_ref(), &caller, id).await?))
}

#[utoipa::path(
    get,
    path = "/users/username/{username}",
    params(("username" = String, Path, description = "Login name")),
    responses(
        (status = 200, description = "Found", body = UserResponse),
        (status = 404, description = "Not found", body = ErrorBody)
    )
)]
pub async fn get_user_by_username(
    caller: AuthUser,
    State(state): State<AppState>,
    Path(username): Path<String>,
) -> AppResult<Json<UserResponse>> {
    Ok(Json(
        users::get_by_username(state.repo.as_ref(), &caller, &username).await?,
    ))
}

/// create_user
///
/// [Admin Route] Every invalid field is reported in one 422 response.
#[utoipa::path(
    post,
    path = "/users",
    request_body = UserRequest,
    responses(
        (status = 201, description = "Created", body = UserResponse),
        (status = 409, description = "Username or email taken", body = ErrorBody),
        (status = 422, description = "Invalid fields", body = ErrorBody)
    )
)]
pub async fn create_user(
    caller: AuthUser,
    State(state): State<AppState>,
    ApiJson(payload): ApiJson<UserRequest>,
) -> AppResult<(StatusCode, Json<UserResponse>)> {
    let user = users::create(state.repo.as_ref(), &caller, payload).await?;
    Ok((StatusCode::CREATED, Json(user)))
}

/// update_user
///
/// [Admin Route] An empty or omitted password keeps the current one.
#[utoipa::path(
    put,
    path = "/users/{id}",
    params(("id" = Uuid, Path, description = "Account id")),
    request_body = UserRequest,
    responses(
        (status = 200, description = "Updated", body = UserResponse),
        (status = 404, description = "Not found", body = ErrorBody),
        (status = 409, description = "Username or email taken", body = ErrorBody),
        (status = 422, description = "Invalid fields", body = ErrorBody)
    )
)]
pub async fn update_user(
    caller: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    ApiJson(payload): ApiJson<UserRequest>,
) -> AppResult<Json<UserResponse>> {
    Ok(Json(
        users::update(state.repo.as_ref(), &caller, id, payload).await?,
    ))
}

#[utoipa::path(
    delete,
    path = "/users/{id}",
    params(("id" = Uuid, Path, description = "Account id")),
    responses(
        (status = 204, description = "Deleted"),
        (status = 404, description = "Not found", body = ErrorBody)
    )
)]
pub async fn delete_user(
    caller: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> AppResult<StatusCode> {
    users::delete(state.repo.as_ref(), &caller, id).await?;
    Ok(StatusCode::NO_CONTENT)
}
