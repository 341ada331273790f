//! # API REST
//!
//! REST API implementation for the OPD records service.
//!
//! Handles:
//! - HTTP endpoints with axum, one per clinic service operation
//! - OpenAPI/Swagger documentation
//! - REST-specific concerns (JSON serialization, CORS, error status codes)
//!
//! The caller is identified by the `x-caller-principal` header; requests without it run as the
//! anonymous principal. Uses `api-shared` for wire types and header parsing.

#![warn(rust_2018_idioms)]

pub mod error;

use axum::{
    async_trait,
    extract::{FromRequestParts, Path, Query, State},
    http::{request::Parts, StatusCode},
    response::Json,
    routing::{get, post, put},
    Router,
};
use tower_http::cors::CorsLayer;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use api_shared::{
    caller_from_header, CreatedRes, FollowUpDto, HealthRes, HealthService, IsAdminRes,
    MedicineDto, NewFollowUpReq, NewPrescriptionReq, NewVisitReq, PatientDto, PatientReq,
    PrescriptionDto, PrescriptionUpdateReq, RoleDto, SearchQuery, UserProfileDto, VisitDto,
    VisitUpdateReq, VitalsDto, CALLER_HEADER,
};
use opd_core::{
    ClinicService, FollowUpId, PatientDetails, PatientId, PrescriptionId, Principal, Role,
    UserProfile, VisitId,
};

pub use error::ApiError;

/// Application state shared across REST API handlers.
#[derive(Clone, Debug)]
pub struct AppState {
    pub service: ClinicService,
}

/// The principal named by the `x-caller-principal` header.
#[derive(Clone, Debug)]
pub struct Caller(pub Principal);

#[async_trait]
impl<S> FromRequestParts<S> for Caller
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let raw = parts
            .headers
            .get(CALLER_HEADER)
            .map(|v| v.to_str())
            .transpose()
            .map_err(|_| ApiError::BadRequest(format!("{CALLER_HEADER} is not valid text")))?;

        caller_from_header(raw)
            .map(Caller)
            .map_err(|e| ApiError::BadRequest(format!("{CALLER_HEADER}: {e}")))
    }
}

#[derive(OpenApi)]
#[openapi(
    paths(
        health,
        list_patients,
        register_patient,
        get_patient,
        update_patient,
        search_patients_by_name,
        search_patients_by_contact,
        get_clinical_history,
        get_prescriptions_by_patient,
        get_upcoming_follow_ups,
        get_past_follow_ups,
        create_visit,
        get_visit,
        update_visit,
        list_follow_ups,
        schedule_follow_up,
        get_follow_up,
        complete_follow_up,
        cancel_follow_up,
        create_prescription,
        get_prescription,
        update_prescription,
        get_my_profile,
        save_my_profile,
        get_my_role,
        get_is_admin,
        get_user_profile,
        assign_user_role,
    ),
    components(schemas(
        HealthRes,
        CreatedRes,
        PatientReq,
        PatientDto,
        SearchQuery,
        VitalsDto,
        NewVisitReq,
        VisitUpdateReq,
        VisitDto,
        NewFollowUpReq,
        FollowUpDto,
        MedicineDto,
        NewPrescriptionReq,
        PrescriptionUpdateReq,
        PrescriptionDto,
        UserProfileDto,
        RoleDto,
        IsAdminRes,
    ))
)]
pub struct ApiDoc;

/// Builds the REST router, including Swagger UI and permissive CORS.
pub fn router(service: ClinicService) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/patients", get(list_patients).post(register_patient))
        .route("/patients/search/name", get(search_patients_by_name))
        .route("/patients/search/contact", get(search_patients_by_contact))
        .route("/patients/:id", get(get_patient).put(update_patient))
        .route("/patients/:id/visits", get(get_clinical_history))
        .route("/patients/:id/prescriptions", get(get_prescriptions_by_patient))
        .route("/patients/:id/follow-ups/upcoming", get(get_upcoming_follow_ups))
        .route("/patients/:id/follow-ups/past", get(get_past_follow_ups))
        .route("/visits", post(create_visit))
        .route("/visits/:id", get(get_visit).put(update_visit))
        .route("/follow-ups", get(list_follow_ups).post(schedule_follow_up))
        .route("/follow-ups/:id", get(get_follow_up))
        .route("/follow-ups/:id/complete", post(complete_follow_up))
        .route("/follow-ups/:id/cancel", post(cancel_follow_up))
        .route("/prescriptions", post(create_prescription))
        .route("/prescriptions/:id", get(get_prescription).put(update_prescription))
        .route("/me/profile", get(get_my_profile).put(save_my_profile))
        .route("/me/role", get(get_my_role))
        .route("/me/is-admin", get(get_is_admin))
        .route("/users/:principal/profile", get(get_user_profile))
        .route("/users/:principal/role", put(assign_user_role))
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .layer(CorsLayer::permissive())
        .with_state(AppState { service })
}

type ApiResult<T> = Result<T, ApiError>;

/// Absent records are a `200` with a `null` body, not an error.
fn found<T, D: From<T>>(value: Option<T>) -> ApiResult<Json<Option<D>>> {
    Ok(Json(value.map(D::from)))
}

fn list<T, D: From<T>>(values: Vec<T>) -> Json<Vec<D>> {
    Json(values.into_iter().map(D::from).collect())
}

fn parse_principal(raw: &str) -> ApiResult<Principal> {
    Principal::parse(raw).map_err(|e| ApiError::BadRequest(format!("principal: {e}")))
}

// ----------------------------------------------------------------------------
// Health
// ----------------------------------------------------------------------------

#[utoipa::path(
    get,
    path = "/health",
    responses(
        (status = 200, description = "Health check response", body = HealthRes)
    )
)]
/// Health check endpoint used by monitoring and load balancers.
async fn health() -> Json<HealthRes> {
    Json(HealthService::check_health())
}

// ----------------------------------------------------------------------------
// Patients
// ----------------------------------------------------------------------------

#[utoipa::path(
    get,
    path = "/patients",
    responses(
        (status = 200, description = "Every registered patient, by id", body = [PatientDto])
    )
)]
async fn list_patients(
    State(state): State<AppState>,
    Caller(caller): Caller,
) -> ApiResult<Json<Vec<PatientDto>>> {
    Ok(list(state.service.get_all_patients(&caller)?))
}

#[utoipa::path(
    post,
    path = "/patients",
    request_body = PatientReq,
    responses(
        (status = 201, description = "Patient registered", body = CreatedRes),
        (status = 400, description = "Bad request"),
        (status = 403, description = "Caller is not a registered user")
    )
)]
/// Register a new patient
///
/// # Errors
/// Returns `400 Bad Request` for an unknown gender and `403 Forbidden` for guests.
async fn register_patient(
    State(state): State<AppState>,
    Caller(caller): Caller,
    Json(req): Json<PatientReq>,
) -> ApiResult<(StatusCode, Json<CreatedRes>)> {
    let details = PatientDetails::try_from(req)?;
    let id = state.service.register_patient(&caller, details)?;
    Ok((StatusCode::CREATED, Json(CreatedRes { id: id.0 })))
}

#[utoipa::path(
    get,
    path = "/patients/{id}",
    params(("id" = u64, Path, description = "Patient id")),
    responses(
        (status = 200, description = "The patient, or null if there is none", body = PatientDto)
    )
)]
async fn get_patient(
    State(state): State<AppState>,
    Caller(caller): Caller,
    Path(id): Path<u64>,
) -> ApiResult<Json<Option<PatientDto>>> {
    let patient = state.service.get_patient_by_id(&caller, PatientId(id))?;
    found(patient)
}

#[utoipa::path(
    put,
    path = "/patients/{id}",
    params(("id" = u64, Path, description = "Patient id")),
    request_body = PatientReq,
    responses(
        (status = 204, description = "Patient replaced"),
        (status = 404, description = "No such patient")
    )
)]
/// Replace every mutable field of a patient
async fn update_patient(
    State(state): State<AppState>,
    Caller(caller): Caller,
    Path(id): Path<u64>,
    Json(req): Json<PatientReq>,
) -> ApiResult<StatusCode> {
    let details = PatientDetails::try_from(req)?;
    state.service.update_patient(&caller, PatientId(id), details)?;
    Ok(StatusCode::NO_CONTENT)
}

#[utoipa::path(
    get,
    path = "/patients/search/name",
    params(("q" = String, Query, description = "Case-insensitive substring of the name")),
    responses(
        (status = 200, description = "Matching patients", body = [PatientDto])
    )
)]
async fn search_patients_by_name(
    State(state): State<AppState>,
    Caller(caller): Caller,
    Query(query): Query<SearchQuery>,
) -> ApiResult<Json<Vec<PatientDto>>> {
    Ok(list(state.service.search_patients_by_name(&caller, &query.q)?))
}

#[utoipa::path(
    get,
    path = "/patients/search/contact",
    params(("q" = String, Query, description = "Case-insensitive substring of the contact number")),
    responses(
        (status = 200, description = "Matching patients", body = [PatientDto])
    )
)]
async fn search_patients_by_contact(
    State(state): State<AppState>,
    Caller(caller): Caller,
    Query(query): Query<SearchQuery>,
) -> ApiResult<Json<Vec<PatientDto>>> {
    Ok(list(state.service.search_patients_by_contact(&caller, &query.q)?))
}

#[utoipa::path(
    get,
    path = "/patients/{id}/visits",
    params(("id" = u64, Path, description = "Patient id")),
    responses(
        (status = 200, description = "Clinical history, newest first", body = [VisitDto])
    )
)]
async fn get_clinical_history(
    State(state): State<AppState>,
    Caller(caller): Caller,
    Path(id): Path<u64>,
) -> ApiResult<Json<Vec<VisitDto>>> {
    Ok(list(state.service.get_clinical_history(&caller, PatientId(id))?))
}

#[utoipa::path(
    get,
    path = "/patients/{id}/prescriptions",
    params(("id" = u64, Path, description = "Patient id")),
    responses(
        (status = 200, description = "Prescriptions, newest first", body = [PrescriptionDto])
    )
)]
async fn get_prescriptions_by_patient(
    State(state): State<AppState>,
    Caller(caller): Caller,
    Path(id): Path<u64>,
) -> ApiResult<Json<Vec<PrescriptionDto>>> {
    Ok(list(
        state.service.get_prescriptions_by_patient(&caller, PatientId(id))?,
    ))
}

#[utoipa::path(
    get,
    path = "/patients/{id}/follow-ups/upcoming",
    params(("id" = u64, Path, description = "Patient id")),
    responses(
        (status = 200, description = "Scheduled follow-ups after now, soonest first", body = [FollowUpDto])
    )
)]
async fn get_upcoming_follow_ups(
    State(state): State<AppState>,
    Caller(caller): Caller,
    Path(id): Path<u64>,
) -> ApiResult<Json<Vec<FollowUpDto>>> {
    Ok(list(state.service.get_upcoming_follow_ups(&caller, PatientId(id))?))
}

#[utoipa::path(
    get,
    path = "/patients/{id}/follow-ups/past",
    params(("id" = u64, Path, description = "Patient id")),
    responses(
        (status = 200, description = "Completed or overdue follow-ups, most recent first", body = [FollowUpDto])
    )
)]
async fn get_past_follow_ups(
    State(state): State<AppState>,
    Caller(caller): Caller,
    Path(id): Path<u64>,
) -> ApiResult<Json<Vec<FollowUpDto>>> {
    Ok(list(state.service.get_past_follow_ups(&caller, PatientId(id))?))
}

// ----------------------------------------------------------------------------
// Clinical visits
// ----------------------------------------------------------------------------

#[utoipa::path(
    post,
    path = "/visits",
    request_body = NewVisitReq,
    responses(
        (status = 201, description = "Visit recorded", body = CreatedRes),
        (status = 403, description = "Caller is not a registered user"),
        (status = 404, description = "No such patient")
    )
)]
async fn create_visit(
    State(state): State<AppState>,
    Caller(caller): Caller,
    Json(req): Json<NewVisitReq>,
) -> ApiResult<(StatusCode, Json<CreatedRes>)> {
    let id = state.service.create_clinical_visit(&caller, req.into())?;
    Ok((StatusCode::CREATED, Json(CreatedRes { id: id.0 })))
}

#[utoipa::path(
    get,
    path = "/visits/{id}",
    params(("id" = u64, Path, description = "Visit id")),
    responses(
        (status = 200, description = "The visit, or null if there is none", body = VisitDto)
    )
)]
async fn get_visit(
    State(state): State<AppState>,
    Caller(caller): Caller,
    Path(id): Path<u64>,
) -> ApiResult<Json<Option<VisitDto>>> {
    let visit = state.service.get_visit_by_id(&caller, VisitId(id))?;
    found(visit)
}

#[utoipa::path(
    put,
    path = "/visits/{id}",
    params(("id" = u64, Path, description = "Visit id")),
    request_body = VisitUpdateReq,
    responses(
        (status = 204, description = "Visit updated"),
        (status = 404, description = "No such visit")
    )
)]
async fn update_visit(
    State(state): State<AppState>,
    Caller(caller): Caller,
    Path(id): Path<u64>,
    Json(req): Json<VisitUpdateReq>,
) -> ApiResult<StatusCode> {
    state.service.update_visit(&caller, VisitId(id), req.into())?;
    Ok(StatusCode::NO_CONTENT)
}

// ----------------------------------------------------------------------------
// Follow-ups
// ----------------------------------------------------------------------------

#[utoipa::path(
    get,
    path = "/follow-ups",
    responses(
        (status = 200, description = "Every follow-up that is not cancelled", body = [FollowUpDto])
    )
)]
async fn list_follow_ups(
    State(state): State<AppState>,
    Caller(caller): Caller,
) -> ApiResult<Json<Vec<FollowUpDto>>> {
    Ok(list(state.service.get_all_follow_ups(&caller)?))
}

#[utoipa::path(
    post,
    path = "/follow-ups",
    request_body = NewFollowUpReq,
    responses(
        (status = 201, description = "Follow-up scheduled", body = CreatedRes),
        (status = 404, description = "No such patient")
    )
)]
async fn schedule_follow_up(
    State(state): State<AppState>,
    Caller(caller): Caller,
    Json(req): Json<NewFollowUpReq>,
) -> ApiResult<(StatusCode, Json<CreatedRes>)> {
    let id = state.service.schedule_follow_up(&caller, req.into())?;
    Ok((StatusCode::CREATED, Json(CreatedRes { id: id.0 })))
}

#[utoipa::path(
    get,
    path = "/follow-ups/{id}",
    params(("id" = u64, Path, description = "Follow-up id")),
    responses(
        (status = 200, description = "The follow-up, cancelled ones included, or null if there is none", body = FollowUpDto)
    )
)]
async fn get_follow_up(
    State(state): State<AppState>,
    Caller(caller): Caller,
    Path(id): Path<u64>,
) -> ApiResult<Json<Option<FollowUpDto>>> {
    let follow_up = state.service.get_follow_up_by_id(&caller, FollowUpId(id))?;
    found(follow_up)
}

#[utoipa::path(
    post,
    path = "/follow-ups/{id}/complete",
    params(("id" = u64, Path, description = "Follow-up id")),
    responses(
        (status = 204, description = "Follow-up completed"),
        (status = 404, description = "No such follow-up"),
        (status = 409, description = "Follow-up was cancelled")
    )
)]
async fn complete_follow_up(
    State(state): State<AppState>,
    Caller(caller): Caller,
    Path(id): Path<u64>,
) -> ApiResult<StatusCode> {
    state.service.mark_follow_up_completed(&caller, FollowUpId(id))?;
    Ok(StatusCode::NO_CONTENT)
}

#[utoipa::path(
    post,
    path = "/follow-ups/{id}/cancel",
    params(("id" = u64, Path, description = "Follow-up id")),
    responses(
        (status = 204, description = "Follow-up cancelled"),
        (status = 404, description = "No such follow-up"),
        (status = 409, description = "Follow-up was already completed")
    )
)]
async fn cancel_follow_up(
    State(state): State<AppState>,
    Caller(caller): Caller,
    Path(id): Path<u64>,
) -> ApiResult<StatusCode> {
    state.service.cancel_follow_up(&caller, FollowUpId(id))?;
    Ok(StatusCode::NO_CONTENT)
}

// ----------------------------------------------------------------------------
// Prescriptions
// ----------------------------------------------------------------------------

#[utoipa::path(
    post,
    path = "/prescriptions",
    request_body = NewPrescriptionReq,
    responses(
        (status = 201, description = "Prescription issued", body = CreatedRes),
        (status = 404, description = "No such patient or visit"),
        (status = 409, description = "Visit belongs to another patient")
    )
)]
async fn create_prescription(
    State(state): State<AppState>,
    Caller(caller): Caller,
    Json(req): Json<NewPrescriptionReq>,
) -> ApiResult<(StatusCode, Json<CreatedRes>)> {
    let id = state.service.create_prescription(&caller, req.into())?;
    Ok((StatusCode::CREATED, Json(CreatedRes { id: id.0 })))
}

#[utoipa::path(
    get,
    path = "/prescriptions/{id}",
    params(("id" = u64, Path, description = "Prescription id")),
    responses(
        (status = 200, description = "The prescription, or null if there is none", body = PrescriptionDto)
    )
)]
async fn get_prescription(
    State(state): State<AppState>,
    Caller(caller): Caller,
    Path(id): Path<u64>,
) -> ApiResult<Json<Option<PrescriptionDto>>> {
    let prescription = state
        .service
        .get_prescription_by_id(&caller, PrescriptionId(id))?;
    found(prescription)
}

#[utoipa::path(
    put,
    path = "/prescriptions/{id}",
    params(("id" = u64, Path, description = "Prescription id")),
    request_body = PrescriptionUpdateReq,
    responses(
        (status = 204, description = "Prescription updated"),
        (status = 404, description = "No such prescription")
    )
)]
async fn update_prescription(
    State(state): State<AppState>,
    Caller(caller): Caller,
    Path(id): Path<u64>,
    Json(req): Json<PrescriptionUpdateReq>,
) -> ApiResult<StatusCode> {
    state
        .service
        .update_prescription(&caller, PrescriptionId(id), req.into())?;
    Ok(StatusCode::NO_CONTENT)
}

// ----------------------------------------------------------------------------
// Identity
// ----------------------------------------------------------------------------

#[utoipa::path(
    get,
    path = "/me/profile",
    responses(
        (status = 200, description = "The caller's profile, or null if none has been saved", body = UserProfileDto)
    )
)]
async fn get_my_profile(
    State(state): State<AppState>,
    Caller(caller): Caller,
) -> ApiResult<Json<Option<UserProfileDto>>> {
    let profile = state.service.get_caller_user_profile(&caller)?;
    found(profile)
}

#[utoipa::path(
    put,
    path = "/me/profile",
    request_body = UserProfileDto,
    responses(
        (status = 204, description = "Profile saved; a guest caller becomes a user"),
        (status = 400, description = "Blank name"),
        (status = 403, description = "Anonymous callers cannot save a profile")
    )
)]
async fn save_my_profile(
    State(state): State<AppState>,
    Caller(caller): Caller,
    Json(req): Json<UserProfileDto>,
) -> ApiResult<StatusCode> {
    let profile = UserProfile::try_from(req)?;
    state.service.save_caller_user_profile(&caller, profile)?;
    Ok(StatusCode::NO_CONTENT)
}

#[utoipa::path(
    get,
    path = "/me/role",
    responses(
        (status = 200, description = "The caller's access role", body = RoleDto)
    )
)]
async fn get_my_role(
    State(state): State<AppState>,
    Caller(caller): Caller,
) -> ApiResult<Json<RoleDto>> {
    Ok(Json(state.service.get_caller_user_role(&caller)?.into()))
}

#[utoipa::path(
    get,
    path = "/me/is-admin",
    responses(
        (status = 200, description = "Whether the caller is an admin", body = IsAdminRes)
    )
)]
async fn get_is_admin(
    State(state): State<AppState>,
    Caller(caller): Caller,
) -> ApiResult<Json<IsAdminRes>> {
    let is_admin = state.service.is_caller_admin(&caller)?;
    Ok(Json(IsAdminRes { is_admin }))
}

#[utoipa::path(
    get,
    path = "/users/{principal}/profile",
    params(("principal" = String, Path, description = "Principal whose profile to read")),
    responses(
        (status = 200, description = "The user's profile, or null if none has been saved", body = UserProfileDto),
        (status = 403, description = "Only the user themselves or an admin may read it")
    )
)]
async fn get_user_profile(
    State(state): State<AppState>,
    Caller(caller): Caller,
    Path(principal): Path<String>,
) -> ApiResult<Json<Option<UserProfileDto>>> {
    let user = parse_principal(&principal)?;
    let profile = state.service.get_user_profile(&caller, &user)?;
    found(profile)
}

#[utoipa::path(
    put,
    path = "/users/{principal}/role",
    params(("principal" = String, Path, description = "Principal to assign the role to")),
    request_body = RoleDto,
    responses(
        (status = 204, description = "Role assigned"),
        (status = 400, description = "Unknown role"),
        (status = 403, description = "Caller is not an admin")
    )
)]
async fn assign_user_role(
    State(state): State<AppState>,
    Caller(caller): Caller,
    Path(principal): Path<String>,
    Json(req): Json<RoleDto>,
) -> ApiResult<StatusCode> {
    let user = parse_principal(&principal)?;
    let role = Role::try_from(req)?;
    state.service.assign_caller_user_role(&caller, &user, role)?;
    Ok(StatusCode::NO_CONTENT)
}
