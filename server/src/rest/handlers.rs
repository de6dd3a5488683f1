// server/src/rest/handlers.rs

use std::sync::Arc;

use chrono::{DateTime, NaiveDateTime, Utc};
use log::{debug, error};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::json;
use warp::http::StatusCode;
use warp::reply::{Json, WithStatus};
use warp::Rejection;

use clinic_services::{
    AccountUpdate, DepartmentRequest, DoctorRequest, DoctorUpdate, ElevatedAccountRequest,
    PrescriptionRequest, RegistrationRequest,
};
use models::errors::{ClinicError, ClinicResult};
use models::identifiers::{AccountId, AppointmentId, DepartmentId, DoctorId};
use models::medical::AppointmentStatus;

use crate::rest::auth::caller_from_header;
use crate::state::AppState;

/// Unified return type for every REST handler.
pub type ApiReply = Result<WithStatus<Json>, Rejection>;

// =========================================================================
// REQUEST BODIES
// =========================================================================

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BookingRequest {
    pub doctor_id: DoctorId,
    #[serde(deserialize_with = "deserialize_date_time")]
    pub date_time: DateTime<Utc>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct DrugSearchQuery {
    #[serde(default)]
    pub query: String,
}

/// RFC 3339, or a zone-less `2030-06-01T10:00[:00]` taken as UTC.
fn deserialize_date_time<'de, D>(deserializer: D) -> Result<DateTime<Utc>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = String::deserialize(deserializer)?;
    parse_date_time(&raw).ok_or_else(|| serde::de::Error::custom(format!("invalid dateTime '{}'", raw)))
}

pub fn parse_date_time(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if let Ok(parsed) = DateTime::parse_from_rfc3339(raw) {
        return Some(parsed.with_timezone(&Utc));
    }
    ["%Y-%m-%dT%H:%M:%S", "%Y-%m-%dT%H:%M"]
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(raw, fmt).ok())
        .map(|naive| naive.and_utc())
}

// =========================================================================
// RESPONSES
// =========================================================================

pub fn status_for(err: &ClinicError) -> StatusCode {
    match err {
        ClinicError::Validation(_) => StatusCode::BAD_REQUEST,
        ClinicError::Unauthenticated(_) => StatusCode::UNAUTHORIZED,
        ClinicError::AccessDenied(_) => StatusCode::FORBIDDEN,
        ClinicError::NotFound(_) => StatusCode::NOT_FOUND,
        ClinicError::InvalidTransition { .. } | ClinicError::InvalidState(_) | ClinicError::Conflict(_) => {
            StatusCode::CONFLICT
        }
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

pub fn error_reply(err: &ClinicError) -> WithStatus<Json> {
    let status = status_for(err);
    if status.is_server_error() {
        error!("[Api] Request failed: {}", err);
    } else {
        debug!("[Api] Request refused with {}: {}", status, err);
    }
    warp::reply::with_status(warp::reply::json(&json!({ "error": err.to_string() })), status)
}

pub fn respond<T: Serialize>(result: ClinicResult<T>, success: StatusCode) -> ApiReply {
    match result {
        Ok(value) => Ok(warp::reply::with_status(warp::reply::json(&value), success)),
        Err(e) => Ok(error_reply(&e)),
    }
}

macro_rules! caller_or_reply {
    ($state:expr, $auth:expr) => {
        match caller_from_header(&$state, $auth).await {
            Ok(caller) => caller,
            Err(e) => return Ok(error_reply(&e)),
        }
    };
}

// =========================================================================
// PUBLIC AND SHARED
// =========================================================================

pub async fn register(state: Arc<AppState>, body: RegistrationRequest) -> ApiReply {
    respond(state.directory.register(body).await, StatusCode::CREATED)
}

pub async fn me(auth: Option<String>, state: Arc<AppState>) -> ApiReply {
    let caller = caller_or_reply!(state, auth);
    respond(state.directory.current(&caller).await, StatusCode::OK)
}

pub async fn list_departments(auth: Option<String>, state: Arc<AppState>) -> ApiReply {
    let caller = caller_or_reply!(state, auth);
    respond(state.departments.list(&caller).await, StatusCode::OK)
}

pub async fn doctors_in_department(id: DepartmentId, auth: Option<String>, state: Arc<AppState>) -> ApiReply {
    let caller = caller_or_reply!(state, auth);
    respond(state.departments.doctors_in(&caller, id).await, StatusCode::OK)
}

pub async fn search_drugs(query: DrugSearchQuery, auth: Option<String>, state: Arc<AppState>) -> ApiReply {
    let caller = caller_or_reply!(state, auth);
    respond(state.prescriptions.search_drugs(&caller, &query.query).await, StatusCode::OK)
}

// =========================================================================
// APPOINTMENTS AND PRESCRIPTIONS
// =========================================================================

pub async fn book_appointment(auth: Option<String>, state: Arc<AppState>, body: BookingRequest) -> ApiReply {
    let caller = caller_or_reply!(state, auth);
    respond(
        state.appointments.book(&caller, body.doctor_id, body.date_time).await,
        StatusCode::CREATED,
    )
}

pub async fn my_appointments(auth: Option<String>, state: Arc<AppState>) -> ApiReply {
    let caller = caller_or_reply!(state, auth);
    respond(state.appointments.list_for_patient(&caller).await, StatusCode::OK)
}

pub async fn doctor_appointments(auth: Option<String>, state: Arc<AppState>) -> ApiReply {
    let caller = caller_or_reply!(state, auth);
    respond(state.appointments.list_for_doctor(&caller).await, StatusCode::OK)
}

pub async fn get_appointment(id: AppointmentId, auth: Option<String>, state: Arc<AppState>) -> ApiReply {
    let caller = caller_or_reply!(state, auth);
    respond(state.appointments.get(id, &caller).await, StatusCode::OK)
}

pub async fn update_appointment_status(
    id: AppointmentId,
    auth: Option<String>,
    state: Arc<AppState>,
    status: AppointmentStatus,
) -> ApiReply {
    let caller = caller_or_reply!(state, auth);
    respond(state.appointments.transition_status(id, status, &caller).await, StatusCode::OK)
}

pub async fn appointment_prescription(id: AppointmentId, auth: Option<String>, state: Arc<AppState>) -> ApiReply {
    let caller = caller_or_reply!(state, auth);
    let found = state
        .prescriptions
        .get_for_appointment(id, &caller)
        .await
        .and_then(|rx| rx.ok_or_else(|| ClinicError::NotFound(format!("prescription for appointment {}", id))));
    respond(found, StatusCode::OK)
}

pub async fn create_prescription(auth: Option<String>, state: Arc<AppState>, body: PrescriptionRequest) -> ApiReply {
    let caller = caller_or_reply!(state, auth);
    respond(state.prescriptions.create_prescription(body, &caller).await, StatusCode::CREATED)
}

pub async fn my_prescriptions(auth: Option<String>, state: Arc<AppState>) -> ApiReply {
    let caller = caller_or_reply!(state, auth);
    respond(state.prescriptions.list_for_patient(&caller).await, StatusCode::OK)
}

// =========================================================================
// ADMINISTRATION
// =========================================================================

pub async fn admin_list_users(auth: Option<String>, state: Arc<AppState>) -> ApiReply {
    let caller = caller_or_reply!(state, auth);
    respond(state.directory.list_accounts(&caller).await, StatusCode::OK)
}

pub async fn admin_create_patient(auth: Option<String>, state: Arc<AppState>, body: RegistrationRequest) -> ApiReply {
    let caller = caller_or_reply!(state, auth);
    respond(state.directory.create_patient(&caller, body).await, StatusCode::CREATED)
}

pub async fn admin_create_account(
    auth: Option<String>,
    state: Arc<AppState>,
    body: ElevatedAccountRequest,
) -> ApiReply {
    let caller = caller_or_reply!(state, auth);
    respond(state.directory.create_elevated_account(&caller, body).await, StatusCode::CREATED)
}

pub async fn admin_update_user(
    id: AccountId,
    auth: Option<String>,
    state: Arc<AppState>,
    body: AccountUpdate,
) -> ApiReply {
    let caller = caller_or_reply!(state, auth);
    respond(state.directory.update(&caller, id, body).await, StatusCode::OK)
}

pub async fn admin_delete_user(id: AccountId, auth: Option<String>, state: Arc<AppState>) -> ApiReply {
    let caller = caller_or_reply!(state, auth);
    let deleted = state.directory.delete_account(&caller, id).await;
    respond(deleted.map(|_| json!({ "deleted": id })), StatusCode::OK)
}

pub async fn admin_list_doctors(auth: Option<String>, state: Arc<AppState>) -> ApiReply {
    let caller = caller_or_reply!(state, auth);
    respond(state.directory.list_doctors(&caller).await, StatusCode::OK)
}

pub async fn admin_create_doctor(auth: Option<String>, state: Arc<AppState>, body: DoctorRequest) -> ApiReply {
    let caller = caller_or_reply!(state, auth);
    respond(state.directory.create_doctor(&caller, body).await, StatusCode::CREATED)
}

pub async fn admin_update_doctor(
    id: DoctorId,
    auth: Option<String>,
    state: Arc<AppState>,
    body: DoctorUpdate,
) -> ApiReply {
    let caller = caller_or_reply!(state, auth);
    respond(state.directory.update_doctor(&caller, id, body).await, StatusCode::OK)
}

pub async fn admin_create_department(
    auth: Option<String>,
    state: Arc<AppState>,
    body: DepartmentRequest,
) -> ApiReply {
    let caller = caller_or_reply!(state, auth);
    respond(state.departments.create(&caller, body).await, StatusCode::CREATED)
}

pub async fn admin_update_department(
    id: DepartmentId,
    auth: Option<String>,
    state: Arc<AppState>,
    body: DepartmentRequest,
) -> ApiReply {
    let caller = caller_or_reply!(state, auth);
    respond(state.departments.update(&caller, id, body).await, StatusCode::OK)
}

pub async fn admin_delete_department(id: DepartmentId, auth: Option<String>, state: Arc<AppState>) -> ApiReply {
    let caller = caller_or_reply!(state, auth);
    let deleted = state.departments.delete(&caller, id).await;
    respond(deleted.map(|_| json!({ "deleted": id })), StatusCode::OK)
}
