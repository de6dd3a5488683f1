// server/src/rest/routes.rs

use std::convert::Infallible;
use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde_json::json;
use warp::http::StatusCode;
use warp::{Filter, Rejection, Reply};

use models::identifiers::{AccountId, AppointmentId, DepartmentId, DoctorId};
use models::medical::AppointmentStatus;

use crate::rest::handlers::{self, DrugSearchQuery};
use crate::state::AppState;

const MAX_BODY_BYTES: u64 = 64 * 1024;

fn with_state(state: Arc<AppState>) -> impl Filter<Extract = (Arc<AppState>,), Error = Infallible> + Clone {
    warp::any().map(move || state.clone())
}

fn auth_header() -> impl Filter<Extract = (Option<String>,), Error = Rejection> + Clone {
    warp::header::optional::<String>("authorization")
}

fn json_body<T: DeserializeOwned + Send>() -> impl Filter<Extract = (T,), Error = Rejection> + Clone {
    warp::body::content_length_limit(MAX_BODY_BYTES).and(warp::body::json())
}

/// Every `/api` route, with rejections rendered as `{"error": ...}` bodies.
pub fn api_routes(state: Arc<AppState>) -> impl Filter<Extract = (impl Reply,), Error = Infallible> + Clone {
    // Public and any authenticated caller
    let register = warp::path!("api" / "register")
        .and(warp::post())
        .and(with_state(state.clone()))
        .and(json_body())
        .and_then(handlers::register);

    let me = warp::path!("api" / "auth" / "me")
        .and(warp::get())
        .and(auth_header())
        .and(with_state(state.clone()))
        .and_then(handlers::me);

    let departments = warp::path!("api" / "departments")
        .and(warp::get())
        .and(auth_header())
        .and(with_state(state.clone()))
        .and_then(handlers::list_departments);

    let doctors = warp::path!("api" / "doctors" / DepartmentId)
        .and(warp::get())
        .and(auth_header())
        .and(with_state(state.clone()))
        .and_then(handlers::doctors_in_department);

    let drug_search = warp::path!("api" / "drugs" / "search")
        .and(warp::get())
        .and(warp::query::<DrugSearchQuery>())
        .and(auth_header())
        .and(with_state(state.clone()))
        .and_then(handlers::search_drugs);

    let shared = register.or(me).or(departments).or(doctors).or(drug_search).boxed();

    // Appointments and prescriptions
    let book = warp::path!("api" / "appointments" / "book")
        .and(warp::post())
        .and(auth_header())
        .and(with_state(state.clone()))
        .and(json_body())
        .and_then(handlers::book_appointment);

    let my_appointments = warp::path!("api" / "my-appointments")
        .and(warp::get())
        .and(auth_header())
        .and(with_state(state.clone()))
        .and_then(handlers::my_appointments);

    let doctor_appointments = warp::path!("api" / "doctor" / "appointments")
        .and(warp::get())
        .and(auth_header())
        .and(with_state(state.clone()))
        .and_then(handlers::doctor_appointments);

    let get_appointment = warp::path!("api" / "appointments" / AppointmentId)
        .and(warp::get())
        .and(auth_header())
        .and(with_state(state.clone()))
        .and_then(handlers::get_appointment);

    let update_status = warp::path!("api" / "appointments" / AppointmentId / "status")
        .and(warp::post())
        .and(auth_header())
        .and(with_state(state.clone()))
        .and(json_body::<AppointmentStatus>())
        .and_then(handlers::update_appointment_status);

    let appointment_prescription = warp::path!("api" / "appointments" / AppointmentId / "prescription")
        .and(warp::get())
        .and(auth_header())
        .and(with_state(state.clone()))
        .and_then(handlers::appointment_prescription);

    let create_prescription = warp::path!("api" / "prescriptions")
        .and(warp::post())
        .and(auth_header())
        .and(with_state(state.clone()))
        .and(json_body())
        .and_then(handlers::create_prescription);

    let my_prescriptions = warp::path!("api" / "my-prescriptions")
        .and(warp::get())
        .and(auth_header())
        .and(with_state(state.clone()))
        .and_then(handlers::my_prescriptions);

    let visits = book
        .or(my_appointments)
        .or(doctor_appointments)
        .or(get_appointment)
        .or(update_status)
        .or(appointment_prescription)
        .or(create_prescription)
        .or(my_prescriptions)
        .boxed();

    // Administration
    let list_users = warp::path!("api" / "admin" / "users")
        .and(warp::get())
        .and(auth_header())
        .and(with_state(state.clone()))
        .and_then(handlers::admin_list_users);

    let create_patient = warp::path!("api" / "admin" / "patients")
        .and(warp::post())
        .and(auth_header())
        .and(with_state(state.clone()))
        .and(json_body())
        .and_then(handlers::admin_create_patient);

    let create_account = warp::path!("api" / "admin" / "accounts")
        .and(warp::post())
        .and(auth_header())
        .and(with_state(state.clone()))
        .and(json_body())
        .and_then(handlers::admin_create_account);

    let update_user = warp::path!("api" / "admin" / "users" / AccountId)
        .and(warp::put())
        .and(auth_header())
        .and(with_state(state.clone()))
        .and(json_body())
        .and_then(handlers::admin_update_user);

    let delete_user = warp::path!("api" / "admin" / "users" / AccountId)
        .and(warp::delete())
        .and(auth_header())
        .and(with_state(state.clone()))
        .and_then(handlers::admin_delete_user);

    let list_doctors = warp::path!("api" / "admin" / "doctors")
        .and(warp::get())
        .and(auth_header())
        .and(with_state(state.clone()))
        .and_then(handlers::admin_list_doctors);

    let create_doctor = warp::path!("api" / "admin" / "doctors")
        .and(warp::post())
        .and(auth_header())
        .and(with_state(state.clone()))
        .and(json_body())
        .and_then(handlers::admin_create_doctor);

    let update_doctor = warp::path!("api" / "admin" / "doctors" / DoctorId)
        .and(warp::put())
        .and(auth_header())
        .and(with_state(state.clone()))
        .and(json_body())
        .and_then(handlers::admin_update_doctor);

    let create_department = warp::path!("api" / "admin" / "departments")
        .and(warp::post())
        .and(auth_header())
        .and(with_state(state.clone()))
        .and(json_body())
        .and_then(handlers::admin_create_department);

    let update_department = warp::path!("api" / "admin" / "departments" / DepartmentId)
        .and(warp::put())
        .and(auth_header())
        .and(with_state(state.clone()))
        .and(json_body())
        .and_then(handlers::admin_update_department);

    let delete_department = warp::path!("api" / "admin" / "departments" / DepartmentId)
        .and(warp::delete())
        .and(auth_header())
        .and(with_state(state))
        .and_then(handlers::admin_delete_department);

    let admin = list_users
        .or(create_patient)
        .or(create_account)
        .or(update_user)
        .or(delete_user)
        .or(list_doctors)
        .or(create_doctor)
        .or(update_doctor)
        .or(create_department)
        .or(update_department)
        .or(delete_department)
        .boxed();

    shared
        .or(visits)
        .or(admin)
        .recover(handle_rejection)
        .with(warp::log("clinic_server::api"))
}

async fn handle_rejection(err: Rejection) -> Result<impl Reply, Infallible> {
    let (status, message) = if err.is_not_found() {
        (StatusCode::NOT_FOUND, "route not found".to_string())
    } else if let Some(e) = err.find::<warp::filters::body::BodyDeserializeError>() {
        (StatusCode::BAD_REQUEST, format!("invalid request body: {}", e))
    } else if let Some(e) = err.find::<warp::reject::InvalidQuery>() {
        (StatusCode::BAD_REQUEST, e.to_string())
    } else if err.find::<warp::reject::PayloadTooLarge>().is_some() {
        (StatusCode::PAYLOAD_TOO_LARGE, "request body too large".to_string())
    } else if err.find::<warp::reject::MethodNotAllowed>().is_some() {
        (StatusCode::METHOD_NOT_ALLOWED, "method not allowed".to_string())
    } else {
        log::error!("[Api] Unhandled rejection: {:?}", err);
        (StatusCode::INTERNAL_SERVER_ERROR, "unhandled rejection".to_string())
    };
    Ok(warp::reply::with_status(warp::reply::json(&json!({ "error": message })), status))
}
