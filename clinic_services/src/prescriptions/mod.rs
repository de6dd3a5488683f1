// clinic_services/src/prescriptions/mod.rs
pub mod prescription_service;

pub use prescription_service::{PrescriptionRequest, PrescriptionService, NOTES_PREFIX};
