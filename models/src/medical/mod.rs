// models/src/medical/mod.rs

pub mod account;
pub mod appointment;
pub mod department;
pub mod doctor;
pub mod prescription;

pub use account::{Account, AccountRecord, Caller, NewAccount, Role};
pub use appointment::{
    Appointment, AppointmentStatus, NewAppointment, StatusTransition, StatusTrigger,
    APPOINTMENT_TRANSITIONS,
};
pub use department::{Department, NewDepartment};
pub use doctor::{DoctorListing, DoctorProfile, NewDoctorProfile};
pub use prescription::{NewPrescription, Prescription};
