// clinic_services/src/accounts/mod.rs
pub mod account_directory;
pub mod password;
pub mod validation;

pub use account_directory::{
    AccountDirectory, AccountUpdate, DoctorRequest, DoctorUpdate, ElevatedAccountRequest,
    RegistrationRequest,
};
pub use password::{BcryptHasher, PasswordHasher};
