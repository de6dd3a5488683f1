// lib/src/storage_engine/mod.rs

use std::sync::Arc;

use async_trait::async_trait;
use log::info;

use models::errors::ClinicResult;
use models::identifiers::{AccountId, AppointmentId, DepartmentId, DoctorId};
use models::medical::{
    Account, AccountRecord, Appointment, AppointmentStatus, Department, DoctorProfile,
    NewAccount, NewAppointment, NewDepartment, NewDoctorProfile, NewPrescription, Prescription,
};

use crate::config::{StorageConfig, StorageEngineType};

pub mod inmemory_storage;
#[cfg(feature = "with-sled")]
pub mod sled_storage;
#[cfg(test)]
mod conformance;

pub use inmemory_storage::InMemoryStorage;
#[cfg(feature = "with-sled")]
pub use sled_storage::SledStorage;

/// Persistence for accounts, doctor profiles and departments.
///
/// Every method that checks a cross-record rule (unique username, existing
/// department, unreferenced record) does so atomically with its write.
#[async_trait]
pub trait AccountStore: Send + Sync {
    /// Fails with `ValidationError::UsernameTaken` when the username exists.
    async fn insert_account(&self, account: NewAccount) -> ClinicResult<Account>;
    /// Inserts the account and its profile together, or neither.
    async fn insert_doctor_account(
        &self,
        account: NewAccount,
        profile: NewDoctorProfile,
    ) -> ClinicResult<(Account, DoctorProfile)>;
    async fn get_account(&self, id: AccountId) -> ClinicResult<Option<AccountRecord>>;
    async fn find_account_by_username(&self, username: &str) -> ClinicResult<Option<AccountRecord>>;
    /// Replaces a stored account, re-checking username ownership.
    async fn update_account(&self, record: AccountRecord) -> ClinicResult<Account>;
    async fn list_accounts(&self) -> ClinicResult<Vec<Account>>;
    /// Refuses with `InvalidState` while a doctor profile or appointment refers to the account.
    async fn delete_account(&self, id: AccountId) -> ClinicResult<()>;

    async fn get_doctor(&self, id: DoctorId) -> ClinicResult<Option<DoctorProfile>>;
    async fn find_doctor_by_account(&self, account_id: AccountId) -> ClinicResult<Option<DoctorProfile>>;
    async fn list_doctors(&self) -> ClinicResult<Vec<DoctorProfile>>;
    async fn list_doctors_in_department(&self, department_id: DepartmentId) -> ClinicResult<Vec<DoctorProfile>>;
    /// Writes the profile and, when given, the owning account's full name together.
    async fn update_doctor(&self, profile: DoctorProfile, full_name: Option<String>) -> ClinicResult<DoctorProfile>;

    async fn insert_department(&self, department: NewDepartment) -> ClinicResult<Department>;
    async fn get_department(&self, id: DepartmentId) -> ClinicResult<Option<Department>>;
    async fn list_departments(&self) -> ClinicResult<Vec<Department>>;
    async fn update_department(&self, department: Department) -> ClinicResult<Department>;
    /// Refuses with `InvalidState` while any doctor belongs to the department.
    async fn delete_department(&self, id: DepartmentId) -> ClinicResult<()>;
}

/// Persistence for appointments and the prescriptions that complete them.
#[async_trait]
pub trait AppointmentLedger: Send + Sync {
    async fn insert_appointment(&self, appointment: NewAppointment) -> ClinicResult<Appointment>;
    async fn get_appointment(&self, id: AppointmentId) -> ClinicResult<Option<Appointment>>;
    /// In id order.
    async fn list_for_patient(&self, patient_id: AccountId) -> ClinicResult<Vec<Appointment>>;
    /// In id order.
    async fn list_for_doctor(&self, doctor_id: DoctorId) -> ClinicResult<Vec<Appointment>>;
    /// Compare-and-set on `version`; a stale version yields `Conflict`.
    async fn update_status(
        &self,
        id: AppointmentId,
        expected_version: u64,
        status: AppointmentStatus,
    ) -> ClinicResult<Appointment>;
    /// Stores the prescription and moves the appointment to COMPLETED as one
    /// unit of work. Either both writes persist or neither does.
    async fn complete_with_prescription(
        &self,
        id: AppointmentId,
        expected_version: u64,
        prescription: NewPrescription,
    ) -> ClinicResult<(Appointment, Prescription)>;
    async fn get_prescription_for_appointment(&self, id: AppointmentId) -> ClinicResult<Option<Prescription>>;
    async fn list_prescriptions_for_patient(&self, patient_id: AccountId) -> ClinicResult<Vec<Prescription>>;
}

/// Both store views of one engine instance.
#[derive(Clone)]
pub struct StorageHandles {
    pub engine_type: StorageEngineType,
    pub accounts: Arc<dyn AccountStore>,
    pub ledger: Arc<dyn AppointmentLedger>,
}

impl StorageHandles {
    pub fn from_engine<S>(engine_type: StorageEngineType, engine: Arc<S>) -> Self
    where
        S: AccountStore + AppointmentLedger + 'static,
    {
        StorageHandles {
            engine_type,
            accounts: engine.clone(),
            ledger: engine,
        }
    }
}

pub async fn create_storage(config: &StorageConfig) -> ClinicResult<StorageHandles> {
    info!("[Storage] Creating {} storage engine", config.storage_engine_type);
    match config.storage_engine_type {
        StorageEngineType::InMemory => Ok(StorageHandles::from_engine(
            StorageEngineType::InMemory,
            Arc::new(InMemoryStorage::new()),
        )),
        #[cfg(feature = "with-sled")]
        StorageEngineType::Sled => {
            let engine = SledStorage::open(&config.path)?;
            Ok(StorageHandles::from_engine(StorageEngineType::Sled, Arc::new(engine)))
        }
        #[cfg(not(feature = "with-sled"))]
        StorageEngineType::Sled => Err(models::errors::ClinicError::Configuration(
            "sled support is not compiled in; enable the with-sled feature".to_string(),
        )),
    }
}
