// lib/src/storage_engine/inmemory_storage.rs

use std::collections::BTreeMap;

use async_trait::async_trait;
use chrono::Utc;
use log::{debug, info};
use tokio::sync::Mutex as TokioMutex;

use models::errors::{ClinicError, ClinicResult, ValidationError};
use models::identifiers::{AccountId, AppointmentId, DepartmentId, DoctorId, PrescriptionId};
use models::medical::{
    Account, AccountRecord, Appointment, AppointmentStatus, Department, DoctorProfile,
    NewAccount, NewAppointment, NewDepartment, NewDoctorProfile, NewPrescription, Prescription,
};

use crate::storage_engine::{AccountStore, AppointmentLedger};

#[derive(Debug, Default)]
struct Sequences {
    account: u64,
    doctor: u64,
    department: u64,
    appointment: u64,
    prescription: u64,
}

fn next(seq: &mut u64) -> u64 {
    *seq += 1;
    *seq
}

#[derive(Debug, Default)]
struct ClinicTables {
    accounts: BTreeMap<AccountId, AccountRecord>,
    doctors: BTreeMap<DoctorId, DoctorProfile>,
    departments: BTreeMap<DepartmentId, Department>,
    appointments: BTreeMap<AppointmentId, Appointment>,
    prescriptions: BTreeMap<PrescriptionId, Prescription>,
    seq: Sequences,
}

impl ClinicTables {
    fn username_owner(&self, username: &str) -> Option<AccountId> {
        self.accounts
            .values()
            .find(|r| r.account.username == username)
            .map(|r| r.account.id)
    }

    fn prescription_for(&self, id: AppointmentId) -> Option<&Prescription> {
        self.prescriptions.values().find(|p| p.appointment_id == id)
    }
}

/// Process-local engine. All tables sit behind a single lock so that
/// multi-record writes are atomic.
#[derive(Debug, Default)]
pub struct InMemoryStorage {
    tables: TokioMutex<ClinicTables>,
}

impl InMemoryStorage {
    pub fn new() -> Self {
        info!("[Storage] Initialized in-memory clinic storage");
        InMemoryStorage::default()
    }
}

#[async_trait]
impl AccountStore for InMemoryStorage {
    async fn insert_account(&self, account: NewAccount) -> ClinicResult<Account> {
        let mut t = self.tables.lock().await;
        if t.username_owner(&account.username).is_some() {
            return Err(ValidationError::UsernameTaken.into());
        }
        let id = AccountId(next(&mut t.seq.account));
        let record = account.into_record(id);
        let out = record.account.clone();
        t.accounts.insert(id, record);
        debug!("[Storage] Inserted account {}", id);
        Ok(out)
    }

    async fn insert_doctor_account(
        &self,
        account: NewAccount,
        profile: NewDoctorProfile,
    ) -> ClinicResult<(Account, DoctorProfile)> {
        let mut t = self.tables.lock().await;
        if t.username_owner(&account.username).is_some() {
            return Err(ValidationError::UsernameTaken.into());
        }
        if !t.departments.contains_key(&profile.department_id) {
            return Err(ClinicError::not_found("department", profile.department_id));
        }
        let account_id = AccountId(next(&mut t.seq.account));
        let doctor_id = DoctorId(next(&mut t.seq.doctor));
        let record = account.into_record(account_id);
        let account = record.account.clone();
        let profile = profile.into_profile(doctor_id, account_id);
        t.accounts.insert(account_id, record);
        t.doctors.insert(doctor_id, profile.clone());
        Ok((account, profile))
    }

    async fn get_account(&self, id: AccountId) -> ClinicResult<Option<AccountRecord>> {
        Ok(self.tables.lock().await.accounts.get(&id).cloned())
    }

    async fn find_account_by_username(&self, username: &str) -> ClinicResult<Option<AccountRecord>> {
        let t = self.tables.lock().await;
        Ok(t.accounts.values().find(|r| r.account.username == username).cloned())
    }

    async fn update_account(&self, record: AccountRecord) -> ClinicResult<Account> {
        let mut t = self.tables.lock().await;
        let id = record.account.id;
        if !t.accounts.contains_key(&id) {
            return Err(ClinicError::not_found("account", id));
        }
        if matches!(t.username_owner(&record.account.username), Some(owner) if owner != id) {
            return Err(ValidationError::UsernameTaken.into());
        }
        let out = record.account.clone();
        t.accounts.insert(id, record);
        Ok(out)
    }

    async fn list_accounts(&self) -> ClinicResult<Vec<Account>> {
        let t = self.tables.lock().await;
        Ok(t.accounts.values().map(|r| r.account.clone()).collect())
    }

    async fn delete_account(&self, id: AccountId) -> ClinicResult<()> {
        let mut t = self.tables.lock().await;
        if !t.accounts.contains_key(&id) {
            return Err(ClinicError::not_found("account", id));
        }
        if t.doctors.values().any(|d| d.account_id == id) {
            return Err(ClinicError::InvalidState(format!("account {} owns a doctor profile", id)));
        }
        if t.appointments.values().any(|a| a.patient_id == id) {
            return Err(ClinicError::InvalidState(format!("account {} has appointments", id)));
        }
        t.accounts.remove(&id);
        Ok(())
    }

    async fn get_doctor(&self, id: DoctorId) -> ClinicResult<Option<DoctorProfile>> {
        Ok(self.tables.lock().await.doctors.get(&id).cloned())
    }

    async fn find_doctor_by_account(&self, account_id: AccountId) -> ClinicResult<Option<DoctorProfile>> {
        let t = self.tables.lock().await;
        Ok(t.doctors.values().find(|d| d.account_id == account_id).cloned())
    }

    async fn list_doctors(&self) -> ClinicResult<Vec<DoctorProfile>> {
        Ok(self.tables.lock().await.doctors.values().cloned().collect())
    }

    async fn list_doctors_in_department(&self, department_id: DepartmentId) -> ClinicResult<Vec<DoctorProfile>> {
        let t = self.tables.lock().await;
        Ok(t.doctors
            .values()
            .filter(|d| d.department_id == department_id)
            .cloned()
            .collect())
    }

    async fn update_doctor(&self, profile: DoctorProfile, full_name: Option<String>) -> ClinicResult<DoctorProfile> {
        let mut t = self.tables.lock().await;
        if !t.doctors.contains_key(&profile.id) {
            return Err(ClinicError::not_found("doctor", profile.id));
        }
        if !t.departments.contains_key(&profile.department_id) {
            return Err(ClinicError::not_found("department", profile.department_id));
        }
        if let Some(full_name) = full_name {
            match t.accounts.get_mut(&profile.account_id) {
                Some(record) => record.account.full_name = full_name,
                None => return Err(ClinicError::not_found("account", profile.account_id)),
            }
        }
        t.doctors.insert(profile.id, profile.clone());
        Ok(profile)
    }

    async fn insert_department(&self, department: NewDepartment) -> ClinicResult<Department> {
        let mut t = self.tables.lock().await;
        let id = DepartmentId(next(&mut t.seq.department));
        let department = department.into_department(id);
        t.departments.insert(id, department.clone());
        Ok(department)
    }

    async fn get_department(&self, id: DepartmentId) -> ClinicResult<Option<Department>> {
        Ok(self.tables.lock().await.departments.get(&id).cloned())
    }

    async fn list_departments(&self) -> ClinicResult<Vec<Department>> {
        Ok(self.tables.lock().await.departments.values().cloned().collect())
    }

    async fn update_department(&self, department: Department) -> ClinicResult<Department> {
        let mut t = self.tables.lock().await;
        match t.departments.get_mut(&department.id) {
            Some(slot) => {
                *slot = department.clone();
                Ok(department)
            }
            None => Err(ClinicError::not_found("department", department.id)),
        }
    }

    async fn delete_department(&self, id: DepartmentId) -> ClinicResult<()> {
        let mut t = self.tables.lock().await;
        if !t.departments.contains_key(&id) {
            return Err(ClinicError::not_found("department", id));
        }
        let assigned = t.doctors.values().filter(|d| d.department_id == id).count();
        if assigned > 0 {
            return Err(ClinicError::InvalidState(format!(
                "department {} still has {} doctor(s)",
                id, assigned
            )));
        }
        t.departments.remove(&id);
        Ok(())
    }
}

#[async_trait]
impl AppointmentLedger for InMemoryStorage {
    async fn insert_appointment(&self, appointment: NewAppointment) -> ClinicResult<Appointment> {
        let mut t = self.tables.lock().await;
        if !t.accounts.contains_key(&appointment.patient_id) {
            return Err(ClinicError::not_found("account", appointment.patient_id));
        }
        if !t.doctors.contains_key(&appointment.doctor_id) {
            return Err(ClinicError::not_found("doctor", appointment.doctor_id));
        }
        let id = AppointmentId(next(&mut t.seq.appointment));
        let appointment = appointment.into_appointment(id, Utc::now());
        t.appointments.insert(id, appointment.clone());
        Ok(appointment)
    }

    async fn get_appointment(&self, id: AppointmentId) -> ClinicResult<Option<Appointment>> {
        Ok(self.tables.lock().await.appointments.get(&id).cloned())
    }

    async fn list_for_patient(&self, patient_id: AccountId) -> ClinicResult<Vec<Appointment>> {
        let t = self.tables.lock().await;
        Ok(t.appointments
            .values()
            .filter(|a| a.patient_id == patient_id)
            .cloned()
            .collect())
    }

    async fn list_for_doctor(&self, doctor_id: DoctorId) -> ClinicResult<Vec<Appointment>> {
        let t = self.tables.lock().await;
        Ok(t.appointments
            .values()
            .filter(|a| a.doctor_id == doctor_id)
            .cloned()
            .collect())
    }

    async fn update_status(
        &self,
        id: AppointmentId,
        expected_version: u64,
        status: AppointmentStatus,
    ) -> ClinicResult<Appointment> {
        let mut t = self.tables.lock().await;
        let appointment = t
            .appointments
            .get_mut(&id)
            .ok_or_else(|| ClinicError::not_found("appointment", id))?;
        if appointment.version != expected_version {
            return Err(stale(id, expected_version, appointment.version));
        }
        appointment.apply_status(status, Utc::now());
        Ok(appointment.clone())
    }

    async fn complete_with_prescription(
        &self,
        id: AppointmentId,
        expected_version: u64,
        prescription: NewPrescription,
    ) -> ClinicResult<(Appointment, Prescription)> {
        let mut guard = self.tables.lock().await;
        let t = &mut *guard;

        let current = t
            .appointments
            .get(&id)
            .ok_or_else(|| ClinicError::not_found("appointment", id))?;
        if t.prescription_for(id).is_some() {
            return Err(ClinicError::InvalidState(format!(
                "appointment {} already has a prescription",
                id
            )));
        }
        if current.version != expected_version {
            return Err(stale(id, expected_version, current.version));
        }
        if current.status != AppointmentStatus::Approved {
            return Err(ClinicError::InvalidTransition {
                from: current.status,
                to: AppointmentStatus::Completed,
            });
        }

        let now = Utc::now();
        let prescription_id = PrescriptionId(next(&mut t.seq.prescription));
        let prescription = prescription.into_prescription(prescription_id, id, now);
        let appointment = match t.appointments.get_mut(&id) {
            Some(a) => {
                a.apply_status(AppointmentStatus::Completed, now);
                a.clone()
            }
            None => return Err(ClinicError::not_found("appointment", id)),
        };
        t.prescriptions.insert(prescription_id, prescription.clone());
        Ok((appointment, prescription))
    }

    async fn get_prescription_for_appointment(&self, id: AppointmentId) -> ClinicResult<Option<Prescription>> {
        Ok(self.tables.lock().await.prescription_for(id).cloned())
    }

    async fn list_prescriptions_for_patient(&self, patient_id: AccountId) -> ClinicResult<Vec<Prescription>> {
        let t = self.tables.lock().await;
        Ok(t.prescriptions
            .values()
            .filter(|p| {
                t.appointments
                    .get(&p.appointment_id)
                    .map_or(false, |a| a.patient_id == patient_id)
            })
            .cloned()
            .collect())
    }
}

pub(crate) fn stale(id: AppointmentId, expected: u64, actual: u64) -> ClinicError {
    ClinicError::Conflict(format!(
        "appointment {} was modified concurrently (expected version {}, found {})",
        id, expected, actual
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage_engine::conformance;

    #[tokio::test]
    async fn should_enforce_unique_usernames() {
        conformance::unique_usernames(&InMemoryStorage::new()).await;
    }

    #[tokio::test]
    async fn should_insert_doctor_account_atomically() {
        conformance::doctor_account_requires_department(&InMemoryStorage::new()).await;
    }

    #[tokio::test]
    async fn should_guard_department_and_account_deletion() {
        conformance::referenced_records_are_not_deleted(&InMemoryStorage::new()).await;
    }

    #[tokio::test]
    async fn should_list_appointments_in_id_order() {
        conformance::appointments_listed_by_owner(&InMemoryStorage::new()).await;
    }

    #[tokio::test]
    async fn should_refuse_appointments_for_missing_participants() {
        conformance::appointments_require_live_participants(&InMemoryStorage::new()).await;
    }

    #[tokio::test]
    async fn should_update_doctor_and_name_together() {
        conformance::doctor_update_is_all_or_nothing(&InMemoryStorage::new()).await;
    }

    #[tokio::test]
    async fn should_reject_stale_status_write() {
        conformance::stale_version_conflicts(&InMemoryStorage::new()).await;
    }

    #[tokio::test]
    async fn should_complete_with_prescription_all_or_nothing() {
        conformance::completion_is_all_or_nothing(&InMemoryStorage::new()).await;
    }

    #[tokio::test]
    async fn should_allow_only_one_of_two_racing_completions() {
        let storage = std::sync::Arc::new(InMemoryStorage::new());
        conformance::racing_completions(storage).await;
    }
}
