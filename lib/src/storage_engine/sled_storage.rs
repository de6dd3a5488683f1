// lib/src/storage_engine/sled_storage.rs

use std::path::Path;

use async_trait::async_trait;
use chrono::Utc;
use log::{debug, error, info};
use serde::{de::DeserializeOwned, Serialize};
use sled::transaction::{
    abort, ConflictableTransactionError, ConflictableTransactionResult, TransactionError,
    TransactionalTree,
};
use sled::{Db, Transactional, Tree};

use models::errors::{ClinicError, ClinicResult, ValidationError};
use models::identifiers::{AccountId, AppointmentId, DepartmentId, DoctorId, PrescriptionId};
use models::medical::{
    Account, AccountRecord, Appointment, AppointmentStatus, Department, DoctorProfile,
    NewAccount, NewAppointment, NewDepartment, NewDoctorProfile, NewPrescription, Prescription,
};

use crate::storage_engine::inmemory_storage::stale;
use crate::storage_engine::{AccountStore, AppointmentLedger};

type TxResult<T> = ConflictableTransactionResult<T, ClinicError>;

/// Durable engine on sled. Values are JSON; keys are big-endian ids so tree
/// order is creation order. Secondary trees keep the reference counts that
/// deletions check inside the same transaction as the write.
pub struct SledStorage {
    db: Db,
    accounts: Tree,
    usernames: Tree,
    doctors: Tree,
    doctor_by_account: Tree,
    departments: Tree,
    /// department id -> number of doctors assigned
    department_refs: Tree,
    /// account id -> number of appointments booked as patient
    account_refs: Tree,
    appointments: Tree,
    prescriptions: Tree,
    appointment_prescriptions: Tree,
}

impl SledStorage {
    pub fn open<P: AsRef<Path>>(path: P) -> ClinicResult<Self> {
        let path = path.as_ref();
        info!("[Storage] Opening sled clinic storage at {:?}", path);
        let db = sled::open(path).map_err(|e| {
            error!("[Storage] Failed to open sled database at {:?}: {}", path, e);
            ClinicError::Storage(format!("Failed to open sled database at {}: {}", path.display(), e))
        })?;
        Self::from_db(db)
    }

    /// A throwaway database removed on drop.
    pub fn temporary() -> ClinicResult<Self> {
        let db = sled::Config::new().temporary(true).open()?;
        Self::from_db(db)
    }

    fn from_db(db: Db) -> ClinicResult<Self> {
        Ok(SledStorage {
            accounts: db.open_tree("accounts")?,
            usernames: db.open_tree("usernames")?,
            doctors: db.open_tree("doctors")?,
            doctor_by_account: db.open_tree("doctor_by_account")?,
            departments: db.open_tree("departments")?,
            department_refs: db.open_tree("department_refs")?,
            account_refs: db.open_tree("account_refs")?,
            appointments: db.open_tree("appointments")?,
            prescriptions: db.open_tree("prescriptions")?,
            appointment_prescriptions: db.open_tree("appointment_prescriptions")?,
            db,
        })
    }

    fn next_id(&self) -> ClinicResult<u64> {
        Ok(self.db.generate_id()? + 1)
    }

    async fn flush(&self) -> ClinicResult<()> {
        self.db.flush_async().await?;
        Ok(())
    }

    fn get_decoded<T: DeserializeOwned>(tree: &Tree, key: &[u8]) -> ClinicResult<Option<T>> {
        match tree.get(key)? {
            Some(bytes) => Ok(Some(decode(&bytes)?)),
            None => Ok(None),
        }
    }

    fn scan<T: DeserializeOwned>(tree: &Tree) -> ClinicResult<Vec<T>> {
        tree.iter()
            .values()
            .map(|v| decode(&v?))
            .collect()
    }
}

fn encode<T: Serialize>(value: &T) -> ClinicResult<Vec<u8>> {
    Ok(serde_json::to_vec(value)?)
}

fn decode<T: DeserializeOwned>(bytes: &[u8]) -> ClinicResult<T> {
    Ok(serde_json::from_slice(bytes)?)
}

fn tx_decode<T: DeserializeOwned>(bytes: &[u8]) -> TxResult<T> {
    serde_json::from_slice(bytes).map_err(|e| ConflictableTransactionError::Abort(e.into()))
}

fn tx_encode<T: Serialize>(value: &T) -> TxResult<Vec<u8>> {
    serde_json::to_vec(value).map_err(|e| ConflictableTransactionError::Abort(e.into()))
}

fn tx_count(tree: &TransactionalTree, key: &[u8]) -> TxResult<u64> {
    Ok(tree
        .get(key)?
        .and_then(|v| <[u8; 8]>::try_from(v.as_ref()).ok())
        .map(u64::from_be_bytes)
        .unwrap_or(0))
}

fn tx_adjust(tree: &TransactionalTree, key: &[u8], delta: i64) -> TxResult<()> {
    let count = tx_count(tree, key)?.saturating_add_signed(delta);
    if count == 0 {
        tree.remove(key)?;
    } else {
        tree.insert(key, &count.to_be_bytes()[..])?;
    }
    Ok(())
}

fn from_tx_error(err: TransactionError<ClinicError>) -> ClinicError {
    match err {
        TransactionError::Abort(e) => e,
        TransactionError::Storage(e) => ClinicError::Storage(format!("sled transaction failed: {}", e)),
    }
}

#[async_trait]
impl AccountStore for SledStorage {
    async fn insert_account(&self, account: NewAccount) -> ClinicResult<Account> {
        let record = account.into_record(AccountId(self.next_id()?));
        let key = record.account.id.to_key();
        let bytes = encode(&record)?;
        let username = record.account.username.as_bytes();

        (&self.usernames, &self.accounts)
            .transaction(|(usernames, accounts)| -> TxResult<()> {
                if usernames.get(username)?.is_some() {
                    return abort(ValidationError::UsernameTaken.into());
                }
                usernames.insert(username, &key[..])?;
                accounts.insert(&key[..], bytes.as_slice())?;
                Ok(())
            })
            .map_err(from_tx_error)?;

        self.flush().await?;
        debug!("[Storage] Inserted account {}", record.account.id);
        Ok(record.account)
    }

    async fn insert_doctor_account(
        &self,
        account: NewAccount,
        profile: NewDoctorProfile,
    ) -> ClinicResult<(Account, DoctorProfile)> {
        let record = account.into_record(AccountId(self.next_id()?));
        let profile = profile.into_profile(DoctorId(self.next_id()?), record.account.id);
        let account_key = record.account.id.to_key();
        let doctor_key = profile.id.to_key();
        let department_key = profile.department_id.to_key();
        let account_bytes = encode(&record)?;
        let profile_bytes = encode(&profile)?;
        let username = record.account.username.as_bytes();

        (
            &self.usernames,
            &self.accounts,
            &self.doctors,
            &self.doctor_by_account,
            &self.departments,
            &self.department_refs,
        )
            .transaction(
                |(usernames, accounts, doctors, doctor_by_account, departments, department_refs)| -> TxResult<()> {
                    if usernames.get(username)?.is_some() {
                        return abort(ValidationError::UsernameTaken.into());
                    }
                    if departments.get(&department_key[..])?.is_none() {
                        return abort(ClinicError::not_found("department", profile.department_id));
                    }
                    usernames.insert(username, &account_key[..])?;
                    accounts.insert(&account_key[..], account_bytes.as_slice())?;
                    doctors.insert(&doctor_key[..], profile_bytes.as_slice())?;
                    doctor_by_account.insert(&account_key[..], &doctor_key[..])?;
                    tx_adjust(department_refs, &department_key, 1)?;
                    Ok(())
                },
            )
            .map_err(from_tx_error)?;

        self.flush().await?;
        Ok((record.account, profile))
    }

    async fn get_account(&self, id: AccountId) -> ClinicResult<Option<AccountRecord>> {
        Self::get_decoded(&self.accounts, &id.to_key())
    }

    async fn find_account_by_username(&self, username: &str) -> ClinicResult<Option<AccountRecord>> {
        match self.usernames.get(username.as_bytes())? {
            Some(key) => Self::get_decoded(&self.accounts, &key),
            None => Ok(None),
        }
    }

    async fn update_account(&self, record: AccountRecord) -> ClinicResult<Account> {
        let id = record.account.id;
        let key = id.to_key();
        let bytes = encode(&record)?;
        let new_username = record.account.username.as_bytes();

        (&self.usernames, &self.accounts)
            .transaction(|(usernames, accounts)| -> TxResult<()> {
                let existing: AccountRecord = match accounts.get(&key[..])? {
                    Some(v) => tx_decode(&v)?,
                    None => return abort(ClinicError::not_found("account", id)),
                };
                if existing.account.username.as_bytes() != new_username {
                    if usernames.get(new_username)?.is_some() {
                        return abort(ValidationError::UsernameTaken.into());
                    }
                    usernames.remove(existing.account.username.as_bytes())?;
                    usernames.insert(new_username, &key[..])?;
                }
                accounts.insert(&key[..], bytes.as_slice())?;
                Ok(())
            })
            .map_err(from_tx_error)?;

        self.flush().await?;
        Ok(record.account)
    }

    async fn list_accounts(&self) -> ClinicResult<Vec<Account>> {
        Ok(Self::scan::<AccountRecord>(&self.accounts)?
            .into_iter()
            .map(|r| r.account)
            .collect())
    }

    async fn delete_account(&self, id: AccountId) -> ClinicResult<()> {
        let key = id.to_key();

        (&self.accounts, &self.usernames, &self.doctor_by_account, &self.account_refs)
            .transaction(|(accounts, usernames, doctor_by_account, account_refs)| -> TxResult<()> {
                let existing: AccountRecord = match accounts.get(&key[..])? {
                    Some(v) => tx_decode(&v)?,
                    None => return abort(ClinicError::not_found("account", id)),
                };
                if doctor_by_account.get(&key[..])?.is_some() {
                    return abort(ClinicError::InvalidState(format!("account {} owns a doctor profile", id)));
                }
                if tx_count(account_refs, &key)? > 0 {
                    return abort(ClinicError::InvalidState(format!("account {} has appointments", id)));
                }
                usernames.remove(existing.account.username.as_bytes())?;
                accounts.remove(&key[..])?;
                Ok(())
            })
            .map_err(from_tx_error)?;

        self.flush().await
    }

    async fn get_doctor(&self, id: DoctorId) -> ClinicResult<Option<DoctorProfile>> {
        Self::get_decoded(&self.doctors, &id.to_key())
    }

    async fn find_doctor_by_account(&self, account_id: AccountId) -> ClinicResult<Option<DoctorProfile>> {
        match self.doctor_by_account.get(account_id.to_key())? {
            Some(doctor_key) => Self::get_decoded(&self.doctors, &doctor_key),
            None => Ok(None),
        }
    }

    async fn list_doctors(&self) -> ClinicResult<Vec<DoctorProfile>> {
        Self::scan(&self.doctors)
    }

    async fn list_doctors_in_department(&self, department_id: DepartmentId) -> ClinicResult<Vec<DoctorProfile>> {
        Ok(Self::scan::<DoctorProfile>(&self.doctors)?
            .into_iter()
            .filter(|d| d.department_id == department_id)
            .collect())
    }

    async fn update_doctor(&self, profile: DoctorProfile, full_name: Option<String>) -> ClinicResult<DoctorProfile> {
        let key = profile.id.to_key();
        let account_key = profile.account_id.to_key();
        let new_department = profile.department_id.to_key();
        let bytes = encode(&profile)?;

        (&self.doctors, &self.departments, &self.department_refs, &self.accounts)
            .transaction(|(doctors, departments, department_refs, accounts)| -> TxResult<()> {
                let existing: DoctorProfile = match doctors.get(&key[..])? {
                    Some(v) => tx_decode(&v)?,
                    None => return abort(ClinicError::not_found("doctor", profile.id)),
                };
                if departments.get(&new_department[..])?.is_none() {
                    return abort(ClinicError::not_found("department", profile.department_id));
                }
                if let Some(full_name) = &full_name {
                    let mut record: AccountRecord = match accounts.get(&account_key[..])? {
                        Some(v) => tx_decode(&v)?,
                        None => return abort(ClinicError::not_found("account", profile.account_id)),
                    };
                    record.account.full_name = full_name.clone();
                    accounts.insert(&account_key[..], tx_encode(&record)?)?;
                }
                if existing.department_id != profile.department_id {
                    tx_adjust(department_refs, &existing.department_id.to_key(), -1)?;
                    tx_adjust(department_refs, &new_department, 1)?;
                }
                doctors.insert(&key[..], bytes.as_slice())?;
                Ok(())
            })
            .map_err(from_tx_error)?;

        self.flush().await?;
        Ok(profile)
    }

    async fn insert_department(&self, department: NewDepartment) -> ClinicResult<Department> {
        let department = department.into_department(DepartmentId(self.next_id()?));
        self.departments.insert(department.id.to_key(), encode(&department)?)?;
        self.flush().await?;
        Ok(department)
    }

    async fn get_department(&self, id: DepartmentId) -> ClinicResult<Option<Department>> {
        Self::get_decoded(&self.departments, &id.to_key())
    }

    async fn list_departments(&self) -> ClinicResult<Vec<Department>> {
        Self::scan(&self.departments)
    }

    async fn update_department(&self, department: Department) -> ClinicResult<Department> {
        let key = department.id.to_key();
        let bytes = encode(&department)?;

        self.departments
            .transaction(|departments| -> TxResult<()> {
                if departments.get(&key[..])?.is_none() {
                    return abort(ClinicError::not_found("department", department.id));
                }
                departments.insert(&key[..], bytes.as_slice())?;
                Ok(())
            })
            .map_err(from_tx_error)?;

        self.flush().await?;
        Ok(department)
    }

    async fn delete_department(&self, id: DepartmentId) -> ClinicResult<()> {
        let key = id.to_key();

        (&self.departments, &self.department_refs)
            .transaction(|(departments, department_refs)| -> TxResult<()> {
                if departments.get(&key[..])?.is_none() {
                    return abort(ClinicError::not_found("department", id));
                }
                let assigned = tx_count(department_refs, &key)?;
                if assigned > 0 {
                    return abort(ClinicError::InvalidState(format!(
                        "department {} still has {} doctor(s)",
                        id, assigned
                    )));
                }
                departments.remove(&key[..])?;
                Ok(())
            })
            .map_err(from_tx_error)?;

        self.flush().await
    }
}

#[async_trait]
impl AppointmentLedger for SledStorage {
    async fn insert_appointment(&self, appointment: NewAppointment) -> ClinicResult<Appointment> {
        let appointment = appointment.into_appointment(AppointmentId(self.next_id()?), Utc::now());
        let key = appointment.id.to_key();
        let patient_key = appointment.patient_id.to_key();
        let doctor_key = appointment.doctor_id.to_key();
        let bytes = encode(&appointment)?;

        (&self.accounts, &self.doctors, &self.appointments, &self.account_refs)
            .transaction(|(accounts, doctors, appointments, account_refs)| -> TxResult<()> {
                if accounts.get(&patient_key[..])?.is_none() {
                    return abort(ClinicError::not_found("account", appointment.patient_id));
                }
                if doctors.get(&doctor_key[..])?.is_none() {
                    return abort(ClinicError::not_found("doctor", appointment.doctor_id));
                }
                appointments.insert(&key[..], bytes.as_slice())?;
                tx_adjust(account_refs, &patient_key, 1)?;
                Ok(())
            })
            .map_err(from_tx_error)?;

        self.flush().await?;
        Ok(appointment)
    }

    async fn get_appointment(&self, id: AppointmentId) -> ClinicResult<Option<Appointment>> {
        Self::get_decoded(&self.appointments, &id.to_key())
    }

    async fn list_for_patient(&self, patient_id: AccountId) -> ClinicResult<Vec<Appointment>> {
        Ok(Self::scan::<Appointment>(&self.appointments)?
            .into_iter()
            .filter(|a| a.patient_id == patient_id)
            .collect())
    }

    async fn list_for_doctor(&self, doctor_id: DoctorId) -> ClinicResult<Vec<Appointment>> {
        Ok(Self::scan::<Appointment>(&self.appointments)?
            .into_iter()
            .filter(|a| a.doctor_id == doctor_id)
            .collect())
    }

    async fn update_status(
        &self,
        id: AppointmentId,
        expected_version: u64,
        status: AppointmentStatus,
    ) -> ClinicResult<Appointment> {
        let key = id.to_key();
        let now = Utc::now();

        let updated = self
            .appointments
            .transaction(|appointments| -> TxResult<Appointment> {
                let mut appointment: Appointment = match appointments.get(&key[..])? {
                    Some(v) => tx_decode(&v)?,
                    None => return abort(ClinicError::not_found("appointment", id)),
                };
                if appointment.version != expected_version {
                    return abort(stale(id, expected_version, appointment.version));
                }
                appointment.apply_status(status, now);
                appointments.insert(&key[..], tx_encode(&appointment)?)?;
                Ok(appointment)
            })
            .map_err(from_tx_error)?;

        self.flush().await?;
        Ok(updated)
    }

    async fn complete_with_prescription(
        &self,
        id: AppointmentId,
        expected_version: u64,
        prescription: NewPrescription,
    ) -> ClinicResult<(Appointment, Prescription)> {
        let key = id.to_key();
        let now = Utc::now();
        let prescription = prescription.into_prescription(PrescriptionId(self.next_id()?), id, now);
        let prescription_key = prescription.id.to_key();
        let prescription_bytes = encode(&prescription)?;

        let completed = (&self.appointments, &self.prescriptions, &self.appointment_prescriptions)
            .transaction(|(appointments, prescriptions, appointment_prescriptions)| -> TxResult<Appointment> {
                let mut appointment: Appointment = match appointments.get(&key[..])? {
                    Some(v) => tx_decode(&v)?,
                    None => return abort(ClinicError::not_found("appointment", id)),
                };
                if appointment_prescriptions.get(&key[..])?.is_some() {
                    return abort(ClinicError::InvalidState(format!(
                        "appointment {} already has a prescription",
                        id
                    )));
                }
                if appointment.version != expected_version {
                    return abort(stale(id, expected_version, appointment.version));
                }
                if appointment.status != AppointmentStatus::Approved {
                    return abort(ClinicError::InvalidTransition {
                        from: appointment.status,
                        to: AppointmentStatus::Completed,
                    });
                }
                appointment.apply_status(AppointmentStatus::Completed, now);
                appointments.insert(&key[..], tx_encode(&appointment)?)?;
                prescriptions.insert(&prescription_key[..], prescription_bytes.as_slice())?;
                appointment_prescriptions.insert(&key[..], &prescription_key[..])?;
                Ok(appointment)
            })
            .map_err(from_tx_error)?;

        self.flush().await?;
        Ok((completed, prescription))
    }

    async fn get_prescription_for_appointment(&self, id: AppointmentId) -> ClinicResult<Option<Prescription>> {
        match self.appointment_prescriptions.get(id.to_key())? {
            Some(prescription_key) => Self::get_decoded(&self.prescriptions, &prescription_key),
            None => Ok(None),
        }
    }

    async fn list_prescriptions_for_patient(&self, patient_id: AccountId) -> ClinicResult<Vec<Prescription>> {
        let mut out = Vec::new();
        for prescription in Self::scan::<Prescription>(&self.prescriptions)? {
            let appointment: Option<Appointment> =
                Self::get_decoded(&self.appointments, &prescription.appointment_id.to_key())?;
            if appointment.map_or(false, |a| a.patient_id == patient_id) {
                out.push(prescription);
            }
        }
        Ok(out)
    }
}
