// clinic_services/src/accounts/account_directory.rs
//! Account Directory: identity resolution, registration and account administration.
//! Owns the username and password policy; the store re-checks uniqueness atomically.

use std::sync::Arc;

use log::{debug, info, warn};
use serde::Deserialize;

use lib::storage_engine::AccountStore;
use models::errors::{ClinicError, ClinicResult, ValidationError};
use models::identifiers::{AccountId, DepartmentId, DoctorId};
use models::medical::{
    Account, AccountRecord, Caller, DoctorListing, DoctorProfile, NewAccount, NewDoctorProfile, Role,
};

use crate::access::{ensure, Action};
use crate::accounts::password::PasswordHasher;
use crate::accounts::validation::{
    require_text, validate_full_name, validate_password_strength, validate_username,
};

const BAD_CREDENTIALS: &str = "invalid username or password";

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegistrationRequest {
    pub username: String,
    pub password: String,
    pub full_name: String,
}

/// Admin-issued account of any role. Doctor accounts also need the profile fields.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ElevatedAccountRequest {
    pub username: String,
    pub password: String,
    pub full_name: String,
    pub role: Role,
    #[serde(default)]
    pub department_id: Option<DepartmentId>,
    #[serde(default)]
    pub specialization: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DoctorRequest {
    pub username: String,
    pub password: String,
    pub full_name: String,
    pub specialization: String,
    pub department_id: DepartmentId,
}

impl From<DoctorRequest> for ElevatedAccountRequest {
    fn from(req: DoctorRequest) -> Self {
        ElevatedAccountRequest {
            username: req.username,
            password: req.password,
            full_name: req.full_name,
            role: Role::Doctor,
            department_id: Some(req.department_id),
            specialization: Some(req.specialization),
        }
    }
}

/// Partial update; `None` leaves the field untouched, as does an empty password.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AccountUpdate {
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub password: Option<String>,
    #[serde(default)]
    pub full_name: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DoctorUpdate {
    #[serde(default)]
    pub full_name: Option<String>,
    #[serde(default)]
    pub department_id: Option<DepartmentId>,
    #[serde(default)]
    pub specialization: Option<String>,
    #[serde(default)]
    pub available: Option<bool>,
}

pub struct AccountDirectory {
    store: Arc<dyn AccountStore>,
    hasher: Arc<dyn PasswordHasher>,
}

impl AccountDirectory {
    pub fn new(store: Arc<dyn AccountStore>, hasher: Arc<dyn PasswordHasher>) -> Self {
        Self { store, hasher }
    }

    // =========================================================================
    // IDENTITY
    // =========================================================================

    /// Same failure for an unknown user and a wrong password.
    pub async fn authenticate(&self, username: &str, raw_password: &str) -> ClinicResult<Caller> {
        let record = self.store.find_account_by_username(username).await?;
        match record {
            Some(record) if self.hasher.verify(raw_password, &record.password_hash) => {
                debug!("[Accounts] Authenticated {} as {}", username, record.account.role);
                Ok(Caller::from(&record.account))
            }
            _ => {
                debug!("[Accounts] Rejected credentials for {}", username);
                Err(ClinicError::Unauthenticated(BAD_CREDENTIALS.to_string()))
            }
        }
    }

    pub async fn current(&self, caller: &Caller) -> ClinicResult<Account> {
        self.account(caller.account_id).await
    }

    pub async fn account(&self, id: AccountId) -> ClinicResult<Account> {
        Ok(self.record(id).await?.account)
    }

    async fn record(&self, id: AccountId) -> ClinicResult<AccountRecord> {
        self.store
            .get_account(id)
            .await?
            .ok_or_else(|| ClinicError::not_found("account", id))
    }

    pub async fn get_doctor(&self, id: DoctorId) -> ClinicResult<DoctorProfile> {
        self.store
            .get_doctor(id)
            .await?
            .ok_or_else(|| ClinicError::not_found("doctor", id))
    }

    /// The caller's doctor profile, if the caller is a doctor and has one.
    pub async fn doctor_for_caller(&self, caller: &Caller) -> ClinicResult<Option<DoctorProfile>> {
        if !caller.is(Role::Doctor) {
            return Ok(None);
        }
        self.store.find_doctor_by_account(caller.account_id).await
    }

    pub async fn listing(&self, profile: DoctorProfile) -> ClinicResult<DoctorListing> {
        let account = self.account(profile.account_id).await?;
        Ok(DoctorListing {
            profile,
            full_name: account.full_name,
            username: account.username,
        })
    }

    pub async fn listings(&self, profiles: Vec<DoctorProfile>) -> ClinicResult<Vec<DoctorListing>> {
        let mut out = Vec::with_capacity(profiles.len());
        for profile in profiles {
            out.push(self.listing(profile).await?);
        }
        Ok(out)
    }

    // =========================================================================
    // REGISTRATION
    // =========================================================================

    /// Self-service sign-up; always yields a PATIENT.
    pub async fn register(&self, request: RegistrationRequest) -> ClinicResult<Account> {
        let new_account = self.prepare(&request.username, &request.password, &request.full_name, Role::Patient).await?;
        let account = self.store.insert_account(new_account).await?;
        info!("[Accounts] Registered patient {} ({})", account.username, account.id);
        Ok(account)
    }

    pub async fn create_patient(&self, caller: &Caller, request: RegistrationRequest) -> ClinicResult<Account> {
        ensure(caller, &Action::ManageAccounts)?;
        let new_account = self.prepare(&request.username, &request.password, &request.full_name, Role::Patient).await?;
        let account = self.store.insert_account(new_account).await?;
        info!("[Accounts] {} created patient {} ({})", caller.username, account.username, account.id);
        Ok(account)
    }

    pub async fn create_elevated_account(
        &self,
        caller: &Caller,
        request: ElevatedAccountRequest,
    ) -> ClinicResult<Account> {
        ensure(caller, &Action::ManageAccounts)?;

        let doctor_profile = if request.role == Role::Doctor {
            let department_id = request.department_id.ok_or(ValidationError::MissingDoctorDetails)?;
            let specialization = request
                .specialization
                .as_deref()
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .ok_or(ValidationError::MissingDoctorDetails)?
                .to_string();
            Some(NewDoctorProfile { department_id, specialization })
        } else {
            None
        };

        let new_account = self.prepare(&request.username, &request.password, &request.full_name, request.role).await?;

        let account = match doctor_profile {
            Some(profile) => {
                if self.store.get_department(profile.department_id).await?.is_none() {
                    return Err(ClinicError::not_found("department", profile.department_id));
                }
                let (account, profile) = self.store.insert_doctor_account(new_account, profile).await?;
                info!("[Accounts] Created doctor profile {} for account {}", profile.id, account.id);
                account
            }
            None => self.store.insert_account(new_account).await?,
        };
        info!("[Accounts] {} created {} account {} ({})", caller.username, account.role, account.username, account.id);
        Ok(account)
    }

    pub async fn create_doctor(&self, caller: &Caller, request: DoctorRequest) -> ClinicResult<DoctorListing> {
        let account = self.create_elevated_account(caller, request.into()).await?;
        let profile = self
            .store
            .find_doctor_by_account(account.id)
            .await?
            .ok_or_else(|| ClinicError::Internal(format!("doctor profile missing for account {}", account.id)))?;
        Ok(DoctorListing {
            profile,
            full_name: account.full_name,
            username: account.username,
        })
    }

    /// Creates the configured administrator unless the username already exists.
    pub async fn ensure_admin(&self, username: &str, raw_password: &str, full_name: &str) -> ClinicResult<Account> {
        if let Some(existing) = self.store.find_account_by_username(username).await? {
            if existing.account.role != Role::Admin {
                warn!("[Accounts] Bootstrap username {} belongs to a {} account", username, existing.account.role);
            }
            return Ok(existing.account);
        }
        let new_account = self.prepare(username, raw_password, full_name, Role::Admin).await?;
        let account = self.store.insert_account(new_account).await?;
        info!("[Accounts] Bootstrapped admin account {} ({})", account.username, account.id);
        Ok(account)
    }

    /// Shape, strength and uniqueness checks, then hashing.
    async fn prepare(&self, username: &str, raw_password: &str, full_name: &str, role: Role) -> ClinicResult<NewAccount> {
        validate_username(username)?;
        validate_full_name(full_name)?;
        validate_password_strength(raw_password)?;
        if self.store.find_account_by_username(username).await?.is_some() {
            return Err(ValidationError::UsernameTaken.into());
        }
        Ok(NewAccount {
            username: username.to_string(),
            password_hash: self.hasher.hash(raw_password)?,
            full_name: full_name.trim().to_string(),
            role,
        })
    }

    // =========================================================================
    // ADMINISTRATION
    // =========================================================================

    pub async fn update(&self, caller: &Caller, id: AccountId, update: AccountUpdate) -> ClinicResult<Account> {
        ensure(caller, &Action::UpdateAccount { account_id: id })?;
        let mut record = self.record(id).await?;

        if let Some(username) = update.username {
            if username != record.account.username {
                validate_username(&username)?;
                if self.store.find_account_by_username(&username).await?.is_some() {
                    return Err(ValidationError::UsernameTaken.into());
                }
                record.account.username = username;
            }
        }
        if let Some(password) = update.password.filter(|p| !p.is_empty()) {
            validate_password_strength(&password)?;
            record.password_hash = self.hasher.hash(&password)?;
        }
        if let Some(full_name) = update.full_name {
            validate_full_name(&full_name)?;
            record.account.full_name = full_name.trim().to_string();
        }

        let account = self.store.update_account(record).await?;
        info!("[Accounts] {} updated account {}", caller.username, account.id);
        Ok(account)
    }

    pub async fn list_accounts(&self, caller: &Caller) -> ClinicResult<Vec<Account>> {
        ensure(caller, &Action::ManageAccounts)?;
        self.store.list_accounts().await
    }

    pub async fn delete_account(&self, caller: &Caller, id: AccountId) -> ClinicResult<()> {
        ensure(caller, &Action::ManageAccounts)?;
        if id == caller.account_id {
            return Err(ClinicError::InvalidState("administrators cannot delete their own account".to_string()));
        }
        self.store.delete_account(id).await?;
        info!("[Accounts] {} deleted account {}", caller.username, id);
        Ok(())
    }

    pub async fn list_doctors(&self, caller: &Caller) -> ClinicResult<Vec<DoctorListing>> {
        ensure(caller, &Action::ManageDoctors)?;
        let profiles = self.store.list_doctors().await?;
        self.listings(profiles).await
    }

    pub async fn update_doctor(&self, caller: &Caller, id: DoctorId, update: DoctorUpdate) -> ClinicResult<DoctorListing> {
        ensure(caller, &Action::ManageDoctors)?;
        let mut profile = self.get_doctor(id).await?;

        if let Some(specialization) = update.specialization {
            profile.specialization = require_text("specialization", &specialization)?;
        }
        if let Some(department_id) = update.department_id {
            profile.department_id = department_id;
        }
        if let Some(available) = update.available {
            profile.available = available;
        }
        let full_name = match update.full_name {
            Some(full_name) => {
                validate_full_name(&full_name)?;
                Some(full_name.trim().to_string())
            }
            None => None,
        };

        let profile = self.store.update_doctor(profile, full_name).await?;
        info!("[Accounts] {} updated doctor profile {}", caller.username, id);
        self.listing(profile).await
    }
}
