// clinic_services/src/accounts/password.rs

use log::warn;

use models::errors::{ClinicError, ClinicResult};

/// Turns raw passwords into opaque stored credentials and checks them back.
pub trait PasswordHasher: Send + Sync {
    fn hash(&self, raw: &str) -> ClinicResult<String>;
    fn verify(&self, raw: &str, stored: &str) -> bool;
}

/// Bcrypt (`$2b$<cost>$...`), salted per call.
#[derive(Debug, Clone, Copy)]
pub struct BcryptHasher {
    cost: u32,
}

impl BcryptHasher {
    pub fn with_cost(cost: u32) -> Self {
        BcryptHasher { cost }
    }
}

impl Default for BcryptHasher {
    fn default() -> Self {
        BcryptHasher::with_cost(bcrypt::DEFAULT_COST)
    }
}

impl PasswordHasher for BcryptHasher {
    fn hash(&self, raw: &str) -> ClinicResult<String> {
        bcrypt::hash(raw, self.cost)
            .map_err(|e| ClinicError::Internal(format!("password hashing failed: {}", e)))
    }

    /// Malformed stored hashes never verify.
    fn verify(&self, raw: &str, stored: &str) -> bool {
        match bcrypt::verify(raw, stored) {
            Ok(matched) => matched,
            Err(e) => {
                warn!("[Accounts] Stored credential could not be checked: {}", e);
                false
            }
        }
    }
}
