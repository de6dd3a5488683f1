// models/src/identifiers.rs

use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};

use crate::errors::ValidationError;

/// Generates a storage-assigned numeric record id.
///
/// Ids are allocated in creation order, so the big-endian key form sorts
/// the same way the numbers do.
macro_rules! record_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(pub u64);

        impl $name {
            pub fn new(id: u64) -> Self {
                $name(id)
            }

            pub fn get(&self) -> u64 {
                self.0
            }

            pub fn to_key(&self) -> [u8; 8] {
                self.0.to_be_bytes()
            }

            pub fn from_key(bytes: &[u8]) -> Result<Self, ValidationError> {
                let arr: [u8; 8] = bytes
                    .try_into()
                    .map_err(|_| ValidationError::InvalidIdentifier(format!("{:?}", bytes)))?;
                Ok($name(u64::from_be_bytes(arr)))
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl FromStr for $name {
            type Err = ValidationError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                s.trim()
                    .parse::<u64>()
                    .map($name)
                    .map_err(|_| ValidationError::InvalidIdentifier(s.to_string()))
            }
        }

        impl From<u64> for $name {
            fn from(id: u64) -> Self {
                $name(id)
            }
        }
    };
}

record_id!(
    /// Identifies an account of any role.
    AccountId
);
record_id!(
    /// Identifies a doctor profile; distinct from the backing account id.
    DoctorId
);
record_id!(DepartmentId);
record_id!(AppointmentId);
record_id!(PrescriptionId);
