// models/src/medical/doctor.rs
use serde::{Deserialize, Serialize};

use crate::identifiers::{AccountId, DepartmentId, DoctorId};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DoctorProfile {
    pub id: DoctorId,
    pub account_id: AccountId,
    pub department_id: DepartmentId,
    pub specialization: String,
    pub available: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewDoctorProfile {
    pub department_id: DepartmentId,
    pub specialization: String,
}

impl NewDoctorProfile {
    pub fn into_profile(self, id: DoctorId, account_id: AccountId) -> DoctorProfile {
        DoctorProfile {
            id,
            account_id,
            department_id: self.department_id,
            specialization: self.specialization,
            available: true,
        }
    }
}

/// A profile joined with the display fields of its backing account.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DoctorListing {
    #[serde(flatten)]
    pub profile: DoctorProfile,
    pub full_name: String,
    pub username: String,
}
