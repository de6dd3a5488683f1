// models/src/medical/department.rs
use serde::{Deserialize, Serialize};

use crate::identifiers::DepartmentId;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Department {
    pub id: DepartmentId,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewDepartment {
    pub name: String,
    pub description: Option<String>,
}

impl NewDepartment {
    pub fn into_department(self, id: DepartmentId) -> Department {
        Department {
            id,
            name: self.name,
            description: self.description,
        }
    }
}
