// models/src/medical/prescription.rs
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::identifiers::{AppointmentId, PrescriptionId};

/// Issued once, at completion of its appointment. Never modified afterwards.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Prescription {
    pub id: PrescriptionId,
    pub appointment_id: AppointmentId,
    pub diagnosis: String,
    pub medicine_name: String,
    pub dosage: String,
    pub notes: String,
    pub issued_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewPrescription {
    pub diagnosis: String,
    pub medicine_name: String,
    pub dosage: String,
    pub notes: String,
}

impl NewPrescription {
    pub fn into_prescription(
        self,
        id: PrescriptionId,
        appointment_id: AppointmentId,
        issued_at: DateTime<Utc>,
    ) -> Prescription {
        Prescription {
            id,
            appointment_id,
            diagnosis: self.diagnosis,
            medicine_name: self.medicine_name,
            dosage: self.dosage,
            notes: self.notes,
            issued_at,
        }
    }
}
