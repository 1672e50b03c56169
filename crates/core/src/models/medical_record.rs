use std::{fmt, str::FromStr};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::errors::PortalError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum RecordType {
    Diagnosis,
    Prescription,
    LabResult,
    Note,
}

impl RecordType {
    pub fn as_str(&self) -> &'static str {
        match self {
            RecordType::Diagnosis => "diagnosis",
            RecordType::Prescription => "prescription",
            RecordType::LabResult => "lab-result",
            RecordType::Note => "note",
        }
    }
}

impl fmt::Display for RecordType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RecordType {
    type Err = PortalError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "diagnosis" => Ok(RecordType::Diagnosis),
            "prescription" => Ok(RecordType::Prescription),
            "lab-result" => Ok(RecordType::LabResult),
            "note" => Ok(RecordType::Note),
            other => Err(PortalError::Validation(format!(
                "Unknown record type: {}",
                other
            ))),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MedicalRecord {
    pub id: Uuid,
    pub patient_id: Uuid,
    pub doctor_id: Uuid,
    pub appointment_id: Option<Uuid>,
    pub record_type: RecordType,
    pub title: String,
    pub description: Option<String>,
    /// Opaque reference to an uploaded file; storage lives elsewhere.
    pub file_path: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateMedicalRecordRequest {
    pub csrf_token: String,
    pub patient_id: Uuid,
    pub appointment_id: Option<Uuid>,
    pub record_type: RecordType,
    pub title: String,
    pub description: Option<String>,
    pub file_path: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MedicalRecordQuery {
    pub patient_id: Option<Uuid>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MedicalRecordListResponse {
    pub records: Vec<MedicalRecord>,
}
