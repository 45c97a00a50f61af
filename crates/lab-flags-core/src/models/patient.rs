//! Patient models.

use serde::{Deserialize, Serialize};

/// A patient record, keyed locally by UUID and naturally by CPF.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Patient {
    /// Local UUID - always present, generated locally
    pub local_id: String,
    /// Patient name
    pub name: String,
    /// CPF (national taxpayer id) - unique per patient
    pub cpf: String,
    /// Date of birth as printed on the report (DD/MM/YYYY)
    pub birth_date: Option<String>,
    /// Gender as printed on the report (free text)
    pub gender: Option<String>,
    /// RG (identity card number)
    pub rg: Option<String>,
    /// Health insurance plan
    pub insurance: Option<String>,
    /// Service order code from the laboratory
    pub os_code: Option<String>,
    /// Appointment date as printed on the report
    pub appointment_date: Option<String>,
    /// Requesting doctor
    pub doctor: Option<String>,
    /// Creation timestamp
    pub created_at: String,
    /// Last update timestamp
    pub updated_at: String,
}

impl Patient {
    /// Create a new patient with required fields.
    pub fn new(name: String, cpf: String) -> Self {
        let now = chrono::Utc::now().to_rfc3339();
        Self {
            local_id: uuid::Uuid::new_v4().to_string(),
            name,
            cpf,
            birth_date: None,
            gender: None,
            rg: None,
            insurance: None,
            os_code: None,
            appointment_date: None,
            doctor: None,
            created_at: now.clone(),
            updated_at: now,
        }
    }

    /// Birth date, if present and not blank.
    pub fn birth_date(&self) -> Option<&str> {
        self.birth_date
            .as_deref()
            .map(str::trim)
            .filter(|d| !d.is_empty())
    }

    /// Gender lower-cased, or empty when unknown.
    pub fn canonical_gender(&self) -> String {
        self.gender
            .as_deref()
            .unwrap_or_default()
            .trim()
            .to_lowercase()
    }
}
