//! Lab-Flags Core Library
//!
//! Flags abnormal results in structured laboratory exams.
//!
//! # Architecture
//!
//! ```text
//! PDF → Text Extraction → AI Structuring → parsed exam JSON
//!                                               │
//!                                    [ingest: validate + type]
//!                                               │
//!                                     SQLite store (by exam id)
//!                                               │
//!                          ┌────────────────────▼────────────────────┐
//!                          │            Abnormal Filter              │
//!                          │  per test: select ranges (age/gender)   │
//!                          │            parse range, classify        │
//!                          └────────────────────┬────────────────────┘
//!                                               │
//!                                  altered tests (acima / abaixo)
//! ```
//!
//! Unparseable results or ranges are never flagged; only a missing or
//! malformed patient birth date fails a batch.
//!
//! # Modules
//!
//! - [`classifier`]: numeric normalizer, range parser, age, range selector, classifier
//! - [`models`]: Domain types (Patient, TestResult, ReferenceRange, ...)
//! - [`ingest`]: Structured exam JSON validation
//! - [`db`]: SQLite store for patients and exams

pub mod classifier;
pub mod db;
pub mod ingest;
pub mod models;

// Re-export commonly used types
pub use classifier::{classify, filter_abnormal, AbnormalFilter, ClassifierConfig, ClassifierError};
pub use db::Database;
pub use ingest::parse_exam_payload;
pub use models::{
    AbnormalReport, AnnotatedTestResult, ClassificationStatus, ExamReport, Patient,
    ReferenceRange, TestResult,
};

// UniFFI setup - using proc macros
uniffi::setup_scaffolding!();

use std::sync::{Arc, Mutex};

// =========================================================================
// FFI Error Type
// =========================================================================

#[derive(Debug, thiserror::Error, uniffi::Error)]
pub enum LabFlagsError {
    #[error("Database error: {0}")]
    DatabaseError(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Serialization error: {0}")]
    SerializationError(String),

    #[error("Configuration error: {0}")]
    ConfigError(String),
}

impl From<db::DbError> for LabFlagsError {
    fn from(e: db::DbError) -> Self {
        match e {
            db::DbError::NotFound(what) => LabFlagsError::NotFound(what),
            db::DbError::Classifier(e) => e.into(),
            db::DbError::Json(e) => e.into(),
            other => LabFlagsError::DatabaseError(other.to_string()),
        }
    }
}

impl From<ClassifierError> for LabFlagsError {
    fn from(e: ClassifierError) -> Self {
        LabFlagsError::InvalidInput(e.to_string())
    }
}

impl From<ingest::IngestError> for LabFlagsError {
    fn from(e: ingest::IngestError) -> Self {
        LabFlagsError::InvalidInput(e.to_string())
    }
}

impl From<classifier::ConfigError> for LabFlagsError {
    fn from(e: classifier::ConfigError) -> Self {
        LabFlagsError::ConfigError(e.to_string())
    }
}

impl From<serde_json::Error> for LabFlagsError {
    fn from(e: serde_json::Error) -> Self {
        LabFlagsError::SerializationError(e.to_string())
    }
}

impl<T> From<std::sync::PoisonError<T>> for LabFlagsError {
    fn from(e: std::sync::PoisonError<T>) -> Self {
        LabFlagsError::DatabaseError(format!("Lock poisoned: {}", e))
    }
}

// =========================================================================
// Factory Functions (exported to FFI)
// =========================================================================

/// Open or create a database at the given path.
#[uniffi::export]
pub fn open_database(path: String) -> Result<Arc<LabFlagsCore>, LabFlagsError> {
    let db = Database::open(&path)?;
    Ok(LabFlagsCore::new(db, AbnormalFilter::new()))
}

/// Open or create a database, classifying with a custom tag vocabulary (JSON).
#[uniffi::export]
pub fn open_database_with_vocabulary(
    path: String,
    vocabulary_json: String,
) -> Result<Arc<LabFlagsCore>, LabFlagsError> {
    let config = ClassifierConfig::from_json_str(&vocabulary_json)?;
    let db = Database::open(&path)?;
    Ok(LabFlagsCore::new(db, AbnormalFilter::with_config(config)))
}

/// Create an in-memory database (for testing).
#[uniffi::export]
pub fn open_database_in_memory() -> Result<Arc<LabFlagsCore>, LabFlagsError> {
    let db = Database::open_in_memory()?;
    Ok(LabFlagsCore::new(db, AbnormalFilter::new()))
}

// =========================================================================
// Main API Object
// =========================================================================

/// Thread-safe database wrapper for FFI.
#[derive(uniffi::Object)]
pub struct LabFlagsCore {
    db: Arc<Mutex<Database>>,
    filter: AbnormalFilter,
}

impl LabFlagsCore {
    fn new(db: Database, filter: AbnormalFilter) -> Arc<Self> {
        Arc::new(Self {
            db: Arc::new(Mutex::new(db)),
            filter,
        })
    }

    fn today() -> chrono::NaiveDate {
        chrono::Local::now().date_naive()
    }

    fn abnormal_tests(&self, exam_id: &str) -> Result<Vec<AnnotatedTestResult>, LabFlagsError> {
        let db = self.db.lock()?;
        Ok(db.abnormal_tests_by_exam_id(exam_id, &self.filter, Self::today())?)
    }
}

#[uniffi::export]
impl LabFlagsCore {
    // =========================================================================
    // Exam Operations
    // =========================================================================

    /// Validate a structured exam JSON and store it under `exam_id`.
    pub fn save_parsed_exam(
        &self,
        exam_id: String,
        payload_json: String,
    ) -> Result<FfiSavedExam, LabFlagsError> {
        if exam_id.trim().is_empty() {
            return Err(LabFlagsError::InvalidInput("exam id is required".into()));
        }
        let report = parse_exam_payload(&payload_json)?;
        let mut db = self.db.lock()?;
        let saved = db.save_exam_report(&exam_id, &report)?;
        Ok(saved.into())
    }

    /// Abnormal tests of a stored exam.
    pub fn abnormal_tests_by_exam_id(
        &self,
        exam_id: String,
    ) -> Result<Vec<FfiAbnormalTest>, LabFlagsError> {
        let altered = self.abnormal_tests(&exam_id)?;
        Ok(altered.into_iter().map(|a| a.into()).collect())
    }

    /// Abnormal tests of a stored exam as a JSON body (`{"altered": [...]}`).
    pub fn abnormal_report_json(&self, exam_id: String) -> Result<String, LabFlagsError> {
        let report = AbnormalReport::new(self.abnormal_tests(&exam_id)?);
        Ok(report.to_json()?)
    }

    // =========================================================================
    // Patient Operations
    // =========================================================================

    /// Get a patient by CPF.
    pub fn get_patient_by_cpf(&self, cpf: String) -> Result<Option<FfiPatient>, LabFlagsError> {
        let db = self.db.lock()?;
        let patient = db.get_patient_by_cpf(&cpf)?;
        Ok(patient.map(|p| p.into()))
    }

    /// Search patients by name.
    pub fn search_patients(
        &self,
        query: String,
        limit: u32,
    ) -> Result<Vec<FfiPatient>, LabFlagsError> {
        let db = self.db.lock()?;
        let patients = db.search_patients(&query, limit as usize)?;
        Ok(patients.into_iter().map(|p| p.into()).collect())
    }

    // =========================================================================
    // Classification
    // =========================================================================

    /// Classify a single raw result against candidate range texts.
    pub fn classify_result(&self, result: String, ranges: Vec<String>) -> FfiStatus {
        classify(&result, &ranges).into()
    }
}

// =========================================================================
// FFI Types
// =========================================================================

/// FFI-safe classification status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, uniffi::Enum)]
pub enum FfiStatus {
    Normal,
    Above,
    Below,
}

impl From<ClassificationStatus> for FfiStatus {
    fn from(status: ClassificationStatus) -> Self {
        match status {
            ClassificationStatus::Normal => FfiStatus::Normal,
            ClassificationStatus::Above => FfiStatus::Above,
            ClassificationStatus::Below => FfiStatus::Below,
        }
    }
}

/// FFI-safe reference range.
#[derive(Debug, Clone, uniffi::Record)]
pub struct FfiReferenceRange {
    pub gender_tag: String,
    pub age_tag: String,
    pub range_text: String,
}

impl From<ReferenceRange> for FfiReferenceRange {
    fn from(range: ReferenceRange) -> Self {
        Self {
            gender_tag: range.gender_tag,
            age_tag: range.age_tag,
            range_text: range.range_text,
        }
    }
}

/// FFI-safe abnormal test.
#[derive(Debug, Clone, uniffi::Record)]
pub struct FfiAbnormalTest {
    pub name: String,
    pub result: String,
    pub unit: String,
    pub status: FfiStatus,
    pub reference_ranges: Vec<FfiReferenceRange>,
}

impl From<AnnotatedTestResult> for FfiAbnormalTest {
    fn from(annotated: AnnotatedTestResult) -> Self {
        Self {
            name: annotated.test.name,
            result: annotated.test.result,
            unit: annotated.test.unit,
            status: annotated.status.into(),
            reference_ranges: annotated
                .test
                .reference_ranges
                .into_iter()
                .map(|r| r.into())
                .collect(),
        }
    }
}

/// FFI-safe patient.
#[derive(Debug, Clone, uniffi::Record)]
pub struct FfiPatient {
    pub local_id: String,
    pub name: String,
    pub cpf: String,
    pub birth_date: Option<String>,
    pub gender: Option<String>,
    pub insurance: Option<String>,
    pub doctor: Option<String>,
}

impl From<Patient> for FfiPatient {
    fn from(patient: Patient) -> Self {
        Self {
            local_id: patient.local_id,
            name: patient.name,
            cpf: patient.cpf,
            birth_date: patient.birth_date,
            gender: patient.gender,
            insurance: patient.insurance,
            doctor: patient.doctor,
        }
    }
}

/// FFI-safe result of saving an exam.
#[derive(Debug, Clone, uniffi::Record)]
pub struct FfiSavedExam {
    pub exam_id: String,
    pub patient_local_id: String,
    pub patient_created: bool,
    pub test_count: u32,
}

impl From<db::SavedExam> for FfiSavedExam {
    fn from(saved: db::SavedExam) -> Self {
        Self {
            exam_id: saved.exam_id,
            patient_local_id: saved.patient.local_id,
            patient_created: saved.patient_created,
            test_count: saved.test_count as u32,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const PAYLOAD: &str = r#"{
        "paciente": {"nome": "Maria", "cpf": "1", "data_nascimento": "15/04/1985", "genero": "F"},
        "laboratorio": {"nome": "Lab Central"},
        "exames": [
            {"nome": "Glicose", "resultado": "130", "unidade": "mg/dL", "valor_referencia": [{"valores": "70-99"}]},
            {"nome": "Sódio", "resultado": "140", "unidade": "mEq/L", "valor_referencia": [{"valores": "135 a 145"}]}
        ]
    }"#;

    #[test]
    fn test_save_and_flag_through_ffi_object() {
        let core = open_database_in_memory().unwrap();

        let saved = core.save_parsed_exam("exam-1".into(), PAYLOAD.into()).unwrap();
        assert!(saved.patient_created);
        assert_eq!(saved.test_count, 2);

        let altered = core.abnormal_tests_by_exam_id("exam-1".into()).unwrap();
        assert_eq!(altered.len(), 1);
        assert_eq!(altered[0].name, "Glicose");
        assert_eq!(altered[0].status, FfiStatus::Above);

        let json = core.abnormal_report_json("exam-1".into()).unwrap();
        assert!(json.contains("\"status\": \"acima\""));
    }

    #[test]
    fn test_errors_map_to_ffi_variants() {
        let core = open_database_in_memory().unwrap();

        assert!(matches!(
            core.abnormal_tests_by_exam_id("missing".into()),
            Err(LabFlagsError::NotFound(_))
        ));
        assert!(matches!(
            core.save_parsed_exam("exam-1".into(), r#"{"paciente": {}}"#.into()),
            Err(LabFlagsError::InvalidInput(_))
        ));
        assert!(matches!(
            core.save_parsed_exam(" ".into(), PAYLOAD.into()),
            Err(LabFlagsError::InvalidInput(_))
        ));
    }

    #[test]
    fn test_classify_result() {
        let core = open_database_in_memory().unwrap();
        assert_eq!(
            core.classify_result("3".into(), vec!["texto".into(), "5-9".into()]),
            FfiStatus::Below
        );
        assert_eq!(core.classify_result("abc".into(), vec!["5-9".into()]), FfiStatus::Normal);
    }

    #[test]
    fn test_patient_lookup() {
        let core = open_database_in_memory().unwrap();
        core.save_parsed_exam("exam-1".into(), PAYLOAD.into()).unwrap();

        let patient = core.get_patient_by_cpf("1".into()).unwrap().unwrap();
        assert_eq!(patient.name, "Maria");
        assert_eq!(patient.gender.as_deref(), Some("F"));
        assert_eq!(core.search_patients("Mar".into(), 10).unwrap().len(), 1);
    }

    #[test]
    fn test_invalid_vocabulary() {
        let result = open_database_with_vocabulary(":memory:".into(), "{}".into());
        assert!(matches!(result, Err(LabFlagsError::ConfigError(_))));
    }
}
