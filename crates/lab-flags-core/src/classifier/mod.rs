//! Abnormal result classifier.
//!
//! Pipeline per test: Range Selection → Range Parsing → Classification,
//! with the numeric normalizer shared by parsing and classification.

mod age;
mod classify;
mod config;
mod numeric;
mod range;
mod selector;

pub use age::*;
pub use classify::*;
pub use config::*;
pub use numeric::*;
pub use range::*;
pub use selector::*;

use chrono::NaiveDate;
use thiserror::Error;
use tracing::{debug, info};

use crate::models::{flatten_tests, AnnotatedTestResult, ClassificationStatus, Patient, TestResult};

/// Classifier errors. Both fail a whole batch.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ClassifierError {
    #[error("Patient birth date is missing")]
    MissingBirthDate,

    #[error("Invalid birth date (expected DD/MM/YYYY): {0}")]
    InvalidBirthDate(String),
}

pub type ClassifierResult<T> = Result<T, ClassifierError>;

/// Filters an exam's tests down to the abnormal ones.
#[derive(Debug, Clone, Default)]
pub struct AbnormalFilter {
    config: ClassifierConfig,
}

impl AbnormalFilter {
    /// Create a filter with the built-in vocabulary.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a filter with a custom vocabulary.
    pub fn with_config(config: ClassifierConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &ClassifierConfig {
        &self.config
    }

    /// Classify one test for a patient of known age and gender.
    ///
    /// Returns `None` when the test has no result or no reference ranges.
    pub fn classify_test(&self, test: &TestResult, gender: &str, age: i32) -> Option<ClassificationStatus> {
        if !test.is_classifiable() {
            return None;
        }

        let selection = RangeSelector::new(&self.config).select(&test.reference_ranges, gender, age);
        let status = classify(&test.result, &selection.ranges);
        debug!(
            test = %test.name,
            result = %test.result,
            tier = ?selection.tier,
            %status,
            "classified test"
        );
        Some(status)
    }

    /// Annotate every abnormal test (sub-tests included, in pre-order).
    ///
    /// The birth date is checked once before any test is looked at; a
    /// missing or malformed one fails the whole batch.
    pub fn filter(
        &self,
        patient: &Patient,
        tests: &[TestResult],
        today: NaiveDate,
    ) -> ClassifierResult<Vec<AnnotatedTestResult>> {
        let birth_date = patient.birth_date().ok_or(ClassifierError::MissingBirthDate)?;
        let age = age_years(birth_date, today)?;
        let gender = patient.canonical_gender();

        let all = flatten_tests(tests);
        let altered: Vec<AnnotatedTestResult> = all
            .iter()
            .filter_map(|test| {
                let status = self.classify_test(test, &gender, age)?;
                status
                    .is_abnormal()
                    .then(|| AnnotatedTestResult::new(test, status))
            })
            .collect();

        info!(
            patient = %patient.local_id,
            age,
            tests = all.len(),
            altered = altered.len(),
            "abnormal filter complete"
        );

        Ok(altered)
    }
}

/// Run the default filter over a patient's tests.
pub fn filter_abnormal(
    patient: &Patient,
    tests: &[TestResult],
    today: NaiveDate,
) -> ClassifierResult<Vec<AnnotatedTestResult>> {
    AbnormalFilter::new().filter(patient, tests, today)
}
