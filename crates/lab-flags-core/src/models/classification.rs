//! Classification outcome models.

use std::fmt;

use serde::{Deserialize, Serialize};

use super::TestResult;

/// Where a result sits relative to its applicable reference range.
///
/// Serialized with the report vocabulary: `normal`, `acima`, `abaixo`.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum ClassificationStatus {
    #[serde(rename = "normal")]
    Normal,
    #[serde(rename = "acima")]
    Above,
    #[serde(rename = "abaixo")]
    Below,
}

impl ClassificationStatus {
    /// Wire name of the status.
    pub fn as_str(&self) -> &'static str {
        match self {
            ClassificationStatus::Normal => "normal",
            ClassificationStatus::Above => "acima",
            ClassificationStatus::Below => "abaixo",
        }
    }

    pub fn is_abnormal(&self) -> bool {
        !matches!(self, ClassificationStatus::Normal)
    }
}

impl fmt::Display for ClassificationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A test result together with its classification.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AnnotatedTestResult {
    #[serde(flatten)]
    pub test: TestResult,
    pub status: ClassificationStatus,
}

impl AnnotatedTestResult {
    /// Annotate a test. Sub-tests are dropped; they are reported on their own.
    pub fn new(test: &TestResult, status: ClassificationStatus) -> Self {
        Self {
            test: TestResult {
                sub_tests: Vec::new(),
                ..test.clone()
            },
            status,
        }
    }
}

/// Response body listing the altered tests of an exam.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct AbnormalReport {
    pub altered: Vec<AnnotatedTestResult>,
}

impl AbnormalReport {
    pub fn new(altered: Vec<AnnotatedTestResult>) -> Self {
        Self { altered }
    }

    /// Export as JSON.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }
}
