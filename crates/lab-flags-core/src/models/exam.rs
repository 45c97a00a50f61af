//! Exam report models.

use serde::{Deserialize, Serialize};

use super::Patient;

/// One age/gender-qualified reference range of a test.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct ReferenceRange {
    /// Gender descriptor as printed (e.g. "Mulheres", "Adulto", "Criança")
    #[serde(default)]
    pub gender_tag: String,
    /// Age descriptor as printed; often overlaps with `gender_tag`
    #[serde(default)]
    pub age_tag: String,
    /// Range text (e.g. "4,5 a 11,0", "70-120")
    #[serde(default)]
    pub range_text: String,
}

impl ReferenceRange {
    /// Create a reference range.
    pub fn new(
        gender_tag: impl Into<String>,
        age_tag: impl Into<String>,
        range_text: impl Into<String>,
    ) -> Self {
        Self {
            gender_tag: gender_tag.into(),
            age_tag: age_tag.into(),
            range_text: range_text.into(),
        }
    }

    /// Lower-cased tag used for age/gender matching.
    ///
    /// Reports put both age and gender wording in the gender column most of
    /// the time, so that column is used; the age column only stands in when
    /// the gender column is blank.
    pub fn tag_text(&self) -> String {
        let tag = if self.gender_tag.trim().is_empty() {
            &self.age_tag
        } else {
            &self.gender_tag
        };
        tag.to_lowercase()
    }
}

/// A single extracted test result, possibly with nested sub-tests.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct TestResult {
    /// Test name (e.g. "Hemoglobina")
    pub name: String,
    /// Raw result text, comma-decimal formatted when numeric
    #[serde(default)]
    pub result: String,
    /// Unit as printed
    #[serde(default)]
    pub unit: String,
    /// Collection date as printed
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub collected_at: Option<String>,
    /// Release date as printed
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub released_at: Option<String>,
    /// Analysis method
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub method: Option<String>,
    /// Sample material (e.g. "Sangue")
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub material: Option<String>,
    /// Candidate reference ranges
    #[serde(default)]
    pub reference_ranges: Vec<ReferenceRange>,
    /// Nested components (e.g. the lines of a blood count)
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub sub_tests: Vec<TestResult>,
}

impl TestResult {
    /// Create a test result without metadata.
    pub fn new(name: impl Into<String>, result: impl Into<String>, unit: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            result: result.into(),
            unit: unit.into(),
            ..Default::default()
        }
    }

    /// Builder-style helper to attach a reference range.
    pub fn with_range(mut self, range: ReferenceRange) -> Self {
        self.reference_ranges.push(range);
        self
    }

    /// Whether there is anything to classify.
    pub fn is_classifiable(&self) -> bool {
        !self.result.trim().is_empty() && !self.reference_ranges.is_empty()
    }

    /// Visit this test and all sub-tests in pre-order.
    pub fn walk<'a>(&'a self, out: &mut Vec<&'a TestResult>) {
        out.push(self);
        for sub in &self.sub_tests {
            sub.walk(out);
        }
    }

    /// Number of tests in this subtree, including self.
    pub fn subtree_len(&self) -> usize {
        1 + self.sub_tests.iter().map(TestResult::subtree_len).sum::<usize>()
    }
}

/// Flatten a list of test trees in pre-order.
pub fn flatten_tests(tests: &[TestResult]) -> Vec<&TestResult> {
    let mut out = Vec::new();
    for test in tests {
        test.walk(&mut out);
    }
    out
}

/// Laboratory that issued the report.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct Laboratory {
    pub name: Option<String>,
    /// Responsible physician's CRM registration
    pub crm: Option<String>,
    /// CNES health facility code
    pub cnes: Option<String>,
    pub responsible: Option<String>,
    pub address: Option<String>,
}

/// A structured exam report as produced by upstream extraction.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ExamReport {
    pub patient: Patient,
    pub laboratory: Laboratory,
    pub tests: Vec<TestResult>,
}

impl ExamReport {
    /// Total number of tests, sub-tests included.
    pub fn test_count(&self) -> usize {
        self.tests.iter().map(TestResult::subtree_len).sum()
    }
}

/// Link between an exam, its patient and the issuing laboratory.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ExamGroup {
    /// Local UUID of the group
    pub group_id: String,
    /// Exam identifier supplied by the caller
    pub exam_id: String,
    /// Patient local ID
    pub patient_id: String,
    pub laboratory: Laboratory,
    pub created_at: String,
}

impl ExamGroup {
    /// Create a new exam group.
    pub fn new(exam_id: String, patient_id: String, laboratory: Laboratory) -> Self {
        Self {
            group_id: uuid::Uuid::new_v4().to_string(),
            exam_id,
            patient_id,
            laboratory,
            created_at: chrono::Utc::now().to_rfc3339(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tag_text_prefers_gender_column() {
        let range = ReferenceRange::new("Mulheres", "Adulto", "12-16");
        assert_eq!(range.tag_text(), "mulheres");
    }

    #[test]
    fn test_tag_text_falls_back_to_age_column() {
        let range = ReferenceRange::new("  ", "Criança", "11-14");
        assert_eq!(range.tag_text(), "criança");
    }

    #[test]
    fn test_is_classifiable() {
        let bare = TestResult::new("Glicose", "90", "mg/dL");
        assert!(!bare.is_classifiable());

        let ranged = bare.clone().with_range(ReferenceRange::new("", "", "70-99"));
        assert!(ranged.is_classifiable());

        let blank = TestResult::new("Glicose", "  ", "mg/dL").with_range(ReferenceRange::new("", "", "70-99"));
        assert!(!blank.is_classifiable());
    }

    #[test]
    fn test_flatten_is_pre_order() {
        let mut panel = TestResult::new("Hemograma", "", "");
        panel.sub_tests = vec![
            TestResult::new("Hemácias", "4,8", "milhões/mm³"),
            TestResult::new("Hemoglobina", "14", "g/dL"),
        ];
        let tests = vec![panel, TestResult::new("Glicose", "90", "mg/dL")];

        let names: Vec<&str> = flatten_tests(&tests).iter().map(|t| t.name.as_str()).collect();
        assert_eq!(names, ["Hemograma", "Hemácias", "Hemoglobina", "Glicose"]);
    }

    #[test]
    fn test_sub_tests_omitted_when_empty() {
        let json = serde_json::to_value(TestResult::new("Glicose", "90", "mg/dL")).unwrap();
        assert!(json.get("sub_tests").is_none());
        assert!(json.get("method").is_none());
    }
}
