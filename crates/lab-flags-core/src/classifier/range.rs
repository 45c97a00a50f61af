//! Reference range text parser.

use std::sync::LazyLock;

use regex::Regex;

use super::numeric::normalize;
use crate::models::ClassificationStatus;

/// Two numbers separated by "a" or "-", e.g. "4,5 a 11,0" or "70-120".
static RANGE_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)([0-9.,]+)\s*(?:a|-)\s*([0-9.,]+)").expect("Invalid reference range regex")
});

/// Numeric bounds read from a range text.
///
/// `min <= max` is not enforced: a report printing "20-10" yields
/// `min = 20, max = 10`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RangeBounds {
    pub min: f64,
    pub max: f64,
}

impl RangeBounds {
    /// Compare a value against the bounds (inclusive).
    pub fn classify(&self, value: f64) -> ClassificationStatus {
        if value < self.min {
            ClassificationStatus::Below
        } else if value > self.max {
            ClassificationStatus::Above
        } else {
            ClassificationStatus::Normal
        }
    }
}

/// Extract `[min, max]` from free text. Only the first match is used.
pub fn parse_range(text: &str) -> Option<RangeBounds> {
    let caps = RANGE_PATTERN.captures(text)?;
    let min = normalize(caps.get(1)?.as_str())?;
    let max = normalize(caps.get(2)?.as_str())?;
    Some(RangeBounds { min, max })
}
