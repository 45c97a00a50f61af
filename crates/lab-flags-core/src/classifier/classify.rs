//! Result classification against candidate ranges.

use super::numeric::normalize;
use super::range::parse_range;
use crate::models::ClassificationStatus;

/// Classify a raw result against candidate range texts.
///
/// Non-numeric results are always `Normal`. Candidates that do not parse are
/// skipped; the first one that parses decides, even if others follow.
/// With no parseable candidate the result is `Normal`.
pub fn classify<I>(result: &str, candidates: I) -> ClassificationStatus
where
    I: IntoIterator,
    I::Item: AsRef<str>,
{
    let Some(value) = normalize(result) else {
        return ClassificationStatus::Normal;
    };

    candidates
        .into_iter()
        .find_map(|text| parse_range(text.as_ref()))
        .map(|bounds| bounds.classify(value))
        .unwrap_or(ClassificationStatus::Normal)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_above_below_normal() {
        assert_eq!(classify("12", ["5-9"]), ClassificationStatus::Above);
        assert_eq!(classify("3,5", ["4,5 a 11,0"]), ClassificationStatus::Below);
        assert_eq!(classify("7", ["5-9"]), ClassificationStatus::Normal);
    }

    #[test]
    fn test_non_numeric_is_normal() {
        assert_eq!(classify("abc", ["5-9"]), ClassificationStatus::Normal);
        assert_eq!(classify("Reagente", ["0-1"]), ClassificationStatus::Normal);
        assert_eq!(classify("", ["0-1"]), ClassificationStatus::Normal);
    }

    #[test]
    fn test_unparseable_candidates_are_skipped() {
        let candidates = ["Inferior a 200", "Negativo", "70-99"];
        assert_eq!(classify("130", candidates), ClassificationStatus::Above);
    }

    #[test]
    fn test_first_parseable_candidate_decides() {
        // 15 is within the second range but above the first.
        assert_eq!(classify("15", ["5-9", "10-20"]), ClassificationStatus::Above);
        assert_eq!(classify("15", ["10-20", "5-9"]), ClassificationStatus::Normal);
    }

    #[test]
    fn test_no_candidates_is_normal() {
        assert_eq!(classify("15", Vec::<String>::new()), ClassificationStatus::Normal);
        assert_eq!(classify("15", ["texto livre"]), ClassificationStatus::Normal);
    }

    #[test]
    fn test_thousands_separated_result() {
        assert_eq!(
            classify("480.000", ["150.000 a 450.000"]),
            ClassificationStatus::Above
        );
    }

    #[test]
    fn test_infinite_result_is_above() {
        assert_eq!(classify("Infinity", ["5-9"]), ClassificationStatus::Above);
        assert_eq!(classify("1e400", ["5-9"]), ClassificationStatus::Above);
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(200))]

        #[test]
        fn test_monotonic_in_range(min in 0u32..1000, span in 0u32..1000, offset in 0u32..1000) {
            let max = min + span;
            let range = format!("{}-{}", min, max);

            let inside = min + offset % (span + 1);
            prop_assert_eq!(classify(&inside.to_string(), [&range]), ClassificationStatus::Normal);

            let above = max + 1 + offset;
            prop_assert_eq!(classify(&above.to_string(), [&range]), ClassificationStatus::Above);

            if min > 0 {
                let below = offset % min;
                prop_assert_eq!(classify(&below.to_string(), [&range]), ClassificationStatus::Below);
            }
        }

        #[test]
        fn test_non_numeric_never_flagged(word in "[a-zA-Z ]{1,12}", min in 0u32..100, max in 0u32..100) {
            prop_assume!(!word.trim_start().starts_with("Infinity"));
            let range = format!("{} a {}", min, max);
            prop_assert_eq!(classify(&word, [&range]), ClassificationStatus::Normal);
        }
    }
}
