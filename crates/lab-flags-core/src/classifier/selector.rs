//! Reference range selection by patient age and gender.
//!
//! Tiers are tried in order and the first one that yields wins:
//!
//! 1. **Age**: the first row whose tag marks the patient's age bracket.
//!    Only that one row is returned.
//! 2. **Gender**: every row whose tag contains an alias of the patient's
//!    gender.
//! 3. **Fallback**: every row.

use chrono::NaiveDate;
use tracing::debug;

use super::age::age_years;
use super::config::ClassifierConfig;
use super::ClassifierResult;
use crate::models::ReferenceRange;

/// Which tier produced a selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SelectionTier {
    Age,
    Gender,
    Fallback,
}

/// Range texts chosen for a patient, in row order.
#[derive(Debug, Clone, PartialEq)]
pub struct RangeSelection<'a> {
    pub tier: SelectionTier,
    pub ranges: Vec<&'a str>,
}

/// Picks the reference rows that apply to a patient.
pub struct RangeSelector<'c> {
    config: &'c ClassifierConfig,
}

impl<'c> RangeSelector<'c> {
    pub fn new(config: &'c ClassifierConfig) -> Self {
        Self { config }
    }

    /// Select the applicable range texts for a patient of `age` and `gender`.
    pub fn select<'a>(
        &self,
        entries: &'a [ReferenceRange],
        gender: &str,
        age: i32,
    ) -> RangeSelection<'a> {
        let tags: Vec<String> = entries.iter().map(ReferenceRange::tag_text).collect();

        let bracket = self.config.bracket_for(age);
        if let Some(idx) = tags
            .iter()
            .position(|tag| self.config.tag_matches_bracket(tag, bracket))
        {
            debug!(age, ?bracket, tag = %tags[idx], "age tier matched");
            return RangeSelection {
                tier: SelectionTier::Age,
                ranges: vec![entries[idx].range_text.as_str()],
            };
        }

        let aliases = self.config.aliases_for(gender);
        let by_gender: Vec<&str> = entries
            .iter()
            .zip(&tags)
            .filter(|(_, tag)| aliases.iter().any(|alias| tag.contains(alias.as_str())))
            .map(|(entry, _)| entry.range_text.as_str())
            .collect();

        if !by_gender.is_empty() {
            debug!(gender, matches = by_gender.len(), "gender tier matched");
            return RangeSelection {
                tier: SelectionTier::Gender,
                ranges: by_gender,
            };
        }

        RangeSelection {
            tier: SelectionTier::Fallback,
            ranges: entries.iter().map(|e| e.range_text.as_str()).collect(),
        }
    }
}

/// Select range texts using a `DD/MM/YYYY` birth date, as of `today`.
///
/// Fails only when the birth date cannot be parsed.
pub fn select_ranges<'a>(
    config: &ClassifierConfig,
    entries: &'a [ReferenceRange],
    gender: &str,
    birth_date: &str,
    today: NaiveDate,
) -> ClassifierResult<Vec<&'a str>> {
    let age = age_years(birth_date, today)?;
    Ok(RangeSelector::new(config).select(entries, gender, age).ranges)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classifier::ClassifierError;

    fn entry(tag: &str, range: &str) -> ReferenceRange {
        ReferenceRange::new(tag, "", range)
    }

    #[test]
    fn test_age_tier_short_circuits_gender() {
        let config = ClassifierConfig::default();
        let entries = vec![entry("Adulto", "10-20"), entry("Mulheres", "8-18")];

        let selection = RangeSelector::new(&config).select(&entries, "F", 65);
        assert_eq!(selection.tier, SelectionTier::Age);
        assert_eq!(selection.ranges, ["10-20"]);
    }

    #[test]
    fn test_age_tier_returns_only_first_match() {
        let config = ClassifierConfig::default();
        let entries = vec![
            entry("Homens", "13-17"),
            entry("Adultos (lab A)", "12-16"),
            entry("Adultos (lab B)", "11-15"),
        ];

        let selection = RangeSelector::new(&config).select(&entries, "masculino", 40);
        assert_eq!(selection.tier, SelectionTier::Age);
        assert_eq!(selection.ranges, ["12-16"]);
    }

    #[test]
    fn test_child_and_elderly_brackets() {
        let config = ClassifierConfig::default();
        let entries = vec![
            entry("Adulto", "10-20"),
            entry("Criança", "5-9"),
            entry("Idoso 70+", "12-22"),
        ];
        let selector = RangeSelector::new(&config);

        assert_eq!(selector.select(&entries, "", 8).ranges, ["5-9"]);
        assert_eq!(selector.select(&entries, "", 80).ranges, ["12-22"]);
        assert_eq!(selector.select(&entries, "", 30).ranges, ["10-20"]);
    }

    #[test]
    fn test_gender_tier_collects_all_matches() {
        let config = ClassifierConfig::default();
        let entries = vec![
            entry("Mulheres", "12,0 a 16,0"),
            entry("Homens", "13,5 a 17,5"),
            entry("Mulheres gestantes", "11,0 a 14,0"),
        ];

        let selection = RangeSelector::new(&config).select(&entries, "Feminino", 30);
        assert_eq!(selection.tier, SelectionTier::Gender);
        assert_eq!(selection.ranges, ["12,0 a 16,0", "11,0 a 14,0"]);
    }

    #[test]
    fn test_unknown_gender_falls_back_to_all() {
        let config = ClassifierConfig::default();
        let entries = vec![entry("Mulheres", "12-16"), entry("Homens", "13-17")];

        let selection = RangeSelector::new(&config).select(&entries, "não informado", 30);
        assert_eq!(selection.tier, SelectionTier::Fallback);
        assert_eq!(selection.ranges, ["12-16", "13-17"]);
    }

    #[test]
    fn test_tags_are_case_insensitive() {
        let config = ClassifierConfig::default();
        let entries = vec![entry("ADULTOS", "1-2")];
        let selection = RangeSelector::new(&config).select(&entries, "", 30);
        assert_eq!(selection.tier, SelectionTier::Age);
    }

    #[test]
    fn test_age_column_used_when_gender_column_blank() {
        let config = ClassifierConfig::default();
        let entries = vec![
            ReferenceRange::new("", "Crianças", "4-8"),
            ReferenceRange::new("", "Adultos", "6-10"),
        ];
        let selection = RangeSelector::new(&config).select(&entries, "", 5);
        assert_eq!(selection.ranges, ["4-8"]);
    }

    #[test]
    fn test_empty_entries() {
        let config = ClassifierConfig::default();
        let selection = RangeSelector::new(&config).select(&[], "f", 30);
        assert_eq!(selection.tier, SelectionTier::Fallback);
        assert!(selection.ranges.is_empty());
    }

    #[test]
    fn test_select_ranges_with_birth_date() {
        let config = ClassifierConfig::default();
        let entries = vec![entry("Adulto", "10-20"), entry("Mulheres", "8-18")];
        let today = NaiveDate::from_ymd_opt(2024, 6, 1).unwrap();

        let ranges = select_ranges(&config, &entries, "F", "01/01/1959", today).unwrap();
        assert_eq!(ranges, ["10-20"]);

        let err = select_ranges(&config, &entries, "F", "1959", today).unwrap_err();
        assert!(matches!(err, ClassifierError::InvalidBirthDate(_)));
    }
}
