//! Tag vocabulary used by the range selector.
//!
//! Reference tables label their rows with free text ("Adulto", "Crianças",
//! "Acima de 70 anos", "Mulheres", "Homens"). Which labels count as which age
//! bracket or gender is data, so new wording can be supported by loading a
//! different vocabulary instead of changing the selector.

use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Configuration errors.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read vocabulary file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Vocabulary JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Invalid vocabulary: {0}")]
    Invalid(String),
}

pub type ConfigResult<T> = Result<T, ConfigError>;

/// Age bracket a patient falls into.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum AgeBracket {
    Child,
    Adult,
    Elderly,
}

/// A tag fragment that marks a reference row as belonging to an age bracket.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AgeRule {
    pub bracket: AgeBracket,
    /// Lower-case substring looked up in the row tag
    pub fragment: String,
}

/// Aliases that mark a reference row as belonging to one gender.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct GenderAliases {
    /// Canonical gender name (lower case)
    pub gender: String,
    /// Lower-case substrings looked up in the row tag
    pub aliases: Vec<String>,
}

/// Vocabulary and age thresholds for range selection.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ClassifierConfig {
    /// Patients younger than this are children
    pub child_age_limit: i32,
    /// Patients this age or older are elderly
    pub elderly_age_threshold: i32,
    pub age_rules: Vec<AgeRule>,
    pub gender_aliases: Vec<GenderAliases>,
}

impl Default for ClassifierConfig {
    fn default() -> Self {
        Self {
            child_age_limit: 13,
            elderly_age_threshold: 70,
            age_rules: vec![
                AgeRule { bracket: AgeBracket::Child, fragment: "crianç".into() },
                AgeRule { bracket: AgeBracket::Child, fragment: "crianc".into() },
                AgeRule { bracket: AgeBracket::Elderly, fragment: "70".into() },
                AgeRule { bracket: AgeBracket::Adult, fragment: "adult".into() },
            ],
            gender_aliases: vec![
                GenderAliases {
                    gender: "masculino".into(),
                    aliases: ["masculino", "homem", "homens", "h", "m", "masc"]
                        .map(String::from)
                        .to_vec(),
                },
                GenderAliases {
                    gender: "feminino".into(),
                    aliases: ["feminino", "mulher", "mulheres", "f", "fem"]
                        .map(String::from)
                        .to_vec(),
                },
            ],
        }
    }
}

impl ClassifierConfig {
    /// Parse and validate a vocabulary from JSON.
    pub fn from_json_str(json: &str) -> ConfigResult<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validated()
    }

    /// Load and validate a vocabulary file.
    pub fn from_path<P: AsRef<Path>>(path: P) -> ConfigResult<Self> {
        let json = std::fs::read_to_string(path)?;
        Self::from_json_str(&json)
    }

    /// Check thresholds and lower-case every fragment and alias.
    pub fn validated(mut self) -> ConfigResult<Self> {
        if self.child_age_limit > self.elderly_age_threshold {
            return Err(ConfigError::Invalid(format!(
                "child_age_limit ({}) exceeds elderly_age_threshold ({})",
                self.child_age_limit, self.elderly_age_threshold
            )));
        }

        for rule in &mut self.age_rules {
            rule.fragment = rule.fragment.trim().to_lowercase();
            if rule.fragment.is_empty() {
                return Err(ConfigError::Invalid(format!(
                    "empty fragment for {:?} age rule",
                    rule.bracket
                )));
            }
        }

        for set in &mut self.gender_aliases {
            set.gender = set.gender.trim().to_lowercase();
            if set.gender.is_empty() {
                return Err(ConfigError::Invalid("gender alias set without a name".into()));
            }
            for alias in &mut set.aliases {
                *alias = alias.trim().to_lowercase();
            }
            set.aliases.retain(|a| !a.is_empty());
            if set.aliases.is_empty() {
                return Err(ConfigError::Invalid(format!(
                    "no aliases for gender '{}'",
                    set.gender
                )));
            }
        }

        Ok(self)
    }

    /// Bracket for an age in whole years.
    pub fn bracket_for(&self, age: i32) -> AgeBracket {
        if age < self.child_age_limit {
            AgeBracket::Child
        } else if age >= self.elderly_age_threshold {
            AgeBracket::Elderly
        } else {
            AgeBracket::Adult
        }
    }

    /// Whether a lower-cased row tag marks the given bracket.
    pub fn tag_matches_bracket(&self, tag: &str, bracket: AgeBracket) -> bool {
        self.age_rules
            .iter()
            .any(|rule| rule.bracket == bracket && tag.contains(rule.fragment.as_str()))
    }

    /// Alias list for a patient gender string.
    ///
    /// The canonical name is matched first; otherwise any set listing the
    /// string among its aliases is used ("F", "Mulher"). Unknown genders
    /// get an empty slice.
    pub fn aliases_for(&self, gender: &str) -> &[String] {
        let gender = gender.trim().to_lowercase();
        if gender.is_empty() {
            return &[];
        }

        self.gender_aliases
            .iter()
            .find(|set| set.gender == gender)
            .or_else(|| {
                self.gender_aliases
                    .iter()
                    .find(|set| set.aliases.iter().any(|a| *a == gender))
            })
            .map(|set| set.aliases.as_slice())
            .unwrap_or(&[])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_brackets() {
        let config = ClassifierConfig::default();
        assert_eq!(config.bracket_for(0), AgeBracket::Child);
        assert_eq!(config.bracket_for(12), AgeBracket::Child);
        assert_eq!(config.bracket_for(13), AgeBracket::Adult);
        assert_eq!(config.bracket_for(69), AgeBracket::Adult);
        assert_eq!(config.bracket_for(70), AgeBracket::Elderly);
    }

    #[test]
    fn test_tag_matches_bracket() {
        let config = ClassifierConfig::default();
        assert!(config.tag_matches_bracket("crianças até 12 anos", AgeBracket::Child));
        assert!(config.tag_matches_bracket("criancas", AgeBracket::Child));
        assert!(config.tag_matches_bracket("adultos", AgeBracket::Adult));
        assert!(config.tag_matches_bracket("acima de 70 anos", AgeBracket::Elderly));
        assert!(!config.tag_matches_bracket("adultos", AgeBracket::Elderly));
    }

    #[test]
    fn test_aliases_by_name_and_code() {
        let config = ClassifierConfig::default();
        assert!(config.aliases_for("Feminino").contains(&"mulheres".to_string()));
        assert!(config.aliases_for("F").contains(&"fem".to_string()));
        assert!(config.aliases_for(" m ").contains(&"homens".to_string()));
        assert!(config.aliases_for("outro").is_empty());
        assert!(config.aliases_for("").is_empty());
    }

    #[test]
    fn test_from_json_normalizes_case() {
        let json = r#"{
            "child_age_limit": 12,
            "elderly_age_threshold": 65,
            "age_rules": [{"bracket": "elderly", "fragment": " IDOSO "}],
            "gender_aliases": [{"gender": "Female", "aliases": ["Women", " F ", ""]}]
        }"#;

        let config = ClassifierConfig::from_json_str(json).unwrap();
        assert_eq!(config.age_rules[0].fragment, "idoso");
        assert_eq!(config.gender_aliases[0].gender, "female");
        assert_eq!(config.gender_aliases[0].aliases, ["women", "f"]);
        assert_eq!(config.bracket_for(65), AgeBracket::Elderly);
    }

    #[test]
    fn test_rejects_inverted_thresholds() {
        let mut config = ClassifierConfig::default();
        config.child_age_limit = 80;
        assert!(matches!(config.validated(), Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn test_rejects_empty_fragment() {
        let mut config = ClassifierConfig::default();
        config.age_rules.push(AgeRule { bracket: AgeBracket::Adult, fragment: "  ".into() });
        assert!(matches!(config.validated(), Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn test_from_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("vocabulary.json");
        std::fs::write(&path, serde_json::to_string(&ClassifierConfig::default()).unwrap()).unwrap();

        let config = ClassifierConfig::from_path(&path).unwrap();
        assert_eq!(config, ClassifierConfig::default());

        assert!(matches!(
            ClassifierConfig::from_path(dir.path().join("missing.json")),
            Err(ConfigError::Io(_))
        ));
    }
}
