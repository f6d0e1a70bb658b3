//! Incident type classification.
//!
//! Maps free-text incident types (e.g. `"BURGLARY OF HABITATION - FORCED
//! ENTRY"`) onto the coarse [`Category`] taxonomy by keyword detection.
//! Matching is case-insensitive substring containment; any keyword hit
//! classifies the row.

use incident_map_incident_models::Category;

/// Property-crime keywords used when no configuration overrides them.
///
/// TRESPASS, FRAUD and FORGERY are deliberately absent.
pub const DEFAULT_PROPERTY_KEYWORDS: &[&str] = &[
    "BURGLARY",
    "THEFT",
    "ROBBERY",
    "STOLEN",
    "BREAKING",
    "ENTERING",
    "LARCENY",
    "EMBEZZLEMENT",
    "AUTO THEFT",
    "CRIMINAL MISCHIEF",
    "VANDALISM",
    "SHOPLIFTING",
];

/// Classifies incident types into a single [`Category`] when any keyword
/// matches, and [`Category::Unclassified`] otherwise.
#[derive(Debug, Clone)]
pub struct KeywordClassifier {
    category: Category,
    /// Upper-cased once at construction.
    keywords: Vec<String>,
}

impl KeywordClassifier {
    /// Creates a classifier assigning `category` to any type containing one
    /// of `keywords`.
    ///
    /// Empty keywords are ignored; otherwise they would match everything.
    #[must_use]
    pub fn new<S: AsRef<str>>(category: Category, keywords: &[S]) -> Self {
        let keywords = keywords
            .iter()
            .map(|k| k.as_ref().trim().to_uppercase())
            .filter(|k| !k.is_empty())
            .collect();
        Self { category, keywords }
    }

    /// The property-crime classifier with [`DEFAULT_PROPERTY_KEYWORDS`].
    #[must_use]
    pub fn property_crime() -> Self {
        Self::new(Category::PropertyCrime, DEFAULT_PROPERTY_KEYWORDS)
    }

    /// The category assigned on a keyword match.
    #[must_use]
    pub const fn category(&self) -> Category {
        self.category
    }

    /// The normalized keyword list.
    #[must_use]
    pub fn keywords(&self) -> &[String] {
        &self.keywords
    }

    /// Classifies a raw incident type.
    #[must_use]
    pub fn classify(&self, raw: &str) -> Category {
        let upper = raw.to_uppercase();
        if contains_any(&upper, &self.keywords) {
            self.category
        } else {
            Category::Unclassified
        }
    }
}

impl Default for KeywordClassifier {
    fn default() -> Self {
        Self::property_crime()
    }
}

/// Checks if `haystack` contains any of the given `needles`.
fn contains_any(haystack: &str, needles: &[String]) -> bool {
    needles.iter().any(|needle| haystack.contains(needle.as_str()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn maps_property_types() {
        let classifier = KeywordClassifier::property_crime();
        assert_eq!(
            classifier.classify("RESIDENTIAL BURGLARY"),
            Category::PropertyCrime
        );
        assert_eq!(classifier.classify("auto theft"), Category::PropertyCrime);
        assert_eq!(
            classifier.classify("CRIMINAL MISCHIEF >=$100<$750"),
            Category::PropertyCrime
        );
        assert_eq!(
            classifier.classify("BMV - Breaking Vehicle"),
            Category::PropertyCrime
        );
    }

    #[test]
    fn unknown_fallback() {
        let classifier = KeywordClassifier::property_crime();
        assert_eq!(
            classifier.classify("NOISE COMPLAINT"),
            Category::Unclassified
        );
        assert_eq!(classifier.classify("ASSAULT"), Category::Unclassified);
        assert_eq!(classifier.classify(""), Category::Unclassified);
    }

    #[test]
    fn excluded_property_adjacent_types_stay_unclassified() {
        let classifier = KeywordClassifier::property_crime();
        assert_eq!(
            classifier.classify("CRIMINAL TRESPASS"),
            Category::Unclassified
        );
        assert_eq!(classifier.classify("FORGERY"), Category::Unclassified);
        assert_eq!(
            classifier.classify("CREDIT CARD FRAUD"),
            Category::Unclassified
        );
    }

    #[test]
    fn custom_keywords_change_classification() {
        let classifier = KeywordClassifier::new(Category::PropertyCrime, &["trespass", "  "]);
        assert_eq!(classifier.keywords(), ["TRESPASS"]);
        assert_eq!(
            classifier.classify("Criminal Trespass"),
            Category::PropertyCrime
        );
        assert_eq!(classifier.classify("BURGLARY"), Category::Unclassified);
    }
}
