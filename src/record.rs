//! Bug record domain model
//!
//! Storage-agnostic types - they don't know about SQLite or the vector index.
//! The store handles serialization and id assignment.

use std::fmt;

use chrono::NaiveDate;
use regex::Regex;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::StoreError;

/// Where a bug record came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Source {
    Stackoverflow,
    Github,
    #[default]
    Personal,
}

impl std::str::FromStr for Source {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "stackoverflow" => Ok(Source::Stackoverflow),
            "github" => Ok(Source::Github),
            "personal" => Ok(Source::Personal),
            other => Err(format!("unknown source tag: {other}")),
        }
    }
}

impl fmt::Display for Source {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Source::Stackoverflow => write!(f, "stackoverflow"),
            Source::Github => write!(f, "github"),
            Source::Personal => write!(f, "personal"),
        }
    }
}

/// A previously-solved bug: the unit of retrieval context
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BugRecord {
    #[serde(default = "Uuid::new_v4")]
    pub id: Uuid,
    pub error_pattern: String,
    #[serde(default)]
    pub context: String,
    #[serde(default)]
    pub language: Option<String>,
    #[serde(default)]
    pub framework: Option<String>,
    #[serde(default)]
    pub problem_description: String,
    pub solution: String,
    #[serde(default)]
    pub source: Source,
    /// Caller-assigned trust weight in 0..=100, secondary ranking signal only
    #[serde(default)]
    pub confidence_score: u8,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub date_fixed: Option<NaiveDate>,
    #[serde(default)]
    pub url: Option<String>,
}

impl BugRecord {
    /// Check the indexing invariants.
    ///
    /// A record without an error pattern cannot be retrieved; a record without
    /// a solution cannot serve as retrieval context. Either rejects the record.
    pub fn validate(&self) -> Result<(), StoreError> {
        if self.error_pattern.trim().is_empty() {
            return Err(StoreError::InvalidRecord {
                field: "error_pattern",
            });
        }
        if self.solution.trim().is_empty() {
            return Err(StoreError::InvalidRecord { field: "solution" });
        }
        if self.confidence_score > 100 {
            return Err(StoreError::InvalidRecord {
                field: "confidence_score",
            });
        }
        Ok(())
    }

    /// Canonical text used for embedding.
    ///
    /// Combines the fields that carry retrieval signal. This is the only text
    /// ever embedded for a record, so it must stay stable across re-indexing.
    pub fn searchable_text(&self) -> String {
        let mut text = format!("Error: {}\nContext: {}", self.error_pattern, self.context);
        if let Some(language) = &self.language {
            text.push_str(&format!("\nLanguage: {}", language));
        }
        if !self.problem_description.is_empty() {
            text.push_str(&format!("\nProblem: {}", self.problem_description));
        }
        if !self.tags.is_empty() {
            text.push_str(&format!("\nTags: {}", self.tags.join(", ")));
        }
        text
    }
}

/// Extract the core error pattern from a full stack trace.
///
/// Finds the first `FooError: ...` / `FooException: ...` line; falls back to a
/// 200-char prefix when the text doesn't look like a trace.
pub fn extract_error_pattern(error_text: &str) -> String {
    const PATTERNS: [&str; 4] = [
        r"\w+Error: .+",
        r"\w+Exception: .+",
        r"Error: .+",
        r"Exception: .+",
    ];

    for pattern in PATTERNS {
        let re = Regex::new(pattern).expect("static pattern compiles");
        if let Some(m) = re.find(error_text) {
            // First line only - the rest of the trace is noise for matching
            return m.as_str().lines().next().unwrap_or_default().to_string();
        }
    }

    error_text.chars().take(200).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_record() -> BugRecord {
        BugRecord {
            id: Uuid::new_v4(),
            error_pattern: "TypeError: 'NoneType' object is not subscriptable".to_string(),
            context: "Accessing API response data".to_string(),
            language: Some("python".to_string()),
            framework: None,
            problem_description: "Indexing into a None value".to_string(),
            solution: "Check for None before indexing".to_string(),
            source: Source::Stackoverflow,
            confidence_score: 45,
            tags: vec!["python".to_string(), "none".to_string()],
            date_fixed: None,
            url: None,
        }
    }

    #[test]
    fn test_validate_accepts_complete_record() {
        assert!(sample_record().validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_empty_error_pattern() {
        let mut record = sample_record();
        record.error_pattern = "   ".to_string();
        let err = record.validate().unwrap_err();
        assert!(matches!(
            err,
            StoreError::InvalidRecord {
                field: "error_pattern"
            }
        ));
    }

    #[test]
    fn test_validate_rejects_missing_solution() {
        let mut record = sample_record();
        record.solution = String::new();
        let err = record.validate().unwrap_err();
        assert!(matches!(err, StoreError::InvalidRecord { field: "solution" }));
    }

    #[test]
    fn test_validate_rejects_out_of_range_confidence() {
        let mut record = sample_record();
        record.confidence_score = 101;
        assert!(record.validate().is_err());
    }

    #[test]
    fn test_searchable_text_includes_signal_fields() {
        let text = sample_record().searchable_text();
        assert!(text.contains("Error: TypeError"));
        assert!(text.contains("Language: python"));
        assert!(text.contains("Tags: python, none"));
    }

    #[test]
    fn test_extract_error_pattern_from_trace() {
        let trace = "Traceback (most recent call last):\n  File \"app.py\", line 15, in <module>\n    result = data['users'][0]['name']\nTypeError: 'NoneType' object is not subscriptable\n";
        assert_eq!(
            extract_error_pattern(trace),
            "TypeError: 'NoneType' object is not subscriptable"
        );
    }

    #[test]
    fn test_extract_error_pattern_fallback_truncates() {
        let text = "x".repeat(500);
        assert_eq!(extract_error_pattern(&text).len(), 200);
    }

    #[test]
    fn test_record_deserializes_with_defaults() {
        // Minimal JSON as produced by personal bug files
        let json = r#"{"error_pattern": "E: boom", "solution": "fix it"}"#;
        let record: BugRecord = serde_json::from_str(json).unwrap();
        assert_eq!(record.source, Source::Personal);
        assert_eq!(record.confidence_score, 0);
        assert!(record.validate().is_ok());
    }
}
