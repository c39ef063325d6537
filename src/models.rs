//! Core data models for the catalog and search pipeline.

use serde::Serialize;

/// A validated catalog row ready for insertion, scoped to one school by the
/// loader. `subject`, `number`, and `name` are guaranteed non-empty; the
/// optional source columns default to empty strings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CourseRow {
    pub subject: String,
    pub number: String,
    pub name: String,
    pub description: String,
    pub credit_hours: String,
}

/// A stored course as selected for embedding generation.
#[derive(Debug, Clone)]
pub struct Course {
    pub id: i64,
    pub subject: String,
    pub number: String,
    pub name: String,
    pub description: String,
}

impl Course {
    /// Canonical embedding prompt: subject, number, name, and description
    /// joined by single spaces, skipping empty parts.
    pub fn prompt(&self) -> String {
        [
            self.subject.as_str(),
            self.number.as_str(),
            self.name.as_str(),
            self.description.as_str(),
        ]
        .iter()
        .filter(|part| !part.is_empty())
        .copied()
        .collect::<Vec<_>>()
        .join(" ")
    }
}

/// One ranked search result, serialized in the wire shape of the search
/// endpoint.
#[derive(Debug, Clone, Serialize)]
pub struct SearchHit {
    pub school: String,
    pub subject: String,
    pub number: String,
    pub name: String,
    pub description: String,
    #[serde(rename = "creditHours")]
    pub credit_hours: String,
    /// Cosine similarity in roughly [-1, 1]; `None` when the stored vector
    /// could not be scored against the query vector.
    pub similarity: Option<f64>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn prompt_joins_non_empty_parts() {
        let course = Course {
            id: 1,
            subject: "CSC".to_string(),
            number: "316".to_string(),
            name: "Data Structures".to_string(),
            description: "Abstract data types.".to_string(),
        };
        assert_eq!(course.prompt(), "CSC 316 Data Structures Abstract data types.");
    }

    #[test]
    fn prompt_skips_empty_description() {
        let course = Course {
            id: 2,
            subject: "MA".to_string(),
            number: "141".to_string(),
            name: "Calculus I".to_string(),
            description: String::new(),
        };
        assert_eq!(course.prompt(), "MA 141 Calculus I");
    }

    #[test]
    fn search_hit_serializes_credit_hours_camel_case() {
        let hit = SearchHit {
            school: "NCSU".to_string(),
            subject: "CSC".to_string(),
            number: "316".to_string(),
            name: "Data Structures".to_string(),
            description: String::new(),
            credit_hours: "3".to_string(),
            similarity: Some(0.5),
        };
        let json = serde_json::to_value(&hit).unwrap();
        assert_eq!(json["creditHours"], "3");
        assert!(json.get("credit_hours").is_none());
    }
}
