//! Paper entity

use serde::{Deserialize, Serialize};

/// Paper identifier as it appears in the dataset
pub type PaperId = String;

/// A paper from the citation corpus.
///
/// Built once by the corpus parser; the authority score is assigned before
/// the corpus is frozen and never changes afterwards.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Paper {
    /// Dataset id. Records without one are kept but cannot be looked up.
    pub id: Option<PaperId>,

    pub title: String,

    #[serde(default)]
    pub authors: String,

    #[serde(default)]
    pub year: String,

    #[serde(default)]
    pub venue: String,

    #[serde(rename = "abstract")]
    pub abstract_text: Option<String>,

    /// Cited paper ids in dataset order. May name papers outside the corpus.
    #[serde(default)]
    pub references: Vec<PaperId>,

    /// Mean title embedding; absent when the record had no abstract line
    #[serde(skip_serializing_if = "Option::is_none")]
    pub semantic_vector: Option<Vec<f32>>,

    /// Scaled authority (see `AUTHORITY_SCALE`)
    #[serde(default)]
    pub authority_score: f64,
}

impl Paper {
    /// Create a paper with only a title set
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            id: None,
            title: title.into(),
            authors: String::new(),
            year: String::new(),
            venue: String::new(),
            abstract_text: None,
            references: Vec::new(),
            semantic_vector: None,
            authority_score: 0.0,
        }
    }

    /// Set the dataset id
    pub fn with_id(mut self, id: impl Into<PaperId>) -> Self {
        self.id = Some(id.into());
        self
    }

    /// Append a cited paper id
    pub fn with_reference(mut self, id: impl Into<PaperId>) -> Self {
        self.references.push(id.into());
        self
    }

    /// Set the semantic vector
    pub fn with_vector(mut self, vector: Vec<f32>) -> Self {
        self.semantic_vector = Some(vector);
        self
    }

    /// Dataset id as a string slice
    pub fn id(&self) -> Option<&str> {
        self.id.as_deref()
    }

    /// Abstract text, empty when the record had none
    pub fn abstract_or_empty(&self) -> &str {
        self.abstract_text.as_deref().unwrap_or("")
    }

    /// Semantic vector if present and non-empty
    pub fn usable_vector(&self) -> Option<&[f32]> {
        self.semantic_vector
            .as_deref()
            .filter(|vector| !vector.is_empty())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builder_helpers() {
        let paper = Paper::new("Graph Mining")
            .with_id("42")
            .with_reference("7")
            .with_reference("9");

        assert_eq!(paper.id(), Some("42"));
        assert_eq!(paper.references, vec!["7", "9"]);
        assert_eq!(paper.abstract_or_empty(), "");
    }

    #[test]
    fn test_empty_vector_is_not_usable() {
        let paper = Paper::new("Empty").with_vector(vec![]);
        assert!(paper.usable_vector().is_none());

        let paper = Paper::new("Zero").with_vector(vec![0.0, 0.0]);
        assert_eq!(paper.usable_vector(), Some(&[0.0, 0.0][..]));
    }

    #[test]
    fn test_serializes_abstract_field_name() {
        let mut paper = Paper::new("Title").with_id("1");
        paper.abstract_text = Some("Body".into());

        let json = serde_json::to_value(&paper).unwrap();
        assert_eq!(json["abstract"], "Body");
        assert!(json.get("semantic_vector").is_none());
    }
}
