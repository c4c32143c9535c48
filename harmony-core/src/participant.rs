//! Participant data model

use serde::{Deserialize, Serialize};

use crate::field::FieldKind;

/// Stable participant identifier, zero-based and contiguous over a dataset
pub type ParticipantId = u32;

/// Embedding vector for a single field
pub type EmbeddingVector = Vec<f32>;

/// Per-field embedding vectors of one participant
///
/// A `None` field means the source vector was missing, empty or had a
/// dimensionality inconsistent with the rest of the dataset.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FieldEmbeddingSet {
    pub job: Option<EmbeddingVector>,
    pub academic: Option<EmbeddingVector>,
    pub professional: Option<EmbeddingVector>,
    pub personal: Option<EmbeddingVector>,
    /// Whole-profile embedding (reported, never weighted)
    pub global: Option<EmbeddingVector>,
}

impl FieldEmbeddingSet {
    /// Vector for a scoring field
    pub fn field(&self, kind: FieldKind) -> Option<&[f32]> {
        match kind {
            FieldKind::JobTitle => self.job.as_deref(),
            FieldKind::Academic => self.academic.as_deref(),
            FieldKind::Professional => self.professional.as_deref(),
            FieldKind::Personal => self.personal.as_deref(),
        }
    }

    pub fn field_mut(&mut self, kind: FieldKind) -> &mut Option<EmbeddingVector> {
        match kind {
            FieldKind::JobTitle => &mut self.job,
            FieldKind::Academic => &mut self.academic,
            FieldKind::Professional => &mut self.professional,
            FieldKind::Personal => &mut self.personal,
        }
    }

    pub fn global(&self) -> Option<&[f32]> {
        self.global.as_deref()
    }

    /// True when no vector at all is present
    pub fn is_empty(&self) -> bool {
        FieldKind::ALL.iter().all(|f| self.field(*f).is_none()) && self.global.is_none()
    }
}

/// Cleaned source text per field, used only for explanation prompts
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FieldTextSet {
    pub job_title: String,
    pub academic: String,
    pub professional: String,
    pub personal: String,
}

impl FieldTextSet {
    pub fn field(&self, kind: FieldKind) -> &str {
        match kind {
            FieldKind::JobTitle => &self.job_title,
            FieldKind::Academic => &self.academic,
            FieldKind::Professional => &self.professional,
            FieldKind::Personal => &self.personal,
        }
    }
}

/// A participant as held by the field store
///
/// Embeddings and texts come from independent sources. Either side may be
/// missing for a given id; ranking tolerates that, explanation does not.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Participant {
    pub id: ParticipantId,
    pub name: String,
    /// Profile picture shown next to the participant's matches
    #[serde(default)]
    pub image_url: Option<String>,
    pub embeddings: Option<FieldEmbeddingSet>,
    pub texts: Option<FieldTextSet>,
}

impl Participant {
    pub fn new(id: ParticipantId, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            image_url: None,
            embeddings: None,
            texts: None,
        }
    }

    pub fn with_image_url(mut self, image_url: impl Into<String>) -> Self {
        self.image_url = Some(image_url.into());
        self
    }

    pub fn with_embeddings(mut self, embeddings: FieldEmbeddingSet) -> Self {
        self.embeddings = Some(embeddings);
        self
    }

    pub fn with_texts(mut self, texts: FieldTextSet) -> Self {
        self.texts = Some(texts);
        self
    }

    /// Field vector, treating a missing embedding set as all-absent
    pub fn field_vector(&self, kind: FieldKind) -> Option<&[f32]> {
        self.embeddings.as_ref().and_then(|e| e.field(kind))
    }

    pub fn global_vector(&self) -> Option<&[f32]> {
        self.embeddings.as_ref().and_then(|e| e.global())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_field_accessors() {
        let set = FieldEmbeddingSet {
            job: Some(vec![1.0]),
            personal: Some(vec![2.0, 3.0]),
            ..Default::default()
        };

        assert_eq!(set.field(FieldKind::JobTitle), Some(&[1.0][..]));
        assert_eq!(set.field(FieldKind::Academic), None);
        assert_eq!(set.field(FieldKind::Personal).map(|v| v.len()), Some(2));
        assert!(!set.is_empty());
        assert!(FieldEmbeddingSet::default().is_empty());
    }

    #[test]
    fn test_participant_without_embeddings() {
        let p = Participant::new(3, "Lina");
        assert_eq!(p.field_vector(FieldKind::Academic), None);
        assert_eq!(p.global_vector(), None);
    }

    #[test]
    fn test_text_set_camel_case() {
        let texts = FieldTextSet {
            job_title: "Engineer".to_string(),
            ..Default::default()
        };
        let json = serde_json::to_value(&texts).unwrap();
        assert_eq!(json["jobTitle"], "Engineer");
        assert_eq!(texts.field(FieldKind::JobTitle), "Engineer");
    }
}
