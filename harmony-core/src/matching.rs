//! Ranked match results

use serde::{Deserialize, Serialize};

use crate::field::FieldKind;
use crate::participant::ParticipantId;

/// Per-field similarities of one candidate against the target
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct FieldBreakdown {
    pub job: f64,
    pub professional: f64,
    pub academic: f64,
    pub personal: f64,
}

impl FieldBreakdown {
    pub fn get(&self, kind: FieldKind) -> f64 {
        match kind {
            FieldKind::JobTitle => self.job,
            FieldKind::Academic => self.academic,
            FieldKind::Professional => self.professional,
            FieldKind::Personal => self.personal,
        }
    }

    pub fn set(&mut self, kind: FieldKind, score: f64) {
        match kind {
            FieldKind::JobTitle => self.job = score,
            FieldKind::Academic => self.academic = score,
            FieldKind::Professional => self.professional = score,
            FieldKind::Personal => self.personal = score,
        }
    }
}

/// Score breakdown reported alongside the aggregate score
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct MatchBreakdown {
    /// Whole-profile similarity (not part of the weighted score)
    pub global: f64,
    pub fields: FieldBreakdown,
}

/// One ranked candidate for a target participant
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatchResult {
    pub id: ParticipantId,
    pub name: String,
    #[serde(default, rename = "imageUrl")]
    pub image_url: Option<String>,
    /// Weighted aggregate similarity
    pub score: f64,
    pub breakdown: MatchBreakdown,
}
