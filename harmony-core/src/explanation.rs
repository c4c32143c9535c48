//! Explanation records and their cache key

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::field::FieldKind;
use crate::participant::ParticipantId;

/// Order-independent key for an unordered participant pair
///
/// `PairKey::new(a, b) == PairKey::new(b, a)`; the string form is `"min-max"`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PairKey {
    low: ParticipantId,
    high: ParticipantId,
}

impl PairKey {
    pub fn new(a: ParticipantId, b: ParticipantId) -> Self {
        Self {
            low: a.min(b),
            high: a.max(b),
        }
    }

    pub fn low(&self) -> ParticipantId {
        self.low
    }

    pub fn high(&self) -> ParticipantId {
        self.high
    }
}

impl fmt::Display for PairKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.low, self.high)
    }
}

impl std::str::FromStr for PairKey {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (a, b) = s
            .split_once('-')
            .ok_or_else(|| format!("Invalid pair key: {}", s))?;
        let a = a
            .trim()
            .parse::<ParticipantId>()
            .map_err(|e| format!("Invalid pair key {}: {}", s, e))?;
        let b = b
            .trim()
            .parse::<ParticipantId>()
            .map_err(|e| format!("Invalid pair key {}: {}", s, e))?;
        Ok(PairKey::new(a, b))
    }
}

/// Identity echo of a participant inside a record
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParticipantRef {
    pub id: ParticipantId,
    pub name: String,
}

/// Similarity per scoring field
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FieldScores {
    pub job_title: f64,
    pub academic: f64,
    pub professional: f64,
    pub personal: f64,
}

impl FieldScores {
    pub fn get(&self, kind: FieldKind) -> f64 {
        match kind {
            FieldKind::JobTitle => self.job_title,
            FieldKind::Academic => self.academic,
            FieldKind::Professional => self.professional,
            FieldKind::Personal => self.personal,
        }
    }

    pub fn set(&mut self, kind: FieldKind, score: f64) {
        match kind {
            FieldKind::JobTitle => self.job_title = score,
            FieldKind::Academic => self.academic = score,
            FieldKind::Professional => self.professional = score,
            FieldKind::Personal => self.personal = score,
        }
    }

    /// Fields sorted by descending score; ties keep canonical field order
    pub fn ranked(&self) -> Vec<RankedField> {
        let mut ranked: Vec<RankedField> = FieldKind::ALL
            .iter()
            .map(|field| RankedField {
                field: *field,
                score: self.get(*field),
            })
            .collect();

        ranked.sort_by(|a, b| {
            b.score
                .partial_cmp(&a.score)
                .unwrap_or(std::cmp::Ordering::Equal)
        });

        ranked
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RankedField {
    pub field: FieldKind,
    pub score: f64,
}

/// One of the top fields explaining a match, with both raw texts
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MatchReason {
    pub field: FieldKind,
    pub field_label: String,
    pub score: f64,
    pub a_text: String,
    pub b_text: String,
}

/// Similarity between one field of the target and another field of the match
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CrossFieldScore {
    pub from: FieldKind,
    pub to: FieldKind,
    pub score: f64,
}

/// Text in the primary language plus its translations
///
/// Any entry may be absent when its generation stage failed.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LocalizedText {
    pub ar: Option<String>,
    pub en: Option<String>,
    pub he: Option<String>,
}

impl LocalizedText {
    /// Look up a language code, falling back to nothing
    pub fn get(&self, lang: &str) -> Option<&str> {
        match lang {
            "ar" => self.ar.as_deref(),
            "en" => self.en.as_deref(),
            "he" => self.he.as_deref(),
            _ => None,
        }
    }
}

/// Display name of the matched participant, translated separately
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MatchName {
    pub original: Option<String>,
    pub en: Option<String>,
    pub he: Option<String>,
}

/// Cached explanation of why two participants match
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExplanationRecord {
    pub target: ParticipantRef,
    #[serde(rename = "match")]
    pub matched: ParticipantRef,
    pub field_scores: FieldScores,
    pub ranked_fields: Vec<RankedField>,
    pub reasons: Vec<MatchReason>,
    #[serde(default)]
    pub cross_field: Vec<CrossFieldScore>,
    pub explanation: LocalizedText,
    pub match_name: MatchName,
    pub created_at: DateTime<Utc>,
}

impl ExplanationRecord {
    pub fn pair_key(&self) -> PairKey {
        PairKey::new(self.target.id, self.matched.id)
    }

    /// Best-matching field, if any field was scored
    pub fn best_field(&self) -> Option<FieldKind> {
        self.ranked_fields.first().map(|r| r.field)
    }

    /// Whether the primary explanation text was generated
    pub fn is_complete(&self) -> bool {
        self.explanation.ar.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pair_key_symmetric() {
        for (a, b) in [(0, 1), (7, 3), (5, 5), (0, u32::MAX)] {
            assert_eq!(PairKey::new(a, b), PairKey::new(b, a));
        }
        assert_eq!(PairKey::new(9, 2).to_string(), "2-9");
    }

    #[test]
    fn test_pair_key_parse() {
        let key: PairKey = "12-4".parse().unwrap();
        assert_eq!(key, PairKey::new(4, 12));
        assert!("12".parse::<PairKey>().is_err());
        assert!("a-b".parse::<PairKey>().is_err());
    }

    #[test]
    fn test_ranked_fields_stable_on_ties() {
        let scores = FieldScores {
            job_title: 0.5,
            academic: 0.9,
            professional: 0.5,
            personal: 0.1,
        };

        let ranked: Vec<FieldKind> = scores.ranked().iter().map(|r| r.field).collect();
        assert_eq!(
            ranked,
            vec![
                FieldKind::Academic,
                FieldKind::JobTitle,
                FieldKind::Professional,
                FieldKind::Personal
            ]
        );
    }

    #[test]
    fn test_record_wire_format() {
        let record = ExplanationRecord {
            target: ParticipantRef { id: 1, name: "A".to_string() },
            matched: ParticipantRef { id: 0, name: "B".to_string() },
            field_scores: FieldScores::default(),
            ranked_fields: FieldScores::default().ranked(),
            reasons: Vec::new(),
            cross_field: Vec::new(),
            explanation: LocalizedText::default(),
            match_name: MatchName::default(),
            created_at: Utc::now(),
        };

        let json = serde_json::to_value(&record).unwrap();
        assert_eq!(json["match"]["id"], 0);
        assert!(json["fieldScores"]["jobTitle"].is_number());
        assert!(json["explanation"]["ar"].is_null());
        assert_eq!(record.pair_key().to_string(), "0-1");
        assert!(!record.is_complete());

        let back: ExplanationRecord = serde_json::from_value(json).unwrap();
        assert_eq!(back, record);
    }
}
