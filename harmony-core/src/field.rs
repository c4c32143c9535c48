//! Profile field definitions

use serde::{Deserialize, Serialize};
use std::fmt;

/// The four scoring profile fields
///
/// Declaration order is the canonical field order; stable sorts over fields
/// fall back to it on ties.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum FieldKind {
    JobTitle,
    Academic,
    Professional,
    Personal,
}

impl FieldKind {
    /// All scoring fields in canonical order
    pub const ALL: [FieldKind; 4] = [
        FieldKind::JobTitle,
        FieldKind::Academic,
        FieldKind::Professional,
        FieldKind::Personal,
    ];

    /// Serialized key (matches the serde representation)
    pub fn key(&self) -> &'static str {
        match self {
            FieldKind::JobTitle => "jobTitle",
            FieldKind::Academic => "academic",
            FieldKind::Professional => "professional",
            FieldKind::Personal => "personal",
        }
    }

    /// Human-readable label used in prompts and responses
    pub fn label(&self) -> &'static str {
        match self {
            FieldKind::JobTitle => "Job Title",
            FieldKind::Academic => "Academic Resume",
            FieldKind::Professional => "Professional Resume",
            FieldKind::Personal => "Personal Resume",
        }
    }
}

impl fmt::Display for FieldKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.key())
    }
}

impl std::str::FromStr for FieldKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "jobtitle" | "job" | "job_title" => Ok(FieldKind::JobTitle),
            "academic" => Ok(FieldKind::Academic),
            "professional" => Ok(FieldKind::Professional),
            "personal" => Ok(FieldKind::Personal),
            _ => Err(format!("Unknown field: {}", s)),
        }
    }
}
