//! Pieces shared by the adjustment and transfer workflows.

use serde::{Deserialize, Serialize};

use bodega_core::{DomainError, DomainResult};

/// Minimum length (in characters, after trimming) of a rejection reason.
pub const DEFAULT_MIN_REJECTION_REASON_CHARS: usize = 10;

/// A validated, trimmed rejection reason.
///
/// Deserialization runs the same check as `parse` with the default minimum.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct RejectionReason(String);

impl RejectionReason {
    pub fn parse(raw: &str, min_chars: usize) -> DomainResult<Self> {
        let trimmed = raw.trim();
        if trimmed.chars().count() < min_chars {
            return Err(DomainError::validation(format!(
                "rejection reason must have at least {min_chars} characters"
            )));
        }
        Ok(Self(trimmed.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_inner(self) -> String {
        self.0
    }
}

impl TryFrom<String> for RejectionReason {
    type Error = DomainError;

    fn try_from(raw: String) -> Result<Self, Self::Error> {
        Self::parse(&raw, DEFAULT_MIN_REJECTION_REASON_CHARS)
    }
}

impl From<RejectionReason> for String {
    fn from(reason: RejectionReason) -> Self {
        reason.0
    }
}

/// Normalize optional free-text notes: blank becomes `None`.
pub(crate) fn clean_notes(notes: Option<&str>) -> Option<String> {
    notes
        .map(str::trim)
        .filter(|n| !n.is_empty())
        .map(str::to_string)
}
