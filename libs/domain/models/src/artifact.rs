// [libs/domain/models/src/artifact.rs]
//! Object store artifact shapes: locations, encodings, tags, and the
//! local differential privacy parameters accepted by the final bucket.
//! Formas del deposito de artefactos: ubicaciones, codificaciones, tags.

use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ArtifactLocation {
    Final,
    Intermediate,
    Local,
}

impl ArtifactLocation {
    pub fn bucket_path(self) -> &'static str {
        match self {
            ArtifactLocation::Final => "final",
            ArtifactLocation::Intermediate => "intermediate",
            ArtifactLocation::Local => "local",
        }
    }

    /// Tags are only ever valid on the local bucket (spec.md §4.4).
    pub fn allows_tags(self) -> bool {
        matches!(self, ArtifactLocation::Local)
    }
}

/// How a value is encoded before transmission. `Pickle` is the
/// self-describing fallback (spec.md's "pickle" in Rust terms: a
/// bincode-serialized value that needs no external schema to decode).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArtifactEncoding {
    Str,
    Bytes,
    Pickle,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TagOption {
    All,
    First,
    Last,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum TagError {
    #[error("tag '{0}' does not match ^[a-z0-9]+(-[a-z0-9]+)*$")]
    InvalidFormat(String),
    #[error("tag '{0}' exceeds 32 characters")]
    TooLong(String),
    #[error("tags are only valid on the local bucket")]
    NotAllowedHere,
}

/// Validates a caller-chosen tag against spec.md §3/§8 property 6:
/// `^[a-z0-9]+(-[a-z0-9]+)*$`, at most 32 characters, local bucket only.
pub fn validate_tag(tag: &str, location: ArtifactLocation) -> Result<(), TagError> {
    if !location.allows_tags() {
        return Err(TagError::NotAllowedHere);
    }
    if tag.len() > 32 {
        return Err(TagError::TooLong(tag.to_string()));
    }
    let is_valid = !tag.is_empty()
        && tag
            .split('-')
            .all(|segment| !segment.is_empty() && segment.bytes().all(|b| b.is_ascii_lowercase() || b.is_ascii_digit()));
    if is_valid {
        Ok(())
    } else {
        Err(TagError::InvalidFormat(tag.to_string()))
    }
}

#[derive(Debug, Error, PartialEq)]
pub enum DpError {
    #[error("epsilon must be > 0, got {0}")]
    NonPositiveEpsilon(f64),
    #[error("sensitivity must be > 0, got {0}")]
    NonPositiveSensitivity(f64),
    #[error("differential privacy requires a finite numeric result")]
    NonFiniteResult,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct LocalDifferentialPrivacyParams {
    pub epsilon: f64,
    pub sensitivity: f64,
}

impl LocalDifferentialPrivacyParams {
    pub fn validate(&self, result: f64) -> Result<(), DpError> {
        if self.epsilon <= 0.0 {
            return Err(DpError::NonPositiveEpsilon(self.epsilon));
        }
        if self.sensitivity <= 0.0 {
            return Err(DpError::NonPositiveSensitivity(self.sensitivity));
        }
        if !result.is_finite() {
            return Err(DpError::NonFiniteResult);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn valid_tags_pass() {
        for tag in ["abc", "abc-def", "a1-b2-c3", "x"] {
            assert!(validate_tag(tag, ArtifactLocation::Local).is_ok(), "{tag} should be valid");
        }
    }

    #[test]
    fn invalid_tags_fail() {
        for tag in ["ABC", "abc--def", "-abc", "abc-", "abc_def", ""] {
            assert!(validate_tag(tag, ArtifactLocation::Local).is_err(), "{tag} should be invalid");
        }
    }

    #[test]
    fn tags_rejected_on_non_local_buckets() {
        assert_eq!(validate_tag("abc", ArtifactLocation::Final), Err(TagError::NotAllowedHere));
        assert_eq!(validate_tag("abc", ArtifactLocation::Intermediate), Err(TagError::NotAllowedHere));
    }

    #[test]
    fn tag_length_enforced() {
        let too_long = "a".repeat(33);
        assert_eq!(validate_tag(&too_long, ArtifactLocation::Local), Err(TagError::TooLong(too_long)));
    }

    #[test]
    fn dp_requires_positive_params_and_finite_result() {
        let params = LocalDifferentialPrivacyParams { epsilon: 1.0, sensitivity: 1.0 };
        assert!(params.validate(42.0).is_ok());
        assert_eq!(params.validate(f64::NAN), Err(DpError::NonFiniteResult));
        assert_eq!(params.validate(f64::INFINITY), Err(DpError::NonFiniteResult));

        let bad = LocalDifferentialPrivacyParams { epsilon: 0.0, sensitivity: 1.0 };
        assert_eq!(bad.validate(1.0), Err(DpError::NonPositiveEpsilon(0.0)));
    }
}
