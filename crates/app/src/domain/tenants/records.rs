//! Tenant Records

use std::{
    fmt::{Display, Formatter, Result as FmtResult},
    str::FromStr,
};

use serde::{Deserialize, Serialize};

use crate::domain::tenants::errors::TenantIdError;

/// Shortest accepted tenant identifier.
pub const TENANT_ID_MIN_LEN: usize = 10;

/// Longest accepted tenant identifier.
pub const TENANT_ID_MAX_LEN: usize = 50;

/// Opaque academy identifier matching `^[A-Za-z0-9_-]{10,50}$`.
///
/// A `TenantId` can only be obtained through [`TenantId::parse`], so holding one
/// proves the syntax check already happened.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct TenantId(String);

impl TenantId {
    /// Validate and wrap a raw tenant identifier.
    ///
    /// # Errors
    ///
    /// Returns an error when the value has the wrong length or contains characters
    /// outside `[A-Za-z0-9_-]`.
    pub fn parse(value: impl Into<String>) -> Result<Self, TenantIdError> {
        let value = value.into();

        check_tenant_id(&value)?;

        Ok(Self(value))
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    #[must_use]
    pub fn into_string(self) -> String {
        self.0
    }
}

/// Returns `true` when `value` is a syntactically valid tenant identifier.
#[must_use]
pub fn is_valid_tenant_id(value: &str) -> bool {
    check_tenant_id(value).is_ok()
}

fn check_tenant_id(value: &str) -> Result<(), TenantIdError> {
    let length = value.chars().count();

    if !(TENANT_ID_MIN_LEN..=TENANT_ID_MAX_LEN).contains(&length) {
        return Err(TenantIdError::Length {
            value: value.to_string(),
            length,
        });
    }

    if let Some(character) = value
        .chars()
        .find(|c| !(c.is_ascii_alphanumeric() || *c == '_' || *c == '-'))
    {
        return Err(TenantIdError::Character {
            value: value.to_string(),
            character,
        });
    }

    Ok(())
}

impl Display for TenantId {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for TenantId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl FromStr for TenantId {
    type Err = TenantIdError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        Self::parse(value)
    }
}

impl TryFrom<String> for TenantId {
    type Error = TenantIdError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(value)
    }
}

impl From<TenantId> for String {
    fn from(value: TenantId) -> Self {
        value.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_ids_within_bounds() {
        assert!(is_valid_tenant_id("academy_01"));
        assert!(is_valid_tenant_id("A-b_C-d_E-f_0123"));
        assert!(is_valid_tenant_id(&"x".repeat(TENANT_ID_MAX_LEN)));
    }

    #[test]
    fn rejects_short_ids() {
        let result = TenantId::parse("abc");

        assert!(
            matches!(result, Err(TenantIdError::Length { length: 3, .. })),
            "expected Length error, got {result:?}"
        );
    }

    #[test]
    fn rejects_nine_character_ids() {
        assert!(!is_valid_tenant_id("academy01"));
    }

    #[test]
    fn rejects_long_ids() {
        assert!(!is_valid_tenant_id(&"x".repeat(TENANT_ID_MAX_LEN + 1)));
    }

    #[test]
    fn rejects_path_separators() {
        let result = TenantId::parse("academy/../other");

        assert!(
            matches!(result, Err(TenantIdError::Character { character: '/', .. })),
            "expected Character error, got {result:?}"
        );
    }

    #[test]
    fn deserialize_validates() {
        let valid: Result<TenantId, _> = serde_json::from_str("\"academy_0001\"");
        let invalid: Result<TenantId, _> = serde_json::from_str("\"short\"");

        assert!(valid.is_ok());
        assert!(invalid.is_err());
    }
}
