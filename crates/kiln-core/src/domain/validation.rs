use std::collections::HashSet;

use crate::domain::error::DomainError;

/// Centralized domain validation.
///
/// All validation logic lives here, not scattered across entities.
pub struct DomainValidator;

impl DomainValidator {
    /// Ids are lowercase ASCII letters, digits, `-` and `_`, starting with a
    /// letter or digit.
    pub fn validate_capability_id(id: &str) -> Result<(), DomainError> {
        if id.is_empty() {
            return Err(DomainError::MissingRequiredField { field: "id" });
        }
        let valid_start = id
            .chars()
            .next()
            .is_some_and(|c| c.is_ascii_lowercase() || c.is_ascii_digit());
        let valid_rest = id
            .chars()
            .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-' || c == '_');
        if !valid_start || !valid_rest {
            return Err(DomainError::InvalidCapability(format!(
                "'{id}' is not a valid capability id (use lowercase letters, digits, '-' and '_')"
            )));
        }
        Ok(())
    }

    /// One capability must not produce the same path twice.
    pub fn ensure_unique_paths<'a>(
        plugin_id: &str,
        paths: impl IntoIterator<Item = &'a str>,
    ) -> Result<(), DomainError> {
        let mut seen = HashSet::new();
        for path in paths {
            if !seen.insert(path) {
                return Err(DomainError::DuplicatePath {
                    plugin_id: plugin_id.to_string(),
                    path: path.to_string(),
                });
            }
        }
        Ok(())
    }

    /// A spec attributed to another capability than the one producing it.
    pub fn ensure_attribution(producer: &str, claimed: &str, what: &str) -> Result<(), DomainError> {
        if producer != claimed {
            return Err(DomainError::InvalidCapability(format!(
                "capability '{producer}' returned {what} attributed to '{claimed}'"
            )));
        }
        Ok(())
    }
}
