//! The capability contract: identity, static metadata, and the pure
//! production functions every generator implements.
//!
//! # Domain purity
//!
//! A `Capability` only *describes* output. It never touches the filesystem,
//! never renders templates, and never logs. The orchestrator in the
//! application layer calls these functions, renders what they return, and
//! hands the result to the writer.

use std::fmt;

use serde::Serialize;
use serde_json::{Map, Value};

use crate::domain::{
    entities::{
        context::GenerationContext,
        specs::{DependencySpec, FileContribution, FileSpec, ScriptSpec},
    },
    error::DomainError,
    validation::DomainValidator,
};

// ── Identity ─────────────────────────────────────────────────────────────────

/// Opaque capability identifier, e.g. `"type-checking"`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct CapabilityId(String);

impl CapabilityId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CapabilityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for CapabilityId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl From<String> for CapabilityId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl AsRef<str> for CapabilityId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl PartialEq<str> for CapabilityId {
    fn eq(&self, other: &str) -> bool {
        self.0 == other
    }
}

impl PartialEq<&str> for CapabilityId {
    fn eq(&self, other: &&str) -> bool {
        self.0 == *other
    }
}

// ── Metadata ─────────────────────────────────────────────────────────────────

/// Static description of a capability.
///
/// Recreated from the registry factory on every run; never mutated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CapabilityMetadata {
    id: CapabilityId,
    priority: i32,
    version: String,
    description: String,
    depends_on: Vec<CapabilityId>,
    contributes_to: Vec<String>,
}

impl CapabilityMetadata {
    pub fn builder(id: impl Into<CapabilityId>) -> CapabilityMetadataBuilder {
        CapabilityMetadataBuilder::new(id.into())
    }

    pub fn id(&self) -> &CapabilityId {
        &self.id
    }

    /// Lower values execute earlier when no dependency edge decides.
    pub const fn priority(&self) -> i32 {
        self.priority
    }

    pub fn version(&self) -> &str {
        &self.version
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn depends_on(&self) -> &[CapabilityId] {
        &self.depends_on
    }

    /// Shared paths this capability contributes to. Informational only;
    /// the merger works from the contributions actually produced.
    pub fn contributes_to(&self) -> &[String] {
        &self.contributes_to
    }
}

/// Builder for [`CapabilityMetadata`].
#[derive(Debug, Clone)]
pub struct CapabilityMetadataBuilder {
    id: CapabilityId,
    priority: i32,
    version: String,
    description: String,
    depends_on: Vec<CapabilityId>,
    contributes_to: Vec<String>,
}

impl CapabilityMetadataBuilder {
    fn new(id: CapabilityId) -> Self {
        Self {
            id,
            priority: 0,
            version: "0.1.0".to_string(),
            description: String::new(),
            depends_on: Vec::new(),
            contributes_to: Vec::new(),
        }
    }

    pub fn priority(mut self, priority: i32) -> Self {
        self.priority = priority;
        self
    }

    pub fn version(mut self, version: impl Into<String>) -> Self {
        self.version = version.into();
        self
    }

    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    /// Repeated ids are kept once.
    pub fn depends_on(mut self, id: impl Into<CapabilityId>) -> Self {
        let id = id.into();
        if !self.depends_on.contains(&id) {
            self.depends_on.push(id);
        }
        self
    }

    pub fn contributes_to(mut self, path: impl Into<String>) -> Self {
        self.contributes_to.push(path.into());
        self
    }

    /// # Errors
    ///
    /// [`DomainError::InvalidCapability`] if the id or a dependency id is
    /// not a valid capability identifier.
    pub fn build(self) -> Result<CapabilityMetadata, DomainError> {
        DomainValidator::validate_capability_id(self.id.as_str())?;
        for dep in &self.depends_on {
            DomainValidator::validate_capability_id(dep.as_str())?;
        }
        if self.version.trim().is_empty() {
            return Err(DomainError::MissingRequiredField { field: "version" });
        }

        Ok(CapabilityMetadata {
            id: self.id,
            priority: self.priority,
            version: self.version,
            description: self.description,
            depends_on: self.depends_on,
            contributes_to: self.contributes_to,
        })
    }
}

// ── Contract ─────────────────────────────────────────────────────────────────

/// A unit of generation.
///
/// Every method is a pure function of the context. Implementations must
/// return the same values for the same context.
pub trait Capability: Send + Sync {
    fn metadata(&self) -> CapabilityMetadata;

    /// Files owned by this capability. Two specs with the same path are
    /// rejected; a spec with a merge strategy becomes a contribution.
    fn files(&self, ctx: &GenerationContext) -> Vec<FileSpec>;

    fn dependencies(&self, ctx: &GenerationContext) -> Vec<DependencySpec>;

    fn scripts(&self, ctx: &GenerationContext) -> Vec<ScriptSpec>;

    /// Fragments of files shared with other capabilities.
    fn contributions(&self, _ctx: &GenerationContext) -> Vec<FileContribution> {
        Vec::new()
    }

    /// Values layered over the project configuration when this
    /// capability's templates are rendered.
    fn template_values(&self, _ctx: &GenerationContext) -> Map<String, Value> {
        Map::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builder_defaults() {
        let meta = CapabilityMetadata::builder("base").build().unwrap();
        assert_eq!(meta.id(), &CapabilityId::from("base"));
        assert_eq!(meta.priority(), 0);
        assert_eq!(meta.version(), "0.1.0");
        assert!(meta.depends_on().is_empty());
    }

    #[test]
    fn builder_dedupes_dependencies() {
        let meta = CapabilityMetadata::builder("web-app")
            .depends_on("type-checking")
            .depends_on("type-checking")
            .priority(20)
            .build()
            .unwrap();
        assert_eq!(meta.depends_on(), &[CapabilityId::from("type-checking")]);
        assert_eq!(meta.priority(), 20);
    }

    #[test]
    fn builder_rejects_bad_ids() {
        assert!(CapabilityMetadata::builder("").build().is_err());
        assert!(CapabilityMetadata::builder("has space").build().is_err());
        assert!(
            CapabilityMetadata::builder("ok")
                .depends_on("Not/Ok")
                .build()
                .is_err()
        );
    }

    #[test]
    fn builder_rejects_blank_version() {
        assert_eq!(
            CapabilityMetadata::builder("ok").version(" ").build(),
            Err(DomainError::MissingRequiredField { field: "version" })
        );
    }

    #[test]
    fn capability_id_compares_with_str() {
        let id = CapabilityId::from("linting");
        assert_eq!(id, "linting");
        assert_eq!(id.to_string(), "linting");
    }
}
