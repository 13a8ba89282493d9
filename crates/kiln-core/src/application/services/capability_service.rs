//! Capability Service - registry queries.
//!
//! Read-only views of the registry for listing and planning.
//! Separated from GenerationService for single responsibility.

use std::sync::Arc;

use serde::Serialize;

use crate::{
    domain::{
        CapabilityId, CapabilityMetadata, CapabilityRegistry, CapabilityResolver, DomainError,
        Resolution,
    },
    error::KilnResult,
};

/// Information about a capability for display purposes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CapabilityInfo {
    pub id: String,
    pub version: String,
    pub priority: i32,
    pub description: String,
    pub depends_on: Vec<String>,
    pub contributes_to: Vec<String>,
}

impl From<CapabilityMetadata> for CapabilityInfo {
    fn from(meta: CapabilityMetadata) -> Self {
        Self {
            id: meta.id().to_string(),
            version: meta.version().to_string(),
            priority: meta.priority(),
            description: meta.description().to_string(),
            depends_on: meta.depends_on().iter().map(ToString::to_string).collect(),
            contributes_to: meta.contributes_to().to_vec(),
        }
    }
}

/// Service for registry queries.
pub struct CapabilityService {
    registry: Arc<CapabilityRegistry>,
}

impl CapabilityService {
    /// Create a new capability service.
    pub fn new(registry: Arc<CapabilityRegistry>) -> Self {
        Self { registry }
    }

    /// All capabilities in declaration order.
    pub fn list(&self) -> Vec<CapabilityInfo> {
        self.registry
            .all_metadata()
            .into_iter()
            .map(CapabilityInfo::from)
            .collect()
    }

    /// Get a capability by id.
    pub fn get(&self, id: &CapabilityId) -> KilnResult<CapabilityInfo> {
        self.registry
            .metadata(id)
            .map(CapabilityInfo::from)
            .ok_or_else(|| {
                DomainError::UnknownCapability {
                    id: id.to_string(),
                    required_by: None,
                }
                .into()
            })
    }

    /// Resolution without running anything.
    pub fn plan(&self, requested: &[CapabilityId]) -> KilnResult<Resolution> {
        Ok(CapabilityResolver::new(&self.registry).resolve(requested)?)
    }
}
