pub mod capability;
pub mod common;
pub mod context;
pub mod result;
pub mod specs;

pub use crate::domain::DomainError;
pub use capability::{Capability, CapabilityId, CapabilityMetadata, CapabilityMetadataBuilder};
pub use context::{GenerationContext, TemplateContext};
pub use result::{FileOutcome, FileRecord, GenerationReport, GenerationResult, MergedRecord};
pub use specs::{
    DependencyKind, DependencySpec, FileContribution, FileSpec, MergeStrategy, PackageTarget,
    ScriptSpec,
};
