// ============================================================================
//  CLEAN MODULE BOUNDARIES
// ============================================================================

//! Core domain layer for Kiln.
//!
//! Pure generation logic: capability identity and metadata, resolution,
//! conditions, contribution merging. Rendering and all I/O are behind ports
//! defined in the application layer.
//!
//! ## Hexagonal Architecture Compliance
//!
//! - **No async**: domain logic is synchronous
//! - **No I/O**: no filesystem, network, or logging
//! - **Value objects**: specs are created per run and never mutated
//!
pub mod casing;
pub mod condition;
pub mod entities;
pub mod error;
pub mod merge;
pub mod registry;
pub mod resolver;

mod validation;

pub use condition::Condition;
pub use entities::{
    Capability, CapabilityId, CapabilityMetadata, CapabilityMetadataBuilder, DependencyKind,
    DependencySpec, FileContribution, FileOutcome, FileRecord, FileSpec, GenerationContext,
    GenerationReport, GenerationResult, MergeStrategy, MergedRecord, PackageTarget, ScriptSpec,
    TemplateContext,
    common::{FileMode, RelativePath},
};
pub use error::{DomainError, ErrorCategory};
pub use merge::{MergedFile, detect_collisions, merge_contributions};
pub use registry::{CapabilityFactory, CapabilityRegistry};
pub use resolver::{CapabilityResolver, Resolution};
pub use validation::DomainValidator;

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    // ========================================================================
    // Cross-module behaviour
    // ========================================================================

    #[test]
    fn condition_sees_enabled_plugins() {
        let make = |enabled: &[&str]| {
            GenerationContext::new("out")
                .with_enabled(enabled.iter().map(|s| CapabilityId::from(*s)))
                .base_template_context()
        };
        let cond = Condition::parse("plugins.includes('testing')");
        assert!(cond.evaluate(&make(&["testing", "linting"])));
        assert!(!cond.evaluate(&make(&["linting"])));
    }

    #[test]
    fn promoted_file_spec_merges_with_contribution() {
        let base = CapabilityId::from("base");
        let promoted = FileSpec::new("package.json", r#"{"name":"demo"}"#)
            .merge(MergeStrategy::MergeStructured)
            .to_contribution(&base)
            .unwrap();
        let other = FileContribution::new(
            "linting",
            "package.json",
            r#"{"scripts":{"lint":"eslint ."}}"#,
            MergeStrategy::MergeStructured,
        );

        let order = vec![base, CapabilityId::from("linting")];
        let merged = merge_contributions(&[other, promoted], &order).unwrap();
        let doc: serde_json::Value = serde_json::from_str(&merged[0].content).unwrap();
        assert_eq!(doc, json!({ "name": "demo", "scripts": { "lint": "eslint ." } }));
        assert_eq!(merged[0].contributors, order);
    }

    #[test]
    fn error_categories() {
        assert_eq!(
            DomainError::CycleDetected { cycle: vec![] }.category(),
            ErrorCategory::Compatibility
        );
        assert_eq!(
            DomainError::UnknownCapability {
                id: "x".into(),
                required_by: None
            }
            .category(),
            ErrorCategory::NotFound
        );
        assert!(
            DomainError::UnknownCapability {
                id: "x".into(),
                required_by: Some("y".into())
            }
            .suggestions()
            .iter()
            .any(|s| s.contains("kiln list"))
        );
    }
}
