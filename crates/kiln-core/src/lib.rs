//! Kiln Core - Hexagonal Architecture Implementation
//!
//! This crate provides the domain and application layers for the Kiln
//! project generator, following hexagonal (ports and adapters) architecture.
//!
//! ## Architecture Overview
//!
//! ```text
//! ┌─────────────────────────────────────────┐
//! │             kiln-cli (CLI)              │
//! │     (Implements Driving Ports)          │
//! └──────────────────┬──────────────────────┘
//!                    │ calls
//!                    ▼
//! ┌─────────────────────────────────────────┐
//! │         Application Services            │
//! │ (GenerationService, CapabilityService)  │
//! │    plan → merge → commit, OutputWriter  │
//! └──────────────────┬──────────────────────┘
//!                    │ uses
//!                    ▼
//! ┌─────────────────────────────────────────┐
//! │      Application Ports (Traits)         │
//! │   (Driven: Filesystem, TemplateRenderer)│
//! └──────────────────┬──────────────────────┘
//!                    │ implemented by
//!                    ▼
//! ┌─────────────────────────────────────────┐
//! │     kiln-adapters (Infrastructure)      │
//! │ (HandlebarsRenderer, LocalFilesystem,   │
//! │  built-in and manifest capabilities)    │
//! └─────────────────────────────────────────┘
//!                    │
//!                    ▼
//! ┌─────────────────────────────────────────┐
//! │        Domain Layer (Pure Logic)        │
//! │ (Capability, Resolver, Merger, Condition)│
//! └─────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use kiln_core::prelude::*;
//!
//! // 1. Registry of capability factories (see kiln-adapters for built-ins)
//! let registry = Arc::new(CapabilityRegistry::new());
//!
//! // 2. Service with injected adapters
//! let service = GenerationService::new(registry, renderer, filesystem);
//!
//! // 3. Resolve and run
//! let resolution = service.resolve(&["web-app".into()])?;
//! let ctx = GenerationContext::new("./my-app").with_enabled(resolution.order.clone());
//! let report = service.run(&resolution, &ctx)?;
//! # Ok::<(), KilnError>(())
//! ```

pub mod domain;

pub mod application;

pub mod error;

// Public API - what external crates should use
pub mod prelude {
    pub use crate::application::{
        CapabilityInfo, CapabilityService, GenerationService,
        ports::{CompiledTemplate, Filesystem, TemplateRenderer},
    };
    pub use crate::domain::{
        Capability, CapabilityId, CapabilityMetadata, CapabilityRegistry, DependencyKind,
        DependencySpec, FileContribution, FileMode, FileOutcome, FileRecord, FileSpec,
        GenerationContext, GenerationReport, GenerationResult, MergeStrategy, PackageTarget,
        Resolution, ScriptSpec, TemplateContext,
    };
    pub use crate::error::{KilnError, KilnResult};
}

// Version info
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
