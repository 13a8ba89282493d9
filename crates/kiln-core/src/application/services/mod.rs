//! Application services - orchestrate use cases.
//!
//! Services coordinate the domain layer and ports to accomplish
//! high-level use cases like "generate a project" or "list capabilities".

pub mod capability_service;
pub mod generation_service;

pub use capability_service::{CapabilityInfo, CapabilityService};
pub use generation_service::GenerationService;
