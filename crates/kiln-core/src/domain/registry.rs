//! Explicit registry of capability factories.
//!
//! The registry is a plain value owned by whoever drives a run. It is never
//! global. Declaration order is registration order and breaks ties in the
//! resolver.

use std::collections::HashMap;
use std::fmt;

use super::{
    entities::{Capability, CapabilityId, CapabilityMetadata},
    error::DomainError,
};

/// Produces a fresh capability instance per call.
pub type CapabilityFactory = Box<dyn Fn() -> Box<dyn Capability> + Send + Sync>;

#[derive(Default)]
pub struct CapabilityRegistry {
    entries: Vec<(CapabilityId, CapabilityFactory)>,
    index: HashMap<CapabilityId, usize>,
}

impl CapabilityRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a factory under the id its capability reports.
    ///
    /// # Errors
    ///
    /// [`DomainError::DuplicateCapability`] if the id is already registered.
    pub fn register<F>(&mut self, factory: F) -> Result<(), DomainError>
    where
        F: Fn() -> Box<dyn Capability> + Send + Sync + 'static,
    {
        let id = factory().metadata().id().clone();
        if self.index.contains_key(&id) {
            return Err(DomainError::DuplicateCapability { id: id.to_string() });
        }
        self.index.insert(id.clone(), self.entries.len());
        self.entries.push((id, Box::new(factory)));
        Ok(())
    }

    /// Builder-style [`register`](Self::register).
    pub fn with<F>(mut self, factory: F) -> Result<Self, DomainError>
    where
        F: Fn() -> Box<dyn Capability> + Send + Sync + 'static,
    {
        self.register(factory)?;
        Ok(self)
    }

    pub fn contains(&self, id: &CapabilityId) -> bool {
        self.index.contains_key(id)
    }

    /// Declaration index, for tie-breaking.
    pub fn position(&self, id: &CapabilityId) -> Option<usize> {
        self.index.get(id).copied()
    }

    /// A new instance of the capability.
    pub fn instantiate(&self, id: &CapabilityId) -> Option<Box<dyn Capability>> {
        self.index.get(id).map(|&i| (self.entries[i].1)())
    }

    /// Metadata from a fresh instance.
    pub fn metadata(&self, id: &CapabilityId) -> Option<CapabilityMetadata> {
        self.instantiate(id).map(|c| c.metadata())
    }

    /// Ids in declaration order.
    pub fn ids(&self) -> impl Iterator<Item = &CapabilityId> {
        self.entries.iter().map(|(id, _)| id)
    }

    /// Metadata of every capability, in declaration order.
    pub fn all_metadata(&self) -> Vec<CapabilityMetadata> {
        self.entries.iter().map(|(_, f)| f().metadata()).collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl fmt::Debug for CapabilityRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CapabilityRegistry")
            .field("ids", &self.ids().collect::<Vec<_>>())
            .finish()
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    use super::*;
    use crate::domain::entities::{DependencySpec, FileSpec, GenerationContext, ScriptSpec};

    /// Capability with metadata only.
    pub struct Stub(pub CapabilityMetadata);

    impl Capability for Stub {
        fn metadata(&self) -> CapabilityMetadata {
            self.0.clone()
        }
        fn files(&self, _ctx: &GenerationContext) -> Vec<FileSpec> {
            Vec::new()
        }
        fn dependencies(&self, _ctx: &GenerationContext) -> Vec<DependencySpec> {
            Vec::new()
        }
        fn scripts(&self, _ctx: &GenerationContext) -> Vec<ScriptSpec> {
            Vec::new()
        }
    }

    /// `(id, priority, depends_on)` triples, registered in order.
    pub fn registry(specs: &[(&str, i32, &[&str])]) -> CapabilityRegistry {
        let mut reg = CapabilityRegistry::new();
        for (id, priority, deps) in specs {
            let mut b = CapabilityMetadata::builder(*id).priority(*priority);
            for d in *deps {
                b = b.depends_on(*d);
            }
            let meta = b.build().unwrap();
            reg.register(move || Box::new(Stub(meta.clone())) as Box<dyn Capability>)
                .unwrap();
        }
        reg
    }
}

#[cfg(test)]
mod tests {
    use super::test_support::*;
    use super::*;

    #[test]
    fn keeps_declaration_order() {
        let reg = registry(&[("zeta", 0, &[]), ("alpha", 0, &[])]);
        let ids: Vec<_> = reg.ids().map(|i| i.as_str()).collect();
        assert_eq!(ids, vec!["zeta", "alpha"]);
        assert_eq!(reg.position(&"alpha".into()), Some(1));
        assert_eq!(reg.len(), 2);
    }

    #[test]
    fn rejects_duplicates() {
        let mut reg = registry(&[("base", 0, &[])]);
        let meta = CapabilityMetadata::builder("base").build().unwrap();
        let err = reg
            .register(move || Box::new(Stub(meta.clone())) as Box<dyn Capability>)
            .unwrap_err();
        assert_eq!(err, DomainError::DuplicateCapability { id: "base".into() });
    }

    #[test]
    fn metadata_is_fresh_per_call() {
        let reg = registry(&[("base", 3, &[])]);
        let id = CapabilityId::from("base");
        assert_eq!(reg.metadata(&id).unwrap().priority(), 3);
        assert!(reg.instantiate(&"missing".into()).is_none());
    }
}
