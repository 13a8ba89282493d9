//! Per-run generation context and the JSON render context.

use std::path::{Path, PathBuf};

use serde::Serialize;
use serde_json::{Map, Value};

use super::capability::CapabilityId;

// ── GenerationContext ────────────────────────────────────────────────────────

/// Everything a capability may read during a run.
///
/// Built once by the driver and shared read-only with every capability.
#[derive(Debug, Clone, PartialEq)]
pub struct GenerationContext {
    project_config: Map<String, Value>,
    output_path: PathBuf,
    enabled_capabilities: Vec<CapabilityId>,
    dry_run: bool,
    skip_prompts: bool,
    verbose: bool,
    overwrite: bool,
}

impl GenerationContext {
    pub fn new(output_path: impl Into<PathBuf>) -> Self {
        Self {
            project_config: Map::new(),
            output_path: output_path.into(),
            enabled_capabilities: Vec::new(),
            dry_run: false,
            skip_prompts: false,
            verbose: false,
            overwrite: false,
        }
    }

    pub fn with_project_config(mut self, config: Map<String, Value>) -> Self {
        self.project_config = config;
        self
    }

    pub fn with_enabled(mut self, ids: impl IntoIterator<Item = CapabilityId>) -> Self {
        self.enabled_capabilities = ids.into_iter().collect();
        self
    }

    pub fn dry_run(mut self, yes: bool) -> Self {
        self.dry_run = yes;
        self
    }

    pub fn skip_prompts(mut self, yes: bool) -> Self {
        self.skip_prompts = yes;
        self
    }

    pub fn verbose(mut self, yes: bool) -> Self {
        self.verbose = yes;
        self
    }

    pub fn overwrite(mut self, yes: bool) -> Self {
        self.overwrite = yes;
        self
    }

    pub fn project_config(&self) -> &Map<String, Value> {
        &self.project_config
    }

    /// `name` from the project configuration, if it is a string.
    pub fn project_name(&self) -> Option<&str> {
        self.project_config.get("name").and_then(Value::as_str)
    }

    pub fn output_path(&self) -> &Path {
        &self.output_path
    }

    pub fn enabled_capabilities(&self) -> &[CapabilityId] {
        &self.enabled_capabilities
    }

    pub fn is_enabled(&self, id: &str) -> bool {
        self.enabled_capabilities.iter().any(|c| c == id)
    }

    pub const fn is_dry_run(&self) -> bool {
        self.dry_run
    }

    pub const fn skips_prompts(&self) -> bool {
        self.skip_prompts
    }

    pub const fn is_verbose(&self) -> bool {
        self.verbose
    }

    pub const fn overwrites(&self) -> bool {
        self.overwrite
    }

    /// The render context every template of a run starts from: the project
    /// configuration plus `plugins`, the enabled capability ids, unless the
    /// configuration already defines it.
    pub fn base_template_context(&self) -> TemplateContext {
        let mut ctx = TemplateContext::from_map(self.project_config.clone());
        if !ctx.contains_key("plugins") {
            ctx.insert(
                "plugins",
                Value::Array(
                    self.enabled_capabilities
                        .iter()
                        .map(|id| Value::String(id.to_string()))
                        .collect(),
                ),
            );
        }
        ctx
    }
}

// ── TemplateContext ──────────────────────────────────────────────────────────

/// Nested JSON object that templates and conditions are evaluated against.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct TemplateContext(Map<String, Value>);

impl TemplateContext {
    pub fn new() -> Self {
        Self(Map::new())
    }

    pub fn from_map(map: Map<String, Value>) -> Self {
        Self(map)
    }

    /// Builder-style insert.
    pub fn with(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.insert(key, value);
        self
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<Value>) {
        self.0.insert(key.into(), value.into());
    }

    /// Later keys overwrite earlier ones.
    pub fn extend(&mut self, values: Map<String, Value>) {
        self.0.extend(values);
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.0.contains_key(key)
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    /// Resolve a dotted path such as `project.authors.0.name`.
    ///
    /// Numeric segments index into arrays. Returns `None` for any segment
    /// that does not resolve.
    pub fn lookup(&self, path: &str) -> Option<&Value> {
        let mut segments = path.split('.');
        let first = segments.next()?;
        let mut current = self.0.get(first)?;
        for segment in segments {
            current = match current {
                Value::Object(map) => map.get(segment)?,
                Value::Array(items) => items.get(segment.parse::<usize>().ok()?)?,
                _ => return None,
            };
        }
        Some(current)
    }

    pub fn as_map(&self) -> &Map<String, Value> {
        &self.0
    }

    pub fn into_value(self) -> Value {
        Value::Object(self.0)
    }
}

impl From<Map<String, Value>> for TemplateContext {
    fn from(map: Map<String, Value>) -> Self {
        Self(map)
    }
}
