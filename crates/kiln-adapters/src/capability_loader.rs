//! Declarative capabilities loaded from `capability.toml` manifests.
//!
//! # Directory layout expected
//!
//! ```text
//! capabilities/
//! ├── docs/
//! │   ├── capability.toml      ← manifest (required)
//! │   └── templates/
//! │       └── index.md.hbs     ← referenced by `template = ...`
//! └── ci/
//!     └── capability.toml
//! ```
//!
//! # `capability.toml` format
//!
//! ```toml
//! [capability]
//! id          = "docs"
//! version     = "1.0.0"          # optional, defaults to 0.1.0
//! priority    = 15               # optional
//! description = "Documentation site"
//! depends_on  = ["base"]
//!
//! [values]                       # extra template values
//! docs_title = "Handbook"
//!
//! [[files]]
//! path           = "docs/index.md"
//! template       = "templates/index.md.hbs"   # or inline `content`
//! condition      = "plugins.includes('web-app')"
//! mode           = 0o644          # integer or octal string
//! merge          = "append"       # promotes the file to a contribution
//! priority       = 5
//! skip_if_exists = true
//!
//! [[contributions]]
//! path    = "README.md"
//! content = "## Docs\n"
//! merge   = "append"
//!
//! [[dependencies]]
//! name    = "vitepress"
//! version = "^1.0.0"
//! kind    = "dev"                # prod | dev | peer
//!
//! [[scripts]]
//! name    = "docs"
//! command = "vitepress dev docs"
//! ```

use std::{
    fs,
    path::{Path, PathBuf},
};

use serde::Deserialize;
use serde_json::{Map, Value};
use tracing::{debug, info, instrument, warn};
use walkdir::WalkDir;

use kiln_core::{
    application::ApplicationError,
    domain::{
        Capability, CapabilityId, CapabilityMetadata, CapabilityRegistry, DependencyKind,
        DependencySpec, FileContribution, FileMode, FileSpec, GenerationContext, MergeStrategy,
        PackageTarget, ScriptSpec,
    },
    error::KilnResult,
};

pub const MANIFEST_FILE: &str = "capability.toml";

// ── Manifest types ───────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct Manifest {
    capability: CapabilitySection,
    #[serde(default)]
    values: Map<String, Value>,
    #[serde(default)]
    files: Vec<FileEntry>,
    #[serde(default)]
    contributions: Vec<ContributionEntry>,
    #[serde(default)]
    dependencies: Vec<DependencyEntry>,
    #[serde(default)]
    scripts: Vec<ScriptEntry>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct CapabilitySection {
    id: String,
    version: Option<String>,
    #[serde(default)]
    priority: i32,
    #[serde(default)]
    description: String,
    #[serde(default)]
    depends_on: Vec<String>,
}

/// Either inline `content` or a `template` path relative to the manifest.
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct FileEntry {
    path: String,
    content: Option<String>,
    template: Option<String>,
    condition: Option<String>,
    mode: Option<ModeEntry>,
    merge: Option<String>,
    priority: Option<i32>,
    #[serde(default)]
    skip_if_exists: bool,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum ModeEntry {
    Bits(u32),
    Octal(String),
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct ContributionEntry {
    path: String,
    content: Option<String>,
    template: Option<String>,
    merge: String,
    #[serde(default)]
    priority: i32,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct DependencyEntry {
    name: String,
    version: String,
    #[serde(default)]
    kind: DependencyKind,
    #[serde(default)]
    target: PackageTarget,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct ScriptEntry {
    name: String,
    command: String,
    #[serde(default)]
    target: PackageTarget,
    description: Option<String>,
}

// ── Capability ───────────────────────────────────────────────────────────────

/// A capability whose outputs were fully read from disk at load time.
#[derive(Debug, Clone)]
pub struct ManifestCapability {
    metadata: CapabilityMetadata,
    source: PathBuf,
    values: Map<String, Value>,
    files: Vec<FileSpec>,
    contributions: Vec<FileContribution>,
    dependencies: Vec<DependencySpec>,
    scripts: Vec<ScriptSpec>,
}

impl ManifestCapability {
    pub fn id(&self) -> &CapabilityId {
        self.metadata.id()
    }

    /// The manifest this capability was read from.
    pub fn source(&self) -> &Path {
        &self.source
    }
}

impl Capability for ManifestCapability {
    fn metadata(&self) -> CapabilityMetadata {
        self.metadata.clone()
    }

    fn files(&self, _ctx: &GenerationContext) -> Vec<FileSpec> {
        self.files.clone()
    }

    fn dependencies(&self, _ctx: &GenerationContext) -> Vec<DependencySpec> {
        self.dependencies.clone()
    }

    fn scripts(&self, _ctx: &GenerationContext) -> Vec<ScriptSpec> {
        self.scripts.clone()
    }

    fn contributions(&self, _ctx: &GenerationContext) -> Vec<FileContribution> {
        self.contributions.clone()
    }

    fn template_values(&self, _ctx: &GenerationContext) -> Map<String, Value> {
        self.values.clone()
    }
}

// ── Loader ───────────────────────────────────────────────────────────────────

/// Loads [`ManifestCapability`] values from a directory tree.
///
/// Every `capability.toml` beneath the directory is one capability.
/// Manifests that fail to parse are skipped with a `WARN` log; they do not
/// prevent the others from loading.
pub struct CapabilityLoader {
    dir: PathBuf,
}

impl CapabilityLoader {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Load every valid manifest, sorted by path.
    ///
    /// # Errors
    ///
    /// `DirectoryNotFound` if the directory does not exist, `FilesystemError`
    /// if it cannot be walked.
    #[instrument(skip(self), fields(dir = %self.dir.display()))]
    pub fn load_all(&self) -> KilnResult<Vec<ManifestCapability>> {
        if !self.dir.is_dir() {
            return Err(ApplicationError::DirectoryNotFound {
                path: self.dir.clone(),
            }
            .into());
        }

        let mut capabilities = Vec::new();
        for entry in WalkDir::new(&self.dir).sort_by_file_name() {
            let entry = entry.map_err(|e| ApplicationError::FilesystemError {
                path: self.dir.clone(),
                reason: format!("directory walk error: {e}"),
            })?;
            if !entry.file_type().is_file() || entry.file_name() != MANIFEST_FILE {
                continue;
            }

            match load_manifest(entry.path()) {
                Ok(capability) => {
                    debug!(id = %capability.id(), path = %entry.path().display(), "loaded manifest");
                    capabilities.push(capability);
                }
                Err(e) => {
                    warn!(path = %entry.path().display(), error = %e, "skipping invalid manifest");
                }
            }
        }

        debug!(count = capabilities.len(), "finished loading manifests");
        Ok(capabilities)
    }

    /// Load and register every valid manifest. Ids already present in the
    /// registry are skipped with a warning. Returns the number registered.
    ///
    /// # Errors
    ///
    /// As [`load_all`](Self::load_all).
    pub fn register_all(&self, registry: &mut CapabilityRegistry) -> KilnResult<usize> {
        let mut count = 0;
        for capability in self.load_all()? {
            if registry.contains(capability.id()) {
                warn!(
                    id = %capability.id(),
                    path = %capability.source().display(),
                    "skipping manifest, id already registered"
                );
                continue;
            }
            registry.register(move || Box::new(capability.clone()))?;
            count += 1;
        }
        info!(count, dir = %self.dir.display(), "registered manifest capabilities");
        Ok(count)
    }
}

/// Parse one manifest.
///
/// # Errors
///
/// `InvalidManifest` for unreadable TOML, bad values, or a missing template
/// file.
pub fn load_manifest(path: &Path) -> Result<ManifestCapability, ApplicationError> {
    let invalid = |reason: String| ApplicationError::InvalidManifest {
        path: path.to_path_buf(),
        reason,
    };

    let raw = fs::read_to_string(path).map_err(|e| invalid(format!("failed to read: {e}")))?;
    let manifest: Manifest = toml::from_str(&raw).map_err(|e| invalid(e.to_string()))?;
    let base_dir = path.parent().unwrap_or_else(|| Path::new("."));

    let section = manifest.capability;
    let mut builder = CapabilityMetadata::builder(section.id)
        .priority(section.priority)
        .description(section.description);
    if let Some(version) = section.version {
        builder = builder.version(version);
    }
    for dep in section.depends_on {
        builder = builder.depends_on(dep);
    }
    for file in manifest.files.iter().filter(|f| f.merge.is_some()) {
        builder = builder.contributes_to(file.path.clone());
    }
    for contribution in &manifest.contributions {
        builder = builder.contributes_to(contribution.path.clone());
    }
    let metadata = builder.build().map_err(|e| invalid(e.to_string()))?;
    let id = metadata.id().clone();

    let mut files = Vec::with_capacity(manifest.files.len());
    for entry in manifest.files {
        let content = read_body(base_dir, &entry.path, entry.content, entry.template.as_deref())
            .map_err(&invalid)?;
        let mut spec = FileSpec::new(entry.path, content);
        if let Some(template) = entry.template {
            spec = spec.template_id(template);
        }
        if let Some(condition) = entry.condition {
            spec = spec.when(condition);
        }
        if let Some(mode) = entry.mode {
            spec = spec.mode(parse_mode(&mode).map_err(&invalid)?);
        }
        if let Some(merge) = entry.merge {
            spec = spec.merge(merge.parse::<MergeStrategy>().map_err(|e| invalid(e.to_string()))?);
        }
        if let Some(priority) = entry.priority {
            spec = spec.priority(priority);
        }
        if entry.skip_if_exists {
            spec = spec.skip_if_exists();
        }
        files.push(spec);
    }

    let mut contributions = Vec::with_capacity(manifest.contributions.len());
    for entry in manifest.contributions {
        let content = read_body(base_dir, &entry.path, entry.content, entry.template.as_deref())
            .map_err(&invalid)?;
        let strategy = entry
            .merge
            .parse::<MergeStrategy>()
            .map_err(|e| invalid(e.to_string()))?;
        contributions.push(
            FileContribution::new(id.clone(), entry.path, content, strategy)
                .priority(entry.priority),
        );
    }

    let dependencies = manifest
        .dependencies
        .into_iter()
        .map(|d| {
            DependencySpec::new(id.clone(), d.name, d.version)
                .kind(d.kind)
                .target(d.target)
        })
        .collect();

    let scripts = manifest
        .scripts
        .into_iter()
        .map(|s| {
            let script = ScriptSpec::new(id.clone(), s.name, s.command).target(s.target);
            match s.description {
                Some(d) => script.description(d),
                None => script,
            }
        })
        .collect();

    Ok(ManifestCapability {
        metadata,
        source: path.to_path_buf(),
        values: manifest.values,
        files,
        contributions,
        dependencies,
        scripts,
    })
}

fn read_body(
    base_dir: &Path,
    path: &str,
    content: Option<String>,
    template: Option<&str>,
) -> Result<String, String> {
    match (content, template) {
        (Some(_), Some(_)) => Err(format!("'{path}' sets both content and template")),
        (Some(content), None) => Ok(content),
        (None, Some(template)) => {
            let file = base_dir.join(template);
            fs::read_to_string(&file)
                .map_err(|e| format!("failed to read template '{}': {e}", file.display()))
        }
        (None, None) => Err(format!("'{path}' needs content or template")),
    }
}

fn parse_mode(mode: &ModeEntry) -> Result<FileMode, String> {
    let bits = match mode {
        ModeEntry::Bits(bits) => *bits,
        ModeEntry::Octal(text) => {
            let digits = text.trim().trim_start_matches("0o");
            u32::from_str_radix(digits, 8).map_err(|_| format!("invalid file mode '{text}'"))?
        }
    };
    if bits > 0o7777 {
        return Err(format!("file mode {bits:o} out of range"));
    }
    Ok(FileMode::new(bits))
}
