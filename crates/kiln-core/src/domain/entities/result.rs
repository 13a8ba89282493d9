//! What a run produced: per-capability results and the aggregate report.

use std::collections::HashMap;

use serde::Serialize;

use super::{
    capability::CapabilityId,
    common::FileMode,
    specs::{DependencySpec, MergeStrategy, PackageTarget, ScriptSpec},
};

/// What happened to one file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "kebab-case")]
pub enum FileOutcome {
    Written,
    /// Dry run: everything but the physical write was performed.
    WouldWrite,
    Skipped { reason: String },
}

impl FileOutcome {
    pub fn skipped(reason: impl Into<String>) -> Self {
        Self::Skipped {
            reason: reason.into(),
        }
    }

    pub const fn is_skipped(&self) -> bool {
        matches!(self, Self::Skipped { .. })
    }
}

/// A rendered file and its outcome.
///
/// For files skipped before rendering, `path` is the unrendered path
/// template and `content` is empty.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FileRecord {
    pub path: String,
    pub content: String,
    pub mode: Option<FileMode>,
    pub outcome: FileOutcome,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GenerationResult {
    pub plugin_id: CapabilityId,
    pub success: bool,
    pub files: Vec<FileRecord>,
    pub dependencies: Vec<DependencySpec>,
    pub scripts: Vec<ScriptSpec>,
    pub error: Option<String>,
    /// Filled only when the run is verbose.
    pub diagnostics: Vec<String>,
}

impl GenerationResult {
    pub fn new(plugin_id: CapabilityId) -> Self {
        Self {
            plugin_id,
            success: true,
            files: Vec::new(),
            dependencies: Vec::new(),
            scripts: Vec::new(),
            error: None,
            diagnostics: Vec::new(),
        }
    }

    /// Mark this capability as the one that aborted the run.
    pub fn fail(&mut self, error: impl Into<String>) {
        self.success = false;
        self.error = Some(error.into());
    }

    pub fn written(&self) -> impl Iterator<Item = &FileRecord> {
        self.files.iter().filter(|f| !f.outcome.is_skipped())
    }

    pub fn skipped(&self) -> impl Iterator<Item = &FileRecord> {
        self.files.iter().filter(|f| f.outcome.is_skipped())
    }
}

/// A file folded from several contributions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MergedRecord {
    pub file: FileRecord,
    pub strategy: MergeStrategy,
    /// Contributing capabilities in application order.
    pub contributors: Vec<CapabilityId>,
}

/// Everything a run produced.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GenerationReport {
    pub order: Vec<CapabilityId>,
    pub auto_enabled: Vec<CapabilityId>,
    pub results: Vec<GenerationResult>,
    pub merged: Vec<MergedRecord>,
    pub dry_run: bool,
}

impl GenerationReport {
    /// Every file record, capability files first, then merged files.
    pub fn files(&self) -> impl Iterator<Item = &FileRecord> {
        self.results
            .iter()
            .flat_map(|r| r.files.iter())
            .chain(self.merged.iter().map(|m| &m.file))
    }

    pub fn written_count(&self) -> usize {
        self.files().filter(|f| !f.outcome.is_skipped()).count()
    }

    pub fn skipped_count(&self) -> usize {
        self.files().filter(|f| f.outcome.is_skipped()).count()
    }

    /// Dependencies for one package manifest, one entry per name.
    /// A later capability's entry replaces an earlier one in place.
    pub fn dependencies_for(&self, target: PackageTarget) -> Vec<DependencySpec> {
        dedupe_by_name(
            self.results
                .iter()
                .flat_map(|r| r.dependencies.iter())
                .filter(|d| d.target == target),
            |d| d.name.as_str(),
        )
    }

    /// Scripts for one package manifest, one entry per name.
    pub fn scripts_for(&self, target: PackageTarget) -> Vec<ScriptSpec> {
        dedupe_by_name(
            self.results
                .iter()
                .flat_map(|r| r.scripts.iter())
                .filter(|s| s.target == target),
            |s| s.name.as_str(),
        )
    }
}

fn dedupe_by_name<'a, T, I, F>(items: I, name: F) -> Vec<T>
where
    T: Clone + 'a,
    I: Iterator<Item = &'a T>,
    F: Fn(&T) -> &str,
{
    let mut out: Vec<T> = Vec::new();
    let mut index: HashMap<String, usize> = HashMap::new();
    for item in items {
        match index.get(name(item)) {
            Some(&i) => out[i] = item.clone(),
            None => {
                index.insert(name(item).to_string(), out.len());
                out.push(item.clone());
            }
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn result_with(id: &str, deps: Vec<DependencySpec>, scripts: Vec<ScriptSpec>) -> GenerationResult {
        let mut r = GenerationResult::new(CapabilityId::from(id));
        r.dependencies = deps;
        r.scripts = scripts;
        r
    }

    fn report(results: Vec<GenerationResult>) -> GenerationReport {
        GenerationReport {
            order: results.iter().map(|r| r.plugin_id.clone()).collect(),
            auto_enabled: Vec::new(),
            results,
            merged: Vec::new(),
            dry_run: false,
        }
    }

    #[test]
    fn dependencies_later_capability_wins_in_place() {
        let r = report(vec![
            result_with(
                "base",
                vec![
                    DependencySpec::new("base", "typescript", "^5.0.0"),
                    DependencySpec::new("base", "zod", "^3.0.0"),
                ],
                vec![],
            ),
            result_with(
                "type-checking",
                vec![DependencySpec::new("type-checking", "typescript", "^5.6.0").dev()],
                vec![],
            ),
        ]);

        let deps = r.dependencies_for(PackageTarget::Root);
        assert_eq!(deps.len(), 2);
        assert_eq!(deps[0].name, "typescript");
        assert_eq!(deps[0].version, "^5.6.0");
        assert_eq!(deps[0].plugin_id, "type-checking");
        assert_eq!(deps[1].name, "zod");
    }

    #[test]
    fn groups_by_target() {
        let r = report(vec![result_with(
            "web-app",
            vec![DependencySpec::new("web-app", "react", "^18").target(PackageTarget::App)],
            vec![
                ScriptSpec::new("web-app", "dev", "vite").target(PackageTarget::App),
                ScriptSpec::new("web-app", "build", "vite build"),
            ],
        )]);
        assert!(r.dependencies_for(PackageTarget::Root).is_empty());
        assert_eq!(r.dependencies_for(PackageTarget::App).len(), 1);
        assert_eq!(r.scripts_for(PackageTarget::Root)[0].name, "build");
        assert_eq!(r.scripts_for(PackageTarget::App)[0].name, "dev");
    }

    #[test]
    fn counts_written_and_skipped() {
        let mut res = GenerationResult::new(CapabilityId::from("base"));
        res.files.push(FileRecord {
            path: "a".into(),
            content: String::new(),
            mode: None,
            outcome: FileOutcome::Written,
        });
        res.files.push(FileRecord {
            path: "b".into(),
            content: String::new(),
            mode: None,
            outcome: FileOutcome::skipped("File already exists"),
        });
        let r = report(vec![res]);
        assert_eq!(r.written_count(), 1);
        assert_eq!(r.skipped_count(), 1);
    }
}
