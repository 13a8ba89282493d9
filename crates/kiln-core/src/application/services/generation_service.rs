//! Generation Service - main application orchestrator.
//!
//! A run has four phases:
//! 1. Resolve requested capabilities into an execution order
//! 2. Plan every capability in that order: evaluate conditions, render
//!    paths and content, check existing files, render contributions
//! 3. Merge contributions and reject path collisions
//! 4. Commit capability files in order, then merged files
//!
//! Nothing is written until every capability has been planned and merged.
//! A failure during commit aborts the run without rolling back.

use std::sync::Arc;

use tracing::{debug, info, instrument, warn};

use crate::{
    application::{
        ApplicationError,
        ports::{Filesystem, TemplateRenderer},
        writer::{OutputLocation, OutputWriter},
    },
    domain::{
        Capability, CapabilityId, CapabilityRegistry, CapabilityResolver, DomainError,
        DomainValidator, FileContribution, FileMode, FileOutcome, FileRecord, FileSpec,
        GenerationContext, GenerationReport, GenerationResult, MergedRecord, Resolution,
        TemplateContext, detect_collisions, merge_contributions,
    },
    error::{KilnError, KilnResult},
};

/// Main generation service.
pub struct GenerationService {
    registry: Arc<CapabilityRegistry>,
    renderer: Box<dyn TemplateRenderer>,
    filesystem: Box<dyn Filesystem>,
}

/// A capability's output, rendered but not yet written.
struct CapabilityPlan {
    id: CapabilityId,
    files: Vec<PlannedFile>,
    contributions: Vec<FileContribution>,
    result: GenerationResult,
}

struct PlannedFile {
    path: String,
    content: String,
    mode: Option<FileMode>,
    action: PlannedAction,
}

enum PlannedAction {
    Write(OutputLocation),
    Skip(String),
}

impl CapabilityPlan {
    fn new(id: CapabilityId) -> Self {
        Self {
            result: GenerationResult::new(id.clone()),
            id,
            files: Vec::new(),
            contributions: Vec::new(),
        }
    }

    fn skip(&mut self, path: String, mode: Option<FileMode>, reason: String) {
        self.files.push(PlannedFile {
            path,
            content: String::new(),
            mode,
            action: PlannedAction::Skip(reason),
        });
    }

    fn note(&mut self, verbose: bool, message: impl FnOnce() -> String) {
        if verbose {
            self.result.diagnostics.push(message());
        }
    }

    /// Rendered paths this capability will write itself.
    fn written_paths(&self) -> impl Iterator<Item = &str> {
        self.files.iter().filter_map(|f| match &f.action {
            PlannedAction::Write(_) => Some(f.path.as_str()),
            PlannedAction::Skip(_) => None,
        })
    }
}

impl GenerationService {
    /// Create a new generation service with the given adapters.
    ///
    /// # Example
    ///
    /// ```rust,ignore
    /// use kiln_core::application::GenerationService;
    ///
    /// let service = GenerationService::new(
    ///     registry,   // Arc<CapabilityRegistry>
    ///     renderer,   // Box<dyn TemplateRenderer>
    ///     filesystem, // Box<dyn Filesystem>
    /// );
    /// ```
    pub fn new(
        registry: Arc<CapabilityRegistry>,
        renderer: Box<dyn TemplateRenderer>,
        filesystem: Box<dyn Filesystem>,
    ) -> Self {
        Self {
            registry,
            renderer,
            filesystem,
        }
    }

    pub fn registry(&self) -> &CapabilityRegistry {
        &self.registry
    }

    pub fn renderer(&self) -> &dyn TemplateRenderer {
        self.renderer.as_ref()
    }

    /// Compute the execution order. Fails before any side effect.
    #[instrument(skip_all, fields(requested = requested.len()))]
    pub fn resolve(&self, requested: &[CapabilityId]) -> KilnResult<Resolution> {
        let resolution = CapabilityResolver::new(&self.registry).resolve(requested)?;
        let order: Vec<&str> = resolution.order.iter().map(CapabilityId::as_str).collect();
        info!(
            order = ?order,
            auto_enabled = resolution.auto_enabled.len(),
            "Capabilities resolved"
        );
        Ok(resolution)
    }

    /// Resolve `requested` and run it with `ctx`, setting the context's
    /// enabled capabilities to the resolved order.
    pub fn generate(
        &self,
        requested: &[CapabilityId],
        ctx: GenerationContext,
    ) -> KilnResult<GenerationReport> {
        let resolution = self.resolve(requested)?;
        let ctx = ctx.with_enabled(resolution.order.iter().cloned());
        self.run(&resolution, &ctx)
    }

    /// Plan, merge and commit every capability of `resolution`.
    ///
    /// # Errors
    ///
    /// - `CapabilityFailed` wrapping any render or filesystem error, with
    ///   the results already committed.
    /// - `PathCollision`, `MergeConflictAmbiguity` or
    ///   `InvalidStructuredContent` from the merge phase, before any write.
    #[instrument(
        skip_all,
        fields(
            output_path = %ctx.output_path().display(),
            dry_run = ctx.is_dry_run(),
            capabilities = resolution.order.len()
        )
    )]
    pub fn run(
        &self,
        resolution: &Resolution,
        ctx: &GenerationContext,
    ) -> KilnResult<GenerationReport> {
        let writer = OutputWriter::new(
            self.filesystem.as_ref(),
            ctx.output_path(),
            ctx.is_dry_run(),
        );

        // Plan
        let mut plans = Vec::with_capacity(resolution.order.len());
        for id in &resolution.order {
            let capability =
                self.registry
                    .instantiate(id)
                    .ok_or_else(|| DomainError::UnknownCapability {
                        id: id.to_string(),
                        required_by: None,
                    })?;
            let plan = self
                .plan_capability(capability.as_ref(), ctx, &writer)
                .map_err(|e| capability_failed(GenerationResult::new(id.clone()), e, &[]))?;
            debug!(
                capability = %id,
                files = plan.files.len(),
                contributions = plan.contributions.len(),
                "Capability planned"
            );
            plans.push(plan);
        }

        // Merge
        let contributions: Vec<FileContribution> = plans
            .iter()
            .flat_map(|p| p.contributions.iter().cloned())
            .collect();
        detect_collisions(
            plans
                .iter()
                .flat_map(|p| p.written_paths().map(move |path| (&p.id, path))),
            &contributions,
        )?;
        let merged = merge_contributions(&contributions, &resolution.order)?;

        // Commit
        let mut results: Vec<GenerationResult> = Vec::with_capacity(plans.len());
        for plan in plans {
            let CapabilityPlan {
                id,
                files,
                mut result,
                ..
            } = plan;
            if let Err(e) = self.commit(files, &writer, &mut result) {
                return Err(capability_failed(result, e, &results));
            }
            info!(
                capability = %id,
                written = result.written().count(),
                skipped = result.skipped().count(),
                "Capability committed"
            );
            results.push(result);
        }

        let mut merged_records = Vec::with_capacity(merged.len());
        for file in merged {
            let owner = file
                .contributors
                .last()
                .cloned()
                .unwrap_or_else(|| CapabilityId::from("merge"));
            let outcome = writer
                .locate(&file.path)
                .and_then(|location| writer.write(&location, &file.content, None))
                .map_err(|e| merged_file_failed(&owner, e, &results))?;
            debug!(path = %file.path, strategy = %file.strategy, "Merged file committed");
            merged_records.push(MergedRecord {
                file: FileRecord {
                    path: file.path,
                    content: file.content,
                    mode: None,
                    outcome,
                },
                strategy: file.strategy,
                contributors: file.contributors,
            });
        }

        let report = GenerationReport {
            order: resolution.order.clone(),
            auto_enabled: resolution.auto_enabled.clone(),
            results,
            merged: merged_records,
            dry_run: ctx.is_dry_run(),
        };
        info!(
            written = report.written_count(),
            skipped = report.skipped_count(),
            "Generation completed"
        );
        Ok(report)
    }

    // -------------------------------------------------------------------------
    // Internal Helpers
    // -------------------------------------------------------------------------

    fn plan_capability(
        &self,
        capability: &dyn Capability,
        ctx: &GenerationContext,
        writer: &OutputWriter<'_>,
    ) -> KilnResult<CapabilityPlan> {
        let metadata = capability.metadata();
        let id = metadata.id().clone();
        let verbose = ctx.is_verbose();
        let mut plan = CapabilityPlan::new(id.clone());

        let mut base = ctx.base_template_context();
        base.extend(capability.template_values(ctx));

        let specs = capability.files(ctx);
        DomainValidator::ensure_unique_paths(id.as_str(), specs.iter().map(|s| s.path.as_str()))?;

        for spec in &specs {
            self.plan_file(&id, spec, &base, ctx, writer, &mut plan)?;
        }

        for contribution in capability.contributions(ctx) {
            DomainValidator::ensure_attribution(
                id.as_str(),
                contribution.plugin_id.as_str(),
                "a contribution",
            )?;
            let template =
                OutputWriter::template_value(id.as_str(), &contribution.path, &contribution.path);
            let render_ctx = base.clone().with("_template", template);
            let path = self
                .renderer
                .render_path(&contribution.path, &render_ctx)
                .map_err(in_template(&contribution.path))?;
            let location = writer.locate(&path)?;
            let render_ctx = render_ctx.with("_output", writer.output_value(&location));
            let content = self
                .renderer
                .render(&contribution.content, &render_ctx)
                .map_err(in_template(&contribution.path))?;
            plan.note(verbose, || {
                format!(
                    "contributes {} ({}, priority {})",
                    location.relative, contribution.merge_strategy, contribution.priority
                )
            });
            plan.contributions.push(FileContribution {
                path: location.relative.to_slash_string(),
                content,
                ..contribution
            });
        }

        // Rendered paths may still coincide.
        DomainValidator::ensure_unique_paths(
            id.as_str(),
            plan.written_paths()
                .chain(plan.contributions.iter().map(|c| c.path.as_str())),
        )?;

        for dependency in capability.dependencies(ctx) {
            DomainValidator::ensure_attribution(
                id.as_str(),
                dependency.plugin_id.as_str(),
                "a dependency",
            )?;
            plan.result.dependencies.push(dependency);
        }
        for script in capability.scripts(ctx) {
            DomainValidator::ensure_attribution(id.as_str(), script.plugin_id.as_str(), "a script")?;
            plan.result.scripts.push(script);
        }

        Ok(plan)
    }

    fn plan_file(
        &self,
        id: &CapabilityId,
        spec: &FileSpec,
        base: &TemplateContext,
        ctx: &GenerationContext,
        writer: &OutputWriter<'_>,
        plan: &mut CapabilityPlan,
    ) -> KilnResult<()> {
        let verbose = ctx.is_verbose();

        if let Some(expr) = spec.condition.as_deref() {
            if !self.renderer.evaluate_condition(expr, base) {
                let reason = format!("Condition not met: {expr}");
                plan.note(verbose, || format!("skipped {}: {}", spec.path, reason));
                plan.skip(spec.path.clone(), spec.mode, reason);
                return Ok(());
            }
        }

        let template = OutputWriter::template_value(id.as_str(), spec.template_name(), &spec.path);
        let render_ctx = base.clone().with("_template", template);
        let path = self
            .renderer
            .render_path(&spec.path, &render_ctx)
            .map_err(in_template(&spec.path))?;
        let location = writer.locate(&path)?;
        let rendered_path = location.relative.to_slash_string();

        if spec.skip_if_exists && writer.exists(&location) {
            if ctx.overwrites() {
                warn!(path = %rendered_path, "Overwriting existing file");
            } else {
                let reason = "File already exists".to_string();
                plan.note(verbose, || format!("skipped {rendered_path}: {reason}"));
                plan.skip(rendered_path, spec.mode, reason);
                return Ok(());
            }
        }

        let render_ctx = render_ctx.with("_output", writer.output_value(&location));
        let content = self
            .renderer
            .render(&spec.content, &render_ctx)
            .map_err(in_template(spec.template_name()))?;

        if let Some(contribution) = spec.to_contribution(id) {
            plan.note(verbose, || {
                format!(
                    "contributes {} ({}, priority {})",
                    rendered_path, contribution.merge_strategy, contribution.priority
                )
            });
            plan.contributions.push(FileContribution {
                path: rendered_path,
                content,
                ..contribution
            });
            return Ok(());
        }

        plan.note(verbose, || {
            format!(
                "rendered {} from '{}' ({} bytes)",
                rendered_path,
                spec.template_name(),
                content.len()
            )
        });
        plan.files.push(PlannedFile {
            path: rendered_path,
            content,
            mode: spec.mode,
            action: PlannedAction::Write(location),
        });
        Ok(())
    }

    /// Records each file in `result` as it is committed, so a failure leaves
    /// the files written so far in it.
    fn commit(
        &self,
        files: Vec<PlannedFile>,
        writer: &OutputWriter<'_>,
        result: &mut GenerationResult,
    ) -> KilnResult<()> {
        for file in files {
            let outcome = match &file.action {
                PlannedAction::Skip(reason) => FileOutcome::skipped(reason.clone()),
                PlannedAction::Write(location) => writer.write(location, &file.content, file.mode)?,
            };
            result.files.push(FileRecord {
                path: file.path,
                content: file.content,
                mode: file.mode,
                outcome,
            });
        }
        Ok(())
    }
}

/// Render errors name the template or path they came from.
fn in_template(name: &str) -> impl FnOnce(KilnError) -> KilnError + '_ {
    move |error| match error {
        KilnError::Application(ApplicationError::RenderingFailed { reason, .. }) => {
            ApplicationError::RenderingFailed {
                template: name.to_string(),
                reason,
            }
            .into()
        }
        other => other,
    }
}

/// `committed` followed by `failed`, marked unsuccessful.
fn capability_failed(
    mut failed: GenerationResult,
    error: KilnError,
    committed: &[GenerationResult],
) -> KilnError {
    failed.fail(error.to_string());
    let plugin_id = failed.plugin_id.to_string();
    let mut completed = committed.to_vec();
    completed.push(failed);
    ApplicationError::CapabilityFailed {
        plugin_id,
        source: Box::new(error),
        completed,
    }
    .into()
}

/// A merged file failed to commit: its last contributor is the one blamed.
fn merged_file_failed(
    owner: &CapabilityId,
    error: KilnError,
    results: &[GenerationResult],
) -> KilnError {
    let mut committed = results.to_vec();
    let failed = match committed.iter().position(|r| &r.plugin_id == owner) {
        Some(index) => committed.remove(index),
        None => GenerationResult::new(owner.clone()),
    };
    capability_failed(failed, error, &committed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::ports::CompiledTemplate;
    use crate::domain::{CapabilityMetadata, DependencySpec, MergeStrategy, ScriptSpec};
    use serde_json::{Map, Value, json};
    use std::collections::BTreeMap;
    use std::path::{Path, PathBuf};
    use std::sync::Mutex;

    // ── Fakes ────────────────────────────────────────────────────────────────

    /// Replaces `{{dotted.path}}` with the looked-up value; an unclosed
    /// `{{` is a syntax error.
    struct FakeRenderer;

    impl TemplateRenderer for FakeRenderer {
        fn render(&self, template: &str, ctx: &TemplateContext) -> KilnResult<String> {
            let mut out = String::new();
            let mut rest = template;
            while let Some(start) = rest.find("{{") {
                out.push_str(&rest[..start]);
                let after = &rest[start + 2..];
                let end = after.find("}}").ok_or_else(|| ApplicationError::RenderingFailed {
                    template: template.to_string(),
                    reason: "unclosed expression".into(),
                })?;
                match ctx.lookup(after[..end].trim()) {
                    Some(Value::String(s)) => out.push_str(s),
                    Some(Value::Null) | None => {}
                    Some(other) => out.push_str(&other.to_string()),
                }
                rest = &after[end + 2..];
            }
            out.push_str(rest);
            Ok(out)
        }

        fn render_path(&self, path: &str, ctx: &TemplateContext) -> KilnResult<String> {
            self.render(path, ctx)
        }

        fn compile(&self, template: &str) -> KilnResult<CompiledTemplate> {
            let template = template.to_string();
            Ok(Box::new(move |ctx: &TemplateContext| {
                FakeRenderer.render(&template, ctx)
            }))
        }

        fn register_partial(&self, _name: &str, _source: &str) -> KilnResult<()> {
            Ok(())
        }

        fn register_partials_from_dir(&self, _dir: &Path) -> KilnResult<usize> {
            Ok(0)
        }
    }

    #[derive(Default, Clone)]
    struct FakeFs {
        files: Arc<Mutex<BTreeMap<PathBuf, (String, Option<u32>)>>>,
        existing: Arc<Mutex<Vec<PathBuf>>>,
        fail_on: Option<PathBuf>,
    }

    impl FakeFs {
        fn content(&self, path: &str) -> Option<String> {
            self.files
                .lock()
                .unwrap()
                .get(&PathBuf::from(path))
                .map(|(c, _)| c.clone())
        }
        fn mode(&self, path: &str) -> Option<u32> {
            self.files
                .lock()
                .unwrap()
                .get(&PathBuf::from(path))
                .and_then(|(_, m)| *m)
        }
        fn count(&self) -> usize {
            self.files.lock().unwrap().len()
        }
    }

    impl Filesystem for FakeFs {
        fn create_dir_all(&self, _path: &Path) -> KilnResult<()> {
            Ok(())
        }
        fn write_file(&self, path: &Path, content: &str) -> KilnResult<()> {
            if self.fail_on.as_deref() == Some(path) {
                return Err(ApplicationError::FilesystemError {
                    path: path.to_path_buf(),
                    reason: "disk full".into(),
                }
                .into());
            }
            self.files
                .lock()
                .unwrap()
                .insert(path.to_path_buf(), (content.to_string(), None));
            Ok(())
        }
        fn set_mode(&self, path: &Path, mode: u32) -> KilnResult<()> {
            if let Some(entry) = self.files.lock().unwrap().get_mut(path) {
                entry.1 = Some(mode);
            }
            Ok(())
        }
        fn exists(&self, path: &Path) -> bool {
            self.existing.lock().unwrap().iter().any(|p| p == path)
                || self.files.lock().unwrap().contains_key(path)
        }
    }

    /// Capability assembled from closures over plain data.
    #[derive(Clone)]
    struct Scripted {
        meta: CapabilityMetadata,
        files: Vec<FileSpec>,
        contributions: Vec<FileContribution>,
        dependencies: Vec<DependencySpec>,
        scripts: Vec<ScriptSpec>,
        values: Map<String, Value>,
    }

    impl Scripted {
        fn new(id: &str) -> Self {
            Self {
                meta: CapabilityMetadata::builder(id).build().unwrap(),
                files: vec![],
                contributions: vec![],
                dependencies: vec![],
                scripts: vec![],
                values: Map::new(),
            }
        }
        fn meta(mut self, meta: CapabilityMetadata) -> Self {
            self.meta = meta;
            self
        }
        fn file(mut self, spec: FileSpec) -> Self {
            self.files.push(spec);
            self
        }
        fn contribution(mut self, c: FileContribution) -> Self {
            self.contributions.push(c);
            self
        }
    }

    impl Capability for Scripted {
        fn metadata(&self) -> CapabilityMetadata {
            self.meta.clone()
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

    fn service(caps: Vec<Scripted>, fs: FakeFs) -> GenerationService {
        let mut registry = CapabilityRegistry::new();
        for cap in caps {
            registry
                .register(move || Box::new(cap.clone()) as Box<dyn Capability>)
                .unwrap();
        }
        GenerationService::new(Arc::new(registry), Box::new(FakeRenderer), Box::new(fs))
    }

    fn ctx() -> GenerationContext {
        let config = match json!({ "name": "demo" }) {
            Value::Object(m) => m,
            _ => unreachable!(),
        };
        GenerationContext::new("/out").with_project_config(config)
    }

    fn ids(names: &[&str]) -> Vec<CapabilityId> {
        names.iter().map(|n| CapabilityId::from(*n)).collect()
    }

    // ── Tests ────────────────────────────────────────────────────────────────

    #[test]
    fn renders_paths_content_and_reserved_keys() {
        let fs = FakeFs::default();
        let svc = service(
            vec![Scripted::new("base").file(
                FileSpec::new(
                    "src/{{name}}.txt",
                    "{{name}} {{_template.pluginId}} {{_output.fileName}} {{_output.dir}}",
                )
                .mode(FileMode::EXECUTABLE),
            )],
            fs.clone(),
        );

        let report = svc.generate(&ids(&["base"]), ctx()).unwrap();
        assert_eq!(fs.content("/out/src/demo.txt").unwrap(), "demo base demo.txt src");
        assert_eq!(fs.mode("/out/src/demo.txt"), Some(0o755));
        assert_eq!(report.results[0].files[0].path, "src/demo.txt");
        assert_eq!(report.results[0].files[0].outcome, FileOutcome::Written);
    }

    #[test]
    fn condition_false_skips_without_rendering() {
        let fs = FakeFs::default();
        let svc = service(
            vec![
                Scripted::new("base")
                    .file(FileSpec::new("t.txt", "{{broken").when("plugins.includes('testing')"))
                    .file(FileSpec::new("l.txt", "lint").when("plugins.includes('linting')")),
                Scripted::new("linting"),
            ],
            fs.clone(),
        );

        let report = svc.generate(&ids(&["base", "linting"]), ctx()).unwrap();
        let files = &report.results[0].files;
        assert_eq!(
            files[0].outcome,
            FileOutcome::skipped("Condition not met: plugins.includes('testing')")
        );
        assert_eq!(files[1].outcome, FileOutcome::Written);
        assert_eq!(fs.count(), 1);
    }

    #[test]
    fn skip_if_exists_honours_overwrite() {
        let fs = FakeFs::default();
        fs.existing.lock().unwrap().push(PathBuf::from("/out/.env"));
        let caps = vec![Scripted::new("base").file(FileSpec::new(".env", "A=1").skip_if_exists())];

        let report = service(caps.clone(), fs.clone())
            .generate(&ids(&["base"]), ctx())
            .unwrap();
        assert_eq!(
            report.results[0].files[0].outcome,
            FileOutcome::skipped("File already exists")
        );
        assert_eq!(fs.content("/out/.env"), None);

        service(caps, fs.clone())
            .generate(&ids(&["base"]), ctx().overwrite(true))
            .unwrap();
        assert_eq!(fs.content("/out/.env").unwrap(), "A=1");
    }

    #[test]
    fn dry_run_writes_nothing_and_reports_same_content() {
        let caps = vec![
            Scripted::new("base").file(FileSpec::new("a.txt", "{{name}}")).contribution(
                FileContribution::new("base", "README.md", "# {{name}}", MergeStrategy::Append),
            ),
        ];

        let dry_fs = FakeFs::default();
        let dry = service(caps.clone(), dry_fs.clone())
            .generate(&ids(&["base"]), ctx().dry_run(true))
            .unwrap();
        assert_eq!(dry_fs.count(), 0);
        assert!(dry.files().all(|f| f.outcome == FileOutcome::WouldWrite));

        let real_fs = FakeFs::default();
        let real = service(caps, real_fs.clone())
            .generate(&ids(&["base"]), ctx())
            .unwrap();
        let contents = |r: &GenerationReport| {
            r.files()
                .map(|f| (f.path.clone(), f.content.clone()))
                .collect::<Vec<_>>()
        };
        assert_eq!(contents(&dry), contents(&real));
        assert_eq!(real_fs.count(), 2);
    }

    #[test]
    fn contributions_merge_across_capabilities() {
        let fs = FakeFs::default();
        let svc = service(
            vec![
                Scripted::new("base").file(
                    FileSpec::new("package.json", r#"{"name":"{{name}}"}"#)
                        .merge(MergeStrategy::MergeStructured),
                ),
                Scripted::new("linting").contribution(FileContribution::new(
                    "linting",
                    "package.json",
                    r#"{"scripts":{"lint":"eslint ."}}"#,
                    MergeStrategy::MergeStructured,
                )),
            ],
            fs.clone(),
        );

        let report = svc.generate(&ids(&["linting", "base"]), ctx()).unwrap();
        let doc: Value = serde_json::from_str(&fs.content("/out/package.json").unwrap()).unwrap();
        assert_eq!(doc, json!({ "name": "demo", "scripts": { "lint": "eslint ." } }));
        assert_eq!(report.merged.len(), 1);
        assert_eq!(report.merged[0].contributors, ids(&["base", "linting"]));
    }

    #[test]
    fn plain_files_on_same_path_collide_before_any_write() {
        let fs = FakeFs::default();
        let svc = service(
            vec![
                Scripted::new("a").file(FileSpec::new("x.txt", "a")),
                Scripted::new("b").file(FileSpec::new("x.txt", "b")),
            ],
            fs.clone(),
        );
        let err = svc.generate(&ids(&["a", "b"]), ctx()).unwrap_err();
        assert!(matches!(
            err,
            KilnError::Domain(DomainError::PathCollision { .. })
        ));
        assert_eq!(fs.count(), 0);
    }

    #[test]
    fn duplicate_path_within_capability() {
        let svc = service(
            vec![
                Scripted::new("a")
                    .file(FileSpec::new("x.txt", "1"))
                    .file(FileSpec::new("x.txt", "2")),
            ],
            FakeFs::default(),
        );
        let err = svc.generate(&ids(&["a"]), ctx()).unwrap_err();
        assert!(matches!(
            err.root_cause(),
            KilnError::Domain(DomainError::DuplicatePath { .. })
        ));
    }

    #[test]
    fn render_error_is_capability_scoped_and_nothing_is_written() {
        let fs = FakeFs::default();
        let svc = service(
            vec![
                Scripted::new("good").file(FileSpec::new("ok.txt", "fine")),
                Scripted::new("bad").file(FileSpec::new("bad.txt", "{{oops")),
            ],
            fs.clone(),
        );
        let err = svc.generate(&ids(&["good", "bad"]), ctx()).unwrap_err();
        match err {
            KilnError::Application(ApplicationError::CapabilityFailed {
                plugin_id,
                source,
                completed,
            }) => {
                assert_eq!(plugin_id, "bad");
                assert!(matches!(
                    *source,
                    KilnError::Application(ApplicationError::RenderingFailed { .. })
                ));
                // Planning failed: nothing committed, only the failing result.
                assert_eq!(completed.len(), 1);
                assert_eq!(completed[0].plugin_id, "bad");
                assert!(!completed[0].success);
                assert!(completed[0].error.as_deref().unwrap().contains("unclosed"));
                assert_eq!(completed[0].written().count(), 0);
            }
            other => panic!("unexpected {other:?}"),
        }
        assert_eq!(fs.count(), 0);
    }

    #[test]
    fn render_error_names_the_template() {
        let svc = service(
            vec![Scripted::new("bad").file(
                FileSpec::new("broken.txt", "{{#if name").template_id("tpl/broken"),
            )],
            FakeFs::default(),
        );
        let err = svc.generate(&ids(&["bad"]), ctx()).unwrap_err();
        match err.root_cause() {
            KilnError::Application(ApplicationError::RenderingFailed { template, .. }) => {
                assert_eq!(template, "tpl/broken");
            }
            other => panic!("unexpected {other:?}"),
        }
        assert!(err.to_string().contains("tpl/broken"));
    }

    #[test]
    fn render_error_in_path_and_contribution_names_the_path() {
        let svc = service(
            vec![Scripted::new("bad").file(FileSpec::new("src/{{name.txt", "x"))],
            FakeFs::default(),
        );
        match svc.generate(&ids(&["bad"]), ctx()).unwrap_err().root_cause() {
            KilnError::Application(ApplicationError::RenderingFailed { template, .. }) => {
                assert_eq!(template, "src/{{name.txt");
            }
            other => panic!("unexpected {other:?}"),
        }

        let svc = service(
            vec![Scripted::new("bad").contribution(FileContribution::new(
                "bad",
                "README.md",
                "## {{oops",
                MergeStrategy::Append,
            ))],
            FakeFs::default(),
        );
        match svc.generate(&ids(&["bad"]), ctx()).unwrap_err().root_cause() {
            KilnError::Application(ApplicationError::RenderingFailed { template, .. }) => {
                assert_eq!(template, "README.md");
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn write_failure_carries_completed_results() {
        let fs = FakeFs {
            fail_on: Some(PathBuf::from("/out/second.txt")),
            ..FakeFs::default()
        };
        let svc = service(
            vec![
                Scripted::new("first").file(FileSpec::new("first.txt", "1")),
                Scripted::new("second").file(FileSpec::new("second.txt", "2")),
                Scripted::new("third").file(FileSpec::new("third.txt", "3")),
            ],
            fs.clone(),
        );
        let err = svc
            .generate(&ids(&["first", "second", "third"]), ctx())
            .unwrap_err();
        match err {
            KilnError::Application(ApplicationError::CapabilityFailed {
                plugin_id,
                completed,
                ..
            }) => {
                assert_eq!(plugin_id, "second");
                assert_eq!(completed.len(), 2);
                assert_eq!(completed[0].plugin_id, "first");
                assert!(completed[0].success);
                assert_eq!(completed[1].plugin_id, "second");
                assert!(!completed[1].success);
                assert!(completed[1].error.as_deref().unwrap().contains("disk full"));
            }
            other => panic!("unexpected {other:?}"),
        }
        // No rollback, nothing after the failure.
        assert_eq!(fs.content("/out/first.txt").unwrap(), "1");
        assert_eq!(fs.content("/out/third.txt"), None);
    }

    #[test]
    fn failing_capability_keeps_files_written_before_the_error() {
        let fs = FakeFs {
            fail_on: Some(PathBuf::from("/out/b.txt")),
            ..FakeFs::default()
        };
        let svc = service(
            vec![Scripted::new("only")
                .file(FileSpec::new("a.txt", "1"))
                .file(FileSpec::new("b.txt", "2"))],
            fs.clone(),
        );
        match svc.generate(&ids(&["only"]), ctx()).unwrap_err() {
            KilnError::Application(ApplicationError::CapabilityFailed { completed, .. }) => {
                assert_eq!(completed.len(), 1);
                let failed = &completed[0];
                assert!(!failed.success);
                let written: Vec<_> = failed.written().map(|f| f.path.as_str()).collect();
                assert_eq!(written, ["a.txt"]);
            }
            other => panic!("unexpected {other:?}"),
        }
        assert_eq!(fs.content("/out/a.txt").unwrap(), "1");
    }

    #[test]
    fn escaping_path_is_rejected() {
        let svc = service(
            vec![Scripted::new("a").file(FileSpec::new("../evil.txt", "x"))],
            FakeFs::default(),
        );
        let err = svc.generate(&ids(&["a"]), ctx()).unwrap_err();
        assert!(matches!(
            err.root_cause(),
            KilnError::Domain(DomainError::PathEscapesOutput { .. })
        ));
    }

    #[test]
    fn misattributed_dependency_is_rejected() {
        let mut cap = Scripted::new("a");
        cap.dependencies
            .push(DependencySpec::new("someone-else", "left-pad", "1.0.0"));
        let err = service(vec![cap], FakeFs::default())
            .generate(&ids(&["a"]), ctx())
            .unwrap_err();
        assert!(matches!(
            err.root_cause(),
            KilnError::Domain(DomainError::InvalidCapability(_))
        ));
    }

    #[test]
    fn template_values_layer_over_config_and_verbose_collects_diagnostics() {
        let mut cap = Scripted::new("a").file(FileSpec::new("v.txt", "{{name}}-{{flavor}}"));
        cap.values.insert("flavor".into(), json!("vanilla"));
        cap.values.insert("name".into(), json!("override"));
        let fs = FakeFs::default();
        let report = service(vec![cap], fs.clone())
            .generate(&ids(&["a"]), ctx().verbose(true))
            .unwrap();
        assert_eq!(fs.content("/out/v.txt").unwrap(), "override-vanilla");
        assert!(!report.results[0].diagnostics.is_empty());
    }

    #[test]
    fn resolution_order_drives_execution() {
        let fs = FakeFs::default();
        let svc = service(
            vec![
                Scripted::new("type-checking")
                    .meta(CapabilityMetadata::builder("type-checking").priority(10).build().unwrap()),
                Scripted::new("web-app").meta(
                    CapabilityMetadata::builder("web-app")
                        .priority(20)
                        .depends_on("type-checking")
                        .build()
                        .unwrap(),
                ),
            ],
            fs,
        );
        let report = svc.generate(&ids(&["web-app"]), ctx()).unwrap();
        assert_eq!(report.order, ids(&["type-checking", "web-app"]));
        assert_eq!(report.auto_enabled, ids(&["type-checking"]));
        assert_eq!(report.results.len(), 2);
    }
}
