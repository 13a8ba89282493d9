//! Handlebars-backed template renderer.
//!
//! Strict mode is off so a missing property renders as an empty string, and
//! HTML escaping is disabled because the output is source code, not markup.
//!
//! Extra helpers:
//!
//! | Helper        | Example                                   |
//! |---------------|-------------------------------------------|
//! | `includes`    | `{{#if (includes plugins "testing")}}`    |
//! | `snake_case`  | `{{snake_case name}}` → `my_app`          |
//! | `kebab_case`  | `{{kebab_case name}}` → `my-app`          |
//! | `pascal_case` | `{{pascal_case name}}` → `MyApp`          |
//!
//! A `{{> partial}}` alone on its line is a standalone tag: the line's own
//! newline is consumed, so partials should end with a newline of their own.

use std::path::Path;
use std::sync::{Arc, RwLock};

use handlebars::{
    Context, Handlebars, RenderContext, Renderable, StringOutput, Template, handlebars_helper,
};
use serde_json::Value;
use tracing::{debug, instrument};
use walkdir::WalkDir;

use kiln_core::{
    application::{
        ApplicationError,
        ports::{CompiledTemplate, TemplateRenderer},
    },
    domain::{TemplateContext, casing},
    error::{KilnError, KilnResult},
};

handlebars_helper!(includes: |haystack: Json, needle: Json| match haystack {
    Value::Array(items) => items.contains(needle),
    Value::String(s) => needle.as_str().is_some_and(|n| s.contains(n)),
    _ => false,
});
// Missing input renders as an empty string, like a missing property.
handlebars_helper!(snake_case: |s: Json| casing::snake_case(s.as_str().unwrap_or_default()));
handlebars_helper!(kebab_case: |s: Json| casing::kebab_case(s.as_str().unwrap_or_default()));
handlebars_helper!(pascal_case: |s: Json| casing::pascal_case(s.as_str().unwrap_or_default()));

/// Renderer using the Handlebars template language.
///
/// Registered partials are shared by every render, including templates
/// returned from [`compile`](TemplateRenderer::compile).
pub struct HandlebarsRenderer {
    registry: Arc<RwLock<Handlebars<'static>>>,
}

impl HandlebarsRenderer {
    /// Create a new renderer with the helpers registered.
    pub fn new() -> Self {
        let mut handlebars = Handlebars::new();
        handlebars.set_strict_mode(false);
        handlebars.register_escape_fn(handlebars::no_escape);
        Self::register_helpers(&mut handlebars);

        Self {
            registry: Arc::new(RwLock::new(handlebars)),
        }
    }

    fn register_helpers(hb: &mut Handlebars<'static>) {
        hb.register_helper("includes", Box::new(includes));
        hb.register_helper("snake_case", Box::new(snake_case));
        hb.register_helper("kebab_case", Box::new(kebab_case));
        hb.register_helper("pascal_case", Box::new(pascal_case));
    }

    /// Whether a partial is registered under `name`.
    pub fn has_partial(&self, name: &str) -> bool {
        self.registry
            .read()
            .map(|hb| hb.get_templates().contains_key(name))
            .unwrap_or(false)
    }
}

impl Default for HandlebarsRenderer {
    fn default() -> Self {
        Self::new()
    }
}

fn rendering_failed(template: &str, reason: impl ToString) -> KilnError {
    ApplicationError::RenderingFailed {
        template: abbreviate(template),
        reason: reason.to_string(),
    }
    .into()
}

/// First line of a template, shortened for error messages.
fn abbreviate(template: &str) -> String {
    let first = template.lines().next().unwrap_or_default();
    if first.chars().count() > 60 {
        format!("{}…", first.chars().take(60).collect::<String>())
    } else {
        first.to_string()
    }
}

impl TemplateRenderer for HandlebarsRenderer {
    fn render(&self, template: &str, ctx: &TemplateContext) -> KilnResult<String> {
        let hb = self
            .registry
            .read()
            .map_err(|_| ApplicationError::RendererLockError)?;
        hb.render_template(template, ctx)
            .map_err(|e| rendering_failed(template, e))
    }

    fn render_path(&self, path: &str, ctx: &TemplateContext) -> KilnResult<String> {
        self.render(path, ctx)
    }

    fn compile(&self, template: &str) -> KilnResult<CompiledTemplate> {
        // Parsed once and kept by the closure; the registry only holds partials.
        let compiled = Template::compile(template).map_err(|e| rendering_failed(template, e))?;
        let registry = Arc::clone(&self.registry);
        let source = template.to_string();
        Ok(Box::new(move |ctx: &TemplateContext| {
            let hb = registry
                .read()
                .map_err(|_| KilnError::from(ApplicationError::RendererLockError))?;
            let data = Context::wraps(ctx).map_err(|e| rendering_failed(&source, e))?;
            let mut rc = RenderContext::new(None);
            let mut out = StringOutput::new();
            compiled
                .render(&*hb, &data, &mut rc, &mut out)
                .map_err(|e| rendering_failed(&source, e))?;
            out.into_string().map_err(|e| rendering_failed(&source, e))
        }))
    }

    fn register_partial(&self, name: &str, source: &str) -> KilnResult<()> {
        self.registry
            .write()
            .map_err(|_| ApplicationError::RendererLockError)?
            .register_partial(name, source)
            .map_err(|e| rendering_failed(name, e))
    }

    #[instrument(skip_all, fields(dir = %dir.display()))]
    fn register_partials_from_dir(&self, dir: &Path) -> KilnResult<usize> {
        if !dir.is_dir() {
            debug!("partials directory absent");
            return Ok(0);
        }

        let mut count = 0;
        for entry in WalkDir::new(dir).sort_by_file_name() {
            let entry = entry.map_err(|e| ApplicationError::FilesystemError {
                path: dir.to_path_buf(),
                reason: format!("directory walk error: {e}"),
            })?;
            let path = entry.path();
            if !entry.file_type().is_file() || path.extension().is_none_or(|ext| ext != "hbs") {
                continue;
            }

            let Ok(relative) = path.strip_prefix(dir) else {
                continue;
            };
            let name = relative
                .with_extension("")
                .components()
                .map(|c| c.as_os_str().to_string_lossy().into_owned())
                .collect::<Vec<_>>()
                .join("/");

            let source =
                std::fs::read_to_string(path).map_err(|e| ApplicationError::FilesystemError {
                    path: path.to_path_buf(),
                    reason: format!("Failed to read partial: {e}"),
                })?;
            self.register_partial(&name, &source)?;
            debug!(partial = %name, "registered partial");
            count += 1;
        }
        Ok(count)
    }
}
