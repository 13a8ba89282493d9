//! Capabilities that ship with Kiln.
//!
//! | Id              | Priority | Depends on      |
//! |-----------------|----------|-----------------|
//! | `base`          | 0        |                 |
//! | `type-checking` | 10       | `base`          |
//! | `linting`       | 20       | `base`          |
//! | `testing`       | 30       | `type-checking` |
//! | `web-app`       | 40       | `type-checking` |
//! | `container`     | 50       |                 |
//!
//! Each one contributes to the shared `package.json` (structured merge) and
//! `README.md` (append).

use serde_json::{Map, Value, json};

use kiln_core::domain::{
    Capability, CapabilityMetadata, CapabilityMetadataBuilder, CapabilityRegistry,
    DependencySpec, DomainError, FileContribution, FileSpec, GenerationContext, MergeStrategy,
    ScriptSpec,
};

const PACKAGE_JSON: &str = "package.json";
const README: &str = "README.md";

/// A registry holding every built-in capability.
///
/// # Errors
///
/// Only on a malformed built-in definition.
pub fn builtin_registry() -> Result<CapabilityRegistry, DomainError> {
    let mut registry = CapabilityRegistry::new();
    register_builtins(&mut registry)?;
    Ok(registry)
}

/// Add the built-in capabilities to an existing registry.
///
/// # Errors
///
/// `DuplicateCapability` if one of the built-in ids is already taken.
pub fn register_builtins(registry: &mut CapabilityRegistry) -> Result<(), DomainError> {
    let shared = |meta: CapabilityMetadataBuilder| {
        meta.contributes_to(PACKAGE_JSON).contributes_to(README).build()
    };

    add(
        registry,
        shared(
            CapabilityMetadata::builder("base")
                .description("Project skeleton: package manifest, README, gitignore"),
        )?,
        Base,
    )?;
    add(
        registry,
        shared(
            CapabilityMetadata::builder("type-checking")
                .priority(10)
                .description("TypeScript compiler and tsconfig")
                .depends_on("base"),
        )?,
        TypeChecking,
    )?;
    add(
        registry,
        shared(
            CapabilityMetadata::builder("linting")
                .priority(20)
                .description("ESLint configuration")
                .depends_on("base"),
        )?,
        Linting,
    )?;
    add(
        registry,
        shared(
            CapabilityMetadata::builder("testing")
                .priority(30)
                .description("Vitest runner and a first test")
                .depends_on("type-checking"),
        )?,
        Testing,
    )?;
    add(
        registry,
        shared(
            CapabilityMetadata::builder("web-app")
                .priority(40)
                .description("HTTP server entry point and static assets")
                .depends_on("type-checking"),
        )?,
        WebApp,
    )?;
    add(
        registry,
        CapabilityMetadata::builder("container")
            .priority(50)
            .description("Dockerfile and build script")
            .contributes_to(README)
            .build()?,
        Container,
    )?;
    Ok(())
}

fn add<C>(
    registry: &mut CapabilityRegistry,
    metadata: CapabilityMetadata,
    make: fn(CapabilityMetadata) -> C,
) -> Result<(), DomainError>
where
    C: Capability + 'static,
{
    registry.register(move || Box::new(make(metadata.clone())))
}

fn package_json(meta: &CapabilityMetadata, fragment: Value) -> FileContribution {
    FileContribution::new(
        meta.id().clone(),
        PACKAGE_JSON,
        format!("{fragment:#}"),
        MergeStrategy::MergeStructured,
    )
    .priority(meta.priority())
}

fn readme(meta: &CapabilityMetadata, section: &str) -> FileContribution {
    FileContribution::new(meta.id().clone(), README, section, MergeStrategy::Append)
        .priority(meta.priority())
}

// ── base ────────────────────────────────────────────────────────────────────

struct Base(CapabilityMetadata);

impl Capability for Base {
    fn metadata(&self) -> CapabilityMetadata {
        self.0.clone()
    }

    fn files(&self, _ctx: &GenerationContext) -> Vec<FileSpec> {
        vec![
            FileSpec::new(".gitignore", "node_modules/\ndist/\ncoverage/\n.env\n").skip_if_exists(),
            FileSpec::new(
                "scripts/setup.sh",
                "#!/usr/bin/env sh\n# Generated by kiln ({{_template.pluginId}})\nset -e\nnpm install\n",
            )
            .executable(),
            FileSpec::new("src/index.ts", "export const name = \"{{name}}\";\n")
                .when("!plugins.includes('web-app')"),
        ]
    }

    fn dependencies(&self, _ctx: &GenerationContext) -> Vec<DependencySpec> {
        Vec::new()
    }

    fn scripts(&self, _ctx: &GenerationContext) -> Vec<ScriptSpec> {
        vec![
            ScriptSpec::new(self.0.id().clone(), "setup", "sh scripts/setup.sh")
                .description("Install dependencies"),
        ]
    }

    fn contributions(&self, _ctx: &GenerationContext) -> Vec<FileContribution> {
        vec![
            package_json(
                &self.0,
                json!({
                    "name": "{{kebab_case name}}",
                    "version": "{{#if version}}{{version}}{{else}}0.1.0{{/if}}",
                    "private": true,
                    "scripts": { "setup": "sh scripts/setup.sh" },
                    "keywords": ["kiln"]
                }),
            ),
            readme(
                &self.0,
                "# {{name}}\n\n{{#if description}}{{description}}\n\n{{/if}}Enabled: {{#each plugins}}{{this}}{{#unless @last}}, {{/unless}}{{/each}}\n",
            ),
        ]
    }
}

// ── type-checking ───────────────────────────────────────────────────────────

struct TypeChecking(CapabilityMetadata);

impl Capability for TypeChecking {
    fn metadata(&self) -> CapabilityMetadata {
        self.0.clone()
    }

    fn files(&self, _ctx: &GenerationContext) -> Vec<FileSpec> {
        vec![FileSpec::new(
            "tsconfig.json",
            r#"{
  "compilerOptions": {
    "target": "ES2022",
    "module": "NodeNext",
    "strict": {{#if strict}}{{strict}}{{else}}true{{/if}},
    "outDir": "dist"
  },
  "include": ["src"]
}
"#,
        )
        .template_id("tsconfig")]
    }

    fn dependencies(&self, _ctx: &GenerationContext) -> Vec<DependencySpec> {
        vec![DependencySpec::new(self.0.id().clone(), "typescript", "^5.4.0").dev()]
    }

    fn scripts(&self, _ctx: &GenerationContext) -> Vec<ScriptSpec> {
        vec![ScriptSpec::new(self.0.id().clone(), "typecheck", "tsc --noEmit")]
    }

    fn contributions(&self, _ctx: &GenerationContext) -> Vec<FileContribution> {
        vec![
            package_json(
                &self.0,
                json!({
                    "scripts": { "typecheck": "tsc --noEmit" },
                    "keywords": ["typescript"]
                }),
            ),
            readme(&self.0, "## Type checking\n\nRun `npm run typecheck`.\n"),
        ]
    }
}

// ── linting ─────────────────────────────────────────────────────────────────

struct Linting(CapabilityMetadata);

impl Capability for Linting {
    fn metadata(&self) -> CapabilityMetadata {
        self.0.clone()
    }

    fn files(&self, _ctx: &GenerationContext) -> Vec<FileSpec> {
        vec![
            FileSpec::new(
                "eslint.config.js",
                r#"import js from "@eslint/js";
{{#if (includes plugins "type-checking")}}import tseslint from "typescript-eslint";

export default tseslint.config(js.configs.recommended, ...tseslint.configs.recommended);
{{else}}
export default [js.configs.recommended];
{{/if}}"#,
            ),
            FileSpec::new(
                "tsconfig.eslint.json",
                "{\n  \"extends\": \"./tsconfig.json\",\n  \"include\": [\"src\", \"*.js\"]\n}\n",
            )
            .when("plugins.includes('type-checking')"),
        ]
    }

    fn dependencies(&self, ctx: &GenerationContext) -> Vec<DependencySpec> {
        let id = self.0.id().clone();
        let mut deps = vec![
            DependencySpec::new(id.clone(), "eslint", "^9.0.0").dev(),
            DependencySpec::new(id.clone(), "@eslint/js", "^9.0.0").dev(),
        ];
        if ctx.is_enabled("type-checking") {
            deps.push(DependencySpec::new(id, "typescript-eslint", "^8.0.0").dev());
        }
        deps
    }

    fn scripts(&self, _ctx: &GenerationContext) -> Vec<ScriptSpec> {
        vec![ScriptSpec::new(self.0.id().clone(), "lint", "eslint .")]
    }

    fn contributions(&self, _ctx: &GenerationContext) -> Vec<FileContribution> {
        vec![
            package_json(&self.0, json!({ "scripts": { "lint": "eslint ." } })),
            readme(&self.0, "## Linting\n\nRun `npm run lint`.\n"),
        ]
    }
}

// ── testing ─────────────────────────────────────────────────────────────────

struct Testing(CapabilityMetadata);

impl Capability for Testing {
    fn metadata(&self) -> CapabilityMetadata {
        self.0.clone()
    }

    fn files(&self, _ctx: &GenerationContext) -> Vec<FileSpec> {
        vec![
            FileSpec::new(
                "vitest.config.ts",
                "import { defineConfig } from \"vitest/config\";\n\nexport default defineConfig({ test: { coverage: { reporter: [\"text\"] } } });\n",
            ),
            FileSpec::new(
                "tests/{{kebab_case name}}.test.ts",
                r#"import { describe, expect, it } from "vitest";

describe("{{name}}", () => {
  it("{{_output.fileName}} runs", () => {
    expect(true).toBe(true);
  });
});
"#,
            )
            .template_id("first-test"),
        ]
    }

    fn dependencies(&self, _ctx: &GenerationContext) -> Vec<DependencySpec> {
        vec![DependencySpec::new(self.0.id().clone(), "vitest", "^2.0.0").dev()]
    }

    fn scripts(&self, _ctx: &GenerationContext) -> Vec<ScriptSpec> {
        vec![ScriptSpec::new(self.0.id().clone(), "test", "vitest run")]
    }

    fn contributions(&self, _ctx: &GenerationContext) -> Vec<FileContribution> {
        vec![
            package_json(&self.0, json!({ "scripts": { "test": "vitest run" } })),
            readme(&self.0, "## Testing\n\nRun `npm test`.\n"),
        ]
    }
}

// ── web-app ─────────────────────────────────────────────────────────────────

struct WebApp(CapabilityMetadata);

const DEFAULT_PORT: u16 = 3000;

fn port(ctx: &GenerationContext) -> Value {
    ctx.project_config()
        .get("port")
        .cloned()
        .unwrap_or_else(|| json!(DEFAULT_PORT))
}

impl Capability for WebApp {
    fn metadata(&self) -> CapabilityMetadata {
        self.0.clone()
    }

    fn files(&self, _ctx: &GenerationContext) -> Vec<FileSpec> {
        vec![
            FileSpec::new(
                "src/server.ts",
                r#"import { createServer } from "node:http";

const port = Number(process.env.PORT ?? {{port}});

createServer((_req, res) => {
  res.end("{{name}}");
}).listen(port, () => console.log(`{{snake_case name}} listening on ${port}`));
"#,
            ),
            FileSpec::new(
                "public/index.html",
                "<!doctype html>\n<title>{{name}}</title>\n<h1>{{name}}</h1>\n",
            ),
            FileSpec::new(".env.example", "PORT={{port}}\n").skip_if_exists(),
        ]
    }

    fn dependencies(&self, _ctx: &GenerationContext) -> Vec<DependencySpec> {
        vec![DependencySpec::new(self.0.id().clone(), "@types/node", "^20.0.0").dev()]
    }

    fn scripts(&self, _ctx: &GenerationContext) -> Vec<ScriptSpec> {
        vec![
            ScriptSpec::new(self.0.id().clone(), "start", "node dist/server.js")
                .description("Start the server"),
        ]
    }

    fn contributions(&self, _ctx: &GenerationContext) -> Vec<FileContribution> {
        vec![
            package_json(
                &self.0,
                json!({ "main": "dist/server.js", "scripts": { "start": "node dist/server.js" } }),
            ),
            readme(&self.0, "## Running\n\nThe server listens on port {{port}}.\n"),
        ]
    }

    fn template_values(&self, ctx: &GenerationContext) -> Map<String, Value> {
        let mut values = Map::new();
        values.insert("port".into(), port(ctx));
        values
    }
}

// ── container ───────────────────────────────────────────────────────────────

struct Container(CapabilityMetadata);

impl Capability for Container {
    fn metadata(&self) -> CapabilityMetadata {
        self.0.clone()
    }

    fn files(&self, _ctx: &GenerationContext) -> Vec<FileSpec> {
        vec![
            FileSpec::new(
                "Dockerfile",
                r#"FROM node:20-alpine
WORKDIR /app
COPY . .
RUN npm install{{#if (includes plugins "type-checking")}} && npx tsc{{/if}}
{{#if (includes plugins "web-app")}}EXPOSE {{port}}
CMD ["node", "dist/server.js"]
{{else}}CMD ["node", "dist/index.js"]
{{/if}}"#,
            ),
            FileSpec::new(".dockerignore", "node_modules\n.git\n").skip_if_exists(),
            FileSpec::new(
                "scripts/docker-build.sh",
                "#!/usr/bin/env sh\nset -e\ndocker build -t {{kebab_case name}} .\n",
            )
            .executable(),
        ]
    }

    fn dependencies(&self, _ctx: &GenerationContext) -> Vec<DependencySpec> {
        Vec::new()
    }

    fn scripts(&self, _ctx: &GenerationContext) -> Vec<ScriptSpec> {
        Vec::new()
    }

    fn contributions(&self, _ctx: &GenerationContext) -> Vec<FileContribution> {
        vec![readme(
            &self.0,
            "## Container\n\nBuild with `scripts/docker-build.sh`.\n",
        )]
    }

    fn template_values(&self, ctx: &GenerationContext) -> Map<String, Value> {
        let mut values = Map::new();
        values.insert("port".into(), port(ctx));
        values
    }
}
