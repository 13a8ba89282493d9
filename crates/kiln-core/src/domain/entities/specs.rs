//! Value objects a capability produces: files, shared-file contributions,
//! dependency entries and scripts.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::{capability::CapabilityId, common::FileMode};
use crate::domain::error::DomainError;

// ── Merge strategy ───────────────────────────────────────────────────────────

/// How several contributions to one path fold into a single file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum MergeStrategy {
    /// Highest priority wins; ties go to the later capability.
    Replace,
    /// Concatenate in application order, newline separated.
    Append,
    /// Deep-merge JSON documents.
    MergeStructured,
}

impl MergeStrategy {
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Replace => "replace",
            Self::Append => "append",
            Self::MergeStructured => "merge-structured",
        }
    }
}

impl fmt::Display for MergeStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MergeStrategy {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "replace" => Ok(Self::Replace),
            "append" => Ok(Self::Append),
            "merge-structured" | "merge_structured" | "merge" | "json" => {
                Ok(Self::MergeStructured)
            }
            other => Err(DomainError::InvalidCapability(format!(
                "unknown merge strategy '{other}' (expected replace, append or merge-structured)"
            ))),
        }
    }
}

// ── Files ────────────────────────────────────────────────────────────────────

/// A file a capability wants generated.
///
/// `path` and `content` are templates; they are rendered against the
/// capability's context before anything is written.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FileSpec {
    pub path: String,
    pub content: String,
    pub mode: Option<FileMode>,
    pub merge_strategy: Option<MergeStrategy>,
    pub priority: Option<i32>,
    pub condition: Option<String>,
    pub skip_if_exists: bool,
    pub template_id: Option<String>,
}

impl FileSpec {
    pub fn new(path: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            content: content.into(),
            mode: None,
            merge_strategy: None,
            priority: None,
            condition: None,
            skip_if_exists: false,
            template_id: None,
        }
    }

    pub fn mode(mut self, mode: FileMode) -> Self {
        self.mode = Some(mode);
        self
    }

    /// Shorthand for `mode(FileMode::EXECUTABLE)`.
    pub fn executable(self) -> Self {
        self.mode(FileMode::EXECUTABLE)
    }

    pub fn merge(mut self, strategy: MergeStrategy) -> Self {
        self.merge_strategy = Some(strategy);
        self
    }

    pub fn priority(mut self, priority: i32) -> Self {
        self.priority = Some(priority);
        self
    }

    /// Only generate the file when `expr` evaluates to true.
    pub fn when(mut self, expr: impl Into<String>) -> Self {
        self.condition = Some(expr.into());
        self
    }

    pub fn skip_if_exists(mut self) -> Self {
        self.skip_if_exists = true;
        self
    }

    pub fn template_id(mut self, id: impl Into<String>) -> Self {
        self.template_id = Some(id.into());
        self
    }

    /// Name used in diagnostics: the explicit template id, else the path.
    pub fn template_name(&self) -> &str {
        self.template_id.as_deref().unwrap_or(&self.path)
    }

    /// Convert a spec carrying a merge strategy into a contribution.
    /// Returns `None` for plain files.
    pub fn to_contribution(&self, plugin_id: &CapabilityId) -> Option<FileContribution> {
        self.merge_strategy.map(|strategy| FileContribution {
            plugin_id: plugin_id.clone(),
            path: self.path.clone(),
            content: self.content.clone(),
            merge_strategy: strategy,
            priority: self.priority.unwrap_or(0),
        })
    }
}

/// A fragment of a file shared between capabilities.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FileContribution {
    pub plugin_id: CapabilityId,
    pub path: String,
    pub content: String,
    pub merge_strategy: MergeStrategy,
    pub priority: i32,
}

impl FileContribution {
    pub fn new(
        plugin_id: impl Into<CapabilityId>,
        path: impl Into<String>,
        content: impl Into<String>,
        merge_strategy: MergeStrategy,
    ) -> Self {
        Self {
            plugin_id: plugin_id.into(),
            path: path.into(),
            content: content.into(),
            merge_strategy,
            priority: 0,
        }
    }

    pub fn priority(mut self, priority: i32) -> Self {
        self.priority = priority;
        self
    }
}

// ── Dependencies and scripts ─────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DependencyKind {
    #[default]
    Prod,
    Dev,
    Peer,
}

impl fmt::Display for DependencyKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Prod => "prod",
            Self::Dev => "dev",
            Self::Peer => "peer",
        })
    }
}

/// Which package manifest an entry belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PackageTarget {
    #[default]
    Root,
    App,
}

impl fmt::Display for PackageTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Root => "root",
            Self::App => "app",
        })
    }
}

impl FromStr for PackageTarget {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "root" => Ok(Self::Root),
            "app" => Ok(Self::App),
            other => Err(DomainError::InvalidCapability(format!(
                "unknown package target '{other}' (expected root or app)"
            ))),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DependencySpec {
    pub name: String,
    pub version: String,
    pub kind: DependencyKind,
    pub target: PackageTarget,
    pub plugin_id: CapabilityId,
}

impl DependencySpec {
    /// A production dependency of the root package.
    pub fn new(
        plugin_id: impl Into<CapabilityId>,
        name: impl Into<String>,
        version: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            version: version.into(),
            kind: DependencyKind::Prod,
            target: PackageTarget::Root,
            plugin_id: plugin_id.into(),
        }
    }

    pub fn kind(mut self, kind: DependencyKind) -> Self {
        self.kind = kind;
        self
    }

    pub fn dev(self) -> Self {
        self.kind(DependencyKind::Dev)
    }

    pub fn target(mut self, target: PackageTarget) -> Self {
        self.target = target;
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ScriptSpec {
    pub name: String,
    pub command: String,
    pub target: PackageTarget,
    pub description: Option<String>,
    pub plugin_id: CapabilityId,
}

impl ScriptSpec {
    pub fn new(
        plugin_id: impl Into<CapabilityId>,
        name: impl Into<String>,
        command: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            command: command.into(),
            target: PackageTarget::Root,
            description: None,
            plugin_id: plugin_id.into(),
        }
    }

    pub fn target(mut self, target: PackageTarget) -> Self {
        self.target = target;
        self
    }

    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }
}
