//! Output writer: commits rendered files beneath the output root.

use std::path::{Path, PathBuf};

use serde_json::{Value, json};
use tracing::{debug, trace};

use crate::{
    application::ports::Filesystem,
    domain::{FileMode, FileOutcome, RelativePath},
    error::KilnResult,
};

/// Where a rendered path lands.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputLocation {
    pub relative: RelativePath,
    pub absolute: PathBuf,
}

pub struct OutputWriter<'a> {
    filesystem: &'a dyn Filesystem,
    root: &'a Path,
    dry_run: bool,
}

impl<'a> OutputWriter<'a> {
    pub fn new(filesystem: &'a dyn Filesystem, root: &'a Path, dry_run: bool) -> Self {
        Self {
            filesystem,
            root,
            dry_run,
        }
    }

    pub fn root(&self) -> &Path {
        self.root
    }

    pub const fn is_dry_run(&self) -> bool {
        self.dry_run
    }

    /// Resolve a rendered path against the root.
    ///
    /// # Errors
    ///
    /// `AbsolutePathNotAllowed` or `PathEscapesOutput`.
    pub fn locate(&self, rendered: &str) -> KilnResult<OutputLocation> {
        let relative = RelativePath::try_new(rendered)?;
        let absolute = self.root.join(relative.as_path());
        Ok(OutputLocation { relative, absolute })
    }

    pub fn exists(&self, location: &OutputLocation) -> bool {
        self.filesystem.exists(&location.absolute)
    }

    /// The `_output` render value for a location.
    pub fn output_value(&self, location: &OutputLocation) -> Value {
        let dir = location
            .relative
            .as_path()
            .parent()
            .and_then(|p| RelativePath::try_new(p).ok())
            .map(|p| p.to_slash_string())
            .unwrap_or_default();
        json!({
            "path": location.relative.to_slash_string(),
            "fileName": location.relative.file_name().unwrap_or_default(),
            "dir": dir,
            "root": self.root.display().to_string(),
        })
    }

    /// The `_template` render value for a file definition.
    pub fn template_value(plugin_id: &str, template_id: &str, path_template: &str) -> Value {
        json!({
            "pluginId": plugin_id,
            "id": template_id,
            "path": path_template,
        })
    }

    /// Write `content` at `location`, creating parents and applying `mode`.
    ///
    /// In dry run nothing touches the filesystem and `WouldWrite` is returned.
    pub fn write(
        &self,
        location: &OutputLocation,
        content: &str,
        mode: Option<FileMode>,
    ) -> KilnResult<FileOutcome> {
        if self.dry_run {
            trace!(path = %location.relative, "dry run, write skipped");
            return Ok(FileOutcome::WouldWrite);
        }

        if let Some(parent) = location.absolute.parent() {
            self.filesystem.create_dir_all(parent)?;
        }
        self.filesystem.write_file(&location.absolute, content)?;
        if let Some(mode) = mode {
            self.filesystem.set_mode(&location.absolute, mode.bits())?;
        }

        debug!(path = %location.relative, bytes = content.len(), "wrote file");
        Ok(FileOutcome::Written)
    }
}
