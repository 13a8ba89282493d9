use super::DomainError;
use serde::Serialize;
use std::fmt;
use std::path::{Component, Path, PathBuf};

/// A filesystem path guaranteed to be relative and to stay inside its root.
///
/// Invariant: never absolute, never climbs above the root with `..`.
/// Enforced at construction.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RelativePath(PathBuf);

impl RelativePath {
    /// Fallible constructor.
    pub fn try_new(path: impl Into<PathBuf>) -> Result<Self, DomainError> {
        let path = path.into();
        if path.is_absolute() || path.has_root() {
            return Err(DomainError::AbsolutePathNotAllowed {
                path: path.display().to_string(),
            });
        }

        let mut depth: usize = 0;
        let mut normalized = PathBuf::new();
        for component in path.components() {
            match component {
                Component::Normal(part) => {
                    depth += 1;
                    normalized.push(part);
                }
                Component::CurDir => {}
                Component::ParentDir => {
                    if depth == 0 {
                        return Err(DomainError::PathEscapesOutput {
                            path: path.display().to_string(),
                        });
                    }
                    depth -= 1;
                    normalized.pop();
                }
                Component::RootDir | Component::Prefix(_) => {
                    return Err(DomainError::AbsolutePathNotAllowed {
                        path: path.display().to_string(),
                    });
                }
            }
        }

        if normalized.as_os_str().is_empty() {
            return Err(DomainError::InvalidCapability(format!(
                "path '{}' does not name a file",
                path.display()
            )));
        }

        Ok(Self(normalized))
    }

    pub fn as_path(&self) -> &Path {
        &self.0
    }

    /// Forward-slash form, identical on every platform.
    pub fn to_slash_string(&self) -> String {
        self.0
            .components()
            .map(|c| c.as_os_str().to_string_lossy())
            .collect::<Vec<_>>()
            .join("/")
    }

    pub fn file_name(&self) -> Option<&str> {
        self.0.file_name().and_then(|n| n.to_str())
    }

    pub fn into_path_buf(self) -> PathBuf {
        self.0
    }
}

impl AsRef<Path> for RelativePath {
    fn as_ref(&self) -> &Path {
        &self.0
    }
}

impl fmt::Display for RelativePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_slash_string())
    }
}

/// POSIX permission bits for a generated file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct FileMode(u32);

impl FileMode {
    /// `rw-r--r--`
    pub const REGULAR: Self = Self(0o644);

    /// `rwxr-xr-x`, for generated scripts.
    pub const EXECUTABLE: Self = Self(0o755);

    pub const fn new(bits: u32) -> Self {
        Self(bits & 0o7777)
    }

    pub const fn bits(&self) -> u32 {
        self.0
    }

    pub const fn is_executable(&self) -> bool {
        self.0 & 0o111 != 0
    }
}

impl Default for FileMode {
    fn default() -> Self {
        Self::REGULAR
    }
}

impl fmt::Display for FileMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:o}", self.0)
    }
}
