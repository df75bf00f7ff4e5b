//! Locating tool binaries under the tools root.

use crate::diagnostics::Diagnostics;
use crate::error::{PackError, PackResult};
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

//--------------------------------------------------------------------------------------------------
// Types
//--------------------------------------------------------------------------------------------------

/// A tool found on disk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocatedTool {
    /// Name the tool was requested by.
    pub name: String,

    /// Where it was found.
    pub path: PathBuf,
}

/// Finds tools by file name anywhere below a root directory.
#[derive(Debug, Clone)]
pub struct ToolLocator {
    root: PathBuf,
}

//--------------------------------------------------------------------------------------------------
// Methods
//--------------------------------------------------------------------------------------------------

impl ToolLocator {
    /// Locator searching below `root`.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Root searched.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Find `tool` (case-insensitive); the first match in path order wins.
    pub fn find(&self, tool: &str) -> PackResult<LocatedTool> {
        WalkDir::new(&self.root)
            .sort_by_file_name()
            .into_iter()
            .filter_map(Result::ok)
            .filter(|e| e.file_type().is_file())
            .find(|e| e.file_name().to_string_lossy().eq_ignore_ascii_case(tool))
            .map(|e| {
                tracing::debug!("Found tool {} at {}", tool, e.path().display());
                LocatedTool {
                    name: tool.to_string(),
                    path: e.into_path(),
                }
            })
            .ok_or_else(|| PackError::ToolNotFound {
                tool: tool.to_string(),
                root: self.root.clone(),
            })
    }

    /// Find every tool, reporting each missing one.
    ///
    /// All names are tried before giving up, so one pass surfaces every
    /// missing tool. Returns `None` if any is missing.
    pub fn resolve_all(
        &self,
        tools: &[String],
        diagnostics: &mut Diagnostics,
    ) -> Option<Vec<LocatedTool>> {
        let mut found = Vec::with_capacity(tools.len());
        let mut missing = false;

        for tool in tools {
            match self.find(tool) {
                Ok(located) => found.push(located),
                Err(e) => {
                    diagnostics.report(e);
                    missing = true;
                }
            }
        }

        (!missing).then_some(found)
    }
}

//--------------------------------------------------------------------------------------------------
// Tests
//--------------------------------------------------------------------------------------------------
