//! Search path configuration.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

/// Where resolution looks for routines and tables.
///
/// Supplied by the host per request and never mutated; pivots derive a copy
/// through [`SearchPaths::with_routine`].
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchPaths {
    /// File of the document being searched. Whole-file results for `this`
    /// and self references point here.
    pub active_routine: PathBuf,
    /// Core library root. Its file stems are the core class names.
    #[serde(default)]
    pub core_psl: PathBuf,
    /// Project routine roots, own project before parent projects.
    #[serde(default)]
    pub project_psl: Vec<PathBuf>,
    /// Table metadata roots, searched in order.
    #[serde(default)]
    pub tables: Vec<PathBuf>,
}

impl SearchPaths {
    pub fn new(active_routine: impl Into<PathBuf>) -> Self {
        Self {
            active_routine: active_routine.into(),
            ..Self::default()
        }
    }

    pub fn with_core_psl(mut self, core_psl: impl Into<PathBuf>) -> Self {
        self.core_psl = core_psl.into();
        self
    }

    pub fn with_project_psl(mut self, roots: impl IntoIterator<Item = impl Into<PathBuf>>) -> Self {
        self.project_psl = roots.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_tables(mut self, roots: impl IntoIterator<Item = impl Into<PathBuf>>) -> Self {
        self.tables = roots.into_iter().map(Into::into).collect();
        self
    }

    /// A copy rooted at another document.
    pub fn with_routine(&self, active_routine: &Path) -> Self {
        Self {
            active_routine: active_routine.to_path_buf(),
            ..self.clone()
        }
    }

    /// Base name of the active routine, e.g. `Foo` for `/p/Foo.PROC`.
    pub fn proc_name(&self) -> String {
        self.active_routine
            .file_stem()
            .map(|stem| stem.to_string_lossy().into_owned())
            .unwrap_or_default()
    }
}
