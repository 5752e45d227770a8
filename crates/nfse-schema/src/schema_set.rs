//! # Schema Files
//!
//! Maps operations to the XSD file they are validated against, relative to
//! a deployment-owned schema directory.

use std::path::{Path, PathBuf};

use nfse_core::Operation;

/// The read-only set of schema files for one deployment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SchemaSet {
    dir: PathBuf,
}

impl SchemaSet {
    /// Use the schema files found under `dir`.
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// The schema directory.
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Path of the schema `operation` is validated against.
    pub fn path_for(&self, operation: Operation) -> PathBuf {
        self.dir.join(operation.descriptor().schema_file)
    }

    /// Schema files expected for `operations` that are absent from disk.
    pub fn missing_files(&self, operations: &[Operation]) -> Vec<PathBuf> {
        operations
            .iter()
            .map(|op| self.path_for(*op))
            .filter(|p| !p.is_file())
            .collect()
    }
}
