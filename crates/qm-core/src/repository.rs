//! Migration discovery.
//!
//! Walks one or more root directories, parses every migration file and merges
//! the result into a single set ordered by name. Any unreadable or malformed
//! file aborts the whole scan; a partial migration set is never returned.

use crate::error::{CoreError, CoreResult};
use crate::migration::{Migration, MigrationName};
use crate::script::ScriptFormat;
use crate::splitter::{normalize_statement, split_statements, SplitOptions};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

/// Read-only source of migration units
#[derive(Debug, Clone)]
pub struct MigrationRepository {
    format: ScriptFormat,
    split: SplitOptions,
    extension: String,
}

impl MigrationRepository {
    /// Create a repository reading `*.{extension}` files.
    ///
    /// `split` is used only to compare duplicate fragments statement by
    /// statement; it should match the target dialect.
    pub fn new(format: ScriptFormat, split: SplitOptions, extension: impl Into<String>) -> Self {
        Self {
            format,
            split,
            extension: extension.into(),
        }
    }

    /// Marker format this repository parses
    pub fn format(&self) -> &ScriptFormat {
        &self.format
    }

    /// Scan a single root directory.
    pub fn scan_migrations(&self, root: &Path) -> CoreResult<Vec<Migration>> {
        self.scan_sources(&[root.to_path_buf()])
    }

    /// Scan and merge several roots (multi-source applications).
    ///
    /// Fragments sharing a name must agree: byte-identical files, or files
    /// with the same normalized statement layout, collapse into one
    /// migration. Anything else is a [`CoreError::StructuralMismatch`].
    pub fn scan_sources(&self, roots: &[PathBuf]) -> CoreResult<Vec<Migration>> {
        let mut files = Vec::new();
        for root in roots {
            if !root.is_dir() {
                return Err(CoreError::MigrationDirNotFound {
                    path: root.display().to_string(),
                });
            }
            self.collect_files(root, &mut files)?;
        }

        let mut merged: BTreeMap<MigrationName, Migration> = BTreeMap::new();
        for path in files {
            let migration = self.load_file(&path)?;
            match merged.get(&migration.name) {
                Some(existing) => {
                    self.check_same_layout(existing, &migration)?;
                    log::debug!(
                        "Migration '{}' found in both {} and {}; fragments agree",
                        migration.name,
                        existing.source.display(),
                        migration.source.display()
                    );
                }
                None => {
                    merged.insert(migration.name.clone(), migration);
                }
            }
        }

        log::debug!(
            "Discovered {} migration(s) under {} root(s)",
            merged.len(),
            roots.len()
        );
        Ok(merged.into_values().collect())
    }

    /// Recursively collect matching files, sorted per directory so the scan is
    /// deterministic.
    fn collect_files(&self, dir: &Path, files: &mut Vec<PathBuf>) -> CoreResult<()> {
        let read_dir = std::fs::read_dir(dir).map_err(|e| CoreError::IoWithPath {
            path: dir.display().to_string(),
            source: e,
        })?;

        let mut entries = Vec::new();
        for entry in read_dir {
            let entry = entry.map_err(|e| CoreError::IoWithPath {
                path: dir.display().to_string(),
                source: e,
            })?;
            entries.push(entry.path());
        }
        entries.sort();

        for path in entries {
            let hidden = path
                .file_name()
                .and_then(|n| n.to_str())
                .is_some_and(|n| n.starts_with('.'));
            if hidden {
                continue;
            }
            if path.is_dir() {
                self.collect_files(&path, files)?;
            } else if path
                .extension()
                .is_some_and(|e| e.eq_ignore_ascii_case(self.extension.as_str()))
            {
                files.push(path);
            }
        }
        Ok(())
    }

    fn load_file(&self, path: &Path) -> CoreResult<Migration> {
        let name = path
            .file_stem()
            .and_then(|s| s.to_str())
            .and_then(MigrationName::try_new)
            .ok_or_else(|| CoreError::InvalidMigrationName {
                path: path.display().to_string(),
            })?;

        let content = std::fs::read_to_string(path).map_err(|e| CoreError::IoWithPath {
            path: path.display().to_string(),
            source: e,
        })?;

        let sections =
            self.format
                .parse(&content)
                .ok_or_else(|| CoreError::InvalidMigrationFormat {
                    path: path.display().to_string(),
                    marker: self.format.down_marker.clone(),
                })?;

        Ok(Migration::new(
            name,
            sections.up,
            sections.down,
            path.to_path_buf(),
            &content,
        ))
    }

    fn check_same_layout(&self, first: &Migration, second: &Migration) -> CoreResult<()> {
        if first.checksum == second.checksum {
            return Ok(());
        }

        let mismatch = |reason: String| CoreError::StructuralMismatch {
            name: first.name.to_string(),
            first: first.source.display().to_string(),
            second: second.source.display().to_string(),
            reason,
        };

        for (section, a, b) in [
            ("up", &first.up_script, &second.up_script),
            ("down", &first.down_script, &second.down_script),
        ] {
            let a = split_statements(a, &self.split);
            let b = split_statements(b, &self.split);
            if a.len() != b.len() {
                return Err(mismatch(format!(
                    "{section}-section has {} statement(s) vs {}",
                    a.len(),
                    b.len()
                )));
            }
            if let Some(idx) = a
                .iter()
                .zip(&b)
                .position(|(x, y)| normalize_statement(x) != normalize_statement(y))
            {
                return Err(mismatch(format!(
                    "{section}-section statement {} differs",
                    idx + 1
                )));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
#[path = "repository_test.rs"]
mod tests;
