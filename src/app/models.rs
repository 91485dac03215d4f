use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::path::{Component, Path, PathBuf};

/// Settings persisted in `cflconf.json`.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ProjectConfig {
    pub input_dir: String,
    pub output_file: String,
    #[serde(default)]
    pub exclude: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub exclude_globs: Vec<String>,
}

/// A loaded configuration together with the directory its paths are relative to.
#[derive(Debug, Clone)]
pub struct Project {
    pub base: PathBuf,
    pub config: ProjectConfig,
}

impl Project {
    pub fn new(base: impl Into<PathBuf>, config: ProjectConfig) -> Self {
        Self {
            base: base.into(),
            config,
        }
    }

    pub fn input_dir(&self) -> PathBuf {
        self.base.join(&self.config.input_dir)
    }

    pub fn output_file(&self) -> PathBuf {
        self.base.join(&self.config.output_file)
    }

    /// Joins a bundle path under the input directory. Roots and drive
    /// prefixes are dropped so absolute paths stay inside the tree.
    pub fn resolve(&self, relative: &str) -> PathBuf {
        let mut resolved = self.input_dir();
        for component in Path::new(relative).components() {
            match component {
                Component::Normal(_) | Component::CurDir | Component::ParentDir => {
                    resolved.push(component)
                }
                Component::RootDir | Component::Prefix(_) => {}
            }
        }
        resolved
    }
}

/// Result of parsing a bundle document. Built once, applied once.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct DirectiveSet {
    pub files: IndexMap<String, String>,
    pub to_remove: Vec<String>,
    pub new_structure: bool,
}

impl DirectiveSet {
    pub fn is_empty(&self) -> bool {
        self.files.is_empty() && self.to_remove.is_empty() && !self.new_structure
    }
}

/// What an apply run touched.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct ApplyReport {
    pub wiped: usize,
    pub removed: usize,
    pub written: usize,
}

/// Represents a single file discovered during the scan.
#[derive(Debug)]
pub struct FileEntry {
    pub path: PathBuf,
    pub relative_path: String, // forward-slash separated
}
