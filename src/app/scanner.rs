use crate::app::models::{FileEntry, ProjectConfig};
use anyhow::{bail, Context, Result};
use globset::{Glob, GlobSet, GlobSetBuilder};
use ignore::WalkBuilder;
use pathdiff::diff_paths;
use std::path::{Path, PathBuf};

pub struct Scanner {
    root: PathBuf,
    exclude: Vec<String>,
    exclude_set: GlobSet,
    git_ignore: bool,
}

impl Scanner {
    pub fn new(root: PathBuf, config: &ProjectConfig) -> Result<Self> {
        Ok(Self {
            root,
            exclude: config.exclude.clone(),
            exclude_set: build_globset(&config.exclude_globs)?,
            git_ignore: false,
        })
    }

    /// Also honour `.gitignore` files found under the root.
    pub fn git_ignore(mut self, yes: bool) -> Self {
        self.git_ignore = yes;
        self
    }

    /// Lists every non-excluded file below the root, sorted by path.
    pub fn scan(&self) -> Result<Vec<FileEntry>> {
        if !self.root.is_dir() {
            bail!("❌ Input Dir not found: {:?}", self.root);
        }

        let root = self.root.clone();
        let exclude = self.exclude.clone();
        let exclude_set = self.exclude_set.clone();

        // Plain walk: hidden files are bundled too, ignore files only on request.
        // Symlinks are followed so linked files are bundled with their target's content.
        let walker = WalkBuilder::new(&self.root)
            .standard_filters(false)
            .follow_links(true)
            .git_ignore(self.git_ignore)
            .require_git(false)
            .filter_entry(move |entry| !is_excluded(&root, entry.path(), &exclude, &exclude_set))
            .build();

        let mut entries = Vec::new();
        for result in walker {
            match result {
                Ok(entry) => {
                    if !entry.file_type().is_some_and(|t| t.is_file()) {
                        continue;
                    }
                    if let Some(relative_path) = relative_str(&self.root, entry.path()) {
                        entries.push(FileEntry {
                            path: entry.path().to_path_buf(),
                            relative_path,
                        });
                    }
                }
                Err(err) => log::warn!("Error walking entry: {}", err),
            }
        }

        entries.sort_by(|a, b| a.relative_path.cmp(&b.relative_path));
        Ok(entries)
    }
}

fn relative_str(root: &Path, path: &Path) -> Option<String> {
    let relative = diff_paths(path, root)?;
    Some(relative.to_string_lossy().replace('\\', "/"))
}

/// Fragments match anywhere in the relative path, globs match it whole.
fn is_excluded(root: &Path, path: &Path, fragments: &[String], globs: &GlobSet) -> bool {
    if path == root {
        return false;
    }
    let Some(relative) = relative_str(root, path) else {
        return false;
    };
    fragments.iter().any(|f| relative.contains(f.as_str())) || globs.is_match(&relative)
}

fn build_globset(patterns: &[String]) -> Result<GlobSet> {
    let mut builder = GlobSetBuilder::new();
    for pat in patterns {
        builder.add(Glob::new(pat).context(format!("Invalid glob pattern: {}", pat))?);
    }
    Ok(builder.build()?)
}
