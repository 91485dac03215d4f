use crate::app::models::{ApplyReport, DirectiveSet, Project};
use anyhow::{Context, Result};
use std::fs;
use std::io;
use std::path::Path;

/// Replays a directive set against the project's input directory.
///
/// Phases run strictly in order: reset, removals, writes. The first I/O
/// error aborts the run; whatever was already changed stays changed.
pub fn apply(directives: &DirectiveSet, project: &Project) -> Result<ApplyReport> {
    let input_dir = project.input_dir();
    let mut report = ApplyReport::default();

    if directives.new_structure {
        report.wiped = reset_structure(&input_dir, &project.config.exclude)?;
    }

    for relative in &directives.to_remove {
        let target = project.resolve(relative);
        if remove_path(&target).with_context(|| format!("Failed to remove {:?}", target))? {
            log::info!("🗑️  Removed: {}", relative);
            report.removed += 1;
        }
    }

    for (relative, content) in &directives.files {
        let target = project.resolve(relative);
        if let Some(parent) = target.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create directory {:?}", parent))?;
        }
        fs::write(&target, content).with_context(|| format!("Failed to write {:?}", target))?;
        log::info!("💾 Applied: {}", relative);
        report.written += 1;
    }

    Ok(report)
}

/// Clears the direct children of `dir`, sparing entries named exactly as
/// one of `exclude`. Creates `dir` when it is missing.
fn reset_structure(dir: &Path, exclude: &[String]) -> Result<usize> {
    if !dir.exists() {
        fs::create_dir_all(dir).with_context(|| format!("Failed to create {:?}", dir))?;
        return Ok(0);
    }

    log::warn!("⚠️  NEWSTRUCTURE: Cleaning {:?} content...", dir);
    let mut wiped = 0;
    let entries = fs::read_dir(dir).with_context(|| format!("Failed to read {:?}", dir))?;
    for entry in entries {
        let entry = entry.with_context(|| format!("Failed to read entry in {:?}", dir))?;
        let name = entry.file_name();
        if exclude.iter().any(|e| name.to_str() == Some(e.as_str())) {
            continue;
        }
        let path = entry.path();
        if remove_path(&path).with_context(|| format!("Failed to remove {:?}", path))? {
            wiped += 1;
        }
    }
    Ok(wiped)
}

/// Removes a file, symlink or directory tree. Returns `false` when there
/// was nothing at `path`.
fn remove_path(path: &Path) -> io::Result<bool> {
    let meta = match fs::symlink_metadata(path) {
        Ok(meta) => meta,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(false),
        Err(e) => return Err(e),
    };
    let removed = if meta.is_dir() {
        fs::remove_dir_all(path)
    } else {
        fs::remove_file(path)
    };
    match removed {
        Ok(()) => Ok(true),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(false),
        Err(e) => Err(e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::models::ProjectConfig;
    use crate::app::parser::parse;
    use std::io::Cursor;

    fn project(base: &Path, exclude: &[&str]) -> Project {
        Project::new(
            base,
            ProjectConfig {
                input_dir: "src".to_string(),
                output_file: "index.cfl".to_string(),
                exclude: exclude.iter().map(|s| s.to_string()).collect(),
                exclude_globs: Vec::new(),
            },
        )
    }

    fn directives(files: &[(&str, &str)], to_remove: &[&str], new_structure: bool) -> DirectiveSet {
        DirectiveSet {
            files: files
                .iter()
                .map(|(p, c)| (p.to_string(), c.to_string()))
                .collect(),
            to_remove: to_remove.iter().map(|s| s.to_string()).collect(),
            new_structure,
        }
    }

    #[test]
    fn writes_files_and_creates_parents() {
        let dir = tempfile::tempdir().unwrap();
        let project = project(dir.path(), &[]);
        let set = directives(&[("a/b/c.txt", "deep"), ("top.txt", "")], &[], false);

        let report = apply(&set, &project).unwrap();

        assert_eq!(report.written, 2);
        let src = dir.path().join("src");
        assert_eq!(fs::read_to_string(src.join("a/b/c.txt")).unwrap(), "deep");
        assert_eq!(fs::read_to_string(src.join("top.txt")).unwrap(), "");
    }

    #[test]
    fn reset_keeps_excluded_names_only() {
        let dir = tempfile::tempdir().unwrap();
        let src = dir.path().join("src");
        fs::create_dir_all(src.join("keepme/inner")).unwrap();
        fs::write(src.join("keepme/inner/file.txt"), "kept").unwrap();
        fs::write(src.join("deleteme.txt"), "gone").unwrap();
        fs::create_dir_all(src.join("keepme_not/x")).unwrap();

        let report = apply(&directives(&[], &[], true), &project(dir.path(), &["keepme"])).unwrap();

        assert_eq!(report.wiped, 2);
        assert!(src.join("keepme/inner/file.txt").exists());
        assert!(!src.join("deleteme.txt").exists());
        assert!(!src.join("keepme_not").exists());
    }

    #[test]
    fn reset_creates_missing_input_dir() {
        let dir = tempfile::tempdir().unwrap();
        let mut project = project(dir.path(), &[]);
        project.config.input_dir = "nested/out".to_string();

        let report = apply(&directives(&[], &[], true), &project).unwrap();

        assert_eq!(report.wiped, 0);
        assert!(dir.path().join("nested/out").is_dir());
    }

    #[test]
    fn removal_runs_before_write() {
        let dir = tempfile::tempdir().unwrap();
        let src = dir.path().join("src");
        fs::create_dir_all(&src).unwrap();
        fs::write(src.join("a.txt"), "old").unwrap();

        let set = directives(&[("a.txt", "new")], &["a.txt"], false);
        apply(&set, &project(dir.path(), &[])).unwrap();

        assert_eq!(fs::read_to_string(src.join("a.txt")).unwrap(), "new");
    }

    #[test]
    fn directory_can_be_replaced_by_file() {
        let dir = tempfile::tempdir().unwrap();
        let src = dir.path().join("src");
        fs::create_dir_all(src.join("thing/sub")).unwrap();
        fs::write(src.join("thing/sub/f"), "x").unwrap();

        let set = directives(&[("thing", "now a file")], &["thing"], false);
        let report = apply(&set, &project(dir.path(), &[])).unwrap();

        assert_eq!(report.removed, 1);
        assert_eq!(fs::read_to_string(src.join("thing")).unwrap(), "now a file");
    }

    #[test]
    fn removing_missing_path_is_a_no_op() {
        let dir = tempfile::tempdir().unwrap();
        let src = dir.path().join("src");
        fs::create_dir_all(&src).unwrap();
        fs::write(src.join("stay.txt"), "stay").unwrap();

        let set = directives(&[], &["ghost.txt"], false);
        let report = apply(&set, &project(dir.path(), &[])).unwrap();

        assert_eq!(report, ApplyReport::default());
        assert_eq!(fs::read_to_string(src.join("stay.txt")).unwrap(), "stay");
    }

    #[test]
    fn applying_twice_matches_applying_once() {
        let dir = tempfile::tempdir().unwrap();
        let src = dir.path().join("src");
        fs::create_dir_all(src.join("old")).unwrap();
        fs::write(src.join("old/x"), "x").unwrap();
        fs::write(src.join("keep.txt"), "keep").unwrap();

        let bundle = "\
[<##FILETOREMOVE>]
old
[<##ENDFILETOREMOVE>]
[<FILE:new/y.txt>]
y
[<ENDFILE:new/y.txt>]
";
        let set = parse(Cursor::new(bundle)).unwrap();
        let project = project(dir.path(), &[]);

        apply(&set, &project).unwrap();
        let second = apply(&set, &project).unwrap();

        assert_eq!(second.removed, 0);
        assert!(!src.join("old").exists());
        assert_eq!(fs::read_to_string(src.join("new/y.txt")).unwrap(), "y");
        assert_eq!(fs::read_to_string(src.join("keep.txt")).unwrap(), "keep");
    }

    fn snapshot(root: &Path) -> Vec<(String, Option<String>)> {
        let mut entries = Vec::new();
        let mut pending = vec![root.to_path_buf()];
        while let Some(dir) = pending.pop() {
            for entry in fs::read_dir(&dir).unwrap() {
                let path = entry.unwrap().path();
                let relative = path.strip_prefix(root).unwrap().to_string_lossy().into_owned();
                if path.is_dir() {
                    pending.push(path);
                    entries.push((relative, None));
                } else {
                    entries.push((relative, Some(fs::read_to_string(&path).unwrap())));
                }
            }
        }
        entries.sort();
        entries
    }

    #[test]
    fn reset_with_exclude_is_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        let src = dir.path().join("src");
        fs::create_dir_all(src.join("node_modules/pkg")).unwrap();
        fs::write(src.join("node_modules/pkg/index.js"), "js").unwrap();
        fs::create_dir_all(src.join("stale")).unwrap();
        fs::write(src.join("stale/old.txt"), "old").unwrap();

        let bundle = "\
[<##NEWSTRUCTURE>]
[<##FILETOREMOVE>]
gone.txt
[<##ENDFILETOREMOVE>]
[<FILE:lib/main.rs>]
fn main() {}
[<ENDFILE:lib/main.rs>]
[<FILE:README.md>]
hello
[<ENDFILE:README.md>]
";
        let set = parse(Cursor::new(bundle)).unwrap();
        let project = project(dir.path(), &["node_modules"]);

        apply(&set, &project).unwrap();
        let once = snapshot(&src);
        apply(&set, &project).unwrap();
        let twice = snapshot(&src);

        assert_eq!(once, twice);
        assert!(src.join("node_modules/pkg/index.js").exists());
        assert!(!src.join("stale").exists());
        assert_eq!(fs::read_to_string(src.join("lib/main.rs")).unwrap(), "fn main() {}");
    }

    #[test]
    fn absolute_paths_stay_inside_input_dir() {
        let dir = tempfile::tempdir().unwrap();
        let outside = tempfile::tempdir().unwrap();
        let victim = outside.path().join("notes.txt");
        fs::write(&victim, "mine").unwrap();
        let victim_str = victim.to_str().unwrap();

        let bundle = format!(
            "[<##FILETOREMOVE>]\n{victim_str}\n[<##ENDFILETOREMOVE>]\n\
             [<FILE:{victim_str}>]\ninside\n[<ENDFILE:{victim_str}>]\n"
        );
        let set = parse(Cursor::new(bundle)).unwrap();
        let project = project(dir.path(), &[]);

        let report = apply(&set, &project).unwrap();

        assert_eq!(report.removed, 0);
        assert_eq!(fs::read_to_string(&victim).unwrap(), "mine");
        let relocated = project.resolve(victim_str);
        assert!(relocated.starts_with(project.input_dir()));
        assert_eq!(fs::read_to_string(relocated).unwrap(), "inside");
    }

    #[test]
    fn write_failure_is_reported_with_path() {
        let dir = tempfile::tempdir().unwrap();
        let src = dir.path().join("src");
        fs::create_dir_all(&src).unwrap();
        fs::write(src.join("blocker"), "file, not dir").unwrap();

        let files = [("first.txt", "1"), ("blocker/child.txt", "2"), ("last.txt", "3")];
        let set = directives(&files, &[], false);
        let err = apply(&set, &project(dir.path(), &[])).unwrap_err();

        assert!(format!("{:#}", err).contains("blocker"));
        assert!(src.join("first.txt").exists());
        assert!(!src.join("last.txt").exists());
    }
}
