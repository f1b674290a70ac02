use std::fs;
use std::path::Path;

use gitcc_clearcase::ClearcaseView;
use gitcc_git::{CommitDiff, GitRepo};

use crate::error::BridgeError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DiffKind {
    Modify,
    Add,
    Delete,
    Rename,
}

/// ClearCase element operations derived from one path of a git commit's
/// diff: which elements to reserve, which to check in, and how to
/// materialize the change in the view.
///
/// The checkout and check-in lists are captured against the view state at
/// construction time, before any directory element is created, so that
/// every directory created on the way gets checked in afterwards.
#[derive(Debug, Clone)]
pub struct FileDiff {
    kind: DiffKind,
    commit: String,
    src: String,
    dst: Option<String>,
    checkouts: Vec<String>,
    checkins: Vec<String>,
}

impl FileDiff {
    pub fn new(view_root: &Path, commit: &str, diff: &CommitDiff) -> FileDiff {
        match diff {
            CommitDiff::Modified { path } => FileDiff {
                kind: DiffKind::Modify,
                commit: commit.to_string(),
                src: path.clone(),
                dst: None,
                checkouts: vec![path.clone()],
                checkins: vec![path.clone()],
            },
            CommitDiff::Added { path } => {
                let (anchor, missing) = missing_ancestors(view_root, path);
                let mut checkins = vec![path.clone(), anchor.clone()];
                checkins.extend(missing);
                FileDiff {
                    kind: DiffKind::Add,
                    commit: commit.to_string(),
                    src: path.clone(),
                    dst: None,
                    checkouts: vec![anchor],
                    checkins,
                }
            }
            CommitDiff::Deleted { path } => {
                let (anchor, _) = missing_ancestors(view_root, path);
                FileDiff {
                    kind: DiffKind::Delete,
                    commit: commit.to_string(),
                    src: path.clone(),
                    dst: None,
                    checkouts: vec![anchor.clone()],
                    checkins: vec![anchor],
                }
            }
            CommitDiff::Renamed { src, dst } => {
                let src_dir = parent_or_root(src);
                let (dst_anchor, missing) = missing_ancestors(view_root, dst);
                let mut checkins = vec![dst.clone(), src_dir.clone(), dst_anchor.clone()];
                checkins.extend(missing);
                FileDiff {
                    kind: DiffKind::Rename,
                    commit: commit.to_string(),
                    src: src.clone(),
                    dst: Some(dst.clone()),
                    checkouts: vec![src.clone(), src_dir, dst_anchor],
                    checkins,
                }
            }
        }
    }

    pub fn kind(&self) -> DiffKind {
        self.kind
    }

    /// Elements to reserve before materializing this diff. May contain
    /// duplicates across diffs; the transaction coalesces them.
    pub fn checkouts(&self) -> &[String] {
        &self.checkouts
    }

    /// Elements to check in after materialization, including every
    /// directory element created on the way.
    pub fn checkins(&self) -> &[String] {
        &self.checkins
    }

    /// Materialize the change in the view working area.
    pub fn update_cc_area(&self, git: &GitRepo, cc: &ClearcaseView) -> Result<(), BridgeError> {
        let view_root = cc.view_root();
        match self.kind {
            DiffKind::Modify => {
                let blob = git.blob(&self.commit, &self.src)?;
                fs::write(view_root.join(&self.src), blob)?;
            }
            DiffKind::Add => {
                create_missing_directories(cc, &self.src)?;
                let blob = git.blob(&self.commit, &self.src)?;
                fs::write(view_root.join(&self.src), blob)?;
                cc.add_file(&self.src)?;
            }
            DiffKind::Delete => {
                // Emptied directory elements are left in place.
                cc.remove_file(&self.src)?;
            }
            DiffKind::Rename => {
                let dst = self.dst.as_deref().unwrap_or(&self.src);
                // The renamed element keeps its identity: write the new
                // content at the old path, then move the element.
                let blob = git.blob(&self.commit, dst)?;
                fs::write(view_root.join(&self.src), blob)?;
                create_missing_directories(cc, dst)?;
                cc.move_file(&self.src, dst)?;
            }
        }
        Ok(())
    }
}

/// Walk `dirname` upwards until a directory exists under the view root.
/// Returns the first existing ancestor (`.` at the root) and the missing
/// intermediates, deepest first.
fn missing_ancestors(view_root: &Path, path: &str) -> (String, Vec<String>) {
    let mut dir = parent_dir(path);
    let mut missing = Vec::new();
    while !dir.is_empty() && !view_root.join(dir).exists() {
        missing.push(dir.to_string());
        dir = parent_dir(dir);
    }
    let anchor = if dir.is_empty() { "." } else { dir };
    (anchor.to_string(), missing)
}

/// Create the directory elements missing between the view root and
/// `path`'s parent, top-down.
fn create_missing_directories(cc: &ClearcaseView, path: &str) -> Result<(), BridgeError> {
    let (_, missing) = missing_ancestors(cc.view_root(), path);
    for dir in missing.iter().rev() {
        cc.add_directory(dir)?;
    }
    Ok(())
}

fn parent_dir(path: &str) -> &str {
    match path.rfind('/') {
        Some(idx) => &path[..idx],
        None => "",
    }
}

fn parent_or_root(path: &str) -> String {
    let dir = parent_dir(path);
    if dir.is_empty() { "." } else { dir }.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn view_with_dirs(dirs: &[&str]) -> TempDir {
        let dir = TempDir::new().unwrap();
        for d in dirs {
            fs::create_dir_all(dir.path().join(d)).unwrap();
        }
        dir
    }

    #[test]
    fn test_modify_touches_only_the_file() {
        let view = view_with_dirs(&[]);
        let diff = FileDiff::new(
            view.path(),
            "c1",
            &CommitDiff::Modified {
                path: "a/b.txt".to_string(),
            },
        );
        assert_eq!(diff.checkouts(), ["a/b.txt"]);
        assert_eq!(diff.checkins(), ["a/b.txt"]);
    }

    #[test]
    fn test_add_in_existing_directory() {
        let view = view_with_dirs(&["src"]);
        let diff = FileDiff::new(
            view.path(),
            "c1",
            &CommitDiff::Added {
                path: "src/new.c".to_string(),
            },
        );
        assert_eq!(diff.checkouts(), ["src"]);
        assert_eq!(diff.checkins(), ["src/new.c", "src"]);
    }

    #[test]
    fn test_add_with_missing_directory_chain() {
        let view = view_with_dirs(&[]);
        let diff = FileDiff::new(
            view.path(),
            "c1",
            &CommitDiff::Added {
                path: "newdir/sub/file.txt".to_string(),
            },
        );
        assert_eq!(diff.checkouts(), ["."]);
        // File, anchor, then every missing intermediate (deepest first).
        assert_eq!(
            diff.checkins(),
            ["newdir/sub/file.txt", ".", "newdir/sub", "newdir"]
        );
    }

    #[test]
    fn test_add_at_view_root() {
        let view = view_with_dirs(&[]);
        let diff = FileDiff::new(
            view.path(),
            "c1",
            &CommitDiff::Added {
                path: "top.txt".to_string(),
            },
        );
        assert_eq!(diff.checkouts(), ["."]);
        assert_eq!(diff.checkins(), ["top.txt", "."]);
    }

    #[test]
    fn test_delete_checks_in_nearest_ancestor_only() {
        let view = view_with_dirs(&["a"]);
        let diff = FileDiff::new(
            view.path(),
            "c1",
            &CommitDiff::Deleted {
                path: "a/b/c.txt".to_string(),
            },
        );
        assert_eq!(diff.checkouts(), ["a"]);
        assert_eq!(diff.checkins(), ["a"]);
    }

    #[test]
    fn test_rename_covers_both_directories() {
        let view = view_with_dirs(&["src"]);
        let diff = FileDiff::new(
            view.path(),
            "c1",
            &CommitDiff::Renamed {
                src: "src/a.txt".to_string(),
                dst: "lib/a.txt".to_string(),
            },
        );
        assert_eq!(diff.checkouts(), ["src/a.txt", "src", "."]);
        assert_eq!(diff.checkins(), ["lib/a.txt", "src", ".", "lib"]);
    }

    #[test]
    fn test_rename_within_existing_directories() {
        let view = view_with_dirs(&["src", "lib"]);
        let diff = FileDiff::new(
            view.path(),
            "c1",
            &CommitDiff::Renamed {
                src: "src/a.txt".to_string(),
                dst: "lib/a.txt".to_string(),
            },
        );
        assert_eq!(diff.checkouts(), ["src/a.txt", "src", "lib"]);
        assert_eq!(diff.checkins(), ["lib/a.txt", "src", "lib"]);
    }

    #[test]
    fn test_missing_ancestors_walk() {
        let view = view_with_dirs(&["a"]);
        let (anchor, missing) = missing_ancestors(view.path(), "a/b/c/d.txt");
        assert_eq!(anchor, "a");
        assert_eq!(missing, vec!["a/b/c".to_string(), "a/b".to_string()]);
    }
}
