use std::collections::HashMap;

use chrono::NaiveDateTime;
use gitcc_bridge::{Change, ChangeSet, UserMap};
use gitcc_clearcase::ClearcaseView;
use gitcc_git::{CommitIdentity, GitRepo};
use tempfile::TempDir;

fn stamp(raw: &str) -> NaiveDateTime {
    NaiveDateTime::parse_from_str(raw, "%Y%m%d.%H%M%S").unwrap()
}

fn setup() -> (TempDir, GitRepo, ClearcaseView, UserMap) {
    let dir = TempDir::new().unwrap();
    let repo = GitRepo::at(dir.path().join("repo"));
    repo.init("master").unwrap();

    let view = ClearcaseView::new(
        dir.path().join("view"),
        vec![".".to_string()],
        vec!["main".to_string()],
        true,
    );
    let users = UserMap::new(&HashMap::new(), "example.com");
    (dir, repo, view, users)
}

fn seed_commit(repo: &GitRepo, path: &str, content: &str) {
    std::fs::write(repo.work_dir().join(path), content).unwrap();
    repo.add_file(path).unwrap();
    let identity = CommitIdentity {
        name: "seed".to_string(),
        email: "seed@example.com".to_string(),
        date: stamp("20240101.120000"),
    };
    repo.commit("seed", &identity).unwrap();
}

#[test]
fn test_delete_changeset_commits_with_originating_identity() {
    let (_dir, repo, view, users) = setup();
    seed_commit(&repo, "old.c", "content\n");

    let mut set = ChangeSet::new("alice", "remove old file");
    set.push(Change::Delete {
        time: stamp("20240115.100000"),
        path: "old.c".to_string(),
    });

    let id = set.commit_to_git(&repo, &view, &users).unwrap().unwrap();
    assert_eq!(repo.author_name(&id).unwrap(), "alice");
    assert_eq!(repo.author_email(&id).unwrap(), "alice@example.com");
    assert_eq!(
        repo.commit_date(&id).unwrap(),
        NaiveDateTime::parse_from_str("2024-01-15 10:00:00", "%Y-%m-%d %H:%M:%S").unwrap()
    );
    assert_eq!(repo.commit_message(&id).unwrap(), "remove old file");
    assert!(repo.tracked_files().unwrap().is_empty());
}

#[test]
fn test_missing_delete_target_yields_no_commit() {
    let (_dir, repo, view, users) = setup();
    seed_commit(&repo, "keep.c", "content\n");

    let mut set = ChangeSet::new("alice", "remove something");
    set.push(Change::Delete {
        time: stamp("20240115.100000"),
        path: "not-there.c".to_string(),
    });

    assert_eq!(set.commit_to_git(&repo, &view, &users).unwrap(), None);
    assert_eq!(repo.tracked_files().unwrap(), vec!["keep.c".to_string()]);
}

#[test]
fn test_empty_changeset_yields_no_commit() {
    let (_dir, repo, view, users) = setup();
    seed_commit(&repo, "keep.c", "content\n");

    let set = ChangeSet::new("alice", "no changes");
    assert_eq!(set.commit_to_git(&repo, &view, &users).unwrap(), None);
}
