use std::fs;
use std::io;
use std::path::Path;

use chrono::{Duration, NaiveDateTime};
use gitcc_clearcase::{uncataloged_target, ClearcaseView, HistoryRecord, RecordOp, UNCATALOGED_PREFIX};
use gitcc_git::{CommitIdentity, GitError, GitRepo};

use crate::error::BridgeError;
use crate::users::UserMap;

/// Commit message used when a change-set's check-in comment is blank.
const EMPTY_COMMENT: &str = "<empty comment>";

/// One atomic change of a change-set.
#[derive(Debug, Clone, PartialEq)]
pub enum Change {
    /// Fetch the element at `version` and stage it.
    Modify {
        time: NaiveDateTime,
        path: String,
        version: String,
    },
    /// Stage a removal; an absent work-area file is tolerated.
    Delete { time: NaiveDateTime, path: String },
}

impl Change {
    pub fn path(&self) -> &str {
        match self {
            Change::Modify { path, .. } | Change::Delete { path, .. } => path,
        }
    }

    fn time(&self) -> NaiveDateTime {
        match self {
            Change::Modify { time, .. } | Change::Delete { time, .. } => *time,
        }
    }

    fn stage(&self, git: &GitRepo, cc: &ClearcaseView) -> Result<(), BridgeError> {
        match self {
            Change::Modify { path, version, .. } => {
                let dest = git.work_dir().join(path);
                prepare_for_copy(&dest)?;
                cc.get_file(&format!("{path}@@{version}"), &dest)?;
                git.add_file(path)?;
            }
            Change::Delete { path, .. } => {
                if !git.work_dir().join(path).exists() {
                    log::warn!("file marked for deletion is not in the git work area: {path}");
                    return Ok(());
                }
                git.remove_file(path)?;
            }
        }
        Ok(())
    }
}

/// An ordered group of changes sharing user and comment, committed to the
/// tracking branch as a single commit dated at its last record.
#[derive(Debug, Clone, PartialEq)]
pub struct ChangeSet {
    pub user: String,
    pub comment: String,
    pub changes: Vec<Change>,
}

impl ChangeSet {
    pub fn new(user: &str, comment: &str) -> Self {
        Self {
            user: user.to_string(),
            comment: comment.to_string(),
            changes: Vec::new(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.changes.is_empty()
    }

    pub fn push(&mut self, change: Change) {
        self.changes.push(change);
    }

    /// First comment line, for log output.
    pub fn summary(&self) -> &str {
        self.comment.lines().next().unwrap_or("").trim()
    }

    pub fn paths(&self) -> Vec<&str> {
        self.changes.iter().map(Change::path).collect()
    }

    fn time(&self) -> Option<NaiveDateTime> {
        self.changes.last().map(Change::time)
    }

    /// Stage every change in order and commit with the originating user's
    /// identity. Returns `None` when staging produced no net change.
    pub fn commit_to_git(
        &self,
        git: &GitRepo,
        cc: &ClearcaseView,
        users: &UserMap,
    ) -> Result<Option<String>, BridgeError> {
        let Some(time) = self.time() else {
            return Ok(None);
        };
        for change in &self.changes {
            change.stage(git, cc)?;
        }

        let user = users.resolve(&self.user);
        let identity = CommitIdentity {
            name: user.name,
            email: user.email,
            date: time,
        };
        let comment = if self.comment.trim().is_empty() {
            EMPTY_COMMENT
        } else {
            &self.comment
        };

        match git.commit(comment, &identity) {
            Ok(id) => {
                log::info!(
                    "committed change [{}] -> {:.7}",
                    self.summary(),
                    id
                );
                Ok(Some(id))
            }
            Err(GitError::NothingToCommit) => {
                log::info!("nothing new to commit [{}]", self.summary());
                Ok(None)
            }
            Err(err) => Err(err.into()),
        }
    }
}

/// Partition a newest-first history stream into ordered change-sets,
/// oldest first.
///
/// File check-ins split on a `(user, comment)` change; uncatalog directory
/// check-ins carry no meaningful comment and split when the gap to the
/// previous record exceeds the coalescence window. Everything else is
/// discarded.
pub fn classify(history: &[HistoryRecord], window: Duration) -> Vec<ChangeSet> {
    let mut sets = Vec::new();
    let Some(first) = history.last() else {
        return sets;
    };

    let mut current = ChangeSet::new(&first.user, &first.comment);
    let mut prev_user = first.user.clone();
    let mut prev_comment = first.comment.clone();
    let mut prev_time = first.time;

    for record in history.iter().rev() {
        match record.op {
            RecordOp::CheckinVersion => {
                if record.user != prev_user || record.comment != prev_comment {
                    close(&mut sets, &mut current, record);
                }
                current.push(Change::Modify {
                    time: record.time,
                    path: record.path.clone(),
                    version: record.version.clone(),
                });
            }
            RecordOp::CheckinDirectory if record.comment.starts_with(UNCATALOGED_PREFIX) => {
                let Some(target) = uncataloged_target(&record.comment) else {
                    log::warn!(
                        "uncatalog record without a quoted element name: {}",
                        record.comment
                    );
                    continue;
                };
                if record.time - prev_time > window {
                    close(&mut sets, &mut current, record);
                }
                current.push(Change::Delete {
                    time: record.time,
                    path: join_path(&record.path, target),
                });
            }
            RecordOp::CheckinDirectory => continue,
        }
        prev_user = record.user.clone();
        prev_comment = record.comment.clone();
        prev_time = record.time;
    }

    if !current.is_empty() {
        sets.push(current);
    }
    sets
}

fn close(sets: &mut Vec<ChangeSet>, current: &mut ChangeSet, record: &HistoryRecord) {
    let next = ChangeSet::new(&record.user, &record.comment);
    let previous = std::mem::replace(current, next);
    if !previous.is_empty() {
        log::info!(
            "loading change-set \"{}\" [{}]",
            previous.summary(),
            previous.paths().join(",")
        );
        sets.push(previous);
    }
}

fn join_path(dir: &str, file: &str) -> String {
    if dir.is_empty() || dir == "." {
        file.to_string()
    } else {
        format!("{dir}/{file}")
    }
}

fn prepare_for_copy(dest: &Path) -> io::Result<()> {
    if dest.exists() {
        fs::remove_file(dest)?;
    } else if let Some(parent) = dest.parent() {
        fs::create_dir_all(parent)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(op: RecordOp, stamp: &str, user: &str, path: &str, version: &str, comment: &str) -> HistoryRecord {
        HistoryRecord {
            op,
            time: NaiveDateTime::parse_from_str(stamp, "%Y%m%d.%H%M%S").unwrap(),
            user: user.to_string(),
            path: path.to_string(),
            version: version.to_string(),
            comment: comment.to_string(),
        }
    }

    fn window() -> Duration {
        Duration::seconds(4)
    }

    #[test]
    fn test_classify_empty_history() {
        assert!(classify(&[], window()).is_empty());
    }

    #[test]
    fn test_classify_coalesces_by_user_and_comment() {
        // Newest first, as the adapter returns it.
        let history = vec![
            record(RecordOp::CheckinVersion, "20240115.100003", "alice", "a.c", "/main/3", "fix"),
            record(RecordOp::CheckinVersion, "20240115.100002", "alice", "b.c", "/main/2", "fix"),
            record(
                RecordOp::CheckinDirectory,
                "20240115.100001",
                "alice",
                "dir",
                "/main/7",
                "Uncataloged file element \"old.c\".",
            ),
        ];

        let sets = classify(&history, window());
        assert_eq!(sets.len(), 2);

        assert_eq!(sets[0].user, "alice");
        assert_eq!(
            sets[0].changes,
            vec![Change::Delete {
                time: NaiveDateTime::parse_from_str("20240115.100001", "%Y%m%d.%H%M%S").unwrap(),
                path: "dir/old.c".to_string(),
            }]
        );

        assert_eq!(sets[1].comment, "fix");
        assert_eq!(sets[1].paths(), vec!["b.c", "a.c"]);
    }

    #[test]
    fn test_classify_splits_on_comment_change() {
        let history = vec![
            record(RecordOp::CheckinVersion, "20240115.100002", "alice", "b.c", "/main/2", "other"),
            record(RecordOp::CheckinVersion, "20240115.100001", "alice", "a.c", "/main/3", "fix"),
        ];

        let sets = classify(&history, window());
        assert_eq!(sets.len(), 2);
        assert_eq!(sets[0].comment, "fix");
        assert_eq!(sets[1].comment, "other");
    }

    #[test]
    fn test_classify_splits_on_user_change() {
        let history = vec![
            record(RecordOp::CheckinVersion, "20240115.100002", "bob", "b.c", "/main/2", "fix"),
            record(RecordOp::CheckinVersion, "20240115.100001", "alice", "a.c", "/main/3", "fix"),
        ];

        let sets = classify(&history, window());
        assert_eq!(sets.len(), 2);
        assert_eq!(sets[0].user, "alice");
        assert_eq!(sets[1].user, "bob");
    }

    #[test]
    fn test_classify_buckets_deletes_by_time_gap() {
        let uncatalog = |stamp: &str, name: &str| {
            record(
                RecordOp::CheckinDirectory,
                stamp,
                "alice",
                "dir",
                "/main/7",
                &format!("Uncataloged file element \"{name}\"."),
            )
        };
        let history = vec![
            uncatalog("20240115.100010", "late.c"),
            uncatalog("20240115.100002", "b.c"),
            uncatalog("20240115.100001", "a.c"),
        ];

        let sets = classify(&history, window());
        assert_eq!(sets.len(), 2);
        assert_eq!(sets[0].paths(), vec!["dir/a.c", "dir/b.c"]);
        assert_eq!(sets[1].paths(), vec!["dir/late.c"]);
    }

    #[test]
    fn test_classify_discards_plain_directory_checkins() {
        let history = vec![
            record(RecordOp::CheckinVersion, "20240115.100002", "alice", "a.c", "/main/3", "fix"),
            record(RecordOp::CheckinDirectory, "20240115.100001", "alice", "dir", "/main/7", "added stuff"),
        ];

        let sets = classify(&history, window());
        assert_eq!(sets.len(), 1);
        assert_eq!(sets[0].paths(), vec!["a.c"]);
    }

    #[test]
    fn test_no_record_is_duplicated_across_sets() {
        let history = vec![
            record(RecordOp::CheckinVersion, "20240115.100004", "bob", "d.c", "/main/1", "more"),
            record(RecordOp::CheckinVersion, "20240115.100003", "alice", "c.c", "/main/1", "fix"),
            record(RecordOp::CheckinVersion, "20240115.100002", "alice", "b.c", "/main/2", "fix"),
            record(RecordOp::CheckinVersion, "20240115.100001", "alice", "a.c", "/main/3", "fix"),
        ];

        let sets = classify(&history, window());
        let total: usize = sets.iter().map(|s| s.changes.len()).sum();
        assert_eq!(total, history.len());
        assert_eq!(sets.len(), 2);
        assert_eq!(sets[0].paths(), vec!["a.c", "b.c", "c.c"]);
        assert_eq!(sets[1].paths(), vec!["d.c"]);
    }
}
