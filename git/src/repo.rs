use std::path::{Path, PathBuf};

use chrono::NaiveDateTime;
use gitcc_exec as exec;

use crate::error::GitError;
use crate::models::{
    parse_log_records, parse_name_status, CommitDiff, CommitIdentity, LogEntry, DATE_FORMAT,
};

/// Typed facade over the `git` command-line tool, rooted at one working
/// directory.
#[derive(Debug, Clone)]
pub struct GitRepo {
    work_dir: PathBuf,
}

impl GitRepo {
    pub fn at(work_dir: impl Into<PathBuf>) -> Self {
        Self {
            work_dir: work_dir.into(),
        }
    }

    pub fn work_dir(&self) -> &Path {
        &self.work_dir
    }

    /// The repository metadata directory (`.git`).
    pub fn metadata_dir(&self) -> PathBuf {
        self.work_dir.join(".git")
    }

    pub fn exists(&self) -> bool {
        self.metadata_dir().exists()
    }

    pub fn init(&self, initial_branch: &str) -> Result<(), GitError> {
        std::fs::create_dir_all(&self.work_dir)?;
        self.git(&["init", "-b", initial_branch])?;
        Ok(())
    }

    fn git(&self, args: &[&str]) -> Result<String, GitError> {
        Ok(exec::run("git", args, &self.work_dir, None)?)
    }

    // Refs ------------------------------------------------------------------

    pub fn branch_head(&self, refname: &str) -> Result<String, GitError> {
        Ok(self
            .git(&["show", "-s", "--format=%H", refname])?
            .trim()
            .to_string())
    }

    fn branch_exists(&self, branch: &str) -> Result<bool, GitError> {
        let refname = format!("refs/heads/{branch}");
        let output = exec::run_unchecked(
            "git",
            &["rev-parse", "--verify", "--quiet", &refname],
            &self.work_dir,
            None,
        )?;
        Ok(output.status.success())
    }

    /// Check out a branch, creating it at HEAD when it does not exist yet.
    pub fn checkout(&self, branch: &str) -> Result<(), GitError> {
        if self.branch_exists(branch)? {
            self.git(&["checkout", branch])?;
        } else {
            self.git(&["checkout", "-b", branch])?;
        }
        Ok(())
    }

    pub fn reset_hard(&self, refname: &str) -> Result<(), GitError> {
        self.git(&["reset", "--hard", refname])?;
        Ok(())
    }

    /// Check out each branch in turn and hard-reset it to its target.
    pub fn reset_branches(&self, targets: &[(&str, &str)]) -> Result<(), GitError> {
        for (branch, target) in targets {
            self.checkout(branch)?;
            self.reset_hard(target)?;
        }
        Ok(())
    }

    /// Place or move a lightweight tag.
    pub fn set_tag(&self, name: &str, refname: &str) -> Result<(), GitError> {
        self.git(&["tag", "-f", name, refname])?;
        Ok(())
    }

    pub fn remove_tag(&self, name: &str) -> Result<(), GitError> {
        self.git(&["tag", "-d", name])?;
        Ok(())
    }

    pub fn tag_exists(&self, name: &str) -> Result<bool, GitError> {
        let refname = format!("refs/tags/{name}");
        let output = exec::run_unchecked(
            "git",
            &["rev-parse", "--verify", "--quiet", &refname],
            &self.work_dir,
            None,
        )?;
        Ok(output.status.success())
    }

    // Staging ---------------------------------------------------------------

    /// Force-add a path. Tolerates a non-zero exit so that re-adding an
    /// already-tracked file never aborts an ingest.
    pub fn add_file(&self, path: &str) -> Result<(), GitError> {
        let output = exec::run_unchecked("git", &["add", "-f", path], &self.work_dir, None)?;
        if !output.status.success() {
            log::debug!("git add {path} exited non-zero (tolerated)");
        }
        Ok(())
    }

    pub fn remove_file(&self, path: &str) -> Result<(), GitError> {
        self.git(&["rm", path])?;
        Ok(())
    }

    fn has_staged_changes(&self) -> Result<bool, GitError> {
        let output =
            exec::run_unchecked("git", &["diff", "--cached", "--quiet"], &self.work_dir, None)?;
        Ok(!output.status.success())
    }

    /// Commit the index with the given identity as both author and
    /// committer. Returns the new head id, or `NothingToCommit` when the
    /// index holds no staged change.
    pub fn commit(&self, msg: &str, identity: &CommitIdentity) -> Result<String, GitError> {
        if !self.has_staged_changes()? {
            return Err(GitError::NothingToCommit);
        }
        exec::run(
            "git",
            &["commit", "-m", msg],
            &self.work_dir,
            Some(&identity.env()),
        )?;
        self.branch_head("HEAD")
    }

    // Introspection ---------------------------------------------------------

    /// All tracked files at HEAD, relative forward-slash paths.
    pub fn tracked_files(&self) -> Result<Vec<String>, GitError> {
        let output = self.git(&["ls-files"])?;
        Ok(output
            .lines()
            .map(str::trim)
            .filter(|l| !l.is_empty())
            .map(Into::into)
            .collect())
    }

    /// Path-level diff of one commit against its first parent, with rename
    /// detection.
    pub fn commit_diffs(&self, id: &str) -> Result<Vec<CommitDiff>, GitError> {
        let range = format!("{id}^..{id}");
        let raw = self.git(&["diff", "--name-status", "-M", "-z", &range])?;
        parse_name_status(&raw)
    }

    /// Raw blob content of a path at a commit.
    pub fn blob(&self, id: &str, path: &str) -> Result<Vec<u8>, GitError> {
        let object = format!("{id}:{path}");
        Ok(exec::run_bytes(
            "git",
            &["cat-file", "blob", &object],
            &self.work_dir,
            None,
        )?)
    }

    pub fn commit_message(&self, id: &str) -> Result<String, GitError> {
        Ok(self
            .git(&["show", "-s", "--format=%B", id])?
            .trim()
            .to_string())
    }

    /// Author date of a ref, as a naive local timestamp.
    pub fn commit_date(&self, refname: &str) -> Result<NaiveDateTime, GitError> {
        let raw = self.git(&["show", "-s", "--format=%ai", refname])?;
        let raw = raw.trim();
        let stamp = raw
            .get(..19)
            .ok_or_else(|| GitError::Parse(format!("malformed date '{raw}'")))?;
        NaiveDateTime::parse_from_str(stamp, DATE_FORMAT)
            .map_err(|err| GitError::Parse(format!("malformed date '{stamp}': {err}")))
    }

    pub fn author_name(&self, id: &str) -> Result<String, GitError> {
        Ok(self.git(&["show", "-s", "--format=%an", id])?.trim().to_string())
    }

    pub fn author_email(&self, id: &str) -> Result<String, GitError> {
        Ok(self.git(&["show", "-s", "--format=%ae", id])?.trim().to_string())
    }

    // Merging ---------------------------------------------------------------

    pub fn merge_commit_ff(&self, id: &str, msg: &str) -> Result<(), GitError> {
        self.git(&["merge", "--ff", "--commit", "-m", msg, id])?;
        Ok(())
    }

    pub fn merge_commit_no_ff(&self, id: &str, msg: &str) -> Result<(), GitError> {
        self.git(&["merge", "--no-ff", "--commit", "-m", msg, id])?;
        Ok(())
    }

    pub fn merge_abort(&self) -> Result<(), GitError> {
        self.git(&["merge", "--abort"])?;
        Ok(())
    }

    // Remote ----------------------------------------------------------------

    pub fn fetch(&self, remote: &str) -> Result<(), GitError> {
        self.git(&["fetch", remote])?;
        Ok(())
    }

    pub fn pull_rebase(&self) -> Result<(), GitError> {
        self.git(&["pull", "--rebase"])?;
        Ok(())
    }

    pub fn push(&self, remote: &str, branch: &str) -> Result<(), GitError> {
        self.git(&["push", remote, branch])?;
        Ok(())
    }

    // History ---------------------------------------------------------------

    /// Structured first-parent log of `from..to`, oldest first.
    pub fn log_between(&self, from: &str, to: &str) -> Result<Vec<LogEntry>, GitError> {
        let range = format!("{from}..{to}");
        let raw = self.git(&[
            "log",
            "-z",
            "--first-parent",
            "--reverse",
            "--format=%x01%H%x02%s%x02%b",
            &range,
        ])?;
        Ok(parse_log_records(&raw))
    }

    /// Commit ids of `from..to`, first-parent only, oldest first.
    pub fn commits_between(&self, from: &str, to: &str) -> Result<Vec<String>, GitError> {
        let range = format!("{from}..{to}");
        let raw = self.git(&["log", "--first-parent", "--reverse", "--format=%H", &range])?;
        Ok(raw
            .lines()
            .map(str::trim)
            .filter(|l| !l.is_empty())
            .map(Into::into)
            .collect())
    }
}
