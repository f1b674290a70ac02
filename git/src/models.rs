use chrono::NaiveDateTime;
use gitcc_exec::EnvOverlay;
use serde::{Deserialize, Serialize};

use crate::error::GitError;

/// Record separator in structured `git log` output (`%x01` in the format).
pub const RECORD_SEP: char = '\u{1}';
/// Field separator within a structured log record (`%x02` in the format).
pub const FIELD_SEP: char = '\u{2}';
/// Entry terminator appended by the `-z` flag.
pub const ENTRY_SEP: char = '\0';

/// Date layout passed to git via the identity overlay and read back from
/// `%ai` output (offset stripped).
pub const DATE_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// One path-level entry of a commit's `diff --name-status -M -z` output.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum CommitDiff {
    Modified { path: String },
    Added { path: String },
    Deleted { path: String },
    Renamed { src: String, dst: String },
}

/// One commit of a structured first-parent log, subject and body joined.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogEntry {
    pub id: String,
    pub message: String,
}

/// Author and committer identity for a single commit, applied as an env
/// overlay on the `git commit` invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommitIdentity {
    pub name: String,
    pub email: String,
    pub date: NaiveDateTime,
}

impl CommitIdentity {
    pub fn env(&self) -> EnvOverlay {
        let date = self.date.format(DATE_FORMAT).to_string();
        let mut env = EnvOverlay::new();
        for key in ["GIT_AUTHOR_NAME", "GIT_COMMITTER_NAME"] {
            env.insert(key.to_string(), self.name.clone());
        }
        for key in ["GIT_AUTHOR_EMAIL", "GIT_COMMITTER_EMAIL"] {
            env.insert(key.to_string(), self.email.clone());
        }
        for key in ["GIT_AUTHOR_DATE", "GIT_COMMITTER_DATE"] {
            env.insert(key.to_string(), date.clone());
        }
        env
    }
}

/// Parse the NUL-separated `--name-status -M -z` stream. Rename entries
/// carry a status token plus two paths; everything else one path.
pub fn parse_name_status(raw: &str) -> Result<Vec<CommitDiff>, GitError> {
    let mut tokens = raw.split(ENTRY_SEP).filter(|t| !t.is_empty());
    let mut diffs = Vec::new();

    while let Some(status) = tokens.next() {
        let symbol = status
            .chars()
            .next()
            .ok_or_else(|| GitError::Parse("empty diff status token".to_string()))?;
        let path = tokens
            .next()
            .ok_or_else(|| GitError::Parse(format!("missing path after status '{status}'")))?
            .to_string();

        match symbol {
            'M' => diffs.push(CommitDiff::Modified { path }),
            'A' => diffs.push(CommitDiff::Added { path }),
            'D' => diffs.push(CommitDiff::Deleted { path }),
            'R' => {
                let dst = tokens
                    .next()
                    .ok_or_else(|| {
                        GitError::Parse(format!("rename of '{path}' missing destination"))
                    })?
                    .to_string();
                diffs.push(CommitDiff::Renamed { src: path, dst });
            }
            other => {
                return Err(GitError::Parse(format!(
                    "unknown status '{other}' on file '{path}'"
                )))
            }
        }
    }

    Ok(diffs)
}

/// Parse the `%x01%H%x02%s%x02%b` + `-z` structured log stream into
/// oldest-first entries. An empty body collapses to the subject alone.
pub fn parse_log_records(raw: &str) -> Vec<LogEntry> {
    raw.split(RECORD_SEP)
        .filter_map(|record| {
            let record = record.trim_matches(ENTRY_SEP);
            if record.is_empty() {
                return None;
            }

            let mut fields = record.splitn(3, FIELD_SEP);
            let id = fields.next()?.trim().to_string();
            if id.is_empty() {
                return None;
            }
            let subject = fields.next().unwrap_or("").trim_end();
            let body = fields
                .next()
                .unwrap_or("")
                .trim_matches(|c| c == '\n' || c == ENTRY_SEP);

            let message = if body.is_empty() {
                subject.to_string()
            } else {
                format!("{subject}\n{body}")
            };

            Some(LogEntry {
                id,
                message: message.trim_matches('\n').to_string(),
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_name_status_plain() {
        let raw = "M\0a/b.txt\0A\0newdir/file.txt\0D\0gone.c\0";
        let diffs = parse_name_status(raw).unwrap();
        assert_eq!(
            diffs,
            vec![
                CommitDiff::Modified {
                    path: "a/b.txt".to_string()
                },
                CommitDiff::Added {
                    path: "newdir/file.txt".to_string()
                },
                CommitDiff::Deleted {
                    path: "gone.c".to_string()
                },
            ]
        );
    }

    #[test]
    fn test_parse_name_status_rename_has_three_fields() {
        let raw = "R100\0src/a.txt\0lib/a.txt\0";
        let diffs = parse_name_status(raw).unwrap();
        assert_eq!(
            diffs,
            vec![CommitDiff::Renamed {
                src: "src/a.txt".to_string(),
                dst: "lib/a.txt".to_string(),
            }]
        );
    }

    #[test]
    fn test_parse_name_status_rejects_unknown_symbol() {
        let err = parse_name_status("X\0weird.txt\0").unwrap_err();
        assert!(matches!(err, GitError::Parse(_)));
    }

    #[test]
    fn test_parse_log_records_subject_only() {
        let raw = "\u{1}abc123\u{2}fix the thing\u{2}\n\0";
        let entries = parse_log_records(raw);
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].id, "abc123");
        assert_eq!(entries[0].message, "fix the thing");
    }

    #[test]
    fn test_parse_log_records_joins_subject_and_body() {
        let raw = "\u{1}abc\u{2}subject\u{2}body line\n\0\u{1}def\u{2}next\u{2}\n\0";
        let entries = parse_log_records(raw);
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].message, "subject\nbody line");
        assert_eq!(entries[1].id, "def");
        assert_eq!(entries[1].message, "next");
    }

    #[test]
    fn test_parse_log_records_empty_stream() {
        assert!(parse_log_records("").is_empty());
    }

    #[test]
    fn test_identity_env_overlay() {
        let identity = CommitIdentity {
            name: "alice".to_string(),
            email: "alice@example.com".to_string(),
            date: NaiveDateTime::parse_from_str("2024-01-15 10:00:00", DATE_FORMAT).unwrap(),
        };
        let env = identity.env();
        assert_eq!(env["GIT_AUTHOR_NAME"], "alice");
        assert_eq!(env["GIT_COMMITTER_EMAIL"], "alice@example.com");
        assert_eq!(env["GIT_COMMITTER_DATE"], "2024-01-15 10:00:00");
    }
}
