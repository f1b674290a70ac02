use chrono::NaiveDateTime;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

/// Field separator in `lsh -fmt` history output (`%x01` in the format).
pub const FIELD_SEP: char = '\u{1}';

/// Format string handed to `cleartool lsh -fmt`. Six fields per line:
/// operation+kind, numeric date, user, element path, version, comment.
pub const HISTORY_FORMAT: &str = "%o%m\u{1}%Nd\u{1}%u\u{1}%En\u{1}%Vn\u{1}%Nc\n";

/// Timestamp layout of the `%Nd` field.
pub const RECORD_TIME_FORMAT: &str = "%Y%m%d.%H%M%S";

/// Timestamp layout accepted by `-since`.
pub const SINCE_FORMAT: &str = "%d-%b-%Y.%H:%M:%S";

/// Comment prefix of a directory check-in that uncataloged a file element.
pub const UNCATALOGED_PREFIX: &str = "Uncataloged file element";

static QUOTED_ELEMENT: Lazy<Regex> = Lazy::new(|| Regex::new(r#""(.+)""#).unwrap());

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RecordOp {
    /// A file element check-in (`checkinversion`).
    CheckinVersion,
    /// A directory element check-in (`checkindirectory version`).
    CheckinDirectory,
}

/// One check-in record of the view's history, as reported by `lsh`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoryRecord {
    pub op: RecordOp,
    pub time: NaiveDateTime,
    pub user: String,
    pub path: String,
    pub version: String,
    pub comment: String,
}

impl HistoryRecord {
    /// Parse one history line. Returns `None` for operations other than
    /// check-ins and for versions outside the tracked branches.
    pub fn parse(line: &str, branches: &[String]) -> Option<HistoryRecord> {
        let mut fields = line.splitn(6, FIELD_SEP);
        let op = fields.next()?;
        let time = fields.next()?;
        let user = fields.next()?;
        let path = fields.next()?;
        let version = fields.next()?;
        let comment = fields.next().unwrap_or("");

        let op = if op == "checkinversion" {
            RecordOp::CheckinVersion
        } else if op.starts_with("checkindirectory") {
            RecordOp::CheckinDirectory
        } else {
            return None;
        };

        if !on_tracked_branch(version, branches) {
            return None;
        }

        let time = NaiveDateTime::parse_from_str(time, RECORD_TIME_FORMAT).ok()?;

        Some(HistoryRecord {
            op,
            time,
            user: user.to_string(),
            path: path.to_string(),
            version: version.to_string(),
            comment: comment.to_string(),
        })
    }
}

/// A version is in scope when it ends in `/<branch>/<int>` for one of the
/// tracked branches.
fn on_tracked_branch(version: &str, branches: &[String]) -> bool {
    let mut parts = version.rsplit('/');
    let number = parts.next().unwrap_or("");
    let branch = parts.next().unwrap_or("");
    number.parse::<u64>().is_ok() && branches.iter().any(|b| b == branch)
}

/// Extract the quoted element name from an uncatalog comment, e.g.
/// `Uncataloged file element "old.c".` yields `old.c`.
pub fn uncataloged_target(comment: &str) -> Option<&str> {
    QUOTED_ELEMENT
        .captures(comment)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn branches() -> Vec<String> {
        vec!["main".to_string()]
    }

    #[test]
    fn test_parse_checkin_version() {
        let line = "checkinversion\u{1}20240115.100003\u{1}alice\u{1}a.c\u{1}/main/3\u{1}fix";
        let record = HistoryRecord::parse(line, &branches()).unwrap();
        assert_eq!(record.op, RecordOp::CheckinVersion);
        assert_eq!(record.user, "alice");
        assert_eq!(record.path, "a.c");
        assert_eq!(record.version, "/main/3");
        assert_eq!(record.comment, "fix");
        assert_eq!(
            record.time,
            NaiveDateTime::parse_from_str("20240115.100003", RECORD_TIME_FORMAT).unwrap()
        );
    }

    #[test]
    fn test_parse_checkin_directory() {
        let line = "checkindirectory version\u{1}20240115.100001\u{1}alice\u{1}dir\u{1}/main/7\u{1}Uncataloged file element \"old.c\".";
        let record = HistoryRecord::parse(line, &branches()).unwrap();
        assert_eq!(record.op, RecordOp::CheckinDirectory);
        assert_eq!(uncataloged_target(&record.comment), Some("old.c"));
    }

    #[test]
    fn test_parse_skips_other_operations() {
        let line = "mkelemversion\u{1}20240115.100003\u{1}alice\u{1}a.c\u{1}/main/0\u{1}";
        assert!(HistoryRecord::parse(line, &branches()).is_none());
    }

    #[test]
    fn test_parse_skips_untracked_branch() {
        let line = "checkinversion\u{1}20240115.100003\u{1}alice\u{1}a.c\u{1}/dev/3\u{1}fix";
        assert!(HistoryRecord::parse(line, &branches()).is_none());
    }

    #[test]
    fn test_parse_requires_integer_version() {
        let line = "checkinversion\u{1}20240115.100003\u{1}alice\u{1}a.c\u{1}/main/CHECKEDOUT\u{1}fix";
        assert!(HistoryRecord::parse(line, &branches()).is_none());
    }

    #[test]
    fn test_uncataloged_target_missing_quotes() {
        assert_eq!(uncataloged_target("Uncataloged file element"), None);
    }
}
