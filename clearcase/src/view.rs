use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use chrono::NaiveDateTime;
use gitcc_exec as exec;
use once_cell::sync::Lazy;
use regex::Regex;

use crate::error::CcError;
use crate::models::{HistoryRecord, HISTORY_FORMAT, SINCE_FORMAT};

static VERSION_LINE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^version\s+(.+?)@@(\S+)").unwrap());

/// Typed facade over the `cleartool` command-line tool, rooted at one
/// snapshot-view directory.
#[derive(Debug, Clone)]
pub struct ClearcaseView {
    view_root: PathBuf,
    includes: Vec<String>,
    branches: Vec<String>,
    recursive: bool,
}

impl ClearcaseView {
    pub fn new(
        view_root: impl Into<PathBuf>,
        includes: Vec<String>,
        branches: Vec<String>,
        recursive: bool,
    ) -> Self {
        let includes = includes.into_iter().filter(|i| !i.is_empty()).collect();
        Self {
            view_root: view_root.into(),
            includes,
            branches,
            recursive,
        }
    }

    pub fn view_root(&self) -> &Path {
        &self.view_root
    }

    fn cleartool(&self, args: &[&str]) -> Result<String, CcError> {
        Ok(exec::run("cleartool", args, &self.view_root, None)?)
    }

    // View state ------------------------------------------------------------

    /// Dry-run update: true when an update would change any working file.
    pub fn need_update(&self) -> Result<bool, CcError> {
        let logfile = tempfile::NamedTempFile::new()?;
        let logpath = logfile.path().to_string_lossy().to_string();
        self.cleartool(&["update", "-print", "-overwrite", "-log", &logpath])?;
        let buf = fs::read_to_string(logfile.path())?;
        Ok(buf.lines().any(|line| line.starts_with("Updated:")))
    }

    pub fn update(&self) -> Result<(), CcError> {
        self.cleartool(&["update", "-overwrite"])?;
        Ok(())
    }

    /// Every versioned file under the include list, mapped to its version.
    pub fn file_versions(&self) -> Result<HashMap<String, String>, CcError> {
        let mut args = vec!["ls", "-long", "-vob"];
        if self.recursive {
            args.push("-recurse");
        }
        args.extend(self.includes.iter().map(String::as_str));
        let raw = self.cleartool(&args)?.replace('\\', "/");
        Ok(parse_version_listing(&raw))
    }

    /// Check-in records since a timestamp, filtered to the tracked branches
    /// and the include list, newest first.
    pub fn history_since(&self, since: &NaiveDateTime) -> Result<Vec<HistoryRecord>, CcError> {
        let stamp = since.format(SINCE_FORMAT).to_string();
        let mut args = vec!["lsh", "-fmt", HISTORY_FORMAT];
        if self.recursive {
            args.push("-recurse");
        }
        args.push("-since");
        args.push(&stamp);
        args.extend(self.includes.iter().map(String::as_str));
        let raw = self.cleartool(&args)?.replace('\\', "/");
        Ok(raw
            .lines()
            .filter_map(|line| HistoryRecord::parse(line, &self.branches))
            .collect())
    }

    // Element operations ----------------------------------------------------

    /// Reserve an element for modification. Contention fails loudly.
    pub fn checkout(&self, path: &str) -> Result<(), CcError> {
        self.cleartool(&["co", "-reserved", "-nc", path])?;
        Ok(())
    }

    pub fn undo_checkout(&self, path: &str) -> Result<(), CcError> {
        self.cleartool(&["unco", "-rm", path])?;
        Ok(())
    }

    pub fn checkin(&self, path: &str, comment: &str) -> Result<(), CcError> {
        self.cleartool(&["ci", "-identical", "-c", comment, path])?;
        Ok(())
    }

    /// Copy a versioned element (`path@@version`) out of the vob, clearing
    /// the read-only bit on the copy.
    pub fn get_file(&self, versioned: &str, dest: &Path) -> Result<(), CcError> {
        if dest.exists() {
            fs::remove_file(dest)?;
        }
        let dest_str = dest.to_string_lossy().to_string();
        self.cleartool(&["get", "-to", &dest_str, versioned])?;
        let mut perms = fs::metadata(dest)?.permissions();
        perms.set_readonly(false);
        fs::set_permissions(dest, perms)?;
        Ok(())
    }

    pub fn add_directory(&self, path: &str) -> Result<(), CcError> {
        self.cleartool(&["mkelem", "-nc", "-eltype", "directory", path])?;
        Ok(())
    }

    pub fn add_file(&self, path: &str) -> Result<(), CcError> {
        self.cleartool(&["mkelem", "-nc", path])?;
        Ok(())
    }

    pub fn remove_file(&self, path: &str) -> Result<(), CcError> {
        self.cleartool(&["rm", path])?;
        Ok(())
    }

    pub fn move_file(&self, src: &str, dst: &str) -> Result<(), CcError> {
        self.cleartool(&["mv", "-nc", src, dst])?;
        Ok(())
    }

    // Config spec -----------------------------------------------------------

    pub fn cat_cs(&self) -> Result<String, CcError> {
        self.cleartool(&["catcs"])
    }

    pub fn set_cs(&self, spec_file: &Path) -> Result<(), CcError> {
        let spec = spec_file.to_string_lossy().to_string();
        self.cleartool(&["setcs", &spec])?;
        Ok(())
    }
}

/// Parse `ls -long` output: lines starting `version ` carry
/// `<path>@@<version>`; leading `./` is dropped.
fn parse_version_listing(raw: &str) -> HashMap<String, String> {
    let mut versions = HashMap::new();
    for line in raw.lines() {
        let Some(caps) = VERSION_LINE.captures(line) else {
            if line.starts_with("version ") {
                log::error!("no version format: {line}");
            }
            continue;
        };
        let path = caps[1].trim_start_matches("./").to_string();
        versions.insert(path, caps[2].to_string());
    }
    versions
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_version_listing() {
        let raw = "\
version        ./a/b.txt@@/main/2                     Rule: /main/LATEST
version        c.txt@@/main/1                         Rule: /main/LATEST
directory version dir@@/main/3
some unrelated line
";
        let versions = parse_version_listing(raw);
        assert_eq!(versions.len(), 2);
        assert_eq!(versions["a/b.txt"], "/main/2");
        assert_eq!(versions["c.txt"], "/main/1");
    }

    #[test]
    fn test_parse_version_listing_keeps_spaced_paths() {
        let raw = "version        ./some dir/file name.txt@@/main/4\n";
        let versions = parse_version_listing(raw);
        assert_eq!(versions["some dir/file name.txt"], "/main/4");
    }

    #[test]
    fn test_includes_drop_empty_entries() {
        let view = ClearcaseView::new("/view", vec!["".to_string()], vec![], true);
        assert!(view.includes.is_empty());
    }
}
