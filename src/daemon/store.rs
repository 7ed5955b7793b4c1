//! Fingerprint store
//!
//! Semicolon-separated CSV tables holding one fingerprint per known access
//! point, grouped per script. The on-disk layout is
//! `<root>/<script name>/<script hash>/<ssid>.csv`, so editing the script
//! starts a fresh set of tables while the old ones stay around for
//! inspection.

use crate::{ApWatchError, Result};

use chrono::Local;
use sha2::{Digest, Sha256};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Column holding the script output, used as the table key.
pub const OUTPUT_COLUMN: &str = "output";
/// Column holding the first time the fingerprint was seen.
pub const CREATION_DATE_COLUMN: &str = "creation_date";
/// Column holding the last time the fingerprint was seen.
pub const LAST_DATE_COLUMN: &str = "last_date";

const COLUMNS: [&str; 3] = [OUTPUT_COLUMN, CREATION_DATE_COLUMN, LAST_DATE_COLUMN];
const SEPARATOR: char = ';';
const DATE_FORMAT: &str = "%d/%m/%Y %H h %M min %S sec";

/// Replace path-hostile characters so a name can be used as a file name.
fn sanitize(name: &str) -> String {
    name.chars()
        .map(|c| match c {
            '.' => '_',
            '/' => '-',
            c => c,
        })
        .collect()
}

fn timestamp() -> String {
    Local::now().format(DATE_FORMAT).to_string()
}

/// Per-script store of fingerprint tables.
#[derive(Debug, Clone)]
pub struct FingerprintStore {
    directory: PathBuf,
}

impl FingerprintStore {
    /// Create a store for one script, identified by its name and the
    /// SHA-256 of its text.
    pub fn new<P: AsRef<Path>>(root: P, script_name: &str, script_text: &str) -> Self {
        let mut hasher = Sha256::new();
        hasher.update(script_text.as_bytes());
        let script_hash = hex::encode(hasher.finalize());

        Self {
            directory: root
                .as_ref()
                .join(sanitize(script_name))
                .join(script_hash),
        }
    }

    /// Directory holding this script's tables.
    pub fn directory(&self) -> &Path {
        &self.directory
    }

    /// Open (or create) the table for one network name.
    pub fn open_table(&self, ssid: &str) -> Result<FingerprintTable> {
        fs::create_dir_all(&self.directory)?;
        let path = self.directory.join(format!("{}.csv", sanitize(ssid)));
        FingerprintTable::open(path)
    }
}

/// One CSV table, loaded in memory and rewritten on every change.
#[derive(Debug)]
pub struct FingerprintTable {
    path: PathBuf,
    rows: Vec<Vec<String>>,
}

impl FingerprintTable {
    fn open(path: PathBuf) -> Result<Self> {
        let mut table = Self {
            path,
            rows: Vec::new(),
        };

        if table.path.exists() {
            table.load()?;
        } else {
            table.save()?;
        }

        Ok(table)
    }

    /// File the table is persisted to.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Number of stored fingerprints.
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// True when no fingerprint is stored yet.
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Find the row whose output column equals `output`.
    pub fn lookup(&self, output: &str) -> Option<usize> {
        self.rows.iter().position(|row| row[0] == output)
    }

    /// Read one cell by row index and column name.
    pub fn get_cell(&self, row: usize, column: &str) -> Result<&str> {
        let index = COLUMNS
            .iter()
            .position(|c| *c == column)
            .ok_or_else(|| ApWatchError::Store(format!("Unknown column '{}'", column)))?;
        let row = self
            .rows
            .get(row)
            .ok_or_else(|| ApWatchError::Store(format!("Row {} out of range", row)))?;
        Ok(&row[index])
    }

    /// Record a new fingerprint, stamping both date columns with now.
    pub fn add_entry(&mut self, output: &str) -> Result<()> {
        if self.lookup(output).is_some() {
            return Err(ApWatchError::Store(format!(
                "Duplicate entry '{}'",
                output
            )));
        }
        check_cell(output)?;

        let now = timestamp();
        self.rows.push(vec![output.to_string(), now.clone(), now]);
        self.save()
    }

    /// Refresh the last-seen date of an existing fingerprint.
    pub fn refresh_entry(&mut self, row: usize) -> Result<()> {
        let row = self
            .rows
            .get_mut(row)
            .ok_or_else(|| ApWatchError::Store(format!("Row {} out of range", row)))?;
        row[2] = timestamp();
        self.save()
    }

    fn load(&mut self) -> Result<()> {
        let content = fs::read_to_string(&self.path)?;
        let mut lines = content.lines();

        let header = lines
            .next()
            .ok_or_else(|| ApWatchError::Store("Missing table header".to_string()))?;
        let expected = COLUMNS.join(&SEPARATOR.to_string());
        if header != expected {
            return Err(ApWatchError::Store(format!(
                "Bad table header '{}' in {}",
                header,
                self.path.display()
            )));
        }

        self.rows.clear();
        for line in lines {
            if line.is_empty() {
                continue;
            }
            let cells: Vec<String> = line.split(SEPARATOR).map(str::to_string).collect();
            if cells.len() != COLUMNS.len() {
                return Err(ApWatchError::Store(format!(
                    "Malformed row '{}' in {}",
                    line,
                    self.path.display()
                )));
            }
            self.rows.push(cells);
        }

        Ok(())
    }

    fn save(&self) -> Result<()> {
        let mut content = COLUMNS.join(&SEPARATOR.to_string());
        content.push('\n');
        for row in &self.rows {
            content.push_str(&row.join(&SEPARATOR.to_string()));
            content.push('\n');
        }

        fs::write(&self.path, content)?;
        debug!(path = %self.path.display(), rows = self.rows.len(), "Saved table");
        Ok(())
    }
}

fn check_cell(value: &str) -> Result<()> {
    if value.contains(SEPARATOR) || value.contains('\n') {
        return Err(ApWatchError::Store(format!(
            "Value '{}' contains a reserved character",
            value
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store(root: &Path) -> FingerprintStore {
        FingerprintStore::new(root, "fingerprint.aws", "Sha256 {\n>ssid\n}\n")
    }

    #[test]
    fn test_directory_layout() {
        let store = store(Path::new("/var/lib/apwatch"));
        let dir = store.directory().to_string_lossy().into_owned();
        assert!(dir.starts_with("/var/lib/apwatch/fingerprint_aws/"));
        // Script hash component is a full SHA-256 in hex.
        assert_eq!(dir.rsplit('/').next().unwrap().len(), 64);
    }

    #[test]
    fn test_script_change_starts_fresh_tables() {
        let a = FingerprintStore::new("/tmp/s", "f.aws", "one");
        let b = FingerprintStore::new("/tmp/s", "f.aws", "two");
        assert_ne!(a.directory(), b.directory());
    }

    #[test]
    fn test_add_and_lookup() {
        let root = tempfile::tempdir().unwrap();
        let mut table = store(root.path()).open_table("Home").unwrap();

        assert!(table.is_empty());
        table.add_entry("abc123").unwrap();
        assert_eq!(table.len(), 1);
        assert_eq!(table.lookup("abc123"), Some(0));
        assert_eq!(table.lookup("missing"), None);
        assert_eq!(table.get_cell(0, OUTPUT_COLUMN).unwrap(), "abc123");
    }

    #[test]
    fn test_duplicate_entry_is_rejected() {
        let root = tempfile::tempdir().unwrap();
        let mut table = store(root.path()).open_table("Home").unwrap();

        table.add_entry("abc123").unwrap();
        assert!(matches!(
            table.add_entry("abc123"),
            Err(ApWatchError::Store(_))
        ));
    }

    #[test]
    fn test_entries_survive_reopen() {
        let root = tempfile::tempdir().unwrap();
        let store = store(root.path());

        let mut table = store.open_table("Home").unwrap();
        table.add_entry("abc123").unwrap();
        table.add_entry("def456").unwrap();

        let reopened = store.open_table("Home").unwrap();
        assert_eq!(reopened.len(), 2);
        assert_eq!(reopened.lookup("def456"), Some(1));
    }

    #[test]
    fn test_refresh_updates_last_date_only() {
        let root = tempfile::tempdir().unwrap();
        let mut table = store(root.path()).open_table("Home").unwrap();

        table.add_entry("abc123").unwrap();
        let created = table.get_cell(0, CREATION_DATE_COLUMN).unwrap().to_string();
        table.refresh_entry(0).unwrap();
        assert_eq!(table.get_cell(0, CREATION_DATE_COLUMN).unwrap(), created);
        // Same-second refresh keeps the same rendered date; the cell must
        // still parse as one.
        assert!(table
            .get_cell(0, LAST_DATE_COLUMN)
            .unwrap()
            .contains(" h "));
    }

    #[test]
    fn test_reserved_characters_rejected() {
        let root = tempfile::tempdir().unwrap();
        let mut table = store(root.path()).open_table("Home").unwrap();
        assert!(matches!(
            table.add_entry("a;b"),
            Err(ApWatchError::Store(_))
        ));
    }

    #[test]
    fn test_unknown_column_is_an_error() {
        let root = tempfile::tempdir().unwrap();
        let mut table = store(root.path()).open_table("Home").unwrap();
        table.add_entry("abc123").unwrap();
        assert!(matches!(
            table.get_cell(0, "vendor"),
            Err(ApWatchError::Store(_))
        ));
    }

    #[test]
    fn test_ssid_with_slash_is_sanitized() {
        let root = tempfile::tempdir().unwrap();
        let table = store(root.path()).open_table("guest/5G").unwrap();
        assert!(table
            .path()
            .file_name()
            .unwrap()
            .to_string_lossy()
            .contains("guest-5G"));
    }
}
