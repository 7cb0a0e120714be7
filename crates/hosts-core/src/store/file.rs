// # File Table Store
//
// Hosts-file implementation of TableStore.
//
// ## File Format
//
// ```text
// # managed by hand
// 127.0.0.1	localhost
// 192.168.1.20	nas
// # 192.168.1.30	old-laptop
// ```
//
// - One `ADDRESS NAME...` record per line; a record with several names
//   becomes one entry per name.
// - A commented-out record (`# ADDRESS NAME`) is a disabled entry.
// - Any other comment, and records whose address cannot be represented
//   (scoped IPv6 such as `fe80::1%lo0`), are kept verbatim and written back
//   above the entries.
// - Inline comments after a record are dropped.
// - Names that would not read back as one field (whitespace, `#`) are
//   refused on save.
//
// ## Writes
//
// - Atomic writes: new content goes to a temporary sibling, then is renamed
//   over the target
// - Backup: the previous file is copied to `<name>.backup` first

use async_trait::async_trait;
use std::net::IpAddr;
use std::path::{Path, PathBuf};
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tokio::sync::RwLock;

use crate::error::{Error, LineError, ParseErrors, Result};
use crate::table::{Entry, Table, is_valid_name};
use crate::traits::TableStore;

/// Hosts-file table store
///
/// # Example
///
/// ```rust,no_run
/// use hosts_core::store::FileTableStore;
/// use hosts_core::traits::TableStore;
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let store = FileTableStore::new("/etc/hosts");
///
///     let mut table = store.load().await?;
///     table.push(hosts_core::Entry::new("nas", "192.168.1.20".parse()?));
///     store.save(&table).await?;
///
///     Ok(())
/// }
/// ```
#[derive(Debug)]
pub struct FileTableStore {
    path: PathBuf,
    /// Non-entry lines seen by the last `load`, written back on `save`
    passthrough: RwLock<Vec<String>>,
}

/// Result of parsing hosts-file content
#[derive(Debug, Default)]
struct ParsedHosts {
    table: Table,
    passthrough: Vec<String>,
}

enum Line<'a> {
    Record(IpAddr, Vec<&'a str>),
    Passthrough,
}

impl FileTableStore {
    /// Create a store for the hosts file at `path`
    ///
    /// Nothing is read until [`load`](TableStore::load) is called.
    pub fn new<P: AsRef<Path>>(path: P) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
            passthrough: RwLock::new(Vec::new()),
        }
    }

    /// Path of the hosts file
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Split one record into address and names
    ///
    /// `Ok(None)` means the text is not a record at all (empty after
    /// stripping an inline comment).
    fn parse_record(text: &str) -> std::result::Result<Option<Line<'_>>, String> {
        let text = text.split('#').next().unwrap_or_default();
        let mut fields = text.split_whitespace();

        let Some(address) = fields.next() else {
            return Ok(None);
        };

        if address.contains('%') {
            return Ok(Some(Line::Passthrough));
        }

        let address: IpAddr = address
            .parse()
            .map_err(|_| format!("invalid address {:?}", address))?;

        let names: Vec<&str> = fields.collect();
        if names.is_empty() {
            return Err(format!("no hostnames for {}", address));
        }

        Ok(Some(Line::Record(address, names)))
    }

    /// Parse hosts-file content, collecting every malformed line
    fn parse(content: &str, origin: &str) -> Result<ParsedHosts> {
        let mut parsed = ParsedHosts::default();
        let mut errors = Vec::new();

        for (index, raw) in content.lines().enumerate() {
            let line = raw.trim();
            if line.is_empty() {
                continue;
            }

            if let Some(commented) = line.strip_prefix('#') {
                match Self::parse_record(commented) {
                    Ok(Some(Line::Record(address, names))) => {
                        for name in names {
                            parsed.table.push(Entry::disabled(name, address));
                        }
                    }
                    _ => parsed.passthrough.push(raw.to_string()),
                }
                continue;
            }

            match Self::parse_record(line) {
                Ok(Some(Line::Record(address, names))) => {
                    for name in names {
                        parsed.table.push(Entry::new(name, address));
                    }
                }
                Ok(Some(Line::Passthrough)) => {
                    tracing::debug!("Keeping scoped address line verbatim: {}", line);
                    parsed.passthrough.push(raw.to_string());
                }
                Ok(None) => {}
                Err(message) => errors.push(LineError {
                    line: index + 1,
                    message,
                }),
            }
        }

        if !errors.is_empty() {
            return Err(Error::Parse(ParseErrors {
                origin: origin.to_string(),
                errors,
            }));
        }

        Ok(parsed)
    }

    /// Render the table and passthrough lines as hosts-file content
    fn render(table: &Table, passthrough: &[String]) -> String {
        let mut out = String::new();
        for line in passthrough {
            out.push_str(line);
            out.push('\n');
        }
        if !passthrough.is_empty() && !table.is_empty() {
            out.push('\n');
        }
        for entry in table {
            if !entry.enabled {
                out.push_str("# ");
            }
            out.push_str(&format!("{}\t{}\n", entry.address, entry.name));
        }
        out
    }

    /// Sibling path with `suffix` appended to the file name
    fn sibling(path: &Path, suffix: &str) -> PathBuf {
        let mut name = path
            .file_name()
            .map(|n| n.to_os_string())
            .unwrap_or_else(|| "hosts".into());
        name.push(suffix);
        path.with_file_name(name)
    }

    fn temp_path(&self) -> PathBuf {
        Self::sibling(&self.path, ".tmp")
    }

    fn backup_path(&self) -> PathBuf {
        Self::sibling(&self.path, ".backup")
    }
}

#[async_trait]
impl TableStore for FileTableStore {
    async fn load(&self) -> Result<Table> {
        if !self.path.exists() {
            tracing::debug!("Hosts file does not exist: {}", self.path.display());
            self.passthrough.write().await.clear();
            return Ok(Table::new());
        }

        let content = fs::read_to_string(&self.path).await.map_err(|e| {
            Error::store(format!(
                "Failed to read hosts file {}: {}",
                self.path.display(),
                e
            ))
        })?;

        let parsed = Self::parse(&content, &self.path.display().to_string())?;
        tracing::debug!(
            "Loaded {} entries ({} passthrough lines) from {}",
            parsed.table.len(),
            parsed.passthrough.len(),
            self.path.display()
        );

        *self.passthrough.write().await = parsed.passthrough;
        Ok(parsed.table)
    }

    async fn save(&self, table: &Table) -> Result<()> {
        if let Some(entry) = table.iter().find(|e| !is_valid_name(&e.name)) {
            return Err(Error::store(format!(
                "Refusing to write {:?} for {} to {}: not a single hosts-file field",
                entry.name,
                entry.address,
                self.path.display()
            )));
        }

        let content = {
            let passthrough = self.passthrough.read().await;
            Self::render(table, &passthrough)
        };

        let temp_path = self.temp_path();
        {
            let mut file = fs::File::create(&temp_path).await.map_err(|e| {
                Error::store(format!(
                    "Failed to create temp file {}: {}",
                    temp_path.display(),
                    e
                ))
            })?;

            file.write_all(content.as_bytes()).await.map_err(|e| {
                Error::store(format!(
                    "Failed to write to temp file {}: {}",
                    temp_path.display(),
                    e
                ))
            })?;

            file.flush().await.map_err(|e| {
                Error::store(format!(
                    "Failed to flush temp file {}: {}",
                    temp_path.display(),
                    e
                ))
            })?;
        }

        if self.path.exists() {
            if let Err(e) = fs::copy(&self.path, self.backup_path()).await {
                tracing::warn!("Failed to create backup of {}: {}", self.path.display(), e);
            }
        }

        fs::rename(&temp_path, &self.path).await.map_err(|e| {
            Error::store(format!(
                "Failed to rename {} to {}: {}",
                temp_path.display(),
                self.path.display(),
                e
            ))
        })?;

        tracing::trace!("Table written to {}", self.path.display());
        Ok(())
    }

    fn store_name(&self) -> &'static str {
        "file"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn ip(s: &str) -> IpAddr {
        s.parse().unwrap()
    }

    #[tokio::test]
    async fn test_missing_file_loads_empty() {
        let dir = tempdir().unwrap();
        let store = FileTableStore::new(dir.path().join("hosts"));

        let table = store.load().await.unwrap();
        assert!(table.is_empty());
    }

    #[tokio::test]
    async fn test_load_parses_entries_and_disabled_lines() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("hosts");
        fs::write(
            &path,
            "# Static table lookup for hostnames.\n\
             127.0.0.1 localhost localhost.localdomain\n\
             \n\
             192.168.1.20\tnas # the big one\n\
             # 192.168.1.30 old-laptop\n\
             fe80::1%lo0 localhost\n\
             ::1 ip6-localhost\n",
        )
        .await
        .unwrap();

        let store = FileTableStore::new(&path);
        let table = store.load().await.unwrap();

        assert_eq!(
            table.entries(),
            &[
                Entry::new("localhost", ip("127.0.0.1")),
                Entry::new("localhost.localdomain", ip("127.0.0.1")),
                Entry::new("nas", ip("192.168.1.20")),
                Entry::disabled("old-laptop", ip("192.168.1.30")),
                Entry::new("ip6-localhost", ip("::1")),
            ]
        );
        assert_eq!(
            *store.passthrough.read().await,
            vec![
                "# Static table lookup for hostnames.".to_string(),
                "fe80::1%lo0 localhost".to_string(),
            ]
        );
    }

    #[tokio::test]
    async fn test_parse_errors_are_aggregated() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("hosts");
        fs::write(
            &path,
            "127.0.0.1 localhost\nnot-an-ip host\n10.0.0.1\n10.0.0.2 fine\n",
        )
        .await
        .unwrap();

        let store = FileTableStore::new(&path);
        match store.load().await {
            Err(Error::Parse(errors)) => {
                let lines: Vec<usize> = errors.errors.iter().map(|e| e.line).collect();
                assert_eq!(lines, vec![2, 3]);
            }
            other => panic!("expected aggregated parse error, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_save_round_trips_and_keeps_backup() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("hosts");
        fs::write(&path, "# keep me\n127.0.0.1 localhost\n").await.unwrap();

        let store = FileTableStore::new(&path);
        let mut table = store.load().await.unwrap();
        table.push(Entry::new("nas", ip("192.168.1.20")));
        table.push(Entry::disabled("printer", ip("192.168.1.40")));
        store.save(&table).await.unwrap();

        let written = fs::read_to_string(&path).await.unwrap();
        assert_eq!(
            written,
            "# keep me\n\n127.0.0.1\tlocalhost\n192.168.1.20\tnas\n# 192.168.1.40\tprinter\n"
        );

        let backup = fs::read_to_string(store.backup_path()).await.unwrap();
        assert_eq!(backup, "# keep me\n127.0.0.1 localhost\n");
        assert!(!store.temp_path().exists());

        let reloaded = FileTableStore::new(&path).load().await.unwrap();
        assert_eq!(reloaded, table);
    }

    #[tokio::test]
    async fn test_save_refuses_names_that_would_split() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("hosts");
        fs::write(&path, "127.0.0.1 localhost\n").await.unwrap();

        let store = FileTableStore::new(&path);
        for name in ["Living Room TV", "tv#2"] {
            let table = Table::from_entries(vec![Entry::new(name, ip("10.0.0.5"))]);
            let err = store.save(&table).await.unwrap_err();
            assert!(matches!(err, Error::Store(_)), "unexpected error: {:?}", err);
        }

        assert_eq!(fs::read_to_string(&path).await.unwrap(), "127.0.0.1 localhost\n");
        assert!(!store.backup_path().exists());
        assert!(!store.temp_path().exists());
    }

    #[test]
    fn test_sibling_paths() {
        let store = FileTableStore::new("/etc/hosts");
        assert_eq!(store.temp_path(), PathBuf::from("/etc/hosts.tmp"));
        assert_eq!(store.backup_path(), PathBuf::from("/etc/hosts.backup"));
    }
}
