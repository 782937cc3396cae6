//! `~/.pgpass` password store
//!
//! One `host:port:database:username:password` record per line, in the format
//! libpq reads. `:` and `\` inside a field are backslash-escaped.

use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use tempfile::NamedTempFile;

use crate::types::DEFAULT_DATABASE;
use super::identity::SecretIdentity;
use super::traits::{BackendKind, SecretStore, SecretStoreError, SecretStoreResult};

/// Password store backed by a pgpass file
///
/// Records are keyed by `(host, port, username)` taken from the identity's
/// direct endpoint and role. Every write replaces the whole file through a
/// temp file and an atomic rename, and leaves it readable by the owner only.
#[derive(Debug, Clone)]
pub struct PgpassStore {
    /// `None` when the home directory cannot be determined
    path: Option<PathBuf>,
}

impl PgpassStore {
    /// Store at `~/.pgpass`
    ///
    /// Without a home directory every operation fails with
    /// `BackendUnavailable` rather than writing somewhere unexpected.
    pub fn new() -> Self {
        Self {
            path: dirs::home_dir().map(|home| home.join(".pgpass")),
        }
    }

    /// Store at an explicit path
    pub fn at(path: impl Into<PathBuf>) -> Self {
        Self {
            path: Some(path.into()),
        }
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    fn file(&self) -> SecretStoreResult<&Path> {
        self.path.as_deref().ok_or_else(|| {
            SecretStoreError::unavailable(
                BackendKind::Pgpass,
                "cannot locate home directory for .pgpass",
            )
        })
    }
}

/// Read all lines; `Ok(None)` when the file does not exist
fn read_lines(path: &Path) -> SecretStoreResult<Option<Vec<String>>> {
    match fs::read_to_string(path) {
        Ok(content) => Ok(Some(content.lines().map(str::to_string).collect())),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
        Err(e) => Err(io_error(path, "read", e)),
    }
}

fn write_lines(path: &Path, lines: &[String]) -> SecretStoreResult<()> {
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => PathBuf::from("."),
    };
    fs::create_dir_all(&dir).map_err(|e| io_error(path, "create directory for", e))?;

    let mut tmp = NamedTempFile::new_in(&dir).map_err(|e| io_error(path, "create temp file for", e))?;
    restrict_permissions(tmp.path()).map_err(|e| io_error(path, "set permissions on", e))?;
    for line in lines {
        writeln!(tmp, "{}", line).map_err(|e| io_error(path, "write", e))?;
    }
    tmp.as_file().sync_all().map_err(|e| io_error(path, "sync", e))?;
    tmp.persist(path).map_err(|e| io_error(path, "replace", e.error))?;
    restrict_permissions(path).map_err(|e| io_error(path, "set permissions on", e))?;
    Ok(())
}

fn io_error(path: &Path, action: &str, e: io::Error) -> SecretStoreError {
    SecretStoreError::unavailable(
        BackendKind::Pgpass,
        format!("failed to {} {}: {}", action, path.display(), e),
    )
}

/// A record is one line, so no field may contain a line break
fn has_line_break(field: &str) -> bool {
    field.contains(|c: char| c == '\n' || c == '\r')
}

impl Default for PgpassStore {
    fn default() -> Self {
        Self::new()
    }
}

/// The `(host, port, username)` a record is keyed by
struct RecordKey {
    host: String,
    port: String,
    username: String,
}

impl RecordKey {
    fn for_identity(identity: &SecretIdentity) -> SecretStoreResult<Self> {
        identity.validate()?;
        let endpoint = identity.require_endpoint()?;
        if has_line_break(&endpoint.host) || has_line_break(&identity.role) {
            return Err(SecretStoreError::Validation(
                "host and role must not contain line breaks".to_string(),
            ));
        }
        Ok(Self {
            host: endpoint.host.clone(),
            port: endpoint.port_or_default().to_string(),
            username: identity.role.clone(),
        })
    }

    fn matches(&self, record: &PgpassRecord) -> bool {
        record.host == self.host && record.port == self.port && record.username == self.username
    }

    fn render(&self, secret: &str) -> String {
        [
            self.host.as_str(),
            self.port.as_str(),
            DEFAULT_DATABASE,
            self.username.as_str(),
            secret,
        ]
        .iter()
        .map(|f| escape_field(f))
        .collect::<Vec<_>>()
        .join(":")
    }
}

/// A parsed pgpass line
#[derive(Debug, PartialEq, Eq)]
struct PgpassRecord {
    host: String,
    port: String,
    username: String,
    password: String,
}

impl PgpassRecord {
    /// Parse a line; comments, blanks and lines with fewer than five fields yield `None`
    fn parse(line: &str) -> Option<Self> {
        if line.trim_start().starts_with('#') || line.trim().is_empty() {
            return None;
        }

        let mut fields: Vec<String> = Vec::with_capacity(5);
        let mut current = String::new();
        let mut chars = line.chars();
        while let Some(c) = chars.next() {
            match c {
                '\\' => {
                    if let Some(next) = chars.next() {
                        current.push(next);
                    }
                }
                // The password is everything after the fourth separator
                ':' if fields.len() < 4 => fields.push(std::mem::take(&mut current)),
                _ => current.push(c),
            }
        }
        if fields.len() < 4 {
            return None;
        }
        fields.push(current);

        // Database is not part of the key
        let mut it = fields.into_iter();
        Some(Self {
            host: it.next()?,
            port: it.next()?,
            username: it.nth(1)?,
            password: it.next()?,
        })
    }
}

fn escape_field(field: &str) -> String {
    field.replace('\\', "\\\\").replace(':', "\\:")
}

#[cfg(unix)]
fn restrict_permissions(path: &Path) -> io::Result<()> {
    use std::os::unix::fs::PermissionsExt;
    fs::set_permissions(path, fs::Permissions::from_mode(0o600))
}

#[cfg(not(unix))]
fn restrict_permissions(_path: &Path) -> io::Result<()> {
    Ok(())
}

impl SecretStore for PgpassStore {
    fn name(&self) -> &str {
        BackendKind::Pgpass.label()
    }

    fn save(&self, identity: &SecretIdentity, secret: &str) -> SecretStoreResult<()> {
        let key = RecordKey::for_identity(identity)?;
        if has_line_break(secret) {
            return Err(SecretStoreError::Validation(
                "password must not contain line breaks".to_string(),
            ));
        }
        let path = self.file()?;
        tracing::debug!(identity = %identity, path = %path.display(), "saving password to pgpass");

        let mut lines: Vec<String> = read_lines(path)?
            .unwrap_or_default()
            .into_iter()
            .filter(|line| !PgpassRecord::parse(line).is_some_and(|r| key.matches(&r)))
            .collect();
        lines.push(key.render(secret));

        write_lines(path, &lines)
    }

    fn get(&self, identity: &SecretIdentity) -> SecretStoreResult<String> {
        let key = RecordKey::for_identity(identity)?;
        let path = self.file()?;
        let lines = read_lines(path)?.ok_or_else(|| SecretStoreError::PgpassMissing {
            path: path.to_path_buf(),
        })?;

        lines
            .iter()
            .filter_map(|line| PgpassRecord::parse(line))
            .find(|record| key.matches(record))
            .map(|record| record.password)
            .ok_or(SecretStoreError::NotFound {
                backend: BackendKind::Pgpass,
            })
    }

    fn remove(&self, identity: &SecretIdentity) -> SecretStoreResult<()> {
        let key = RecordKey::for_identity(identity)?;
        let path = self.file()?;
        let Some(lines) = read_lines(path)? else {
            return Ok(());
        };

        let original_len = lines.len();
        let kept: Vec<String> = lines
            .into_iter()
            .filter(|line| !PgpassRecord::parse(line).is_some_and(|r| key.matches(&r)))
            .collect();

        if kept.len() == original_len {
            return Ok(());
        }
        tracing::debug!(identity = %identity, removed = original_len - kept.len(), "removed pgpass entries");
        write_lines(path, &kept)
    }
}
