//! Append-only cache of fetched HTML for offline debugging.
//!
//! Files are write-only artifacts; nothing reads them back.

use std::fs::{self, OpenOptions};
use std::io::{self, Write};
use std::path::PathBuf;
use std::sync::LazyLock;

use regex::Regex;
use sha2::{Digest, Sha256};

use crate::error::CacheError;

/// Hex characters of the key digest kept in file names.
const KEY_HASH_LEN: usize = 10;

static UNSAFE_KIND_CHARS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[^a-z0-9_-]+").expect("valid regex"));

/// Writes raw HTML under a cache root as
/// `<UTC timestamp>__<kind>__<key hash>.html`.
#[derive(Debug, Clone)]
pub struct CacheWriter {
    root: PathBuf,
}

impl CacheWriter {
    #[must_use]
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Saves `html` and returns the path written.
    ///
    /// Never overwrites: a name collision gets a numeric suffix.
    ///
    /// # Errors
    ///
    /// Returns [`CacheError`] if the directory or file cannot be written.
    pub fn save(&self, kind: &str, key: &str, html: &str) -> Result<PathBuf, CacheError> {
        fs::create_dir_all(&self.root).map_err(|source| CacheError {
            path: self.root.clone(),
            source,
        })?;

        let timestamp = chrono::Utc::now().format("%Y%m%dT%H%M%SZ");
        let stem = format!("{timestamp}__{}__{}", sanitize_kind(kind), short_hash(key));

        for attempt in 0u32.. {
            let name = if attempt == 0 {
                format!("{stem}.html")
            } else {
                format!("{stem}-{attempt}.html")
            };
            let path = self.root.join(name);
            match OpenOptions::new().write(true).create_new(true).open(&path) {
                Ok(mut file) => {
                    return file
                        .write_all(html.as_bytes())
                        .map(|()| path.clone())
                        .map_err(|source| CacheError { path, source });
                }
                Err(e) if e.kind() == io::ErrorKind::AlreadyExists => {}
                Err(source) => return Err(CacheError { path, source }),
            }
        }

        Err(CacheError {
            path: self.root.join(format!("{stem}.html")),
            source: io::Error::new(io::ErrorKind::AlreadyExists, "no free cache file name"),
        })
    }
}

/// Lower-cases `kind` and collapses runs of characters outside
/// `[a-z0-9_-]` into `-`.
#[must_use]
pub fn sanitize_kind(kind: &str) -> String {
    UNSAFE_KIND_CHARS
        .replace_all(&kind.to_lowercase(), "-")
        .into_owned()
}

/// First characters of the SHA-256 hex digest of `key`.
#[must_use]
pub fn short_hash(key: &str) -> String {
    let digest = format!("{:x}", Sha256::digest(key.as_bytes()));
    digest[..KEY_HASH_LEN].to_string()
}
