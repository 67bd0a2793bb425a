// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Durable local store for type ID bindings.
//!
//! Stores each binding as a single file at:
//!   `{work_dir}/{type_id}.{extension}`
//!
//! The file holds the raw type name and nothing else. Writes go through a
//! temp file in the same directory followed by `rename`, so a reader never
//! observes a half-written name.

use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};

use crate::config::RegistryConfig;

/// Extension used for in-flight writes.
pub const TEMP_EXTENSION: &str = "tmp";

/// Disambiguates temp files written concurrently by this process.
static TEMP_SEQ: AtomicU64 = AtomicU64::new(0);

// ---------------------------------------------------------------------------
// LocalStore
// ---------------------------------------------------------------------------

/// File-per-ID persistence of type name bindings on this node.
#[derive(Debug, Clone)]
pub struct LocalStore {
    directory: PathBuf,
    extension: String,
    sync_writes: bool,
}

/// Outcome of [`LocalStore::write`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WriteOutcome {
    /// The binding was written to disk.
    Written,
    /// The file already held exactly this name.
    Unchanged,
    /// The file holds a different name and was left untouched.
    Conflict {
        /// Name currently on disk
        existing: String,
    },
}

/// Result of a full directory scan.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct StoreScan {
    /// Readable bindings, sorted by type ID.
    pub bindings: Vec<(u32, String)>,
    /// Binding files with no content.
    pub empty: Vec<PathBuf>,
    /// Binding files that are not valid UTF-8 or cannot be read.
    pub malformed: Vec<PathBuf>,
    /// Leftover temp files from interrupted writes.
    pub temp_files: Vec<PathBuf>,
}

impl LocalStore {
    /// Open the store described by `config`.
    ///
    /// The directory is created if it does not exist.
    pub fn open(config: &RegistryConfig) -> io::Result<Self> {
        fs::create_dir_all(&config.work_dir)?;

        let store = Self {
            directory: config.work_dir.clone(),
            extension: config.file_extension.clone(),
            sync_writes: config.sync_writes,
        };

        if config.cleanup_temp_on_open {
            let removed = store.cleanup_temp_files()?;
            if removed > 0 {
                log::info!(
                    "Removed {} stale temp file(s) from {}",
                    removed,
                    store.directory.display()
                );
            }
        }

        Ok(store)
    }

    /// Open a store at `directory` with default settings.
    pub fn new(directory: impl Into<PathBuf>) -> io::Result<Self> {
        Self::open(&RegistryConfig::builder().work_dir(directory).build())
    }

    /// Root directory of the store.
    pub fn directory(&self) -> &Path {
        &self.directory
    }

    /// Path of the file holding `type_id`.
    pub fn path_for(&self, type_id: u32) -> PathBuf {
        self.directory.join(format!("{}.{}", type_id, self.extension))
    }

    /// Read the name bound to `type_id`.
    ///
    /// A missing or empty file is `Ok(None)`. Non-UTF-8 content is an
    /// `InvalidData` error.
    pub fn read(&self, type_id: u32) -> io::Result<Option<String>> {
        read_name(&self.path_for(type_id))
    }

    /// Persist `type_id -> name`.
    ///
    /// A record is written at most once per ID: an existing file holding a
    /// different name is kept and reported as [`WriteOutcome::Conflict`].
    /// Unreadable files (non-UTF-8, empty) are replaced.
    pub fn write(&self, type_id: u32, name: &str) -> io::Result<WriteOutcome> {
        let path = self.path_for(type_id);

        match read_name(&path) {
            Ok(Some(existing)) if existing == name => return Ok(WriteOutcome::Unchanged),
            Ok(Some(existing)) => {
                log::error!(
                    "Local binding differs, keeping existing record [id={}, existing={}, new={}]",
                    type_id,
                    existing,
                    name
                );
                return Ok(WriteOutcome::Conflict { existing });
            }
            Ok(None) => {}
            Err(e) => {
                log::debug!("Overwriting unreadable {}: {}", path.display(), e);
            }
        }

        let tmp = self.temp_path_for(type_id);
        if let Err(e) = self.write_temp(&tmp, name).and_then(|()| fs::rename(&tmp, &path)) {
            let _ = fs::remove_file(&tmp);
            return Err(e);
        }

        log::debug!("Stored type name [id={}, name={}]", type_id, name);
        Ok(WriteOutcome::Written)
    }

    /// All readable bindings, sorted by type ID.
    ///
    /// Empty or malformed files are skipped.
    pub fn entries(&self) -> io::Result<Vec<(u32, String)>> {
        Ok(self.scan()?.bindings)
    }

    /// Walk the directory and classify every file this store owns.
    ///
    /// Files that do not look like `{u32}.{extension}` or temp files are
    /// ignored.
    pub fn scan(&self) -> io::Result<StoreScan> {
        let mut scan = StoreScan::default();

        for dir_entry in fs::read_dir(&self.directory)? {
            let path = dir_entry?.path();
            if !path.is_file() {
                continue;
            }

            let fname = match path.file_name().and_then(|n| n.to_str()) {
                Some(n) => n,
                None => continue,
            };

            if self.is_temp_name(fname) {
                scan.temp_files.push(path);
                continue;
            }

            let type_id = match self.parse_type_id(fname) {
                Some(id) => id,
                None => continue,
            };

            match read_name(&path) {
                Ok(Some(name)) => scan.bindings.push((type_id, name)),
                Ok(None) => scan.empty.push(path),
                Err(e) => {
                    log::warn!("Failed to read {}: {}", path.display(), e);
                    scan.malformed.push(path);
                }
            }
        }

        scan.bindings.sort_by_key(|(id, _)| *id);
        scan.empty.sort();
        scan.malformed.sort();
        scan.temp_files.sort();
        Ok(scan)
    }

    /// Remove temp files left behind by interrupted writes.
    ///
    /// Returns the number of files removed.
    pub fn cleanup_temp_files(&self) -> io::Result<usize> {
        let temp_files = self.scan()?.temp_files;
        let mut removed = 0;
        for path in temp_files {
            match fs::remove_file(&path) {
                Ok(()) => removed += 1,
                Err(e) if e.kind() == io::ErrorKind::NotFound => {}
                Err(e) => return Err(e),
            }
        }
        Ok(removed)
    }

    fn write_temp(&self, tmp: &Path, name: &str) -> io::Result<()> {
        let mut file = fs::File::create(tmp)?;
        file.write_all(name.as_bytes())?;
        if self.sync_writes {
            file.sync_all()?;
        }
        Ok(())
    }

    fn temp_path_for(&self, type_id: u32) -> PathBuf {
        let seq = TEMP_SEQ.fetch_add(1, Ordering::Relaxed);
        self.directory.join(format!(
            "{}.{}.{}-{}.{}",
            type_id,
            self.extension,
            std::process::id(),
            seq,
            TEMP_EXTENSION
        ))
    }

    fn is_temp_name(&self, fname: &str) -> bool {
        let Some(stem) = fname.strip_suffix(TEMP_EXTENSION) else {
            return false;
        };
        let Some((binding, _unique)) = stem.trim_end_matches('.').rsplit_once('.') else {
            return false;
        };
        self.parse_type_id(binding).is_some()
    }

    fn parse_type_id(&self, fname: &str) -> Option<u32> {
        let (id, ext) = fname.split_once('.')?;
        if ext != self.extension || id.is_empty() || !id.bytes().all(|b| b.is_ascii_digit()) {
            return None;
        }
        id.parse().ok()
    }
}

/// Read the first line of `path` as a type name.
fn read_name(path: &Path) -> io::Result<Option<String>> {
    let bytes = match fs::read(path) {
        Ok(bytes) => bytes,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
        Err(e) => return Err(e),
    };

    let content = String::from_utf8(bytes).map_err(|e| {
        io::Error::new(
            io::ErrorKind::InvalidData,
            format!("{} is not valid UTF-8: {}", path.display(), e),
        )
    })?;

    Ok(content
        .lines()
        .next()
        .filter(|name| !name.is_empty())
        .map(str::to_string))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
