// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Upload directory for original and annotated images
//!
//! Every stored file gets a generated `{uuid}{ext}` name (annotated copies are
//! prefixed with `result_`), so concurrent requests never write the same path.
//! A [`RetentionPolicy`] bounds how much the directory accumulates.

use anyhow::{Context, Result};
use std::collections::BTreeMap;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};
use tracing::{debug, info, warn};
use uuid::Uuid;

/// Prefix for annotated copies
pub const RESULT_PREFIX: &str = "result_";

/// URL prefix the files are served under
pub const UPLOADS_ROUTE: &str = "/uploads";

/// Default cap on stored files
pub const DEFAULT_MAX_FILES: usize = 1000;

/// Limits applied to the upload directory after each write
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetentionPolicy {
    /// Keep at most this many files (newest first)
    pub max_files: Option<usize>,
    /// Delete files whose modification time is older than this
    pub max_age: Option<Duration>,
}

impl RetentionPolicy {
    /// Keep everything
    pub fn unlimited() -> Self {
        Self {
            max_files: None,
            max_age: None,
        }
    }

    pub fn is_unlimited(&self) -> bool {
        self.max_files.is_none() && self.max_age.is_none()
    }
}

impl Default for RetentionPolicy {
    fn default() -> Self {
        Self {
            max_files: Some(DEFAULT_MAX_FILES),
            max_age: None,
        }
    }
}

/// A stored file as seen by the retention sweep
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredFile {
    pub name: String,
    pub modified: SystemTime,
}

/// Outcome of one sweep
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SweepReport {
    /// Files inspected
    pub scanned: usize,
    /// Files deleted
    pub removed: Vec<String>,
    /// Deletions that failed
    pub failed: usize,
}

/// Original name a stored file belongs to (`result_X` and `X` share `X`)
pub fn pair_key(name: &str) -> &str {
    name.strip_prefix(RESULT_PREFIX).unwrap_or(name)
}

/// Pick the files `policy` would delete at time `now`
///
/// Files older than `max_age` go first. The rest are counted against
/// `max_files` in groups (an upload together with its annotated copy), newest
/// group first; the first group that no longer fits and everything older is
/// selected. A group's age is its newest file, ties ordered by name.
pub fn select_expired(files: &[StoredFile], policy: &RetentionPolicy, now: SystemTime) -> Vec<String> {
    let mut expired = Vec::new();
    let mut remaining: Vec<&StoredFile> = Vec::with_capacity(files.len());

    for file in files {
        let too_old = match (policy.max_age, now.duration_since(file.modified)) {
            (Some(max_age), Ok(age)) => age > max_age,
            _ => false,
        };

        if too_old {
            expired.push(file.name.clone());
        } else {
            remaining.push(file);
        }
    }

    if let Some(max_files) = policy.max_files {
        let mut pairs: BTreeMap<&str, Vec<&StoredFile>> = BTreeMap::new();
        for file in remaining {
            pairs.entry(pair_key(&file.name)).or_default().push(file);
        }

        let mut groups: Vec<(SystemTime, &str, Vec<&StoredFile>)> = pairs
            .into_iter()
            .map(|(key, members)| {
                let newest = members
                    .iter()
                    .map(|file| file.modified)
                    .max()
                    .unwrap_or(SystemTime::UNIX_EPOCH);
                (newest, key, members)
            })
            .collect();
        groups.sort_by(|a, b| b.0.cmp(&a.0).then_with(|| b.1.cmp(a.1)));

        let mut kept = 0;
        let mut full = false;
        for (_, _, members) in groups {
            if !full && kept + members.len() <= max_files {
                kept += members.len();
            } else {
                full = true;
                expired.extend(members.iter().map(|file| file.name.clone()));
            }
        }
    }

    expired
}

/// Filesystem-backed image store
#[derive(Debug, Clone)]
pub struct UploadStore {
    dir: PathBuf,
    retention: RetentionPolicy,
}

impl UploadStore {
    /// Open the store, creating the directory if needed
    pub async fn new(dir: impl Into<PathBuf>, retention: RetentionPolicy) -> Result<Self> {
        let dir = dir.into();
        tokio::fs::create_dir_all(&dir)
            .await
            .with_context(|| format!("Failed to create upload directory {}", dir.display()))?;

        info!(
            "📁 Upload directory ready at {} (max_files: {:?}, max_age: {:?})",
            dir.display(),
            retention.max_files,
            retention.max_age
        );

        Ok(Self { dir, retention })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn retention(&self) -> &RetentionPolicy {
        &self.retention
    }

    /// Fresh `{uuid}{ext}` name
    pub fn generate_name(extension: &str) -> String {
        format!("{}{}", Uuid::new_v4(), extension)
    }

    /// Name of the annotated copy of `name`
    pub fn result_name(name: &str) -> String {
        format!("{}{}", RESULT_PREFIX, name)
    }

    /// Path clients fetch `name` from
    pub fn public_url(name: &str) -> String {
        format!("{}/{}", UPLOADS_ROUTE, name)
    }

    /// Stored names are flat; anything that could leave the directory is rejected
    pub fn is_valid_name(name: &str) -> bool {
        !name.is_empty()
            && !name.contains('/')
            && !name.contains('\\')
            && !name.contains("..")
            && name != "."
    }

    /// Write `bytes` under `name`
    pub async fn save(&self, name: &str, bytes: &[u8]) -> Result<PathBuf> {
        if !Self::is_valid_name(name) {
            anyhow::bail!("Invalid upload name: {}", name);
        }

        let path = self.dir.join(name);
        tokio::fs::write(&path, bytes)
            .await
            .with_context(|| format!("Failed to write {}", path.display()))?;

        debug!("Stored {} ({} bytes)", name, bytes.len());
        Ok(path)
    }

    /// Read a stored file; `Ok(None)` when it does not exist or the name is invalid
    pub async fn read(&self, name: &str) -> Result<Option<Vec<u8>>> {
        if !Self::is_valid_name(name) {
            debug!("Rejected upload lookup for {:?}", name);
            return Ok(None);
        }

        let path = self.dir.join(name);
        match tokio::fs::read(&path).await {
            Ok(bytes) => Ok(Some(bytes)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e).with_context(|| format!("Failed to read {}", path.display())),
        }
    }

    /// Apply the retention policy now
    pub async fn sweep(&self) -> Result<SweepReport> {
        self.sweep_at(SystemTime::now()).await
    }

    /// Apply the retention policy as of `now`
    pub async fn sweep_at(&self, now: SystemTime) -> Result<SweepReport> {
        if self.retention.is_unlimited() {
            return Ok(SweepReport::default());
        }

        let files = self.list_files().await?;
        let expired = select_expired(&files, &self.retention, now);

        let mut report = SweepReport {
            scanned: files.len(),
            ..Default::default()
        };

        for name in expired {
            match tokio::fs::remove_file(self.dir.join(&name)).await {
                Ok(()) => report.removed.push(name),
                // Already gone (another sweep got there first)
                Err(e) if e.kind() == ErrorKind::NotFound => {}
                Err(e) => {
                    warn!("Failed to remove expired upload {}: {}", name, e);
                    report.failed += 1;
                }
            }
        }

        if !report.removed.is_empty() {
            info!(
                "🧹 Retention sweep removed {} of {} files",
                report.removed.len(),
                report.scanned
            );
        }

        Ok(report)
    }

    async fn list_files(&self) -> Result<Vec<StoredFile>> {
        let mut entries = tokio::fs::read_dir(&self.dir)
            .await
            .with_context(|| format!("Failed to list {}", self.dir.display()))?;

        let mut files = Vec::new();
        while let Some(entry) = entries.next_entry().await? {
            let metadata = match entry.metadata().await {
                Ok(metadata) => metadata,
                Err(e) => {
                    debug!("Skipping {:?}: {}", entry.file_name(), e);
                    continue;
                }
            };

            if !metadata.is_file() {
                continue;
            }

            let Ok(name) = entry.file_name().into_string() else {
                continue;
            };

            files.push(StoredFile {
                name,
                modified: metadata.modified().unwrap_or(SystemTime::UNIX_EPOCH),
            });
        }

        Ok(files)
    }
}
