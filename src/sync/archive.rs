// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Append-only archive file format (§4.7): one file per database, created
//! lazily the first time a record needs archiving, holding every record
//! payload that was ever deleted-with-archive from that database.
//!
//! This format is repository-local; it is not meant to be byte-compatible
//! with Palm Desktop's own archive files (spec.md §9 open questions).

use std::fs::{self, File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

use crate::error::{Error, Result};

const MAGIC: &[u8; 8] = b"PalmArch";
const FORMAT_VERSION: u32 = 1;
const FILE_HEADER_LEN: u16 = 8 + 2 + 4 + 32 + 4 + 4;
const NAME_LEN: usize = 32;
const RECORD_KIND: u8 = 1;
const ENTRY_HEADER_LEN: u8 = 1 + 1 + 4 + 4;

/// One entry read back out of an archive file, for tests and any future
/// archive-inspection tooling.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArchivedRecord {
    pub timestamp: u32,
    pub data: Vec<u8>,
}

/// Writes archived record payloads for a single database. The backing
/// file is not created until the first [`append`](Self::append) call, so
/// a sync that archives nothing leaves no trace (§4.7).
pub struct ArchiveWriter {
    path: PathBuf,
    db_name: String,
    r#type: [u8; 4],
    creator: [u8; 4],
    file: Option<File>,
}

impl ArchiveWriter {
    #[must_use]
    pub fn new(path: PathBuf, db_name: &str, r#type: [u8; 4], creator: [u8; 4]) -> Self {
        Self {
            path,
            db_name: db_name.to_string(),
            r#type,
            creator,
            file: None,
        }
    }

    fn file_header(&self) -> Vec<u8> {
        let mut buf = Vec::with_capacity(FILE_HEADER_LEN as usize);
        buf.extend_from_slice(MAGIC);
        buf.extend_from_slice(&FILE_HEADER_LEN.to_be_bytes());
        buf.extend_from_slice(&FORMAT_VERSION.to_be_bytes());
        let mut name_field = [0u8; NAME_LEN];
        let name_bytes = self.db_name.as_bytes();
        let n = name_bytes.len().min(NAME_LEN);
        name_field[..n].copy_from_slice(&name_bytes[..n]);
        buf.extend_from_slice(&name_field);
        buf.extend_from_slice(&self.r#type);
        buf.extend_from_slice(&self.creator);
        buf
    }

    fn ensure_open(&mut self) -> Result<&mut File> {
        if self.file.is_none() {
            if !self.path.exists() {
                let header = self.file_header();
                crate::atomic_write::write_atomic(&self.path, &header)?;
                #[cfg(unix)]
                {
                    use std::os::unix::fs::PermissionsExt;
                    fs::set_permissions(&self.path, fs::Permissions::from_mode(0o600))?;
                }
            }
            self.file = Some(OpenOptions::new().append(true).open(&self.path)?);
        }
        Ok(self.file.as_mut().expect("just opened"))
    }

    /// Append one archived record payload, stamped with the current Unix
    /// time. Opens (creating if necessary) the backing file on first use.
    pub fn append(&mut self, data: &[u8]) -> Result<()> {
        let timestamp = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs() as u32)
            .unwrap_or(0);
        let mut entry = Vec::with_capacity(ENTRY_HEADER_LEN as usize + data.len());
        entry.push(RECORD_KIND);
        entry.push(ENTRY_HEADER_LEN);
        entry.extend_from_slice(&(data.len() as u32).to_be_bytes());
        entry.extend_from_slice(&timestamp.to_be_bytes());
        entry.extend_from_slice(data);
        self.ensure_open()?.write_all(&entry)?;
        Ok(())
    }

    /// Whether this writer's file was ever created (i.e. anything was
    /// archived this session).
    #[must_use]
    pub fn was_created(&self) -> bool {
        self.file.is_some() || self.path.exists()
    }
}

/// Parse every record entry out of an archive file, for tests and
/// inspection. Tolerant of a truncated trailing entry (a crash mid-append
/// leaves a partial record, never a corrupted earlier one): such a tail
/// is silently dropped rather than treated as an error.
pub fn read_entries(path: &Path) -> Result<Vec<ArchivedRecord>> {
    let bytes = fs::read(path)?;
    if bytes.len() < FILE_HEADER_LEN as usize || &bytes[..8] != MAGIC {
        return Err(Error::Corrupt("not an archive file".into()));
    }
    let mut cursor = FILE_HEADER_LEN as usize;
    let mut out = Vec::new();
    while cursor + ENTRY_HEADER_LEN as usize <= bytes.len() {
        let kind = bytes[cursor];
        let reclen = bytes[cursor + 1] as usize;
        if kind != RECORD_KIND || reclen != ENTRY_HEADER_LEN as usize {
            break;
        }
        let data_len = u32::from_be_bytes(bytes[cursor + 2..cursor + 6].try_into().unwrap()) as usize;
        let timestamp = u32::from_be_bytes(bytes[cursor + 6..cursor + 10].try_into().unwrap());
        let data_start = cursor + reclen;
        let data_end = data_start + data_len;
        if data_end > bytes.len() {
            break; // truncated trailing entry from an interrupted append
        }
        out.push(ArchivedRecord { timestamp, data: bytes[data_start..data_end].to_vec() });
        cursor = data_end;
    }
    Ok(out)
}
