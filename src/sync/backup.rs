// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Backup: the first-ever sync for a database (§4.7). There is no local
//! image to reconcile against yet, so every remote record is resolved
//! against its own attribute bits alone: archive-on-delete records are
//! archived and dropped, expunged records are dropped, everything else is
//! written to the local image with its transient flags cleared.

use std::path::Path;

use crate::dlp::commands::{self, open_mode, DbHandle};
use crate::dlp::status::DlpStatus;
use crate::dlp::DlpSession;
use crate::error::{Error, Result};
use crate::pdb::transfer::pdb_download;
use crate::pdb::{Payloads, PdbRecord, RecordStateWire};
use crate::sync::archive::ArchiveWriter;
use crate::sync::attrs::RecordState;

/// Outcome of backing up one database, for the caller's session log.
#[derive(Debug)]
pub enum BackupOutcome {
    /// Backup image written; how many records it ended up with.
    Done { record_count: usize },
    /// The device refused to open the database; not fatal to the session.
    Skipped { reason: &'static str },
}

/// Run backup for the database named `db_info.name` on `card`, writing the
/// result to `backup_path` and any archived payloads to `archive`.
#[allow(clippy::too_many_arguments)]
pub fn backup(
    session: &mut DlpSession,
    card: u8,
    db_info: &commands::DbInfo,
    backup_path: &Path,
    archive: &mut ArchiveWriter,
) -> Result<BackupOutcome> {
    commands::open_conduit(session)?;

    let handle = match commands::open_db(session, card, &db_info.name, open_mode::READ) {
        Ok(h) => h,
        Err(Error::DlpStatus(DlpStatus::TooManyOpenDatabases)) => {
            return Ok(BackupOutcome::Skipped { reason: "too many open databases" })
        }
        Err(Error::DlpStatus(DlpStatus::CantOpen)) => return Ok(BackupOutcome::Skipped { reason: "can't open database" }),
        Err(Error::DlpStatus(DlpStatus::ReadOnly)) => return Ok(BackupOutcome::Skipped { reason: "database is read-only" }),
        Err(e) => return Err(e),
    };

    let is_resource_db = db_info.is_resource_db();
    let mut db = pdb_download(
        session,
        handle,
        &db_info.name,
        db_info.db_flags,
        db_info.r#type,
        db_info.creator,
        db_info.version,
        0,
        is_resource_db,
    )?;

    if let Payloads::Records(records) = &mut db.payloads {
        resolve_first_sync_records(session, handle, archive, records)?;
    }

    let record_count = db.payloads.len();
    let bytes = crate::pdb::pdb_write(&db)?;
    crate::atomic_write::write_atomic(backup_path, &bytes)?;

    if !is_resource_db {
        commands::clean_up_database(session, handle)?;
        commands::reset_sync_flags(session, handle)?;
    }
    commands::close_db(session, handle)?;

    Ok(BackupOutcome::Done { record_count })
}

/// Resolve each record's state against the device with no local image to
/// compare against, removing archived/expunged records from `records` in
/// place and clearing transient flags on everything that survives.
fn resolve_first_sync_records(
    session: &mut DlpSession,
    handle: DbHandle,
    archive: &mut ArchiveWriter,
    records: &mut Vec<PdbRecord>,
) -> Result<()> {
    let mut i = 0;
    while i < records.len() {
        match records[i].state.0 {
            RecordState::DeletedArchive => {
                archive.append(&records[i].data)?;
                commands::delete_record(session, handle, records[i].id)?;
                records.remove(i);
            }
            RecordState::Expunged => {
                commands::delete_record(session, handle, records[i].id)?;
                records.remove(i);
            }
            other => {
                records[i].state = RecordStateWire(other.cleaned());
                i += 1;
            }
        }
    }
    Ok(())
}
