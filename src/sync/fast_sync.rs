// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Fast-sync: used when the device's last-sync-PC matches this host, so
//! its DIRTY bits can be trusted without a full byte-for-byte comparison
//! (§4.7). Pass 1 walks `ReadNextModifiedRec` and reconciles each modified
//! remote record against its local counterpart with the same table
//! slow-sync's Phase 2 uses. Pass 2 then walks what's left of the local
//! image and pushes local-only changes — new, dirty, or archived/expunged
//! records the device hasn't heard about yet — up to the device.
//!
//! Resource databases carry no DIRTY flag, so they're out of scope for
//! `ReadNextModifiedRec`; this module leaves them untouched, matching
//! `slow_sync`'s wholesale-replacement treatment would be wrong here since
//! fast-sync never re-downloads the full resource list.

use crate::dlp::commands::{self, open_mode, DbHandle};
use crate::dlp::status::DlpStatus;
use crate::dlp::DlpSession;
use crate::error::{Error, Result};
use crate::pdb::{Payloads, PdbDatabase, PdbRecord, RecordStateWire};
use crate::sync::archive::ArchiveWriter;
use crate::sync::attrs::RecordState;
use crate::sync::reconcile;

/// Outcome of fast-syncing one database, for the caller's session log.
#[derive(Debug)]
pub enum FastSyncOutcome {
    Done { record_count: usize },
    Skipped { reason: &'static str },
}

/// Fast-sync `local` (the previous backup image) against the device,
/// writing the reconciled result to `backup_path`.
pub fn fast_sync(
    session: &mut DlpSession,
    card: u8,
    db_name: &str,
    mut local: PdbDatabase,
    backup_path: &std::path::Path,
    archive: &mut ArchiveWriter,
) -> Result<FastSyncOutcome> {
    commands::open_conduit(session)?;

    let handle = match commands::open_db(session, card, db_name, open_mode::READ | open_mode::WRITE) {
        Ok(h) => h,
        Err(Error::DlpStatus(DlpStatus::TooManyOpenDatabases)) => {
            return Ok(FastSyncOutcome::Skipped { reason: "too many open databases" })
        }
        Err(Error::DlpStatus(DlpStatus::CantOpen)) => return Ok(FastSyncOutcome::Skipped { reason: "can't open database" }),
        Err(Error::DlpStatus(DlpStatus::ReadOnly)) => return Ok(FastSyncOutcome::Skipped { reason: "database is read-only" }),
        Err(e) => return Err(e),
    };

    let is_resource_db = local.is_resource_db();
    let record_count = if is_resource_db {
        local.payloads.len()
    } else {
        let mut local_records = match &mut local.payloads {
            Payloads::Records(r) => std::mem::take(r),
            Payloads::Resources(_) => Vec::new(),
        };

        let mut touched: Vec<u32> = Vec::new();
        reconcile_modified_remote_records(session, handle, archive, &mut local_records, &mut touched)?;
        push_local_only_changes(session, handle, &mut local_records, &touched)?;

        let count = local_records.len();
        local.payloads = Payloads::Records(local_records);
        count
    };

    let bytes = crate::pdb::pdb_write(&local)?;
    crate::atomic_write::write_atomic(backup_path, &bytes)?;

    if !is_resource_db {
        commands::clean_up_database(session, handle)?;
        commands::reset_sync_flags(session, handle)?;
    }
    commands::close_db(session, handle)?;

    Ok(FastSyncOutcome::Done { record_count })
}

/// Pass 1: drain `ReadNextModifiedRec`, reconciling each remote record the
/// device reports as modified against `local_records`. `touched` collects
/// the ids Pass 2 must not re-upload as "local-only".
fn reconcile_modified_remote_records(
    session: &mut DlpSession,
    handle: DbHandle,
    archive: &mut ArchiveWriter,
    local_records: &mut Vec<PdbRecord>,
    touched: &mut Vec<u32>,
) -> Result<()> {
    loop {
        let wire = match commands::read_next_modified_rec(session, handle)? {
            Some(w) => w,
            None => break,
        };
        let remote = PdbRecord {
            id: wire.id,
            state: RecordStateWire::from_byte(wire.attrs),
            data: wire.data,
        };
        touched.push(remote.id);

        let idx = match local_records.iter().position(|l| l.id == remote.id) {
            Some(idx) => idx,
            None => {
                local_records.push(PdbRecord { id: remote.id, state: RecordStateWire(RecordState::Expunged), data: Vec::new() });
                local_records.len() - 1
            }
        };
        let payload_eq = local_records[idx].data == remote.data;
        let action = reconcile::decide(remote.state.0, local_records[idx].state.0, payload_eq);
        reconcile::apply(action, session, handle, archive, local_records, idx, &remote)?;
    }
    Ok(())
}

/// Pass 2: anything locally dirty or archived/expunged that the device
/// never reported as modified (`touched` doesn't contain its id) is a
/// local-only change that must be pushed up now. Brand-new local records
/// (id 0, never assigned by the device) are uploaded unconditionally.
fn push_local_only_changes(session: &mut DlpSession, handle: DbHandle, local_records: &mut Vec<PdbRecord>, touched: &[u32]) -> Result<()> {
    let mut i = 0;
    while i < local_records.len() {
        if touched.contains(&local_records[i].id) {
            i += 1;
            continue;
        }
        match local_records[i].state.0 {
            RecordState::Dirty { category, .. } => {
                let new_id = commands::write_record(session, handle, local_records[i].id, 0, category, &local_records[i].data)?;
                local_records[i].id = new_id;
                local_records[i].state = RecordStateWire(local_records[i].state.0.cleaned());
                i += 1;
            }
            RecordState::DeletedArchive => {
                // already archived when this record was first marked for
                // deletion locally; nothing new to do on the device besides
                // attempt the delete, which may legitimately 404 if the
                // device never had this id (a record created and archived
                // locally without ever uploading).
                let _ = commands::delete_record(session, handle, local_records[i].id);
                local_records.remove(i);
            }
            RecordState::Expunged => {
                let _ = commands::delete_record(session, handle, local_records[i].id);
                local_records.remove(i);
            }
            RecordState::Clean { .. } => i += 1,
        }
    }
    Ok(())
}
