// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Slow-sync: used whenever the device's last-sync-PC doesn't match this
//! host, so fast-sync's DIRTY-flag trust can't be relied on (§4.7). Phase 1
//! downloads the whole remote database and compares it byte-for-byte
//! against the local image to recover an effective DIRTY state; Phase 2
//! runs the same per-record table [`crate::sync::reconcile`] uses.
//!
//! Resource databases have no DIRTY flag and no archive semantics in the
//! original design (§9 open questions); this module handles them by
//! wholesale replacement rather than attempting a resource-level analogue
//! of the record reconciliation table.

use crate::dlp::commands::{self, open_mode, DbHandle};
use crate::dlp::status::DlpStatus;
use crate::dlp::DlpSession;
use crate::error::{Error, Result};
use crate::pdb::transfer::pdb_download;
use crate::pdb::{Payloads, PdbDatabase, PdbRecord, RecordStateWire};
use crate::sync::archive::ArchiveWriter;
use crate::sync::attrs::RecordState;
use crate::sync::reconcile;

/// Outcome of slow-syncing one database, for the caller's session log.
#[derive(Debug)]
pub enum SlowSyncOutcome {
    Done { record_count: usize },
    Skipped { reason: &'static str },
}

/// Slow-sync the database named `db_info.name`, reconciling `local` (the
/// previous backup image, or `None` if there wasn't one) against the
/// device and writing the result to `backup_path`.
#[allow(clippy::too_many_arguments)]
pub fn slow_sync(
    session: &mut DlpSession,
    card: u8,
    db_info: &commands::DbInfo,
    local: Option<PdbDatabase>,
    backup_path: &std::path::Path,
    archive: &mut ArchiveWriter,
) -> Result<SlowSyncOutcome> {
    commands::open_conduit(session)?;

    let handle = match commands::open_db(session, card, &db_info.name, open_mode::READ | open_mode::WRITE) {
        Ok(h) => h,
        Err(Error::DlpStatus(DlpStatus::TooManyOpenDatabases)) => {
            return Ok(SlowSyncOutcome::Skipped { reason: "too many open databases" })
        }
        Err(Error::DlpStatus(DlpStatus::CantOpen)) => return Ok(SlowSyncOutcome::Skipped { reason: "can't open database" }),
        Err(Error::DlpStatus(DlpStatus::ReadOnly)) => return Ok(SlowSyncOutcome::Skipped { reason: "database is read-only" }),
        Err(e) => return Err(e),
    };

    let is_resource_db = db_info.is_resource_db();
    let mut remote = pdb_download(
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

    let record_count = if is_resource_db {
        // No per-resource DIRTY tracking exists on the wire; the remote
        // image is authoritative.
        remote.payloads.len()
    } else {
        let mut local_records = match local {
            Some(db) => match db.payloads {
                Payloads::Records(records) => records,
                Payloads::Resources(_) => Vec::new(),
            },
            None => Vec::new(),
        };

        let remote_records = match &mut remote.payloads {
            Payloads::Records(r) => r,
            Payloads::Resources(_) => unreachable!("resource database handled above"),
        };

        mark_effective_dirty(remote_records, &local_records);
        drop_clean_orphans(remote_records, &mut local_records);
        reconcile_phase_two(session, handle, archive, remote_records, &mut local_records)?;

        let count = local_records.len();
        remote.payloads = Payloads::Records(local_records);
        count
    };

    let bytes = crate::pdb::pdb_write(&remote)?;
    crate::atomic_write::write_atomic(backup_path, &bytes)?;

    if !is_resource_db {
        commands::clean_up_database(session, handle)?;
        commands::reset_sync_flags(session, handle)?;
    }
    commands::close_db(session, handle)?;

    Ok(SlowSyncOutcome::Done { record_count })
}

/// Phase 1: a remote record whose local counterpart is missing, a
/// different length, or byte-different is treated as DIRTY even if the
/// device didn't say so, since the last-sync-PC mismatch means the
/// device's DIRTY bits can't be trusted (§4.7).
fn mark_effective_dirty(remote_records: &mut [PdbRecord], local_records: &[PdbRecord]) {
    for remote in remote_records.iter_mut() {
        if matches!(remote.state.0, RecordState::Expunged | RecordState::DeletedArchive) {
            continue;
        }
        let local = local_records.iter().find(|l| l.id == remote.id);
        let differs = match local {
            None => true,
            Some(l) => l.data != remote.data,
        };
        if differs {
            if let RecordState::Clean { category, busy, private } = remote.state.0 {
                remote.state = RecordStateWire(RecordState::Dirty { category, busy, private });
            }
        }
    }
}

/// A local record with no remote counterpart was deleted on the device
/// between syncs; drop it locally if it was clean (not a pending local
/// edit we'd otherwise lose).
fn drop_clean_orphans(remote_records: &[PdbRecord], local_records: &mut Vec<PdbRecord>) {
    local_records.retain(|local| remote_records.iter().any(|r| r.id == local.id) || !local.state.0.is_clean());
}

/// Phase 2: run the shared reconciliation table over every remote record
/// against its local counterpart (inserting a fresh local entry for
/// remote records local doesn't have yet, which the table treats as
/// local-`Expunged` since there's nothing there to compare).
fn reconcile_phase_two(
    session: &mut DlpSession,
    handle: DbHandle,
    archive: &mut ArchiveWriter,
    remote_records: &[PdbRecord],
    local_records: &mut Vec<PdbRecord>,
) -> Result<()> {
    for remote in remote_records {
        let local_idx = local_records.iter().position(|l| l.id == remote.id);
        let idx = match local_idx {
            Some(idx) => idx,
            None => {
                local_records.push(placeholder_expunged(remote.id));
                local_records.len() - 1
            }
        };
        let local_state = local_records[idx].state.0;
        let payload_eq = local_records[idx].data == remote.data;
        let action = reconcile::decide(remote.state.0, local_state, payload_eq);
        reconcile::apply(action, session, handle, archive, local_records, idx, remote)?;
    }
    Ok(())
}

fn placeholder_expunged(id: u32) -> PdbRecord {
    PdbRecord { id, state: RecordStateWire(RecordState::Expunged), data: Vec::new() }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn clean(id: u32, data: &[u8]) -> PdbRecord {
        PdbRecord { id, state: RecordStateWire::from_byte(0), data: data.to_vec() }
    }

    #[test]
    fn identical_payload_stays_clean() {
        let mut remote = vec![clean(1, b"same")];
        let local = vec![clean(1, b"same")];
        mark_effective_dirty(&mut remote, &local);
        assert!(remote[0].state.0.is_clean());
    }

    #[test]
    fn differing_payload_becomes_dirty() {
        let mut remote = vec![clean(1, b"new")];
        let local = vec![clean(1, b"old")];
        mark_effective_dirty(&mut remote, &local);
        assert!(remote[0].state.0.is_dirty());
    }

    #[test]
    fn missing_local_counterpart_becomes_dirty() {
        let mut remote = vec![clean(1, b"new")];
        mark_effective_dirty(&mut remote, &[]);
        assert!(remote[0].state.0.is_dirty());
    }

    #[test]
    fn clean_orphan_local_record_is_dropped() {
        let remote = vec![clean(1, b"x")];
        let mut local = vec![clean(1, b"x"), clean(2, b"gone")];
        drop_clean_orphans(&remote, &mut local);
        assert_eq!(local.len(), 1);
        assert_eq!(local[0].id, 1);
    }

    #[test]
    fn dirty_orphan_local_record_is_kept() {
        let remote = vec![clean(1, b"x")];
        let dirty_local = PdbRecord { id: 2, state: RecordStateWire(RecordState::Dirty { category: 0, busy: false, private: false }), data: b"pending".to_vec() };
        let mut local = vec![clean(1, b"x"), dirty_local];
        drop_clean_orphans(&remote, &mut local);
        assert_eq!(local.len(), 2);
    }

    // `slow_sync()` itself is exercised end-to-end against a scripted DLP
    // session in the integration tests.
}
