// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! The per-record reconciliation table shared by slow-sync and fast-sync
//! (§4.7). Given a remote record's state and a local record's state, this
//! decides the one matching action and applies it: some combination of
//! archiving a payload, deleting on the device, uploading the local copy,
//! or replacing/duplicating the local entry.
//!
//! `decide` is pure so it can be unit-tested against the full table
//! without a DLP session; `apply` is the only place that touches the wire,
//! the archive file, and the local record vector.

use crate::dlp::commands::{self, DbHandle};
use crate::dlp::DlpSession;
use crate::error::Result;
use crate::pdb::{PdbRecord, RecordStateWire};
use crate::sync::archive::ArchiveWriter;
use crate::sync::attrs::RecordState;

/// One of the fourteen distinct outcomes the table collapses to (several
/// rows share an action verbatim, e.g. every "remote already gone, just
/// drop the local copy" row).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    /// Both sides want this record archived-and-deleted. Archive the
    /// remote payload, and the local one too if it differs, then delete
    /// on the device and locally.
    ArchiveThenDeleteBoth { archive_local_too: bool },
    /// Remote archived-delete, local already expunged or clean: archive
    /// the remote payload, delete on the device, drop the local entry.
    ArchiveRemoteThenDeleteBoth,
    /// Remote archived-delete, local dirty: archive the remote payload,
    /// upload the local edit, keep the (now clean) local record.
    ArchiveRemoteThenUploadLocalKeepLocal,
    /// Remote archived-delete, local clean: archive the local payload,
    /// delete on the device, drop the local entry.
    ArchiveLocalThenDeleteBoth,
    /// Local wants this archived-and-deleted and the device copy is
    /// already gone (or unmodified and literally told to go): archive the
    /// local payload and drop the local entry.
    ArchiveLocalThenDeleteLocalOnly,
    /// The device has nothing left worth keeping and local doesn't either
    /// (or local also wants it gone with no trace): just drop the local
    /// entry.
    DeleteLocalOnly,
    /// Remote reports the record gone/expunged but local is dirty: delete
    /// the stale id on the device, then upload the local edit fresh.
    DeleteRemoteThenUploadLocal,
    /// Remote dirty, local archived-delete: archive the local payload,
    /// then adopt the remote's content as the new clean local record.
    ArchiveLocalThenReplaceWithRemote,
    /// Remote dirty, local expunged: drop the local entry and insert a
    /// clean copy of the remote record in its place.
    DeleteLocalThenInsertRemote,
    /// Both dirty with identical payloads: nothing to move, just clear
    /// DIRTY on both sides.
    ClearDirtyBothSides,
    /// Both dirty with different payloads: upload the local edit (it may
    /// be assigned a new id), then insert the remote's edit as a
    /// separate local record so neither edit is lost.
    UploadLocalThenInsertRemoteSeparately,
    /// Remote dirty, local clean: adopt the remote's content as the new
    /// clean local record.
    ReplaceLocalWithRemote,
    /// Remote clean, local dirty: upload the local edit and adopt
    /// whatever id the device assigns.
    UploadLocalAndUpdateId,
    /// Both sides agree; nothing to do.
    NoOp,
}

/// Decide the action for one `(remote, local)` pair. `payload_eq` is
/// whatever the caller has already determined about the two payloads
/// (byte-for-byte equality); rows that don't care about it ignore it.
#[must_use]
pub fn decide(remote: RecordState, local: RecordState, payload_eq: bool) -> Action {
    use RecordState::{Clean, DeletedArchive, Dirty, Expunged};

    match (remote, local) {
        (DeletedArchive, DeletedArchive) => Action::ArchiveThenDeleteBoth { archive_local_too: !payload_eq },
        (DeletedArchive, Expunged) => Action::ArchiveRemoteThenDeleteBoth,
        (DeletedArchive, Dirty { .. }) => Action::ArchiveRemoteThenUploadLocalKeepLocal,
        (DeletedArchive, Clean { .. }) => Action::ArchiveLocalThenDeleteBoth,

        (Expunged, DeletedArchive) => Action::ArchiveLocalThenDeleteLocalOnly,
        (Expunged, Expunged) => Action::DeleteLocalOnly,
        (Expunged, Dirty { .. }) => Action::DeleteRemoteThenUploadLocal,
        (Expunged, Clean { .. }) => Action::DeleteLocalOnly,

        (Dirty { .. }, DeletedArchive) => Action::ArchiveLocalThenReplaceWithRemote,
        (Dirty { .. }, Expunged) => Action::DeleteLocalThenInsertRemote,
        (Dirty { .. }, Dirty { .. }) => {
            if payload_eq {
                Action::ClearDirtyBothSides
            } else {
                Action::UploadLocalThenInsertRemoteSeparately
            }
        }
        (Dirty { .. }, Clean { .. }) => Action::ReplaceLocalWithRemote,

        (Clean { .. }, DeletedArchive) => Action::ArchiveLocalThenDeleteLocalOnly,
        (Clean { .. }, Expunged) => Action::DeleteLocalOnly,
        (Clean { .. }, Dirty { .. }) => Action::UploadLocalAndUpdateId,
        (Clean { .. }, Clean { .. }) => Action::NoOp,
    }
}

/// Upload `record` in place: the device updates the record already
/// identified by `record.id`. Correct only when the remote's own id is
/// still meant to carry the local edit (`UploadLocalAndUpdateId`,
/// `DeleteRemoteThenUploadLocal` — the remote copy of this id is already
/// gone or about to be).
fn upload(session: &mut DlpSession, handle: DbHandle, record: &PdbRecord) -> Result<u32> {
    let category = record.state.0.category().unwrap_or(0);
    commands::write_record(session, handle, record.id, 0, category, &record.data)
}

/// Upload `record` as a brand-new device record: id `0` forces the
/// device to assign a fresh uniqueID rather than overwriting whatever
/// record currently holds `record.id`. Required whenever the remote's own
/// copy of that id must survive the upload
/// (`ArchiveRemoteThenUploadLocalKeepLocal`,
/// `UploadLocalThenInsertRemoteSeparately`) — writing with the existing
/// id there would clobber the remote record instead of creating a
/// separate one, losing its payload.
fn upload_as_new(session: &mut DlpSession, handle: DbHandle, record: &PdbRecord) -> Result<u32> {
    let category = record.state.0.category().unwrap_or(0);
    commands::write_record(session, handle, 0, 0, category, &record.data)
}

/// Execute `action` against the device and the local record vector.
/// `local_idx` must point at the local record named in the `(remote,
/// local)` pair that produced `action`; it is invalidated by this call
/// (the record at that index may be removed, replaced, or duplicated).
pub fn apply(
    action: Action,
    session: &mut DlpSession,
    handle: DbHandle,
    archive: &mut ArchiveWriter,
    local_records: &mut Vec<PdbRecord>,
    local_idx: usize,
    remote: &PdbRecord,
) -> Result<()> {
    match action {
        Action::ArchiveThenDeleteBoth { archive_local_too } => {
            archive.append(&remote.data)?;
            if archive_local_too {
                archive.append(&local_records[local_idx].data)?;
            }
            commands::delete_record(session, handle, remote.id)?;
            local_records.remove(local_idx);
        }
        Action::ArchiveRemoteThenDeleteBoth => {
            archive.append(&remote.data)?;
            commands::delete_record(session, handle, remote.id)?;
            local_records.remove(local_idx);
        }
        Action::ArchiveRemoteThenUploadLocalKeepLocal => {
            archive.append(&remote.data)?;
            let new_id = upload_as_new(session, handle, &local_records[local_idx])?;
            local_records[local_idx].id = new_id;
            local_records[local_idx].state = RecordStateWire(local_records[local_idx].state.0.cleaned());
        }
        Action::ArchiveLocalThenDeleteBoth => {
            archive.append(&local_records[local_idx].data)?;
            commands::delete_record(session, handle, remote.id)?;
            local_records.remove(local_idx);
        }
        Action::ArchiveLocalThenDeleteLocalOnly => {
            archive.append(&local_records[local_idx].data)?;
            local_records.remove(local_idx);
        }
        Action::DeleteLocalOnly => {
            local_records.remove(local_idx);
        }
        Action::DeleteRemoteThenUploadLocal => {
            commands::delete_record(session, handle, remote.id)?;
            let new_id = upload(session, handle, &local_records[local_idx])?;
            local_records[local_idx].id = new_id;
            local_records[local_idx].state = RecordStateWire(local_records[local_idx].state.0.cleaned());
        }
        Action::ArchiveLocalThenReplaceWithRemote => {
            archive.append(&local_records[local_idx].data)?;
            local_records[local_idx] = clean_copy_of(remote);
        }
        Action::DeleteLocalThenInsertRemote => {
            local_records[local_idx] = clean_copy_of(remote);
        }
        Action::ClearDirtyBothSides => {
            local_records[local_idx].state = RecordStateWire(local_records[local_idx].state.0.cleaned());
        }
        Action::UploadLocalThenInsertRemoteSeparately => {
            let new_id = upload_as_new(session, handle, &local_records[local_idx])?;
            local_records[local_idx].id = new_id;
            local_records[local_idx].state = RecordStateWire(local_records[local_idx].state.0.cleaned());
            local_records.insert(local_idx + 1, clean_copy_of(remote));
        }
        Action::ReplaceLocalWithRemote => {
            local_records[local_idx] = clean_copy_of(remote);
        }
        Action::UploadLocalAndUpdateId => {
            let new_id = upload(session, handle, &local_records[local_idx])?;
            local_records[local_idx].id = new_id;
            local_records[local_idx].state = RecordStateWire(local_records[local_idx].state.0.cleaned());
        }
        Action::NoOp => {}
    }
    Ok(())
}

/// A clean (non-dirty, non-deleted) copy of `remote`, used whenever the
/// local image adopts the device's content verbatim.
fn clean_copy_of(remote: &PdbRecord) -> PdbRecord {
    PdbRecord {
        id: remote.id,
        state: RecordStateWire(remote.state.0.cleaned()),
        data: remote.data.clone(),
    }
}
