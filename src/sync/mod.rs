// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! The record-level synchronization engine: backup, slow-sync, fast-sync,
//! the shared per-record reconciliation table, the archive writer, and
//! post-sync local-file housekeeping (§4.7, §4.8).

pub mod archive;
pub mod attrs;
pub mod backup;
pub mod fast_sync;
pub mod housekeeping;
pub mod reconcile;
pub mod slow_sync;

use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::connection::{ConnectionConfig, PConnection};
use crate::dlp::commands::{self, DbHandle, DbInfo, EndOfSyncStatus};
use crate::error::Result;
use crate::octet::PortIo;
use crate::pdb::PdbDatabase;
use crate::sync::archive::ArchiveWriter;

/// Which of the three entry points applies to a given database, decided by
/// the caller from the device's last-sync-PC id (§9 glossary).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncMode {
    Backup,
    SlowSync,
    FastSync,
}

/// A shared, cooperative cancellation flag threaded through the engine
/// instead of the original C code's global error slot (§9 design notes).
/// Checked between databases; an in-flight DLP call is not interrupted
/// mid-flight, only the next database boundary.
#[derive(Debug, Clone, Default)]
pub struct CancellationToken(Arc<AtomicBool>);

impl CancellationToken {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }

    /// Return `Err(Error::Cancelled)` if cancellation has been requested;
    /// call this between databases.
    pub fn check(&self) -> crate::error::Result<()> {
        if self.is_cancelled() {
            Err(crate::error::Error::Cancelled)
        } else {
            Ok(())
        }
    }
}

/// Accumulates one line per database for the whole session; flushed via a
/// single `AddSyncLogEntry` call at the end, because the device silently
/// discards every call after the first (§9, §4.5, §7).
#[derive(Debug, Default)]
pub struct SessionLog {
    lines: Vec<String>,
}

impl SessionLog {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, line: impl Into<String>) {
        self.lines.push(line.into());
    }

    /// Record a per-database outcome in the conventional "name: reason"
    /// shape the sync engine's callers expect to see in HotSync's log.
    pub fn record(&mut self, db_name: &str, reason: &str) {
        self.push(format!("{db_name}: {reason}"));
    }

    #[must_use]
    pub fn render(&self) -> String {
        self.lines.join("\n")
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }
}

/// Policy hook letting an external collaborator skip databases by name
/// without the core parsing any config file itself (SPEC_FULL.md §3).
pub type SkipPredicate<'a> = &'a dyn Fn(&str) -> bool;

// The four boundary entry points a collaborator drives a session through
// (§6): open the line and run the CMP handshake, sync one database by
// whichever mode applies to it, upload a brand-new database that only
// exists locally so far, and end the session with a termination reason.

/// Take ownership of an already-open serial descriptor, bind the
/// conventional PADP ports, and run the CMP handshake. Returns the
/// negotiated line speed alongside the ready-to-use connection.
pub fn connect_and_handshake(
    io: Box<dyn PortIo>,
    local_port: u8,
    remote_port: u8,
    config: &ConnectionConfig,
) -> Result<(PConnection, u32)> {
    let mut conn = PConnection::new_padp_with_config(io, local_port, remote_port, config);
    let bps = conn.handshake(config)?;
    Ok((conn, bps))
}

/// Sync one database according to `mode`, dispatching to [`backup`],
/// [`slow_sync`], or [`fast_sync`] as appropriate, and accumulating a
/// one-line outcome into `log`.
#[allow(clippy::too_many_arguments)]
pub fn sync_database(
    conn: &mut PConnection,
    card: u8,
    db_info: &DbInfo,
    mode: SyncMode,
    local_image: Option<PdbDatabase>,
    backup_path: &Path,
    archive: &mut ArchiveWriter,
    log: &mut SessionLog,
) -> Result<()> {
    let mut session = conn.dlp();
    match mode {
        SyncMode::Backup => match backup::backup(&mut session, card, db_info, backup_path, archive)? {
            backup::BackupOutcome::Done { record_count } => {
                log.record(&db_info.name, &format!("backed up {record_count} records"));
            }
            backup::BackupOutcome::Skipped { reason } => {
                log.record(&db_info.name, &format!("skipped: {reason}"));
            }
        },
        SyncMode::SlowSync => {
            match slow_sync::slow_sync(&mut session, card, db_info, local_image, backup_path, archive)? {
                slow_sync::SlowSyncOutcome::Done { record_count } => {
                    log.record(&db_info.name, &format!("slow-synced {record_count} records"));
                }
                slow_sync::SlowSyncOutcome::Skipped { reason } => {
                    log.record(&db_info.name, &format!("skipped: {reason}"));
                }
            }
        }
        SyncMode::FastSync => {
            let local = local_image.ok_or_else(|| crate::error::Error::Corrupt(format!("{}: fast-sync requires a prior local image", db_info.name)))?;
            match fast_sync::fast_sync(&mut session, card, &db_info.name, local, backup_path, archive)? {
                fast_sync::FastSyncOutcome::Done { record_count } => {
                    log.record(&db_info.name, &format!("fast-synced {record_count} records"));
                }
                fast_sync::FastSyncOutcome::Skipped { reason } => {
                    log.record(&db_info.name, &format!("skipped: {reason}"));
                }
            }
        }
    }
    Ok(())
}

/// Upload a database that exists only locally so far (e.g. freshly
/// installed from `$PALM/install/`) into a brand-new database on the
/// device.
pub fn upload_file(conn: &mut PConnection, card: u8, db: &mut PdbDatabase) -> Result<DbHandle> {
    let mut session = conn.dlp();
    crate::pdb::transfer::pdb_upload(&mut session, card, db)
}

/// Flush the accumulated session log with the single `AddSyncLogEntry`
/// call the device will actually keep, then end the session (§9).
pub fn end_session(conn: &mut PConnection, status: EndOfSyncStatus, log: &SessionLog) -> Result<()> {
    let mut session = conn.dlp();
    if !log.is_empty() {
        commands::add_sync_log_entry(&mut session, &log.render())?;
    }
    commands::end_of_sync(&mut session, status)
}
