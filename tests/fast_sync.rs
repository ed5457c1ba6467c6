// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! End-to-end test of fast-sync's modified-record pass (spec.md §8
//! scenarios 3 and 4): one record DIRTY on both sides with identical
//! payloads just clears the flags, and one record DIRTY on both sides with
//! differing payloads uploads the local edit and keeps the remote edit as a
//! separate record.

mod support;

use coldsync_core::dlp::commands;
use coldsync_core::dlp::status::DlpStatus;
use coldsync_core::dlp::{DlpSession, FIRST_ARG_ID};
use coldsync_core::padp::PadpLayer;
use coldsync_core::pdb::{Payloads, PdbDatabase, PdbRecord, RecordStateWire};
use coldsync_core::slp::SlpLayer;
use coldsync_core::sync::archive::ArchiveWriter;
use coldsync_core::sync::attrs::RecordState;
use coldsync_core::sync::fast_sync::{fast_sync, FastSyncOutcome};
use coldsync_core::time::DlpTime;

use support::{client_address, device_address, duplex_pair, spawn_device, wire_record, Exchange};

fn dirty(data: &[u8]) -> PdbRecord {
    PdbRecord { id: 0, state: RecordStateWire(RecordState::Dirty { category: 0, busy: false, private: false }), data: data.to_vec() }
}

#[test]
fn identical_dirty_payload_clears_flags_no_device_call() {
    let dir = tempfile::tempdir().unwrap();
    let backup_path = dir.path().join("Memo.pdb");
    let archive_path = dir.path().join("Memo.pdb.archive");

    let mut local = PdbDatabase::new_record_db("Memo", *b"memo", *b"DATA", DlpTime::UNKNOWN);
    let mut rec = dirty(b"abc");
    rec.id = 0x10;
    local.payloads = Payloads::Records(vec![rec]);

    let script = vec![
        Exchange::ok(commands::opcode::OPEN_CONDUIT, vec![]),
        Exchange::ok(commands::opcode::OPEN_DB, vec![(FIRST_ARG_ID, vec![1])]),
        Exchange::ok(commands::opcode::READ_NEXT_MODIFIED_REC, vec![(FIRST_ARG_ID, wire_record(0x10, 0x40, 0, b"abc"))]),
        Exchange::status(commands::opcode::READ_NEXT_MODIFIED_REC, DlpStatus::NotFound),
        Exchange::ok(commands::opcode::CLEAN_UP_DATABASE, vec![]),
        Exchange::ok(commands::opcode::RESET_SYNC_FLAGS, vec![]),
        Exchange::ok(commands::opcode::CLOSE_DB, vec![]),
    ];

    let (mut client_io, device_io) = duplex_pair();
    let device = spawn_device(device_io, device_address(), client_address(), script);

    let mut client_slp = SlpLayer::new(client_address());
    let mut client_padp = PadpLayer::new(device_address());
    let mut session = DlpSession::new(&mut client_io, &mut client_slp, &mut client_padp);

    let mut archive = ArchiveWriter::new(archive_path.clone(), "Memo", *b"DATA", *b"memo");
    let outcome = fast_sync(&mut session, 0, "Memo", local, &backup_path, &mut archive).unwrap();

    match outcome {
        FastSyncOutcome::Done { record_count } => assert_eq!(record_count, 1),
        FastSyncOutcome::Skipped { reason } => panic!("unexpected skip: {reason}"),
    }

    device.join().unwrap();

    let written = coldsync_core::pdb::pdb_read(&std::fs::read(&backup_path).unwrap()).unwrap();
    let records = written.payloads.as_records().unwrap();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].id, 0x10);
    assert!(records[0].state.0.is_clean(), "dirty flag must be cleared on both sides");
    assert!(!archive_path.exists());
}

#[test]
fn differing_dirty_payload_uploads_local_and_keeps_remote_separately() {
    let dir = tempfile::tempdir().unwrap();
    let backup_path = dir.path().join("Memo.pdb");
    let archive_path = dir.path().join("Memo.pdb.archive");

    let mut local = PdbDatabase::new_record_db("Memo", *b"memo", *b"DATA", DlpTime::UNKNOWN);
    let mut rec = dirty(b"v2-local");
    rec.id = 0x20;
    local.payloads = Payloads::Records(vec![rec]);

    let script = vec![
        Exchange::ok(commands::opcode::OPEN_CONDUIT, vec![]),
        Exchange::ok(commands::opcode::OPEN_DB, vec![(FIRST_ARG_ID, vec![1])]),
        Exchange::ok(commands::opcode::READ_NEXT_MODIFIED_REC, vec![(FIRST_ARG_ID, wire_record(0x20, 0x40, 0, b"v2-remote"))]),
        Exchange::ok(commands::opcode::WRITE_RECORD, vec![(FIRST_ARG_ID, 0x21u32.to_be_bytes().to_vec())]),
        Exchange::status(commands::opcode::READ_NEXT_MODIFIED_REC, DlpStatus::NotFound),
        Exchange::ok(commands::opcode::CLEAN_UP_DATABASE, vec![]),
        Exchange::ok(commands::opcode::RESET_SYNC_FLAGS, vec![]),
        Exchange::ok(commands::opcode::CLOSE_DB, vec![]),
    ];

    let (mut client_io, device_io) = duplex_pair();
    let device = spawn_device(device_io, device_address(), client_address(), script);

    let mut client_slp = SlpLayer::new(client_address());
    let mut client_padp = PadpLayer::new(device_address());
    let mut session = DlpSession::new(&mut client_io, &mut client_slp, &mut client_padp);

    let mut archive = ArchiveWriter::new(archive_path.clone(), "Memo", *b"DATA", *b"memo");
    let outcome = fast_sync(&mut session, 0, "Memo", local, &backup_path, &mut archive).unwrap();

    match outcome {
        FastSyncOutcome::Done { record_count } => assert_eq!(record_count, 2),
        FastSyncOutcome::Skipped { reason } => panic!("unexpected skip: {reason}"),
    }

    device.join().unwrap();

    let written = coldsync_core::pdb::pdb_read(&std::fs::read(&backup_path).unwrap()).unwrap();
    let records = written.payloads.as_records().unwrap();
    assert_eq!(records.len(), 2);
    assert!(records.iter().all(|r| r.state.0.is_clean()));

    let uploaded = records.iter().find(|r| r.id == 0x21).expect("uploaded local edit keeps its new device-assigned id");
    assert_eq!(uploaded.data, b"v2-local");

    let inserted = records.iter().find(|r| r.id == 0x20).expect("remote edit is kept as a separate record");
    assert_eq!(inserted.data, b"v2-remote");

    assert!(!archive_path.exists(), "no archiving involved in a dirty/dirty split");
}
