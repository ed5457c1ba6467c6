// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! End-to-end test of slow-sync's archive-on-delete path (spec.md §8
//! scenario 5): a record the device reports as deleted-with-archive, whose
//! local copy is still clean, gets the local payload archived before both
//! copies disappear.

mod support;

use coldsync_core::dlp::commands::{self, db_flag, DbInfo};
use coldsync_core::dlp::status::DlpStatus;
use coldsync_core::dlp::{DlpSession, FIRST_ARG_ID};
use coldsync_core::padp::PadpLayer;
use coldsync_core::pdb::{Payloads, PdbDatabase, PdbRecord, RecordStateWire};
use coldsync_core::slp::SlpLayer;
use coldsync_core::sync::archive::{read_entries, ArchiveWriter};
use coldsync_core::sync::slow_sync::{slow_sync, SlowSyncOutcome};
use coldsync_core::time::DlpTime;

use support::{client_address, device_address, duplex_pair, spawn_device, wire_id_list, wire_record, Exchange};

#[test]
fn remote_deleted_archive_against_clean_local_archives_and_drops_both() {
    let dir = tempfile::tempdir().unwrap();
    let backup_path = dir.path().join("Memo.pdb");
    let archive_path = dir.path().join("Memo.pdb.archive");

    let db_info = DbInfo {
        index: 0,
        db_flags: db_flag::BACKUP,
        misc_flags: 0,
        r#type: *b"DATA",
        creator: *b"memo",
        version: 0,
        modnum: 0,
        ctime: DlpTime::UNKNOWN,
        mtime: DlpTime::UNKNOWN,
        baktime: DlpTime::UNKNOWN,
        name: "Memo".to_string(),
    };

    let mut local = PdbDatabase::new_record_db("Memo", *b"memo", *b"DATA", DlpTime::UNKNOWN);
    local.payloads = Payloads::Records(vec![PdbRecord { id: 0x30, state: RecordStateWire::from_byte(0), data: b"goodbye".to_vec() }]);

    let script = vec![
        Exchange::ok(commands::opcode::OPEN_CONDUIT, vec![]),
        Exchange::ok(commands::opcode::OPEN_DB, vec![(FIRST_ARG_ID, vec![1])]),
        Exchange::ok(commands::opcode::READ_OPEN_DB_INFO, vec![(FIRST_ARG_ID, vec![0, 1])]),
        Exchange::status(commands::opcode::READ_APP_BLOCK, DlpStatus::NotFound),
        Exchange::status(commands::opcode::READ_SORT_BLOCK, DlpStatus::NotFound),
        Exchange::ok(commands::opcode::READ_RECORD_ID_LIST, vec![(FIRST_ARG_ID, wire_id_list(&[0x30]))]),
        Exchange::ok(commands::opcode::READ_RECORD_BY_ID, vec![(FIRST_ARG_ID, wire_record(0x30, 0x88, 0, b""))]),
        Exchange::ok(commands::opcode::DELETE_RECORD, vec![]),
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
    let outcome = slow_sync(&mut session, 0, &db_info, Some(local), &backup_path, &mut archive).unwrap();

    match outcome {
        SlowSyncOutcome::Done { record_count } => assert_eq!(record_count, 0),
        SlowSyncOutcome::Skipped { reason } => panic!("unexpected skip: {reason}"),
    }

    device.join().unwrap();

    let written = coldsync_core::pdb::pdb_read(&std::fs::read(&backup_path).unwrap()).unwrap();
    assert!(written.payloads.as_records().unwrap().is_empty());

    assert!(archive_path.exists(), "local payload must be archived before both copies disappear");
    let entries = read_entries(&archive_path).unwrap();
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].data, b"goodbye");
}
