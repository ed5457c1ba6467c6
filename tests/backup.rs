// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! End-to-end test of a fresh backup (spec.md §8 scenario 2): a
//! single-record remote database with no prior local image produces a
//! clean backup file and the expected DLP call sequence.

mod support;

use coldsync_core::dlp::commands::{self, db_flag, DbInfo};
use coldsync_core::dlp::status::DlpStatus;
use coldsync_core::dlp::{DlpSession, FIRST_ARG_ID};
use coldsync_core::padp::PadpLayer;
use coldsync_core::pdb::pdb_read;
use coldsync_core::slp::SlpLayer;
use coldsync_core::sync::archive::ArchiveWriter;
use coldsync_core::sync::backup::{backup, BackupOutcome};
use coldsync_core::time::DlpTime;

use support::{client_address, device_address, duplex_pair, spawn_device, wire_id_list, wire_record, Exchange};

#[test]
fn fresh_backup_of_single_record_database() {
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

    let script = vec![
        Exchange::ok(commands::opcode::OPEN_CONDUIT, vec![]),
        Exchange::ok(commands::opcode::OPEN_DB, vec![(FIRST_ARG_ID, vec![1])]),
        Exchange::ok(commands::opcode::READ_OPEN_DB_INFO, vec![(FIRST_ARG_ID, vec![0, 1])]),
        Exchange::status(commands::opcode::READ_APP_BLOCK, DlpStatus::NotFound),
        Exchange::status(commands::opcode::READ_SORT_BLOCK, DlpStatus::NotFound),
        Exchange::ok(commands::opcode::READ_RECORD_ID_LIST, vec![(FIRST_ARG_ID, wire_id_list(&[1]))]),
        Exchange::ok(commands::opcode::READ_RECORD_BY_ID, vec![(FIRST_ARG_ID, wire_record(1, 0, 0, b"Hello\0"))]),
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
    let outcome = backup(&mut session, 0, &db_info, &backup_path, &mut archive).unwrap();

    match outcome {
        BackupOutcome::Done { record_count } => assert_eq!(record_count, 1),
        BackupOutcome::Skipped { reason } => panic!("unexpected skip: {reason}"),
    }

    device.join().unwrap();

    let written = pdb_read(&std::fs::read(&backup_path).unwrap()).unwrap();
    assert_eq!(written.name, "Memo");
    let records = written.payloads.as_records().unwrap();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].id, 1);
    assert_eq!(records[0].data, b"Hello\0");
    assert!(records[0].state.0.is_clean());

    assert!(!archive_path.exists(), "nothing archived in scenario 2");
}
