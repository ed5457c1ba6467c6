// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! `pdb_write`: serialize a full database image, computing offsets in the
//! same order the reader expects them (§4.6). Callers that persist the
//! result to disk should go through [`crate::atomic_write`] rather than
//! writing the file directly, so a crash mid-write never destroys the
//! previous backup.

use crate::error::Result;
use crate::pdb::header::{
    PdbHeader, RecordIndexEntry, ResourceIndexEntry, HEADER_LEN, INDEX_HEADER_LEN, RECORD_INDEX_ENTRY_LEN,
    RESOURCE_INDEX_ENTRY_LEN,
};
use crate::pdb::{Payloads, PdbDatabase};

/// Serialize `db` into a byte buffer in on-disk order.
pub fn write(db: &PdbDatabase) -> Result<Vec<u8>> {
    let is_resource_db = db.is_resource_db();
    let numrecs = db.payloads.len();
    let entry_len = if is_resource_db { RESOURCE_INDEX_ENTRY_LEN } else { RECORD_INDEX_ENTRY_LEN };

    let mut cursor = HEADER_LEN + INDEX_HEADER_LEN + numrecs * entry_len + 2;
    let appinfo_offset = if let Some(a) = &db.appinfo {
        let off = cursor;
        cursor += a.len();
        off as u32
    } else {
        0
    };
    let sortinfo_offset = if let Some(s) = &db.sortinfo {
        let off = cursor;
        cursor += s.len();
        off as u32
    } else {
        0
    };

    let header = PdbHeader {
        name: db.name.clone(),
        attributes: db.attributes,
        version: db.version,
        ctime: db.ctime,
        mtime: db.mtime,
        baktime: db.baktime,
        modnum: db.modnum,
        appinfo_offset,
        sortinfo_offset,
        r#type: db.r#type,
        creator: db.creator,
        unique_id_seed: db.unique_id_seed,
    };

    let mut out = Vec::with_capacity(cursor);
    out.extend_from_slice(&header.encode()?);
    out.extend_from_slice(&0u32.to_be_bytes()); // nextID, unused by this crate
    out.extend_from_slice(&(numrecs as u16).to_be_bytes());

    match &db.payloads {
        Payloads::Records(records) => {
            let mut offset = cursor;
            for r in records {
                let entry = RecordIndexEntry { offset: offset as u32, attrs: r.state.to_byte(), unique_id: r.id };
                out.extend_from_slice(&entry.encode()?);
                offset += r.data.len();
            }
            out.extend_from_slice(&[0, 0]);
            if let Some(a) = &db.appinfo {
                out.extend_from_slice(a);
            }
            if let Some(s) = &db.sortinfo {
                out.extend_from_slice(s);
            }
            for r in records {
                out.extend_from_slice(&r.data);
            }
        }
        Payloads::Resources(resources) => {
            let mut offset = cursor;
            for r in resources {
                let entry = ResourceIndexEntry { r#type: r.r#type, id: r.id, offset: offset as u32 };
                out.extend_from_slice(&entry.encode()?);
                offset += r.data.len();
            }
            out.extend_from_slice(&[0, 0]);
            if let Some(a) = &db.appinfo {
                out.extend_from_slice(a);
            }
            if let Some(s) = &db.sortinfo {
                out.extend_from_slice(s);
            }
            for r in resources {
                out.extend_from_slice(&r.data);
            }
        }
    }

    Ok(out)
}
