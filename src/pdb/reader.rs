// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! `pdb_read`: parse a full database image out of a byte buffer.
//!
//! Tolerant of small offset mis-predictions (seeks to the stated offset
//! with a warning) but intolerant of truncation (§4.6).

use crate::dlp::commands::db_flag;
use crate::error::{Error, Result};
use crate::pdb::header::{
    PdbHeader, RecordIndexEntry, ResourceIndexEntry, HEADER_LEN, INDEX_HEADER_LEN, RECORD_INDEX_ENTRY_LEN,
    RESOURCE_INDEX_ENTRY_LEN,
};
use crate::pdb::{Payloads, PdbDatabase, PdbRecord, PdbResource, RecordStateWire};
use crate::sync::attrs::RecordState;

/// Parse a complete `.pdb`/`.prc` image from `bytes`.
pub fn read(bytes: &[u8]) -> Result<PdbDatabase> {
    if bytes.len() < HEADER_LEN + INDEX_HEADER_LEN {
        return Err(Error::Corrupt("file shorter than header + index header".into()));
    }
    let header = PdbHeader::decode(&bytes[..HEADER_LEN])?;
    let is_resource_db = header.attributes & db_flag::RESDB != 0;

    let mut cursor = HEADER_LEN;
    let _next_id = u32::from_be_bytes([bytes[cursor], bytes[cursor + 1], bytes[cursor + 2], bytes[cursor + 3]]);
    let numrecs = u16::from_be_bytes([bytes[cursor + 4], bytes[cursor + 5]]) as usize;
    cursor += INDEX_HEADER_LEN;

    let entry_len = if is_resource_db { RESOURCE_INDEX_ENTRY_LEN } else { RECORD_INDEX_ENTRY_LEN };
    let index_end = cursor + numrecs * entry_len;
    if bytes.len() < index_end + 2 {
        return Err(Error::Corrupt("truncated index".into()));
    }

    struct RecEntry {
        offset: u32,
        attrs: u8,
        unique_id: u32,
    }
    struct ResEntry {
        r#type: [u8; 4],
        id: u16,
        offset: u32,
    }

    let mut rec_entries = Vec::new();
    let mut res_entries = Vec::new();
    for i in 0..numrecs {
        let start = cursor + i * entry_len;
        let slice = &bytes[start..start + entry_len];
        if is_resource_db {
            let e = ResourceIndexEntry::decode(slice)?;
            res_entries.push(ResEntry { r#type: e.r#type, id: e.id, offset: e.offset });
        } else {
            let e = RecordIndexEntry::decode(slice)?;
            rec_entries.push(RecEntry { offset: e.offset, attrs: e.attrs, unique_id: e.unique_id });
        }
    }
    cursor = index_end;
    // Two mandatory padding bytes (§3 invariant 3).
    cursor += 2;

    // Determine aux-block lengths by subtracting from the next non-zero
    // offset in the chain: appinfo -> sortinfo -> first payload -> EOF.
    let first_payload_offset = if is_resource_db {
        res_entries.first().map(|e| e.offset as usize)
    } else {
        rec_entries.first().map(|e| e.offset as usize)
    }
    .unwrap_or(bytes.len());

    let appinfo = read_aux_block(bytes, header.appinfo_offset as usize, |off| {
        next_boundary(off, header.sortinfo_offset as usize, first_payload_offset, bytes.len())
    })?;
    if let Some(off) = nonzero(header.appinfo_offset as usize) {
        if off != cursor {
            crate::warn!("pdb: appinfo offset {off} != expected cursor {cursor}, seeking");
        }
        cursor = off + appinfo.as_ref().map_or(0, Vec::len);
    }

    let sortinfo = read_aux_block(bytes, header.sortinfo_offset as usize, |off| {
        next_boundary(off, first_payload_offset, first_payload_offset, bytes.len())
    })?;
    if let Some(off) = nonzero(header.sortinfo_offset as usize) {
        if off != cursor {
            crate::warn!("pdb: sortinfo offset {off} != expected cursor {cursor}, seeking");
        }
        cursor = off + sortinfo.as_ref().map_or(0, Vec::len);
    }

    let payloads = if is_resource_db {
        let mut resources = Vec::with_capacity(res_entries.len());
        for (i, e) in res_entries.iter().enumerate() {
            let offset = e.offset as usize;
            if offset != cursor {
                crate::warn!("pdb: resource {i} offset {offset} != expected cursor {cursor}, seeking");
            }
            let end = res_entries.get(i + 1).map_or(bytes.len(), |n| n.offset as usize);
            if end > bytes.len() || offset > end {
                return Err(Error::Corrupt("resource payload truncated".into()));
            }
            let data = bytes[offset..end].to_vec();
            cursor = end;
            resources.push(PdbResource { r#type: e.r#type, id: e.id, data });
        }
        Payloads::Resources(resources)
    } else {
        let mut records = Vec::with_capacity(rec_entries.len());
        for (i, e) in rec_entries.iter().enumerate() {
            let offset = e.offset as usize;
            if offset != cursor {
                crate::warn!("pdb: record {i} offset {offset} != expected cursor {cursor}, seeking");
            }
            let end = rec_entries.get(i + 1).map_or(bytes.len(), |n| n.offset as usize);
            if end > bytes.len() || offset > end {
                return Err(Error::Corrupt("record payload truncated".into()));
            }
            let data = bytes[offset..end].to_vec();
            cursor = end;
            records.push(PdbRecord {
                id: e.unique_id,
                state: RecordStateWire(RecordState::from_wire(e.attrs)),
                data,
            });
        }
        Payloads::Records(records)
    };

    Ok(PdbDatabase {
        name: header.name,
        attributes: header.attributes,
        version: header.version,
        ctime: header.ctime,
        mtime: header.mtime,
        baktime: header.baktime,
        modnum: header.modnum,
        r#type: header.r#type,
        creator: header.creator,
        unique_id_seed: header.unique_id_seed,
        appinfo,
        sortinfo,
        payloads,
    })
}

fn nonzero(offset: usize) -> Option<usize> {
    if offset == 0 {
        None
    } else {
        Some(offset)
    }
}

fn next_boundary(from: usize, next_candidate: usize, fallback: usize, eof: usize) -> usize {
    if next_candidate > from {
        next_candidate
    } else if fallback > from {
        fallback
    } else {
        eof
    }
}

fn read_aux_block(bytes: &[u8], offset: usize, next_offset: impl FnOnce(usize) -> usize) -> Result<Option<Vec<u8>>> {
    if offset == 0 {
        return Ok(None);
    }
    if offset > bytes.len() {
        return Err(Error::Corrupt("aux block offset beyond EOF".into()));
    }
    let end = next_offset(offset).min(bytes.len()).max(offset);
    Ok(Some(bytes[offset..end].to_vec()))
}
