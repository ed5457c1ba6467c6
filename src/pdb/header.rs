// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! The 72-byte PDB/PRC header and the record/resource index entry formats.

use crate::dlp::commands::db_flag;
use crate::error::Result;
use crate::octet::{Cursor, CursorMut};

pub const HEADER_LEN: usize = 72;
pub const INDEX_HEADER_LEN: usize = 6;
pub const RECORD_INDEX_ENTRY_LEN: usize = 8;
pub const RESOURCE_INDEX_ENTRY_LEN: usize = 10;
pub const NAME_LEN: usize = 32;

/// The fixed 72-byte header, decoded field-for-field (§4.6).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PdbHeader {
    pub name: String,
    pub attributes: u16,
    pub version: u16,
    pub ctime: u32,
    pub mtime: u32,
    pub baktime: u32,
    pub modnum: u32,
    pub appinfo_offset: u32,
    pub sortinfo_offset: u32,
    pub r#type: [u8; 4],
    pub creator: [u8; 4],
    pub unique_id_seed: u32,
}

impl PdbHeader {
    pub fn decode(bytes: &[u8]) -> Result<Self> {
        let mut r = Cursor::new(bytes);
        let name = r.read_padded_str(NAME_LEN)?;
        let attributes = r.read_u16()?;
        let version = r.read_u16()?;
        let ctime = r.read_u32()?;
        let mtime = r.read_u32()?;
        let baktime = r.read_u32()?;
        let modnum = r.read_u32()?;
        let appinfo_offset = r.read_u32()?;
        let sortinfo_offset = r.read_u32()?;
        let mut type_bytes = [0u8; 4];
        let mut creator_bytes = [0u8; 4];
        type_bytes.copy_from_slice(r.read_bytes(4)?);
        creator_bytes.copy_from_slice(r.read_bytes(4)?);
        let unique_id_seed = r.read_u32()?;
        Ok(PdbHeader {
            name,
            attributes,
            version,
            ctime,
            mtime,
            baktime,
            modnum,
            appinfo_offset,
            sortinfo_offset,
            r#type: type_bytes,
            creator: creator_bytes,
            unique_id_seed,
        })
    }

    /// Encode the header. The OPEN attribute is forcibly cleared (§3
    /// invariant 5, §4.6): an on-disk image is never "currently open".
    pub fn encode(&self) -> Result<[u8; HEADER_LEN]> {
        let mut buf = [0u8; HEADER_LEN];
        let mut w = CursorMut::new(&mut buf);
        w.write_padded_str(&self.name, NAME_LEN)?;
        w.write_u16(self.attributes & !db_flag::OPEN)?;
        w.write_u16(self.version)?;
        w.write_u32(self.ctime)?;
        w.write_u32(self.mtime)?;
        w.write_u32(self.baktime)?;
        w.write_u32(self.modnum)?;
        w.write_u32(self.appinfo_offset)?;
        w.write_u32(self.sortinfo_offset)?;
        w.write_bytes(&self.r#type)?;
        w.write_bytes(&self.creator)?;
        w.write_u32(self.unique_id_seed)?;
        Ok(buf)
    }
}

/// A decoded record index entry: `offset(4) | attrs(1) | uniqueID(3)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RecordIndexEntry {
    pub offset: u32,
    pub attrs: u8,
    pub unique_id: u32,
}

impl RecordIndexEntry {
    pub fn decode(bytes: &[u8]) -> Result<Self> {
        let mut r = Cursor::new(bytes);
        let offset = r.read_u32()?;
        let attrs = r.read_u8()?;
        let mut id_bytes = [0u8; 4];
        id_bytes[1..].copy_from_slice(r.read_bytes(3)?);
        Ok(RecordIndexEntry {
            offset,
            attrs,
            unique_id: u32::from_be_bytes(id_bytes),
        })
    }

    pub fn encode(&self) -> Result<[u8; RECORD_INDEX_ENTRY_LEN]> {
        let mut buf = [0u8; RECORD_INDEX_ENTRY_LEN];
        let mut w = CursorMut::new(&mut buf);
        w.write_u32(self.offset)?;
        w.write_u8(self.attrs)?;
        let id_bytes = self.unique_id.to_be_bytes();
        w.write_bytes(&id_bytes[1..])?;
        Ok(buf)
    }
}

/// A decoded resource index entry: `type(4) | id(2) | offset(4)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResourceIndexEntry {
    pub r#type: [u8; 4],
    pub id: u16,
    pub offset: u32,
}

impl ResourceIndexEntry {
    pub fn decode(bytes: &[u8]) -> Result<Self> {
        let mut r = Cursor::new(bytes);
        let mut type_bytes = [0u8; 4];
        type_bytes.copy_from_slice(r.read_bytes(4)?);
        let id = r.read_u16()?;
        let offset = r.read_u32()?;
        Ok(ResourceIndexEntry { r#type: type_bytes, id, offset })
    }

    pub fn encode(&self) -> Result<[u8; RESOURCE_INDEX_ENTRY_LEN]> {
        let mut buf = [0u8; RESOURCE_INDEX_ENTRY_LEN];
        let mut w = CursorMut::new(&mut buf);
        w.write_bytes(&self.r#type)?;
        w.write_u16(self.id)?;
        w.write_u32(self.offset)?;
        Ok(buf)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_header() -> PdbHeader {
        PdbHeader {
            name: "Memo".into(),
            attributes: db_flag::BACKUP | db_flag::OPEN,
            version: 1,
            ctime: 100,
            mtime: 200,
            baktime: 0,
            modnum: 3,
            appinfo_offset: 0,
            sortinfo_offset: 0,
            r#type: *b"DATA",
            creator: *b"memo",
            unique_id_seed: 9,
        }
    }

    #[test]
    fn header_roundtrip_clears_open_bit() {
        let h = sample_header();
        let encoded = h.encode().unwrap();
        let decoded = PdbHeader::decode(&encoded).unwrap();
        assert_eq!(decoded.attributes, db_flag::BACKUP);
        assert_eq!(decoded.name, "Memo");
        assert_eq!(decoded.unique_id_seed, 9);
    }

    #[test]
    fn record_index_entry_roundtrip() {
        let e = RecordIndexEntry { offset: 0x1234, attrs: 0x40, unique_id: 0x00_AB_CD_EF };
        let encoded = e.encode().unwrap();
        let decoded = RecordIndexEntry::decode(&encoded).unwrap();
        assert_eq!(decoded, e);
    }

    #[test]
    fn resource_index_entry_roundtrip() {
        let e = ResourceIndexEntry { r#type: *b"tAIB", id: 1000, offset: 9999 };
        let encoded = e.encode().unwrap();
        let decoded = ResourceIndexEntry::decode(&encoded).unwrap();
        assert_eq!(decoded, e);
    }
}
