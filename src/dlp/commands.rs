// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! The DLP command surface: one typed request/response pair per opcode.
//!
//! Each function drives a single [`DlpSession::call`] and parses the
//! argument list into a Rust type. Argument ids and lengths are derived
//! mechanically from the original protocol headers; nothing here invents
//! wire shape beyond what `dlp_cmd.h` specifies.

use crate::dlp::{Argument, DlpSession, FIRST_ARG_ID};
use crate::error::{Error, Result};
use crate::octet::{Cursor, CursorMut};
use crate::time::DlpTime;

/// Opcode bytes, `0x10` through `0x38`, one per command.
pub mod opcode {
    pub const READ_USER_INFO: u8 = 0x10;
    pub const WRITE_USER_INFO: u8 = 0x11;
    pub const READ_SYS_INFO: u8 = 0x12;
    pub const GET_SYS_DATE_TIME: u8 = 0x13;
    pub const SET_SYS_DATE_TIME: u8 = 0x14;
    pub const READ_STORAGE_INFO: u8 = 0x15;
    pub const READ_DB_LIST: u8 = 0x16;
    pub const OPEN_DB: u8 = 0x17;
    pub const CREATE_DB: u8 = 0x18;
    pub const CLOSE_DB: u8 = 0x19;
    pub const DELETE_DB: u8 = 0x1a;
    pub const READ_APP_BLOCK: u8 = 0x1b;
    pub const WRITE_APP_BLOCK: u8 = 0x1c;
    pub const READ_SORT_BLOCK: u8 = 0x1d;
    pub const WRITE_SORT_BLOCK: u8 = 0x1e;
    pub const READ_NEXT_MODIFIED_REC: u8 = 0x1f;
    pub const READ_RECORD_BY_ID: u8 = 0x20;
    pub const WRITE_RECORD: u8 = 0x21;
    pub const DELETE_RECORD: u8 = 0x22;
    pub const READ_RESOURCE_BY_INDEX: u8 = 0x23;
    pub const WRITE_RESOURCE: u8 = 0x24;
    pub const DELETE_RESOURCE: u8 = 0x25;
    pub const CLEAN_UP_DATABASE: u8 = 0x26;
    pub const RESET_SYNC_FLAGS: u8 = 0x27;
    pub const ADD_SYNC_LOG_ENTRY: u8 = 0x2a;
    pub const READ_OPEN_DB_INFO: u8 = 0x2b;
    pub const MOVE_CATEGORY: u8 = 0x2c;
    pub const OPEN_CONDUIT: u8 = 0x2e;
    pub const END_OF_SYNC: u8 = 0x2f;
    pub const RESET_RECORD_INDEX: u8 = 0x30;
    pub const READ_RECORD_ID_LIST: u8 = 0x31;
    pub const READ_NEXT_REC_IN_CATEGORY: u8 = 0x32;
    pub const READ_NEXT_MODIFIED_REC_IN_CATEGORY: u8 = 0x33;
    pub const READ_NET_SYNC_INFO: u8 = 0x36;
    pub const WRITE_NET_SYNC_INFO: u8 = 0x37;
    pub const READ_FEATURE: u8 = 0x38;
    // Resource-by-type reads the same opcode as by-index with a different
    // argument shape (search-by-type vs search-by-index); see `ReadResourceBy`.
    pub const READ_RESOURCE_BY_TYPE: u8 = READ_RESOURCE_BY_INDEX;
}

/// Database-level flag bits carried in `dlp_dbinfo.db_flags` and the PDB
/// header's attribute field (§3, §4.6).
pub mod db_flag {
    pub const RESDB: u16 = 0x0001;
    pub const RO: u16 = 0x0002;
    pub const APPINFODIRTY: u16 = 0x0004;
    pub const BACKUP: u16 = 0x0008;
    pub const OKNEWER: u16 = 0x0010;
    pub const RESET: u16 = 0x0020;
    pub const OPEN: u16 = 0x8000;
}

/// `OpenDB` mode bits, OR-ed together.
pub mod open_mode {
    pub const READ: u8 = 0x80;
    pub const WRITE: u8 = 0x40;
    pub const EXCLUSIVE: u8 = 0x20;
    pub const SHOW_SECRET: u8 = 0x10;
}

/// Fields that may be updated by `WriteUserInfo`, OR-ed together in the
/// request's `modflags` byte.
pub mod mod_ui_flag {
    pub const USERID: u8 = 0x80;
    pub const SYNC_PC: u8 = 0x40;
    pub const SYNC_DATE: u8 = 0x20;
    pub const USERNAME: u8 = 0x10;
    pub const VIEWER_ID: u8 = 0x08;
}

/// `EndOfSync` termination reason.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EndOfSyncStatus {
    Normal,
    NoMemory,
    UserCancel,
    Other,
}

impl EndOfSyncStatus {
    fn to_wire(self) -> u16 {
        match self {
            EndOfSyncStatus::Normal => 0,
            EndOfSyncStatus::NoMemory => 1,
            EndOfSyncStatus::UserCancel => 2,
            EndOfSyncStatus::Other => 3,
        }
    }
}

/// `ReadUserInfo` response.
#[derive(Debug, Clone, Default)]
pub struct UserInfo {
    pub userid: u32,
    pub viewerid: u32,
    pub last_sync_pc: u32,
    pub last_good_sync: DlpTime,
    pub last_sync: DlpTime,
    pub username: String,
    pub password: Vec<u8>,
}

/// One card's worth of `ReadStorageInfo` data.
#[derive(Debug, Clone)]
pub struct CardInfo {
    pub card_no: u8,
    pub card_version: u16,
    pub ctime: DlpTime,
    pub rom_size: u32,
    pub ram_size: u32,
    pub free_ram: u32,
    pub card_name: String,
    pub manuf_name: String,
}

/// One entry from `ReadDBList`.
#[derive(Debug, Clone)]
pub struct DbInfo {
    pub index: u16,
    pub db_flags: u16,
    pub misc_flags: u8,
    pub r#type: [u8; 4],
    pub creator: [u8; 4],
    pub version: u16,
    pub modnum: u32,
    pub ctime: DlpTime,
    pub mtime: DlpTime,
    pub baktime: DlpTime,
    pub name: String,
}

impl DbInfo {
    #[must_use]
    pub fn is_resource_db(&self) -> bool {
        self.db_flags & db_flag::RESDB != 0
    }
}

fn arg(id: u8, data: Vec<u8>) -> Argument {
    Argument::new(id, data)
}

fn first_arg(resp: &[Argument]) -> Result<&Argument> {
    resp.first().ok_or(Error::BadArgId)
}

fn read_time(r: &mut Cursor) -> Result<DlpTime> {
    let mut bytes = [0u8; 8];
    for b in &mut bytes {
        *b = r.read_u8()?;
    }
    Ok(DlpTime::from_wire(bytes))
}

fn write_time(w: &mut CursorMut, t: DlpTime) -> Result<()> {
    for b in t.to_wire() {
        w.write_u8(b)?;
    }
    Ok(())
}

/// `ReadUserInfo` (0x10): fetch the device's user/sync identity block.
pub fn read_user_info(session: &mut DlpSession) -> Result<UserInfo> {
    let resp = session.call(opcode::READ_USER_INFO, vec![])?;
    let data = &first_arg(&resp)?.data;
    let mut r = Cursor::new(data);
    let userid = r.read_u32()?;
    let viewerid = r.read_u32()?;
    let last_sync_pc = r.read_u32()?;
    let last_good_sync = read_time(&mut r)?;
    let last_sync = read_time(&mut r)?;
    let usernamelen = r.read_u8()? as usize;
    let passwdlen = r.read_u8()? as usize;
    let username_raw = r.read_bytes(usernamelen)?;
    let username = String::from_utf8_lossy(
        &username_raw[..username_raw.iter().position(|&b| b == 0).unwrap_or(username_raw.len())],
    )
    .into_owned();
    let password = r.read_bytes(passwdlen)?.to_vec();
    Ok(UserInfo {
        userid,
        viewerid,
        last_sync_pc,
        last_good_sync,
        last_sync,
        username,
        password,
    })
}

/// `WriteUserInfo` (0x11): partial update of the user info block, only the
/// fields named in `modflags` (§4.5, `mod_ui_flag`) are applied by the device.
pub fn write_user_info(
    session: &mut DlpSession,
    userid: u32,
    viewerid: u32,
    last_sync_pc: u32,
    last_sync: DlpTime,
    modflags: u8,
    username: &str,
) -> Result<()> {
    let mut body = vec![0u8; 17 + username.len() + 1];
    {
        let mut w = CursorMut::new(&mut body);
        w.write_u32(userid)?;
        w.write_u32(viewerid)?;
        w.write_u32(last_sync_pc)?;
        write_time(&mut w, last_sync)?;
        w.write_u8(modflags)?;
        w.write_u8((username.len() + 1) as u8)?;
        w.write_bytes(username.as_bytes())?;
        w.write_u8(0)?;
    }
    session.call(opcode::WRITE_USER_INFO, vec![arg(FIRST_ARG_ID, body)])?;
    Ok(())
}

/// `ReadSysInfo` (0x12): device ROM/product version. Returned verbatim as
/// the raw argument bytes since the sync engine only logs it.
pub fn read_sys_info(session: &mut DlpSession) -> Result<Vec<u8>> {
    let resp = session.call(opcode::READ_SYS_INFO, vec![])?;
    Ok(first_arg(&resp)?.data.clone())
}

/// `GetSysDateTime` (0x13).
pub fn get_sys_date_time(session: &mut DlpSession) -> Result<DlpTime> {
    let resp = session.call(opcode::GET_SYS_DATE_TIME, vec![])?;
    let mut r = Cursor::new(&first_arg(&resp)?.data);
    read_time(&mut r)
}

/// `SetSysDateTime` (0x14).
pub fn set_sys_date_time(session: &mut DlpSession, time: DlpTime) -> Result<()> {
    let mut body = [0u8; 8];
    write_time(&mut CursorMut::new(&mut body), time)?;
    session.call(opcode::SET_SYS_DATE_TIME, vec![arg(FIRST_ARG_ID, body.to_vec())])?;
    Ok(())
}

/// `ReadStorageInfo` (0x15): enumerate memory cards starting at `start_card`.
/// Returns `(cards, more)`.
pub fn read_storage_info(session: &mut DlpSession, start_card: u8) -> Result<(Vec<CardInfo>, bool)> {
    let resp = session.call(opcode::READ_STORAGE_INFO, vec![arg(FIRST_ARG_ID, vec![start_card, 0])])?;
    let data = &first_arg(&resp)?.data;
    let mut r = Cursor::new(data);
    let _lastcard = r.read_u8()?;
    let more = r.read_u8()? != 0;
    let _unused = r.read_u8()?;
    let count = r.read_u8()?;
    let mut cards = Vec::with_capacity(count as usize);
    for _ in 0..count {
        let _total_size = r.read_u8()?;
        let card_no = r.read_u8()?;
        let card_version = r.read_u16()?;
        let ctime = read_time(&mut r)?;
        let rom_size = r.read_u32()?;
        let ram_size = r.read_u32()?;
        let free_ram = r.read_u32()?;
        let cardname_size = r.read_u8()? as usize;
        let manufname_size = r.read_u8()? as usize;
        let card_name = r.read_padded_str(cardname_size)?;
        let manuf_name = r.read_padded_str(manufname_size)?;
        cards.push(CardInfo {
            card_no,
            card_version,
            ctime,
            rom_size,
            ram_size,
            free_ram,
            card_name,
            manuf_name,
        });
    }
    Ok((cards, more))
}

/// `ReadNetSyncInfo` (0x36): raw response bytes, parsed by the ambient
/// networking collaborator if one is present; the core does not use it.
pub fn read_net_sync_info(session: &mut DlpSession) -> Result<Vec<u8>> {
    let resp = session.call(opcode::READ_NET_SYNC_INFO, vec![])?;
    Ok(first_arg(&resp)?.data.clone())
}

/// `OpenConduit` (0x2e): advisory heartbeat the desktop sends before
/// working on each database so the device's UI can show progress.
pub fn open_conduit(session: &mut DlpSession) -> Result<()> {
    session.call(opcode::OPEN_CONDUIT, vec![])?;
    Ok(())
}

/// `EndOfSync` (0x2f): terminate the session with a reason code.
pub fn end_of_sync(session: &mut DlpSession, status: EndOfSyncStatus) -> Result<()> {
    session.call(opcode::END_OF_SYNC, vec![arg(FIRST_ARG_ID, status.to_wire().to_be_bytes().to_vec())])?;
    Ok(())
}

/// `ReadDBList` (0x16): one page of the RAM or ROM database enumeration,
/// starting at `start_index`. Returns `(entries, more)`; the caller pages
/// by repeating with `start_index = last entry's index + 1`.
pub fn read_db_list(session: &mut DlpSession, card: u8, rom: bool, ram: bool, start_index: u16) -> Result<(Vec<DbInfo>, bool)> {
    let mut flags = 0u8;
    if rom {
        flags |= 0x80;
    }
    if ram {
        flags |= 0x40;
    }
    let mut body = [0u8; 4];
    {
        let mut w = CursorMut::new(&mut body);
        w.write_u8(flags)?;
        w.write_u8(card)?;
        w.write_u16(start_index)?;
    }
    let resp = session.call(opcode::READ_DB_LIST, vec![arg(FIRST_ARG_ID, body.to_vec())])?;
    let data = &first_arg(&resp)?.data;
    let mut r = Cursor::new(data);
    let _last_index = r.read_u16()?;
    let list_flags = r.read_u8()?;
    let count = r.read_u8()?;
    let more = list_flags & 0x80 != 0;
    let mut entries = Vec::with_capacity(count as usize);
    for _ in 0..count {
        let _size = r.read_u8()?;
        let misc_flags = r.read_u8()?;
        let db_flags = r.read_u16()?;
        let mut type_bytes = [0u8; 4];
        let mut creator_bytes = [0u8; 4];
        type_bytes.copy_from_slice(r.read_bytes(4)?);
        creator_bytes.copy_from_slice(r.read_bytes(4)?);
        let version = r.read_u16()?;
        let modnum = r.read_u32()?;
        let ctime = read_time(&mut r)?;
        let mtime = read_time(&mut r)?;
        let baktime = read_time(&mut r)?;
        let index = r.read_u16()?;
        let name = r.read_padded_str(32)?;
        entries.push(DbInfo {
            index,
            db_flags,
            misc_flags,
            r#type: type_bytes,
            creator: creator_bytes,
            version,
            modnum,
            ctime,
            mtime,
            baktime,
            name,
        });
    }
    Ok((entries, more))
}

/// Opaque handle to a database opened with [`open_db`]. Only this crate
/// constructs one; callers pass it back into every subsequent DLP call
/// that operates "on the currently open database".
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DbHandle(pub u8);

/// `OpenDB` (0x17).
pub fn open_db(session: &mut DlpSession, card: u8, name: &str, mode: u8) -> Result<DbHandle> {
    let mut body = vec![0u8; 2 + name.len() + 1];
    {
        let mut w = CursorMut::new(&mut body);
        w.write_u8(card)?;
        w.write_u8(mode)?;
        w.write_bytes(name.as_bytes())?;
        w.write_u8(0)?;
    }
    let resp = session.call(opcode::OPEN_DB, vec![arg(FIRST_ARG_ID, body)])?;
    let handle = first_arg(&resp)?.data.first().copied().ok_or(Error::BadArgId)?;
    Ok(DbHandle(handle))
}

/// `CreateDB` (0x18).
pub fn create_db(
    session: &mut DlpSession,
    card: u8,
    name: &str,
    creator: [u8; 4],
    r#type: [u8; 4],
    db_flags: u16,
    version: u16,
) -> Result<DbHandle> {
    let mut body = vec![0u8; 14 + name.len() + 1];
    {
        let mut w = CursorMut::new(&mut body);
        w.write_bytes(&creator)?;
        w.write_bytes(&r#type)?;
        w.write_u8(card)?;
        w.write_u8(0)?; // reserved
        w.write_u16(db_flags)?;
        w.write_u16(version)?;
        w.write_bytes(name.as_bytes())?;
        w.write_u8(0)?;
    }
    let resp = session.call(opcode::CREATE_DB, vec![arg(FIRST_ARG_ID, body)])?;
    let handle = first_arg(&resp)?.data.first().copied().ok_or(Error::BadArgId)?;
    Ok(DbHandle(handle))
}

/// `CloseDB` (0x19).
pub fn close_db(session: &mut DlpSession, handle: DbHandle) -> Result<()> {
    session.call(opcode::CLOSE_DB, vec![arg(FIRST_ARG_ID, vec![handle.0])])?;
    Ok(())
}

/// `DeleteDB` (0x1a).
pub fn delete_db(session: &mut DlpSession, card: u8, name: &str) -> Result<()> {
    let mut body = vec![0u8; 2 + name.len() + 1];
    {
        let mut w = CursorMut::new(&mut body);
        w.write_u8(card)?;
        w.write_u8(0)?;
        w.write_bytes(name.as_bytes())?;
        w.write_u8(0)?;
    }
    session.call(opcode::DELETE_DB, vec![arg(FIRST_ARG_ID, body)])?;
    Ok(())
}

/// Record/resource count and index cursor state for an open database.
#[derive(Debug, Clone, Copy, Default)]
pub struct OpenDbInfo {
    pub num_records: u16,
}

/// `ReadOpenDBInfo` (0x2b).
pub fn read_open_db_info(session: &mut DlpSession, handle: DbHandle) -> Result<OpenDbInfo> {
    let resp = session.call(opcode::READ_OPEN_DB_INFO, vec![arg(FIRST_ARG_ID, vec![handle.0])])?;
    let data = &first_arg(&resp)?.data;
    let num_records = u16::from_be_bytes([data[0], data[1]]);
    Ok(OpenDbInfo { num_records })
}

/// `ReadAppBlock` (0x1b). `NotFound` (no AppInfo block) is surfaced to the
/// caller rather than swallowed here so the caller can choose tolerance via
/// [`DlpSession::call_tolerate_not_found`]-style handling; this wrapper
/// already does that and returns `None` on `NotFound`.
pub fn read_app_block(session: &mut DlpSession, handle: DbHandle) -> Result<Option<Vec<u8>>> {
    let mut body = [0u8; 6];
    {
        let mut w = CursorMut::new(&mut body);
        w.write_u8(handle.0)?;
        w.write_u8(0)?;
        w.write_u16(0)?; // offset
        w.write_u16(0xFFFF)?; // length: whole block
    }
    let resp = session.call_tolerate_not_found(opcode::READ_APP_BLOCK, vec![arg(FIRST_ARG_ID, body.to_vec())])?;
    Ok(resp.map(|args| args.first().map(|a| a.data.clone()).unwrap_or_default()))
}

/// `WriteAppBlock` (0x1c).
pub fn write_app_block(session: &mut DlpSession, handle: DbHandle, data: &[u8]) -> Result<()> {
    let mut body = vec![0u8; 4 + data.len()];
    {
        let mut w = CursorMut::new(&mut body);
        w.write_u8(handle.0)?;
        w.write_u8(0)?;
        w.write_u16(data.len() as u16)?;
        w.write_bytes(data)?;
    }
    session.call(opcode::WRITE_APP_BLOCK, vec![arg(FIRST_ARG_ID, body)])?;
    Ok(())
}

/// `ReadSortBlock` (0x1d).
pub fn read_sort_block(session: &mut DlpSession, handle: DbHandle) -> Result<Option<Vec<u8>>> {
    let mut body = [0u8; 6];
    {
        let mut w = CursorMut::new(&mut body);
        w.write_u8(handle.0)?;
        w.write_u8(0)?;
        w.write_u16(0)?;
        w.write_u16(0xFFFF)?;
    }
    let resp = session.call_tolerate_not_found(opcode::READ_SORT_BLOCK, vec![arg(FIRST_ARG_ID, body.to_vec())])?;
    Ok(resp.map(|args| args.first().map(|a| a.data.clone()).unwrap_or_default()))
}

/// `WriteSortBlock` (0x1e).
pub fn write_sort_block(session: &mut DlpSession, handle: DbHandle, data: &[u8]) -> Result<()> {
    let mut body = vec![0u8; 4 + data.len()];
    {
        let mut w = CursorMut::new(&mut body);
        w.write_u8(handle.0)?;
        w.write_u8(0)?;
        w.write_u16(data.len() as u16)?;
        w.write_bytes(data)?;
    }
    session.call(opcode::WRITE_SORT_BLOCK, vec![arg(FIRST_ARG_ID, body)])?;
    Ok(())
}

/// One record as returned by `ReadRecordByID`/`ReadRecordByIndex`/
/// `ReadNextModifiedRec`.
#[derive(Debug, Clone)]
pub struct WireRecord {
    pub id: u32,
    pub attrs: u8,
    pub category: u8,
    pub data: Vec<u8>,
}

fn parse_record(data: &[u8]) -> Result<WireRecord> {
    let mut r = Cursor::new(data);
    let id = r.read_u32()?;
    let index_or_size = r.read_u16()?;
    let attrs = r.read_u8()?;
    let category = r.read_u8()?;
    let _ = index_or_size;
    let payload = r.read_bytes(r.remaining())?.to_vec();
    Ok(WireRecord { id, attrs, category, data: payload })
}

/// `ReadRecordByID` (0x20).
pub fn read_record_by_id(session: &mut DlpSession, handle: DbHandle, id: u32) -> Result<WireRecord> {
    let mut body = [0u8; 10];
    {
        let mut w = CursorMut::new(&mut body);
        w.write_u8(handle.0)?;
        w.write_u8(0)?;
        w.write_u32(id)?;
        w.write_u16(0)?;
        w.write_u16(0xFFFF)?;
    }
    let resp = session.call(opcode::READ_RECORD_BY_ID, vec![arg(FIRST_ARG_ID, body.to_vec())])?;
    parse_record(&first_arg(&resp)?.data)
}

/// `ReadRecordByIndex`, reusing the by-id wire shape with an index instead.
pub fn read_record_by_index(session: &mut DlpSession, handle: DbHandle, index: u16) -> Result<WireRecord> {
    let mut body = [0u8; 4];
    {
        let mut w = CursorMut::new(&mut body);
        w.write_u8(handle.0)?;
        w.write_u8(0)?;
        w.write_u16(index)?;
    }
    let resp = session.call(opcode::READ_RECORD_BY_ID, vec![arg(FIRST_ARG_ID, body.to_vec())])?;
    parse_record(&first_arg(&resp)?.data)
}

/// `ReadRecordIDList` (0x31): every uniqueID in the database, one page at a
/// time. `start_index`/`max` page through large databases.
pub fn read_record_id_list(session: &mut DlpSession, handle: DbHandle, start_index: u16, max: u16) -> Result<Vec<u32>> {
    let mut body = [0u8; 6];
    {
        let mut w = CursorMut::new(&mut body);
        w.write_u8(handle.0)?;
        w.write_u8(0)?; // sort flag: unsorted
        w.write_u16(start_index)?;
        w.write_u16(max)?;
    }
    let resp = session.call(opcode::READ_RECORD_ID_LIST, vec![arg(FIRST_ARG_ID, body.to_vec())])?;
    let data = &first_arg(&resp)?.data;
    let mut r = Cursor::new(data);
    let count = r.read_u16()?;
    let mut ids = Vec::with_capacity(count as usize);
    for _ in 0..count {
        ids.push(r.read_u32()?);
    }
    Ok(ids)
}

/// `ReadNextModifiedRec` (0x1f): the fast-sync iterator over DIRTY records.
/// Returns `None` once the device reports `NotFound` (iterator exhausted).
pub fn read_next_modified_rec(session: &mut DlpSession, handle: DbHandle) -> Result<Option<WireRecord>> {
    let resp = session.call_tolerate_not_found(opcode::READ_NEXT_MODIFIED_REC, vec![arg(FIRST_ARG_ID, vec![handle.0, 0])])?;
    match resp {
        Some(args) => Ok(Some(parse_record(&first_arg(&args)?.data)?)),
        None => Ok(None),
    }
}

/// `ResetRecordIndex` (0x30): rewind the `ReadNextModifiedRec` cursor.
pub fn reset_record_index(session: &mut DlpSession, handle: DbHandle) -> Result<()> {
    session.call(opcode::RESET_RECORD_INDEX, vec![arg(FIRST_ARG_ID, vec![handle.0, 0])])?;
    Ok(())
}

/// `WriteRecord` (0x21). Pass `id = 0` to ask the device to assign a new
/// uniqueID; the assigned id is returned.
pub fn write_record(session: &mut DlpSession, handle: DbHandle, id: u32, attrs: u8, category: u8, data: &[u8]) -> Result<u32> {
    let mut body = vec![0u8; 8 + data.len()];
    {
        let mut w = CursorMut::new(&mut body);
        w.write_u8(handle.0)?;
        w.write_u8(0)?;
        w.write_u32(id)?;
        w.write_u8(attrs)?;
        w.write_u8(category)?;
        w.write_bytes(data)?;
    }
    let resp = session.call(opcode::WRITE_RECORD, vec![arg(FIRST_ARG_ID, body)])?;
    let new_id = &first_arg(&resp)?.data;
    Ok(u32::from_be_bytes([new_id[0], new_id[1], new_id[2], new_id[3]]))
}

/// `DeleteRecord` (0x22). `all` deletes every record in the database
/// instead of a single id (used by `CleanUpDatabase`-adjacent cleanup).
pub fn delete_record(session: &mut DlpSession, handle: DbHandle, id: u32) -> Result<()> {
    let mut body = [0u8; 8];
    {
        let mut w = CursorMut::new(&mut body);
        w.write_u8(handle.0)?;
        w.write_u8(0)?;
        w.write_u32(id)?;
    }
    session.call(opcode::DELETE_RECORD, vec![arg(FIRST_ARG_ID, body.to_vec())])?;
    Ok(())
}

/// One resource as returned by `ReadResourceByIndex`/`ReadResourceByType`.
#[derive(Debug, Clone)]
pub struct WireResource {
    pub r#type: [u8; 4],
    pub id: u16,
    pub data: Vec<u8>,
}

/// `ReadResourceByIndex` (0x23).
pub fn read_resource_by_index(session: &mut DlpSession, handle: DbHandle, index: u16) -> Result<WireResource> {
    let mut body = [0u8; 8];
    {
        let mut w = CursorMut::new(&mut body);
        w.write_u8(handle.0)?;
        w.write_u8(0)?;
        w.write_u16(index)?;
        w.write_u16(0)?;
        w.write_u16(0xFFFF)?;
    }
    let resp = session.call(opcode::READ_RESOURCE_BY_INDEX, vec![arg(FIRST_ARG_ID, body.to_vec())])?;
    let data = &first_arg(&resp)?.data;
    let mut r = Cursor::new(data);
    let mut type_bytes = [0u8; 4];
    type_bytes.copy_from_slice(r.read_bytes(4)?);
    let id = r.read_u16()?;
    let _index_or_size = r.read_u16()?;
    let payload = r.read_bytes(r.remaining())?.to_vec();
    Ok(WireResource { r#type: type_bytes, id, data: payload })
}

/// `ReadResourceByType` (0x23, same opcode as `ReadResourceByIndex` with the
/// search-by-type argument shape: type+id instead of index, and the
/// "by type" flag byte set instead of cleared).
pub fn read_resource_by_type(
    session: &mut DlpSession,
    handle: DbHandle,
    r#type: [u8; 4],
    id: u16,
) -> Result<WireResource> {
    let mut body = [0u8; 10];
    {
        let mut w = CursorMut::new(&mut body);
        w.write_u8(handle.0)?;
        w.write_u8(0x80)?;
        w.write_bytes(&r#type)?;
        w.write_u16(id)?;
    }
    let resp = session.call(opcode::READ_RESOURCE_BY_TYPE, vec![arg(FIRST_ARG_ID, body.to_vec())])?;
    let data = &first_arg(&resp)?.data;
    let mut r = Cursor::new(data);
    let mut type_bytes = [0u8; 4];
    type_bytes.copy_from_slice(r.read_bytes(4)?);
    let res_id = r.read_u16()?;
    let _index_or_size = r.read_u16()?;
    let payload = r.read_bytes(r.remaining())?.to_vec();
    Ok(WireResource { r#type: type_bytes, id: res_id, data: payload })
}

/// `WriteResource` (0x24).
pub fn write_resource(session: &mut DlpSession, handle: DbHandle, r#type: [u8; 4], id: u16, data: &[u8]) -> Result<()> {
    let mut body = vec![0u8; 8 + data.len()];
    {
        let mut w = CursorMut::new(&mut body);
        w.write_u8(handle.0)?;
        w.write_u8(0)?;
        w.write_bytes(&r#type)?;
        w.write_u16(id)?;
        w.write_bytes(data)?;
    }
    session.call(opcode::WRITE_RESOURCE, vec![arg(FIRST_ARG_ID, body)])?;
    Ok(())
}

/// `DeleteResource` (0x25).
pub fn delete_resource(session: &mut DlpSession, handle: DbHandle, r#type: [u8; 4], id: u16) -> Result<()> {
    let mut body = [0u8; 8];
    {
        let mut w = CursorMut::new(&mut body);
        w.write_u8(handle.0)?;
        w.write_u8(0)?;
        w.write_bytes(&r#type)?;
        w.write_u16(id)?;
    }
    session.call(opcode::DELETE_RESOURCE, vec![arg(FIRST_ARG_ID, body.to_vec())])?;
    Ok(())
}

/// `CleanUpDatabase` (0x26): purge records flagged for deletion.
pub fn clean_up_database(session: &mut DlpSession, handle: DbHandle) -> Result<()> {
    session.call(opcode::CLEAN_UP_DATABASE, vec![arg(FIRST_ARG_ID, vec![handle.0])])?;
    Ok(())
}

/// `ResetSyncFlags` (0x27): clear DIRTY on every record in the database.
pub fn reset_sync_flags(session: &mut DlpSession, handle: DbHandle) -> Result<()> {
    session.call(opcode::RESET_SYNC_FLAGS, vec![arg(FIRST_ARG_ID, vec![handle.0])])?;
    Ok(())
}

/// `MoveCategory` (0x2c). The "categories moved" bookkeeping this implies
/// on the desktop side is intentionally unimplemented; see `DESIGN.md`.
pub fn move_category(session: &mut DlpSession, handle: DbHandle, from: u8, to: u8) -> Result<()> {
    session.call(opcode::MOVE_CATEGORY, vec![arg(FIRST_ARG_ID, vec![handle.0, from, to, 0])])?;
    Ok(())
}

/// `AddSyncLogEntry` (0x2a). Only the *first* call in a session is retained
/// by the device (§9); callers must batch their log into one call, which is
/// why `sync::SessionLog` accumulates lines in memory and flushes once.
pub fn add_sync_log_entry(session: &mut DlpSession, message: &str) -> Result<()> {
    let mut body = message.as_bytes().to_vec();
    body.push(0);
    session.call(opcode::ADD_SYNC_LOG_ENTRY, vec![arg(FIRST_ARG_ID, body)])?;
    Ok(())
}

/// `ReadFeature` (0x38): look up a named feature's 32-bit value.
pub fn read_feature(session: &mut DlpSession, creator: [u8; 4], num: u16) -> Result<Option<u32>> {
    let mut body = [0u8; 6];
    {
        let mut w = CursorMut::new(&mut body);
        w.write_bytes(&creator)?;
        w.write_u16(num)?;
    }
    let resp = session.call_tolerate_not_found(opcode::READ_FEATURE, vec![arg(FIRST_ARG_ID, body.to_vec())])?;
    match resp {
        Some(args) => {
            let data = &first_arg(&args)?.data;
            Ok(Some(u32::from_be_bytes([data[0], data[1], data[2], data[3]])))
        }
        None => Ok(None),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn db_info_resource_flag() {
        let info = DbInfo {
            index: 0,
            db_flags: db_flag::RESDB,
            misc_flags: 0,
            r#type: *b"appl",
            creator: *b"memo",
            version: 1,
            modnum: 0,
            ctime: DlpTime::UNKNOWN,
            mtime: DlpTime::UNKNOWN,
            baktime: DlpTime::UNKNOWN,
            name: "Memo".into(),
        };
        assert!(info.is_resource_db());
    }

    #[test]
    fn parse_record_splits_header_and_payload() {
        let mut body = vec![0u8; 8];
        body[0..4].copy_from_slice(&42u32.to_be_bytes());
        body[6] = 0x40; // DIRTY
        body[7] = 3; // category
        body.extend_from_slice(b"hello");
        let rec = parse_record(&body).unwrap();
        assert_eq!(rec.id, 42);
        assert_eq!(rec.attrs, 0x40);
        assert_eq!(rec.category, 3);
        assert_eq!(rec.data, b"hello");
    }

    #[test]
    fn end_of_sync_status_wire_values() {
        assert_eq!(EndOfSyncStatus::Normal.to_wire(), 0);
        assert_eq!(EndOfSyncStatus::UserCancel.to_wire(), 2);
        assert_eq!(EndOfSyncStatus::Other.to_wire(), 3);
    }
}
